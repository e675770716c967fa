//! Repository Records and Sizing Work Items
//!
//! A [`RepositoryRecord`] is one row per tracked repository. All counts are
//! stored as text (empty until known) so a blank field can be told apart from
//! a measured zero.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Type tag written on every discovered repository.
pub const REPOSITORY_TYPE_PRIMARY: &str = "primary";

/// Matches `github.com/<owner>/<name>` with optional scheme, `www.` and `.git`.
static REPOSITORY_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?github\.com/([^/\s]+)/([^/\s]+?)(?:\.git)?/?$")
        .expect("repository URL pattern is valid")
});

// ============================================================================
// Repository Record
// ============================================================================

/// One tracked repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Stable identifier assigned by the store (0 until inserted)
    pub id: i64,
    /// `owner/repo`
    pub name: String,
    /// `github.com/owner/repo`
    pub url: String,
    pub repository_type: String,
    pub open_issue_count: String,
    pub closed_issue_count: String,
    pub commit_count: String,
    pub stargazer_count: String,
    pub creation_date: String,
    pub license_info: String,
    pub latest_release: String,
    pub primary_language: String,
    /// Aggregate language byte size reported by the metadata service
    pub language_bytes: String,
    /// Line count of the repository's own code (blank until computed)
    pub original_codebase_size: String,
    /// Summed line count of the resolved dependency set (blank until computed)
    pub library_codebase_size: String,
}

impl RepositoryRecord {
    /// Create a freshly discovered primary repository.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            repository_type: REPOSITORY_TYPE_PRIMARY.to_string(),
            ..Default::default()
        }
    }

    /// Create an empty patch addressed at `id`, for use with update-by-merge.
    pub fn patch(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Build a record from a discovery result such as `github.com/acme/widget`.
    ///
    /// The record name is the `owner/repo` part of the URL.
    pub fn from_discovered(url: &str) -> Option<Self> {
        let coords = RepositoryCoordinates::parse(url)?;
        Some(Self::new(coords.full_name(), url.trim()))
    }

    /// Owner and repository name parsed from the URL.
    pub fn coordinates(&self) -> Option<RepositoryCoordinates> {
        RepositoryCoordinates::parse(&self.url)
    }

    /// HTTPS clone URL (`https://github.com/owner/repo.git`).
    pub fn clone_url(&self) -> String {
        let url = self.url.trim().trim_end_matches('/');
        let url = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url);
        let url = url.strip_suffix(".git").unwrap_or(url);
        format!("https://{}.git", url)
    }

    /// Raw value of a size field.
    pub fn size_field(&self, field: SizeField) -> &str {
        match field {
            SizeField::Original => &self.original_codebase_size,
            SizeField::Library => &self.library_codebase_size,
        }
    }

    /// Parsed size, if the field holds a measurement.
    pub fn size(&self, field: SizeField) -> Option<u64> {
        self.size_field(field).trim().parse().ok()
    }

    /// Whether the size field already holds a value.
    pub fn is_sized(&self, field: SizeField) -> bool {
        !self.size_field(field).trim().is_empty()
    }

    /// Write a measurement into a size field.
    pub fn set_size(&mut self, field: SizeField, lines: u64) {
        let value = lines.to_string();
        match field {
            SizeField::Original => self.original_codebase_size = value,
            SizeField::Library => self.library_codebase_size = value,
        }
    }

    /// Merge non-empty fields of `patch` into this record.
    ///
    /// The identifier and name are never touched; an empty patch field never
    /// clears a stored value.
    pub fn merge(&mut self, patch: &RepositoryRecord) {
        fn take(dst: &mut String, src: &str) {
            if !src.is_empty() {
                *dst = src.to_string();
            }
        }

        take(&mut self.url, &patch.url);
        take(&mut self.repository_type, &patch.repository_type);
        take(&mut self.open_issue_count, &patch.open_issue_count);
        take(&mut self.closed_issue_count, &patch.closed_issue_count);
        take(&mut self.commit_count, &patch.commit_count);
        take(&mut self.stargazer_count, &patch.stargazer_count);
        take(&mut self.creation_date, &patch.creation_date);
        take(&mut self.license_info, &patch.license_info);
        take(&mut self.latest_release, &patch.latest_release);
        take(&mut self.primary_language, &patch.primary_language);
        take(&mut self.language_bytes, &patch.language_bytes);
        take(
            &mut self.original_codebase_size,
            &patch.original_codebase_size,
        );
        take(&mut self.library_codebase_size, &patch.library_codebase_size);
    }
}

// ============================================================================
// Size Field
// ============================================================================

/// Which size metric a measurement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeField {
    /// The repository's own code
    Original,
    /// The repository's resolved dependency set
    Library,
}

impl SizeField {
    /// Column name used by the SQLite store.
    pub fn column(&self) -> &'static str {
        match self {
            SizeField::Original => "original_codebase_size",
            SizeField::Library => "library_codebase_size",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeField::Original => "original",
            SizeField::Library => "library",
        }
    }
}

impl fmt::Display for SizeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Repository Coordinates
// ============================================================================

/// Owner/name pair of a GitHub-hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryCoordinates {
    pub owner: String,
    pub name: String,
}

impl RepositoryCoordinates {
    /// Parse `github.com/owner/name` (scheme, `www.` and `.git` optional).
    pub fn parse(url: &str) -> Option<Self> {
        let caps = REPOSITORY_URL.captures(url.trim())?;
        Some(Self {
            owner: caps.get(1)?.as_str().to_string(),
            name: caps.get(2)?.as_str().to_string(),
        })
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

// ============================================================================
// Dependency Identifier
// ============================================================================

/// Opaque name of a declared dependency.
///
/// Normalized to `module@version` when the manifest declares a version,
/// otherwise the bare module path. Equality is exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyIdentifier(String);

impl DependencyIdentifier {
    /// Create from raw text, trimming whitespace. Empty input yields `None`.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Create from a module path and optional version.
    pub fn from_module(module: &str, version: Option<&str>) -> Option<Self> {
        let module = module.trim().trim_matches('"');
        if module.is_empty() {
            return None;
        }
        match version.map(str::trim).filter(|v| !v.is_empty()) {
            Some(version) => Some(Self(format!("{}@{}", module, version))),
            None => Some(Self(module.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Module path without the version suffix.
    pub fn module_path(&self) -> &str {
        self.0.split_once('@').map(|(m, _)| m).unwrap_or(&self.0)
    }
}

impl fmt::Display for DependencyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DependencyIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Work Item
// ============================================================================

/// One unit of sizing work: what to materialize, where, and for which record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Clone URL or `module@version`
    pub location: String,
    /// Human-readable name, also the prefix of the scratch subdirectory
    pub name: String,
    /// Record the measurement belongs to
    pub record_id: i64,
}

impl WorkItem {
    pub fn new(location: impl Into<String>, name: impl Into<String>, record_id: i64) -> Self {
        Self {
            location: location.into(),
            name: name.into(),
            record_id,
        }
    }

    /// Filesystem-safe form of the name for scratch directory prefixes.
    pub fn scratch_prefix(&self) -> String {
        let slug: String = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}-", slug.trim_matches('.'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_parse() {
        let c = RepositoryCoordinates::parse("github.com/acme/widget").unwrap();
        assert_eq!(c.owner, "acme");
        assert_eq!(c.name, "widget");
        assert_eq!(c.full_name(), "acme/widget");

        let c = RepositoryCoordinates::parse("https://github.com/acme/widget.git").unwrap();
        assert_eq!(c.name, "widget");

        assert!(RepositoryCoordinates::parse("gitlab.com/acme/widget").is_none());
        assert!(RepositoryCoordinates::parse("github.com/acme").is_none());
    }

    #[test]
    fn test_from_discovered() {
        let record = RepositoryRecord::from_discovered("github.com/acme/widget").unwrap();
        assert_eq!(record.name, "acme/widget");
        assert_eq!(record.url, "github.com/acme/widget");
        assert_eq!(record.repository_type, REPOSITORY_TYPE_PRIMARY);
        assert!(!record.is_sized(SizeField::Original));
    }

    #[test]
    fn test_clone_url() {
        let record = RepositoryRecord::new("acme/widget", "github.com/acme/widget");
        assert_eq!(record.clone_url(), "https://github.com/acme/widget.git");

        let record = RepositoryRecord::new("acme/widget", "https://github.com/acme/widget.git");
        assert_eq!(record.clone_url(), "https://github.com/acme/widget.git");
    }

    #[test]
    fn test_merge_keeps_existing_on_empty_patch() {
        let mut record = RepositoryRecord::new("acme/widget", "github.com/acme/widget");
        record.id = 7;
        record.stargazer_count = "10".into();
        record.original_codebase_size = "1200".into();

        let mut patch = RepositoryRecord::patch(99);
        patch.name = "widget".into();
        patch.stargazer_count = "42".into();
        record.merge(&patch);

        assert_eq!(record.id, 7);
        assert_eq!(record.name, "acme/widget");
        assert_eq!(record.stargazer_count, "42");
        assert_eq!(record.original_codebase_size, "1200");
    }

    #[test]
    fn test_size_fields() {
        let mut record = RepositoryRecord::default();
        assert_eq!(record.size(SizeField::Library), None);
        record.set_size(SizeField::Library, 0);
        assert!(record.is_sized(SizeField::Library));
        assert_eq!(record.size(SizeField::Library), Some(0));
        assert!(!record.is_sized(SizeField::Original));
    }

    #[test]
    fn test_dependency_identifier() {
        assert!(DependencyIdentifier::new("   ").is_none());
        let id = DependencyIdentifier::new("  golang.org/x/net@v0.1.0 ").unwrap();
        assert_eq!(id.as_str(), "golang.org/x/net@v0.1.0");
        assert_eq!(id.module_path(), "golang.org/x/net");

        let id = DependencyIdentifier::from_module("\"example.com/m\"", Some("v1.0.0")).unwrap();
        assert_eq!(id.to_string(), "example.com/m@v1.0.0");
        let bare = DependencyIdentifier::from_module("example.com/m", None).unwrap();
        assert_eq!(bare.module_path(), "example.com/m");
    }

    #[test]
    fn test_scratch_prefix() {
        let item = WorkItem::new("golang.org/x/net@v0.1.0", "golang.org/x/net@v0.1.0", 1);
        assert_eq!(item.scratch_prefix(), "golang.org_x_net_v0.1.0-");
    }
}
