//! Manifest Parser for Dependency Resolution
//!
//! Parses `go.mod` manifests into the list of declared dependencies and the
//! locations of inner manifests that `replace` directives point at inside the
//! same repository.
//!
//! ## Recognized Directives
//!
//! | Directive | Form | Effect |
//! |-----------|------|--------|
//! | `require` | block or single line | each entry becomes a [`DependencyIdentifier`] |
//! | `replace` | block or single line | `=> ./path` targets become inner manifest URLs |
//! | anything else | block or single line | ignored |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use depgauge_core::manifest::{InnerManifestBase, ManifestParser};
//!
//! let parser = ManifestParser::new();
//! let base = InnerManifestBase::new("https://raw.githubusercontent.com", "acme", "mono", "master");
//! let parsed = parser.parse(content, &base);
//! println!("{} deps, {} inner", parsed.dependencies.len(), parsed.inner_manifests.len());
//! ```

use tracing::debug;

use crate::record::DependencyIdentifier;

/// Manifest filename appended to every inner manifest location.
pub const MANIFEST_FILENAME: &str = "go.mod";

const DEPENDENCY_KEYWORD: &str = "require";
const REDIRECT_KEYWORD: &str = "replace";
const ARROW: &str = "=>";

// ============================================================================
// Inner Manifest Base
// ============================================================================

/// Where inner manifests of one repository can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerManifestBase {
    /// Raw-content host (e.g. `https://raw.githubusercontent.com`)
    pub raw_base: String,
    pub owner: String,
    pub repo: String,
    /// Branch the raw content is read from
    pub branch: String,
}

impl InnerManifestBase {
    pub fn new(
        raw_base: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            raw_base: raw_base.into(),
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
        }
    }

    /// Compose the fetchable URL of the manifest under `dir`.
    ///
    /// `dir` is the redirect target with its leading dot already removed
    /// (`/sub/module`).
    pub fn manifest_url(&self, dir: &str, filename: &str) -> String {
        let dir = dir.trim_end_matches('/');
        format!(
            "{}/{}/{}/{}{}/{}",
            self.raw_base.trim_end_matches('/'),
            self.owner,
            self.repo,
            self.branch,
            dir,
            filename
        )
    }
}

// ============================================================================
// Parsed Manifest
// ============================================================================

/// Result of parsing one manifest document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedManifest {
    /// Declared dependencies in manifest line order (may contain repeats)
    pub dependencies: Vec<DependencyIdentifier>,
    /// Composed URLs of inner manifests
    pub inner_manifests: Vec<String>,
    /// Redirect lines that could not be interpreted
    pub skipped_redirects: Vec<String>,
}

/// Block the line scanner is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Require,
    Replace,
    Other,
}

// ============================================================================
// Manifest Parser
// ============================================================================

/// Line-oriented `go.mod` parser. Holds no state between calls.
#[derive(Debug, Clone)]
pub struct ManifestParser {
    filename: String,
}

impl Default for ManifestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestParser {
    pub fn new() -> Self {
        Self {
            filename: MANIFEST_FILENAME.to_string(),
        }
    }

    /// Use a different manifest filename when composing inner locations.
    pub fn with_filename(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Whether the manifest carries at least one redirect directive.
    pub fn has_redirects(&self, content: &str) -> bool {
        content
            .lines()
            .map(|line| strip_comment(line).trim())
            .any(|line| split_directive(line).0 == REDIRECT_KEYWORD)
    }

    /// Declared dependencies in line order.
    pub fn parse_dependencies(&self, content: &str) -> Vec<DependencyIdentifier> {
        let mut parsed = ParsedManifest::default();
        self.scan(content, None, &mut parsed);
        parsed.dependencies
    }

    /// Inner manifest URLs reachable from the redirect directives.
    pub fn parse_inner_manifests(&self, content: &str, base: &InnerManifestBase) -> Vec<String> {
        self.parse(content, base).inner_manifests
    }

    /// Parse dependencies and inner manifest locations in one pass.
    pub fn parse(&self, content: &str, base: &InnerManifestBase) -> ParsedManifest {
        let mut parsed = ParsedManifest::default();
        self.scan(content, Some(base), &mut parsed);
        parsed
    }

    fn scan(&self, content: &str, base: Option<&InnerManifestBase>, out: &mut ParsedManifest) {
        let mut block = Block::None;

        for raw in content.lines() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }

            if block != Block::None {
                if line.starts_with(')') {
                    block = Block::None;
                    continue;
                }
                match block {
                    Block::Require => self.push_dependency(line, out),
                    Block::Replace => self.push_redirect(line, base, out),
                    _ => {}
                }
                continue;
            }

            let (keyword, rest) = split_directive(line);
            let opens_block = rest.starts_with('(');
            let inline = rest.trim_start_matches('(').trim();

            match keyword {
                DEPENDENCY_KEYWORD => {
                    if opens_block {
                        block = Block::Require;
                    }
                    if !inline.is_empty() && inline != ")" {
                        self.push_dependency(inline.trim_end_matches(')'), out);
                    }
                }
                REDIRECT_KEYWORD => {
                    if opens_block {
                        block = Block::Replace;
                    }
                    if !inline.is_empty() && inline != ")" {
                        self.push_redirect(inline.trim_end_matches(')'), base, out);
                    }
                }
                _ if opens_block => block = Block::Other,
                _ => {}
            }

            // `require ( a v1 )` on a single line closes immediately
            if opens_block && rest.trim_end().ends_with(')') && rest.trim() != "(" {
                block = Block::None;
            }
        }
    }

    fn push_dependency(&self, entry: &str, out: &mut ParsedManifest) {
        let mut tokens = entry.split_whitespace();
        let Some(module) = tokens.next() else {
            return;
        };
        if let Some(id) = DependencyIdentifier::from_module(module, tokens.next()) {
            out.dependencies.push(id);
        }
    }

    fn push_redirect(
        &self,
        entry: &str,
        base: Option<&InnerManifestBase>,
        out: &mut ParsedManifest,
    ) {
        let Some(base) = base else {
            return;
        };

        let Some((_, target)) = entry.split_once(ARROW) else {
            debug!(line = entry, "redirect line without arrow, skipping");
            out.skipped_redirects.push(entry.to_string());
            return;
        };

        match inner_manifest_dir(target) {
            Some(dir) => out
                .inner_manifests
                .push(base.manifest_url(&dir, &self.filename)),
            None => debug!(target = target.trim(), "redirect does not point inside the tree"),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Remove a trailing `//` comment.
fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Split a line into its leading keyword and the remainder.
fn split_directive(line: &str) -> (&str, &str) {
    let end = line
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(line.len());
    (&line[..end], line[end..].trim_start())
}

/// Turn a redirect target into a directory inside the repository.
///
/// Only `./`-relative targets qualify. The leading dot is removed and all
/// whitespace is dropped, so `./sub/mod` becomes `/sub/mod`.
fn inner_manifest_dir(target: &str) -> Option<String> {
    let target = target.trim();
    let relative = target.strip_prefix('.')?;
    if !relative.starts_with('/') {
        return None;
    }

    let dir: String = relative.chars().filter(|c| !c.is_whitespace()).collect();
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        // `./` points back at the outer manifest
        return None;
    }
    Some(dir.to_string())
}

// ============================================================================
// Tests
// ============================================================================
