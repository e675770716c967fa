//! SQLite Schema Definitions for the Repository Store
//!
//! One table, one row per tracked repository. Counts and sizes are TEXT so a
//! blank value ("not yet known") is distinct from a measured zero.

/// Schema version stored in `store_metadata`
pub const STORE_SCHEMA_VERSION: &str = "1.0";

/// SQL to create the repositories table
///
/// `name` is intentionally not UNIQUE: duplicate rows can appear and are
/// removed by the dedup pass.
pub const SCHEMA_CREATE_REPOSITORIES: &str = r#"
CREATE TABLE IF NOT EXISTS repositories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    url TEXT NOT NULL DEFAULT '',
    repository_type TEXT NOT NULL DEFAULT '',

    -- Metadata (text-encoded counts)
    open_issue_count TEXT NOT NULL DEFAULT '',
    closed_issue_count TEXT NOT NULL DEFAULT '',
    commit_count TEXT NOT NULL DEFAULT '',
    stargazer_count TEXT NOT NULL DEFAULT '',
    creation_date TEXT NOT NULL DEFAULT '',
    license_info TEXT NOT NULL DEFAULT '',
    latest_release TEXT NOT NULL DEFAULT '',
    primary_language TEXT NOT NULL DEFAULT '',
    language_bytes TEXT NOT NULL DEFAULT '',

    -- Sizes (blank until computed)
    original_codebase_size TEXT NOT NULL DEFAULT '',
    library_codebase_size TEXT NOT NULL DEFAULT ''
)
"#;

/// SQL to create indexes
pub const SCHEMA_CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_repositories_name ON repositories(name);
"#;

/// SQL to create the metadata table
pub const SCHEMA_CREATE_METADATA: &str = r#"
CREATE TABLE IF NOT EXISTS store_metadata (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)
"#;

/// Column names for repository queries (in order for row mapping)
pub const REPOSITORY_COLUMNS: &str = "id, name, url, repository_type, open_issue_count, \
     closed_issue_count, commit_count, stargazer_count, creation_date, license_info, \
     latest_release, primary_language, language_bytes, original_codebase_size, \
     library_codebase_size";
