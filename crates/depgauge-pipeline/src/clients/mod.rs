//! Remote service clients
//!
//! - [`GithubClient`]: repository metadata (GraphQL, bearer token)
//! - [`SourcegraphClient`]: repository discovery and outer manifests (GraphQL)
//! - [`RawContentClient`]: inner manifests (plain GET)
//!
//! All three share the retrying [`HttpClient`].

mod github;
mod http;
mod raw;
mod sourcegraph;

pub use github::GithubClient;
pub use http::HttpClient;
pub use raw::RawContentClient;
pub use sourcegraph::{BranchFile, SourcegraphClient};
