//! githubrepos - Declarative tracking of an organization's GitHub repositories
//!
//! A declared set of repository names is kept as desired state; the GitHub API
//! supplies each repository's numeric identifier. Nothing on GitHub is modified.
//!
//! ## Modules
//!
//! - [`config`]: Configuration file management and parsing
//! - [`provider`]: Resolution of the token and owner into a configured client
//! - [`github`]: GitHub API integration and paginated repository listing
//! - [`reconcile`]: Merging observed repository identifiers into desired state
//! - [`resource`]: Create/read/update/delete hooks for the `all` resource

pub mod config;
pub mod github;
pub mod provider;
pub mod reconcile;
pub mod resource;

pub use config::Config;
pub use github::{GitHubClient, RepositoryLister, RepositoryRecord, RequestError};
pub use provider::{resolve, ConnectionConfig, Diagnostics, EnvFallbacks, ResolvedConfig};
pub use reconcile::{reconcile, DesiredRepoSet, FetchError, RepoState};
pub use resource::{AllRepositories, RepositorySetState};
