//! The `all` resource: a declared set of repositories for the provider's owner
//!
//! Create, read and update all refresh the state through [`reconcile`]; delete is
//! a no-op because nothing on GitHub is ever modified.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::github::{GitHubClient, RepositoryLister};
use crate::provider::ResolvedConfig;
use crate::reconcile::{reconcile, DesiredRepoSet, FetchError};

/// Provider type name
pub const PROVIDER_TYPE_NAME: &str = "githubrepos";

/// Stored state for the resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepositorySetState {
    pub repos: DesiredRepoSet,
}

/// Failure of a lifecycle operation
#[derive(Debug, Error)]
#[error("Error Reading GitHub Repositories: Could not read GitHub repositories: {0}")]
pub struct ResourceError(#[from] pub FetchError);

/// Lifecycle hooks for the `<provider>_all` resource
pub struct AllRepositories<L = GitHubClient> {
    owner: String,
    client: L,
}

impl AllRepositories<GitHubClient> {
    /// Bind the resource to an activation's resolved configuration
    pub fn configure(config: &ResolvedConfig) -> Self {
        Self::new(config.owner(), config.client().clone())
    }
}

impl<L: RepositoryLister> AllRepositories<L> {
    pub fn new(owner: impl Into<String>, client: L) -> Self {
        Self {
            owner: owner.into(),
            client,
        }
    }

    /// Resource type name, e.g. `githubrepos_all`
    pub fn type_name() -> String {
        format!("{}_all", PROVIDER_TYPE_NAME)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub async fn create(
        &self,
        plan: RepositorySetState,
    ) -> Result<RepositorySetState, ResourceError> {
        debug!("Creating {}", Self::type_name());
        self.refresh(plan).await
    }

    pub async fn read(
        &self,
        state: RepositorySetState,
    ) -> Result<RepositorySetState, ResourceError> {
        self.refresh(state).await
    }

    pub async fn update(
        &self,
        plan: RepositorySetState,
    ) -> Result<RepositorySetState, ResourceError> {
        debug!("Updating {}", Self::type_name());
        self.refresh(plan).await
    }

    /// Forget the resource; GitHub is not touched
    pub fn delete(&self, state: RepositorySetState) {
        debug!(tracked = state.repos.len(), "Deleting {}", Self::type_name());
    }

    async fn refresh(
        &self,
        mut state: RepositorySetState,
    ) -> Result<RepositorySetState, ResourceError> {
        reconcile(&self.owner, &self.client, &mut state.repos).await?;
        Ok(state)
    }
}
