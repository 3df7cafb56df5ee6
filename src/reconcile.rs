//! Repository reconciliation
//!
//! Fetches an account's complete repository listing and writes the observed
//! identifiers into the caller's desired set. The desired set decides *which*
//! repositories are tracked; the remote listing decides *their identifiers*.
//!
//! All pages are fetched before anything is merged, so a failure on any page
//! leaves the desired set untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::github::{ListRequest, RepositoryLister, RepositoryRecord, TransportError};

/// Observed state of one tracked repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepoState {
    pub id: Option<i64>,
}

/// Tracked repositories keyed by name
pub type DesiredRepoSet = BTreeMap<String, RepoState>;

/// A listing page could not be fetched
#[derive(Debug, Error)]
#[error("failed to list repositories for {account} (page {page}): {source}")]
pub struct FetchError {
    pub account: String,
    pub page: u32,
    #[source]
    pub source: TransportError,
}

/// Fetch every page of `account`'s repositories, ordered by full name.
///
/// Pages are requested one at a time until the listing reports no next page.
/// A next page that does not move past the current one is a failure.
pub async fn fetch_all_repositories<L>(
    account: &str,
    client: &L,
) -> Result<Vec<RepositoryRecord>, FetchError>
where
    L: RepositoryLister + ?Sized,
{
    let mut request = ListRequest::first(account);
    let mut repositories = Vec::new();

    loop {
        let current = request.page.unwrap_or(1);
        let fail = |source: TransportError| FetchError {
            account: account.to_string(),
            page: current,
            source,
        };

        let page = client.list_page(&request).await.map_err(fail)?;

        repositories.extend(page.records);

        match page.next_page {
            Some(next) if next <= current => {
                return Err(fail(
                    format!("listing reported next page {} after page {}", next, current).into(),
                ));
            }
            Some(next) => request.page = Some(next),
            None => break,
        }
    }

    Ok(repositories)
}

/// Overwrite the `id` of every desired entry that appears in `records`.
///
/// Never adds or removes keys. Returns the number of entries updated.
pub fn apply_listing(desired: &mut DesiredRepoSet, records: &[RepositoryRecord]) -> usize {
    let mut updated = 0;
    for record in records {
        if let Some(state) = desired.get_mut(&record.name) {
            state.id = Some(record.id);
            updated += 1;
        }
    }
    updated
}

/// Enrich `desired` with the identifiers observed for `account`.
pub async fn reconcile<L>(
    account: &str,
    client: &L,
    desired: &mut DesiredRepoSet,
) -> Result<(), FetchError>
where
    L: RepositoryLister + ?Sized,
{
    debug!(account, "Reading GitHub repositories");

    let repositories = fetch_all_repositories(account, client).await?;
    debug!(count = repositories.len(), "GitHub repos are read");

    let updated = apply_listing(desired, &repositories);
    debug!(
        updated,
        tracked = desired.len(),
        "Finished reading GitHub repositories"
    );

    Ok(())
}
