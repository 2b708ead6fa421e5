//! Backend gateway.
//!
//! Each operation performs its remote calls through the injected
//! [`Backend`](crate::backend::Backend) and returns a [`GatewayResult`]. Nothing
//! is swallowed: absence, rejection and transient failure all come back as
//! distinct [`ErrorKind`]s.

mod accounts;
pub mod compensation;
mod error;
mod posts;
mod saves;
pub mod tags;
mod users;

use serde::de::DeserializeOwned;

use crate::backend::{DocumentList, DynBackend};
use crate::config::{CollectionsConfig, FeedConfig};
use crate::models::Listing;

pub use self::compensation::{CleanupOutcome, Compensation, OrphanedFiles};
pub use self::error::{ErrorKind, GatewayError, GatewayResult};
pub use self::tags::normalize_tags;

pub struct Gateway {
    backend: DynBackend,
    collections: CollectionsConfig,
    feed: FeedConfig,
    orphans: OrphanedFiles,
}

impl Gateway {
    pub fn new(backend: DynBackend, collections: CollectionsConfig, feed: FeedConfig) -> Self {
        Self {
            backend,
            collections,
            feed,
            orphans: OrphanedFiles::default(),
        }
    }
}

fn decode_list<T: DeserializeOwned>(list: DocumentList) -> GatewayResult<Listing<T>> {
    let documents = list
        .documents
        .into_iter()
        .map(|doc| doc.into_model::<T>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Listing {
        documents,
        total: list.total,
    })
}

fn require(value: &str, what: &str) -> GatewayResult<()> {
    if value.trim().is_empty() {
        return Err(GatewayError::Invalid(format!("{} is required", what)));
    }
    Ok(())
}
