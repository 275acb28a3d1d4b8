//! Source text port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Document;

/// A remote text API keyed by canonical reference.
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Source name, recorded in the corpus snapshot.
    fn name(&self) -> &'static str;

    /// Fetch a reference and flatten it into one document per leaf section.
    ///
    /// An unknown reference is `DomainError::NotFound`.
    async fn fetch(&self, reference: &str) -> DomainResult<Vec<Document>>;
}
