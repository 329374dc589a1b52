use async_trait::async_trait;

use crate::types::ContractDetail;

/// Source of per-contract detail data. Infallible by contract: failures
/// inside a fetch are logged and surface as empty fields, so a contract
/// always proceeds with whatever partial data was gathered.
#[async_trait]
pub trait DetailSource: Send + Sync {
    async fn fetch(&self, link: &str) -> ContractDetail;
}
