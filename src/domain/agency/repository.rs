use async_trait::async_trait;

use super::model::Agency;
use crate::shared::DomainResult;

#[async_trait]
pub trait AgencyRepository: Send + Sync {
    async fn save(&self, agency: Agency) -> DomainResult<Agency>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Agency>>;

    async fn find_by_connected_account(&self, account_id: &str) -> DomainResult<Option<Agency>>;

    /// Persist capability/authorization changes of an existing agency.
    async fn update(&self, agency: &Agency) -> DomainResult<()>;
}
