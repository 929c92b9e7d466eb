use async_trait::async_trait;

use super::model::{User, Vehicle};
use crate::domain::DomainResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Only users whose status is `active` are returned.
    async fn find_active_by_id(&self, id: i32) -> DomainResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    /// The most recently registered active vehicle of the user.
    async fn find_latest_active_vehicle(&self, user_id: i32) -> DomainResult<Option<Vehicle>>;
}
