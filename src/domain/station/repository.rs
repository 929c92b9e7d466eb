//! Station repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Station, StationInfo, StationStatus};
use crate::domain::DomainResult;

/// Update methods return `false` when no station has the given code.
#[async_trait]
pub trait StationRepository: Send + Sync {
    async fn find_by_code(&self, code: &str) -> DomainResult<Option<Station>>;
    async fn find_all(&self) -> DomainResult<Vec<Station>>;
    async fn update_status(&self, code: &str, status: StationStatus) -> DomainResult<bool>;
    async fn touch_heartbeat(&self, code: &str, at: DateTime<Utc>) -> DomainResult<bool>;
    async fn update_info(
        &self,
        code: &str,
        info: &StationInfo,
        at: DateTime<Utc>,
    ) -> DomainResult<bool>;
}
