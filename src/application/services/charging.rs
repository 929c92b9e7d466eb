//! Charging session state machine: authorize, start and stop

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use tracing::{error, info, warn};

use crate::application::events::{
    AuthorizationEvent, Event, SharedEventBus, TransactionCompletedEvent, TransactionStartedEvent,
};
use crate::application::services::settlement::SettlementEngine;
use crate::domain::pricing::model::wh_to_kwh;
use crate::domain::transaction::DEFAULT_STOP_REASON;
use crate::domain::{DomainError, DomainResult, NewTransaction, RepositoryProvider, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizeOutcome {
    Accepted,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Accepted {
        /// External id handed to the station
        transaction_id: i32,
        code: String,
    },
    /// Unknown id tag
    Invalid,
    /// Known id tag, but the session could not be opened
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Accepted,
    /// No open transaction with that id
    Invalid,
    /// Settlement failed; the transaction stays as it was
    Blocked,
}

#[derive(Debug, Clone)]
pub struct StartRequest {
    pub connector_id: u32,
    pub id_tag: String,
    pub meter_start_wh: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StopRequest {
    pub transaction_id: i32,
    pub meter_stop_wh: i64,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

pub struct ChargingService {
    repos: Arc<dyn RepositoryProvider>,
    settlement: Arc<SettlementEngine>,
    event_bus: SharedEventBus,
}

impl ChargingService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        settlement: Arc<SettlementEngine>,
        event_bus: SharedEventBus,
    ) -> Self {
        Self {
            repos,
            settlement,
            event_bus,
        }
    }

    /// An id tag is either a numeric user id (active users only) or an email.
    async fn resolve_user(&self, id_tag: &str) -> DomainResult<Option<User>> {
        let users = self.repos.users();
        if let Ok(id) = id_tag.trim().parse::<i32>() {
            if let Some(user) = users.find_active_by_id(id).await? {
                return Ok(Some(user));
            }
        }
        users.find_by_email(id_tag).await
    }

    pub async fn authorize(&self, station_code: &str, id_tag: &str) -> DomainResult<AuthorizeOutcome> {
        let outcome = match self.resolve_user(id_tag).await? {
            Some(user) if user.can_charge() => AuthorizeOutcome::Accepted,
            _ => AuthorizeOutcome::Invalid,
        };

        info!(station_code, id_tag, ?outcome, "Authorize");
        self.event_bus
            .publish(Event::AuthorizationResult(AuthorizationEvent {
                station_code: station_code.to_string(),
                id_tag: id_tag.to_string(),
                status: format!("{:?}", outcome),
                timestamp: Utc::now(),
            }));
        Ok(outcome)
    }

    pub async fn start(&self, station_code: &str, request: StartRequest) -> StartOutcome {
        let user = match self.resolve_user(&request.id_tag).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                info!(station_code, id_tag = request.id_tag.as_str(), "Unknown id tag");
                return StartOutcome::Invalid;
            }
            Err(e) => {
                error!(station_code, error = %e, "Failed to resolve id tag");
                return StartOutcome::Blocked;
            }
        };

        match self.open_session(station_code, &user, &request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    station_code,
                    user_id = user.id,
                    error = %e,
                    "Error starting transaction"
                );
                StartOutcome::Blocked
            }
        }
    }

    async fn open_session(
        &self,
        station_code: &str,
        user: &User,
        request: &StartRequest,
    ) -> DomainResult<StartOutcome> {
        let Some(station) = self.repos.stations().find_by_code(station_code).await? else {
            warn!(station_code, "StartTransaction from unregistered station");
            return Ok(StartOutcome::Blocked);
        };

        let Some(vehicle) = self.repos.users().find_latest_active_vehicle(user.id).await? else {
            warn!(station_code, user_id = user.id, "No vehicle registered for user");
            return Ok(StartOutcome::Blocked);
        };

        let started_at = Utc::now();
        let start_meter_kwh = wh_to_kwh(request.meter_start_wh);

        let transaction = self
            .repos
            .transactions()
            .open(NewTransaction {
                user_id: user.id,
                vehicle_id: vehicle.id,
                station_id: station.id,
                start_time: started_at,
                start_meter_kwh,
                day: started_at.with_timezone(&Local).date_naive(),
            })
            .await?;
        let external_id = transaction.external_id.unwrap_or(transaction.id);

        info!(
            station_code,
            user_id = user.id,
            transaction_code = transaction.code.as_str(),
            external_id,
            "Transaction started"
        );
        self.event_bus
            .publish(Event::TransactionStarted(TransactionStartedEvent {
                station_code: station_code.to_string(),
                connector_id: request.connector_id,
                transaction_id: transaction.id,
                transaction_code: transaction.code.clone(),
                external_transaction_id: external_id,
                user_id: user.id,
                meter_start_kwh: start_meter_kwh.to_string(),
                timestamp: request.timestamp,
            }));

        Ok(StartOutcome::Accepted {
            transaction_id: external_id,
            code: transaction.code,
        })
    }

    pub async fn stop(&self, station_code: &str, request: StopRequest) -> StopOutcome {
        let transaction = match self
            .repos
            .transactions()
            .find_open_by_external_id(request.transaction_id)
            .await
        {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                info!(
                    station_code,
                    external_id = request.transaction_id,
                    "StopTransaction for unknown transaction"
                );
                return StopOutcome::Invalid;
            }
            Err(e) => {
                error!(station_code, error = %e, "Failed to look up transaction");
                return StopOutcome::Blocked;
            }
        };

        let stop_reason = request
            .reason
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(|| DEFAULT_STOP_REASON.to_string());
        let end_meter_kwh = wh_to_kwh(request.meter_stop_wh);

        match self
            .settlement
            .settle(&transaction, end_meter_kwh, &stop_reason, Utc::now())
            .await
        {
            Ok(done) => {
                let cost = done.settlement.cost;
                self.event_bus
                    .publish(Event::TransactionCompleted(TransactionCompletedEvent {
                        station_code: station_code.to_string(),
                        transaction_id: transaction.id,
                        external_transaction_id: request.transaction_id,
                        energy_kwh: done.settlement.energy_kwh.to_string(),
                        solar_cost: cost.solar_cost.to_string(),
                        pea_cost: cost.pea_cost.to_string(),
                        total_cost: cost.total_cost.to_string(),
                        stop_reason,
                        timestamp: request.timestamp,
                    }));
                StopOutcome::Accepted
            }
            Err(DomainError::TransactionNotOpen(id)) => {
                info!(
                    station_code,
                    transaction_id = id,
                    "Transaction closed by a concurrent stop"
                );
                StopOutcome::Invalid
            }
            Err(e) => {
                error!(
                    station_code,
                    transaction_id = transaction.id,
                    error = %e,
                    "Error stopping transaction"
                );
                StopOutcome::Blocked
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::EventBus;
    use crate::application::services::station::{StationService, StatusReport};
    use crate::config::{PricingConfig, SettlementConfig};
    use crate::domain::TransactionStatus;
    use crate::infrastructure::database::entities::charging_transaction;
    use crate::infrastructure::SeaOrmRepositoryProvider;
    use crate::test_support::{
        memory_db, seed_station, seed_user, seed_vehicle, set_user_status, station_status,
        wallet_balance,
    };
    use sea_orm::{DatabaseConnection, EntityTrait};

    struct Fixture {
        db: DatabaseConnection,
        repos: Arc<dyn RepositoryProvider>,
        service: ChargingService,
        bus: SharedEventBus,
        user_id: i32,
    }

    async fn fixture(balance: i64, with_vehicle: bool) -> Fixture {
        let db = memory_db().await;
        seed_station(&db, "ST-001").await;
        let user_id = seed_user(&db, "driver@example.com", balance).await;
        if with_vehicle {
            seed_vehicle(&db, user_id, "1AB-234", "active", Utc::now()).await;
        }
        let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let bus = Arc::new(EventBus::new());
        let settlement = Arc::new(SettlementEngine::new(
            repos.clone(),
            &PricingConfig::default(),
            &SettlementConfig::default(),
        ));
        let service = ChargingService::new(repos.clone(), settlement, bus.clone());
        Fixture {
            db,
            repos,
            service,
            bus,
            user_id,
        }
    }

    fn start_request(id_tag: &str, meter_start_wh: i64) -> StartRequest {
        StartRequest {
            connector_id: 1,
            id_tag: id_tag.into(),
            meter_start_wh,
            timestamp: Utc::now(),
        }
    }

    fn stop_request(transaction_id: i32, meter_stop_wh: i64) -> StopRequest {
        StopRequest {
            transaction_id,
            meter_stop_wh,
            timestamp: Utc::now(),
            reason: Some("EVDisconnected".into()),
        }
    }

    #[tokio::test]
    async fn accepted_start_opens_one_preparing_transaction() {
        let f = fixture(10_000, true).await;
        let mut events = f.bus.subscribe();

        let outcome = f
            .service
            .start("ST-001", start_request(&f.user_id.to_string(), 1_000))
            .await;
        let StartOutcome::Accepted { transaction_id, code } = outcome else {
            panic!("expected Accepted, got {outcome:?}");
        };
        assert!(code.starts_with("TX"));
        assert_eq!(code.len(), 14);

        let rows = charging_transaction::Entity::find().all(&f.db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "preparing");
        assert_eq!(rows[0].external_transaction_id, Some(transaction_id));
        assert_eq!(rows[0].start_meter_value, 1.0);
        assert_eq!(station_status(&f.db, "ST-001").await, "occupied");

        let event = events.try_recv().unwrap();
        assert_eq!(event.event.event_type(), "transaction_started");
    }

    #[tokio::test]
    async fn email_id_tag_is_accepted() {
        let f = fixture(10_000, true).await;
        let outcome = f
            .service
            .start("ST-001", start_request("driver@example.com", 0))
            .await;
        assert!(matches!(outcome, StartOutcome::Accepted { .. }));
    }

    #[tokio::test]
    async fn unknown_id_tag_is_invalid() {
        let f = fixture(10_000, true).await;
        let outcome = f.service.start("ST-001", start_request("999", 0)).await;
        assert_eq!(outcome, StartOutcome::Invalid);
        assert!(charging_transaction::Entity::find().all(&f.db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn user_without_vehicle_is_blocked() {
        let f = fixture(10_000, false).await;
        let outcome = f
            .service
            .start("ST-001", start_request(&f.user_id.to_string(), 0))
            .await;
        assert_eq!(outcome, StartOutcome::Blocked);
        assert!(charging_transaction::Entity::find().all(&f.db).await.unwrap().is_empty());
        assert_eq!(station_status(&f.db, "ST-001").await, "offline");
    }

    #[tokio::test]
    async fn unregistered_station_is_blocked() {
        let f = fixture(10_000, true).await;
        let outcome = f
            .service
            .start("ST-999", start_request(&f.user_id.to_string(), 0))
            .await;
        assert_eq!(outcome, StartOutcome::Blocked);
    }

    #[tokio::test]
    async fn second_start_on_occupied_station_is_blocked() {
        let f = fixture(10_000, true).await;
        let tag = f.user_id.to_string();
        assert!(matches!(
            f.service.start("ST-001", start_request(&tag, 0)).await,
            StartOutcome::Accepted { .. }
        ));
        assert_eq!(
            f.service.start("ST-001", start_request(&tag, 0)).await,
            StartOutcome::Blocked
        );
        assert_eq!(charging_transaction::Entity::find().all(&f.db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stop_settles_and_lowercases_reason() {
        let f = fixture(10_000, true).await;
        let StartOutcome::Accepted { transaction_id, .. } = f
            .service
            .start("ST-001", start_request(&f.user_id.to_string(), 1_000))
            .await
        else {
            panic!("start rejected");
        };

        let outcome = f.service.stop("ST-001", stop_request(transaction_id, 11_000)).await;
        assert_eq!(outcome, StopOutcome::Accepted);

        let rows = charging_transaction::Entity::find().all(&f.db).await.unwrap();
        assert_eq!(rows[0].status, TransactionStatus::Completed.as_str());
        assert_eq!(rows[0].energy_delivered, Some(10.0));
        assert_eq!(rows[0].total_cost, Some(4_150));
        assert_eq!(rows[0].stop_reason.as_deref(), Some("evdisconnected"));
        assert_eq!(wallet_balance(&f.db, f.user_id).await, 5_850);
        assert_eq!(station_status(&f.db, "ST-001").await, "available");

        // Already completed
        let again = f.service.stop("ST-001", stop_request(transaction_id, 11_000)).await;
        assert_eq!(again, StopOutcome::Invalid);
    }

    #[tokio::test]
    async fn concurrent_stops_settle_once() {
        let f = fixture(10_000, true).await;
        let StartOutcome::Accepted { transaction_id, .. } = f
            .service
            .start("ST-001", start_request(&f.user_id.to_string(), 0))
            .await
        else {
            panic!("start rejected");
        };

        let (a, b) = tokio::join!(
            f.service.stop("ST-001", stop_request(transaction_id, 10_000)),
            f.service.stop("ST-001", stop_request(transaction_id, 10_000)),
        );
        let mut outcomes = [a, b];
        outcomes.sort_by_key(|o| *o != StopOutcome::Accepted);
        assert_eq!(outcomes, [StopOutcome::Accepted, StopOutcome::Invalid]);
        assert_eq!(wallet_balance(&f.db, f.user_id).await, 10_000 - 4_150);
    }

    #[tokio::test]
    async fn faulted_connector_is_still_billed_on_stop() {
        let f = fixture(10_000, true).await;
        let stations = StationService::new(f.repos.clone(), f.bus.clone());
        let StartOutcome::Accepted { transaction_id, .. } = f
            .service
            .start("ST-001", start_request(&f.user_id.to_string(), 0))
            .await
        else {
            panic!("start rejected");
        };

        stations
            .status_notification(
                "ST-001",
                StatusReport {
                    connector_id: 1,
                    status: "Faulted".into(),
                    error_code: Some("GroundFailure".into()),
                },
            )
            .await
            .unwrap();

        let outcome = f.service.stop("ST-001", stop_request(transaction_id, 10_000)).await;
        assert_eq!(outcome, StopOutcome::Accepted);
        assert_eq!(wallet_balance(&f.db, f.user_id).await, 10_000 - 4_150);

        let rows = charging_transaction::Entity::find().all(&f.db).await.unwrap();
        assert_eq!(rows[0].status, TransactionStatus::Completed.as_str());
        assert_eq!(rows[0].energy_delivered, Some(10.0));
    }

    #[tokio::test]
    async fn stop_for_unknown_transaction_is_invalid() {
        let f = fixture(10_000, true).await;
        assert_eq!(
            f.service.stop("ST-001", stop_request(123, 5_000)).await,
            StopOutcome::Invalid
        );
    }

    #[tokio::test]
    async fn short_wallet_blocks_stop_and_keeps_transaction_open() {
        let f = fixture(1_000, true).await;
        let StartOutcome::Accepted { transaction_id, .. } = f
            .service
            .start("ST-001", start_request(&f.user_id.to_string(), 0))
            .await
        else {
            panic!("start rejected");
        };

        let outcome = f.service.stop("ST-001", stop_request(transaction_id, 10_000)).await;
        assert_eq!(outcome, StopOutcome::Blocked);

        let open = f
            .repos
            .transactions()
            .find_open_by_external_id(transaction_id)
            .await
            .unwrap();
        assert!(open.is_some());
        assert_eq!(wallet_balance(&f.db, f.user_id).await, 1_000);
    }

    #[tokio::test]
    async fn authorize_requires_active_user_with_balance() {
        let f = fixture(10_000, true).await;
        let tag = f.user_id.to_string();
        assert_eq!(
            f.service.authorize("ST-001", &tag).await.unwrap(),
            AuthorizeOutcome::Accepted
        );
        assert_eq!(
            f.service.authorize("ST-001", "nobody@example.com").await.unwrap(),
            AuthorizeOutcome::Invalid
        );

        set_user_status(&f.db, f.user_id, "suspended").await;
        assert_eq!(
            f.service.authorize("ST-001", "driver@example.com").await.unwrap(),
            AuthorizeOutcome::Invalid
        );
    }

    #[tokio::test]
    async fn authorize_rejects_empty_wallet() {
        let f = fixture(0, true).await;
        assert_eq!(
            f.service.authorize("ST-001", "driver@example.com").await.unwrap(),
            AuthorizeOutcome::Invalid
        );
    }
}
