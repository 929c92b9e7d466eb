//! Shared fixtures for unit tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectOptions, Database,
    DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use sea_orm_migration::MigratorTrait;

use crate::application::commands::CommandSender;
use crate::application::events::{EventBus, SharedEventBus};
use crate::application::handlers::GatewayServices;
use crate::application::services::{ChargingService, SettlementEngine, StationService};
use crate::application::session::{SessionRegistry, SharedSessionRegistry};
use crate::config::{PricingConfig, SettlementConfig};
use crate::domain::audit::{AuditEntry, AuditLogger};
use crate::domain::{DomainResult, RepositoryProvider};
use crate::infrastructure::SeaOrmRepositoryProvider;
use crate::infrastructure::database::entities::{
    charging_station, electricity_price, user, vehicle,
};
use crate::infrastructure::database::migrator::Migrator;

/// Migrated in-memory SQLite. One connection, since every connection to
/// `sqlite::memory:` opens a separate database.
pub async fn memory_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn seed_station(db: &DatabaseConnection, code: &str) -> i32 {
    charging_station::ActiveModel {
        id: NotSet,
        station_code: Set(code.to_string()),
        name: Set(Some(format!("Station {code}"))),
        status: Set("offline".to_string()),
        vendor: Set(None),
        model: Set(None),
        serial_number: Set(None),
        firmware_version: Set(None),
        last_heartbeat: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

pub async fn set_station_heartbeat(db: &DatabaseConnection, code: &str, at: DateTime<Utc>) {
    let model = charging_station::Entity::find()
        .filter(charging_station::Column::StationCode.eq(code))
        .one(db)
        .await
        .unwrap()
        .unwrap();
    let mut active: charging_station::ActiveModel = model.into();
    active.last_heartbeat = Set(Some(at));
    active.update(db).await.unwrap();
}

pub async fn station_status(db: &DatabaseConnection, code: &str) -> String {
    charging_station::Entity::find()
        .filter(charging_station::Column::StationCode.eq(code))
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .status
}

/// Active user with `balance` satang in the wallet.
pub async fn seed_user(db: &DatabaseConnection, email: &str, balance: i64) -> i32 {
    user::ActiveModel {
        id: NotSet,
        email: Set(email.to_string()),
        full_name: Set(None),
        status: Set("active".to_string()),
        wallet_balance: Set(balance),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

pub async fn set_user_status(db: &DatabaseConnection, user_id: i32, status: &str) {
    let model = user::Entity::find_by_id(user_id).one(db).await.unwrap().unwrap();
    let mut active: user::ActiveModel = model.into();
    active.status = Set(status.to_string());
    active.update(db).await.unwrap();
}

pub async fn wallet_balance(db: &DatabaseConnection, user_id: i32) -> i64 {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .wallet_balance
}

pub async fn seed_vehicle(
    db: &DatabaseConnection,
    user_id: i32,
    plate: &str,
    status: &str,
    created_at: DateTime<Utc>,
) -> i32 {
    vehicle::ActiveModel {
        id: NotSet,
        user_id: Set(user_id),
        license_plate: Set(plate.to_string()),
        status: Set(status.to_string()),
        created_at: Set(created_at),
    }
    .insert(db)
    .await
    .unwrap()
    .id
}

/// `price` is in satang per kWh.
pub async fn seed_price(
    db: &DatabaseConnection,
    source: &str,
    price: i64,
    status: &str,
    effective_date: DateTime<Utc>,
) {
    electricity_price::ActiveModel {
        id: NotSet,
        source_type: Set(source.to_string()),
        price_per_kwh: Set(price),
        status: Set(status.to_string()),
        effective_date: Set(effective_date),
    }
    .insert(db)
    .await
    .unwrap();
}

/// Keeps entries in memory so tests can inspect the audit trail.
#[derive(Default)]
pub struct RecordingAuditLogger {
    entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAuditLogger {
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditLogger for RecordingAuditLogger {
    async fn record(&self, entry: AuditEntry) -> DomainResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

/// Everything a connection handler needs, wired against `db`.
pub struct TestGateway {
    pub services: Arc<GatewayServices>,
    pub sessions: SharedSessionRegistry,
    pub audit: Arc<RecordingAuditLogger>,
    pub bus: SharedEventBus,
}

pub fn gateway(db: &DatabaseConnection) -> TestGateway {
    let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
    let bus = Arc::new(EventBus::new());
    let audit = Arc::new(RecordingAuditLogger::default());
    let sessions = SessionRegistry::shared();
    let settlement = Arc::new(SettlementEngine::new(
        repos.clone(),
        &PricingConfig::default(),
        &SettlementConfig::default(),
    ));

    let services = Arc::new(GatewayServices {
        charging: Arc::new(ChargingService::new(repos.clone(), settlement, bus.clone())),
        stations: Arc::new(StationService::new(repos, bus.clone())),
        commands: Arc::new(CommandSender::new(
            sessions.clone(),
            audit.clone(),
            bus.clone(),
            Duration::from_secs(30),
        )),
        audit: audit.clone(),
        event_bus: bus.clone(),
        heartbeat_interval: 300,
    });

    TestGateway {
        services,
        sessions,
        audit,
        bus,
    }
}
