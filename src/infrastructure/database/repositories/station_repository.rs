//! SeaORM implementation of StationRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use super::db_err;
use crate::domain::station::{Station, StationInfo, StationRepository, StationStatus};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::charging_station;

pub struct SeaOrmStationRepository {
    db: DatabaseConnection,
}

impl SeaOrmStationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn station_from_model(model: charging_station::Model) -> Station {
    Station {
        id: model.id,
        code: model.station_code,
        name: model.name,
        status: StationStatus::parse(&model.status),
        vendor: model.vendor,
        model: model.model,
        serial_number: model.serial_number,
        firmware_version: model.firmware_version,
        last_heartbeat: model.last_heartbeat,
    }
}

#[async_trait]
impl StationRepository for SeaOrmStationRepository {
    async fn find_by_code(&self, code: &str) -> DomainResult<Option<Station>> {
        let model = charging_station::Entity::find()
            .filter(charging_station::Column::StationCode.eq(code))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(station_from_model))
    }

    async fn find_all(&self) -> DomainResult<Vec<Station>> {
        let models = charging_station::Entity::find()
            .order_by_asc(charging_station::Column::StationCode)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(station_from_model).collect())
    }

    async fn update_status(&self, code: &str, status: StationStatus) -> DomainResult<bool> {
        let result = charging_station::Entity::update_many()
            .col_expr(charging_station::Column::Status, Expr::value(status.as_str()))
            .col_expr(charging_station::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(charging_station::Column::StationCode.eq(code))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn touch_heartbeat(&self, code: &str, at: DateTime<Utc>) -> DomainResult<bool> {
        let result = charging_station::Entity::update_many()
            .col_expr(charging_station::Column::LastHeartbeat, Expr::value(at))
            .filter(charging_station::Column::StationCode.eq(code))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn update_info(
        &self,
        code: &str,
        info: &StationInfo,
        at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let result = charging_station::Entity::update_many()
            .col_expr(charging_station::Column::Vendor, Expr::value(info.vendor.clone()))
            .col_expr(charging_station::Column::Model, Expr::value(info.model.clone()))
            .col_expr(
                charging_station::Column::SerialNumber,
                Expr::value(info.serial_number.clone()),
            )
            .col_expr(
                charging_station::Column::FirmwareVersion,
                Expr::value(info.firmware_version.clone()),
            )
            .col_expr(charging_station::Column::LastHeartbeat, Expr::value(at))
            .col_expr(charging_station::Column::UpdatedAt, Expr::value(at))
            .filter(charging_station::Column::StationCode.eq(code))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_db, seed_station};

    #[tokio::test]
    async fn updates_status_and_heartbeat_by_code() {
        let db = memory_db().await;
        seed_station(&db, "ST-001").await;
        let repo = SeaOrmStationRepository::new(db);

        assert!(repo.update_status("ST-001", StationStatus::Available).await.unwrap());
        let at = Utc::now();
        assert!(repo.touch_heartbeat("ST-001", at).await.unwrap());

        let station = repo.find_by_code("ST-001").await.unwrap().unwrap();
        assert_eq!(station.status, StationStatus::Available);
        assert_eq!(
            station.last_heartbeat.map(|t| t.timestamp()),
            Some(at.timestamp())
        );
    }

    #[tokio::test]
    async fn unknown_station_updates_nothing() {
        let db = memory_db().await;
        let repo = SeaOrmStationRepository::new(db);
        assert!(!repo.update_status("NOPE", StationStatus::Offline).await.unwrap());
        assert!(repo.find_by_code("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stores_boot_information() {
        let db = memory_db().await;
        seed_station(&db, "ST-002").await;
        let repo = SeaOrmStationRepository::new(db);

        let info = StationInfo {
            vendor: "ABB".into(),
            model: "Terra AC".into(),
            serial_number: Some("SN-9".into()),
            firmware_version: None,
        };
        assert!(repo.update_info("ST-002", &info, Utc::now()).await.unwrap());

        let station = repo.find_by_code("ST-002").await.unwrap().unwrap();
        assert_eq!(station.vendor.as_deref(), Some("ABB"));
        assert_eq!(station.serial_number.as_deref(), Some("SN-9"));
        assert!(station.last_heartbeat.is_some());
    }
}
