//! SeaORM implementation of UserRepository

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use super::db_err;
use crate::domain::pricing::model::from_minor_units;
use crate::domain::user::{User, UserRepository, UserStatus, Vehicle};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::{user, vehicle};

const ACTIVE: &str = "active";

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

pub(crate) fn user_from_model(model: user::Model) -> User {
    User {
        id: model.id,
        email: model.email,
        full_name: model.full_name,
        status: UserStatus::parse(&model.status),
        wallet_balance: from_minor_units(model.wallet_balance),
    }
}

fn vehicle_from_model(model: vehicle::Model) -> Vehicle {
    Vehicle {
        id: model.id,
        user_id: model.user_id,
        license_plate: model.license_plate,
        is_active: model.status == ACTIVE,
        created_at: model.created_at,
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn find_active_by_id(&self, id: i32) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id)
            .filter(user::Column::Status.eq(ACTIVE))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(user_from_model))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(user_from_model))
    }

    async fn find_latest_active_vehicle(&self, user_id: i32) -> DomainResult<Option<Vehicle>> {
        let model = vehicle::Entity::find()
            .filter(vehicle::Column::UserId.eq(user_id))
            .filter(vehicle::Column::Status.eq(ACTIVE))
            .order_by_desc(vehicle::Column::CreatedAt)
            .order_by_desc(vehicle::Column::Id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(vehicle_from_model))
    }
}
