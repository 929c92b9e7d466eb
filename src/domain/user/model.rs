//! User and vehicle entities, as far as the gateway reads them

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "suspended" => Self::Suspended,
            _ => Self::Inactive,
        }
    }
}

/// Account holder with a prepaid wallet
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    /// Contact address; doubles as an id tag
    pub email: String,
    pub full_name: Option<String>,
    pub status: UserStatus,
    pub wallet_balance: Decimal,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// A user may charge only while active and holding a positive balance.
    pub fn can_charge(&self) -> bool {
        self.is_active() && self.wallet_balance > Decimal::ZERO
    }
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: i32,
    pub user_id: i32,
    pub license_plate: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
