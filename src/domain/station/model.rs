//! Charging station domain entity

use chrono::{DateTime, Utc};

/// Station status as stored and shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StationStatus {
    Available,
    Occupied,
    #[default]
    Offline,
    Faulted,
}

impl StationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Offline => "offline",
            Self::Faulted => "faulted",
        }
    }

    /// Parse the stored representation. Unrecognized values read as offline.
    pub fn parse(s: &str) -> Self {
        match s {
            "available" => Self::Available,
            "occupied" => Self::Occupied,
            "faulted" => Self::Faulted,
            _ => Self::Offline,
        }
    }

    /// Map a connector status reported by the station (StatusNotification)
    /// onto the internal status. Anything unknown is treated as offline.
    pub fn from_ocpp(status: &str) -> Self {
        match status {
            "Available" | "Preparing" => Self::Available,
            "Charging" | "SuspendedEVSE" | "SuspendedEV" | "Finishing" | "Reserved" => {
                Self::Occupied
            }
            "Faulted" => Self::Faulted,
            _ => Self::Offline,
        }
    }
}

impl std::fmt::Display for StationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Charging station entity
#[derive(Debug, Clone)]
pub struct Station {
    pub id: i32,
    /// Code the station uses in its connection path
    pub code: String,
    pub name: Option<String>,
    pub status: StationStatus,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub firmware_version: Option<String>,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl Station {
    /// Seconds since the last heartbeat, or `None` if the station never sent one.
    pub fn silent_for(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_heartbeat
            .map(|hb| now.signed_duration_since(hb).num_seconds())
    }
}

/// Identification reported in BootNotification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationInfo {
    pub vendor: String,
    pub model: String,
    pub serial_number: Option<String>,
    pub firmware_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_reported_statuses() {
        assert_eq!(StationStatus::from_ocpp("Available"), StationStatus::Available);
        assert_eq!(StationStatus::from_ocpp("Preparing"), StationStatus::Available);
        assert_eq!(StationStatus::from_ocpp("Charging"), StationStatus::Occupied);
        assert_eq!(StationStatus::from_ocpp("SuspendedEV"), StationStatus::Occupied);
        assert_eq!(StationStatus::from_ocpp("SuspendedEVSE"), StationStatus::Occupied);
        assert_eq!(StationStatus::from_ocpp("Finishing"), StationStatus::Occupied);
        assert_eq!(StationStatus::from_ocpp("Reserved"), StationStatus::Occupied);
        assert_eq!(StationStatus::from_ocpp("Unavailable"), StationStatus::Offline);
        assert_eq!(StationStatus::from_ocpp("Faulted"), StationStatus::Faulted);
        assert_eq!(StationStatus::from_ocpp("Exploded"), StationStatus::Offline);
        assert_eq!(StationStatus::from_ocpp("charging"), StationStatus::Offline);
    }

    #[test]
    fn stored_status_round_trips() {
        for status in [
            StationStatus::Available,
            StationStatus::Occupied,
            StationStatus::Offline,
            StationStatus::Faulted,
        ] {
            assert_eq!(StationStatus::parse(status.as_str()), status);
        }
        assert_eq!(StationStatus::parse("maintenance"), StationStatus::Offline);
    }
}
