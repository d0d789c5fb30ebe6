// ── Dispatch alert domain types ──

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Emergency service that issued an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Fire,
    Ambulance,
    Police,
    /// KNRM lifeboat service.
    SeaRescue,
    /// Mobile medical team (trauma helicopter).
    AmbulanceHelicopter,
    /// A service code outside 1–5. Kept rather than rejected so a new
    /// service on the feed does not drop alerts.
    Unknown(i64),
}

impl ServiceType {
    /// Map the feed's `DII` code.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Fire,
            2 => Self::Ambulance,
            3 => Self::Police,
            4 => Self::SeaRescue,
            5 => Self::AmbulanceHelicopter,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Fire => 1,
            Self::Ambulance => 2,
            Self::Police => 3,
            Self::SeaRescue => 4,
            Self::AmbulanceHelicopter => 5,
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fire => f.write_str("Fire"),
            Self::Ambulance => f.write_str("Ambulance"),
            Self::Police => f.write_str("Police"),
            Self::SeaRescue => f.write_str("Sea rescue"),
            Self::AmbulanceHelicopter => f.write_str("Ambulance helicopter"),
            Self::Unknown(code) => write!(f, "Unknown ({code})"),
        }
    }
}

/// A paged unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capcode {
    /// Pager address.
    pub code: u32,
    /// Human-readable unit name, e.g. `"Brandweer Amsterdam-Amstelland TS 13-4531"`.
    pub unit_name: String,
}

/// One decoded dispatch event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Wall-clock time as reported by the feed (Dutch local time).
    pub time: NaiveDateTime,
    pub service: ServiceType,
    /// Origin code from the packed SPI string. 28 marks the trauma helicopter.
    pub origin_code: u8,
    /// Region code from the packed SPI string, when the feed sends one.
    pub region_code: Option<u8>,
    pub capcodes: Vec<Capcode>,
    /// 0.0 when the feed has no coordinates.
    pub latitude: f64,
    /// 0.0 when the feed has no coordinates.
    pub longitude: f64,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    /// Free text with address parts removed. Empty when the alert had none.
    pub message: String,
    pub is_priority: bool,
}

impl Alert {
    /// Whether the feed supplied coordinates.
    #[allow(clippy::float_cmp)]
    pub fn has_location(&self) -> bool {
        self.latitude != 0.0 || self.longitude != 0.0
    }

    /// Whether any paged unit has this capcode.
    pub fn pages(&self, code: u32) -> bool {
        self.capcodes.iter().any(|c| c.code == code)
    }
}
