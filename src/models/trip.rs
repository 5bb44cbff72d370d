use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{catalog::PaymentMethod, models::user::Vehicle};

pub const DEFAULT_AFFINITY: &str = "No especificada";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TripStatus {
    #[default]
    #[serde(rename = "scheduled")]
    Scheduled,
    #[serde(rename = "cancelled")]
    Cancelled,
    #[serde(rename = "completed")]
    Completed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Scheduled => "scheduled",
            TripStatus::Cancelled => "cancelled",
            TripStatus::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "scheduled" => Some(TripStatus::Scheduled),
            "cancelled" => Some(TripStatus::Cancelled),
            "completed" => Some(TripStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The caller-editable part of a trip, as accepted by the validator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TripDetails {
    pub trip_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub departure_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub arrival_time: NaiveTime,
    pub origin: String,
    pub destination: String,
    pub cost: f64,
    pub payment_methods: Vec<PaymentMethod>,
    pub route_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affinity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub driver_id: String,
    pub driver_name: String,
    pub driver_vehicle: Vehicle,
    #[serde(flatten)]
    pub details: TripDetails,
    pub status: TripStatus,
    pub passengers: Vec<String>,
    pub available_seats: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Trip {
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.driver_id == user_id
    }

    pub fn has_passenger(&self, user_id: &str) -> bool {
        self.passengers.iter().any(|p| p == user_id)
    }

    pub fn capacity(&self) -> i64 {
        self.driver_vehicle.seats
    }
}

/// A trip ready to be inserted; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewTrip {
    pub driver_id: String,
    pub driver_name: String,
    pub vehicle: Vehicle,
    pub details: TripDetails,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripFilter {
    pub route_tag: Option<String>,
    pub date: Option<NaiveDate>,
    pub max_cost: Option<f64>,
}

pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(de::Error::custom)
    }
}
