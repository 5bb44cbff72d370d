//! Structural and business-rule checks for trip payloads and search queries.
//!
//! Both validators are pure: they take the loosely-typed request data plus the
//! current local time and either produce a normalized value or the first
//! failing check.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use validator::Validate;

use crate::{
    catalog::{self, PaymentMethod},
    models::{
        trip::{TripDetails, TripFilter},
        user::Vehicle,
    },
};

pub const MIN_COST: f64 = 1000.0;
pub const MAX_COST: f64 = 100_000.0;
pub const MAX_TRIP_HOURS: i64 = 3;

pub const REQUIRED_FIELDS: [&str; 8] = [
    "tripDate",
    "origin",
    "destination",
    "arrivalTime",
    "departureTime",
    "cost",
    "paymentMethods",
    "routeTag",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TripValidationError {
    #[error("missing required fields")]
    MissingFields(Vec<&'static str>),
    #[error("field {0} must be non-empty text")]
    EmptyText(&'static str),
    #[error("cost must be a valid number")]
    CostNotNumeric,
    #[error("cost must be between 1000 and 100000")]
    CostOutOfRange,
    #[error("date must use the YYYY-MM-DD format")]
    DateFormat,
    #[error("invalid date")]
    InvalidDate,
    #[error("trip date cannot be earlier than today")]
    DateInPast,
    #[error("times must use the HH:MM format")]
    TimeFormat,
    #[error("departure time cannot be earlier than the current time")]
    DepartureInPast,
    #[error("arrival time must be later than departure time")]
    ArrivalNotAfterDeparture,
    #[error("a trip cannot last longer than 3 hours")]
    TripTooLong,
    #[error("at least one payment method is required")]
    NoPaymentMethods,
    #[error("invalid payment methods")]
    InvalidPaymentMethods(Vec<String>),
    #[error("invalid route")]
    InvalidRoute,
    #[error("field {0} must be text")]
    NotText(&'static str),
    #[error("max cost must be a valid number greater than 0")]
    InvalidMaxCost,
    #[error("invalid vehicle: {0}")]
    InvalidVehicle(String),
}

impl TripValidationError {
    /// Stable, machine-readable tag for clients.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingFields(_) => "missing_fields",
            Self::EmptyText(_) => "empty_text",
            Self::CostNotNumeric => "cost_not_numeric",
            Self::CostOutOfRange => "cost_out_of_range",
            Self::DateFormat => "date_format",
            Self::InvalidDate => "invalid_date",
            Self::DateInPast => "date_in_past",
            Self::TimeFormat => "time_format",
            Self::DepartureInPast => "departure_in_past",
            Self::ArrivalNotAfterDeparture => "arrival_not_after_departure",
            Self::TripTooLong => "trip_too_long",
            Self::NoPaymentMethods => "no_payment_methods",
            Self::InvalidPaymentMethods(_) => "invalid_payment_methods",
            Self::InvalidRoute => "invalid_route",
            Self::NotText(_) => "not_text",
            Self::InvalidMaxCost => "invalid_max_cost",
            Self::InvalidVehicle(_) => "invalid_vehicle",
        }
    }

    /// Extra fields merged into the error body next to `reason`.
    pub fn details(&self) -> Map<String, Value> {
        let value = match self {
            Self::MissingFields(fields) => json!({ "missingFields": fields }),
            Self::EmptyText(field) | Self::NotText(field) => json!({ "field": field }),
            Self::CostOutOfRange => json!({ "min": MIN_COST, "max": MAX_COST }),
            Self::TripTooLong => json!({ "maxHours": MAX_TRIP_HOURS }),
            Self::InvalidPaymentMethods(invalid) => json!({
                "invalidPaymentMethods": invalid,
                "validPaymentMethods": catalog::payment_method_names(),
            }),
            Self::InvalidRoute => json!({ "validRoutes": catalog::list_routes() }),
            _ => json!({}),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

/// Validates a create/update payload against the clock reading `now`.
pub fn validate_trip(
    payload: &Value,
    now: NaiveDateTime,
) -> Result<TripDetails, TripValidationError> {
    let empty = Map::new();
    let body = payload.as_object().unwrap_or(&empty);

    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .into_iter()
        .filter(|field| is_blank(body.get(*field)))
        .collect();
    if !missing.is_empty() {
        return Err(TripValidationError::MissingFields(missing));
    }

    let origin = non_empty_text(body, "origin")?;
    let destination = non_empty_text(body, "destination")?;

    let cost = parse_cost(&body["cost"])?;
    if !(MIN_COST..=MAX_COST).contains(&cost) {
        return Err(TripValidationError::CostOutOfRange);
    }

    let trip_date = parse_date(&body["tripDate"])?;
    if trip_date < now.date() {
        return Err(TripValidationError::DateInPast);
    }

    let departure_time = body["departureTime"]
        .as_str()
        .and_then(parse_hhmm)
        .ok_or(TripValidationError::TimeFormat)?;
    let arrival_time = body["arrivalTime"]
        .as_str()
        .and_then(parse_hhmm)
        .ok_or(TripValidationError::TimeFormat)?;

    let departure = trip_date.and_time(departure_time);
    let arrival = trip_date.and_time(arrival_time);
    if departure < now {
        return Err(TripValidationError::DepartureInPast);
    }
    if arrival <= departure {
        return Err(TripValidationError::ArrivalNotAfterDeparture);
    }
    if arrival - departure > Duration::hours(MAX_TRIP_HOURS) {
        return Err(TripValidationError::TripTooLong);
    }

    let payment_methods = parse_payment_methods(&body["paymentMethods"])?;

    let route_tag = body["routeTag"]
        .as_str()
        .filter(|tag| catalog::is_valid_route(tag))
        .ok_or(TripValidationError::InvalidRoute)?
        .to_string();

    let affinity = optional_text(body, "affinity")?;
    let description = optional_text(body, "description")?;

    Ok(TripDetails {
        trip_date,
        departure_time,
        arrival_time,
        origin,
        destination,
        cost,
        payment_methods,
        route_tag,
        affinity,
        description,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSearchParams {
    pub date: Option<String>,
    pub route_tag: Option<String>,
    pub max_cost: Option<String>,
}

/// Looser checks for list filters: no presence or future-date rules.
pub fn validate_search(params: &TripSearchParams) -> Result<TripFilter, TripValidationError> {
    let date = match present(&params.date) {
        Some(raw) => Some(parse_date_str(raw)?),
        None => None,
    };

    let route_tag = match present(&params.route_tag) {
        Some(tag) if catalog::is_valid_route(tag) => Some(tag.to_string()),
        Some(_) => return Err(TripValidationError::InvalidRoute),
        None => None,
    };

    let max_cost = match present(&params.max_cost) {
        Some(raw) => {
            let cost = raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|c| c.is_finite() && *c > 0.0)
                .ok_or(TripValidationError::InvalidMaxCost)?;
            Some(cost)
        }
        None => None,
    };

    Ok(TripFilter {
        route_tag,
        date,
        max_cost,
    })
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VehiclePayload {
    #[validate(length(min = 1, message = "plate cannot be empty"))]
    pub plate: String,
    #[validate(length(min = 1, message = "color cannot be empty"))]
    pub color: String,
    #[validate(length(min = 1, message = "brand cannot be empty"))]
    pub brand: String,
    #[validate(length(min = 1, message = "model cannot be empty"))]
    pub model: String,
    #[validate(range(min = 1, max = 8, message = "seats must be between 1 and 8"))]
    pub seats: i64,
}

impl VehiclePayload {
    fn trimmed(self) -> Self {
        Self {
            plate: self.plate.trim().to_uppercase(),
            color: self.color.trim().to_string(),
            brand: self.brand.trim().to_string(),
            model: self.model.trim().to_string(),
            seats: self.seats,
        }
    }
}

pub fn validate_vehicle(payload: VehiclePayload) -> Result<Vehicle, TripValidationError> {
    let payload = payload.trimmed();
    payload
        .validate()
        .map_err(|e| TripValidationError::InvalidVehicle(e.to_string()))?;

    Ok(Vehicle {
        plate: payload.plate,
        color: payload.color,
        brand: payload.brand,
        model: payload.model,
        seats: payload.seats,
    })
}

/// Absent, null, `false`, `0` and `""` all count as not provided.
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::Array(_)) | Some(Value::Object(_)) => false,
    }
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().filter(|s| !s.is_empty())
}

fn non_empty_text(
    body: &Map<String, Value>,
    field: &'static str,
) -> Result<String, TripValidationError> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(TripValidationError::EmptyText(field))
}

/// `None` only when the key is absent; a present but blank value clears the field.
fn optional_text(
    body: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, TripValidationError> {
    let Some(value) = body.get(field) else {
        return Ok(None);
    };
    if is_blank(Some(value)) {
        return Ok(Some(String::new()));
    }
    match value {
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(TripValidationError::NotText(field)),
    }
}

fn parse_cost(value: &Value) -> Result<f64, TripValidationError> {
    let cost = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    cost.filter(|c| c.is_finite())
        .ok_or(TripValidationError::CostNotNumeric)
}

fn parse_date(value: &Value) -> Result<NaiveDate, TripValidationError> {
    value
        .as_str()
        .ok_or(TripValidationError::DateFormat)
        .and_then(parse_date_str)
}

fn parse_date_str(raw: &str) -> Result<NaiveDate, TripValidationError> {
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return Err(TripValidationError::DateFormat);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| TripValidationError::InvalidDate)
}

/// Accepts `H:MM` or `HH:MM` on a 24-hour clock.
pub fn parse_hhmm(raw: &str) -> Option<NaiveTime> {
    let (hours, minutes) = raw.split_once(':')?;
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !(1..=2).contains(&hours.len()) || minutes.len() != 2 {
        return None;
    }
    if !all_digits(hours) || !all_digits(minutes) {
        return None;
    }
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

fn parse_payment_methods(value: &Value) -> Result<Vec<PaymentMethod>, TripValidationError> {
    let items = match value {
        Value::Array(items) if !items.is_empty() => items,
        _ => return Err(TripValidationError::NoPaymentMethods),
    };

    let mut methods = Vec::with_capacity(items.len());
    let mut invalid = Vec::new();
    for item in items {
        match item.as_str().and_then(PaymentMethod::parse) {
            Some(method) if !methods.contains(&method) => methods.push(method),
            Some(_) => {}
            None => invalid.push(match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        }
    }

    if invalid.is_empty() {
        Ok(methods)
    } else {
        Err(TripValidationError::InvalidPaymentMethods(invalid))
    }
}
