use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    PrivateHire,
    Corporate,
    Vip,
    Wedding,
    CloseProtection,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrivateHire => "private_hire",
            Self::Corporate => "corporate",
            Self::Vip => "vip",
            Self::Wedding => "wedding",
            Self::CloseProtection => "close_protection",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserTier {
    #[default]
    Standard,
    Premium,
    Vip,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehiclePreference {
    Standard,
    Premium,
    Luxury,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude, address: None }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    fn validate(&self, field: &'static str) -> Result<(), ValidationError> {
        let in_range = self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude);
        if in_range {
            Ok(())
        } else {
            Err(ValidationError::InvalidCoordinates {
                field,
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub pickup: Location,
    #[serde(default)]
    pub dropoff: Option<Location>,
}

/// A request for a price quote, supplied by the booking flow once pickup,
/// dropoff, time and party size are known.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingRequest {
    pub service_type: ServiceType,
    pub route: Route,
    /// Pickup time in the pickup's local offset. Hour-of-day rules read the
    /// local wall clock, not UTC.
    pub pickup_at: DateTime<FixedOffset>,
    pub passenger_count: u32,
    #[serde(default)]
    pub user_tier: UserTier,
    #[serde(default)]
    pub vehicle_preference: Option<VehiclePreference>,
}

impl PricingRequest {
    pub fn new(
        service_type: ServiceType,
        pickup: Location,
        pickup_at: DateTime<FixedOffset>,
        passenger_count: u32,
    ) -> Self {
        Self {
            service_type,
            route: Route { pickup, dropoff: None },
            pickup_at,
            passenger_count,
            user_tier: UserTier::Standard,
            vehicle_preference: None,
        }
    }

    pub fn with_dropoff(mut self, dropoff: Location) -> Self {
        self.route.dropoff = Some(dropoff);
        self
    }

    pub fn with_user_tier(mut self, user_tier: UserTier) -> Self {
        self.user_tier = user_tier;
        self
    }

    pub fn with_vehicle_preference(mut self, preference: VehiclePreference) -> Self {
        self.vehicle_preference = Some(preference);
        self
    }

    /// Rejects malformed input before any provider is contacted.
    pub fn validate(&self, max_passengers: u32) -> Result<(), ValidationError> {
        if self.passenger_count == 0 || self.passenger_count > max_passengers {
            return Err(ValidationError::InvalidPassengerCount {
                actual: self.passenger_count,
                max: max_passengers,
            });
        }

        self.route.pickup.validate("pickup")?;
        if let Some(dropoff) = &self.route.dropoff {
            dropoff.validate("dropoff")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::{Location, PricingRequest, ServiceType, UserTier};
    use crate::errors::ValidationError;

    fn request(passengers: u32) -> PricingRequest {
        PricingRequest::new(
            ServiceType::PrivateHire,
            Location::new(51.5074, -0.1278),
            DateTime::parse_from_rfc3339("2025-04-08T08:00:00+01:00").expect("valid timestamp"),
            passengers,
        )
    }

    #[test]
    fn zero_passengers_is_rejected() {
        let error = request(0).validate(16).expect_err("zero passengers must fail");
        assert_eq!(error, ValidationError::InvalidPassengerCount { actual: 0, max: 16 });
    }

    #[test]
    fn passenger_count_above_limit_is_rejected() {
        assert!(request(17).validate(16).is_err());
        assert!(request(16).validate(16).is_ok());
    }

    #[test]
    fn out_of_range_dropoff_is_rejected() {
        let error = request(2)
            .with_dropoff(Location::new(95.0, 0.0))
            .validate(16)
            .expect_err("latitude above 90 must fail");
        assert!(matches!(error, ValidationError::InvalidCoordinates { field: "dropoff", .. }));
    }

    #[test]
    fn non_finite_pickup_is_rejected() {
        let mut request = request(2);
        request.route.pickup.longitude = f64::NAN;
        assert!(matches!(
            request.validate(16),
            Err(ValidationError::InvalidCoordinates { field: "pickup", .. })
        ));
    }

    #[test]
    fn request_deserializes_with_default_tier() {
        let request: PricingRequest = serde_json::from_str(
            r#"{
                "service_type": "close_protection",
                "route": { "pickup": { "latitude": 51.5, "longitude": -0.12 } },
                "pickup_at": "2025-04-08T08:00:00+01:00",
                "passenger_count": 2
            }"#,
        )
        .expect("request payload should deserialize");

        assert_eq!(request.service_type, ServiceType::CloseProtection);
        assert_eq!(request.user_tier, UserTier::Standard);
        assert!(request.route.dropoff.is_none());
        assert!(request.vehicle_preference.is_none());
    }
}
