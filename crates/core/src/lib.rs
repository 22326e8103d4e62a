pub mod config;
pub mod domain;
pub mod errors;
pub mod geo;
pub mod pricing;

pub use config::{ConfigError, EngineConfig, LoadOptions};
pub use domain::factors::{
    DemandData, DemandTrend, EventData, FactorCoverage, HistoricalPricing, PricingFactors,
    TrafficConditions, TrafficData, WeatherConditions, WeatherData,
};
pub use domain::request::{
    Location, PricingRequest, Route, ServiceType, UserTier, VehiclePreference,
};
pub use domain::result::{AdjustmentBreakdown, PriceAlternative, PriceRange, PricingResult};
pub use errors::{ComputationError, PricingError, ValidationError};
