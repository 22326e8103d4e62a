//! Capability traits for the external factor sources.
//!
//! Each source is a single-method trait so live, cached and fixed
//! implementations can be swapped without touching the engine.

pub mod fixed;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use fareflow_core::domain::factors::{
    DemandData, EventData, HistoricalPricing, TrafficData, WeatherData,
};
use fareflow_core::domain::request::{Location, PricingRequest, Route, ServiceType};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider returned invalid data: {0}")]
    InvalidData(String),
    #[error("provider did not answer before the deadline")]
    Timeout,
}

#[async_trait]
pub trait DemandProvider: Send + Sync {
    async fn current_demand(
        &self,
        service_type: ServiceType,
        location: &Location,
    ) -> Result<DemandData, ProviderError>;
}

#[async_trait]
pub trait TrafficProvider: Send + Sync {
    async fn conditions(&self, route: &Route) -> Result<TrafficData, ProviderError>;
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn conditions(&self, location: &Location) -> Result<WeatherData, ProviderError>;
}

#[async_trait]
pub trait EventsProvider: Send + Sync {
    async fn local_events(
        &self,
        location: &Location,
        at: DateTime<FixedOffset>,
    ) -> Result<Vec<EventData>, ProviderError>;
}

#[async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn historical_pricing(
        &self,
        request: &PricingRequest,
    ) -> Result<HistoricalPricing, ProviderError>;
}

#[async_trait]
pub trait AvailabilityProvider: Send + Sync {
    /// Share of nearby drivers free for this request, 0.0 to 1.0.
    async fn driver_availability(&self, request: &PricingRequest) -> Result<f64, ProviderError>;
}

/// The full set of factor sources an engine fans out to.
#[derive(Clone)]
pub struct FactorProviders {
    pub demand: Arc<dyn DemandProvider>,
    pub traffic: Arc<dyn TrafficProvider>,
    pub weather: Arc<dyn WeatherProvider>,
    pub events: Arc<dyn EventsProvider>,
    pub history: Arc<dyn HistoryProvider>,
    pub availability: Arc<dyn AvailabilityProvider>,
}

impl FactorProviders {
    /// Every source fails; each factor falls back to its default.
    pub fn unavailable() -> Self {
        let failing = Arc::new(fixed::FailingProvider::new("no provider configured"));
        Self {
            demand: failing.clone(),
            traffic: failing.clone(),
            weather: failing.clone(),
            events: failing.clone(),
            history: failing.clone(),
            availability: failing,
        }
    }

    pub fn with_demand(mut self, provider: impl DemandProvider + 'static) -> Self {
        self.demand = Arc::new(provider);
        self
    }

    pub fn with_traffic(mut self, provider: impl TrafficProvider + 'static) -> Self {
        self.traffic = Arc::new(provider);
        self
    }

    pub fn with_weather(mut self, provider: impl WeatherProvider + 'static) -> Self {
        self.weather = Arc::new(provider);
        self
    }

    pub fn with_events(mut self, provider: impl EventsProvider + 'static) -> Self {
        self.events = Arc::new(provider);
        self
    }

    pub fn with_history(mut self, provider: impl HistoryProvider + 'static) -> Self {
        self.history = Arc::new(provider);
        self
    }

    pub fn with_availability(mut self, provider: impl AvailabilityProvider + 'static) -> Self {
        self.availability = Arc::new(provider);
        self
    }
}
