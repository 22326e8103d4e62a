//! In-memory providers that answer with frozen data, fail, or answer late.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use fareflow_core::domain::factors::{
    DemandData, EventData, HistoricalPricing, TrafficData, WeatherData,
};
use fareflow_core::domain::request::{Location, PricingRequest, Route, ServiceType};

use super::{
    AvailabilityProvider, DemandProvider, EventsProvider, HistoryProvider, ProviderError,
    TrafficProvider, WeatherProvider,
};

/// Answers every call with a clone of the wrapped value.
#[derive(Clone, Debug)]
pub struct Fixed<T>(pub T);

#[async_trait]
impl DemandProvider for Fixed<DemandData> {
    async fn current_demand(
        &self,
        _service_type: ServiceType,
        _location: &Location,
    ) -> Result<DemandData, ProviderError> {
        Ok(self.0.clone())
    }
}

#[async_trait]
impl TrafficProvider for Fixed<TrafficData> {
    async fn conditions(&self, _route: &Route) -> Result<TrafficData, ProviderError> {
        Ok(self.0.clone())
    }
}

#[async_trait]
impl WeatherProvider for Fixed<WeatherData> {
    async fn conditions(&self, _location: &Location) -> Result<WeatherData, ProviderError> {
        Ok(self.0.clone())
    }
}

#[async_trait]
impl EventsProvider for Fixed<Vec<EventData>> {
    async fn local_events(
        &self,
        _location: &Location,
        _at: DateTime<FixedOffset>,
    ) -> Result<Vec<EventData>, ProviderError> {
        Ok(self.0.clone())
    }
}

#[async_trait]
impl HistoryProvider for Fixed<HistoricalPricing> {
    async fn historical_pricing(
        &self,
        _request: &PricingRequest,
    ) -> Result<HistoricalPricing, ProviderError> {
        Ok(self.0.clone())
    }
}

#[async_trait]
impl AvailabilityProvider for Fixed<f64> {
    async fn driver_availability(&self, _request: &PricingRequest) -> Result<f64, ProviderError> {
        Ok(self.0)
    }
}

/// Fails every call with [`ProviderError::Unavailable`].
#[derive(Clone, Debug)]
pub struct FailingProvider {
    reason: String,
}

impl FailingProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    fn fail<T>(&self) -> Result<T, ProviderError> {
        Err(ProviderError::Unavailable(self.reason.clone()))
    }
}

#[async_trait]
impl DemandProvider for FailingProvider {
    async fn current_demand(
        &self,
        _service_type: ServiceType,
        _location: &Location,
    ) -> Result<DemandData, ProviderError> {
        self.fail()
    }
}

#[async_trait]
impl TrafficProvider for FailingProvider {
    async fn conditions(&self, _route: &Route) -> Result<TrafficData, ProviderError> {
        self.fail()
    }
}

#[async_trait]
impl WeatherProvider for FailingProvider {
    async fn conditions(&self, _location: &Location) -> Result<WeatherData, ProviderError> {
        self.fail()
    }
}

#[async_trait]
impl EventsProvider for FailingProvider {
    async fn local_events(
        &self,
        _location: &Location,
        _at: DateTime<FixedOffset>,
    ) -> Result<Vec<EventData>, ProviderError> {
        self.fail()
    }
}

#[async_trait]
impl HistoryProvider for FailingProvider {
    async fn historical_pricing(
        &self,
        _request: &PricingRequest,
    ) -> Result<HistoricalPricing, ProviderError> {
        self.fail()
    }
}

#[async_trait]
impl AvailabilityProvider for FailingProvider {
    async fn driver_availability(&self, _request: &PricingRequest) -> Result<f64, ProviderError> {
        self.fail()
    }
}

/// Sleeps before delegating, to stand in for a slow upstream.
#[derive(Clone, Debug)]
pub struct Delayed<P> {
    inner: P,
    delay: Duration,
}

impl<P> Delayed<P> {
    pub fn new(inner: P, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<P: DemandProvider> DemandProvider for Delayed<P> {
    async fn current_demand(
        &self,
        service_type: ServiceType,
        location: &Location,
    ) -> Result<DemandData, ProviderError> {
        tokio::time::sleep(self.delay).await;
        self.inner.current_demand(service_type, location).await
    }
}

#[async_trait]
impl<P: TrafficProvider> TrafficProvider for Delayed<P> {
    async fn conditions(&self, route: &Route) -> Result<TrafficData, ProviderError> {
        tokio::time::sleep(self.delay).await;
        self.inner.conditions(route).await
    }
}

#[async_trait]
impl<P: WeatherProvider> WeatherProvider for Delayed<P> {
    async fn conditions(&self, location: &Location) -> Result<WeatherData, ProviderError> {
        tokio::time::sleep(self.delay).await;
        self.inner.conditions(location).await
    }
}

#[async_trait]
impl<P: EventsProvider> EventsProvider for Delayed<P> {
    async fn local_events(
        &self,
        location: &Location,
        at: DateTime<FixedOffset>,
    ) -> Result<Vec<EventData>, ProviderError> {
        tokio::time::sleep(self.delay).await;
        self.inner.local_events(location, at).await
    }
}

#[async_trait]
impl<P: HistoryProvider> HistoryProvider for Delayed<P> {
    async fn historical_pricing(
        &self,
        request: &PricingRequest,
    ) -> Result<HistoricalPricing, ProviderError> {
        tokio::time::sleep(self.delay).await;
        self.inner.historical_pricing(request).await
    }
}

#[async_trait]
impl<P: AvailabilityProvider> AvailabilityProvider for Delayed<P> {
    async fn driver_availability(&self, request: &PricingRequest) -> Result<f64, ProviderError> {
        tokio::time::sleep(self.delay).await;
        self.inner.driver_availability(request).await
    }
}
