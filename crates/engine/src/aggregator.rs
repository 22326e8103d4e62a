//! Concurrent fan-out to the factor providers.
//!
//! Every provider runs in its own task against a shared deadline. A provider
//! that errors, panics, returns unusable data or misses the deadline leaves
//! its factor at the documented default; siblings are never cancelled.

use std::future::Future;
use std::time::Duration;

use chrono::Datelike;
use fareflow_core::config::{EngineConfig, SeasonalConfig};
use fareflow_core::domain::factors::{
    DemandData, EventData, HistoricalPricing, PricingFactors, TrafficData, WeatherData,
};
use fareflow_core::domain::request::PricingRequest;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::providers::{FactorProviders, ProviderError};

pub struct FactorAggregator {
    providers: FactorProviders,
    provider_timeout: Duration,
    seasonal: SeasonalConfig,
}

impl FactorAggregator {
    pub fn new(providers: FactorProviders, config: &EngineConfig) -> Self {
        Self {
            providers,
            provider_timeout: Duration::from_millis(config.providers.timeout_ms),
            seasonal: config.adjustments.seasonal.clone(),
        }
    }

    pub async fn gather_pricing_factors(
        &self,
        request: &PricingRequest,
        correlation_id: &str,
    ) -> PricingFactors {
        let seasonal_multiplier = self.seasonal.multiplier_for(request.pickup_at.month());
        let mut factors = PricingFactors::defaults_for(request, seasonal_multiplier);
        let deadline = Instant::now() + self.provider_timeout;

        let demand = {
            let provider = self.providers.demand.clone();
            let service_type = request.service_type;
            let pickup = request.route.pickup.clone();
            spawn_guarded(async move { provider.current_demand(service_type, &pickup).await })
        };
        let traffic = {
            let provider = self.providers.traffic.clone();
            let route = request.route.clone();
            spawn_guarded(async move { provider.conditions(&route).await })
        };
        let weather = {
            let provider = self.providers.weather.clone();
            let pickup = request.route.pickup.clone();
            spawn_guarded(async move { provider.conditions(&pickup).await })
        };
        let events = {
            let provider = self.providers.events.clone();
            let pickup = request.route.pickup.clone();
            let at = request.pickup_at;
            spawn_guarded(async move { provider.local_events(&pickup, at).await })
        };
        let history = {
            let provider = self.providers.history.clone();
            let request = request.clone();
            spawn_guarded(async move { provider.historical_pricing(&request).await })
        };
        let availability = {
            let provider = self.providers.availability.clone();
            let request = request.clone();
            spawn_guarded(async move { provider.driver_availability(&request).await })
        };

        let (demand, traffic, weather, events, history, availability) = tokio::join!(
            settle(demand, deadline),
            settle(traffic, deadline),
            settle(weather, deadline),
            settle(events, deadline),
            settle(history, deadline),
            settle(availability, deadline),
        );

        match demand.and_then(sanitize_demand) {
            Ok(demand) => {
                factors.demand = demand;
                factors.coverage.demand = true;
            }
            Err(error) => report_degraded("demand", &error, correlation_id),
        }
        match traffic.and_then(sanitize_traffic) {
            Ok(traffic) => {
                factors.traffic = traffic;
                factors.coverage.traffic = true;
            }
            Err(error) => report_degraded("traffic", &error, correlation_id),
        }
        match weather.and_then(sanitize_weather) {
            Ok(weather) => {
                factors.weather = weather;
                factors.coverage.weather = true;
            }
            Err(error) => report_degraded("weather", &error, correlation_id),
        }
        match events.and_then(sanitize_events) {
            Ok(events) => {
                factors.events = events;
                factors.coverage.events = true;
            }
            Err(error) => report_degraded("events", &error, correlation_id),
        }
        match history.and_then(sanitize_history) {
            Ok(historical) => {
                factors.historical = historical;
                factors.coverage.historical = true;
            }
            Err(error) => report_degraded("historical", &error, correlation_id),
        }
        match availability.and_then(|share| unit_interval("driver_availability", share)) {
            Ok(share) => {
                factors.driver_availability = share;
                factors.coverage.availability = true;
            }
            Err(error) => report_degraded("driver_availability", &error, correlation_id),
        }

        debug!(
            event_name = "pricing.factors.gathered",
            correlation_id = %correlation_id,
            live_factors = factors.coverage.live_count(),
            "pricing factors gathered"
        );
        factors
    }
}

/// Aborts the provider task when dropped, so an abandoned quote leaves no
/// stragglers behind.
struct TaskGuard<T>(JoinHandle<T>);

impl<T> Drop for TaskGuard<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn spawn_guarded<F, T>(future: F) -> TaskGuard<Result<T, ProviderError>>
where
    F: Future<Output = Result<T, ProviderError>> + Send + 'static,
    T: Send + 'static,
{
    TaskGuard(tokio::spawn(future))
}

async fn settle<T>(
    mut guard: TaskGuard<Result<T, ProviderError>>,
    deadline: Instant,
) -> Result<T, ProviderError> {
    match timeout_at(deadline, &mut guard.0).await {
        Ok(Ok(answer)) => answer,
        Ok(Err(join_error)) if join_error.is_panic() => {
            Err(ProviderError::Unavailable("provider task panicked".to_string()))
        }
        Ok(Err(join_error)) => Err(ProviderError::Unavailable(join_error.to_string())),
        Err(_) => Err(ProviderError::Timeout),
    }
}

fn report_degraded(factor: &'static str, error: &ProviderError, correlation_id: &str) {
    warn!(
        event_name = "pricing.factor.degraded",
        correlation_id = %correlation_id,
        factor,
        error = %error,
        "factor provider failed; using default"
    );
}

fn finite(signal: &str, value: f64) -> Result<f64, ProviderError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProviderError::InvalidData(format!("{signal} is not finite: {value}")))
    }
}

fn unit_interval(signal: &str, value: f64) -> Result<f64, ProviderError> {
    finite(signal, value).map(|value| value.clamp(0.0, 1.0))
}

fn sanitize_demand(mut demand: DemandData) -> Result<DemandData, ProviderError> {
    demand.current_demand = unit_interval("current_demand", demand.current_demand)?;
    demand.service_type_popularity =
        unit_interval("service_type_popularity", demand.service_type_popularity)?;
    Ok(demand)
}

fn sanitize_traffic(traffic: TrafficData) -> Result<TrafficData, ProviderError> {
    let estimated = finite("estimated_duration_minutes", traffic.estimated_duration_minutes)?;
    let baseline = finite("baseline_duration_minutes", traffic.baseline_duration_minutes)?;
    finite("traffic_multiplier", traffic.traffic_multiplier)?;
    if estimated < 0.0 || baseline < 0.0 {
        return Err(ProviderError::InvalidData("negative travel duration".to_string()));
    }
    Ok(traffic)
}

fn sanitize_weather(weather: WeatherData) -> Result<WeatherData, ProviderError> {
    finite("temperature_celsius", weather.temperature_celsius)?;
    finite("visibility_km", weather.visibility_km)?;
    finite("wind_speed_kph", weather.wind_speed_kph)?;
    Ok(weather)
}

fn sanitize_events(events: Vec<EventData>) -> Result<Vec<EventData>, ProviderError> {
    for event in &events {
        finite("impact_radius_km", event.impact_radius_km)?;
        finite("event latitude", event.location.latitude)?;
        finite("event longitude", event.location.longitude)?;
    }
    Ok(events)
}

fn sanitize_history(history: HistoricalPricing) -> Result<HistoricalPricing, ProviderError> {
    if let Some(pct) = history.average_adjustment_pct {
        finite("average_adjustment_pct", pct)?;
    }
    Ok(history)
}
