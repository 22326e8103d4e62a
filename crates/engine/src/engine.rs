use std::time::Duration;

use fareflow_core::config::EngineConfig;
use fareflow_core::domain::factors::PricingFactors;
use fareflow_core::domain::request::PricingRequest;
use fareflow_core::domain::result::PricingResult;
use fareflow_core::errors::{ComputationError, PricingError};
use fareflow_core::pricing::{calculate_base_price, quote_with_factors, table_base_price};
use rust_decimal::Decimal;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::aggregator::FactorAggregator;
use crate::providers::FactorProviders;

/// Stateless quoting façade. Holds only immutable configuration and provider
/// handles, so one engine can serve any number of concurrent requests.
pub struct PricingEngine {
    config: EngineConfig,
    aggregator: FactorAggregator,
    request_timeout: Duration,
}

impl PricingEngine {
    pub fn new(config: EngineConfig, providers: FactorProviders) -> Self {
        let aggregator = FactorAggregator::new(providers, &config);
        let request_timeout = Duration::from_millis(config.engine.request_timeout_ms);
        Self { config, aggregator, request_timeout }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Prices a request against live provider data.
    ///
    /// Only a malformed request is an error. Any failure after validation,
    /// including the request deadline elapsing, yields the degraded
    /// base-fare quote instead.
    pub async fn calculate_price(
        &self,
        request: &PricingRequest,
    ) -> Result<PricingResult, PricingError> {
        let correlation_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "pricing.quote",
            correlation_id = %correlation_id,
            service_type = request.service_type.as_str()
        );

        self.quote(request, &correlation_id).instrument(span).await
    }

    async fn quote(
        &self,
        request: &PricingRequest,
        correlation_id: &str,
    ) -> Result<PricingResult, PricingError> {
        let base_price = match self.prepare(request, correlation_id)? {
            Ok(base_price) => base_price,
            Err(fallback) => return Ok(fallback),
        };

        let outcome = tokio::time::timeout(self.request_timeout, async {
            let factors = self.aggregator.gather_pricing_factors(request, correlation_id).await;
            quote_with_factors(request, &factors, base_price, &self.config)
                .map(|result| (result, factors.coverage.live_count()))
        })
        .await;

        match outcome {
            Ok(Ok((result, live_factors))) => {
                log_computed(&result, live_factors, correlation_id);
                Ok(result)
            }
            Ok(Err(error)) => Ok(fallback(base_price, &error.to_string(), correlation_id)),
            Err(_) => Ok(fallback(base_price, "request deadline exceeded", correlation_id)),
        }
    }

    /// Prices a request against factors the caller already holds. No
    /// provider is consulted.
    pub fn price_with_factors(
        &self,
        request: &PricingRequest,
        factors: &PricingFactors,
    ) -> Result<PricingResult, PricingError> {
        let correlation_id = Uuid::new_v4().to_string();
        let base_price = match self.prepare(request, &correlation_id)? {
            Ok(base_price) => base_price,
            Err(fallback) => return Ok(fallback),
        };

        match quote_with_factors(request, factors, base_price, &self.config) {
            Ok(result) => {
                log_computed(&result, factors.coverage.live_count(), &correlation_id);
                Ok(result)
            }
            Err(error) => Ok(fallback(base_price, &error.to_string(), &correlation_id)),
        }
    }

    /// Validates the request and computes its base fare. The inner `Err`
    /// carries the finished fallback quote when the fare itself overflows.
    fn prepare(
        &self,
        request: &PricingRequest,
        correlation_id: &str,
    ) -> Result<Result<Decimal, PricingResult>, PricingError> {
        if let Err(error) = request.validate(self.config.rates.max_passengers) {
            warn!(
                event_name = "pricing.request.rejected",
                correlation_id = %correlation_id,
                error = %error,
                "pricing request rejected"
            );
            return Err(error.into());
        }

        Ok(calculate_base_price(request, &self.config.rates).map_err(|error: ComputationError| {
            let table_price = table_base_price(request.service_type, &self.config.rates);
            fallback(table_price, &error.to_string(), correlation_id)
        }))
    }
}

fn fallback(base_price: Decimal, reason: &str, correlation_id: &str) -> PricingResult {
    warn!(
        event_name = "pricing.fallback.applied",
        correlation_id = %correlation_id,
        reason,
        base_price = %base_price,
        "pricing fell back to the base fare"
    );
    PricingResult::fallback(base_price)
}

fn log_computed(result: &PricingResult, live_factors: usize, correlation_id: &str) {
    info!(
        event_name = "pricing.quote.computed",
        correlation_id = %correlation_id,
        base_price = %result.base_price,
        final_price = %result.final_price,
        confidence = result.confidence,
        live_factors,
        "price quote computed"
    );
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, Duration as ChronoDuration};
    use fareflow_core::config::EngineConfig;
    use fareflow_core::domain::factors::{EventData, EventType, WeatherConditions, WeatherData};
    use fareflow_core::domain::request::{Location, PricingRequest, ServiceType, UserTier};
    use fareflow_core::errors::{PricingError, ValidationError};
    use rust_decimal::Decimal;

    use super::PricingEngine;
    use crate::providers::fixed::{Delayed, Fixed};
    use crate::providers::FactorProviders;

    const TUESDAY_PEAK: &str = "2025-04-08T08:00:00+00:00";
    const TUESDAY_MIDDAY: &str = "2025-04-08T11:00:00+00:00";

    fn request(at: &str) -> PricingRequest {
        PricingRequest::new(
            ServiceType::PrivateHire,
            Location::new(51.5074, -0.1278),
            DateTime::parse_from_rfc3339(at).expect("valid timestamp"),
            2,
        )
    }

    fn engine(providers: FactorProviders) -> PricingEngine {
        PricingEngine::new(EngineConfig::default(), providers)
    }

    fn concert(name: &str, attendees: u32, request: &PricingRequest) -> EventData {
        EventData {
            name: name.to_string(),
            event_type: EventType::Concert,
            location: request.route.pickup.clone(),
            starts_at: request.pickup_at,
            ends_at: request.pickup_at + ChronoDuration::hours(3),
            estimated_attendees: attendees,
            impact_radius_km: 3.0,
        }
    }

    #[tokio::test]
    async fn weekday_morning_peak_applies_to_neutral_factors() {
        let result = engine(FactorProviders::unavailable())
            .calculate_price(&request(TUESDAY_PEAK))
            .await
            .expect("quote");

        assert_eq!(result.base_price, Decimal::new(25, 0));
        assert_eq!(result.final_price, Decimal::new(2875, 2));
        assert_eq!(result.breakdown.time_of_day, Decimal::new(15, 0));
        assert_eq!(result.explanation, vec!["Weekday peak hours pricing (+15%)".to_string()]);
        assert!(!result.degraded);
    }

    #[tokio::test]
    async fn vip_discount_stacks_on_peak_and_rounds_half_up() {
        let request = request(TUESDAY_PEAK).with_user_tier(UserTier::Vip);

        let result =
            engine(FactorProviders::unavailable()).calculate_price(&request).await.expect("quote");

        assert_eq!(result.final_price, Decimal::new(2444, 2));
        assert_eq!(result.breakdown.user_tier, Decimal::new(-15, 0));
    }

    #[tokio::test]
    async fn storm_raises_an_off_peak_fare_by_thirty_percent() {
        let providers = FactorProviders::unavailable().with_weather(Fixed(WeatherData {
            conditions: WeatherConditions::Storm,
            ..WeatherData::default()
        }));

        let result =
            engine(providers).calculate_price(&request(TUESDAY_MIDDAY)).await.expect("quote");

        assert_eq!(result.final_price, Decimal::new(3250, 2));
        assert_eq!(result.explanation, vec!["Storm conditions (+30%)".to_string()]);
    }

    #[tokio::test]
    async fn overlapping_events_use_the_strongest_not_the_sum() {
        let request = request(TUESDAY_MIDDAY);
        let events =
            vec![concert("Jazz Night", 6_000, &request), concert("Arena Tour", 9_000, &request)];
        let providers = FactorProviders::unavailable().with_events(Fixed(events));

        let result = engine(providers).calculate_price(&request).await.expect("quote");

        assert_eq!(result.breakdown.events, Decimal::new(18, 0));
        assert_eq!(result.final_price, Decimal::new(2950, 2));
        assert_eq!(result.explanation, vec!["Nearby event: Arena Tour (+18%)".to_string()]);
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_before_pricing() {
        let mut request = request(TUESDAY_PEAK);
        request.passenger_count = 0;

        let error = engine(FactorProviders::unavailable())
            .calculate_price(&request)
            .await
            .expect_err("zero passengers must be rejected");

        assert_eq!(
            error,
            PricingError::InvalidRequest(ValidationError::InvalidPassengerCount {
                actual: 0,
                max: 16
            })
        );
    }

    #[tokio::test]
    async fn all_providers_failing_prices_at_base_with_no_signal_confidence() {
        let result = engine(FactorProviders::unavailable())
            .calculate_price(&request(TUESDAY_MIDDAY))
            .await
            .expect("quote");

        assert_eq!(result.final_price, result.base_price);
        assert!(result.breakdown.is_neutral());
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.explanation, vec!["Standard pricing applied".to_string()]);
        assert!(!result.degraded);
    }

    #[tokio::test]
    async fn identical_inputs_give_identical_quotes() {
        let engine = engine(FactorProviders::unavailable().with_weather(Fixed(WeatherData {
            conditions: WeatherConditions::Rain,
            ..WeatherData::default()
        })));
        let request = request(TUESDAY_PEAK);

        let first = engine.calculate_price(&request).await.expect("first quote");
        let second = engine.calculate_price(&request).await.expect("second quote");

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn overflowing_quote_degrades_to_the_base_fare() {
        let mut config = EngineConfig::default();
        config.rates.base_price.private_hire = Decimal::MAX;
        let engine = PricingEngine::new(config, FactorProviders::unavailable());

        let result = engine.calculate_price(&request(TUESDAY_PEAK)).await.expect("fallback");

        assert!(result.degraded);
        assert_eq!(result.final_price, Decimal::MAX);
        assert_eq!(result.confidence, 0.5);
        assert!(result.suggested_alternatives.is_empty());
        assert!(result.breakdown.is_neutral());
    }

    #[tokio::test]
    async fn overflowing_base_fare_falls_back_to_the_table_price() {
        let mut config = EngineConfig::default();
        config.rates.base_price.private_hire = Decimal::MAX;
        let engine = PricingEngine::new(config, FactorProviders::unavailable());
        let mut request = request(TUESDAY_MIDDAY);
        request.passenger_count = 6;

        let result = engine.calculate_price(&request).await.expect("fallback");

        assert!(result.degraded);
        assert_eq!(result.base_price, Decimal::MAX);
        assert_eq!(result.final_price, Decimal::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn request_deadline_degrades_to_the_base_fare() {
        let mut config = EngineConfig::default();
        config.engine.request_timeout_ms = 50;
        config.providers.timeout_ms = 10_000;
        let providers = FactorProviders::unavailable().with_weather(Delayed::new(
            Fixed(WeatherData::default()),
            Duration::from_secs(60),
        ));
        let engine = PricingEngine::new(config, providers);

        let result = engine.calculate_price(&request(TUESDAY_PEAK)).await.expect("fallback");

        assert!(result.degraded);
        assert_eq!(result.final_price, Decimal::new(25, 0));
        assert_eq!(result.price_range.min, Decimal::new(2250, 2));
        assert_eq!(result.price_range.max, Decimal::new(2750, 2));
        assert_eq!(result.explanation, vec!["Standard pricing applied".to_string()]);
    }

    #[tokio::test]
    async fn inverted_demand_band_built_in_code_still_quotes() {
        let mut config = EngineConfig::default();
        config.adjustments.demand.min_pct = 60.0;
        let engine = PricingEngine::new(config, FactorProviders::unavailable());

        let result = engine.calculate_price(&request(TUESDAY_MIDDAY)).await.expect("quote");

        assert!(!result.degraded);
        assert_eq!(result.breakdown.demand, Decimal::new(50, 0));
        assert_eq!(result.final_price, Decimal::new(3750, 2));
    }

    #[tokio::test]
    async fn non_finite_weight_built_in_code_degrades_instead_of_panicking() {
        let mut config = EngineConfig::default();
        config.adjustments.weather.clear = f64::NAN;
        config.adjustments.demand.max_pct = f64::NAN;
        let engine = PricingEngine::new(config, FactorProviders::unavailable());

        let result = engine.calculate_price(&request(TUESDAY_MIDDAY)).await.expect("fallback");

        assert!(result.degraded);
        assert_eq!(result.final_price, Decimal::new(25, 0));
    }

    #[test]
    fn alternatives_follow_the_request_clock_not_the_factors() {
        let engine = engine(FactorProviders::unavailable());
        let request = request(TUESDAY_PEAK);
        let mut factors =
            fareflow_core::domain::factors::PricingFactors::defaults_for(&request, 1.0);
        factors.time_of_day = 3;

        let result = engine.price_with_factors(&request, &factors).expect("quote");

        assert_eq!(result.suggested_alternatives.len(), 1);
        assert_eq!(result.suggested_alternatives[0].offset_minutes, 60);
        assert_eq!(result.suggested_alternatives[0].price_difference, Decimal::new(375, 2));
    }

    #[test]
    fn frozen_factors_price_without_providers() {
        let engine = engine(FactorProviders::unavailable());
        let request = request(TUESDAY_MIDDAY);
        let mut factors =
            fareflow_core::domain::factors::PricingFactors::defaults_for(&request, 1.0);
        factors.weather.conditions = WeatherConditions::Snow;

        let result = engine.price_with_factors(&request, &factors).expect("quote");

        assert_eq!(result.breakdown.weather, Decimal::new(25, 0));
        assert_eq!(result.final_price, Decimal::new(3125, 2));
    }
}
