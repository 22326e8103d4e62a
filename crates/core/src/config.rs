use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::request::ServiceType;

/// Every tuning weight, rate table and runtime knob the engine reads.
///
/// Loaded once and injected at construction; nothing in the pricing path
/// reaches for global constants.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineConfig {
    pub rates: RateConfig,
    pub adjustments: AdjustmentConfig,
    pub bounds: PriceBounds,
    pub confidence: ConfidenceConfig,
    pub alternatives: AlternativesConfig,
    pub providers: ProvidersConfig,
    pub engine: RuntimeConfig,
    pub logging: LoggingConfig,
}

/// One amount per service type. A table given in a config file must list
/// every service type.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ServiceRates {
    pub private_hire: Decimal,
    pub corporate: Decimal,
    pub vip: Decimal,
    pub wedding: Decimal,
    pub close_protection: Decimal,
}

impl ServiceRates {
    pub fn rate(&self, service_type: ServiceType) -> Decimal {
        match service_type {
            ServiceType::PrivateHire => self.private_hire,
            ServiceType::Corporate => self.corporate,
            ServiceType::Vip => self.vip,
            ServiceType::Wedding => self.wedding,
            ServiceType::CloseProtection => self.close_protection,
        }
    }

    fn all(&self) -> [(&'static str, Decimal); 5] {
        [
            ("private_hire", self.private_hire),
            ("corporate", self.corporate),
            ("vip", self.vip),
            ("wedding", self.wedding),
            ("close_protection", self.close_protection),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    pub base_price: ServiceRates,
    /// Per great-circle kilometre.
    pub distance_rate: ServiceRates,
    pub group_passenger_threshold: u32,
    pub group_multiplier: Decimal,
    pub premium_vehicle_multiplier: Decimal,
    pub luxury_vehicle_multiplier: Decimal,
    pub max_passengers: u32,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            base_price: ServiceRates {
                private_hire: Decimal::new(25, 0),
                corporate: Decimal::new(35, 0),
                vip: Decimal::new(55, 0),
                wedding: Decimal::new(75, 0),
                close_protection: Decimal::new(150, 0),
            },
            distance_rate: ServiceRates {
                private_hire: Decimal::new(200, 2),
                corporate: Decimal::new(250, 2),
                vip: Decimal::new(350, 2),
                wedding: Decimal::new(300, 2),
                close_protection: Decimal::new(500, 2),
            },
            group_passenger_threshold: 4,
            group_multiplier: Decimal::new(120, 2),
            premium_vehicle_multiplier: Decimal::new(115, 2),
            luxury_vehicle_multiplier: Decimal::new(130, 2),
            max_passengers: 16,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AdjustmentConfig {
    pub demand: DemandWeights,
    pub traffic: TrafficSteps,
    pub time_of_day: TimeOfDayConfig,
    pub weather: WeatherTable,
    pub events: EventWeights,
    pub user_tier: TierDiscounts,
    pub seasonal: SeasonalConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DemandWeights {
    pub neutral_level: f64,
    pub level_weight: f64,
    pub increasing_bonus: f64,
    pub decreasing_bonus: f64,
    pub popularity_weight: f64,
    pub min_pct: f64,
    pub max_pct: f64,
}

impl Default for DemandWeights {
    fn default() -> Self {
        Self {
            neutral_level: 0.5,
            level_weight: 40.0,
            increasing_bonus: 5.0,
            decreasing_bonus: -3.0,
            popularity_weight: 5.0,
            min_pct: -25.0,
            max_pct: 50.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TrafficStep {
    /// The step applies when the duration ratio is strictly above this value.
    pub ratio_above: f64,
    pub pct: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrafficSteps {
    pub steps: Vec<TrafficStep>,
}

impl Default for TrafficSteps {
    fn default() -> Self {
        Self {
            steps: vec![
                TrafficStep { ratio_above: 1.5, pct: 20.0 },
                TrafficStep { ratio_above: 1.2, pct: 10.0 },
                TrafficStep { ratio_above: 1.1, pct: 5.0 },
            ],
        }
    }
}

/// Half-open `[start, end)` range of local hours. Wraps past midnight when
/// `start > end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct HourWindow {
    pub start: u32,
    pub end: u32,
}

impl HourWindow {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, hour: u32) -> bool {
        if self.start <= self.end {
            hour >= self.start && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimeOfDayConfig {
    pub weekday_peak_windows: Vec<HourWindow>,
    pub weekday_peak_pct: f64,
    pub late_night_window: HourWindow,
    pub late_night_pct: f64,
    pub weekend_night_window: HourWindow,
    pub weekend_night_pct: f64,
    pub weekend_pct: f64,
}

impl Default for TimeOfDayConfig {
    fn default() -> Self {
        Self {
            weekday_peak_windows: vec![HourWindow::new(7, 9), HourWindow::new(17, 19)],
            weekday_peak_pct: 15.0,
            late_night_window: HourWindow::new(22, 6),
            late_night_pct: 20.0,
            weekend_night_window: HourWindow::new(20, 2),
            weekend_night_pct: 25.0,
            weekend_pct: 10.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WeatherTable {
    pub clear: f64,
    pub rain: f64,
    pub snow: f64,
    pub storm: f64,
    pub fog: f64,
}

impl Default for WeatherTable {
    fn default() -> Self {
        Self { clear: 0.0, rain: 15.0, snow: 25.0, storm: 30.0, fog: 10.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EventWeights {
    pub attendee_scale: f64,
    pub attendee_factor_cap: f64,
    pub weight: f64,
    pub max_pct: f64,
}

impl Default for EventWeights {
    fn default() -> Self {
        Self { attendee_scale: 10_000.0, attendee_factor_cap: 2.0, weight: 20.0, max_pct: 40.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TierDiscounts {
    pub standard: f64,
    pub premium: f64,
    pub vip: f64,
}

impl Default for TierDiscounts {
    fn default() -> Self {
        Self { standard: 0.0, premium: -8.0, vip: -15.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SeasonBand {
    /// Calendar months, 1 = January.
    pub months: Vec<u32>,
    pub multiplier: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeasonalConfig {
    pub bands: Vec<SeasonBand>,
}

impl SeasonalConfig {
    pub fn multiplier_for(&self, month: u32) -> f64 {
        self.bands
            .iter()
            .find(|band| band.months.contains(&month))
            .map(|band| band.multiplier)
            .unwrap_or(1.0)
    }
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            bands: vec![
                SeasonBand { months: vec![11, 12, 1], multiplier: 1.2 },
                SeasonBand { months: vec![6, 7, 8], multiplier: 1.1 },
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PriceBounds {
    pub floor_multiplier: Decimal,
    pub ceiling_multiplier: Decimal,
    pub range_spread: Decimal,
}

impl Default for PriceBounds {
    fn default() -> Self {
        Self {
            floor_multiplier: Decimal::new(80, 2),
            ceiling_multiplier: Decimal::new(300, 2),
            range_spread: Decimal::new(10, 2),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub base: f64,
    pub min_history_bookings: u32,
    pub history_bonus: f64,
    pub demand_bonus: f64,
    pub traffic_bonus: f64,
    pub floor: f64,
    pub cap: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            base: 0.7,
            min_history_bookings: 5,
            history_bonus: 0.1,
            demand_bonus: 0.1,
            traffic_bonus: 0.05,
            floor: 0.5,
            cap: 0.95,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlternativesConfig {
    pub offsets_minutes: Vec<i64>,
    /// Suggestions whose price delta does not exceed this amount are dropped.
    pub min_delta: Decimal,
    pub max_suggestions: usize,
}

impl Default for AlternativesConfig {
    fn default() -> Self {
        Self {
            offsets_minutes: vec![-60, -30, 30, 60],
            min_delta: Decimal::new(2, 0),
            max_suggestions: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProvidersConfig {
    pub timeout_ms: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self { timeout_ms: 800 }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeConfig {
    pub request_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { request_timeout_ms: 2_000 }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub provider_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl EngineConfig {
    /// Defaults, then the config file, then `FAREFLOW_*` environment variables,
    /// then explicit overrides. Validated last.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("fareflow.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(rates) = patch.rates {
            self.rates = rates;
        }
        if let Some(adjustments) = patch.adjustments {
            self.adjustments = adjustments;
        }
        if let Some(bounds) = patch.bounds {
            self.bounds = bounds;
        }
        if let Some(confidence) = patch.confidence {
            self.confidence = confidence;
        }
        if let Some(alternatives) = patch.alternatives {
            self.alternatives = alternatives;
        }

        if let Some(providers) = patch.providers {
            if let Some(timeout_ms) = providers.timeout_ms {
                self.providers.timeout_ms = timeout_ms;
            }
        }

        if let Some(engine) = patch.engine {
            if let Some(request_timeout_ms) = engine.request_timeout_ms {
                self.engine.request_timeout_ms = request_timeout_ms;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("FAREFLOW_PROVIDERS_TIMEOUT_MS") {
            self.providers.timeout_ms = parse_u64("FAREFLOW_PROVIDERS_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read_env("FAREFLOW_ENGINE_REQUEST_TIMEOUT_MS") {
            self.engine.request_timeout_ms =
                parse_u64("FAREFLOW_ENGINE_REQUEST_TIMEOUT_MS", &value)?;
        }

        let log_level =
            read_env("FAREFLOW_LOGGING_LEVEL").or_else(|| read_env("FAREFLOW_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("FAREFLOW_LOGGING_FORMAT").or_else(|| read_env("FAREFLOW_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(timeout_ms) = overrides.provider_timeout_ms {
            self.providers.timeout_ms = timeout_ms;
        }
        if let Some(request_timeout_ms) = overrides.request_timeout_ms {
            self.engine.request_timeout_ms = request_timeout_ms;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_rates(&self.rates)?;
        validate_adjustments(&self.adjustments)?;
        validate_bounds(&self.bounds)?;
        validate_confidence(&self.confidence)?;
        validate_alternatives(&self.alternatives)?;
        validate_timeouts(&self.providers, &self.engine)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("fareflow.toml"), PathBuf::from("config/fareflow.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_rates(rates: &RateConfig) -> Result<(), ConfigError> {
    for (table, service_rates) in
        [("rates.base_price", &rates.base_price), ("rates.distance_rate", &rates.distance_rate)]
    {
        if let Some((service, _)) =
            service_rates.all().into_iter().find(|(_, amount)| amount.is_sign_negative())
        {
            return Err(ConfigError::Validation(format!("{table}.{service} must not be negative")));
        }
    }

    let multipliers = [
        ("rates.group_multiplier", rates.group_multiplier),
        ("rates.premium_vehicle_multiplier", rates.premium_vehicle_multiplier),
        ("rates.luxury_vehicle_multiplier", rates.luxury_vehicle_multiplier),
    ];
    if let Some((key, _)) = multipliers.into_iter().find(|(_, value)| *value <= Decimal::ZERO) {
        return Err(ConfigError::Validation(format!("{key} must be greater than zero")));
    }

    if rates.max_passengers == 0 {
        return Err(ConfigError::Validation(
            "rates.max_passengers must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_adjustments(adjustments: &AdjustmentConfig) -> Result<(), ConfigError> {
    let demand = &adjustments.demand;
    let weather = &adjustments.weather;
    let events = &adjustments.events;
    let tiers = &adjustments.user_tier;
    let time = &adjustments.time_of_day;
    let weights = [
        ("adjustments.demand.neutral_level", demand.neutral_level),
        ("adjustments.demand.level_weight", demand.level_weight),
        ("adjustments.demand.increasing_bonus", demand.increasing_bonus),
        ("adjustments.demand.decreasing_bonus", demand.decreasing_bonus),
        ("adjustments.demand.popularity_weight", demand.popularity_weight),
        ("adjustments.demand.min_pct", demand.min_pct),
        ("adjustments.demand.max_pct", demand.max_pct),
        ("adjustments.time_of_day.weekday_peak_pct", time.weekday_peak_pct),
        ("adjustments.time_of_day.late_night_pct", time.late_night_pct),
        ("adjustments.time_of_day.weekend_night_pct", time.weekend_night_pct),
        ("adjustments.time_of_day.weekend_pct", time.weekend_pct),
        ("adjustments.weather.clear", weather.clear),
        ("adjustments.weather.rain", weather.rain),
        ("adjustments.weather.snow", weather.snow),
        ("adjustments.weather.storm", weather.storm),
        ("adjustments.weather.fog", weather.fog),
        ("adjustments.events.attendee_scale", events.attendee_scale),
        ("adjustments.events.attendee_factor_cap", events.attendee_factor_cap),
        ("adjustments.events.weight", events.weight),
        ("adjustments.events.max_pct", events.max_pct),
        ("adjustments.user_tier.standard", tiers.standard),
        ("adjustments.user_tier.premium", tiers.premium),
        ("adjustments.user_tier.vip", tiers.vip),
    ];
    if let Some((key, _)) = weights.into_iter().find(|(_, value)| !value.is_finite()) {
        return Err(ConfigError::Validation(format!("{key} must be a finite number")));
    }

    if demand.min_pct > demand.max_pct {
        return Err(ConfigError::Validation(
            "adjustments.demand.min_pct must not exceed max_pct".to_string(),
        ));
    }

    let steps_finite = adjustments
        .traffic
        .steps
        .iter()
        .all(|step| step.ratio_above.is_finite() && step.pct.is_finite());
    if !steps_finite {
        return Err(ConfigError::Validation(
            "adjustments.traffic.steps values must be finite".to_string(),
        ));
    }

    let windows = time
        .weekday_peak_windows
        .iter()
        .chain([&time.late_night_window, &time.weekend_night_window]);
    for window in windows {
        if window.start > 23 || window.end > 24 {
            return Err(ConfigError::Validation(format!(
                "adjustments.time_of_day window {}..{} is outside 0..24",
                window.start, window.end
            )));
        }
    }

    if events.attendee_scale <= 0.0 || events.attendee_factor_cap < 0.0 || events.max_pct < 0.0 {
        return Err(ConfigError::Validation(
            "adjustments.events requires attendee_scale > 0 and non-negative caps".to_string(),
        ));
    }

    for band in &adjustments.seasonal.bands {
        if band.multiplier <= 0.0 || !band.multiplier.is_finite() {
            return Err(ConfigError::Validation(
                "adjustments.seasonal band multiplier must be greater than zero".to_string(),
            ));
        }
        if band.months.iter().any(|month| !(1..=12).contains(month)) {
            return Err(ConfigError::Validation(
                "adjustments.seasonal band months must be in range 1..=12".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_bounds(bounds: &PriceBounds) -> Result<(), ConfigError> {
    if bounds.floor_multiplier <= Decimal::ZERO || bounds.floor_multiplier > Decimal::ONE {
        return Err(ConfigError::Validation(
            "bounds.floor_multiplier must be in range (0, 1]".to_string(),
        ));
    }
    if bounds.ceiling_multiplier < Decimal::ONE {
        return Err(ConfigError::Validation(
            "bounds.ceiling_multiplier must be at least 1".to_string(),
        ));
    }
    if bounds.range_spread.is_sign_negative() || bounds.range_spread >= Decimal::ONE {
        return Err(ConfigError::Validation(
            "bounds.range_spread must be in range [0, 1)".to_string(),
        ));
    }
    Ok(())
}

fn validate_confidence(confidence: &ConfidenceConfig) -> Result<(), ConfigError> {
    let bonuses = [confidence.history_bonus, confidence.demand_bonus, confidence.traffic_bonus];
    if bonuses.iter().any(|bonus| !bonus.is_finite()) {
        return Err(ConfigError::Validation("confidence bonuses must be finite".to_string()));
    }

    let ordered = 0.0 <= confidence.floor
        && confidence.floor <= confidence.base
        && confidence.base <= confidence.cap
        && confidence.cap <= 1.0;
    if !ordered {
        return Err(ConfigError::Validation(
            "confidence values must satisfy 0 <= floor <= base <= cap <= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_alternatives(alternatives: &AlternativesConfig) -> Result<(), ConfigError> {
    if alternatives.min_delta.is_sign_negative() {
        return Err(ConfigError::Validation(
            "alternatives.min_delta must not be negative".to_string(),
        ));
    }
    if alternatives.offsets_minutes.iter().any(|offset| *offset == 0 || offset.abs() > 24 * 60) {
        return Err(ConfigError::Validation(
            "alternatives.offsets_minutes must be non-zero and within one day".to_string(),
        ));
    }
    Ok(())
}

fn validate_timeouts(
    providers: &ProvidersConfig,
    engine: &RuntimeConfig,
) -> Result<(), ConfigError> {
    if providers.timeout_ms == 0 || providers.timeout_ms > 60_000 {
        return Err(ConfigError::Validation(
            "providers.timeout_ms must be in range 1..=60000".to_string(),
        ));
    }
    if engine.request_timeout_ms < providers.timeout_ms {
        return Err(ConfigError::Validation(
            "engine.request_timeout_ms must not be shorter than providers.timeout_ms".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    rates: Option<RateConfig>,
    adjustments: Option<AdjustmentConfig>,
    bounds: Option<PriceBounds>,
    confidence: Option<ConfidenceConfig>,
    alternatives: Option<AlternativesConfig>,
    providers: Option<ProvidersPatch>,
    engine: Option<RuntimePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ProvidersPatch {
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RuntimePatch {
    request_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{ConfigError, ConfigOverrides, EngineConfig, HourWindow, LoadOptions, LogFormat};
    use crate::domain::request::ServiceType;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid() -> Result<(), String> {
        let config = EngineConfig::default();
        config.validate().map_err(|err| err.to_string())?;

        ensure(
            config.rates.base_price.rate(ServiceType::Wedding) == Decimal::new(75, 0),
            "wedding base price should default to 75",
        )?;
        ensure(
            config.adjustments.seasonal.multiplier_for(12) == 1.2,
            "december should be in the winter band",
        )?;
        ensure(
            config.adjustments.seasonal.multiplier_for(4) == 1.0,
            "april should be outside every band",
        )
    }

    #[test]
    fn hour_windows_wrap_past_midnight() {
        let late_night = HourWindow::new(22, 6);
        assert!(late_night.contains(23));
        assert!(late_night.contains(0));
        assert!(late_night.contains(5));
        assert!(!late_night.contains(6));
        assert!(!late_night.contains(21));

        let peak = HourWindow::new(7, 9);
        assert!(peak.contains(7));
        assert!(peak.contains(8));
        assert!(!peak.contains(9));
    }

    #[test]
    fn partial_tuning_tables_keep_remaining_defaults() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("fareflow.toml");
        fs::write(
            &path,
            r#"
[adjustments.weather]
storm = 35.0

[rates.base_price]
private_hire = 30
corporate = 40
vip = 60
wedding = 80
close_protection = 160
"#,
        )
        .map_err(|err| err.to_string())?;

        let config =
            EngineConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.adjustments.weather.storm == 35.0, "storm weight should come from file")?;
        ensure(config.adjustments.weather.rain == 15.0, "rain weight should keep its default")?;
        ensure(
            config.adjustments.demand.level_weight == 40.0,
            "untouched sections should keep defaults",
        )?;
        ensure(
            config.rates.base_price.private_hire == Decimal::new(30, 0),
            "base price table should come from file",
        )?;
        ensure(
            config.rates.distance_rate.private_hire == Decimal::new(200, 2),
            "distance table should keep its default",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_FAREFLOW_LEVEL", "debug");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("fareflow.toml");
            fs::write(
                &path,
                r#"
[logging]
level = "${TEST_FAREFLOW_LEVEL}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let options = LoadOptions { config_path: Some(path), ..LoadOptions::default() };
            let config = EngineConfig::load(options)
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "debug", "log level should be interpolated from env")
        })();

        clear_vars(&["TEST_FAREFLOW_LEVEL"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FAREFLOW_PROVIDERS_TIMEOUT_MS", "600");
        env::set_var("FAREFLOW_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("fareflow.toml");
            fs::write(
                &path,
                r#"
[providers]
timeout_ms = 400

[engine]
request_timeout_ms = 1500

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = EngineConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("error".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.providers.timeout_ms == 600,
                "env provider timeout should beat the file",
            )?;
            ensure(config.engine.request_timeout_ms == 1500, "file request timeout should apply")?;
            ensure(config.logging.level == "error", "override log level should win")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "env log format alias should apply",
            )
        })();

        clear_vars(&["FAREFLOW_PROVIDERS_TIMEOUT_MS", "FAREFLOW_LOG_FORMAT"]);
        result
    }

    #[test]
    fn invalid_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FAREFLOW_PROVIDERS_TIMEOUT_MS", "soon");

        let result = match EngineConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected env parse failure".to_string()),
            Err(error) => ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. }
                        if key == "FAREFLOW_PROVIDERS_TIMEOUT_MS"
                ),
                "error should name the offending variable",
            ),
        };

        clear_vars(&["FAREFLOW_PROVIDERS_TIMEOUT_MS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match EngineConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                provider_timeout_ms: Some(5_000),
                request_timeout_ms: Some(1_000),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => {
                return Err("expected validation failure but config load succeeded".to_string())
            }
            Err(error) => error,
        };

        ensure(
            matches!(
                error,
                ConfigError::Validation(ref message)
                    if message.contains("engine.request_timeout_ms")
            ),
            "validation failure should mention engine.request_timeout_ms",
        )
    }

    #[test]
    fn non_finite_tuning_weight_is_rejected_on_load() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("fareflow.toml");
        fs::write(
            &path,
            r#"
[adjustments.demand]
min_pct = nan
"#,
        )
        .map_err(|err| err.to_string())?;

        let options = LoadOptions { config_path: Some(path), ..LoadOptions::default() };
        let error = match EngineConfig::load(options) {
            Ok(_) => return Err("expected NaN demand floor to be rejected".to_string()),
            Err(error) => error,
        };

        ensure(
            matches!(
                error,
                ConfigError::Validation(ref message)
                    if message.contains("adjustments.demand.min_pct")
            ),
            "validation failure should name adjustments.demand.min_pct",
        )
    }

    #[test]
    fn non_finite_weather_weight_is_rejected() {
        let mut config = EngineConfig::default();
        config.adjustments.weather.storm = f64::INFINITY;

        let error = config.validate().expect_err("infinite weight must fail");
        assert!(error.to_string().contains("adjustments.weather.storm"));
    }

    #[test]
    fn missing_required_file_is_reported() {
        let _guard = env_lock().lock().expect("env lock");
        let error = EngineConfig::load(LoadOptions {
            config_path: Some("does/not/exist.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("missing file must fail");

        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }

    #[test]
    fn seasonal_band_with_zero_multiplier_is_rejected() {
        let mut config = EngineConfig::default();
        config.adjustments.seasonal.bands[0].multiplier = 0.0;

        let error = config.validate().expect_err("zero multiplier must fail");
        assert!(error.to_string().contains("seasonal"));
    }
}
