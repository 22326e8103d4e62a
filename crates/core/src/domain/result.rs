use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const FALLBACK_EXPLANATION: &str = "Standard pricing applied";
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Demand,
    Traffic,
    TimeOfDay,
    Weather,
    Events,
    UserTier,
    Seasonal,
}

/// The seven named percentage adjustments. Each may be negative.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentBreakdown {
    pub demand: Decimal,
    pub traffic: Decimal,
    pub time_of_day: Decimal,
    pub weather: Decimal,
    pub events: Decimal,
    pub user_tier: Decimal,
    pub seasonal: Decimal,
}

impl AdjustmentBreakdown {
    /// Adjustments in display order.
    pub fn entries(&self) -> [(AdjustmentKind, Decimal); 7] {
        [
            (AdjustmentKind::Demand, self.demand),
            (AdjustmentKind::Traffic, self.traffic),
            (AdjustmentKind::TimeOfDay, self.time_of_day),
            (AdjustmentKind::Weather, self.weather),
            (AdjustmentKind::Events, self.events),
            (AdjustmentKind::UserTier, self.user_tier),
            (AdjustmentKind::Seasonal, self.seasonal),
        ]
    }

    pub fn is_neutral(&self) -> bool {
        self.entries().iter().all(|(_, pct)| pct.is_zero())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceAlternative {
    pub pickup_at: DateTime<FixedOffset>,
    pub offset_minutes: i64,
    /// Positive when the alternative is cheaper than the quoted price.
    pub price_difference: Decimal,
    pub estimated_price: Decimal,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub base_price: Decimal,
    pub final_price: Decimal,
    pub breakdown: AdjustmentBreakdown,
    pub explanation: Vec<String>,
    pub confidence: f64,
    pub price_range: PriceRange,
    pub suggested_alternatives: Vec<PriceAlternative>,
    /// Set when the quote is the base-fare fallback rather than a computed price.
    pub degraded: bool,
}

impl PricingResult {
    /// Base fare with no adjustments and a flat ±10% band.
    pub fn fallback(base_price: Decimal) -> Self {
        let spread = Decimal::new(10, 2);
        let min = base_price
            .checked_mul(Decimal::ONE - spread)
            .map(crate::pricing::round_money)
            .unwrap_or(base_price);
        let max = base_price
            .checked_mul(Decimal::ONE + spread)
            .map(crate::pricing::round_money)
            .unwrap_or(base_price);

        Self {
            base_price,
            final_price: base_price,
            breakdown: AdjustmentBreakdown::default(),
            explanation: vec![FALLBACK_EXPLANATION.to_string()],
            confidence: FALLBACK_CONFIDENCE,
            price_range: PriceRange { min, max },
            suggested_alternatives: Vec::new(),
            degraded: true,
        }
    }
}
