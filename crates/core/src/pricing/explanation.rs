use rust_decimal::Decimal;

use crate::config::AdjustmentConfig;
use crate::domain::factors::PricingFactors;
use crate::domain::request::{PricingRequest, UserTier};
use crate::domain::result::{AdjustmentBreakdown, AdjustmentKind, FALLBACK_EXPLANATION};
use crate::pricing::adjustments::{applicable_time_rules, strongest_event};
use crate::pricing::assembler::ClampOutcome;
use crate::pricing::format_percent;

/// One line per non-zero adjustment, in breakdown order, followed by a note
/// when the price hit a limit.
pub fn generate_explanation(
    breakdown: &AdjustmentBreakdown,
    factors: &PricingFactors,
    request: &PricingRequest,
    clamp: ClampOutcome,
    config: &AdjustmentConfig,
) -> Vec<String> {
    let mut lines: Vec<String> = breakdown
        .entries()
        .into_iter()
        .filter(|(_, pct)| !pct.is_zero())
        .map(|(kind, pct)| describe(kind, pct, factors, request, config))
        .collect();

    match clamp {
        ClampOutcome::Ceiling => lines.push("Price capped at the maximum surge".to_string()),
        ClampOutcome::Floor => lines.push("Minimum fare applied".to_string()),
        ClampOutcome::Within => {}
    }

    if lines.is_empty() {
        lines.push(FALLBACK_EXPLANATION.to_string());
    }
    lines
}

fn describe(
    kind: AdjustmentKind,
    pct: Decimal,
    factors: &PricingFactors,
    request: &PricingRequest,
    config: &AdjustmentConfig,
) -> String {
    let label = format_percent(pct);
    match kind {
        AdjustmentKind::Demand if pct.is_sign_positive() => {
            format!("High demand in your area ({label})")
        }
        AdjustmentKind::Demand => format!("Lower demand than usual ({label})"),
        AdjustmentKind::Traffic => format!("Traffic delays on your route ({label})"),
        AdjustmentKind::TimeOfDay => {
            let rules = applicable_time_rules(
                factors.time_of_day,
                factors.day_of_week,
                &config.time_of_day,
            );
            let names: Vec<&str> = rules.iter().map(|(rule, _)| rule.label()).collect();
            if names.is_empty() {
                format!("Time-of-day pricing ({label})")
            } else {
                format!("{} pricing ({label})", capitalize(&names.join(" and ")))
            }
        }
        AdjustmentKind::Weather => {
            format!("{} conditions ({label})", capitalize(factors.weather.conditions.as_str()))
        }
        AdjustmentKind::Events => {
            match strongest_event(&factors.events, &request.route.pickup, &config.events) {
                Some((event, _)) => format!("Nearby event: {} ({label})", event.name),
                None => format!("Local events ({label})"),
            }
        }
        AdjustmentKind::UserTier => match factors.user_tier {
            UserTier::Vip => format!("VIP member discount ({label})"),
            UserTier::Premium => format!("Premium member discount ({label})"),
            UserTier::Standard => format!("Member pricing ({label})"),
        },
        AdjustmentKind::Seasonal if pct.is_sign_positive() => {
            format!("Seasonal demand ({label})")
        }
        AdjustmentKind::Seasonal => format!("Off-season pricing ({label})"),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
