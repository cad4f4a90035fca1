//! Token usage and cost accounting for provider calls.
//!
//! Pricing is a static table keyed by exact model id. Unknown models are
//! priced at zero rather than guessed, so the reported cost is always either
//! correct or obviously missing.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Per-model pricing (USD per 1M tokens).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// Estimate cost for given token counts (unrounded).
    pub fn estimate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1_000_000.0) * self.input_per_million
            + (output_tokens as f64 / 1_000_000.0) * self.output_per_million
    }
}

const PRICING: &[(&str, ModelPricing)] = &[
    ("gemini-3-flash-preview", ModelPricing::new(0.5, 3.0)),
    ("gemini-3-pro-preview", ModelPricing::new(2.0, 12.0)),
    ("sonar-pro", ModelPricing::new(10.0, 25.0)),
    ("sonar-deep-research", ModelPricing::new(30.0, 60.0)),
];

/// Look up pricing for a model id. Unknown models cost nothing.
pub fn pricing_for_model(model: &str) -> ModelPricing {
    PRICING
        .iter()
        .find(|(id, _)| *id == model)
        .map(|(_, p)| *p)
        .unwrap_or_default()
}

/// Usage and estimated cost of one provider call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostMetrics {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost_usd: f64,
}

/// Compute [`CostMetrics`] with the cost rounded to 6 decimal places.
pub fn calculate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> CostMetrics {
    let raw = pricing_for_model(model).estimate_cost(input_tokens, output_tokens);
    CostMetrics {
        model: model.to_string(),
        input_tokens,
        output_tokens,
        total_tokens: input_tokens + output_tokens,
        estimated_cost_usd: (raw * 1_000_000.0).round() / 1_000_000.0,
    }
}

/// Emit a structured cost record on the `cost` target.
pub fn log_cost(metrics: &CostMetrics, cache_hit: bool) {
    info!(
        target: "cost",
        model = %metrics.model,
        input_tokens = metrics.input_tokens,
        output_tokens = metrics.output_tokens,
        total_tokens = metrics.total_tokens,
        estimated_cost_usd = metrics.estimated_cost_usd,
        cache_hit,
        timestamp = %chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "[COST] {} ${:.6}",
        metrics.model,
        metrics.estimated_cost_usd,
    );
}
