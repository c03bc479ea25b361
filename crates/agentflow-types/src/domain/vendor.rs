use serde::{Deserialize, Serialize};

/// Capability flags a model advertises to the Orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    pub tools: bool,
    pub streaming: bool,
}

/// Per-1k-token pricing for a model. Zero for self-hosted or
/// subscription-billed (OAuth) models (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_cost_per_1k: f64,
    pub output_cost_per_1k: f64,
}

impl ModelPricing {
    pub const ZERO: ModelPricing = ModelPricing {
        input_cost_per_1k: 0.0,
        output_cost_per_1k: 0.0,
    };

    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1000.0) * self.input_cost_per_1k
            + (output_tokens as f64 / 1000.0) * self.output_cost_per_1k
    }
}

/// A known model entry in a vendor's catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub context_window: u32,
    pub output_cap: u32,
    pub capabilities: ModelCapabilities,
    pub pricing: ModelPricing,
}

/// A model vendor: its id, display name, default model, and known models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorInfo {
    pub id: String,
    pub display_name: String,
    pub default_model: String,
    pub models: Vec<ModelInfo>,
}

impl VendorInfo {
    pub fn model(&self, model_id: &str) -> Option<&ModelInfo> {
        self.models.iter().find(|m| m.id == model_id)
    }
}

/// Normalised finish reason surfaced on every completed assistant message
/// (spec.md §6, §8). Any adapter string outside this closed set normalises
/// to `Stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    Error,
}

impl FinishReason {
    /// Normalises an adapter-reported finish string to the closed set.
    pub fn normalize(raw: &str) -> FinishReason {
        match raw {
            "tool-calls" | "tool_calls" | "tool_use" => FinishReason::ToolCalls,
            "length" | "max_tokens" => FinishReason::Length,
            "error" => FinishReason::Error,
            "stop" | "end_turn" | "stop_sequence" | "complete" => FinishReason::Stop,
            _ => FinishReason::Stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_finish_reason_normalises_to_stop() {
        assert_eq!(FinishReason::normalize("something_new"), FinishReason::Stop);
    }

    #[test]
    fn zero_pricing_yields_zero_cost() {
        assert_eq!(ModelPricing::ZERO.cost(10_000, 5_000), 0.0);
    }

    #[test]
    fn pricing_cost_matches_formula() {
        let pricing = ModelPricing {
            input_cost_per_1k: 0.003,
            output_cost_per_1k: 0.015,
        };
        let cost = pricing.cost(4, 2);
        assert!((cost - 0.000_042).abs() < 1e-12);
    }
}
