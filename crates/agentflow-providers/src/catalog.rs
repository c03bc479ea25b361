//! The static vendor/model catalogue (spec.md §3 Vendor/Model Catalogue,
//! §4.1). Read-only process-wide shared state (spec.md §5 Shared resources).
//!
//! Ships the superset vendor list per the Open Question in spec.md §9:
//! `anthropic`, `anthropic-oauth`, `openai`, `ollama`.

use agentflow_types::{ModelCapabilities, ModelInfo, ModelPricing, VendorInfo};

fn tool_streaming_caps() -> ModelCapabilities {
    ModelCapabilities {
        tools: true,
        streaming: true,
    }
}

fn anthropic_models() -> Vec<ModelInfo> {
    vec![
        ModelInfo {
            id: "claude-opus-4".to_string(),
            context_window: 200_000,
            output_cap: 32_000,
            capabilities: tool_streaming_caps(),
            pricing: ModelPricing {
                input_cost_per_1k: 0.015,
                output_cost_per_1k: 0.075,
            },
        },
        ModelInfo {
            id: "claude-sonnet-4".to_string(),
            context_window: 200_000,
            output_cap: 64_000,
            capabilities: tool_streaming_caps(),
            pricing: ModelPricing {
                input_cost_per_1k: 0.003,
                output_cost_per_1k: 0.015,
            },
        },
        ModelInfo {
            id: "claude-haiku-4".to_string(),
            context_window: 200_000,
            output_cap: 64_000,
            capabilities: tool_streaming_caps(),
            pricing: ModelPricing {
                input_cost_per_1k: 0.0008,
                output_cost_per_1k: 0.004,
            },
        },
    ]
}

/// Builds the default catalogue. Exposed as a function rather than a
/// `const`/`static` because `VendorInfo` holds owned `String`/`Vec` data.
pub fn default_catalogue() -> Vec<VendorInfo> {
    vec![
        VendorInfo {
            id: "anthropic".to_string(),
            display_name: "Anthropic".to_string(),
            default_model: "claude-sonnet-4".to_string(),
            models: anthropic_models(),
        },
        VendorInfo {
            id: "anthropic-oauth".to_string(),
            display_name: "Anthropic (subscription)".to_string(),
            default_model: "claude-sonnet-4".to_string(),
            models: anthropic_models()
                .into_iter()
                .map(|mut model| {
                    model.pricing = ModelPricing::ZERO;
                    model
                })
                .collect(),
        },
        VendorInfo {
            id: "openai".to_string(),
            display_name: "OpenAI".to_string(),
            default_model: "gpt-5".to_string(),
            models: vec![
                ModelInfo {
                    id: "gpt-5".to_string(),
                    context_window: 272_000,
                    output_cap: 128_000,
                    capabilities: tool_streaming_caps(),
                    pricing: ModelPricing {
                        input_cost_per_1k: 0.00125,
                        output_cost_per_1k: 0.01,
                    },
                },
                ModelInfo {
                    id: "gpt-5-mini".to_string(),
                    context_window: 272_000,
                    output_cap: 128_000,
                    capabilities: tool_streaming_caps(),
                    pricing: ModelPricing {
                        input_cost_per_1k: 0.00025,
                        output_cost_per_1k: 0.002,
                    },
                },
            ],
        },
        VendorInfo {
            id: "ollama".to_string(),
            display_name: "Ollama (self-hosted)".to_string(),
            default_model: "llama3.1".to_string(),
            models: vec![ModelInfo {
                id: "llama3.1".to_string(),
                context_window: 128_000,
                output_cap: 8_192,
                capabilities: tool_streaming_caps(),
                pricing: ModelPricing::ZERO,
            }],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_has_superset_vendors() {
        let ids: Vec<&str> = default_catalogue().iter().map(|v| v.id.as_str()).collect();
        assert!(ids.contains(&"anthropic"));
        assert!(ids.contains(&"anthropic-oauth"));
        assert!(ids.contains(&"openai"));
        assert!(ids.contains(&"ollama"));
    }

    #[test]
    fn oauth_vendor_has_zero_pricing() {
        let catalogue = default_catalogue();
        let oauth = catalogue.iter().find(|v| v.id == "anthropic-oauth").unwrap();
        for model in &oauth.models {
            assert_eq!(model.pricing, ModelPricing::ZERO);
        }
    }
}
