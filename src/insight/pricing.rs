use std::collections::BTreeMap;

use crate::insight::types::{ModelId, ModelPrice, TokenUsage};

const CHARS_PER_TOKEN: u64 = 4;

/// Token estimate used when the provider does not report counts.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(CHARS_PER_TOKEN)
}

#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    prices: BTreeMap<ModelId, ModelPrice>,
}

impl PriceTable {
    pub fn new(prices: BTreeMap<ModelId, ModelPrice>) -> Self {
        Self { prices }
    }

    pub fn price(&self, model: &str) -> Option<&ModelPrice> {
        self.prices.get(model)
    }

    /// USD; an unpriced model costs nothing and is logged.
    pub fn cost(&self, model: &str, usage: &TokenUsage) -> f64 {
        match self.price(model) {
            Some(price) => {
                usage.input_tokens as f64 / 1_000_000.0 * price.input_per_million
                    + usage.output_tokens as f64 / 1_000_000.0 * price.output_per_million
            }
            None => {
                tracing::warn!(target: "insight", model = %model, "model_price_missing");
                0.0
            }
        }
    }
}
