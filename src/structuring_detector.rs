//! Amount structuring (sub-threshold transaction) detection.
//!
//! Grounded on `original_source/backend/app/structuring_detector.py`: flags
//! senders with `structuring_min_tx` or more outgoing transactions whose
//! amounts fall in `[threshold * (1 - margin), threshold)` — just under a
//! reporting threshold like the US $10,000 CTR trigger.

use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::transaction::TransactionTable;

/// Per-account structuring evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Structuring {
    pub structured_tx_count: usize,
    pub avg_amount: f64,
    pub total_structured: f64,
}

pub struct StructuringDetector;

impl StructuringDetector {
    pub fn detect(table: &TransactionTable, config: &EngineConfig) -> HashMap<String, Structuring> {
        let mut flagged = HashMap::new();
        let lower_bound = config.structuring_threshold * (1.0 - config.structuring_margin);

        let mut by_sender: HashMap<&str, Vec<f64>> = HashMap::new();
        for tx in table.rows() {
            if tx.amount >= lower_bound && tx.amount < config.structuring_threshold {
                by_sender.entry(tx.sender_id.as_str()).or_default().push(tx.amount);
            }
        }

        for (sender, amounts) in by_sender {
            if amounts.len() >= config.structuring_min_tx {
                let total: f64 = amounts.iter().sum();
                let avg = total / amounts.len() as f64;
                flagged.insert(
                    sender.to_string(),
                    Structuring {
                        structured_tx_count: amounts.len(),
                        avg_amount: (avg * 100.0).round() / 100.0,
                        total_structured: (total * 100.0).round() / 100.0,
                    },
                );
            }
        }

        tracing::info!(accounts = flagged.len(), "structuring detection");
        flagged
    }
}
