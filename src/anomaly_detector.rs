//! Per-account statistical amount anomaly detection.
//!
//! Grounded on `original_source/backend/app/anomaly_detector.py`: flags an
//! account when at least one of its transactions (sent or received,
//! evaluated independently) deviates more than `amount_anomaly_stddev`
//! sample standard deviations from that account's own mean transaction
//! amount. Accounts with fewer than `MIN_TX_FOR_ANOMALY` transactions on a
//! given side are skipped — there isn't enough data for a meaningful z-score.

use std::collections::{HashMap, HashSet};

use crate::config::EngineConfig;
use crate::transaction::TransactionTable;

const MIN_TX_FOR_ANOMALY: usize = 5;

pub struct AnomalyDetector;

impl AnomalyDetector {
    pub fn detect(table: &TransactionTable, config: &EngineConfig) -> HashSet<String> {
        let mut flagged = HashSet::new();

        flag_side(table, config, true, &mut flagged);
        flag_side(table, config, false, &mut flagged);

        tracing::info!(accounts = flagged.len(), "amount anomaly detection");
        flagged
    }
}

fn flag_side(
    table: &TransactionTable,
    config: &EngineConfig,
    by_sender: bool,
    flagged: &mut HashSet<String>,
) {
    let mut amounts_by_acc: HashMap<&str, Vec<f64>> = HashMap::new();
    for tx in table.rows() {
        let acc = if by_sender {
            tx.sender_id.as_str()
        } else {
            tx.receiver_id.as_str()
        };
        amounts_by_acc.entry(acc).or_default().push(tx.amount);
    }

    for (acc, amounts) in amounts_by_acc {
        if amounts.len() < MIN_TX_FOR_ANOMALY {
            continue;
        }
        let mean = amounts.iter().sum::<f64>() / amounts.len() as f64;
        // Sample standard deviation (ddof = 1), matching pandas' default.
        let variance = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>()
            / (amounts.len() - 1) as f64;
        let std = variance.sqrt();
        if std <= 0.0 {
            continue;
        }
        if amounts
            .iter()
            .any(|a| (a - mean).abs() / std > config.amount_anomaly_stddev)
        {
            flagged.insert(acc.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;
    use chrono::{TimeZone, Utc};

    fn tx(id: &str, from: &str, to: &str, amount: f64) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            sender_id: from.to_string(),
            receiver_id: to.to_string(),
            amount,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn flags_outlier_amount() {
        let config = EngineConfig::default();
        let rows = vec![
            tx("T1", "A", "X1", 100.0),
            tx("T2", "A", "X2", 105.0),
            tx("T3", "A", "X3", 95.0),
            tx("T4", "A", "X4", 102.0),
            tx("T5", "A", "X5", 50_000.0),
        ];
        let table = TransactionTable::validate(rows, &config).unwrap();
        let flagged = AnomalyDetector::detect(&table, &config);
        assert!(flagged.contains("A"));
    }

    #[test]
    fn skips_accounts_with_too_few_transactions() {
        let config = EngineConfig::default();
        let rows = vec![tx("T1", "A", "X1", 100.0), tx("T2", "A", "X2", 50_000.0)];
        let table = TransactionTable::validate(rows, &config).unwrap();
        let flagged = AnomalyDetector::detect(&table, &config);
        assert!(flagged.is_empty());
    }
}
