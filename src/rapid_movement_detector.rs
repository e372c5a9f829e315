//! Rapid pass-through (receive-then-forward) detection.
//!
//! Grounded on `original_source/backend/app/rapid_movement_detector.py`: for
//! each account, a two-pointer scan over its sorted incoming and outgoing
//! timestamps finds every outgoing transaction that follows an incoming one
//! within `rapid_movement_minutes`. Money mules typically move funds out
//! within minutes of receiving them to dodge account freezes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::transaction::TransactionTable;

/// Per-account rapid pass-through evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct RapidMovement {
    pub min_dwell_minutes: f64,
    pub rapid_count: usize,
}

pub struct RapidMovementDetector;

impl RapidMovementDetector {
    pub fn detect(table: &TransactionTable, config: &EngineConfig) -> HashMap<String, RapidMovement> {
        let mut flagged = HashMap::new();

        let mut incoming: HashMap<&str, Vec<DateTime<Utc>>> = HashMap::new();
        let mut outgoing: HashMap<&str, Vec<DateTime<Utc>>> = HashMap::new();
        let mut rows: Vec<_> = table.rows().iter().collect();
        rows.sort_by_key(|t| t.timestamp);

        for tx in &rows {
            outgoing
                .entry(tx.sender_id.as_str())
                .or_default()
                .push(tx.timestamp);
            incoming
                .entry(tx.receiver_id.as_str())
                .or_default()
                .push(tx.timestamp);
        }

        let mut accounts: Vec<&str> = incoming
            .keys()
            .filter(|a| outgoing.contains_key(*a))
            .copied()
            .collect();
        accounts.sort_unstable();

        for acc in accounts {
            let in_times = &incoming[acc];
            let out_times = &outgoing[acc];

            let mut min_dwell: Option<f64> = None;
            let mut rapid_count = 0usize;
            let mut j = 0usize;

            for &in_ts in in_times {
                while j < out_times.len() && out_times[j] < in_ts {
                    j += 1;
                }
                let mut k = j;
                while k < out_times.len() {
                    let dwell = (out_times[k] - in_ts).num_milliseconds() as f64 / 60_000.0;
                    if dwell > config.rapid_movement_minutes {
                        break;
                    }
                    if dwell >= 0.0 {
                        rapid_count += 1;
                        min_dwell = Some(min_dwell.map_or(dwell, |m: f64| m.min(dwell)));
                    }
                    k += 1;
                }
            }

            if rapid_count > 0 {
                if let Some(min_dwell) = min_dwell {
                    flagged.insert(
                        acc.to_string(),
                        RapidMovement {
                            min_dwell_minutes: (min_dwell * 10.0).round() / 10.0,
                            rapid_count,
                        },
                    );
                }
            }
        }

        tracing::info!(accounts = flagged.len(), "rapid movement detection");
        flagged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;
    use chrono::{Duration, TimeZone};

    fn tx(id: &str, from: &str, to: &str, amount: f64, minute: i64) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            sender_id: from.to_string(),
            receiver_id: to.to_string(),
            amount,
            timestamp: chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minute),
        }
    }

    #[test]
    fn flags_fast_pass_through() {
        let config = EngineConfig::default();
        let rows = vec![
            tx("T1", "SRC", "MULE", 500.0, 0),
            tx("T2", "MULE", "DST", 500.0, 5),
        ];
        let table = TransactionTable::validate(rows, &config).unwrap();
        let flagged = RapidMovementDetector::detect(&table, &config);
        let hit = flagged.get("MULE").unwrap();
        assert_eq!(hit.rapid_count, 1);
        assert_eq!(hit.min_dwell_minutes, 5.0);
    }

    #[test]
    fn ignores_slow_forward() {
        let config = EngineConfig::default();
        let rows = vec![
            tx("T1", "SRC", "ACC", 500.0, 0),
            tx("T2", "ACC", "DST", 500.0, 120),
        ];
        let table = TransactionTable::validate(rows, &config).unwrap();
        let flagged = RapidMovementDetector::detect(&table, &config);
        assert!(flagged.is_empty());
    }
}
