//! Input transaction model.
//!
//! The engine consumes an already-validated transaction table; CSV decoding
//! and row-level validation are an external collaborator's job (§1). This
//! module still asserts the boundary invariants defensively — sender != receiver,
//! amount > 0, unique transaction IDs, row cap — since the cost of checking is
//! negligible and a caller bug here should fail loudly rather than corrupt the
//! graph silently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// A single financial transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub transaction_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// A validated, immutable batch of transactions ready for analysis.
///
/// Constructed once per request via [`TransactionTable::validate`] and never
/// mutated afterward — matches the "immutable for the lifetime of the
/// request" shared-resource policy in spec.md §5.
#[derive(Debug, Clone)]
pub struct TransactionTable {
    rows: Vec<Transaction>,
}

impl TransactionTable {
    /// Validate a batch of transactions against the engine's boundary
    /// invariants and the configured row cap.
    pub fn validate(
        transactions: Vec<Transaction>,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        if transactions.is_empty() {
            return Err(EngineError::EmptyTable);
        }
        if transactions.len() > config.max_rows {
            return Err(EngineError::RowCapExceeded {
                actual: transactions.len(),
                max: config.max_rows,
            });
        }

        let mut seen_ids = std::collections::HashSet::with_capacity(transactions.len());
        for tx in &transactions {
            if tx.sender_id == tx.receiver_id {
                return Err(EngineError::InvalidTransaction {
                    transaction_id: tx.transaction_id.clone(),
                    reason: "sender_id equals receiver_id".to_string(),
                });
            }
            if !(tx.amount > 0.0) {
                return Err(EngineError::InvalidTransaction {
                    transaction_id: tx.transaction_id.clone(),
                    reason: "amount must be positive".to_string(),
                });
            }
            if !seen_ids.insert(tx.transaction_id.clone()) {
                return Err(EngineError::DuplicateTransactionId(
                    tx.transaction_id.clone(),
                ));
            }
        }

        Ok(Self { rows: transactions })
    }

    pub fn rows(&self) -> &[Transaction] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All distinct account IDs appearing as either sender or receiver.
    pub fn accounts(&self) -> std::collections::HashSet<&str> {
        let mut set = std::collections::HashSet::new();
        for tx in &self.rows {
            set.insert(tx.sender_id.as_str());
            set.insert(tx.receiver_id.as_str());
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

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
    fn rejects_empty_table() {
        let config = EngineConfig::default();
        let result = TransactionTable::validate(vec![], &config);
        assert_eq!(result.unwrap_err(), EngineError::EmptyTable);
    }

    #[test]
    fn rejects_self_transaction() {
        let config = EngineConfig::default();
        let result = TransactionTable::validate(vec![tx("T1", "A", "A", 100.0)], &config);
        assert!(matches!(
            result,
            Err(EngineError::InvalidTransaction { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_amount() {
        let config = EngineConfig::default();
        let result = TransactionTable::validate(vec![tx("T1", "A", "B", 0.0)], &config);
        assert!(matches!(
            result,
            Err(EngineError::InvalidTransaction { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_transaction_id() {
        let config = EngineConfig::default();
        let rows = vec![tx("T1", "A", "B", 100.0), tx("T1", "C", "D", 50.0)];
        let result = TransactionTable::validate(rows, &config);
        assert!(matches!(
            result,
            Err(EngineError::DuplicateTransactionId(_))
        ));
    }

    #[test]
    fn rejects_over_row_cap() {
        let mut config = EngineConfig::default();
        config.max_rows = 1;
        let rows = vec![tx("T1", "A", "B", 100.0), tx("T2", "A", "C", 50.0)];
        let result = TransactionTable::validate(rows, &config);
        assert!(matches!(
            result,
            Err(EngineError::RowCapExceeded { actual: 2, max: 1 })
        ));
    }

    #[test]
    fn accepts_valid_table() {
        let config = EngineConfig::default();
        let rows = vec![tx("T1", "A", "B", 100.0), tx("T2", "B", "C", 50.0)];
        let table = TransactionTable::validate(rows, &config).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.accounts().len(), 3);
    }
}
