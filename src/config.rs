//! Centralised, environment-tunable configuration.
//!
//! All detector thresholds live here so nothing is scattered across modules.
//! [`EngineConfig::from_env`] reads the same environment variable names the
//! original Python `config.py` used.

use std::env;

/// Every tunable threshold the engine's detectors and scorer consult.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    // Input limits
    pub max_rows: usize,

    // Cycle detection
    pub cycle_min_len: usize,
    pub cycle_max_len: usize,
    pub max_cycles: usize,
    pub cycle_timeout_seconds: f64,

    // Smurfing detection
    pub fan_threshold: usize,
    pub smurf_window_hours: i64,
    pub merchant_amount_cv_threshold: f64,
    pub payroll_batch_seconds: f64,

    // Shell detection
    pub shell_max_tx: u32,
    pub shell_min_chain: usize,
    pub shell_max_chain: usize,
    pub max_shell_chains: usize,

    // Scoring
    pub score_cycle_3: f64,
    pub score_cycle_4: f64,
    pub score_cycle_5: f64,
    pub score_fan_in: f64,
    pub score_fan_out: f64,
    pub score_shell: f64,
    pub score_high_velocity: f64,
    pub score_multi_ring_bonus: f64,
    pub score_centrality_max: f64,
    pub high_velocity_tx_per_day: f64,
    pub score_amount_anomaly: f64,
    pub score_round_trip: f64,
    pub score_rapid_movement: f64,
    pub score_structuring: f64,
    pub min_suspicion_score: f64,

    // Amount anomaly detection
    pub amount_anomaly_stddev: f64,

    // Round-trip detection
    pub round_trip_amount_tolerance: f64,

    // Rapid movement detection
    pub rapid_movement_minutes: f64,

    // Structuring detection
    pub structuring_threshold: f64,
    pub structuring_margin: f64,
    pub structuring_min_tx: usize,

    // Centrality / clustering graph-size gates
    pub centrality_max_nodes: usize,
    pub clustering_max_nodes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_rows: 10_000,

            cycle_min_len: 3,
            cycle_max_len: 5,
            max_cycles: 5_000,
            cycle_timeout_seconds: 5.0,

            fan_threshold: 10,
            smurf_window_hours: 72,
            merchant_amount_cv_threshold: 0.15,
            payroll_batch_seconds: 60.0,

            shell_max_tx: 3,
            shell_min_chain: 3,
            shell_max_chain: 6,
            max_shell_chains: 1_000,

            score_cycle_3: 35.0,
            score_cycle_4: 30.0,
            score_cycle_5: 25.0,
            score_fan_in: 28.0,
            score_fan_out: 28.0,
            score_shell: 22.0,
            score_high_velocity: 15.0,
            score_multi_ring_bonus: 10.0,
            score_centrality_max: 10.0,
            high_velocity_tx_per_day: 5.0,
            score_amount_anomaly: 20.0,
            score_round_trip: 20.0,
            score_rapid_movement: 20.0,
            score_structuring: 15.0,
            min_suspicion_score: 20.0,

            amount_anomaly_stddev: 3.0,

            round_trip_amount_tolerance: 0.2,

            rapid_movement_minutes: 30.0,

            structuring_threshold: 10_000.0,
            structuring_margin: 0.15,
            structuring_min_tx: 3,

            centrality_max_nodes: 500,
            clustering_max_nodes: 1_000,
        }
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl EngineConfig {
    /// Build a config from defaults, overridden by environment variables
    /// using the same names as the original Python `config.py`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_rows: env_usize("MAX_ROWS", d.max_rows),
            max_cycles: env_usize("MAX_CYCLES", d.max_cycles),
            cycle_timeout_seconds: env_f64("CYCLE_TIMEOUT_SECONDS", d.cycle_timeout_seconds),
            fan_threshold: env_usize("FAN_THRESHOLD", d.fan_threshold),
            smurf_window_hours: env_i64("SMURF_WINDOW_HOURS", d.smurf_window_hours),
            merchant_amount_cv_threshold: env_f64(
                "MERCHANT_AMOUNT_CV_THRESHOLD",
                d.merchant_amount_cv_threshold,
            ),
            payroll_batch_seconds: env_f64("PAYROLL_BATCH_SECONDS", d.payroll_batch_seconds),
            shell_max_tx: env_u32("SHELL_MAX_TX", d.shell_max_tx),
            shell_max_chain: env_usize("SHELL_MAX_CHAIN", d.shell_max_chain),
            max_shell_chains: env_usize("MAX_SHELL_CHAINS", d.max_shell_chains),
            high_velocity_tx_per_day: env_f64(
                "HIGH_VELOCITY_TX_PER_DAY",
                d.high_velocity_tx_per_day,
            ),
            min_suspicion_score: env_f64("MIN_SUSPICION_SCORE", d.min_suspicion_score),
            amount_anomaly_stddev: env_f64("AMOUNT_ANOMALY_STDDEV", d.amount_anomaly_stddev),
            round_trip_amount_tolerance: env_f64(
                "ROUND_TRIP_AMOUNT_TOLERANCE",
                d.round_trip_amount_tolerance,
            ),
            rapid_movement_minutes: env_f64("RAPID_MOVEMENT_MINUTES", d.rapid_movement_minutes),
            structuring_threshold: env_f64("STRUCTURING_THRESHOLD", d.structuring_threshold),
            structuring_margin: env_f64("STRUCTURING_MARGIN", d.structuring_margin),
            structuring_min_tx: env_usize("STRUCTURING_MIN_TX", d.structuring_min_tx),
            ..d
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let c = EngineConfig::default();
        assert_eq!(c.fan_threshold, 10);
        assert_eq!(c.smurf_window_hours, 72);
        assert_eq!(c.shell_max_tx, 3);
        assert_eq!(c.structuring_threshold, 10_000.0);
        assert_eq!(c.min_suspicion_score, 20.0);
    }

    #[test]
    fn from_env_falls_back_to_defaults_when_unset() {
        env::remove_var("FAN_THRESHOLD");
        let c = EngineConfig::from_env();
        assert_eq!(c.fan_threshold, EngineConfig::default().fan_threshold);
    }
}
