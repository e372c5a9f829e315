//! Money-muling detection example
//!
//! Builds a small synthetic batch containing a circular routing cycle, a
//! fan-in aggregator, and a layered shell chain, runs the full engine, and
//! prints the resulting suspicion scores and fraud rings.

use chrono::{Duration, TimeZone, Utc};
use money_mule_forensics::{analyze, EngineConfig, Transaction};

fn tx(id: &str, from: &str, to: &str, amount: f64, offset_minutes: i64) -> Transaction {
    Transaction {
        transaction_id: id.to_string(),
        sender_id: from.to_string(),
        receiver_id: to.to_string(),
        amount,
        timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
            + Duration::minutes(offset_minutes),
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    println!("=== Money Mule Forensics ===\n");

    let mut transactions = vec![
        // Circular routing: A -> B -> C -> A.
        tx("T1", "A", "B", 5_000.0, 0),
        tx("T2", "B", "C", 4_900.0, 60),
        tx("T3", "C", "A", 4_800.0, 120),
        // Layered shell chain: SRC -> X -> Y -> DST.
        tx("T4", "SRC", "X", 2_000.0, 10),
        tx("T5", "X", "Y", 2_000.0, 20),
        tx("T6", "Y", "DST", 2_000.0, 30),
    ];

    // Fan-in aggregation: twelve senders converge on HUB within two hours.
    for i in 0..12 {
        transactions.push(tx(
            &format!("FANIN-{i}"),
            &format!("S_{i:02}"),
            "HUB",
            250.0 + i as f64,
            i as i64 * 5,
        ));
    }

    let config = EngineConfig::from_env();
    let report = match analyze(transactions, &config) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("analysis rejected: {err}");
            std::process::exit(1);
        }
    };

    println!(
        "Analyzed {} accounts in {:.3}s (timed out: {})\n",
        report.summary.total_accounts_analyzed,
        report.summary.processing_time_seconds,
        report.timed_out
    );

    println!("Fraud rings ({}):", report.fraud_rings.len());
    for ring in &report.fraud_rings {
        println!(
            "  {} [{}] risk={:.1} confidence={:.3} members={:?}",
            ring.ring_id, ring.pattern_type, ring.risk_score, ring.confidence, ring.member_accounts
        );
    }

    println!("\nSuspicious accounts ({}):", report.suspicious_accounts.len());
    for acc in &report.suspicious_accounts {
        println!(
            "  {} score={:.1} ring={} patterns={:?}",
            acc.account_id, acc.suspicion_score, acc.ring_id, acc.detected_patterns
        );
        println!("    {}", acc.risk_explanation);
    }

    let stats = &report.summary.network_statistics;
    println!(
        "\nNetwork: {} nodes, {} edges, density={:.4}, avg_degree={:.2}, components={}",
        stats.total_nodes, stats.total_edges, stats.graph_density, stats.avg_degree, stats.connected_components
    );
}
