//! Bet lifecycle metrics in Prometheus exposition format

use crate::common::types::CasinoGame;
use crate::errors::EngineResult;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

pub struct EngineMetrics {
    registry: Registry,
    bets_placed: IntCounterVec,
    placement_failures: IntCounterVec,
    approvals_sent: IntCounter,
    rolls_resolved: IntCounterVec,
    roll_timeouts: IntCounter,
    late_roll_results: IntCounter,
    subscription_errors: IntCounter,
    resolution_latency: Histogram,
}

impl EngineMetrics {
    pub fn new() -> EngineResult<Self> {
        let registry = Registry::new_custom(Some("casino_engine".to_string()), None)?;

        let bets_placed = IntCounterVec::new(
            Opts::new("bets_placed_total", "Wagers confirmed on chain"),
            &["game"],
        )?;
        let placement_failures = IntCounterVec::new(
            Opts::new("placement_failures_total", "Failed placement attempts by error code"),
            &["code"],
        )?;
        let approvals_sent = IntCounter::new("approvals_sent_total", "ERC-20 approve transactions")?;
        let rolls_resolved = IntCounterVec::new(
            Opts::new("rolls_resolved_total", "Bets whose Roll event was observed"),
            &["game", "source"],
        )?;
        let roll_timeouts = IntCounter::new("roll_timeouts_total", "Roll waits that hit the deadline")?;
        let late_roll_results = IntCounter::new(
            "late_roll_results_total",
            "Roll matches discarded because the wait was already resolved",
        )?;
        let subscription_errors = IntCounter::new(
            "subscription_errors_total",
            "Errors reported by live event subscriptions",
        )?;
        let resolution_latency = Histogram::with_opts(
            HistogramOpts::new(
                "resolution_latency_seconds",
                "Time from starting a roll wait to its resolution",
            )
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
        )?;

        registry.register(Box::new(bets_placed.clone()))?;
        registry.register(Box::new(placement_failures.clone()))?;
        registry.register(Box::new(approvals_sent.clone()))?;
        registry.register(Box::new(rolls_resolved.clone()))?;
        registry.register(Box::new(roll_timeouts.clone()))?;
        registry.register(Box::new(late_roll_results.clone()))?;
        registry.register(Box::new(subscription_errors.clone()))?;
        registry.register(Box::new(resolution_latency.clone()))?;

        Ok(Self {
            registry,
            bets_placed,
            placement_failures,
            approvals_sent,
            rolls_resolved,
            roll_timeouts,
            late_roll_results,
            subscription_errors,
            resolution_latency,
        })
    }

    pub fn record_bet_placed(&self, game: CasinoGame) {
        self.bets_placed.with_label_values(&[game.as_str()]).inc();
    }

    pub fn record_placement_failure(&self, code: &str) {
        self.placement_failures.with_label_values(&[code]).inc();
    }

    pub fn record_approval(&self) {
        self.approvals_sent.inc();
    }

    pub fn record_roll_resolved(&self, game: CasinoGame, source: &str, latency: Duration) {
        self.rolls_resolved
            .with_label_values(&[game.as_str(), source])
            .inc();
        self.resolution_latency.observe(latency.as_secs_f64());
    }

    pub fn record_roll_timeout(&self) {
        self.roll_timeouts.inc();
    }

    pub fn record_late_result(&self) {
        self.late_roll_results.inc();
    }

    pub fn record_subscription_error(&self) {
        self.subscription_errors.inc();
    }

    pub fn bets_placed(&self, game: CasinoGame) -> u64 {
        self.bets_placed.with_label_values(&[game.as_str()]).get()
    }

    pub fn approvals_sent(&self) -> u64 {
        self.approvals_sent.get()
    }

    pub fn rolls_resolved(&self, game: CasinoGame, source: &str) -> u64 {
        self.rolls_resolved
            .with_label_values(&[game.as_str(), source])
            .get()
    }

    pub fn roll_timeouts(&self) -> u64 {
        self.roll_timeouts.get()
    }

    pub fn late_results(&self) -> u64 {
        self.late_roll_results.get()
    }

    pub fn subscription_errors(&self) -> u64 {
        self.subscription_errors.get()
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> EngineResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| crate::errors::EngineError::Metrics(e.to_string()))
    }
}

impl std::fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = EngineMetrics::new().unwrap();
        metrics.record_bet_placed(CasinoGame::Dice);
        metrics.record_bet_placed(CasinoGame::Dice);
        metrics.record_approval();
        metrics.record_late_result();

        assert_eq!(metrics.bets_placed(CasinoGame::Dice), 2);
        assert_eq!(metrics.bets_placed(CasinoGame::Keno), 0);
        assert_eq!(metrics.approvals_sent(), 1);
        assert_eq!(metrics.late_results(), 1);
    }

    #[test]
    fn test_render_exposition() {
        let metrics = EngineMetrics::new().unwrap();
        metrics.record_roll_resolved(CasinoGame::Roulette, "live", Duration::from_millis(1_500));
        metrics.record_roll_timeout();

        let text = metrics.render().unwrap();
        assert!(text.contains("casino_engine_rolls_resolved_total{game=\"roulette\",source=\"live\"} 1"));
        assert!(text.contains("casino_engine_roll_timeouts_total 1"));
        assert!(text.contains("casino_engine_resolution_latency_seconds_count 1"));
    }

    #[test]
    fn test_independent_registries() {
        // Each engine owns its registry, so two instances never collide
        let first = EngineMetrics::new().unwrap();
        let second = EngineMetrics::new().unwrap();
        first.record_subscription_error();
        assert_eq!(first.subscription_errors(), 1);
        assert_eq!(second.subscription_errors(), 0);
    }
}
