//! Headless runs for the CLI subcommands.

use serde::Serialize;
use std::fmt::Write as _;

use crate::advisory::AnalysisResult;
use crate::sim::model::{StressMode, SystemAlert, SystemStats};
use crate::sim::Simulation;

/// One line of a headless run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickRow {
    pub tick: u64,
    pub cpu: f64,
    pub memory_percent: f64,
    pub cpu_temp: f64,
    pub health: u8,
    pub processes: usize,
    pub new_alerts: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub seed: u64,
    pub stress: StressMode,
    pub ticks: Vec<TickRow>,
    pub final_stats: SystemStats,
    pub alerts: Vec<SystemAlert>,
}

/// Advance `sim` by `ticks` configured periods, recording each one.
pub fn simulate(sim: &mut Simulation, ticks: u64) -> RunReport {
    let period = sim.tick_period();
    let rows: Vec<TickRow> = (0..ticks)
        .map(|_| {
            let new_alerts = sim.tick(period).new_alerts.len();
            let stats = &sim.world().stats;
            TickRow {
                tick: sim.world().tick,
                cpu: round1(stats.total_cpu_usage),
                memory_percent: round1(stats.memory_percent()),
                cpu_temp: round1(stats.thermal.cpu_temp),
                health: stats.health_score,
                processes: stats.total_processes,
                new_alerts,
            }
        })
        .collect();

    let mut alerts: Vec<SystemAlert> = sim.alerts().cloned().collect();
    alerts.reverse();

    RunReport {
        seed: sim.seed(),
        stress: sim.stress_mode(),
        ticks: rows,
        final_stats: sim.world().stats.clone(),
        alerts,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Plain-text rendering of a run.
pub fn render_table(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "seed {}  stress {}", report.seed, report.stress);
    let _ = writeln!(
        out,
        "{:>6} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6}",
        "TICK", "CPU%", "MEM%", "TEMP", "HEALTH", "PROCS", "ALERTS"
    );
    for row in &report.ticks {
        let _ = writeln!(
            out,
            "{:>6} {:>6.1} {:>6.1} {:>6.1} {:>6} {:>6} {:>6}",
            row.tick,
            row.cpu,
            row.memory_percent,
            row.cpu_temp,
            row.health,
            row.processes,
            row.new_alerts
        );
    }

    if !report.alerts.is_empty() {
        let _ = writeln!(out, "\nalerts:");
        for alert in &report.alerts {
            let _ = writeln!(
                out,
                "  [{}] {:<8} {}",
                alert.timestamp.format("%H:%M:%S"),
                alert.severity.to_string(),
                alert.message
            );
        }
    }
    out
}

pub fn render_analysis(result: &AnalysisResult) -> String {
    let mut out = format!("status: {}\n\n", result.status);
    for line in textwrap::wrap(&result.summary, 76) {
        let _ = writeln!(out, "{}", line);
    }
    if !result.recommendations.is_empty() {
        let _ = writeln!(out, "\nrecommendations:");
        let options = textwrap::Options::new(76)
            .initial_indent("  - ")
            .subsequent_indent("    ");
        for recommendation in &result.recommendations {
            for line in textwrap::wrap(recommendation, &options) {
                let _ = writeln!(out, "{}", line);
            }
        }
    }
    out
}
