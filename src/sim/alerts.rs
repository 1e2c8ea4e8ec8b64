//! Threshold evaluation with rising-edge detection.
//!
//! Each dimension carries a latched level. An alert fires only when the
//! computed level rises above the latch; the latch is released only once
//! the value falls back under the warning threshold.

use crate::config::{Threshold, ThresholdsConfig};
use crate::sim::model::{AlertLevel, AlertLevels, AlertSeverity, Component, SystemStats};

/// What changed for one dimension this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub component: Component,
    pub severity: AlertSeverity,
    pub message: String,
}

fn classify(value: f64, threshold: Threshold) -> AlertLevel {
    if value >= threshold.critical {
        AlertLevel::Critical
    } else if value >= threshold.warning {
        AlertLevel::Warning
    } else {
        AlertLevel::Normal
    }
}

fn readings(stats: &SystemStats, thresholds: &ThresholdsConfig) -> [(Component, f64, Threshold); 4] {
    [
        (Component::Cpu, stats.total_cpu_usage, thresholds.cpu),
        (Component::Memory, stats.memory_percent(), thresholds.memory),
        (Component::Disk, stats.disk_percent(), thresholds.disk),
        (Component::System, stats.thermal.cpu_temp, thresholds.thermal),
    ]
}

fn describe(component: Component, level: AlertLevel, value: f64) -> String {
    let severity = match level {
        AlertLevel::Critical => "critical",
        _ => "high",
    };
    match component {
        Component::Cpu => format!("CPU usage {} at {:.1}%", severity, value),
        Component::Memory => format!("Memory usage {} at {:.1}% of physical RAM", severity, value),
        Component::Disk => format!("Disk usage {} at {:.1}% of capacity", severity, value),
        Component::System => format!("CPU temperature {} at {:.1}°C", severity, value),
    }
}

fn describe_recovery(component: Component, value: f64) -> String {
    match component {
        Component::Cpu => format!("CPU usage back to normal ({:.1}%)", value),
        Component::Memory => format!("Memory pressure relieved ({:.1}%)", value),
        Component::Disk => format!("Disk usage back under threshold ({:.1}%)", value),
        Component::System => format!("CPU temperature back to normal ({:.1}°C)", value),
    }
}

/// Compare fresh stats against thresholds.
///
/// Returns the updated latches and the alerts to raise.
pub fn evaluate(
    previous: AlertLevels,
    stats: &SystemStats,
    thresholds: &ThresholdsConfig,
) -> (AlertLevels, Vec<AlertEvent>) {
    let mut levels = previous;
    let mut events = Vec::new();

    for (component, value, threshold) in readings(stats, thresholds) {
        let latched = previous.get(component);
        let current = classify(value, threshold);

        if current > latched {
            let severity = match current {
                AlertLevel::Critical => AlertSeverity::Critical,
                _ => AlertSeverity::Warning,
            };
            events.push(AlertEvent {
                component,
                severity,
                message: describe(component, current, value),
            });
            levels.set(component, current);
        } else if current == AlertLevel::Normal && latched != AlertLevel::Normal {
            events.push(AlertEvent {
                component,
                severity: AlertSeverity::Info,
                message: describe_recovery(component, value),
            });
            levels.set(component, AlertLevel::Normal);
        }
    }

    (levels, events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::sim::telemetry::initial_stats;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn stats_with_cpu(cpu: f64) -> SystemStats {
        let mut stats = initial_stats(&[], &[], Utc::now(), &SimulationConfig::default());
        stats.total_cpu_usage = cpu;
        stats
    }

    fn cpu_events(levels: AlertLevels, cpu: f64) -> (AlertLevels, Vec<AlertSeverity>) {
        let (levels, events) = evaluate(levels, &stats_with_cpu(cpu), &ThresholdsConfig::default());
        let severities = events
            .into_iter()
            .filter(|e| e.component == Component::Cpu)
            .map(|e| e.severity)
            .collect();
        (levels, severities)
    }

    #[test]
    fn quiet_machine_raises_nothing() {
        let (levels, events) = evaluate(
            AlertLevels::default(),
            &stats_with_cpu(20.0),
            &ThresholdsConfig::default(),
        );
        assert!(events.is_empty());
        assert_eq!(levels, AlertLevels::default());
    }

    #[test]
    fn persistent_breach_alerts_once() {
        let (levels, first) = cpu_events(AlertLevels::default(), 97.0);
        assert_eq!(first, vec![AlertSeverity::Critical]);

        let (levels, second) = cpu_events(levels, 98.0);
        assert!(second.is_empty());

        // Dipping into the warning band keeps the latch.
        let (levels, third) = cpu_events(levels, 85.0);
        assert!(third.is_empty());
        let (_, fourth) = cpu_events(levels, 99.0);
        assert!(fourth.is_empty());
    }

    #[test]
    fn recovery_rearms_the_latch() {
        let (levels, _) = cpu_events(AlertLevels::default(), 97.0);
        let (levels, recovered) = cpu_events(levels, 40.0);
        assert_eq!(recovered, vec![AlertSeverity::Info]);
        assert_eq!(levels.cpu, AlertLevel::Normal);

        let (_, again) = cpu_events(levels, 96.0);
        assert_eq!(again, vec![AlertSeverity::Critical]);
    }

    #[test]
    fn warning_escalates_to_critical() {
        let (levels, warn) = cpu_events(AlertLevels::default(), 82.0);
        assert_eq!(warn, vec![AlertSeverity::Warning]);
        let (levels, crit) = cpu_events(levels, 96.0);
        assert_eq!(crit, vec![AlertSeverity::Critical]);
        assert_eq!(levels.cpu, AlertLevel::Critical);
    }

    #[test]
    fn messages_name_the_value() {
        let mut stats = stats_with_cpu(10.0);
        stats.thermal.cpu_temp = 93.0;
        let (_, events) = evaluate(AlertLevels::default(), &stats, &ThresholdsConfig::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].component, Component::System);
        assert!(events[0].message.contains("93.0"));
    }
}
