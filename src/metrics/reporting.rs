//! Run reports and console output formatting

use crate::common::Strategy;
use crate::metrics::aggregate::{Counters, MetricName, MetricsSnapshot};

use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::time::Duration;

/// What one scenario did during its window
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub strategy: Strategy,
    pub vus: u32,
    /// Configured start offset
    pub scheduled_offset: Duration,
    /// Offset at which the VUs were actually launched
    pub started_offset: Duration,
    /// The previous scenario was still draining at the scheduled offset
    pub late: bool,
    /// From launch until every VU terminated
    pub active: Duration,
    /// Metric activity observed during the window
    pub metrics: MetricsSnapshot,
}

/// Outcome of a whole run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Scenarios configured for the run
    pub planned: usize,
    pub scenarios: Vec<ScenarioReport>,
    pub totals: MetricsSnapshot,
    pub interrupted: bool,
}

impl RunReport {
    /// Print the final report to stdout
    pub fn print(&self) {
        print!("{}", self.render());
    }

    /// Format the full report
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_report(&mut out);
        out
    }

    fn write_report(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "\n📊 Card-Room Load Test Results")?;
        writeln!(out, "═══════════════════════════════════════════════════════════════")?;

        writeln!(out, "\n🔧 Run:")?;
        writeln!(out, "   Target:           {}", self.target)?;
        writeln!(
            out,
            "   Started:          {}",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(out, "   Elapsed:          {:.2}s", self.elapsed.as_secs_f64())?;
        writeln!(
            out,
            "   Scenarios:        {} of {} ran",
            self.scenarios.len(),
            self.planned
        )?;

        for scenario in &self.scenarios {
            write_scenario(out, scenario)?;
        }

        writeln!(out, "\n📈 Totals:")?;
        write_rates(out, &self.totals)?;
        write_counters(out, &self.totals.counters)?;

        if self.interrupted {
            writeln!(out, "\n⚠️  Run interrupted before all scenarios finished")?;
        } else {
            writeln!(out, "\n🎯 Run completed")?;
        }
        writeln!(out, "═══════════════════════════════════════════════════════════════")?;
        Ok(())
    }
}

fn write_scenario(out: &mut String, scenario: &ScenarioReport) -> std::fmt::Result {
    writeln!(
        out,
        "\n🃏 {} (strategy={}, {} VUs):",
        scenario.name, scenario.strategy, scenario.vus
    )?;
    if scenario.late {
        writeln!(
            out,
            "   Started:          {:.2}s (scheduled {:.2}s)",
            scenario.started_offset.as_secs_f64(),
            scenario.scheduled_offset.as_secs_f64()
        )?;
    } else {
        writeln!(
            out,
            "   Started:          {:.2}s",
            scenario.started_offset.as_secs_f64()
        )?;
    }
    writeln!(out, "   Active:           {:.2}s", scenario.active.as_secs_f64())?;
    write_rates(out, &scenario.metrics)?;
    write_counters(out, &scenario.metrics.counters)
}

fn write_rates(out: &mut String, snapshot: &MetricsSnapshot) -> std::fmt::Result {
    for name in MetricName::ALL {
        writeln!(out, "   {:<22} {}", format!("{}:", name), snapshot.sample(name))?;
    }
    Ok(())
}

fn write_counters(out: &mut String, counters: &Counters) -> std::fmt::Result {
    writeln!(out, "   Messages Sent:         {}", counters.messages_sent)?;
    writeln!(out, "   Messages Received:     {}", counters.messages_received)?;
    if counters.sends_dropped > 0 {
        writeln!(out, "   Sends Dropped:         {}", counters.sends_dropped)?;
    }
    writeln!(out, "   Sessions Opened:       {}", counters.sessions_opened)?;
    writeln!(
        out,
        "   Iterations:            {} completed, {} interrupted",
        counters.iterations_completed, counters.iterations_interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::AggregateMetrics;

    fn report(interrupted: bool) -> RunReport {
        let metrics = AggregateMetrics::new();
        metrics.record(MetricName::Connected, true);
        metrics.record(MetricName::Connected, false);
        metrics.record(MetricName::RoomCreated, true);
        metrics.record_message_sent();
        metrics.record_iteration(true);
        let totals = metrics.snapshot();

        RunReport {
            target: "ws://localhost:8080/ws/games".to_string(),
            started_at: DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
            elapsed: Duration::from_millis(12_340),
            planned: 2,
            scenarios: vec![ScenarioReport {
                name: "rdbms_test".to_string(),
                strategy: Strategy::Rdbms,
                vus: 10,
                scheduled_offset: Duration::ZERO,
                started_offset: Duration::ZERO,
                late: false,
                active: Duration::from_secs(12),
                metrics: totals.clone(),
            }],
            totals,
            interrupted,
        }
    }

    #[test]
    fn test_render_lists_every_rate() {
        let text = report(false).render();
        assert!(text.contains("Started:          2026-01-02 03:04:05 UTC"));
        assert!(text.contains("Elapsed:          12.34s"));
        assert!(text.contains("🃏 rdbms_test (strategy=rdbms, 10 VUs)"));
        assert!(text.contains("connected_successfully: 50.00% ✓ 1 ✗ 1"));
        assert!(text.contains("room_created_rate:     100.00% ✓ 1 ✗ 0"));
        assert!(text.contains("error_rate:            n/a (no samples)"));
        assert!(text.contains("1 completed, 0 interrupted"));
        assert!(text.contains("Run completed"));
        assert!(!text.contains("Sends Dropped"));
    }

    #[test]
    fn test_render_marks_interruption_and_skips() {
        let text = report(true).render();
        assert!(text.contains("Scenarios:        1 of 2 ran"));
        assert!(text.contains("Run interrupted"));
    }

    #[test]
    fn test_late_start_is_shown() {
        let mut run = report(false);
        run.scenarios[0].scheduled_offset = Duration::from_secs(5);
        run.scenarios[0].started_offset = Duration::from_millis(5_500);
        run.scenarios[0].late = true;
        assert!(run.render().contains("Started:          5.50s (scheduled 5.00s)"));
    }
}
