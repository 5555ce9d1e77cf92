use crate::sim::SimulatedFrontend;
use anyhow::{Context, Result};
use std::time::Duration;
use targex_core::{ExperimentResults, TargetOrder, TrialConfig};
use targex_experiment::{RunOutcome, RunnerSettings, TrialRunner};
use targex_stats::StatTable;
use targex_timing::{Timer, VirtualTimer};

/// Headless demonstration run: a scripted participant works through two
/// conditions, then the derived statistics are printed and written to disk.
pub struct App {
    configs: Vec<TrialConfig>,
}

impl App {
    pub fn new() -> Self {
        let baseline = TrialConfig {
            num_targets: 8,
            target_order: TargetOrder::Clockwise,
            central_target: true,
            pre_target_delay: 0.25,
            first_target_extra_delay: 0.5,
            post_trial_delay: 0.5,
            post_block_delay: 1.0,
            weight: 2,
            ..TrialConfig::default()
        };
        let rotated = TrialConfig {
            target_order: TargetOrder::Random,
            rotation_degrees: 30.0,
            weight: 2,
            ..baseline.clone()
        };
        Self {
            configs: vec![baseline, rotated],
        }
    }

    pub fn run(self) -> Result<()> {
        let timer = VirtualTimer::new();
        let frontend = SimulatedFrontend::new(timer.clone(), Duration::from_micros(16_667), 0.04);
        let settings = RunnerSettings {
            splash_duration: 1.0,
            splash_message: "Move the cursor to each highlighted target".to_string(),
        };
        let mut runner = TrialRunner::with_settings(
            frontend,
            timer.clone(),
            rand::rng(),
            settings,
        );

        log::info!("running {} condition(s)", self.configs.len());
        let results = match runner.run(&self.configs)? {
            RunOutcome::Completed(results) => results,
            RunOutcome::Cancelled => {
                log::info!("run cancelled, nothing to report");
                return Ok(());
            }
        };

        let stats = timer.frame_stats();
        log::info!(
            "{} frames simulated at {:.1} fps, {} trial(s) recorded",
            runner.frontend().frames(),
            stats.effective_fps,
            results.len()
        );

        let table = StatTable::from_results(&results);
        print_table(&table);
        export(&results, &table)?;
        Ok(())
    }
}

fn print_table(table: &StatTable) {
    println!(
        "{:>5} {:>4} {:>6} {:>8} {:>8} {:>8} {:>8} {:>8} {:>9}",
        "trial", "tgt", "ok", "react", "move", "dist", "rmse", "peakvel", "area"
    );
    for row in table.rows() {
        println!(
            "{:>5} {:>4} {:>6} {:>8.3} {:>8.3} {:>8.3} {:>8.4} {:>8.3} {:>9.5}",
            row.trial_index,
            row.target_index,
            row.to_target.success,
            row.to_target.reaction_time,
            row.to_target.movement_time,
            row.to_target.distance,
            row.to_target.rmse,
            row.peak_velocity,
            row.area,
        );
    }
    let averages = table.averages();
    println!(
        "means: reaction {:.3} s, movement {:.3} s, rmse {:.4}, targets hit {:.0}%, clean trials {:.0}%",
        averages.to_target.reaction_time,
        averages.to_target.movement_time,
        averages.to_target.rmse,
        averages.successful_target_fraction * 100.0,
        averages.successful_trial_fraction * 100.0,
    );
}

fn export(results: &ExperimentResults, table: &StatTable) -> Result<()> {
    let raw = serde_json::to_string_pretty(results)?;
    std::fs::write("results.json", raw).context("writing results.json")?;
    let stats = serde_json::to_string_pretty(table)?;
    std::fs::write("stats.json", stats).context("writing stats.json")?;
    log::info!("wrote results.json and stats.json");
    Ok(())
}
