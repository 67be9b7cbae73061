use anyhow::Result;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::campaign::{CampaignPlan, CampaignSummary, run_campaign};
use super::scenarios::TestScenario;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    /// Summary of the last iteration, kept for reports.
    pub last_summary: Option<CampaignSummary>,
}

pub struct LogicTester {
    verbose: bool,
}

impl LogicTester {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        seeds
            .iter()
            .map(|&seed| {
                if self.verbose {
                    println!(
                        "🧪 Testing scenario: {} (strategy: {} seed: {})",
                        scenario.name.bright_white(),
                        scenario.plan.strategy,
                        seed
                    );
                }
                self.run_single_scenario(scenario, seed, iterations)
            })
            .collect()
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut durations = Vec::new();
        let mut last_summary = None;

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            match run_iteration(&scenario.plan, iteration_seed) {
                Ok(summary) => {
                    successes += 1;
                    let duration = start_time.elapsed();
                    durations.push(duration);
                    if self.verbose {
                        println!(
                            "  ✅ Iteration {}/{} passed ({duration:?}) year:{} accepted:{} refused:{}",
                            i + 1,
                            iterations,
                            summary.final_year,
                            summary.actions.accepted_total(),
                            summary.actions.rejected_total()
                        );
                    }
                    last_summary = Some(summary);
                }
                Err(err) => {
                    let message = format!(
                        "Iteration {} (strategy {}, seed {iteration_seed}): {err:#}",
                        i + 1,
                        scenario.plan.strategy
                    );
                    if self.verbose {
                        println!("  ❌ {}", message.clone().red());
                    }
                    failures.push(message);
                }
            }
        }

        let average_duration = if durations.is_empty() {
            Duration::ZERO
        } else {
            durations.iter().sum::<Duration>() / u32::try_from(durations.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.to_string(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration,
            last_summary,
        }
    }
}

fn run_iteration(plan: &CampaignPlan, seed: u64) -> Result<CampaignSummary> {
    let summary = run_campaign(plan, seed)?;
    if plan.replay_check {
        let replay = run_campaign(plan, seed)?;
        anyhow::ensure!(
            replay == summary,
            "replay diverged: digest {} vs {}",
            summary.world_digest,
            replay.world_digest
        );
    }
    for expectation in &plan.expectations {
        expectation.check(&summary)?;
    }
    Ok(summary)
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}
