use anyhow::{Result, anyhow, ensure};

use super::campaign::{CampaignPlan, CampaignSummary};
use super::policy::CampaignStrategy;

/// Named campaign run by the logic tester.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub plan: CampaignPlan,
}

impl TestScenario {
    fn new(
        key: &'static str,
        name: &'static str,
        description: &'static str,
        plan: CampaignPlan,
    ) -> Self {
        Self {
            key,
            name,
            description,
            plan: plan
                .with_expectation(no_violations)
                .with_expectation(treasuries_non_negative),
        }
    }
}

pub fn catalog() -> Vec<TestScenario> {
    vec![
        TestScenario::new(
            "smoke",
            "Smoke",
            "One balanced year over the bundled scenario",
            CampaignPlan::new(CampaignStrategy::Balanced, 1).with_expectation(years_advanced),
        ),
        TestScenario::new(
            "steward",
            "Steward Economy",
            "Five years of land and trade investment",
            CampaignPlan::new(CampaignStrategy::Steward, 5)
                .with_expectation(years_advanced)
                .with_expectation(investments_resolved),
        ),
        TestScenario::new(
            "warlord",
            "Warlord Buildup",
            "Five years of arms purchases and legion levies",
            CampaignPlan::new(CampaignStrategy::Warlord, 5)
                .with_expectation(years_advanced)
                .with_expectation(legions_raised),
        ),
        TestScenario::new(
            "random-walk",
            "Random Walk",
            "Eight years of seeded random commands, many of them invalid",
            CampaignPlan::new(CampaignStrategy::Random, 8).with_expectation(years_advanced),
        ),
        TestScenario::new(
            "rollback",
            "Rollback Round Trip",
            "Four years, then roll back mid-campaign and undo the rollback",
            CampaignPlan::new(CampaignStrategy::Balanced, 4)
                .with_rollback_check()
                .with_expectation(rollback_verified),
        ),
        TestScenario::new(
            "lockdown",
            "Administrator Lock",
            "Lock the game, confirm players are refused, then unlock and play",
            CampaignPlan::new(CampaignStrategy::Balanced, 1)
                .with_lock_check()
                .with_expectation(lock_verified),
        ),
        TestScenario::new(
            "determinism",
            "Deterministic Replay",
            "Replay a seeded campaign and require an identical final world",
            CampaignPlan::new(CampaignStrategy::Random, 5).with_replay_check(),
        ),
        TestScenario::new(
            "long-campaign",
            "Long Campaign",
            "Fifteen balanced years past the rollback horizon",
            CampaignPlan::new(CampaignStrategy::Balanced, 15)
                .with_rollback_check()
                .with_expectation(years_advanced)
                .with_expectation(rollback_verified),
        ),
    ]
}

#[must_use]
pub fn find_scenario(key: &str) -> Option<TestScenario> {
    catalog()
        .into_iter()
        .find(|scenario| scenario.key == key)
}

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog()
        .into_iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

fn no_violations(summary: &CampaignSummary) -> Result<()> {
    match summary.violations.first() {
        None => Ok(()),
        Some(first) => Err(anyhow!(
            "{} invariant violation(s), first: {first}",
            summary.violations.len()
        )),
    }
}

fn treasuries_non_negative(summary: &CampaignSummary) -> Result<()> {
    for (faction, treasury) in &summary.treasuries {
        ensure!(*treasury >= 0, "{faction} ended with treasury {treasury}");
    }
    Ok(())
}

fn years_advanced(summary: &CampaignSummary) -> Result<()> {
    ensure!(
        summary.final_year == 1 + summary.years_played,
        "expected year {}, found {}",
        1 + summary.years_played,
        summary.final_year
    );
    Ok(())
}

fn investments_resolved(summary: &CampaignSummary) -> Result<()> {
    ensure!(
        !summary.investments.is_empty(),
        "no investment was executed"
    );
    Ok(())
}

fn legions_raised(summary: &CampaignSummary) -> Result<()> {
    ensure!(
        summary.actions.accepted.contains_key("raise-legion"),
        "no legion was raised"
    );
    Ok(())
}

fn rollback_verified(summary: &CampaignSummary) -> Result<()> {
    ensure!(
        summary.rollback_verified == Some(true),
        "rollback did not restore the recorded world"
    );
    Ok(())
}

fn lock_verified(summary: &CampaignSummary) -> Result<()> {
    ensure!(
        summary.lock_verified == Some(true),
        "locked game accepted a player command"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<_> = catalog().iter().map(|scenario| scenario.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), catalog().len());
    }

    #[test]
    fn finds_by_key() {
        assert_eq!(find_scenario("smoke").map(|s| s.name), Some("Smoke"));
        assert!(find_scenario("nope").is_none());
    }
}
