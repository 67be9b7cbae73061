use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use tenka_game::snapshot::world_digest;
use tenka_game::{
    CreateLegionRequest, EngineConfig, ErrorKind, FactionId, GameError, InvestmentRequest,
    MemoryStore, OperationId, Realm, Scenario, SoldierUpdate, World, audit,
};

use super::policy::{CampaignStrategy, TurnAction};

/// Assertion hook run after a campaign completes.
type CampaignExpectationFn = Arc<dyn Fn(&CampaignSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct CampaignExpectation(CampaignExpectationFn);

impl std::fmt::Debug for CampaignExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CampaignExpectation(..)")
    }
}

impl<F> From<F> for CampaignExpectation
where
    F: Fn(&CampaignSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

impl CampaignExpectation {
    /// # Errors
    ///
    /// Returns the expectation's failure message.
    pub fn check(&self, summary: &CampaignSummary) -> Result<()> {
        (self.0)(summary)
    }
}

#[derive(Debug, Clone)]
pub struct CampaignPlan {
    pub strategy: CampaignStrategy,
    pub years: u32,
    /// Roll back to a mid-campaign advance, compare, then undo the rollback.
    pub rollback_check: bool,
    /// Lock the game before the first year and confirm players are refused.
    pub lock_check: bool,
    /// Replay the same seed and require an identical final world.
    pub replay_check: bool,
    pub config: EngineConfig,
    pub expectations: Vec<CampaignExpectation>,
}

impl CampaignPlan {
    #[must_use]
    pub fn new(strategy: CampaignStrategy, years: u32) -> Self {
        Self {
            strategy,
            years,
            rollback_check: false,
            lock_check: false,
            replay_check: false,
            config: EngineConfig::default_config(),
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_rollback_check(mut self) -> Self {
        self.rollback_check = true;
        self
    }

    #[must_use]
    pub const fn with_lock_check(mut self) -> Self {
        self.lock_check = true;
        self
    }

    #[must_use]
    pub const fn with_replay_check(mut self) -> Self {
        self.replay_check = true;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<CampaignExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Accepted and refused commands, grouped by action and error kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTally {
    pub accepted: BTreeMap<String, usize>,
    pub rejected: BTreeMap<String, usize>,
}

impl ActionTally {
    fn accept(&mut self, action: &TurnAction) {
        *self.accepted.entry(action.label().to_string()).or_default() += 1;
    }

    fn reject(&mut self, kind: ErrorKind) {
        *self.rejected.entry(format!("{kind:?}")).or_default() += 1;
    }

    #[must_use]
    pub fn accepted_total(&self) -> usize {
        self.accepted.values().sum()
    }

    #[must_use]
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub seed: u64,
    pub strategy: CampaignStrategy,
    pub years_played: u32,
    pub final_year: u32,
    pub actions: ActionTally,
    /// Investment outcomes keyed by outcome name.
    pub investments: BTreeMap<String, usize>,
    pub treasuries: BTreeMap<FactionId, i64>,
    pub legions: usize,
    pub violations: Vec<String>,
    pub rollback_verified: Option<bool>,
    pub lock_verified: Option<bool>,
    pub world_digest: String,
}

struct CampaignRun {
    realm: Realm<MemoryStore>,
    summary: CampaignSummary,
    pre_images: Vec<(OperationId, World)>,
}

/// Play a campaign over the bundled scenario.
///
/// # Errors
///
/// Fails on fatal engine errors; broken invariants are recorded as
/// violations instead.
pub fn run_campaign(plan: &CampaignPlan, seed: u64) -> Result<CampaignSummary> {
    let store = MemoryStore::new();
    Scenario::bundled()
        .and_then(|scenario| scenario.seed_store(&store))
        .context("seeding bundled scenario")?;
    let realm = Realm::new(store, plan.config.clone().with_seed(seed))
        .context("starting realm")?;

    let mut run = CampaignRun {
        realm,
        summary: CampaignSummary {
            seed,
            strategy: plan.strategy,
            years_played: 0,
            final_year: 0,
            actions: ActionTally::default(),
            investments: BTreeMap::new(),
            treasuries: BTreeMap::new(),
            legions: 0,
            violations: Vec::new(),
            rollback_verified: None,
            lock_verified: None,
            world_digest: String::new(),
        },
        pre_images: Vec::new(),
    };

    if plan.lock_check {
        run.summary.lock_verified = Some(run.check_lock()?);
    }

    let world = run.realm.world()?;
    let mut policies: Vec<_> = world
        .factions
        .iter()
        .zip(0_u64..)
        .map(|(faction, index)| {
            (
                faction.id.clone(),
                plan.strategy.create_policy(seed.wrapping_add(index)),
            )
        })
        .collect();

    for _ in 0..plan.years {
        for (faction_id, policy) in &mut policies {
            let world = run.realm.world()?;
            let Ok(faction) = world.faction(faction_id) else {
                continue;
            };
            let data = run.realm.compute_faction_data(faction_id)?;
            log::debug!("{} plans year {} for {faction_id}", policy.name(), world.game.year);
            for action in policy.plan_turn(&world, faction, &data) {
                run.apply(faction_id, &action)?;
                run.audit_step(&format!("{} {}", faction_id, action.label()))?;
            }
        }
        run.advance()?;
    }

    if plan.rollback_check {
        run.summary.rollback_verified = Some(run.check_rollback(plan.config.rollback_horizon)?);
    }

    let world = run.realm.world()?;
    run.summary.final_year = world.game.year;
    run.summary.legions = world.legions.len();
    run.summary.treasuries = world
        .factions
        .iter()
        .map(|faction| (faction.id.clone(), faction.treasury))
        .collect();
    run.summary.world_digest = world_digest(&world).context("hashing final world")?;
    Ok(run.summary)
}

impl CampaignRun {
    fn apply(&mut self, faction_id: &FactionId, action: &TurnAction) -> Result<()> {
        let outcome = self.dispatch(faction_id, action);
        match outcome {
            Ok(()) => self.summary.actions.accept(action),
            Err(err) if err.kind() == ErrorKind::Fatal => {
                return Err(err).with_context(|| format!("{faction_id} {}", action.label()));
            }
            Err(err) => {
                log::debug!("{faction_id} {} refused: {err}", action.label());
                self.summary.actions.reject(err.kind());
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, faction_id: &FactionId, action: &TurnAction) -> Result<(), GameError> {
        let realm = &self.realm;
        match action {
            TurnAction::Invest { samurai, category } => {
                let request =
                    InvestmentRequest::for_category(faction_id.clone(), samurai.clone(), *category, None)?;
                let result = realm.execute_investment(&request)?;
                *self
                    .summary
                    .investments
                    .entry(format!("{:?}", result.outcome))
                    .or_default() += 1;
            }
            TurnAction::Purchase(order) => {
                realm.purchase_equipment(faction_id, *order)?;
            }
            TurnAction::RaiseLegion {
                commander,
                name,
                location,
                soldiers,
                equipment,
            } => {
                let request = CreateLegionRequest::new(
                    faction_id.clone(),
                    commander.clone(),
                    name,
                    *soldiers,
                    *equipment,
                    location.clone(),
                )?;
                realm.create_legion(&request)?;
            }
            TurnAction::Reinforce { legion, soldiers } => {
                if let SoldierUpdate::ShouldDisband { legion_id } =
                    realm.update_legion_soldiers(faction_id, legion, *soldiers)?
                {
                    realm.disband_legion(faction_id, &legion_id)?;
                }
            }
            TurnAction::Disband(legion) => {
                realm.disband_legion(faction_id, legion)?;
            }
            TurnAction::ChangeTax(rate) => {
                realm.change_tax_rate(faction_id, *rate)?;
            }
        }
        Ok(())
    }

    fn audit_step(&mut self, step: &str) -> Result<()> {
        let world = self.realm.world()?;
        let year = world.game.year;
        self.summary.violations.extend(
            audit(&world)
                .into_iter()
                .map(|finding| format!("year {year} after {step}: {finding}")),
        );
        Ok(())
    }

    fn advance(&mut self) -> Result<()> {
        let before = self.realm.world()?;
        let report = self.realm.advance_year().context("advancing year")?;
        if report.new_year != before.game.year + 1 {
            self.summary.violations.push(format!(
                "year advanced {} -> {}",
                before.game.year, report.new_year
            ));
        }
        for entry in &report.factions {
            if entry.treasury_after < 0 {
                self.summary.violations.push(format!(
                    "{} treasury {} after settling year {}",
                    entry.faction_id, entry.treasury_after, report.settled_year
                ));
            }
        }
        self.pre_images.push((report.operation_id, before));
        self.summary.years_played += 1;
        self.audit_step(&format!("settling year {}", report.settled_year))
    }

    fn check_lock(&self) -> Result<bool> {
        let world = self.realm.world()?;
        let Some(faction) = world.factions.first() else {
            bail!("scenario has no factions");
        };
        self.realm.lock_game()?;
        let refused = matches!(
            self.realm.change_tax_rate(&faction.id, 40),
            Err(GameError::Locked)
        );
        self.realm.unlock_game()?;
        let unchanged = self.realm.world()?.factions == world.factions;
        Ok(refused && unchanged)
    }

    fn check_rollback(&mut self, horizon: usize) -> Result<bool> {
        if self.pre_images.is_empty() {
            return Ok(true);
        }
        let oldest_retained = self.pre_images.len().saturating_sub(horizon);
        let index = (self.pre_images.len() / 2).max(oldest_retained);
        let (operation, expected) = &self.pre_images[index];

        let latest = self.realm.world()?;
        let report = self
            .realm
            .rollback_to_operation(*operation)
            .with_context(|| format!("rolling back to {operation}"))?;
        let restored = self.realm.world()? == *expected;
        self.realm
            .rollback_to_operation(report.operation_id)
            .context("undoing rollback")?;
        let undone = self.realm.world()? == latest;
        Ok(restored && undone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_campaign_stays_consistent() {
        let plan = CampaignPlan::new(CampaignStrategy::Balanced, 3).with_rollback_check();
        let summary = run_campaign(&plan, 7).unwrap();
        assert_eq!(summary.years_played, 3);
        assert_eq!(summary.final_year, 4);
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
        assert_eq!(summary.rollback_verified, Some(true));
        assert!(summary.actions.accepted_total() > 0);
    }

    #[test]
    fn lock_check_refuses_players() {
        let plan = CampaignPlan::new(CampaignStrategy::Steward, 0).with_lock_check();
        let summary = run_campaign(&plan, 1).unwrap();
        assert_eq!(summary.lock_verified, Some(true));
        assert_eq!(summary.final_year, 1);
    }

    #[test]
    fn random_campaign_records_refusals_without_violations() {
        let plan = CampaignPlan::new(CampaignStrategy::Random, 4);
        let summary = run_campaign(&plan, 99).unwrap();
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
        assert!(summary.treasuries.values().all(|treasury| *treasury >= 0));
    }

    #[test]
    fn same_seed_same_world() {
        let plan = CampaignPlan::new(CampaignStrategy::Warlord, 3);
        let first = run_campaign(&plan, 5).unwrap();
        let second = run_campaign(&plan, 5).unwrap();
        assert_eq!(first, second);
    }
}
