//! Process-wide mutable state that lives outside the document store.
//!
//! `RuntimeState` sits behind the engine's write lock. The tax ledger is
//! reset whenever the year changes and the session table sweeps expired
//! entries on every access.
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::config::EngineConfig;
use crate::ids::FactionId;
use crate::investment::InvestmentDice;

/// Factions that changed their tax rate in the current year.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxChangeLedger {
    year: u32,
    changed: BTreeSet<FactionId>,
}

impl TaxChangeLedger {
    #[must_use]
    pub const fn new(year: u32) -> Self {
        Self {
            year,
            changed: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn year(&self) -> u32 {
        self.year
    }

    /// Start a fresh ledger when `year` differs from the tracked one.
    pub fn align_year(&mut self, year: u32) {
        if self.year != year {
            self.reset(year);
        }
    }

    pub fn reset(&mut self, year: u32) {
        self.year = year;
        self.changed.clear();
    }

    #[must_use]
    pub fn has_changed(&self, faction: &FactionId) -> bool {
        self.changed.contains(faction)
    }

    pub fn record(&mut self, faction: &FactionId) {
        self.changed.insert(faction.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub faction_id: FactionId,
    pub opened_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Opaque session tokens mapped to factions, with a fixed time-to-live.
#[derive(Debug, Clone)]
pub struct SessionTable {
    ttl: TimeDelta,
    sessions: HashMap<String, Session>,
}

impl SessionTable {
    #[must_use]
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl: TimeDelta::try_seconds(ttl_secs).unwrap_or_else(|| TimeDelta::hours(1)),
            sessions: HashMap::new(),
        }
    }

    /// Register `token` for `faction`, replacing any previous entry.
    pub fn open(&mut self, token: &str, faction: FactionId, now: DateTime<Utc>) -> Session {
        self.sweep(now);
        let session = Session {
            faction_id: faction,
            opened_at: now,
            expires_at: now + self.ttl,
        };
        self.sessions.insert(token.to_string(), session.clone());
        session
    }

    /// Faction bound to a live token.
    pub fn resolve(&mut self, token: &str, now: DateTime<Utc>) -> Option<FactionId> {
        self.sweep(now);
        self.sessions
            .get(token)
            .map(|session| session.faction_id.clone())
    }

    pub fn close(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop expired sessions, returning how many were removed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.expires_at > now);
        let removed = before - self.sessions.len();
        if removed > 0 {
            log::debug!("swept {removed} expired sessions");
        }
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// State guarded by the engine's global write lock.
#[derive(Debug, Clone)]
pub struct RuntimeState {
    pub tax_changes: TaxChangeLedger,
    pub sessions: SessionTable,
    pub dice: InvestmentDice,
}

impl RuntimeState {
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            tax_changes: TaxChangeLedger::default(),
            sessions: SessionTable::new(config.session_ttl_secs),
            dice: InvestmentDice::from_seed(config.investment_seed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn ledger_resets_when_year_moves() {
        let mut ledger = TaxChangeLedger::new(1);
        let oda = FactionId::new("oda");
        ledger.record(&oda);
        ledger.align_year(1);
        assert!(ledger.has_changed(&oda));
        ledger.align_year(2);
        assert!(!ledger.has_changed(&oda));
        assert_eq!(ledger.year(), 2);
    }

    #[test]
    fn sessions_expire_on_access() {
        let mut table = SessionTable::new(60);
        table.open("abc", FactionId::new("oda"), at(0));
        table.open("def", FactionId::new("takeda"), at(30));
        assert_eq!(table.resolve("abc", at(59)), Some(FactionId::new("oda")));
        assert_eq!(table.resolve("abc", at(60)), None);
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve("def", at(60)), Some(FactionId::new("takeda")));
        assert!(table.close("def"));
        assert!(table.is_empty());
    }
}
