use std::collections::HashSet;

use tracing::{info, warn};

use crate::error::SourceError;
use crate::source::EventSource;
use crate::timefmt::format_unix_secs;
use crate::types::Contest;

/// A change in the set of active contests between two refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestSetChange {
    pub old_ids: Vec<String>,
    pub new_ids: Vec<String>,
}

impl std::fmt::Display for ContestSetChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "contest set changed from {} to {}",
            render_ids(&self.old_ids),
            render_ids(&self.new_ids)
        )
    }
}

fn render_ids(ids: &[String]) -> String {
    if ids.is_empty() {
        return "none".to_string();
    }
    ids.iter().map(|id| format!("c{id}")).collect::<Vec<_>>().join(", ")
}

/// Result of applying one contest listing.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub changed: Option<ContestSetChange>,
    /// Contests whose freeze was noticed for the first time on this refresh.
    pub newly_frozen: Vec<String>,
}

/// Remembers the active contest set between polls.
#[derive(Debug, Default)]
pub struct ContestTracker {
    contests: Vec<Contest>,
    frozen: HashSet<String>,
}

impl ContestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contests(&self) -> &[Contest] {
        &self.contests
    }

    pub fn is_frozen(&self, contest_id: &str) -> bool {
        self.frozen.contains(contest_id)
    }

    /// Fetch the active contests and fold them into the cached set.
    pub async fn refresh(
        &mut self,
        source: &dyn EventSource,
        now_secs: f64,
    ) -> Result<RefreshOutcome, SourceError> {
        let fresh = source.active_contests().await?;
        Ok(self.apply(fresh, now_secs))
    }

    /// Compare a fresh listing to the cached one. Membership is compared by id
    /// only; when it differs the cached contest data is replaced wholesale.
    pub fn apply(&mut self, fresh: Vec<Contest>, now_secs: f64) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::default();

        let old: HashSet<&str> = self.contests.iter().map(|c| c.id.as_str()).collect();
        let new: HashSet<&str> = fresh.iter().map(|c| c.id.as_str()).collect();

        if old != new {
            let change = ContestSetChange {
                old_ids: self.contests.iter().map(|c| c.id.clone()).collect(),
                new_ids: fresh.iter().map(|c| c.id.clone()).collect(),
            };
            info!(
                old = ?change.old_ids,
                new = ?change.new_ids,
                "{change}"
            );
            self.contests = fresh;
            outcome.changed = Some(change);
        }

        for contest in &self.contests {
            let Some(freeze) = contest.freeze_time else { continue };
            if now_secs >= freeze && self.frozen.insert(contest.id.clone()) {
                warn!(
                    contest_id = %contest.id,
                    "contest c{} frozen since {}",
                    contest.id,
                    format_unix_secs(freeze),
                );
                outcome.newly_frozen.push(contest.id.clone());
            }
        }

        outcome
    }
}
