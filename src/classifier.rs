use std::collections::{HashMap, HashSet};

use crate::types::FirstSolve;

/// What a single contest has seen solved so far. Lives only in memory; after a
/// restart the first-blood comments start over, dispatch is unaffected.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SolveHistory {
    any_solved: bool,
    problems: HashSet<String>,
    teams: HashSet<String>,
}

impl SolveHistory {
    pub fn any_solved(&self) -> bool {
        self.any_solved
    }

    pub fn problem_solved(&self, problem_id: &str) -> bool {
        self.problems.contains(problem_id)
    }

    pub fn team_solved(&self, team_id: &str) -> bool {
        self.teams.contains(team_id)
    }
}

/// Per-contest first-blood tracking.
#[derive(Debug, Default)]
pub struct FirstSolveClassifier {
    histories: HashMap<String, SolveHistory>,
}

impl FirstSolveClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one solve. Must be called once per event, in submission order.
    ///
    /// Precedence is contest, then problem, then team: only the first matching
    /// condition is reported, but all three facts are recorded so none of them
    /// fires again later.
    pub fn classify(&mut self, contest_id: &str, team_id: &str, problem_id: &str) -> Option<FirstSolve> {
        let history = self.histories.entry(contest_id.to_string()).or_default();

        let comment = if !history.any_solved() {
            Some(FirstSolve::Contest)
        } else if !history.problem_solved(problem_id) {
            Some(FirstSolve::Problem)
        } else if !history.team_solved(team_id) {
            Some(FirstSolve::Team)
        } else {
            None
        };

        history.any_solved = true;
        history.problems.insert(problem_id.to_string());
        history.teams.insert(team_id.to_string());

        comment
    }

    pub fn history(&self, contest_id: &str) -> Option<&SolveHistory> {
        self.histories.get(contest_id)
    }
}
