use serde::Serialize;

// ---------------------------------------------------------------------------
// Contest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contest {
    pub id: String,
    pub name: String,
    /// Unix seconds at which the scoreboard freezes, if the contest has a freeze.
    pub freeze_time: Option<f64>,
}

impl Contest {
    pub fn is_frozen_at(&self, now_secs: f64) -> bool {
        self.freeze_time.is_some_and(|freeze| now_secs >= freeze)
    }
}

// ---------------------------------------------------------------------------
// Balloon events
// ---------------------------------------------------------------------------

/// A problem as printed on a ticket: short label plus optional colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolvedProblem {
    pub short_name: String,
    pub color: Option<String>,
}

/// Problems a team currently has a balloon for, ordered by short name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamSolveSummary {
    pub problems: Vec<SolvedProblem>,
}

impl TeamSolveSummary {
    pub fn new(mut problems: Vec<SolvedProblem>) -> Self {
        problems.sort_by(|a, b| a.short_name.cmp(&b.short_name));
        problems.dedup_by(|a, b| a.short_name == b.short_name);
        Self { problems }
    }
}

/// One correct submission awaiting a balloon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalloonEvent {
    /// Monotonically assigned by the source; processing order follows it.
    pub id: i64,
    pub contest_id: String,
    pub team_id: String,
    pub team_name: String,
    pub location: Option<String>,
    pub problem_id: String,
    pub problem_short_name: String,
    pub problem_name: String,
    pub color: Option<String>,
    /// Unix seconds, when the source provides it.
    pub submit_time: Option<f64>,
    pub handled: bool,
    pub team_solved: TeamSolveSummary,
}

// ---------------------------------------------------------------------------
// First-solve comments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstSolve {
    Contest,
    Problem,
    Team,
}

impl std::fmt::Display for FirstSolve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FirstSolve::Contest => "first solve of the contest",
            FirstSolve::Problem => "first solve of this problem",
            FirstSolve::Team => "team's first solve",
        };
        write!(f, "{s}")
    }
}

/// Treats `None`, empty and whitespace-only strings alike.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
