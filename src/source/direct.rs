use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::error::{Result, SourceError};
use crate::notify::colour;
use crate::source::EventSource;
use crate::timefmt::now_secs;
use crate::types::{BalloonEvent, Contest, SolvedProblem, TeamSolveSummary};

#[derive(Debug, sqlx::FromRow)]
struct ContestRow {
    cid: i64,
    name: String,
    freezetime: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
struct PendingRow {
    balloonid: i64,
    teamid: i64,
    teamname: String,
    room: Option<String>,
    probid: i64,
    shortname: String,
    probname: String,
    color: Option<String>,
    submittime: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct SolvedRow {
    shortname: String,
    color: Option<String>,
}

/// Balloon source reading the contest database directly.
///
/// Unlike the API, this source applies the post-freeze visibility rule
/// itself: while a contest is frozen and post-freeze balloons are disabled,
/// submissions at or after the freeze are not pending at all.
pub struct DirectQuerySource {
    pool: SqlitePool,
    show_postfreeze: bool,
}

impl DirectQuerySource {
    pub async fn connect(database_url: &str, show_postfreeze: bool) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(SourceError::from)?;
        info!(show_postfreeze, "Connected to contest database");
        Ok(Self::from_pool(pool, show_postfreeze))
    }

    pub fn from_pool(pool: SqlitePool, show_postfreeze: bool) -> Self {
        Self { pool, show_postfreeze }
    }

    /// Submissions at or after this time are hidden, if any cutoff applies.
    fn visibility_cutoff(&self, contest: &Contest, now_secs: f64) -> Option<f64> {
        if self.show_postfreeze || !contest.is_frozen_at(now_secs) {
            return None;
        }
        contest.freeze_time
    }

    async fn active_contests_at(&self, now_secs: f64) -> std::result::Result<Vec<Contest>, SourceError> {
        let rows: Vec<ContestRow> = sqlx::query_as(
            r#"
            SELECT cid, name, CAST(freezetime AS REAL) AS freezetime
            FROM contest
            WHERE enabled = 1
              AND activatetime <= ?
              AND (deactivatetime IS NULL OR deactivatetime > ?)
            ORDER BY cid
            "#,
        )
        .bind(now_secs)
        .bind(now_secs)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Contest {
                id: r.cid.to_string(),
                name: r.name,
                freeze_time: r.freezetime,
            })
            .collect())
    }

    pub(crate) async fn pending_events_at(
        &self,
        contest: &Contest,
        now_secs: f64,
    ) -> std::result::Result<Vec<BalloonEvent>, SourceError> {
        let cid = parse_cid(&contest.id)?;
        let cutoff = self.visibility_cutoff(contest, now_secs);

        let rows: Vec<PendingRow> = sqlx::query_as(
            r#"
            SELECT b.balloonid, s.teamid, t.name AS teamname, t.room,
                   s.probid, cp.shortname, p.name AS probname, cp.color,
                   CAST(s.submittime AS REAL) AS submittime
            FROM balloon b
            JOIN submission s ON s.submitid = b.submitid
            JOIN team t ON t.teamid = s.teamid
            JOIN problem p ON p.probid = s.probid
            JOIN contestproblem cp ON cp.cid = s.cid AND cp.probid = s.probid
            WHERE s.cid = ?
              AND b.done = 0
              AND (? IS NULL OR s.submittime < ?)
            ORDER BY b.balloonid
            "#,
        )
        .bind(cid)
        .bind(cutoff)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut summaries: HashMap<i64, TeamSolveSummary> = HashMap::new();
        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let summary = match summaries.get(&row.teamid) {
                Some(summary) => summary.clone(),
                None => {
                    let summary = self.team_summary(cid, row.teamid, cutoff).await?;
                    summaries.insert(row.teamid, summary.clone());
                    summary
                }
            };
            events.push(BalloonEvent {
                id: row.balloonid,
                contest_id: contest.id.clone(),
                team_id: row.teamid.to_string(),
                team_name: row.teamname,
                location: row.room.filter(|r| !r.trim().is_empty()),
                problem_id: row.probid.to_string(),
                problem_short_name: row.shortname,
                problem_name: row.probname,
                color: colour::display_name(row.color.as_deref(), None),
                submit_time: Some(row.submittime),
                handled: false,
                team_solved: summary,
            });
        }

        debug!(
            contest_id = %contest.id,
            pending = events.len(),
            cutoff = ?cutoff,
            "Fetched pending balloons"
        );
        Ok(events)
    }

    /// Every problem the team has a balloon for, handed out or not, within the
    /// same visibility window as the pending query.
    async fn team_summary(
        &self,
        cid: i64,
        teamid: i64,
        cutoff: Option<f64>,
    ) -> std::result::Result<TeamSolveSummary, SourceError> {
        let rows: Vec<SolvedRow> = sqlx::query_as(
            r#"
            SELECT DISTINCT cp.shortname, cp.color
            FROM balloon b
            JOIN submission s ON s.submitid = b.submitid
            JOIN contestproblem cp ON cp.cid = s.cid AND cp.probid = s.probid
            WHERE s.cid = ?
              AND s.teamid = ?
              AND (? IS NULL OR s.submittime < ?)
            "#,
        )
        .bind(cid)
        .bind(teamid)
        .bind(cutoff)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(TeamSolveSummary::new(
            rows.into_iter()
                .map(|r| SolvedProblem {
                    color: colour::display_name(r.color.as_deref(), None),
                    short_name: r.shortname,
                })
                .collect(),
        ))
    }
}

fn parse_cid(id: &str) -> std::result::Result<i64, SourceError> {
    id.parse()
        .map_err(|_| SourceError::Malformed(format!("contest id {id} is not numeric")))
}

#[async_trait]
impl EventSource for DirectQuerySource {
    async fn active_contests(&self) -> std::result::Result<Vec<Contest>, SourceError> {
        self.active_contests_at(now_secs()).await
    }

    async fn pending_events(
        &self,
        contest: &Contest,
    ) -> std::result::Result<Vec<BalloonEvent>, SourceError> {
        self.pending_events_at(contest, now_secs()).await
    }

    async fn mark_handled(
        &self,
        _contest_id: &str,
        event_id: i64,
    ) -> std::result::Result<(), SourceError> {
        let result = sqlx::query("UPDATE balloon SET done = 1 WHERE balloonid = ?")
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(SourceError::Malformed(format!("no balloon with id {event_id}")));
        }
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn describe(&self) -> String {
        format!("contest database (post-freeze balloons {})", if self.show_postfreeze { "shown" } else { "hidden" })
    }
}
