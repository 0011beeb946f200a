use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::{de, Deserialize, Deserializer};
use tracing::{debug, info, warn};

use crate::config::{Credentials, HTTP_TIMEOUT_SECS, USER_AGENT};
use crate::error::{AppError, Result, SourceError};
use crate::notify::colour;
use crate::source::{netrc, EventSource};
use crate::timefmt::{parse_duration_secs, parse_iso_to_unix_secs};
use crate::types::{non_empty, BalloonEvent, Contest, SolvedProblem, TeamSolveSummary};

/// Longest response body quoted in an error message.
const ERROR_BODY_LIMIT: usize = 200;

/// Balloon source backed by the contest system's REST API.
///
/// The server filters to unhandled balloons (`todo=true`) and applies its own
/// post-freeze visibility setting.
pub struct RemoteApiSource {
    client: reqwest::Client,
    base_url: Url,
    auth: Option<(String, Option<String>)>,
}

impl RemoteApiSource {
    pub fn new(api_url: &str, credentials: &Credentials) -> Result<Self> {
        let base_url = Url::parse(api_url)
            .map_err(|e| AppError::Config(format!("invalid API URL {api_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!("API URL {api_url} cannot be a base")));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(SourceError::from)?;

        let auth = match &credentials.user {
            Some(user) => Some((user.clone(), credentials.password.clone())),
            None => {
                let host = base_url.host_str().unwrap_or_default();
                let entry = credentials
                    .netrc
                    .as_deref()
                    .and_then(|path| netrc::lookup_file(path, host));
                match entry {
                    Some(entry) => {
                        info!(host, login = %entry.login, "Using API credentials from netrc");
                        Some((entry.login, entry.password))
                    }
                    None => {
                        warn!(host, "No API credentials configured; requests will be anonymous");
                        None
                    }
                }
            }
        };

        Ok(Self { client, base_url, auth })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn request(&self, method: Method, url: Url, query: &[(&str, &str)]) -> std::result::Result<String, SourceError> {
        let mut req = self.client.request(method.clone(), url.clone()).query(query);
        if let Some((user, password)) = &self.auth {
            req = req.basic_auth(user, password.as_ref());
        }

        let response = req.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SourceError::Authentication { url: url.to_string() });
        }
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(ERROR_BODY_LIMIT)
                .collect();
            return Err(SourceError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl EventSource for RemoteApiSource {
    async fn active_contests(&self) -> std::result::Result<Vec<Contest>, SourceError> {
        let body = self
            .request(Method::GET, self.url(&["contests"]), &[("onlyActive", "true")])
            .await?;
        let contests: Vec<ApiContest> = serde_json::from_str(&body)?;
        Ok(contests.into_iter().map(ApiContest::into_contest).collect())
    }

    async fn pending_events(
        &self,
        contest: &Contest,
    ) -> std::result::Result<Vec<BalloonEvent>, SourceError> {
        let url = self.url(&["contests", &contest.id, "balloons"]);
        let body = self.request(Method::GET, url, &[("todo", "true")]).await?;
        let rows: Vec<serde_json::Value> = serde_json::from_str(&body)?;

        // A row that does not decode is skipped; the rest of the batch still goes out.
        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let balloon_id = row.get("balloonid").cloned();
            match serde_json::from_value::<ApiBalloon>(row) {
                Ok(balloon) => events.push(balloon.into_event(&contest.id)),
                Err(e) => warn!(
                    contest_id = %contest.id,
                    balloon_id = ?balloon_id,
                    error = %e,
                    "Skipping undecodable balloon in contest c{}",
                    contest.id,
                ),
            }
        }
        events.sort_by_key(|e| e.id);
        debug!(contest_id = %contest.id, pending = events.len(), "Fetched pending balloons");
        Ok(events)
    }

    async fn mark_handled(
        &self,
        contest_id: &str,
        event_id: i64,
    ) -> std::result::Result<(), SourceError> {
        let id = event_id.to_string();
        let url = self.url(&["contests", contest_id, "balloons", &id, "done"]);
        self.request(Method::POST, url, &[]).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("contest API at {}", self.base_url)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Ids arrive as strings or numbers depending on the server version.
fn opt_id_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(d)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn id_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    opt_id_string(d)?.ok_or_else(|| de::Error::custom("expected a string or numeric id"))
}

#[derive(Debug, Deserialize)]
struct ApiContest {
    #[serde(deserialize_with = "id_string")]
    id: String,
    name: Option<String>,
    formal_name: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    duration: Option<String>,
    scoreboard_freeze_duration: Option<String>,
}

impl ApiContest {
    /// Freeze begins `scoreboard_freeze_duration` before the contest ends.
    fn freeze_time(&self) -> Option<f64> {
        let freeze = parse_duration_secs(self.scoreboard_freeze_duration.as_deref()?)?;
        let end = match self.end_time.as_deref().and_then(parse_iso_to_unix_secs) {
            Some(end) => end,
            None => {
                let start = parse_iso_to_unix_secs(self.start_time.as_deref()?)?;
                start + parse_duration_secs(self.duration.as_deref()?)?
            }
        };
        Some(end - freeze)
    }

    fn into_contest(self) -> Contest {
        let freeze_time = self.freeze_time();
        let name = non_empty(self.name.as_deref())
            .or(non_empty(self.formal_name.as_deref()))
            .unwrap_or(&self.id)
            .to_string();
        Contest { id: self.id, name, freeze_time }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiContestProblem {
    #[serde(default, deserialize_with = "opt_id_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    probid: Option<String>,
    label: Option<String>,
    short_name: Option<String>,
    shortname: Option<String>,
    name: Option<String>,
    rgb: Option<String>,
    color: Option<String>,
}

impl ApiContestProblem {
    fn short_name(&self) -> Option<&str> {
        non_empty(self.label.as_deref())
            .or(non_empty(self.short_name.as_deref()))
            .or(non_empty(self.shortname.as_deref()))
    }

    fn display_color(&self) -> Option<String> {
        colour::display_name(self.color.as_deref(), self.rgb.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiBalloon {
    balloonid: i64,
    #[serde(default)]
    time: Option<serde_json::Value>,
    problem: String,
    #[serde(default)]
    contestproblem: ApiContestProblem,
    team: String,
    #[serde(default, deserialize_with = "opt_id_string")]
    teamid: Option<String>,
    location: Option<String>,
    #[serde(default)]
    total: BTreeMap<String, ApiContestProblem>,
    #[serde(default)]
    done: bool,
}

impl ApiBalloon {
    fn into_event(self, contest_id: &str) -> BalloonEvent {
        let cp = &self.contestproblem;
        let (team_id, team_name) = split_team_label(&self.team, self.teamid.as_deref());

        let solved = self
            .total
            .iter()
            .map(|(key, p)| SolvedProblem {
                short_name: p.short_name().unwrap_or(key).to_string(),
                color: p.display_color(),
            })
            .collect();

        let submit_time = match &self.time {
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => parse_iso_to_unix_secs(s),
            _ => None,
        };

        BalloonEvent {
            id: self.balloonid,
            contest_id: contest_id.to_string(),
            team_id,
            team_name,
            location: non_empty(self.location.as_deref()).map(str::to_string),
            problem_id: cp
                .id
                .clone()
                .or_else(|| cp.probid.clone())
                .unwrap_or_else(|| self.problem.clone()),
            problem_short_name: cp.short_name().unwrap_or(&self.problem).to_string(),
            problem_name: non_empty(cp.name.as_deref()).unwrap_or(&self.problem).to_string(),
            color: cp.display_color(),
            submit_time,
            handled: self.done,
            team_solved: TeamSolveSummary::new(solved),
        }
    }
}

/// Teams are rendered as `t<id>: <name>`; peel the prefix off when present.
fn split_team_label(label: &str, team_id: Option<&str>) -> (String, String) {
    if let Some((prefix, name)) = label.split_once(": ") {
        if let Some(id) = prefix.strip_prefix('t') {
            if team_id.map_or(true, |t| t == id) {
                return (id.to_string(), name.to_string());
            }
        }
    }
    (team_id.unwrap_or(label).to_string(), label.to_string())
}
