//! Where balloon events come from.
//!
//! Two backends share one contract: the contest REST API and direct queries
//! against the contest database. Either way the source owns the authoritative
//! `handled` flag, so a restart never prints an event twice.

pub mod api;
pub mod direct;
pub mod netrc;

use async_trait::async_trait;

use crate::config::{Config, SourceKind};
use crate::error::{Result, SourceError};
use crate::types::{BalloonEvent, Contest};

pub use api::RemoteApiSource;
pub use direct::DirectQuerySource;

#[async_trait]
pub trait EventSource: Send + Sync {
    /// Currently active contests.
    async fn active_contests(&self) -> std::result::Result<Vec<Contest>, SourceError>;

    /// Unhandled balloons for `contest`, ascending by event id.
    async fn pending_events(
        &self,
        contest: &Contest,
    ) -> std::result::Result<Vec<BalloonEvent>, SourceError>;

    /// Mark one balloon as handled. Marking an already handled balloon succeeds.
    async fn mark_handled(
        &self,
        contest_id: &str,
        event_id: i64,
    ) -> std::result::Result<(), SourceError>;

    /// Release held connections.
    async fn close(&self) {}

    fn describe(&self) -> String;
}

/// Build the configured source.
pub async fn connect(cfg: &Config) -> Result<Box<dyn EventSource>> {
    let source: Box<dyn EventSource> = match cfg.source {
        SourceKind::Api => Box::new(RemoteApiSource::new(&cfg.api_url, &cfg.credentials)?),
        SourceKind::Database => Box::new(
            DirectQuerySource::connect(&cfg.database_url, cfg.show_postfreeze).await?,
        ),
    };
    Ok(source)
}
