use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::{HealthState, LatencyStats};
use crate::classifier::FirstSolveClassifier;
use crate::config::ERROR_BACKOFF_SECS;
use crate::error::{Result, SourceError};
use crate::notify::{render, Sink};
use crate::source::EventSource;
use crate::timefmt::now_secs;
use crate::tracker::ContestTracker;
use crate::types::{BalloonEvent, Contest};

/// What one poll accomplished.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub contests: usize,
    pub dispatched: usize,
    pub print_failures: usize,
    pub mark_failures: usize,
    /// Transient source failures (contest listing or a contest's balloons).
    pub source_errors: usize,
}

impl PollReport {
    /// A poll is clean when the source answered every request.
    pub fn is_clean(&self) -> bool {
        self.source_errors == 0 && self.mark_failures == 0
    }
}

/// Owns all mutable state of the notifier and drives the poll loop:
/// poll, process every active contest, sleep, repeat until shutdown.
pub struct Dispatcher {
    source: Box<dyn EventSource>,
    sink: Box<dyn Sink>,
    tracker: ContestTracker,
    classifier: FirstSolveClassifier,
    poll_interval: Duration,
    shutdown: watch::Receiver<bool>,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
    consecutive_failures: usize,
    /// Balloons already dispatched whose mark-handled call failed, per contest.
    /// They are re-marked before the contest's next batch and never printed again.
    unmarked: HashMap<String, BTreeSet<i64>>,
}

impl Dispatcher {
    pub fn new(
        source: Box<dyn EventSource>,
        sink: Box<dyn Sink>,
        poll_interval: Duration,
        shutdown: watch::Receiver<bool>,
        health: Arc<HealthState>,
        latency: Arc<LatencyStats>,
    ) -> Self {
        Self {
            source,
            sink,
            tracker: ContestTracker::new(),
            classifier: FirstSolveClassifier::new(),
            poll_interval,
            shutdown,
            health,
            latency,
            consecutive_failures: 0,
            unmarked: HashMap::new(),
        }
    }

    /// Run until shutdown is requested or the source reports a fatal error.
    /// The source is closed on both paths.
    pub async fn run(mut self) -> Result<()> {
        info!("Balloon notifications started, reading from {}", self.source.describe());
        self.health.set_running(true);

        let result = loop {
            if *self.shutdown.borrow() {
                info!("Received shutdown signal, exiting.");
                break Ok(());
            }

            let delay = match self.poll_once().await {
                Ok(report) => self.next_delay(&report),
                Err(e) => break Err(e.into()),
            };
            self.sleep(delay).await;
        };

        self.source.close().await;
        self.health.set_running(false);
        result
    }

    /// One pass over all active contests. Only fatal source errors escape;
    /// everything else is logged and counted in the report.
    pub async fn poll_once(&mut self) -> std::result::Result<PollReport, SourceError> {
        let mut report = PollReport::default();

        if let Err(e) = self.tracker.refresh(self.source.as_ref(), now_secs()).await {
            if e.is_fatal() {
                return Err(e);
            }
            error!(error = %e, "Failed to fetch active contests");
            report.source_errors += 1;
            return Ok(report);
        }

        let contests = self.tracker.contests().to_vec();
        report.contests = contests.len();

        for contest in &contests {
            self.retry_unmarked(contest, &mut report).await?;

            let events = match self.source.pending_events(contest).await {
                Ok(events) => events,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(contest_id = %contest.id, error = %e, "Failed to fetch balloons for contest c{}", contest.id);
                    report.source_errors += 1;
                    continue;
                }
            };

            if !events.is_empty() {
                debug!(
                    contest_id = %contest.id,
                    frozen = self.tracker.is_frozen(&contest.id),
                    "{} pending balloon(s) for contest c{}",
                    events.len(),
                    contest.id,
                );
            }
            for event in &events {
                if self.is_unmarked(&contest.id, event.id) {
                    debug!(balloon_id = event.id, contest_id = %contest.id, "Skipping balloon awaiting mark-handled retry");
                    continue;
                }
                self.process_event(contest, event, &mut report).await?;
            }
        }

        self.health
            .record_poll((now_secs() * 1000.0) as u64, report.contests);
        Ok(report)
    }

    /// Classify, render, print and mark one balloon. Shutdown is never checked
    /// in here, so a started event always reaches its mark-handled step.
    async fn process_event(
        &mut self,
        contest: &Contest,
        event: &BalloonEvent,
        report: &mut PollReport,
    ) -> std::result::Result<(), SourceError> {
        if event.handled {
            debug!(balloon_id = event.id, contest_id = %contest.id, "Skipping balloon already handled");
            return Ok(());
        }

        let started = Instant::now();
        debug!(
            balloon_id = event.id,
            contest_id = %contest.id,
            team_id = %event.team_id,
            problem_id = %event.problem_id,
            "New problem solved: {} by team {} for contest c{}",
            event.problem_short_name,
            event.team_name,
            contest.id,
        );

        let comment = self
            .classifier
            .classify(&contest.id, &event.team_id, &event.problem_id);

        info!(
            balloon_id = event.id,
            comment = ?comment,
            "Sending notification: team {}, problem {}, contest c{}.",
            event.team_id,
            event.problem_short_name,
            contest.id,
        );

        let ticket = render(event, contest, comment);
        match self.sink.print(&ticket) {
            Ok(()) => {
                report.dispatched += 1;
                self.health.inc_dispatched();
            }
            Err(e) => {
                warn!(
                    balloon_id = event.id,
                    contest_id = %contest.id,
                    team_id = %event.team_id,
                    problem_id = %event.problem_id,
                    error = %e,
                    "Couldn't print balloon {}: {e}",
                    event.id,
                );
                report.print_failures += 1;
                self.health.inc_print_failures();
            }
        }

        // Marked whatever the printer did: a dead printer must not cause reprints.
        match self.source.mark_handled(&contest.id, event.id).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!(
                    balloon_id = event.id,
                    contest_id = %contest.id,
                    team_id = %event.team_id,
                    problem_id = %event.problem_id,
                    error = %e,
                    "Failed to mark balloon {} as done",
                    event.id,
                );
                report.mark_failures += 1;
                self.health.inc_mark_failures();
                self.unmarked
                    .entry(contest.id.clone())
                    .or_default()
                    .insert(event.id);
            }
        }

        self.latency.record(started.elapsed());
        Ok(())
    }

    fn is_unmarked(&self, contest_id: &str, event_id: i64) -> bool {
        self.unmarked
            .get(contest_id)
            .is_some_and(|ids| ids.contains(&event_id))
    }

    /// Re-send mark-handled for balloons of `contest` that were dispatched but
    /// could not be marked. Successes leave the retry set.
    async fn retry_unmarked(
        &mut self,
        contest: &Contest,
        report: &mut PollReport,
    ) -> std::result::Result<(), SourceError> {
        let Some(ids) = self.unmarked.get(&contest.id) else {
            return Ok(());
        };
        let ids: Vec<i64> = ids.iter().copied().collect();

        for id in ids {
            match self.source.mark_handled(&contest.id, id).await {
                Ok(()) => {
                    info!(balloon_id = id, contest_id = %contest.id, "Marked balloon {id} as done on retry");
                    if let Some(pending) = self.unmarked.get_mut(&contest.id) {
                        pending.remove(&id);
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(balloon_id = id, contest_id = %contest.id, error = %e, "Retrying mark for balloon {id} failed");
                    report.mark_failures += 1;
                    self.health.inc_mark_failures();
                }
            }
        }

        if self.unmarked.get(&contest.id).is_some_and(BTreeSet::is_empty) {
            self.unmarked.remove(&contest.id);
        }
        Ok(())
    }

    /// Regular interval after a clean poll, growing backoff after failures.
    fn next_delay(&mut self, report: &PollReport) -> Duration {
        if report.is_clean() {
            self.consecutive_failures = 0;
            self.health.set_consecutive_failures(0);
            return self.poll_interval;
        }

        let idx = self.consecutive_failures.min(ERROR_BACKOFF_SECS.len() - 1);
        self.consecutive_failures += 1;
        self.health.set_consecutive_failures(self.consecutive_failures as u64);
        let delay = Duration::from_secs(ERROR_BACKOFF_SECS[idx]).max(self.poll_interval);
        warn!(
            failures = self.consecutive_failures,
            "Poll had errors, retrying in {}s",
            delay.as_secs(),
        );
        delay
    }

    /// Sleep, waking early if shutdown is requested.
    async fn sleep(&mut self, delay: Duration) {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        tokio::select! {
            _ = &mut sleep => {}
            changed = self.shutdown.changed() => {
                // Sender gone: no shutdown can arrive any more, finish the nap.
                if changed.is_err() {
                    sleep.await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::SinkError;
    use crate::notify::ticket::Ticket;
    use crate::types::{FirstSolve, TeamSolveSummary};

    #[derive(Clone, Copy, PartialEq)]
    enum Failure {
        None,
        Transient,
        Auth,
    }

    impl Failure {
        fn check(self) -> std::result::Result<(), SourceError> {
            match self {
                Failure::None => Ok(()),
                Failure::Transient => Err(SourceError::Malformed("backend hiccup".to_string())),
                Failure::Auth => Err(SourceError::Authentication { url: "mock".to_string() }),
            }
        }
    }

    /// In-memory stand-in for the contest system.
    struct MemorySource {
        contests: Mutex<Vec<Contest>>,
        events: Mutex<Vec<BalloonEvent>>,
        pending_calls: Mutex<Vec<String>>,
        list_failure: Mutex<Failure>,
        mark_failure: Mutex<Failure>,
        closed: AtomicBool,
    }

    impl MemorySource {
        fn new(contests: Vec<Contest>, events: Vec<BalloonEvent>) -> Arc<Self> {
            Arc::new(Self {
                contests: Mutex::new(contests),
                events: Mutex::new(events),
                pending_calls: Mutex::new(Vec::new()),
                list_failure: Mutex::new(Failure::None),
                mark_failure: Mutex::new(Failure::None),
                closed: AtomicBool::new(false),
            })
        }

        fn handled(&self) -> Vec<i64> {
            self.events.lock().unwrap().iter().filter(|e| e.handled).map(|e| e.id).collect()
        }

        fn push(&self, event: BalloonEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[async_trait]
    impl EventSource for Arc<MemorySource> {
        async fn active_contests(&self) -> std::result::Result<Vec<Contest>, SourceError> {
            let failure = *self.list_failure.lock().unwrap();
            failure.check()?;
            Ok(self.contests.lock().unwrap().clone())
        }

        async fn pending_events(
            &self,
            contest: &Contest,
        ) -> std::result::Result<Vec<BalloonEvent>, SourceError> {
            self.pending_calls.lock().unwrap().push(contest.id.clone());
            let mut pending: Vec<_> = self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.contest_id == contest.id && !e.handled)
                .cloned()
                .collect();
            pending.sort_by_key(|e| e.id);
            Ok(pending)
        }

        async fn mark_handled(
            &self,
            _contest_id: &str,
            event_id: i64,
        ) -> std::result::Result<(), SourceError> {
            let failure = *self.mark_failure.lock().unwrap();
            failure.check()?;
            for e in self.events.lock().unwrap().iter_mut().filter(|e| e.id == event_id) {
                e.handled = true;
            }
            Ok(())
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    /// Keeps printed tickets; fails for the listed balloon numbers.
    struct RecordingSink {
        printed: Arc<Mutex<Vec<Ticket>>>,
        fail_for: Vec<i64>,
    }

    impl Sink for RecordingSink {
        fn print(&mut self, ticket: &Ticket) -> std::result::Result<(), SinkError> {
            let text = ticket.plain_text();
            if self.fail_for.iter().any(|id| text.contains(&format!("No. {id}\n"))) {
                return Err(SinkError::Write(std::io::Error::other("paper jam")));
            }
            self.printed.lock().unwrap().push(ticket.clone());
            Ok(())
        }
    }

    fn contest(id: &str) -> Contest {
        Contest { id: id.to_string(), name: format!("Contest {id}"), freeze_time: None }
    }

    fn event(id: i64, contest_id: &str, team: &str, problem: &str) -> BalloonEvent {
        BalloonEvent {
            id,
            contest_id: contest_id.to_string(),
            team_id: team.to_string(),
            team_name: format!("Team {team}"),
            location: None,
            problem_id: problem.to_string(),
            problem_short_name: problem.to_string(),
            problem_name: format!("Problem {problem}"),
            color: None,
            submit_time: None,
            handled: false,
            team_solved: TeamSolveSummary::default(),
        }
    }

    struct Harness {
        dispatcher: Dispatcher,
        source: Arc<MemorySource>,
        printed: Arc<Mutex<Vec<Ticket>>>,
        shutdown_tx: watch::Sender<bool>,
    }

    fn harness(source: Arc<MemorySource>, fail_for: Vec<i64>, poll_interval: Duration) -> Harness {
        let printed = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink { printed: Arc::clone(&printed), fail_for };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let dispatcher = Dispatcher::new(
            Box::new(Arc::clone(&source)),
            Box::new(sink),
            poll_interval,
            shutdown_rx,
            Arc::new(HealthState::new()),
            Arc::new(LatencyStats::new()),
        );
        Harness { dispatcher, source, printed, shutdown_tx }
    }

    fn printed_numbers(printed: &Arc<Mutex<Vec<Ticket>>>) -> Vec<String> {
        printed
            .lock()
            .unwrap()
            .iter()
            .filter_map(|t| {
                t.plain_text()
                    .lines()
                    .find(|l| l.starts_with("No. "))
                    .map(str::to_string)
            })
            .collect()
    }

    #[tokio::test]
    async fn dispatches_each_event_once_in_order() {
        let source = MemorySource::new(
            vec![contest("1")],
            vec![event(2, "1", "B", "P"), event(1, "1", "A", "P")],
        );
        let mut h = harness(source, vec![], Duration::from_millis(10));

        let report = h.dispatcher.poll_once().await.unwrap();
        assert_eq!(report.dispatched, 2);
        assert!(report.is_clean());
        assert_eq!(printed_numbers(&h.printed), vec!["No. 1", "No. 2"]);
        assert_eq!(h.source.handled(), vec![2, 1]);

        let again = h.dispatcher.poll_once().await.unwrap();
        assert_eq!(again.dispatched, 0);
        assert_eq!(h.printed.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn comments_follow_first_solve_precedence() {
        let source = MemorySource::new(
            vec![contest("1")],
            vec![event(1, "1", "A", "P"), event(2, "1", "B", "P"), event(3, "1", "B", "Q")],
        );
        let mut h = harness(source, vec![], Duration::from_millis(10));
        h.dispatcher.poll_once().await.unwrap();

        let texts: Vec<String> = h.printed.lock().unwrap().iter().map(Ticket::plain_text).collect();
        assert!(texts[0].contains(&format!("NOTE: {}", FirstSolve::Contest)));
        assert!(texts[1].contains(&format!("NOTE: {}", FirstSolve::Team)));
        assert!(texts[2].contains(&format!("NOTE: {}", FirstSolve::Problem)));
    }

    #[tokio::test]
    async fn print_failure_still_marks_handled() {
        let source = MemorySource::new(
            vec![contest("1")],
            vec![event(4, "1", "A", "P"), event(5, "1", "B", "Q"), event(6, "1", "C", "R")],
        );
        let mut h = harness(source, vec![5], Duration::from_millis(10));
        let (logs, _guard) = crate::testlog::capture();

        let report = h.dispatcher.poll_once().await.unwrap();
        assert_eq!(report.dispatched, 2);
        assert_eq!(report.print_failures, 1);
        let warnings = logs.lines_with("WARN", "Couldn't print balloon 5");
        assert_eq!(warnings.len(), 1, "{}", logs.contents());
        assert!(warnings[0].contains("paper jam"));
        assert!(report.is_clean(), "print failures do not trigger backoff");
        assert_eq!(h.source.handled(), vec![4, 5, 6]);
        assert_eq!(printed_numbers(&h.printed), vec!["No. 4", "No. 6"]);

        // E5 is not fetched again.
        let again = h.dispatcher.poll_once().await.unwrap();
        assert_eq!(again.dispatched + again.print_failures, 0);
        assert_eq!(h.dispatcher.health.snapshot().print_failures, 1);
    }

    #[tokio::test]
    async fn contest_set_change_keeps_solve_history() {
        let source = MemorySource::new(vec![contest("1")], vec![event(1, "1", "A", "P")]);
        let mut h = harness(source, vec![], Duration::from_millis(10));
        h.dispatcher.poll_once().await.unwrap();
        let before = h.dispatcher.classifier.history("1").cloned().expect("c1 history");

        *h.source.contests.lock().unwrap() = vec![contest("1"), contest("2")];
        let report = h.dispatcher.poll_once().await.unwrap();
        assert_eq!(report.contests, 2);
        assert_eq!(h.dispatcher.classifier.history("1"), Some(&before));

        // A later solve in c1 is not a contest-first any more, while c2 starts fresh.
        h.source.push(event(2, "1", "A", "Q"));
        h.source.push(event(3, "2", "A", "P"));
        h.dispatcher.poll_once().await.unwrap();
        let texts: Vec<String> = h.printed.lock().unwrap().iter().map(Ticket::plain_text).collect();
        assert!(texts[1].contains(&format!("NOTE: {}", FirstSolve::Problem)));
        assert!(texts[2].contains(&format!("NOTE: {}", FirstSolve::Contest)));
    }

    #[tokio::test]
    async fn transient_listing_failure_skips_the_poll() {
        let source = MemorySource::new(vec![contest("1")], vec![event(1, "1", "A", "P")]);
        *source.list_failure.lock().unwrap() = Failure::Transient;
        let mut h = harness(source, vec![], Duration::from_millis(10));

        let report = h.dispatcher.poll_once().await.unwrap();
        assert_eq!(report.source_errors, 1);
        assert!(!report.is_clean());
        assert!(h.printed.lock().unwrap().is_empty());

        *h.source.list_failure.lock().unwrap() = Failure::None;
        let report = h.dispatcher.poll_once().await.unwrap();
        assert_eq!(report.dispatched, 1);
    }

    #[tokio::test]
    async fn transient_mark_failure_does_not_stop_the_batch() {
        let source = MemorySource::new(
            vec![contest("1")],
            vec![event(1, "1", "A", "P"), event(2, "1", "B", "P")],
        );
        *source.mark_failure.lock().unwrap() = Failure::Transient;
        let mut h = harness(source, vec![], Duration::from_millis(10));

        let report = h.dispatcher.poll_once().await.unwrap();
        assert_eq!(report.dispatched, 2);
        assert_eq!(report.mark_failures, 2);
        assert!(h.source.handled().is_empty());
    }

    #[tokio::test]
    async fn failed_mark_is_retried_without_reprinting() {
        let source = MemorySource::new(vec![contest("1")], vec![event(1, "1", "A", "P")]);
        *source.mark_failure.lock().unwrap() = Failure::Transient;
        let mut h = harness(source, vec![], Duration::from_millis(10));

        let first = h.dispatcher.poll_once().await.unwrap();
        assert_eq!(first.dispatched, 1);
        assert_eq!(first.mark_failures, 1);
        assert!(h.dispatcher.is_unmarked("1", 1));

        *h.source.mark_failure.lock().unwrap() = Failure::None;
        let second = h.dispatcher.poll_once().await.unwrap();
        assert_eq!(second.dispatched, 0);
        assert!(second.is_clean());
        assert_eq!(h.printed.lock().unwrap().len(), 1, "balloon 1 printed once");
        assert_eq!(h.source.handled(), vec![1]);
        assert!(h.dispatcher.unmarked.is_empty());
    }

    #[tokio::test]
    async fn persistent_mark_failure_never_reprints() {
        let source = MemorySource::new(vec![contest("1")], vec![event(1, "1", "A", "P")]);
        *source.mark_failure.lock().unwrap() = Failure::Transient;
        let mut h = harness(source, vec![], Duration::from_millis(10));

        h.dispatcher.poll_once().await.unwrap();
        let before = h.dispatcher.classifier.history("1").cloned();
        for _ in 0..3 {
            let report = h.dispatcher.poll_once().await.unwrap();
            assert_eq!(report.dispatched, 0);
            assert_eq!(report.mark_failures, 1);
        }
        assert_eq!(h.printed.lock().unwrap().len(), 1);
        assert_eq!(h.dispatcher.classifier.history("1").cloned(), before);

        // New balloons in the same contest still go out.
        h.source.push(event(2, "1", "B", "Q"));
        let report = h.dispatcher.poll_once().await.unwrap();
        assert_eq!(report.dispatched, 1);
        assert_eq!(printed_numbers(&h.printed), vec!["No. 1", "No. 2"]);
    }

    #[tokio::test]
    async fn authentication_failure_is_fatal() {
        let source = MemorySource::new(vec![contest("1")], vec![event(1, "1", "A", "P")]);
        *source.mark_failure.lock().unwrap() = Failure::Auth;
        let mut h = harness(Arc::clone(&source), vec![], Duration::from_millis(10));

        let err = h.dispatcher.poll_once().await.unwrap_err();
        assert!(err.is_fatal());
        // The ticket was printed before the mark was rejected.
        assert_eq!(h.printed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn run_stops_on_fatal_error_and_closes_source() {
        let source = MemorySource::new(vec![contest("1")], vec![]);
        *source.list_failure.lock().unwrap() = Failure::Auth;
        let h = harness(Arc::clone(&source), vec![], Duration::from_millis(10));

        let result = tokio::time::timeout(Duration::from_secs(5), h.dispatcher.run())
            .await
            .expect("run returns promptly");
        assert!(result.is_err());
        assert!(source.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn run_exits_cleanly_on_shutdown() {
        let source = MemorySource::new(vec![contest("1")], vec![event(1, "1", "A", "P")]);
        let h = harness(Arc::clone(&source), vec![], Duration::from_secs(3600));
        let health = Arc::clone(&h.dispatcher.health);
        let printed = Arc::clone(&h.printed);
        let shutdown_tx = h.shutdown_tx;

        let task = tokio::spawn(h.dispatcher.run());
        // Wait for the first poll to finish, then interrupt the long sleep.
        tokio::time::timeout(Duration::from_secs(5), async {
            while health.snapshot().last_poll_at_ms.is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("first poll completes");
        shutdown_tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("shutdown interrupts the sleep")
            .expect("task joins");
        assert!(result.is_ok());
        assert!(source.closed.load(Ordering::SeqCst));
        assert_eq!(printed.lock().unwrap().len(), 1);
        assert!(!health.snapshot().running);
    }

    #[tokio::test]
    async fn shutdown_before_start_polls_nothing() {
        let source = MemorySource::new(vec![contest("1")], vec![event(1, "1", "A", "P")]);
        let h = harness(Arc::clone(&source), vec![], Duration::from_millis(10));
        h.shutdown_tx.send(true).unwrap();

        h.dispatcher.run().await.unwrap();
        assert!(source.pending_calls.lock().unwrap().is_empty());
        assert!(h.printed.lock().unwrap().is_empty());
        assert!(source.closed.load(Ordering::SeqCst));
    }

    #[test]
    fn backoff_grows_and_resets() {
        let source = MemorySource::new(vec![], vec![]);
        let mut h = harness(source, vec![], Duration::from_secs(5));
        let failed = PollReport { source_errors: 1, ..PollReport::default() };

        let delays: Vec<u64> = (0..6).map(|_| h.dispatcher.next_delay(&failed).as_secs()).collect();
        assert_eq!(delays, vec![5, 10, 30, 60, 60, 60]);

        assert_eq!(h.dispatcher.next_delay(&PollReport::default()), Duration::from_secs(5));
        assert_eq!(h.dispatcher.next_delay(&failed), Duration::from_secs(5));
    }
}
