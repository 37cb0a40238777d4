//! Live status stream for one job.
//!
//! The channel tries the WebSocket push endpoint first and degrades to
//! polling the status endpoint when the connection cannot be made or dies
//! mid-job. Either way the consumer sees one ordered stream of
//! [`SyncMessage`]s that ends after a terminal event or `terminate()`.
//!
//! Resource discipline: the socket and the poll timer live inside a single
//! spawned task. Every exit path (terminal event, consumer gone, explicit
//! terminate, owner dropped) ends that task, which releases the transport.

use std::time::Duration;

use futures_util::StreamExt;
use log::{info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info_span, Instrument};

use crate::client::PipelineClient;
use crate::demo::DEMO_JOB_ID;
use crate::error::SyncError;
use crate::event::JobEvent;
use crate::logs::LogEntry;
use crate::sync::probe::{DemoStatusProbe, HttpStatusProbe, StatusProbe};

/// Poll cadence used when the caller does not pick one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Source name on log entries the channel itself produces.
const LOG_SOURCE: &str = "Sync";

/// One item delivered to the channel's consumer.
#[derive(Debug, Clone)]
pub enum SyncMessage {
    /// A parsed status report from the service.
    Event(JobEvent),
    /// A transport-level note worth surfacing in the activity feed.
    Log(LogEntry),
}

/// Consumer handle for the stream of one job's status updates.
pub struct JobSyncChannel {
    messages: mpsc::UnboundedReceiver<SyncMessage>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl JobSyncChannel {
    /// Opens the stream for a service-assigned job: push first, poll
    /// fallback. Returns immediately; the transport work happens in a
    /// background task.
    pub fn connect(client: PipelineClient, job_id: &str, poll_interval: Duration) -> Self {
        let push_url = client.endpoints().push_url(job_id);
        let probe = HttpStatusProbe::new(client, job_id);
        Self::spawn(Some(push_url), Box::new(probe), poll_interval, job_id)
    }

    /// Opens a stream fed by the scripted demo run. Uses the same poll
    /// loop as the HTTP fallback, so the consumer-side behavior matches
    /// a real degraded session.
    pub fn demo(poll_interval: Duration) -> Self {
        let probe = DemoStatusProbe::new();
        Self::spawn(None, Box::new(probe), poll_interval, DEMO_JOB_ID)
    }

    fn spawn(
        push_url: Option<String>,
        probe: Box<dyn StatusProbe + Send>,
        poll_interval: Duration,
        job_id: &str,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let span = info_span!("job_sync", job_id = %job_id);
        let task = tokio::spawn(
            async move {
                tokio::select! {
                    _ = run_sync(push_url, probe, tx, poll_interval) => {}
                    _ = shutdown_requested(&mut shutdown_rx) => {}
                }
            }
            .instrument(span),
        );

        Self {
            messages: rx,
            shutdown,
            task,
        }
    }

    /// Next message in arrival order, or `None` once the stream is over.
    ///
    /// After `terminate()` this returns `None` immediately, even if
    /// messages were still buffered; a stream that ended on its own is
    /// drained to the end first.
    pub async fn next_message(&mut self) -> Option<SyncMessage> {
        if *self.shutdown.borrow() {
            return None;
        }
        self.messages.recv().await
    }

    /// Stops the stream and releases the underlying transport. Safe to
    /// call more than once.
    pub fn terminate(&mut self) {
        // Ignore errors - the task may have finished and dropped its receiver
        let _ = self.shutdown.send(true);
    }

    /// Whether the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for JobSyncChannel {
    fn drop(&mut self) {
        self.terminate();
    }
}

async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Drives the whole stream: push phase, then poll fallback if the push
/// side never delivered a terminal event.
async fn run_sync(
    push_url: Option<String>,
    probe: Box<dyn StatusProbe + Send>,
    tx: mpsc::UnboundedSender<SyncMessage>,
    poll_interval: Duration,
) {
    if let Some(url) = push_url {
        match run_push(&url, &tx).await {
            PushOutcome::Terminal | PushOutcome::ConsumerGone => return,
            PushOutcome::Fallback => {}
        }
    }
    run_poll(probe, &tx, poll_interval).await;
}

enum PushOutcome {
    /// A terminal event went out; the stream is complete.
    Terminal,
    /// Nobody is reading anymore.
    ConsumerGone,
    /// Transport failed before a terminal event; the poll loop takes over.
    Fallback,
}

async fn run_push(url: &str, tx: &mpsc::UnboundedSender<SyncMessage>) -> PushOutcome {
    let (mut stream, _) = match connect_async(url).await {
        Ok(value) => value,
        Err(err) => {
            warn!("Push connection to {} failed: {}", url, err);
            let note = LogEntry::warning(
                LOG_SOURCE,
                "Live connection unavailable. Falling back to status polling.",
            );
            if tx.send(SyncMessage::Log(note)).is_err() {
                return PushOutcome::ConsumerGone;
            }
            return PushOutcome::Fallback;
        }
    };

    info!("Push connection established at {}", url);
    let note = LogEntry::info(LOG_SOURCE, "Live status connection established.");
    if tx.send(SyncMessage::Log(note)).is_err() {
        return PushOutcome::ConsumerGone;
    }

    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => match parse_frame(&text) {
                Ok(event) => {
                    let terminal = event.is_terminal();
                    if tx.send(SyncMessage::Event(event)).is_err() {
                        return PushOutcome::ConsumerGone;
                    }
                    if terminal {
                        return PushOutcome::Terminal;
                    }
                }
                Err(err) => {
                    warn!("Dropping malformed status frame: {}", err);
                }
            },
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                warn!("Push connection error: {}", err);
                let note = LogEntry::warning(
                    LOG_SOURCE,
                    "Live connection lost. Falling back to status polling.",
                );
                if tx.send(SyncMessage::Log(note)).is_err() {
                    return PushOutcome::ConsumerGone;
                }
                return PushOutcome::Fallback;
            }
            None => {
                warn!("Push connection closed before a terminal status");
                let note = LogEntry::warning(
                    LOG_SOURCE,
                    "Live connection lost. Falling back to status polling.",
                );
                if tx.send(SyncMessage::Log(note)).is_err() {
                    return PushOutcome::ConsumerGone;
                }
                return PushOutcome::Fallback;
            }
        }
    }
}

/// Polls the probe until a terminal event or the consumer goes away.
/// A failed poll is logged and retried on the next tick, forever.
async fn run_poll(
    mut probe: Box<dyn StatusProbe + Send>,
    tx: &mpsc::UnboundedSender<SyncMessage>,
    poll_interval: Duration,
) {
    let mut interval_timer = tokio::time::interval(poll_interval);
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval_timer.tick().await; // skip immediate first tick

    loop {
        interval_timer.tick().await;
        match probe.poll().await {
            Ok(event) => {
                let terminal = event.is_terminal();
                if tx.send(SyncMessage::Event(event)).is_err() {
                    return;
                }
                if terminal {
                    return;
                }
            }
            Err(err) => {
                warn!("Status poll failed, retrying on next tick: {}", err);
            }
        }
    }
}

fn parse_frame(raw: &str) -> Result<JobEvent, SyncError> {
    serde_json::from_str(raw).map_err(|err| SyncError::InvalidStatus(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST_POLL: Duration = Duration::from_millis(5);

    async fn drain_events(channel: &mut JobSyncChannel) -> Vec<JobEvent> {
        let mut events = Vec::new();
        while let Some(message) = channel.next_message().await {
            if let SyncMessage::Event(event) = message {
                events.push(event);
            }
        }
        events
    }

    #[test]
    fn test_parse_frame_accepts_status_frames() {
        let event = parse_frame(r#"{"status": "processing", "progress": 30, "current_agent": "imputer"}"#)
            .unwrap();
        assert_eq!(event.progress(), Some(30));
    }

    #[test]
    fn test_parse_frame_rejects_missing_status() {
        assert!(matches!(
            parse_frame(r#"{"foo": 1}"#),
            Err(SyncError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_parse_frame_rejects_invalid_json() {
        assert!(parse_frame("{not json").is_err());
    }

    #[tokio::test]
    async fn test_demo_channel_runs_to_completion() {
        let mut channel = JobSyncChannel::demo(FAST_POLL);
        let events = drain_events(&mut channel).await;

        assert_eq!(events.len(), 15);
        assert!(events.last().unwrap().is_terminal());
        assert!(events[..14].iter().all(|e| !e.is_terminal()));
    }

    #[tokio::test]
    async fn test_demo_channel_orders_stages() {
        let mut channel = JobSyncChannel::demo(FAST_POLL);
        let events = drain_events(&mut channel).await;

        let agents: Vec<&str> = events.iter().filter_map(|e| e.current_agent()).collect();
        assert_eq!(agents.first(), Some(&"schema_validator"));
        assert_eq!(agents.last(), Some(&"reporter"));
    }

    #[tokio::test]
    async fn test_task_ends_after_terminal_event() {
        let mut channel = JobSyncChannel::demo(FAST_POLL);
        drain_events(&mut channel).await;

        // The None from the drain means the sender is gone, so the task
        // has nothing left to do.
        tokio::task::yield_now().await;
        assert!(channel.is_finished());
    }

    #[tokio::test]
    async fn test_terminate_silences_channel_immediately() {
        // An hour-long interval: nothing would arrive on its own.
        let mut channel = JobSyncChannel::demo(Duration::from_secs(3600));
        channel.terminate();

        assert!(channel.next_message().await.is_none());
    }

    #[tokio::test]
    async fn test_terminate_is_idempotent() {
        let mut channel = JobSyncChannel::demo(FAST_POLL);
        channel.terminate();
        channel.terminate();

        assert!(channel.next_message().await.is_none());
    }

    #[tokio::test]
    async fn test_terminate_stops_background_task() {
        let mut channel = JobSyncChannel::demo(Duration::from_secs(3600));
        channel.terminate();

        // Give the scheduler a moment to observe the signal.
        for _ in 0..10 {
            if channel.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(channel.is_finished());
    }
}
