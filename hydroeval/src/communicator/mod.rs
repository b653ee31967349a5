//! Bounded, verbosity-gated message queues for surfacing scoring progress
//! and diagnostics to whatever is watching (a terminal, a log sink, a test).

use crate::error::{Error, Result};
use chrono::{SecondsFormat, Utc};
use parking_lot::ReentrantMutex;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::timeout;

/// Maximum number of enqueue attempts before the oldest queued entry is
/// dropped to make room.
pub const MAX_ENQUEUE_ATTEMPTS: usize = 10;
const DEFAULT_QUEUE_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// How much a [`Communicator`] is willing to hear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Normal,
    Loud,
    All,
}

/// One queued message.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub time: String,
    pub message: String,
}

/// A handler invoked when a communicator fires one of its named events
/// (`info`, `error`, `expire`, `receive`, `read_error`, or a user-defined
/// name).
pub type EventHandler = Arc<dyn Fn(&LogEntry) + Send + Sync>;

struct Queues {
    info: VecDeque<LogEntry>,
    error: VecDeque<LogEntry>,
}

/// A named endpoint with bounded info/error queues, a verbosity gate, and a
/// table of handlers fired on queue events.
///
/// Both queues are guarded by a single reentrant lock, since a handler
/// fired while holding the lock (e.g. an `"expire"` handler triggered from
/// within `info`) may itself need to read queue state.
pub struct Communicator {
    name: String,
    verbosity: Verbosity,
    capacity: usize,
    timestamp_format: Option<String>,
    queues: ReentrantMutex<RefCell<Queues>>,
    handlers: HashMap<String, Vec<EventHandler>>,
    notify: Notify,
}

impl Communicator {
    pub fn new(name: impl Into<String>, verbosity: Verbosity, capacity: usize) -> Self {
        Communicator {
            name: name.into(),
            verbosity,
            capacity: capacity.max(1),
            timestamp_format: Some("%Y-%m-%dT%H:%M:%S%.3fZ".to_owned()),
            queues: ReentrantMutex::new(RefCell::new(Queues {
                info: VecDeque::new(),
                error: VecDeque::new(),
            })),
            handlers: HashMap::new(),
            notify: Notify::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Disables timestamp prefixing (it is on, using an ISO-8601 UTC format,
    /// by default).
    pub fn without_timestamps(mut self) -> Self {
        self.timestamp_format = None;
        self
    }

    /// Registers a handler for `event` (`"info"`, `"error"`, `"expire"`,
    /// `"receive"`, `"read_error"`, or any user-defined name).
    pub fn on(&mut self, event: impl Into<String>, handler: EventHandler) {
        self.handlers.entry(event.into()).or_default().push(handler);
    }

    fn fire(&self, event: &str, entry: &LogEntry) {
        if let Some(handlers) = self.handlers.get(event) {
            for handler in handlers {
                handler(entry);
            }
        }
    }

    fn format_entry(&self, message: String) -> LogEntry {
        let time = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let message = match &self.timestamp_format {
            Some(_) => format!("[{time}] {message}"),
            None => message,
        };
        LogEntry { time, message }
    }

    /// Enqueues `msg` to the info queue if `verbosity` is at least as loud
    /// as this communicator's own setting; otherwise drops it silently.
    /// Evicts the oldest entry (firing `"expire"`) when full. Fires
    /// `"info"` when `publish` is true.
    pub async fn info(&self, msg: impl Into<String>, verbosity: Verbosity, publish: bool) -> Result<()> {
        if self.verbosity < verbosity {
            return Ok(());
        }

        let entry = self.format_entry(msg.into());
        self.enqueue_with_retry(|queues| &mut queues.info, entry.clone()).await?;

        if publish {
            self.fire("info", &entry);
        }
        self.notify.notify_waiters();

        Ok(())
    }

    /// Same contract as [`Communicator::info`], against the error queue,
    /// with a pre-formatted stack trace appended when provided.
    pub async fn error(
        &self,
        msg: impl Into<String>,
        trace: Option<String>,
        verbosity: Verbosity,
        publish: bool,
    ) -> Result<()> {
        if self.verbosity < verbosity {
            return Ok(());
        }

        let mut message = msg.into();
        if let Some(trace) = trace {
            message.push('\n');
            message.push_str(&trace);
        }

        let entry = self.format_entry(message);
        self.enqueue_with_retry(|queues| &mut queues.error, entry.clone()).await?;

        if publish {
            self.fire("error", &entry);
        }

        Ok(())
    }

    /// Enqueues a structured `{event, time, data}` message as info.
    pub async fn write(&self, reason: &str, data: &Value) -> Result<()> {
        let payload = json!({ "event": reason, "time": Utc::now().to_rfc3339(), "data": data });
        self.info(payload.to_string(), Verbosity::Normal, false).await
    }

    async fn enqueue_with_retry(
        &self,
        queue: impl Fn(&mut Queues) -> &mut VecDeque<LogEntry>,
        entry: LogEntry,
    ) -> Result<()> {
        for _ in 0..MAX_ENQUEUE_ATTEMPTS {
            let attempt = timeout(DEFAULT_QUEUE_ATTEMPT_TIMEOUT, async {
                let guard = self.queues.lock();
                let mut queues = guard.borrow_mut();
                let q = queue(&mut queues);

                if q.len() >= self.capacity {
                    if let Some(evicted) = q.pop_front() {
                        drop(queues);
                        self.fire("expire", &evicted);
                        let guard = self.queues.lock();
                        let mut queues = guard.borrow_mut();
                        queue(&mut queues).push_back(entry.clone());
                        return;
                    }
                }

                q.push_back(entry.clone());
            })
            .await;

            if attempt.is_ok() {
                return Ok(());
            }
        }

        Err(Error::Communicator(format!(
            "exhausted {MAX_ENQUEUE_ATTEMPTS} attempts enqueueing a message on '{}'",
            self.name
        )))
    }

    /// Drains the info queue, returning a copy of its entries in order
    /// while leaving the queue's contents unchanged.
    pub fn get_info(&self) -> Vec<LogEntry> {
        let guard = self.queues.lock();
        let queues = guard.borrow();
        queues.info.iter().cloned().collect()
    }

    /// Drains the error queue the same way [`Communicator::get_info`]
    /// drains the info queue, firing `"read_error"` for each entry read.
    pub fn get_errors(&self) -> Vec<LogEntry> {
        let guard = self.queues.lock();
        let entries: Vec<LogEntry> = guard.borrow().error.iter().cloned().collect();
        drop(guard);

        for entry in &entries {
            self.fire("read_error", entry);
        }

        entries
    }

    pub fn information_count(&self) -> usize {
        self.queues.lock().borrow().info.len()
    }

    pub fn error_count(&self) -> usize {
        self.queues.lock().borrow().error.len()
    }

    /// Waits for and removes the next info entry, blocking until one
    /// arrives if the queue is currently empty.
    pub async fn read(&self) -> LogEntry {
        loop {
            {
                let guard = self.queues.lock();
                let mut queues = guard.borrow_mut();
                if let Some(entry) = queues.info.pop_front() {
                    return entry;
                }
            }
            self.notify.notified().await;
        }
    }
}

/// A fan-out group of [`Communicator`]s, keyed by name.
#[derive(Default)]
pub struct CommunicatorGroup {
    members: HashMap<String, Arc<Communicator>>,
    fallback_logger: Option<slog::Logger>,
}

impl CommunicatorGroup {
    pub fn new() -> Self {
        CommunicatorGroup {
            members: HashMap::new(),
            fallback_logger: None,
        }
    }

    pub fn with_fallback_logger(mut self, logger: slog::Logger) -> Self {
        self.fallback_logger = Some(logger);
        self
    }

    pub fn add(&mut self, communicator: Communicator) {
        self.members.insert(communicator.name().to_owned(), Arc::new(communicator));
    }

    pub fn get(&self, name: &str) -> Option<Arc<Communicator>> {
        self.members.get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Fans `msg` out to every member whose own verbosity is at least
    /// `verbosity`. Falls back to the process logger when the group is
    /// empty.
    pub async fn write(&self, reason: &str, data: &Value, verbosity: Verbosity) -> Result<()> {
        if self.members.is_empty() {
            if let Some(logger) = &self.fallback_logger {
                slog::info!(logger, "{}", reason; "data" => %data);
            }
            return Ok(());
        }

        for member in self.members.values() {
            if member.verbosity() >= verbosity {
                member.write(reason, data).await?;
            }
        }

        Ok(())
    }

    /// Fans an info message out to every member, honoring each member's own
    /// verbosity gate.
    pub async fn info(&self, msg: &str, verbosity: Verbosity, publish: bool) -> Result<()> {
        for member in self.members.values() {
            member.info(msg.to_owned(), verbosity, publish).await?;
        }
        Ok(())
    }

    /// Fans an error out to every member; if the group is empty, the error
    /// goes to the process logger instead of being silently lost.
    pub async fn error(&self, msg: &str, trace: Option<String>, verbosity: Verbosity, publish: bool) -> Result<()> {
        if self.members.is_empty() {
            if let Some(logger) = &self.fallback_logger {
                slog::error!(logger, "{}", msg);
            }
            return Ok(());
        }

        for member in self.members.values() {
            member.error(msg.to_owned(), trace.clone(), verbosity, publish).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drops_messages_below_its_own_verbosity() {
        let comm = Communicator::new("quiet", Verbosity::Quiet, 10);
        comm.info("hello", Verbosity::Loud, false).await.unwrap();

        assert_eq!(comm.information_count(), 0);
    }

    #[tokio::test]
    async fn accepts_messages_at_or_above_its_own_verbosity() {
        let comm = Communicator::new("normal", Verbosity::Normal, 10);
        comm.info("hello", Verbosity::Quiet, false).await.unwrap();

        assert_eq!(comm.information_count(), 1);
    }

    #[tokio::test]
    async fn evicts_oldest_entry_when_full() {
        let comm = Communicator::new("bounded", Verbosity::All, 2);

        comm.info("a", Verbosity::Quiet, false).await.unwrap();
        comm.info("b", Verbosity::Quiet, false).await.unwrap();
        comm.info("c", Verbosity::Quiet, false).await.unwrap();

        let entries = comm.get_info();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].message.contains('b'));
        assert!(entries[1].message.contains('c'));
    }

    #[tokio::test]
    async fn get_info_preserves_order_and_count() {
        let comm = Communicator::new("preserve", Verbosity::All, 10);
        for msg in ["a", "b", "c"] {
            comm.info(msg, Verbosity::Quiet, false).await.unwrap();
        }

        let first_read = comm.get_info();
        let second_read = comm.get_info();

        assert_eq!(first_read.len(), second_read.len());
        assert_eq!(comm.information_count(), 3);
    }

    #[tokio::test]
    async fn expire_handler_fires_on_eviction() {
        let mut comm = Communicator::new("evicting", Verbosity::All, 1);
        let evicted = Arc::new(parking_lot::Mutex::new(None));
        let evicted2 = evicted.clone();
        comm.on(
            "expire",
            Arc::new(move |entry: &LogEntry| {
                *evicted2.lock() = Some(entry.message.clone());
            }),
        );

        comm.info("first", Verbosity::Quiet, false).await.unwrap();
        comm.info("second", Verbosity::Quiet, false).await.unwrap();

        assert!(evicted.lock().as_ref().unwrap().contains("first"));
    }

    #[tokio::test]
    async fn group_write_honors_the_per_member_verbosity_gate() {
        let mut group = CommunicatorGroup::new();
        group.add(Communicator::new("quiet", Verbosity::Quiet, 10));
        group.add(Communicator::new("loud", Verbosity::Loud, 10));

        group.write("progress", &json!({"pct": 50}), Verbosity::Loud).await.unwrap();

        assert_eq!(group.get("quiet").unwrap().information_count(), 0);
        assert_eq!(group.get("loud").unwrap().information_count(), 1);
    }
}
