//! Background event streaming while a stack operation is in flight

use crate::cancel::CancelToken;
use crate::client::{RemoteStackClient, StackEvent, StackHandle};
use crate::observer::RunObserver;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::thread;
use std::time::Duration;

/// Number of pre-existing events shown when tailing starts.
pub const INITIAL_EVENTS: usize = 2;

/// Polls a stack's lifecycle events and forwards new ones to the observer.
///
/// Fetch failures are logged and skipped; they never affect the operation
/// being waited on.
pub struct EventTailer<'a> {
    client: &'a dyn RemoteStackClient,
    observer: &'a dyn RunObserver,
    cancel: &'a CancelToken,
    stack: String,
    handle: StackHandle,
    poll_interval: Duration,
    last_seen: Option<DateTime<Utc>>,
    seen: HashSet<String>,
    started: bool,
}

impl<'a> EventTailer<'a> {
    pub fn new(
        client: &'a dyn RemoteStackClient,
        observer: &'a dyn RunObserver,
        cancel: &'a CancelToken,
        stack: impl Into<String>,
        handle: StackHandle,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            observer,
            cancel,
            stack: stack.into(),
            handle,
            poll_interval,
            last_seen: None,
            seen: HashSet::new(),
            started: false,
        }
    }

    /// Fetch and report events not seen yet.
    ///
    /// The first call reports only the latest [`INITIAL_EVENTS`] events.
    pub fn poll(&mut self) {
        let events = match self.client.fetch_recent_events(&self.handle, self.last_seen) {
            Ok(events) => events,
            Err(e) => {
                log::warn!("{}: could not fetch events: {e}", self.stack);
                return;
            }
        };

        let fresh: Vec<StackEvent> = events
            .into_iter()
            .filter(|e| !self.seen.contains(&e.event_id))
            .collect();
        let skip = if self.started {
            0
        } else {
            fresh.len().saturating_sub(INITIAL_EVENTS)
        };
        self.started = true;

        for (i, event) in fresh.into_iter().enumerate() {
            self.last_seen = Some(self.last_seen.map_or(event.timestamp, |t| t.max(event.timestamp)));
            self.seen.insert(event.event_id.clone());
            if i >= skip {
                self.observer.on_event(&self.stack, &event);
            }
        }
    }

    /// Poll until `stop` is set, sleeping one interval between polls.
    pub fn run(&mut self, stop: &CancelToken) {
        loop {
            self.poll();
            if stop.sleep(self.poll_interval) {
                break;
            }
        }
    }

    /// Run `work` on the current thread while tailing on a scoped thread.
    ///
    /// The tailer is stopped and joined before this returns. Unless the run
    /// was cancelled, one final poll picks up the events that led to the
    /// terminal state.
    pub fn tail_while<T>(&mut self, work: impl FnOnce() -> T) -> T {
        let stop = CancelToken::new();
        let result = thread::scope(|s| {
            let tailer = &mut *self;
            let stop_ref = &stop;
            let handle = s.spawn(move || tailer.run(stop_ref));
            let result = work();
            stop.cancel();
            if handle.join().is_err() {
                log::warn!("event tailer thread panicked");
            }
            result
        });

        if !self.cancel.is_cancelled() {
            self.poll();
        }
        result
    }
}
