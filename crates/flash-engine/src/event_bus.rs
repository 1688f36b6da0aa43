// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Event Bus: fans job-update, job-log, and drive-change events out to
//! N independent subscribers, each behind its own bounded ring buffer so a
//! slow consumer can never stall a publisher (spec §4.6). Grounded in the
//! teacher's `daemon/src/event_bus.rs` `EventBus`/`EventReader` split, but
//! generalized from its one WAL-backed reader to many concurrent fanout
//! consumers — there is no durability requirement here, so the WAL is
//! dropped entirely in favor of an in-memory per-subscriber deque.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use flash_core::event::{JobEvent, JobLog};
use flash_core::job::JobId;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::events::EventPublisher;

struct SubscriberState {
    buffer: VecDeque<JobEvent>,
    dropped: bool,
}

struct SubscriberSlot {
    state: Mutex<SubscriberState>,
    notify: Notify,
}

struct Shared {
    subscribers: Mutex<HashMap<u64, Arc<SubscriberSlot>>>,
    next_id: AtomicU64,
    capacity: usize,
    pending_logs: Mutex<HashMap<JobId, Vec<String>>>,
}

impl Shared {
    fn push_to_all(&self, event: JobEvent) {
        let subscribers = self.subscribers.lock();
        for slot in subscribers.values() {
            let mut state = slot.state.lock();
            if state.buffer.len() >= self.capacity {
                state.buffer.pop_front();
                state.dropped = true;
            }
            state.buffer.push_back(event.clone());
            drop(state);
            slot.notify.notify_one();
        }
    }
}

/// Fan-out event bus. Cheap to clone (an `Arc` underneath); every clone
/// publishes to and shares the same set of subscribers.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Shared>,
}

impl EventBus {
    /// `capacity` is the per-subscriber ring buffer size (spec §4.6: "e.g.
    /// 256 events").
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Shared {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                capacity,
                pending_logs: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register a new subscriber with an empty buffer.
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(SubscriberSlot {
            state: Mutex::new(SubscriberState {
                buffer: VecDeque::new(),
                dropped: false,
            }),
            notify: Notify::new(),
        });
        self.inner.subscribers.lock().insert(id, slot.clone());
        Subscription {
            id,
            shared: self.inner.clone(),
            slot,
        }
    }

    /// Drain every job's pending `job_log` lines accumulated since the last
    /// flush and fan out one coalesced [`JobEvent::JobLog`] per job, per
    /// spec §4.6 ("within a window, multiple lines for the same job become
    /// one event"). The caller owns the timing — a background task ticking
    /// every [`crate::env::job_log_coalesce_window`] in the daemon — so this
    /// method itself is synchronous and trivially unit-testable.
    pub fn flush_logs(&self) {
        let pending = std::mem::take(&mut *self.inner.pending_logs.lock());
        for (job_id, lines) in pending {
            if lines.is_empty() {
                continue;
            }
            self.inner
                .push_to_all(JobEvent::JobLog(JobLog { job_id, lines }));
        }
    }

    /// Number of live subscribers. Exposed for health/diagnostics endpoints
    /// an external surface might wire up.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: JobEvent) {
        match event {
            JobEvent::JobLog(log) => {
                self.inner
                    .pending_logs
                    .lock()
                    .entry(log.job_id)
                    .or_default()
                    .extend(log.lines);
            }
            other => self.inner.push_to_all(other),
        }
    }
}

/// A live subscriber's handle onto the bus. Dropping it unregisters the
/// subscriber; there is no separate `unsubscribe` call to forget.
pub struct Subscription {
    id: u64,
    shared: Arc<Shared>,
    slot: Arc<SubscriberSlot>,
}

impl Subscription {
    /// Wait for the next event. A dropped-events gap surfaces as one
    /// [`JobEvent::Resync`] ahead of whatever events survived in the
    /// buffer, per spec §4.6's "resync hint".
    pub async fn recv(&mut self) -> JobEvent {
        loop {
            {
                let mut state = self.slot.state.lock();
                if state.dropped {
                    state.dropped = false;
                    return JobEvent::Resync;
                }
                if let Some(event) = state.buffer.pop_front() {
                    return event;
                }
            }
            self.slot.notify.notified().await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shared.subscribers.lock().remove(&self.id);
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
