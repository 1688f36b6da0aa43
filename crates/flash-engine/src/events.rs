// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The narrow seam between the engine and the Event Bus: the engine only
//! ever needs to publish, never subscribe, so it depends on this one
//! trait rather than the daemon's fanout implementation.

use flash_core::event::JobEvent;

pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: JobEvent);
}

/// Drops every event. Useful for tests that only care about final job
/// table state, not the event stream.
pub struct NullPublisher;

impl EventPublisher for NullPublisher {
    fn publish(&self, _event: JobEvent) {}
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    pub struct RecordingPublisher {
        events: Mutex<Vec<JobEvent>>,
    }

    impl RecordingPublisher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<JobEvent> {
            self.events.lock().clone()
        }
    }

    impl EventPublisher for RecordingPublisher {
        fn publish(&self, event: JobEvent) {
            self.events.lock().push(event);
        }
    }
}
