// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted stage runner for engine/daemon tests: returns whatever outcome
//! the test queued up, with no subprocess and no real device I/O.

use std::collections::VecDeque;

use async_trait::async_trait;
use flash_core::job::StageOutcome;
use parking_lot::Mutex;

use crate::stage::runner::{ProgressSink, StageContext, StageRunner};

/// A stage runner driven entirely by a queue of canned outcomes. Each call
/// to `run` pops the front of the queue; panics if the queue runs dry, so
/// a test that under-counts expected stage invocations fails loudly rather
/// than silently defaulting to `Success`.
pub struct FakeStageRunner {
    outcomes: Mutex<VecDeque<StageOutcome>>,
}

impl FakeStageRunner {
    pub fn new(outcomes: impl IntoIterator<Item = StageOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
        }
    }

    pub fn always(outcome: StageOutcome) -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::from([outcome])),
        }
    }
}

#[async_trait]
impl StageRunner for FakeStageRunner {
    async fn run(&self, _ctx: &StageContext, _sink: &dyn ProgressSink) -> StageOutcome {
        let mut queue = self.outcomes.lock();
        if queue.len() > 1 {
            match queue.pop_front() {
                Some(outcome) => outcome,
                None => unreachable!("checked non-empty"),
            }
        } else {
            match queue.front().cloned() {
                Some(outcome) => outcome,
                None => unreachable!("FakeStageRunner outcome queue exhausted"),
            }
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
