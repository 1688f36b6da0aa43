#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! The six literal end-to-end scenarios, each wiring fake adapters through
//! a real `Orchestrator` rather than the individual pieces.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flash_adapters::{FakeInventory, FakeStageRunner, ProgressSink, StageContext, StageRunner};
use flash_core::batch::{BatchRequest, BatchTarget};
use flash_core::clock::FakeClock;
use flash_core::drive::{Drive, UsbSpeed};
use flash_core::error::JobErrorKind;
use flash_core::id::SequentialIdGen;
use flash_core::job::{JobOptions, JobState, StageOutcome};
use flash_core::port::CellId;
use flash_engine::{Orchestrator, StageRunners};

fn drive(path: &str, is_system: bool) -> Drive {
    Drive {
        device_path: path.to_string(),
        by_path: None,
        size_bytes: 16_000_000_000,
        model: Some("Generic Flash".into()),
        serial: Some("SN1".into()),
        removable: !is_system,
        is_system,
        mounted: false,
        usb_speed: UsbSpeed::Usb3_0,
    }
}

fn runners_all_success() -> StageRunners {
    let always = |o: StageOutcome| Arc::new(FakeStageRunner::always(o)) as Arc<dyn StageRunner>;
    StageRunners {
        write: always(StageOutcome::Success),
        verify: always(StageOutcome::Success),
        expand: always(StageOutcome::Success),
        resize: always(StageOutcome::Success),
        eject: always(StageOutcome::Success),
    }
}

fn options(verify: bool, expand: bool, resize: bool) -> JobOptions {
    JobOptions {
        verify,
        expand_partition: expand,
        resize_filesystem: resize,
        eject_after_done: false,
    }
}

fn write_image(dir: &std::path::Path, name: &str) {
    std::fs::write(dir.join(name), vec![0u8; 4096]).unwrap();
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never became true within 2.5s");
}

/// Blocks until cancelled, mimicking a write runner whose subprocess is
/// still streaming bytes to the device.
struct BlockUntilCancelled;

#[async_trait]
impl StageRunner for BlockUntilCancelled {
    async fn run(&self, ctx: &StageContext, _sink: &dyn ProgressSink) -> StageOutcome {
        ctx.cancel.cancelled().await;
        StageOutcome::Cancelled
    }
}

/// Records the highest number of concurrent invocations observed, so the
/// concurrency cap can be checked directly rather than inferred.
struct ConcurrencyTrackingWriter {
    current: AtomicUsize,
    max_seen: AtomicUsize,
}

impl ConcurrencyTrackingWriter {
    fn new() -> Self {
        Self {
            current: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
        }
    }

    fn max_seen(&self) -> usize {
        self.max_seen.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StageRunner for ConcurrencyTrackingWriter {
    async fn run(&self, _ctx: &StageContext, _sink: &dyn ProgressSink) -> StageOutcome {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        StageOutcome::Success
    }
}

/// Mimics the real verify runner's behaviour of logging the exact mismatch
/// offset before failing the stage.
struct MismatchVerifier {
    offset: u64,
}

#[async_trait]
impl StageRunner for MismatchVerifier {
    async fn run(&self, _ctx: &StageContext, sink: &dyn ProgressSink) -> StageOutcome {
        sink.log(format!("verify mismatch at byte offset {}", self.offset));
        StageOutcome::Failure(JobErrorKind::VerifyMismatch { offset: self.offset })
    }
}

#[tokio::test]
async fn scenario_1_happy_path_single_cell() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "test.img");

    let inventory = Arc::new(FakeInventory::new(vec![drive("/dev/sdz", false)]));
    let orch = Orchestrator::new(
        inventory,
        runners_all_success(),
        dir.path().to_path_buf(),
        FakeClock::new(),
        Arc::new(SequentialIdGen::new("job")),
        2,
        64,
    );

    let mut sub = orch.subscribe();

    let jobs = orch
        .start_batch(BatchRequest {
            image_name: "test.img".into(),
            options: options(true, false, false),
            targets: vec![BatchTarget {
                cell_id: CellId::new("cell-a"),
                device_path: "/dev/sdz".into(),
            }],
            concurrency_limit: 2,
        })
        .await
        .unwrap();
    let job_id = jobs[0].job_id.clone();

    let mut seen_states = Vec::new();
    loop {
        let event = sub.recv().await;
        if let flash_core::event::JobEvent::JobUpdate(update) = event {
            if update.job_id == job_id {
                if seen_states.last() != Some(&update.state) {
                    seen_states.push(update.state);
                }
                if update.state.is_terminal() {
                    break;
                }
            }
        }
    }

    assert_eq!(
        seen_states,
        vec![
            JobState::Queued,
            JobState::Writing,
            JobState::Verifying,
            JobState::Done,
        ]
    );

    let finished = orch.job(&job_id).unwrap();
    assert_eq!(finished.state, JobState::Done);
    assert_eq!(finished.progress, 1.0);
    assert!(finished.error.is_none());
}

#[tokio::test]
async fn scenario_2_concurrency_cap_holds_across_five_cells() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "test.img");

    let tracker = Arc::new(ConcurrencyTrackingWriter::new());
    let mut runners = runners_all_success();
    runners.write = tracker.clone();

    let drives: Vec<Drive> = (0..5).map(|i| drive(&format!("/dev/sd{i}"), false)).collect();
    let inventory = Arc::new(FakeInventory::new(drives));
    let orch = Orchestrator::new(
        inventory,
        runners,
        dir.path().to_path_buf(),
        FakeClock::new(),
        Arc::new(SequentialIdGen::new("job")),
        2,
        64,
    );

    let targets: Vec<BatchTarget> = (0..5)
        .map(|i| BatchTarget {
            cell_id: CellId::new(format!("cell-{i}")),
            device_path: format!("/dev/sd{i}"),
        })
        .collect();

    let jobs = orch
        .start_batch(BatchRequest {
            image_name: "test.img".into(),
            options: options(false, false, false),
            targets,
            concurrency_limit: 2,
        })
        .await
        .unwrap();
    assert_eq!(jobs.len(), 5);

    wait_until(|| {
        orch.list_jobs()
            .iter()
            .all(|j| j.state.is_terminal())
    })
    .await;

    assert!(tracker.max_seen() <= 2, "never more than 2 writers ran at once, saw {}", tracker.max_seen());
    assert!(orch.list_jobs().iter().all(|j| j.state == JobState::Done));
}

#[tokio::test]
async fn scenario_3_safety_rejection_on_root_device() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "test.img");

    let inventory = Arc::new(FakeInventory::new(vec![drive("/dev/sda", true)]));
    let orch = Orchestrator::new(
        inventory,
        runners_all_success(),
        dir.path().to_path_buf(),
        FakeClock::new(),
        Arc::new(SequentialIdGen::new("job")),
        2,
        64,
    );

    let jobs = orch
        .start_batch(BatchRequest {
            image_name: "test.img".into(),
            options: options(true, false, false),
            targets: vec![BatchTarget {
                cell_id: CellId::new("cell-a"),
                device_path: "/dev/sda".into(),
            }],
            concurrency_limit: 1,
        })
        .await
        .unwrap();

    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].state, JobState::Failed);
    assert!(matches!(
        jobs[0].error,
        Some(JobErrorKind::PreflightRejected(_))
    ));
}

#[tokio::test]
async fn scenario_4_verify_mismatch_at_100_mib() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "test.img");

    const MISMATCH_OFFSET: u64 = 100 * 1024 * 1024;
    let mut runners = runners_all_success();
    runners.verify = Arc::new(MismatchVerifier { offset: MISMATCH_OFFSET });

    let inventory = Arc::new(FakeInventory::new(vec![drive("/dev/sdz", false)]));
    let orch = Orchestrator::new(
        inventory,
        runners,
        dir.path().to_path_buf(),
        FakeClock::new(),
        Arc::new(SequentialIdGen::new("job")),
        1,
        64,
    );

    let jobs = orch
        .start_batch(BatchRequest {
            image_name: "test.img".into(),
            options: options(true, false, false),
            targets: vec![BatchTarget {
                cell_id: CellId::new("cell-a"),
                device_path: "/dev/sdz".into(),
            }],
            concurrency_limit: 1,
        })
        .await
        .unwrap();
    let job_id = jobs[0].job_id.clone();

    wait_until(|| orch.job(&job_id).map(|j| j.state.is_terminal()).unwrap_or(false)).await;

    let finished = orch.job(&job_id).unwrap();
    assert_eq!(finished.state, JobState::Failed);
    assert!(matches!(
        finished.error,
        Some(JobErrorKind::VerifyMismatch { offset }) if offset == MISMATCH_OFFSET
    ));
    assert!(finished.warning.is_none());
    assert!(
        finished
            .log_tail
            .iter()
            .any(|line| line.contains(&MISMATCH_OFFSET.to_string())),
        "log_tail should contain the mismatch offset, got {:?}",
        finished.log_tail
    );
}

#[tokio::test]
async fn scenario_5_expand_warning_still_runs_resize() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "test.img");

    let resize_ran = Arc::new(AtomicUsize::new(0));

    struct CountingResize(Arc<AtomicUsize>);
    #[async_trait]
    impl StageRunner for CountingResize {
        async fn run(&self, _ctx: &StageContext, _sink: &dyn ProgressSink) -> StageOutcome {
            self.0.fetch_add(1, Ordering::SeqCst);
            StageOutcome::Success
        }
    }

    let mut runners = runners_all_success();
    runners.expand = Arc::new(FakeStageRunner::always(StageOutcome::Warning(
        "parted exited non-zero".into(),
    )));
    runners.resize = Arc::new(CountingResize(resize_ran.clone()));

    let inventory = Arc::new(FakeInventory::new(vec![drive("/dev/sdz", false)]));
    let orch = Orchestrator::new(
        inventory,
        runners,
        dir.path().to_path_buf(),
        FakeClock::new(),
        Arc::new(SequentialIdGen::new("job")),
        1,
        64,
    );

    let jobs = orch
        .start_batch(BatchRequest {
            image_name: "test.img".into(),
            options: options(true, true, true),
            targets: vec![BatchTarget {
                cell_id: CellId::new("cell-a"),
                device_path: "/dev/sdz".into(),
            }],
            concurrency_limit: 1,
        })
        .await
        .unwrap();
    let job_id = jobs[0].job_id.clone();

    wait_until(|| orch.job(&job_id).map(|j| j.state.is_terminal()).unwrap_or(false)).await;

    let finished = orch.job(&job_id).unwrap();
    assert_eq!(finished.state, JobState::Done);
    assert!(finished.warning.is_some());
    assert_eq!(resize_ran.load(Ordering::SeqCst), 1, "resize must still run after an expand warning");
}

#[tokio::test]
async fn scenario_6_cancel_all_during_write() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "test.img");

    let mut runners = runners_all_success();
    runners.write = Arc::new(BlockUntilCancelled);

    let drives = vec![
        drive("/dev/sda", false),
        drive("/dev/sdb", false),
        drive("/dev/sdc", false),
    ];
    let inventory = Arc::new(FakeInventory::new(drives));
    let orch = Orchestrator::new(
        inventory,
        runners,
        dir.path().to_path_buf(),
        FakeClock::new(),
        Arc::new(SequentialIdGen::new("job")),
        2,
        64,
    );

    let targets = vec![
        BatchTarget {
            cell_id: CellId::new("cell-a"),
            device_path: "/dev/sda".into(),
        },
        BatchTarget {
            cell_id: CellId::new("cell-b"),
            device_path: "/dev/sdb".into(),
        },
        BatchTarget {
            cell_id: CellId::new("cell-c"),
            device_path: "/dev/sdc".into(),
        },
    ];

    let jobs = orch
        .start_batch(BatchRequest {
            image_name: "test.img".into(),
            options: options(false, false, false),
            targets,
            concurrency_limit: 2,
        })
        .await
        .unwrap();
    assert_eq!(jobs.len(), 3);

    // Let the two admitted jobs' executor tasks actually reach the blocking
    // write stage before cancelling, so `cancel_batch` observes WRITING
    // rather than a not-yet-polled QUEUED.
    wait_until(|| {
        orch.list_jobs()
            .iter()
            .filter(|j| j.state == JobState::Writing)
            .count()
            == 2
    })
    .await;

    orch.cancel_batch();

    wait_until(|| {
        orch.list_jobs()
            .iter()
            .all(|j| j.state.is_terminal())
    })
    .await;

    let finished = orch.list_jobs();
    assert_eq!(finished.len(), 3);
    assert!(finished.iter().all(|j| j.state == JobState::Cancelled));
}

#[tokio::test]
async fn retry_after_rejection_uses_a_fresh_job_id_and_leaves_the_original_untouched() {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "test.img");

    let inventory = Arc::new(FakeInventory::new(vec![drive("/dev/sda", true)]));
    let orch = Orchestrator::new(
        inventory,
        runners_all_success(),
        dir.path().to_path_buf(),
        FakeClock::new(),
        Arc::new(SequentialIdGen::new("job")),
        1,
        64,
    );

    let jobs = orch
        .start_batch(BatchRequest {
            image_name: "test.img".into(),
            options: options(true, false, false),
            targets: vec![BatchTarget {
                cell_id: CellId::new("cell-a"),
                device_path: "/dev/sda".into(),
            }],
            concurrency_limit: 1,
        })
        .await
        .unwrap();
    let original = jobs[0].clone();
    assert_eq!(original.state, JobState::Failed);

    let err = orch.eject_cell(&CellId::new("cell-a"), "/dev/sda").await;
    assert!(err.is_ok(), "ejecting a cell whose only job is terminal must be allowed");

    let retried = orch.retry_job(&original.job_id).await.unwrap();
    assert_ne!(retried.job_id, original.job_id);
    assert_eq!(retried.state, JobState::Queued);

    let still_there = orch.job(&original.job_id).unwrap();
    assert_eq!(still_there, original, "retry must not mutate the original record");
}
