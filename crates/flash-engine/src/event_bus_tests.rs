use super::*;
use flash_core::event::{DriveChange, JobUpdate};
use flash_core::job::JobState;
use flash_core::port::CellId;

fn update(n: u64) -> JobEvent {
    JobEvent::JobUpdate(JobUpdate {
        job_id: JobId::new(format!("job-{n}")),
        cell_id: CellId::new("cell-a"),
        state: JobState::Writing,
        stage: "write".into(),
        progress: 0.0,
        speed_bps: None,
        eta_seconds: None,
    })
}

#[tokio::test]
async fn subscriber_receives_published_events_in_order() {
    let bus = EventBus::new(16);
    let mut sub = bus.subscribe();

    bus.publish(update(1));
    bus.publish(update(2));

    assert_eq!(sub.recv().await, update(1));
    assert_eq!(sub.recv().await, update(2));
}

#[tokio::test]
async fn two_subscribers_each_get_every_event() {
    let bus = EventBus::new(16);
    let mut a = bus.subscribe();
    let mut b = bus.subscribe();

    bus.publish(update(1));

    assert_eq!(a.recv().await, update(1));
    assert_eq!(b.recv().await, update(1));
}

#[tokio::test]
async fn overflow_drops_oldest_and_surfaces_resync() {
    let bus = EventBus::new(2);
    let mut sub = bus.subscribe();

    bus.publish(update(1));
    bus.publish(update(2));
    bus.publish(update(3)); // buffer full at 2; this push drops `update(1)`

    assert_eq!(sub.recv().await, JobEvent::Resync);
    assert_eq!(sub.recv().await, update(2));
    assert_eq!(sub.recv().await, update(3));
}

#[tokio::test]
async fn job_log_lines_coalesce_until_flush() {
    let bus = EventBus::new(16);
    let mut sub = bus.subscribe();
    let job_id = JobId::new("job-1");

    bus.publish(JobEvent::JobLog(JobLog {
        job_id: job_id.clone(),
        lines: vec!["line one".into()],
    }));
    bus.publish(JobEvent::JobLog(JobLog {
        job_id: job_id.clone(),
        lines: vec!["line two".into()],
    }));

    bus.flush_logs();

    let event = sub.recv().await;
    match event {
        JobEvent::JobLog(log) => {
            assert_eq!(log.job_id, job_id);
            assert_eq!(log.lines, vec!["line one".to_string(), "line two".to_string()]);
        }
        other => panic!("expected a coalesced job_log event, got {other:?}"),
    }
}

#[tokio::test]
async fn flush_with_no_pending_logs_emits_nothing() {
    let bus = EventBus::new(16);
    let sub = bus.subscribe();
    bus.flush_logs();
    assert_eq!(sub.slot.state.lock().buffer.len(), 0);
}

#[tokio::test]
async fn drive_change_events_are_not_coalesced() {
    let bus = EventBus::new(16);
    let mut sub = bus.subscribe();

    bus.publish(JobEvent::DriveChange(DriveChange {
        cell_id: CellId::new("cell-a"),
        drive: None,
    }));

    assert!(matches!(sub.recv().await, JobEvent::DriveChange(_)));
}

#[tokio::test]
async fn dropping_subscription_removes_it_from_the_bus() {
    let bus = EventBus::new(16);
    let sub = bus.subscribe();
    assert_eq!(bus.subscriber_count(), 1);
    drop(sub);
    assert_eq!(bus.subscriber_count(), 0);
}
