use super::*;
use flash_core::image::Image;

struct NullSink;
impl ProgressSink for NullSink {
    fn progress(&self, _report: crate::stage::runner::ProgressReport) {}
    fn log(&self, _line: String) {}
}

fn ctx() -> StageContext {
    let image = Image {
        name: "os.img".into(),
        path: "/tmp/os.img".into(),
        compressed: false,
        uncompressed_bytes: None,
        digest: None,
    };
    StageContext::new("/dev/fake", image, tokio_util::sync::CancellationToken::new())
}

#[tokio::test]
async fn fake_runner_returns_outcomes_in_order() {
    let runner = FakeStageRunner::new([StageOutcome::Success, StageOutcome::Cancelled]);
    assert_eq!(runner.run(&ctx(), &NullSink).await, StageOutcome::Success);
    assert_eq!(runner.run(&ctx(), &NullSink).await, StageOutcome::Cancelled);
}

#[tokio::test]
async fn fake_runner_always_repeats_its_single_outcome() {
    let runner = FakeStageRunner::always(StageOutcome::Success);
    assert_eq!(runner.run(&ctx(), &NullSink).await, StageOutcome::Success);
    assert_eq!(runner.run(&ctx(), &NullSink).await, StageOutcome::Success);
}

#[tokio::test]
#[should_panic(expected = "exhausted")]
async fn fake_runner_panics_when_queue_runs_dry() {
    let runner = FakeStageRunner::new(Vec::<StageOutcome>::new());
    runner.run(&ctx(), &NullSink).await;
}
