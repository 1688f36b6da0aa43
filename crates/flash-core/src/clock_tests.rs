use super::*;

#[test]
fn fake_clock_advances_monotonic_and_epoch_together() {
    let clock = FakeClock::new();
    let t0 = clock.now();
    let e0 = clock.epoch_ms();

    clock.advance(Duration::from_secs(5));

    assert_eq!(clock.now(), t0 + Duration::from_secs(5));
    assert_eq!(clock.epoch_ms(), e0 + 5000);
}

#[test]
fn fake_clock_clones_share_state() {
    let clock = FakeClock::new();
    let clone = clock.clone();
    clock.advance(Duration::from_secs(1));
    assert_eq!(clock.now(), clone.now());
}

#[test]
fn system_clock_epoch_ms_is_plausible() {
    let clock = SystemClock;
    // Some time after 2023-01-01; guards against obviously broken conversions.
    assert!(clock.epoch_ms() > 1_672_531_200_000);
}
