use super::*;

#[test]
fn first_sample_is_taken_verbatim() {
    let mut monitor = SpeedMonitor::new();
    assert_eq!(monitor.sample(1_000_000.0), 1_000_000.0);
}

#[test]
fn subsequent_samples_are_smoothed_toward_new_value() {
    let mut monitor = SpeedMonitor::with_alpha(0.5);
    monitor.sample(1_000_000.0);
    let smoothed = monitor.sample(2_000_000.0);
    assert_eq!(smoothed, 1_500_000.0);
}

#[test]
fn eta_is_none_before_any_sample() {
    let monitor = SpeedMonitor::new();
    assert_eq!(monitor.eta_seconds(1_000_000), None);
}

#[test]
fn eta_divides_remaining_by_smoothed_speed() {
    let mut monitor = SpeedMonitor::new();
    monitor.sample(1_000_000.0);
    assert_eq!(monitor.eta_seconds(5_000_000), Some(5));
}

#[test]
fn eta_is_none_when_speed_has_stalled_to_zero() {
    let mut monitor = SpeedMonitor::with_alpha(1.0);
    monitor.sample(0.0);
    assert_eq!(monitor.eta_seconds(1_000), None);
}
