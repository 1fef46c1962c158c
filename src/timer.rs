//! Latency timer: starts on the first trigger line, can be paused once,
//! and goes back to idle only through [`LatencyTimer::reset`].

use std::time::{Duration, Instant};

/// Any line containing this character starts the timer.
pub const TRIGGER: char = '-';

pub const IDLE_READING: &str = "0:000:000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Timing {
        start: Instant,
    },
    Paused {
        start: Instant,
        elapsed: Duration,
    },
}

#[derive(Debug, Default)]
pub struct LatencyTimer {
    phase: Phase,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_timing(&self) -> bool {
        matches!(self.phase, Phase::Timing { .. })
    }

    /// True once the timer has left `Idle`. The read loop stops consuming
    /// input from that point on.
    pub fn is_latched(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    pub fn start_instant(&self) -> Option<Instant> {
        match self.phase {
            Phase::Idle => None,
            Phase::Timing { start } | Phase::Paused { start, .. } => Some(start),
        }
    }

    /// Checks `line` against the trigger rule and starts timing at `now` if
    /// it fires. Returns whether this call caused the transition.
    pub fn observe(&mut self, line: &str, now: Instant) -> bool {
        if self.is_latched() || !line.contains(TRIGGER) {
            return false;
        }
        self.phase = Phase::Timing { start: now };
        true
    }

    /// Freezes the elapsed time. Only has an effect while timing.
    pub fn pause(&mut self, now: Instant) -> Option<Duration> {
        match self.phase {
            Phase::Timing { start } => {
                let elapsed = now.saturating_duration_since(start);
                self.phase = Phase::Paused { start, elapsed };
                Some(elapsed)
            }
            _ => None,
        }
    }

    /// Live while timing, frozen once paused, `None` while idle.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        match self.phase {
            Phase::Idle => None,
            Phase::Timing { start } => Some(now.saturating_duration_since(start)),
            Phase::Paused { elapsed, .. } => Some(elapsed),
        }
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
    }
}

/// Formats as `seconds:milliseconds:microseconds`, truncating at each step.
pub fn format_elapsed(elapsed: Duration) -> String {
    let micros = elapsed.subsec_micros();
    format!(
        "{}:{:03}:{:03}",
        elapsed.as_secs(),
        micros / 1_000,
        micros % 1_000
    )
}

pub fn status_line(reading: &str) -> String {
    format!("Latency (s:ms:μs): {}", reading)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_truncates_each_component() {
        assert_eq!(format_elapsed(Duration::from_micros(1_234_567)), "1:234:567");
        assert_eq!(format_elapsed(Duration::from_micros(900)), "0:000:900");
        // sub-microsecond remainder is dropped, not rounded
        assert_eq!(format_elapsed(Duration::from_nanos(1_999_999_999)), "1:999:999");
        assert_eq!(format_elapsed(Duration::ZERO), IDLE_READING);
        assert_eq!(format_elapsed(Duration::from_secs(75)), "75:000:000");
    }

    #[test]
    fn format_pads_to_three_digits() {
        assert_eq!(format_elapsed(Duration::from_micros(2_005_007)), "2:005:007");
        assert_eq!(format_elapsed(Duration::from_micros(10_040)), "0:010:040");
    }

    #[test]
    fn triggers_once_on_first_dash_line() {
        let mut timer = LatencyTimer::new();
        let t0 = Instant::now();

        let fired: Vec<bool> = ["abc", "d-ef", "x-y"]
            .iter()
            .enumerate()
            .map(|(i, line)| timer.observe(line, t0 + Duration::from_millis(i as u64)))
            .collect();

        assert_eq!(fired, vec![false, true, false]);
        assert_eq!(timer.start_instant(), Some(t0 + Duration::from_millis(1)));
    }

    #[test]
    fn idle_has_no_start_or_elapsed() {
        let timer = LatencyTimer::new();
        assert_eq!(timer.phase(), Phase::Idle);
        assert_eq!(timer.start_instant(), None);
        assert_eq!(timer.elapsed(Instant::now()), None);
        assert!(!timer.is_latched());
    }

    #[test]
    fn elapsed_is_live_while_timing() {
        let mut timer = LatencyTimer::new();
        let t0 = Instant::now();
        timer.observe("-", t0);

        assert_eq!(
            timer.elapsed(t0 + Duration::from_millis(5)),
            Some(Duration::from_millis(5))
        );
        assert_eq!(
            timer.elapsed(t0 + Duration::from_millis(9)),
            Some(Duration::from_millis(9))
        );
    }

    #[test]
    fn pause_freezes_elapsed() {
        let mut timer = LatencyTimer::new();
        let t0 = Instant::now();
        timer.observe("a-b", t0);

        let frozen = timer.pause(t0 + Duration::from_micros(1_500));
        assert_eq!(frozen, Some(Duration::from_micros(1_500)));
        assert!(!timer.is_timing());
        assert!(timer.is_latched());

        let later = t0 + Duration::from_secs(3);
        assert_eq!(timer.elapsed(later), frozen);
        assert_eq!(timer.elapsed(later + Duration::from_secs(1)), frozen);
    }

    #[test]
    fn pause_is_terminal_until_reset() {
        let mut timer = LatencyTimer::new();
        let t0 = Instant::now();
        assert_eq!(timer.pause(t0), None);

        timer.observe("-", t0);
        timer.pause(t0 + Duration::from_millis(2));
        assert_eq!(timer.pause(t0 + Duration::from_millis(8)), None);
        assert!(!timer.observe("again-", t0 + Duration::from_millis(9)));
        assert_eq!(timer.elapsed(t0), Some(Duration::from_millis(2)));
    }

    #[test]
    fn reset_restarts_from_zero() {
        let mut timer = LatencyTimer::new();
        let t0 = Instant::now();
        timer.observe("-", t0);
        timer.pause(t0 + Duration::from_secs(2));

        timer.reset();
        assert_eq!(timer.phase(), Phase::Idle);
        assert_eq!(timer.start_instant(), None);

        let t1 = t0 + Duration::from_secs(10);
        assert!(timer.observe("x-", t1));
        assert_eq!(timer.elapsed(t1), Some(Duration::ZERO));
    }

    #[test]
    fn status_line_wraps_reading() {
        assert_eq!(status_line(IDLE_READING), "Latency (s:ms:μs): 0:000:000");
    }
}
