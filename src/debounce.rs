//! Cancel-on-supersede debouncing for search input.
//!
//! Everything takes an explicit `now` so the timing rules can be driven
//! deterministically; `push` uses the wall clock.

use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deadline {
  At(Instant),
  /// `now + delay` doesn't fit in an `Instant`
  Never,
}

/// A single-shot timer that can be cancelled or rescheduled
#[derive(Debug, Clone, Default)]
pub struct CancellableTimer {
  deadline: Option<Deadline>,
}

impl CancellableTimer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Arm the timer to fire `delay` after `now`, replacing any pending deadline.
  /// A delay too large to represent leaves the timer armed but never due.
  pub fn schedule(&mut self, now: Instant, delay: Duration) {
    let deadline = now.checked_add(delay).map_or(Deadline::Never, Deadline::At);
    self.deadline = Some(deadline);
  }

  /// Disarm the timer. Returns whether it was pending.
  pub fn cancel(&mut self) -> bool {
    self.deadline.take().is_some()
  }

  /// Cancel and arm again in one step
  pub fn reschedule(&mut self, now: Instant, delay: Duration) -> bool {
    let was_pending = self.cancel();
    self.schedule(now, delay);
    was_pending
  }

  pub fn is_pending(&self) -> bool {
    self.deadline.is_some()
  }

  /// Whether the deadline has been reached
  pub fn is_due(&self, now: Instant) -> bool {
    matches!(self.deadline, Some(Deadline::At(d)) if now >= d)
  }

  /// Disarm and return `true` if the timer was due
  pub fn fire(&mut self, now: Instant) -> bool {
    if self.is_due(now) {
      self.deadline = None;
      true
    } else {
      false
    }
  }
}

/// Commits only the value that survives a quiet window with no newer input
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
  window: Duration,
  timer: CancellableTimer,
  pending: Option<T>,
}

impl<T> Debouncer<T> {
  pub fn new(window: Duration) -> Self {
    Self {
      window,
      timer: CancellableTimer::new(),
      pending: None,
    }
  }

  /// Whether a value is waiting out its window
  pub fn is_pending(&self) -> bool {
    self.timer.is_pending()
  }

  /// Record new input. Any pending commit is cancelled and the window restarts.
  pub fn push_at(&mut self, value: T, now: Instant) {
    if self.timer.reschedule(now, self.window) {
      tracing::trace!("debounce superseded");
    }
    self.pending = Some(value);
  }

  /// Return the pending value once its window has elapsed
  pub fn poll_at(&mut self, now: Instant) -> Option<T> {
    if self.timer.fire(now) {
      self.pending.take()
    } else {
      None
    }
  }

  /// Commit the pending value now, skipping the rest of the window
  pub fn flush(&mut self) -> Option<T> {
    self.timer.cancel();
    self.pending.take()
  }

  /// Drop the pending value without committing it
  pub fn cancel(&mut self) -> Option<T> {
    self.timer.cancel();
    self.pending.take()
  }

  pub fn push(&mut self, value: T) {
    self.push_at(value, Instant::now());
  }
}

impl<T> Default for Debouncer<T> {
  fn default() -> Self {
    Self::new(DEFAULT_DEBOUNCE)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
  }

  #[test]
  fn test_rapid_input_commits_last_value_once() {
    let t0 = Instant::now();
    let mut d = Debouncer::new(ms(300));

    d.push_at("a", t0);
    d.push_at("ab", t0 + ms(100));
    d.push_at("abc", t0 + ms(150));

    assert_eq!(d.poll_at(t0 + ms(250)), None);
    assert_eq!(d.poll_at(t0 + ms(300)), None);
    assert_eq!(d.poll_at(t0 + ms(449)), None);
    assert_eq!(d.poll_at(t0 + ms(450)), Some("abc"));
    assert_eq!(d.poll_at(t0 + ms(500)), None);
    assert_eq!(d.poll_at(t0 + ms(1000)), None);
  }

  #[test]
  fn test_intermediate_values_never_commit() {
    let t0 = Instant::now();
    let mut d = Debouncer::new(ms(300));
    let mut committed = Vec::new();

    for (i, v) in ["a", "ab", "abc"].into_iter().enumerate() {
      let now = t0 + ms(i as u64 * 100);
      if let Some(c) = d.poll_at(now) {
        committed.push(c);
      }
      d.push_at(v, now);
    }
    for step in 0..=10 {
      if let Some(c) = d.poll_at(t0 + ms(200 + step * 50)) {
        committed.push(c);
      }
    }
    assert_eq!(committed, vec!["abc"]);
  }

  #[test]
  fn test_separate_bursts_commit_separately() {
    let t0 = Instant::now();
    let mut d = Debouncer::new(ms(300));

    d.push_at("a", t0);
    assert_eq!(d.poll_at(t0 + ms(300)), Some("a"));
    d.push_at("b", t0 + ms(400));
    assert_eq!(d.poll_at(t0 + ms(650)), None);
    assert_eq!(d.poll_at(t0 + ms(700)), Some("b"));
  }

  #[test]
  fn test_flush_and_cancel() {
    let t0 = Instant::now();
    let mut d = Debouncer::new(ms(300));

    d.push_at("x", t0);
    assert_eq!(d.flush(), Some("x"));
    assert_eq!(d.poll_at(t0 + ms(300)), None);

    d.push_at("y", t0);
    assert_eq!(d.cancel(), Some("y"));
    assert!(!d.is_pending());
    assert_eq!(d.poll_at(t0 + ms(300)), None);
  }

  #[test]
  fn test_timer_reschedule_reports_supersede() {
    let t0 = Instant::now();
    let mut timer = CancellableTimer::new();

    assert!(!timer.reschedule(t0, ms(10)));
    assert!(timer.reschedule(t0 + ms(5), ms(10)));
    assert!(!timer.is_due(t0 + ms(14)));
    assert!(timer.fire(t0 + ms(15)));
    assert!(!timer.is_pending());
    assert!(!timer.cancel());
  }

  #[test]
  fn test_huge_window_is_never_due() {
    let t0 = Instant::now();
    let mut d = Debouncer::new(Duration::from_millis(u64::MAX));

    d.push_at("a", t0);
    assert!(d.is_pending());
    assert_eq!(d.poll_at(t0 + Duration::from_secs(3600)), None);
    assert_eq!(d.flush(), Some("a"));
  }
}
