use alloc::string::String;
use chrono::{DateTime, TimeDelta, Utc};
use core::num::NonZeroU64;

/// Interval (in seconds) assigned to newly registered subscribers.
pub const DEFAULT_INTERVAL_SECS: i64 = 60 * 60;

pub fn default_interval() -> TimeDelta {
    TimeDelta::seconds(DEFAULT_INTERVAL_SECS)
}

/// Per-endpoint delivery schedule and statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscriber {
    /// Chat endpoint that receives the questions.
    pub id: NonZeroU64,
    /// Time between automatic deliveries. Always positive.
    pub interval: TimeDelta,
    /// Automatic delivery fires once the current time reaches this instant.
    pub next_delivery_at: DateTime<Utc>,
    pub last_answered_at: Option<DateTime<Utc>>,
    /// Section tag of the quiz that questions are drawn from.
    pub section: String,
    pub questions_sent: u32,
    pub questions_asked: u32,
    pub questions_correct: u32,
    /// Last observed human-readable name of the endpoint.
    pub display_name: Option<String>,
}

impl Subscriber {
    pub fn new(id: NonZeroU64, section: String, interval: TimeDelta, now: DateTime<Utc>) -> Self {
        Self {
            id,
            interval,
            next_delivery_at: now + interval,
            last_answered_at: None,
            section,
            questions_sent: 0,
            questions_asked: 0,
            questions_correct: 0,
            display_name: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_delivery_at
    }

    /// Moves the deadline to one interval after `now`. The deadline never moves
    /// backwards, so a stale `now` is a no-op. So is a deadline past the end of
    /// representable time.
    pub fn reschedule(&mut self, now: DateTime<Utc>) {
        match now.checked_add_signed(self.interval) {
            Some(next) if next > self.next_delivery_at => self.next_delivery_at = next,
            _ => {}
        }
    }

    /// Changes the interval and restarts the countdown from `now`. Returns
    /// `false` (leaving everything untouched) for non-positive intervals and for
    /// intervals whose deadline cannot be represented.
    pub fn set_interval(&mut self, interval: TimeDelta, now: DateTime<Utc>) -> bool {
        if interval <= TimeDelta::zero() {
            return false;
        }
        let Some(next) = now.checked_add_signed(interval) else {
            return false;
        };
        self.interval = interval;
        self.next_delivery_at = next;
        true
    }

    pub fn record_sent(&mut self, display_name: Option<&str>) {
        self.questions_sent = self.questions_sent.saturating_add(1);
        self.observe_name(display_name);
    }

    /// Counts a graded answer. Callers only grade answers to polls that were
    /// already counted by [`Self::record_sent`].
    pub fn record_answer(&mut self, correct: bool, now: DateTime<Utc>) {
        self.questions_asked = self.questions_asked.saturating_add(1);
        if correct {
            self.questions_correct = self.questions_correct.saturating_add(1);
        }
        self.last_answered_at = Some(now);
    }

    pub fn observe_name(&mut self, display_name: Option<&str>) {
        if let Some(name) = display_name.filter(|name| !name.is_empty()) {
            if self.display_name.as_deref() != Some(name) {
                self.display_name = Some(String::from(name));
            }
        }
    }

    /// Percentage of correct answers, rounded down. `None` until something has
    /// been answered.
    pub fn accuracy(&self) -> Option<u32> {
        let asked = u64::from(self.questions_asked);
        if asked == 0 {
            return None;
        }
        let percent = u64::from(self.questions_correct) * 100 / asked;
        u32::try_from(percent).ok()
    }
}
