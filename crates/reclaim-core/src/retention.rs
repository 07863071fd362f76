//! Age cutoff derived from the keep window.

use std::time::SystemTime;

use chrono::{DateTime, Duration, Utc};
use reclaim_schema::{RetentionLevel, effective_keep_days};

/// Level plus user override, as read from the preference store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetentionPolicy {
    pub level: RetentionLevel,
    pub custom_keep_days: u32,
}

impl RetentionPolicy {
    pub fn new(level: RetentionLevel, custom_keep_days: u32) -> Self {
        Self {
            level,
            custom_keep_days,
        }
    }

    pub fn effective_keep_days(&self) -> u32 {
        effective_keep_days(self.level, self.custom_keep_days)
    }

    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        cutoff(self.effective_keep_days(), now)
    }
}

/// `now - keep_days`, or `None` when the window is zero (no age filter).
pub fn cutoff(keep_days: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if keep_days == 0 {
        return None;
    }
    Some(now - Duration::days(i64::from(keep_days)))
}

/// Items modified strictly after the cutoff are protected.
///
/// An unknown modification time is never "after" anything, so it stays eligible.
pub fn is_eligible(modified: Option<SystemTime>, cutoff: Option<DateTime<Utc>>) -> bool {
    match (cutoff, modified) {
        (Some(cutoff), Some(modified)) => DateTime::<Utc>::from(modified) <= cutoff,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn zero_window_has_no_cutoff() {
        assert_eq!(cutoff(0, now()), None);
        assert_eq!(RetentionPolicy::new(RetentionLevel::Advanced, 0).cutoff(now()), None);
    }

    #[test]
    fn cutoff_subtracts_days() {
        let c = RetentionPolicy::new(RetentionLevel::Safe, 0).cutoff(now()).unwrap();
        assert_eq!(c, now() - Duration::days(7));
    }

    #[test]
    fn boundary_is_eligible_and_after_is_not() {
        let c = cutoff(3, now()).unwrap();
        let at: SystemTime = c.into();
        let after: SystemTime = (c + Duration::seconds(1)).into();
        let before: SystemTime = (c - Duration::seconds(1)).into();

        assert!(is_eligible(Some(at), Some(c)));
        assert!(is_eligible(Some(before), Some(c)));
        assert!(!is_eligible(Some(after), Some(c)));
    }

    #[test]
    fn no_cutoff_makes_everything_eligible() {
        assert!(is_eligible(Some(SystemTime::now()), None));
        assert!(is_eligible(None, cutoff(7, now())));
    }
}
