//! Discount validity windows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// When a discount applies. An open `ends_at` means "until replaced".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountWindow {
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl DiscountWindow {
    /// A discount is active until its end date passes.
    ///
    /// The start date only orders competing discounts; it does not gate them.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.is_none_or(|end| end > now)
    }
}

/// Pick the active discount with the latest start date.
///
/// Ties keep the earliest entry in `items`.
pub fn select_current<T>(
    items: &[T],
    now: DateTime<Utc>,
    window: impl Fn(&T) -> DiscountWindow,
) -> Option<&T> {
    items
        .iter()
        .filter(|item| window(*item).is_active(now))
        .fold(None, |best: Option<&T>, item| match best {
            Some(current) if window(current).starts_at >= window(item).starts_at => Some(current),
            _ => Some(item),
        })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn window(start_days_ago: i64, ends_in_days: Option<i64>, now: DateTime<Utc>) -> DiscountWindow {
        DiscountWindow {
            starts_at: now - Duration::days(start_days_ago),
            ends_at: ends_in_days.map(|d| now + Duration::days(d)),
        }
    }

    #[test]
    fn test_expired_discount_is_inactive() {
        let now = Utc::now();
        assert!(!window(10, Some(-1), now).is_active(now));
        assert!(!window(10, Some(0), now).is_active(now));
        assert!(window(10, Some(1), now).is_active(now));
        assert!(window(10, None, now).is_active(now));
    }

    #[test]
    fn test_select_current_prefers_latest_start() {
        let now = Utc::now();
        let items = [
            ("old", window(30, None, now)),
            ("ended", window(1, Some(-1), now)),
            ("recent", window(2, Some(5), now)),
        ];
        let current = select_current(&items, now, |(_, w)| *w);
        assert_eq!(current.map(|(name, _)| *name), Some("recent"));
    }

    #[test]
    fn test_select_current_none_when_all_ended() {
        let now = Utc::now();
        let items = [window(3, Some(-2), now)];
        assert!(select_current(&items, now, |w| *w).is_none());
    }
}
