//! Summary statistics for the bookings dashboard.
//!
//! Recomputed from the current booking list on every render; nothing here is cached.

use crate::api::Booking;
use chrono::{DateTime, Duration, Utc};

/// Trailing window used for the "This Week" figure
pub const WEEK_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookingStats {
    pub total: usize,
    pub today: usize,
    pub this_week: usize,
}

impl BookingStats {
    pub fn compute(bookings: &[Booking], now: DateTime<Utc>) -> Self {
        Self {
            total: bookings.len(),
            today: count_today(bookings, now),
            this_week: count_created_within(bookings, now, Duration::days(WEEK_WINDOW_DAYS)),
        }
    }
}

/// Current date as the `YYYY-MM-DD` string slots are keyed by (UTC calendar date)
pub fn today_string(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Bookings whose slot date is today
pub fn count_today(bookings: &[Booking], now: DateTime<Utc>) -> usize {
    let today = today_string(now);
    bookings.iter().filter(|b| b.slot.date == today).count()
}

/// Bookings created within `[now - window, now]`
pub fn count_created_within(bookings: &[Booking], now: DateTime<Utc>, window: Duration) -> usize {
    let start = now - window;
    bookings
        .iter()
        .filter(|b| b.created_at >= start && b.created_at <= now)
        .count()
}
