//! Terminal rendering of the login form and the bookings dashboard.
//!
//! Everything here is a pure function of its inputs: no I/O, no clock reads.

use crate::api::Booking;
use crate::app::FetchState;
use crate::stats::BookingStats;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt::{Display, Write as _};

pub const EMPTY_TITLE: &str = "No bookings yet";
pub const EMPTY_HINT: &str =
    "Bookings will appear here once customers start scheduling appointments.";
pub const LOADING_TEXT: &str = "Loading bookings...";
pub const TABLE_HEADERS: [&str; 5] = ["Customer", "Email", "Date", "Time", "Booked At"];

/// Field values of the login form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Enabled,
    Disabled,
    Pending,
}

impl LoginForm {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    pub fn submit_state(&self, in_flight: bool) -> SubmitState {
        if in_flight {
            SubmitState::Pending
        } else if self.email.is_empty() || self.password.is_empty() {
            SubmitState::Disabled
        } else {
            SubmitState::Enabled
        }
    }

    pub fn can_submit(&self, in_flight: bool) -> bool {
        self.submit_state(in_flight) == SubmitState::Enabled
    }
}

fn underline(title: &str, ch: char) -> String {
    std::iter::repeat(ch).take(title.chars().count()).collect()
}

pub fn render_login(form: &LoginForm, in_flight: bool, error: &str) -> String {
    let mut out = String::new();
    let title = "Admin Login";
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", underline(title, '='));
    let _ = writeln!(out, "Welcome back! Please sign in to your account.");
    let _ = writeln!(out);
    let _ = writeln!(out, "  Email Address: {}", form.email);
    let _ = writeln!(
        out,
        "  Password:      {}",
        "*".repeat(form.password.chars().count())
    );

    if !error.is_empty() {
        let _ = writeln!(out, "  ! {}", error);
    }

    let submit = match form.submit_state(in_flight) {
        SubmitState::Enabled => "[ Sign In ]",
        SubmitState::Disabled => "[ Sign In ] (disabled)",
        SubmitState::Pending => "[ Signing in... ]",
    };
    let _ = writeln!(out, "  {}", submit);
    out
}

/// Creation timestamp in the operator's zone
pub fn format_created_at<Tz>(created_at: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    created_at
        .with_timezone(tz)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub fn render_stats(stats: &BookingStats) -> String {
    format!(
        "  Total Bookings: {}  |  Today's Bookings: {}  |  This Week: {}",
        stats.total, stats.today, stats.this_week
    )
}

pub fn render_table<Tz>(bookings: &[Booking], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let rows: Vec<[String; 5]> = bookings
        .iter()
        .map(|b| {
            [
                b.name.clone(),
                b.email.clone(),
                b.slot.date.clone(),
                b.slot.time.clone(),
                format_created_at(&b.created_at, tz),
            ]
        })
        .collect();

    let mut widths = TABLE_HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    let headers: Vec<String> = TABLE_HEADERS.iter().map(|h| h.to_string()).collect();
    let _ = writeln!(out, "{}", format_row(&headers[..]));
    let rules: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", format_row(&rules[..]));
    for row in &rows {
        let _ = writeln!(out, "{}", format_row(&row[..]));
    }
    out
}

pub fn render_dashboard<Tz>(state: &FetchState, now: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let stats = BookingStats::compute(state.bookings(), now);

    let mut out = String::new();
    let title = "Admin Dashboard";
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", underline(title, '='));
    let _ = writeln!(out, "{}", render_stats(&stats));
    let _ = writeln!(out);
    let section = "All Bookings";
    let _ = writeln!(out, "{}", section);
    let _ = writeln!(out, "{}", underline(section, '-'));

    match state {
        // not requested yet reads as loading, never as empty
        FetchState::Idle | FetchState::Loading => {
            let _ = writeln!(out, "{}", LOADING_TEXT);
        }
        FetchState::Failed(message) => {
            let _ = writeln!(out, "Failed to load bookings: {}", message);
        }
        FetchState::Loaded(bookings) if bookings.is_empty() => {
            let _ = writeln!(out, "{}", EMPTY_TITLE);
            let _ = writeln!(out, "{}", EMPTY_HINT);
        }
        FetchState::Loaded(bookings) => {
            out.push_str(&render_table(bookings, tz));
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Type /logout to sign out.");
    out
}
