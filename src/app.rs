//! Top-level controller: routes between the login form and the dashboard
//! based on the session token, and drives the bookings fetch.

use crate::api::{Booking, BookingApi};
use crate::session::Session;
use crate::transcript::Transcript;
use crate::views::{self, LoginForm};
use chrono::{DateTime, Local, Utc};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Dashboard,
}

/// State of the bookings request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FetchState {
    /// No request issued yet (no token, or signed out)
    #[default]
    Idle,
    Loading,
    Loaded(Vec<Booking>),
    Failed(String),
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Bookings currently on hand; empty unless loaded
    pub fn bookings(&self) -> &[Booking] {
        match self {
            Self::Loaded(bookings) => bookings,
            _ => &[],
        }
    }
}

pub struct App {
    session: Session,
    api: Box<dyn BookingApi>,
    form: LoginForm,
    bookings: FetchState,
    transcript: Option<Transcript>,
}

impl App {
    pub fn new(session: Session, api: Box<dyn BookingApi>) -> Self {
        Self {
            session,
            api,
            form: LoginForm::default(),
            bookings: FetchState::Idle,
            transcript: None,
        }
    }

    pub fn with_transcript(mut self, mut transcript: Transcript) -> Self {
        let _ = transcript.session_start(self.session.is_authenticated());
        self.transcript = Some(transcript);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn bookings(&self) -> &FetchState {
        &self.bookings
    }

    pub fn form(&self) -> &LoginForm {
        &self.form
    }

    pub fn transcript_path(&self) -> Option<&std::path::Path> {
        self.transcript.as_ref().map(|t| t.path.as_path())
    }

    pub fn screen(&self) -> Screen {
        if self.session.is_authenticated() {
            Screen::Dashboard
        } else {
            Screen::Login
        }
    }

    /// Bring the current screen up. With a token, this loads the dashboard data.
    pub fn activate(&mut self) {
        if self.screen() == Screen::Dashboard {
            self.fetch_bookings();
        }
    }

    /// Submit the login form. Returns false when submission is disabled and no
    /// request was made.
    pub fn submit_login(&mut self, email: &str, password: &str) -> bool {
        self.form = LoginForm::new(email, password);
        if !self.form.can_submit(self.session.is_loading()) {
            return false;
        }

        let result = self.session.login(self.api.as_ref(), email, password);
        // the password is not kept once the attempt is over
        self.form.password.clear();

        match result {
            Ok(()) => {
                if let Some(t) = self.transcript.as_mut() {
                    let _ = t.login_ok(email);
                }
                self.form = LoginForm::default();
                // a fresh token always means a fresh list, even over an older session
                self.fetch_bookings();
            }
            Err(e) => {
                if let Some(t) = self.transcript.as_mut() {
                    let _ = t.login_err(email, &e.message);
                }
            }
        }
        true
    }

    /// Load bookings for the current token. Without a token no request is made.
    pub fn fetch_bookings(&mut self) {
        if !self.session.is_authenticated() {
            self.bookings = FetchState::Idle;
            return;
        }
        if self.bookings.is_loading() {
            return;
        }

        self.bookings = FetchState::Loading;
        let start = Instant::now();
        let result = self.api.list_bookings(Some(self.session.token()));
        let duration_ms = start.elapsed().as_millis() as u64;

        self.bookings = match result {
            Ok(bookings) => {
                if let Some(t) = self.transcript.as_mut() {
                    let _ = t.bookings_ok(bookings.len(), duration_ms);
                }
                FetchState::Loaded(bookings)
            }
            Err(e) => {
                if let Some(t) = self.transcript.as_mut() {
                    let _ = t.bookings_err(&e.to_string(), duration_ms);
                }
                FetchState::Failed(e.to_string())
            }
        };
    }

    /// Sign out. No confirmation, no network call.
    pub fn logout(&mut self) {
        self.session.logout();
        self.bookings = FetchState::Idle;
        self.form = LoginForm::default();
        if let Some(t) = self.transcript.as_mut() {
            let _ = t.logout();
        }
    }

    /// Render the current screen in the operator's local time zone
    pub fn render(&self) -> String {
        self.render_at(Utc::now(), &Local)
    }

    pub fn render_at<Tz>(&self, now: DateTime<Utc>, tz: &Tz) -> String
    where
        Tz: chrono::TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        match self.screen() {
            Screen::Login => {
                views::render_login(&self.form, self.session.is_loading(), self.session.error())
            }
            Screen::Dashboard => views::render_dashboard(&self.bookings, now, tz),
        }
    }
}
