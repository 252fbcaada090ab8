//! Admin session: the bearer token and the state of the login operation.
//!
//! The token lives in memory and in durable storage under [`TOKEN_KEY`]. No other
//! module writes that entry.

use crate::api::{BookingApi, Credentials};
use crate::storage::{Storage, TOKEN_KEY};

pub const LOGIN_FAILED: &str = "Login failed";

/// A rejected or failed login, carrying the message shown on the login form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError {
    pub message: String,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AuthError {}

pub struct Session {
    token: String,
    loading: bool,
    error: String,
    storage: Box<dyn Storage>,
}

impl Session {
    /// Restore the session from durable storage. An unreadable store starts unauthenticated.
    pub fn open(storage: Box<dyn Storage>) -> Self {
        let token = match storage.get(TOKEN_KEY) {
            Ok(token) => token.unwrap_or_default(),
            Err(e) => {
                eprintln!("Warning: failed to read stored session: {}", e);
                String::new()
            }
        };

        Self {
            token,
            loading: false,
            error: String::new(),
            storage,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    /// True while a login request is in flight
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Last login error, empty when none
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Authenticate against the API and persist the returned token
    pub fn login(
        &mut self,
        api: &dyn BookingApi,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        if !self.begin_login() {
            return Err(AuthError {
                message: "Login already in progress".to_string(),
            });
        }
        let credentials = Credentials::new(email, password);
        let result = api.login(&credentials).map_err(|e| AuthError {
            message: e.server_message().unwrap_or(LOGIN_FAILED).to_string(),
        });
        self.finish_login(result)
    }

    /// Mark a login as in flight and clear the previous error.
    /// Returns false if another login is already running.
    pub fn begin_login(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        self.error.clear();
        true
    }

    pub fn finish_login(&mut self, result: Result<String, AuthError>) -> Result<(), AuthError> {
        self.loading = false;
        let result = result.and_then(|token| {
            if token.trim().is_empty() {
                Err(AuthError {
                    message: LOGIN_FAILED.to_string(),
                })
            } else {
                Ok(token)
            }
        });
        match result {
            Ok(token) => {
                if let Err(e) = self.storage.set(TOKEN_KEY, &token) {
                    eprintln!("Warning: failed to persist session token: {}", e);
                }
                self.token = token;
                self.error.clear();
                Ok(())
            }
            Err(e) => {
                self.error = e.message.clone();
                Err(e)
            }
        }
    }

    /// Forget the token locally. Never fails and never touches the network.
    pub fn logout(&mut self) {
        if let Err(e) = self.storage.remove(TOKEN_KEY) {
            eprintln!("Warning: failed to remove stored session: {}", e);
        }
        self.token.clear();
        self.error.clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::{ApiError, Booking};
    use crate::storage::{FileStorage, MemoryStorage};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Scripted API double that records what it was asked to do
    pub struct MockApi {
        pub login_result: Result<String, ApiError>,
        pub bookings_result: Result<Vec<Booking>, ApiError>,
        pub login_calls: Rc<Cell<usize>>,
        pub bookings_calls: Rc<Cell<usize>>,
        pub last_email: Rc<RefCell<Option<String>>>,
        pub last_token: Rc<RefCell<Option<String>>>,
    }

    impl MockApi {
        pub fn accepting(token: &str) -> Self {
            Self {
                login_result: Ok(token.to_string()),
                bookings_result: Ok(Vec::new()),
                login_calls: Rc::new(Cell::new(0)),
                bookings_calls: Rc::new(Cell::new(0)),
                last_email: Rc::new(RefCell::new(None)),
                last_token: Rc::new(RefCell::new(None)),
            }
        }

        pub fn rejecting(err: ApiError) -> Self {
            Self {
                login_result: Err(err),
                ..Self::accepting("")
            }
        }

        pub fn with_bookings(mut self, result: Result<Vec<Booking>, ApiError>) -> Self {
            self.bookings_result = result;
            self
        }
    }

    impl BookingApi for MockApi {
        fn login(&self, credentials: &Credentials) -> Result<String, ApiError> {
            self.login_calls.set(self.login_calls.get() + 1);
            *self.last_email.borrow_mut() = Some(credentials.email.clone());
            self.login_result.clone()
        }

        fn list_bookings(&self, token: Option<&str>) -> Result<Vec<Booking>, ApiError> {
            self.bookings_calls.set(self.bookings_calls.get() + 1);
            *self.last_token.borrow_mut() = token.map(str::to_string);
            self.bookings_result.clone()
        }
    }

    /// Storage whose writes always fail
    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Err(anyhow::anyhow!("disk on fire"))
        }
        fn set(&mut self, _key: &str, _value: &str) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("disk on fire"))
        }
        fn remove(&mut self, _key: &str) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("disk on fire"))
        }
    }

    #[test]
    fn test_open_restores_stored_token() {
        let mut storage = MemoryStorage::default();
        storage.set(TOKEN_KEY, "abc").unwrap();

        let session = Session::open(Box::new(storage));
        assert_eq!(session.token(), "abc");
        assert!(session.is_authenticated());
        assert!(!session.is_loading());
        assert_eq!(session.error(), "");
    }

    #[test]
    fn test_open_with_unreadable_storage_is_unauthenticated() {
        let session = Session::open(Box::new(BrokenStorage));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_login_persists_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        let mut session = Session::open(Box::new(FileStorage::new(&path)));
        let api = MockApi::accepting("abc");

        session.login(&api, "a@b.com", "x").unwrap();

        assert_eq!(session.token(), "abc");
        assert!(!session.is_loading());
        assert_eq!(api.last_email.borrow().as_deref(), Some("a@b.com"));
        let stored = FileStorage::new(&path).get(TOKEN_KEY).unwrap();
        assert_eq!(stored, Some("abc".to_string()));
    }

    #[test]
    fn test_login_for_various_tokens() {
        for token in ["t", "abc.def.ghi", "0123456789abcdef"] {
            let mut session = Session::open(Box::new(MemoryStorage::default()));
            session
                .login(&MockApi::accepting(token), "ops@example.com", "pw")
                .unwrap();
            assert_eq!(session.token(), token);
            assert_eq!(session.storage.get(TOKEN_KEY).unwrap(), Some(token.to_string()));
        }
    }

    #[test]
    fn test_login_rejected_uses_server_message() {
        let mut session = Session::open(Box::new(MemoryStorage::default()));
        let api = MockApi::rejecting(ApiError::Status {
            code: 401,
            message: Some("bad credentials".to_string()),
        });

        let err = session.login(&api, "a@b.com", "x").unwrap_err();

        assert_eq!(err.message, "bad credentials");
        assert_eq!(session.error(), "bad credentials");
        assert!(!session.is_authenticated());
        assert!(!session.is_loading());
        assert_eq!(session.storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_login_failure_without_message_is_generic() {
        for err in [
            ApiError::Transport("connection refused".to_string()),
            ApiError::Decode("expected value".to_string()),
            ApiError::Status {
                code: 500,
                message: None,
            },
        ] {
            let mut session = Session::open(Box::new(MemoryStorage::default()));
            let err = session
                .login(&MockApi::rejecting(err), "a@b.com", "x")
                .unwrap_err();
            assert_eq!(err.message, LOGIN_FAILED);
            assert_eq!(session.error(), LOGIN_FAILED);
        }
    }

    #[test]
    fn test_empty_token_in_success_response_is_failure() {
        for token in ["", "   "] {
            let mut session = Session::open(Box::new(MemoryStorage::default()));
            let err = session
                .login(&MockApi::accepting(token), "a@b.com", "x")
                .unwrap_err();
            assert_eq!(err.message, LOGIN_FAILED);
            assert_eq!(session.error(), LOGIN_FAILED);
            assert!(!session.is_authenticated());
            assert!(!session.is_loading());
            assert_eq!(session.storage.get(TOKEN_KEY).unwrap(), None);
        }
    }

    #[test]
    fn test_next_attempt_clears_previous_error() {
        let mut session = Session::open(Box::new(MemoryStorage::default()));
        let _ = session.login(
            &MockApi::rejecting(ApiError::Transport("down".into())),
            "a@b.com",
            "x",
        );
        assert_eq!(session.error(), LOGIN_FAILED);

        assert!(session.begin_login());
        assert!(session.is_loading());
        assert_eq!(session.error(), "");
    }

    #[test]
    fn test_second_login_refused_while_in_flight() {
        let mut session = Session::open(Box::new(MemoryStorage::default()));
        assert!(session.begin_login());

        let api = MockApi::accepting("abc");
        let err = session.login(&api, "a@b.com", "x").unwrap_err();

        assert!(err.message.contains("in progress"));
        assert_eq!(api.login_calls.get(), 0);
    }

    #[test]
    fn test_logout_clears_token_and_storage() {
        let mut storage = MemoryStorage::default();
        storage.set(TOKEN_KEY, "abc").unwrap();
        let mut session = Session::open(Box::new(storage));

        session.logout();

        assert_eq!(session.token(), "");
        assert_eq!(session.storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_logout_when_already_logged_out() {
        let mut session = Session::open(Box::new(MemoryStorage::default()));
        session.logout();
        assert!(!session.is_authenticated());
        assert_eq!(session.storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_logout_survives_storage_failure() {
        let mut session = Session::open(Box::new(BrokenStorage));
        session.finish_login(Ok("abc".to_string())).unwrap();
        assert_eq!(session.token(), "abc");

        session.logout();
        assert!(!session.is_authenticated());
    }
}
