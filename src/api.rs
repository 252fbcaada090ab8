use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const LOGIN_PATH: &str = "/admin/login";
pub const BOOKINGS_PATH: &str = "/admin/bookings";

/// Operator credentials, used once per login attempt
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Scheduled date/time pair of a booking, owned by the booking system
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Slot {
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Booking {
    #[allow(dead_code)]
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "slotId", alias = "slot")]
    pub slot: Slot,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Failure modes of a single API request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Non-2xx response; message is taken from the body when present
    Status { code: u16, message: Option<String> },
    Transport(String),
    Decode(String),
}

impl ApiError {
    /// Server-supplied message, if the failure carried one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status {
                message: Some(m), ..
            } if !m.is_empty() => Some(m),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status {
                code,
                message: Some(m),
            } => write!(f, "API error {}: {}", code, m),
            Self::Status {
                code,
                message: None,
            } => write!(f, "API error {}", code),
            Self::Transport(e) => write!(f, "Request failed: {}", e),
            Self::Decode(e) => write!(f, "Malformed response: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

/// Trait for booking API clients to allow mocking and abstraction
pub trait BookingApi {
    fn login(&self, credentials: &Credentials) -> Result<String, ApiError>;
    fn list_bookings(&self, token: Option<&str>) -> Result<Vec<Booking>, ApiError>;
}

pub struct Client {
    base_url: String,
    agent: ureq::Agent,
    timeout: Duration,
}

impl Client {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl BookingApi for Client {
    fn login(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let body = serde_json::to_value(credentials).map_err(|e| ApiError::Decode(e.to_string()))?;
        let resp = self
            .agent
            .post(&self.url(LOGIN_PATH))
            .timeout(self.timeout)
            .set("Content-Type", "application/json")
            .send_json(body);

        let body: LoginResponse = decode(resp)?;
        Ok(body.token)
    }

    fn list_bookings(&self, token: Option<&str>) -> Result<Vec<Booking>, ApiError> {
        let mut req = self.agent.get(&self.url(BOOKINGS_PATH)).timeout(self.timeout);
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            req = req.set("Authorization", &bearer(token));
        }
        decode(req.call())
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

fn decode<T: serde::de::DeserializeOwned>(
    resp: Result<ureq::Response, ureq::Error>,
) -> Result<T, ApiError> {
    match resp {
        Ok(r) => {
            let body = r
                .into_string()
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            parse_body(&body)
        }
        Err(ureq::Error::Status(code, resp)) => {
            let body = resp.into_string().unwrap_or_default();
            Err(ApiError::Status {
                code,
                message: error_message(&body),
            })
        }
        Err(e) => Err(ApiError::Transport(e.to_string())),
    }
}

pub fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Pull a human-readable message out of an error body: `error`, then `message`
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .filter_map(|field| value.get(*field).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map(str::to_string)
}
