//! Private HTTP client for the Husqvarna Automower Connect cloud API
//!
//! This crate provides a minimal blocking client designed around the
//! constraints of the Husqvarna developer API: a client-credentials token,
//! JSON:API payloads and a hard ceiling of one call per second. It knows
//! nothing about mowers; typed operations live in `automower-api`.

mod error;

pub use error::ClientError;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Token endpoint of the Husqvarna authentication API
pub const TOKEN_URL: &str = "https://api.authentication.husqvarnagroup.dev/v1/oauth2/token";

/// Base URL of the Automower Connect API
pub const API_BASE_URL: &str = "https://api.amc.husqvarna.dev/v1";

const JSON_API: &str = "application/vnd.api+json";

const MAX_TOKEN_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Application credentials issued by the Husqvarna developer portal
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Connection settings for [`HusqvarnaClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Token endpoint
    /// Default: [`TOKEN_URL`]
    pub token_url: String,

    /// Mower API base URL, without trailing slash
    /// Default: [`API_BASE_URL`]
    pub api_base_url: String,

    /// Default: 5 seconds
    pub connect_timeout: Duration,

    /// Default: 10 seconds
    pub read_timeout: Duration,

    /// Minimum gap between two consecutive requests. The API allows one call
    /// per second.
    /// Default: 2 seconds
    pub call_spacing: Duration,

    /// Attempts for requests failing with a transport error or a 5xx status
    /// Default: 3
    pub max_attempts: u32,

    /// How long before expiry the access token is renewed
    /// Default: 600 seconds
    pub token_renewal_margin: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token_url: TOKEN_URL.to_string(),
            api_base_url: API_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            call_spacing: Duration::from_secs(2),
            max_attempts: 3,
            token_renewal_margin: Duration::from_secs(600),
        }
    }
}

impl ClientConfig {
    pub fn with_endpoints(mut self, token_url: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.api_base_url = api_base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_call_spacing(mut self, spacing: Duration) -> Self {
        self.call_spacing = spacing;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: u64,
    #[serde(default = "default_provider")]
    provider: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn default_provider() -> String {
    "husqvarna".to_string()
}

/// Access token granted by the token endpoint
#[derive(Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub provider: String,
    pub expires_at: Instant,
}

impl AccessToken {
    /// `Authorization` header value
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// True once `now` is within `margin` of the expiry
    pub fn is_expiring(&self, now: Instant, margin: Duration) -> bool {
        now + margin >= self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token_type", &self.token_type)
            .field("provider", &self.provider)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
}

/// A minimal blocking client for the Automower Connect API
///
/// The client is owned by a single polling loop. It serialises every request,
/// keeps at least [`ClientConfig::call_spacing`] between them and counts the
/// requests sent to the mower API so the caller can account for its monthly
/// quota.
pub struct HusqvarnaClient {
    agent: ureq::Agent,
    config: ClientConfig,
    credentials: Credentials,
    token: Option<AccessToken>,
    last_request: Option<Instant>,
    api_requests: u32,
}

impl HusqvarnaClient {
    /// Create a client for the production endpoints
    pub fn new(credentials: Credentials) -> Self {
        Self::with_config(credentials, ClientConfig::default())
    }

    pub fn with_config(credentials: Credentials, config: ClientConfig) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(config.connect_timeout)
                .timeout_read(config.read_timeout)
                .build(),
            config,
            credentials,
            token: None,
            last_request: None,
            api_requests: 0,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Request a new access token with the client-credentials grant
    pub fn authenticate(&mut self) -> Result<&AccessToken> {
        self.wait_for_slot();

        let response = self
            .agent
            .post(&self.config.token_url)
            .send_form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
            ]);

        let body = match response {
            Ok(response) => response
                .into_string()
                .map_err(|e| ClientError::Network(e.to_string()))?,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(ClientError::Auth {
                    status,
                    message: describe_error_body(&body),
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(ClientError::Network(transport.to_string()))
            }
        };

        let granted: TokenResponse =
            serde_json::from_str(&body).map_err(|e| ClientError::Parse(e.to_string()))?;

        tracing::debug!(
            "Access token granted by provider {} (expires in {}s)",
            granted.provider,
            granted.expires_in
        );

        Ok(&*self.token.insert(AccessToken {
            access_token: granted.access_token,
            token_type: granted.token_type,
            provider: granted.provider,
            expires_at: token_expiry(Instant::now(), granted.expires_in),
        }))
    }

    /// Whether a token is held that is not about to expire
    pub fn has_valid_token(&self) -> bool {
        self.token
            .as_ref()
            .map(|t| !t.is_expiring(Instant::now(), self.config.token_renewal_margin))
            .unwrap_or(false)
    }

    /// Drop the current token so the next request authenticates again
    pub fn invalidate_token(&mut self) {
        self.token = None;
    }

    /// GET `path` (relative to the API base URL) and decode the JSON body
    pub fn get<T: DeserializeOwned>(&mut self, path: &str) -> Result<T> {
        let body = self.send(Method::Get, path, None)?;
        serde_json::from_str(&body).map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// POST a JSON:API document to `path`; the response body is ignored
    pub fn post<B: Serialize>(&mut self, path: &str, document: &B) -> Result<()> {
        let payload =
            serde_json::to_string(document).map_err(|e| ClientError::Parse(e.to_string()))?;
        self.send(Method::Post, path, Some(payload)).map(|_| ())
    }

    /// Number of mower API requests issued since the previous call
    ///
    /// Retries count as separate requests. Token requests are not counted.
    pub fn take_request_count(&mut self) -> u32 {
        std::mem::take(&mut self.api_requests)
    }

    fn ensure_token(&mut self) -> Result<()> {
        if !self.has_valid_token() {
            self.authenticate()?;
        }
        Ok(())
    }

    fn send(&mut self, method: Method, path: &str, payload: Option<String>) -> Result<String> {
        let url = format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        let mut attempt = 0;
        let mut reauthenticated = false;

        loop {
            self.ensure_token()?;
            attempt += 1;

            match self.send_once(method, &url, payload.as_deref()) {
                Ok(body) => return Ok(body),
                Err(e) if e.status() == Some(401) && !reauthenticated => {
                    tracing::debug!("Access token rejected for {}, authenticating again", url);
                    self.invalidate_token();
                    reauthenticated = true;
                    attempt -= 1;
                }
                Err(e) if e.is_transient() && attempt < self.config.max_attempts => {
                    tracing::warn!(
                        "Request to {} failed (attempt {}/{}): {}",
                        url,
                        attempt,
                        self.config.max_attempts,
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn send_once(&mut self, method: Method, url: &str, payload: Option<&str>) -> Result<String> {
        self.wait_for_slot();
        self.api_requests += 1;

        let token = self.token.as_ref().ok_or_else(|| ClientError::Auth {
            status: 401,
            message: "no access token".to_string(),
        })?;

        let request = match method {
            Method::Get => self.agent.get(url),
            Method::Post => self.agent.post(url),
        }
        .set("X-Api-Key", &self.credentials.client_id)
        .set("Authorization", &token.authorization())
        .set("Authorization-Provider", &token.provider)
        .set("Accept", JSON_API);

        let result = match payload {
            Some(body) => request.set("Content-Type", JSON_API).send_string(body),
            None => request.call(),
        };

        match result {
            Ok(response) => response
                .into_string()
                .map_err(|e| ClientError::Network(e.to_string())),
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(classify_status(status, &body))
            }
            Err(ureq::Error::Transport(transport)) => Err(ClientError::Network(transport.to_string())),
        }
    }

    fn wait_for_slot(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.config.call_spacing {
                std::thread::sleep(self.config.call_spacing - elapsed);
            }
        }
        self.last_request = Some(Instant::now());
    }
}

impl fmt::Debug for HusqvarnaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HusqvarnaClient")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

/// Expiry instant of a token granted at `now` for `expires_in` seconds
///
/// Lifetimes beyond a year are capped. If even that cannot be represented
/// the token is given one day, or treated as already expiring.
fn token_expiry(now: Instant, expires_in: u64) -> Instant {
    let lifetime = Duration::from_secs(expires_in.min(MAX_TOKEN_LIFETIME_SECS));
    now.checked_add(lifetime)
        .or_else(|| now.checked_add(Duration::from_secs(MAX_TOKEN_LIFETIME_SECS / 365)))
        .unwrap_or(now)
}

fn classify_status(status: u16, body: &str) -> ClientError {
    let message = describe_error_body(body);
    match status {
        429 => ClientError::RateLimited(message),
        _ => ClientError::Http { status, message },
    }
}

/// Extract a readable message from an error response body
///
/// The API answers either with a JSON:API `errors` array or with a plain
/// `{"message": ...}` object.
fn describe_error_body(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return "Uncaptured error returned by Husqvarna API".to_string();
    };

    if let Some(first) = value.get("errors").and_then(|e| e.get(0)) {
        let title = first.get("title").and_then(|t| t.as_str()).unwrap_or("Error");
        return match first.get("detail").and_then(|d| d.as_str()) {
            Some(detail) => format!("{}: {}", title, detail),
            None => title.to_string(),
        };
    }

    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| "Uncaptured error returned by Husqvarna API".to_string())
}
