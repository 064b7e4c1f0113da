use husqvarna_client::{ClientConfig, Credentials, HusqvarnaClient};

use crate::action::{CuttingHeight, MowerAction};
use crate::model::{MowerDocument, MowerListDocument};
use crate::mower::Mower;
use crate::{ApiError, Result};

/// Operations the poller needs from the Automower Connect API
///
/// Implemented by [`AutomowerClient`] for the real cloud and by test doubles
/// in the poller and plugin crates.
pub trait MowerApi: Send {
    /// Acquire (or renew) the access token
    fn authenticate(&mut self) -> Result<()>;

    /// All mowers linked to the account
    fn list_mowers(&mut self) -> Result<Vec<Mower>>;

    /// Current status of one mower
    fn mower_status(&mut self, mower_id: &str) -> Result<Mower>;

    fn send_action(&mut self, mower_id: &str, action: MowerAction) -> Result<()>;

    fn set_cutting_height(&mut self, mower_id: &str, height: CuttingHeight) -> Result<()>;

    /// Number of API requests issued since the previous call, retries included
    fn take_request_count(&mut self) -> u32;
}

/// A client for the Automower Connect API
///
/// Thin typed layer over [`HusqvarnaClient`]: it builds the resource paths,
/// decodes the JSON:API documents into [`Mower`] values and maps transport
/// errors to [`ApiError`].
#[derive(Debug)]
pub struct AutomowerClient {
    http: HusqvarnaClient,
}

impl AutomowerClient {
    /// Create a client for the production endpoints
    pub fn new(credentials: Credentials) -> Self {
        Self {
            http: HusqvarnaClient::new(credentials),
        }
    }

    /// Create a client with custom endpoints or pacing (mainly for tests)
    pub fn with_config(credentials: Credentials, config: ClientConfig) -> Self {
        Self {
            http: HusqvarnaClient::with_config(credentials, config),
        }
    }

    pub fn with_http_client(http: HusqvarnaClient) -> Self {
        Self { http }
    }
}

impl MowerApi for AutomowerClient {
    fn authenticate(&mut self) -> Result<()> {
        self.http.authenticate()?;
        Ok(())
    }

    fn list_mowers(&mut self) -> Result<Vec<Mower>> {
        let document: MowerListDocument = self.http.get("mowers")?;
        let mowers: Vec<Mower> = document.data.into_iter().map(Mower::from).collect();

        tracing::debug!("Account has {} mower(s)", mowers.len());
        Ok(mowers)
    }

    fn mower_status(&mut self, mower_id: &str) -> Result<Mower> {
        let document: MowerDocument = self
            .http
            .get(&format!("mowers/{}", mower_id))
            .map_err(|e| match ApiError::from(e) {
                ApiError::HttpError { status: 404, .. } => ApiError::MowerNotFound(mower_id.to_string()),
                other => other,
            })?;

        let mower = Mower::from(document.data);
        tracing::trace!(
            "Status of {}: {} / {} ({}%)",
            mower.name,
            mower.state,
            mower.activity,
            mower.battery_percent
        );
        Ok(mower)
    }

    fn send_action(&mut self, mower_id: &str, action: MowerAction) -> Result<()> {
        tracing::debug!("Sending {} to mower {}", action, mower_id);
        self.http
            .post(&format!("mowers/{}/actions", mower_id), &action.document())?;
        Ok(())
    }

    fn set_cutting_height(&mut self, mower_id: &str, height: CuttingHeight) -> Result<()> {
        tracing::debug!("Setting cutting height {} on mower {}", height.value(), mower_id);
        self.http
            .post(&format!("mowers/{}/settings", mower_id), &height.document())?;
        Ok(())
    }

    fn take_request_count(&mut self) -> u32 {
        self.http.take_request_count()
    }
}
