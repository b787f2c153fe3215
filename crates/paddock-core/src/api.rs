//! Results API client.
//!
//! Every endpoint is a plain JSON GET without pagination. The client owns one
//! pooled `reqwest::Client` with a per-request timeout; parsing into domain
//! types happens here so callers never see wire records.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::model::classification::ClassificationBody;
use crate::model::dimension::{CategoryRecord, EventRecord, SeasonRecord, SessionRecord};
use crate::model::{Category, CategoryParseError, Event, RiderResult, Season, Session};

pub const DEFAULT_BASE_URL: &str = "https://api.pulselive.motogp.com/motogp/v1/results";

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error from a single results API call
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("invalid response body from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("no classification returned for session {session_id}")]
    EmptyClassification { session_id: String },
    #[error(transparent)]
    Category(#[from] CategoryParseError),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl ApiError {
    fn from_reqwest(url: &str, e: &reqwest::Error) -> Self {
        let url = url.to_string();
        if e.is_timeout() {
            Self::Timeout { url }
        } else if let Some(status) = e.status() {
            Self::Status {
                url,
                status: status.as_u16(),
            }
        } else {
            Self::Network {
                url,
                message: e.to_string(),
            }
        }
    }

    fn decode(url: &str, message: impl ToString) -> Self {
        Self::Decode {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// HTTP status code, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The five read endpoints of the results API.
///
/// List endpoints return items in API order; callers decide ordering and
/// treat empty lists as they see fit.
#[async_trait]
pub trait ResultsApi: Send + Sync {
    async fn seasons(&self) -> Result<Vec<Season>, ApiError>;
    async fn events(&self, season_id: &str) -> Result<Vec<Event>, ApiError>;
    async fn categories(&self, event_id: &str) -> Result<Vec<Category>, ApiError>;
    async fn sessions(&self, event_id: &str, category_id: &str) -> Result<Vec<Session>, ApiError>;
    /// Rider results of one session; an empty or missing classification is an error.
    async fn classification(&self, session_id: &str) -> Result<Vec<RiderResult>, ApiError>;
}

/// Client settings
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Endpoint URL builders
pub mod endpoints {
    pub fn seasons(base: &str) -> String {
        format!("{base}/seasons")
    }

    pub fn events(base: &str, season_id: &str) -> String {
        format!("{base}/events?seasonUuid={season_id}&isFinished=true")
    }

    pub fn categories(base: &str, event_id: &str) -> String {
        format!("{base}/categories?eventUuid={event_id}")
    }

    pub fn sessions(base: &str, event_id: &str, category_id: &str) -> String {
        format!("{base}/sessions?eventUuid={event_id}&categoryUuid={category_id}")
    }

    pub fn classification(base: &str, session_id: &str) -> String {
        format!("{base}/session/{session_id}/classification?test=false")
    }
}

/// [`ResultsApi`] over HTTP
pub struct HttpResultsApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpResultsApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.timeout)
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        log::debug!("GET {url}");
        let body = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ApiError::from_reqwest(url, &e))?
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(url, &e))?;
        serde_json::from_str(&body).map_err(|e| ApiError::decode(url, e))
    }
}

#[async_trait]
impl ResultsApi for HttpResultsApi {
    async fn seasons(&self) -> Result<Vec<Season>, ApiError> {
        let url = endpoints::seasons(&self.base_url);
        let records: Vec<SeasonRecord> = self.get_json(&url).await?;
        Ok(records.into_iter().map(Season::from).collect())
    }

    async fn events(&self, season_id: &str) -> Result<Vec<Event>, ApiError> {
        let url = endpoints::events(&self.base_url, season_id);
        let records: Vec<EventRecord> = self.get_json(&url).await?;
        records
            .into_iter()
            .map(|r| Event::try_from(r).map_err(|e| ApiError::decode(&url, e)))
            .collect()
    }

    async fn categories(&self, event_id: &str) -> Result<Vec<Category>, ApiError> {
        let url = endpoints::categories(&self.base_url, event_id);
        let records: Vec<CategoryRecord> = self.get_json(&url).await?;
        let categories = records
            .into_iter()
            .map(Category::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    async fn sessions(&self, event_id: &str, category_id: &str) -> Result<Vec<Session>, ApiError> {
        let url = endpoints::sessions(&self.base_url, event_id, category_id);
        let records: Vec<SessionRecord> = self.get_json(&url).await?;
        Ok(records.into_iter().map(Session::from).collect())
    }

    async fn classification(&self, session_id: &str) -> Result<Vec<RiderResult>, ApiError> {
        let url = endpoints::classification(&self.base_url, session_id);
        let body: ClassificationBody = self.get_json(&url).await?;
        match body.classification {
            Some(rows) if !rows.is_empty() => Ok(rows.into_iter().map(RiderResult::from).collect()),
            _ => Err(ApiError::EmptyClassification {
                session_id: session_id.to_string(),
            }),
        }
    }
}
