use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::GovernanceError;
use crate::sources::{BackendReader, ProposalDto, ProposalsPage, ResultsDto};

/// REST client for the indexer backend.
///
/// The backend indexes chain state with unknown latency, so a 404 here is a
/// normal transient answer, not a fault. Auth failures are surfaced as-is;
/// the engine does not refresh tokens.
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, auth_token: Option<String>) -> Self {
        HttpBackend {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, GovernanceError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GovernanceError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(%url, "backend has no row yet");
                Ok(None)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GovernanceError::Auth(
                format!("backend rejected request with {}", response.status()),
            )),
            status if status.is_success() => response
                .json::<T>()
                .await
                .map(Some)
                .map_err(|e| GovernanceError::Malformed(e.to_string())),
            status => Err(GovernanceError::Transport(format!(
                "backend returned {status} for {url}"
            ))),
        }
    }
}

#[async_trait]
impl BackendReader for HttpBackend {
    async fn list_proposals(&self) -> Result<ProposalsPage, GovernanceError> {
        self.get_json("/proposals").await?.ok_or_else(|| {
            GovernanceError::Transport("backend proposal list endpoint missing".into())
        })
    }

    async fn proposal(&self, id: u64) -> Result<Option<ProposalDto>, GovernanceError> {
        self.get_json(&format!("/proposals/{id}")).await
    }

    async fn results(&self, id: u64) -> Result<Option<ResultsDto>, GovernanceError> {
        self.get_json(&format!("/results/{id}")).await
    }
}
