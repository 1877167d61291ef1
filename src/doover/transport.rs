use async_trait::async_trait;
use http::header::{AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Errors raised while talking to the Doover channels API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("ERROR : {status} returned for {path}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },
    #[error("failed to parse response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Incorrect arguments supplied to {operation} : {args}")]
    InvalidArguments {
        operation: &'static str,
        args: String,
    },
}

/// Identity and endpoint used for every call made during one invocation.
#[derive(Clone)]
pub struct Credentials {
    pub agent_id: String,
    pub access_token: String,
    pub endpoint: String,
}

impl Credentials {
    pub fn new(
        agent_id: impl Into<String>,
        access_token: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Credentials {
            agent_id: agent_id.into(),
            access_token: access_token.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    fn authorization(&self) -> String {
        format!("Token {}", self.access_token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("agent_id", &self.agent_id)
            .field("access_token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Raw GET/POST access to the backend. Bodies are returned as text; callers
/// decide whether to parse them as JSON.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str, query: Option<&[(&str, &str)]>) -> Result<String, ApiError>;
    async fn post(&self, path: &str, body: String) -> Result<String, ApiError>;
}

pub type DynTransport = Arc<dyn Transport>;

/// GET `path` and parse the body as `T`.
pub async fn get_json<T: DeserializeOwned>(
    transport: &dyn Transport,
    path: &str,
) -> Result<T, ApiError> {
    let text = transport.get(path, None).await?;
    serde_json::from_str(&text).map_err(|source| ApiError::Decode {
        path: path.to_string(),
        source,
    })
}

/// reqwest-backed transport. One attempt per call, no retries.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    credentials: Credentials,
    debug_mode: bool,
}

impl HttpTransport {
    pub fn new(
        credentials: Credentials,
        debug_mode: bool,
        verify_ssl: bool,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_ssl)
            .build()
            .map_err(ApiError::Client)?;
        Ok(HttpTransport {
            http,
            credentials,
            debug_mode,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.credentials.endpoint, path)
    }

    async fn finish(&self, path: &str, response: reqwest::Response) -> Result<String, ApiError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ApiError::Request {
                path: path.to_string(),
                source,
            })?;

        if !status.is_success() {
            error!("ERROR : {} from {}", status.as_u16(), path);
            error!("{}", body);
            return Err(ApiError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        if self.debug_mode {
            info!("{}", body);
        }
        Ok(body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: Option<&[(&str, &str)]>) -> Result<String, ApiError> {
        debug!("GET {}", path);
        let mut request = self
            .http
            .get(self.url(path))
            .header(AUTHORIZATION, self.credentials.authorization())
            .header(USER_AGENT, concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        if let Some(query) = query {
            request = request.query(query);
        }
        let response = request.send().await.map_err(|source| ApiError::Request {
            path: path.to_string(),
            source,
        })?;
        self.finish(path, response).await
    }

    async fn post(&self, path: &str, body: String) -> Result<String, ApiError> {
        debug!("POST {} ({} bytes)", path, body.len());
        let response = self
            .http
            .post(self.url(path))
            .header(AUTHORIZATION, self.credentials.authorization())
            .header(USER_AGENT, concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .body(body)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                path: path.to_string(),
                source,
            })?;
        self.finish(path, response).await
    }
}
