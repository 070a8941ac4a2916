//! Core HTTP client for GitLab API

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use chrono::Local;
use compact_str::{format_compact, CompactString};
use itertools::Itertools;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{
    config::{ClientConfig, DebugConfig},
    error::{ClientError, Result},
};
use crate::domain::{GroupDto, IssueOptions, ProjectDto, Scope};

/// Header carrying the next page number of a paginated GitLab listing
const NEXT_PAGE_HEADER: &str = "x-next-page";

/// Remote capabilities a forge provider needs from its API client
#[async_trait]
pub trait ForgeApi: Send + Sync + Debug {
    /// Every group visible to the session
    async fn list_groups(&self) -> Result<Vec<GroupDto>>;

    /// Every project visible to the session
    async fn list_projects(&self) -> Result<Vec<ProjectDto>>;

    /// Issues of a project or group, as the raw API payload
    ///
    /// The payload is not validated here: a well-behaved server answers
    /// with an array, and callers decide what anything else means.
    async fn list_issues(&self, scope: Scope, options: &IssueOptions) -> Result<Value>;
}

/// Opens API sessions; the seam through which transports are injected
pub trait Connector: Send + Sync {
    fn connect(&self, config: ClientConfig) -> Result<Arc<dyn ForgeApi>>;
}

/// Connects to GitLab over HTTP
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    debug: Option<DebugConfig>,
}

impl HttpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a debug configuration to every session opened by this connector
    pub fn with_debug(mut self, debug: DebugConfig) -> Self {
        self.debug = Some(debug);
        self
    }
}

impl Connector for HttpConnector {
    fn connect(&self, config: ClientConfig) -> Result<Arc<dyn ForgeApi>> {
        let config = match &self.debug {
            Some(debug) => config.with_debug(debug.clone()),
            None => config,
        };

        Ok(Arc::new(GitlabApi::new(config)?))
    }
}

/// Pure HTTP client for GitLab API
#[derive(Debug, Clone)]
pub struct GitlabApi {
    client: Client,
    config: ClientConfig,
}

/// GitLab API error response formats
#[derive(Debug, Deserialize)]
struct GitlabApiError {
    error: CompactString,
    error_description: Option<CompactString>,
}

#[derive(Debug, Deserialize)]
struct GitlabApiError2 {
    message: Value,
}

/// One page of a listing and the number of the page after it
struct Page {
    body: Value,
    next: Option<u32>,
}

impl GitlabApi {
    /// Create a new GitLab API client
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request.timeout)
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self { client, config })
    }

    /// Fetch every page of a listing
    ///
    /// Pages are concatenated while the server keeps answering with arrays;
    /// the first non-array body is returned as-is.
    async fn get_all(&self, path: &str, params: &[(String, String)]) -> Result<Value> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let url = self.build_url(path, params, page)?;
            let Page { body, next } = self.get_page(url).await?;

            match body {
                Value::Array(items) => records.extend(items),
                other => return Ok(other),
            }

            match next {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        debug!(path, record_count = records.len(), "Fetched all pages");
        Ok(Value::Array(records))
    }

    /// Perform authenticated GET request for a single page
    async fn get_page(&self, url: Url) -> Result<Page> {
        let response = self.authenticated_request(url).send().await?;
        let next = response
            .headers()
            .get(NEXT_PAGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok());

        let body = self.handle_response(response).await?;
        Ok(Page { body, next })
    }

    /// Create authenticated request builder
    fn authenticated_request(&self, url: Url) -> RequestBuilder {
        self.client
            .get(url)
            .header("PRIVATE-TOKEN", self.config.private_token.as_str())
    }

    /// Handle HTTP response and deserialize JSON
    async fn handle_response<T>(&self, response: Response) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url_path = response.url().path().to_string();
        let status = response.status();
        let body = response.text().await?;

        // Log response if debug is enabled
        if self.config.debug.log_responses {
            self.log_response_to_file(&url_path, &body);
        }

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| ClientError::json_parse(url_path, e))
        } else {
            self.handle_error_response(status.as_u16(), &body)
        }
    }

    /// Handle error responses from GitLab API
    fn handle_error_response<T>(&self, status: u16, body: &str) -> Result<T> {
        match status {
            401 => Err(ClientError::Authentication),
            404 => Err(ClientError::not_found("Resource")),
            429 => Err(ClientError::RateLimit),
            _ => {
                // Try to parse GitLab API error formats
                if let Ok(api_error) = serde_json::from_str::<GitlabApiError>(body) {
                    Err(ClientError::gitlab_api(format_compact!(
                        "HTTP {}: {} {}",
                        status,
                        api_error.error,
                        api_error.error_description.unwrap_or_default()
                    )))
                } else if let Ok(api_error2) = serde_json::from_str::<GitlabApiError2>(body) {
                    let message = match api_error2.message {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    Err(ClientError::gitlab_api(format_compact!("HTTP {}: {}", status, message)))
                } else {
                    Err(ClientError::gitlab_api(format_compact!("HTTP {}: {}", status, body)))
                }
            },
        }
    }

    /// Build URL for a paginated endpoint below the API base
    fn build_url(&self, path: &str, params: &[(String, String)], page: u32) -> Result<Url> {
        let raw = format!("{}/{}", self.config.base_url, path);
        let mut url = Url::parse(&raw)
            .map_err(|e| ClientError::config(format!("Invalid API URL {raw}: {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            if !params.iter().any(|(k, _)| k == "per_page") {
                query.append_pair("per_page", &self.config.request.per_page.to_string());
            }
            for (key, value) in params.iter().filter(|(k, _)| k != "page") {
                query.append_pair(key, value);
            }
            query.append_pair("page", &page.to_string());
        }

        Ok(url)
    }

    /// Listing filter restricting results to memberships when configured
    fn membership_params(&self, resource: &str) -> Vec<(String, String)> {
        match (resource, self.config.membership) {
            ("projects", true) => vec![("membership".into(), "true".into())],
            ("groups", false) => vec![("all_available".into(), "true".into())],
            _ => vec![],
        }
    }

    /// Log HTTP response to file for debugging
    fn log_response_to_file(&self, path: &str, body: &str) {
        if let Some(log_dir) = &self.config.debug.log_directory {
            if !log_dir.exists() {
                if let Err(e) = std::fs::create_dir_all(log_dir) {
                    warn!("Failed to create log directory: {}", e);
                    return;
                }
            }

            let filename = format!(
                "{}_{}.json",
                Local::now().format("%Y-%m-%d_%H-%M-%S%.3f"),
                path.replace('/', "_")
            );

            let log_path = log_dir.join(filename);

            if let Err(e) = std::fs::write(&log_path, body) {
                warn!("Failed to write response log to {:?}: {}", log_path, e);
            } else {
                debug!("Response logged to {:?}", log_path);
            }
        }
    }
}

#[async_trait]
impl ForgeApi for GitlabApi {
    #[instrument(skip(self))]
    async fn list_groups(&self) -> Result<Vec<GroupDto>> {
        let params = self.membership_params("groups");
        let groups = self.get_all("groups", &params).await?;
        serde_json::from_value(groups).map_err(|e| ClientError::json_parse("groups", e))
    }

    #[instrument(skip(self))]
    async fn list_projects(&self) -> Result<Vec<ProjectDto>> {
        let params = self.membership_params("projects");
        let projects = self.get_all("projects", &params).await?;
        serde_json::from_value(projects).map_err(|e| ClientError::json_parse("projects", e))
    }

    #[instrument(skip(self, options), fields(scope = %scope))]
    async fn list_issues(&self, scope: Scope, options: &IssueOptions) -> Result<Value> {
        let path = match scope {
            Scope::Project(id) => format!("projects/{id}/issues"),
            Scope::Group(id) => format!("groups/{id}/issues"),
        };

        self.get_all(&path, &issue_query_params(options)).await
    }
}

/// Encode issue options as query parameters
///
/// Scalars are stringified, arrays are comma-joined and nulls are dropped.
pub fn issue_query_params(options: &IssueOptions) -> Vec<(String, String)> {
    options
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Array(items) => items.iter().map(scalar_param).join(","),
                other => other.to_string(),
            };
            Some((key.clone(), value))
        })
        .collect()
}

fn scalar_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
