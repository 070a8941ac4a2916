//! Test utilities and common test fixtures for client modules

mod integration_tests;

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::{net::TcpListener, task::JoinHandle};

use super::{
    api::{Connector, ForgeApi},
    config::ClientConfig,
    error::{ClientError, Result},
};
use crate::{
    domain::{GroupDto, IssueOptions, ProjectDto, Scope},
    id::{GroupId, ProjectId},
};

/// Create a GroupDto for testing
pub fn group(id: u64, full_path: &str) -> GroupDto {
    GroupDto {
        id: GroupId::new(id),
        full_path: full_path.into(),
    }
}

/// Create a ProjectDto for testing
pub fn project(id: u64, path_with_namespace: &str) -> ProjectDto {
    ProjectDto {
        id: ProjectId::new(id),
        path_with_namespace: path_with_namespace.into(),
    }
}

/// JSON page of projects as GitLab returns it
pub fn projects_json_response() -> Value {
    json!([
        {
            "id": 114,
            "name": "support-forum",
            "path_with_namespace": "gitlab-com/support-forum",
            "web_url": "https://gitlab.com/gitlab-com/support-forum"
        }
    ])
}

/// JSON page of groups as GitLab returns it
pub fn groups_json_response() -> Value {
    json!([
        {
            "id": 123,
            "name": "GitLab.com",
            "full_path": "gitlab-com",
            "web_url": "https://gitlab.com/groups/gitlab-com"
        }
    ])
}

/// JSON page of issues as GitLab returns it
pub fn issues_json_response() -> Value {
    json!([
        { "id": 1001, "iid": 1, "project_id": 114, "title": "Broken login", "state": "opened" },
        { "id": 1002, "iid": 2, "project_id": 114, "title": "Typo in docs", "state": "closed" }
    ])
}

/// Create GitLab API error response
pub fn gitlab_error_response(error: &str, description: Option<&str>) -> Value {
    let mut json = json!({
        "error": error
    });

    if let Some(desc) = description {
        json["error_description"] = json!(desc);
    }

    json
}

/// Mock HTTP server for testing
pub struct MockServer {
    pub server: wiremock::MockServer,
}

impl MockServer {
    /// Start a new mock server
    pub async fn start() -> Self {
        let server = wiremock::MockServer::start().await;
        Self { server }
    }

    /// Get the origin of the mock server
    pub fn origin(&self) -> String {
        self.server.uri()
    }

    /// Create a test config pointing to this mock server
    pub fn test_config(&self) -> ClientConfig {
        ClientConfig::for_origin(&self.origin(), "test-token")
    }
}

/// HTTPS listener presenting a self-signed certificate
///
/// Every connection is taken through the TLS handshake and then closed, so
/// a verifying client fails on the certificate and an insecure one fails
/// on the missing HTTP response.
pub struct TlsServer {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl TlsServer {
    pub async fn start() -> Self {
        let identity = native_tls::Identity::from_pkcs8(
            include_bytes!("fixtures/self_signed.crt"),
            include_bytes!("fixtures/self_signed.key"),
        )
        .unwrap();
        let acceptor = tokio_native_tls::TlsAcceptor::from(
            native_tls::TlsAcceptor::new(identity).unwrap(),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    // a verifying client aborts the handshake
                    let _ = acceptor.accept(stream).await;
                });
            }
        });

        Self { addr, task }
    }

    pub fn origin(&self) -> String {
        format!("https://{}", self.addr)
    }
}

impl Drop for TlsServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// In-memory forge API
#[derive(Debug, Default)]
pub struct StubApi {
    pub groups: Vec<GroupDto>,
    pub projects: Vec<ProjectDto>,
    pub issues: Value,
    /// Returned once by the next `list_groups` call instead of the groups
    pub groups_error: Mutex<Option<ClientError>>,
    /// Every issue listing request, in call order
    pub issue_requests: Mutex<Vec<(Scope, IssueOptions)>>,
    /// Number of `list_projects` calls
    pub project_listings: Mutex<usize>,
}

impl StubApi {
    pub fn new(groups: Vec<GroupDto>, projects: Vec<ProjectDto>, issues: Value) -> Self {
        Self { groups, projects, issues, ..Default::default() }
    }

    pub fn failing(error: ClientError) -> Self {
        Self { groups_error: Mutex::new(Some(error)), ..Default::default() }
    }

    pub fn issue_requests(&self) -> Vec<(Scope, IssueOptions)> {
        self.issue_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ForgeApi for StubApi {
    async fn list_groups(&self) -> Result<Vec<GroupDto>> {
        if let Some(error) = self.groups_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.groups.clone())
    }

    async fn list_projects(&self) -> Result<Vec<ProjectDto>> {
        *self.project_listings.lock().unwrap() += 1;
        Ok(self.projects.clone())
    }

    async fn list_issues(&self, scope: Scope, options: &IssueOptions) -> Result<Value> {
        self.issue_requests.lock().unwrap().push((scope, options.clone()));
        Ok(self.issues.clone())
    }
}

/// Hands out a shared [`StubApi`] and records the configs it was asked for
#[derive(Default)]
pub struct StubConnector {
    pub api: Arc<StubApi>,
    pub configs: Mutex<Vec<ClientConfig>>,
}

impl StubConnector {
    pub fn new(api: StubApi) -> Self {
        Self { api: Arc::new(api), configs: Mutex::default() }
    }

    pub fn configs(&self) -> Vec<ClientConfig> {
        self.configs.lock().unwrap().clone()
    }
}

impl Connector for StubConnector {
    fn connect(&self, config: ClientConfig) -> Result<Arc<dyn ForgeApi>> {
        config.validate()?;
        self.configs.lock().unwrap().push(config);
        Ok(self.api.clone())
    }
}

#[allow(clippy::module_inception)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_data_creation() {
        let project = project(114, "gitlab-com/support-forum");
        assert_eq!(project.id, ProjectId::new(114));

        let group = group(123, "gitlab-com");
        assert_eq!(group.full_path, "gitlab-com");
    }

    #[test]
    fn test_json_fixtures() {
        let projects: Vec<ProjectDto> = serde_json::from_value(projects_json_response()).unwrap();
        assert_eq!(projects[0].path_with_namespace, "gitlab-com/support-forum");

        let groups: Vec<GroupDto> = serde_json::from_value(groups_json_response()).unwrap();
        assert_eq!(groups[0].full_path, "gitlab-com");

        let error = gitlab_error_response("invalid_token", Some("Token is invalid"));
        assert_eq!(error["error_description"], "Token is invalid");
    }

    #[tokio::test]
    async fn test_stub_api_returns_groups_error_once() {
        let api = StubApi::failing(ClientError::Authentication);

        assert!(matches!(api.list_groups().await, Err(ClientError::Authentication)));
        assert!(api.list_groups().await.unwrap().is_empty());
    }
}
