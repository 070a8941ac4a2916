//! Integration tests for GitLab client modules

use std::sync::Arc;

use serde_json::json;
use wiremock::{
    matchers::{header, method, path, query_param, query_param_is_missing},
    Mock, ResponseTemplate,
};

use super::{
    gitlab_error_response, groups_json_response, issues_json_response, projects_json_response,
    MockServer, TlsServer,
};
use crate::{
    app::App,
    client::{
        api::{ForgeApi, GitlabApi},
        config::{ClientConfig, DebugConfig},
        error::ClientError,
        HttpConnector,
    },
    config::IsrenConfig,
    domain::{IssueOptions, Scope},
    id::{GroupId, ProjectId},
    output::Payload,
    provider::{ForgeHosts, ProviderRequest},
    result::{ErrorKind, IsrenError},
};

#[tokio::test]
async fn test_api_list_projects_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .and(header("PRIVATE-TOKEN", "test-token"))
        .and(query_param_is_missing("membership"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(projects_json_response()))
        .mount(&mock_server.server)
        .await;

    let api = GitlabApi::new(mock_server.test_config()).unwrap();
    let projects = api.list_projects().await.unwrap();

    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].id, ProjectId::new(114));
    assert_eq!(projects[0].path_with_namespace, "gitlab-com/support-forum");
}

#[tokio::test]
async fn test_api_list_projects_scoped_to_memberships() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .and(query_param("membership", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server.server)
        .await;

    let api = GitlabApi::new(mock_server.test_config().with_membership(true)).unwrap();
    let projects = api.list_projects().await.unwrap();

    assert!(projects.is_empty());
}

#[tokio::test]
async fn test_api_list_groups_follows_pagination() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/groups"))
        .and(query_param("all_available", "true"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-next-page", "2")
                .set_body_json(groups_json_response()),
        )
        .mount(&mock_server.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/groups"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-next-page", "")
                .set_body_json(json!([{ "id": 124, "full_path": "gitlab-com/support" }])),
        )
        .mount(&mock_server.server)
        .await;

    let api = GitlabApi::new(mock_server.test_config()).unwrap();
    let groups = api.list_groups().await.unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].id, GroupId::new(123));
    assert_eq!(groups[1].full_path, "gitlab-com/support");
}

#[tokio::test]
async fn test_api_list_issues_for_project_with_options() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects/114/issues"))
        .and(header("PRIVATE-TOKEN", "test-token"))
        .and(query_param("state", "opened"))
        .and(query_param("labels", "bug,ui"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issues_json_response()))
        .mount(&mock_server.server)
        .await;

    let api = GitlabApi::new(mock_server.test_config()).unwrap();
    let options: IssueOptions = serde_json::from_value(json!({
        "state": "opened",
        "labels": ["bug", "ui"]
    }))
    .unwrap();

    let issues = api
        .list_issues(Scope::Project(ProjectId::new(114)), &options)
        .await
        .unwrap();

    assert_eq!(issues.as_array().map(Vec::len), Some(2));
    assert_eq!(issues[0]["title"], "Broken login");
}

#[tokio::test]
async fn test_api_list_issues_for_group() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/groups/123/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issues_json_response()))
        .mount(&mock_server.server)
        .await;

    let api = GitlabApi::new(mock_server.test_config()).unwrap();
    let issues = api
        .list_issues(Scope::Group(GroupId::new(123)), &IssueOptions::new())
        .await
        .unwrap();

    assert!(issues.is_array());
}

#[tokio::test]
async fn test_api_list_issues_passes_non_array_body_through() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects/114/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
        .mount(&mock_server.server)
        .await;

    let api = GitlabApi::new(mock_server.test_config()).unwrap();
    let issues = api
        .list_issues(Scope::Project(ProjectId::new(114)), &IssueOptions::new())
        .await
        .unwrap();

    assert_eq!(issues, json!({ "unexpected": true }));
}

#[tokio::test]
async fn test_api_authentication_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/groups"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(gitlab_error_response("invalid_token", None)),
        )
        .mount(&mock_server.server)
        .await;

    let api = GitlabApi::new(mock_server.test_config()).unwrap();
    let result = api.list_groups().await;

    assert!(matches!(result, Err(ClientError::Authentication)));
}

#[tokio::test]
async fn test_api_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server.server)
        .await;

    let api = GitlabApi::new(mock_server.test_config()).unwrap();
    let error = api.list_projects().await.unwrap_err();

    assert!(matches!(error, ClientError::GitlabApi { .. }));
    assert!(!error.is_certificate_error());
    assert_eq!(error.to_string(), "GitLab API error: HTTP 500: Internal Server Error");
}

#[tokio::test]
async fn test_api_malformed_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server.server)
        .await;

    let api = GitlabApi::new(mock_server.test_config()).unwrap();
    let result = api.list_projects().await;

    assert!(matches!(result, Err(ClientError::JsonParse { .. })));
}

#[tokio::test]
async fn test_api_response_logging() {
    let mock_server = MockServer::start().await;
    let log_dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(projects_json_response()))
        .mount(&mock_server.server)
        .await;

    let config = mock_server.test_config().with_debug(DebugConfig {
        log_responses: true,
        log_directory: Some(log_dir.path().join("responses")),
    });

    let api = GitlabApi::new(config).unwrap();
    api.list_projects().await.unwrap();

    let logged = std::fs::read_dir(log_dir.path().join("responses")).unwrap().count();
    assert_eq!(logged, 1);
}

#[tokio::test]
async fn test_self_hosted_project_rendered_end_to_end() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(groups_json_response()))
        .mount(&mock_server.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .and(query_param_is_missing("membership"))
        .respond_with(ResponseTemplate::new(200).set_body_json(projects_json_response()))
        .expect(2)
        .mount(&mock_server.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects/114/issues"))
        .and(query_param("state", "opened"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issues_json_response()))
        .expect(1)
        .mount(&mock_server.server)
        .await;

    let origin = mock_server.origin();
    let hosts = ForgeHosts::new(Some(&format!("^{}/", regex::escape(&origin)))).unwrap();
    let app = App::new(hosts, Arc::new(HttpConnector::new()));
    let request = ProviderRequest {
        url: format!("{origin}/gitlab-com/support-forum").into(),
        auth: Some("test-token".into()),
        out: vec!["csv".into(), "console".into()],
        issue_options: serde_json::from_value(json!({ "state": "opened" })).unwrap(),
        ..Default::default()
    };
    let mut stdout = Vec::new();

    app.run(request, None, &mut stdout).await.unwrap();

    assert_eq!(
        String::from_utf8(stdout).unwrap(),
        "id,iid,project_id,title,state,project_name\n\
         1001,1,114,Broken login,opened,gitlab-com/support-forum\n\
         1002,2,114,Typo in docs,closed,gitlab-com/support-forum\n\n"
    );
}

#[tokio::test]
async fn test_default_listing_resolves_projects_outside_memberships() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/groups"))
        .and(query_param("all_available", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(groups_json_response()))
        .mount(&mock_server.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .and(query_param("membership", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects"))
        .and(query_param_is_missing("membership"))
        .respond_with(ResponseTemplate::new(200).set_body_json(projects_json_response()))
        .mount(&mock_server.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects/114/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issues_json_response()))
        .expect(1)
        .mount(&mock_server.server)
        .await;

    let origin = mock_server.origin();
    let hosts = ForgeHosts::new(Some(&format!("^{}/", regex::escape(&origin)))).unwrap();
    let app = App::new(hosts, Arc::new(HttpConnector::new()));
    let request = ProviderRequest {
        url: format!("{origin}/gitlab-com/support-forum").into(),
        auth: Some("test-token".into()),
        membership: IsrenConfig::default().membership,
        out: vec!["json".into()],
        ..Default::default()
    };
    let mut stdout = Vec::new();

    let rendered = app.run(request, None, &mut stdout).await.unwrap();

    let Payload::Text(json) = rendered else { panic!("expected rendered json") };
    let issues: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
    assert_eq!(issues.len(), 2);
    assert!(issues.iter().all(|i| i["project_name"] == "gitlab-com/support-forum"));
}

#[tokio::test]
async fn test_self_signed_certificate_is_a_certificate_error() {
    let server = TlsServer::start().await;

    let api = GitlabApi::new(ClientConfig::for_origin(&server.origin(), "test-token")).unwrap();
    let error = api.list_groups().await.unwrap_err();

    assert!(matches!(error, ClientError::Http(_)));
    assert!(error.is_certificate_error());
    assert_eq!(IsrenError::from_authentication(error).kind(), ErrorKind::SslError);
}

#[tokio::test]
async fn test_insecure_session_skips_certificate_check() {
    let server = TlsServer::start().await;

    let config = ClientConfig::for_origin(&server.origin(), "test-token").with_insecure(true);
    let api = GitlabApi::new(config).unwrap();
    let error = api.list_groups().await.unwrap_err();

    // the handshake succeeds, the listener then hangs up without answering
    assert!(!error.is_certificate_error());
    assert_eq!(IsrenError::from_authentication(error).kind(), ErrorKind::AuthError);
}

#[tokio::test]
async fn test_untrusted_certificate_reported_as_ssl_error() {
    let server = TlsServer::start().await;

    let origin = server.origin();
    let hosts = ForgeHosts::new(Some(&format!("^{}/", regex::escape(&origin)))).unwrap();
    let app = App::new(hosts, Arc::new(HttpConnector::new()));
    let request = ProviderRequest {
        url: format!("{origin}/gitlab-com/support-forum").into(),
        auth: Some("test-token".into()),
        ..Default::default()
    };
    let mut stdout = Vec::new();

    let err = app.run(request, None, &mut stdout).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SslError);
    assert_eq!(
        err.to_string(),
        "The server certificate could not be verified, use --insecure to skip the check."
    );
    assert!(stdout.is_empty());
}
