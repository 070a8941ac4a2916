use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use compact_str::CompactString;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{ForgeHosts, Provider, ProviderConfig, Session};
use crate::{
    client::{ClientConfig, Connector, ForgeApi},
    domain::{GroupDto, Issue, ProjectDto, Scope},
    result::{IsrenError, Result},
};

const PUBLIC_HOST: &str = "gitlab.com/";
const GROUPS_PREFIX: &str = "groups/";

/// Provider for gitlab.com and self-hosted GitLab instances
pub struct GitlabProvider {
    config: ProviderConfig,
    connector: Arc<dyn Connector>,
}

impl GitlabProvider {
    pub fn new(config: ProviderConfig, connector: Arc<dyn Connector>) -> Self {
        Self { config, connector }
    }

    /// Split a url into its path and its `scheme://host[:port]` origin
    pub fn parse_url(url: &str) -> Result<(String, String)> {
        let parsed = Url::parse(url)
            .map_err(|e| IsrenError::invalid_parameters("parse_url", "url", format!("{url}, {e}")))?;

        Ok((parsed.path().to_string(), parsed.origin().ascii_serialization()))
    }

    /// Add the `project_name` of every issue, from a fresh project listing
    ///
    /// Issues of projects missing from the listing get an empty name.
    #[instrument(skip_all)]
    pub async fn add_project_names(
        &self,
        api: Option<&dyn ForgeApi>,
        issues: Value,
    ) -> Result<Vec<Issue>> {
        let api = api.ok_or_else(|| {
            IsrenError::invalid_parameters("add_project_names", "api", "none")
        })?;
        let mut issues = match issues {
            Value::Array(issues) => issues,
            other => {
                return Err(IsrenError::invalid_parameters("add_project_names", "issues", other))
            },
        };

        let names: HashMap<u64, CompactString> = api
            .list_projects()
            .await?
            .into_iter()
            .map(|project| (project.id.value(), project.path_with_namespace))
            .collect();

        for issue in issues.iter_mut() {
            let Some(fields) = issue.as_object_mut() else {
                continue;
            };

            let name = fields
                .get("project_id")
                .and_then(Value::as_u64)
                .and_then(|id| names.get(&id))
                .map(|name| name.to_string())
                .unwrap_or_default();
            fields.insert("project_name".into(), Value::String(name));
        }

        debug!(issue_count = issues.len(), project_count = names.len(), "Project names added");
        Ok(issues)
    }
}

#[async_trait]
impl Provider for GitlabProvider {
    fn name(&self) -> &str {
        "GitLab"
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn is_implementation(url: &str, hosts: &ForgeHosts) -> Result<bool> {
        let lower = url.to_lowercase();
        let public = lower.starts_with(PUBLIC_HOST) || lower.contains(&format!("/{PUBLIC_HOST}"));
        let operator = hosts.gitlab.as_ref().is_some_and(|pattern| pattern.is_match(url));

        Ok(public || operator)
    }

    #[instrument(skip(self), fields(url = %self.config.url))]
    async fn authenticate(&self) -> Result<Session> {
        let (pathname, origin) = Self::parse_url(&self.config.url)?;
        info!("Connecting to {origin}...");

        let client_config = ClientConfig::for_origin(&origin, self.config.auth.clone())
            .with_insecure(self.config.insecure)
            .with_membership(self.config.membership);
        let api = self
            .connector
            .connect(client_config)
            .map_err(IsrenError::from_authentication)?;

        let groups = api.list_groups().await.map_err(IsrenError::from_authentication)?;
        let projects = api.list_projects().await.map_err(IsrenError::from_authentication)?;

        let path = identity_path(&pathname);
        debug!(
            path = %path,
            group_count = groups.len(),
            project_count = projects.len(),
            "Resolving project or group"
        );

        let scope = resolve_scope(&path, &groups, &projects)?;
        info!("{}", success_notice(&path, scope));

        Ok(Session::new(api, scope))
    }

    #[instrument(skip(self, session), fields(scope = %session.scope()))]
    async fn get_issues(&self, session: &Session) -> Result<Vec<Issue>> {
        let issues = session
            .api()
            .list_issues(session.scope(), &self.config.issue_options)
            .await?;

        if !issues.is_array() {
            return Err(IsrenError::MissingIssues);
        }

        self.add_project_names(Some(session.api()), issues).await
    }
}

/// The project or group path a url points at
///
/// `/groups/a/b` and `/a/b` both name `a/b`.
pub fn identity_path(pathname: &str) -> CompactString {
    let path = pathname.strip_prefix('/').unwrap_or(pathname);
    let path = match path.get(..GROUPS_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(GROUPS_PREFIX) => &path[GROUPS_PREFIX.len()..],
        _ => path,
    };

    path.trim_end_matches('/').into()
}

/// Bind `path` to exactly one group or project
pub fn resolve_scope(path: &str, groups: &[GroupDto], projects: &[ProjectDto]) -> Result<Scope> {
    let group = groups.iter().find(|g| g.full_path.as_str() == path);
    let project = projects.iter().find(|p| p.path_with_namespace.as_str() == path);

    match (group, project) {
        (None, None) => Err(IsrenError::MissingProject { path: path.into() }),
        (Some(_), Some(_)) => Err(IsrenError::DuplicateProjectGroupName { path: path.into() }),
        (Some(group), None) => Ok(Scope::Group(group.id)),
        (None, Some(project)) => Ok(Scope::Project(project.id)),
    }
}

/// Announces the resolved scope, e.g. `Current project is gitlab-com/support-forum(#114)`
fn success_notice(path: &str, scope: Scope) -> String {
    let (noun, id) = match scope {
        Scope::Project(id) => ("project", id.to_string()),
        Scope::Group(id) => ("group", id.to_string()),
    };
    format!("Authentication success! Current {noun} is {path}(#{id})")
}
