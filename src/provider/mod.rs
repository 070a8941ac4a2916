//! Git forge providers
//!
//! A provider turns a project or group url into an authenticated [`Session`],
//! fetches the issues of that session and runs them through the configured
//! transforms. Providers are built in two phases: [`ProviderConfig::validate`]
//! checks the request, then [`ForgeKind::build`] instantiates the provider.

pub mod gitlab;
pub mod transform;

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use compact_str::CompactString;
use regex::{Regex, RegexBuilder};
use tracing::debug;

pub use self::gitlab::GitlabProvider;
use crate::{
    client::{Connector, ForgeApi},
    domain::{Issue, IssueOptions, OutOptions, Scope},
    output::OutputConfig,
    result::{IsrenError, Result},
    util::normalize_tokens,
};

/// Unvalidated provider request, as assembled from flags, environment and config file
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    pub url: CompactString,
    pub auth: Option<CompactString>,
    pub insecure: bool,
    pub membership: bool,
    pub transform: Option<String>,
    pub transform_root: PathBuf,
    pub out: Vec<CompactString>,
    pub out_options: OutOptions,
    pub file: Option<PathBuf>,
    pub issue_options: IssueOptions,
}

/// Validated provider configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub url: CompactString,
    pub auth: CompactString,
    /// Skip TLS certificate verification of the API session
    pub insecure: bool,
    /// Only resolve projects and groups the token owner is a member of
    pub membership: bool,
    /// Comma separated transform scripts
    pub transform: Option<String>,
    /// Directory transform scripts are resolved against
    pub transform_root: PathBuf,
    pub output: OutputConfig,
    pub issue_options: IssueOptions,
}

impl ProviderConfig {
    /// Check a request, taking the token from `fallback_auth` when none was given
    pub fn validate(request: ProviderRequest, fallback_auth: Option<&str>) -> Result<Self> {
        let url = CompactString::from(request.url.trim());
        if url.is_empty() {
            return Err(IsrenError::EmptyUrl);
        }

        let auth = request
            .auth
            .as_deref()
            .or(fallback_auth)
            .map(str::trim)
            .filter(|auth| !auth.is_empty())
            .map(CompactString::from)
            .ok_or(IsrenError::MissingAuth)?;

        let out = normalize_tokens(&request.out);
        let file_selected = out.iter().any(|token| token.as_str() == "file");
        match (&request.file, file_selected) {
            (Some(_), false) => return Err(IsrenError::MissingFileOut),
            (None, true) => return Err(IsrenError::FileTransformName),
            _ => {},
        }

        Ok(Self {
            url,
            auth,
            insecure: request.insecure,
            membership: request.membership,
            transform: request.transform.filter(|t| !t.trim().is_empty()),
            transform_root: request.transform_root,
            output: OutputConfig { out, out_options: request.out_options, file: request.file },
            issue_options: request.issue_options,
        })
    }
}

/// An authenticated API session, bound to one project or one group
#[derive(Debug, Clone)]
pub struct Session {
    api: Arc<dyn ForgeApi>,
    scope: Scope,
}

impl Session {
    pub fn new(api: Arc<dyn ForgeApi>, scope: Scope) -> Self {
        Self { api, scope }
    }

    pub fn api(&self) -> &dyn ForgeApi {
        self.api.as_ref()
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }
}

/// Operator supplied host patterns, matched in addition to the public forges
#[derive(Debug, Clone, Default)]
pub struct ForgeHosts {
    pub gitlab: Option<Regex>,
}

impl ForgeHosts {
    /// Compile the alternate GitLab host pattern; an empty pattern is ignored
    pub fn new(gitlab: Option<&str>) -> Result<Self> {
        let gitlab = match gitlab.map(str::trim).filter(|p| !p.is_empty()) {
            Some(pattern) => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| IsrenError::MalformedOptions {
                        option: "gitlab url pattern",
                        message: e.to_string(),
                    })?,
            ),
            None => None,
        };

        Ok(Self { gitlab })
    }
}

/// Capabilities of a git forge provider
///
/// Concrete providers override what they support; the rest reports
/// [`IsrenError::NotImplemented`].
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn config(&self) -> &ProviderConfig;

    /// Does `url` point at a forge served by this provider?
    fn is_implementation(_url: &str, _hosts: &ForgeHosts) -> Result<bool>
    where
        Self: Sized,
    {
        Err(IsrenError::not_implemented("is_implementation", std::any::type_name::<Self>()))
    }

    /// Open a session for the configured url
    async fn authenticate(&self) -> Result<Session> {
        Err(IsrenError::not_implemented("authenticate", self.name()))
    }

    /// Fetch the issues of the session's project or group
    async fn get_issues(&self, _session: &Session) -> Result<Vec<Issue>> {
        Err(IsrenError::not_implemented("get_issues", self.name()))
    }

    /// Run the configured transform scripts over the issues
    async fn transform(&self, issues: Vec<Issue>) -> Result<Vec<Issue>> {
        let config = self.config();
        transform::run_transforms(config.transform.as_deref(), &config.transform_root, issues)
            .await
    }
}

/// Known forges, in detection order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgeKind {
    Gitlab,
}

impl ForgeKind {
    pub const ALL: [ForgeKind; 1] = [ForgeKind::Gitlab];

    pub fn is_implementation(self, url: &str, hosts: &ForgeHosts) -> Result<bool> {
        match self {
            ForgeKind::Gitlab => GitlabProvider::is_implementation(url, hosts),
        }
    }

    /// First forge claiming `url`
    pub fn detect(url: &str, hosts: &ForgeHosts) -> Result<Self> {
        for kind in Self::ALL {
            if kind.is_implementation(url, hosts)? {
                debug!(forge = ?kind, url, "Forge detected");
                return Ok(kind);
            }
        }

        Err(IsrenError::NoImplementation { url: url.into() })
    }

    pub fn build(self, config: ProviderConfig, connector: Arc<dyn Connector>) -> ForgeProvider {
        match self {
            ForgeKind::Gitlab => ForgeProvider::Gitlab(GitlabProvider::new(config, connector)),
        }
    }
}

/// A provider of any known forge
pub enum ForgeProvider {
    Gitlab(GitlabProvider),
}

impl ForgeProvider {
    pub fn as_provider(&self) -> &dyn Provider {
        match self {
            ForgeProvider::Gitlab(provider) => provider,
        }
    }
}
