use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{IssueOptions, OutOptions},
    result::{IsrenError, Result},
    util::parse_json_options,
};

/// Defaults read from the configuration file and the environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsrenConfig {
    /// Fallback authentication token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    /// Pattern matching the urls of self-hosted GitLab instances
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gitlab_url: Option<String>,
    /// Print full error reports and debug logs
    pub debug: bool,
    /// Only resolve projects and groups the token owner is a member of
    pub membership: bool,
    /// Default output formats, a list or a comma separated string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out: Option<Value>,
    pub out_options: OutOptions,
    pub issue_options: IssueOptions,
}

impl Default for IsrenConfig {
    fn default() -> Self {
        Self {
            auth: None,
            gitlab_url: None,
            debug: false,
            membership: false,
            out: None,
            out_options: OutOptions::new(),
            issue_options: IssueOptions::new(),
        }
    }
}

impl IsrenConfig {
    /// Load the configuration file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            confy::load_path(path).map_err(IsrenError::Config)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply the `ISREN_*` environment variables found through `lookup`
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(auth) = lookup("ISREN_AUTH") {
            self.auth = Some(auth);
        }
        if let Some(debug) = lookup("ISREN_DEBUG") {
            self.debug = parse_flag(&debug);
        }
        if let Some(gitlab_url) = lookup("ISREN_GITLAB_URL") {
            self.gitlab_url = Some(gitlab_url);
        }
        if let Some(out) = lookup("ISREN_OUT") {
            self.out = Some(Value::String(out));
        }
        if let Some(options) = lookup("ISREN_OUT_OPTIONS") {
            self.out_options = parse_json_options("ISREN_OUT_OPTIONS", Some(&options))?;
        }
        if let Some(options) = lookup("ISREN_ISSUE_OPTIONS") {
            self.issue_options = parse_json_options("ISREN_ISSUE_OPTIONS", Some(&options))?;
        }

        Ok(self)
    }
}

/// `1` and `true` (any case) enable a flag
pub fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}

pub fn default_config_path() -> PathBuf {
    if let Some(dirs) = BaseDirs::new() {
        dirs.config_dir().join("isren.toml")
    } else {
        PathBuf::from("isren.toml")
    }
}
