// GitLab API Documentation: https://docs.gitlab.com/ee/api/api_resources.html
use compact_str::CompactString;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::id::{GroupId, ProjectId};

/// An issue record as returned by the forge, plus enrichment.
///
/// The shape belongs to the remote API; only `project_id` is read and
/// `project_name` is written by this crate.
pub type Issue = Value;

/// Query parameters forwarded verbatim to the issue listing endpoint.
pub type IssueOptions = Map<String, Value>;

/// Format-specific output options, keyed by option name.
pub type OutOptions = Map<String, Value>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupDto {
    pub id: GroupId,
    pub full_path: CompactString,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectDto {
    pub id: ProjectId,
    pub path_with_namespace: CompactString,
}

/// The remote resource an authenticated session is bound to.
///
/// A session is scoped to exactly one project or exactly one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Project(ProjectId),
    Group(GroupId),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Scope::Project(id) => write!(f, "project #{id}"),
            Scope::Group(id) => write!(f, "group #{id}"),
        }
    }
}
