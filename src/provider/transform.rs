//! User supplied issue transforms
//!
//! A transform is a script that reads one issue as JSON on stdin and writes
//! the replacement issue as JSON on stdout. Each script runs in its own
//! process, once per issue.

use std::{
    io::ErrorKind as IoErrorKind,
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, instrument, warn};

use crate::{
    domain::Issue,
    result::{IsrenError, Result},
};

/// Interpreter family of a transform script, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Shell,
    Python,
    Node,
}

impl ScriptKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "sh" => Some(ScriptKind::Shell),
            "py" => Some(ScriptKind::Python),
            "js" | "mjs" | "cjs" => Some(ScriptKind::Node),
            _ => None,
        }
    }

    pub fn interpreter(&self) -> &'static str {
        match self {
            ScriptKind::Shell => "sh",
            ScriptKind::Python => "python3",
            ScriptKind::Node => "node",
        }
    }
}

/// A transform file that passed the structural checks
#[derive(Debug, Clone)]
pub struct TransformScript {
    path: PathBuf,
    kind: ScriptKind,
}

impl TransformScript {
    /// Resolve `entry` against `root` and check it is a readable script
    pub fn load(root: &Path, entry: &str) -> Result<Self> {
        let path = root.join(entry);
        let kind = ScriptKind::from_path(&path)
            .ok_or_else(|| IsrenError::TransformType { path: path.clone() })?;

        let metadata = std::fs::metadata(&path)
            .map_err(|source| IsrenError::TransformPath { path: path.clone(), source })?;
        if !metadata.is_file() {
            let source = std::io::Error::new(IoErrorKind::InvalidInput, "not a regular file");
            return Err(IsrenError::TransformPath { path, source });
        }

        Ok(Self { path, kind })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ScriptKind {
        self.kind
    }

    /// Map every issue through the script, in order
    ///
    /// The first failing invocation fails the whole batch.
    #[instrument(skip(self, issues), fields(path = %self.path.display(), issue_count = issues.len()))]
    pub async fn apply(&self, issues: &[Issue]) -> Result<Vec<Issue>> {
        let mut mapped = Vec::with_capacity(issues.len());
        for issue in issues {
            mapped.push(self.map(issue).await?);
        }

        debug!(interpreter = self.kind().interpreter(), "Transform applied");
        Ok(mapped)
    }

    /// Run the script against a single issue
    pub async fn map(&self, issue: &Issue) -> Result<Issue> {
        let input = serde_json::to_vec(issue).map_err(|e| self.failure(e))?;

        let mut child = Command::new(self.kind.interpreter())
            .arg(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.failure(format!("failed to start {}: {e}", self.kind.interpreter())))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.failure("stdin of the transform is unavailable"))?;

        // stdin is fed while stdout is drained so large issues cannot fill both pipes
        let write = async move {
            let written = stdin.write_all(&input).await;
            drop(stdin);
            written
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());

        let output = output.map_err(|e| self.failure(e))?;
        if let Err(e) = written {
            if e.kind() != IoErrorKind::BrokenPipe {
                return Err(self.failure(e));
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(format!("{} {}", output.status, stderr.trim())));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| self.failure(format!("invalid JSON output: {e}")))
    }

    fn failure(&self, message: impl ToString) -> IsrenError {
        IsrenError::Transform { path: self.path.clone(), message: message.to_string() }
    }
}

/// Run the comma separated transform list over the issues
///
/// Missing or non-script files are errors. A script that fails while running
/// is logged and skipped: the issues it was given continue unchanged.
pub async fn run_transforms(
    transforms: Option<&str>,
    root: &Path,
    issues: Vec<Issue>,
) -> Result<Vec<Issue>> {
    let Some(transforms) = transforms else {
        return Ok(issues);
    };

    let mut issues = issues;
    for entry in transforms.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let script = TransformScript::load(root, entry)?;

        match script.apply(&issues).await {
            Ok(mapped) => issues = mapped,
            Err(e) => warn!(
                path = %script.path().display(),
                interpreter = script.kind().interpreter(),
                error = %e,
                "Transform failed, issues passed on unchanged"
            ),
        }
    }

    Ok(issues)
}
