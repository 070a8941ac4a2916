use std::path::Path;

use tracing::info;

use super::Payload;
use crate::result::{IsrenError, Result};

/// Write the payload to `path` and pass the payload on unchanged
pub(super) fn output(payload: Payload, path: Option<&Path>) -> Result<Payload> {
    let path = path.ok_or(IsrenError::FileTransformName)?;
    let contents = payload.render()?;

    std::fs::write(path, contents)
        .map_err(|source| IsrenError::FileWrite { path: path.to_path_buf(), source })?;

    info!(path = %path.display(), "Wrote output file");
    Ok(payload)
}
