use std::io::Write;

use super::Payload;
use crate::result::{IsrenError, Result};

/// Print the payload as-is and pass it on
pub(super) fn output(payload: Payload, stdout: &mut dyn Write) -> Result<Payload> {
    let rendered = payload.render()?;
    writeln!(stdout, "{rendered}").map_err(IsrenError::StdoutWrite)?;
    stdout.flush().map_err(IsrenError::StdoutWrite)?;

    Ok(payload)
}
