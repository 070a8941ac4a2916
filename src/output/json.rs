use super::Payload;
use crate::result::{IsrenError, Result};

/// Serialize the payload to a JSON string
pub(super) fn output(payload: Payload) -> Result<Payload> {
    let serialized = match &payload {
        Payload::Records(records) => serde_json::to_string(records),
        Payload::Text(text) => serde_json::to_string(text),
    };

    serialized
        .map(Payload::Text)
        .map_err(|e| IsrenError::General(e.to_string().into()))
}
