//! Structural decoding of client identity tokens.
//!
//! Tokens are JWT-shaped (`header.payload.signature`). Only the payload segment is read, to find the customer's
//! CPF. The signature is NOT verified here; whoever terminates client traffic upstream must do that before the token
//! reaches the order workflow.
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

use crate::domain::order::OrderError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IdentityClaims {
    pub cpf: String,
    #[serde(default)]
    pub sub: Option<String>,
}

pub struct IdentityToken;

impl IdentityToken {
    /// Pulls the claims out of a bearer token. Anything malformed is `Unauthorized`.
    pub fn decode(raw: &str) -> Result<IdentityClaims, OrderError> {
        let token = raw.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();

        let payload = token
            .split('.')
            .nth(1)
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| OrderError::Unauthorized("token has no payload segment".to_string()))?;

        let bytes = decode_segment(payload)
            .ok_or_else(|| OrderError::Unauthorized("token payload is not valid base64".to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(error = %e, "Identity token payload could not be parsed");
            OrderError::Unauthorized(format!("token payload is not a valid claim set: {e}"))
        })
    }
}

// JWTs use the URL-safe alphabet without padding; accept padded and standard variants too
fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    let unpadded = segment.trim_end_matches('=');
    general_purpose::URL_SAFE_NO_PAD
        .decode(unpadded)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(unpadded))
        .ok()
}
