//! Scannable pairing URI.
//!
//! The creating client renders `qrData` as a QR code; the companion scans it
//! and learns the code and the WebSocket endpoint in one step:
//!
//! ```text
//! <scheme>://pair?data=<url-encoded {"v":1,"code":"123456","ws":"wss://…"}>
//! ```

use serde::{Deserialize, Serialize};

use super::PairingCode;

/// Version stamped into every payload.
pub const QR_PROTOCOL_VERSION: u32 = 1;

/// Error returned when a URI is not a pairing payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QrPayloadError {
    /// The URI does not start with `<scheme>://pair?data=`.
    #[error("not a pairing uri")]
    NotPairingUri,
    /// The `data` parameter is not valid percent-encoding.
    #[error("malformed percent-encoding: {0}")]
    Encoding(String),
    /// The decoded `data` parameter is not the expected JSON.
    #[error("malformed payload: {0}")]
    Json(String),
    /// The payload carries a version this build does not understand.
    #[error("unsupported payload version {0}")]
    UnsupportedVersion(u32),
}

/// Decoded QR payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    /// Protocol version.
    pub v: u32,
    /// Pairing code.
    pub code: PairingCode,
    /// Public WebSocket URL to register on.
    pub ws: String,
}

impl QrPayload {
    /// Creates a current-version payload.
    #[must_use]
    pub fn new(code: PairingCode, ws: impl Into<String>) -> Self {
        Self {
            v: QR_PROTOCOL_VERSION,
            code,
            ws: ws.into(),
        }
    }

    /// Renders the payload as a `<scheme>://pair?data=…` URI.
    #[must_use]
    pub fn to_uri(&self, scheme: &str) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        format!("{scheme}://pair?data={}", urlencoding::encode(&json))
    }

    /// Parses a URI produced by [`Self::to_uri`] with the same `scheme`.
    ///
    /// # Errors
    ///
    /// Returns a [`QrPayloadError`] describing the first thing that did not
    /// match.
    pub fn from_uri(uri: &str, scheme: &str) -> Result<Self, QrPayloadError> {
        let encoded = uri
            .strip_prefix(scheme)
            .and_then(|rest| rest.strip_prefix("://pair?"))
            .and_then(|query| {
                query
                    .split('&')
                    .find_map(|pair| pair.strip_prefix("data="))
            })
            .ok_or(QrPayloadError::NotPairingUri)?;
        let json = urlencoding::decode(encoded)
            .map_err(|e| QrPayloadError::Encoding(e.to_string()))?;
        let payload: Self =
            serde_json::from_str(&json).map_err(|e| QrPayloadError::Json(e.to_string()))?;
        if payload.v != QR_PROTOCOL_VERSION {
            return Err(QrPayloadError::UnsupportedVersion(payload.v));
        }
        Ok(payload)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn sample() -> QrPayload {
        let Some(code) = PairingCode::from_number(48_213) else {
            panic!("valid code");
        };
        QrPayload::new(code, "wss://relay.example.com/ws?x=1&y=2")
    }

    #[test]
    fn uri_shape() {
        let uri = sample().to_uri("agiworkforce");
        assert!(uri.starts_with("agiworkforce://pair?data=%7B"));
        assert!(!uri.contains('"'));
        assert!(!uri.contains(' '));
        // The embedded ws URL's own query must not leak into ours.
        assert_eq!(uri.matches('&').count(), 0);
    }

    #[test]
    fn decodes_what_it_encodes() {
        let payload = sample();
        let decoded = QrPayload::from_uri(&payload.to_uri("agiworkforce"), "agiworkforce");
        assert_eq!(decoded, Ok(payload));
    }

    #[test]
    fn rejects_foreign_scheme() {
        let uri = sample().to_uri("other");
        assert_eq!(
            QrPayload::from_uri(&uri, "agiworkforce"),
            Err(QrPayloadError::NotPairingUri)
        );
    }

    #[test]
    fn rejects_unknown_version() {
        let uri = format!(
            "app://pair?data={}",
            urlencoding::encode(r#"{"v":2,"code":"000001","ws":"ws://x"}"#)
        );
        assert_eq!(
            QrPayload::from_uri(&uri, "app"),
            Err(QrPayloadError::UnsupportedVersion(2))
        );
    }

    #[test]
    fn rejects_bad_code() {
        let uri = format!(
            "app://pair?data={}",
            urlencoding::encode(r#"{"v":1,"code":"12","ws":"ws://x"}"#)
        );
        assert!(matches!(
            QrPayload::from_uri(&uri, "app"),
            Err(QrPayloadError::Json(_))
        ));
    }
}
