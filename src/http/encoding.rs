//! Content negotiation for response compression.

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Deserialize;

/// Content codings the server is able to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Gzip,
}

impl Encoding {
    /// Token used in Accept-Encoding and Content-Encoding.
    pub fn token(&self) -> &'static str {
        match self {
            Encoding::Gzip => "gzip",
        }
    }

    /// Compresses `body` with this coding.
    pub fn encode(&self, body: &[u8]) -> std::io::Result<Vec<u8>> {
        match self {
            Encoding::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(body)?;
                encoder.finish()
            }
        }
    }
}

/// Returns the supported encodings named in an Accept-Encoding value.
///
/// Each comma-separated entry is reduced to the token before any space or
/// `;`, so quality values are ignored: `gzip;q=0` still selects gzip.
pub fn accepted_encodings(accept_encoding: &str, supported: &[Encoding]) -> Vec<Encoding> {
    accept_encoding
        .split(',')
        .filter_map(|entry| {
            let token = entry
                .trim()
                .split(|c: char| c == ';' || c.is_whitespace())
                .next()
                .unwrap_or("");
            supported.iter().copied().find(|enc| enc.token().eq_ignore_ascii_case(token))
        })
        .collect()
}

/// First supported encoding the client accepts, if any.
pub fn negotiate(accept_encoding: Option<&str>, supported: &[Encoding]) -> Option<Encoding> {
    accept_encoding.and_then(|value| accepted_encodings(value, supported).into_iter().next())
}
