//! Scanned-payload decoding
//!
//! A bin's QR code may carry the bare bin id, a link into the web app, or the
//! app's custom scheme. Anything else is rejected before any state mutation.

use url::Url;

/// Prefix every bin id carries, generated or provisioned
const BIN_TOKEN_PREFIX: &str = "bin_";

/// Extract a bin id from a scanned payload.
///
/// Accepted encodings:
/// - bare token: `bin_001`
/// - web link: `https://sortimate0.web.app/bin/bin_001` (also the guest-mode
///   redirect form `https://sortimate0.web.app/?bin=bin_001`)
/// - custom scheme: `sortimate://bin/bin_001`
pub fn parse_bin_id(payload: &str) -> Option<String> {
    let payload = payload.trim();

    if payload.starts_with(BIN_TOKEN_PREFIX) && !payload.contains(['/', ':', '?', ' ']) {
        return Some(payload.to_string());
    }

    let url = Url::parse(payload).ok()?;
    match url.scheme() {
        "http" | "https" | "sortimate" => {}
        _ => return None,
    }

    // Guest-mode redirects carry the id in a query parameter instead of the path
    if let Some((_, bin)) = url.query_pairs().find(|(key, _)| key == "bin") {
        if bin.starts_with(BIN_TOKEN_PREFIX) {
            return Some(bin.into_owned());
        }
    }

    let last_segment = url
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()?;
    if last_segment.starts_with(BIN_TOKEN_PREFIX) {
        return Some(last_segment.to_string());
    }

    None
}
