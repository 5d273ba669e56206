//! Error-message scrubbing applied before anything is persisted.

/// Replacement written over every secret-like token.
pub const REDACTION_MARK: &str = "[redacted]";

/// Persisted error messages are capped at this many characters.
pub const MAX_ERROR_LEN: usize = 100;

// Longest variants first so "apikey" is consumed before the bare "key"
// marker gets a chance to match inside it.
const SECRET_MARKERS: &[&str] = &[
    "api-key", "api_key", "api key", "apikey", "password", "secret", "token", "key",
];

/// Scrub and bound a raw error message for storage.
///
/// Runs on every failure path, no exceptions: markers are replaced
/// case-insensitively, then the result is cut to [`MAX_ERROR_LEN`]
/// characters.
pub fn sanitize_error(raw: &str) -> String {
    let redacted = redact_secrets(raw);
    if redacted.chars().count() <= MAX_ERROR_LEN {
        redacted
    } else {
        redacted.chars().take(MAX_ERROR_LEN).collect()
    }
}

/// Replace case-insensitive occurrences of secret-like markers.
fn redact_secrets(input: &str) -> String {
    // ASCII lowering preserves byte offsets, so marker positions found in
    // `lower` are valid char boundaries in `input`.
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        let hit = SECRET_MARKERS
            .iter()
            .find(|m| lower[i..].starts_with(*m))
            .map(|m| m.len());
        match hit {
            Some(len) => {
                out.push_str(REDACTION_MARK);
                i += len;
            }
            None => {
                let Some(ch) = input[i..].chars().next() else {
                    break;
                };
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_api_key_assignment() {
        let out = sanitize_error("request failed: apikey=abc123");
        assert_eq!(out, "request failed: [redacted]=abc123");
    }

    #[test]
    fn redaction_is_case_insensitive() {
        let out = sanitize_error("bad PASSWORD and Token here");
        assert_eq!(out, "bad [redacted] and [redacted] here");
    }

    #[test]
    fn hyphen_and_underscore_variants() {
        assert_eq!(sanitize_error("api-key"), "[redacted]");
        assert_eq!(sanitize_error("api_key"), "[redacted]");
        assert_eq!(sanitize_error("api key"), "[redacted]");
    }

    #[test]
    fn truncates_to_exactly_100_chars() {
        let long = "x".repeat(250);
        let out = sanitize_error(&long);
        assert_eq!(out.chars().count(), 100);
    }

    #[test]
    fn short_clean_message_passes_through() {
        assert_eq!(sanitize_error("connection refused"), "connection refused");
    }

    #[test]
    fn truncation_happens_after_redaction() {
        // The marker expansion may push a short input over the cap.
        let input = format!("{} tail", "secret".repeat(20));
        let out = sanitize_error(&input);
        assert!(out.chars().count() <= 100);
        assert!(out.starts_with(REDACTION_MARK));
    }
}
