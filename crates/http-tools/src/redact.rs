//! Secret masking for anything that leaves the process through logs or error messages.

use url::Url;

/// Replacement written in place of a sensitive header value.
pub const REDACTED: &str = "***REDACTED***";

const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "x-api-key",
    "x-auth-token",
    "cookie",
    "set-cookie",
];

/// Whether a header carries credentials (case-insensitive).
#[must_use]
pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// Copy of `headers` with credential-bearing values masked. Names keep their configured case.
#[must_use]
pub fn mask_headers(headers: &[(String, String)]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| {
            if is_sensitive_header(k) {
                (k.clone(), REDACTED.to_string())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    // Best-effort: drop credentials + query + fragment.
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_sensitive_headers_case_insensitively() {
        let headers = vec![
            ("Authorization".to_string(), "Bearer abc".to_string()),
            ("X-API-Key".to_string(), "k".to_string()),
            ("Set-Cookie".to_string(), "s=1".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        let masked = mask_headers(&headers);
        assert_eq!(masked[0], ("Authorization".to_string(), REDACTED.to_string()));
        assert_eq!(masked[1].1, REDACTED);
        assert_eq!(masked[2].1, REDACTED);
        assert_eq!(masked[3].1, "application/json");
    }

    #[test]
    fn redact_url_drops_credentials_and_query() {
        let url = Url::parse("https://user:pw@api.example.com/v1/items?token=abc#frag").expect("url");
        assert_eq!(redact_url(&url), "https://api.example.com/v1/items");
    }
}
