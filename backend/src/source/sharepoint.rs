//! SharePoint / OneDrive CSV download.
//!
//! Share links are rewritten into direct-download links, the caller's
//! cookies are forwarded as-is, and sign-in pages are reported as
//! [`SourceError::AuthRequired`] instead of being parsed as CSV.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT, COOKIE, USER_AGENT};
use reqwest::StatusCode;

use super::AuthContext;
use crate::api::logs::{log_info_indent, log_warning};
use crate::error::{SourceError, SourceResult};
use crate::models::SourceKind;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const CSV_ACCEPT: &str = "text/csv,text/plain,*/*";

static WEB_PARAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]web=1").expect("valid regex"));
static E_PARAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]e=[^&]*").expect("valid regex"));
static CSF_PARAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]csf=1").expect("valid regex"));
static AMP_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"&+").expect("valid regex"));

/// Turn a share link into a direct-download link.
///
/// `web=1` links lose their viewer parameters (`web`, `e`, `csf`); every
/// link ends up with `download=1` exactly once.
pub fn download_url(url: &str) -> String {
    if url.contains("web=1") {
        let cleaned = WEB_PARAM.replace_all(url, "");
        let cleaned = E_PARAM.replace_all(&cleaned, "");
        let cleaned = CSF_PARAM.replace_all(&cleaned, "");
        let cleaned = cleaned.replacen("?&", "?", 1);
        let cleaned = AMP_RUN.replace_all(&cleaned, "&");
        let cleaned = cleaned.trim_end_matches(['?', '&']);
        let cleaned = if cleaned.contains('?') {
            cleaned.to_string()
        } else {
            cleaned.replacen('&', "?", 1)
        };
        with_download_param(&cleaned)
    } else if !url.contains("download=1") {
        with_download_param(url)
    } else {
        url.to_string()
    }
}

fn with_download_param(url: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}download=1", url, separator)
}

/// True when a successful response is actually a login page.
pub fn looks_like_login_page(body: &str) -> bool {
    let head = body.trim_start();
    let head_lower: String = head.chars().take(16).collect::<String>().to_lowercase();
    head_lower.starts_with("<!doctype")
        || head_lower.starts_with("<html")
        || body.contains("Sign in")
        || body.contains("Microsoft account")
}

/// True when an error response points at sign-in rather than a server fault.
fn error_body_wants_sign_in(body: &str) -> bool {
    body.contains("<html") || body.contains("Sign in")
}

/// Fetch one CSV over HTTP.
pub async fn fetch_csv(
    client: &reqwest::Client,
    url: &str,
    kind: SourceKind,
    auth: Option<&AuthContext>,
) -> SourceResult<String> {
    let url = download_url(url);
    log_info_indent(format!("Fetching {} CSV from {}", kind, truncate(&url, 100)), 1);

    let mut request = client
        .get(&url)
        .header(USER_AGENT, BROWSER_USER_AGENT)
        .header(ACCEPT, CSV_ACCEPT);
    if let Some(cookie) = auth.and_then(AuthContext::cookie) {
        request = request.header(COOKIE, cookie);
    }

    let response = request
        .send()
        .await
        .map_err(|e| SourceError::unavailable(kind, e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| SourceError::unavailable(kind, e.to_string()))?;

    classify_response(kind, status, body)
}

/// Decide whether a downloaded body is CSV, a sign-in wall or a failure.
fn classify_response(kind: SourceKind, status: StatusCode, body: String) -> SourceResult<String> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        log_warning(format!("{} CSV: HTTP {}, sign-in required", kind, status));
        return Err(SourceError::auth_required(kind, format!("HTTP {}", status)));
    }

    if !status.is_success() {
        if error_body_wants_sign_in(&body) {
            return Err(SourceError::auth_required(kind, format!("HTTP {} sign-in page", status)));
        }
        return Err(SourceError::unavailable(kind, format!("HTTP {}", status)));
    }

    if looks_like_login_page(&body) {
        log_warning(format!("{} CSV: received a sign-in page instead of CSV", kind));
        return Err(SourceError::auth_required(kind, "received a sign-in page instead of CSV"));
    }

    Ok(body)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_link_becomes_download_link() {
        let url = "https://org.sharepoint.com/:x:/r/sites/hr/employees.csv?d=w123&csf=1&web=1&e=AbC";
        assert_eq!(
            download_url(url),
            "https://org.sharepoint.com/:x:/r/sites/hr/employees.csv?d=w123&download=1"
        );
    }

    #[test]
    fn test_web_param_first() {
        let url = "https://org.sharepoint.com/f.csv?web=1&e=xyz";
        assert_eq!(download_url(url), "https://org.sharepoint.com/f.csv?download=1");

        let url = "https://org.sharepoint.com/f.csv?web=1&d=w5";
        assert_eq!(download_url(url), "https://org.sharepoint.com/f.csv?d=w5&download=1");
    }

    #[test]
    fn test_download_param_added_once() {
        assert_eq!(
            download_url("https://host/f.csv"),
            "https://host/f.csv?download=1"
        );
        assert_eq!(
            download_url("https://host/f.csv?a=b"),
            "https://host/f.csv?a=b&download=1"
        );
        assert_eq!(
            download_url("https://host/f.csv?download=1"),
            "https://host/f.csv?download=1"
        );
    }

    #[test]
    fn test_login_page_detection() {
        assert!(looks_like_login_page("  <!DOCTYPE html><html>..."));
        assert!(looks_like_login_page("<html><body>Sign in to your account</body></html>"));
        assert!(looks_like_login_page("Use your Microsoft account"));
        assert!(!looks_like_login_page("id,first_name\n1,Jo\n"));
    }

    fn classify(status: u16, body: &str) -> SourceResult<String> {
        let status = StatusCode::from_u16(status).unwrap();
        classify_response(SourceKind::Employees, status, body.to_string())
    }

    #[test]
    fn test_unauthorized_and_forbidden_require_auth() {
        for status in [401, 403] {
            let err = classify(status, "id,first_name\n").unwrap_err();
            assert!(
                matches!(err, SourceError::AuthRequired { .. }),
                "HTTP {} should require auth",
                status
            );
        }
    }

    #[test]
    fn test_login_page_with_success_status_requires_auth() {
        let err = classify(200, "<!DOCTYPE html><html>Sign in</html>").unwrap_err();
        assert!(matches!(err, SourceError::AuthRequired { .. }));
    }

    #[test]
    fn test_other_error_statuses() {
        let err = classify(500, "upstream timeout").unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
        assert!(err.to_string().contains("500"));

        let err = classify(404, "<html>Sign in to continue</html>").unwrap_err();
        assert!(matches!(err, SourceError::AuthRequired { .. }));
    }

    #[test]
    fn test_csv_body_passes_through() {
        let body = classify(200, "id,first_name\n1,Jo\n").unwrap();
        assert_eq!(body, "id,first_name\n1,Jo\n");
    }

    #[test]
    fn test_error_body_detection() {
        assert!(error_body_wants_sign_in("<html>denied</html>"));
        assert!(!error_body_wants_sign_in("upstream timeout"));
    }
}
