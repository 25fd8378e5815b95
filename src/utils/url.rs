// src/utils/url.rs

//! URL manipulation utilities.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::error::{AppError, Result};

/// Query parameter carrying the listing page number.
pub const PAGE_PARAM: &str = "pg";

/// Read the page number from a listing URL. Absent or unparseable values read as 1.
pub fn page_number(url: &Url) -> u32 {
    url.query_pairs()
        .find(|(key, _)| key == PAGE_PARAM)
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(1)
}

/// Build the URL of the following listing page.
///
/// # Examples
/// ```
/// use jobcrawler::utils::url::next_page_url;
///
/// assert_eq!(
///     next_page_url("https://remoteok.com/remote-jobs").unwrap(),
///     "https://remoteok.com/remote-jobs?pg=2"
/// );
/// ```
pub fn next_page_url(current: &str) -> Result<String> {
    let mut url = Url::parse(current)?;
    let next = page_number(&url)
        .checked_add(1)
        .ok_or_else(|| AppError::validation(format!("page number overflows in {current}")))?;

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != PAGE_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair(PAGE_PARAM, &next.to_string());

    Ok(url.to_string())
}

/// Compose a canonical detail URL from a job id or slug.
pub fn compose_detail_url(base: &Url, template: &str, id: &str) -> Option<String> {
    let id = id.trim().trim_matches('/');
    if id.is_empty() {
        return None;
    }
    base.join(&template.replace("{id}", id))
        .ok()
        .map(|u| u.to_string())
}

/// Extract a navigation target from an inline script attribute such as
/// `onclick="window.location='/remote-jobs/123'"`.
pub fn extract_script_url(script: &str) -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| {
            Regex::new(
                r#"(?:location(?:\.href)?\s*=|location\.(?:assign|replace)\s*\(|window\.open\s*\(|openJob\s*\()\s*['"]([^'"]+)['"]"#,
            )
            .ok()
        })
        .as_ref()?;

    pattern
        .captures(script)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_page_without_param() {
        assert_eq!(
            next_page_url("https://remoteok.com/remote-jobs").unwrap(),
            "https://remoteok.com/remote-jobs?pg=2"
        );
    }

    #[test]
    fn test_next_page_increments_param() {
        let next = next_page_url("https://remoteok.com/remote-jobs?pg=5").unwrap();
        assert_eq!(next, "https://remoteok.com/remote-jobs?pg=6");
    }

    #[test]
    fn test_next_page_rejects_overflowing_param() {
        let result = next_page_url("https://remoteok.com/remote-jobs?pg=4294967295");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_next_page_keeps_other_params() {
        let next = next_page_url("https://remoteok.com/remote-jobs?tag=rust&pg=3").unwrap();
        let parsed = Url::parse(&next).unwrap();
        assert_eq!(page_number(&parsed), 4);
        assert!(next.contains("tag=rust"));
    }

    #[test]
    fn test_next_page_rejects_garbage() {
        assert!(next_page_url("not a url").is_err());
    }

    #[test]
    fn test_page_number_defaults_to_one() {
        let url = Url::parse("https://remoteok.com/remote-jobs?pg=abc").unwrap();
        assert_eq!(page_number(&url), 1);
    }

    #[test]
    fn test_compose_detail_url() {
        let base = Url::parse("https://remoteok.com").unwrap();
        assert_eq!(
            compose_detail_url(&base, "/remote-jobs/{id}", "123456").as_deref(),
            Some("https://remoteok.com/remote-jobs/123456")
        );
        assert_eq!(compose_detail_url(&base, "/remote-jobs/{id}", "  "), None);
    }

    #[test]
    fn test_extract_script_url() {
        assert_eq!(
            extract_script_url("window.location='/remote-jobs/42'").as_deref(),
            Some("/remote-jobs/42")
        );
        assert_eq!(
            extract_script_url("location.href = \"https://remoteok.com/l/7\"; return false;")
                .as_deref(),
            Some("https://remoteok.com/l/7")
        );
        assert_eq!(
            extract_script_url("window.open('/remote-jobs/9', '_blank')").as_deref(),
            Some("/remote-jobs/9")
        );
        assert_eq!(extract_script_url("trackClick(3)"), None);
    }
}
