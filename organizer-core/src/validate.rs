//! Input validators and sanitizers.
//!
//! Every function here is pure: same input, same output (or the same
//! error), no I/O. Callers construct entities only through these, so a
//! constructed entity is always valid.
//!
//! The dangerous-content scan is a substring blacklist, not a full XSS
//! defense; callers must not rely on it as one.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use thiserror::Error;

/// Expected-bad-input error, carrying the offending field and value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub field: String,
    pub value: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, field: &str, value: &str) -> Self {
        ValidationError {
            message: message.into(),
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+]?[\d\s\-()]{7,20}$").expect("valid regex"));

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid regex"));

static WHITESPACE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^https?://((([A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+[A-Z]{2,6}\.?)|localhost|(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}))(:\d+)?(/?|[/?]\S+)$",
    )
    .expect("valid regex")
});

/// Substrings that reject text outright (case-insensitive).
const DANGEROUS_PATTERNS: [&str; 6] = [
    "<script",
    "javascript:",
    "data:text/html",
    "vbscript:",
    "onload=",
    "onerror=",
];

/// Reserved Windows device names; filenames matching these get prefixed.
const RESERVED_FILENAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Validate and sanitize a text field: trim, enforce length bounds,
/// HTML-escape unless `allow_html`, and reject blacklisted substrings.
///
/// Note: escaping is applied before the blacklist scan, so re-validating
/// already-escaped text can double-encode `&`. See DESIGN.md.
pub fn validate_text(
    text: &str,
    field: &str,
    min_length: usize,
    max_length: usize,
    allow_html: bool,
) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    let len = trimmed.chars().count();

    if len < min_length {
        return Err(ValidationError::new(
            format!("{field} must be at least {min_length} characters long"),
            field,
            trimmed,
        ));
    }
    if len > max_length {
        return Err(ValidationError::new(
            format!("{field} must be no more than {max_length} characters long"),
            field,
            trimmed,
        ));
    }

    let sanitized = if allow_html {
        trimmed.to_string()
    } else {
        escape_html(trimmed)
    };

    let lower = sanitized.to_lowercase();
    for pattern in DANGEROUS_PATTERNS {
        if lower.contains(pattern) {
            return Err(ValidationError::new(
                format!("{field} contains potentially dangerous content"),
                field,
                trimmed,
            ));
        }
    }

    Ok(sanitized)
}

/// Validate email syntax (local@domain.tld shape).
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("Email cannot be empty", "email", trimmed));
    }
    if !EMAIL_RE.is_match(trimmed) {
        return Err(ValidationError::new(
            format!("Invalid email address: {trimmed}"),
            "email",
            trimmed,
        ));
    }
    Ok(trimmed.to_string())
}

/// Validate and normalize a phone number.
///
/// Normalization: drop characters outside `[\d+\s\-()]`, collapse
/// whitespace runs to a single space, then match the international
/// pattern. Internal single spaces are preserved.
pub fn validate_phone(phone: &str) -> Result<String, ValidationError> {
    let trimmed = phone.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("Phone number cannot be empty", "phone", trimmed));
    }

    let stripped: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')') || c.is_whitespace())
        .collect();
    let normalized = WHITESPACE_RUN_RE
        .replace_all(stripped.trim(), " ")
        .into_owned();

    if !PHONE_RE.is_match(&normalized) {
        return Err(ValidationError::new(
            "Invalid phone number format. Use international format like +1234567890",
            "phone",
            trimmed,
        ));
    }

    Ok(normalized)
}

/// Best-effort datetime parse, coerced to UTC when the input is naive.
///
/// Accepts RFC 3339, naive ISO (`2024-01-15T14:30:00`, with or without
/// fractional seconds or seconds at all), space-separated variants, and
/// a bare date (midnight).
pub fn validate_datetime(raw: &str, field: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(
            format!("{field} cannot be empty"),
            field,
            trimmed,
        ));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }

    Err(ValidationError::new(
        format!("Invalid {field} format: '{trimmed}'"),
        field,
        trimmed,
    ))
}

/// Validate and deduplicate tags, preserving first-seen order.
/// Tags are lowercased; at most 10, each at most 30 chars of
/// `[a-zA-Z0-9_-]`. Empty entries are skipped.
pub fn validate_tags(tags: &[String]) -> Result<Vec<String>, ValidationError> {
    if tags.len() > 10 {
        return Err(ValidationError::new("Maximum 10 tags allowed", "tags", ""));
    }

    let mut validated: Vec<String> = Vec::new();
    for tag in tags {
        let clean = tag.trim().to_lowercase();
        if clean.is_empty() {
            continue;
        }
        if clean.chars().count() > 30 {
            return Err(ValidationError::new(
                "Tag too long (max 30 characters)",
                "tags",
                &clean,
            ));
        }
        if !TAG_RE.is_match(&clean) {
            return Err(ValidationError::new(
                "Tag contains invalid characters. Use only letters, numbers, hyphens, and underscores",
                "tags",
                &clean,
            ));
        }
        if !validated.contains(&clean) {
            validated.push(clean);
        }
    }

    Ok(validated)
}

/// Sanitize a filename: replace path separators and dangerous characters,
/// strip leading/trailing dots and spaces, and prefix reserved Windows
/// device names with `file_`.
pub fn validate_filename(filename: &str) -> Result<String, ValidationError> {
    if filename.is_empty() {
        return Err(ValidationError::new("Filename cannot be empty", "filename", filename));
    }

    let replaced: String = filename
        .chars()
        .map(|c| {
            if matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') {
                '_'
            } else {
                c
            }
        })
        .collect();
    let cleaned = replaced.trim_matches(|c| c == '.' || c == ' ').to_string();

    if cleaned.chars().count() > 255 {
        return Err(ValidationError::new(
            "Filename too long (max 255 characters)",
            "filename",
            &cleaned,
        ));
    }
    if cleaned.is_empty() {
        return Err(ValidationError::new(
            "Filename cannot be empty after sanitization",
            "filename",
            filename,
        ));
    }

    let stem = cleaned.split('.').next().unwrap_or("").to_uppercase();
    if RESERVED_FILENAMES.contains(&stem.as_str()) {
        return Ok(format!("file_{cleaned}"));
    }

    Ok(cleaned)
}

/// Reject filepaths with traversal components or NUL bytes.
pub fn validate_filepath(filepath: &str) -> Result<String, ValidationError> {
    let trimmed = filepath.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("Filepath cannot be empty", "filepath", trimmed));
    }
    if trimmed.contains('\0') {
        return Err(ValidationError::new(
            "Filepath contains invalid characters",
            "filepath",
            trimmed,
        ));
    }
    let has_traversal = trimmed
        .split(['/', '\\'])
        .any(|component| component == "..");
    if has_traversal {
        return Err(ValidationError::new(
            "Filepath must not contain traversal components",
            "filepath",
            trimmed,
        ));
    }
    Ok(trimmed.to_string())
}

/// Validate a URL: http(s) scheme plus a domain, localhost, or IPv4 host.
pub fn validate_url(url: &str, field: &str) -> Result<String, ValidationError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(
            format!("{field} cannot be empty"),
            field,
            trimmed,
        ));
    }
    if !URL_RE.is_match(trimmed) {
        return Err(ValidationError::new(
            format!("Invalid {field} format"),
            field,
            trimmed,
        ));
    }
    Ok(trimmed.to_string())
}

/// Escape the five HTML special characters.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_validate_text_trims_and_bounds() {
        assert_eq!(validate_text("  hello  ", "title", 1, 10, false).unwrap(), "hello");
        assert!(validate_text("", "title", 1, 10, false).is_err());
        assert!(validate_text("toolongtext", "title", 1, 5, false).is_err());
    }

    #[test]
    fn test_validate_text_escapes_html() {
        let out = validate_text("a < b & c", "notes", 0, 100, false).unwrap();
        assert_eq!(out, "a &lt; b &amp; c");
    }

    #[test]
    fn test_validate_text_rejects_dangerous_content() {
        // With allow_html the raw tag survives escaping and trips the scan
        assert!(validate_text("<script>alert(1)</script>", "notes", 0, 100, true).is_err());
        assert!(validate_text("click JAVASCRIPT:alert(1)", "notes", 0, 100, false).is_err());
        assert!(validate_text("x onload=evil()", "notes", 0, 100, false).is_err());
    }

    #[test]
    fn test_validate_text_idempotent_for_clean_input() {
        // Only guaranteed when nothing needs escaping; escaped output
        // would double-encode '&' on a second pass.
        let once = validate_text("Meeting with John", "title", 1, 200, false).unwrap();
        let twice = validate_text(&once, "title", 1, 200, false).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email("a@b.co").unwrap(), "a@b.co");
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("").is_err());
        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn test_validate_phone_too_short() {
        assert!(validate_phone("123").is_err());
    }

    #[test]
    fn test_validate_phone_preserves_internal_spaces() {
        assert_eq!(validate_phone("+1 234 567 8900").unwrap(), "+1 234 567 8900");
    }

    #[test]
    fn test_validate_phone_strips_junk_and_collapses_whitespace() {
        assert_eq!(validate_phone("+1 (555)  867-5309x").unwrap(), "+1 (555) 867-5309");
    }

    #[test]
    fn test_validate_datetime_rfc3339_and_naive() {
        let dt = validate_datetime("2024-01-15T14:30:00Z", "start_time").unwrap();
        assert_eq!(dt.hour(), 14);

        // Naive input is coerced to UTC
        let naive = validate_datetime("2024-01-15T14:30:00", "start_time").unwrap();
        assert_eq!(naive.hour(), 14);
        assert_eq!(naive.timezone(), Utc);

        let date_only = validate_datetime("2024-01-15", "due_date").unwrap();
        assert_eq!(date_only.hour(), 0);

        assert!(validate_datetime("next thursday-ish", "due_date").is_err());
    }

    #[test]
    fn test_validate_tags_dedup_preserves_order() {
        let tags = vec!["work".to_string(), "work".to_string(), "urgent".to_string()];
        assert_eq!(validate_tags(&tags).unwrap(), vec!["work", "urgent"]);
    }

    #[test]
    fn test_validate_tags_rejects_bad_chars_and_count() {
        assert!(validate_tags(&["has space".to_string()]).is_err());
        let too_many: Vec<String> = (0..11).map(|i| format!("t{i}")).collect();
        assert!(validate_tags(&too_many).is_err());
    }

    #[test]
    fn test_validate_filename_reserved_device_name() {
        assert_eq!(validate_filename("CON").unwrap(), "file_CON");
        assert_eq!(validate_filename("con.txt").unwrap(), "file_con.txt");
        assert_eq!(validate_filename("report.pdf").unwrap(), "report.pdf");
    }

    #[test]
    fn test_validate_filename_strips_separators() {
        assert_eq!(validate_filename("a/b\\c.txt").unwrap(), "a_b_c.txt");
        assert!(validate_filename("...").is_err());
    }

    #[test]
    fn test_validate_filepath_rejects_traversal() {
        assert!(validate_filepath("../etc/passwd").is_err());
        assert!(validate_filepath("docs/../../secret").is_err());
        assert!(validate_filepath("docs/report.txt").is_ok());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/path", "url").is_ok());
        assert!(validate_url("http://localhost:8080", "url").is_ok());
        assert!(validate_url("ftp://example.com", "url").is_err());
        assert!(validate_url("not a url", "url").is_err());
    }
}
