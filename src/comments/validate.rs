//! Visitor comment validation and content preparation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::AppError;
use crate::models::VisitorComment;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"));

/// Check a visitor comment, returning the first problem as a ValidationError.
pub fn validate_visitor_comment(comment: &VisitorComment) -> Result<(), AppError> {
    if comment.author.trim().is_empty() || comment.content.trim().is_empty() {
        return Err(AppError::Validation(
            "Name, Email and Content are required fields.".to_string(),
        ));
    }
    if !is_email(comment.email.trim()) {
        return Err(AppError::Validation("Email format not valid.".to_string()));
    }
    let website = comment.website.trim();
    if !website.is_empty() && !is_web_url(website) {
        return Err(AppError::Validation(
            "Website URL format not valid.".to_string(),
        ));
    }
    Ok(())
}

pub fn is_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

fn is_web_url(s: &str) -> bool {
    match url::Url::parse(s) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && u.host_str().is_some(),
        Err(_) => false,
    }
}

/// Escape visitor markup and keep line breaks.
///
/// Only `& < > " '` are encoded, so plain text stays readable when quoted.
pub fn escape_visitor_content(content: &str) -> String {
    html_escape::encode_quoted_attribute(content.trim())
        .replace('\r', "")
        .replace('\n', "<br/>")
}

/// Reduce stored comment HTML to plain text for notifications.
pub fn strip_markup(html: &str) -> String {
    ammonia::Builder::empty().clean(html).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visitor() -> VisitorComment {
        VisitorComment {
            author: "Reader".to_string(),
            email: "reader@example.com".to_string(),
            website: String::new(),
            content: "Nice post".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_comment_passes() {
        assert!(validate_visitor_comment(&visitor()).is_ok());

        let mut with_site = visitor();
        with_site.website = "https://reader.example.com/blog".to_string();
        assert!(validate_visitor_comment(&with_site).is_ok());
    }

    #[test]
    fn test_empty_author_is_rejected() {
        let mut c = visitor();
        c.author = "   ".to_string();
        match validate_visitor_comment(&c) {
            Err(AppError::Validation(msg)) => assert!(!msg.is_empty()),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_email_and_website() {
        let mut c = visitor();
        c.email = "not-an-email".to_string();
        assert!(matches!(
            validate_visitor_comment(&c),
            Err(AppError::Validation(m)) if m == "Email format not valid."
        ));

        let mut c = visitor();
        c.website = "javascript:alert(1)".to_string();
        assert!(matches!(
            validate_visitor_comment(&c),
            Err(AppError::Validation(m)) if m == "Website URL format not valid."
        ));
    }

    #[test]
    fn test_content_is_escaped() {
        let escaped = escape_visitor_content("<b>hi</b>\nthere");
        assert!(!escaped.contains("<b>"));
        assert!(escaped.contains("&lt;b&gt;"));
        assert!(escaped.contains("<br/>"));
    }

    #[test]
    fn test_plain_text_is_left_readable() {
        assert_eq!(escape_visitor_content("  Nice post!  "), "Nice post!");
        assert_eq!(
            escape_visitor_content("one\r\ntwo & three"),
            "one<br/>two &amp; three"
        );

        let quoted = escape_visitor_content(r#"say "hi" or 'bye'"#);
        assert!(quoted.starts_with("say "));
        assert!(!quoted.contains('"'));
        assert!(!quoted.contains('\''));
        assert!(!quoted.contains("&#32;"));
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("line<br/>next <b>bold</b>"), "linenext bold");
    }
}
