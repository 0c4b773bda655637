//! Post count extraction from thread page markup.
//!
//! A [`CountExtractor`] runs an ordered list of [`CountRule`]s against the
//! page body. The first rule that matches and yields a parseable number wins.
//! New page layouts are supported by adding rules, not by touching the
//! orchestration code.

pub mod payload;

use std::sync::LazyLock;

use regex::Regex;

/// Built-in rules, in priority order.
static DEFAULT_RULES: LazyLock<Vec<CountRule>> = LazyLock::new(|| {
    vec![
        CountRule::new(
            "count_label",
            r#"(?i)<span[^>]*class="commentthread_count_label"[^>]*>\s*([\d,.]+)\s*</span>"#,
            1,
        ),
        CountRule::new("comment_count", r#"(?i)"comment_count"\s*:\s*(\d+)"#, 1),
        CountRule::new("num_comments", r#"(?i)"num_comments"\s*:\s*(\d+)"#, 1),
        CountRule::new("total_count", r#"(?i)"total_count"\s*:\s*(\d+)"#, 1),
        CountRule::new(
            "tooltip",
            r#"(?i)data-tooltip-content="[^"]*?([\d,.]+)\s*(?:comments|件のコメント)"#,
            1,
        ),
        CountRule::new("review_count", r#"(?i)"reviewCount"\s*:\s*"?([\d,.]+)"#, 1),
    ]
});

/// One extraction rule: a pattern and the capture group holding the number.
#[derive(Debug, Clone)]
pub struct CountRule {
    name: String,
    pattern: Regex,
    capture: usize,
}

impl CountRule {
    /// Build a rule from a pattern known to be valid.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regex. Use [`CountRule::try_new`]
    /// for patterns supplied at runtime.
    #[must_use]
    pub fn new(name: &str, pattern: &str, capture: usize) -> Self {
        Self::try_new(name, pattern, capture).expect("invalid built-in count pattern")
    }

    /// Build a rule, rejecting invalid patterns.
    pub fn try_new(name: &str, pattern: &str, capture: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.to_string(),
            pattern: Regex::new(pattern)?,
            capture,
        })
    }

    /// Rule name, used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply this rule. `None` if it does not match or the capture is not a number.
    pub fn apply(&self, body: &str) -> Option<u64> {
        let captures = self.pattern.captures(body)?;
        let raw = captures.get(self.capture)?.as_str();
        parse_grouped_number(raw)
    }
}

/// Ordered list of count rules.
#[derive(Debug, Clone)]
pub struct CountExtractor {
    rules: Vec<CountRule>,
}

impl CountExtractor {
    /// Create an extractor with a custom rule list.
    #[must_use]
    pub fn new(rules: Vec<CountRule>) -> Self {
        Self { rules }
    }

    /// Append a rule after the existing ones.
    #[must_use]
    pub fn with_rule(mut self, rule: CountRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Extract the post count from a page body.
    pub fn extract(&self, body: &str) -> Option<u64> {
        for rule in &self.rules {
            if let Some(count) = rule.apply(body) {
                tracing::debug!(rule = rule.name(), count, "Extracted post count");
                return Some(count);
            }
        }
        tracing::debug!(rules = self.rules.len(), "No count rule matched");
        None
    }
}

impl Default for CountExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.clone())
    }
}

/// Parse a number that may contain `,` or `.` grouping separators.
///
/// Both separators are dropped, so `"12,345"` and `"12.345"` are 12345.
/// Decimal fractions are therefore not representable; locale-specific
/// separators beyond these two are not handled.
///
/// A capture made only of separators yields `None`, not zero, so the
/// extractor moves on to the next rule instead of recording an empty thread.
pub fn parse_grouped_number(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(|c| !matches!(c, ',' | '.')).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_comment_count() {
        let body = r#"<script>var data = {"comment_count": 1234, "other": 1};</script>"#;
        assert_eq!(CountExtractor::default().extract(body), Some(1234));
    }

    #[test]
    fn test_tooltip_with_grouping() {
        let body = r#"<div class="stats" data-tooltip-content="12,345 comments">12K</div>"#;
        assert_eq!(CountExtractor::default().extract(body), Some(12345));
    }

    #[test]
    fn test_tooltip_with_prefix_text() {
        let body = r#"<a data-tooltip-content="This topic has 7,001 comments">"#;
        assert_eq!(CountExtractor::default().extract(body), Some(7001));
    }

    #[test]
    fn test_japanese_tooltip() {
        let body = r#"<a data-tooltip-content="2.048 件のコメント">"#;
        assert_eq!(CountExtractor::default().extract(body), Some(2048));
    }

    #[test]
    fn test_count_label_span() {
        let body = r#"<span class="commentthread_count_label"> 1,024 </span>"#;
        assert_eq!(CountExtractor::default().extract(body), Some(1024));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let body = r#"{"total_count": 9} <span class="commentthread_count_label">55</span>"#;
        assert_eq!(CountExtractor::default().extract(body), Some(55));
    }

    #[test]
    fn test_unparseable_capture_falls_through() {
        // The label matches but only holds separators, so the JSON rule is used.
        let body = r#"<span class="commentthread_count_label">,</span> "num_comments": 8"#;
        assert_eq!(CountExtractor::default().extract(body), Some(8));
    }

    #[test]
    fn test_separator_only_capture_is_not_zero() {
        assert_eq!(parse_grouped_number(","), None);
        assert_eq!(parse_grouped_number(".,."), None);
        assert_eq!(parse_grouped_number("0"), Some(0));
        assert_eq!(parse_grouped_number("1.204"), Some(1204));
    }

    #[test]
    fn test_no_match() {
        let body = "<html><body>No comments here</body></html>";
        assert_eq!(CountExtractor::default().extract(body), None);
    }

    #[test]
    fn test_custom_rule_appended() {
        let extractor = CountExtractor::new(vec![])
            .with_rule(CountRule::try_new("posts", r"Posts:\s*([\d,]+)", 1).unwrap());
        assert_eq!(extractor.extract("Posts: 3,210"), Some(3210));
    }

    #[test]
    fn test_invalid_custom_pattern_rejected() {
        assert!(CountRule::try_new("broken", r"(\d+", 1).is_err());
    }

    #[test]
    fn test_parse_grouped_number() {
        assert_eq!(parse_grouped_number("12,345"), Some(12345));
        assert_eq!(parse_grouped_number("1,234,567"), Some(1_234_567));
        assert_eq!(parse_grouped_number("0"), Some(0));
        assert_eq!(parse_grouped_number(",."), None);
        assert_eq!(parse_grouped_number(""), None);
    }
}
