//! Allow-list markup sanitizer for stored rich text.
//!
//! # Responsibility
//! - Reduce admin-authored markup to a fixed set of tags and attributes.
//! - Produce plain-text renditions for display surfaces that take no markup.
//!
//! # Invariants
//! - Disallowed tags are removed but their text is kept, except `script` and
//!   `style` whose contents are dropped.
//! - Text is escaped so a stray `<` can never open a tag when rendered.
//! - `href` values only carry `http`, `https`, `mailto` or relative URLs.

use ammonia::{Builder, UrlRelative};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static ESCAPED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(amp|lt|gt|quot|nbsp);").expect("valid escape regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

const DROP_CONTENT_TAGS: [&str; 2] = ["script", "style"];
const SAFE_URL_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

/// Markup allowed in event titles.
pub static TITLE_POLICY: Lazy<MarkupPolicy> = Lazy::new(|| {
    MarkupPolicy::new(
        &["strong", "em", "b", "i", "br", "span"],
        &[("span", &["class", "style"])],
    )
});

/// Markup allowed in event descriptions.
pub static DESCRIPTION_POLICY: Lazy<MarkupPolicy> = Lazy::new(|| {
    MarkupPolicy::new(
        &[
            "strong", "em", "b", "i", "u", "br", "span", "p", "ul", "ol", "li", "a",
        ],
        &[
            ("a", &["href", "title", "target", "rel"]),
            ("span", &["class", "style"]),
        ],
    )
});

static PLAIN_TEXT: Lazy<MarkupPolicy> = Lazy::new(|| MarkupPolicy::new(&[], &[]));

/// Fixed allow-list of tags and per-tag attributes.
pub struct MarkupPolicy {
    cleaner: Builder<'static>,
}

impl MarkupPolicy {
    /// Builds a policy. Tag and attribute names must be lowercase.
    pub fn new(
        tags: &[&'static str],
        attributes: &[(&'static str, &[&'static str])],
    ) -> Self {
        let tag_attributes: HashMap<&'static str, HashSet<&'static str>> = attributes
            .iter()
            .map(|(tag, names)| (*tag, names.iter().copied().collect()))
            .collect();

        let mut cleaner = Builder::empty();
        cleaner
            .tags(tags.iter().copied().collect())
            .tag_attributes(tag_attributes)
            .clean_content_tags(DROP_CONTENT_TAGS.into_iter().collect())
            .url_schemes(SAFE_URL_SCHEMES.into_iter().collect())
            .url_relative(UrlRelative::PassThrough)
            .link_rel(None)
            .strip_comments(true);
        Self { cleaner }
    }

    /// Returns `input` reduced to this policy's tags and attributes.
    pub fn sanitize(&self, input: &str) -> String {
        self.cleaner.clean(input).to_string()
    }
}

/// Removes every tag and comment, collapsing whitespace.
///
/// Used for display strings such as registration confirmations.
pub fn strip_markup(input: &str) -> String {
    let escaped = PLAIN_TEXT.sanitize(input);
    let text = ESCAPED_RE.replace_all(&escaped, |caps: &regex::Captures<'_>| {
        match &caps[1] {
            "amp" => "&",
            "lt" => "<",
            "gt" => ">",
            "quot" => "\"",
            _ => " ",
        }
    });
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::{strip_markup, DESCRIPTION_POLICY, TITLE_POLICY};
    use proptest::prelude::*;

    #[test]
    fn title_policy_keeps_allowed_tags_and_strips_others() {
        let cleaned = TITLE_POLICY.sanitize("<strong>Corah</strong> <u>Orientation</u>");
        assert_eq!(cleaned, "<strong>Corah</strong> Orientation");
    }

    #[test]
    fn disallowed_attributes_are_removed() {
        let cleaned = TITLE_POLICY.sanitize(r#"<span class="hl" onclick="evil()">x</span>"#);
        assert_eq!(cleaned, r#"<span class="hl">x</span>"#);
    }

    #[test]
    fn script_contents_are_dropped() {
        let cleaned = DESCRIPTION_POLICY.sanitize("<p>hi</p><script>alert(1)</script><p>bye</p>");
        assert_eq!(cleaned, "<p>hi</p><p>bye</p>");
    }

    #[test]
    fn javascript_links_lose_their_href() {
        let cleaned =
            DESCRIPTION_POLICY.sanitize(r#"<a href="java&#09;script:alert(1)" title="t">x</a>"#);
        assert!(cleaned.starts_with("<a"));
        assert!(!cleaned.contains("href"));

        let cleaned = DESCRIPTION_POLICY.sanitize(r#"<a href=" JavaScript:alert(1)">x</a>"#);
        assert_eq!(cleaned, "<a>x</a>");
    }

    #[test]
    fn safe_links_are_kept_and_quoted() {
        let cleaned =
            DESCRIPTION_POLICY.sanitize("<a href=https://example.com/a?b=1&c=2 target=_blank>go</a>");
        assert_eq!(
            cleaned,
            r#"<a href="https://example.com/a?b=1&amp;c=2" target="_blank">go</a>"#
        );
    }

    #[test]
    fn relative_and_mailto_links_are_kept() {
        let cleaned = DESCRIPTION_POLICY
            .sanitize(r#"<a href="/events/1">a</a><a href="mailto:hi@example.com">b</a>"#);
        assert!(cleaned.contains(r#"href="/events/1""#));
        assert!(cleaned.contains(r#"href="mailto:hi@example.com""#));

        let cleaned = DESCRIPTION_POLICY.sanitize(r#"<a href="data:text/html,hi">c</a>"#);
        assert_eq!(cleaned, "<a>c</a>");
    }

    #[test]
    fn stray_angle_brackets_and_ampersands_are_escaped() {
        let cleaned = TITLE_POLICY.sanitize("1 < 2 & 3 > 2 &amp; done");
        assert_eq!(cleaned, "1 &lt; 2 &amp; 3 &gt; 2 &amp; done");
    }

    #[test]
    fn comments_are_removed() {
        let cleaned = TITLE_POLICY.sanitize("a<!-- hidden -->b<br/>c");
        assert_eq!(cleaned, "ab<br>c");
    }

    #[test]
    fn strip_markup_returns_plain_text() {
        assert_eq!(
            strip_markup("<strong>Corah</strong>\n<em>Orientation</em><script>x</script>"),
            "Corah Orientation"
        );
        assert_eq!(strip_markup("Tom &amp; Jerry <b>&lt;3</b>"), "Tom & Jerry <3");
    }

    #[test]
    fn unterminated_dropped_content_is_removed() {
        assert_eq!(DESCRIPTION_POLICY.sanitize("a<style>b"), "a");
    }

    proptest! {
        #[test]
        fn plain_text_survives_sanitizing(text in "[A-Za-z0-9 .,!?'\"-]{0,64}") {
            prop_assert_eq!(DESCRIPTION_POLICY.sanitize(&text), text);
        }

        #[test]
        fn sanitized_output_never_contains_script_tags(
            before in "[a-z <>/]{0,16}",
            after in "[a-z <>/]{0,16}",
        ) {
            let input = format!("{before}<script src=x>{after}</script>{after}");
            let cleaned = DESCRIPTION_POLICY.sanitize(&input).to_ascii_lowercase();
            prop_assert!(!cleaned.contains("<script"));
        }
    }
}
