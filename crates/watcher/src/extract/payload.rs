//! Raw comment payload extraction.
//!
//! Thread pages embed their first page of comments as a JSON object passed
//! to an inline `InitializeCommentThread(...)` call. This module finds that
//! script and decodes the object argument.

use std::collections::HashMap;

use scraper::{Html, Selector};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Function name marking the script that carries the comment payload.
const INIT_MARKER: &str = "InitializeCommentThread";

/// Errors from payload extraction.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("no inline script calls {INIT_MARKER}")]
    ScriptNotFound,

    #[error("{INIT_MARKER} call has no object argument")]
    MissingObject,

    #[error("comment payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The comment-thread object embedded in a page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentThreadPayload {
    /// Total comments in the thread, when the page reports it.
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default, deserialize_with = "map_or_empty_array")]
    pub comments_raw: HashMap<String, RawComment>,
}

/// One comment as embedded by the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawComment {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub text: String,
    /// Unix timestamp, when present.
    #[serde(default)]
    pub time: Option<i64>,
}

/// A comment with its id, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub text: String,
    pub time: Option<i64>,
}

impl CommentThreadPayload {
    /// Comments ordered by timestamp, then by id.
    pub fn comments(&self) -> Vec<Comment> {
        let mut comments: Vec<Comment> = self
            .comments_raw
            .iter()
            .map(|(id, raw)| Comment {
                id: id.clone(),
                author: raw.author.clone(),
                text: raw.text.clone(),
                time: raw.time,
            })
            .collect();
        comments.sort_by(|a, b| {
            a.time
                .cmp(&b.time)
                .then_with(|| compare_ids(&a.id, &b.id))
        });
        comments
    }
}

/// Extract the comment payload from a thread page.
pub fn extract_comment_payload(html: &str) -> Result<CommentThreadPayload, PayloadError> {
    let script = find_init_script(html).ok_or(PayloadError::ScriptNotFound)?;
    decode_init_call(&script)
}

/// Text of the first inline JavaScript block calling the init function.
fn find_init_script(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script").expect("Invalid script selector");

    document
        .select(&selector)
        .filter(|el| {
            el.value()
                .attr("type")
                .is_none_or(|t| t.eq_ignore_ascii_case("text/javascript"))
        })
        .map(|el| el.text().collect::<String>())
        .find(|text| text.contains(INIT_MARKER))
}

/// Decode the first object literal passed to the init call.
///
/// Arguments after the object are ignored.
fn decode_init_call(script: &str) -> Result<CommentThreadPayload, PayloadError> {
    let call_start = script.find(INIT_MARKER).ok_or(PayloadError::ScriptNotFound)?;
    let rest = &script[call_start..];
    let object_start = rest.find('{').ok_or(PayloadError::MissingObject)?;

    let mut stream =
        serde_json::Deserializer::from_str(&rest[object_start..]).into_iter::<CommentThreadPayload>();
    match stream.next() {
        Some(result) => Ok(result?),
        None => Err(PayloadError::MissingObject),
    }
}

fn compare_ids(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<u128>(), b.parse::<u128>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Pages serialize an empty comment map as `[]`.
fn map_or_empty_array<'de, D>(deserializer: D) -> Result<HashMap<String, RawComment>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrSeq {
        Map(HashMap<String, RawComment>),
        Seq(Vec<serde_json::Value>),
    }

    match MapOrSeq::deserialize(deserializer)? {
        MapOrSeq::Map(map) => Ok(map),
        MapOrSeq::Seq(items) if items.is_empty() => Ok(HashMap::new()),
        MapOrSeq::Seq(_) => Err(serde::de::Error::custom(
            "comments_raw must be an object or an empty array",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(script: &str) -> String {
        format!(
            r#"<html><head></head><body>
            <script type="text/javascript">var g_sessionID = "abc";</script>
            <script type="text/javascript">{script}</script>
            </body></html>"#
        )
    }

    #[test]
    fn test_decodes_object_and_ignores_trailing_args() {
        let html = page(
            r#"$J(function() { InitializeCommentThread( "ForumTopic", "ForumTopic_1_2", {"total_count":2,"comments_raw":{"11":{"text":"first, with comma","author":"alice","time":100},"12":{"text":"second","author":"bob","time":200}}}, "https://example.com/comment/", 40 ); });"#,
        );

        let payload = extract_comment_payload(&html).unwrap();
        assert_eq!(payload.total_count, Some(2));

        let comments = payload.comments();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].author, "alice");
        assert_eq!(comments[0].text, "first, with comma");
        assert_eq!(comments[1].id, "12");
    }

    #[test]
    fn test_empty_array_comments() {
        let html = page(r#"InitializeCommentThread("ForumTopic", "x", {"comments_raw":[]}, "u", 40);"#);
        let payload = extract_comment_payload(&html).unwrap();
        assert!(payload.comments().is_empty());
    }

    #[test]
    fn test_missing_script() {
        let html = page("console.log('nothing here');");
        assert!(matches!(
            extract_comment_payload(&html),
            Err(PayloadError::ScriptNotFound)
        ));
    }

    #[test]
    fn test_missing_object() {
        let html = page(r#"InitializeCommentThread("ForumTopic", "x");"#);
        assert!(matches!(
            extract_comment_payload(&html),
            Err(PayloadError::MissingObject)
        ));
    }

    #[test]
    fn test_malformed_json() {
        let html = page(r#"InitializeCommentThread("a", "b", {"comments_raw": {"1": }, 40);"#);
        assert!(matches!(
            extract_comment_payload(&html),
            Err(PayloadError::Json(_))
        ));
    }

    #[test]
    fn test_ordering_falls_back_to_numeric_id() {
        let payload: CommentThreadPayload = serde_json::from_str(
            r#"{"comments_raw":{"100":{"author":"c","text":"z"},"9":{"author":"a","text":"y"}}}"#,
        )
        .unwrap();
        let ids: Vec<_> = payload.comments().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["9", "100"]);
    }
}
