//! Query translation
//!
//! Maps a Prometheus remote read query onto a StoreAPI `SeriesRequest`:
//! the time range is copied verbatim, only raw (non-downsampled) chunks are
//! requested, and matchers named in the per-request ignore set are dropped.

use std::collections::HashSet;

use super::error::{ReadError, ReadResult};
use crate::proto::{prompb, storepb};

/// Query parameter carrying matcher names to drop
pub const IGNORE_PARAM: &str = "ignore";

/// Matcher names the caller asked to leave out of the store request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoredMatchers {
    names: HashSet<String>,
}

impl IgnoredMatchers {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Collect every `ignore` parameter from a raw URL query string
    ///
    /// The parameter may be repeated and each value may hold a comma
    /// separated list: `?ignore=a&ignore=b,c`.
    pub fn from_query_string(query: Option<&str>) -> Self {
        let mut names = HashSet::new();
        for pair in query.unwrap_or_default().split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            if decode_component(key) != IGNORE_PARAM {
                continue;
            }
            names.extend(
                decode_component(value)
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
            );
        }
        Self { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Decode a form-encoded query component, leaving invalid escapes as-is
fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.clone())
}

/// Build the store request for one remote read query
pub fn series_request(
    query: &prompb::Query,
    ignored: &IgnoredMatchers,
) -> ReadResult<storepb::SeriesRequest> {
    let matchers = query
        .matchers
        .iter()
        .filter(|m| !ignored.contains(&m.name))
        .map(translate_matcher)
        .collect::<ReadResult<Vec<_>>>()?;

    Ok(storepb::SeriesRequest {
        min_time: query.start_timestamp_ms,
        max_time: query.end_timestamp_ms,
        matchers,
        // Prometheus knows nothing about Thanos downsampling
        aggregates: vec![storepb::Aggr::Raw as i32],
        ..Default::default()
    })
}

fn translate_matcher(matcher: &prompb::LabelMatcher) -> ReadResult<storepb::LabelMatcher> {
    let kind = prompb::MatcherType::try_from(matcher.r#type).map_err(|_| {
        ReadError::Translation(format!(
            "unknown matcher type {} for label {:?}",
            matcher.r#type, matcher.name
        ))
    })?;

    Ok(storepb::LabelMatcher {
        r#type: store_matcher_type(kind) as i32,
        name: matcher.name.clone(),
        value: matcher.value.clone(),
    })
}

fn store_matcher_type(kind: prompb::MatcherType) -> storepb::MatcherType {
    match kind {
        prompb::MatcherType::Eq => storepb::MatcherType::Eq,
        prompb::MatcherType::Neq => storepb::MatcherType::Neq,
        prompb::MatcherType::Re => storepb::MatcherType::Re,
        prompb::MatcherType::Nre => storepb::MatcherType::Nre,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompb::{LabelMatcher, MatcherType};

    fn basic_query() -> prompb::Query {
        prompb::Query {
            start_timestamp_ms: 1_000,
            end_timestamp_ms: 2_000,
            matchers: vec![
                LabelMatcher::new(MatcherType::Eq, "__name__", "test"),
                LabelMatcher::new(MatcherType::Re, "job", "testing"),
                LabelMatcher::new(MatcherType::Eq, "ignorethis", "blah"),
            ],
        }
    }

    #[test]
    fn test_ignored_matcher_dropped() {
        let ignored = IgnoredMatchers::from_query_string(Some("ignore=ignorethis"));
        let request = series_request(&basic_query(), &ignored).unwrap();

        assert_eq!(request.matchers.len(), 2);
        assert_eq!(request.matchers[0].name, "__name__");
        assert_eq!(request.matchers[0].value, "test");
        assert_eq!(request.matchers[0].r#type, storepb::MatcherType::Eq as i32);
        assert_eq!(request.matchers[1].name, "job");
        assert_eq!(request.matchers[1].value, "testing");
        assert_eq!(request.matchers[1].r#type, storepb::MatcherType::Re as i32);
    }

    #[test]
    fn test_time_range_and_raw_aggregate() {
        let request = series_request(&basic_query(), &IgnoredMatchers::default()).unwrap();

        assert_eq!(request.min_time, 1_000);
        assert_eq!(request.max_time, 2_000);
        assert_eq!(request.aggregates, vec![storepb::Aggr::Raw as i32]);
        assert_eq!(request.matchers.len(), 3);
    }

    #[test]
    fn test_operator_table() {
        for (prom, store) in [
            (MatcherType::Eq, storepb::MatcherType::Eq),
            (MatcherType::Neq, storepb::MatcherType::Neq),
            (MatcherType::Re, storepb::MatcherType::Re),
            (MatcherType::Nre, storepb::MatcherType::Nre),
        ] {
            let translated = translate_matcher(&LabelMatcher::new(prom, "a", "b")).unwrap();
            assert_eq!(translated.r#type, store as i32);
        }
    }

    #[test]
    fn test_all_matchers_ignored() {
        let query = prompb::Query {
            matchers: vec![LabelMatcher::new(MatcherType::Eq, "x", "1")],
            ..Default::default()
        };
        let request = series_request(&query, &IgnoredMatchers::new(["x"])).unwrap();
        assert!(request.matchers.is_empty());
    }

    #[test]
    fn test_unknown_matcher_type() {
        let query = prompb::Query {
            matchers: vec![LabelMatcher {
                r#type: 9,
                name: "job".to_string(),
                value: "x".to_string(),
            }],
            ..Default::default()
        };
        let err = series_request(&query, &IgnoredMatchers::default()).unwrap_err();
        assert!(matches!(err, ReadError::Translation(_)));
    }

    #[test]
    fn test_query_string_parsing() {
        let ignored =
            IgnoredMatchers::from_query_string(Some("ignore=a&foo=bar&ignore=b%2Cc&ignore="));
        assert!(ignored.contains("a"));
        assert!(ignored.contains("b"));
        assert!(ignored.contains("c"));
        assert!(!ignored.contains("foo"));
        assert!(!ignored.contains(""));

        assert!(IgnoredMatchers::from_query_string(None).is_empty());
        assert!(IgnoredMatchers::from_query_string(Some("ignore")).is_empty());
    }
}
