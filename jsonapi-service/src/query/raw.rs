//! Raw query-string decoding with bracket notation
//!
//! `filter[author]=9&page[offset]=20&tags[]=a&tags[]=b&sort=-title` decodes into a tree:
//! `filter` and `page` become maps, `tags` a list, `sort` a scalar. A later scalar for the
//! same key replaces an earlier one.

use std::collections::BTreeMap;

use serde::Serialize;

/// Decoded query parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Plain value
    Scalar(String),
    /// Values appended with `key[]=`
    List(Vec<ParamValue>),
    /// Values keyed with `key[name]=`
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// The scalar string, if this is a scalar
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// The map, if this is a map
    pub fn as_map(&self) -> Option<&BTreeMap<String, ParamValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

/// Decoded query parameters keyed by top-level name
pub type RawParams = BTreeMap<String, ParamValue>;

enum Segment {
    Key(String),
    Push,
}

/// Decode a raw (still percent-encoded) query string
///
/// # Example
///
/// ```rust
/// use jsonapi_service::query::{parse_query_string, ParamValue};
///
/// let params = parse_query_string("fields%5Barticles%5D=title&include=author");
/// assert_eq!(params["include"], ParamValue::Scalar("author".to_string()));
/// assert!(params["fields"].as_map().is_some());
/// ```
pub fn parse_query_string(query: &str) -> RawParams {
    let mut params = RawParams::new();

    for pair in query.trim_start_matches('?').split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        if key.is_empty() {
            continue;
        }
        let (root, path) = split_key(&key);
        let slot = params
            .entry(root)
            .or_insert_with(|| ParamValue::Scalar(String::new()));
        assign(slot, &path, decode_component(value));
    }

    params
}

fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}

/// Split `name[a][]` into `name` and its bracket segments.
/// A key with unbalanced brackets is taken literally.
fn split_key(key: &str) -> (String, Vec<Segment>) {
    let Some(open) = key.find('[') else {
        return (key.to_string(), Vec::new());
    };
    if open == 0 {
        return (key.to_string(), Vec::new());
    }

    let mut segments = Vec::new();
    let mut rest = &key[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            return (key.to_string(), Vec::new());
        };
        let name = &stripped[..close];
        segments.push(if name.is_empty() {
            Segment::Push
        } else {
            Segment::Key(name.to_string())
        });
        rest = &stripped[close + 1..];
    }
    if !rest.is_empty() {
        return (key.to_string(), Vec::new());
    }

    (key[..open].to_string(), segments)
}

fn assign(slot: &mut ParamValue, path: &[Segment], value: String) {
    let Some((head, rest)) = path.split_first() else {
        *slot = ParamValue::Scalar(value);
        return;
    };

    match head {
        Segment::Key(name) => {
            if !matches!(slot, ParamValue::Map(_)) {
                *slot = ParamValue::Map(BTreeMap::new());
            }
            if let ParamValue::Map(map) = slot {
                let child = map
                    .entry(name.clone())
                    .or_insert_with(|| ParamValue::Scalar(String::new()));
                assign(child, rest, value);
            }
        }
        Segment::Push => {
            if !matches!(slot, ParamValue::List(_)) {
                *slot = ParamValue::List(Vec::new());
            }
            if let ParamValue::List(list) = slot {
                list.push(ParamValue::Scalar(String::new()));
                if let Some(last) = list.last_mut() {
                    assign(last, rest, value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(value: &str) -> ParamValue {
        ParamValue::Scalar(value.to_string())
    }

    #[test]
    fn test_plain_pairs() {
        let params = parse_query_string("include=author,comments&sort=-title");
        assert_eq!(params["include"], scalar("author,comments"));
        assert_eq!(params["sort"], scalar("-title"));
    }

    #[test]
    fn test_bracket_maps() {
        let params = parse_query_string("page[offset]=20&page[limit]=10&filter[author]=9");
        let page = params["page"].as_map().expect("page map");
        assert_eq!(page["offset"], scalar("20"));
        assert_eq!(page["limit"], scalar("10"));
        assert_eq!(params["filter"].as_map().expect("filter map")["author"], scalar("9"));
    }

    #[test]
    fn test_percent_encoded_brackets_and_plus() {
        let params = parse_query_string("fields%5Barticles%5D=title%2Cbody&filter[title]=hello+world");
        assert_eq!(
            params["fields"].as_map().expect("fields map")["articles"],
            scalar("title,body")
        );
        assert_eq!(
            params["filter"].as_map().expect("filter map")["title"],
            scalar("hello world")
        );
    }

    #[test]
    fn test_list_push() {
        let params = parse_query_string("tags[]=a&tags[]=b");
        assert_eq!(params["tags"], ParamValue::List(vec![scalar("a"), scalar("b")]));
    }

    #[test]
    fn test_nested_maps() {
        let params = parse_query_string("filter[author][name]=ann");
        let filter = params["filter"].as_map().expect("filter map");
        assert_eq!(filter["author"].as_map().expect("nested")["name"], scalar("ann"));
    }

    #[test]
    fn test_key_without_value() {
        let params = parse_query_string("include&fields[people]=");
        assert_eq!(params["include"], scalar(""));
        assert_eq!(params["fields"].as_map().expect("fields map")["people"], scalar(""));
    }

    #[test]
    fn test_later_value_replaces_earlier() {
        let params = parse_query_string("page=5&page[number]=2");
        assert!(params["page"].as_map().is_some());

        let params = parse_query_string("page[number]=2&page=5");
        assert_eq!(params["page"], scalar("5"));
    }

    #[test]
    fn test_unbalanced_brackets_are_literal() {
        let params = parse_query_string("page[offset=3&[x]=1");
        assert_eq!(params["page[offset"], scalar("3"));
        assert_eq!(params["[x]"], scalar("1"));
    }

    #[test]
    fn test_empty_query() {
        assert!(parse_query_string("").is_empty());
        assert!(parse_query_string("?&&").is_empty());
    }
}
