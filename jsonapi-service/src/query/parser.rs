//! JSON:API query parameter parser

use std::collections::BTreeMap;

use super::raw::{ParamValue, RawParams};
use super::{EncodingParameters, SortParam};
use crate::error::{Error, Result};

/// Top-level parameter names with JSON:API meaning
pub const RECOGNIZED_PARAMETERS: [&str; 5] = ["include", "fields", "sort", "page", "filter"];

/// Parses decoded query parameters into [`EncodingParameters`]
///
/// Recognized keys with the wrong shape fail with [`Error::MalformedQuery`].
/// Every other key is kept in `unrecognized`.
///
/// # Example
///
/// ```rust
/// use jsonapi_service::query::{parse_query_string, QueryParameterParser};
///
/// let raw = parse_query_string("sort=-name,created&include=author");
/// let params = QueryParameterParser.parse(&raw).unwrap();
///
/// let sort = params.sort.unwrap();
/// assert_eq!(sort[0].field, "name");
/// assert!(!sort[0].ascending);
/// assert_eq!(params.include_paths, Some(vec!["author".to_string()]));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParameterParser;

impl QueryParameterParser {
    /// Parse decoded parameters
    pub fn parse(&self, raw: &RawParams) -> Result<EncodingParameters> {
        let mut unrecognized = BTreeMap::new();
        for (key, value) in raw {
            if !RECOGNIZED_PARAMETERS.contains(&key.as_str()) {
                unrecognized.insert(key.clone(), value.clone());
            }
        }

        Ok(EncodingParameters {
            include_paths: raw.get("include").map(parse_include).transpose()?.flatten(),
            field_sets: raw.get("fields").map(parse_fields).transpose()?,
            sort: raw.get("sort").map(parse_sort).transpose()?,
            page: raw.get("page").map(|v| parse_string_map("page", v)).transpose()?,
            filter: raw.get("filter").map(|v| parse_string_map("filter", v)).transpose()?,
            unrecognized: (!unrecognized.is_empty()).then_some(unrecognized),
        })
    }
}

fn parse_include(value: &ParamValue) -> Result<Option<Vec<String>>> {
    let value = value
        .as_str()
        .ok_or_else(|| Error::malformed_query("include", "expected a comma-separated list of paths"))?;

    let paths: Vec<String> = split_list(value);
    Ok((!paths.is_empty()).then_some(paths))
}

fn parse_fields(value: &ParamValue) -> Result<BTreeMap<String, Vec<String>>> {
    let map = value
        .as_map()
        .ok_or_else(|| Error::malformed_query("fields", "expected fields[type]=field,field"))?;

    map.iter()
        .map(|(resource_type, fields)| -> Result<(String, Vec<String>)> {
            let fields = fields.as_str().ok_or_else(|| {
                Error::malformed_query(
                    "fields",
                    format!("fields for `{}` must be a comma-separated string", resource_type),
                )
            })?;
            Ok((resource_type.clone(), split_list(fields)))
        })
        .collect()
}

fn parse_sort(value: &ParamValue) -> Result<Vec<SortParam>> {
    let value = value
        .as_str()
        .ok_or_else(|| Error::malformed_query("sort", "expected a comma-separated list of fields"))?;

    value
        .split(',')
        .map(|token| -> Result<SortParam> {
            let token = token.trim();
            if token.is_empty() {
                return Err(Error::malformed_query("sort", "empty sort token"));
            }
            let (field, ascending) = match token.as_bytes()[0] {
                b'-' => (&token[1..], false),
                b'+' => (&token[1..], true),
                _ => (token, true),
            };
            if field.is_empty() {
                return Err(Error::malformed_query(
                    "sort",
                    format!("sort token `{}` names no field", token),
                ));
            }
            Ok(SortParam::new(field, ascending))
        })
        .collect()
}

fn parse_string_map(parameter: &str, value: &ParamValue) -> Result<BTreeMap<String, String>> {
    let map = value.as_map().ok_or_else(|| {
        Error::malformed_query(parameter, format!("expected {}[name]=value", parameter))
    })?;

    map.iter()
        .map(|(key, value)| -> Result<(String, String)> {
            let value = value.as_str().ok_or_else(|| {
                Error::malformed_query(parameter, format!("{}[{}] must be a string", parameter, key))
            })?;
            Ok((key.clone(), value.to_string()))
        })
        .collect()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
