//! Filter, ordering and window types for store queries
//!
//! # Example
//!
//! ```rust
//! use jsonapi_service::pagination::PageWindow;
//! use jsonapi_service::store::{FilterCondition, OrderDirection, Query};
//!
//! let query = Query::new()
//!     .filter(FilterCondition::eq("status", "published"))
//!     .filter(FilterCondition::gte("words", 100_i64))
//!     .order_by("created_at", OrderDirection::Descending)
//!     .window(PageWindow::new(0, 20));
//!
//! assert_eq!(query.conditions.len(), 2);
//! assert!(query.window.is_some());
//! ```

use std::cmp::Ordering as CmpOrdering;
use std::fmt;

use crate::pagination::PageWindow;

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    Descending,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// A single ordering criterion over a store column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    /// Column name
    pub column: String,
    /// Direction
    pub direction: OrderDirection,
}

impl Ordering {
    /// Ascending ordering on `column`
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Ascending,
        }
    }

    /// Descending ordering on `column`
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Descending,
        }
    }
}

/// Comparison operators for filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Pattern matching (LIKE), `%` and `_` wildcards, `\` escape, case-insensitive
    Like,
    /// Value is in a list (IN)
    In,
    /// Value is null (IS NULL)
    IsNull,
    /// Value is not null (IS NOT NULL)
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Like => write!(f, "LIKE"),
            Self::In => write!(f, "IN"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// A value stored in a column or compared in a filter condition
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// String value
    String(String),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// List of string values (for IN operator)
    StringList(Vec<String>),
    /// List of integer values (for IN operator)
    IntegerList(Vec<i64>),
    /// Null value
    Null,
}

impl FilterValue {
    /// Compare two scalar values
    ///
    /// Query-string filters arrive as strings, so a string compared with a number or boolean
    /// is parsed first. Null orders before everything else. Lists and mismatched types are
    /// incomparable.
    pub fn compare(&self, other: &FilterValue) -> Option<CmpOrdering> {
        use FilterValue::*;
        match (self, other) {
            (Null, Null) => Some(CmpOrdering::Equal),
            (Null, _) => Some(CmpOrdering::Less),
            (_, Null) => Some(CmpOrdering::Greater),
            (String(a), String(b)) => Some(a.cmp(b)),
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Integer(a), Float(b)) => (*a as f64).partial_cmp(b),
            (Float(a), Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (String(s), number @ (Integer(_) | Float(_) | Boolean(_))) => {
                parse_like(s, number)?.compare(number)
            }
            (number @ (Integer(_) | Float(_) | Boolean(_)), String(s)) => {
                number.compare(&parse_like(s, number)?)
            }
            _ => None,
        }
    }

    fn equals(&self, other: &FilterValue) -> bool {
        !matches!(self, FilterValue::Null)
            && !matches!(other, FilterValue::Null)
            && self.compare(other) == Some(CmpOrdering::Equal)
    }

    fn as_text(&self) -> Option<std::string::String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Integer(n) => Some(n.to_string()),
            Self::Float(n) => Some(n.to_string()),
            Self::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

fn parse_like(raw: &str, target: &FilterValue) -> Option<FilterValue> {
    let raw = raw.trim();
    match target {
        FilterValue::Integer(_) => raw
            .parse::<i64>()
            .map(FilterValue::Integer)
            .or_else(|_| raw.parse::<f64>().map(FilterValue::Float))
            .ok(),
        FilterValue::Float(_) => raw.parse::<f64>().map(FilterValue::Float).ok(),
        FilterValue::Boolean(_) => match raw {
            "true" | "1" => Some(FilterValue::Boolean(true)),
            "false" | "0" => Some(FilterValue::Boolean(false)),
            _ => None,
        },
        _ => None,
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for FilterValue {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(list: Vec<String>) -> Self {
        Self::StringList(list)
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(list: Vec<i64>) -> Self {
        Self::IntegerList(list)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A single filter condition over a store column
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// Column name
    pub field: String,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Equality filter (field = value)
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// Not-equal filter (field != value)
    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value.into())
    }

    /// Greater-than filter (field > value)
    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value.into())
    }

    /// Greater-than-or-equal filter (field >= value)
    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// Less-than filter (field < value)
    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThan, value.into())
    }

    /// Less-than-or-equal filter (field <= value)
    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }

    /// LIKE pattern filter
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Like, FilterValue::String(pattern.into()))
    }

    /// IN list filter for strings
    pub fn in_strings(field: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::StringList(values))
    }

    /// IN list filter for integers
    pub fn in_integers(field: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::IntegerList(values))
    }

    /// IS NULL filter
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNull, FilterValue::Null)
    }

    /// IS NOT NULL filter
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNotNull, FilterValue::Null)
    }

    /// Evaluate the condition against a column value; a missing column is null
    pub fn matches(&self, column: Option<&FilterValue>) -> bool {
        let column = column.unwrap_or(&FilterValue::Null);
        let ordering = || column.compare(&self.value);
        let has_value = !matches!(column, FilterValue::Null);

        match self.operator {
            FilterOperator::Equal => column.equals(&self.value),
            FilterOperator::NotEqual => has_value && !column.equals(&self.value),
            FilterOperator::GreaterThan => has_value && ordering() == Some(CmpOrdering::Greater),
            FilterOperator::GreaterThanOrEqual => {
                has_value && matches!(ordering(), Some(CmpOrdering::Greater | CmpOrdering::Equal))
            }
            FilterOperator::LessThan => has_value && ordering() == Some(CmpOrdering::Less),
            FilterOperator::LessThanOrEqual => {
                has_value && matches!(ordering(), Some(CmpOrdering::Less | CmpOrdering::Equal))
            }
            FilterOperator::Like => match (column.as_text(), &self.value) {
                (Some(text), FilterValue::String(pattern)) => like_match(pattern, &text),
                _ => false,
            },
            FilterOperator::In => match &self.value {
                FilterValue::StringList(items) => items
                    .iter()
                    .any(|item| column.equals(&FilterValue::String(item.clone()))),
                FilterValue::IntegerList(items) => items
                    .iter()
                    .any(|item| column.equals(&FilterValue::Integer(*item))),
                other => column.equals(other),
            },
            FilterOperator::IsNull => !has_value,
            FilterOperator::IsNotNull => has_value,
        }
    }
}

/// Case-insensitive SQL LIKE with `%` (any run) and `_` (any single character)
///
/// `\` escapes the next character, so `\%` and `\_` match literally.
fn like_match(pattern: &str, text: &str) -> bool {
    let pattern = like_tokens(&pattern.to_lowercase());
    let text: Vec<char> = text.to_lowercase().chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some(LikeToken::One) => {
                p += 1;
                t += 1;
                continue;
            }
            Some(LikeToken::Literal(c)) if *c == text[t] => {
                p += 1;
                t += 1;
                continue;
            }
            Some(LikeToken::Any) => {
                backtrack = Some((p, t));
                p += 1;
                continue;
            }
            _ => {}
        }

        let Some((star, matched)) = backtrack else {
            return false;
        };
        p = star + 1;
        t = matched + 1;
        backtrack = Some((star, matched + 1));
    }

    pattern[p..].iter().all(|token| *token == LikeToken::Any)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeToken {
    Any,
    One,
    Literal(char),
}

fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::Any,
            '_' => LikeToken::One,
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            other => LikeToken::Literal(other),
        });
    }
    tokens
}

/// Escape `%`, `_` and `\` so `value` matches literally inside a LIKE pattern
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// A store query: conditions (all must hold), orderings in priority order, optional window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Conditions combined with AND
    pub conditions: Vec<FilterCondition>,
    /// Orderings in priority order
    pub orderings: Vec<Ordering>,
    /// Page window; `None` returns every match
    pub window: Option<PageWindow>,
}

impl Query {
    /// Empty query matching everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition
    pub fn filter(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add an ordering
    pub fn order_by(mut self, column: impl Into<String>, direction: OrderDirection) -> Self {
        self.orderings.push(Ordering {
            column: column.into(),
            direction,
        });
        self
    }

    /// Restrict to a window
    pub fn window(mut self, window: PageWindow) -> Self {
        self.window = Some(window);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_direction_display() {
        assert_eq!(format!("{}", OrderDirection::Ascending), "asc");
        assert_eq!(format!("{}", OrderDirection::Descending), "desc");
    }

    #[test]
    fn test_filter_operator_display() {
        assert_eq!(format!("{}", FilterOperator::Equal), "=");
        assert_eq!(format!("{}", FilterOperator::Like), "LIKE");
        assert_eq!(format!("{}", FilterOperator::IsNotNull), "IS NOT NULL");
    }

    #[test]
    fn test_filter_value_conversions() {
        assert_eq!(FilterValue::from("a"), FilterValue::String("a".to_string()));
        assert_eq!(FilterValue::from(42_i32), FilterValue::Integer(42));
        assert_eq!(FilterValue::from(None::<i64>), FilterValue::Null);
        assert_eq!(FilterValue::from(Some(true)), FilterValue::Boolean(true));
    }

    #[test]
    fn test_compare_coerces_query_strings() {
        let stored = FilterValue::Integer(120);
        assert_eq!(
            FilterValue::from("120").compare(&stored),
            Some(CmpOrdering::Equal)
        );
        assert_eq!(stored.compare(&FilterValue::from("99")), Some(CmpOrdering::Greater));
        assert_eq!(
            FilterValue::Boolean(true).compare(&FilterValue::from("true")),
            Some(CmpOrdering::Equal)
        );
        assert_eq!(FilterValue::Integer(1).compare(&FilterValue::from("one")), None);
    }

    #[test]
    fn test_equality_conditions() {
        let condition = FilterCondition::eq("status", "draft");
        assert!(condition.matches(Some(&FilterValue::from("draft"))));
        assert!(!condition.matches(Some(&FilterValue::from("published"))));
        assert!(!condition.matches(None));

        let condition = FilterCondition::ne("status", "draft");
        assert!(condition.matches(Some(&FilterValue::from("published"))));
        assert!(!condition.matches(None));
    }

    #[test]
    fn test_range_conditions() {
        let words = FilterValue::Integer(150);
        assert!(FilterCondition::gt("words", 100_i64).matches(Some(&words)));
        assert!(FilterCondition::gte("words", "150").matches(Some(&words)));
        assert!(!FilterCondition::lt("words", 150_i64).matches(Some(&words)));
        assert!(FilterCondition::lte("words", 150_i64).matches(Some(&words)));
        assert!(!FilterCondition::gt("words", 1_i64).matches(None));
    }

    #[test]
    fn test_in_conditions() {
        let condition =
            FilterCondition::in_strings("status", vec!["draft".to_string(), "review".to_string()]);
        assert!(condition.matches(Some(&FilterValue::from("review"))));
        assert!(!condition.matches(Some(&FilterValue::from("published"))));

        let condition = FilterCondition::in_strings("author", vec!["1".to_string(), "2".to_string()]);
        assert!(condition.matches(Some(&FilterValue::Integer(2))));

        let condition = FilterCondition::in_integers("words", vec![10, 20]);
        assert!(condition.matches(Some(&FilterValue::Integer(20))));
    }

    #[test]
    fn test_null_conditions() {
        assert!(FilterCondition::is_null("deleted_at").matches(None));
        assert!(FilterCondition::is_null("deleted_at").matches(Some(&FilterValue::Null)));
        assert!(FilterCondition::is_not_null("deleted_at").matches(Some(&FilterValue::from("x"))));
    }

    #[test]
    fn test_like_patterns() {
        assert!(like_match("%json%", "All about JSON:API"));
        assert!(like_match("rust", "Rust"));
        assert!(like_match("r_st", "rust"));
        assert!(like_match("%", ""));
        assert!(like_match("a%b%c", "aXXbYYc"));
        assert!(!like_match("a%b%c", "aXXbYY"));
        assert!(!like_match("rust", "rusty"));
        assert!(like_match("100\\%", "100%"));
        assert!(!like_match("100\\%", "1000"));
        assert!(!like_match("\\_", "a"));
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");

        let condition = FilterCondition::like("title", "%api");
        assert!(condition.matches(Some(&FilterValue::from("JSON:API"))));
        assert!(!condition.matches(None));
    }

    #[test]
    fn test_query_builder() {
        let query = Query::new()
            .filter(FilterCondition::eq("status", "draft"))
            .order_by("title", OrderDirection::Descending)
            .window(PageWindow::new(10, 5));

        assert_eq!(query.conditions.len(), 1);
        assert_eq!(query.orderings, vec![Ordering::desc("title")]);
        assert_eq!(query.window, Some(PageWindow::new(10, 5)));
    }
}
