//! Per-resource hooks
//!
//! A [`ResourceDefinition`] supplies everything that varies between resource types: the
//! field-mapping [`Schema`], how a blank record is created, how `filter[...]` parameters
//! become store conditions, the default ordering, and record validation.

use std::collections::BTreeMap;

use super::schema::Schema;
use crate::error::{Error, FieldError, Result};
use crate::store::{escape_like, Entity, FilterCondition, FilterOperator, FilterValue, Ordering};

/// Hooks implemented once per resource type
///
/// # Example
///
/// ```rust,ignore
/// struct Articles;
///
/// impl ResourceDefinition for Articles {
///     type Record = Article;
///
///     fn schema(&self) -> Schema<Article> {
///         Schema::new()
///             .attribute("title", |a: &Article| a.title.clone(), |a, v| a.title = v)
///             .to_one("author", "people", |a| a.author_id.clone(), |a, v| a.author_id = v)
///             .column("author", "author_id")
///     }
///
///     fn instantiate(&self) -> Article {
///         Article::default()
///     }
///
///     fn filter(&self, predicates: &mut Predicates<'_, Article>, filters: &BTreeMap<String, String>) -> Result<()> {
///         predicates.equal_all(filters)
///     }
///
///     fn default_sort(&self) -> Vec<Ordering> {
///         vec![Ordering::desc("created_at")]
///     }
/// }
/// ```
pub trait ResourceDefinition: Send + Sync + 'static {
    /// Record type persisted by the store
    type Record: Entity;

    /// Field-mapping table; called once when the adapter is built
    fn schema(&self) -> Schema<Self::Record>;

    /// Blank record to hydrate on create
    fn instantiate(&self) -> Self::Record;

    /// Translate `filter[...]` parameters into store conditions
    fn filter(
        &self,
        predicates: &mut Predicates<'_, Self::Record>,
        filters: &BTreeMap<String, String>,
    ) -> Result<()>;

    /// Ordering used when the request has no `sort`
    ///
    /// Empty means store-defined order.
    fn default_sort(&self) -> Vec<Ordering> {
        Vec::new()
    }

    /// Validate a hydrated record before it is persisted
    fn validate(&self, _record: &Self::Record) -> Vec<FieldError> {
        Vec::new()
    }
}

/// Condition builder handed to [`ResourceDefinition::filter`]
///
/// Field names are resolved through the schema; a field without a column fails with
/// [`Error::UnknownField`].
pub struct Predicates<'a, R> {
    schema: &'a Schema<R>,
    conditions: Vec<FilterCondition>,
}

impl<'a, R> Predicates<'a, R> {
    pub(crate) fn new(schema: &'a Schema<R>) -> Self {
        Self {
            schema,
            conditions: Vec::new(),
        }
    }

    pub(crate) fn into_conditions(self) -> Vec<FilterCondition> {
        self.conditions
    }

    /// Store column for a filter field
    pub fn column(&self, field: &str) -> Result<String> {
        self.schema
            .column_for(field)
            .ok_or_else(|| Error::unknown_field(field, "filter"))
    }

    /// Add a raw condition on a store column
    pub fn push(&mut self, condition: FilterCondition) {
        self.conditions.push(condition);
    }

    /// `field = value`, or `field IN (...)` when the value is comma-separated
    pub fn equal(&mut self, field: &str, value: &str) -> Result<()> {
        let column = self.column(field)?;
        let values: Vec<String> = value.split(',').map(|v| v.trim().to_string()).collect();
        let condition = if values.len() > 1 {
            FilterCondition::in_strings(column, values)
        } else {
            FilterCondition::eq(column, value.trim())
        };
        self.conditions.push(condition);
        Ok(())
    }

    /// `field <operator> value`
    pub fn compare(
        &mut self,
        field: &str,
        operator: FilterOperator,
        value: impl Into<FilterValue>,
    ) -> Result<()> {
        let column = self.column(field)?;
        self.conditions
            .push(FilterCondition::new(column, operator, value.into()));
        Ok(())
    }

    /// Case-insensitive substring match on `field`; `%` and `_` in `value` match literally
    pub fn contains(&mut self, field: &str, value: &str) -> Result<()> {
        let column = self.column(field)?;
        self.conditions
            .push(FilterCondition::like(column, format!("%{}%", escape_like(value))));
        Ok(())
    }

    /// [`equal`](Self::equal) for every filter entry
    pub fn equal_all(&mut self, filters: &BTreeMap<String, String>) -> Result<()> {
        filters
            .iter()
            .try_for_each(|(field, value)| self.equal(field, value))
    }
}
