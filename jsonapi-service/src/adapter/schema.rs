//! Field-mapping table between JSON:API members and record fields
//!
//! A [`Schema`] is built once per resource type and lists every attribute and relationship
//! with explicit getter and setter functions. Inbound documents are hydrated through this
//! table only; a member without a mapping is handled by the configured
//! [`UnknownMembers`] policy.
//!
//! # Example
//!
//! ```rust
//! use jsonapi_service::adapter::Schema;
//!
//! #[derive(Clone, Default)]
//! struct Article {
//!     title: String,
//!     author_id: Option<String>,
//!     tag_ids: Vec<String>,
//! }
//!
//! let schema = Schema::<Article>::new()
//!     .attribute("title", |a| a.title.clone(), |a, v| a.title = v)
//!     .to_one("author", "people", |a| a.author_id.clone(), |a, v| a.author_id = v)
//!     .to_many("tags", "tags", |a| a.tag_ids.clone(), |a, v| a.tag_ids = v)
//!     .column("author", "author_id");
//!
//! assert_eq!(schema.column_for("title").as_deref(), Some("title"));
//! assert_eq!(schema.column_for("author").as_deref(), Some("author_id"));
//! assert_eq!(schema.relationship_type("tags"), Some("tags"));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::UnknownMembers;
use crate::document::{RelationshipData, ResourceIdentifier, ResourceObject};
use crate::error::FieldError;

type AttributeGetter<R> = Arc<dyn Fn(&R) -> Value + Send + Sync>;
type AttributeSetter<R> = Arc<dyn Fn(&mut R, Value) -> Result<(), String> + Send + Sync>;
type LinkageGetter<R> = Arc<dyn Fn(&R) -> Linkage + Send + Sync>;
type LinkageSetter<R> = Arc<dyn Fn(&mut R, Linkage) + Send + Sync>;

/// Whether a relationship points at one resource or many
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Single related resource or none
    ToOne,
    /// Ordered list of related resources
    ToMany,
}

/// Relationship ids without their type
enum Linkage {
    One(Option<String>),
    Many(Vec<String>),
}

struct AttributeField<R> {
    get: AttributeGetter<R>,
    set: Option<AttributeSetter<R>>,
}

struct RelationshipField<R> {
    related_type: String,
    cardinality: Cardinality,
    get: LinkageGetter<R>,
    set: LinkageSetter<R>,
}

/// Mapping table for one record type
pub struct Schema<R> {
    attributes: BTreeMap<String, AttributeField<R>>,
    relationships: BTreeMap<String, RelationshipField<R>>,
    columns: HashMap<String, String>,
}

impl<R> Default for Schema<R> {
    fn default() -> Self {
        Self {
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
            columns: HashMap::new(),
        }
    }
}

impl<R> fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .field("relationships", &self.relationships.keys().collect::<Vec<_>>())
            .field("columns", &self.columns)
            .finish()
    }
}

impl<R: 'static> Schema<R> {
    /// Empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Writable attribute; values are converted with serde
    pub fn attribute<T, G, S>(mut self, name: &str, get: G, set: S) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
        G: Fn(&R) -> T + Send + Sync + 'static,
        S: Fn(&mut R, T) + Send + Sync + 'static,
    {
        let setter: AttributeSetter<R> = Arc::new(move |record: &mut R, value: Value| {
            let value = serde_json::from_value::<T>(value).map_err(|err| err.to_string())?;
            set(record, value);
            Ok(())
        });
        self.attributes.insert(
            name.to_string(),
            AttributeField {
                get: Self::getter(get),
                set: Some(setter),
            },
        );
        self
    }

    /// Attribute that is emitted but never written from a request
    pub fn read_only<T, G>(mut self, name: &str, get: G) -> Self
    where
        T: Serialize + 'static,
        G: Fn(&R) -> T + Send + Sync + 'static,
    {
        self.attributes.insert(
            name.to_string(),
            AttributeField {
                get: Self::getter(get),
                set: None,
            },
        );
        self
    }

    /// To-one relationship stored as an optional related id
    pub fn to_one<G, S>(mut self, name: &str, related_type: &str, get: G, set: S) -> Self
    where
        G: Fn(&R) -> Option<String> + Send + Sync + 'static,
        S: Fn(&mut R, Option<String>) + Send + Sync + 'static,
    {
        self.relationships.insert(
            name.to_string(),
            RelationshipField {
                related_type: related_type.to_string(),
                cardinality: Cardinality::ToOne,
                get: Arc::new(move |record: &R| Linkage::One(get(record))),
                set: Arc::new(move |record: &mut R, linkage: Linkage| {
                    if let Linkage::One(id) = linkage {
                        set(record, id);
                    }
                }),
            },
        );
        self
    }

    /// To-many relationship stored as an ordered list of related ids
    pub fn to_many<G, S>(mut self, name: &str, related_type: &str, get: G, set: S) -> Self
    where
        G: Fn(&R) -> Vec<String> + Send + Sync + 'static,
        S: Fn(&mut R, Vec<String>) + Send + Sync + 'static,
    {
        self.relationships.insert(
            name.to_string(),
            RelationshipField {
                related_type: related_type.to_string(),
                cardinality: Cardinality::ToMany,
                get: Arc::new(move |record: &R| Linkage::Many(get(record))),
                set: Arc::new(move |record: &mut R, linkage: Linkage| {
                    if let Linkage::Many(ids) = linkage {
                        set(record, ids);
                    }
                }),
            },
        );
        self
    }

    /// Override the store column a filter or sort field maps to
    pub fn column(mut self, field: &str, column: &str) -> Self {
        self.columns.insert(field.to_string(), column.to_string());
        self
    }

    fn getter<T, G>(get: G) -> AttributeGetter<R>
    where
        T: Serialize + 'static,
        G: Fn(&R) -> T + Send + Sync + 'static,
    {
        Arc::new(move |record: &R| serde_json::to_value(get(record)).unwrap_or(Value::Null))
    }
}

impl<R> Schema<R> {
    /// Store column for a filter or sort field
    ///
    /// Explicit overrides win; attributes map through [`column_name`]; `id` maps to itself.
    /// Anything else has no column.
    pub fn column_for(&self, field: &str) -> Option<String> {
        if let Some(column) = self.columns.get(field) {
            return Some(column.clone());
        }
        if field == "id" {
            return Some("id".to_string());
        }
        self.attributes
            .contains_key(field)
            .then(|| column_name(field))
    }

    /// Whether an attribute is declared
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Related resource type of a relationship
    pub fn relationship_type(&self, name: &str) -> Option<&str> {
        self.relationships
            .get(name)
            .map(|field| field.related_type.as_str())
    }

    /// Cardinality of a relationship
    pub fn cardinality(&self, name: &str) -> Option<Cardinality> {
        self.relationships.get(name).map(|field| field.cardinality)
    }

    /// Relationship names with their related types
    pub fn relationships(&self) -> impl Iterator<Item = (&str, &str)> {
        self.relationships
            .iter()
            .map(|(name, field)| (name.as_str(), field.related_type.as_str()))
    }

    /// Attribute values of a record
    pub fn read_attributes(&self, record: &R) -> Map<String, Value> {
        self.attributes
            .iter()
            .map(|(name, field)| (name.clone(), (field.get)(record)))
            .collect()
    }

    /// Linkage of every relationship of a record
    pub fn read_relationships(&self, record: &R) -> BTreeMap<String, RelationshipData> {
        self.relationships
            .iter()
            .map(|(name, field)| (name.clone(), linkage_data(field, record)))
            .collect()
    }

    /// Linkage of one relationship, `None` if it is not declared
    pub fn linkage(&self, record: &R, name: &str) -> Option<RelationshipData> {
        self.relationships
            .get(name)
            .map(|field| linkage_data(field, record))
    }

    /// Hydrate attributes and relationships present in `resource`
    ///
    /// Members absent from the document are left untouched. Every failure is collected;
    /// an empty result means the record was fully hydrated.
    pub fn hydrate(
        &self,
        record: &mut R,
        resource: &ResourceObject,
        policy: UnknownMembers,
    ) -> Vec<FieldError> {
        let mut errors = Vec::new();

        for (name, value) in &resource.attributes {
            match self.attributes.get(name) {
                Some(AttributeField { set: Some(set), .. }) => {
                    if let Err(message) = set(record, value.clone()) {
                        errors.push(FieldError::attribute(name, message));
                    }
                }
                Some(AttributeField { set: None, .. }) => {
                    errors.push(FieldError::attribute(name, "attribute is read-only"));
                }
                None if policy == UnknownMembers::Reject => {
                    errors.push(FieldError::attribute(name, "unknown attribute"));
                }
                None => tracing::debug!(attribute = %name, "Ignoring unknown attribute"),
            }
        }

        for (name, relationship) in &resource.relationships {
            if !self.relationships.contains_key(name) {
                if policy == UnknownMembers::Reject {
                    errors.push(FieldError::relationship(name, "unknown relationship"));
                } else {
                    tracing::debug!(relationship = %name, "Ignoring unknown relationship");
                }
                continue;
            }
            if let Err(error) = self.write_relationship(record, name, relationship.data.clone()) {
                errors.push(error);
            }
        }

        errors
    }

    /// Replace the linkage of a declared relationship
    ///
    /// Fails if the relationship is unknown, the linkage shape does not match its
    /// cardinality, or an identifier has the wrong type.
    pub fn write_relationship(
        &self,
        record: &mut R,
        name: &str,
        data: RelationshipData,
    ) -> Result<(), FieldError> {
        let field = self
            .relationships
            .get(name)
            .ok_or_else(|| FieldError::relationship(name, "unknown relationship"))?;

        if let Some(identifier) = data
            .identifiers()
            .into_iter()
            .find(|identifier| identifier.resource_type != field.related_type)
        {
            return Err(FieldError::relationship(
                name,
                format!(
                    "expected resources of type `{}`, got `{}`",
                    field.related_type, identifier.resource_type
                ),
            ));
        }

        let linkage = match (field.cardinality, data) {
            (Cardinality::ToOne, RelationshipData::ToOne(identifier)) => {
                Linkage::One(identifier.map(|identifier| identifier.id))
            }
            (Cardinality::ToMany, RelationshipData::ToMany(identifiers)) => {
                Linkage::Many(identifiers.into_iter().map(|identifier| identifier.id).collect())
            }
            (Cardinality::ToOne, RelationshipData::ToMany(_)) => {
                return Err(FieldError::relationship(
                    name,
                    "expected a single resource identifier or null",
                ))
            }
            (Cardinality::ToMany, RelationshipData::ToOne(_)) => {
                return Err(FieldError::relationship(
                    name,
                    "expected an array of resource identifiers",
                ))
            }
        };

        (field.set)(record, linkage);
        Ok(())
    }
}

fn linkage_data<R>(field: &RelationshipField<R>, record: &R) -> RelationshipData {
    let identifier = |id: String| ResourceIdentifier::new(field.related_type.clone(), id);
    match (field.get)(record) {
        Linkage::One(id) => RelationshipData::ToOne(id.map(identifier)),
        Linkage::Many(ids) => RelationshipData::ToMany(ids.into_iter().map(identifier).collect()),
    }
}

/// Default column naming: kebab-case and camelCase member names become snake_case
///
/// ```rust
/// use jsonapi_service::adapter::column_name;
///
/// assert_eq!(column_name("created-at"), "created_at");
/// assert_eq!(column_name("publishedOn"), "published_on");
/// assert_eq!(column_name("title"), "title");
/// ```
pub fn column_name(field: &str) -> String {
    let mut column = String::with_capacity(field.len() + 4);
    for ch in field.chars() {
        match ch {
            '-' | ' ' | '.' => column.push('_'),
            c if c.is_uppercase() => {
                if !column.is_empty() && !column.ends_with('_') {
                    column.push('_');
                }
                column.extend(c.to_lowercase());
            }
            c => column.push(c),
        }
    }
    column
}
