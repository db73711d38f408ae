//! Typed resource adapter
//!
//! [`ResourceAdapter`] runs the CRUD and query pipeline for one resource type on top of a
//! [`ResourceDefinition`] and a [`Store`]. Listing and counting share one query builder so
//! both always apply the same filter predicate.

use async_trait::async_trait;

use super::definition::{Predicates, ResourceDefinition};
use super::schema::Schema;
use super::{Adapter, Record};
use crate::classifier::RelationshipMutation;
use crate::config::UnknownMembers;
use crate::document::{RelationshipData, ResourceObject, ResourceParts};
use crate::error::{Error, FieldError, Result};
use crate::pagination::PageWindow;
use crate::query::EncodingParameters;
use crate::store::{Entity, OrderDirection, Ordering, Query, Store};

/// CRUD and query pipeline for one resource type
pub struct ResourceAdapter<D: ResourceDefinition, S> {
    definition: D,
    store: S,
    schema: Schema<D::Record>,
}

impl<D, S> ResourceAdapter<D, S>
where
    D: ResourceDefinition,
    S: Store<D::Record>,
{
    /// Build an adapter; the definition's schema is built here, once
    pub fn new(definition: D, store: S) -> Self {
        let schema = definition.schema();
        Self {
            definition,
            store,
            schema,
        }
    }

    /// Field-mapping table
    pub fn schema(&self) -> &Schema<D::Record> {
        &self.schema
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Store query for the request's filter and sort
    ///
    /// Used by both [`query`](Self::query) and [`count`](Self::count).
    pub fn build_query(&self, params: &EncodingParameters) -> Result<Query> {
        let mut predicates = Predicates::new(&self.schema);
        if let Some(filters) = params.filter.as_ref().filter(|f| !f.is_empty()) {
            self.definition.filter(&mut predicates, filters)?;
        }

        let orderings = match params.sort.as_deref() {
            Some(sort) if !sort.is_empty() => sort
                .iter()
                .map(|param| -> Result<Ordering> {
                    let column = self
                        .schema
                        .column_for(&param.field)
                        .ok_or_else(|| Error::unknown_field(&param.field, "sort"))?;
                    let direction = if param.ascending {
                        OrderDirection::Ascending
                    } else {
                        OrderDirection::Descending
                    };
                    Ok(Ordering { column, direction })
                })
                .collect::<Result<Vec<_>>>()?,
            _ => self.definition.default_sort(),
        };

        Ok(Query {
            conditions: predicates.into_conditions(),
            orderings,
            window: None,
        })
    }

    /// Records matching the request's filter, sorted, restricted to `window`
    pub async fn query(
        &self,
        params: &EncodingParameters,
        window: Option<PageWindow>,
    ) -> Result<Vec<D::Record>> {
        let mut query = self.build_query(params)?;
        query.window = window;
        Ok(self.store.fetch(&query).await?)
    }

    /// Number of records matching the request's filter
    pub async fn count(&self, params: &EncodingParameters) -> Result<u64> {
        let query = self.build_query(params)?;
        Ok(self.store.count(&query).await?)
    }

    /// Look up a record; absence is not an error
    pub async fn find(&self, id: &str) -> Result<Option<D::Record>> {
        Ok(self.store.find(id).await?)
    }

    /// Look up a record that must exist
    pub async fn read(&self, id: &str) -> Result<D::Record> {
        self.find(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("resource `{}` does not exist", id)))
    }

    /// Hydrate a new record from `resource` and persist it
    pub async fn create(
        &self,
        resource: &ResourceObject,
        policy: UnknownMembers,
    ) -> Result<D::Record> {
        let mut record = self.definition.instantiate();
        if let Some(id) = &resource.id {
            record.set_id(id.clone());
        }

        self.bind(&mut record, resource, policy)?;
        Ok(self.store.insert(record).await?)
    }

    /// Hydrate the members present in `resource` onto `record` and persist it
    pub async fn update(
        &self,
        mut record: D::Record,
        resource: &ResourceObject,
        policy: UnknownMembers,
    ) -> Result<D::Record> {
        self.bind(&mut record, resource, policy)?;
        Ok(self.store.update(record).await?)
    }

    /// Remove a record
    pub async fn delete(&self, record: &D::Record) -> Result<()> {
        let id = persisted_id(record)?;
        if !self.store.remove(id).await? {
            return Err(Error::NotFound(format!("resource `{}` does not exist", id)));
        }
        Ok(())
    }

    /// Linkage of a declared relationship
    pub fn relationship(&self, record: &D::Record, name: &str) -> Result<RelationshipData> {
        self.schema
            .linkage(record, name)
            .ok_or_else(|| Error::NotFound(format!("relationship `{}` does not exist", name)))
    }

    /// Replace, extend or shrink relationship linkage and persist the record
    ///
    /// Adding and removing members is only defined for to-many relationships.
    pub async fn update_relationship(
        &self,
        mut record: D::Record,
        name: &str,
        data: RelationshipData,
        mutation: RelationshipMutation,
    ) -> Result<D::Record> {
        let current = self.relationship(&record, name)?;

        let next = match (mutation, current, data) {
            (RelationshipMutation::Replace, _, data) => data,
            (_, RelationshipData::ToOne(_), _) => {
                return Err(Error::Forbidden(format!(
                    "relationship `{}` is to-one and can only be replaced",
                    name
                )))
            }
            (_, RelationshipData::ToMany(_), RelationshipData::ToOne(_)) => {
                return Err(Error::ValidationFailed(vec![FieldError::relationship(
                    name,
                    "expected an array of resource identifiers",
                )]))
            }
            (RelationshipMutation::Add, RelationshipData::ToMany(mut members), RelationshipData::ToMany(added)) => {
                for identifier in added {
                    if !members.contains(&identifier) {
                        members.push(identifier);
                    }
                }
                RelationshipData::ToMany(members)
            }
            (RelationshipMutation::Remove, RelationshipData::ToMany(mut members), RelationshipData::ToMany(removed)) => {
                members.retain(|identifier| !removed.contains(identifier));
                RelationshipData::ToMany(members)
            }
        };

        let mut errors = Vec::new();
        if let Err(error) = self.schema.write_relationship(&mut record, name, next) {
            errors.push(error);
        }
        errors.extend(self.definition.validate(&record));
        if !errors.is_empty() {
            return Err(Error::ValidationFailed(errors));
        }

        Ok(self.store.update(record).await?)
    }

    /// Reflect a record into its JSON:API members
    pub fn parts(&self, resource_type: &str, record: &D::Record) -> Result<ResourceParts> {
        Ok(ResourceParts {
            resource_type: resource_type.to_string(),
            id: persisted_id(record)?.to_string(),
            attributes: self.schema.read_attributes(record),
            relationships: self.schema.read_relationships(record),
        })
    }

    fn bind(
        &self,
        record: &mut D::Record,
        resource: &ResourceObject,
        policy: UnknownMembers,
    ) -> Result<()> {
        let mut errors = self.schema.hydrate(record, resource, policy);
        errors.extend(self.definition.validate(record));
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::ValidationFailed(errors))
        }
    }

    fn downcast(record: Record) -> Result<D::Record> {
        record.downcast::<D::Record>()
    }
}

fn persisted_id<R: Entity>(record: &R) -> Result<&str> {
    record
        .id()
        .ok_or_else(|| Error::unhandled("MissingId", "store returned a record without an id"))
}

#[async_trait]
impl<D, S> Adapter for ResourceAdapter<D, S>
where
    D: ResourceDefinition,
    S: Store<D::Record>,
{
    fn relationship_type(&self, name: &str) -> Option<String> {
        self.schema.relationship_type(name).map(str::to_string)
    }

    fn relationships(&self) -> Vec<(String, String)> {
        self.schema
            .relationships()
            .map(|(name, related)| (name.to_string(), related.to_string()))
            .collect()
    }

    async fn query(
        &self,
        params: &EncodingParameters,
        window: Option<PageWindow>,
    ) -> Result<Vec<Record>> {
        let records = ResourceAdapter::query(self, params, window).await?;
        Ok(records.into_iter().map(Record::new).collect())
    }

    async fn count(&self, params: &EncodingParameters) -> Result<u64> {
        ResourceAdapter::count(self, params).await
    }

    async fn find(&self, id: &str) -> Result<Option<Record>> {
        Ok(ResourceAdapter::find(self, id).await?.map(Record::new))
    }

    async fn read(&self, id: &str) -> Result<Record> {
        ResourceAdapter::read(self, id).await.map(Record::new)
    }

    async fn create(&self, resource: &ResourceObject, policy: UnknownMembers) -> Result<Record> {
        ResourceAdapter::create(self, resource, policy)
            .await
            .map(Record::new)
    }

    async fn update(
        &self,
        record: Record,
        resource: &ResourceObject,
        policy: UnknownMembers,
    ) -> Result<Record> {
        let record = Self::downcast(record)?;
        ResourceAdapter::update(self, record, resource, policy)
            .await
            .map(Record::new)
    }

    async fn delete(&self, record: Record) -> Result<()> {
        let record = Self::downcast(record)?;
        ResourceAdapter::delete(self, &record).await
    }

    fn relationship(&self, record: &Record, name: &str) -> Result<RelationshipData> {
        ResourceAdapter::relationship(self, record.downcast_ref::<D::Record>()?, name)
    }

    async fn update_relationship(
        &self,
        record: Record,
        name: &str,
        data: RelationshipData,
        mutation: RelationshipMutation,
    ) -> Result<Record> {
        let record = Self::downcast(record)?;
        ResourceAdapter::update_relationship(self, record, name, data, mutation)
            .await
            .map(Record::new)
    }

    fn resource(&self, resource_type: &str, record: &Record) -> Result<ResourceParts> {
        self.parts(resource_type, record.downcast_ref::<D::Record>()?)
    }
}
