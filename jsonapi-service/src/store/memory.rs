//! In-memory store
//!
//! Records are kept in insertion order behind a `tokio` read/write lock. Conditions and
//! orderings are evaluated through [`Entity::column`]; `id` is always available as a column.

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{
    Entity, FilterValue, OrderDirection, Query, Store, StoreError, StoreOperation, StoreResult,
};

/// In-memory [`Store`] for tests, demos and prototyping
///
/// Cloning shares the underlying records.
///
/// # Example
///
/// ```rust,ignore
/// let store = MemoryStore::new("articles");
/// let article = store.insert(Article::new("Hello")).await?;
/// assert!(article.id().is_some());
/// ```
#[derive(Debug)]
pub struct MemoryStore<R> {
    entity_type: String,
    records: Arc<RwLock<Vec<R>>>,
}

impl<R> Clone for MemoryStore<R> {
    fn clone(&self) -> Self {
        Self {
            entity_type: self.entity_type.clone(),
            records: Arc::clone(&self.records),
        }
    }
}

impl<R: Entity> MemoryStore<R> {
    /// Empty store; `entity_type` appears in error context
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Store seeded with records; records without an id get one assigned
    pub fn with_records(entity_type: impl Into<String>, records: impl IntoIterator<Item = R>) -> Self {
        let records = records
            .into_iter()
            .map(|mut record| {
                if record.id().is_none() {
                    record.set_id(uuid::Uuid::new_v4().to_string());
                }
                record
            })
            .collect();

        Self {
            entity_type: entity_type.into(),
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn matches(query: &Query, record: &R) -> bool {
        query
            .conditions
            .iter()
            .all(|condition| condition.matches(column(record, &condition.field).as_ref()))
    }
}

fn column<R: Entity>(record: &R, name: &str) -> Option<FilterValue> {
    if name == "id" {
        return record.id().map(FilterValue::from);
    }
    record.column(name)
}

fn compare<R: Entity>(query: &Query, a: &R, b: &R) -> CmpOrdering {
    for ordering in &query.orderings {
        let left = column(a, &ordering.column).unwrap_or(FilterValue::Null);
        let right = column(b, &ordering.column).unwrap_or(FilterValue::Null);
        let result = left.compare(&right).unwrap_or(CmpOrdering::Equal);
        let result = match ordering.direction {
            OrderDirection::Ascending => result,
            OrderDirection::Descending => result.reverse(),
        };
        if result != CmpOrdering::Equal {
            return result;
        }
    }
    CmpOrdering::Equal
}

impl<R: Entity> Store<R> for MemoryStore<R> {
    async fn find(&self, id: &str) -> StoreResult<Option<R>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id() == Some(id)).cloned())
    }

    async fn fetch(&self, query: &Query) -> StoreResult<Vec<R>> {
        let records = self.records.read().await;
        let mut matched: Vec<R> = records
            .iter()
            .filter(|record| Self::matches(query, record))
            .cloned()
            .collect();
        drop(records);

        // Stable sort keeps insertion order as the final tie-break
        matched.sort_by(|a, b| compare(query, a, b));

        Ok(match query.window {
            Some(window) => matched
                .into_iter()
                .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
                .take(usize::try_from(window.limit).unwrap_or(usize::MAX))
                .collect(),
            None => matched,
        })
    }

    async fn count(&self, query: &Query) -> StoreResult<u64> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|record| Self::matches(query, record))
            .count() as u64)
    }

    async fn insert(&self, mut record: R) -> StoreResult<R> {
        let mut records = self.records.write().await;

        let id = match record.id() {
            Some(id) => id.to_string(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                record.set_id(id.clone());
                id
            }
        };

        if records.iter().any(|r| r.id() == Some(id.as_str())) {
            return Err(StoreError::already_exists(&self.entity_type, id));
        }

        records.push(record.clone());
        tracing::debug!(entity = %self.entity_type, id = %id, "Inserted record");
        Ok(record)
    }

    async fn update(&self, record: R) -> StoreResult<R> {
        let id = record.id().map(str::to_string).ok_or_else(|| {
            StoreError::constraint_violation(StoreOperation::Update, "record has no id")
        })?;

        let mut records = self.records.write().await;
        let slot = records
            .iter_mut()
            .find(|r| r.id() == Some(id.as_str()))
            .ok_or_else(|| StoreError::not_found(StoreOperation::Update, &self.entity_type, &id))?;

        *slot = record.clone();
        tracing::debug!(entity = %self.entity_type, id = %id, "Updated record");
        Ok(record)
    }

    async fn remove(&self, id: &str) -> StoreResult<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id() != Some(id));
        let removed = records.len() != before;
        if removed {
            tracing::debug!(entity = %self.entity_type, id = %id, "Removed record");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::PageWindow;
    use crate::store::{FilterCondition, StoreErrorKind};

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: Option<String>,
        title: String,
        rank: i64,
    }

    impl Note {
        fn new(id: &str, title: &str, rank: i64) -> Self {
            Self {
                id: Some(id.to_string()),
                title: title.to_string(),
                rank,
            }
        }
    }

    impl Entity for Note {
        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }

        fn column(&self, name: &str) -> Option<FilterValue> {
            match name {
                "title" => Some(self.title.clone().into()),
                "rank" => Some(self.rank.into()),
                _ => None,
            }
        }
    }

    fn seeded() -> MemoryStore<Note> {
        MemoryStore::with_records(
            "notes",
            vec![
                Note::new("1", "banana", 2),
                Note::new("2", "apple", 3),
                Note::new("3", "cherry", 1),
                Note::new("4", "apple pie", 3),
            ],
        )
    }

    #[tokio::test]
    async fn test_find() {
        let store = seeded();
        assert_eq!(store.find("2").await.expect("find").map(|n| n.title), Some("apple".into()));
        assert_eq!(store.find("99").await.expect("find"), None);
    }

    #[tokio::test]
    async fn test_fetch_filters_and_orders() {
        let store = seeded();
        let query = Query::new()
            .filter(FilterCondition::like("title", "apple%"))
            .order_by("title", OrderDirection::Descending);

        let notes = store.fetch(&query).await.expect("fetch");
        let titles: Vec<_> = notes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["apple pie", "apple"]);
    }

    #[tokio::test]
    async fn test_fetch_multiple_orderings_and_stable_ties() {
        let store = seeded();
        let query = Query::new().order_by("rank", OrderDirection::Descending);
        let ids: Vec<_> = store
            .fetch(&query)
            .await
            .expect("fetch")
            .into_iter()
            .filter_map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["2", "4", "1", "3"]);
    }

    #[tokio::test]
    async fn test_fetch_window_and_count_agree() {
        let store = seeded();
        let query = Query::new()
            .filter(FilterCondition::gte("rank", "2"))
            .order_by("id", OrderDirection::Ascending)
            .window(PageWindow::new(1, 1));

        let page = store.fetch(&query).await.expect("fetch");
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id.as_deref(), Some("2"));

        assert_eq!(store.count(&query).await.expect("count"), 3);
        assert_eq!(
            store.fetch(&Query { window: None, ..query.clone() }).await.expect("fetch").len() as u64,
            store.count(&query).await.expect("count")
        );
    }

    #[tokio::test]
    async fn test_insert_assigns_id() {
        let store = MemoryStore::new("notes");
        let note = store
            .insert(Note {
                id: None,
                title: "new".into(),
                rank: 0,
            })
            .await
            .expect("insert");

        let id = note.id.clone().expect("assigned id");
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        assert_eq!(store.len().await, 1);
        assert_eq!(store.find(&id).await.expect("find"), Some(note));
    }

    #[tokio::test]
    async fn test_insert_duplicate_id() {
        let store = seeded();
        let err = store.insert(Note::new("1", "dup", 0)).await.unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::AlreadyExists);
        assert_eq!(store.len().await, 4);
    }

    #[tokio::test]
    async fn test_update() {
        let store = seeded();
        let mut note = store.find("3").await.expect("find").expect("exists");
        note.title = "cherries".into();
        store.update(note).await.expect("update");
        assert_eq!(store.find("3").await.expect("find").map(|n| n.title), Some("cherries".into()));

        let err = store.update(Note::new("99", "ghost", 0)).await.unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = seeded();
        assert!(store.remove("1").await.expect("remove"));
        assert!(!store.remove("1").await.expect("remove"));
        assert_eq!(store.len().await, 3);
        assert!(!store.is_empty().await);
    }
}
