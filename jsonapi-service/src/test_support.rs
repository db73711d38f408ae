//! Fixture resources shared by unit tests

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use crate::adapter::{AdapterRegistry, Predicates, ResourceAdapter, ResourceDefinition, Schema};
use crate::classifier::AllowedMethod;
use crate::config::{Config, ResourceConfig};
use crate::controller::JsonApiController;
use crate::error::{FieldError, Result};
use crate::store::{Entity, FilterValue, MemoryStore, Ordering, Query, Store, StoreResult};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Article {
    pub id: Option<String>,
    pub title: String,
    pub body: String,
    pub status: String,
    pub words: i64,
    pub author_id: Option<String>,
    pub tag_ids: Vec<String>,
}

impl Entity for Article {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn column(&self, name: &str) -> Option<FilterValue> {
        match name {
            "title" => Some(self.title.clone().into()),
            "body" => Some(self.body.clone().into()),
            "status" => Some(self.status.clone().into()),
            "words" => Some(self.words.into()),
            "author_id" => Some(self.author_id.clone().into()),
            _ => None,
        }
    }
}

pub struct Articles;

impl ResourceDefinition for Articles {
    type Record = Article;

    fn schema(&self) -> Schema<Article> {
        Schema::new()
            .attribute("title", |a: &Article| a.title.clone(), |a, v| a.title = v)
            .attribute("body", |a: &Article| a.body.clone(), |a, v| a.body = v)
            .attribute("status", |a: &Article| a.status.clone(), |a, v| a.status = v)
            .attribute("words", |a: &Article| a.words, |a, v| a.words = v)
            .to_one("author", "people", |a| a.author_id.clone(), |a, v| a.author_id = v)
            .to_many("tags", "tags", |a| a.tag_ids.clone(), |a, v| a.tag_ids = v)
            .column("author", "author_id")
    }

    fn instantiate(&self) -> Article {
        Article {
            status: "draft".to_string(),
            ..Article::default()
        }
    }

    fn filter(
        &self,
        predicates: &mut Predicates<'_, Article>,
        filters: &BTreeMap<String, String>,
    ) -> Result<()> {
        predicates.equal_all(filters)
    }

    fn default_sort(&self) -> Vec<Ordering> {
        vec![Ordering::asc("id")]
    }

    fn validate(&self, article: &Article) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if article.title.trim().is_empty() {
            errors.push(FieldError::attribute("title", "must not be blank"));
        }
        errors
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub id: Option<String>,
    pub name: String,
    pub twitter: Option<String>,
}

impl Entity for Person {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn column(&self, name: &str) -> Option<FilterValue> {
        match name {
            "name" => Some(self.name.clone().into()),
            "twitter" => Some(self.twitter.clone().into()),
            _ => None,
        }
    }
}

pub struct People;

impl ResourceDefinition for People {
    type Record = Person;

    fn schema(&self) -> Schema<Person> {
        Schema::new()
            .attribute("name", |p: &Person| p.name.clone(), |p, v| p.name = v)
            .attribute("twitter", |p: &Person| p.twitter.clone(), |p, v| p.twitter = v)
    }

    fn instantiate(&self) -> Person {
        Person::default()
    }

    fn filter(
        &self,
        predicates: &mut Predicates<'_, Person>,
        filters: &BTreeMap<String, String>,
    ) -> Result<()> {
        if let Some(name) = filters.get("name") {
            predicates.contains("name", name)?;
        }
        Ok(())
    }
}

fn article(id: &str, title: &str, body: &str, status: &str, words: i64, author: &str, tags: &[&str]) -> Article {
    Article {
        id: Some(id.to_string()),
        title: title.to_string(),
        body: body.to_string(),
        status: status.to_string(),
        words,
        author_id: Some(author.to_string()),
        tag_ids: tags.iter().map(|t| t.to_string()).collect(),
    }
}

fn article_store() -> MemoryStore<Article> {
    MemoryStore::with_records(
        "articles",
        vec![
            article(
                "1",
                "JSON:API paints my bikeshed!",
                "The shortest article. Ever.",
                "published",
                300,
                "9",
                &["a"],
            ),
            article("2", "Ownership in practice", "Borrowing rules.", "draft", 1200, "9", &[]),
            article("3", "Paging without tears", "Offsets and limits.", "published", 800, "10", &["b"]),
        ],
    )
}

pub fn article_adapter() -> ResourceAdapter<Articles, MemoryStore<Article>> {
    ResourceAdapter::new(Articles, article_store())
}

fn people_store() -> MemoryStore<Person> {
    let person = |id: &str, name: &str, twitter: Option<&str>| Person {
        id: Some(id.to_string()),
        name: name.to_string(),
        twitter: twitter.map(str::to_string),
    };
    MemoryStore::with_records(
        "people",
        vec![
            person("9", "Dan Gebhardt", Some("dgeb")),
            person("10", "Yehuda Katz", None),
        ],
    )
}

pub fn people_adapter() -> ResourceAdapter<People, MemoryStore<Person>> {
    ResourceAdapter::new(People, people_store())
}

/// Store calls seen by a [`CountingStore`]
#[derive(Debug, Default)]
pub struct StoreCalls {
    finds: AtomicUsize,
    removes: AtomicUsize,
}

impl StoreCalls {
    pub fn finds(&self) -> usize {
        self.finds.load(AtomicOrdering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(AtomicOrdering::SeqCst)
    }
}

/// [`MemoryStore`] that records `find` and `remove` calls
pub struct CountingStore<R> {
    inner: MemoryStore<R>,
    calls: Arc<StoreCalls>,
}

impl<R: Entity> CountingStore<R> {
    pub fn new(inner: MemoryStore<R>) -> (Self, Arc<StoreCalls>) {
        let calls = Arc::new(StoreCalls::default());
        let store = Self {
            inner,
            calls: Arc::clone(&calls),
        };
        (store, calls)
    }
}

impl<R: Entity> Store<R> for CountingStore<R> {
    async fn find(&self, id: &str) -> StoreResult<Option<R>> {
        self.calls.finds.fetch_add(1, AtomicOrdering::SeqCst);
        self.inner.find(id).await
    }

    async fn fetch(&self, query: &Query) -> StoreResult<Vec<R>> {
        self.inner.fetch(query).await
    }

    async fn count(&self, query: &Query) -> StoreResult<u64> {
        self.inner.count(query).await
    }

    async fn insert(&self, record: R) -> StoreResult<R> {
        self.inner.insert(record).await
    }

    async fn update(&self, record: R) -> StoreResult<R> {
        self.inner.update(record).await
    }

    async fn remove(&self, id: &str) -> StoreResult<bool> {
        self.calls.removes.fetch_add(1, AtomicOrdering::SeqCst);
        self.inner.remove(id).await
    }
}

pub fn registry() -> AdapterRegistry {
    AdapterRegistry::new()
        .register("articles", article_adapter())
        .register("people", people_adapter())
}

pub fn test_config() -> Config {
    Config::named("jsonapi-test")
        .with_resource("articles", ResourceConfig::allow_all())
        .with_resource(
            "people",
            ResourceConfig {
                allowed_methods: vec![AllowedMethod::List, AllowedMethod::Read],
                ..ResourceConfig::default()
            },
        )
}

pub fn controller_with(config: Config) -> JsonApiController {
    JsonApiController::new(Arc::new(config), registry()).expect("fixture registry is complete")
}

pub fn controller() -> JsonApiController {
    controller_with(test_config())
}

/// Fixture controller whose stores count their calls: `(controller, articles, people)`
pub fn counting_controller() -> (JsonApiController, Arc<StoreCalls>, Arc<StoreCalls>) {
    let (articles, article_calls) = CountingStore::new(article_store());
    let (people, people_calls) = CountingStore::new(people_store());
    let registry = AdapterRegistry::new()
        .register("articles", ResourceAdapter::new(Articles, articles))
        .register("people", ResourceAdapter::new(People, people));
    let controller = JsonApiController::new(Arc::new(test_config()), registry)
        .expect("fixture registry is complete");
    (controller, article_calls, people_calls)
}
