//! Articles and people served over the in-memory store
//!
//! ```bash
//! cargo run --example articles-api
//!
//! curl 'http://localhost:8080/api/v1/articles?include=author&sort=-published-on'
//! curl 'http://localhost:8080/api/v1/articles?filter[title]=rust&page[limit]=1'
//! curl -X POST http://localhost:8080/api/v1/articles \
//!   -H 'Content-Type: application/vnd.api+json' \
//!   -d '{"data":{"type":"articles","attributes":{"title":"Hello"},
//!        "relationships":{"author":{"data":{"type":"people","id":"1"}}}}}'
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use jsonapi_service::prelude::*;

#[derive(Debug, Clone, Default)]
struct Article {
    id: Option<String>,
    title: String,
    body: String,
    published_on: Option<String>,
    author_id: Option<String>,
    comment_ids: Vec<String>,
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
            "published_on" => Some(self.published_on.clone().into()),
            "author_id" => Some(self.author_id.clone().into()),
            _ => None,
        }
    }
}

struct Articles;

impl ResourceDefinition for Articles {
    type Record = Article;

    fn schema(&self) -> Schema<Article> {
        Schema::new()
            .attribute("title", |a: &Article| a.title.clone(), |a, v| a.title = v)
            .attribute("body", |a: &Article| a.body.clone(), |a, v| a.body = v)
            .read_only("published-on", |a: &Article| a.published_on.clone())
            .to_one("author", "people", |a| a.author_id.clone(), |a, v| a.author_id = v)
            .to_many("comments", "comments", |a| a.comment_ids.clone(), |a, v| a.comment_ids = v)
            .column("author", "author_id")
    }

    fn instantiate(&self) -> Article {
        Article::default()
    }

    fn filter(
        &self,
        predicates: &mut Predicates<'_, Article>,
        filters: &BTreeMap<String, String>,
    ) -> Result<()> {
        for (field, value) in filters {
            match field.as_str() {
                "title" => predicates.contains("title", value)?,
                "published-after" => {
                    predicates.compare("published-on", FilterOperator::GreaterThan, value.as_str())?
                }
                _ => predicates.equal(field, value)?,
            }
        }
        Ok(())
    }

    fn default_sort(&self) -> Vec<Ordering> {
        vec![Ordering::desc("published_on"), Ordering::asc("id")]
    }

    fn validate(&self, article: &Article) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if article.title.trim().is_empty() {
            errors.push(FieldError::attribute("title", "must not be blank"));
        }
        if article.author_id.is_none() {
            errors.push(FieldError::relationship("author", "an article needs an author"));
        }
        errors
    }
}

#[derive(Debug, Clone, Default)]
struct Person {
    id: Option<String>,
    name: String,
}

impl Entity for Person {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn column(&self, name: &str) -> Option<FilterValue> {
        (name == "name").then(|| self.name.clone().into())
    }
}

struct People;

impl ResourceDefinition for People {
    type Record = Person;

    fn schema(&self) -> Schema<Person> {
        Schema::new().attribute("name", |p: &Person| p.name.clone(), |p, v| p.name = v)
    }

    fn instantiate(&self) -> Person {
        Person::default()
    }

    fn filter(
        &self,
        predicates: &mut Predicates<'_, Person>,
        filters: &BTreeMap<String, String>,
    ) -> Result<()> {
        predicates.equal_all(filters)
    }

    fn default_sort(&self) -> Vec<Ordering> {
        vec![Ordering::asc("name")]
    }
}

fn seed_articles() -> Vec<Article> {
    let titles = [
        ("Rust ownership in five minutes", "2024-01-12"),
        ("Writing a JSON:API server", "2024-03-02"),
        ("Pagination links explained", "2024-05-20"),
    ];

    titles
        .iter()
        .enumerate()
        .map(|(index, (title, published_on))| Article {
            id: Some((index + 1).to_string()),
            title: title.to_string(),
            body: format!("{}.", title),
            published_on: Some(published_on.to_string()),
            author_id: Some(if index % 2 == 0 { "1" } else { "2" }.to_string()),
            comment_ids: Vec::new(),
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load_for_service("articles-api")?
        .with_resource("articles", ResourceConfig::allow_all())
        .with_resource(
            "people",
            ResourceConfig {
                allowed_methods: vec![AllowedMethod::List, AllowedMethod::Read],
                ..ResourceConfig::default()
            },
        );

    init_tracing(&config)?;

    let people = MemoryStore::with_records(
        "people",
        vec![
            Person {
                id: Some("1".to_string()),
                name: "Ferris".to_string(),
            },
            Person {
                id: Some("2".to_string()),
                name: "Corro".to_string(),
            },
        ],
    );

    let registry = AdapterRegistry::new()
        .register(
            "articles",
            ResourceAdapter::new(Articles, MemoryStore::with_records("articles", seed_articles())),
        )
        .register("people", ResourceAdapter::new(People, people));

    let controller = JsonApiController::new(Arc::new(config.clone()), registry)?;

    Server::new(config).serve(router(controller)).await
}
