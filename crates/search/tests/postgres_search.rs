//! PostgreSQL full-text search tests
//!
//! Run with:
//!
//! ```bash
//! cargo test -p search --test postgres_search -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{CategoryId, Money, ProductId, Quantity, Role, Unit, UserId};
use serial_test::serial;
use search::{Backend, PostgresSearchIndex, SearchDocument, SearchFilters, SearchIndex};
use sqlx::PgPool;
use store::{Category, MarketStore, PostgresMarketStore, Product, User};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();
            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();
            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_marketplace_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

struct Fixture {
    store: PostgresMarketStore,
    index: PostgresSearchIndex,
    seller: User,
    produce: Category,
}

async fn fixture() -> Fixture {
    let info = get_container_info().await;
    let pool = PgPool::connect(&info.connection_string).await.unwrap();
    sqlx::query(
        "TRUNCATE TABLE product_views, notifications, orders, products, categories, users",
    )
    .execute(&pool)
    .await
    .unwrap();

    let store = PostgresMarketStore::new(pool.clone());
    let seller = User {
        id: UserId::new(),
        username: "grower".to_string(),
        email: "grower@example.com".to_string(),
        role: Role::Seller,
        created_at: Utc::now(),
    };
    store.insert_user(&seller).await.unwrap();
    let produce = Category {
        id: CategoryId::new(),
        name: "Organic Produce".to_string(),
        slug: "organic-produce".to_string(),
        description: None,
        created_at: Utc::now(),
    };
    store.insert_category(&produce).await.unwrap();

    Fixture {
        store,
        index: PostgresSearchIndex::new(pool),
        seller,
        produce,
    }
}

impl Fixture {
    async fn add(&self, name: &str, description: &str, cents: i64, age_minutes: i64) -> ProductId {
        let product = self.insert(name, description, cents, age_minutes).await;
        self.index
            .reindex(SearchDocument::new(&product, &self.produce))
            .await
            .unwrap();
        product.id
    }

    /// Stores a product without indexing it.
    async fn insert(&self, name: &str, description: &str, cents: i64, age_minutes: i64) -> Product {
        let created = Utc::now() - Duration::minutes(age_minutes);
        let product = Product {
            id: ProductId::new(),
            seller_id: self.seller.id,
            category_id: self.produce.id,
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            description: description.to_string(),
            price: Money::from_cents(cents),
            stock: Quantity::from_units(5),
            unit: Unit::Kilograms,
            seller_disabled: false,
            views: 0,
            created_at: created,
            updated_at: created,
        };
        self.store.insert_product(&product).await.unwrap();
        product
    }
}

#[tokio::test]
#[serial]
async fn probe_succeeds_against_migrated_schema() {
    let f = fixture().await;
    assert_eq!(f.index.backend(), Backend::Postgres);
    f.index.probe().await.unwrap();
}

#[tokio::test]
#[serial]
async fn name_weight_beats_description_weight() {
    let f = fixture().await;
    let described = f.add("Maize", "sweet yellow corn cobs", 300, 0).await;
    let named = f.add("Sweet Corn", "from the valley", 300, 10).await;

    let hits = f.index.query("corn", &SearchFilters::new()).await.unwrap();
    let order: Vec<_> = hits.iter().map(|h| h.product_id).collect();
    assert_eq!(order, vec![named, described]);
    assert!(hits[0].rank > hits[1].rank);
}

#[tokio::test]
#[serial]
async fn price_filter_bounds_are_inclusive() {
    let f = fixture().await;
    let cheap = f.add("Green Beans", "crisp", 200, 0).await;
    let _dear = f.add("Broad Beans", "crisp", 900, 0).await;

    let filters = SearchFilters::new()
        .min_price(Money::from_cents(200))
        .max_price(Money::from_cents(500));
    let hits = f.index.query("beans", &filters).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].product_id, cheap);
}

#[tokio::test]
#[serial]
async fn blank_query_orders_by_recency() {
    let f = fixture().await;
    let old = f.add("Leeks", "mild", 200, 30).await;
    let new = f.add("Kale", "curly", 200, 1).await;

    let hits = f
        .index
        .query("", &SearchFilters::new().available(true))
        .await
        .unwrap();
    let order: Vec<_> = hits.iter().map(|h| h.product_id).collect();
    assert_eq!(order, vec![new, old]);
}

#[tokio::test]
#[serial]
async fn unindexed_product_is_found_once_reindexed() {
    let f = fixture().await;
    let product = f.insert("Parsnips", "sweet roots", 250, 0).await;
    assert!(
        f.index
            .query("parsnips", &SearchFilters::new())
            .await
            .unwrap()
            .is_empty()
    );

    f.index
        .reindex(SearchDocument::new(&product, &f.produce))
        .await
        .unwrap();
    let hits = f.index.query("parsnips", &SearchFilters::new()).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].product_id, product.id);
}

#[tokio::test]
#[serial]
async fn reindex_reads_the_committed_row() {
    let f = fixture().await;
    let product = f.insert("Plums", "dark and ripe", 400, 0).await;

    let mut stale = SearchDocument::new(&product, &f.produce);
    stale.name = "Apricots".to_string();
    f.index.reindex(stale).await.unwrap();

    assert!(
        f.index
            .query("apricots", &SearchFilters::new())
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        f.index
            .query("plums", &SearchFilters::new())
            .await
            .unwrap()
            .len(),
        1
    );
}
