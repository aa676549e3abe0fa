//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{
    CategoryId, Money, NotificationId, NotificationKind, OrderId, OrderStatus, ProductId,
    Quantity, Role, Unit, UserId,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    Category, Constraint, MarketStore, Notification, Order, OrderQuery, PostgresMarketStore,
    Product, ProductQuery, ProductView, StoreError, User,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
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

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresMarketStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE product_views, notifications, orders, products, categories, users",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresMarketStore::new(pool)
}

fn user(name: &str, role: Role) -> User {
    User {
        id: UserId::new(),
        username: name.to_string(),
        email: format!("{name}@example.com"),
        role,
        created_at: Utc::now(),
    }
}

fn category(name: &str) -> Category {
    Category {
        id: CategoryId::new(),
        name: name.to_string(),
        slug: name.to_lowercase(),
        description: None,
        created_at: Utc::now(),
    }
}

fn product(seller: &User, category: &Category, name: &str, slug: &str, stock: i64) -> Product {
    let now = Utc::now();
    Product {
        id: ProductId::new(),
        seller_id: seller.id,
        category_id: category.id,
        name: name.to_string(),
        slug: slug.to_string(),
        description: "Harvested this week".to_string(),
        price: Money::from_cents(450),
        stock: Quantity::from_units(stock),
        unit: Unit::Kilograms,
        seller_disabled: false,
        views: 0,
        created_at: now,
        updated_at: now,
    }
}

fn pending_order(buyer: &User, product: &Product) -> Order {
    let now = Utc::now();
    Order {
        id: OrderId::new(),
        buyer_id: buyer.id,
        seller_id: product.seller_id,
        product_id: product.id,
        quantity: Quantity::from_units(1),
        total_price: product.price,
        status: OrderStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

async fn seed(store: &PostgresMarketStore) -> (User, User, Category, Product) {
    let seller = user("seller", Role::Seller);
    let buyer = user("buyer", Role::Buyer);
    let grains = category("Grains");
    store.insert_user(&seller).await.unwrap();
    store.insert_user(&buyer).await.unwrap();
    store.insert_category(&grains).await.unwrap();
    let corn = product(&seller, &grains, "Corn", "corn", 10);
    store.insert_product(&corn).await.unwrap();
    (seller, buyer, grains, corn)
}

#[tokio::test]
#[serial]
async fn product_round_trip_keeps_fixed_point_values() {
    let store = get_test_store().await;
    let (_, _, _, corn) = seed(&store).await;

    let loaded = store.get_product(corn.id).await.unwrap().unwrap();
    assert_eq!(loaded.price, Money::from_cents(450));
    assert_eq!(loaded.stock, Quantity::from_units(10));
    assert!(loaded.is_available());

    let by_slug = store.get_product_by_slug("corn").await.unwrap().unwrap();
    assert_eq!(by_slug.id, corn.id);
}

#[tokio::test]
#[serial]
async fn duplicate_slug_and_name_are_classified() {
    let store = get_test_store().await;
    let (seller, _, grains, _) = seed(&store).await;

    let same_slug = product(&seller, &grains, "Sweet Corn", "corn", 5);
    assert!(matches!(
        store.insert_product(&same_slug).await,
        Err(StoreError::UniqueViolation(Constraint::ProductSlug))
    ));

    let same_name = product(&seller, &grains, "Corn", "corn-1", 5);
    assert!(matches!(
        store.insert_product(&same_name).await,
        Err(StoreError::UniqueViolation(Constraint::ProductName))
    ));
}

#[tokio::test]
#[serial]
async fn missing_category_is_reported() {
    let store = get_test_store().await;
    let (seller, _, _, _) = seed(&store).await;

    let orphan = product(&seller, &category("Ghost"), "Rice", "rice", 5);
    assert!(matches!(
        store.insert_product(&orphan).await,
        Err(StoreError::MissingReference("category"))
    ));
}

#[tokio::test]
#[serial]
async fn generated_availability_follows_stock_and_seller_flag() {
    let store = get_test_store().await;
    let (_, _, _, corn) = seed(&store).await;

    let mut uow = store.begin().await.unwrap();
    let mut locked = uow
        .lock_product(corn.id, Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap();
    locked.stock = Quantity::zero();
    uow.update_product(&locked).await.unwrap();
    uow.commit().await.unwrap();

    let page = store
        .list_products(&ProductQuery::new().available(true))
        .await
        .unwrap();
    assert_eq!(page.total, 0);

    let page = store
        .list_products(&ProductQuery::new().available(false))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert!(page.items[0].is_stock_exhausted());
}

#[tokio::test]
#[serial]
async fn dropped_unit_of_work_rolls_back() {
    let store = get_test_store().await;
    let (_, buyer, _, corn) = seed(&store).await;

    {
        let mut uow = store.begin().await.unwrap();
        let mut locked = uow
            .lock_product(corn.id, Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        locked.stock = Quantity::from_units(9);
        uow.update_product(&locked).await.unwrap();
        uow.insert_order(&pending_order(&buyer, &corn)).await.unwrap();
    }

    let loaded = store.get_product(corn.id).await.unwrap().unwrap();
    assert_eq!(loaded.stock, Quantity::from_units(10));
    assert!(
        store
            .list_orders(&OrderQuery::for_participant(buyer.id))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
#[serial]
async fn contended_row_lock_times_out() {
    let store = get_test_store().await;
    let (_, _, _, corn) = seed(&store).await;

    let mut holder = store.begin().await.unwrap();
    holder
        .lock_product(corn.id, Duration::from_secs(1))
        .await
        .unwrap();

    let mut waiter = store.begin().await.unwrap();
    let result = waiter
        .lock_product(corn.id, Duration::from_millis(100))
        .await;
    assert!(matches!(result, Err(StoreError::LockTimeout { .. })));
}

#[tokio::test]
#[serial]
async fn second_active_order_hits_partial_unique_index() {
    let store = get_test_store().await;
    let (_, buyer, _, corn) = seed(&store).await;

    let mut uow = store.begin().await.unwrap();
    uow.insert_order(&pending_order(&buyer, &corn)).await.unwrap();
    uow.commit().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    assert!(uow.has_active_order(buyer.id, corn.id).await.unwrap());
    let result = uow.insert_order(&pending_order(&buyer, &corn)).await;
    assert!(matches!(
        result,
        Err(StoreError::UniqueViolation(Constraint::ActiveOrder))
    ));
}

#[tokio::test]
#[serial]
async fn cancelled_order_frees_the_active_slot() {
    let store = get_test_store().await;
    let (_, buyer, _, corn) = seed(&store).await;

    let first = pending_order(&buyer, &corn);
    let mut uow = store.begin().await.unwrap();
    uow.insert_order(&first).await.unwrap();
    uow.commit().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    uow.lock_order(first.id, Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap();
    uow.update_order_status(first.id, OrderStatus::Cancelled, Utc::now())
        .await
        .unwrap();
    uow.insert_order(&pending_order(&buyer, &corn)).await.unwrap();
    uow.commit().await.unwrap();

    let orders = store
        .list_orders(&OrderQuery::for_participant(buyer.id))
        .await
        .unwrap();
    assert_eq!(orders.len(), 2);
}

/// Decrements stock by one unit under the row lock; false when sold out.
async fn take_one(store: PostgresMarketStore, id: ProductId) -> Result<bool, StoreError> {
    let mut uow = store.begin().await?;
    let mut locked = uow
        .lock_product(id, Duration::from_secs(5))
        .await?
        .ok_or(StoreError::MissingReference("product"))?;
    let Some(rest) = locked.stock.checked_sub(Quantity::from_units(1)) else {
        return Ok(false);
    };
    locked.stock = rest;
    uow.update_product(&locked).await?;
    uow.commit().await?;
    Ok(true)
}

#[tokio::test]
#[serial]
async fn concurrent_decrements_never_oversell() {
    let store = get_test_store().await;
    let (_, _, _, corn) = seed(&store).await;

    let mut handles = Vec::new();
    for _ in 0..15 {
        let store = store.clone();
        handles.push(tokio::spawn(take_one(store, corn.id)));
    }

    let results = futures_util::future::join_all(handles).await;
    let succeeded = results
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(true))))
        .count();

    assert_eq!(succeeded, 10);
    let loaded = store.get_product(corn.id).await.unwrap().unwrap();
    assert_eq!(loaded.stock, Quantity::zero());
}

#[tokio::test]
#[serial]
async fn record_view_and_category_cascade() {
    let store = get_test_store().await;
    let (_, buyer, grains, corn) = seed(&store).await;

    let view = ProductView {
        product_id: corn.id,
        user_id: Some(buyer.id),
        viewed_at: Utc::now(),
    };
    let updated = store.record_view(&view).await.unwrap().unwrap();
    assert_eq!(updated.views, 1);
    assert_eq!(store.count_views(corn.id).await.unwrap(), 1);

    let mut uow = store.begin().await.unwrap();
    uow.insert_order(&pending_order(&buyer, &corn)).await.unwrap();
    uow.commit().await.unwrap();

    let removal = store.delete_category(grains.id).await.unwrap().unwrap();
    assert_eq!(removal.removed_products, vec![corn.id]);
    assert_eq!(removal.removed_orders, 1);
    assert!(store.get_product(corn.id).await.unwrap().is_none());
    assert_eq!(store.count_views(corn.id).await.unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn notifications_mark_read() {
    let store = get_test_store().await;
    let (seller, _, _, _) = seed(&store).await;

    for i in 0..3 {
        store
            .insert_notification(&Notification {
                id: NotificationId::new(),
                recipient_id: seller.id,
                kind: NotificationKind::NewOrder,
                message: format!("New order #{i}"),
                reference_id: None,
                is_read: false,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    let all = store.list_notifications(seller.id, false).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].message, "New order #2");

    assert!(
        store
            .mark_notification_read(all[0].id, seller.id)
            .await
            .unwrap()
    );
    assert_eq!(store.list_notifications(seller.id, true).await.unwrap().len(), 2);
    assert_eq!(store.mark_all_notifications_read(seller.id).await.unwrap(), 2);
    assert!(store.list_notifications(seller.id, true).await.unwrap().is_empty());
}
