use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    CategoryId, Money, NotificationId, NotificationKind, OrderId, OrderStatus, ProductId,
    Quantity, Role, Unit, UserId,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Category, CategoryRemoval, Constraint, Notification, Order, OrderQuery, Page, Product,
    ProductQuery, ProductView, Result, StoreError, User,
    store::{MarketStore, UnitOfWork},
};

const PRODUCT_COLUMNS: &str = "id, seller_id, category_id, name, slug, description, price_cents, \
     stock_hundredths, unit, seller_disabled, views, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, buyer_id, seller_id, product_id, quantity_hundredths, \
     total_price_cents, status, created_at, updated_at";

const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, kind, message, reference_id, is_read, created_at";

/// PostgreSQL-backed marketplace store.
///
/// Row locks are `SELECT ... FOR UPDATE` bounded by a transaction-local
/// `lock_timeout`; uniqueness rules are enforced by constraints and unique
/// indexes, so concurrent writers are arbitrated by the database.
#[derive(Clone)]
pub struct PostgresMarketStore {
    pool: PgPool,
}

impl PostgresMarketStore {
    /// Creates a new PostgreSQL marketplace store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Translates constraint and lock failures into store errors.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.code().as_deref() {
            Some("23505") => {
                if let Some(constraint) = db_err.constraint().and_then(Constraint::from_db_name) {
                    return StoreError::UniqueViolation(constraint);
                }
            }
            Some("23503") => {
                return StoreError::MissingReference(referenced_entity(db_err.constraint()));
            }
            _ => {}
        }
    }
    StoreError::Database(err)
}

fn classify_lock(err: sqlx::Error, entity: &'static str, id: impl ToString) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.code().as_deref() == Some("55P03")
    {
        return StoreError::LockTimeout {
            entity,
            id: id.to_string(),
        };
    }
    classify(err)
}

fn referenced_entity(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(name) if name.contains("category_id") => "category",
        Some(name) if name.contains("product_id") => "product",
        _ => "user",
    }
}

fn decode_err(column: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Decode(format!("{column}: {detail}"))
}

fn row_to_user(row: PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        role: role.parse::<Role>().map_err(|e| decode_err("role", e))?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_category(row: PgRow) -> Result<Category> {
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_product(row: PgRow) -> Result<Product> {
    let unit: String = row.try_get("unit")?;
    let views: i64 = row.try_get("views")?;
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        seller_id: UserId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
        category_id: CategoryId::from_uuid(row.try_get::<Uuid, _>("category_id")?),
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: Quantity::from_hundredths(row.try_get("stock_hundredths")?),
        unit: unit.parse::<Unit>().map_err(|e| decode_err("unit", e))?,
        seller_disabled: row.try_get("seller_disabled")?,
        views: u64::try_from(views).map_err(|e| decode_err("views", e))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order(row: PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        buyer_id: UserId::from_uuid(row.try_get::<Uuid, _>("buyer_id")?),
        seller_id: UserId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        quantity: Quantity::from_hundredths(row.try_get("quantity_hundredths")?),
        total_price: Money::from_cents(row.try_get("total_price_cents")?),
        status: status
            .parse::<OrderStatus>()
            .map_err(|e| decode_err("status", e))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_notification(row: PgRow) -> Result<Notification> {
    let kind: String = row.try_get("kind")?;
    let reference: Option<Uuid> = row.try_get("reference_id")?;
    Ok(Notification {
        id: NotificationId::from_uuid(row.try_get::<Uuid, _>("id")?),
        recipient_id: UserId::from_uuid(row.try_get::<Uuid, _>("recipient_id")?),
        kind: kind
            .parse::<NotificationKind>()
            .map_err(|e| decode_err("kind", e))?,
        message: row.try_get("message")?,
        reference_id: reference.map(OrderId::from_uuid),
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
    })
}

async fn insert_notification_with<'e, E>(executor: E, notification: &Notification) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO notifications (id, recipient_id, kind, message, reference_id, is_read, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(notification.id.as_uuid())
    .bind(notification.recipient_id.as_uuid())
    .bind(notification.kind.as_str())
    .bind(&notification.message)
    .bind(notification.reference_id.map(|id| id.as_uuid()))
    .bind(notification.is_read)
    .bind(notification.created_at)
    .execute(executor)
    .await
    .map_err(classify)?;
    Ok(())
}

#[async_trait]
impl MarketStore for PostgresMarketStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork {
            tx,
            locked_products: HashSet::new(),
            locked_orders: HashSet::new(),
        }))
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, username, email, role, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        sqlx::query("SELECT id, username, email, role, created_at FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_user)
            .transpose()
    }

    async fn insert_category(&self, category: &Category) -> Result<()> {
        sqlx::query(
            "INSERT INTO categories (id, name, slug, description, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.created_at)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        sqlx::query("SELECT id, name, slug, description, created_at FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_category)
            .transpose()
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        sqlx::query(
            "SELECT id, name, slug, description, created_at FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .map(row_to_category)
        .transpose()
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT id, name, slug, description, created_at FROM categories ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_category).collect()
    }

    async fn delete_category(&self, id: CategoryId) -> Result<Option<CategoryRemoval>> {
        let mut tx = self.pool.begin().await?;

        let product_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM products WHERE category_id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_all(&mut *tx)
                .await?;

        let removed_orders: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE product_id = ANY($1)")
                .bind(&product_ids)
                .fetch_one(&mut *tx)
                .await?;

        // Products, their orders and views go with the category via ON DELETE CASCADE
        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(CategoryRemoval {
            removed_products: product_ids.into_iter().map(ProductId::from_uuid).collect(),
            removed_orders: removed_orders.max(0) as u64,
        }))
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, seller_id, category_id, name, slug, description, price_cents,
                                  stock_hundredths, unit, seller_disabled, views, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.seller_id.as_uuid())
        .bind(product.category_id.as_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.stock.hundredths())
        .bind(product.unit.code())
        .bind(product.seller_disabled)
        .bind(product.views as i64)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_product)
            .transpose()
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_product)
            .transpose()
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(uuids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_product).collect()
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>> {
        let mut filter = String::from(" WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic filter
        if query.seller_id.is_some() {
            param_count += 1;
            filter.push_str(&format!(" AND seller_id = ${param_count}"));
        }
        if query.category_id.is_some() {
            param_count += 1;
            filter.push_str(&format!(" AND category_id = ${param_count}"));
        }
        if query.available.is_some() {
            param_count += 1;
            filter.push_str(&format!(" AND is_available = ${param_count}"));
        }

        let count_sql = format!("SELECT COUNT(*) FROM products{filter}");
        let mut sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products{filter} ORDER BY created_at DESC, id DESC"
        );
        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut page_query = sqlx::query(&sql);

        // Bind parameters in the same order
        if let Some(seller_id) = query.seller_id {
            count_query = count_query.bind(seller_id.as_uuid());
            page_query = page_query.bind(seller_id.as_uuid());
        }
        if let Some(category_id) = query.category_id {
            count_query = count_query.bind(category_id.as_uuid());
            page_query = page_query.bind(category_id.as_uuid());
        }
        if let Some(available) = query.available {
            count_query = count_query.bind(available);
            page_query = page_query.bind(available);
        }
        if let Some(limit) = query.limit {
            page_query = page_query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(offset) = query.offset {
            page_query = page_query.bind(i64::try_from(offset).unwrap_or(i64::MAX));
        }

        let total = count_query.fetch_one(&self.pool).await?;
        let rows = page_query.fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(row_to_product)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            total: total.max(0) as u64,
        })
    }

    async fn record_view(&self, view: &ProductView) -> Result<Option<Product>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "UPDATE products SET views = views + 1 WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(view.product_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        sqlx::query("INSERT INTO product_views (product_id, user_id, viewed_at) VALUES ($1, $2, $3)")
            .bind(view.product_id.as_uuid())
            .bind(view.user_id.map(|id| id.as_uuid()))
            .bind(view.viewed_at)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

        tx.commit().await?;
        row_to_product(row).map(Some)
    }

    async fn count_views(&self, product_id: ProductId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_views WHERE product_id = $1")
            .bind(product_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_order)
            .transpose()
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        let mut param_count = 0;

        if query.participant.is_some() {
            param_count += 1;
            sql.push_str(&format!(
                " AND (buyer_id = ${param_count} OR seller_id = ${param_count})"
            ));
        }
        if query.buyer_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND buyer_id = ${param_count}"));
        }
        if query.seller_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND seller_id = ${param_count}"));
        }
        if query.product_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND product_id = ${param_count}"));
        }
        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut q = sqlx::query(&sql);
        if let Some(user) = query.participant {
            q = q.bind(user.as_uuid());
        }
        if let Some(buyer) = query.buyer_id {
            q = q.bind(buyer.as_uuid());
        }
        if let Some(seller) = query.seller_id {
            q = q.bind(seller.as_uuid());
        }
        if let Some(product) = query.product_id {
            q = q.bind(product.as_uuid());
        }
        if let Some(status) = query.status {
            q = q.bind(status.as_str());
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_order).collect()
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        insert_notification_with(&self.pool, notification).await
    }

    async fn list_notifications(
        &self,
        recipient: UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let mut sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE recipient_id = $1");
        if unread_only {
            sql.push_str(" AND NOT is_read");
        }
        sql.push_str(" ORDER BY created_at DESC, seq DESC");

        let rows = sqlx::query(&sql)
            .bind(recipient.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_notification).collect()
    }

    async fn mark_notification_read(
        &self,
        id: NotificationId,
        recipient: UserId,
    ) -> Result<bool> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_id = $2")
                .bind(id.as_uuid())
                .bind(recipient.as_uuid())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_notifications_read(&self, recipient: UserId) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(recipient.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Unit of work backed by a database transaction.
///
/// Dropping it without committing rolls the transaction back, which also
/// releases every row lock taken through it.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
    locked_products: HashSet<ProductId>,
    locked_orders: HashSet<OrderId>,
}

impl PgUnitOfWork {
    async fn set_lock_timeout(&mut self, wait: Duration) -> Result<()> {
        let millis = wait.as_millis().max(1);
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{millis}ms"))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_product(&mut self, id: ProductId, wait: Duration) -> Result<Option<Product>> {
        self.set_lock_timeout(wait).await?;
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| classify_lock(e, "product", id))?;

        self.locked_products.insert(id);
        row.map(row_to_product).transpose()
    }

    async fn update_product(&mut self, product: &Product) -> Result<()> {
        if !self.locked_products.contains(&product.id) {
            return Err(StoreError::LockNotHeld {
                entity: "product",
                id: product.id.to_string(),
            });
        }

        // Slug and view counter are not touched here
        let result = sqlx::query(
            r#"
            UPDATE products
            SET category_id = $2, name = $3, description = $4, price_cents = $5,
                stock_hundredths = $6, unit = $7, seller_disabled = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.category_id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.stock.hundredths())
        .bind(product.unit.code())
        .bind(product.seller_disabled)
        .bind(product.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(classify)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound {
                entity: "product",
                id: product.id.to_string(),
            });
        }
        Ok(())
    }

    async fn has_active_order(&mut self, buyer: UserId, product: ProductId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM orders
                WHERE buyer_id = $1 AND product_id = $2 AND status IN ('pending', 'confirmed')
            )
            "#,
        )
        .bind(buyer.as_uuid())
        .bind(product.as_uuid())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn lock_order(&mut self, id: OrderId, wait: Duration) -> Result<Option<Order>> {
        self.set_lock_timeout(wait).await?;
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| classify_lock(e, "order", id))?;

        self.locked_orders.insert(id);
        row.map(row_to_order).transpose()
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, buyer_id, seller_id, product_id, quantity_hundredths,
                                total_price_cents, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.buyer_id.as_uuid())
        .bind(order.seller_id.as_uuid())
        .bind(order.product_id.as_uuid())
        .bind(order.quantity.hundredths())
        .bind(order.total_price.cents())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(classify)?;

        // A row inserted in this transaction is implicitly locked by it
        self.locked_orders.insert(order.id);
        Ok(())
    }

    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        if !self.locked_orders.contains(&id) {
            return Err(StoreError::LockNotHeld {
                entity: "order",
                id: id.to_string(),
            });
        }

        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .bind(updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(classify)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound {
                entity: "order",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn insert_notification(&mut self, notification: &Notification) -> Result<()> {
        insert_notification_with(&mut *self.tx, notification).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(classify)
    }
}
