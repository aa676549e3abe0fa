use thiserror::Error;

/// Storage-level uniqueness rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Product slugs are globally unique.
    ProductSlug,
    /// A seller cannot list the same name twice in one category.
    ProductName,
    CategoryName,
    CategorySlug,
    Username,
    /// A buyer holds at most one pending/confirmed order per product.
    ActiveOrder,
}

impl Constraint {
    /// Maps a PostgreSQL constraint or unique index name to the rule it enforces.
    pub fn from_db_name(name: &str) -> Option<Self> {
        match name {
            "products_slug_key" => Some(Constraint::ProductSlug),
            "products_seller_category_name_key" => Some(Constraint::ProductName),
            "categories_name_key" => Some(Constraint::CategoryName),
            "categories_slug_key" => Some(Constraint::CategorySlug),
            "users_username_key" => Some(Constraint::Username),
            "orders_one_active_per_buyer_product" => Some(Constraint::ActiveOrder),
            _ => None,
        }
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Constraint::ProductSlug => "product slug",
            Constraint::ProductName => "product name per seller and category",
            Constraint::CategoryName => "category name",
            Constraint::CategorySlug => "category slug",
            Constraint::Username => "username",
            Constraint::ActiveOrder => "one active order per buyer and product",
        };
        f.write_str(name)
    }
}

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness rule was violated; nothing was written.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(Constraint),

    /// A row lock could not be acquired within the bounded wait.
    #[error("Timed out waiting for lock on {entity} {id}")]
    LockTimeout { entity: &'static str, id: String },

    /// A write targeted a row that does not exist (or no longer exists).
    #[error("{entity} {id} not found")]
    RowNotFound { entity: &'static str, id: String },

    /// A write referenced a row that does not exist.
    #[error("Referenced {0} does not exist")]
    MissingReference(&'static str),

    /// A unit of work tried to write a row it had not locked.
    #[error("{entity} {id} must be locked before it is written")]
    LockNotHeld { entity: &'static str, id: String },

    /// A stored value could not be decoded into a domain type.
    #[error("Corrupt row: {0}")]
    Decode(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true if retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::LockTimeout { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
