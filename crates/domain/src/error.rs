//! Domain error types.

use common::{OrderStatus, Quantity};
use search::SearchError;
use store::{Constraint, StoreError};
use thiserror::Error;

/// A business rule that refused an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("product is not available")]
    ProductUnavailable,

    #[error("sellers cannot order their own products")]
    SelfPurchase,

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        requested: Quantity,
        available: Quantity,
    },

    #[error("buyer already has a pending or confirmed order for this product")]
    DuplicateActiveOrder,

    #[error("a product with this name already exists in this category")]
    DuplicateProductName,

    #[error("only the seller of this order may do that")]
    NotOrderSeller,

    #[error("only the buyer or seller of this order may do that")]
    NotOrderParticipant,

    #[error("cannot move order from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("only the owner of this product may change it")]
    NotProductOwner,

    #[error("only sellers may list products")]
    NotSeller,
}

impl Rejection {
    /// Stable label used in metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::ProductUnavailable => "product_unavailable",
            Rejection::SelfPurchase => "self_purchase",
            Rejection::InsufficientStock { .. } => "insufficient_stock",
            Rejection::DuplicateActiveOrder => "duplicate_active_order",
            Rejection::DuplicateProductName => "duplicate_product_name",
            Rejection::NotOrderSeller => "not_order_seller",
            Rejection::NotOrderParticipant => "not_order_participant",
            Rejection::IllegalTransition { .. } => "illegal_transition",
            Rejection::NotProductOwner => "not_product_owner",
            Rejection::NotSeller => "not_seller",
        }
    }

    /// True when the actor, rather than the entity state, is at fault.
    pub fn is_unauthorized_actor(&self) -> bool {
        matches!(
            self,
            Rejection::NotOrderSeller
                | Rejection::NotOrderParticipant
                | Rejection::NotProductOwner
                | Rejection::NotSeller
        )
    }
}

/// Coarse classification of a [`DomainError`], used by transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Forbidden,
    /// Retryable lock contention.
    Contention,
    /// A collaborator is down.
    Unavailable,
    Internal,
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed input.
    #[error("{0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A write pointed at a row the store does not have.
    #[error("referenced {entity} does not exist")]
    MissingReference { entity: &'static str },

    /// A business rule refused the operation.
    #[error("{0}")]
    Rejected(Rejection),

    /// A row lock could not be acquired in time; the caller may retry.
    #[error("{resource} is busy, try again")]
    Contention { resource: String },

    /// The search backend failed.
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// An infrastructure error occurred in the store.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::NotFound { .. } | DomainError::MissingReference { .. } => {
                ErrorKind::NotFound
            }
            DomainError::Rejected(r) if r.is_unauthorized_actor() => ErrorKind::Forbidden,
            DomainError::Rejected(_) => ErrorKind::Conflict,
            DomainError::Contention { .. } => ErrorKind::Contention,
            DomainError::Search(_) => ErrorKind::Unavailable,
            DomainError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Contention { .. })
    }
}

impl From<Rejection> for DomainError {
    fn from(rejection: Rejection) -> Self {
        DomainError::Rejected(rejection)
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LockTimeout { entity, id } => DomainError::Contention {
                resource: format!("{entity} {id}"),
            },
            StoreError::UniqueViolation(Constraint::ActiveOrder) => {
                DomainError::Rejected(Rejection::DuplicateActiveOrder)
            }
            StoreError::UniqueViolation(Constraint::ProductName) => {
                DomainError::Rejected(Rejection::DuplicateProductName)
            }
            StoreError::UniqueViolation(Constraint::CategoryName | Constraint::CategorySlug) => {
                DomainError::Validation("a category with this name already exists".to_string())
            }
            StoreError::UniqueViolation(Constraint::Username) => {
                DomainError::Validation("username is already taken".to_string())
            }
            StoreError::MissingReference(entity) => DomainError::MissingReference { entity },
            other => DomainError::Store(other),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
