use common::{Role, UserId};

/// The authenticated caller, as supplied by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn buyer(user_id: UserId) -> Self {
        Self::new(user_id, Role::Buyer)
    }

    pub fn seller(user_id: UserId) -> Self {
        Self::new(user_id, Role::Seller)
    }

    pub fn is_seller(&self) -> bool {
        self.role == Role::Seller
    }
}
