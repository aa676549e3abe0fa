//! Closed enumerations shared across layers.

use serde::{Deserialize, Serialize};

/// Unit a product is sold in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Unit {
    #[default]
    #[serde(rename = "kg")]
    Kilograms,
    #[serde(rename = "g")]
    Grams,
    #[serde(rename = "ton")]
    Tons,
    #[serde(rename = "l")]
    Liters,
    #[serde(rename = "d")]
    Dozen,
}

impl Unit {
    pub const ALL: [Unit; 5] = [
        Unit::Kilograms,
        Unit::Grams,
        Unit::Tons,
        Unit::Liters,
        Unit::Dozen,
    ];

    /// Short code used in storage and on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Unit::Kilograms => "kg",
            Unit::Grams => "g",
            Unit::Tons => "ton",
            Unit::Liters => "l",
            Unit::Dozen => "d",
        }
    }
}

impl std::str::FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::ALL
            .into_iter()
            .find(|unit| unit.code() == s)
            .ok_or_else(|| format!("unknown unit '{s}'"))
    }
}

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOrder,
    OrderConfirmed,
    OrderCancelled,
    OrderShipped,
    OrderDelivered,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 5] = [
        NotificationKind::NewOrder,
        NotificationKind::OrderConfirmed,
        NotificationKind::OrderCancelled,
        NotificationKind::OrderShipped,
        NotificationKind::OrderDelivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewOrder => "new_order",
            NotificationKind::OrderConfirmed => "order_confirmed",
            NotificationKind::OrderCancelled => "order_cancelled",
            NotificationKind::OrderShipped => "order_shipped",
            NotificationKind::OrderDelivered => "order_delivered",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown notification kind '{s}'"))
    }
}

/// Role carried by an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Buyer,
    Seller,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}
