//! [`Purchase`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf, Money};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{product, sale, user};
#[cfg(doc)]
use crate::domain::{Product, Sale, User};

/// Successful acquisition of [`Product`] units in a [`Sale`].
#[derive(Clone, Debug)]
pub struct Purchase {
    /// ID of this [`Purchase`].
    pub id: Id,

    /// ID of the [`Sale`] this [`Purchase`] was made in.
    pub sale_id: sale::Id,

    /// ID of the [`User`] who made this [`Purchase`].
    pub user_id: user::Id,

    /// ID of the purchased [`Product`].
    pub product_id: product::Id,

    /// Number of purchased units.
    pub quantity: Quantity,

    /// Sale price multiplied by the [`Purchase::quantity`].
    pub total_price: Money,

    /// Unique [`TransactionId`] of this [`Purchase`].
    pub transaction_id: TransactionId,

    /// [`DateTime`] when this [`Purchase`] was made.
    pub purchased_at: CreationDateTime,
}

/// ID of a [`Purchase`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Opaque identifier of a [`Purchase`] transaction, unique across all the
/// [`Purchase`]s.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Generates a new random [`TransactionId`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of [`Product`] units in a [`Purchase`].
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Quantity(i32);

impl Quantity {
    /// Creates a new [`Quantity`] if the given `units` are positive.
    #[must_use]
    pub fn new(units: i32) -> Option<Self> {
        (units >= 1).then_some(Self(units))
    }

    /// Returns the number of units in this [`Quantity`].
    #[must_use]
    pub fn get(self) -> i32 {
        self.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self(1)
    }
}

/// [`DateTime`] when a [`Purchase`] was made.
pub type CreationDateTime = DateTimeOf<(Purchase, unit::Creation)>;

#[cfg(test)]
mod spec {
    use super::{Quantity, TransactionId};

    #[test]
    fn quantity_is_positive() {
        assert!(Quantity::new(0).is_none());
        assert!(Quantity::new(-3).is_none());
        assert_eq!(Quantity::new(2).map(Quantity::get), Some(2));
        assert_eq!(Quantity::default().get(), 1);
    }

    #[test]
    fn transaction_ids_are_unique() {
        assert_ne!(TransactionId::new(), TransactionId::new());
    }
}
