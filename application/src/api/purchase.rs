//! [`Purchase`]-related definitions.

use common::{DateTime, Money};
use derive_more::{Display, From, Into};
use juniper::{graphql_object, GraphQLObject, GraphQLScalar};
use service::{command, domain};
use uuid::Uuid;

use crate::{api, Context};

/// A successful acquisition of `Product` units in a `Sale`.
#[derive(Clone, Debug, From, Into)]
pub struct Purchase(domain::Purchase);

/// A successful acquisition of `Product` units in a `Sale`.
#[graphql_object(context = Context)]
impl Purchase {
    /// Unique identifier of this `Purchase`.
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// ID of the `Sale` this `Purchase` was made in.
    pub fn sale_id(&self) -> api::sale::Id {
        self.0.sale_id.into()
    }

    /// `User` who made this `Purchase`.
    pub fn buyer(&self) -> api::User {
        #[expect(
            unsafe_code,
            reason = "`Purchase` loaded from repository guarantees `User` \
                      existence"
        )]
        unsafe {
            api::User::new_unchecked(self.0.user_id)
        }
    }

    /// Purchased `Product`.
    pub fn product(&self) -> api::Product {
        #[expect(
            unsafe_code,
            reason = "`Purchase` loaded from repository guarantees `Product` \
                      existence"
        )]
        unsafe {
            api::Product::new_unchecked(self.0.product_id)
        }
    }

    /// Number of purchased units.
    pub fn quantity(&self) -> i32 {
        self.0.quantity.get()
    }

    /// Sale price of the `Product` multiplied by the `quantity`.
    pub fn total_price(&self) -> Money {
        self.0.total_price
    }

    /// Unique identifier of the transaction of this `Purchase`.
    pub fn transaction_id(&self) -> TransactionId {
        self.0.transaction_id.into()
    }

    /// `DateTime` when this `Purchase` was made.
    pub fn purchased_at(&self) -> DateTime {
        self.0.purchased_at.coerce()
    }
}

/// Unique identifier of a `Purchase`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::purchase::Id)]
#[into(domain::purchase::Id)]
#[graphql(name = "PurchaseId", transparent)]
pub struct Id(Uuid);

/// Unique identifier of a `Purchase` transaction.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::purchase::TransactionId)]
#[into(domain::purchase::TransactionId)]
#[graphql(name = "PurchaseTransactionId", transparent)]
pub struct TransactionId(Uuid);

/// Result of a successful `purchase` mutation.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(context = Context, name = "PurchaseResult")]
pub struct PurchaseResult {
    /// Recorded `Purchase`.
    pub purchase: Purchase,

    /// Number of units left in the `Sale` right after this `Purchase`.
    pub remaining_stock: i32,
}

impl From<command::make_purchase::Output> for PurchaseResult {
    fn from(output: command::make_purchase::Output) -> Self {
        let command::make_purchase::Output {
            purchase,
            remaining_stock,
        } = output;
        Self {
            purchase: purchase.into(),
            remaining_stock: remaining_stock.get(),
        }
    }
}
