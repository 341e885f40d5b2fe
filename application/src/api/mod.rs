//! GraphQL API definitions.

pub mod leaderboard;
mod mutation;
pub mod product;
pub mod purchase;
mod query;
pub mod sale;
pub mod scalar;
mod subscription;
pub mod user;

use crate::define_error;

pub use self::{
    mutation::Mutation,
    product::Product,
    purchase::Purchase,
    query::{ProductError, Query, SaleError, UserError},
    sale::Sale,
    subscription::Subscription,
    user::User,
};

/// GraphQL schema.
pub type Schema = juniper::RootNode<'static, Query, Mutation, Subscription>;

/// Creates a new GraphQL [`Schema`].
#[must_use]
pub fn schema() -> Schema {
    Schema::new(Query, Mutation, Subscription)
}

define_error! {
    enum PrivilegeError {
        #[code = "NOT_ADMIN"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be an administrator"]
        Admin,
    }
}

define_error! {
    enum InputError {
        #[code = "INVALID_QUANTITY"]
        #[status = BAD_REQUEST]
        #[message = "Quantity must be a positive number"]
        Quantity,

        #[code = "INVALID_STOCK"]
        #[status = BAD_REQUEST]
        #[message = "Stock must be a non-negative number"]
        Stock,

        #[code = "INVALID_PURCHASE_LIMIT"]
        #[status = BAD_REQUEST]
        #[message = "Purchase limit must be a positive number"]
        PurchaseLimit,

        #[code = "INVALID_PAGINATION_ARGUMENTS"]
        #[status = BAD_REQUEST]
        #[message = "Page must be positive, and limit must be between 1 and \
                     100"]
        Pagination,
    }
}

/// Converts the provided count into a GraphQL `Int`, saturating on overflow.
pub(crate) fn saturate(n: impl TryInto<i32>) -> i32 {
    n.try_into().unwrap_or(i32::MAX)
}
