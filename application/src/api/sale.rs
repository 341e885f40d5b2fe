//! [`Sale`]-related definitions.

use common::DateTime;
use derive_more::{Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{api, Context};

/// A time-boxed flash sale of a single `Product`.
#[derive(Clone, Debug, From, Into)]
pub struct Sale(domain::Sale);

impl Sale {
    /// Returns the underlying [`domain::Sale`].
    #[must_use]
    pub fn inner(&self) -> &domain::Sale {
        &self.0
    }
}

/// A time-boxed flash sale of a single `Product`.
#[graphql_object(context = Context)]
impl Sale {
    /// Unique identifier of this `Sale`.
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// `Product` being sold in this `Sale`.
    pub fn product(&self) -> api::Product {
        #[expect(
            unsafe_code,
            reason = "`Sale` loaded from repository guarantees `Product` \
                      existence"
        )]
        unsafe {
            api::Product::new_unchecked(self.0.product_id)
        }
    }

    /// `DateTime` when this `Sale` is scheduled to open.
    pub fn start_at(&self) -> DateTime {
        self.0.start_at.coerce()
    }

    /// `DateTime` when this `Sale` has ended, if it has.
    pub fn end_at(&self) -> Option<DateTime> {
        self.0.end_at.map(|at| at.coerce())
    }

    /// Number of units this `Sale` was opened with.
    pub fn initial_stock(&self) -> i32 {
        self.0.initial_stock.get()
    }

    /// Number of units still available for purchasing.
    pub fn current_stock(&self) -> i32 {
        self.0.current_stock.get()
    }

    /// Maximum number of purchases a single buyer may make.
    pub fn max_per_user(&self) -> i32 {
        self.0.max_per_user.get()
    }

    /// Lifecycle status of this `Sale`.
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// Indicator whether this `Sale` is `ACTIVE`.
    pub fn is_active(&self) -> bool {
        self.0.is_active()
    }

    /// `DateTime` when this `Sale` was created.
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `Sale`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::sale::Id)]
#[into(domain::sale::Id)]
#[graphql(name = "SaleId", transparent)]
pub struct Id(Uuid);

/// Lifecycle status of a `Sale`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "SaleStatus")]
pub enum Status {
    /// `Sale` is waiting to be started.
    Scheduled,

    /// `Sale` accepts purchases.
    Active,

    /// `Sale` is over.
    Ended,
}

impl From<domain::sale::Status> for Status {
    fn from(status: domain::sale::Status) -> Self {
        use domain::sale::Status as S;

        match status {
            S::Scheduled => Self::Scheduled,
            S::Active => Self::Active,
            S::Ended => Self::Ended,
        }
    }
}

pub mod details {
    //! Definitions related to a [`Sale`] along with its [`Product`].
    //!
    //! [`Product`]: api::Product
    //! [`Sale`]: super::Sale

    use juniper::GraphQLObject;
    use service::query;

    use crate::{api, Context};

    /// `Sale` along with a snapshot of the `Product` it sells.
    #[derive(Clone, Debug, GraphQLObject)]
    #[graphql(context = Context, name = "SaleDetails")]
    pub struct Details {
        /// Queried `Sale`.
        pub sale: api::Sale,

        /// `Product` sold in the `Sale`.
        pub product: api::Product,
    }

    impl From<query::sale::Output> for Details {
        fn from(output: query::sale::Output) -> Self {
            let query::sale::Output { sale, product } = output;
            Self {
                sale: sale.into(),
                product: product.into(),
            }
        }
    }
}
