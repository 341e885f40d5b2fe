//! GraphQL [`Query`]s definitions.

use std::num::NonZeroU32;

use common::DateTime;
use juniper::graphql_object;
use service::{query, read, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";

    /// Default number of entries on a leaderboard page.
    const LEADERBOARD_DEFAULT_LIMIT: NonZeroU32 =
        NonZeroU32::MIN.saturating_add(49);

    /// Maximum number of entries on a leaderboard page.
    const LEADERBOARD_MAX_LIMIT: NonZeroU32 =
        NonZeroU32::MIN.saturating_add(99);
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the currently authenticated `User`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authenticated.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "myUser",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_user(ctx: &Context) -> Result<api::User, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(query::user::ById::by(my_id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| UserError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Product` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PRODUCT_NOT_EXISTS` - the `Product` with the specified ID does not
    ///                          exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "product",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn product(
        id: api::product::Id,
        ctx: &Context,
    ) -> Result<api::Product, Error> {
        ctx.service()
            .execute(query::product::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| ProductError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the active `Product`s, newest first.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "products",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn products(ctx: &Context) -> Result<Vec<api::Product>, Error> {
        ctx.service()
            .execute(query::products::Catalog::by(()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|read::product::Catalog(products)| {
                products.into_iter().map(Into::into).collect()
            })
    }

    /// Returns the `Sale` with the specified ID along with a snapshot of the
    /// `Product` it sells.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `SALE_NOT_EXISTS` - the `Sale` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "sale",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn sale(
        id: api::sale::Id,
        ctx: &Context,
    ) -> Result<api::sale::details::Details, Error> {
        ctx.service()
            .execute(query::sale::Details { sale_id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Sale`s accepting purchases right now, ordered by their
    /// start.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "activeSales",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn active_sales(ctx: &Context) -> Result<Vec<api::Sale>, Error> {
        ctx.service()
            .execute(query::sales::Open::by(DateTime::now()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|read::sale::Open(sales)| {
                sales.into_iter().map(Into::into).collect()
            })
    }

    /// Fetches the page of the `Sale` leaderboard: its `Purchase`s in the
    /// order they were made.
    ///
    /// `page` defaults to `1`, and `limit` defaults to `50`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_PAGINATION_ARGUMENTS` - `page` or `limit` is less than `1`,
    ///                                    or `limit` is greater than `100`;
    /// - `SALE_NOT_EXISTS` - the `Sale` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "leaderboard",
            limit = ?limit,
            otel.name = Self::SPAN_NAME,
            page = ?page,
            sale_id = %sale_id,
        ),
    )]
    pub async fn leaderboard(
        sale_id: api::sale::Id,
        page: Option<i32>,
        limit: Option<i32>,
        ctx: &Context,
    ) -> Result<api::leaderboard::Page, Error> {
        let arguments = read::leaderboard::Arguments::new(
            page,
            limit,
            Self::LEADERBOARD_DEFAULT_LIMIT,
            Self::LEADERBOARD_MAX_LIMIT,
        )
        .ok_or_else(|| api::InputError::Pagination.into())
        .map_err(ctx.error())?;

        ctx.service()
            .execute(query::Leaderboard {
                sale_id: sale_id.into(),
                arguments,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Purchase`s the current `User` made in the `Sale` with the
    /// specified ID, oldest first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the request is not authenticated.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "myPurchases",
            otel.name = Self::SPAN_NAME,
            sale_id = %sale_id,
        ),
    )]
    pub async fn my_purchases(
        sale_id: api::sale::Id,
        ctx: &Context,
    ) -> Result<Vec<api::Purchase>, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(query::purchases::History::by((
                sale_id.into(),
                my_id.into(),
            )))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|read::purchase::History(purchases)| {
                purchases.into_iter().map(Into::into).collect()
            })
    }
}

impl AsError for query::sale::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::SaleNotExists(_) => Some(SaleError::NotExists.into()),
            Self::ProductNotExists(_) => Some(ProductError::NotExists.into()),
        }
    }
}

impl AsError for query::leaderboard::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::SaleNotExists(_) => Some(SaleError::NotExists.into()),
        }
    }
}

define_error! {
    enum ProductError {
        #[code = "PRODUCT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Product` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum SaleError {
        #[code = "SALE_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Sale` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` with the specified ID does not exist"]
        NotExists,
    }
}

#[cfg(test)]
mod spec {
    use service::{
        domain::{product, sale},
        query,
    };

    use crate::AsError as _;

    use super::Query;

    #[test]
    fn caps_leaderboard_limit() {
        assert_eq!(Query::LEADERBOARD_DEFAULT_LIMIT.get(), 50);
        assert_eq!(Query::LEADERBOARD_MAX_LIMIT.get(), 100);
    }

    #[test]
    fn maps_missing_entities_to_not_found() {
        let sale = query::sale::ExecutionError::SaleNotExists(sale::Id::new())
            .into_error();
        assert_eq!(sale.code, "SALE_NOT_EXISTS");
        assert_eq!(sale.status_code, http::StatusCode::NOT_FOUND);

        let product = query::sale::ExecutionError::ProductNotExists(
            product::Id::new(),
        )
        .into_error();
        assert_eq!(product.code, "PRODUCT_NOT_EXISTS");

        let leaderboard =
            query::leaderboard::ExecutionError::SaleNotExists(sale::Id::new())
                .into_error();
        assert_eq!(leaderboard.code, "SALE_NOT_EXISTS");
    }
}
