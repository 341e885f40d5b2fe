//! GraphQL [`Mutation`]s definitions.

use common::{DateTime, Money};
use juniper::graphql_object;
use service::{
    command,
    domain::{purchase, sale},
    Command as _,
};

use crate::{api, define_error, AsError, Context, Error, Session};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Creates a new `User` with the provided credentials and signs it in.
    ///
    /// Only an administrator may create another administrator.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `USER_EXISTS` - provided `UserUsername` or `UserEmail` is occupied
    ///                   by another `User`;
    /// - `NOT_ADMIN` - `isAdmin` is requested by a non-administrator.
    #[tracing::instrument(
        skip_all,
        fields(
            email = %email,
            gql.name = "createUser",
            is_admin = ?is_admin,
            otel.name = Self::SPAN_NAME,
            username = %username,
        ),
    )]
    pub async fn create_user(
        username: api::user::Username,
        email: api::user::Email,
        password: api::user::Password,
        is_admin: Option<bool>,
        ctx: &Context,
    ) -> Result<api::user::session::CreateResult, Error> {
        let is_admin = is_admin.unwrap_or_default();
        if is_admin {
            drop(ctx.current_admin().await?);
        }

        let user = ctx
            .service()
            .execute(command::CreateUser {
                username: username.into(),
                email: email.into(),
                password: secrecy::SecretBox::init_with(move || {
                    password.into()
                }),
                is_admin,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;
        let output = ctx
            .service()
            .execute(command::CreateUserSession::ByUserId(user.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        ctx.set_current_session(Session {
            user_id: output.user.id.into(),
            token: output.token.clone(),
            expires_at: output.expires_at.coerce(),
            is_admin: output.user.is_admin,
        });

        Ok(output.into())
    }

    /// Creates a new `UserSession` with the provided credentials.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `WRONG_CREDENTIALS` - provided credentials does not match any `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            email = %email,
            gql.name = "createUserSession",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn create_user_session(
        email: api::user::Email,
        password: api::user::Password,
        ctx: &Context,
    ) -> Result<api::user::session::CreateResult, Error> {
        let output = ctx
            .service()
            .execute(command::CreateUserSession::ByCredentials {
                email: email.into(),
                password: secrecy::SecretBox::init_with(move || {
                    password.into()
                }),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        ctx.set_current_session(Session {
            user_id: output.user.id.into(),
            token: output.token.clone(),
            expires_at: output.expires_at.coerce(),
            is_admin: output.user.is_admin,
        });

        Ok(output.into())
    }

    /// Creates a new active `Product` in the catalog.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_PRICES` - prices are not positive, differ in currency, or
    ///                      `salePrice` exceeds `regularPrice`;
    /// - `PRODUCT_EXISTS` - provided `ProductName` is occupied by another
    ///                      `Product`;
    /// - `NOT_ADMIN` - the current `User` is not an administrator.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createProduct",
            name = %name,
            otel.name = Self::SPAN_NAME,
            regular_price = %regular_price,
            sale_price = %sale_price,
        ),
    )]
    pub async fn create_product(
        name: api::product::Name,
        description: Option<api::product::Description>,
        regular_price: Money,
        sale_price: Money,
        image_url: Option<api::product::ImageUrl>,
        ctx: &Context,
    ) -> Result<api::Product, Error> {
        drop(ctx.current_admin().await?);

        ctx.service()
            .execute(command::CreateProduct {
                name: name.into(),
                description: description.map(Into::into).unwrap_or_default(),
                regular_price,
                sale_price,
                image_url: image_url.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Deactivates the `Product` with the provided ID, so no new `Sale`s can
    /// be created for it.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PRODUCT_NOT_EXISTS` - the `Product` with the provided ID does not
    ///                          exist;
    /// - `PRODUCT_ON_SALE` - the `Product` is being sold in an `ACTIVE`
    ///                       `Sale`;
    /// - `NOT_ADMIN` - the current `User` is not an administrator.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deactivateProduct",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn deactivate_product(
        id: api::product::Id,
        ctx: &Context,
    ) -> Result<api::Product, Error> {
        drop(ctx.current_admin().await?);

        ctx.service()
            .execute(command::DeactivateProduct {
                product_id: id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Schedules a new `Sale` of the `Product` with the provided ID.
    ///
    /// `initialStock` defaults to the configured one, and `maxPerUser`
    /// defaults to `1`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_STOCK` - `initialStock` is negative;
    /// - `INVALID_PURCHASE_LIMIT` - `maxPerUser` is less than `1`;
    /// - `START_NOT_IN_FUTURE` - `startAt` is not in the future;
    /// - `PRODUCT_NOT_EXISTS` - the `Product` with the provided ID does not
    ///                          exist;
    /// - `PRODUCT_INACTIVE` - the `Product` is deactivated;
    /// - `NOT_ADMIN` - the current `User` is not an administrator.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createSale",
            initial_stock = ?initial_stock,
            max_per_user = ?max_per_user,
            otel.name = Self::SPAN_NAME,
            product_id = %product_id,
            start_at = %start_at.to_rfc3339(),
        ),
    )]
    pub async fn create_sale(
        product_id: api::product::Id,
        start_at: DateTime,
        initial_stock: Option<i32>,
        max_per_user: Option<i32>,
        ctx: &Context,
    ) -> Result<api::Sale, Error> {
        let initial_stock = initial_stock
            .map(|s| sale::Stock::new(s).ok_or(api::InputError::Stock))
            .transpose()
            .map_err(Error::from)
            .map_err(ctx.error())?;
        let max_per_user = max_per_user
            .map(|l| {
                sale::PurchaseLimit::new(l)
                    .ok_or(api::InputError::PurchaseLimit)
            })
            .transpose()
            .map_err(Error::from)
            .map_err(ctx.error())?;

        drop(ctx.current_admin().await?);

        ctx.service()
            .execute(command::CreateSale {
                product_id: product_id.into(),
                start_at: start_at.coerce(),
                initial_stock,
                max_per_user,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Starts the `SCHEDULED` `Sale` with the provided ID right away.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `SALE_NOT_EXISTS` - the `Sale` with the provided ID does not exist;
    /// - `SALE_NOT_SCHEDULED` - the `Sale` is not `SCHEDULED`;
    /// - `NOT_ADMIN` - the current `User` is not an administrator.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "startSale",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn start_sale(
        id: api::sale::Id,
        ctx: &Context,
    ) -> Result<api::Sale, Error> {
        drop(ctx.current_admin().await?);

        ctx.service()
            .execute(command::StartSale { sale_id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Ends the `ACTIVE` `Sale` with the provided ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `SALE_NOT_EXISTS` - the `Sale` with the provided ID does not exist;
    /// - `SALE_NOT_ACTIVE` - the `Sale` is not `ACTIVE`;
    /// - `NOT_ADMIN` - the current `User` is not an administrator.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "endSale",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn end_sale(
        id: api::sale::Id,
        ctx: &Context,
    ) -> Result<api::Sale, Error> {
        drop(ctx.current_admin().await?);

        ctx.service()
            .execute(command::EndSale { sale_id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Reschedules the `Sale` with the provided ID with a fresh stock.
    ///
    /// `stock` defaults to the configured one.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_STOCK` - `stock` is negative;
    /// - `SALE_NOT_EXISTS` - the `Sale` with the provided ID does not exist;
    /// - `SALE_ACTIVE` - the `Sale` is `ACTIVE`;
    /// - `NOT_ADMIN` - the current `User` is not an administrator.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "resetSaleStock",
            id = %id,
            otel.name = Self::SPAN_NAME,
            stock = ?stock,
        ),
    )]
    pub async fn reset_sale_stock(
        id: api::sale::Id,
        stock: Option<i32>,
        ctx: &Context,
    ) -> Result<api::Sale, Error> {
        let stock = stock
            .map(|s| sale::Stock::new(s).ok_or(api::InputError::Stock))
            .transpose()
            .map_err(Error::from)
            .map_err(ctx.error())?;

        drop(ctx.current_admin().await?);

        ctx.service()
            .execute(command::ResetSaleStock {
                sale_id: id.into(),
                stock,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Purchases the provided `quantity` of units in the `Sale` with the
    /// provided ID on behalf of the current `User`.
    ///
    /// `quantity` defaults to `1`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_QUANTITY` - `quantity` is less than `1`;
    /// - `STOCK_UNAVAILABLE` - the `Sale` does not exist, is not `ACTIVE`, or
    ///                         has not enough stock;
    /// - `SALE_NOT_STARTED` - the `Sale` has been started before its
    ///                        `startAt`;
    /// - `PURCHASE_LIMIT_EXCEEDED` - the current `User` has already made
    ///                               `maxPerUser` purchases in the `Sale`;
    /// - `PRODUCT_INACTIVE` - the `Product` of the `Sale` is deactivated;
    /// - `TRANSIENT_FAILURE` - the purchase failed temporarily and may be
    ///                         retried;
    /// - `AUTHORIZATION_REQUIRED` - the request is not authenticated.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "purchase",
            otel.name = Self::SPAN_NAME,
            quantity = ?quantity,
            sale_id = %sale_id,
        ),
    )]
    pub async fn purchase(
        sale_id: api::sale::Id,
        quantity: Option<i32>,
        ctx: &Context,
    ) -> Result<api::purchase::PurchaseResult, Error> {
        let quantity = quantity
            .map_or(Some(purchase::Quantity::default()), purchase::Quantity::new)
            .ok_or_else(|| api::InputError::Quantity.into())
            .map_err(ctx.error())?;

        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::MakePurchase {
                user_id: my_id.into(),
                sale_id: sale_id.into(),
                quantity,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "USER_EXISTS"]
                #[status = CONFLICT]
                #[message = "`UserUsername` or `UserEmail` is occupied by \
                             another `User`"]
                UserExists,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UsernameOccupied(_) | Self::EmailOccupied(_) => {
                Some(Error::UserExists.into())
            }
        }
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "WRONG_CREDENTIALS"]
                #[status = UNAUTHORIZED]
                #[message = "Provided credentials does not match any `User`"]
                WrongCredentials,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenEncodeError(_) => None,
            Self::UserNotExists(_) | Self::WrongCredentials => {
                Some(Error::WrongCredentials.into())
            }
        }
    }
}

impl AsError for command::create_product::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "PRODUCT_EXISTS"]
                #[status = CONFLICT]
                #[message = "`ProductName` is occupied by another `Product`"]
                ProductExists,

                #[code = "INVALID_PRICES"]
                #[status = BAD_REQUEST]
                #[message = "Prices must be positive and of the same \
                             currency, and the sale price must not exceed \
                             the regular one"]
                InvalidPrices,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NameOccupied(_) => Some(Error::ProductExists.into()),
            Self::InvalidPrices { .. } => Some(Error::InvalidPrices.into()),
        }
    }
}

impl AsError for command::deactivate_product::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "PRODUCT_ON_SALE"]
                #[status = CONFLICT]
                #[message = "`Product` is being sold in an active `Sale`"]
                ProductOnSale,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ProductNotExists(_) => {
                Some(api::query::ProductError::NotExists.into())
            }
            Self::ProductOnSale(_) => Some(Error::ProductOnSale.into()),
        }
    }
}

impl AsError for command::create_sale::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "PRODUCT_INACTIVE"]
                #[status = BAD_REQUEST]
                #[message = "`Product` is deactivated"]
                ProductInactive,

                #[code = "START_NOT_IN_FUTURE"]
                #[status = BAD_REQUEST]
                #[message = "`Sale` must start in the future"]
                StartNotInFuture,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ProductNotExists(_) => {
                Some(api::query::ProductError::NotExists.into())
            }
            Self::ProductInactive(_) => Some(Error::ProductInactive.into()),
            Self::StartNotInFuture => Some(Error::StartNotInFuture.into()),
        }
    }
}

impl AsError for command::start_sale::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "SALE_NOT_SCHEDULED"]
                #[status = CONFLICT]
                #[message = "`Sale` is not scheduled"]
                SaleNotScheduled,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::SaleNotExists(_) => {
                Some(api::query::SaleError::NotExists.into())
            }
            Self::SaleNotScheduled(_) => Some(Error::SaleNotScheduled.into()),
        }
    }
}

impl AsError for command::end_sale::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "SALE_NOT_ACTIVE"]
                #[status = CONFLICT]
                #[message = "`Sale` is not active"]
                SaleNotActive,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::SaleNotExists(_) => {
                Some(api::query::SaleError::NotExists.into())
            }
            Self::SaleNotActive(_) => Some(Error::SaleNotActive.into()),
        }
    }
}

impl AsError for command::reset_sale_stock::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "SALE_ACTIVE"]
                #[status = CONFLICT]
                #[message = "`Sale` is active and cannot be reset"]
                SaleActive,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::SaleNotExists(_) => {
                Some(api::query::SaleError::NotExists.into())
            }
            Self::SaleActive(_) => Some(Error::SaleActive.into()),
        }
    }
}

impl AsError for command::make_purchase::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "STOCK_UNAVAILABLE"]
                #[status = CONFLICT]
                #[message = "`Sale` is not active or has not enough stock"]
                StockUnavailable,

                #[code = "SALE_NOT_STARTED"]
                #[status = CONFLICT]
                #[message = "`Sale` has not started yet"]
                SaleNotStarted,

                #[code = "PURCHASE_LIMIT_EXCEEDED"]
                #[status = CONFLICT]
                #[message = "Purchase limit of the `Sale` is exceeded"]
                PurchaseLimitExceeded,

                #[code = "PRODUCT_INACTIVE"]
                #[status = CONFLICT]
                #[message = "`Product` of the `Sale` is deactivated"]
                ProductInactive,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::StockUnavailable(_) => Some(Error::StockUnavailable.into()),
            Self::SaleNotStarted(_) => Some(Error::SaleNotStarted.into()),
            Self::PurchaseLimitExceeded(_) => {
                Some(Error::PurchaseLimitExceeded.into())
            }
            Self::ProductNotExists(_) => {
                Some(api::query::ProductError::NotExists.into())
            }
            Self::ProductInactive(_) => Some(Error::ProductInactive.into()),
            Self::UserNotExists(_) => {
                Some(api::query::UserError::NotExists.into())
            }
            Self::TotalPriceOverflow => None,
        }
    }
}

#[cfg(test)]
mod spec {
    use service::{
        command::{create_user, make_purchase},
        domain::{product, sale, user},
    };

    use crate::AsError as _;

    #[test]
    fn maps_purchase_rejections_to_conflicts() {
        let sale_id = sale::Id::new();

        for (err, code) in [
            (
                make_purchase::ExecutionError::StockUnavailable(sale_id),
                "STOCK_UNAVAILABLE",
            ),
            (
                make_purchase::ExecutionError::SaleNotStarted(sale_id),
                "SALE_NOT_STARTED",
            ),
            (
                make_purchase::ExecutionError::PurchaseLimitExceeded(sale_id),
                "PURCHASE_LIMIT_EXCEEDED",
            ),
            (
                make_purchase::ExecutionError::ProductInactive(
                    product::Id::new(),
                ),
                "PRODUCT_INACTIVE",
            ),
        ] {
            let err = err.into_error();
            assert_eq!(err.code, code);
            assert_eq!(err.status_code, http::StatusCode::CONFLICT);
        }
    }

    #[test]
    fn maps_missing_purchase_parties_to_not_found() {
        let product = make_purchase::ExecutionError::ProductNotExists(
            product::Id::new(),
        )
        .into_error();
        assert_eq!(product.code, "PRODUCT_NOT_EXISTS");
        assert_eq!(product.status_code, http::StatusCode::NOT_FOUND);

        let user =
            make_purchase::ExecutionError::UserNotExists(user::Id::new())
                .into_error();
        assert_eq!(user.code, "USER_NOT_EXISTS");
        assert_eq!(user.status_code, http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn hides_overflow_as_internal() {
        let err = make_purchase::ExecutionError::TotalPriceOverflow.into_error();

        assert_eq!(err.code, "INTERNAL_SERVER_ERROR");
        assert_eq!(
            err.status_code,
            http::StatusCode::INTERNAL_SERVER_ERROR,
        );
    }

    #[test]
    fn maps_occupied_credentials_to_user_exists() {
        let err = create_user::ExecutionError::UsernameOccupied(
            user::Username::new("alice").unwrap(),
        )
        .into_error();

        assert_eq!(err.code, "USER_EXISTS");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);
    }
}
