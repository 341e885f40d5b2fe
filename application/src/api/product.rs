//! [`Product`]-related definitions.

use std::future;

use common::{DateTime, Handler as _, Money};
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLScalar};
use service::{domain, query};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{api, api::scalar, AsError, Context, Error};

/// A catalog item sold in sales.
#[derive(Clone, Debug, From)]
pub struct Product {
    /// ID of this [`Product`].
    id: Id,

    /// Underlying [`domain::Product`].
    product: OnceCell<domain::Product>,
}

impl From<domain::Product> for Product {
    fn from(product: domain::Product) -> Self {
        Self {
            id: product.id.into(),
            product: OnceCell::new_with(Some(product)),
        }
    }
}

impl Product {
    /// Creates a new [`Product`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Product`] with the provided ID exists,
    /// otherwise accessing this [`Product`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            product: OnceCell::new(),
        }
    }

    /// Returns the underlying [`domain::Product`].
    ///
    /// # Errors
    ///
    /// Errors if the [`domain::Product`] doesn't exist.
    async fn product(&self, ctx: &Context) -> Result<&domain::Product, Error> {
        let id = self.id.into();
        self.product
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::product::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|p| {
                        future::ready(p.ok_or_else(|| {
                            api::query::ProductError::NotExists.into()
                        }))
                    })
            })
            .await
    }
}

/// A catalog item sold in sales.
#[graphql_object(context = Context)]
impl Product {
    /// Unique identifier of this `Product`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Product.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Name of this `Product`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Product.name",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn name(&self, ctx: &Context) -> Result<Name, Error> {
        Ok(self.product(ctx).await?.name.clone().into())
    }

    /// Description of this `Product`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Product.description",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn description(
        &self,
        ctx: &Context,
    ) -> Result<Description, Error> {
        Ok(self.product(ctx).await?.description.clone().into())
    }

    /// Regular price of this `Product`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Product.regularPrice",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn regular_price(&self, ctx: &Context) -> Result<Money, Error> {
        Ok(self.product(ctx).await?.regular_price)
    }

    /// Discounted price of this `Product` in a sale.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Product.salePrice",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn sale_price(&self, ctx: &Context) -> Result<Money, Error> {
        Ok(self.product(ctx).await?.sale_price)
    }

    /// URL of this `Product` image, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Product.imageUrl",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn image_url(
        &self,
        ctx: &Context,
    ) -> Result<Option<ImageUrl>, Error> {
        Ok(self.product(ctx).await?.image_url.clone().map(Into::into))
    }

    /// Indicator whether new sales may be created for this `Product`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Product.isActive",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn is_active(&self, ctx: &Context) -> Result<bool, Error> {
        Ok(self.product(ctx).await?.is_active)
    }

    /// `DateTime` when this `Product` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Product.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.product(ctx).await?.created_at.coerce())
    }
}

/// Unique identifier of a `Product`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::product::Id)]
#[into(domain::product::Id)]
#[graphql(name = "ProductId", transparent)]
pub struct Id(Uuid);

/// Name of a `Product`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ProductName",
    with = scalar::Via::<domain::product::Name>,
)]
pub struct Name(domain::product::Name);

/// Description of a `Product`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ProductDescription",
    with = scalar::Via::<domain::product::Description>,
)]
pub struct Description(domain::product::Description);

/// URL of a `Product` image.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ProductImageUrl",
    with = scalar::Via::<domain::product::ImageUrl>,
)]
pub struct ImageUrl(domain::product::ImageUrl);
