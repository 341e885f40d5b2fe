//! GraphQL [`Subscription`]s definitions.

use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt as _};
use juniper::graphql_subscription;
use service::{
    domain::{sale, Sale},
    query, Query as _,
};
use tracing as log;

use crate::{api, AsError, Context, Error, Service};

/// Root of all GraphQL subscription.
#[derive(Clone, Copy, Debug)]
pub struct Subscription;

impl Subscription {
    /// Name of the [`tracing::Span`] for the subscriptions.
    const SPAN_NAME: &'static str = "GraphQL subscription";

    /// Interval between re-reading a watched [`Sale`].
    const POLL_INTERVAL: Duration = Duration::from_millis(500);
}

#[graphql_subscription(context = Context)]
impl Subscription {
    /// Watches the stock and status of the `Sale` with the specified ID.
    ///
    /// Emits the current state right away, and then every time the stock or
    /// the status changes. Completes once the `Sale` is `ENDED`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `SALE_NOT_EXISTS` - the `Sale` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "saleStock",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn sale_stock(
        &self,
        id: api::sale::Id,
        ctx: &Context,
    ) -> Result<BoxStream<'static, Result<api::Sale, Error>>, Error> {
        let service = ctx.service().clone();
        let initial = fetch(&service, id.into()).await.map_err(ctx.error())?;

        let updates = stream::unfold(
            Some(initial.clone()),
            move |last: Option<Sale>| {
                let service = service.clone();
                async move {
                    let mut last = last?;
                    loop {
                        if last.status == sale::Status::Ended {
                            return None;
                        }
                        tokio::time::sleep(Self::POLL_INTERVAL).await;

                        let sale = match fetch(&service, last.id).await {
                            Ok(s) => s,
                            Err(e) => return Some((Err(e), None)),
                        };
                        if sale.current_stock != last.current_stock
                            || sale.status != last.status
                        {
                            log::debug!(
                                "`Sale(id: {})` changed: stock {}, {:?}",
                                sale.id,
                                sale.current_stock,
                                sale.status,
                            );
                            return Some((Ok(sale.clone().into()), Some(sale)));
                        }
                        last = sale;
                    }
                }
            },
        );

        Ok(stream::once(async move { Ok(initial.into()) })
            .chain(updates)
            .boxed())
    }
}

/// Reads the [`Sale`] with the provided ID.
async fn fetch(service: &Service, id: sale::Id) -> Result<Sale, Error> {
    service
        .execute(query::sale::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| api::SaleError::NotExists.into())
}
