//! [`Query`] collection related to the multiple [`Sale`]s.

use common::{operations::By, DateTime};

use crate::read;
#[cfg(doc)]
use crate::{domain::Sale, Query};

use super::DatabaseQuery;

/// Queries [`Sale`]s accepting purchases at the provided moment.
pub type Open = DatabaseQuery<By<read::sale::Open, DateTime>>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::{
        command::{EndSale, MakePurchase},
        domain::purchase,
        fixture, query, read, Query as _,
    };

    #[tokio::test]
    async fn lists_only_open_sales() {
        let svc = fixture::service();
        let buyer = fixture::user(&svc, "alice").await;
        let product = fixture::product(&svc, "Headphones").await;
        let now = DateTime::now();

        let open = fixture::active_sale(&svc, product.id, 10, 1).await;
        let ended = fixture::active_sale(&svc, product.id, 10, 1).await;
        _ = svc.execute(EndSale { sale_id: ended.id }).await.unwrap();
        let sold_out = fixture::active_sale(&svc, product.id, 1, 1).await;
        _ = svc
            .execute(MakePurchase {
                user_id: buyer.id,
                sale_id: sold_out.id,
                quantity: purchase::Quantity::default(),
            })
            .await
            .unwrap();
        _ = fixture::scheduled_sale(
            &svc,
            product.id,
            now + Duration::from_secs(60),
        )
        .await;

        let read::sale::Open(sales) = svc
            .execute(query::sales::Open::by(DateTime::now()))
            .await
            .unwrap();

        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].id, open.id);
    }

    #[tokio::test]
    async fn hides_sales_not_started_yet() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        _ = fixture::active_sale(&svc, product.id, 10, 1).await;

        let read::sale::Open(sales) = svc
            .execute(query::sales::Open::by(
                DateTime::now() - Duration::from_secs(3600),
            ))
            .await
            .unwrap();

        assert!(sales.is_empty());
    }
}
