//! [`Query`] collection related to the multiple [`Product`]s.

use common::operations::By;

#[cfg(doc)]
use crate::{domain::Product, Query};
use crate::read;

use super::DatabaseQuery;

/// Queries all the active [`Product`]s, newest first.
pub type Catalog = DatabaseQuery<By<read::product::Catalog, ()>>;

#[cfg(test)]
mod spec {
    use crate::{
        command::DeactivateProduct, fixture, query, read, Query as _,
    };

    #[tokio::test]
    async fn lists_only_active_products() {
        let svc = fixture::service();
        let headphones = fixture::product(&svc, "Headphones").await;
        let speaker = fixture::product(&svc, "Speaker").await;
        _ = svc
            .execute(DeactivateProduct {
                product_id: headphones.id,
            })
            .await
            .unwrap();

        let read::product::Catalog(products) = svc
            .execute(query::products::Catalog::by(()))
            .await
            .unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, speaker.id);
    }
}
