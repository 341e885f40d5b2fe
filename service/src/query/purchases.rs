//! [`Query`] collection related to the multiple [`Purchase`]s.

use common::operations::By;

#[cfg(doc)]
use crate::{
    domain::{Purchase, Sale, User},
    Query,
};
use crate::{
    domain::{sale, user},
    read,
};

use super::DatabaseQuery;

/// Queries [`Purchase`]s a [`User`] made in a [`Sale`], oldest first.
pub type History =
    DatabaseQuery<By<read::purchase::History, (sale::Id, user::Id)>>;

#[cfg(test)]
mod spec {
    use crate::{
        command::MakePurchase, domain::purchase, fixture, query, read,
        Query as _,
    };

    #[tokio::test]
    async fn returns_own_purchases_only() {
        let svc = fixture::service();
        let alice = fixture::user(&svc, "alice").await;
        let bob = fixture::user(&svc, "bob").await;
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::active_sale(&svc, product.id, 10, 3).await;
        for buyer in [&alice, &bob, &alice] {
            _ = svc
                .execute(MakePurchase {
                    user_id: buyer.id,
                    sale_id: sale.id,
                    quantity: purchase::Quantity::default(),
                })
                .await
                .unwrap();
        }

        let read::purchase::History(history) = svc
            .execute(query::purchases::History::by((sale.id, alice.id)))
            .await
            .unwrap();

        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|p| p.user_id == alice.id));
        assert!(history[0].purchased_at <= history[1].purchased_at);
    }
}
