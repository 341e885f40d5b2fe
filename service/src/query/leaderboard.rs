//! [`Leaderboard`] definition.

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::Purchase;
use crate::{
    domain::{sale, Sale},
    infra::{database, Database},
    read, Query, Service,
};

/// [`Query`] of a [`Sale`] leaderboard: its [`Purchase`]s in the order they
/// were made, along with the buyers.
#[derive(Clone, Copy, Debug)]
pub struct Leaderboard {
    /// ID of the [`Sale`] to query the leaderboard of.
    pub sale_id: sale::Id,

    /// [`read::leaderboard::Arguments`] of the requested page.
    pub arguments: read::leaderboard::Arguments,
}

impl<Db> Query<Leaderboard> for Service<Db>
where
    Db: Database<
            Select<By<Option<Sale>, sale::Id>>,
            Ok = Option<Sale>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<read::leaderboard::Page, read::leaderboard::Selector>>,
            Ok = read::leaderboard::Page,
            Err = Traced<database::Error>,
        >,
{
    type Ok = read::leaderboard::Page;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        Leaderboard { sale_id, arguments }: Leaderboard,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        drop(
            self.database()
                .execute(Select(By::<Option<Sale>, _>::new(sale_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::SaleNotExists(sale_id))
                .map_err(tracerr::wrap!())?,
        );

        self.database()
            .execute(Select(By::new(read::leaderboard::Selector {
                arguments,
                filter: sale_id,
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`Leaderboard`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Sale`] with the provided ID does not exist.
    #[display("`Sale(id: {_0})` does not exist")]
    #[from(ignore)]
    SaleNotExists(#[error(not(source))] sale::Id),
}

#[cfg(test)]
mod spec {
    use std::num::NonZeroU32;

    use crate::{
        command::MakePurchase,
        domain::{purchase, sale, Sale},
        fixture,
        query::Leaderboard,
        read, Query as _,
    };

    use super::ExecutionError as E;

    fn page(sale: &Sale, page: u32, limit: u32) -> Leaderboard {
        Leaderboard {
            sale_id: sale.id,
            arguments: read::leaderboard::Arguments::new(
                Some(page),
                Some(limit),
                NonZeroU32::new(50).unwrap(),
                NonZeroU32::new(100).unwrap(),
            )
            .unwrap(),
        }
    }

    #[tokio::test]
    async fn orders_by_purchase_time() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::active_sale(&svc, product.id, 10, 1).await;
        let mut buyers = Vec::new();
        for name in ["alice", "bob", "carol"] {
            let buyer = fixture::user(&svc, name).await;
            _ = svc
                .execute(MakePurchase {
                    user_id: buyer.id,
                    sale_id: sale.id,
                    quantity: purchase::Quantity::default(),
                })
                .await
                .unwrap();
            buyers.push(buyer);
        }

        let board = svc.execute(page(&sale, 1, 50)).await.unwrap();

        let ids = board.items.iter().map(|e| e.buyer.id).collect::<Vec<_>>();
        assert_eq!(ids, buyers.iter().map(|u| u.id).collect::<Vec<_>>());
        for (entry, buyer) in board.items.iter().zip(&buyers) {
            assert_eq!(entry.buyer.username, buyer.username);
            assert_eq!(entry.purchase.user_id, buyer.id);
        }
        assert!(board
            .items
            .windows(2)
            .all(|w| w[0].purchase.purchased_at <= w[1].purchase.purchased_at));
        assert_eq!(board.info.total, 3);
        assert_eq!(board.info.pages, 1);
    }

    #[tokio::test]
    async fn paginates() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::active_sale(&svc, product.id, 10, 1).await;
        let mut buyers = Vec::new();
        for i in 0..5 {
            let buyer = fixture::user(&svc, &format!("buyer_{i}")).await;
            _ = svc
                .execute(MakePurchase {
                    user_id: buyer.id,
                    sale_id: sale.id,
                    quantity: purchase::Quantity::default(),
                })
                .await
                .unwrap();
            buyers.push(buyer);
        }

        let second = svc.execute(page(&sale, 2, 2)).await.unwrap();
        assert_eq!(second.items.len(), 2);
        assert_eq!(second.items[0].buyer.id, buyers[2].id);
        assert_eq!(second.items[1].buyer.id, buyers[3].id);
        assert_eq!(second.info.total, 5);
        assert_eq!(second.info.page, 2);
        assert_eq!(second.info.limit, 2);
        assert_eq!(second.info.pages, 3);

        let last = svc.execute(page(&sale, 3, 2)).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].buyer.id, buyers[4].id);

        let beyond = svc.execute(page(&sale, 4, 2)).await.unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.info.total, 5);
    }

    #[tokio::test]
    async fn is_empty_for_sale_without_purchases() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::active_sale(&svc, product.id, 10, 1).await;

        let board = svc.execute(page(&sale, 1, 50)).await.unwrap();

        assert!(board.items.is_empty());
        assert_eq!(board.info.total, 0);
        assert_eq!(board.info.pages, 0);
    }

    #[tokio::test]
    async fn fails_for_missing_sale() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        let mut sale = fixture::active_sale(&svc, product.id, 10, 1).await;
        sale.id = sale::Id::new();

        let err = svc.execute(page(&sale, 1, 50)).await.unwrap_err();

        assert!(
            matches!(fixture::cause(&err), E::SaleNotExists(_)),
            "{err}",
        );
    }
}
