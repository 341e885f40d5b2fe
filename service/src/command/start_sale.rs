//! [`Command`] for starting a [`Sale`] manually.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{product, sale, Product, Sale},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for starting a [`sale::Status::Scheduled`] [`Sale`].
///
/// The [`Sale`] may be started before its [`Sale::start_at`], but purchases
/// are still rejected until then.
#[derive(Clone, Copy, Debug, From)]
pub struct StartSale {
    /// ID of the [`Sale`] to start.
    pub sale_id: sale::Id,
}

impl<Db> Command<StartSale> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Sale, sale::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Sale>, sale::Id>>,
            Ok = Option<Sale>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Product, product::Id>>,
            Err = Traced<database::Error>,
        > + Database<Update<Sale>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Sale;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: StartSale) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let StartSale { sale_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Lock(By::<Sale, _>::new(sale_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        let mut sale = tx
            .execute(Select(By::new(sale_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SaleNotExists(sale_id))
            .map_err(tracerr::wrap!())?;
        // Serializes with a concurrent `Product` deactivation.
        tx.execute(Lock(By::<Product, _>::new(sale.product_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if !sale.activate() {
            return Err(tracerr::new!(E::SaleNotScheduled(sale_id)));
        }

        tx.execute(Update(sale.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!("`Sale(id: {sale_id})` started manually");

        Ok(sale)
    }
}

/// Error of [`StartSale`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Sale`] with the provided ID does not exist.
    #[display("`Sale(id: {_0})` does not exist")]
    #[from(ignore)]
    SaleNotExists(#[error(not(source))] sale::Id),

    /// [`Sale`] is not [`sale::Status::Scheduled`].
    #[display("`Sale(id: {_0})` is not scheduled")]
    #[from(ignore)]
    SaleNotScheduled(#[error(not(source))] sale::Id),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::{
        command::{EndSale, StartSale},
        domain::sale,
        fixture, Command as _,
    };

    use super::ExecutionError as E;

    #[tokio::test]
    async fn activates_scheduled_sale_early() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        let start_at = DateTime::now() + Duration::from_secs(3600);
        let sale = fixture::scheduled_sale(&svc, product.id, start_at).await;

        let started = svc.execute(StartSale { sale_id: sale.id }).await.unwrap();

        assert_eq!(started.status, sale::Status::Active);
        assert!(started.is_active());
        assert!(started.end_at.is_none());
        assert_eq!(started.start_at, sale.start_at);
        let stored = svc.database().snapshot().await;
        assert!(stored.sale(sale.id).unwrap().is_active());
    }

    #[tokio::test]
    async fn rejects_not_scheduled() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::active_sale(&svc, product.id, 10, 1).await;

        let err = svc.execute(StartSale { sale_id: sale.id }).await.unwrap_err();
        assert!(
            matches!(fixture::cause(&err), E::SaleNotScheduled(_)),
            "{err}",
        );

        _ = svc.execute(EndSale { sale_id: sale.id }).await.unwrap();
        let err = svc.execute(StartSale { sale_id: sale.id }).await.unwrap_err();
        assert!(
            matches!(fixture::cause(&err), E::SaleNotScheduled(_)),
            "{err}",
        );
    }

    #[tokio::test]
    async fn rejects_missing() {
        let svc = fixture::service();

        let err = svc
            .execute(StartSale {
                sale_id: sale::Id::new(),
            })
            .await
            .unwrap_err();

        assert!(
            matches!(fixture::cause(&err), E::SaleNotExists(_)),
            "{err}",
        );
    }
}
