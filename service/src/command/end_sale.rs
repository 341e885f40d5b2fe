//! [`Command`] for ending a [`Sale`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{sale, Sale},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for ending an [`sale::Status::Active`] [`Sale`].
#[derive(Clone, Copy, Debug, From)]
pub struct EndSale {
    /// ID of the [`Sale`] to end.
    pub sale_id: sale::Id,
}

impl<Db> Command<EndSale> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Sale, sale::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Sale>, sale::Id>>,
            Ok = Option<Sale>,
            Err = Traced<database::Error>,
        > + Database<Update<Sale>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Sale;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: EndSale) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let EndSale { sale_id } = cmd;

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

        if !sale.end(sale::EndDateTime::now()) {
            return Err(tracerr::new!(E::SaleNotActive(sale_id)));
        }

        tx.execute(Update(sale.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Sale(id: {sale_id})` ended with {} units left",
            sale.current_stock,
        );

        Ok(sale)
    }
}

/// Error of [`EndSale`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Sale`] with the provided ID does not exist.
    #[display("`Sale(id: {_0})` does not exist")]
    #[from(ignore)]
    SaleNotExists(#[error(not(source))] sale::Id),

    /// [`Sale`] is not [`sale::Status::Active`].
    #[display("`Sale(id: {_0})` is not active")]
    #[from(ignore)]
    SaleNotActive(#[error(not(source))] sale::Id),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::{command::EndSale, domain::sale, fixture, Command as _};

    use super::ExecutionError as E;

    #[tokio::test]
    async fn ends_active_sale() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::active_sale(&svc, product.id, 10, 1).await;

        let before = sale::EndDateTime::now();
        let ended = svc.execute(EndSale { sale_id: sale.id }).await.unwrap();

        assert_eq!(ended.status, sale::Status::Ended);
        assert!(!ended.is_active());
        assert!(ended.end_at.unwrap() >= before);
        assert_eq!(ended.current_stock.get(), 10);
    }

    #[tokio::test]
    async fn rejects_not_active() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        let start_at = DateTime::now() + Duration::from_secs(60);
        let sale = fixture::scheduled_sale(&svc, product.id, start_at).await;

        let err = svc.execute(EndSale { sale_id: sale.id }).await.unwrap_err();
        assert!(
            matches!(fixture::cause(&err), E::SaleNotActive(_)),
            "{err}",
        );

        let sale = fixture::active_sale(&svc, product.id, 10, 1).await;
        _ = svc.execute(EndSale { sale_id: sale.id }).await.unwrap();
        let err = svc.execute(EndSale { sale_id: sale.id }).await.unwrap_err();
        assert!(
            matches!(fixture::cause(&err), E::SaleNotActive(_)),
            "{err}",
        );
    }
}
