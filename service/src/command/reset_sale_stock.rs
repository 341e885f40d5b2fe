//! [`Command`] for rescheduling a [`Sale`] with a fresh stock.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::Config;
use crate::{
    domain::{sale, Sale},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for resetting the stock of a non-[`sale::Status::Active`]
/// [`Sale`], moving it back to [`sale::Status::Scheduled`].
#[derive(Clone, Copy, Debug)]
pub struct ResetSaleStock {
    /// ID of the [`Sale`] to reset.
    pub sale_id: sale::Id,

    /// New [`sale::Stock`] of the [`Sale`].
    ///
    /// [`Config::default_initial_stock`] is used, if [`None`].
    pub stock: Option<sale::Stock>,
}

impl<Db> Command<ResetSaleStock> for Service<Db>
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

    async fn execute(
        &self,
        cmd: ResetSaleStock,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ResetSaleStock { sale_id, stock } = cmd;
        let stock = stock.unwrap_or(self.config().default_initial_stock);

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

        if !sale.reset(stock) {
            return Err(tracerr::new!(E::SaleActive(sale_id)));
        }

        tx.execute(Update(sale.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!("`Sale(id: {sale_id})` rescheduled with {stock} units");

        Ok(sale)
    }
}

/// Error of [`ResetSaleStock`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Sale`] with the provided ID does not exist.
    #[display("`Sale(id: {_0})` does not exist")]
    #[from(ignore)]
    SaleNotExists(#[error(not(source))] sale::Id),

    /// [`Sale`] is [`sale::Status::Active`] and cannot be reset.
    #[display("`Sale(id: {_0})` is active")]
    #[from(ignore)]
    SaleActive(#[error(not(source))] sale::Id),
}
