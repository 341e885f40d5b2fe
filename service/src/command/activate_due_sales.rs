//! [`Command`] for activating [`Sale`]s whose start is due.

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{sale, Sale},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for activating every [`sale::Status::Scheduled`] [`Sale`]
/// whose start is due at the provided moment.
///
/// Returns the number of activated [`Sale`]s. Executing it repeatedly for
/// the same moment activates nothing new.
#[derive(Clone, Copy, Debug)]
pub struct ActivateDueSales {
    /// Moment to check the [`Sale`]s against.
    pub now: DateTime,
}

impl<Db> Command<ActivateDueSales> for Service<Db>
where
    Db: Database<
            Select<By<read::sale::Due, DateTime>>,
            Ok = read::sale::Due,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
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
    type Ok = usize;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ActivateDueSales,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ActivateDueSales { now } = cmd;

        let read::sale::Due(due) = self
            .database()
            .execute(Select(By::new(now)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut activated = 0;
        for sale_id in due {
            let tx = self
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            tx.execute(Lock(By::<Sale, _>::new(sale_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            let Some(mut sale) = tx
                .execute(Select(By::new(sale_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
            else {
                continue;
            };
            // Might be started or rescheduled concurrently.
            if !sale.is_due_at(now) || !sale.activate() {
                continue;
            }

            tx.execute(Update(sale))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            log::info!("`Sale(id: {sale_id})` activated");
            activated += 1;
        }

        Ok(activated)
    }
}

/// Error of [`ActivateDueSales`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::{
        command::{ActivateDueSales, StartSale},
        domain::sale,
        fixture, Command as _,
    };

    #[tokio::test]
    async fn activates_only_due_sales() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        let now = DateTime::now();
        let due = fixture::scheduled_sale(
            &svc,
            product.id,
            now - Duration::from_secs(1),
        )
        .await;
        let later = fixture::scheduled_sale(
            &svc,
            product.id,
            now + Duration::from_secs(3600),
        )
        .await;

        let count = svc.execute(ActivateDueSales { now }).await.unwrap();

        assert_eq!(count, 1);
        let stored = svc.database().snapshot().await;
        assert_eq!(stored.sale(due.id).unwrap().status, sale::Status::Active);
        assert_eq!(
            stored.sale(later.id).unwrap().status,
            sale::Status::Scheduled,
        );
    }

    #[tokio::test]
    async fn is_idempotent() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        let now = DateTime::now();
        for _ in 0..3 {
            _ = fixture::scheduled_sale(
                &svc,
                product.id,
                now - Duration::from_secs(5),
            )
            .await;
        }

        assert_eq!(svc.execute(ActivateDueSales { now }).await.unwrap(), 3);
        assert_eq!(svc.execute(ActivateDueSales { now }).await.unwrap(), 0);
        assert_eq!(svc.execute(ActivateDueSales { now }).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn skips_manually_started() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        let now = DateTime::now();
        let sale = fixture::scheduled_sale(
            &svc,
            product.id,
            now - Duration::from_secs(1),
        )
        .await;
        _ = svc.execute(StartSale { sale_id: sale.id }).await.unwrap();

        assert_eq!(svc.execute(ActivateDueSales { now }).await.unwrap(), 0);
    }
}
