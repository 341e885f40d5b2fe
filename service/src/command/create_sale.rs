//! [`Command`] for scheduling a new [`Sale`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{product, sale, Product, Sale},
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::Config;

use super::Command;

/// [`Command`] for scheduling a new [`Sale`].
#[derive(Clone, Copy, Debug)]
pub struct CreateSale {
    /// ID of the [`Product`] to be sold.
    pub product_id: product::Id,

    /// [`DateTime`] when the [`Sale`] should start.
    ///
    /// Must be in the future.
    pub start_at: sale::StartDateTime,

    /// [`sale::Stock`] the [`Sale`] opens with.
    ///
    /// [`Config::default_initial_stock`] is used, if [`None`].
    pub initial_stock: Option<sale::Stock>,

    /// Maximum number of purchases per buyer.
    pub max_per_user: Option<sale::PurchaseLimit>,
}

impl<Db> Command<CreateSale> for Service<Db>
where
    Db: Database<
            Select<By<Option<Product>, product::Id>>,
            Ok = Option<Product>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Sale>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Sale;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateSale) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateSale {
            product_id,
            start_at,
            initial_stock,
            max_per_user,
        } = cmd;

        let now = DateTime::now();
        if start_at.coerce() <= now {
            return Err(tracerr::new!(E::StartNotInFuture));
        }

        let product = self
            .database()
            .execute(Select(By::new(product_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ProductNotExists(product_id))
            .map_err(tracerr::wrap!())?;
        if !product.is_active {
            return Err(tracerr::new!(E::ProductInactive(product_id)));
        }

        let stock =
            initial_stock.unwrap_or(self.config().default_initial_stock);
        let sale = Sale {
            id: sale::Id::new(),
            product_id,
            start_at,
            end_at: None,
            initial_stock: stock,
            current_stock: stock,
            max_per_user: max_per_user.unwrap_or_default(),
            status: sale::Status::Scheduled,
            created_at: now.coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(sale.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Sale(id: {})` of `Product(id: {product_id})` scheduled with \
             {stock} units",
            sale.id,
        );

        Ok(sale)
    }
}

/// Error of [`CreateSale`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Product`] with the provided ID does not exist.
    #[display("`Product(id: {_0})` does not exist")]
    #[from(ignore)]
    ProductNotExists(#[error(not(source))] product::Id),

    /// [`Product`] with the provided ID is deactivated.
    #[display("`Product(id: {_0})` is deactivated")]
    #[from(ignore)]
    ProductInactive(#[error(not(source))] product::Id),

    /// [`Sale`] start is not in the future.
    #[display("`Sale` must start in the future")]
    StartNotInFuture,
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::{
        command::{CreateSale, DeactivateProduct},
        domain::{product, sale},
        fixture, Command as _,
    };

    use super::ExecutionError as E;

    fn cmd(product_id: product::Id) -> CreateSale {
        CreateSale {
            product_id,
            start_at: (DateTime::now() + Duration::from_secs(60)).coerce(),
            initial_stock: None,
            max_per_user: None,
        }
    }

    #[tokio::test]
    async fn schedules_with_defaults() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;

        let sale = svc.execute(cmd(product.id)).await.unwrap();

        assert_eq!(sale.status, sale::Status::Scheduled);
        assert!(!sale.is_active());
        assert_eq!(sale.initial_stock.get(), 200);
        assert_eq!(sale.current_stock.get(), 200);
        assert_eq!(sale.max_per_user.get(), 1);
        assert!(sale.end_at.is_none());
    }

    #[tokio::test]
    async fn uses_provided_numbers() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;

        let sale = svc
            .execute(CreateSale {
                initial_stock: sale::Stock::new(5),
                max_per_user: sale::PurchaseLimit::new(3),
                ..cmd(product.id)
            })
            .await
            .unwrap();

        assert_eq!(sale.initial_stock.get(), 5);
        assert_eq!(sale.current_stock.get(), 5);
        assert_eq!(sale.max_per_user.get(), 3);
    }

    #[tokio::test]
    async fn rejects_past_start() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;

        let err = svc
            .execute(CreateSale {
                start_at: (DateTime::now() - Duration::from_secs(1)).coerce(),
                ..cmd(product.id)
            })
            .await
            .unwrap_err();

        assert!(
            matches!(fixture::cause(&err), E::StartNotInFuture),
            "{err}",
        );
    }

    #[tokio::test]
    async fn requires_active_product() {
        let svc = fixture::service();

        let missing = product::Id::new();
        let err = svc.execute(cmd(missing)).await.unwrap_err();
        assert!(
            matches!(fixture::cause(&err), E::ProductNotExists(id) if *id == missing),
            "{err}",
        );

        let product = fixture::product(&svc, "Headphones").await;
        _ = svc
            .execute(DeactivateProduct {
                product_id: product.id,
            })
            .await
            .unwrap();
        let err = svc.execute(cmd(product.id)).await.unwrap_err();
        assert!(
            matches!(fixture::cause(&err), E::ProductInactive(_)),
            "{err}",
        );
    }
}
