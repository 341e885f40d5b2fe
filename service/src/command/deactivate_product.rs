//! [`Command`] for deactivating a [`Product`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::{sale, Sale};
use crate::{
    domain::{product, Product},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for deactivating a [`Product`], so no new [`Sale`]s can be
/// created for it.
///
/// A [`Product`] referenced by a [`sale::Status::Active`] [`Sale`] cannot be
/// deactivated. Deactivating an inactive [`Product`] is a no-op.
#[derive(Clone, Copy, Debug, From)]
pub struct DeactivateProduct {
    /// ID of the [`Product`] to deactivate.
    pub product_id: product::Id,
}

impl<Db> Command<DeactivateProduct> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Product, product::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Product>, product::Id>>,
            Ok = Option<Product>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<read::sale::ActiveCount, product::Id>>,
            Ok = read::sale::ActiveCount,
            Err = Traced<database::Error>,
        > + Database<Update<Product>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Product;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeactivateProduct,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeactivateProduct { product_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Lock(By::<Product, _>::new(product_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        let mut product = tx
            .execute(Select(By::<Option<Product>, _>::new(product_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ProductNotExists(product_id))
            .map_err(tracerr::wrap!())?;
        if !product.is_active {
            return Ok(product);
        }

        let read::sale::ActiveCount(active) = tx
            .execute(Select(By::<read::sale::ActiveCount, _>::new(product_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if active > 0 {
            return Err(tracerr::new!(E::ProductOnSale(product_id)));
        }

        product.is_active = false;
        tx.execute(Update(product.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!("`Product(id: {product_id})` deactivated");

        Ok(product)
    }
}

/// Error of [`DeactivateProduct`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Product`] with the provided ID does not exist.
    #[display("`Product(id: {_0})` does not exist")]
    #[from(ignore)]
    ProductNotExists(#[error(not(source))] product::Id),

    /// [`Product`] is being sold in an active [`Sale`].
    #[display("`Product(id: {_0})` is on sale")]
    #[from(ignore)]
    ProductOnSale(#[error(not(source))] product::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{DeactivateProduct, EndSale},
        domain::product,
        fixture, Command as _,
    };

    use super::ExecutionError as E;

    #[tokio::test]
    async fn deactivates_idle_product() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;

        let out = svc
            .execute(DeactivateProduct {
                product_id: product.id,
            })
            .await
            .unwrap();

        assert!(!out.is_active);
        let stored = svc.database().snapshot().await;
        assert!(!stored.product(product.id).unwrap().is_active);

        let again = svc
            .execute(DeactivateProduct {
                product_id: product.id,
            })
            .await
            .unwrap();
        assert!(!again.is_active);
    }

    #[tokio::test]
    async fn refuses_while_on_sale() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::active_sale(&svc, product.id, 10, 1).await;

        let err = svc
            .execute(DeactivateProduct {
                product_id: product.id,
            })
            .await
            .unwrap_err();
        assert!(
            matches!(fixture::cause(&err), E::ProductOnSale(_)),
            "{err}",
        );
        let stored = svc.database().snapshot().await;
        assert!(stored.product(product.id).unwrap().is_active);

        _ = svc.execute(EndSale { sale_id: sale.id }).await.unwrap();
        let out = svc
            .execute(DeactivateProduct {
                product_id: product.id,
            })
            .await
            .unwrap();
        assert!(!out.is_active);
    }

    #[tokio::test]
    async fn rejects_missing() {
        let svc = fixture::service();

        let err = svc
            .execute(DeactivateProduct {
                product_id: product::Id::new(),
            })
            .await
            .unwrap_err();

        assert!(
            matches!(fixture::cause(&err), E::ProductNotExists(_)),
            "{err}",
        );
    }
}
