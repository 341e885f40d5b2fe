//! [`Query`] collection related to a single [`Sale`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{product, sale, Product, Sale},
    infra::{database, Database},
    Query, Service,
};

use super::DatabaseQuery;

/// Queries a [`Sale`] by its [`sale::Id`].
pub type ById = DatabaseQuery<By<Option<Sale>, sale::Id>>;

/// [`Query`] of a [`Sale`] along with the [`Product`] it sells.
#[derive(Clone, Copy, Debug, From)]
pub struct Details {
    /// ID of the [`Sale`] to query.
    pub sale_id: sale::Id,
}

/// Output of the [`Details`] [`Query`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Queried [`Sale`].
    pub sale: Sale,

    /// [`Product`] sold in the [`Sale`].
    pub product: Product,
}

impl<Db> Query<Details> for Service<Db>
where
    Db: Database<
            Select<By<Option<Sale>, sale::Id>>,
            Ok = Option<Sale>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Product>, product::Id>>,
            Ok = Option<Product>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        Details { sale_id }: Details,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let sale = self
            .database()
            .execute(Select(By::<Option<Sale>, _>::new(sale_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SaleNotExists(sale_id))
            .map_err(tracerr::wrap!())?;
        let product = self
            .database()
            .execute(Select(By::<Option<Product>, _>::new(sale.product_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ProductNotExists(sale.product_id))
            .map_err(tracerr::wrap!())?;

        Ok(Output { sale, product })
    }
}

/// Error of [`Details`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Sale`] with the provided ID does not exist.
    #[display("`Sale(id: {_0})` does not exist")]
    #[from(ignore)]
    SaleNotExists(#[error(not(source))] sale::Id),

    /// [`Product`] of the [`Sale`] does not exist.
    #[display("`Product(id: {_0})` does not exist")]
    #[from(ignore)]
    ProductNotExists(#[error(not(source))] product::Id),
}

#[cfg(test)]
mod spec {
    use crate::{domain::sale, fixture, query, Query as _};

    use super::ExecutionError as E;

    #[tokio::test]
    async fn returns_sale_with_product() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::active_sale(&svc, product.id, 10, 1).await;

        let out = svc
            .execute(query::sale::Details { sale_id: sale.id })
            .await
            .unwrap();

        assert_eq!(out.sale.id, sale.id);
        assert_eq!(out.product.id, product.id);
        assert_eq!(out.product.sale_price, product.sale_price);
    }

    #[tokio::test]
    async fn fails_for_missing_sale() {
        let svc = fixture::service();

        let err = svc
            .execute(query::sale::Details {
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
