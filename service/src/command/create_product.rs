//! [`Command`] for creating a new [`Product`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{product, Product},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Product`].
#[derive(Clone, Debug)]
pub struct CreateProduct {
    /// [`product::Name`] of a new [`Product`].
    pub name: product::Name,

    /// [`product::Description`] of a new [`Product`].
    pub description: product::Description,

    /// Regular price of a new [`Product`].
    pub regular_price: Money,

    /// Discounted price of a new [`Product`] in a sale.
    pub sale_price: Money,

    /// [`product::ImageUrl`] of a new [`Product`].
    pub image_url: Option<product::ImageUrl>,
}

impl<Db> Command<CreateProduct> for Service<Db>
where
    Db: for<'n> Database<
            Select<By<Option<Product>, &'n product::Name>>,
            Ok = Option<Product>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Product>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Product;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateProduct) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateProduct {
            name,
            description,
            regular_price,
            sale_price,
            image_url,
        } = cmd;

        if !Product::check_prices(&regular_price, &sale_price) {
            return Err(tracerr::new!(E::InvalidPrices {
                regular: regular_price,
                sale: sale_price,
            }));
        }

        let p = self
            .database()
            .execute(Select(By::new(&name)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if p.is_some() {
            return Err(tracerr::new!(E::NameOccupied(name)));
        }

        let product = Product {
            id: product::Id::new(),
            name,
            description,
            regular_price,
            sale_price,
            image_url,
            is_active: true,
            created_at: product::CreationDateTime::now(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let inserted = tx.execute(Insert(product.clone())).await;
        if let Err(e) = &inserted {
            let e: &database::Error = e.as_ref();
            if e.is_unique_violation(Some("products_name_key")) {
                return Err(tracerr::new!(E::NameOccupied(product.name)));
            }
        }
        inserted
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!("`Product(id: {})` created", product.id);

        Ok(product)
    }
}

/// Error of [`CreateProduct`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`product::Name`] is already occupied.
    #[display("`{_0}` product name is occupied")]
    #[from(ignore)]
    NameOccupied(#[error(not(source))] product::Name),

    /// Prices are not positive, differ in currency, or the sale price exceeds
    /// the regular one.
    #[display("Invalid prices: regular `{regular}`, sale `{sale}`")]
    #[from(ignore)]
    InvalidPrices {
        /// Provided regular price.
        regular: Money,

        /// Provided sale price.
        sale: Money,
    },
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::Money;

    use crate::{command::CreateProduct, domain::product, fixture, Command as _};

    use super::ExecutionError as E;

    fn cmd(name: &str, regular: &str, sale: &str) -> CreateProduct {
        CreateProduct {
            name: product::Name::new(name).unwrap(),
            description: product::Description::default(),
            regular_price: Money::from_str(regular).unwrap(),
            sale_price: Money::from_str(sale).unwrap(),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn creates_active_product() {
        let svc = fixture::service();

        let product = svc
            .execute(cmd("Headphones", "199.99USD", "149.99USD"))
            .await
            .unwrap();

        assert!(product.is_active);
        assert_eq!(product.name, product::Name::new("Headphones").unwrap());
        let stored = svc.database().snapshot().await;
        assert!(stored.product(product.id).is_some());
    }

    #[tokio::test]
    async fn rejects_invalid_prices() {
        let svc = fixture::service();

        for (regular, sale) in [
            ("100USD", "120USD"),
            ("100USD", "0USD"),
            ("100USD", "90EUR"),
        ] {
            let err = svc
                .execute(cmd("Headphones", regular, sale))
                .await
                .unwrap_err();
            assert!(
                matches!(fixture::cause(&err), E::InvalidPrices { .. }),
                "{err}",
            );
        }
    }

    #[tokio::test]
    async fn rejects_occupied_name() {
        let svc = fixture::service();
        _ = fixture::product(&svc, "Headphones").await;

        let err = svc
            .execute(cmd("Headphones", "10USD", "5USD"))
            .await
            .unwrap_err();

        assert!(
            matches!(fixture::cause(&err), E::NameOccupied(_)),
            "{err}",
        );
    }
}
