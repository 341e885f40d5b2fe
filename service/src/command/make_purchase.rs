//! [`Command`] for purchasing [`Product`] units in a [`Sale`].

use common::{
    operations::{
        By, Commit, Increment, Insert, Reserve, Select, Transact, Transacted,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{product, purchase, sale, user, Product, Purchase, Sale},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for purchasing [`Product`] units in an
/// [`sale::Status::Active`] [`Sale`].
///
/// All the checks and writes happen in a single transaction: either the
/// stock is decremented, the [`Purchase`] is recorded and the buyer's
/// [`user::PurchaseCount`] is incremented, or nothing changes at all.
#[derive(Clone, Copy, Debug)]
pub struct MakePurchase {
    /// ID of the buying [`User`].
    ///
    /// [`User`]: crate::domain::User
    pub user_id: user::Id,

    /// ID of the [`Sale`] to buy in.
    pub sale_id: sale::Id,

    /// Number of units to buy.
    pub quantity: purchase::Quantity,
}

/// Output of [`MakePurchase`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Recorded [`Purchase`].
    pub purchase: Purchase,

    /// [`sale::Stock`] left in the [`Sale`] after this [`Purchase`].
    pub remaining_stock: sale::Stock,
}

impl<Db> Command<MakePurchase> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Reserve<By<Option<Sale>, sale::Reservation>>,
            Ok = Option<Sale>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<read::purchase::Count, (sale::Id, user::Id)>>,
            Ok = read::purchase::Count,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Product>, product::Id>>,
            Ok = Option<Product>,
            Err = Traced<database::Error>,
        > + Database<
            Increment<
                By<
                    Option<user::PurchaseCount>,
                    (user::Id, purchase::Quantity),
                >,
            >,
            Ok = Option<user::PurchaseCount>,
            Err = Traced<database::Error>,
        > + Database<Insert<Purchase>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: MakePurchase) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let MakePurchase {
            user_id,
            sale_id,
            quantity,
        } = cmd;

        let now = DateTime::now();

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let Some(sale) = tx
            .execute(Reserve(By::new(sale::Reservation {
                sale_id,
                quantity,
                at: now.coerce(),
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        else {
            log::debug!(
                "`User(id: {user_id})` got no stock in `Sale(id: {sale_id})`",
            );
            return Err(tracerr::new!(E::StockUnavailable(sale_id)));
        };

        if now < sale.start_at.coerce() {
            log::debug!(
                "`User(id: {user_id})` is too early for `Sale(id: {sale_id})`",
            );
            return Err(tracerr::new!(E::SaleNotStarted(sale_id)));
        }

        let read::purchase::Count(made) = tx
            .execute(Select(By::new((sale_id, user_id))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if made >= i64::from(sale.max_per_user.get()) {
            log::debug!(
                "`User(id: {user_id})` reached the limit of \
                 `Sale(id: {sale_id})`",
            );
            return Err(tracerr::new!(E::PurchaseLimitExceeded(sale_id)));
        }

        let product = tx
            .execute(Select(By::<Option<Product>, _>::new(sale.product_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ProductNotExists(sale.product_id))
            .map_err(tracerr::wrap!())?;
        if !product.is_active {
            log::debug!(
                "`Sale(id: {sale_id})` sells deactivated \
                 `Product(id: {})`",
                product.id,
            );
            return Err(tracerr::new!(E::ProductInactive(product.id)));
        }
        let total_price = u32::try_from(quantity.get())
            .ok()
            .and_then(|q| product.sale_price.checked_mul(q))
            .ok_or(E::TotalPriceOverflow)
            .map_err(tracerr::wrap!())?;

        // Goes before the `Purchase` insertion, so a missing `User` is
        // detected without violating any foreign key.
        _ = tx
            .execute(Increment(By::new((user_id, quantity))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        let purchase = Purchase {
            id: purchase::Id::new(),
            sale_id,
            user_id,
            product_id: product.id,
            quantity,
            total_price,
            transaction_id: purchase::TransactionId::new(),
            purchased_at: now.coerce(),
        };
        tx.execute(Insert(purchase.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`User(id: {user_id})` purchased {quantity} units in \
             `Sale(id: {sale_id})`, {} left",
            sale.current_stock,
        );

        Ok(Output {
            purchase,
            remaining_stock: sale.current_stock,
        })
    }
}

/// Error of [`MakePurchase`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Sale`] is not [`sale::Status::Active`], doesn't exist or has not
    /// enough [`sale::Stock`].
    #[display("`Sale(id: {_0})` has not enough stock")]
    #[from(ignore)]
    StockUnavailable(#[error(not(source))] sale::Id),

    /// [`Sale`] is activated, but its start is not reached yet.
    #[display("`Sale(id: {_0})` has not started yet")]
    #[from(ignore)]
    SaleNotStarted(#[error(not(source))] sale::Id),

    /// Buyer has already made the maximum number of [`Purchase`]s in the
    /// [`Sale`].
    #[display("Purchase limit of `Sale(id: {_0})` is exceeded")]
    #[from(ignore)]
    PurchaseLimitExceeded(#[error(not(source))] sale::Id),

    /// [`Product`] of the [`Sale`] does not exist.
    #[display("`Product(id: {_0})` does not exist")]
    #[from(ignore)]
    ProductNotExists(#[error(not(source))] product::Id),

    /// [`Product`] of the [`Sale`] is deactivated.
    #[display("`Product(id: {_0})` is deactivated")]
    #[from(ignore)]
    ProductInactive(#[error(not(source))] product::Id),

    /// Buying [`User`] does not exist.
    ///
    /// [`User`]: crate::domain::User
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),

    /// Total price of the [`Purchase`] is too large.
    #[display("`Purchase` total price overflows")]
    TotalPriceOverflow,
}

impl ExecutionError {
    /// Checks whether retrying the [`MakePurchase`] may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Db(e) => e.is_transient(),
            Self::StockUnavailable(_)
            | Self::SaleNotStarted(_)
            | Self::PurchaseLimitExceeded(_)
            | Self::ProductNotExists(_)
            | Self::ProductInactive(_)
            | Self::UserNotExists(_)
            | Self::TotalPriceOverflow => false,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::{str::FromStr as _, time::Duration};

    use common::{DateTime, Money};
    use futures::future;

    use crate::{
        command::{DeactivateProduct, MakePurchase, StartSale},
        domain::{purchase, sale, user, Sale},
        fixture, Command as _,
    };

    use super::ExecutionError as E;

    fn buy(user_id: user::Id, sale: &Sale, quantity: i32) -> MakePurchase {
        MakePurchase {
            user_id,
            sale_id: sale.id,
            quantity: purchase::Quantity::new(quantity).unwrap(),
        }
    }

    #[tokio::test]
    async fn records_purchase() {
        let svc = fixture::service();
        let buyer = fixture::user(&svc, "alice").await;
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::active_sale(&svc, product.id, 10, 3).await;

        let out = svc.execute(buy(buyer.id, &sale, 2)).await.unwrap();

        assert_eq!(out.remaining_stock.get(), 8);
        assert_eq!(out.purchase.sale_id, sale.id);
        assert_eq!(out.purchase.user_id, buyer.id);
        assert_eq!(out.purchase.product_id, product.id);
        assert_eq!(out.purchase.quantity.get(), 2);
        assert_eq!(
            out.purchase.total_price,
            Money::from_str("299.98USD").unwrap(),
        );

        let stored = svc.database().snapshot().await;
        assert_eq!(stored.sale(sale.id).unwrap().current_stock.get(), 8);
        assert!(stored.sale(sale.id).unwrap().is_active());
        assert_eq!(stored.purchases().len(), 1);
        assert_eq!(stored.user(buyer.id).unwrap().purchase_count.get(), 2);
    }

    // `Memory` holds its state locked for a whole transaction, so the
    // concurrent purchases below are serialized and never race inside the
    // stock decrement. `never_oversells_on_postgres` covers that race.
    #[tokio::test]
    async fn never_oversells() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::active_sale(&svc, product.id, 5, 1).await;
        let mut buyers = Vec::new();
        for i in 0..20 {
            buyers.push(fixture::user(&svc, &format!("buyer_{i}")).await);
        }

        let results = future::join_all(
            buyers.iter().map(|u| svc.execute(buy(u.id, &sale, 1))),
        )
        .await;

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 5);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                matches!(fixture::cause(err), E::StockUnavailable(_)),
                "{err}",
            );
        }
        let stored = svc.database().snapshot().await;
        let stored_sale = stored.sale(sale.id).unwrap();
        assert_eq!(stored_sale.current_stock.get(), 0);
        assert_eq!(stored_sale.status, sale::Status::Ended);
        assert_eq!(stored.purchases().len(), 5);
        let units: i32 =
            stored.purchases().iter().map(|p| p.quantity.get()).sum();
        assert_eq!(units, 5);
    }

    #[tokio::test]
    async fn enforces_limit_concurrently() {
        let svc = fixture::service();
        let buyer = fixture::user(&svc, "alice").await;
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::active_sale(&svc, product.id, 100, 2).await;

        let results = future::join_all(
            (0..10).map(|_| svc.execute(buy(buyer.id, &sale, 1))),
        )
        .await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                matches!(fixture::cause(err), E::PurchaseLimitExceeded(_)),
                "{err}",
            );
        }
        let stored = svc.database().snapshot().await;
        assert_eq!(stored.sale(sale.id).unwrap().current_stock.get(), 98);
        assert_eq!(stored.user(buyer.id).unwrap().purchase_count.get(), 2);
    }

    #[tokio::test]
    async fn rolls_back_rejected_purchase() {
        let svc = fixture::service();
        let buyer = fixture::user(&svc, "alice").await;
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::active_sale(&svc, product.id, 10, 1).await;
        _ = svc.execute(buy(buyer.id, &sale, 1)).await.unwrap();

        let err = svc.execute(buy(buyer.id, &sale, 1)).await.unwrap_err();

        assert!(
            matches!(fixture::cause(&err), E::PurchaseLimitExceeded(_)),
            "{err}",
        );
        let stored = svc.database().snapshot().await;
        assert_eq!(stored.sale(sale.id).unwrap().current_stock.get(), 9);
        assert_eq!(stored.purchases().len(), 1);
        assert_eq!(stored.user(buyer.id).unwrap().purchase_count.get(), 1);
    }

    #[tokio::test]
    async fn rolls_back_for_unknown_user() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::active_sale(&svc, product.id, 10, 1).await;

        let err = svc
            .execute(buy(user::Id::new(), &sale, 1))
            .await
            .unwrap_err();

        assert!(
            matches!(fixture::cause(&err), E::UserNotExists(_)),
            "{err}",
        );
        let stored = svc.database().snapshot().await;
        assert_eq!(stored.sale(sale.id).unwrap().current_stock.get(), 10);
        assert!(stored.purchases().is_empty());
    }

    #[tokio::test]
    async fn leaves_no_trace_on_commit_failure() {
        let svc = fixture::service();
        let buyer = fixture::user(&svc, "alice").await;
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::active_sale(&svc, product.id, 10, 1).await;

        svc.database().fail_next_commit();
        let err = svc.execute(buy(buyer.id, &sale, 1)).await.unwrap_err();

        assert!(
            matches!(fixture::cause(&err), E::Db(_)),
            "{err}",
        );
        assert!(fixture::cause(&err).is_transient());
        let stored = svc.database().snapshot().await;
        assert_eq!(stored.sale(sale.id).unwrap().current_stock.get(), 10);
        assert!(stored.purchases().is_empty());
        assert_eq!(stored.user(buyer.id).unwrap().purchase_count.get(), 0);

        let out = svc.execute(buy(buyer.id, &sale, 1)).await.unwrap();
        assert_eq!(out.remaining_stock.get(), 9);
    }

    #[tokio::test]
    async fn ends_sale_on_depletion() {
        let svc = fixture::service();
        let alice = fixture::user(&svc, "alice").await;
        let bob = fixture::user(&svc, "bob").await;
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::active_sale(&svc, product.id, 3, 5).await;

        let out = svc.execute(buy(alice.id, &sale, 3)).await.unwrap();

        assert_eq!(out.remaining_stock.get(), 0);
        let stored = svc.database().snapshot().await;
        let ended = stored.sale(sale.id).unwrap();
        assert_eq!(ended.status, sale::Status::Ended);
        assert!(!ended.is_active());
        assert!(ended.end_at.is_some());

        let err = svc.execute(buy(bob.id, &sale, 1)).await.unwrap_err();
        assert!(
            matches!(fixture::cause(&err), E::StockUnavailable(_)),
            "{err}",
        );
    }

    #[tokio::test]
    async fn rejects_quantity_above_stock() {
        let svc = fixture::service();
        let buyer = fixture::user(&svc, "alice").await;
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::active_sale(&svc, product.id, 2, 5).await;

        let err = svc.execute(buy(buyer.id, &sale, 3)).await.unwrap_err();

        assert!(
            matches!(fixture::cause(&err), E::StockUnavailable(_)),
            "{err}",
        );
        let stored = svc.database().snapshot().await;
        assert_eq!(stored.sale(sale.id).unwrap().current_stock.get(), 2);
    }

    #[tokio::test]
    async fn rejects_early_started_sale() {
        let svc = fixture::service();
        let buyer = fixture::user(&svc, "alice").await;
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::scheduled_sale(
            &svc,
            product.id,
            DateTime::now() + Duration::from_secs(3600),
        )
        .await;

        let err = svc.execute(buy(buyer.id, &sale, 1)).await.unwrap_err();
        assert!(
            matches!(fixture::cause(&err), E::StockUnavailable(_)),
            "{err}",
        );

        _ = svc.execute(StartSale { sale_id: sale.id }).await.unwrap();
        let err = svc.execute(buy(buyer.id, &sale, 1)).await.unwrap_err();
        assert!(
            matches!(fixture::cause(&err), E::SaleNotStarted(_)),
            "{err}",
        );
        let stored = svc.database().snapshot().await;
        assert_eq!(stored.sale(sale.id).unwrap().current_stock.get(), 200);
    }

    #[tokio::test]
    async fn refuses_deactivated_product() {
        let svc = fixture::service();
        let buyer = fixture::user(&svc, "alice").await;
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::scheduled_sale(
            &svc,
            product.id,
            DateTime::now() - Duration::from_secs(1),
        )
        .await;
        _ = svc
            .execute(DeactivateProduct {
                product_id: product.id,
            })
            .await
            .unwrap();
        _ = svc.execute(StartSale { sale_id: sale.id }).await.unwrap();

        let err = svc.execute(buy(buyer.id, &sale, 1)).await.unwrap_err();

        assert!(
            matches!(fixture::cause(&err), E::ProductInactive(_)),
            "{err}",
        );
        let stored = svc.database().snapshot().await;
        assert_eq!(stored.sale(sale.id).unwrap().current_stock.get(), 200);
        assert!(stored.purchases().is_empty());
        assert_eq!(stored.user(buyer.id).unwrap().purchase_count.get(), 0);
    }

    #[cfg(feature = "postgres")]
    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "requires PostgreSQL at `TEST_POSTGRES_URL`"]
    async fn never_oversells_on_postgres() {
        use secrecy::SecretBox;
        use uuid::Uuid;

        use crate::{
            command::{CreateProduct, CreateSale, CreateUser},
            domain::product,
            infra::{postgres, Postgres},
            query, Query as _, Service,
        };

        postgres::embed_migrations!("../migrations");

        let conf = postgres::Config {
            url: Some(std::env::var("TEST_POSTGRES_URL").unwrap()),
            ..postgres::Config::default()
        };
        let mut db = Postgres::new(&conf, Duration::from_secs(5)).unwrap();
        _ = migrations::runner().run_async(&mut db).await.unwrap();
        let svc = Service {
            config: fixture::service().config().clone(),
            database: db,
        };

        let tag = Uuid::new_v4().simple().to_string();
        let product = svc
            .execute(CreateProduct {
                name: product::Name::new(format!("Racing {tag}")).unwrap(),
                description: product::Description::default(),
                regular_price: Money::from_str("10.00USD").unwrap(),
                sale_price: Money::from_str("5.00USD").unwrap(),
                image_url: None,
            })
            .await
            .unwrap();
        let race = svc
            .execute(CreateSale {
                product_id: product.id,
                start_at: (DateTime::now() + Duration::from_secs(1)).coerce(),
                initial_stock: Some(sale::Stock::new(5).unwrap()),
                max_per_user: None,
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        _ = svc.execute(StartSale { sale_id: race.id }).await.unwrap();

        let mut buyers = Vec::new();
        for i in 0..20 {
            let name = format!("r{i}_{}", &tag[..16]);
            buyers.push(
                svc.execute(CreateUser {
                    username: user::Username::new(name.as_str()).unwrap(),
                    email: user::Email::new(format!("{name}@example.com"))
                        .unwrap(),
                    password: SecretBox::new(Box::new(
                        user::Password::new(fixture::PASSWORD).unwrap(),
                    )),
                    is_admin: false,
                })
                .await
                .unwrap(),
            );
        }

        let results = future::join_all(
            buyers.iter().map(|u| svc.execute(buy(u.id, &race, 1))),
        )
        .await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 5);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                matches!(fixture::cause(err), E::StockUnavailable(_)),
                "{err}",
            );
        }
        let stored = svc
            .execute(query::sale::ById::by(race.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.current_stock.get(), 0);
        assert_eq!(stored.status, sale::Status::Ended);
    }
}
