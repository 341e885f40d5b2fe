//! [`Database`] implementations.

use common::{
    operations::{
        By, Commit, Increment, Insert, Lock, Reserve, Select, Transact, Update,
    },
    DateTime,
};
use itertools::Itertools as _;
use tracerr::Traced;
use uuid::Uuid;

use crate::{
    domain::{product, purchase, sale, user, Product, Purchase, Sale, User},
    infra::{database, Database},
    read,
};

use super::{Error, Memory, NonTx, State, Store, Tx};

/// Converts the provided [`Error`] into a traced [`database::Error`].
fn fail<T>(e: Error) -> Result<T, Traced<database::Error>> {
    Err(tracerr::new!(database::Error::from(e)))
}

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Memory(Tx::begin(&self.0).await))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.0.commit().await.map_err(tracerr::wrap!())
    }
}

impl<T: Store> Database<Select<By<Option<Sale>, sale::Id>>> for Memory<T> {
    type Ok = Option<Sale>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Sale>, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.sales.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<T: Store> Database<Insert<Sale>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(sale): Insert<Sale>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(sale)).await.map_err(tracerr::wrap!())
    }
}

impl<T: Store> Database<Update<Sale>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(sale): Update<Sale>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| drop(s.sales.insert(sale.id, sale)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<T: Store> Database<Lock<By<Sale, sale::Id>>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Sale, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Transactions already own the whole `State` exclusively.
        Ok(())
    }
}

impl<T: Store> Database<Reserve<By<Option<Sale>, sale::Reservation>>>
    for Memory<T>
{
    type Ok = Option<Sale>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Reserve(by): Reserve<By<Option<Sale>, sale::Reservation>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sale::Reservation {
            sale_id,
            quantity,
            at,
        } = by.into_inner();
        self.with(|s| {
            let sale = s.sales.get_mut(&sale_id)?;
            sale.reserve(quantity, at).then(|| sale.clone())
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<T: Store> Database<Select<By<read::sale::Open, DateTime>>> for Memory<T> {
    type Ok = read::sale::Open;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::sale::Open, DateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let now = by.into_inner();
        self.with(|s| {
            read::sale::Open(
                s.sales
                    .values()
                    .filter(|sale| sale.is_open_at(now))
                    .sorted_by_key(|sale| {
                        (sale.start_at, Uuid::from(sale.id))
                    })
                    .cloned()
                    .collect(),
            )
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<T: Store> Database<Select<By<read::sale::Due, DateTime>>> for Memory<T> {
    type Ok = read::sale::Due;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::sale::Due, DateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let now = by.into_inner();
        self.with(|s| {
            read::sale::Due(
                s.sales
                    .values()
                    .filter(|sale| sale.is_due_at(now))
                    .sorted_by_key(|sale| {
                        (sale.start_at, Uuid::from(sale.id))
                    })
                    .map(|sale| sale.id)
                    .collect(),
            )
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<T: Store> Database<Select<By<read::sale::ActiveCount, product::Id>>>
    for Memory<T>
{
    type Ok = read::sale::ActiveCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::sale::ActiveCount, product::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let product_id = by.into_inner();
        self.with(|s| {
            let count = s
                .sales
                .values()
                .filter(|sale| sale.product_id == product_id)
                .filter(|sale| sale.is_active())
                .count();
            read::sale::ActiveCount(i64::try_from(count).unwrap_or(i64::MAX))
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<T: Store> Database<Select<By<Option<Product>, product::Id>>>
    for Memory<T>
{
    type Ok = Option<Product>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Product>, product::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.products.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<'n, T: Store> Database<Select<By<Option<Product>, &'n product::Name>>>
    for Memory<T>
{
    type Ok = Option<Product>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Product>, &'n product::Name>>,
    ) -> Result<Self::Ok, Self::Err> {
        let name = by.into_inner();
        self.with(|s| s.products.values().find(|p| &p.name == name).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<T: Store> Database<Select<By<read::product::Catalog, ()>>> for Memory<T> {
    type Ok = read::product::Catalog;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<read::product::Catalog, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            let mut products = s
                .products
                .values()
                .filter(|p| p.is_active)
                .cloned()
                .collect::<Vec<_>>();
            products.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| Uuid::from(a.id).cmp(&Uuid::from(b.id)))
            });
            read::product::Catalog(products)
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<T: Store> Database<Insert<Product>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(product): Insert<Product>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(product)).await.map_err(tracerr::wrap!())
    }
}

impl<T: Store> Database<Update<Product>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(product): Update<Product>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            if s
                .products
                .values()
                .any(|p| p.id != product.id && p.name == product.name)
            {
                return fail(Error::UniqueViolation("products_name_key"));
            }
            drop(s.products.insert(product.id, product));
            Ok(())
        })
        .await
        .map_err(tracerr::wrap!())?
    }
}

impl<T: Store> Database<Lock<By<Product, product::Id>>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Product, product::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Transactions already own the whole `State` exclusively.
        Ok(())
    }
}

impl<T: Store> Database<Insert<Purchase>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(purchase): Insert<Purchase>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            if s
                .purchases
                .iter()
                .any(|p| p.transaction_id == purchase.transaction_id)
            {
                return fail(Error::UniqueViolation(
                    "purchases_transaction_id_key",
                ));
            }
            s.purchases.push(purchase);
            Ok(())
        })
        .await
        .map_err(tracerr::wrap!())?
    }
}

/// Returns [`Purchase`]s of the provided buyer in the provided [`Sale`] in
/// their chronological order.
fn purchases_of(
    state: &State,
    sale_id: sale::Id,
    user_id: Option<user::Id>,
) -> Vec<&Purchase> {
    // Stable sort keeps the insertion order for equal timestamps.
    state
        .purchases
        .iter()
        .filter(|p| p.sale_id == sale_id)
        .filter(|p| user_id.map_or(true, |id| p.user_id == id))
        .sorted_by_key(|p| p.purchased_at)
        .collect()
}

impl<T: Store> Database<Select<By<read::purchase::Count, (sale::Id, user::Id)>>>
    for Memory<T>
{
    type Ok = read::purchase::Count;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::purchase::Count, (sale::Id, user::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (sale_id, user_id) = by.into_inner();
        self.with(|s| {
            let count = purchases_of(s, sale_id, Some(user_id)).len();
            read::purchase::Count(i64::try_from(count).unwrap_or(i64::MAX))
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<T: Store>
    Database<Select<By<read::purchase::History, (sale::Id, user::Id)>>>
    for Memory<T>
{
    type Ok = read::purchase::History;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::purchase::History, (sale::Id, user::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (sale_id, user_id) = by.into_inner();
        self.with(|s| {
            read::purchase::History(
                purchases_of(s, sale_id, Some(user_id))
                    .into_iter()
                    .cloned()
                    .collect(),
            )
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<T: Store>
    Database<
        Select<By<read::leaderboard::Page, read::leaderboard::Selector>>,
    > for Memory<T>
{
    type Ok = read::leaderboard::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::leaderboard::Page, read::leaderboard::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::leaderboard::Selector {
            arguments,
            filter: sale_id,
        } = by.into_inner();
        self.with(|s| {
            let purchases = purchases_of(s, sale_id, None);
            let total = u64::try_from(purchases.len()).unwrap_or(u64::MAX);
            let skip = usize::try_from(arguments.offset()).unwrap_or(usize::MAX);
            let take = usize::try_from(arguments.limit()).unwrap_or(usize::MAX);
            let entries = purchases
                .into_iter()
                .skip(skip)
                .take(take)
                .filter_map(|p| {
                    let buyer = s.users.get(&p.user_id)?;
                    Some(read::LeaderboardEntry {
                        purchase: p.clone(),
                        buyer: read::user::Public {
                            id: buyer.id,
                            username: buyer.username.clone(),
                        },
                    })
                })
                .collect::<Vec<_>>();
            read::leaderboard::Page::new(&arguments, entries, total)
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<T: Store> Database<Select<By<Option<User>, user::Id>>> for Memory<T> {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.users.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<'e, T: Store> Database<Select<By<Option<User>, &'e user::Email>>>
    for Memory<T>
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'e user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();
        self.with(|s| s.users.values().find(|u| &u.email == email).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<'u, T: Store> Database<Select<By<Option<User>, &'u user::Username>>>
    for Memory<T>
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'u user::Username>>,
    ) -> Result<Self::Ok, Self::Err> {
        let username = by.into_inner();
        self.with(|s| {
            s.users.values().find(|u| &u.username == username).cloned()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<T: Store> Database<Insert<User>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(user)).await.map_err(tracerr::wrap!())
    }
}

impl<T: Store> Database<Update<User>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            let others = s.users.values().filter(|u| u.id != user.id);
            for other in others {
                if other.username == user.username {
                    return fail(Error::UniqueViolation("users_username_key"));
                }
                if other.email == user.email {
                    return fail(Error::UniqueViolation("users_email_key"));
                }
            }
            drop(s.users.insert(user.id, user));
            Ok(())
        })
        .await
        .map_err(tracerr::wrap!())?
    }
}

impl<T: Store>
    Database<
        Increment<By<Option<user::PurchaseCount>, (user::Id, purchase::Quantity)>>,
    > for Memory<T>
{
    type Ok = Option<user::PurchaseCount>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Increment(by): Increment<
            By<Option<user::PurchaseCount>, (user::Id, purchase::Quantity)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (user_id, quantity) = by.into_inner();
        self.with(|s| {
            let user = s.users.get_mut(&user_id)?;
            user.purchase_count = user::PurchaseCount::from(
                user.purchase_count.get() + i64::from(quantity.get()),
            );
            Some(user.purchase_count)
        })
        .await
        .map_err(tracerr::wrap!())
    }
}
