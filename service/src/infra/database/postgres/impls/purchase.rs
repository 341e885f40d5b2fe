//! [`Purchase`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Select},
    Money,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{sale, user, Purchase},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `purchases` table selected into a [`Purchase`].
const COLUMNS: &str = "\
    p.id, p.sale_id, p.user_id, p.product_id, \
    p.quantity, p.total_price, p.total_price_currency, \
    p.transaction_id, p.purchased_at";

/// Reads a [`Purchase`] out of the provided [`Row`] containing [`COLUMNS`].
fn purchase_from(row: &Row) -> Purchase {
    Purchase {
        id: row.get("id"),
        sale_id: row.get("sale_id"),
        user_id: row.get("user_id"),
        product_id: row.get("product_id"),
        quantity: row.get("quantity"),
        total_price: Money {
            amount: row.get("total_price"),
            currency: row.get("total_price_currency"),
        },
        transaction_id: row.get("transaction_id"),
        purchased_at: row.get("purchased_at"),
    }
}

impl<C> Database<Insert<Purchase>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(purchase): Insert<Purchase>,
    ) -> Result<Self::Ok, Self::Err> {
        let Purchase {
            id,
            sale_id,
            user_id,
            product_id,
            quantity,
            total_price,
            transaction_id,
            purchased_at,
        } = purchase;

        // Purchases are never updated, so no upsert here.
        const SQL: &str = "\
            INSERT INTO purchases (\
                id, sale_id, user_id, product_id, \
                quantity, total_price, total_price_currency, \
                transaction_id, purchased_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::UUID, \
                $5::INT4, $6::NUMERIC, $7::INT2, \
                $8::UUID, $9::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &sale_id,
                &user_id,
                &product_id,
                &quantity,
                &total_price.amount,
                &total_price.currency,
                &transaction_id,
                &purchased_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<read::purchase::Count, (sale::Id, user::Id)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::purchase::Count;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::purchase::Count, (sale::Id, user::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (sale_id, user_id) = by.into_inner();

        const SQL: &str = "\
            SELECT COUNT(*)::INT8 \
            FROM purchases \
            WHERE sale_id = $1::UUID \
              AND user_id = $2::UUID";
        let rows = self
            .query(SQL, &[&sale_id, &user_id])
            .await
            .map_err(tracerr::wrap!())?;
        Ok(read::purchase::Count(
            rows.first().map_or(0, |r| r.get::<_, i64>(0)),
        ))
    }
}

impl<C> Database<Select<By<read::purchase::History, (sale::Id, user::Id)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::purchase::History;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::purchase::History, (sale::Id, user::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (sale_id, user_id) = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM purchases AS p \
             WHERE p.sale_id = $1::UUID \
               AND p.user_id = $2::UUID \
             ORDER BY p.purchased_at ASC, p.seq ASC",
        );
        Ok(read::purchase::History(
            self.query(&sql, &[&sale_id, &user_id])
                .await
                .map_err(tracerr::wrap!())?
                .iter()
                .map(purchase_from)
                .collect(),
        ))
    }
}

impl<C>
    Database<
        Select<By<read::leaderboard::Page, read::leaderboard::Selector>>,
    > for Postgres<C>
where
    C: Connection,
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

        const COUNT_SQL: &str = "\
            SELECT COUNT(*)::INT8 \
            FROM purchases \
            WHERE sale_id = $1::UUID";
        let total = self
            .query(COUNT_SQL, &[&sale_id])
            .await
            .map_err(tracerr::wrap!())?
            .first()
            .map_or(0, |r| r.get::<_, i64>(0));

        let limit = i64::from(arguments.limit());
        let offset = i64::try_from(arguments.offset()).unwrap_or(i64::MAX);
        let sql = format!(
            "SELECT {COLUMNS}, u.username \
             FROM purchases AS p \
             INNER JOIN users AS u ON u.id = p.user_id \
             WHERE p.sale_id = $1::UUID \
             ORDER BY p.purchased_at ASC, p.seq ASC \
             LIMIT $2::INT8 OFFSET $3::INT8",
        );
        let entries = self
            .query(&sql, &[&sale_id, &limit, &offset])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                let purchase = purchase_from(row);
                read::LeaderboardEntry {
                    buyer: read::user::Public {
                        id: purchase.user_id,
                        username: row.get("username"),
                    },
                    purchase,
                }
            })
            .collect::<Vec<_>>();

        Ok(read::leaderboard::Page::new(
            &arguments,
            entries,
            u64::try_from(total).unwrap_or_default(),
        ))
    }
}
