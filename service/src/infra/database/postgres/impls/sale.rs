//! [`Sale`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{By, Insert, Lock, Reserve, Select, Update},
    DateTime,
};
use tracerr::Traced;

use crate::{
    domain::{product, sale, Sale},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

impl<C, IDs> Database<Select<By<HashMap<sale::Id, Sale>, IDs>>> for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[sale::Id]>,
{
    type Ok = HashMap<sale::Id, Sale>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<sale::Id, Sale>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        let ids: &[sale::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = i32::try_from(ids.len()).unwrap_or(i32::MAX);

        const SQL: &str = "\
            SELECT id, product_id, \
                   start_at, end_at, \
                   initial_stock, current_stock, \
                   max_per_user, status, \
                   created_at \
            FROM sale_events \
            WHERE id IN (SELECT unnest($1::UUID[]) LIMIT $2::INT4) \
            LIMIT $2::INT4";
        Ok(self
            .query(SQL, &[&ids, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let id = row.get("id");
                (
                    id,
                    Sale {
                        id,
                        product_id: row.get("product_id"),
                        start_at: row.get("start_at"),
                        end_at: row.get("end_at"),
                        initial_stock: row.get("initial_stock"),
                        current_stock: row.get("current_stock"),
                        max_per_user: row.get("max_per_user"),
                        status: row.get("status"),
                        created_at: row.get("created_at"),
                    },
                )
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Sale>, sale::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<sale::Id, Sale>, [sale::Id; 1]>>,
        Ok = HashMap<sale::Id, Sale>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Sale>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Sale>, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Insert<Sale>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Sale>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(sale): Insert<Sale>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(sale)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Sale>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(sale): Update<Sale>,
    ) -> Result<Self::Ok, Self::Err> {
        let is_active = sale.is_active();
        let Sale {
            id,
            product_id,
            start_at,
            end_at,
            initial_stock,
            current_stock,
            max_per_user,
            status,
            created_at,
        } = sale;

        const SQL: &str = "\
            INSERT INTO sale_events (\
                id, product_id, \
                start_at, end_at, \
                initial_stock, current_stock, \
                max_per_user, status, is_active, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, \
                $3::TIMESTAMPTZ, $4::TIMESTAMPTZ, \
                $5::INT4, $6::INT4, \
                $7::INT4, $8::INT2, $9::BOOLEAN, \
                $10::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET product_id = EXCLUDED.product_id, \
                start_at = EXCLUDED.start_at, \
                end_at = EXCLUDED.end_at, \
                initial_stock = EXCLUDED.initial_stock, \
                current_stock = EXCLUDED.current_stock, \
                max_per_user = EXCLUDED.max_per_user, \
                status = EXCLUDED.status, \
                is_active = EXCLUDED.is_active, \
                created_at = EXCLUDED.created_at";
        self.exec(
            SQL,
            &[
                &id,
                &product_id,
                &start_at,
                &end_at,
                &initial_stock,
                &current_stock,
                &max_per_user,
                &status,
                &is_active,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Sale, sale::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Sale, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: sale::Id = by.into_inner();

        const SQL: &str = "\
            SELECT 1 \
            FROM sale_events \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Reserve<By<Option<Sale>, sale::Reservation>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<Option<Sale>, sale::Id>>,
        Ok = Option<Sale>,
        Err = Traced<database::Error>,
    >,
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

        // The row stays locked until the end of the transaction, so the
        // follow-up `SELECT` observes exactly this decrement.
        const SQL: &str = "\
            UPDATE sale_events \
            SET current_stock = current_stock - $2::INT4, \
                status = CASE \
                    WHEN current_stock - $2::INT4 <= 0 THEN $4::INT2 \
                    ELSE status \
                END, \
                is_active = current_stock - $2::INT4 > 0, \
                end_at = CASE \
                    WHEN current_stock - $2::INT4 <= 0 THEN $5::TIMESTAMPTZ \
                    ELSE end_at \
                END \
            WHERE id = $1::UUID \
              AND status = $3::INT2 \
              AND current_stock >= $2::INT4 \
            RETURNING id";
        let reserved = self
            .query_opt(
                SQL,
                &[
                    &sale_id,
                    &quantity,
                    &sale::Status::Active,
                    &sale::Status::Ended,
                    &at,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?;
        if reserved.is_none() {
            return Ok(None);
        }

        self.execute(Select(By::new(sale_id)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Select<By<read::sale::Open, DateTime>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<sale::Id, Sale>, Vec<sale::Id>>>,
        Ok = HashMap<sale::Id, Sale>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::sale::Open;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::sale::Open, DateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let now = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM sale_events \
            WHERE status = $1::INT2 \
              AND start_at <= $2::TIMESTAMPTZ \
              AND (end_at IS NULL OR end_at > $2::TIMESTAMPTZ) \
              AND current_stock > 0 \
            ORDER BY start_at ASC, id ASC";
        let ids = self
            .query(SQL, &[&sale::Status::Active, &now])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| row.get::<_, sale::Id>("id"))
            .collect::<Vec<_>>();

        let mut sales = self
            .execute(Select(By::new(ids.clone())))
            .await
            .map_err(tracerr::wrap!())?;
        Ok(read::sale::Open(
            ids.iter().filter_map(|id| sales.remove(id)).collect(),
        ))
    }
}

impl<C> Database<Select<By<read::sale::Due, DateTime>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::sale::Due;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::sale::Due, DateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let now = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM sale_events \
            WHERE status = $1::INT2 \
              AND start_at <= $2::TIMESTAMPTZ \
            ORDER BY start_at ASC, id ASC";
        Ok(read::sale::Due(
            self.query(SQL, &[&sale::Status::Scheduled, &now])
                .await
                .map_err(tracerr::wrap!())?
                .into_iter()
                .map(|row| row.get("id"))
                .collect(),
        ))
    }
}

impl<C> Database<Select<By<read::sale::ActiveCount, product::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::sale::ActiveCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::sale::ActiveCount, product::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let product_id = by.into_inner();

        const SQL: &str = "\
            SELECT COUNT(*)::INT8 \
            FROM sale_events \
            WHERE product_id = $1::UUID \
              AND status = $2::INT2";
        let row = self
            .query(SQL, &[&product_id, &sale::Status::Active])
            .await
            .map_err(tracerr::wrap!())?;
        Ok(read::sale::ActiveCount(
            row.first().map_or(0, |r| r.get::<_, i64>(0)),
        ))
    }
}
