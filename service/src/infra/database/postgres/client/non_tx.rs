//! [`NonTx`] client definitions.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection},
};

/// Non-transactional Postgres database client.
///
/// Holds a single pooled [`Connection`], acquired on the first use and shared
/// by all the clones of this client.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to acquire [`Connection`]s from.
    pub(crate) pool: connection::Pool,

    /// Pooled [`Connection`] for non-transactional operations, if acquired.
    connection: Arc<RwLock<Option<connection::NonTx>>>,
}

impl NonTx {
    /// Creates a new [`NonTx`] client from the provided [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self {
            pool,
            connection: Arc::new(RwLock::new(None)),
        }
    }

    /// Acquires a fresh [`Connection`] from the [`connection::Pool`].
    pub(crate) async fn acquire(
        &self,
    ) -> Result<connection::NonTx, Traced<database::Error>> {
        self.pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    /// Returns the underlying [`Connection`] of this [`NonTx`] client,
    /// acquiring it if necessary.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::NonTx>, Traced<database::Error>>
    {
        let conn = self.connection.read().await;
        let guard = if conn.is_none() {
            drop(conn);

            let mut conn = self.connection.write().await;
            if conn.is_none() {
                *conn = Some(self.acquire().await.map_err(tracerr::wrap!())?);
            }
            conn.downgrade()
        } else {
            conn
        };

        Ok(RwLockReadGuard::map(guard, |conn| {
            conn.as_ref()
                .expect("connection cannot be dropped while guard is alive")
        }))
    }

    /// Takes the underlying [`Connection`] from this [`NonTx`] client, so a
    /// transaction may be started on it.
    ///
    /// Next time this [`NonTx`] client is used, it acquires a new
    /// [`Connection`].
    #[must_use]
    pub(crate) async fn take_connection(&self) -> Option<connection::NonTx> {
        self.connection.write().await.take()
    }
}

super::delegate_connection!(NonTx);
