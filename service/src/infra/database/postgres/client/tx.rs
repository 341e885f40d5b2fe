//! [`Tx`] client definitions.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tracerr::Traced;

use crate::infra::database::{self, postgres::connection};

use super::NonTx;

/// Transactional Postgres database client.
///
/// The transaction is started lazily on the first statement, reusing the
/// [`NonTx`] client connection if it has one. Dropping all the clones of a
/// [`Tx`] client without committing rolls the transaction back.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`NonTx`] client this [`Tx`] client was started from.
    origin: NonTx,

    /// Lazily started [`connection::Tx`].
    tx: Arc<RwLock<Option<connection::Tx>>>,
}

impl Tx {
    /// Creates a new [`Tx`] client from the provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(client: NonTx) -> Self {
        Self {
            origin: client,
            tx: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the underlying [`connection::Tx`] of this [`Tx`] client,
    /// starting the transaction if necessary.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        let tx = self.tx.read().await;
        let guard = if tx.is_none() {
            drop(tx);

            let mut tx = self.tx.write().await;
            if tx.is_none() {
                let conn = match self.origin.take_connection().await {
                    Some(c) => c,
                    None => {
                        self.origin.acquire().await.map_err(tracerr::wrap!())?
                    }
                };
                *tx = Some(
                    connection::Tx::from_non_tx(conn)
                        .await
                        .map_err(tracerr::wrap!())?,
                );
            }
            tx.downgrade()
        } else {
            tx
        };

        Ok(RwLockReadGuard::map(guard, |tx| {
            tx.as_ref()
                .expect("transaction cannot be taken while guard is alive")
        }))
    }

    /// Commits this [`Tx`] client.
    ///
    /// Committing a [`Tx`] client which has executed no statements is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// If failed to commit transaction of this [`Tx`] client.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let Some(tx) = self.tx.write().await.take() else {
            return Ok(());
        };
        tx.commit().await.map_err(tracerr::wrap!())
    }
}

super::delegate_connection!(Tx);
