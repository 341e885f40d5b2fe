//! Postgres [`Database`] implementation.

pub mod client;
pub mod connection;
mod impls;

use std::time::Duration;

use deadpool_postgres::Runtime;
use derive_more::{Deref, Display, Error as StdError, From};
use tokio_postgres::{error::SqlState, NoTls};
use tracerr::Traced;

use crate::infra::database;
#[cfg(doc)]
use crate::infra::Database;

pub use refinery::embed_migrations;

pub use self::{
    client::{NonTx, Tx},
    connection::Connection,
};

pub use deadpool_postgres::Config;

/// Postgres [`Database`] client.
#[derive(Clone, Copy, Debug, Deref)]
pub struct Postgres<T = NonTx>(T);

impl Postgres {
    /// Creates a new [`Postgres`] client with the provided [`Config`].
    ///
    /// Every statement running longer than the provided `statement_timeout`
    /// is cancelled by the server.
    ///
    /// # Errors
    ///
    /// If failed to create a new [`Postgres`] client.
    pub fn new(
        conf: &Config,
        statement_timeout: Duration,
    ) -> Result<Self, Traced<database::Error>> {
        let mut conf = conf.clone();
        let timeout =
            format!("-c statement_timeout={}", statement_timeout.as_millis());
        conf.options = Some(match conf.options.take() {
            Some(opts) => format!("{opts} {timeout}"),
            None => timeout,
        });

        let pool = conf
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        Ok(Self(NonTx::from_pool(pool)))
    }
}

/// Postgres database [`Error`].
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// [`Connection`] error.
    #[display("`Connection` error: {_0}")]
    Connection(connection::Error),

    /// Error of creating a new [`connection::Pool`] client.
    #[display("Failed to create a new `connection::Pool`: {_0}")]
    PoolCreationError(connection::PoolCreationError),

    /// [`connection::Pool`] error.
    #[display("`connection::Pool` error: {_0}")]
    PoolError(connection::PoolError),
}

impl Error {
    /// Checks whether the failed operation may succeed if retried.
    ///
    /// Serialization failures, deadlocks, cancelled (timed out) statements
    /// and lost connections are considered transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(e) => e.is_closed()
                || e.code().is_some_and(|c| {
                    [
                        &SqlState::T_R_SERIALIZATION_FAILURE,
                        &SqlState::T_R_DEADLOCK_DETECTED,
                        &SqlState::QUERY_CANCELED,
                        &SqlState::ADMIN_SHUTDOWN,
                        &SqlState::TOO_MANY_CONNECTIONS,
                    ]
                    .contains(&c)
                }),
            Self::PoolError(..) => true,
            Self::PoolCreationError(..) => false,
        }
    }

    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::Connection(e) => {
                e.code() == Some(&SqlState::UNIQUE_VIOLATION)
                    && constraint.map_or(true, |c| {
                        e.as_db_error().and_then(|e| e.constraint()) == Some(c)
                    })
            }
            Self::PoolError(..) | Self::PoolCreationError(..) => false,
        }
    }
}
