//! In-memory [`Database`] implementation.
//!
//! Every transaction holds the whole [`State`] locked for its lifetime and
//! applies its writes to a working copy, which replaces the committed
//! [`State`] on [`Commit`] and is discarded otherwise.
//!
//! [`Commit`]: common::operations::Commit

mod impls;

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use derive_more::{Deref, Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{product, sale, user, Product, Purchase, Sale, User},
    infra::database,
};
#[cfg(doc)]
use crate::infra::Database;

/// In-memory [`Database`] client.
#[derive(Clone, Debug, Default, Deref)]
pub struct Memory<T = NonTx>(T);

impl Memory {
    /// Creates a new empty [`Memory`] client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next commit of a transaction fail with a transient
    /// [`Error::CommitFailed`], rolling the transaction back.
    pub fn fail_next_commit(&self) {
        self.0.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Returns a snapshot of the committed [`State`].
    pub async fn snapshot(&self) -> State {
        self.0.state.lock().await.clone()
    }
}

/// Data stored in a [`Memory`] client.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Stored [`User`]s.
    users: HashMap<user::Id, User>,

    /// Stored [`Product`]s.
    products: HashMap<product::Id, Product>,

    /// Stored [`Sale`]s.
    sales: HashMap<sale::Id, Sale>,

    /// Stored [`Purchase`]s in their insertion order.
    purchases: Vec<Purchase>,
}

impl State {
    /// Returns the stored [`User`] by its ID.
    #[must_use]
    pub fn user(&self, id: user::Id) -> Option<&User> {
        self.users.get(&id)
    }

    /// Returns the stored [`Product`] by its ID.
    #[must_use]
    pub fn product(&self, id: product::Id) -> Option<&Product> {
        self.products.get(&id)
    }

    /// Returns the stored [`Sale`] by its ID.
    #[must_use]
    pub fn sale(&self, id: sale::Id) -> Option<&Sale> {
        self.sales.get(&id)
    }

    /// Returns all the stored [`Purchase`]s in their insertion order.
    #[must_use]
    pub fn purchases(&self) -> &[Purchase] {
        &self.purchases
    }
}

/// Non-transactional [`Memory`] client.
///
/// Each operation is applied to the committed [`State`] right away.
#[derive(Clone, Debug, Default)]
pub struct NonTx {
    /// Committed [`State`].
    state: Arc<Mutex<State>>,

    /// Indicator whether the next commit should fail.
    fail_next_commit: Arc<AtomicBool>,
}

/// Transactional [`Memory`] client.
#[derive(Clone, Debug)]
pub struct Tx {
    /// Inner state of this [`Tx`], or [`None`] once it's finished.
    inner: Arc<Mutex<Option<TxInner>>>,

    /// Indicator whether the commit of this [`Tx`] should fail.
    fail_next_commit: Arc<AtomicBool>,
}

/// Inner state of a [`Tx`].
#[derive(Debug)]
struct TxInner {
    /// Lock over the committed [`State`].
    committed: OwnedMutexGuard<State>,

    /// Working copy of the [`State`] receiving the writes.
    working: State,
}

impl Tx {
    /// Starts a new [`Tx`] on the provided [`NonTx`] client, waiting until
    /// all the other transactions finish.
    async fn begin(client: &NonTx) -> Self {
        let committed = Arc::clone(&client.state).lock_owned().await;
        let working = committed.clone();
        Self {
            inner: Arc::new(Mutex::new(Some(TxInner { committed, working }))),
            fail_next_commit: Arc::clone(&client.fail_next_commit),
        }
    }

    /// Commits this [`Tx`], replacing the committed [`State`] with the
    /// working copy.
    async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let Some(TxInner {
            mut committed,
            working,
        }) = self.inner.lock().await.take()
        else {
            return Err(tracerr::new!(database::Error::from(Error::Finished)));
        };
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(tracerr::new!(database::Error::from(
                Error::CommitFailed
            )));
        }
        *committed = working;
        Ok(())
    }
}

/// Access to the [`State`] of a [`Memory`] client.
pub trait Store {
    /// Applies the provided function to the [`State`] visible to this
    /// [`Store`].
    ///
    /// # Errors
    ///
    /// If the [`State`] is not accessible anymore.
    fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;
}

impl Store for NonTx {
    async fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        Ok(f(&mut *self.state.lock().await))
    }
}

impl Store for Tx {
    async fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        let mut inner = self.inner.lock().await;
        let inner = inner.as_mut().ok_or_else(|| {
            tracerr::new!(database::Error::from(Error::Finished))
        })?;
        Ok(f(&mut inner.working))
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Transaction is already committed or rolled back.
    #[display("Transaction is already finished")]
    Finished,

    /// Transaction failed to commit and was rolled back.
    #[display("Transaction failed to commit")]
    CommitFailed,

    /// Unique constraint is violated.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),
}

impl Error {
    /// Checks whether the failed operation may succeed if retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::CommitFailed)
    }

    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(c) => constraint.map_or(true, |x| x == *c),
            Self::Finished | Self::CommitFailed => false,
        }
    }
}
