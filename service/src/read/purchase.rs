//! [`Purchase`]-related read definitions.

use derive_more::{Deref, From, Into};

use crate::domain::Purchase;
#[cfg(doc)]
use crate::domain::{Sale, User};

/// Number of [`Purchase`]s a [`User`] made in a [`Sale`].
#[derive(Clone, Copy, Debug, Deref, Eq, From, Hash, Into, PartialEq)]
pub struct Count(pub i64);

/// [`Purchase`]s a [`User`] made in a [`Sale`], oldest first.
#[derive(Clone, Debug, Default, Deref, From, Into)]
pub struct History(pub Vec<Purchase>);
