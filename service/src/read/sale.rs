//! [`Sale`]-related read definitions.

use derive_more::{Deref, From, Into};

use crate::domain::{sale, Sale};
#[cfg(doc)]
use crate::domain::Product;

/// [`Sale`]s accepting purchases at some moment, ordered by their start and
/// then by their IDs.
#[derive(Clone, Debug, Default, Deref, From, Into)]
pub struct Open(pub Vec<Sale>);

/// IDs of [`sale::Status::Scheduled`] [`Sale`]s whose start is due.
#[derive(Clone, Debug, Default, Deref, From, Into)]
pub struct Due(pub Vec<sale::Id>);

/// Number of [`sale::Status::Active`] [`Sale`]s of a [`Product`].
#[derive(Clone, Copy, Debug, Deref, Eq, From, Hash, Into, PartialEq)]
pub struct ActiveCount(pub i64);
