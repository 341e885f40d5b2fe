//! Leaderboard of a [`Sale`].
//!
//! [`Sale`]: crate::domain::Sale

use common::define_pagination;

use crate::{
    domain::{sale, Purchase},
    read::user,
};
#[cfg(doc)]
use crate::domain::Sale;

define_pagination!(Entry, sale::Id);

/// Position in a [`Sale`] leaderboard.
#[derive(Clone, Debug)]
pub struct Entry {
    /// [`Purchase`] occupying this position.
    pub purchase: Purchase,

    /// Public identity of the buyer.
    pub buyer: user::Public,
}
