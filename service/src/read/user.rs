//! [`User`] read model definition.
//!
//! [`User`]: crate::domain::User

use crate::domain::user;
#[cfg(doc)]
use crate::domain::User;

/// Publicly visible identity of a [`User`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Public {
    /// ID of the [`User`].
    pub id: user::Id,

    /// [`user::Username`] of the [`User`].
    pub username: user::Username,
}
