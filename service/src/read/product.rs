//! [`Product`]-related read definitions.

use derive_more::{Deref, From, Into};

use crate::domain::Product;

/// Active [`Product`]s, newest first.
#[derive(Clone, Debug, Default, Deref, From, Into)]
pub struct Catalog(pub Vec<Product>);
