//! Domain definitions.

pub mod product;
pub mod purchase;
pub mod sale;
pub mod user;

pub use self::{
    product::Product, purchase::Purchase, sale::Sale, user::User,
};
