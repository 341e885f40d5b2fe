//! [`Command`] definition.

pub mod activate_due_sales;
pub mod authorize_user_session;
pub mod create_product;
pub mod create_sale;
pub mod create_user;
pub mod create_user_session;
pub mod deactivate_product;
pub mod end_sale;
pub mod make_purchase;
pub mod reset_sale_stock;
pub mod start_sale;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    activate_due_sales::ActivateDueSales,
    authorize_user_session::AuthorizeUserSession,
    create_product::CreateProduct, create_sale::CreateSale,
    create_user::CreateUser, create_user_session::CreateUserSession,
    deactivate_product::DeactivateProduct, end_sale::EndSale,
    make_purchase::MakePurchase, reset_sale_stock::ResetSaleStock,
    start_sale::StartSale,
};
