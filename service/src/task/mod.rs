//! Background [`Task`]s definitions.

pub mod activate_due_sales;
mod background;

pub use common::Handler as Task;

pub use self::{
    activate_due_sales::ActivateDueSales, background::Background,
};
