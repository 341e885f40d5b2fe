//! Shared helpers for [`Service`] tests.

use std::{str::FromStr as _, time::Duration};

use common::{operations::Insert, DateTime, Money};
use secrecy::SecretBox;
use tracerr::Traced;

use crate::{
    command::{CreateProduct, CreateUser},
    domain::{product, sale, user, Product, Sale, User},
    infra::Memory,
    task, Command as _, Config, Service,
};

/// [`user::Password`] of every [`User`] created by [`user()`].
pub(crate) const PASSWORD: &str = "qwerty123";

/// Creates a new [`Service`] over an empty [`Memory`] database.
pub(crate) fn service() -> Service<Memory> {
    Service {
        config: Config {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(b"test"),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(b"test"),
            session_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            default_initial_stock: sale::Stock::new(200).unwrap(),
            activate_due_sales: task::activate_due_sales::Config {
                interval: Duration::from_secs(1),
            },
        },
        database: Memory::new(),
    }
}

/// Registers a new [`User`] with the provided `name` as its username and
/// `{name}@example.com` as its email.
pub(crate) async fn user(svc: &Service<Memory>, name: &str) -> User {
    svc.execute(CreateUser {
        username: user::Username::new(name).unwrap(),
        email: user::Email::new(format!("{name}@example.com")).unwrap(),
        password: SecretBox::new(Box::new(
            user::Password::new(PASSWORD).unwrap(),
        )),
        is_admin: false,
    })
    .await
    .unwrap()
}

/// Creates a new [`Product`] priced `199.99USD` and sold for `149.99USD`.
pub(crate) async fn product(svc: &Service<Memory>, name: &str) -> Product {
    svc.execute(CreateProduct {
        name: product::Name::new(name).unwrap(),
        description: product::Description::new("Noise cancelling").unwrap(),
        regular_price: Money::from_str("199.99USD").unwrap(),
        sale_price: Money::from_str("149.99USD").unwrap(),
        image_url: None,
    })
    .await
    .unwrap()
}

/// Stores a [`sale::Status::Scheduled`] [`Sale`] of the default stock
/// starting at the provided moment, bypassing the start validation.
pub(crate) async fn scheduled_sale(
    svc: &Service<Memory>,
    product_id: product::Id,
    start_at: DateTime,
) -> Sale {
    let stock = svc.config().default_initial_stock;
    store(
        svc,
        Sale {
            id: sale::Id::new(),
            product_id,
            start_at: start_at.coerce(),
            end_at: None,
            initial_stock: stock,
            current_stock: stock,
            max_per_user: sale::PurchaseLimit::default(),
            status: sale::Status::Scheduled,
            created_at: DateTime::now().coerce(),
        },
    )
    .await
}

/// Stores a [`sale::Status::Active`] [`Sale`] which started a second ago.
pub(crate) async fn active_sale(
    svc: &Service<Memory>,
    product_id: product::Id,
    stock: i32,
    max_per_user: i32,
) -> Sale {
    let now = DateTime::now();
    let stock = sale::Stock::new(stock).unwrap();
    store(
        svc,
        Sale {
            id: sale::Id::new(),
            product_id,
            start_at: (now - Duration::from_secs(1)).coerce(),
            end_at: None,
            initial_stock: stock,
            current_stock: stock,
            max_per_user: sale::PurchaseLimit::new(max_per_user).unwrap(),
            status: sale::Status::Active,
            created_at: now.coerce(),
        },
    )
    .await
}

/// Inserts the provided [`Sale`] right into the [`Memory`] database.
async fn store(svc: &Service<Memory>, sale: Sale) -> Sale {
    svc.database().execute(Insert(sale.clone())).await.unwrap();
    sale
}

/// Returns the cause of the provided [`Traced`] error.
pub(crate) fn cause<E>(err: &Traced<E>) -> &E {
    err.as_ref()
}
