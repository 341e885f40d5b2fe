//! Fixtures for tests of the GraphQL API.

use std::time::Duration;

use service::infra::Postgres;

use crate::{config, Service};

/// Creates a [`Service`] backed by a lazily connected [`Postgres`] pool.
///
/// Nothing connects to the database until a query reaches it, so the
/// [`Service`] is suitable for tests exercising the HTTP and authentication
/// layers only.
pub(crate) fn service() -> Service {
    let postgres = Postgres::new(
        &config::Postgres::default().into(),
        Duration::from_secs(1),
    )
    .unwrap();
    Service::new(config::Service::default().into(), postgres).0
}
