//! [`Query`] collection related to a single [`User`].

use common::operations::By;

use crate::domain::{user, User};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`User`] by its [`user::Id`].
///
/// Resolves to [`None`] if no such [`User`] is registered.
pub type ById = DatabaseQuery<By<Option<User>, user::Id>>;

#[cfg(test)]
mod spec {
    use crate::{domain::user, fixture, query, Query as _};

    #[tokio::test]
    async fn finds_registered_user() {
        let svc = fixture::service();
        let alice = fixture::user(&svc, "alice").await;

        let found = svc
            .execute(query::user::ById::by(alice.id))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.username, alice.username);
        assert_eq!(found.purchase_count.get(), 0);
        assert!(!found.is_admin);
    }

    #[tokio::test]
    async fn misses_unknown_user() {
        let svc = fixture::service();

        let found = svc
            .execute(query::user::ById::by(user::Id::new()))
            .await
            .unwrap();

        assert!(found.is_none());
    }
}
