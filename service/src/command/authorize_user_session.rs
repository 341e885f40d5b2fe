//! [`Command`] for authorizing a [`User`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use jsonwebtoken::Validation;
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`] by a [`session::Token`].
///
/// Resolves into the [`Session`] along with the [`User`] it belongs to.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

/// Output of [`AuthorizeUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Decoded [`Session`].
    pub session: Session,

    /// [`User`] the [`Session`] belongs to.
    pub user: User,
}

impl<Db> Command<AuthorizeUserSession> for Service<Db>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        let session = jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims;

        let user = self
            .database()
            .execute(Select(By::new(session.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::UserNotExists(session.user_id))
            .map_err(tracerr::wrap!())?;

        Ok(Output { session, user })
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),

    /// [`User`] the [`Session`] belongs to does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use crate::{
        command::{AuthorizeUserSession, CreateUserSession},
        domain::user::session,
        fixture, Command as _,
    };

    use super::ExecutionError as E;

    #[tokio::test]
    async fn rejects_garbage_token() {
        let svc = fixture::service();

        let err = svc
            .execute(AuthorizeUserSession {
                token: session::Token::from_str("not.a.token").unwrap(),
            })
            .await
            .unwrap_err();

        assert!(
            matches!(fixture::cause(&err), E::JsonWebTokenDecodeError(_)),
            "{err}",
        );
    }

    #[tokio::test]
    async fn resolves_session_owner() {
        let svc = fixture::service();
        let alice = fixture::user(&svc, "alice").await;
        let token = svc
            .execute(CreateUserSession::ByUserId(alice.id))
            .await
            .unwrap()
            .token;

        let out = svc
            .execute(AuthorizeUserSession { token })
            .await
            .unwrap();

        assert_eq!(out.session.user_id, alice.id);
        assert_eq!(out.user.username, alice.username);
        assert!(!out.user.is_admin);
    }
}
