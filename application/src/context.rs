//! Per-request [`Context`] of the GraphQL API.

use std::sync::atomic::{self, AtomicU16};

use axum::{async_trait, extract::FromRequestParts};
use axum_extra::headers::{
    authorization::Bearer, Authorization, HeaderMapExt as _,
};
use common::DateTime;
use juniper::{
    http::{GraphQLBatchResponse, GraphQLResponse},
    IntoFieldError as _,
};
use service::{
    command::{self, Command as _},
    domain::user::session,
};
use tokio::sync::OnceCell;

#[cfg(doc)]
use crate::api::User;
use crate::{api, define_error, AsError, Error, JuniperResponse, Service};

/// Per-request context of the GraphQL API.
///
/// Authenticates the bearer token of the request lazily, at most once, and
/// remembers the HTTP status code of the last failed resolver.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// HTTP status code of the last failed resolver.
    error_status_code: AtomicU16,

    /// Headers of the HTTP request.
    headers: http::HeaderMap,

    /// Outcome of the [`Session`] authentication.
    session: OnceCell<Result<Session, Error>>,
}

impl Context {
    /// Creates a new [`Context`] of a request with the provided `headers`.
    #[must_use]
    pub fn new(service: Service, headers: http::HeaderMap) -> Self {
        Self {
            service,
            error_status_code: AtomicU16::new(
                http::StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            ),
            headers,
            session: OnceCell::new(),
        }
    }

    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the HTTP status code of the last failed resolver.
    #[must_use]
    pub fn error_status_code(&self) -> http::StatusCode {
        http::StatusCode::from_u16(
            self.error_status_code.load(atomic::Ordering::Relaxed),
        )
        .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns a closure remembering the status code of the [`Error`] passed
    /// through it, to be used in [`Result::map_err()`].
    pub fn error(&self) -> impl FnOnce(Error) -> Error + '_ {
        move |err| {
            self.error_status_code
                .store(err.status_code.as_u16(), atomic::Ordering::Relaxed);
            err
        }
    }

    /// Sets the current [`Session`] for this [`Context`], unless the request
    /// is authenticated already.
    pub fn set_current_session(&self, session: Session) {
        _ = self.session.set(Ok(session));
    }

    /// Returns the current [`Session`], if the request carries any.
    ///
    /// # Errors
    ///
    /// Errors if the provided authentication token is invalid.
    pub async fn try_current_session(&self) -> Result<Option<Session>, Error> {
        match self.current_session().await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.code == AuthError::AuthorizationRequired.code() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Returns the current [`Session`].
    ///
    /// # Errors
    ///
    /// Errors if:
    /// - the current HTTP request is not authorized;
    /// - the provided authentication token is invalid.
    pub async fn current_session(&self) -> Result<Session, Error> {
        self.session
            .get_or_init(|| self.authenticate())
            .await
            .clone()
            .map_err(self.error())
    }

    /// Returns the current [`Session`] of an administrator.
    ///
    /// # Errors
    ///
    /// Errors if:
    /// - the current HTTP request is not authorized;
    /// - the authorized [`User`] is not an administrator.
    pub async fn current_admin(&self) -> Result<Session, Error> {
        let session = self.current_session().await?;
        if session.is_admin {
            Ok(session)
        } else {
            Err(self.error()(api::PrivilegeError::Admin.into()))
        }
    }

    /// Takes the authentication token out of the variables a GraphQL
    /// subscription is initialized with.
    ///
    /// # Errors
    ///
    /// Errors if the `authToken` variable is not a valid token string.
    pub(crate) fn apply_subscription_variables(
        &mut self,
        vars: &juniper::Variables,
    ) -> Result<(), Error> {
        let Some(token) = vars.get("authToken") else {
            return Ok(());
        };
        let header = token
            .as_string_value()
            .and_then(|t| format!("Bearer {t}").parse().ok())
            .ok_or_else(|| Error::from(AuthError::InvalidVariables))?;
        drop(self.headers.insert(http::header::AUTHORIZATION, header));
        Ok(())
    }

    /// Authenticates the bearer token of the request.
    async fn authenticate(&self) -> Result<Session, Error> {
        let bearer = self
            .headers
            .typed_try_get::<Authorization<Bearer>>()
            .map_err(|_| Error::from(AuthError::MalformedHeader))?
            .ok_or_else(|| Error::from(AuthError::AuthorizationRequired))?
            .0;

        #[expect(unsafe_code, reason = "taken from a valid bearer header")]
        let token =
            unsafe { session::Token::new_unchecked(bearer.token().to_owned()) };
        let command::authorize_user_session::Output { session, user } = self
            .service
            .execute(command::AuthorizeUserSession {
                token: token.clone(),
            })
            .await
            .map_err(AsError::into_error)?;

        Ok(Session {
            user_id: session.user_id.into(),
            token,
            expires_at: session.expires_at.coerce(),
            is_admin: user.is_admin,
        })
    }
}

impl juniper::Context for Context {}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = JuniperResponse;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service =
            parts.extensions.get::<Service>().cloned().ok_or_else(|| {
                JuniperResponse {
                    status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
                    response: GraphQLBatchResponse::Single(
                        GraphQLResponse::error(
                            Error::internal(&"missing `Service` extension")
                                .into_field_error(),
                        ),
                    ),
                }
            })?;

        Ok(Self::new(service, parts.headers.clone()))
    }
}

/// Authenticated session of a [`User`].
#[derive(Clone, Debug)]
pub struct Session {
    /// ID of the [`User`] associated with this [`Session`].
    pub user_id: api::user::Id,

    /// Authentication token.
    pub token: session::Token,

    /// [`DateTime`] when this [`Session`] expires.
    pub expires_at: DateTime,

    /// Indicator whether the [`User`] is an administrator.
    pub is_admin: bool,
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenDecodeError(_) => {
                Some(AuthError::AuthorizationRequired.into())
            }
            Self::UserNotExists(_) => Some(api::UserError::NotExists.into()),
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,

        #[code = "MALFORMED_AUTHORIZATION_HEADER"]
        #[status = BAD_REQUEST]
        #[message = "`Authorization` header must carry a `Bearer` token"]
        MalformedHeader,

        #[code = "INVALID_VARIABLES"]
        #[status = BAD_REQUEST]
        #[message = "Invalid subscription authorization variables"]
        InvalidVariables,
    }
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use juniper::{InputValue, Variables};
    use service::domain::user::session;

    use crate::{fixture, Context, Session};

    fn session(is_admin: bool) -> Session {
        #[expect(unsafe_code, reason = "test token")]
        let token = unsafe { session::Token::new_unchecked("token".into()) };
        Session {
            user_id: service::domain::user::Id::new().into(),
            token,
            expires_at: DateTime::now(),
            is_admin,
        }
    }

    #[tokio::test]
    async fn requires_authorization_without_token() {
        let ctx = Context::new(fixture::service(), http::HeaderMap::new());

        let err = ctx.current_session().await.unwrap_err();

        assert_eq!(err.code, "AUTHORIZATION_REQUIRED");
        assert_eq!(ctx.error_status_code(), http::StatusCode::UNAUTHORIZED);
        assert!(ctx.try_current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_non_bearer_authorization() {
        let mut headers = http::HeaderMap::new();
        drop(headers.insert(
            http::header::AUTHORIZATION,
            http::HeaderValue::from_static("Basic YWxpY2U6c2VjcmV0"),
        ));
        let ctx = Context::new(fixture::service(), headers);

        let err = ctx.try_current_session().await.unwrap_err();

        assert_eq!(err.code, "MALFORMED_AUTHORIZATION_HEADER");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn distinguishes_administrators() {
        let ctx = Context::new(fixture::service(), http::HeaderMap::new());
        ctx.set_current_session(session(false));

        let err = ctx.current_admin().await.unwrap_err();
        assert_eq!(err.code, "NOT_ADMIN");
        assert_eq!(ctx.error_status_code(), http::StatusCode::FORBIDDEN);

        let ctx = Context::new(fixture::service(), http::HeaderMap::new());
        ctx.set_current_session(session(true));
        assert!(ctx.current_admin().await.is_ok());
    }

    #[tokio::test]
    async fn takes_subscription_token_from_variables() {
        let mut ctx = Context::new(fixture::service(), http::HeaderMap::new());
        let mut vars = Variables::new();
        drop(vars.insert("authToken".into(), InputValue::scalar("abc")));

        ctx.apply_subscription_variables(&vars).unwrap();

        assert_eq!(
            ctx.headers.get(http::header::AUTHORIZATION).unwrap(),
            "Bearer abc",
        );
    }

    #[tokio::test]
    async fn rejects_non_string_subscription_token() {
        let mut ctx = Context::new(fixture::service(), http::HeaderMap::new());
        let mut vars = Variables::new();
        drop(vars.insert("authToken".into(), InputValue::scalar(42)));

        let err = ctx.apply_subscription_variables(&vars).unwrap_err();

        assert_eq!(err.code, "INVALID_VARIABLES");
        assert!(ctx.headers.get(http::header::AUTHORIZATION).is_none());
    }
}
