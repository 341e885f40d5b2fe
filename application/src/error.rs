//! Client-facing [`Error`]s of the GraphQL API.
//!
//! Every failure of a [`service`] operation is either mapped onto an
//! [`Error`] with a stable code and an HTTP status (see [`AsError`]), or
//! reported as an internal one.

use std::fmt;

use derive_more::Error as StdError;
use itertools::Itertools as _;
use juniper::IntoFieldError;
use service::infra::database;
use tracerr::{Trace, Traced};

/// Defines a set of client-facing failures convertible into an [`Error`].
///
/// Each variant carries its [`Error`] code, its HTTP status and the message
/// shown to clients.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        #[doc = concat!("Failures of the `", stringify!($name), "` kind.")]
        #[derive(
            Clone,
            Copy,
            Debug,
            Eq,
            PartialEq,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl $name {
            /// Returns the code this failure is reported to clients with.
            #[must_use]
            pub const fn code(self) -> $crate::error::Code {
                match self {
                    $( Self::$variant => $code, )*
                }
            }
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                Self {
                    code: err.code(),
                    status_code: match err {
                        $(
                            $name::$variant => {
                                ::http::StatusCode::$status_code
                            }
                        )*
                    },
                    message: err.to_string(),
                    backtrace: None,
                }
            }
        }
    };
}

/// Failure of a GraphQL operation, as seen by the client.
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// Stable machine-readable code, e.g. `STOCK_UNAVAILABLE`.
    pub code: Code,

    /// HTTP status the response is sent with.
    pub status_code: http::StatusCode,

    /// Where the underlying [`service`] failure originated.
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// Human-readable description.
    pub message: String,
}

impl Error {
    /// Creates an [`Error`] hiding an unexpected failure behind the
    /// `INTERNAL_SERVER_ERROR` code.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_SERVER_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            backtrace: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.status_code, self.message)?;
        if let Some(trace) = &self.backtrace {
            write!(f, "\n{trace}")?;
        }
        Ok(())
    }
}

impl<S> IntoFieldError<S> for Error
where
    S: From<String>,
{
    fn into_field_error(self) -> juniper::FieldError<S> {
        let Self {
            code,
            status_code,
            backtrace,
            message,
        } = self;

        let mut ext = juniper::Object::with_capacity(3);
        drop(ext.add_field("code", juniper::Value::scalar(code.to_owned())));
        drop(ext.add_field(
            "status",
            juniper::Value::scalar(status_code.as_u16().to_string()),
        ));
        if let Some(trace) = backtrace {
            drop(ext.add_field(
                "backtrace",
                juniper::Value::list(
                    trace
                        .iter()
                        .map(|frame| juniper::Value::scalar(frame.to_string()))
                        .collect_vec(),
                ),
            ));
        }
        juniper::FieldError::new(message, juniper::Value::object(ext))
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Conversion of [`service`] failures into client-facing [`Error`]s.
pub trait AsError {
    /// Returns the client-facing [`Error`] of this failure, or [`None`] if
    /// it must not be disclosed to clients.
    fn try_as_error(&self) -> Option<Error>;

    /// Returns the client-facing [`Error`] of this failure, logging and
    /// hiding it as an internal one if it must not be disclosed.
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error().unwrap_or_else(|| {
            tracing::error!("internal error: {self}");
            Error::internal(&self)
        })
    }

    /// Same as [`AsError::as_error()`], but consumes the failure.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let inner: &E = self.as_ref();
        inner.try_as_error().map(|err| Error {
            backtrace: Some(self.trace().clone()),
            ..err
        })
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        self.is_transient().then(|| DatabaseError::Transient.into())
    }
}

define_error! {
    enum DatabaseError {
        #[code = "TRANSIENT_FAILURE"]
        #[status = SERVICE_UNAVAILABLE]
        #[message = "Operation failed temporarily, retry later"]
        Transient,
    }
}

#[cfg(test)]
mod spec {
    use juniper::{DefaultScalarValue, IntoFieldError};
    use service::{command::end_sale, domain::sale};

    use super::{AsError as _, DatabaseError, Error};

    #[test]
    fn attaches_trace_to_known_errors() {
        let err = tracerr::new!(end_sale::ExecutionError::SaleNotActive(
            sale::Id::new(),
        ));

        let err = err.as_error();

        assert_eq!(err.code, "SALE_NOT_ACTIVE");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);
        assert!(err.backtrace.is_some());
    }

    #[test]
    fn displays_code_status_and_message() {
        let err = end_sale::ExecutionError::SaleNotExists(sale::Id::new())
            .into_error();

        assert_eq!(
            err.to_string(),
            "SALE_NOT_EXISTS (404 Not Found): \
             `Sale` with the specified ID does not exist",
        );
    }

    #[test]
    fn exposes_code_and_status_in_extensions() {
        let field = IntoFieldError::<DefaultScalarValue>::into_field_error(
            Error::from(DatabaseError::Transient),
        );

        let ext = field.extensions().as_object_value().unwrap();
        assert_eq!(
            ext.get_field_value("code").and_then(|v| v.as_string_value()),
            Some("TRANSIENT_FAILURE"),
        );
        assert_eq!(
            ext.get_field_value("status").and_then(|v| v.as_string_value()),
            Some("503"),
        );
        assert!(ext.get_field_value("backtrace").is_none());
    }

    #[test]
    fn reports_macro_codes() {
        assert_eq!(DatabaseError::Transient.code(), "TRANSIENT_FAILURE");
    }
}
