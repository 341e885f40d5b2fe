//! UTC timestamps with microsecond precision.
//!
//! PostgreSQL stores `TIMESTAMPTZ` in microseconds, so every [`DateTimeOf`]
//! is truncated to them on creation. That keeps a value read back from the
//! database equal to the one written.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{cmp::Ordering, marker::PhantomData, ops, time::Duration};

use derive_more::{Debug, Display, Error};
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime, UtcOffset};

/// Timestamp not bound to any particular event.
pub type DateTime = DateTimeOf;

/// Timestamp of the event described by the `Of` marker.
///
/// `DateTimeOf<(Sale, Start)>` and `DateTimeOf<(Sale, End)>` don't mix up
/// accidentally, yet [`DateTimeOf::coerce()`] converts between them freely.
#[derive(Debug)]
pub struct DateTimeOf<Of: ?Sized = ()> {
    inner: OffsetDateTime,

    #[debug(skip)]
    _of: PhantomData<Of>,
}

impl<Of: ?Sized> DateTimeOf<Of> {
    /// Returns the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self::truncated(OffsetDateTime::now_utc())
    }

    /// Parses an [RFC 3339] timestamp, converting it to UTC.
    ///
    /// # Errors
    ///
    /// If the `input` is not an [RFC 3339] timestamp, or it doesn't fit into
    /// the supported range after conversion.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    pub fn from_rfc3339(input: &str) -> Result<Self, ParseError> {
        let parsed =
            OffsetDateTime::parse(input, &Rfc3339).map_err(ParseError::Parse)?;
        Self::try_from(parsed).map_err(ParseError::ComponentRange)
    }

    /// Formats this timestamp as [RFC 3339] in UTC.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[expect(clippy::missing_panics_doc, reason = "UTC always formats")]
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.inner.format(&Rfc3339).unwrap_or_else(|e| {
            panic!("cannot format `DateTime` as RFC 3339: {e}")
        })
    }

    /// Reinterprets this timestamp as one of another event.
    #[must_use]
    pub fn coerce<NewOf: ?Sized>(self) -> DateTimeOf<NewOf> {
        DateTimeOf {
            inner: self.inner,
            _of: PhantomData,
        }
    }

    /// Drops the sub-microsecond part of the provided UTC `dt`.
    fn truncated(dt: OffsetDateTime) -> Self {
        Self::try_truncated(dt).unwrap_or(Self {
            inner: dt,
            _of: PhantomData,
        })
    }

    /// Drops the sub-microsecond part of the provided UTC `dt`.
    fn try_truncated(
        dt: OffsetDateTime,
    ) -> Result<Self, time::error::ComponentRange> {
        Ok(Self {
            inner: dt.replace_nanosecond(dt.nanosecond() / 1_000 * 1_000)?,
            _of: PhantomData,
        })
    }
}

/// Error of parsing a [`DateTime`] out of a string.
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum ParseError {
    /// Malformed [RFC 3339] string.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    Parse(time::error::Parse),

    /// Timestamp out of the supported range in UTC.
    ComponentRange(time::error::ComponentRange),
}

impl<Of: ?Sized> Copy for DateTimeOf<Of> {}
impl<Of: ?Sized> Clone for DateTimeOf<Of> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Of: ?Sized> Eq for DateTimeOf<Of> {}
impl<Of: ?Sized> PartialEq for DateTimeOf<Of> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<Of: ?Sized> Ord for DateTimeOf<Of> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<Of: ?Sized> PartialOrd for DateTimeOf<Of> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Of: ?Sized> TryFrom<OffsetDateTime> for DateTimeOf<Of> {
    type Error = time::error::ComponentRange;

    fn try_from(dt: OffsetDateTime) -> Result<Self, Self::Error> {
        Self::try_truncated(dt.to_offset(UtcOffset::UTC))
    }
}

impl<Of: ?Sized> ops::Add<Duration> for DateTimeOf<Of> {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self::truncated(self.inner + rhs)
    }
}

impl<Of: ?Sized> ops::Sub<Duration> for DateTimeOf<Of> {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self::truncated(self.inner - rhs)
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> FromSql<'_> for DateTimeOf<Of> {
    accepts!(TIMESTAMPTZ);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        time::OffsetDateTime::from_sql(ty, raw)?
            .try_into()
            .map_err(Box::from)
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> ToSql for DateTimeOf<Of> {
    accepts!(TIMESTAMPTZ);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.inner.to_sql(ty, w)
    }
}

#[cfg(feature = "serde")]
pub mod serde {
    //! [`serde`] representations of [`DateTimeOf`].

    pub mod unix_timestamp {
        //! [`DateTimeOf`] as whole seconds since the Unix epoch, the way JWT
        //! claims like `exp` carry it.
        //!
        //! [`DateTimeOf`]: super::super::DateTimeOf

        use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};
        use time::OffsetDateTime;

        use super::super::DateTimeOf;

        /// Serializes the provided [`DateTimeOf`] as Unix seconds.
        ///
        /// # Errors
        ///
        /// If the `serializer` fails.
        pub fn serialize<Of, S>(
            dt: &DateTimeOf<Of>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
            Of: ?Sized,
        {
            serializer.serialize_i64(dt.inner.unix_timestamp())
        }

        /// Deserializes a [`DateTimeOf`] out of Unix seconds.
        ///
        /// # Errors
        ///
        /// If the value is not an integer, or is out of the supported range.
        pub fn deserialize<'de, D, Of>(
            deserializer: D,
        ) -> Result<DateTimeOf<Of>, D::Error>
        where
            D: Deserializer<'de>,
            Of: ?Sized,
        {
            let secs = i64::deserialize(deserializer)?;
            OffsetDateTime::from_unix_timestamp(secs)
                .map(DateTimeOf::truncated)
                .map_err(D::Error::custom)
        }
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Date and time in a [RFC 3339] format with a microsecond precision.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[graphql_scalar(with = Self, parse_token(String))]
    type DateTime = crate::DateTime;

    impl DateTime {
        fn to_output<S: ScalarValue>(dt: &DateTime) -> Value<S> {
            Value::scalar(dt.to_rfc3339())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `DateTime` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_rfc3339(s).map_err(|e| {
                        format!("Cannot parse `DateTime` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use super::{DateTime, DateTimeOf};

    struct Deadline;

    #[test]
    fn survives_rfc3339_formatting() {
        let now = DateTime::now();

        assert_eq!(DateTime::from_rfc3339(&now.to_rfc3339()).unwrap(), now);
    }

    #[test]
    fn truncates_to_microseconds() {
        let at =
            DateTime::from_rfc3339("2024-05-01T10:00:00.123456789Z").unwrap();

        assert_eq!(at.to_rfc3339(), "2024-05-01T10:00:00.123456Z");
    }

    #[test]
    fn shifts_by_duration() {
        let start = DateTime::from_rfc3339("2024-05-01T10:00:00Z").unwrap();
        let end = start + Duration::from_secs(90);

        assert_eq!(end.to_rfc3339(), "2024-05-01T10:01:30Z");
        assert_eq!(end - Duration::from_secs(90), start);
        assert!(start < end);
    }

    #[test]
    fn coerces_between_kinds() {
        let at = DateTime::from_rfc3339("2024-05-01T10:00:00Z").unwrap();
        let deadline: DateTimeOf<Deadline> = at.coerce();

        assert_eq!(deadline.to_rfc3339(), at.to_rfc3339());
        assert!(at < (deadline + Duration::from_secs(1)).coerce());
    }

    #[test]
    fn parses_offsets_into_utc() {
        let at = DateTime::from_rfc3339("2024-05-01T12:00:00+02:00").unwrap();

        assert_eq!(at.to_rfc3339(), "2024-05-01T10:00:00Z");
        assert!(DateTime::from_rfc3339("yesterday").is_err());
    }
}
