//! GraphQL scalar definitions.

use std::{fmt, marker::PhantomData, str::FromStr};

use juniper::{
    GraphQLType, InputValue, ParseScalarResult, ParseScalarValue, ScalarToken,
    ScalarValue, Value,
};

/// Adapter exposing a domain value type as a string GraphQL scalar, used in
/// the `#[graphql(with = ..)]` attribute.
///
/// The domain `As` type drives validation via its [`FromStr`] impl and
/// rendering via its [`Display`] one, so invalid usernames, emails, product
/// names and such are rejected before reaching any resolver.
///
/// The wrapping GraphQL type must implement [`TryFrom`] and [`AsRef`] for
/// `As` type.
///
/// [`Display`]: fmt::Display
#[derive(Debug)]
pub struct Via<As>(PhantomData<As>);

impl<As> Via<As> {
    /// Renders the wrapping type as a string scalar [`Value`].
    ///
    /// [`Display`]: fmt::Display
    pub fn to_output<T, S>(value: &T) -> Value<S>
    where
        As: fmt::Display,
        T: AsRef<As>,
        S: ScalarValue,
    {
        Value::from(value.as_ref().to_string())
    }

    /// Parses the wrapping type out of a string [`InputValue`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the input value is not a string;
    /// - the input value cannot be parsed into `As` type;
    /// - the parsed value cannot be converted into the target type.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    pub fn from_input<T, S>(input: &InputValue<S>) -> Result<T, String>
    where
        As: FromStr + fmt::Display,
        As::Err: fmt::Display,
        T: TryFrom<As> + GraphQLType<S, TypeInfo = ()>,
        T::Error: fmt::Display,
        S: ScalarValue,
    {
        let s = input.as_string_value().ok_or_else(|| {
            format!(
                "Cannot parse input scalar `{}`: expected string input \
                 value, found: {input}",
                T::name(&()).expect("always has a name"),
            )
        })?;
        s.parse::<As>()
            .map_err(|e| {
                format!(
                    "Cannot parse input scalar `{}` from \"{s}\" string: {e}",
                    T::name(&()).expect("always has a name"),
                )
            })?
            .try_into()
            .map_err(|e| {
                format!(
                    "Cannot parse input scalar `{}`: {e}",
                    T::name(&()).expect("always has a name"),
                )
            })
    }

    /// Parses the provided [`ScalarToken`] as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be parsed as [`String`].
    pub fn parse_token<S: ScalarValue>(
        value: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <String as ParseScalarValue<S>>::from_str(value)
    }
}

#[cfg(test)]
mod spec {
    use juniper::{DefaultScalarValue, InputValue, Value};
    use service::domain;

    use crate::api::{product, user};

    use super::Via;

    type UsernameVia = Via<domain::user::Username>;

    #[test]
    fn parses_valid_input() {
        let name = UsernameVia::from_input::<user::Username, DefaultScalarValue>(
            &InputValue::scalar("alice"),
        )
        .unwrap();

        assert_eq!(name.to_string(), "alice");
        assert_eq!(
            UsernameVia::to_output::<_, DefaultScalarValue>(&name),
            Value::scalar("alice".to_owned()),
        );
    }

    #[test]
    fn rejects_non_string_input() {
        let err = UsernameVia::from_input::<user::Username, DefaultScalarValue>(
            &InputValue::scalar(42),
        )
        .unwrap_err();

        assert!(err.contains("expected string input"), "{err}");
        assert!(err.contains("UserUsername"), "{err}");
    }

    #[test]
    fn rejects_invalid_domain_value() {
        let err = Via::<domain::product::Name>::from_input::<
            product::Name,
            DefaultScalarValue,
        >(&InputValue::scalar(""))
        .unwrap_err();

        assert!(err.contains("ProductName"), "{err}");
    }
}
