//! Serde helpers for money fields. Values are whole currency units; stored
//! data written with fractional amounts is rounded to the nearest unit.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Whole(i64),
    Fractional(f64),
}

// 2^63 as f64; anything at or past it does not fit an i64.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn to_whole<E: serde::de::Error>(number: Number) -> Result<i64, E> {
    match number {
        Number::Whole(value) => Ok(value),
        Number::Fractional(value) => {
            let rounded = value.round();
            if !rounded.is_finite() || rounded.abs() >= I64_BOUND {
                return Err(E::custom(format!("amount {value} is out of range")));
            }
            Ok(rounded as i64)
        }
    }
}

pub(crate) fn whole_units<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    to_whole(Number::deserialize(deserializer)?)
}

pub(crate) fn optional_whole_units<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    Option::<Number>::deserialize(deserializer)?
        .map(to_whole::<D::Error>)
        .transpose()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Money {
        #[serde(deserialize_with = "super::whole_units")]
        amount: i64,
        #[serde(default, deserialize_with = "super::optional_whole_units")]
        revenue: Option<i64>,
    }

    fn parse(json: &str) -> Result<Money, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn fractions_round_to_whole_units() {
        let money = parse(r#"{"amount": 1200.5, "revenue": 99.4}"#).unwrap();
        assert_eq!(money.amount, 1201);
        assert_eq!(money.revenue, Some(99));
    }

    #[test]
    fn integers_and_missing_values_pass_through() {
        let money = parse(r#"{"amount": 98000}"#).unwrap();
        assert_eq!(money.amount, 98_000);
        assert_eq!(money.revenue, None);
        let money = parse(r#"{"amount": 1, "revenue": null}"#).unwrap();
        assert_eq!(money.revenue, None);
    }

    #[test]
    fn out_of_range_or_non_numeric_values_fail() {
        assert!(parse(r#"{"amount": 1e30}"#).is_err());
        assert!(parse(r#"{"amount": "lots"}"#).is_err());
    }
}
