//! Serde adapters that write `NaN` as `null` and read `null` back as `NaN`.
//!
//! JSON has no `NaN`: serde_json writes non-finite floats as `null` and then
//! refuses to read `null` into an `f64`. Infinities are written the same way
//! and therefore come back as `NaN`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

fn to_option(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

fn from_option(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NAN)
}

pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    to_option(*value).serialize(serializer)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(from_option)
}

/// The same mapping applied to each element of a `Vec<f64>`.
pub mod seq {
    use super::*;

    pub fn serialize<S>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(values.iter().map(|&v| to_option(v)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(values.into_iter().map(from_option).collect())
    }
}

/// The same mapping for an optional `Vec<f64>`.
pub mod option_seq {
    use super::*;

    pub fn serialize<S>(values: &Option<Vec<f64>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match values {
            Some(values) => serializer.serialize_some(&Nullable(values)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values = Option::<Vec<Option<f64>>>::deserialize(deserializer)?;
        Ok(values.map(|values| values.into_iter().map(from_option).collect()))
    }

    struct Nullable<'a>(&'a [f64]);

    impl Serialize for Nullable<'_> {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            super::seq::serialize(self.0, serializer)
        }
    }
}
