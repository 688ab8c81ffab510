//! Lenient wire helpers used by `#[serde(deserialize_with = ...)]` in every
//! record schema.
//!
//! The backend is loose about optional values: strings may be `null` or
//! numeric foreign keys, dates may be `""`, ids may be strings or integers.
//! These helpers state the defaulting rules once:
//!
//! - missing / `null` string → `""`; numbers are stringified
//! - missing / `null` / `""` date → `None`; datetimes are truncated to the date
//! - missing / `null` / `""` id → `None`; nested `{"id": ..}` objects collapse to their id
//! - missing / `null` / `""` / unrecognized status → the enum's default
//! - total read from `total_amount`, then `amount`, then zero

use chrono::NaiveDate;
use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer};

use crate::id::RecordId;
use crate::money::RawAmount;

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Text(String),
    Signed(i64),
    Float(f64),
    Flag(bool),
}

impl Loose {
    fn into_string(self) -> String {
        match self {
            Loose::Text(s) => s,
            Loose::Signed(n) => n.to_string(),
            Loose::Float(f) => f.to_string(),
            Loose::Flag(b) => b.to_string(),
        }
    }
}

/// `null` or non-string scalars become a string; absent fields need `#[serde(default)]`.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Loose>::deserialize(deserializer)?
        .map(Loose::into_string)
        .unwrap_or_default())
}

/// Like [`lenient_string`] but keeps absence (`null` / `""`) as `None`.
pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Loose>::deserialize(deserializer)?
        .map(Loose::into_string)
        .filter(|s| !s.trim().is_empty()))
}

/// `YYYY-MM-DD` (or an RFC 3339 datetime, truncated) into a date; blanks are `None`.
pub fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => {
            let day = s.get(..10).unwrap_or(s);
            NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .map(Some)
                .map_err(|e| serde::de::Error::custom(format!("invalid date '{s}': {e}")))
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Related {
    Scalar(Loose),
    Nested { id: Loose },
}

/// Foreign-key style id, either a scalar or a nested `{"id": ...}` object;
/// `null` / `""` become `None`.
pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<RecordId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Related>::deserialize(deserializer)?
        .map(|related| match related {
            Related::Scalar(id) | Related::Nested { id } => id.into_string(),
        })
        .filter(|s| !s.trim().is_empty())
        .map(RecordId::from))
}

/// List of related ids (scalars or nested objects); `null` is an empty list.
pub fn id_list<'de, D>(deserializer: D) -> Result<Vec<RecordId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Related>>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .map(|related| match related {
            Related::Scalar(id) | Related::Nested { id } => RecordId::from(id.into_string()),
        })
        .collect())
}

/// Truthy flag: accepts booleans, `0`/`1` and `"true"`/`"false"`; `null` is false.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        None => false,
        Some(Loose::Flag(b)) => b,
        Some(Loose::Signed(n)) => n != 0,
        Some(Loose::Float(f)) => f != 0.0,
        Some(Loose::Text(s)) => matches!(s.trim(), "true" | "True" | "1"),
    })
}

/// Unit-variant enum (a status) with a default; `null`, blank and unknown
/// labels all read as the default so one odd record cannot fail a listing.
pub fn enum_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    known_enum(deserializer).map(Option::unwrap_or_default)
}

/// Enum label where `null`, `""` and unrecognised labels read as `None`.
pub fn known_enum<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let Some(label) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let label = label.trim();
    if label.is_empty() {
        return Ok(None);
    }
    let parsed: Result<T, serde::de::value::Error> = T::deserialize(label.into_deserializer());
    Ok(parsed.ok())
}

/// Amount where `null` and `""` count as absent.
pub fn optional_amount<'de, D>(deserializer: D) -> Result<Option<crate::Amount>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawAmount>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => raw.resolve().map_err(serde::de::Error::custom),
    }
}

/// Record total on a flattened field:
/// `#[serde(flatten, with = "wire::total_amount")]`.
///
/// Reads `total_amount`, falling back to `amount`, then zero; both keys may be
/// present. Writes `total_amount` only.
pub mod total_amount {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::money::Amount;

    #[derive(Deserialize)]
    struct Keys {
        #[serde(default, deserialize_with = "super::optional_amount")]
        total_amount: Option<Amount>,
        #[serde(default, deserialize_with = "super::optional_amount")]
        amount: Option<Amount>,
    }

    #[derive(Serialize)]
    struct Total<'a> {
        total_amount: &'a Amount,
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: Deserializer<'de>,
    {
        let keys = Keys::deserialize(deserializer)?;
        Ok(keys.total_amount.or(keys.amount).unwrap_or_default())
    }

    pub fn serialize<S>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Total { total_amount: amount }.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient_string")]
        name: String,
        #[serde(default, deserialize_with = "optional_date")]
        due: Option<NaiveDate>,
        #[serde(default, deserialize_with = "optional_id")]
        project: Option<RecordId>,
        #[serde(default, deserialize_with = "lenient_bool")]
        billable: bool,
    }

    #[test]
    fn missing_fields_take_defaults() {
        let s: Sample = serde_json::from_str("{}").unwrap();
        assert_eq!(s.name, "");
        assert_eq!(s.due, None);
        assert_eq!(s.project, None);
        assert!(!s.billable);
    }

    #[test]
    fn nulls_and_blanks_take_defaults() {
        let s: Sample =
            serde_json::from_str(r#"{"name": null, "due": "", "project": null, "billable": null}"#)
                .unwrap();
        assert_eq!(s.name, "");
        assert_eq!(s.due, None);
        assert_eq!(s.project, None);
    }

    #[test]
    fn numeric_foreign_keys_and_datetimes_are_normalized() {
        let s: Sample = serde_json::from_str(
            r#"{"name": 12, "due": "2024-03-05T10:00:00Z", "project": 3, "billable": 1}"#,
        )
        .unwrap();
        assert_eq!(s.name, "12");
        assert_eq!(s.due, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(s.project, Some(RecordId::from("3")));
        assert!(s.billable);
    }

    #[test]
    fn nested_related_objects_collapse_to_id() {
        let s: Sample =
            serde_json::from_str(r#"{"project": {"id": 9, "name": "Website"}}"#).unwrap();
        assert_eq!(s.project, Some(RecordId::from("9")));
    }

    #[test]
    fn id_lists_mix_scalars_and_objects() {
        #[derive(Deserialize)]
        struct Team {
            #[serde(default, deserialize_with = "id_list")]
            members: Vec<RecordId>,
        }

        let t: Team = serde_json::from_str(r#"{"members": [1, {"id": "u2"}]}"#).unwrap();
        assert_eq!(t.members, vec![RecordId::from("1"), RecordId::from("u2")]);

        let empty: Team = serde_json::from_str(r#"{"members": null}"#).unwrap();
        assert!(empty.members.is_empty());
    }

    #[derive(Debug, Default, PartialEq, Deserialize)]
    #[serde(rename_all = "snake_case")]
    enum Stage {
        #[default]
        Draft,
        Done,
    }

    #[derive(Debug, Deserialize, serde::Serialize)]
    struct Priced {
        #[serde(flatten, with = "total_amount")]
        total: crate::Amount,
    }

    #[test]
    fn statuses_fall_back_to_default() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(default, deserialize_with = "enum_or_default")]
            stage: Stage,
        }

        let read = |json: &str| serde_json::from_str::<Row>(json).unwrap().stage;
        assert_eq!(read(r#"{"stage": "done"}"#), Stage::Done);
        assert_eq!(read(r#"{"stage": null}"#), Stage::Draft);
        assert_eq!(read(r#"{"stage": ""}"#), Stage::Draft);
        assert_eq!(read(r#"{"stage": "archived"}"#), Stage::Draft);
        assert_eq!(read("{}"), Stage::Draft);
    }

    #[test]
    fn total_falls_back_to_amount_then_zero() {
        let read = |json: &str| serde_json::from_str::<Priced>(json).unwrap().total;
        assert_eq!(read(r#"{"total_amount": "10.00", "amount": "99.00"}"#), crate::Amount::from_major(10));
        assert_eq!(read(r#"{"total_amount": null, "amount": "50.00"}"#), crate::Amount::from_major(50));
        assert_eq!(read(r#"{"total_amount": "", "amount": 7}"#), crate::Amount::from_major(7));
        assert_eq!(read("{}"), crate::Amount::ZERO);
    }

    #[test]
    fn total_is_written_under_total_amount() {
        let json = serde_json::to_value(Priced { total: crate::Amount::from_minor(1_050) }).unwrap();
        assert_eq!(json, serde_json::json!({ "total_amount": 10.5 }));
    }

    #[test]
    fn garbage_dates_are_rejected() {
        assert!(serde_json::from_str::<Sample>(r#"{"due": "next week"}"#).is_err());
    }
}
