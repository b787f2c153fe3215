//! Dimension entities: season, event, category, session, rider
//!
//! Each entity has a wire record (the JSON shape returned by the results API)
//! and a normalized domain type. Normalization happens once, at the API
//! boundary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub id: String,
    pub year: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rider {
    pub id: String,
    pub name: String,
    pub country: String,
    pub team: String,
    pub number: Option<i32>,
}

/// A category label with no alphanumeric token (e.g. `"™"`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to parse category from label {label:?}")]
pub struct CategoryParseError {
    pub label: String,
}

impl Category {
    /// Leading alphanumeric token of a raw label, lower-cased.
    ///
    /// `"MotoGP™"` → `"motogp"`, `"Moto2™"` → `"moto2"`.
    pub fn parse_label(label: &str) -> Result<String, CategoryParseError> {
        let token: String = label
            .chars()
            .skip_while(|c| !c.is_ascii_alphanumeric())
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        if token.is_empty() {
            return Err(CategoryParseError {
                label: label.to_string(),
            });
        }
        Ok(token.to_ascii_lowercase())
    }
}

impl Session {
    /// `{type}{number}` lower-cased, or bare `type` when there is no number.
    pub fn session_name(kind: &str, number: Option<i64>) -> String {
        match number {
            Some(n) => format!("{kind}{n}").to_lowercase(),
            None => kind.to_lowercase(),
        }
    }
}

// ── Wire records ──

#[derive(Debug, Deserialize)]
pub struct SeasonRecord {
    pub id: String,
    pub year: i32,
}

#[derive(Debug, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub date_start: String,
    pub date_end: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub number: Option<i64>,
}

impl From<SeasonRecord> for Season {
    fn from(r: SeasonRecord) -> Self {
        Self {
            id: r.id,
            year: r.year,
        }
    }
}

impl TryFrom<EventRecord> for Event {
    type Error = chrono::ParseError;

    fn try_from(r: EventRecord) -> Result<Self, Self::Error> {
        // Dates may carry a time suffix ("2024-03-08T00:00:00+00:00")
        let date = |s: &str| NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d");
        Ok(Self {
            start_date: date(&r.date_start)?,
            end_date: date(&r.date_end)?,
            id: r.id,
            name: r.name,
            short_name: r.short_name.to_lowercase(),
        })
    }
}

impl TryFrom<CategoryRecord> for Category {
    type Error = CategoryParseError;

    fn try_from(r: CategoryRecord) -> Result<Self, Self::Error> {
        let name = Category::parse_label(&r.name)?;
        Ok(Self { id: r.id, name })
    }
}

impl From<SessionRecord> for Session {
    fn from(r: SessionRecord) -> Self {
        Self {
            name: Session::session_name(&r.kind, r.number),
            id: r.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_label_trademark_suffix() {
        assert_eq!(Category::parse_label("MotoGP™").unwrap(), "motogp");
        assert_eq!(Category::parse_label("Moto2™").unwrap(), "moto2");
        assert_eq!(Category::parse_label("MotoE™ World Cup").unwrap(), "motoe");
    }

    #[test]
    fn category_label_leading_noise() {
        assert_eq!(Category::parse_label("  - Moto3").unwrap(), "moto3");
    }

    #[test]
    fn category_label_without_token_fails() {
        let err = Category::parse_label("™ ®").unwrap_err();
        assert_eq!(err.label, "™ ®");
        assert!(Category::parse_label("").is_err());
    }

    #[test]
    fn session_name_with_number() {
        assert_eq!(Session::session_name("FP", Some(1)), "fp1");
        assert_eq!(Session::session_name("Q", Some(2)), "q2");
    }

    #[test]
    fn session_name_without_number() {
        assert_eq!(Session::session_name("RAC", None), "rac");
        assert_eq!(Session::session_name("SPR", None), "spr");
    }

    #[test]
    fn session_record_null_number() {
        let rec: SessionRecord =
            serde_json::from_str(r#"{"id":"x","type":"WUP","number":null}"#).unwrap();
        assert_eq!(Session::from(rec).name, "wup");
    }

    #[test]
    fn event_record_parses_dates() {
        let rec: EventRecord = serde_json::from_str(
            r#"{"id":"e1","name":"Grand Prix of Qatar","short_name":"QAT",
                "date_start":"2024-03-08","date_end":"2024-03-10T00:00:00+00:00"}"#,
        )
        .unwrap();
        let event = Event::try_from(rec).unwrap();
        assert_eq!(event.short_name, "qat");
        assert_eq!(event.start_date, NaiveDate::from_ymd_opt(2024, 3, 8).unwrap());
        assert_eq!(event.end_date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    }

    #[test]
    fn event_record_bad_date() {
        let rec = EventRecord {
            id: "e".into(),
            name: "n".into(),
            short_name: "s".into(),
            date_start: "tomorrow".into(),
            date_end: "2024-01-01".into(),
        };
        assert!(Event::try_from(rec).is_err());
    }
}
