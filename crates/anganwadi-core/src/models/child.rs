use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::vaccination::AdministeredVaccine;

/// A registered child. Reference data owned by the registration service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Child {
    #[serde(rename = "_id", alias = "id", alias = "childId")]
    pub id: String,
    #[serde(alias = "childName", default)]
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub age_in_months: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(alias = "parentName", alias = "motherName", default)]
    pub guardian_name: Option<String>,
    #[serde(alias = "parentPhone", alias = "phoneNumber", default)]
    pub guardian_phone: Option<String>,
    #[serde(rename = "anganwadiCenter", alias = "center", default)]
    pub center: Option<String>,
    /// Vaccine names already administered, as recorded upstream.
    #[serde(alias = "vaccinations", default, deserialize_with = "vaccine_names")]
    pub vaccines_given: Vec<String>,
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp; anything else is `None`.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_date))
}

/// An administered dose listed either by name or as a full record.
#[derive(Deserialize)]
#[serde(untagged)]
enum VaccineRef {
    Name(String),
    Record(AdministeredVaccine),
}

/// Accepts a list of names, dose records, or a mix; `null` is empty.
fn vaccine_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let refs: Option<Vec<VaccineRef>> = Option::deserialize(deserializer)?;
    Ok(refs
        .unwrap_or_default()
        .into_iter()
        .map(|r| match r {
            VaccineRef::Name(name) => name,
            VaccineRef::Record(record) => record.vaccine_name,
        })
        .collect())
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    raw.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

impl Child {
    /// Completed months of age on `today`.
    ///
    /// Uses the date of birth when known, then the recorded month count,
    /// then whole years.
    pub fn age_in_months_on(&self, today: NaiveDate) -> Option<u32> {
        if let Some(dob) = self.date_of_birth {
            return Some(months_between(dob, today));
        }
        self.age_in_months.or_else(|| self.age.map(|years| years * 12))
    }

    pub fn age_str(&self) -> String {
        match (self.age, self.age_in_months) {
            (Some(years), _) => format!("{}y", years),
            (None, Some(months)) => format!("{}m", months),
            (None, None) => "-".to_string(),
        }
    }

    pub fn has_received(&self, vaccine: &str) -> bool {
        self.vaccines_given.iter().any(|v| v == vaccine)
    }
}

/// Whole calendar months from `from` to `to`; zero when `to` precedes `from`.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if to <= from {
        return 0;
    }
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_months_between() {
        assert_eq!(months_between(date(2026, 1, 18), date(2026, 10, 18)), 9);
        assert_eq!(months_between(date(2026, 1, 19), date(2026, 10, 18)), 8);
        assert_eq!(months_between(date(2024, 12, 31), date(2026, 1, 1)), 12);
        assert_eq!(months_between(date(2026, 10, 18), date(2026, 1, 1)), 0);
    }

    #[test]
    fn test_parse_child_payload() {
        let json = r#"{
            "_id": "64f0",
            "name": "Anu",
            "age": 3,
            "gender": "female",
            "dateOfBirth": "2023-05-02T00:00:00.000Z",
            "parentName": "Lakshmi",
            "parentPhone": "9876543210",
            "anganwadiCenter": "Akkarakkunnu Anganwadi"
        }"#;
        let child: Child = serde_json::from_str(json).unwrap();
        assert_eq!(child.id, "64f0");
        assert_eq!(child.date_of_birth, Some(date(2023, 5, 2)));
        assert_eq!(child.guardian_name.as_deref(), Some("Lakshmi"));
        assert!(child.vaccines_given.is_empty());
    }

    #[test]
    fn test_vaccinations_as_names_or_records() {
        let json = r#"{
            "_id": "c1",
            "name": "Anu",
            "vaccinations": [
                "BCG",
                {"vaccineName": "OPV 1", "dateGiven": "2026-03-01"},
                {"name": "DPT 1"}
            ]
        }"#;
        let child: Child = serde_json::from_str(json).unwrap();
        assert_eq!(child.vaccines_given, vec!["BCG", "OPV 1", "DPT 1"]);
        assert!(child.has_received("OPV 1"));

        let child: Child = serde_json::from_str(r#"{"_id": "c2", "vaccinations": null}"#).unwrap();
        assert!(child.vaccines_given.is_empty());
    }

    #[test]
    fn test_bad_date_of_birth_is_none() {
        let json = r#"{"_id": "x", "name": "Y", "dateOfBirth": "unknown"}"#;
        let child: Child = serde_json::from_str(json).unwrap();
        assert!(child.date_of_birth.is_none());
    }

    #[test]
    fn test_age_in_months_fallbacks() {
        let today = date(2026, 10, 18);
        let mut child: Child = serde_json::from_str(r#"{"_id": "x"}"#).unwrap();
        assert_eq!(child.age_in_months_on(today), None);

        child.age = Some(2);
        assert_eq!(child.age_in_months_on(today), Some(24));

        child.age_in_months = Some(30);
        assert_eq!(child.age_in_months_on(today), Some(30));

        child.date_of_birth = Some(date(2026, 1, 18));
        assert_eq!(child.age_in_months_on(today), Some(9));
    }
}
