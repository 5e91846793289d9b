//! Transcript (parcours) records.
//!
//! A transcript is stored as a JSON document on the student row. Its shape
//! comes from the registrar's export and is only loosely structured, so the
//! types here accept a few alternative key names and grades written either
//! as numbers or as strings (`"12,5"`).

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// A student's academic record: one entry per academic year, in the order
/// the registrar recorded them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transcript {
    #[serde(default, alias = "parcours", alias = "academic_years")]
    pub years: Vec<AcademicYear>,
}

/// One academic year (a "parcours" entry).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AcademicYear {
    #[serde(default, alias = "academic_year", alias = "annee")]
    pub year: String,
    #[serde(default, alias = "sessions")]
    pub semesters: Vec<Semester>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Semester {
    #[serde(default, alias = "session", alias = "semester")]
    pub name: String,
    #[serde(default)]
    pub modules: Vec<ModuleGrade>,
    #[serde(default)]
    pub result: Option<SemesterResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SemesterResult {
    #[serde(default)]
    pub mention: String,
    #[serde(default)]
    pub decision: String,
}

/// A module and its grade out of 20. A missing grade stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ModuleGrade {
    #[serde(default, alias = "module")]
    pub name: String,
    #[serde(default, alias = "note", deserialize_with = "deserialize_grade")]
    pub grade: Option<f64>,
}

impl ModuleGrade {
    pub fn new(name: impl Into<String>, grade: f64) -> Self {
        Self {
            name: name.into(),
            grade: Some(grade),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawGrade {
    Number(f64),
    Text(String),
}

fn deserialize_grade<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawGrade> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawGrade::Number(n)) if n.is_finite() => Some(n),
        Some(RawGrade::Text(s)) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserializes_registrar_export() {
        let transcript: Transcript = serde_json::from_value(json!({
            "parcours": [{
                "academic_year": "2024-2025",
                "sessions": [{
                    "session": "S1",
                    "modules": [
                        { "name": "Algo", "grade": 12 },
                        { "module": "BD", "note": "8,5" },
                        { "name": "Stage", "grade": null }
                    ],
                    "result": { "mention": "Bien" }
                }]
            }]
        }))
        .unwrap();

        let semester = &transcript.years[0].semesters[0];
        assert_eq!(transcript.years[0].year, "2024-2025");
        assert_eq!(semester.name, "S1");
        assert_eq!(semester.modules[0].grade, Some(12.0));
        assert_eq!(semester.modules[1].name, "BD");
        assert_eq!(semester.modules[1].grade, Some(8.5));
        assert_eq!(semester.modules[2].grade, None);
        assert_eq!(semester.result.as_ref().unwrap().mention, "Bien");
        assert_eq!(semester.result.as_ref().unwrap().decision, "");
    }

    #[test]
    fn test_unparseable_grade_is_none() {
        let module: ModuleGrade =
            serde_json::from_value(json!({ "name": "Algo", "grade": "ABS" })).unwrap();
        assert_eq!(module.grade, None);
    }

    #[test]
    fn test_empty_object_is_empty_transcript() {
        let transcript: Transcript = serde_json::from_value(json!({})).unwrap();
        assert!(transcript.years.is_empty());
    }
}
