//! Student records.
//!
//! Students are imported from the registrar; this service only reads them to
//! identify the requester and to fill documents.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ids::StudentId;
use crate::transcripts::Transcript;

/// A student as stored in the `students` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Student {
    pub id: StudentId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// National identity card number
    pub cin: String,
    /// National student code
    pub cne: Option<String>,
    pub level: Option<String>,
    pub program: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub transcript: Option<Transcript>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Student {
    /// `LAST First`, the order used on official documents.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name.to_uppercase(), self.first_name)
            .trim()
            .to_string()
    }

    /// Whether `cin` identifies this student (case and whitespace insensitive).
    pub fn matches_cin(&self, cin: &str) -> bool {
        self.cin.trim().eq_ignore_ascii_case(cin.trim())
    }
}

/// Data needed to register a student (imports, CLI previews and tests).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NewStudent {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub cin: String,
    #[serde(default)]
    pub cne: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub birth_place: Option<String>,
    #[serde(default)]
    pub transcript: Option<Transcript>,
}

impl NewStudent {
    /// Materialise a student record with the given id.
    pub fn into_student(self, id: StudentId) -> Student {
        Student {
            id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            cin: self.cin,
            cne: self.cne,
            level: self.level,
            program: self.program,
            birth_date: self.birth_date,
            birth_place: self.birth_place,
            transcript: self.transcript,
            created_at: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> Student {
        NewStudent {
            email: "amal@etu.ma".to_string(),
            first_name: "Amal".to_string(),
            last_name: "Idrissi".to_string(),
            cin: "AB123456".to_string(),
            ..Default::default()
        }
        .into_student(StudentId::new(1))
    }

    #[test]
    fn test_full_name_uppercases_last_name() {
        assert_eq!(student().full_name(), "IDRISSI Amal");
    }

    #[test]
    fn test_matches_cin_ignores_case_and_spaces() {
        assert!(student().matches_cin(" ab123456 "));
        assert!(!student().matches_cin("AB000000"));
    }
}
