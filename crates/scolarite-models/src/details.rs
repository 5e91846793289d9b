//! Document types and their detail sets.
//!
//! A [`DetailSet`] is the merged, type-specific field map a document is
//! rendered from. It is persisted as JSON (`specific_details`,
//! `template_data`) with a `document_type` tag, and converted back into a
//! free-form [`DetailFields`] map whenever an admin action layers overrides
//! on top of it.
//!
//! Text fields use the empty string for "not provided"; the renderer prints
//! a placeholder for them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::transcripts::ModuleGrade;

/// Free-form detail map as received from callers or stored snapshots.
pub type DetailFields = serde_json::Map<String, Value>;

/// The four kinds of documents students can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    SchoolCertificate,
    SuccessCertificate,
    Transcript,
    Internship,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::SchoolCertificate,
        DocumentType::SuccessCertificate,
        DocumentType::Transcript,
        DocumentType::Internship,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::SchoolCertificate => "school-certificate",
            DocumentType::SuccessCertificate => "success-certificate",
            DocumentType::Transcript => "transcript",
            DocumentType::Internship => "internship",
        }
    }

    /// Prefix of the references issued for this type.
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            DocumentType::SchoolCertificate => "AS",
            DocumentType::SuccessCertificate => "AR",
            DocumentType::Transcript => "RN",
            DocumentType::Internship => "CS",
        }
    }

    /// Title printed on the document and used in notifications.
    pub fn title(&self) -> &'static str {
        match self {
            DocumentType::SchoolCertificate => "Attestation de scolarité",
            DocumentType::SuccessCertificate => "Attestation de réussite",
            DocumentType::Transcript => "Relevé de notes",
            DocumentType::Internship => "Convention de stage",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown document type: {}", s))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SchoolCertificateDetails {
    pub academic_year: String,
    pub level: String,
    pub program: String,
    pub birth_date: String,
    pub birth_place: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SuccessCertificateDetails {
    pub academic_year: String,
    pub session: String,
    pub level: String,
    pub program: String,
    pub mention: String,
    pub decision: String,
    pub birth_date: String,
    pub birth_place: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct TranscriptDetails {
    pub academic_year: String,
    pub session: String,
    pub level: String,
    pub program: String,
    pub modules: Vec<ModuleGrade>,
    pub mention: String,
    /// Stored for reference only; the printed decision is always computed
    /// from the module average.
    pub decision: String,
    pub birth_date: String,
    pub birth_place: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct InternshipDetails {
    pub academic_year: String,
    pub level: String,
    pub program: String,
    pub company_name: String,
    pub company_address: String,
    pub company_city: String,
    pub company_phone: String,
    pub company_email: String,
    pub supervisor_name: String,
    pub supervisor_title: String,
    pub supervisor_email: String,
    pub internship_subject: String,
    pub start_date: String,
    pub end_date: String,
    /// Any other `company_*`, `supervisor_*` or `internship_*` field the
    /// caller supplied, kept verbatim.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_fields: BTreeMap<String, String>,
}

/// Merged details, one variant per document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "document_type", rename_all = "kebab-case")]
pub enum DetailSet {
    SchoolCertificate(SchoolCertificateDetails),
    SuccessCertificate(SuccessCertificateDetails),
    Transcript(TranscriptDetails),
    Internship(InternshipDetails),
}

impl DetailSet {
    pub fn document_type(&self) -> DocumentType {
        match self {
            DetailSet::SchoolCertificate(_) => DocumentType::SchoolCertificate,
            DetailSet::SuccessCertificate(_) => DocumentType::SuccessCertificate,
            DetailSet::Transcript(_) => DocumentType::Transcript,
            DetailSet::Internship(_) => DocumentType::Internship,
        }
    }

    pub fn academic_year(&self) -> &str {
        match self {
            DetailSet::SchoolCertificate(d) => &d.academic_year,
            DetailSet::SuccessCertificate(d) => &d.academic_year,
            DetailSet::Transcript(d) => &d.academic_year,
            DetailSet::Internship(d) => &d.academic_year,
        }
    }

    /// Fields a complete document of this type should carry.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            DetailSet::SchoolCertificate(_) => &["academic_year", "level", "program"],
            DetailSet::SuccessCertificate(_) => &["academic_year", "level", "program", "session"],
            DetailSet::Transcript(_) => &["academic_year", "session", "modules"],
            DetailSet::Internship(_) => &[
                "company_name",
                "supervisor_name",
                "start_date",
                "end_date",
            ],
        }
    }

    /// Required fields that are blank. Rendering still succeeds with
    /// placeholders; callers use this for warnings.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let fields = self.to_fields();
        self.required_fields()
            .iter()
            .copied()
            .filter(|name| match fields.get(*name) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(Value::Array(items)) => items.is_empty(),
                Some(_) => false,
            })
            .collect()
    }

    /// Flat field map of this set, without the type tag. Internship extra
    /// fields are lifted back to the top level so that merging the result
    /// reproduces this set.
    pub fn to_fields(&self) -> DetailFields {
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        let Value::Object(mut fields) = value else {
            return DetailFields::new();
        };

        fields.remove("document_type");

        if let Some(Value::Object(extra)) = fields.remove("extra_fields") {
            for (key, value) in extra {
                fields.entry(key).or_insert(value);
            }
        }

        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_type_wire_names() {
        assert_eq!(
            serde_json::to_value(DocumentType::SuccessCertificate).unwrap(),
            json!("success-certificate")
        );
        assert_eq!(
            "internship".parse::<DocumentType>().unwrap(),
            DocumentType::Internship
        );
        assert!("complaint".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_detail_set_is_tagged() {
        let set = DetailSet::SchoolCertificate(SchoolCertificateDetails {
            academic_year: "2024-2025".to_string(),
            ..Default::default()
        });
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["document_type"], "school-certificate");
        assert_eq!(value["academic_year"], "2024-2025");

        let back: DetailSet = serde_json::from_value(value).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_to_fields_lifts_internship_extras() {
        let mut extra_fields = BTreeMap::new();
        extra_fields.insert("company_ice".to_string(), "001234".to_string());
        let set = DetailSet::Internship(InternshipDetails {
            company_name: "OCP".to_string(),
            extra_fields,
            ..Default::default()
        });

        let fields = set.to_fields();
        assert_eq!(fields.get("company_ice"), Some(&json!("001234")));
        assert!(!fields.contains_key("extra_fields"));
        assert!(!fields.contains_key("document_type"));
    }

    #[test]
    fn test_missing_fields() {
        let set = DetailSet::Transcript(TranscriptDetails {
            academic_year: "2024-2025".to_string(),
            ..Default::default()
        });
        assert_eq!(set.missing_fields(), vec!["session", "modules"]);
    }
}
