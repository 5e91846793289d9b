//! Detail merger.
//!
//! Builds the canonical [`DetailSet`] of a document from three layers, last
//! one wins:
//!
//! 1. a base template taken from the student record (current academic year,
//!    level, program, birth data),
//! 2. data resolved from the student's transcript,
//! 3. the caller's incoming fields.
//!
//! Each document type has its own pure merge function, selected by
//! [`merge_fn`]. Merging never fails and is idempotent: feeding
//! [`DetailSet::to_fields`] back through [`merge`] reproduces the set.

use chrono::{Datelike, Local, NaiveDate};
use serde_json::Value;
use std::collections::BTreeMap;

use scolarite_models::details::{
    DetailFields, DetailSet, DocumentType, InternshipDetails, SchoolCertificateDetails,
    SuccessCertificateDetails, TranscriptDetails,
};
use scolarite_models::students::Student;
use scolarite_models::transcripts::ModuleGrade;

use super::resolver::{ResolvedTranscript, resolve};

type MergeFn = fn(&Student, &DetailFields, Base) -> DetailSet;

/// One merge function per document type.
fn merge_fn(document_type: DocumentType) -> MergeFn {
    match document_type {
        DocumentType::SchoolCertificate => merge_school_certificate,
        DocumentType::SuccessCertificate => merge_success_certificate,
        DocumentType::Transcript => merge_transcript,
        DocumentType::Internship => merge_internship,
    }
}

/// Fields the merger takes from the resolved transcript semester.
fn transcript_derived(document_type: DocumentType) -> &'static [&'static str] {
    match document_type {
        DocumentType::Transcript => &["modules", "mention", "decision"],
        DocumentType::SuccessCertificate => &["mention", "decision"],
        DocumentType::SchoolCertificate | DocumentType::Internship => &[],
    }
}

const INTERNSHIP_PREFIXES: [&str; 3] = ["company_", "supervisor_", "internship_"];

const INTERNSHIP_FIELDS: [&str; 11] = [
    "company_name",
    "company_address",
    "company_city",
    "company_phone",
    "company_email",
    "supervisor_name",
    "supervisor_title",
    "supervisor_email",
    "internship_subject",
    "start_date",
    "end_date",
];

/// Defaults every document type starts from.
#[derive(Debug, Clone)]
struct Base {
    academic_year: String,
    level: String,
    program: String,
    birth_date: String,
    birth_place: String,
}

impl Base {
    fn new(student: &Student, today: NaiveDate) -> Self {
        Self {
            academic_year: current_academic_year(today),
            level: student.level.clone().unwrap_or_default(),
            program: student.program.clone().unwrap_or_default(),
            birth_date: student
                .birth_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            birth_place: student.birth_place.clone().unwrap_or_default(),
        }
    }
}

/// Academic year containing `today`, as `YYYY-YYYY`. Years start on
/// 1 September.
pub fn current_academic_year(today: NaiveDate) -> String {
    let start = if today.month() >= 9 {
        today.year()
    } else {
        today.year() - 1
    };
    format!("{}-{}", start, start + 1)
}

/// Merge `incoming` into the canonical detail set of `document_type`.
pub fn merge(document_type: DocumentType, student: &Student, incoming: &DetailFields) -> DetailSet {
    merge_on(document_type, student, incoming, Local::now().date_naive())
}

/// [`merge`] with an explicit date for the academic year default.
pub fn merge_on(
    document_type: DocumentType,
    student: &Student,
    incoming: &DetailFields,
    today: NaiveDate,
) -> DetailSet {
    merge_fn(document_type)(student, incoming, Base::new(student, today))
}

/// Layer `overrides` over a stored snapshot, key by key. A `null` override
/// clears the key so the merger falls back to its default.
///
/// Grades, mention and decision in the snapshot are dropped whenever the
/// student's transcript has a semester for the target year/session, so they
/// are re-resolved from the current record. Overrides still win.
pub fn overlay(student: &Student, stored: &DetailSet, overrides: &DetailFields) -> DetailFields {
    let mut fields = stored.to_fields();
    for (key, value) in overrides {
        if value.is_null() {
            fields.remove(key);
        } else {
            fields.insert(key.clone(), value.clone());
        }
    }

    let derived = transcript_derived(stored.document_type());
    if !derived.is_empty() && !resolve_for(student, &fields).session.is_empty() {
        for key in derived {
            if !overrides.contains_key(*key) {
                fields.remove(*key);
            }
        }
    }

    fields
}

/// Text value of an incoming field. Blank strings, `null`, arrays and
/// objects count as absent.
fn text(incoming: &DetailFields, key: &str) -> Option<String> {
    match incoming.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn pick(incoming: &DetailFields, key: &str, fallback: String) -> String {
    text(incoming, key).unwrap_or(fallback)
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Caller-supplied modules, when a non-empty array of module objects.
fn incoming_modules(incoming: &DetailFields) -> Option<Vec<ModuleGrade>> {
    let Value::Array(items) = incoming.get("modules")? else {
        return None;
    };

    let modules: Vec<ModuleGrade> = items
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect();

    (!modules.is_empty()).then_some(modules)
}

fn resolve_for(student: &Student, incoming: &DetailFields) -> ResolvedTranscript {
    resolve(
        student.transcript.as_ref(),
        text(incoming, "academic_year").as_deref(),
        text(incoming, "session").as_deref(),
    )
}

fn merge_school_certificate(_student: &Student, incoming: &DetailFields, base: Base) -> DetailSet {
    DetailSet::SchoolCertificate(SchoolCertificateDetails {
        academic_year: pick(incoming, "academic_year", base.academic_year),
        level: pick(incoming, "level", base.level),
        program: pick(incoming, "program", base.program),
        birth_date: pick(incoming, "birth_date", base.birth_date),
        birth_place: pick(incoming, "birth_place", base.birth_place),
    })
}

fn merge_success_certificate(student: &Student, incoming: &DetailFields, base: Base) -> DetailSet {
    let resolved = resolve_for(student, incoming);
    let academic_year = non_empty(resolved.academic_year).unwrap_or(base.academic_year);

    DetailSet::SuccessCertificate(SuccessCertificateDetails {
        academic_year: pick(incoming, "academic_year", academic_year),
        session: pick(incoming, "session", resolved.session),
        level: pick(incoming, "level", base.level),
        program: pick(incoming, "program", base.program),
        mention: pick(incoming, "mention", resolved.mention),
        decision: pick(incoming, "decision", resolved.decision),
        birth_date: pick(incoming, "birth_date", base.birth_date),
        birth_place: pick(incoming, "birth_place", base.birth_place),
    })
}

fn merge_transcript(student: &Student, incoming: &DetailFields, base: Base) -> DetailSet {
    let resolved = resolve_for(student, incoming);
    let academic_year = non_empty(resolved.academic_year).unwrap_or(base.academic_year);

    DetailSet::Transcript(TranscriptDetails {
        academic_year: pick(incoming, "academic_year", academic_year),
        session: pick(incoming, "session", resolved.session),
        level: pick(incoming, "level", base.level),
        program: pick(incoming, "program", base.program),
        modules: incoming_modules(incoming).unwrap_or(resolved.modules),
        mention: pick(incoming, "mention", resolved.mention),
        decision: pick(incoming, "decision", resolved.decision),
        birth_date: pick(incoming, "birth_date", base.birth_date),
        birth_place: pick(incoming, "birth_place", base.birth_place),
    })
}

fn merge_internship(_student: &Student, incoming: &DetailFields, base: Base) -> DetailSet {
    let field = |key: &str| text(incoming, key).unwrap_or_default();

    let extra_fields: BTreeMap<String, String> = incoming
        .keys()
        .filter(|key| INTERNSHIP_PREFIXES.iter().any(|p| key.starts_with(p)))
        .filter(|key| !INTERNSHIP_FIELDS.contains(&key.as_str()))
        .filter_map(|key| text(incoming, key).map(|value| (key.clone(), value)))
        .collect();

    DetailSet::Internship(InternshipDetails {
        academic_year: pick(incoming, "academic_year", base.academic_year),
        level: pick(incoming, "level", base.level),
        program: pick(incoming, "program", base.program),
        company_name: field("company_name"),
        company_address: field("company_address"),
        company_city: field("company_city"),
        company_phone: field("company_phone"),
        company_email: field("company_email"),
        supervisor_name: field("supervisor_name"),
        supervisor_title: field("supervisor_title"),
        supervisor_email: field("supervisor_email"),
        internship_subject: field("internship_subject"),
        start_date: field("start_date"),
        end_date: field("end_date"),
        extra_fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scolarite_models::ids::StudentId;
    use scolarite_models::students::NewStudent;
    use serde_json::json;

    fn fields(value: Value) -> DetailFields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn student() -> Student {
        NewStudent {
            email: "amal@etu.ma".to_string(),
            first_name: "Amal".to_string(),
            last_name: "Idrissi".to_string(),
            cin: "AB123456".to_string(),
            level: Some("Licence 3".to_string()),
            program: Some("SMI".to_string()),
            birth_date: NaiveDate::from_ymd_opt(2003, 4, 9),
            birth_place: Some("Rabat".to_string()),
            transcript: serde_json::from_value(json!({
                "years": [{
                    "year": "2024-2025",
                    "semesters": [{
                        "name": "S1",
                        "modules": [
                            { "name": "Algo", "grade": 12 },
                            { "name": "BD", "grade": 8 }
                        ],
                        "result": { "mention": "Bien", "decision": "Admis" }
                    }]
                }]
            }))
            .ok(),
            ..Default::default()
        }
        .into_student(StudentId::new(1))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 2).unwrap()
    }

    #[test]
    fn test_current_academic_year_rolls_over_in_september() {
        let august = NaiveDate::from_ymd_opt(2025, 8, 31).unwrap();
        let september = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        assert_eq!(current_academic_year(august), "2024-2025");
        assert_eq!(current_academic_year(september), "2025-2026");
    }

    #[test]
    fn test_school_certificate_defaults_from_student() {
        let set = merge_on(
            DocumentType::SchoolCertificate,
            &student(),
            &DetailFields::new(),
            today(),
        );

        let DetailSet::SchoolCertificate(details) = set else {
            panic!("wrong variant");
        };
        assert_eq!(details.academic_year, "2025-2026");
        assert_eq!(details.level, "Licence 3");
        assert_eq!(details.program, "SMI");
        assert_eq!(details.birth_date, "2003-04-09");
        assert_eq!(details.birth_place, "Rabat");
    }

    #[test]
    fn test_incoming_fields_take_precedence() {
        let incoming = fields(json!({ "level": "Master 1", "academic_year": " 2023-2024 " }));
        let set = merge_on(DocumentType::SchoolCertificate, &student(), &incoming, today());

        let DetailSet::SchoolCertificate(details) = set else {
            panic!("wrong variant");
        };
        assert_eq!(details.level, "Master 1");
        assert_eq!(details.academic_year, "2023-2024");
    }

    #[test]
    fn test_transcript_uses_resolved_modules() {
        let set = merge_on(
            DocumentType::Transcript,
            &student(),
            &DetailFields::new(),
            today(),
        );

        let DetailSet::Transcript(details) = set else {
            panic!("wrong variant");
        };
        assert_eq!(details.academic_year, "2024-2025");
        assert_eq!(details.session, "S1");
        assert_eq!(details.mention, "Bien");
        assert_eq!(
            details.modules,
            vec![ModuleGrade::new("Algo", 12.0), ModuleGrade::new("BD", 8.0)]
        );
    }

    #[test]
    fn test_transcript_explicit_modules_win_unless_empty() {
        let incoming = fields(json!({ "modules": [{ "name": "Réseaux", "grade": "15,5" }] }));
        let set = merge_on(DocumentType::Transcript, &student(), &incoming, today());
        let DetailSet::Transcript(details) = set else {
            panic!("wrong variant");
        };
        assert_eq!(details.modules, vec![ModuleGrade::new("Réseaux", 15.5)]);

        let incoming = fields(json!({ "modules": [] }));
        let set = merge_on(DocumentType::Transcript, &student(), &incoming, today());
        let DetailSet::Transcript(details) = set else {
            panic!("wrong variant");
        };
        assert_eq!(details.modules.len(), 2);
    }

    #[test]
    fn test_success_certificate_without_transcript_uses_current_year() {
        let mut student = student();
        student.transcript = None;

        let set = merge_on(
            DocumentType::SuccessCertificate,
            &student,
            &DetailFields::new(),
            today(),
        );
        let DetailSet::SuccessCertificate(details) = set else {
            panic!("wrong variant");
        };
        assert_eq!(details.academic_year, "2025-2026");
        assert_eq!(details.session, "");
        assert_eq!(details.mention, "");
    }

    #[test]
    fn test_internship_passes_through_prefixed_fields() {
        let incoming = fields(json!({
            "company_name": "OCP",
            "company_ice": 1234,
            "supervisor_phone": "0600000000",
            "internship_duration": "8 semaines",
            "start_date": "2025-07-01",
            "unrelated": "dropped",
            "company_fax": ""
        }));
        let set = merge_on(DocumentType::Internship, &student(), &incoming, today());

        let DetailSet::Internship(details) = set else {
            panic!("wrong variant");
        };
        assert_eq!(details.company_name, "OCP");
        assert_eq!(details.start_date, "2025-07-01");
        assert_eq!(details.extra_fields.get("company_ice").map(String::as_str), Some("1234"));
        assert_eq!(
            details.extra_fields.get("supervisor_phone").map(String::as_str),
            Some("0600000000")
        );
        assert!(details.extra_fields.contains_key("internship_duration"));
        assert!(!details.extra_fields.contains_key("unrelated"));
        assert!(!details.extra_fields.contains_key("company_fax"));
        assert!(!details.extra_fields.contains_key("company_name"));
    }

    #[test]
    fn test_merge_is_idempotent_for_every_type() {
        let incoming = fields(json!({
            "session": "S9",
            "company_name": "OCP",
            "company_ice": "001",
            "mention": "Assez bien"
        }));

        for document_type in DocumentType::ALL {
            let first = merge_on(document_type, &student(), &incoming, today());
            let second = merge_on(document_type, &student(), &first.to_fields(), today());
            assert_eq!(first, second, "{document_type} is not idempotent");
        }
    }

    #[test]
    fn test_overlay_overrides_and_clears() {
        let stored = merge_on(
            DocumentType::SchoolCertificate,
            &student(),
            &fields(json!({ "level": "Master 1" })),
            today(),
        );

        let overrides = fields(json!({ "program": "SMA", "level": null }));
        let merged = merge_on(
            DocumentType::SchoolCertificate,
            &student(),
            &overlay(&student(), &stored, &overrides),
            today(),
        );

        let DetailSet::SchoolCertificate(details) = merged else {
            panic!("wrong variant");
        };
        assert_eq!(details.program, "SMA");
        assert_eq!(details.level, "Licence 3");
    }

    fn two_semester_student() -> Student {
        let mut student = student();
        student.transcript = serde_json::from_value(json!({
            "years": [{
                "year": "2024-2025",
                "semesters": [
                    {
                        "name": "S1",
                        "modules": [
                            { "name": "Algo", "grade": 12 },
                            { "name": "BD", "grade": 8 }
                        ],
                        "result": { "mention": "Bien", "decision": "Admis" }
                    },
                    {
                        "name": "S2",
                        "modules": [{ "name": "Réseaux", "grade": 14.5 }],
                        "result": { "mention": "Assez bien", "decision": "Admis" }
                    }
                ]
            }]
        }))
        .ok();
        student
    }

    #[test]
    fn test_overlay_session_change_re_resolves_transcript() {
        let student = two_semester_student();
        let stored = merge_on(DocumentType::Transcript, &student, &DetailFields::new(), today());

        let incoming = overlay(&student, &stored, &fields(json!({ "session": "S2" })));
        let DetailSet::Transcript(details) =
            merge_on(DocumentType::Transcript, &student, &incoming, today())
        else {
            panic!("wrong variant");
        };
        assert_eq!(details.session, "S2");
        assert_eq!(details.mention, "Assez bien");
        assert_eq!(details.modules, vec![ModuleGrade::new("Réseaux", 14.5)]);
    }

    #[test]
    fn test_overlay_picks_up_corrected_grades() {
        let mut student = student();
        let stored = merge_on(DocumentType::SuccessCertificate, &student, &DetailFields::new(), today());

        student.transcript = serde_json::from_value(json!({
            "years": [{
                "year": "2024-2025",
                "semesters": [{
                    "name": "S1",
                    "modules": [{ "name": "Algo", "grade": 16 }],
                    "result": { "mention": "Très bien", "decision": "Admis" }
                }]
            }]
        }))
        .ok();

        let incoming = overlay(&student, &stored, &DetailFields::new());
        let DetailSet::SuccessCertificate(details) =
            merge_on(DocumentType::SuccessCertificate, &student, &incoming, today())
        else {
            panic!("wrong variant");
        };
        assert_eq!(details.mention, "Très bien");
    }

    #[test]
    fn test_overlay_keeps_explicit_and_untranscribed_values() {
        let student = two_semester_student();
        let stored = merge_on(DocumentType::Transcript, &student, &DetailFields::new(), today());
        let overrides = fields(json!({ "mention": "Passable" }));
        let incoming = overlay(&student, &stored, &overrides);
        assert_eq!(incoming.get("mention"), Some(&json!("Passable")));
        assert!(!incoming.contains_key("modules"));

        let mut without_transcript = student.clone();
        without_transcript.transcript = None;
        let stored = merge_on(
            DocumentType::SuccessCertificate,
            &without_transcript,
            &fields(json!({ "mention": "Bien" })),
            today(),
        );
        let incoming = overlay(&without_transcript, &stored, &DetailFields::new());
        assert_eq!(incoming.get("mention"), Some(&json!("Bien")));
    }
}
