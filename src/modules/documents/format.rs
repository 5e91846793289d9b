//! Value formatting for printed documents.

use chrono::{DateTime, NaiveDate};
use scolarite_models::transcripts::ModuleGrade;

/// Printed in place of missing data.
pub const PLACEHOLDER: &str = "---";

/// Minimum grade (out of 20) to pass a module or a year.
pub const PASS_THRESHOLD: f64 = 10.0;

pub const DECISION_PASSED: &str = "Admis";
pub const DECISION_FAILED: &str = "Ajourne";

pub fn or_placeholder(value: &str) -> &str {
    let value = value.trim();
    if value.is_empty() { PLACEHOLDER } else { value }
}

/// `DD/MM/YYYY` for ISO dates and timestamps; other non-blank text is
/// printed as given.
pub fn format_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return PLACEHOLDER.to_string();
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
        .or_else(|| NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok());

    match date {
        Some(date) => format_naive_date(date),
        None => raw.to_string(),
    }
}

pub fn format_naive_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// `12.00 / 20`, or the placeholder when ungraded.
pub fn format_grade(grade: Option<f64>) -> String {
    match grade {
        Some(grade) => format!("{:.2} / 20", grade),
        None => PLACEHOLDER.to_string(),
    }
}

/// Arithmetic mean of the graded modules. Ungraded modules are ignored.
pub fn average(modules: &[ModuleGrade]) -> Option<f64> {
    let grades: Vec<f64> = modules.iter().filter_map(|m| m.grade).collect();
    if grades.is_empty() {
        return None;
    }
    Some(grades.iter().sum::<f64>() / grades.len() as f64)
}

pub fn format_average(average: Option<f64>) -> String {
    match average {
        Some(average) => format!("{:.3}", average),
        None => PLACEHOLDER.to_string(),
    }
}

/// Admission decision derived from an average.
pub fn decision_for(average: Option<f64>) -> &'static str {
    match average {
        Some(average) if average >= PASS_THRESHOLD => DECISION_PASSED,
        Some(_) => DECISION_FAILED,
        None => PLACEHOLDER,
    }
}

/// Per-module result column of the transcript table.
pub fn module_result(grade: Option<f64>) -> &'static str {
    match grade {
        Some(grade) if grade >= PASS_THRESHOLD => "Validé",
        Some(_) => "Non validé",
        None => PLACEHOLDER,
    }
}

/// `company_ice` => `Company ice`, for extra fields printed as labels.
pub fn humanize_key(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_and_decision() {
        let passed = [ModuleGrade::new("Algo", 12.0), ModuleGrade::new("BD", 8.0)];
        let avg = average(&passed);
        assert_eq!(format_average(avg), "10.000");
        assert_eq!(decision_for(avg), "Admis");

        let failed = [ModuleGrade::new("Algo", 12.0), ModuleGrade::new("BD", 7.0)];
        let avg = average(&failed);
        assert_eq!(format_average(avg), "9.500");
        assert_eq!(decision_for(avg), "Ajourne");
    }

    #[test]
    fn test_ungraded_modules_are_excluded() {
        let modules = [
            ModuleGrade::new("Algo", 11.0),
            ModuleGrade {
                name: "Stage".to_string(),
                grade: None,
            },
        ];
        assert_eq!(format_average(average(&modules)), "11.000");

        let none = [ModuleGrade {
            name: "Stage".to_string(),
            grade: None,
        }];
        assert_eq!(format_average(average(&none)), "---");
        assert_eq!(decision_for(average(&none)), "---");
        assert_eq!(decision_for(average(&[])), "---");
    }

    #[test]
    fn test_format_grade() {
        assert_eq!(format_grade(Some(12.0)), "12.00 / 20");
        assert_eq!(format_grade(Some(9.456)), "9.46 / 20");
        assert_eq!(format_grade(None), "---");
    }

    #[test]
    fn test_module_result_threshold() {
        assert_eq!(module_result(Some(10.0)), "Validé");
        assert_eq!(module_result(Some(9.99)), "Non validé");
        assert_eq!(module_result(None), "---");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2003-04-09"), "09/04/2003");
        assert_eq!(format_date("2025-07-01T10:00:00Z"), "01/07/2025");
        assert_eq!(format_date("01/07/2025"), "01/07/2025");
        assert_eq!(format_date("juillet 2025"), "juillet 2025");
        assert_eq!(format_date("  "), "---");
    }

    #[test]
    fn test_placeholder_and_labels() {
        assert_eq!(or_placeholder(""), "---");
        assert_eq!(or_placeholder(" SMI "), "SMI");
        assert_eq!(humanize_key("company_ice"), "Company ice");
    }
}
