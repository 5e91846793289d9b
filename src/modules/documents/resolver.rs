//! Transcript resolver.
//!
//! Picks one academic year and one semester out of a student's nested
//! transcript record. Resolution never fails: missing data yields an empty
//! result and the caller falls back to defaults.

use scolarite_models::transcripts::{AcademicYear, ModuleGrade, Semester, Transcript};
use tracing::debug;

/// Data extracted from a transcript for one year/session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedTranscript {
    pub academic_year: String,
    pub session: String,
    pub modules: Vec<ModuleGrade>,
    pub mention: String,
    pub decision: String,
    /// A year was requested but not found; the first year was used.
    pub year_fallback: bool,
    /// A session was requested but not found; the first semester was used.
    pub session_fallback: bool,
}

fn requested(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn select_year<'a>(
    years: &'a [AcademicYear],
    wanted: Option<&str>,
) -> Option<(&'a AcademicYear, bool)> {
    let first = years.first()?;
    match wanted {
        None => Some((first, false)),
        Some(wanted) => match years.iter().find(|y| y.year == wanted) {
            Some(year) => Some((year, false)),
            None => {
                debug!(requested = wanted, used = %first.year, "Academic year not found in transcript, using first entry");
                Some((first, true))
            }
        },
    }
}

fn select_semester<'a>(
    semesters: &'a [Semester],
    wanted: Option<&str>,
) -> Option<(&'a Semester, bool)> {
    let first = semesters.first()?;
    match wanted {
        None => Some((first, false)),
        Some(wanted) => match semesters.iter().find(|s| s.name == wanted) {
            Some(semester) => Some((semester, false)),
            None => {
                debug!(requested = wanted, used = %first.name, "Session not found in transcript, using first semester");
                Some((first, true))
            }
        },
    }
}

/// Resolve `requested_year` / `requested_session` against `transcript`.
///
/// Absent or blank requests select the first entry. Unknown values fall back
/// to the first entry and set the matching `*_fallback` flag.
pub fn resolve(
    transcript: Option<&Transcript>,
    requested_year: Option<&str>,
    requested_session: Option<&str>,
) -> ResolvedTranscript {
    let Some(transcript) = transcript else {
        return ResolvedTranscript::default();
    };

    let Some((year, year_fallback)) = select_year(&transcript.years, requested(requested_year))
    else {
        return ResolvedTranscript::default();
    };

    let Some((semester, session_fallback)) =
        select_semester(&year.semesters, requested(requested_session))
    else {
        return ResolvedTranscript::default();
    };

    let (mention, decision) = semester
        .result
        .as_ref()
        .map(|r| (r.mention.clone(), r.decision.clone()))
        .unwrap_or_default();

    ResolvedTranscript {
        academic_year: year.year.clone(),
        session: semester.name.clone(),
        modules: semester.modules.clone(),
        mention,
        decision,
        year_fallback,
        session_fallback,
    }
}
