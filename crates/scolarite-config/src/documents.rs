//! Document generation configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default |
//! |---|---|
//! | `DOCUMENTS_DIR` | `storage/documents` |
//! | `DOCUMENTS_PUBLIC_PREFIX` | `/documents` |
//! | `DOCUMENT_FONT_PATH` | unset (built-in Helvetica) |
//! | `DOCUMENT_FONT_BOLD_PATH` | unset (regular font, or built-in Helvetica-Bold) |
//! | `UNIVERSITY_NAME` | `Université Ibn Tofail` |
//! | `FACULTY_NAME` | `Faculté des Sciences` |
//! | `DOCUMENT_CITY` | `Kénitra` |
//! | `SIGNATORY_TITLE` | `Le Doyen` |
//!
//! Fonts are resolved from configuration only: a TrueType font with wider
//! glyph coverage can be supplied per deployment, and a configured font that
//! cannot be read makes generation fail instead of silently falling back.

use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct DocumentConfig {
    pub storage_dir: PathBuf,
    pub public_prefix: String,
    pub font_path: Option<PathBuf>,
    pub bold_font_path: Option<PathBuf>,
    pub country_name: String,
    pub university_name: String,
    pub faculty_name: String,
    pub city: String,
    pub signatory_title: String,
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl DocumentConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            storage_dir: non_empty_var("DOCUMENTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            public_prefix: non_empty_var("DOCUMENTS_PUBLIC_PREFIX")
                .unwrap_or(defaults.public_prefix),
            font_path: non_empty_var("DOCUMENT_FONT_PATH").map(PathBuf::from),
            bold_font_path: non_empty_var("DOCUMENT_FONT_BOLD_PATH").map(PathBuf::from),
            country_name: non_empty_var("COUNTRY_NAME").unwrap_or(defaults.country_name),
            university_name: non_empty_var("UNIVERSITY_NAME").unwrap_or(defaults.university_name),
            faculty_name: non_empty_var("FACULTY_NAME").unwrap_or(defaults.faculty_name),
            city: non_empty_var("DOCUMENT_CITY").unwrap_or(defaults.city),
            signatory_title: non_empty_var("SIGNATORY_TITLE").unwrap_or(defaults.signatory_title),
        }
    }

    /// Same configuration with documents stored under `dir`.
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("storage/documents"),
            public_prefix: "/documents".to_string(),
            font_path: None,
            bold_font_path: None,
            country_name: "ROYAUME DU MAROC".to_string(),
            university_name: "Université Ibn Tofail".to_string(),
            faculty_name: "Faculté des Sciences".to_string(),
            city: "Kénitra".to_string(),
            signatory_title: "Le Doyen".to_string(),
        }
    }
}
