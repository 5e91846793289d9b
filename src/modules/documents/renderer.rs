//! Document layouts.
//!
//! Each document type has a layout routine that turns a [`DocumentPayload`]
//! into a [`Layout`]: a list of A4 pages made of positioned text runs, rules
//! and boxes, in millimetres from the bottom-left corner. Layouts are plain
//! data; [`super::pdf`] paints them.

use scolarite_config::DocumentConfig;
use scolarite_models::details::{
    DetailSet, InternshipDetails, SchoolCertificateDetails, SuccessCertificateDetails,
    TranscriptDetails,
};

use super::format::{
    PLACEHOLDER, average, decision_for, format_average, format_date, format_grade,
    format_naive_date, humanize_key, module_result, or_placeholder,
};
use super::model::{DocumentError, DocumentPayload};
use super::pdf;

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;

const MARGIN: f32 = 20.0;
const TOP: f32 = PAGE_HEIGHT - 17.0;
const BOTTOM: f32 = 25.0;
const LABEL_WIDTH: f32 = 55.0;
const PT_TO_MM: f32 = 0.3528;

const BODY_SIZE: f32 = 11.0;
const TABLE_ROW_HEIGHT: f32 = 8.0;
const TABLE_COLUMNS: [(f32, f32); 3] = [(MARGIN, 100.0), (MARGIN + 100.0, 35.0), (MARGIN + 135.0, 35.0)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        x: f32,
        y: f32,
        size: f32,
        weight: FontWeight,
        content: String,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        thickness: f32,
    },
    /// Stroked rectangle; `(x, y)` is the bottom-left corner.
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        thickness: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub title: String,
    pub pages: Vec<Page>,
}

impl Layout {
    /// All text runs, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.pages
            .iter()
            .flat_map(|page| page.elements.iter())
            .filter_map(|element| match element {
                Element::Text { content, .. } => Some(content.as_str()),
                _ => None,
            })
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|text| text.contains(needle))
    }
}

/// Render `payload` to PDF bytes.
pub fn render(payload: &DocumentPayload, config: &DocumentConfig) -> Result<Vec<u8>, DocumentError> {
    let layout = layout(payload, config);
    pdf::paint(&layout, config)
}

/// Build the page layout of `payload`.
pub fn layout(payload: &DocumentPayload, config: &DocumentConfig) -> Layout {
    let mut writer = Writer::new();

    match &payload.details {
        DetailSet::SchoolCertificate(details) => {
            school_certificate(&mut writer, payload, details, config)
        }
        DetailSet::SuccessCertificate(details) => {
            success_certificate(&mut writer, payload, details, config)
        }
        DetailSet::Transcript(details) => transcript(&mut writer, payload, details, config),
        DetailSet::Internship(details) => internship(&mut writer, payload, details, config),
    }

    writer.finish(format!(
        "{} {}",
        payload.details.document_type().title(),
        payload.reference
    ))
}

fn text_width(content: &str, size: f32) -> f32 {
    content.chars().count() as f32 * size * 0.5 * PT_TO_MM
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * 1.6
}

/// Greedy word wrap to `width` millimetres.
fn wrap(content: &str, size: f32, width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in content.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if text_width(&candidate, size) > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        } else {
            current = candidate;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

struct Writer {
    pages: Vec<Page>,
    current: Page,
    y: f32,
}

impl Writer {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Page::default(),
            y: TOP,
        }
    }

    fn text_at(&mut self, x: f32, y: f32, size: f32, weight: FontWeight, content: impl Into<String>) {
        self.current.elements.push(Element::Text {
            x,
            y,
            size,
            weight,
            content: content.into(),
        });
    }

    fn rule(&mut self, from: (f32, f32), to: (f32, f32), thickness: f32) {
        self.current.elements.push(Element::Line {
            from,
            to,
            thickness,
        });
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.current.elements.push(Element::Rect {
            x,
            y,
            width,
            height,
            thickness: 0.6,
        });
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn centered(&mut self, content: &str, size: f32, weight: FontWeight) {
        let x = ((PAGE_WIDTH - text_width(content, size)) / 2.0).max(MARGIN);
        let y = self.y;
        self.text_at(x, y, size, weight, content);
        self.y -= line_height(size);
    }

    fn paragraph(&mut self, content: &str) {
        for line in wrap(content, BODY_SIZE, PAGE_WIDTH - 2.0 * MARGIN) {
            self.ensure_space(line_height(BODY_SIZE));
            let y = self.y;
            self.text_at(MARGIN, y, BODY_SIZE, FontWeight::Regular, line);
            self.y -= line_height(BODY_SIZE);
        }
    }

    fn heading(&mut self, content: &str) {
        self.ensure_space(line_height(BODY_SIZE) * 2.0);
        self.gap(2.0);
        let y = self.y;
        self.text_at(MARGIN, y, BODY_SIZE + 1.0, FontWeight::Bold, content);
        self.y -= line_height(BODY_SIZE + 1.0);
    }

    /// `label : value`, with the value wrapped in its column.
    fn field(&mut self, label: &str, value: &str) {
        let value_width = PAGE_WIDTH - 2.0 * MARGIN - LABEL_WIDTH;
        let lines = wrap(or_placeholder(value), BODY_SIZE, value_width);
        self.ensure_space(line_height(BODY_SIZE) * lines.len().max(1) as f32);

        let y = self.y;
        self.text_at(MARGIN, y, BODY_SIZE, FontWeight::Bold, format!("{} :", label));
        for line in lines {
            let y = self.y;
            self.text_at(MARGIN + LABEL_WIDTH, y, BODY_SIZE, FontWeight::Regular, line);
            self.y -= line_height(BODY_SIZE);
        }
    }

    /// Start a new page when less than `needed` millimetres remain.
    fn ensure_space(&mut self, needed: f32) -> bool {
        if self.y - needed >= BOTTOM {
            return false;
        }
        self.pages.push(std::mem::take(&mut self.current));
        self.y = TOP;
        true
    }

    fn finish(mut self, title: String) -> Layout {
        self.pages.push(self.current);
        Layout {
            title,
            pages: self.pages,
        }
    }
}

fn letterhead(w: &mut Writer, config: &DocumentConfig) {
    w.centered(&config.country_name, 12.0, FontWeight::Bold);
    w.centered(&config.university_name, 11.0, FontWeight::Bold);
    w.centered(&config.faculty_name, 11.0, FontWeight::Regular);
    w.gap(2.0);
    let y = w.y;
    w.rule((MARGIN, y), (PAGE_WIDTH - MARGIN, y), 0.8);
    w.gap(8.0);
}

fn reference_line(w: &mut Writer, reference: &str) {
    let y = w.y;
    w.text_at(MARGIN, y, 10.0, FontWeight::Regular, format!("Réf : {}", reference));
    w.gap(line_height(10.0) + 6.0);
}

fn title(w: &mut Writer, title: &str) {
    w.centered(&title.to_uppercase(), 16.0, FontWeight::Bold);
    w.gap(8.0);
}

fn issue_and_signature(w: &mut Writer, payload: &DocumentPayload, config: &DocumentConfig) {
    w.ensure_space(45.0);
    w.gap(10.0);
    let x = PAGE_WIDTH / 2.0 + 10.0;
    let y = w.y;
    w.text_at(
        x,
        y,
        BODY_SIZE,
        FontWeight::Regular,
        format!(
            "Fait à {}, le {}",
            config.city,
            format_naive_date(payload.issued_on)
        ),
    );
    w.gap(line_height(BODY_SIZE) + 2.0);
    let y = w.y;
    w.text_at(x, y, BODY_SIZE, FontWeight::Bold, config.signatory_title.as_str());
    w.gap(22.0);
    let y = w.y;
    w.rule((x, y), (PAGE_WIDTH - MARGIN, y), 0.4);
}

fn identity_fields(w: &mut Writer, payload: &DocumentPayload, birth_date: &str, birth_place: &str) {
    w.field("Nom et prénom", &payload.student.full_name);
    w.field("CIN", &payload.student.cin);
    w.field("CNE", &payload.student.cne);
    w.field("Date de naissance", &format_date(birth_date));
    w.field("Lieu de naissance", birth_place);
}

fn school_certificate(
    w: &mut Writer,
    payload: &DocumentPayload,
    details: &SchoolCertificateDetails,
    config: &DocumentConfig,
) {
    letterhead(w, config);
    reference_line(w, &payload.reference);
    title(w, payload.details.document_type().title());

    w.paragraph(&format!(
        "{} de la {} atteste que l'étudiant(e) :",
        config.signatory_title, config.faculty_name
    ));
    w.gap(4.0);
    identity_fields(w, payload, &details.birth_date, &details.birth_place);
    w.field("Niveau", &details.level);
    w.field("Filière", &details.program);
    w.gap(4.0);
    w.paragraph(&format!(
        "est régulièrement inscrit(e) à la {} au titre de l'année universitaire {}.",
        config.faculty_name,
        or_placeholder(&details.academic_year)
    ));
    w.gap(2.0);
    w.paragraph(
        "La présente attestation est délivrée à l'intéressé(e) pour servir et valoir ce que de droit.",
    );

    issue_and_signature(w, payload, config);
}

fn success_certificate(
    w: &mut Writer,
    payload: &DocumentPayload,
    details: &SuccessCertificateDetails,
    config: &DocumentConfig,
) {
    letterhead(w, config);
    reference_line(w, &payload.reference);
    title(w, payload.details.document_type().title());

    w.paragraph(&format!(
        "{} de la {} atteste que l'étudiant(e) :",
        config.signatory_title, config.faculty_name
    ));
    w.gap(4.0);
    identity_fields(w, payload, &details.birth_date, &details.birth_place);
    w.field("Niveau", &details.level);
    w.field("Filière", &details.program);
    w.gap(4.0);
    w.paragraph(&format!(
        "a satisfait aux épreuves de la session {} de l'année universitaire {}.",
        or_placeholder(&details.session),
        or_placeholder(&details.academic_year)
    ));
    w.gap(2.0);
    w.field("Mention", &details.mention);
    w.field("Décision", &details.decision);
    w.gap(2.0);
    w.paragraph(
        "La présente attestation est délivrée à l'intéressé(e) pour servir et valoir ce que de droit.",
    );

    issue_and_signature(w, payload, config);
}

fn internship(
    w: &mut Writer,
    payload: &DocumentPayload,
    details: &InternshipDetails,
    config: &DocumentConfig,
) {
    letterhead(w, config);
    reference_line(w, &payload.reference);
    title(w, payload.details.document_type().title());

    w.paragraph(&format!(
        "La présente convention règle les rapports entre la {} ({}), l'entreprise d'accueil et le stagiaire désignés ci-dessous.",
        config.faculty_name, config.university_name
    ));

    w.heading("Le stagiaire");
    w.field("Nom et prénom", &payload.student.full_name);
    w.field("CIN", &payload.student.cin);
    w.field("CNE", &payload.student.cne);
    w.field("Niveau", &details.level);
    w.field("Filière", &details.program);
    w.field("Année universitaire", &details.academic_year);

    w.heading("L'entreprise d'accueil");
    w.field("Raison sociale", &details.company_name);
    w.field("Adresse", &details.company_address);
    w.field("Ville", &details.company_city);
    w.field("Téléphone", &details.company_phone);
    w.field("Email", &details.company_email);

    w.heading("L'encadrant");
    w.field("Nom", &details.supervisor_name);
    w.field("Fonction", &details.supervisor_title);
    w.field("Email", &details.supervisor_email);

    w.heading("Le stage");
    w.field("Sujet", &details.internship_subject);
    w.field(
        "Période",
        &format!(
            "Du {} au {}",
            format_date(&details.start_date),
            format_date(&details.end_date)
        ),
    );
    for (key, value) in &details.extra_fields {
        w.field(&humanize_key(key), value);
    }

    internship_signatures(w, payload, config);
}

fn internship_signatures(w: &mut Writer, payload: &DocumentPayload, config: &DocumentConfig) {
    w.ensure_space(45.0);
    w.gap(8.0);
    let y = w.y;
    w.text_at(
        MARGIN,
        y,
        BODY_SIZE,
        FontWeight::Regular,
        format!(
            "Fait à {}, le {}",
            config.city,
            format_naive_date(payload.issued_on)
        ),
    );
    w.gap(line_height(BODY_SIZE) + 4.0);

    let column = (PAGE_WIDTH - 2.0 * MARGIN) / 3.0;
    let labels = ["L'établissement", "L'entreprise", "Le stagiaire"];
    let y = w.y;
    for (i, label) in labels.iter().enumerate() {
        let x = MARGIN + column * i as f32;
        w.text_at(x, y, BODY_SIZE, FontWeight::Bold, *label);
        w.rule((x, y - 22.0), (x + column - 8.0, y - 22.0), 0.4);
    }
    w.gap(26.0);
}

fn table_row(w: &mut Writer, cells: [&str; 3], weight: FontWeight) {
    let y = w.y;
    for ((x, width), content) in TABLE_COLUMNS.iter().zip(cells) {
        w.rect(*x, y - TABLE_ROW_HEIGHT, *width, TABLE_ROW_HEIGHT);
        w.text_at(x + 2.0, y - TABLE_ROW_HEIGHT + 2.5, 10.0, weight, content);
    }
    w.gap(TABLE_ROW_HEIGHT);
}

fn transcript(
    w: &mut Writer,
    payload: &DocumentPayload,
    details: &TranscriptDetails,
    config: &DocumentConfig,
) {
    let box_top = w.y + 5.0;
    w.gap(2.0);
    w.centered(&config.country_name, 12.0, FontWeight::Bold);
    w.centered(&config.university_name, 11.0, FontWeight::Bold);
    w.centered(&config.faculty_name, 11.0, FontWeight::Regular);
    let box_bottom = w.y;
    w.rect(MARGIN - 5.0, box_bottom, PAGE_WIDTH - 2.0 * MARGIN + 10.0, box_top - box_bottom);
    w.gap(8.0);

    title(w, payload.details.document_type().title());
    reference_line(w, &payload.reference);

    identity_fields(w, payload, &details.birth_date, &details.birth_place);
    w.field("Filière", &details.program);
    w.field("Niveau", &details.level);
    w.field("Année universitaire", &details.academic_year);
    w.field("Session", &details.session);
    w.gap(6.0);

    let header = ["Module", "Note", "Résultat"];
    table_row(w, header, FontWeight::Bold);
    for module in &details.modules {
        if w.ensure_space(TABLE_ROW_HEIGHT) {
            table_row(w, header, FontWeight::Bold);
        }
        let grade = format_grade(module.grade);
        table_row(
            w,
            [or_placeholder(&module.name), &grade, module_result(module.grade)],
            FontWeight::Regular,
        );
    }
    if details.modules.is_empty() {
        table_row(w, [PLACEHOLDER, PLACEHOLDER, PLACEHOLDER], FontWeight::Regular);
    }

    let avg = average(&details.modules);
    let average_text = match avg {
        Some(_) => format!("{} / 20", format_average(avg)),
        None => PLACEHOLDER.to_string(),
    };

    w.gap(6.0);
    w.field("Moyenne générale", &average_text);
    w.field("Décision", decision_for(avg));
    w.field("Mention", &details.mention);

    issue_and_signature(w, payload, config);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use scolarite_models::transcripts::ModuleGrade;

    use crate::modules::documents::model::StudentSnapshot;

    fn payload(details: DetailSet) -> DocumentPayload {
        DocumentPayload {
            reference: "RN-2025-001".to_string(),
            student: StudentSnapshot {
                full_name: "IDRISSI Amal".to_string(),
                cin: "AB123456".to_string(),
                cne: String::new(),
            },
            details,
            issued_on: NaiveDate::from_ymd_opt(2025, 10, 2).unwrap(),
        }
    }

    fn transcript_with(modules: Vec<ModuleGrade>, decision: &str) -> Layout {
        layout(
            &payload(DetailSet::Transcript(TranscriptDetails {
                academic_year: "2024-2025".to_string(),
                session: "S1".to_string(),
                modules,
                decision: decision.to_string(),
                ..Default::default()
            })),
            &DocumentConfig::default(),
        )
    }

    #[test]
    fn test_transcript_decision_is_computed_from_average() {
        let layout = transcript_with(
            vec![ModuleGrade::new("Algo", 12.0), ModuleGrade::new("BD", 7.0)],
            "Admis",
        );

        assert!(layout.contains_text("9.500 / 20"));
        assert!(layout.contains_text("Ajourne"));
        assert!(!layout.texts().any(|t| t == "Admis"));
        assert!(layout.contains_text("12.00 / 20"));
        assert!(layout.contains_text("Non validé"));
    }

    #[test]
    fn test_transcript_passes_at_ten() {
        let layout = transcript_with(
            vec![ModuleGrade::new("Algo", 12.0), ModuleGrade::new("BD", 8.0)],
            "",
        );
        assert!(layout.contains_text("10.000 / 20"));
        assert!(layout.texts().any(|t| t == "Admis"));
    }

    #[test]
    fn test_transcript_without_grades_prints_placeholders() {
        let layout = transcript_with(Vec::new(), "Admis");
        assert!(!layout.texts().any(|t| t == "Admis"));
        assert!(layout.texts().filter(|t| *t == PLACEHOLDER).count() >= 5);
    }

    #[test]
    fn test_long_transcript_spills_onto_new_pages() {
        let modules = (0..60)
            .map(|i| ModuleGrade::new(format!("Module {}", i), 11.0))
            .collect();
        let layout = transcript_with(modules, "");

        assert!(layout.pages.len() > 1);
        assert!(layout.contains_text("Module 59"));
        for page in &layout.pages {
            for element in &page.elements {
                if let Element::Text { y, .. } = element {
                    assert!(*y >= BOTTOM - TABLE_ROW_HEIGHT, "text below margin at {}", y);
                }
            }
        }
    }

    #[test]
    fn test_certificate_carries_letterhead_and_issue_date() {
        let layout = layout(
            &payload(DetailSet::SchoolCertificate(SchoolCertificateDetails {
                academic_year: "2025-2026".to_string(),
                birth_date: "2003-04-09".to_string(),
                ..Default::default()
            })),
            &DocumentConfig::default(),
        );

        assert!(layout.contains_text("ROYAUME DU MAROC"));
        assert!(layout.contains_text("ATTESTATION DE SCOLARITÉ"));
        assert!(layout.contains_text("Réf : RN-2025-001"));
        assert!(layout.contains_text("09/04/2003"));
        assert!(layout.contains_text("le 02/10/2025"));
        assert!(layout.contains_text("2025-2026"));
        assert_eq!(layout.pages.len(), 1);
    }

    #[test]
    fn test_internship_lists_extra_fields() {
        let mut details = InternshipDetails {
            company_name: "OCP".to_string(),
            start_date: "2025-07-01".to_string(),
            ..Default::default()
        };
        details
            .extra_fields
            .insert("company_ice".to_string(), "001234".to_string());

        let layout = layout(&payload(DetailSet::Internship(details)), &DocumentConfig::default());
        assert!(layout.contains_text("Company ice :"));
        assert!(layout.contains_text("001234"));
        assert!(layout.contains_text("Du 01/07/2025 au ---"));
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "La présente attestation est délivrée à l'intéressé(e) pour servir et valoir ce que de droit.";
        let lines = wrap(text, BODY_SIZE, 60.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.join(" "), text);
    }
}
