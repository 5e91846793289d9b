//! Paints a [`Layout`] into PDF bytes with `printpdf`.
//!
//! Fonts come from [`DocumentConfig`]: a configured TrueType file is
//! embedded, otherwise the built-in Helvetica family is used. Built-in fonts
//! only cover ASCII reliably, so text drawn with them is folded to ASCII.

use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, Point};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use scolarite_config::DocumentConfig;

use super::model::DocumentError;
use super::renderer::{Element, FontWeight, Layout, PAGE_HEIGHT, PAGE_WIDTH};

const LAYER_NAME: &str = "Layer 1";

#[derive(Clone)]
struct LoadedFont {
    font: IndirectFontRef,
    builtin: bool,
}

struct Fonts {
    regular: LoadedFont,
    bold: LoadedFont,
}

impl Fonts {
    fn get(&self, weight: FontWeight) -> &LoadedFont {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }
}

fn pdf_error(err: printpdf::Error) -> DocumentError {
    DocumentError::Pdf(format!("{:?}", err))
}

fn external_font(doc: &PdfDocumentReference, path: &Path) -> Result<LoadedFont, DocumentError> {
    let file = File::open(path).map_err(|source| DocumentError::Font {
        path: path.to_path_buf(),
        source,
    })?;

    let font = doc
        .add_external_font(BufReader::new(file))
        .map_err(pdf_error)?;

    Ok(LoadedFont {
        font,
        builtin: false,
    })
}

fn builtin_font(doc: &PdfDocumentReference, font: BuiltinFont) -> Result<LoadedFont, DocumentError> {
    Ok(LoadedFont {
        font: doc.add_builtin_font(font).map_err(pdf_error)?,
        builtin: true,
    })
}

fn load_fonts(doc: &PdfDocumentReference, config: &DocumentConfig) -> Result<Fonts, DocumentError> {
    let regular = match &config.font_path {
        Some(path) => external_font(doc, path)?,
        None => builtin_font(doc, BuiltinFont::Helvetica)?,
    };

    let bold = match (&config.bold_font_path, &config.font_path) {
        (Some(path), _) => external_font(doc, path)?,
        (None, Some(_)) => regular.clone(),
        (None, None) => builtin_font(doc, BuiltinFont::HelveticaBold)?,
    };

    Ok(Fonts { regular, bold })
}

/// Replace characters the built-in fonts cannot show.
fn fold_to_ascii(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'À' | 'Â' | 'Ä' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'î' | 'ï' => 'i',
            'Î' | 'Ï' => 'I',
            'ô' | 'ö' => 'o',
            'Ô' | 'Ö' => 'O',
            'ù' | 'û' | 'ü' => 'u',
            'Ù' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            '’' => '\'',
            c if c.is_ascii() => c,
            _ => '?',
        })
        .collect()
}

fn point(x: f32, y: f32) -> (Point, bool) {
    (Point::new(Mm(x), Mm(y)), false)
}

/// Paint `layout` and serialise the document.
pub fn paint(layout: &Layout, config: &DocumentConfig) -> Result<Vec<u8>, DocumentError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(&layout.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME);
    let fonts = load_fonts(&doc, config)?;

    for (index, page) in layout.pages.iter().enumerate() {
        let (page_index, layer_index) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME)
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);

        for element in &page.elements {
            match element {
                Element::Text {
                    x,
                    y,
                    size,
                    weight,
                    content,
                } => {
                    let font = fonts.get(*weight);
                    let text = if font.builtin {
                        fold_to_ascii(content)
                    } else {
                        content.clone()
                    };
                    layer.use_text(text, *size, Mm(*x), Mm(*y), &font.font);
                }
                Element::Line {
                    from,
                    to,
                    thickness,
                } => {
                    layer.set_outline_thickness(*thickness);
                    layer.add_line(Line {
                        points: vec![point(from.0, from.1), point(to.0, to.1)],
                        is_closed: false,
                    });
                }
                Element::Rect {
                    x,
                    y,
                    width,
                    height,
                    thickness,
                } => {
                    layer.set_outline_thickness(*thickness);
                    layer.add_line(Line {
                        points: vec![
                            point(*x, *y),
                            point(x + width, *y),
                            point(x + width, y + height),
                            point(*x, y + height),
                        ],
                        is_closed: true,
                    });
                }
            }
        }
    }

    doc.save_to_bytes().map_err(pdf_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::documents::renderer::Page;

    fn sample_layout() -> Layout {
        Layout {
            title: "Attestation".to_string(),
            pages: vec![
                Page {
                    elements: vec![
                        Element::Text {
                            x: 20.0,
                            y: 270.0,
                            size: 12.0,
                            weight: FontWeight::Bold,
                            content: "Faculté des Sciences".to_string(),
                        },
                        Element::Line {
                            from: (20.0, 265.0),
                            to: (190.0, 265.0),
                            thickness: 0.8,
                        },
                    ],
                },
                Page {
                    elements: vec![Element::Rect {
                        x: 20.0,
                        y: 200.0,
                        width: 100.0,
                        height: 8.0,
                        thickness: 0.6,
                    }],
                },
            ],
        }
    }

    #[test]
    fn test_paints_pdf_with_builtin_fonts() {
        let bytes = paint(&sample_layout(), &DocumentConfig::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_unreadable_font_is_an_error() {
        let config = DocumentConfig {
            font_path: Some("/nonexistent/font.ttf".into()),
            ..Default::default()
        };

        let err = paint(&sample_layout(), &config).unwrap_err();
        assert!(matches!(err, DocumentError::Font { .. }));
    }

    #[test]
    fn test_fold_to_ascii() {
        assert_eq!(fold_to_ascii("Réf : Kénitra, Ça"), "Ref : Kenitra, Ca");
    }
}
