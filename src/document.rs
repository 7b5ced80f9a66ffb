//! Page access for question-bank PDFs.
//!
//! Extraction code only sees the [`Page`] trait: page text, the page's
//! embedded images and a rendered PNG of the whole page. [`PdfDocument`]
//! implements it with `lopdf`; rendering shells out to poppler's `pdftoppm`.

use std::path::{Path, PathBuf};
use std::process::Command;

use lopdf::{Dictionary, Object, ObjectId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to open {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    #[error("page {page}: failed to extract text: {reason}")]
    Text { page: u32, reason: String },

    #[error("page {page}: unsupported image encoding {filter}")]
    UnsupportedImage { page: u32, filter: String },

    #[error("page {page}: render failed: {reason}")]
    Render { page: u32, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An image as stored in the document, ready to be written to disk.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub data: Vec<u8>,
    /// File extension matching `data` (`jpg`, `jp2`, ...).
    pub ext: String,
}

pub trait Page {
    /// 1-based page number.
    fn number(&self) -> u32;

    fn text(&self) -> Result<String, DocumentError>;

    /// Embedded images in document order; one entry per image so a single
    /// bad image does not hide the rest.
    fn images(&self) -> Vec<Result<PageImage, DocumentError>>;

    /// The whole page as PNG bytes, magnified by `scale` (1.0 = 72 dpi).
    fn render(&self, scale: f64) -> Result<Vec<u8>, DocumentError>;
}

pub struct PdfDocument {
    path: PathBuf,
    doc: lopdf::Document,
    pages: Vec<(u32, ObjectId)>,
    renderer: String,
}

impl PdfDocument {
    /// Load `path`; `renderer` is the `pdftoppm` binary used for full-page renders.
    pub fn open(path: &Path, renderer: &str) -> Result<Self, DocumentError> {
        let doc = lopdf::Document::load(path).map_err(|e| DocumentError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let pages = doc.get_pages().into_iter().collect();
        Ok(PdfDocument {
            path: path.to_path_buf(),
            doc,
            pages,
            renderer: renderer.to_string(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> impl Iterator<Item = PdfPage<'_>> + '_ {
        self.pages
            .iter()
            .map(move |&(number, id)| PdfPage { doc: self, number, id })
    }
}

pub struct PdfPage<'a> {
    doc: &'a PdfDocument,
    number: u32,
    id: ObjectId,
}

impl PdfPage<'_> {
    /// Resource dictionaries of this page, own first, then inherited ones.
    fn resource_dicts(&self) -> Vec<&Dictionary> {
        let doc = &self.doc.doc;
        let (own, inherited) = doc.get_page_resources(self.id);
        own.into_iter()
            .chain(inherited.into_iter().filter_map(|id| doc.get_dictionary(id).ok()))
            .collect()
    }

    /// `None` for XObjects that are not images (forms, broken references).
    fn embedded_image(&self, object: &Object) -> Option<Result<PageImage, DocumentError>> {
        let stream = self
            .doc
            .doc
            .dereference(object)
            .and_then(|(_, obj)| obj.as_stream())
            .ok()?;
        let is_image = stream
            .dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .map(|name| name == b"Image")
            .unwrap_or(false);
        if !is_image {
            return None;
        }

        let filters = filter_names(&stream.dict);
        Some(match image_extension(&filters) {
            Some(ext) => Ok(PageImage {
                data: stream.content.clone(),
                ext: ext.to_string(),
            }),
            None => Err(DocumentError::UnsupportedImage {
                page: self.number,
                filter: if filters.is_empty() {
                    "raw".to_string()
                } else {
                    filters.join("+")
                },
            }),
        })
    }
}

impl Page for PdfPage<'_> {
    fn number(&self) -> u32 {
        self.number
    }

    fn text(&self) -> Result<String, DocumentError> {
        self.doc
            .doc
            .extract_text(&[self.number])
            .map_err(|e| DocumentError::Text {
                page: self.number,
                reason: e.to_string(),
            })
    }

    fn images(&self) -> Vec<Result<PageImage, DocumentError>> {
        let doc = &self.doc.doc;
        let mut images = Vec::new();
        for resources in self.resource_dicts() {
            let xobjects = resources
                .get(b"XObject")
                .and_then(|obj| doc.dereference(obj))
                .and_then(|(_, obj)| obj.as_dict());
            let Ok(xobjects) = xobjects else {
                continue;
            };
            images.extend(xobjects.iter().filter_map(|(_, obj)| self.embedded_image(obj)));
        }
        images
    }

    fn render(&self, scale: f64) -> Result<Vec<u8>, DocumentError> {
        let dpi = (72.0 * scale).round().max(1.0) as u32;
        let page = self.number.to_string();
        // No output root: pdftoppm writes the PNG to stdout.
        let output = Command::new(&self.doc.renderer)
            .args(["-png", "-singlefile", "-r", &dpi.to_string(), "-f", &page, "-l", &page])
            .arg(&self.doc.path)
            .output()
            .map_err(|e| DocumentError::Render {
                page: self.number,
                reason: format!("failed to run {}: {}", self.doc.renderer, e),
            })?;

        if !output.status.success() {
            return Err(DocumentError::Render {
                page: self.number,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(DocumentError::Render {
                page: self.number,
                reason: "renderer produced no output".to_string(),
            });
        }
        Ok(output.stdout)
    }
}

fn filter_names(dict: &Dictionary) -> Vec<String> {
    let Ok(filter) = dict.get(b"Filter") else {
        return Vec::new();
    };
    let names: Vec<&Object> = match filter.as_array() {
        Ok(items) => items.iter().collect(),
        Err(_) => vec![filter],
    };
    names
        .into_iter()
        .filter_map(|obj| obj.as_name().ok())
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect()
}

/// Only self-contained encodings can be written out as-is; anything else
/// (raw or Flate-compressed pixels) is left to the full-page render.
fn image_extension(filters: &[String]) -> Option<&'static str> {
    match filters {
        [only] if only == "DCTDecode" => Some("jpg"),
        [only] if only == "JPXDecode" => Some("jp2"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_and_jpeg2000_are_saved_directly() {
        assert_eq!(image_extension(&["DCTDecode".to_string()]), Some("jpg"));
        assert_eq!(image_extension(&["JPXDecode".to_string()]), Some("jp2"));
    }

    #[test]
    fn other_encodings_are_unsupported() {
        assert_eq!(image_extension(&[]), None);
        assert_eq!(image_extension(&["FlateDecode".to_string()]), None);
        assert_eq!(
            image_extension(&["FlateDecode".to_string(), "DCTDecode".to_string()]),
            None
        );
    }

    #[test]
    fn filter_accepts_name_or_array() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
        assert_eq!(filter_names(&dict), vec!["DCTDecode"]);

        let mut dict = Dictionary::new();
        dict.set(
            "Filter",
            Object::Array(vec![
                Object::Name(b"FlateDecode".to_vec()),
                Object::Name(b"DCTDecode".to_vec()),
            ]),
        );
        assert_eq!(filter_names(&dict), vec!["FlateDecode", "DCTDecode"]);
    }

    #[test]
    fn missing_pdf_is_an_open_error() {
        let err = PdfDocument::open(Path::new("tests/fixtures/missing.pdf"), "pdftoppm")
            .err()
            .unwrap();
        assert!(matches!(err, DocumentError::Open { .. }));
    }
}
