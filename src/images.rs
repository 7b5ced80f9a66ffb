//! Question images on disk: capturing them while walking a PDF, and finding
//! them again by question id.
//!
//! Naming is shared by both sides: `{id}_img_{n}.{ext}` for images saved
//! straight from the page, `{id}_full_page.png` for a rendered page.

use std::fs;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::document::{DocumentError, Page, PageImage};

const FULL_PAGE_SUFFIX: &str = "_full_page.png";

/// What the capture step ended up keeping for a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageCapture {
    DirectImages(Vec<String>),
    FullPageFallback(String),
}

impl ImageCapture {
    pub fn into_filenames(self) -> Vec<String> {
        match self {
            ImageCapture::DirectImages(names) => names,
            ImageCapture::FullPageFallback(name) => vec![name],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CapturePolicy {
    /// A first direct image smaller than this is treated as a placeholder.
    pub min_image_bytes: u64,
    pub render_scale: f64,
}

impl Default for CapturePolicy {
    fn default() -> Self {
        CapturePolicy {
            min_image_bytes: 1000,
            render_scale: 2.0,
        }
    }
}

pub fn numbered_image_name(question_id: &str, n: usize, ext: &str) -> String {
    format!("{}_img_{}.{}", question_id, n, ext)
}

pub fn full_page_name(question_id: &str) -> String {
    format!("{}{}", question_id, FULL_PAGE_SUFFIX)
}

/// Save the page's images for `question_id` into `image_dir`.
///
/// Direct images are tried first. When none could be saved, or the first
/// one is under `policy.min_image_bytes`, the whole page is rendered instead
/// and that single file replaces the direct images in the result.
pub fn capture_page_images<P: Page + ?Sized>(
    page: &P,
    question_id: &str,
    image_dir: &Path,
    policy: &CapturePolicy,
) -> ImageCapture {
    let mut saved = Vec::new();
    for (index, image) in page.images().into_iter().enumerate() {
        let name = numbered_image_name(question_id, index + 1, image_ext(&image));
        match image.and_then(|img| write_image(image_dir, &name, &img.data)) {
            Ok(()) => {
                debug!(file = %name, "saved image");
                saved.push(name);
            }
            Err(e) => warn!(page = page.number(), index = index + 1, error = %e, "skipping image"),
        }
    }

    if !needs_full_page(&saved, image_dir, policy.min_image_bytes) {
        return ImageCapture::DirectImages(saved);
    }

    let name = full_page_name(question_id);
    match page
        .render(policy.render_scale)
        .and_then(|png| write_image(image_dir, &name, &png))
    {
        Ok(()) => {
            info!(page = page.number(), file = %name, "saved full page image");
            ImageCapture::FullPageFallback(name)
        }
        Err(e) => {
            error!(page = page.number(), error = %e, "full page render failed");
            ImageCapture::DirectImages(saved)
        }
    }
}

fn image_ext(image: &Result<PageImage, DocumentError>) -> &str {
    image.as_ref().map(|img| img.ext.as_str()).unwrap_or("bin")
}

fn needs_full_page(saved: &[String], image_dir: &Path, min_bytes: u64) -> bool {
    match saved.first() {
        None => true,
        Some(first) => fs::metadata(image_dir.join(first))
            .map(|meta| meta.len() < min_bytes)
            .unwrap_or(true),
    }
}

fn write_image(image_dir: &Path, name: &str, data: &[u8]) -> Result<(), DocumentError> {
    fs::create_dir_all(image_dir)?;
    fs::write(image_dir.join(name), data)?;
    Ok(())
}

/// File names in `dir` that belong to `question_id`, sorted. A missing
/// directory or an empty id simply yields no images.
pub fn find_images(question_id: &str, dir: &Path) -> Vec<String> {
    if question_id.is_empty() {
        return Vec::new();
    }
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "image directory not readable");
            return Vec::new();
        }
    };

    let numbered_prefix = format!("{}_img_", question_id);
    let full_page = full_page_name(question_id);

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| *name == full_page || is_numbered_image(name, &numbered_prefix))
        .collect();
    names.sort();
    names.dedup();
    names
}

/// `{prefix}*.{ext}` with a non-empty extension.
fn is_numbered_image(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.rsplit_once('.'))
        .is_some_and(|(_, ext)| !ext.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    struct FakePage {
        images: Vec<Option<Vec<u8>>>,
        render: Option<Vec<u8>>,
        renders: Cell<usize>,
    }

    impl FakePage {
        fn new(images: Vec<Option<Vec<u8>>>, render: Option<Vec<u8>>) -> Self {
            FakePage {
                images,
                render,
                renders: Cell::new(0),
            }
        }
    }

    impl Page for FakePage {
        fn number(&self) -> u32 {
            1
        }

        fn text(&self) -> Result<String, DocumentError> {
            Ok(String::new())
        }

        fn images(&self) -> Vec<Result<PageImage, DocumentError>> {
            self.images
                .iter()
                .map(|img| match img {
                    Some(data) => Ok(PageImage {
                        data: data.clone(),
                        ext: "jpg".to_string(),
                    }),
                    None => Err(DocumentError::UnsupportedImage {
                        page: 1,
                        filter: "FlateDecode".to_string(),
                    }),
                })
                .collect()
        }

        fn render(&self, _scale: f64) -> Result<Vec<u8>, DocumentError> {
            self.renders.set(self.renders.get() + 1);
            self.render.clone().ok_or(DocumentError::Render {
                page: 1,
                reason: "no renderer".to_string(),
            })
        }
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn large_direct_images_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let page = FakePage::new(vec![Some(vec![0; 2048]), Some(vec![0; 10])], Some(vec![1; 4]));
        let capture = capture_page_images(&page, "q1", dir.path(), &CapturePolicy::default());
        assert_eq!(
            capture,
            ImageCapture::DirectImages(vec!["q1_img_1.jpg".into(), "q1_img_2.jpg".into()])
        );
        assert_eq!(page.renders.get(), 0);
        assert!(dir.path().join("q1_img_2.jpg").exists());
    }

    #[test]
    fn small_first_image_falls_back_to_full_page() {
        let dir = tempfile::tempdir().unwrap();
        let page = FakePage::new(vec![Some(vec![0; 999]), Some(vec![0; 5000])], Some(vec![1; 4]));
        let capture = capture_page_images(&page, "q2", dir.path(), &CapturePolicy::default());
        assert_eq!(capture, ImageCapture::FullPageFallback("q2_full_page.png".into()));
        assert_eq!(fs::read(dir.path().join("q2_full_page.png")).unwrap(), vec![1; 4]);
    }

    #[test]
    fn no_images_falls_back_to_full_page() {
        let dir = tempfile::tempdir().unwrap();
        let page = FakePage::new(vec![], Some(vec![7]));
        let capture = capture_page_images(&page, "q3", dir.path(), &CapturePolicy::default());
        assert_eq!(capture.into_filenames(), vec!["q3_full_page.png"]);
    }

    #[test]
    fn failed_images_are_skipped_and_numbering_kept() {
        let dir = tempfile::tempdir().unwrap();
        let page = FakePage::new(vec![None, Some(vec![0; 4096])], None);
        let capture = capture_page_images(&page, "q4", dir.path(), &CapturePolicy::default());
        assert_eq!(capture, ImageCapture::DirectImages(vec!["q4_img_2.jpg".into()]));
    }

    #[test]
    fn render_failure_keeps_direct_images() {
        let dir = tempfile::tempdir().unwrap();
        let page = FakePage::new(vec![Some(vec![0; 10])], None);
        let capture = capture_page_images(&page, "q5", dir.path(), &CapturePolicy::default());
        assert_eq!(capture, ImageCapture::DirectImages(vec!["q5_img_1.jpg".into()]));
        assert_eq!(page.renders.get(), 1);
    }

    #[test]
    fn find_images_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "q1_img_2.png",
            "q1_full_page.png",
            "q1_img_1.jpg",
            "q12_img_1.png",
            "q1_img_3",
            "q1_notes.txt",
            "other_img_1.png",
        ] {
            touch(dir.path(), name);
        }
        fs::create_dir(dir.path().join("q1_img_9.png")).unwrap();

        assert_eq!(
            find_images("q1", dir.path()),
            vec!["q1_full_page.png", "q1_img_1.jpg", "q1_img_2.png"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn find_images_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let store = tempfile::tempdir().unwrap();
        touch(store.path(), "shared.png");
        std::os::unix::fs::symlink(store.path().join("shared.png"), dir.path().join("q1_img_1.png")).unwrap();
        std::os::unix::fs::symlink(store.path().join("gone.png"), dir.path().join("q1_img_2.png")).unwrap();

        assert_eq!(find_images("q1", dir.path()), vec!["q1_img_1.png"]);
    }

    #[test]
    fn find_images_missing_dir_is_empty() {
        assert!(find_images("q1", Path::new("tests/fixtures/no-such-dir")).is_empty());
    }

    #[test]
    fn find_images_empty_id_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "_img_1.png");
        assert!(find_images("", dir.path()).is_empty());
    }

    #[test]
    fn capture_then_find_agree() {
        let dir = tempfile::tempdir().unwrap();
        let page = FakePage::new(vec![Some(vec![0; 2048]), Some(vec![0; 2048])], None);
        let captured = capture_page_images(&page, "abc", dir.path(), &CapturePolicy::default());
        assert_eq!(captured.into_filenames(), find_images("abc", dir.path()));
    }
}
