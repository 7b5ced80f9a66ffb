//! The two batch pipelines: PDF pages → page records, bank JSON → bank
//! records. Both run unit by unit on one thread; a unit that fails is
//! logged and skipped, and the batch carries on.

use std::fs;
use std::path::Path;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, info_span, warn};

use crate::document::{Page, PdfDocument};
use crate::images::{capture_page_images, CapturePolicy};
use crate::parser::bank::{normalize_entry, parse_bank};
use crate::parser::page::{extract_question, question_id};
use crate::record::{BankQuestion, PageQuestion};

pub fn progress_bar(len: u64) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

#[derive(Debug, Default)]
pub struct PdfRun {
    pub questions: Vec<PageQuestion>,
    pub pages_seen: usize,
    /// Pages that had an id but could not be turned into a record, or whose
    /// text could not be read.
    pub skipped: usize,
}

/// Walk `pages` in order, capturing images and extracting one record per
/// question page. Pages without an id are not counted as skipped.
pub fn extract_pages<P, I>(pages: I, image_dir: &Path, policy: &CapturePolicy, pb: &ProgressBar) -> PdfRun
where
    P: Page,
    I: IntoIterator<Item = P>,
{
    let mut run = PdfRun::default();

    for page in pages {
        let span = info_span!("page", number = page.number());
        let _enter = span.enter();
        run.pages_seen += 1;
        pb.inc(1);

        let text = match page.text() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "skipping unreadable page");
                run.skipped += 1;
                continue;
            }
        };

        let Some(id) = question_id(&text) else {
            debug!("no question id on page");
            continue;
        };

        let images = capture_page_images(&page, id, image_dir, policy).into_filenames();
        match extract_question(&text, images).into_question() {
            Some(question) => {
                debug!(id = %question.id, options = question.options.len(), "extracted question");
                run.questions.push(question);
            }
            None => run.skipped += 1,
        }
    }

    pb.finish_and_clear();
    run
}

/// Text pipeline over a PDF file. A document that cannot be opened is
/// fatal for that document only: it is logged and an empty run is returned.
pub fn run_pdf(pdf: &Path, renderer: &str, image_dir: &Path, policy: &CapturePolicy) -> anyhow::Result<PdfRun> {
    let doc = match PdfDocument::open(pdf, renderer) {
        Ok(doc) => doc,
        Err(e) => {
            error!(error = %e, "cannot open document");
            return Ok(PdfRun::default());
        }
    };
    info!(pdf = %pdf.display(), pages = doc.page_count(), "processing document");

    let pb = progress_bar(doc.page_count() as u64)?;
    Ok(extract_pages(doc.pages(), image_dir, policy, &pb))
}

/// Structured pipeline over a bank JSON file. Unreadable or unparsable
/// input is an error for the whole run; single bad entries are skipped.
pub fn run_bank(bank: &Path, image_dir: &Path) -> anyhow::Result<Vec<BankQuestion>> {
    let json = fs::read_to_string(bank).with_context(|| format!("reading {}", bank.display()))?;
    let entries = parse_bank(&json).with_context(|| format!("parsing {}", bank.display()))?;
    info!(bank = %bank.display(), entries = entries.len(), "processing question bank");

    let pb = progress_bar(entries.len() as u64)?;
    Ok(normalize_entries(entries, image_dir, &pb))
}

fn normalize_entries(
    entries: serde_json::Map<String, serde_json::Value>,
    image_dir: &Path,
    pb: &ProgressBar,
) -> Vec<BankQuestion> {
    let mut records = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let span = info_span!("entry", key = %key);
        let _enter = span.enter();
        pb.inc(1);
        if let Some(record) = normalize_entry(&key, value, image_dir) {
            records.push(record);
        }
    }
    pb.finish_and_clear();
    records
}
