//! Grouping records by subject/topic and writing the JSON outputs.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::record::{BankQuestion, PageQuestion};

pub const MANIFEST_FILE: &str = "questions_manifest.json";
pub const DEFAULT_QUESTIONS_FILE: &str = "sat_questions.json";
/// Bucket for records with no subject or no topic.
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// topic → records
pub type TopicBuckets = IndexMap<String, Vec<BankQuestion>>;
/// subject → topic → records
pub type SubjectGroups = IndexMap<String, TopicBuckets>;

/// Group records by subject, then topic, keeping first-seen order. Every
/// record lands in exactly one bucket and no bucket is ever empty.
pub fn group_by_subject(records: impl IntoIterator<Item = BankQuestion>) -> SubjectGroups {
    let mut groups = SubjectGroups::new();
    for record in records {
        let subject = record.subject.clone().unwrap_or_else(|| UNCATEGORIZED.to_string());
        let topic = record.topic.clone().unwrap_or_else(|| UNCATEGORIZED.to_string());
        groups
            .entry(subject)
            .or_default()
            .entry(topic)
            .or_default()
            .push(record);
    }
    groups
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectFile {
    pub subject: String,
    pub topics: TopicBuckets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub subjects: Vec<String>,
    pub total_questions: usize,
}

impl Manifest {
    pub fn from_groups(groups: &SubjectGroups) -> Self {
        Manifest {
            subjects: groups.keys().cloned().collect(),
            total_questions: groups
                .values()
                .flat_map(|topics| topics.values())
                .map(Vec::len)
                .sum(),
        }
    }
}

/// Output of the page pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestionsFile {
    pub questions: Vec<PageQuestion>,
}

pub fn subject_file_name(subject: &str) -> String {
    let safe: String = subject
        .to_lowercase()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}_questions.json", safe)
}

/// Write `value` as 2-space indented JSON, replacing any existing file.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), OutputError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| OutputError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| OutputError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, OutputError> {
    let raw = fs::read_to_string(path).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| OutputError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub struct WriteSummary {
    pub written: Vec<PathBuf>,
    pub failed: usize,
    pub manifest: Manifest,
}

/// One file per subject plus the manifest. A subject whose file cannot be
/// written is logged and skipped; files already written stay in place.
pub fn write_subject_files(out_dir: &Path, groups: &SubjectGroups) -> Result<WriteSummary, OutputError> {
    let mut written = Vec::new();
    let mut failed = 0;

    for (subject, topics) in groups.iter() {
        let path = out_dir.join(subject_file_name(subject));
        let file = SubjectFileRef { subject, topics };
        match write_json(&path, &file) {
            Ok(()) => {
                info!(subject, path = %path.display(), "saved subject file");
                written.push(path);
            }
            Err(e) => {
                error!(subject, error = %e, "failed to save subject file");
                failed += 1;
            }
        }
    }

    let manifest = Manifest::from_groups(groups);
    let manifest_path = out_dir.join(MANIFEST_FILE);
    write_json(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), total = manifest.total_questions, "saved manifest");

    Ok(WriteSummary {
        written,
        failed,
        manifest,
    })
}

/// Borrowing twin of [`SubjectFile`] so writing does not clone every record.
#[derive(Serialize)]
struct SubjectFileRef<'a> {
    subject: &'a str,
    topics: &'a TopicBuckets,
}
