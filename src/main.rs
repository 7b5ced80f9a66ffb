mod display;
mod document;
mod images;
mod lenient;
mod output;
mod parser;
mod pipeline;
mod record;
mod scraper;
mod settings;

use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::warn;

use crate::output::{group_by_subject, read_json, write_json, write_subject_files, QuestionsFile, SubjectFile};
use crate::scraper::{ListedQuestion, QuestionBankScraper};
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "sat_prep", about = "SAT question bank extraction and normalization")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract questions from a question-bank PDF
    Pdf {
        pdf: PathBuf,
        /// Output directory (images go to <OUT>/images)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Name of the questions file inside the output directory
        #[arg(long)]
        file: Option<String>,
    },
    /// Normalize a pre-parsed question bank JSON into per-subject files
    Process {
        bank: PathBuf,
        /// Directory holding previously extracted question images
        #[arg(long)]
        images: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List questions from the online question bank
    Scrape {
        /// Max listing pages to fetch (default: until an empty page)
        #[arg(short = 'n', long)]
        pages: Option<u32>,
        #[arg(long)]
        per_page: Option<u32>,
        #[arg(short, long)]
        subject: Option<String>,
        /// Also fetch the detail record of every listed question
        #[arg(long)]
        details: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert OpenSAT questions to the flat quiz format
    Opensat {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Save JSON read from stdin, pretty-printed
    Import {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print one processed question
    Show {
        /// A `<subject>_questions.json` file written by `process`
        subject_file: PathBuf,
        id: String,
        #[arg(long)]
        images: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct ScrapedQuestion {
    #[serde(flatten)]
    listing: ListedQuestion,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load().context("loading settings")?;

    let result = match cli.command {
        Commands::Pdf { pdf, output, file } => {
            let out_dir = output.unwrap_or(settings.output_dir.clone());
            let file = file.unwrap_or(settings.questions_file.clone());
            let image_dir = out_dir.join("images");

            let run = pipeline::run_pdf(&pdf, &settings.renderer, &image_dir, &settings.capture_policy())?;
            let path = out_dir.join(&file);
            let count = run.questions.len();
            write_json(&path, &QuestionsFile { questions: run.questions })?;
            println!(
                "Extracted {} questions from {} pages ({} skipped) -> {}",
                count,
                run.pages_seen,
                run.skipped,
                path.display()
            );
            Ok(())
        }
        Commands::Process { bank, images, output } => {
            let image_dir = images.unwrap_or(settings.image_dir.clone());
            let out_dir = output.unwrap_or(settings.processed_dir.clone());

            let records = pipeline::run_bank(&bank, &image_dir)?;
            let groups = group_by_subject(records);
            if groups.is_empty() {
                warn!(bank = %bank.display(), "no usable questions, writing an empty manifest");
            }
            let summary = write_subject_files(&out_dir, &groups)?;
            for path in &summary.written {
                println!("Saved {}", path.display());
            }
            println!(
                "Processed {} questions across {} subjects ({} subject files failed).",
                summary.manifest.total_questions,
                summary.manifest.subjects.len(),
                summary.failed
            );
            Ok(())
        }
        Commands::Scrape {
            pages,
            per_page,
            subject,
            details,
            output,
        } => {
            if let Some(per_page) = per_page {
                settings.scrape.per_page = per_page;
            }
            if let Some(subject) = subject {
                settings.scrape.subject = subject;
            }
            let path = output.unwrap_or_else(|| settings.output_dir.join("scraped_questions.json"));

            let scraper = QuestionBankScraper::new(settings.scrape.clone())?;
            let listed = scraper.scrape_all(pages).await;
            if listed.is_empty() {
                println!("No questions listed.");
                return Ok(());
            }

            let mut scraped = Vec::with_capacity(listed.len());
            for listing in listed {
                let record = if details {
                    match scraper.fetch_details(&listing.id).await {
                        Ok(record) => Some(record),
                        Err(e) => {
                            warn!(id = %listing.id, error = %e, "failed to fetch question details");
                            None
                        }
                    }
                } else {
                    None
                };
                scraped.push(ScrapedQuestion {
                    listing,
                    details: record,
                });
            }
            write_json(&path, &scraped)?;
            println!("Saved {} questions to {}", scraped.len(), path.display());
            Ok(())
        }
        Commands::Opensat { input, output } => {
            let path = output.unwrap_or_else(|| settings.output_dir.join("opensat_questions.json"));
            let document: serde_json::Value = read_json(&input)?;
            let questions = parser::opensat::convert_document(document);
            write_json(&path, &questions)?;
            println!("Converted {} OpenSAT questions -> {}", questions.len(), path.display());
            Ok(())
        }
        Commands::Import { output } => {
            let path = output.unwrap_or_else(|| settings.output_dir.join(&settings.questions_file));
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("reading stdin")?;
            let value: serde_json::Value = serde_json::from_str(&input).context("stdin is not valid JSON")?;
            write_json(&path, &value)?;
            println!("Saved {} entries to {}", entry_count(&value), path.display());
            Ok(())
        }
        Commands::Show {
            subject_file,
            id,
            images,
        } => {
            let image_dir = images.unwrap_or(settings.image_dir.clone());
            let file: SubjectFile = read_json(&subject_file)?;
            let Some(question) = display::find_question(&file, &id) else {
                bail!("question {} not found in {}", id, subject_file.display());
            };
            print!("{}", display::render_question(question, &image_dir));
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Entries in an imported document: array length, key count, or 1.
fn entry_count(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::Array(items) => items.len(),
        serde_json::Value::Object(map) => map.len(),
        _ => 1,
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
