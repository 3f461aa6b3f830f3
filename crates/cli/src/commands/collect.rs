//! `gongbu collect` — Admin content collection from the terminal.

use clap::Subcommand;
use gongbu_core::model::{ConceptContext, EducationLevel};
use gongbu_guide::{ContentCollector, ContentSubmission, DraftRequest};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Subcommand)]
pub enum CollectAction {
    /// Store one chunk of textbook content
    Content {
        #[arg(long)]
        publisher: String,
        /// School level: middle or high
        #[arg(long, default_value = "middle")]
        level: String,
        #[arg(long)]
        grade: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        unit_number: u32,
        #[arg(long, default_value = "")]
        unit_title: String,
        /// e.g. 본문, 탐구, 정리
        #[arg(long, default_value = "본문")]
        content_type: String,
        #[arg(long)]
        title: String,
        /// Content text
        #[arg(long, conflicts_with = "file")]
        body: Option<String>,
        /// Read the content text from a file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Page range, e.g. 12-15
        #[arg(long)]
        pages: Option<String>,
    },

    /// Import concept bundles from a JSON array
    Concepts {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// Ask the model for draft content text
    Draft {
        #[arg(long)]
        subject: String,
        #[arg(long, default_value = "middle")]
        level: String,
        #[arg(long)]
        grade: String,
        #[arg(long)]
        unit_number: u32,
        #[arg(long)]
        unit_title: String,
        #[arg(long, default_value = "본문")]
        content_type: String,
        /// Extra guidance for the draft
        #[arg(long)]
        notes: Option<String>,
    },
}

pub async fn run(action: CollectAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let provider = super::default_provider(&config)?;
    let store = Arc::new(super::open_store(&config, None).await?);
    let collector = ContentCollector::from_config(store, provider, &config);

    match action {
        CollectAction::Content {
            publisher,
            level,
            grade,
            subject,
            unit_number,
            unit_title,
            content_type,
            title,
            body,
            file,
            pages,
        } => {
            let body = match (body, file) {
                (Some(body), _) => body,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .map_err(|e| format!("Failed to read {}: {e}", path.display()))?,
                (None, None) => return Err("Provide --body or --file".into()),
            };
            let submission = ContentSubmission {
                publisher,
                school_level: level.parse::<EducationLevel>()?,
                grade,
                subject,
                unit_number,
                unit_title,
                content_type,
                title,
                body,
                page_range: pages,
            };
            let receipt = collector.collect(submission).await?;
            let created = |new: bool| if new { "created" } else { "reused" };
            println!("✅ Stored content chunk {}", receipt.chunk_id);
            println!("   Textbook: {} ({})", receipt.textbook_id, created(receipt.textbook_created));
            println!("   Unit:     {} ({})", receipt.unit_id, created(receipt.unit_created));
        }
        CollectAction::Concepts { file } => {
            let raw = std::fs::read_to_string(&file)
                .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
            let contexts: Vec<ConceptContext> = serde_json::from_str(&raw)?;
            let total = contexts.len();
            info!(file = %file.display(), total, "Importing concepts");
            let mut failed = 0;
            for context in contexts {
                let title = context.concept.title.clone();
                match collector.add_concept(context).await {
                    Ok(id) => println!("  ✅ {title} → {id}"),
                    Err(e) => {
                        warn!(title = %title, error = %e, "Concept import failed");
                        println!("  ❌ {title}: {e}");
                        failed += 1;
                    }
                }
            }
            println!();
            println!("  Imported {} of {total} concept(s)", total - failed);
        }
        CollectAction::Draft {
            subject,
            level,
            grade,
            unit_number,
            unit_title,
            content_type,
            notes,
        } => {
            super::require_api_key(&config)?;
            let request = DraftRequest {
                subject,
                school_level: level.parse::<EducationLevel>()?,
                grade,
                unit_number,
                unit_title,
                content_type,
                notes,
            };
            eprint!("  Drafting...");
            let draft = collector.draft(&request).await;
            eprint!("\r             \r");
            println!("{}", draft?);
        }
    }

    Ok(())
}
