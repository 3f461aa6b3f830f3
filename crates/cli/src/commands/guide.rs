//! `gongbu guide` — Generate a study guide from the terminal.

use gongbu_core::model::EducationLevel;
use gongbu_guide::{ChatSession, GeneratedGuide, GuideRequest, StudyGuideBuilder};
use std::sync::Arc;

pub struct GuideArgs {
    pub subject: String,
    pub level: String,
    pub grade: String,
    pub unit: String,
    pub publisher: Option<String>,
    pub json: bool,
    pub chat: bool,
}

pub async fn run(args: GuideArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    super::require_api_key(&config)?;

    let school_level: EducationLevel = args.level.parse()?;
    let request = GuideRequest {
        subject: args.subject,
        school_level,
        grade: args.grade,
        unit_range: args.unit,
        publisher: args.publisher,
    };

    let provider = super::default_provider(&config)?;
    let store = Arc::new(super::open_store(&config, None).await?);
    let builder = StudyGuideBuilder::from_config(provider.clone(), store, &config);

    eprint!("  Generating study guide...");
    let result = builder.build(&request).await;
    eprint!("\r                            \r");
    let generated = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&generated)?);
    } else {
        print_guide(&generated);
    }

    if args.chat {
        let session = ChatSession::for_guide(provider, &config.default_model, &generated)
            .with_temperature(config.guide.chat_temperature)
            .with_max_tokens(Some(config.default_max_tokens));
        super::chat::interactive(session).await?;
    }

    Ok(())
}

fn print_guide(generated: &GeneratedGuide) {
    let guide = &generated.guide;
    println!();
    println!("📘 {}", guide.unit_title);
    println!();
    if generated.grounded {
        println!("  Based on {} curated concepts", generated.sources.len());
    } else {
        println!("  ⚠️  Concept store unavailable; written from general knowledge");
    }
    println!();
    println!("  {}", guide.summary);

    if !guide.key_concepts.is_empty() {
        println!("\n  핵심 개념");
        for concept in &guide.key_concepts {
            println!("    [{}] {} — {}", concept.importance, concept.title, concept.explanation);
        }
    }
    if !guide.exam_points.is_empty() {
        println!("\n  출제 포인트");
        for point in &guide.exam_points {
            println!("    • {} ({})", point.point, point.reason);
        }
    }
    if !guide.trap_warnings.is_empty() {
        println!("\n  함정 주의");
        for warning in &guide.trap_warnings {
            println!("    ⚠️  {warning}");
        }
    }
    if !guide.practice_questions.is_empty() {
        println!("\n  연습 문제");
        for (i, q) in guide.practice_questions.iter().enumerate() {
            println!("    {}. {}", i + 1, q.question);
            println!("       정답: {}", q.answer);
            if !q.explanation.is_empty() {
                println!("       해설: {}", q.explanation);
            }
        }
    }
    if !guide.study_tips.is_empty() {
        println!("\n  공부 팁");
        for tip in &guide.study_tips {
            println!("    - {tip}");
        }
    }
    println!();
}
