//! Prompt templates sent to the chat-completion endpoint.
//!
//! Every template is Korean because the students and the curriculum are.
//! The study-guide template ends with the exact JSON schema the reply must
//! follow; [`crate::builder`] parses replies against that shape.

use gongbu_core::model::ConceptContext;
use std::fmt::Write;

use crate::builder::{GuideRequest, StudyGuide};
use crate::collector::DraftRequest;

/// System instruction for study-guide generation.
pub const GUIDE_SYSTEM_PROMPT: &str = "너는 한국 중·고등학교 내신 시험을 20년간 분석해 온 교과 전문 강사다. \
학생이 선택한 과목과 단원에 대해 시험에 실제로 나오는 내용만 골라 정확하고 간결한 학습 가이드를 만든다. \
항상 요청된 JSON 형식으로만 답한다.";

/// System instruction for a tutor chat that is not tied to a guide.
pub const DEFAULT_CHAT_PROMPT: &str = "너는 친절한 한국 중·고등학교 과외 선생님이다. \
학생의 질문에 학년 수준에 맞는 쉬운 말로 답하고, 필요하면 짧은 예시를 든다. \
모르는 내용은 추측하지 말고 모른다고 말한다.";

/// System instruction for admin draft generation.
pub const DRAFT_SYSTEM_PROMPT: &str = "너는 교과서 집필 경험이 있는 교육 콘텐츠 작가다. \
관리자가 지정한 단원에 대해 교과서 본문 수준의 정확한 설명글을 쓴다. \
JSON이나 마크다운 코드 블록 없이 일반 텍스트로만 답한다.";

const OUTPUT_SCHEMA: &str = r#"{
  "isValid": true,
  "unitTitle": "단원 이름",
  "summary": "단원 핵심 요약 (3~5문장)",
  "keyConcepts": [
    { "title": "개념 이름", "explanation": "시험 대비 설명", "importance": "A" }
  ],
  "examPoints": [
    { "point": "출제 포인트", "reason": "자주 출제되는 이유" }
  ],
  "trapWarnings": ["학생들이 자주 틀리는 함정"],
  "practiceQuestions": [
    { "question": "예상 문제", "answer": "정답", "explanation": "풀이" }
  ],
  "studyTips": ["공부 방법 조언"]
}"#;

const INSTRUCTIONS: &str = "\
작성 지침:
1. 각 핵심 개념의 importance를 A(반드시 출제), B(자주 출제), C(가끔 출제) 중 하나로 분류한다.
2. examPoints는 출제 빈도가 높은 순서로 쓴다.
3. trapWarnings에는 실제 시험에서 오답을 유도하는 함정만 쓴다.
4. practiceQuestions는 3~5개, 실제 내신 시험 형식으로 만든다.
5. 선택한 과목과 단원이 해당 학년 교육과정에 존재하지 않거나 내용을 확인할 수 없으면 isValid를 false로 하고 나머지 필드는 비운다.
6. 다른 설명 없이 아래 JSON 형식으로만 응답한다.";

fn selection_line(request: &GuideRequest) -> String {
    let mut line = format!(
        "{} {}학년 {} '{}' 단원",
        request.school_level.label_ko(),
        request.grade.trim(),
        request.subject.trim(),
        request.unit_range.trim()
    );
    if let Some(publisher) = request.publisher.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        let _ = write!(line, " ({publisher} 교과서)");
    }
    line
}

/// Serialize one concept and its exam metadata as a numbered block.
fn write_concept(out: &mut String, index: usize, ctx: &ConceptContext) {
    let concept = &ctx.concept;
    let _ = write!(out, "[개념 {index}] {} (중요도 {}", concept.title, concept.importance);
    if let Some(logic) = &ctx.logic {
        let _ = write!(out, ", 출제 빈도 {}/5", logic.frequency_weight);
    }
    out.push_str(")\n");
    let _ = writeln!(out, "- 설명: {}", concept.description);
    if let Some(formula) = &concept.formula {
        let _ = writeln!(out, "- 공식: {formula}");
    }
    if !concept.key_terms.is_empty() {
        let _ = writeln!(out, "- 핵심 용어: {}", concept.key_terms.join(", "));
    }

    if let Some(logic) = &ctx.logic {
        let _ = writeln!(out, "- 출제 상황: {}", logic.condition_context);
        let _ = writeln!(out, "- 요구 사고: {}", logic.reasoning_required);
        let _ = writeln!(out, "- 문제 유형: {}", logic.question_type);
        if let Some(history) = &logic.test_frequency {
            let _ = writeln!(out, "- 기출 빈도: {history}");
        }
    }

    for trap in &ctx.traps {
        match &trap.correction {
            Some(fix) => {
                let _ = writeln!(out, "- 함정: {} → {fix}", trap.description);
            }
            None => {
                let _ = writeln!(out, "- 함정: {}", trap.description);
            }
        }
    }
    for pattern in &ctx.patterns {
        match &pattern.interpretation {
            Some(reading) => {
                let _ = writeln!(out, "- 그래프: {} (해석: {reading})", pattern.description);
            }
            None => {
                let _ = writeln!(out, "- 그래프: {}", pattern.description);
            }
        }
    }
    for calc in &ctx.calculations {
        match &calc.example {
            Some(example) => {
                let _ = writeln!(out, "- 계산: {} (예: {example})", calc.description);
            }
            None => {
                let _ = writeln!(out, "- 계산: {}", calc.description);
            }
        }
    }
    out.push('\n');
}

/// The retrieval-grounded study-guide prompt.
///
/// With an empty `contexts` slice this is the same as [`general_prompt`].
pub fn guide_prompt(request: &GuideRequest, contexts: &[ConceptContext]) -> String {
    if contexts.is_empty() {
        return general_prompt(request);
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "다음은 {}의 시험 출제 데이터 {}건입니다. 출제 가능성이 높은 순서로 정렬되어 있습니다.\n",
        selection_line(request),
        contexts.len()
    );
    for (i, ctx) in contexts.iter().enumerate() {
        write_concept(&mut out, i + 1, ctx);
    }
    out.push_str("위 데이터에 근거해 학습 가이드를 작성한다. 데이터에 없는 내용은 교육과정 범위 안에서만 보충한다.\n\n");
    out.push_str(INSTRUCTIONS);
    out.push_str("\n\n");
    out.push_str(OUTPUT_SCHEMA);
    out
}

/// Prompt used when no stored data is available for the selection.
pub fn general_prompt(request: &GuideRequest) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}에 대한 저장된 출제 데이터가 없습니다. 교육과정에 대한 일반 지식을 바탕으로 학습 가이드를 작성한다.\n",
        selection_line(request)
    );
    out.push_str(INSTRUCTIONS);
    out.push_str("\n\n");
    out.push_str(OUTPUT_SCHEMA);
    out
}

/// Tutor instruction seeded from a generated guide.
pub fn chat_prompt(request: &GuideRequest, guide: &StudyGuide) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "너는 {} {}학년 {} 과목 과외 선생님이다. 학생은 방금 '{}' 학습 가이드를 받았다.",
        request.school_level.label_ko(),
        request.grade.trim(),
        request.subject.trim(),
        if guide.unit_title.is_empty() { request.unit_range.trim() } else { guide.unit_title.as_str() }
    );
    out.push_str("가이드 내용을 바탕으로 학생의 질문에 쉽고 정확하게 답한다. 가이드 범위를 벗어난 질문도 같은 학년 수준으로 답한다.\n\n");

    if !guide.summary.is_empty() {
        let _ = writeln!(out, "요약: {}", guide.summary);
    }
    if !guide.key_concepts.is_empty() {
        out.push_str("핵심 개념:\n");
        for concept in &guide.key_concepts {
            let _ = writeln!(out, "- {}: {}", concept.title, concept.explanation);
        }
    }
    if !guide.trap_warnings.is_empty() {
        out.push_str("주의할 함정:\n");
        for trap in &guide.trap_warnings {
            let _ = writeln!(out, "- {trap}");
        }
    }
    out
}

/// Freeform draft request for the admin collector.
pub fn draft_prompt(request: &DraftRequest) -> String {
    let mut out = format!(
        "{} {}학년 {} 과목 {}단원 '{}'의 {} 초안을 작성해 주세요.",
        request.school_level.label_ko(),
        request.grade.trim(),
        request.subject.trim(),
        request.unit_number,
        request.unit_title.trim(),
        request.content_type.trim()
    );
    if let Some(notes) = request.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        let _ = write!(out, "\n\n참고 사항:\n{notes}");
    }
    out.push_str("\n\n학생이 교과서로 읽을 수 있는 분량(800~1500자)으로, 소제목 없이 문단으로 작성한다.");
    out
}
