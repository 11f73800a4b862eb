use crate::models::{QaPair, RiskLevel, SurveyAnalysis};

pub const MAX_QUESTION_CHARS: usize = 200;
pub const SUMMARY_UNAVAILABLE: &str = "Unable to generate summary";
pub const SUMMARY_FAILED: &str = "Error generating summary";

fn push_numbered(parts: &mut Vec<String>, pairs: &[QaPair]) {
    for (i, pair) in pairs.iter().enumerate() {
        parts.push(format!("{}. Q: {}", i + 1, pair.question));
        parts.push(format!("   A: {}\n", pair.answer));
    }
}

/// Static answers first, then earlier follow-ups, each section numbered from 1.
pub fn build_question_context(static_answers: &[QaPair], dynamic_answers: &[QaPair]) -> String {
    let mut parts = vec!["Patient Assessment Responses:\n".to_string()];

    if !static_answers.is_empty() {
        parts.push("Initial Assessment:".to_string());
        push_numbered(&mut parts, static_answers);
    }

    if !dynamic_answers.is_empty() {
        parts.push("\nFollow-up Questions:".to_string());
        push_numbered(&mut parts, dynamic_answers);
    }

    parts.join("\n")
}

pub fn question_prompt(context: &str, asked_so_far: usize, max_questions: usize) -> String {
    format!(
        "You are a compassionate mental health professional conducting a patient assessment. \
Based on the patient's responses below, generate ONE thoughtful follow-up question to better \
understand their mental health status.

{context}

Guidelines:
- Ask a specific, empathetic question that explores concerning areas mentioned
- Focus on understanding severity, frequency, or impact of symptoms
- Keep the question clear and under 25 words
- Ask about coping mechanisms, support systems, or specific triggers if relevant
- This is question {number} of maximum {max_questions} follow-up questions
- Be sensitive and non-judgmental in tone
- Do not ask multiple questions at once
- Do not repeat questions already asked

Generate only the question text, nothing else:",
        context = context,
        number = asked_so_far + 1,
        max_questions = max_questions,
    )
}

/// Trims, strips one pair of matching quotes, ensures a trailing `?` and
/// caps the length at 200 characters, the marker included.
pub fn clean_question(raw: &str) -> String {
    let mut question = raw.trim();

    for quote in ['"', '\''] {
        if question.len() >= 2 && question.starts_with(quote) && question.ends_with(quote) {
            question = &question[1..question.len() - 1];
        }
    }

    let mut question = question.trim().to_string();
    if !question.ends_with('?') {
        question.push('?');
    }

    if question.chars().count() > MAX_QUESTION_CHARS {
        const MARKER: &str = "...?";
        let truncated: String = question.chars().take(MAX_QUESTION_CHARS - MARKER.len()).collect();
        question = format!("{}{}", truncated, MARKER);
    }

    question
}

pub fn build_summary_context(answers: &[QaPair]) -> String {
    let mut parts = vec!["Complete Patient Assessment:\n".to_string()];
    push_numbered(&mut parts, answers);
    parts.join("\n")
}

pub fn summary_prompt(context: &str) -> String {
    format!(
        "You are a mental health professional analyzing a patient assessment. Based on the \
responses below, provide a brief clinical summary and risk assessment.

{context}

Provide your analysis in the following format:
SUMMARY: [2-3 sentences summarizing key concerns and patient's mental state]
RISK: [low/medium/high]

Guidelines:
- Consider emotional state, sleep, appetite, relationships, and coping mechanisms
- Identify any red flags (suicidal ideation, self-harm, severe symptoms)
- Risk levels:
  * low: Minor concerns, functioning well, good coping
  * medium: Moderate symptoms, some impairment, needs support
  * high: Severe symptoms, significant impairment, safety concerns

Your response:",
        context = context,
    )
}

/// Reads `SUMMARY:` and `RISK:` lines. Risk falls back to medium; a reply
/// with no summary line is used whole.
pub fn parse_summary(reply: &str) -> SurveyAnalysis {
    let mut summary = String::new();
    let mut risk_level = RiskLevel::default();

    for line in reply.trim().lines() {
        if let Some(rest) = line.strip_prefix("SUMMARY:") {
            summary = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("RISK:") {
            if let Some(level) = RiskLevel::from_label(rest) {
                risk_level = level;
            }
        }
    }

    if summary.is_empty() {
        summary = reply.trim().to_string();
    }

    SurveyAnalysis { summary, risk_level }
}

pub fn placeholder_analysis(reason: &str) -> SurveyAnalysis {
    SurveyAnalysis {
        summary: reason.to_string(),
        risk_level: RiskLevel::Medium,
    }
}
