use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use uuid::Uuid;

use crate::models::{Question, ResponseType, StaticAnswer, SurveyError};

pub const MAX_TEXT_ANSWER_CHARS: usize = 2000;
pub const SCALE_MIN: i64 = 1;
pub const SCALE_MAX: i64 = 10;

/// An answer that passed validation, normalised to its stored text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAnswer {
    pub question_id: Uuid,
    pub question_text: String,
    pub answer: String,
}

/// Validates a whole batch before anything is written. Repeated question ids
/// collapse to the last answer given. Errors are keyed by question id.
pub fn validate_static_answers(
    catalog: &[Question],
    answers: &[StaticAnswer],
) -> Result<Vec<ValidatedAnswer>, SurveyError> {
    let by_id: HashMap<Uuid, &Question> = catalog.iter().map(|q| (q.id, q)).collect();

    let mut latest: Vec<&StaticAnswer> = Vec::with_capacity(answers.len());
    for answer in answers {
        latest.retain(|a| a.question_id != answer.question_id);
        latest.push(answer);
    }

    let mut errors = BTreeMap::new();
    let mut validated = Vec::with_capacity(latest.len());

    for answer in latest {
        let key = answer.question_id.to_string();
        let Some(question) = by_id.get(&answer.question_id) else {
            errors.insert(key, format!("Question {} not found", answer.question_id));
            continue;
        };

        match normalise_answer(question, &answer.answer) {
            Ok(text) => validated.push(ValidatedAnswer {
                question_id: question.id,
                question_text: question.question_text.clone(),
                answer: text,
            }),
            Err(message) => {
                errors.insert(key, message);
            }
        }
    }

    if !errors.is_empty() {
        return Err(SurveyError::InvalidAnswers(errors));
    }

    validated.sort_by_key(|a| by_id.get(&a.question_id).map(|q| q.order).unwrap_or(i32::MAX));
    Ok(validated)
}

fn normalise_answer(question: &Question, value: &Value) -> Result<String, String> {
    let options = question.options.as_deref().unwrap_or_default();

    match question.response_type {
        ResponseType::SingleChoice => {
            let choice = non_empty_str(value)?;
            if !options.iter().any(|o| o == choice) {
                return Err("Answer must be one of the listed options".to_string());
            }
            Ok(choice.to_string())
        }
        ResponseType::MultipleChoice => {
            let selected = match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>(),
                // Clients may send the stored JSON text back.
                Value::String(raw) => serde_json::from_str::<Vec<String>>(raw).ok(),
                _ => None,
            }
            .ok_or_else(|| "Answer must be a list of options".to_string())?;

            if selected.is_empty() {
                return Err("Answer cannot be empty".to_string());
            }
            if let Some(unknown) = selected.iter().find(|s| !options.contains(s)) {
                return Err(format!("'{}' is not one of the listed options", unknown));
            }
            serde_json::to_string(&selected).map_err(|e| e.to_string())
        }
        ResponseType::Scale => {
            let score = match value {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            }
            .ok_or_else(|| "Answer must be a whole number".to_string())?;

            if !(SCALE_MIN..=SCALE_MAX).contains(&score) {
                return Err(format!("Answer must be between {} and {}", SCALE_MIN, SCALE_MAX));
            }
            Ok(score.to_string())
        }
        ResponseType::Text => {
            let text = non_empty_str(value)?;
            if text.chars().count() > MAX_TEXT_ANSWER_CHARS {
                return Err(format!("Answer must be at most {} characters", MAX_TEXT_ANSWER_CHARS));
            }
            Ok(text.to_string())
        }
    }
}

fn non_empty_str(value: &Value) -> Result<&str, String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim()),
        Value::String(_) | Value::Null => Err("Answer cannot be empty".to_string()),
        _ => Err("Answer must be text".to_string()),
    }
}
