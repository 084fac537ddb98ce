//! Decoding of the provider's reply content into a `Question`.
//!
//! The content is untrusted model output. All checks live in
//! `decode_question` so a bad reply is always a `QuestionError::Parse`.

use serde::Deserialize;

use crate::error::QuestionError;
use crate::models::{AnswerOption, Letter, Question};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    question: String,
    options: Vec<String>,
    correct_answer: String,
    explanation: String,
    #[serde(default)]
    subject: Option<String>,
}

/// Parses reply content into a question.
///
/// Prose or a markdown fence around the object is tolerated. Options may
/// carry their own `A)` / `A.` / `A:` labels; unlabelled options are labelled
/// by position. `fallback_subject` fills a missing subject tag.
pub fn decode_question(content: &str, fallback_subject: &str) -> Result<Question, QuestionError> {
    let object = extract_object(content)
        .ok_or_else(|| QuestionError::Parse("reply contains no JSON object".to_string()))?;

    let raw: RawQuestion =
        serde_json::from_str(object).map_err(|e| QuestionError::Parse(e.to_string()))?;

    let question = raw.question.trim().to_string();
    if question.is_empty() {
        return Err(QuestionError::Parse("question text is empty".to_string()));
    }

    if raw.options.len() != Letter::ALL.len() {
        return Err(QuestionError::Parse(format!(
            "expected 4 options, got {}",
            raw.options.len()
        )));
    }

    let mut options = Vec::with_capacity(Letter::ALL.len());
    for (position, option) in Letter::ALL.into_iter().zip(&raw.options) {
        let (label, text) = split_label(option).unwrap_or((position, option.trim()));
        if label != position {
            return Err(QuestionError::Parse(format!(
                "option {position} is labelled {label}"
            )));
        }
        if text.is_empty() {
            return Err(QuestionError::Parse(format!("option {position} is empty")));
        }
        options.push(AnswerOption {
            label,
            text: text.to_string(),
        });
    }
    let options: [AnswerOption; 4] = options
        .try_into()
        .map_err(|_| QuestionError::Parse("expected 4 options".to_string()))?;

    let correct_answer = parse_answer_letter(&raw.correct_answer).ok_or_else(|| {
        QuestionError::Parse(format!(
            "correct answer {:?} does not name an option",
            raw.correct_answer
        ))
    })?;

    let subject = raw
        .subject
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_subject.to_string());

    Ok(Question {
        question,
        options,
        correct_answer,
        explanation: raw.explanation.trim().to_string(),
        subject,
    })
}

/// The outermost `{ ... }` span of the content.
fn extract_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (start < end).then(|| &content[start..=end])
}

/// Splits `"B) text"` into `(B, "text")`.
fn split_label(option: &str) -> Option<(Letter, &str)> {
    let option = option.trim();
    let mut chars = option.char_indices();
    let (_, first) = chars.next()?;
    let letter = Letter::from_char(first)?;
    let (idx, sep) = chars.next()?;
    if !matches!(sep, ')' | '.' | ':') {
        return None;
    }
    Some((letter, option[idx + sep.len_utf8()..].trim()))
}

/// Accepts `"A"`, `"a"`, `"A)"` or `"A) full option text"`.
fn parse_answer_letter(answer: &str) -> Option<Letter> {
    let answer = answer.trim();
    let mut chars = answer.chars();
    let letter = Letter::from_char(chars.next()?)?;
    match chars.next() {
        None | Some(')' | '.' | ':') => Some(letter),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"{
        "question": "Which nerve supplies the deltoid?",
        "options": ["A) Radial", "B) Axillary", "C) Median", "D) Ulnar"],
        "correctAnswer": "B",
        "explanation": "The axillary nerve (C5, C6) supplies the deltoid.",
        "subject": "Anatomy"
    }"#;

    #[test]
    fn decodes_well_formed_reply() {
        let question = decode_question(GOOD, "Anatomy").unwrap();
        assert_eq!(question.correct_answer, Letter::B);
        assert_eq!(question.option(Letter::B).text, "Axillary");
        assert_eq!(question.options[3].to_string(), "D) Ulnar");
        assert_eq!(question.subject, "Anatomy");
    }

    #[test]
    fn tolerates_fences_and_prose() {
        let content = format!("Here is your question:\n```json\n{GOOD}\n```\nGood luck!");
        assert!(decode_question(&content, "Anatomy").is_ok());
    }

    #[test]
    fn labels_unlabelled_options_by_position() {
        let content = r#"{"question":"q","options":["one","two","three","four"],
            "correctAnswer":"C) three","explanation":"e"}"#;
        let question = decode_question(content, "Physiology").unwrap();
        assert_eq!(question.option(Letter::C).text, "three");
        assert_eq!(question.correct_answer, Letter::C);
        assert_eq!(question.subject, "Physiology");
    }

    #[test]
    fn rejects_non_json_content() {
        let err = decode_question("Sorry, I cannot help with that.", "Anatomy").unwrap_err();
        assert!(matches!(err, QuestionError::Parse(_)));
        let err = decode_question("{ not json }", "Anatomy").unwrap_err();
        assert!(matches!(err, QuestionError::Parse(_)));
    }

    #[test]
    fn rejects_missing_fields_and_wrong_option_count() {
        let missing = r#"{"question":"q","options":["A) a","B) b","C) c","D) d"],"explanation":"e"}"#;
        assert!(matches!(decode_question(missing, "x"), Err(QuestionError::Parse(_))));

        let three = r#"{"question":"q","options":["A) a","B) b","C) c"],"correctAnswer":"A","explanation":"e"}"#;
        assert!(matches!(decode_question(three, "x"), Err(QuestionError::Parse(_))));
    }

    #[test]
    fn rejects_answer_that_names_no_option() {
        let content = r#"{"question":"q","options":["A) a","B) b","C) c","D) d"],"correctAnswer":"E","explanation":"e"}"#;
        assert!(matches!(decode_question(content, "x"), Err(QuestionError::Parse(_))));

        let content = r#"{"question":"q","options":["A) a","B) b","C) c","D) d"],"correctAnswer":"Axillary","explanation":"e"}"#;
        assert!(matches!(decode_question(content, "x"), Err(QuestionError::Parse(_))));
    }

    #[test]
    fn rejects_out_of_order_labels() {
        let content = r#"{"question":"q","options":["B) b","A) a","C) c","D) d"],"correctAnswer":"A","explanation":"e"}"#;
        assert!(matches!(decode_question(content, "x"), Err(QuestionError::Parse(_))));
    }
}
