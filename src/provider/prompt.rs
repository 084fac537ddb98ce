//! Prompt construction for question generation.
//!
//! The wording is not a contract. What matters is that the reply is asked to
//! be a single JSON object with the five question fields.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::{Difficulty, QuizConfig};
use crate::provider::client::ChatMessage;

/// Question archetypes; one is picked per request to vary consecutive questions.
pub const QUESTION_TYPES: [&str; 10] = [
    "anatomy and structure identification",
    "physiological functions",
    "clinical correlations",
    "embryological development",
    "nerve pathways and innervation",
    "blood supply and vasculature",
    "anatomical variations",
    "surgical landmarks",
    "diagnostic features",
    "pathological conditions",
];

pub fn random_question_type<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    QUESTION_TYPES
        .choose(rng)
        .copied()
        .unwrap_or(QUESTION_TYPES[0])
}

pub fn difficulty_instruction(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => {
            "Generate a basic MBBS level question focusing on fundamental concepts."
        }
        Difficulty::Medium => {
            "Generate a moderate difficulty question that combines theoretical knowledge with clinical applications."
        }
        Difficulty::Hard => {
            "Generate a complex clinical scenario-based question that requires integration of multiple concepts."
        }
    }
}

pub fn system_prompt(difficulty: Difficulty) -> String {
    format!(
        "You are a medical education expert specializing in NEET PG, FMGE, and INICET exam preparation. {}",
        difficulty_instruction(difficulty)
    )
}

pub fn user_prompt(config: &QuizConfig, question_type: &str) -> String {
    format!(
        "Generate a {difficulty} level multiple choice question about {question_type} in {scope}. \
         The question should be unique and not repetitive. \
         Respond with a single JSON object and nothing else, using exactly this structure:\n\
         {{\n\
         \x20 \"question\": \"question text\",\n\
         \x20 \"options\": [\"A) option1\", \"B) option2\", \"C) option3\", \"D) option4\"],\n\
         \x20 \"correctAnswer\": \"A\",\n\
         \x20 \"explanation\": \"detailed explanation\",\n\
         \x20 \"subject\": \"{subject}\"\n\
         }}\n\
         The correctAnswer field must be just the letter of the correct option.",
        difficulty = config.difficulty,
        scope = config.scope(),
        subject = config.subject,
    )
}

/// The two-message conversation sent for one question.
pub fn build_messages(config: &QuizConfig, question_type: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt(config.difficulty)),
        ChatMessage::user(user_prompt(config, question_type)),
    ]
}
