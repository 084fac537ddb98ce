use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

/// Subject value meaning "every subject"; chapters do not apply to it.
pub const COMPLETE_SYLLABUS: &str = "Complete Syllabus";

/// Wire value for an unbounded question count or time limit.
pub const NO_LIMIT: &str = "No Limit";

// ---- Quiz Configuration ----

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(ConfigError::UnknownDifficulty(other.to_string())),
        }
    }
}

/// A positive bound or no bound at all.
///
/// Accepts a number, a numeric string or `"No Limit"` on the wire and
/// serializes back to a number or `"No Limit"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Limit {
    Bounded(u32),
    #[default]
    Unlimited,
}

impl Limit {
    pub fn bound(&self) -> Option<u32> {
        match self {
            Limit::Bounded(n) => Some(*n),
            Limit::Unlimited => None,
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Limit::Bounded(n) => serializer.serialize_u32(*n),
            Limit::Unlimited => serializer.serialize_str(NO_LIMIT),
        }
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        let raw = Raw::deserialize(deserializer)?;
        let value = match raw {
            Raw::Number(n) => n,
            Raw::Text(text) if text.trim().eq_ignore_ascii_case(NO_LIMIT) => {
                return Ok(Limit::Unlimited)
            }
            Raw::Text(text) => text
                .trim()
                .parse::<u64>()
                .map_err(|_| serde::de::Error::custom(format!("expected a number or \"{NO_LIMIT}\", got {text:?}")))?,
        };
        let value = u32::try_from(value).map_err(serde::de::Error::custom)?;
        Ok(Limit::Bounded(value))
    }
}

/// Whether the time limit covers the whole quiz or each question.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimerScope {
    #[default]
    Quiz,
    Question,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizConfig {
    pub subject: String,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub question_count: Limit,
    #[serde(default)]
    pub time_limit: Limit,
    #[serde(default)]
    pub timer_scope: TimerScope,
}

impl QuizConfig {
    pub fn new(subject: impl Into<String>, difficulty: Difficulty) -> Self {
        QuizConfig {
            subject: subject.into(),
            chapter: None,
            topic: None,
            difficulty,
            question_count: Limit::Unlimited,
            time_limit: Limit::Unlimited,
            timer_scope: TimerScope::Quiz,
        }
    }

    pub fn is_complete_syllabus(&self) -> bool {
        self.subject.trim().eq_ignore_ascii_case(COMPLETE_SYLLABUS)
    }

    /// Checks the configuration and normalizes blank optional fields to `None`.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.subject = self.subject.trim().to_string();
        if self.subject.is_empty() {
            return Err(ConfigError::EmptySubject);
        }
        self.chapter = non_blank(self.chapter);
        self.topic = non_blank(self.topic);
        if self.is_complete_syllabus() && self.chapter.is_some() {
            return Err(ConfigError::ChapterWithCompleteSyllabus);
        }
        if self.question_count == Limit::Bounded(0) {
            return Err(ConfigError::InvalidQuestionCount);
        }
        if self.time_limit == Limit::Bounded(0) {
            return Err(ConfigError::InvalidTimeLimit);
        }
        Ok(self)
    }

    /// Human readable scope used in prompts, e.g. "Brachial plexus in Upper limb of Anatomy".
    pub fn scope(&self) -> String {
        let mut scope = self.subject.clone();
        if let Some(chapter) = &self.chapter {
            scope = format!("{chapter} of {scope}");
        }
        if let Some(topic) = &self.topic {
            scope = format!("{topic} in {scope}");
        }
        scope
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---- Question ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Letter {
    A,
    B,
    C,
    D,
}

impl Letter {
    pub const ALL: [Letter; 4] = [Letter::A, Letter::B, Letter::C, Letter::D];

    pub fn from_char(c: char) -> Option<Letter> {
        match c.to_ascii_uppercase() {
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Letter::A => 'A',
            Letter::B => 'B',
            Letter::C => 'C',
            Letter::D => 'D',
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl Serialize for Letter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.as_char())
    }
}

impl<'de> Deserialize<'de> for Letter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let mut chars = text.trim().chars();
        match (chars.next().and_then(Letter::from_char), chars.next()) {
            (Some(letter), None) => Ok(letter),
            _ => Err(serde::de::Error::custom(format!("expected one of A, B, C, D, got {text:?}"))),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub label: Letter,
    pub text: String,
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}) {}", self.label, self.text)
    }
}

/// A generated multiple-choice question.
///
/// Built only by `provider::decode_question`, which guarantees four options
/// labelled A to D in order and a correct answer that names one of them.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    pub options: [AnswerOption; 4],
    pub correct_answer: Letter,
    pub explanation: String,
    pub subject: String,
}

impl Question {
    pub fn option(&self, label: Letter) -> &AnswerOption {
        &self.options[label as usize]
    }

    pub fn is_correct(&self, label: Letter) -> bool {
        self.correct_answer == label
    }
}
