//! Training unit content, answer collection and scoring.
//!
//! A unit's `content` is a JSON document whose shape is chosen by its
//! `unit_type`. Three types are answered and scored (quiz, fill-in-the-blank,
//! matching); the others are read-only. Tokens reported on completion are a
//! client-side estimate; the server keeps the authoritative totals.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use tracing::warn;

use crate::domain::UnitProgressUpdate;
use crate::error::ApiError;

pub const BASE_TOKENS: u32 = 10;
/// Seconds after which a unit earns the time bonus.
pub const LONG_SESSION_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitType {
    Definition,
    Example,
    FillBlank,
    Matching,
    Flashcard,
    Quiz,
    Unknown,
}

impl UnitType {
    pub fn parse(s: &str) -> Self {
        match s {
            "definition" => UnitType::Definition,
            "example" => UnitType::Example,
            "fill_blank" => UnitType::FillBlank,
            "matching" => UnitType::Matching,
            "flashcard" => UnitType::Flashcard,
            "quiz" => UnitType::Quiz,
            _ => UnitType::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UnitType::Definition => "Definition",
            UnitType::Example => "Example",
            UnitType::FillBlank => "Fill in the Blank",
            UnitType::Matching => "Matching",
            UnitType::Flashcard => "Flashcard",
            UnitType::Quiz => "Quiz",
            UnitType::Unknown => "Lesson",
        }
    }

    /// Answered and scored before completion.
    pub fn requires_submission(self) -> bool {
        matches!(self, UnitType::Quiz | UnitType::FillBlank | UnitType::Matching)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlankQuestion {
    pub text: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionContent {
    definition: String,
    #[serde(default)]
    explanation: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExampleContent {
    example: String,
    #[serde(default)]
    key_points: Vec<String>,
}

#[derive(Deserialize)]
struct QuestionsContent<Q> {
    questions: Vec<Q>,
}

#[derive(Deserialize)]
struct MatchingContent {
    terms: Vec<String>,
    definitions: Vec<String>,
}

#[derive(Deserialize)]
struct FlashcardContent {
    question: String,
    answer: String,
}

/// Parsed unit content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitBody {
    Definition {
        definition: String,
        explanation: Option<String>,
    },
    Example {
        example: String,
        key_points: Vec<String>,
    },
    FillBlank(Vec<BlankQuestion>),
    Matching {
        terms: Vec<String>,
        definitions: Vec<String>,
    },
    Flashcard {
        question: String,
        answer: String,
    },
    Quiz(Vec<QuizQuestion>),
    /// Unknown type or content that did not match its declared shape.
    Text(String),
}

impl UnitBody {
    pub fn parse(unit_type: &str, content: &str) -> Self {
        match Self::try_parse(UnitType::parse(unit_type), content) {
            Ok(body) => body,
            Err(e) => {
                warn!(unit_type, error = %e, "unit content did not match its type, showing as text");
                UnitBody::Text(plain_text(content))
            }
        }
    }

    fn try_parse(kind: UnitType, content: &str) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            UnitType::Definition => {
                let c: DefinitionContent = serde_json::from_str(content)?;
                UnitBody::Definition {
                    definition: c.definition,
                    explanation: c.explanation,
                }
            }
            UnitType::Example => {
                let c: ExampleContent = serde_json::from_str(content)?;
                UnitBody::Example {
                    example: c.example,
                    key_points: c.key_points,
                }
            }
            UnitType::FillBlank => {
                let c: QuestionsContent<BlankQuestion> = serde_json::from_str(content)?;
                UnitBody::FillBlank(c.questions)
            }
            UnitType::Matching => {
                let c: MatchingContent = serde_json::from_str(content)?;
                UnitBody::Matching {
                    terms: c.terms,
                    definitions: c.definitions,
                }
            }
            UnitType::Flashcard => {
                let c: FlashcardContent = serde_json::from_str(content)?;
                UnitBody::Flashcard {
                    question: c.question,
                    answer: c.answer,
                }
            }
            UnitType::Quiz => {
                let c: QuestionsContent<QuizQuestion> = serde_json::from_str(content)?;
                UnitBody::Quiz(c.questions)
            }
            UnitType::Unknown => UnitBody::Text(plain_text(content)),
        })
    }

    pub fn unit_type(&self) -> UnitType {
        match self {
            UnitBody::Definition { .. } => UnitType::Definition,
            UnitBody::Example { .. } => UnitType::Example,
            UnitBody::FillBlank(_) => UnitType::FillBlank,
            UnitBody::Matching { .. } => UnitType::Matching,
            UnitBody::Flashcard { .. } => UnitType::Flashcard,
            UnitBody::Quiz(_) => UnitType::Quiz,
            UnitBody::Text(_) => UnitType::Unknown,
        }
    }

    /// Number of answerable items (questions or terms).
    pub fn item_count(&self) -> usize {
        match self {
            UnitBody::FillBlank(q) => q.len(),
            UnitBody::Quiz(q) => q.len(),
            UnitBody::Matching { terms, .. } => terms.len(),
            _ => 0,
        }
    }
}

/// Best-effort readable text for content of unknown shape. A JSON string or
/// an object's `text` field is shown directly; other JSON is pretty-printed.
fn plain_text(content: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(serde_json::Value::Object(mut map))
            if map.get("text").is_some_and(serde_json::Value::is_string) =>
        {
            match map.remove("text") {
                Some(serde_json::Value::String(s)) => s,
                _ => content.to_string(),
            }
        }
        Ok(v @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
            serde_json::to_string_pretty(&v).unwrap_or_else(|_| content.to_string())
        }
        _ => content.to_string(),
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Answers given so far for one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    /// Quiz: question index → chosen option index.
    choices: BTreeMap<usize, usize>,
    /// Fill-in-the-blank: question index → typed text.
    blanks: BTreeMap<usize, String>,
    /// Matching: term index → shuffled definition position.
    matches: BTreeMap<usize, usize>,
    /// Shuffled definition position → original definition index.
    shuffle: Vec<usize>,
    submitted: bool,
}

impl AnswerSheet {
    pub fn new(body: &UnitBody) -> Self {
        Self::with_rng(body, &mut rand::thread_rng())
    }

    /// Matching definitions are shuffled once here and keep that order for
    /// the lifetime of the sheet.
    pub fn with_rng<R: Rng + ?Sized>(body: &UnitBody, rng: &mut R) -> Self {
        let mut sheet = Self::default();
        if let UnitBody::Matching { definitions, .. } = body {
            sheet.shuffle = (0..definitions.len()).collect();
            sheet.shuffle.shuffle(rng);
        }
        sheet
    }

    /// Definitions in display order.
    pub fn shuffled_definitions<'a>(&self, body: &'a UnitBody) -> Vec<&'a str> {
        match body {
            UnitBody::Matching { definitions, .. } => self
                .shuffle
                .iter()
                .filter_map(|&i| definitions.get(i).map(String::as_str))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn choose(&mut self, question: usize, option: usize) {
        if !self.submitted {
            self.choices.insert(question, option);
        }
    }

    pub fn choice(&self, question: usize) -> Option<usize> {
        self.choices.get(&question).copied()
    }

    pub fn set_blank(&mut self, question: usize, text: impl Into<String>) {
        if !self.submitted {
            self.blanks.insert(question, text.into());
        }
    }

    pub fn blank(&self, question: usize) -> &str {
        self.blanks.get(&question).map_or("", String::as_str)
    }

    /// Assign the definition at shuffled `position` to `term`. A position can
    /// back only one term; assigning it again moves it.
    pub fn assign(&mut self, term: usize, position: usize) {
        if self.submitted {
            return;
        }
        self.matches.retain(|_, p| *p != position);
        self.matches.insert(term, position);
    }

    pub fn unassign(&mut self, term: usize) {
        if !self.submitted {
            self.matches.remove(&term);
        }
    }

    pub fn assignment(&self, term: usize) -> Option<usize> {
        self.matches.get(&term).copied()
    }

    pub fn is_assigned(&self, position: usize) -> bool {
        self.matches.values().any(|p| *p == position)
    }

    pub fn all_answered(&self, body: &UnitBody) -> bool {
        match body {
            UnitBody::Quiz(qs) => (0..qs.len()).all(|i| self.choices.contains_key(&i)),
            UnitBody::FillBlank(qs) => (0..qs.len()).all(|i| !self.blank(i).trim().is_empty()),
            UnitBody::Matching { terms, .. } => {
                (0..terms.len()).all(|i| self.matches.contains_key(&i))
            }
            _ => true,
        }
    }

    /// Whether item `idx` is currently answered correctly.
    pub fn is_correct(&self, body: &UnitBody, idx: usize) -> bool {
        match body {
            UnitBody::Quiz(qs) => qs
                .get(idx)
                .is_some_and(|q| self.choice(idx) == Some(q.correct_answer)),
            UnitBody::FillBlank(qs) => qs
                .get(idx)
                .is_some_and(|q| normalize(self.blank(idx)) == normalize(&q.answer)),
            UnitBody::Matching { .. } => self
                .assignment(idx)
                .and_then(|p| self.shuffle.get(p))
                .is_some_and(|&original| original == idx),
            _ => false,
        }
    }

    /// Percentage of correct items, rounded. 0 for unscored units.
    pub fn score(&self, body: &UnitBody) -> u32 {
        let total = body.item_count();
        if total == 0 || !body.unit_type().requires_submission() {
            return 0;
        }
        let correct = (0..total).filter(|&i| self.is_correct(body, i)).count();
        ((correct as f64 / total as f64) * 100.0).round() as u32
    }

    /// Lock answers and return the score. Every item must be answered.
    pub fn submit(&mut self, body: &UnitBody) -> Result<u32, ApiError> {
        if !self.all_answered(body) {
            return Err(ApiError::Validation(
                "Please answer every question before submitting".into(),
            ));
        }
        self.submitted = true;
        Ok(self.score(body))
    }

    /// Clear answers for another attempt. The matching shuffle is kept.
    pub fn retry(&mut self) {
        self.choices.clear();
        self.blanks.clear();
        self.matches.clear();
        self.submitted = false;
    }

    /// Completion can be sent once scored units are submitted.
    pub fn can_complete(&self, body: &UnitBody) -> bool {
        !body.unit_type().requires_submission() || self.submitted
    }

    pub fn tokens_earned(&self, body: &UnitBody, time_spent_secs: u64) -> u32 {
        let score = (body.unit_type().requires_submission() && self.submitted)
            .then(|| self.score(body));
        tokens_earned(time_spent_secs, score)
    }

    /// Body for `POST /training/units/:id/progress`. The score is included
    /// only for scored unit types.
    pub fn completion_payload(&self, body: &UnitBody, time_spent_secs: u64) -> UnitProgressUpdate {
        UnitProgressUpdate {
            completed: true,
            time_spent: time_spent_secs,
            tokens_earned: self.tokens_earned(body, time_spent_secs),
            score: body
                .unit_type()
                .requires_submission()
                .then(|| self.score(body)),
        }
    }
}

/// Token estimate: base, plus a time bonus, plus a score bonus for a
/// submitted scored unit (`score` is `None` otherwise).
pub fn tokens_earned(time_spent_secs: u64, score: Option<u32>) -> u32 {
    let mut tokens = BASE_TOKENS;
    if time_spent_secs > LONG_SESSION_SECS {
        tokens += 5;
    }
    match score {
        Some(s) if s >= 90 => tokens += 10,
        Some(s) if s >= 80 => tokens += 5,
        _ => {}
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quiz() -> UnitBody {
        UnitBody::parse(
            "quiz",
            r#"{"questions":[
                {"question":"Q1","options":["a","b"],"correctAnswer":1},
                {"question":"Q2","options":["a","b","c"],"correctAnswer":0},
                {"question":"Q3","options":["a","b"],"correctAnswer":0}]}"#,
        )
    }

    #[test]
    fn parses_each_shape() {
        assert!(matches!(
            UnitBody::parse("definition", r#"{"definition":"d"}"#),
            UnitBody::Definition { explanation: None, .. }
        ));
        assert!(matches!(
            UnitBody::parse("example", r#"{"example":"e","keyPoints":["k"]}"#),
            UnitBody::Example { ref key_points, .. } if key_points.len() == 1
        ));
        assert!(matches!(
            UnitBody::parse("flashcard", r#"{"question":"q","answer":"a"}"#),
            UnitBody::Flashcard { .. }
        ));
        assert_eq!(quiz().item_count(), 3);
    }

    #[test]
    fn unknown_or_malformed_falls_back_to_text() {
        assert_eq!(
            UnitBody::parse("video", r#""watch this""#),
            UnitBody::Text("watch this".into())
        );
        assert!(matches!(UnitBody::parse("quiz", "{}"), UnitBody::Text(_)));
    }

    #[test]
    fn text_field_is_shown_directly() {
        assert_eq!(
            UnitBody::parse("reading", r#"{"text":"Stops limit losses.","level":2}"#),
            UnitBody::Text("Stops limit losses.".into())
        );
        assert_eq!(
            UnitBody::parse("quiz", r#"{"text":"Not a quiz yet"}"#),
            UnitBody::Text("Not a quiz yet".into())
        );
        let UnitBody::Text(shown) = UnitBody::parse("reading", r#"{"text":7}"#) else {
            panic!("expected text");
        };
        assert!(shown.contains("\"text\": 7"));
    }

    #[test]
    fn quiz_score_rounds() {
        let body = quiz();
        let mut sheet = AnswerSheet::new(&body);
        sheet.choose(0, 1);
        sheet.choose(1, 0);
        assert!(!sheet.all_answered(&body));
        assert!(sheet.submit(&body).is_err());
        sheet.choose(2, 1);
        assert_eq!(sheet.submit(&body).unwrap(), 67);
        sheet.choose(2, 0);
        assert_eq!(sheet.choice(2), Some(1), "answers lock after submit");
    }

    #[test]
    fn fill_blank_is_case_and_space_insensitive() {
        let body = UnitBody::parse(
            "fill_blank",
            r#"{"questions":[{"text":"RSI stands for ___","answer":"Relative Strength Index"}]}"#,
        );
        let mut sheet = AnswerSheet::new(&body);
        sheet.set_blank(0, "  relative strength INDEX ");
        assert_eq!(sheet.score(&body), 100);
    }

    #[test]
    fn matching_uses_shuffle_mapping() {
        let body = UnitBody::Matching {
            terms: vec!["bull".into(), "bear".into(), "flat".into()],
            definitions: vec!["up".into(), "down".into(), "sideways".into()],
        };
        let mut rng = StdRng::seed_from_u64(7);
        let mut sheet = AnswerSheet::with_rng(&body, &mut rng);
        let shown = sheet.shuffled_definitions(&body);
        assert_eq!(shown.len(), 3);

        for (term, want) in ["up", "down", "sideways"].iter().enumerate() {
            let pos = shown.iter().position(|d| d == want).unwrap();
            sheet.assign(term, pos);
        }
        assert!(sheet.all_answered(&body));
        assert_eq!(sheet.score(&body), 100);

        // Reassigning a position moves it off the previous term.
        let pos_up = sheet.assignment(0).unwrap();
        sheet.assign(1, pos_up);
        assert_eq!(sheet.assignment(0), None);
        assert!(!sheet.all_answered(&body));
    }

    #[test]
    fn token_heuristic() {
        assert_eq!(tokens_earned(10, None), 10);
        assert_eq!(tokens_earned(301, None), 15);
        assert_eq!(tokens_earned(300, Some(90)), 20);
        assert_eq!(tokens_earned(400, Some(85)), 20);
        assert_eq!(tokens_earned(0, Some(79)), 10);
    }

    #[test]
    fn payload_score_only_for_scored_units() {
        let card = UnitBody::parse("flashcard", r#"{"question":"q","answer":"a"}"#);
        let sheet = AnswerSheet::new(&card);
        let p = sheet.completion_payload(&card, 42);
        assert_eq!(p.score, None);
        assert_eq!(p.tokens_earned, 10);
        assert!(sheet.can_complete(&card));

        let body = quiz();
        let mut sheet = AnswerSheet::new(&body);
        assert!(!sheet.can_complete(&body));
        for i in 0..3 {
            sheet.choose(i, body_answer(&body, i));
        }
        sheet.submit(&body).unwrap();
        let p = sheet.completion_payload(&body, 42);
        assert_eq!(p.score, Some(100));
        assert_eq!(p.tokens_earned, 20);
    }

    fn body_answer(body: &UnitBody, i: usize) -> usize {
        match body {
            UnitBody::Quiz(qs) => qs[i].correct_answer,
            _ => 0,
        }
    }
}
