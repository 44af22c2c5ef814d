use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::{
    Assessment, Condition, Question, QuestionKind, LONG_TEXT_DEFAULT_MAX, SHORT_TEXT_DEFAULT_MAX,
};
use crate::pipeline::domain::ValidationErrors;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Text(String),
    Choice(String),
    Choices(Vec<String>),
    Number(f64),
    File(FileAnswer),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAnswer {
    pub name: String,
    #[serde(default)]
    pub size_bytes: u64,
}

impl Answer {
    fn is_empty(&self) -> bool {
        match self {
            Answer::Text(text) | Answer::Choice(text) => text.trim().is_empty(),
            Answer::Choices(values) => values.is_empty(),
            Answer::Number(value) => value.is_nan(),
            Answer::File(file) => file.name.trim().is_empty(),
        }
    }

    fn satisfies(&self, condition: &Condition) -> bool {
        let expected = condition.equals.trim();
        match self {
            Answer::Text(value) | Answer::Choice(value) => value.trim() == expected,
            Answer::Choices(values) => values.iter().any(|value| value.trim() == expected),
            Answer::Number(value) => expected
                .parse::<f64>()
                .is_ok_and(|expected| (expected - value).abs() < f64::EPSILON),
            Answer::File(_) => false,
        }
    }
}

/// Answers kept after validation, restricted to visible questions, plus the computed score.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedResponse {
    pub answers: BTreeMap<String, Answer>,
    pub score: Option<u8>,
}

impl Assessment {
    /// Questions shown for the given answers, in builder order.
    pub fn visible_questions(&self, answers: &BTreeMap<String, Answer>) -> Vec<&Question> {
        let mut visible_ids: HashSet<&str> = HashSet::new();
        let mut visible = Vec::new();

        for question in self.questions() {
            let shown = match &question.show_if {
                None => true,
                Some(condition) => {
                    visible_ids.contains(condition.question_id.as_str())
                        && answers
                            .get(&condition.question_id)
                            .is_some_and(|answer| answer.satisfies(condition))
                }
            };
            if shown {
                visible_ids.insert(question.id.as_str());
                visible.push(question);
            }
        }

        visible
    }

    /// Validates responses against the visible questions and scores the gradable ones.
    pub fn evaluate(
        &self,
        answers: &BTreeMap<String, Answer>,
    ) -> Result<EvaluatedResponse, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let mut kept = BTreeMap::new();
        let mut gradable = 0u32;
        let mut correct = 0u32;

        for question in self.visible_questions(answers) {
            let field = format!("answers.{}", question.id);
            let answer = answers.get(&question.id).filter(|answer| !answer.is_empty());

            let Some(answer) = answer else {
                if question.required {
                    errors.push(field, "an answer is required");
                }
                if question.kind.is_gradable() {
                    gradable += 1;
                }
                continue;
            };

            if let Err(message) = check_answer(question, answer) {
                errors.push(field, message);
                continue;
            }

            if question.kind.is_gradable() {
                gradable += 1;
                if is_correct(&question.kind, answer) {
                    correct += 1;
                }
            }
            kept.insert(question.id.clone(), answer.clone());
        }

        errors.into_result()?;

        let score = (gradable > 0)
            .then(|| ((f64::from(correct) * 100.0) / f64::from(gradable)).round() as u8);

        Ok(EvaluatedResponse {
            answers: kept,
            score,
        })
    }
}

fn check_answer(question: &Question, answer: &Answer) -> Result<(), String> {
    let rules = &question.validation;

    match (&question.kind, answer) {
        (QuestionKind::SingleChoice { options, .. }, Answer::Choice(value)) => {
            if options.contains(value) {
                Ok(())
            } else {
                Err(format!("'{value}' is not one of the options"))
            }
        }
        (QuestionKind::MultiChoice { options, .. }, Answer::Choices(values)) => {
            match values.iter().find(|value| !options.contains(value)) {
                Some(value) => Err(format!("'{value}' is not one of the options")),
                None => Ok(()),
            }
        }
        (QuestionKind::ShortText, Answer::Text(text)) => {
            check_length(text, rules.min_length, rules.max_length, SHORT_TEXT_DEFAULT_MAX)
        }
        (QuestionKind::LongText, Answer::Text(text)) => {
            check_length(text, rules.min_length, rules.max_length, LONG_TEXT_DEFAULT_MAX)
        }
        (QuestionKind::Numeric, Answer::Number(value)) => {
            if !value.is_finite() {
                return Err("answer must be a finite number".to_string());
            }
            if let Some(min) = rules.min.filter(|min| value < min) {
                return Err(format!("answer must be at least {min}"));
            }
            if let Some(max) = rules.max.filter(|max| value > max) {
                return Err(format!("answer must be at most {max}"));
            }
            Ok(())
        }
        (QuestionKind::FileUpload, Answer::File(_)) => Ok(()),
        (kind, _) => Err(format!("answer type does not match a {} question", kind.label())),
    }
}

fn check_length(
    text: &str,
    min_length: Option<usize>,
    max_length: Option<usize>,
    default_max: usize,
) -> Result<(), String> {
    let length = text.trim().chars().count();
    let max = max_length.unwrap_or(default_max);
    if let Some(min) = min_length.filter(|min| length < *min) {
        return Err(format!("answer must be at least {min} characters"));
    }
    if length > max {
        return Err(format!("answer must be at most {max} characters"));
    }
    Ok(())
}

fn is_correct(kind: &QuestionKind, answer: &Answer) -> bool {
    match (kind, answer) {
        (
            QuestionKind::SingleChoice {
                correct: Some(expected),
                ..
            },
            Answer::Choice(value),
        ) => value == expected,
        (QuestionKind::MultiChoice { correct, .. }, Answer::Choices(values)) => {
            let expected: BTreeSet<&String> = correct.iter().collect();
            let given: BTreeSet<&String> = values.iter().collect();
            expected == given
        }
        _ => false,
    }
}
