//! Assessment builder types and the rules that keep a saved assessment coherent.
//!
//! Each job owns at most one assessment. Questions are grouped into sections and come in six
//! kinds; any question may be made conditional on an earlier answer via `show_if`.

mod responses;

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    non_blank, AssessmentId, CandidateId, JobId, SubmissionId, ValidationErrors,
};

pub use responses::{Answer, EvaluatedResponse, FileAnswer};

pub const SHORT_TEXT_DEFAULT_MAX: usize = 200;
pub const LONG_TEXT_DEFAULT_MAX: usize = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: AssessmentId,
    pub job_id: JobId,
    pub title: String,
    pub sections: Vec<Section>,
    pub updated_at: DateTime<Utc>,
}

impl Assessment {
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections
            .iter()
            .flat_map(|section| section.questions.iter())
    }

    pub fn question_count(&self) -> usize {
        self.questions().count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub validation: QuestionValidation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_if: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice {
        options: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correct: Option<String>,
    },
    MultiChoice {
        options: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        correct: Vec<String>,
    },
    ShortText,
    LongText,
    Numeric,
    FileUpload,
}

impl QuestionKind {
    pub const fn label(&self) -> &'static str {
        match self {
            QuestionKind::SingleChoice { .. } => "single_choice",
            QuestionKind::MultiChoice { .. } => "multi_choice",
            QuestionKind::ShortText => "short_text",
            QuestionKind::LongText => "long_text",
            QuestionKind::Numeric => "numeric",
            QuestionKind::FileUpload => "file_upload",
        }
    }

    fn options(&self) -> Option<&[String]> {
        match self {
            QuestionKind::SingleChoice { options, .. } | QuestionKind::MultiChoice { options, .. } => {
                Some(options)
            }
            _ => None,
        }
    }

    pub fn is_gradable(&self) -> bool {
        match self {
            QuestionKind::SingleChoice { correct, .. } => correct.is_some(),
            QuestionKind::MultiChoice { correct, .. } => !correct.is_empty(),
            _ => false,
        }
    }
}

/// Per-question bounds; only the fields meaningful for the question kind apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Shows a question only when an earlier question was answered with `equals`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub question_id: String,
    pub equals: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentDraft {
    pub title: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl AssessmentDraft {
    /// Reports every structural problem at once so the builder can highlight them together.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if non_blank(&self.title).is_none() {
            errors.push("title", "title is required");
        }
        if self.sections.is_empty() {
            errors.push("sections", "at least one section is required");
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for (index, section) in self.sections.iter().enumerate() {
            if non_blank(&section.title).is_none() {
                errors.push(format!("sections.{index}.title"), "section title is required");
            }

            for question in &section.questions {
                let field = format!("questions.{}", question.id);
                if non_blank(&question.id).is_none() {
                    errors.push(
                        format!("sections.{index}.questions"),
                        "question id is required",
                    );
                    continue;
                }

                if let Some(condition) = &question.show_if {
                    if !seen.contains(condition.question_id.as_str()) {
                        errors.push(
                            format!("{field}.show_if"),
                            format!(
                                "condition must reference an earlier question (got '{}')",
                                condition.question_id
                            ),
                        );
                    }
                }

                if !seen.insert(question.id.as_str()) {
                    errors.push(field.clone(), "question id must be unique");
                }
                if non_blank(&question.prompt).is_none() {
                    errors.push(format!("{field}.prompt"), "prompt is required");
                }

                validate_kind(question, &field, &mut errors);
                validate_bounds(&question.validation, &field, &mut errors);
            }
        }

        errors.into_result()
    }
}

fn validate_kind(question: &Question, field: &str, errors: &mut ValidationErrors) {
    let Some(options) = question.kind.options() else {
        return;
    };

    let mut distinct: HashSet<&str> = HashSet::new();
    let blank = options.iter().any(|option| option.trim().is_empty());
    let duplicates = !options.iter().all(|option| distinct.insert(option.as_str()));
    if options.len() < 2 || blank || duplicates {
        errors.push(
            format!("{field}.options"),
            "choice questions need at least two distinct, non-empty options",
        );
    }

    let stray = match &question.kind {
        QuestionKind::SingleChoice {
            correct: Some(correct),
            ..
        } => !options.contains(correct),
        QuestionKind::MultiChoice { correct, .. } => {
            correct.iter().any(|value| !options.contains(value))
        }
        _ => false,
    };
    if stray {
        errors.push(
            format!("{field}.correct"),
            "correct answers must be among the options",
        );
    }
}

fn validate_bounds(validation: &QuestionValidation, field: &str, errors: &mut ValidationErrors) {
    if let (Some(min), Some(max)) = (validation.min, validation.max) {
        if min > max {
            errors.push(format!("{field}.validation"), "min must not exceed max");
        }
    }
    if let (Some(min), Some(max)) = (validation.min_length, validation.max_length) {
        if min > max {
            errors.push(
                format!("{field}.validation"),
                "min_length must not exceed max_length",
            );
        }
    }
}

/// A candidate's stored responses to a job's assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub assessment_id: AssessmentId,
    pub job_id: JobId,
    pub candidate_id: CandidateId,
    pub answers: BTreeMap<String, Answer>,
    pub score: Option<u8>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionDraft {
    pub candidate_id: CandidateId,
    #[serde(default)]
    pub answers: BTreeMap<String, Answer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, kind: QuestionKind) -> Question {
        Question {
            id: id.to_string(),
            prompt: format!("Prompt for {id}"),
            required: false,
            kind,
            validation: QuestionValidation::default(),
            show_if: None,
        }
    }

    fn draft(questions: Vec<Question>) -> AssessmentDraft {
        AssessmentDraft {
            title: "Backend screen".to_string(),
            sections: vec![Section {
                id: "s1".to_string(),
                title: "Basics".to_string(),
                questions,
            }],
        }
    }

    fn choice(options: &[&str]) -> QuestionKind {
        QuestionKind::SingleChoice {
            options: options.iter().map(|o| o.to_string()).collect(),
            correct: None,
        }
    }

    #[test]
    fn accepts_well_formed_draft() {
        let mut follow_up = question("q2", QuestionKind::LongText);
        follow_up.show_if = Some(Condition {
            question_id: "q1".to_string(),
            equals: "Yes".to_string(),
        });
        let draft = draft(vec![question("q1", choice(&["Yes", "No"])), follow_up]);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn reports_all_structural_problems() {
        let mut forward_ref = question("q3", QuestionKind::ShortText);
        forward_ref.show_if = Some(Condition {
            question_id: "q9".to_string(),
            equals: "x".to_string(),
        });
        let mut bounds = question("q4", QuestionKind::Numeric);
        bounds.validation = QuestionValidation {
            min: Some(10.0),
            max: Some(1.0),
            ..QuestionValidation::default()
        };

        let mut draft = draft(vec![
            question("q1", choice(&["Only"])),
            question("q1", QuestionKind::ShortText),
            forward_ref,
            bounds,
        ]);
        draft.title = " ".to_string();

        let errors = draft.validate().expect_err("draft is invalid");
        assert!(errors.has_field("title"));
        assert!(errors.has_field("questions.q1.options"));
        assert!(errors.has_field("questions.q1"));
        assert!(errors.has_field("questions.q3.show_if"));
        assert!(errors.has_field("questions.q4.validation"));
    }

    #[test]
    fn correct_answers_must_be_options() {
        let draft = draft(vec![question(
            "q1",
            QuestionKind::MultiChoice {
                options: vec!["Rust".to_string(), "Go".to_string()],
                correct: vec!["Zig".to_string()],
            },
        )]);
        let errors = draft.validate().expect_err("stray correct answer");
        assert!(errors.has_field("questions.q1.correct"));
    }

    #[test]
    fn question_kind_round_trips_through_json() {
        let json = serde_json::json!({
            "id": "q1",
            "prompt": "Years of Rust?",
            "required": true,
            "kind": "numeric",
            "validation": { "min": 0.0, "max": 40.0 }
        });
        let question: Question = serde_json::from_value(json).expect("question parses");
        assert_eq!(question.kind, QuestionKind::Numeric);
        assert_eq!(question.validation.max, Some(40.0));
    }
}
