use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier wrapper for job postings.
    JobId
);
string_id!(
    /// Identifier wrapper for candidates.
    CandidateId
);
string_id!(AssessmentId);
string_id!(SubmissionId);
string_id!(NoteId);

/// Position of a candidate in the hiring pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Applied,
    Screen,
    Tech,
    Offer,
    Hired,
    Rejected,
}

impl Stage {
    pub const fn ordered() -> [Stage; 6] {
        [
            Stage::Applied,
            Stage::Screen,
            Stage::Tech,
            Stage::Offer,
            Stage::Hired,
            Stage::Rejected,
        ]
    }

    /// Stages a candidate passes through on the way to a hire, in order.
    pub const fn funnel() -> [Stage; 5] {
        [
            Stage::Applied,
            Stage::Screen,
            Stage::Tech,
            Stage::Offer,
            Stage::Hired,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Stage::Applied => "Applied",
            Stage::Screen => "Screening",
            Stage::Tech => "Technical",
            Stage::Offer => "Offer",
            Stage::Hired => "Hired",
            Stage::Rejected => "Rejected",
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Stage::Applied => "applied",
            Stage::Screen => "screen",
            Stage::Tech => "tech",
            Stage::Offer => "offer",
            Stage::Hired => "hired",
            Stage::Rejected => "rejected",
        }
    }

    pub const fn rank(self) -> u8 {
        match self {
            Stage::Applied => 0,
            Stage::Screen => 1,
            Stage::Tech => 2,
            Stage::Offer => 3,
            Stage::Hired => 4,
            Stage::Rejected => 5,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Stage::Hired | Stage::Rejected)
    }

    /// Forward moves (skipping allowed) or a rejection; terminal stages never move.
    pub fn can_transition_to(self, to: Stage) -> bool {
        if self.is_terminal() || self == to {
            return false;
        }
        to == Stage::Rejected || to.rank() > self.rank()
    }

    pub fn parse(raw: &str) -> Option<Stage> {
        let needle = raw.trim().to_ascii_lowercase();
        Stage::ordered()
            .into_iter()
            .find(|stage| stage.key() == needle || stage.label().to_ascii_lowercase() == needle)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Active,
    Archived,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Active => "Active",
            JobStatus::Archived => "Archived",
        }
    }
}

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// 1-based page request, normalised so callers never see a zero page or oversized pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Pagination {
    pub fn new(page: Option<usize>, page_size: Option<usize>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    pub fn slice(items: Vec<T>, pagination: Pagination) -> Self {
        let total = items.len();
        let data = items
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.page_size)
            .collect();

        Self {
            data,
            total,
            page: pagination.page,
            page_size: pagination.page_size,
        }
    }
}

/// Single field-level problem reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Collected validation problems; never empty when returned as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub fields: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|error| error.field == field)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Trimmed, non-empty copy of the input.
pub(crate) fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
