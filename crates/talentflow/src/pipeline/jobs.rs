use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{non_blank, JobId, JobStatus, Pagination, ValidationErrors};

/// A posting on the jobs board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub slug: String,
    pub status: JobStatus,
    pub department: Option<String>,
    pub location: Option<String>,
    /// Dense 1-based rank used for manual ordering on the board.
    pub order: u32,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDraft {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSort {
    #[default]
    Order,
    Title,
    CreatedAt,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub sort: JobSort,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl JobQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.page_size)
    }

    pub fn matches(&self, job: &Job) -> bool {
        if self.status.is_some_and(|status| status != job.status) {
            return false;
        }

        if let Some(tag) = self.tag.as_deref().and_then(non_blank) {
            if !job.tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
                return false;
            }
        }

        match self.search.as_deref().and_then(non_blank) {
            Some(needle) => {
                let needle = needle.to_lowercase();
                job.title.to_lowercase().contains(&needle)
                    || job.slug.contains(&needle)
                    || job.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }

    pub fn sort(&self, jobs: &mut [Job]) {
        match self.sort {
            JobSort::Order => jobs.sort_by_key(|job| job.order),
            JobSort::Title => jobs.sort_by(|a, b| {
                a.title
                    .to_lowercase()
                    .cmp(&b.title.to_lowercase())
                    .then(a.order.cmp(&b.order))
            }),
            JobSort::CreatedAt => {
                jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.order.cmp(&b.order)))
            }
        }
    }
}

/// Request to move a job from one board position to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub from_order: u32,
    pub to_order: u32,
}

/// Lowercase ASCII slug; runs of anything else collapse to a single `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

pub(crate) fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags.iter().filter_map(|tag| non_blank(tag)) {
        if !normalized.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            normalized.push(tag);
        }
    }
    normalized
}

/// Validated shape of a new job, before ids and ordering are assigned.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NewJob {
    pub(crate) title: String,
    pub(crate) slug: String,
    pub(crate) department: Option<String>,
    pub(crate) location: Option<String>,
    pub(crate) tags: Vec<String>,
    pub(crate) description: Option<String>,
}

impl JobDraft {
    pub(crate) fn validate(&self) -> Result<NewJob, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = non_blank(&self.title);
        if title.is_none() {
            errors.push("title", "title is required");
        }

        let slug = match self.slug.as_deref().and_then(non_blank) {
            Some(explicit) => slugify(&explicit),
            None => title.as_deref().map(slugify).unwrap_or_default(),
        };
        if title.is_some() && slug.is_empty() {
            errors.push("slug", "slug must contain at least one letter or digit");
        }

        errors.into_result()?;

        Ok(NewJob {
            title: title.unwrap_or_default(),
            slug,
            department: self.department.as_deref().and_then(non_blank),
            location: self.location.as_deref().and_then(non_blank),
            tags: normalize_tags(&self.tags),
            description: self.description.as_deref().and_then(non_blank),
        })
    }
}

impl JobPatch {
    /// Applies the patch to a copy of `job`, validating the touched fields.
    pub(crate) fn apply(&self, job: &Job) -> Result<Job, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let mut updated = job.clone();

        if let Some(title) = &self.title {
            match non_blank(title) {
                Some(title) => updated.title = title,
                None => errors.push("title", "title is required"),
            }
        }

        if let Some(slug) = &self.slug {
            let slug = slugify(slug);
            if slug.is_empty() {
                errors.push("slug", "slug must contain at least one letter or digit");
            } else {
                updated.slug = slug;
            }
        }

        if let Some(status) = self.status {
            updated.status = status;
        }
        if let Some(department) = &self.department {
            updated.department = non_blank(department);
        }
        if let Some(location) = &self.location {
            updated.location = non_blank(location);
        }
        if let Some(tags) = &self.tags {
            updated.tags = normalize_tags(tags);
        }
        if let Some(description) = &self.description {
            updated.description = non_blank(description);
        }

        errors.into_result()?;
        Ok(updated)
    }
}

/// New `order` value for a job currently at `order` after moving `from` to `to`.
pub(crate) fn shifted_order(order: u32, from: u32, to: u32) -> u32 {
    if order == from {
        to
    } else if from < to && order > from && order <= to {
        order - 1
    } else if from > to && order >= to && order < from {
        order + 1
    } else {
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(order: u32, title: &str, tags: &[&str]) -> Job {
        let now = Utc::now();
        Job {
            id: JobId(format!("job-{order:06}")),
            title: title.to_string(),
            slug: slugify(title),
            status: JobStatus::Active,
            department: None,
            location: None,
            order,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("  Senior Rust Engineer (Remote) "), "senior-rust-engineer-remote");
        assert_eq!(slugify("C++ / Embedded"), "c-embedded");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn draft_requires_title_and_derives_slug() {
        let err = JobDraft::default().validate().expect_err("title missing");
        assert!(err.has_field("title"));

        let draft = JobDraft {
            title: " Data Engineer ".to_string(),
            tags: vec!["SQL".to_string(), "sql".to_string(), " ".to_string()],
            ..JobDraft::default()
        };
        let job = draft.validate().expect("valid draft");
        assert_eq!(job.title, "Data Engineer");
        assert_eq!(job.slug, "data-engineer");
        assert_eq!(job.tags, vec!["SQL".to_string()]);
    }

    #[test]
    fn query_matches_search_tag_and_status() {
        let rust = job(1, "Rust Engineer", &["backend"]);
        let mut archived = job(2, "Designer", &["ui"]);
        archived.status = JobStatus::Archived;

        let search = JobQuery {
            search: Some("BACKEND".to_string()),
            ..JobQuery::default()
        };
        assert!(search.matches(&rust));
        assert!(!search.matches(&archived));

        let status = JobQuery {
            status: Some(JobStatus::Archived),
            ..JobQuery::default()
        };
        assert!(status.matches(&archived));
        assert!(!status.matches(&rust));

        let tag = JobQuery {
            tag: Some("UI".to_string()),
            ..JobQuery::default()
        };
        assert!(tag.matches(&archived));
    }

    #[test]
    fn patch_rejects_blank_title() {
        let original = job(1, "Rust Engineer", &[]);
        let patch = JobPatch {
            title: Some("   ".to_string()),
            ..JobPatch::default()
        };
        assert!(patch.apply(&original).is_err());
    }

    #[test]
    fn shifted_order_keeps_ranking_dense() {
        // move 2 -> 4 over [1, 2, 3, 4, 5]
        let moved: Vec<u32> = (1..=5).map(|order| shifted_order(order, 2, 4)).collect();
        assert_eq!(moved, vec![1, 4, 2, 3, 5]);

        // move 5 -> 1
        let moved: Vec<u32> = (1..=5).map(|order| shifted_order(order, 5, 1)).collect();
        assert_eq!(moved, vec![2, 3, 4, 5, 1]);
    }
}
