//! Data models for course reviews.
//!
//! This module contains the records read from the stores (courses,
//! students, reviews) and the aggregated view published to consumers.

use crate::error::ReviewError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A review rating. Only 1, 2 and 3 are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Rating {
    One = 1,
    Two = 2,
    Three = 3,
}

impl Rating {
    /// Every valid rating, lowest first.
    pub const ALL: [Rating; 3] = [Rating::One, Rating::Two, Rating::Three];

    /// Highest possible rating.
    pub const MAX: u8 = 3;

    /// Numeric value of the rating.
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Rating {
    type Error = ReviewError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Rating::One),
            2 => Ok(Rating::Two),
            3 => Ok(Rating::Three),
            other => Err(ReviewError::InvalidRating(other)),
        }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.value()
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// One student's rating and comment for one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Unique identifier assigned at creation.
    pub review_id: String,
    /// Course the review is about.
    pub course_id: String,
    /// Author of the review.
    pub student_id: String,
    /// Rating (1-3).
    pub rating: Rating,
    /// Free-text comment, may be empty.
    #[serde(default)]
    pub comment_text: String,
    /// Creation time, used for recency ordering.
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Creation date as `dd/mm/yyyy`.
    pub fn formatted_date(&self) -> String {
        self.created_at.format("%d/%m/%Y").to_string()
    }
}

/// Input for creating a review. The store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub course_id: String,
    pub student_id: String,
    pub rating: Rating,
    pub comment_text: String,
}

/// Read-only projection of a student used for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub student_id: String,
    pub display_name: String,
    #[serde(default)]
    pub display_surname: String,
    #[serde(default)]
    pub cohort_year: String,
    /// Opaque key resolved to an image by an `AvatarResolver`.
    #[serde(default)]
    pub avatar_key: String,
}

impl StudentSummary {
    /// Placeholder identity for reviews whose author could not be resolved.
    pub fn anonymous(student_id: &str, name: &str) -> Self {
        Self {
            student_id: student_id.to_string(),
            display_name: name.to_string(),
            display_surname: String::new(),
            cohort_year: String::new(),
            avatar_key: String::new(),
        }
    }

    /// Name and surname joined for display.
    pub fn full_name(&self) -> String {
        if self.display_surname.is_empty() {
            self.display_name.clone()
        } else {
            format!("{} {}", self.display_name, self.display_surname)
        }
    }
}

/// Catalog metadata for a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseMetadata {
    pub course_id: String,
    pub course_code: String,
    pub course_name: String,
    /// Owning department, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
}

/// A review joined with its author's identity and resolved avatar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub review: Review,
    pub student: StudentSummary,
    /// Presentable image reference for the author.
    pub avatar: String,
}

/// Count of reviews per rating value.
pub type RatingHistogram = BTreeMap<u8, usize>;

/// Display-ready state of a course detail screen. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedCourseView {
    pub course_id: String,
    pub course_code: String,
    pub course_name: String,
    /// Avatar of the viewing student.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_avatar: Option<String>,
    /// The viewing student's own review, if any.
    pub my_review: Option<ReviewEntry>,
    /// Everyone else's reviews, in store order.
    pub other_reviews: Vec<ReviewEntry>,
    pub is_course_saved: bool,
    pub is_enrolled: bool,
    pub has_already_reviewed: bool,
    /// Mean rating over all reviews, unrounded.
    pub average_rating: f64,
    pub review_count: usize,
    pub rating_histogram: RatingHistogram,
    /// True while a load is in flight.
    pub is_loading: bool,
}

impl AggregatedCourseView {
    /// Empty view for a course that has not been loaded yet.
    pub fn new(course_id: &str) -> Self {
        Self {
            course_id: course_id.to_string(),
            ..Self::default()
        }
    }

    /// Average rating rounded to the nearest whole star.
    pub fn rounded_rating(&self) -> u8 {
        self.average_rating.round().clamp(0.0, Rating::MAX as f64) as u8
    }
}
