//! Error types for the review engine.
//!
//! Collaborator failures are converted into [`ReviewError`] at the call
//! site. The engine decides per field whether a failure degrades the view
//! or only produces a notification.

use thiserror::Error;

/// Boxed opaque cause carried by [`ReviewError::StoreFailure`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported by stores and by the aggregation engine.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// No student is signed in.
    #[error("User not logged in")]
    NotAuthenticated,

    /// A course, student or review does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The underlying read or write failed.
    #[error("Store operation failed")]
    StoreFailure(#[source] BoxError),

    /// Network is not reachable.
    #[error("No internet connection")]
    Unreachable,

    /// Ratings are limited to 1, 2 or 3.
    #[error("Invalid rating {0}: expected 1, 2 or 3")]
    InvalidRating(u8),

    /// The student already has a review for this course.
    #[error("Student {student_id} already reviewed course {course_id}")]
    DuplicateReview {
        student_id: String,
        course_id: String,
    },

    /// Only enrolled students may review a course.
    #[error("Student is not enrolled in course {course_id}")]
    NotEnrolled { course_id: String },
}

impl ReviewError {
    /// Wrap any error (or message) as a store failure.
    pub fn store(cause: impl Into<BoxError>) -> Self {
        ReviewError::StoreFailure(cause.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ReviewError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_store_failure_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline exceeded");
        let err = ReviewError::store(io);

        assert_eq!(err.to_string(), "Store operation failed");
        assert_eq!(
            err.source().map(|s| s.to_string()).as_deref(),
            Some("deadline exceeded")
        );
    }

    #[test]
    fn test_store_failure_cause_printed_once() {
        let err = anyhow::Error::new(ReviewError::store("disk full"));
        let chain = format!("{:#}", err);

        assert_eq!(chain, "Store operation failed: disk full");
        assert_eq!(chain.matches("disk full").count(), 1);
    }

    #[test]
    fn test_not_found_message() {
        let err = ReviewError::not_found("Course", "c42");
        assert_eq!(err.to_string(), "Course not found: c42");
    }
}
