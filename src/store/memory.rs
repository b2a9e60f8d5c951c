//! Dataset-backed store.
//!
//! `MemoryStore` implements every store contract over a [`Dataset`] held in
//! memory. The CLI loads the dataset from a JSON file and can write it back
//! after mutations.

use super::{
    CourseLookup, EnrollmentRegistry, ReviewStore, SavedCoursesRegistry, StoreResult,
    StudentDirectory,
};
use crate::error::ReviewError;
use crate::models::{CourseMetadata, NewReview, Review, StudentSummary};
use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::{PoisonError, RwLock as StdRwLock};
use tokio::sync::RwLock;
use tracing::debug;

/// Serialized form of the whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Student considered signed in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user: Option<String>,

    #[serde(default)]
    pub courses: Vec<CourseMetadata>,

    #[serde(default)]
    pub students: Vec<StudentSummary>,

    /// Reviews in insertion order.
    #[serde(default)]
    pub reviews: Vec<Review>,

    /// Student id -> enrolled course ids.
    #[serde(default)]
    pub enrollments: BTreeMap<String, BTreeSet<String>>,

    /// Student id -> saved course ids.
    #[serde(default)]
    pub saved: BTreeMap<String, BTreeSet<String>>,
}

impl Dataset {
    /// Load a dataset from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset: {}", path.display()))?;

        let dataset: Dataset = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse dataset: {}", path.display()))?;

        Ok(dataset)
    }

    /// Write the dataset as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write dataset: {}", path.display()))
    }
}

/// Store operations, used to inject failures in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetCourse,
    GetReviewsByCourse,
    GetReviewsByStudent,
    InsertReview,
    DeleteReview,
    GetStudent,
    GetSaved,
    AddSaved,
    RemoveSaved,
    GetEnrolled,
}

/// In-memory implementation of every store contract.
pub struct MemoryStore {
    data: RwLock<Dataset>,
    current_user: Option<String>,
    faults: StdRwLock<HashSet<StoreOp>>,
}

impl MemoryStore {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            current_user: dataset.current_user.clone(),
            data: RwLock::new(dataset),
            faults: StdRwLock::new(HashSet::new()),
        }
    }

    /// Override the signed-in student. `None` keeps the dataset's value.
    pub fn with_current_user(mut self, student_id: Option<String>) -> Self {
        if student_id.is_some() {
            self.current_user = student_id;
        }
        self
    }

    /// Copy of the current contents.
    pub async fn snapshot(&self) -> Dataset {
        self.data.read().await.clone()
    }

    /// Make every subsequent call of `op` fail.
    #[cfg(test)]
    pub fn fail(&self, op: StoreOp) {
        self.faults
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(op);
    }

    /// Undo [`MemoryStore::fail`].
    #[cfg(test)]
    pub fn heal(&self, op: StoreOp) {
        self.faults
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&op);
    }

    fn check(&self, op: StoreOp) -> StoreResult<()> {
        let failing = self
            .faults
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&op);

        if failing {
            debug!("Injected failure for {:?}", op);
            Err(ReviewError::store(format!("{:?} unavailable", op)))
        } else {
            Ok(())
        }
    }
}

impl CourseLookup for MemoryStore {
    fn get_course_by_id<'a>(
        &'a self,
        course_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<CourseMetadata>>> {
        async move {
            self.check(StoreOp::GetCourse)?;
            let data = self.data.read().await;
            Ok(data
                .courses
                .iter()
                .find(|c| c.course_id == course_id)
                .cloned())
        }
        .boxed()
    }
}

impl ReviewStore for MemoryStore {
    fn get_reviews_by_course<'a>(
        &'a self,
        course_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<Review>>> {
        async move {
            self.check(StoreOp::GetReviewsByCourse)?;
            let data = self.data.read().await;
            Ok(data
                .reviews
                .iter()
                .filter(|r| r.course_id == course_id)
                .cloned()
                .collect())
        }
        .boxed()
    }

    fn get_reviews_by_student<'a>(
        &'a self,
        student_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<Review>>> {
        async move {
            self.check(StoreOp::GetReviewsByStudent)?;
            let data = self.data.read().await;
            Ok(data
                .reviews
                .iter()
                .filter(|r| r.student_id == student_id)
                .cloned()
                .collect())
        }
        .boxed()
    }

    fn insert_review(&self, review: NewReview) -> BoxFuture<'_, StoreResult<Review>> {
        async move {
            self.check(StoreOp::InsertReview)?;
            let mut data = self.data.write().await;

            if !data.courses.iter().any(|c| c.course_id == review.course_id) {
                return Err(ReviewError::not_found("Course", review.course_id));
            }

            // (student_id, course_id) is unique
            let exists = data
                .reviews
                .iter()
                .any(|r| r.student_id == review.student_id && r.course_id == review.course_id);
            if exists {
                return Err(ReviewError::DuplicateReview {
                    student_id: review.student_id,
                    course_id: review.course_id,
                });
            }

            let created_at = Utc::now();
            let stored = Review {
                review_id: format!(
                    "{}-{}-{}",
                    review.course_id,
                    review.student_id,
                    created_at.timestamp_millis()
                ),
                course_id: review.course_id,
                student_id: review.student_id,
                rating: review.rating,
                comment_text: review.comment_text,
                created_at,
            };
            data.reviews.push(stored.clone());

            debug!("Stored review {}", stored.review_id);
            Ok(stored)
        }
        .boxed()
    }

    fn delete_review<'a>(
        &'a self,
        review_id: &'a str,
        student_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>> {
        async move {
            self.check(StoreOp::DeleteReview)?;
            let mut data = self.data.write().await;

            let position = data
                .reviews
                .iter()
                .position(|r| r.review_id == review_id && r.student_id == student_id)
                .ok_or_else(|| ReviewError::not_found("Review", review_id))?;
            data.reviews.remove(position);

            debug!("Deleted review {}", review_id);
            Ok(())
        }
        .boxed()
    }
}

impl StudentDirectory for MemoryStore {
    fn get_student_by_id<'a>(
        &'a self,
        student_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<StudentSummary>>> {
        async move {
            self.check(StoreOp::GetStudent)?;
            let data = self.data.read().await;
            Ok(data
                .students
                .iter()
                .find(|s| s.student_id == student_id)
                .cloned())
        }
        .boxed()
    }

    fn current_user_id(&self) -> Option<String> {
        self.current_user.clone()
    }
}

impl SavedCoursesRegistry for MemoryStore {
    fn get_saved_course_ids<'a>(
        &'a self,
        student_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<HashSet<String>>> {
        async move {
            self.check(StoreOp::GetSaved)?;
            let data = self.data.read().await;
            Ok(data
                .saved
                .get(student_id)
                .map(|ids| ids.iter().cloned().collect())
                .unwrap_or_default())
        }
        .boxed()
    }

    fn add_saved<'a>(
        &'a self,
        student_id: &'a str,
        course_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>> {
        async move {
            self.check(StoreOp::AddSaved)?;
            let mut data = self.data.write().await;
            data.saved
                .entry(student_id.to_string())
                .or_default()
                .insert(course_id.to_string());
            Ok(())
        }
        .boxed()
    }

    fn remove_saved<'a>(
        &'a self,
        student_id: &'a str,
        course_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>> {
        async move {
            self.check(StoreOp::RemoveSaved)?;
            let mut data = self.data.write().await;
            if let Some(ids) = data.saved.get_mut(student_id) {
                ids.remove(course_id);
            }
            Ok(())
        }
        .boxed()
    }
}

impl EnrollmentRegistry for MemoryStore {
    fn get_enrolled_course_ids<'a>(
        &'a self,
        student_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<HashSet<String>>> {
        async move {
            self.check(StoreOp::GetEnrolled)?;
            let data = self.data.read().await;
            Ok(data
                .enrollments
                .get(student_id)
                .map(|ids| ids.iter().cloned().collect())
                .unwrap_or_default())
        }
        .boxed()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Rating;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn review(id: &str, course: &str, student: &str, rating: Rating) -> Review {
        Review {
            review_id: id.to_string(),
            course_id: course.to_string(),
            student_id: student.to_string(),
            rating,
            comment_text: format!("{} on {}", student, course),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        }
    }

    fn student(id: &str, name: &str) -> StudentSummary {
        StudentSummary {
            student_id: id.to_string(),
            display_name: name.to_string(),
            display_surname: "Demir".to_string(),
            cohort_year: "2024 Fall".to_string(),
            avatar_key: "orange".to_string(),
        }
    }

    /// Course c1 reviewed by s1 (3), s2 (1) and s3 (2); s2 is signed in.
    pub(crate) fn sample_dataset() -> Dataset {
        Dataset {
            current_user: Some("s2".to_string()),
            courses: vec![
                CourseMetadata {
                    course_id: "c1".to_string(),
                    course_code: "VCD 111".to_string(),
                    course_name: "Basic Drawing".to_string(),
                    department_id: Some("vcd".to_string()),
                },
                CourseMetadata {
                    course_id: "c2".to_string(),
                    course_code: "CMPE 101".to_string(),
                    course_name: "Introduction to Programming".to_string(),
                    department_id: None,
                },
            ],
            students: vec![
                student("s1", "Aylin"),
                student("s2", "Sila"),
                student("s3", "Mert"),
            ],
            reviews: vec![
                review("r1", "c1", "s1", Rating::Three),
                review("r2", "c1", "s2", Rating::One),
                review("r3", "c1", "s3", Rating::Two),
                review("r4", "c2", "s1", Rating::Two),
            ],
            enrollments: [
                ("s1".to_string(), ["c1", "c2"].iter().map(|s| s.to_string()).collect::<BTreeSet<_>>()),
                ("s2".to_string(), ["c1", "c2"].iter().map(|s| s.to_string()).collect::<BTreeSet<_>>()),
            ]
            .into_iter()
            .collect(),
            saved: [("s2".to_string(), ["c2".to_string()].into_iter().collect::<BTreeSet<_>>())]
                .into_iter()
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_reviews_by_course_in_store_order() {
        let store = MemoryStore::new(sample_dataset());
        let reviews = assert_ok!(store.get_reviews_by_course("c1").await);
        let ids: Vec<_> = reviews.iter().map(|r| r.review_id.as_str()).collect();

        assert_eq!(ids, vec!["r1", "r2", "r3"]);
    }

    #[tokio::test]
    async fn test_missing_course_is_none() {
        let store = MemoryStore::new(sample_dataset());
        assert_eq!(assert_ok!(store.get_course_by_id("nope").await), None);
    }

    #[tokio::test]
    async fn test_insert_enforces_uniqueness() {
        let store = MemoryStore::new(sample_dataset());
        let new_review = NewReview {
            course_id: "c2".to_string(),
            student_id: "s2".to_string(),
            rating: Rating::Three,
            comment_text: "Great".to_string(),
        };

        let stored = assert_ok!(store.insert_review(new_review.clone()).await);
        assert_eq!(stored.course_id, "c2");

        let err = assert_err!(store.insert_review(new_review).await);
        assert!(matches!(err, ReviewError::DuplicateReview { .. }));
    }

    #[tokio::test]
    async fn test_delete_is_owner_constrained() {
        let store = MemoryStore::new(sample_dataset());

        let err = assert_err!(store.delete_review("r1", "s2").await);
        assert!(matches!(err, ReviewError::NotFound { .. }));

        assert_ok!(store.delete_review("r2", "s2").await);
        let reviews = assert_ok!(store.get_reviews_by_course("c1").await);
        assert_eq!(reviews.len(), 2);
    }

    #[tokio::test]
    async fn test_saved_courses_toggle() {
        let store = MemoryStore::new(sample_dataset());

        assert_ok!(store.add_saved("s2", "c1").await);
        let saved = assert_ok!(store.get_saved_course_ids("s2").await);
        assert!(saved.contains("c1"));

        assert_ok!(store.remove_saved("s2", "c1").await);
        let saved = assert_ok!(store.get_saved_course_ids("s2").await);
        assert!(!saved.contains("c1"));
        assert!(saved.contains("c2"));
    }

    #[tokio::test]
    async fn test_injected_failure_and_heal() {
        let store = MemoryStore::new(sample_dataset());

        store.fail(StoreOp::GetEnrolled);
        let err = assert_err!(store.get_enrolled_course_ids("s1").await);
        assert!(matches!(err, ReviewError::StoreFailure(_)));

        store.heal(StoreOp::GetEnrolled);
        assert_ok!(store.get_enrolled_course_ids("s1").await);
    }

    #[test]
    fn test_current_user_override() {
        let store = MemoryStore::new(sample_dataset());
        assert_eq!(store.current_user_id(), Some("s2".to_string()));

        let store = MemoryStore::new(sample_dataset()).with_current_user(Some("s3".to_string()));
        assert_eq!(store.current_user_id(), Some("s3".to_string()));
    }

    #[test]
    fn test_dataset_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        let dataset = sample_dataset();

        dataset.save(&path).unwrap();
        let loaded = Dataset::load(&path).unwrap();

        assert_eq!(loaded, dataset);
    }

    #[test]
    fn test_bundled_fixture_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/catalog.json");
        let dataset = Dataset::load(&path).unwrap();

        assert_eq!(dataset.current_user.as_deref(), Some("s2"));
        assert_eq!(dataset.courses.len(), 3);
        assert!(dataset.reviews.iter().all(|r| r.rating.value() <= Rating::MAX));
        assert!(dataset.enrollments["s2"].contains("c1"));
    }
}
