//! Backend contracts consumed by the course detail engine.
//!
//! Every remote read or write is an async method returning a boxed,
//! `Send` future so collaborators can be shared as `Arc<dyn Trait>` and
//! driven from spawned tasks.

pub mod avatar;
pub mod memory;
pub mod network;

pub use avatar::AvatarCatalog;
pub use memory::{Dataset, MemoryStore};
pub use network::{HttpReachability, StaticReachability};

use crate::error::ReviewError;
use crate::models::{CourseMetadata, NewReview, Review, StudentSummary};
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::sync::Arc;

/// Result type for store calls.
pub type StoreResult<T> = Result<T, ReviewError>;

/// Course catalog lookups.
pub trait CourseLookup: Send + Sync {
    /// `Ok(None)` when the course does not exist.
    fn get_course_by_id<'a>(
        &'a self,
        course_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<CourseMetadata>>>;
}

/// Review persistence.
pub trait ReviewStore: Send + Sync {
    fn get_reviews_by_course<'a>(&'a self, course_id: &'a str)
        -> BoxFuture<'a, StoreResult<Vec<Review>>>;

    fn get_reviews_by_student<'a>(
        &'a self,
        student_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<Review>>>;

    /// Create a review. Fails with `DuplicateReview` if the student already
    /// reviewed the course.
    fn insert_review(&self, review: NewReview) -> BoxFuture<'_, StoreResult<Review>>;

    /// Delete a review owned by `student_id`.
    fn delete_review<'a>(
        &'a self,
        review_id: &'a str,
        student_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>>;
}

/// Student profiles and the signed-in identity.
pub trait StudentDirectory: Send + Sync {
    /// `Ok(None)` when the student does not exist.
    fn get_student_by_id<'a>(
        &'a self,
        student_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<StudentSummary>>>;

    fn current_user_id(&self) -> Option<String>;
}

/// A student's bookmarked courses.
pub trait SavedCoursesRegistry: Send + Sync {
    fn get_saved_course_ids<'a>(
        &'a self,
        student_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<HashSet<String>>>;

    fn add_saved<'a>(&'a self, student_id: &'a str, course_id: &'a str)
        -> BoxFuture<'a, StoreResult<()>>;

    fn remove_saved<'a>(
        &'a self,
        student_id: &'a str,
        course_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>>;
}

/// A student's course enrollments.
pub trait EnrollmentRegistry: Send + Sync {
    fn get_enrolled_course_ids<'a>(
        &'a self,
        student_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<HashSet<String>>>;
}

/// Maps avatar keys to presentable image references. Never fails.
pub trait AvatarResolver: Send + Sync {
    fn resolve_avatar(&self, avatar_key: &str) -> String;

    fn default_avatar(&self) -> String;
}

/// Connectivity check used before refreshes and submissions.
pub trait NetworkReachability: Send + Sync {
    fn is_reachable(&self) -> BoxFuture<'_, bool>;
}

/// Everything the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub courses: Arc<dyn CourseLookup>,
    pub reviews: Arc<dyn ReviewStore>,
    pub students: Arc<dyn StudentDirectory>,
    pub saved: Arc<dyn SavedCoursesRegistry>,
    pub enrollments: Arc<dyn EnrollmentRegistry>,
    pub avatars: Arc<dyn AvatarResolver>,
    pub network: Arc<dyn NetworkReachability>,
}

impl Collaborators {
    /// Use one `MemoryStore` for every store contract.
    pub fn from_memory(
        store: Arc<MemoryStore>,
        avatars: Arc<dyn AvatarResolver>,
        network: Arc<dyn NetworkReachability>,
    ) -> Self {
        Self {
            courses: store.clone(),
            reviews: store.clone(),
            students: store.clone(),
            saved: store.clone(),
            enrollments: store,
            avatars,
            network,
        }
    }
}
