//! Course detail engine.
//!
//! Builds an [`AggregatedCourseView`] for one course and one student by
//! fanning out independent reads to the stores, joining them, and then
//! aggregating the course's reviews. Also owns the operations that change
//! the student's relationship to the course (save, review, delete).
//!
//! Every load or refresh takes a new generation number. Results are only
//! published while their generation is still the latest, so a slow load
//! can never overwrite the result of a newer one.

use crate::analysis::{aggregate_reviews, has_reviewed_course, ReviewSection};
use crate::engine::notifications::{self, Notification, NotificationSender, Notifications};
use crate::error::ReviewError;
use crate::models::{AggregatedCourseView, NewReview, Rating, Review, ReviewEntry, StudentSummary};
use crate::store::Collaborators;
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Tunables for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pause between clearing the review list and re-fetching it.
    pub refresh_delay: Duration,
    /// Display name for reviews whose author cannot be resolved.
    pub anonymous_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_delay: Duration::from_millis(500),
            anonymous_name: "Anonymous".to_string(),
        }
    }
}

impl From<&crate::config::EngineSettings> for EngineConfig {
    fn from(settings: &crate::config::EngineSettings) -> Self {
        Self {
            refresh_delay: Duration::from_millis(settings.refresh_delay_ms),
            anonymous_name: settings.anonymous_name.clone(),
        }
    }
}

/// Whether a load's result reached the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publication {
    Published,
    /// A newer load or refresh started first; the result was discarded.
    Superseded,
}

/// Aggregates a course's reviews and the viewing student's relationship to it.
pub struct CourseDetailEngine {
    deps: Collaborators,
    config: EngineConfig,
    state: watch::Sender<AggregatedCourseView>,
    notifier: NotificationSender,
    generation: AtomicU64,
}

impl CourseDetailEngine {
    /// Create an engine and the single receiver for its notifications.
    pub fn new(deps: Collaborators, config: EngineConfig) -> (Self, Notifications) {
        let (notifier, notifications) = notifications::channel();
        let (state, _) = watch::channel(AggregatedCourseView::default());

        let engine = Self {
            deps,
            config,
            state,
            notifier,
            generation: AtomicU64::new(0),
        };

        (engine, notifications)
    }

    /// Snapshot of the latest published view.
    pub fn view(&self) -> AggregatedCourseView {
        self.state.borrow().clone()
    }

    /// Observe the view; receivers see every publication.
    pub fn subscribe(&self) -> watch::Receiver<AggregatedCourseView> {
        self.state.subscribe()
    }

    /// Load for the signed-in student.
    pub async fn load_for_current_user(&self, course_id: &str) -> Result<Publication, ReviewError> {
        match self.deps.students.current_user_id() {
            Some(student_id) => Ok(self.load(course_id, &student_id).await),
            None => {
                warn!("Cannot load course {}: no signed-in student", course_id);
                self.notifier
                    .send(Notification::error(ReviewError::NotAuthenticated.to_string()));
                Err(ReviewError::NotAuthenticated)
            }
        }
    }

    /// Fetch everything the course view needs and publish it in one step.
    ///
    /// Failed reads degrade their own fields and queue an error
    /// notification; they never abort the load.
    pub async fn load(&self, course_id: &str, student_id: &str) -> Publication {
        let generation = self.begin(|view| {
            if view.course_id != course_id {
                *view = AggregatedCourseView::new(course_id);
            }
            view.is_loading = true;
        });
        info!(
            "Loading course {} for student {} (generation {})",
            course_id, student_id, generation
        );

        let (course, saved, enrolled, authored, viewer, reviews) = futures::join!(
            self.deps.courses.get_course_by_id(course_id),
            self.deps.saved.get_saved_course_ids(student_id),
            self.deps.enrollments.get_enrolled_course_ids(student_id),
            self.deps.reviews.get_reviews_by_student(student_id),
            self.deps.students.get_student_by_id(student_id),
            self.collect_reviews(course_id, student_id),
        );

        let mut view = AggregatedCourseView::new(course_id);
        let mut notes = Vec::new();

        match course {
            Ok(Some(course)) => {
                view.course_code = course.course_code;
                view.course_name = course.course_name;
            }
            Ok(None) => {
                warn!("{}", ReviewError::not_found("Course", course_id));
                notes.push(Notification::error("Error fetching course details"));
            }
            Err(e) => {
                warn!("Course lookup failed for {}: {}", course_id, e);
                notes.push(Notification::error("Error fetching course details"));
            }
        }

        match saved {
            Ok(ids) => view.is_course_saved = ids.contains(course_id),
            Err(e) => {
                warn!("Saved courses lookup failed: {}", e);
                notes.push(Notification::error("Could not fetch saved courses"));
            }
        }

        match enrolled {
            Ok(ids) => view.is_enrolled = ids.contains(course_id),
            Err(e) => {
                warn!("Enrollment lookup failed: {}", e);
                notes.push(Notification::error("Failed to fetch enrolled courses"));
            }
        }

        // Pre-check only; replaced below when the review list loads.
        view.has_already_reviewed = match authored {
            Ok(reviews) => has_reviewed_course(&reviews, course_id),
            Err(e) => {
                debug!("Authored reviews lookup failed: {}", e);
                false
            }
        };

        match viewer {
            Ok(Some(student)) => {
                view.viewer_avatar = Some(self.deps.avatars.resolve_avatar(&student.avatar_key));
            }
            Ok(None) => {
                warn!("{}", ReviewError::not_found("Student", student_id));
                notes.push(Notification::error("Failed to fetch student profile"));
            }
            Err(e) => {
                warn!("Profile lookup failed for {}: {}", student_id, e);
                notes.push(Notification::error("Failed to fetch student profile"));
            }
        }

        match reviews {
            Ok(section) => apply_section(&mut view, section),
            Err(e) => {
                warn!("Review list failed for {}: {}", course_id, e);
                notes.push(Notification::error("Failed to fetch reviews"));
            }
        }

        self.publish(generation, notes, move |current| *current = view)
    }

    /// Clear the review list, wait briefly, then fetch it again.
    ///
    /// Supersedes any load still in flight. When the network is unreachable
    /// the list stays cleared and nothing is fetched.
    pub async fn refresh(
        &self,
        course_id: &str,
        student_id: &str,
    ) -> Result<Publication, ReviewError> {
        let generation = self.begin(|view| {
            view.other_reviews.clear();
            view.my_review = None;
        });

        if !self.deps.network.is_reachable().await {
            warn!("Refresh of {} skipped: network unreachable", course_id);
            self.publish(
                generation,
                vec![Notification::error(ReviewError::Unreachable.to_string())],
                |view| view.is_loading = false,
            );
            return Err(ReviewError::Unreachable);
        }

        tokio::time::sleep(self.config.refresh_delay).await;
        self.reaggregate(course_id, student_id, generation).await
    }

    /// Save the course if it is unsaved, unsave it otherwise.
    ///
    /// Trusts the flag from the last load. Returns the new saved state.
    pub async fn toggle_saved_state(
        &self,
        course_id: &str,
        student_id: &str,
    ) -> Result<bool, ReviewError> {
        let (loaded_course, was_saved, course_code) = {
            let view = self.state.borrow();
            (
                view.course_id.clone(),
                view.is_course_saved,
                view.course_code.clone(),
            )
        };

        if loaded_course != course_id {
            warn!("Toggle requested for {} but {} is loaded", course_id, loaded_course);
            self.notifier.send(Notification::error("Could not save course"));
            return Err(ReviewError::not_found("Loaded course", course_id));
        }

        let result = if was_saved {
            self.deps.saved.remove_saved(student_id, course_id).await
        } else {
            self.deps.saved.add_saved(student_id, course_id).await
        };

        match result {
            Ok(()) => {
                let now_saved = !was_saved;
                self.state.send_modify(|view| view.is_course_saved = now_saved);

                let verb = if now_saved { "saved" } else { "unsaved" };
                info!("Course {} {}", course_code, verb);
                self.notifier.send(Notification::success(format!(
                    "{} {} successfully",
                    course_code, verb
                )));
                Ok(now_saved)
            }
            Err(e) => {
                warn!("Toggling saved state of {} failed: {}", course_id, e);
                self.notifier.send(Notification::error("Could not save course"));
                Err(e)
            }
        }
    }

    /// Delete the viewing student's review, then re-aggregate the reviews.
    ///
    /// Does nothing when the view has no review of theirs.
    pub async fn delete_my_review(&self, student_id: &str) -> Result<(), ReviewError> {
        let (course_id, review) = {
            let view = self.state.borrow();
            (
                view.course_id.clone(),
                view.my_review.as_ref().map(|entry| entry.review.clone()),
            )
        };

        let review = match review {
            Some(review) if review.student_id == student_id => review,
            _ => {
                debug!("No review by {} to delete", student_id);
                return Ok(());
            }
        };

        let generation = self.generation.load(Ordering::SeqCst);

        match self
            .deps
            .reviews
            .delete_review(&review.review_id, student_id)
            .await
        {
            Ok(()) => {
                info!("Deleted review {} on {}", review.review_id, course_id);
                self.notifier
                    .send(Notification::success("Review deleted successfully"));
                self.state.send_modify(|view| {
                    view.my_review = None;
                    view.has_already_reviewed = false;
                });

                if let Err(e) = self.reaggregate(&course_id, student_id, generation).await {
                    warn!("Reloading reviews after delete failed: {}", e);
                }
                Ok(())
            }
            Err(e) => {
                warn!("Deleting review {} failed: {}", review.review_id, e);
                self.notifier.send(Notification::error("Failed to delete review"));
                Err(e)
            }
        }
    }

    /// Create the viewing student's review for the loaded course.
    ///
    /// Requires network, enrollment and no existing review. The store
    /// enforces uniqueness as well, so the local checks are only early exits.
    pub async fn submit_review(
        &self,
        course_id: &str,
        student_id: &str,
        rating: Rating,
        comment_text: &str,
    ) -> Result<Review, ReviewError> {
        if !self.deps.network.is_reachable().await {
            self.notifier
                .send(Notification::error(ReviewError::Unreachable.to_string()));
            return Err(ReviewError::Unreachable);
        }

        let (is_enrolled, already_reviewed) = {
            let view = self.state.borrow();
            let same_course = view.course_id == course_id;
            (
                same_course && view.is_enrolled,
                same_course && view.has_already_reviewed,
            )
        };

        if !is_enrolled {
            self.notifier.send(Notification::error(
                "You must be enrolled in this course to review it",
            ));
            return Err(ReviewError::NotEnrolled {
                course_id: course_id.to_string(),
            });
        }

        if already_reviewed {
            self.notifier
                .send(Notification::error("You have already reviewed this course"));
            return Err(ReviewError::DuplicateReview {
                student_id: student_id.to_string(),
                course_id: course_id.to_string(),
            });
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let new_review = NewReview {
            course_id: course_id.to_string(),
            student_id: student_id.to_string(),
            rating,
            comment_text: comment_text.trim().to_string(),
        };

        match self.deps.reviews.insert_review(new_review).await {
            Ok(review) => {
                info!("Stored review {} on {}", review.review_id, course_id);
                self.notifier
                    .send(Notification::success("Review submitted successfully"));

                if let Err(e) = self.reaggregate(course_id, student_id, generation).await {
                    warn!("Reloading reviews after submit failed: {}", e);
                }
                Ok(review)
            }
            Err(e @ ReviewError::DuplicateReview { .. }) => {
                self.state.send_modify(|view| view.has_already_reviewed = true);
                self.notifier
                    .send(Notification::error("You have already reviewed this course"));
                Err(e)
            }
            Err(e) => {
                warn!("Submitting review on {} failed: {}", course_id, e);
                self.notifier.send(Notification::error("Failed to submit review"));
                Err(e)
            }
        }
    }

    /// Fetch the course's reviews and resolve every author concurrently.
    async fn collect_reviews(
        &self,
        course_id: &str,
        student_id: &str,
    ) -> Result<ReviewSection, ReviewError> {
        let reviews = self.deps.reviews.get_reviews_by_course(course_id).await?;
        debug!("Resolving authors of {} reviews", reviews.len());

        let entries = join_all(reviews.into_iter().map(|review| self.resolve_author(review))).await;

        Ok(aggregate_reviews(entries, student_id))
    }

    /// Join a review with its author. A missing profile never hides the review.
    async fn resolve_author(&self, review: Review) -> ReviewEntry {
        let student = match self.deps.students.get_student_by_id(&review.student_id).await {
            Ok(Some(student)) => Some(student),
            Ok(None) => {
                debug!("No profile for {}", review.student_id);
                None
            }
            Err(e) => {
                warn!("Profile lookup failed for {}: {}", review.student_id, e);
                None
            }
        };

        match student {
            Some(student) => ReviewEntry {
                avatar: self.deps.avatars.resolve_avatar(&student.avatar_key),
                review,
                student,
            },
            None => ReviewEntry {
                student: StudentSummary::anonymous(&review.student_id, &self.config.anonymous_name),
                avatar: self.deps.avatars.default_avatar(),
                review,
            },
        }
    }

    /// Re-run the fetch-and-aggregate step and publish only the review fields.
    async fn reaggregate(
        &self,
        course_id: &str,
        student_id: &str,
        generation: u64,
    ) -> Result<Publication, ReviewError> {
        match self.collect_reviews(course_id, student_id).await {
            Ok(section) => Ok(self.publish(generation, Vec::new(), move |view| {
                apply_section(view, section);
                view.is_loading = false;
            })),
            Err(e) => {
                warn!("Review list failed for {}: {}", course_id, e);
                self.publish(
                    generation,
                    vec![Notification::error("Failed to fetch reviews")],
                    |view| view.is_loading = false,
                );
                Err(e)
            }
        }
    }

    /// Start a new generation, applying `prepare` to the view atomically.
    fn begin(&self, prepare: impl FnOnce(&mut AggregatedCourseView)) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|view| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            prepare(view);
        });
        generation
    }

    /// Apply `update` and send `notes` if `generation` is still the latest.
    fn publish(
        &self,
        generation: u64,
        notes: Vec<Notification>,
        update: impl FnOnce(&mut AggregatedCourseView),
    ) -> Publication {
        let published = self.state.send_if_modified(|view| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            update(view);
            true
        });

        if !published {
            debug!("Discarding superseded result of generation {}", generation);
            return Publication::Superseded;
        }

        for note in notes {
            self.notifier.send(note);
        }
        Publication::Published
    }
}

fn apply_section(view: &mut AggregatedCourseView, section: ReviewSection) {
    view.has_already_reviewed = section.my_review.is_some();
    view.my_review = section.my_review;
    view.other_reviews = section.other_reviews;
    view.review_count = section.stats.count;
    view.average_rating = section.stats.average;
    view.rating_histogram = section.stats.histogram;
}
