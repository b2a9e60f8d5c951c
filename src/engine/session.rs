//! Task ownership for a course detail screen.
//!
//! A session runs loads and refreshes as tokio tasks. Starting a new one
//! aborts the one in flight, and dropping the session aborts whatever is
//! still running, so nothing is published for a screen that is gone.

use super::course_detail::{CourseDetailEngine, Publication};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct CourseDetailSession {
    engine: Arc<CourseDetailEngine>,
    course_id: String,
    student_id: String,
    inflight: Mutex<Option<JoinHandle<()>>>,
}

impl CourseDetailSession {
    pub fn new(engine: Arc<CourseDetailEngine>, course_id: &str, student_id: &str) -> Self {
        Self {
            engine,
            course_id: course_id.to_string(),
            student_id: student_id.to_string(),
            inflight: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<CourseDetailEngine> {
        &self.engine
    }

    /// Start a full load, cancelling the previous load or refresh.
    pub fn reload(&self) {
        let engine = self.engine.clone();
        let course_id = self.course_id.clone();
        let student_id = self.student_id.clone();

        self.replace(tokio::spawn(async move {
            if engine.load(&course_id, &student_id).await == Publication::Superseded {
                debug!("Load of {} was superseded", course_id);
            }
        }));
    }

    /// Start a review refresh, cancelling the previous load or refresh.
    pub fn refresh(&self) {
        let engine = self.engine.clone();
        let course_id = self.course_id.clone();
        let student_id = self.student_id.clone();

        self.replace(tokio::spawn(async move {
            if let Err(e) = engine.refresh(&course_id, &student_id).await {
                debug!("Refresh of {} failed: {}", course_id, e);
            }
        }));
    }

    /// Wait for the task in flight, if any.
    pub async fn wait(&self) {
        let handle = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            match handle.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => debug!("Task for {} was cancelled", self.course_id),
                Err(e) => warn!("Task for {} panicked: {}", self.course_id, e),
            }
        }
    }

    fn replace(&self, handle: JoinHandle<()>) {
        let previous = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);

        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

impl Drop for CourseDetailSession {
    fn drop(&mut self) {
        let inflight = self
            .inflight
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = inflight {
            handle.abort();
        }
    }
}
