//! Course detail engine modules.
//!
//! This module provides the review aggregation engine, its notification
//! channel and the session that owns its background tasks.

pub mod course_detail;
pub mod notifications;
pub mod session;

pub use course_detail::{CourseDetailEngine, EngineConfig};
pub use notifications::{Notification, Notifications};
pub use session::CourseDetailSession;
