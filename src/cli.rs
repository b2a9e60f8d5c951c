//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Rating;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// course-reviews - course detail and review aggregation
///
/// Loads a course from a catalog dataset, aggregates its reviews for the
/// given student and renders the course detail view. Actions run in the
/// order submit, toggle-save, delete, refresh.
///
/// Examples:
///   course-reviews --data catalog.json --course c1 --student s2
///   course-reviews --data catalog.json --course c1 --toggle-save --write-back
///   course-reviews --data catalog.json --course c2 --submit-rating 3 --comment "Great"
///   course-reviews --data catalog.json --course c1 --format json --output view.json
///   course-reviews --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Catalog dataset (JSON) to load
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "COURSE_REVIEWS_DATA",
        required_unless_present = "init_config"
    )]
    pub data: Option<PathBuf>,

    /// Course to show
    #[arg(short, long, value_name = "ID", required_unless_present = "init_config")]
    pub course: Option<String>,

    /// Student viewing the course
    ///
    /// Defaults to the dataset's logged-in user.
    #[arg(short, long, value_name = "ID", env = "COURSE_REVIEWS_STUDENT")]
    pub student: Option<String>,

    /// Submit a review with this rating (1-3)
    #[arg(long, value_name = "N")]
    pub submit_rating: Option<u8>,

    /// Comment for --submit-rating
    #[arg(long, value_name = "TEXT", requires = "submit_rating")]
    pub comment: Option<String>,

    /// Flip the saved state of the course
    #[arg(long)]
    pub toggle_save: bool,

    /// Delete the student's own review of the course
    #[arg(long)]
    pub delete_review: bool,

    /// Re-fetch the course reviews after loading
    #[arg(long)]
    pub refresh: bool,

    /// Treat the network as unreachable
    #[arg(long)]
    pub offline: bool,

    /// Write the dataset back after actions complete
    #[arg(long)]
    pub write_back: bool,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Pause before re-fetching on refresh, in milliseconds
    #[arg(long, value_name = "MS")]
    pub refresh_delay_ms: Option<u64>,

    /// URL checked to decide whether the network is reachable
    #[arg(long, value_name = "URL", env = "COURSE_REVIEWS_CHECK_URL")]
    pub check_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .coursereviews.toml in the current directory
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .coursereviews.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The requested course id, empty if not set (validated first).
    pub fn course_id(&self) -> &str {
        self.course.as_deref().unwrap_or("")
    }

    /// The rating to submit, if any. Valid after `validate`.
    pub fn submit_rating(&self) -> Option<Rating> {
        self.submit_rating.and_then(|n| Rating::try_from(n).ok())
    }

    /// Whether any state-changing action was requested.
    pub fn has_actions(&self) -> bool {
        self.submit_rating.is_some() || self.toggle_save || self.delete_review || self.refresh
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.course_id().trim().is_empty() {
            return Err("Course id must not be empty".to_string());
        }

        if let Some(rating) = self.submit_rating {
            if Rating::try_from(rating).is_err() {
                return Err(format!(
                    "Rating must be between 1 and {}, got {}",
                    Rating::MAX,
                    rating
                ));
            }
        }

        if let Some(ref url) = self.check_url {
            if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Check URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref data) = self.data {
            if !data.is_file() {
                return Err(format!("Dataset file does not exist: {}", data.display()));
            }
        }

        Ok(())
    }
}
