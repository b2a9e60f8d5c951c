//! Course detail report generation.
//!
//! Renders an aggregated course view, and the notifications raised while
//! producing it, as Markdown or JSON.

use crate::config::ReportConfig;
use crate::engine::Notification;
use crate::models::{AggregatedCourseView, Rating, RatingHistogram, ReviewEntry};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

const FILLED_STAR: char = '★';
const EMPTY_STAR: char = '☆';
const BAR_WIDTH: usize = 20;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(
    view: &AggregatedCourseView,
    notifications: &[Notification],
    config: &ReportConfig,
) -> String {
    let mut output = String::new();

    output.push_str(&generate_header(view));
    output.push_str(&generate_status_section(view));
    output.push_str(&generate_rating_section(view, config));
    output.push_str(&generate_my_review_section(view, config));
    output.push_str(&generate_other_reviews_section(&view.other_reviews, config));
    output.push_str(&generate_notifications_section(notifications));
    output.push_str(&generate_footer());

    output
}

fn generate_header(view: &AggregatedCourseView) -> String {
    if view.course_code.is_empty() && view.course_name.is_empty() {
        return format!("# Course {}\n\n", view.course_id);
    }
    format!("# {} - {}\n\n", view.course_code, view.course_name)
}

fn generate_status_section(view: &AggregatedCourseView) -> String {
    let mut section = String::new();

    section.push_str(&format!("- **Course ID:** `{}`\n", view.course_id));
    section.push_str(&format!("- **Saved:** {}\n", yes_no(view.is_course_saved)));
    section.push_str(&format!("- **Enrolled:** {}\n", yes_no(view.is_enrolled)));
    section.push_str(&format!(
        "- **Reviewed:** {}\n",
        yes_no(view.has_already_reviewed)
    ));
    if let Some(ref avatar) = view.viewer_avatar {
        section.push_str(&format!("- **Avatar:** `{}`\n", avatar));
    }
    if view.is_loading {
        section.push_str("- *Loading...*\n");
    }
    section.push('\n');

    section
}

/// Rating summary. Omitted entirely when there are no reviews.
fn generate_rating_section(view: &AggregatedCourseView, config: &ReportConfig) -> String {
    let mut section = String::new();

    section.push_str("## Rating\n\n");

    if view.review_count == 0 {
        section.push_str("No reviews yet.\n\n");
        return section;
    }

    section.push_str(&format!(
        "**{:.1}** {} ({} {})\n\n",
        view.average_rating,
        star_bar(view.rounded_rating()),
        view.review_count,
        if view.review_count == 1 { "review" } else { "reviews" }
    ));

    if config.show_histogram {
        section.push_str(&generate_histogram(&view.rating_histogram, view.review_count));
    }

    section
}

fn generate_histogram(histogram: &RatingHistogram, total: usize) -> String {
    let mut table = String::new();

    table.push_str("| Rating | Reviews | |\n");
    table.push_str("|:---|:---:|:---|\n");

    // Highest rating first
    for (rating, count) in histogram.iter().rev() {
        let filled = if total == 0 { 0 } else { count * BAR_WIDTH / total };
        table.push_str(&format!(
            "| {} | {} | {} |\n",
            star_bar(*rating),
            count,
            "█".repeat(filled)
        ));
    }
    table.push('\n');

    table
}

fn generate_my_review_section(view: &AggregatedCourseView, config: &ReportConfig) -> String {
    let mut section = String::new();

    section.push_str("## Your review\n\n");
    match view.my_review {
        Some(ref entry) => section.push_str(&generate_review_block(entry, config)),
        None if view.is_enrolled => {
            section.push_str("You have not reviewed this course yet.\n\n")
        }
        None => section.push_str("Enroll in this course to review it.\n\n"),
    }

    section
}

fn generate_other_reviews_section(reviews: &[ReviewEntry], config: &ReportConfig) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Other reviews ({})\n\n", reviews.len()));
    if reviews.is_empty() {
        section.push_str("No one else has reviewed this course.\n\n");
        return section;
    }

    for entry in reviews {
        section.push_str(&generate_review_block(entry, config));
    }

    section
}

/// A single review with its author.
fn generate_review_block(entry: &ReviewEntry, config: &ReportConfig) -> String {
    let mut block = String::new();

    block.push_str(&format!(
        "### {} {}\n\n",
        star_bar(entry.review.rating.value()),
        entry.student.full_name()
    ));

    let mut meta = Vec::new();
    if !entry.student.cohort_year.is_empty() {
        meta.push(format!("Class of {}", entry.student.cohort_year));
    }
    if config.include_dates {
        meta.push(entry.review.formatted_date());
    }
    meta.push(format!("avatar `{}`", entry.avatar));
    block.push_str(&format!("*{}*\n\n", meta.join(" | ")));

    if config.include_comments && !entry.review.comment_text.is_empty() {
        for line in entry.review.comment_text.lines() {
            block.push_str(&format!("> {}\n", line));
        }
        block.push('\n');
    }

    block
}

fn generate_notifications_section(notifications: &[Notification]) -> String {
    if notifications.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Notifications\n\n");
    for notification in notifications {
        section.push_str(&format!("- {}\n", notification));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    format!(
        "---\n\n*Generated by course-reviews v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Stars out of the maximum rating, e.g. `★★☆`.
fn star_bar(filled: u8) -> String {
    let filled = filled.min(Rating::MAX) as usize;
    let mut bar = String::new();
    for i in 0..Rating::MAX as usize {
        bar.push(if i < filled { FILLED_STAR } else { EMPTY_STAR });
    }
    bar
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    view: &'a AggregatedCourseView,
    notifications: &'a [Notification],
}

/// Generate a JSON report.
pub fn generate_json_report(
    view: &AggregatedCourseView,
    notifications: &[Notification],
) -> Result<String> {
    let report = JsonReport {
        generated_at: Utc::now(),
        view,
        notifications,
    };
    serde_json::to_string_pretty(&report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Review, StudentSummary};
    use chrono::TimeZone;

    fn entry(review_id: &str, student_id: &str, name: &str, rating: Rating) -> ReviewEntry {
        ReviewEntry {
            review: Review {
                review_id: review_id.to_string(),
                course_id: "c1".to_string(),
                student_id: student_id.to_string(),
                rating,
                comment_text: "Lots of\nsketching".to_string(),
                created_at: Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap(),
            },
            student: StudentSummary {
                student_id: student_id.to_string(),
                display_name: name.to_string(),
                display_surname: "Demir".to_string(),
                cohort_year: "2022".to_string(),
                avatar_key: "orange".to_string(),
            },
            avatar: "avatars/orange.png".to_string(),
        }
    }

    fn create_test_view() -> AggregatedCourseView {
        AggregatedCourseView {
            course_id: "c1".to_string(),
            course_code: "VCD 111".to_string(),
            course_name: "Basic Drawing".to_string(),
            viewer_avatar: Some("avatars/blue.png".to_string()),
            my_review: Some(entry("r2", "s2", "Sila", Rating::One)),
            other_reviews: vec![
                entry("r1", "s1", "Aylin", Rating::Three),
                entry("r3", "s3", "Mert", Rating::Two),
            ],
            is_course_saved: false,
            is_enrolled: true,
            has_already_reviewed: true,
            average_rating: 2.0,
            review_count: 3,
            rating_histogram: [(1, 1), (2, 1), (3, 1)].into_iter().collect(),
            is_loading: false,
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let view = create_test_view();
        let notifications = vec![Notification::success("VCD 111 saved successfully")];
        let report = generate_markdown_report(&view, &notifications, &ReportConfig::default());

        assert!(report.starts_with("# VCD 111 - Basic Drawing"));
        assert!(report.contains("**2.0** ★★☆ (3 reviews)"));
        assert!(report.contains("## Your review"));
        assert!(report.contains("## Other reviews (2)"));
        assert!(report.contains("### ★★★ Aylin Demir"));
        assert!(report.contains("05/03/2024"));
        assert!(report.contains("> sketching"));
        assert!(report.contains("- ✅ VCD 111 saved successfully"));
    }

    #[test]
    fn test_rating_summary_omitted_without_reviews() {
        let view = AggregatedCourseView {
            course_code: "CMPE 101".to_string(),
            course_name: "Intro".to_string(),
            ..AggregatedCourseView::new("c2")
        };
        let report = generate_markdown_report(&view, &[], &ReportConfig::default());

        assert!(report.contains("No reviews yet."));
        assert!(!report.contains("| Rating |"));
        assert!(report.contains("Enroll in this course to review it."));
        assert!(!report.contains("## Notifications"));
    }

    #[test]
    fn test_report_config_switches() {
        let config = ReportConfig {
            include_comments: false,
            include_dates: false,
            show_histogram: false,
        };
        let report = generate_markdown_report(&create_test_view(), &[], &config);

        assert!(!report.contains("sketching"));
        assert!(!report.contains("05/03/2024"));
        assert!(!report.contains("| Rating |"));
    }

    #[test]
    fn test_histogram_highest_first() {
        let histogram: RatingHistogram = [(1, 0), (2, 1), (3, 3)].into_iter().collect();
        let table = generate_histogram(&histogram, 4);
        let three = table.find("| ★★★ |").unwrap();
        let one = table.find("| ★☆☆ |").unwrap();
        assert!(three < one);
        assert!(table.contains(&"█".repeat(15)));
    }

    #[test]
    fn test_star_bar() {
        assert_eq!(star_bar(0), "☆☆☆");
        assert_eq!(star_bar(2), "★★☆");
        assert_eq!(star_bar(9), "★★★");
    }

    #[test]
    fn test_generate_json_report() {
        let view = create_test_view();
        let json = generate_json_report(&view, &[Notification::error("Failed to fetch reviews")])
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["view"]["course_code"], "VCD 111");
        assert_eq!(value["view"]["review_count"], 3);
        assert_eq!(value["notifications"][0]["kind"], "error");
        assert_eq!(value["notifications"][0]["message"], "Failed to fetch reviews");
    }
}
