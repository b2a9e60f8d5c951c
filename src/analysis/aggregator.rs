//! Review aggregation and statistics.
//!
//! This module provides the pure part of building a course view:
//! splitting resolved reviews into the viewer's own review and everyone
//! else's, and computing the rating summary.

use crate::models::{Rating, RatingHistogram, Review, ReviewEntry};
use tracing::warn;

/// Rating summary for a set of reviews.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewStats {
    /// Number of reviews.
    pub count: usize,
    /// Arithmetic mean of the ratings, 0 when there are none.
    pub average: f64,
    /// Reviews per rating value, empty when there are none.
    pub histogram: RatingHistogram,
}

impl ReviewStats {
    /// Computes statistics from a list of reviews.
    pub fn from_reviews<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Self {
        let ratings: Vec<Rating> = reviews.into_iter().map(|r| r.rating).collect();

        Self {
            count: ratings.len(),
            average: average_rating(&ratings),
            histogram: rating_histogram(&ratings),
        }
    }
}

/// Mean of the ratings.
pub fn average_rating(ratings: &[Rating]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }

    let sum: u32 = ratings.iter().map(|r| r.value() as u32).sum();
    sum as f64 / ratings.len() as f64
}

/// Count reviews at each rating value.
///
/// A non-empty input yields an entry for every rating (zero counts
/// included) so bars can be drawn for all of them.
pub fn rating_histogram(ratings: &[Rating]) -> RatingHistogram {
    let mut histogram = RatingHistogram::new();
    if ratings.is_empty() {
        return histogram;
    }

    for rating in Rating::ALL {
        histogram.insert(rating.value(), 0);
    }
    for rating in ratings {
        *histogram.entry(rating.value()).or_default() += 1;
    }

    histogram
}

/// Result of splitting a course's reviews by author.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// First review written by the viewing student.
    pub mine: Option<ReviewEntry>,
    /// Reviews by other students, in input order.
    pub others: Vec<ReviewEntry>,
    /// Extra reviews by the viewing student beyond the first.
    pub duplicates: Vec<ReviewEntry>,
}

/// Split reviews into the viewer's own review and everyone else's.
pub fn partition_reviews(entries: Vec<ReviewEntry>, current_student_id: &str) -> Partition {
    let mut partition = Partition::default();

    for entry in entries {
        if entry.review.student_id != current_student_id {
            partition.others.push(entry);
        } else if partition.mine.is_none() {
            partition.mine = Some(entry);
        } else {
            partition.duplicates.push(entry);
        }
    }

    partition
}

/// The review part of a course view.
#[derive(Debug, Clone, Default)]
pub struct ReviewSection {
    pub my_review: Option<ReviewEntry>,
    pub other_reviews: Vec<ReviewEntry>,
    pub stats: ReviewStats,
}

/// Partition resolved reviews and compute statistics over all of them.
///
/// Duplicate reviews by the viewer are left out of the lists and reported
/// as a data-integrity problem, but still count towards the statistics.
pub fn aggregate_reviews(entries: Vec<ReviewEntry>, current_student_id: &str) -> ReviewSection {
    let partition = partition_reviews(entries, current_student_id);

    if !partition.duplicates.is_empty() {
        let ids: Vec<&str> = partition
            .duplicates
            .iter()
            .map(|e| e.review.review_id.as_str())
            .collect();
        warn!(
            "Student {} has {} extra review(s) for one course, not listed: {}",
            current_student_id,
            ids.len(),
            ids.join(", ")
        );
    }

    let stats = ReviewStats::from_reviews(
        partition
            .mine
            .iter()
            .chain(partition.others.iter())
            .chain(partition.duplicates.iter())
            .map(|e| &e.review),
    );

    ReviewSection {
        my_review: partition.mine,
        other_reviews: partition.others,
        stats,
    }
}

/// Whether any of a student's reviews is for the given course.
pub fn has_reviewed_course(student_reviews: &[Review], course_id: &str) -> bool {
    student_reviews.iter().any(|r| r.course_id == course_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudentSummary;
    use chrono::Utc;

    fn create_test_entry(review_id: &str, student_id: &str, rating: Rating) -> ReviewEntry {
        ReviewEntry {
            review: Review {
                review_id: review_id.to_string(),
                course_id: "c1".to_string(),
                student_id: student_id.to_string(),
                rating,
                comment_text: "Solid course".to_string(),
                created_at: Utc::now(),
            },
            student: StudentSummary::anonymous(student_id, "Test"),
            avatar: "avatars/default.png".to_string(),
        }
    }

    #[test]
    fn test_scenario_three_reviews() {
        let entries = vec![
            create_test_entry("r1", "s1", Rating::Three),
            create_test_entry("r2", "s2", Rating::One),
            create_test_entry("r3", "s3", Rating::Two),
        ];

        let section = aggregate_reviews(entries, "s2");

        assert_eq!(section.stats.average, 2.0);
        assert_eq!(section.stats.count, 3);
        assert_eq!(
            section.stats.histogram,
            [(1, 1), (2, 1), (3, 1)].into_iter().collect()
        );
        assert_eq!(
            section.my_review.map(|e| e.review.student_id),
            Some("s2".to_string())
        );
        assert_eq!(section.other_reviews.len(), 2);
    }

    #[test]
    fn test_empty_reviews() {
        let section = aggregate_reviews(Vec::new(), "s1");

        assert!(section.my_review.is_none());
        assert!(section.other_reviews.is_empty());
        assert_eq!(section.stats.count, 0);
        assert_eq!(section.stats.average, 0.0);
        assert!(section.stats.histogram.is_empty());
    }

    #[test]
    fn test_histogram_includes_zero_buckets() {
        let histogram = rating_histogram(&[Rating::Three, Rating::Three]);

        assert_eq!(histogram.get(&1), Some(&0));
        assert_eq!(histogram.get(&2), Some(&0));
        assert_eq!(histogram.get(&3), Some(&2));
        assert_eq!(histogram.values().sum::<usize>(), 2);
    }

    #[test]
    fn test_partition_preserves_store_order() {
        let entries = vec![
            create_test_entry("r1", "s3", Rating::One),
            create_test_entry("r2", "s1", Rating::Two),
            create_test_entry("r3", "s2", Rating::Three),
        ];

        let partition = partition_reviews(entries, "s1");
        let ids: Vec<_> = partition
            .others
            .iter()
            .map(|e| e.review.review_id.as_str())
            .collect();

        assert_eq!(ids, vec!["r1", "r3"]);
    }

    #[test]
    fn test_duplicate_reviews_first_wins() {
        let entries = vec![
            create_test_entry("r1", "s1", Rating::Three),
            create_test_entry("r2", "s2", Rating::One),
            create_test_entry("r3", "s1", Rating::One),
        ];

        let section = aggregate_reviews(entries, "s1");

        assert_eq!(
            section.my_review.as_ref().map(|e| e.review.review_id.as_str()),
            Some("r1")
        );
        assert_eq!(section.other_reviews.len(), 1);
        // every stored review counts, listed or not
        assert_eq!(section.stats.count, 3);
        assert!((section.stats.average - 5.0 / 3.0).abs() < 1e-9);
        assert_eq!(section.stats.histogram.get(&1), Some(&2));
        assert_eq!(section.stats.histogram.get(&3), Some(&1));
    }

    #[test]
    fn test_count_matches_partition() {
        let entries = vec![
            create_test_entry("r1", "s1", Rating::One),
            create_test_entry("r2", "s2", Rating::Two),
            create_test_entry("r3", "s3", Rating::Two),
            create_test_entry("r4", "s4", Rating::Three),
        ];

        for viewer in ["s1", "s4", "nobody"] {
            let section = aggregate_reviews(entries.clone(), viewer);
            let mine = usize::from(section.my_review.is_some());

            assert_eq!(section.stats.count, mine + section.other_reviews.len());
            assert_eq!(
                section.stats.histogram.values().sum::<usize>(),
                section.stats.count
            );
        }
    }

    #[test]
    fn test_has_reviewed_course() {
        let reviews: Vec<Review> = vec![
            create_test_entry("r1", "s1", Rating::One).review,
            Review {
                course_id: "c9".to_string(),
                ..create_test_entry("r2", "s1", Rating::Two).review
            },
        ];

        assert!(has_reviewed_course(&reviews, "c1"));
        assert!(has_reviewed_course(&reviews, "c9"));
        assert!(!has_reviewed_course(&reviews, "c2"));
    }
}
