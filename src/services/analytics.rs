//! Aggregations over enrollment rows.
//!
//! Everything here is a pure function of the rows it is handed; the
//! analytics and dashboard services fetch the rows and call in.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::db::EnrollmentRow;
use crate::domain::EnrollmentStatus;

/// Mean rounded half to even; 0 for an empty input.
#[must_use]
pub fn average_progress<I>(values: I) -> i32
where
    I: IntoIterator<Item = i32>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0_i64, 0_i64), |(sum, count), v| (sum + i64::from(v), count + 1));

    if count == 0 {
        return 0;
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let rounded = (sum as f64 / count as f64).round_ties_even() as i32;
    rounded
}

fn is_status(row: &EnrollmentRow, status: EnrollmentStatus) -> bool {
    row.status == status.as_str()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PerformanceBuckets {
    /// progress in [75, 100]
    pub excellent: u64,
    /// [50, 75)
    pub good: u64,
    /// [25, 50)
    pub average: u64,
    /// [0, 25)
    pub struggling: u64,
}

impl PerformanceBuckets {
    #[must_use]
    pub fn from_rows(rows: &[EnrollmentRow]) -> Self {
        rows.iter().fold(Self::default(), |mut buckets, row| {
            match row.progress {
                75.. => buckets.excellent += 1,
                50..75 => buckets.good += 1,
                25..50 => buckets.average += 1,
                _ => buckets.struggling += 1,
            }
            buckets
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentPerformance {
    pub student_id: i32,
    pub username: String,
    pub full_name: String,
    pub course_count: u64,
    pub completed_count: u64,
    pub average_progress: i32,
}

/// One entry per student present in `rows`, in no particular order.
#[must_use]
pub fn student_performance(rows: &[EnrollmentRow]) -> Vec<StudentPerformance> {
    let mut grouped: HashMap<i32, Vec<&EnrollmentRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.student_id).or_default().push(row);
    }

    grouped
        .into_values()
        .map(|rows| {
            let first = rows[0];
            StudentPerformance {
                student_id: first.student_id,
                username: first.student_username.clone(),
                full_name: format!("{} {}", first.student_first_name, first.student_last_name)
                    .trim()
                    .to_string(),
                course_count: rows.len() as u64,
                completed_count: rows
                    .iter()
                    .filter(|r| is_status(r, EnrollmentStatus::Completed))
                    .count() as u64,
                average_progress: average_progress(rows.iter().map(|r| r.progress)),
            }
        })
        .collect()
}

/// Highest per-student averages first.
#[must_use]
pub fn top_students(rows: &[EnrollmentRow], limit: usize) -> Vec<StudentPerformance> {
    let mut students = student_performance(rows);
    students.sort_by(|a, b| {
        b.average_progress
            .cmp(&a.average_progress)
            .then_with(|| a.username.cmp(&b.username))
    });
    students.truncate(limit);
    students
}

/// Students averaging below 25, lowest first.
#[must_use]
pub fn struggling_students(rows: &[EnrollmentRow], limit: usize) -> Vec<StudentPerformance> {
    let mut students: Vec<_> = student_performance(rows)
        .into_iter()
        .filter(|s| s.average_progress < 25)
        .collect();
    students.sort_by(|a, b| {
        a.average_progress
            .cmp(&b.average_progress)
            .then_with(|| a.username.cmp(&b.username))
    });
    students.truncate(limit);
    students
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    /// `YYYY-MM`
    pub month: String,
    pub enrollments: u64,
}

/// Enrollment counts per calendar month of `enrolled_at`, newest month first.
#[must_use]
pub fn monthly_trend(rows: &[EnrollmentRow], months: usize) -> Vec<MonthlyCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for row in rows {
        if let Some(month) = row.enrolled_at.get(..7) {
            *counts.entry(month).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .rev()
        .take(months)
        .map(|(month, enrollments)| MonthlyCount {
            month: month.to_string(),
            enrollments,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoursePopularity {
    pub course_id: i32,
    pub title: String,
    pub enrollments: u64,
    pub completed: u64,
    pub average_progress: i32,
}

/// Most-enrolled courses first.
#[must_use]
pub fn course_popularity(rows: &[EnrollmentRow], limit: usize) -> Vec<CoursePopularity> {
    let mut grouped: HashMap<i32, Vec<&EnrollmentRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.course_id).or_default().push(row);
    }

    let mut courses: Vec<_> = grouped
        .into_values()
        .map(|rows| CoursePopularity {
            course_id: rows[0].course_id,
            title: rows[0].course_title.clone(),
            enrollments: rows.len() as u64,
            completed: rows
                .iter()
                .filter(|r| is_status(r, EnrollmentStatus::Completed))
                .count() as u64,
            average_progress: average_progress(rows.iter().map(|r| r.progress)),
        })
        .collect();

    courses.sort_by(|a, b| {
        b.enrollments
            .cmp(&a.enrollments)
            .then_with(|| a.course_id.cmp(&b.course_id))
    });
    courses.truncate(limit);
    courses
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrollmentTotals {
    pub total: u64,
    pub completed: u64,
    /// Status `enrolled`.
    pub in_progress: u64,
    pub dropped: u64,
}

impl EnrollmentTotals {
    #[must_use]
    pub fn from_rows(rows: &[EnrollmentRow]) -> Self {
        let count = |status| rows.iter().filter(|r| is_status(r, status)).count() as u64;
        Self {
            total: rows.len() as u64,
            completed: count(EnrollmentStatus::Completed),
            in_progress: count(EnrollmentStatus::Enrolled),
            dropped: count(EnrollmentStatus::Dropped),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    /// `None` when the window is disabled.
    pub window_days: Option<u32>,
    pub total_students: u64,
    pub active_students: u64,
    pub enrollments: EnrollmentTotals,
    pub average_progress: i32,
    pub performance: PerformanceBuckets,
    pub top_students: Vec<StudentPerformance>,
    pub struggling_students: Vec<StudentPerformance>,
    pub monthly_trend: Vec<MonthlyCount>,
    pub course_popularity: Vec<CoursePopularity>,
    pub recent_activity: Vec<EnrollmentRow>,
}

pub const LEADERBOARD_SIZE: usize = 5;
pub const TREND_MONTHS: usize = 12;
pub const RECENT_ACTIVITY: usize = 10;

/// Builds the full report from rows sorted newest first.
#[must_use]
pub fn build_report(
    rows: &[EnrollmentRow],
    total_students: u64,
    window_days: Option<u32>,
) -> AnalyticsReport {
    let active: HashSet<i32> = rows.iter().map(|r| r.student_id).collect();

    AnalyticsReport {
        window_days,
        total_students,
        active_students: active.len() as u64,
        enrollments: EnrollmentTotals::from_rows(rows),
        average_progress: average_progress(rows.iter().map(|r| r.progress)),
        performance: PerformanceBuckets::from_rows(rows),
        top_students: top_students(rows, LEADERBOARD_SIZE),
        struggling_students: struggling_students(rows, LEADERBOARD_SIZE),
        monthly_trend: monthly_trend(rows, TREND_MONTHS),
        course_popularity: course_popularity(rows, LEADERBOARD_SIZE),
        recent_activity: rows.iter().take(RECENT_ACTIVITY).cloned().collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub name: &'static str,
    pub description: &'static str,
    pub unlocked: bool,
    pub progress: i32,
    pub total: i32,
}

/// Enrollments grouped by how far along they are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressGroups {
    /// progress >= 75
    pub excellent: u64,
    /// 50 <= progress < 75
    pub good: u64,
    /// progress < 50
    pub needs_work: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Achievements {
    pub totals: EnrollmentTotals,
    pub average_progress: i32,
    pub progress_groups: ProgressGroups,
    pub badges: Vec<Badge>,
}

/// A student's badges, computed from their own enrollment rows.
#[must_use]
pub fn achievements(rows: &[EnrollmentRow]) -> Achievements {
    let totals = EnrollmentTotals::from_rows(rows);
    let average = average_progress(rows.iter().map(|r| r.progress));
    let perfect = rows.iter().any(|r| r.progress >= 100);

    let progress_groups = rows.iter().fold(ProgressGroups::default(), |mut g, r| {
        match r.progress {
            75.. => g.excellent += 1,
            50..75 => g.good += 1,
            _ => g.needs_work += 1,
        }
        g
    });

    let enrolled = i32::try_from(totals.total).unwrap_or(i32::MAX);
    let completed = i32::try_from(totals.completed).unwrap_or(i32::MAX);

    let badges = vec![
        Badge {
            name: "Quick Starter",
            description: "Enrolled in your first course",
            unlocked: enrolled >= 1,
            progress: enrolled.min(1),
            total: 1,
        },
        Badge {
            name: "Course Collector",
            description: "Enrolled in 5 different courses",
            unlocked: enrolled >= 5,
            progress: enrolled.min(5),
            total: 5,
        },
        Badge {
            name: "Dedicated Learner",
            description: "Complete your first course",
            unlocked: completed >= 1,
            progress: completed.min(1),
            total: 1,
        },
        Badge {
            name: "Course Master",
            description: "Complete 3 courses",
            unlocked: completed >= 3,
            progress: completed.min(3),
            total: 3,
        },
        Badge {
            name: "Progress Champion",
            description: "Reach 50% average progress across all courses",
            unlocked: average >= 50,
            progress: average.min(100),
            total: 100,
        },
        Badge {
            name: "Perfect Progress",
            description: "Reach 100% progress in any course",
            unlocked: perfect,
            progress: i32::from(perfect),
            total: 1,
        },
    ];

    Achievements {
        totals,
        average_progress: average,
        progress_groups,
        badges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(student: i32, course: i32, progress: i32, status: &str, at: &str) -> EnrollmentRow {
        EnrollmentRow {
            id: student * 100 + course,
            student_id: student,
            student_username: format!("student{student}"),
            student_email: format!("s{student}@example.com"),
            student_first_name: "First".to_string(),
            student_last_name: format!("{student}"),
            course_id: course,
            course_title: format!("Course {course}"),
            status: status.to_string(),
            progress,
            enrolled_at: at.to_string(),
            completed_at: None,
        }
    }

    #[test]
    fn average_rounds_half_to_even() {
        assert_eq!(average_progress([10, 60, 90]), 53);
        assert_eq!(average_progress([0, 1]), 0);
        assert_eq!(average_progress([1, 2]), 2);
        assert_eq!(average_progress([10, 15]), 12);
        assert_eq!(average_progress([25, 30]), 28);
        assert_eq!(average_progress([2, 3, 4, 4]), 3);
        assert_eq!(average_progress(std::iter::empty()), 0);
    }

    #[test]
    fn buckets_use_half_open_ranges() {
        let rows = vec![
            row(1, 1, 10, "enrolled", "2026-01-01T00:00:00Z"),
            row(1, 2, 60, "enrolled", "2026-01-01T00:00:00Z"),
            row(1, 3, 90, "completed", "2026-01-01T00:00:00Z"),
            row(2, 1, 25, "enrolled", "2026-01-01T00:00:00Z"),
            row(2, 2, 75, "enrolled", "2026-01-01T00:00:00Z"),
        ];
        assert_eq!(
            PerformanceBuckets::from_rows(&rows),
            PerformanceBuckets {
                excellent: 2,
                good: 1,
                average: 1,
                struggling: 1,
            }
        );
    }

    #[test]
    fn leaderboards() {
        let at = "2026-01-01T00:00:00Z";
        let rows = vec![
            row(1, 1, 100, "completed", at),
            row(1, 2, 80, "enrolled", at),
            row(2, 1, 10, "enrolled", at),
            row(2, 2, 20, "enrolled", at),
            row(3, 1, 0, "dropped", at),
            row(4, 1, 50, "enrolled", at),
        ];

        let top = top_students(&rows, 5);
        assert_eq!(
            top.iter().map(|s| s.student_id).collect::<Vec<_>>(),
            vec![1, 4, 2, 3]
        );
        assert_eq!(top[0].average_progress, 90);
        assert_eq!(top[0].completed_count, 1);
        assert_eq!(top[0].course_count, 2);

        let struggling = struggling_students(&rows, 5);
        assert_eq!(
            struggling.iter().map(|s| s.student_id).collect::<Vec<_>>(),
            vec![3, 2]
        );

        assert_eq!(top_students(&rows, 2).len(), 2);
    }

    #[test]
    fn monthly_trend_is_newest_first_and_capped() {
        let rows: Vec<_> = (1..=14)
            .map(|m| {
                let year = if m > 12 { 2026 } else { 2025 };
                let month = if m > 12 { m - 12 } else { m };
                row(m, 1, 0, "enrolled", &format!("{year}-{month:02}-15T10:00:00Z"))
            })
            .chain(std::iter::once(row(99, 2, 0, "enrolled", "2026-02-01T00:00:00Z")))
            .collect();

        let trend = monthly_trend(&rows, 12);
        assert_eq!(trend.len(), 12);
        assert_eq!(trend[0].month, "2026-02");
        assert_eq!(trend[0].enrollments, 2);
        assert_eq!(trend[11].month, "2025-03");
    }

    #[test]
    fn popularity_counts_completions() {
        let at = "2026-01-01T00:00:00Z";
        let rows = vec![
            row(1, 7, 100, "completed", at),
            row(2, 7, 50, "enrolled", at),
            row(3, 8, 0, "enrolled", at),
        ];
        let popular = course_popularity(&rows, 5);
        assert_eq!(popular[0].course_id, 7);
        assert_eq!(popular[0].enrollments, 2);
        assert_eq!(popular[0].completed, 1);
        assert_eq!(popular[0].average_progress, 75);
        assert_eq!(popular[1].course_id, 8);
    }

    #[test]
    fn report_over_empty_set() {
        let report = build_report(&[], 4, Some(30));
        assert_eq!(report.total_students, 4);
        assert_eq!(report.active_students, 0);
        assert_eq!(report.average_progress, 0);
        assert!(report.top_students.is_empty());
        assert!(report.monthly_trend.is_empty());
    }

    #[test]
    fn badges_unlock_on_thresholds() {
        let at = "2026-01-01T00:00:00Z";
        let rows = vec![
            row(1, 1, 100, "completed", at),
            row(1, 2, 40, "enrolled", at),
        ];
        let result = achievements(&rows);
        let unlocked: Vec<_> = result
            .badges
            .iter()
            .filter(|b| b.unlocked)
            .map(|b| b.name)
            .collect();
        assert_eq!(
            unlocked,
            vec![
                "Quick Starter",
                "Dedicated Learner",
                "Progress Champion",
                "Perfect Progress"
            ]
        );
        let collector = &result.badges[1];
        assert_eq!((collector.progress, collector.total), (2, 5));
        assert_eq!(result.progress_groups.excellent, 1);
        assert_eq!(result.progress_groups.needs_work, 1);
        assert_eq!(result.average_progress, 70);
    }
}
