use chrono::{Duration, Utc};

use crate::config::Config;
use crate::db::{EnrollmentQuery, Store, format_timestamp};
use crate::domain::Role;
use crate::services::analytics;

pub async fn cmd_stats(config: &Config, days: Option<u32>) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;

    let query = EnrollmentQuery {
        enrolled_since: days
            .map(|d| format_timestamp(Utc::now() - Duration::days(i64::from(d)))),
        ..EnrollmentQuery::default()
    };
    let rows = store.enrollment_repo().rows(&query).await?;
    let total_students = store.profile_repo().count_by_role(Role::Student).await?;

    let report = analytics::build_report(&rows, total_students, days);

    match days {
        Some(d) => println!("Enrollment analytics (last {d} days)"),
        None => println!("Enrollment analytics (all time)"),
    }
    println!("{:-<70}", "");
    println!(
        "Students: {} total, {} active",
        report.total_students, report.active_students
    );
    println!(
        "Enrollments: {} | Completed: {} | In progress: {} | Dropped: {}",
        report.enrollments.total,
        report.enrollments.completed,
        report.enrollments.in_progress,
        report.enrollments.dropped
    );
    println!("Average progress: {}%", report.average_progress);
    println!(
        "Performance: {} excellent, {} good, {} average, {} struggling",
        report.performance.excellent,
        report.performance.good,
        report.performance.average,
        report.performance.struggling
    );

    if !report.top_students.is_empty() {
        println!();
        println!("Top students:");
        for s in &report.top_students {
            println!(
                "  • {} - {}% across {} course(s), {} completed",
                s.username, s.average_progress, s.course_count, s.completed_count
            );
        }
    }

    if !report.course_popularity.is_empty() {
        println!();
        println!("Most popular courses:");
        for c in &report.course_popularity {
            println!(
                "  • {} - {} enrollment(s), {} completed, {}% average",
                c.title, c.enrollments, c.completed, c.average_progress
            );
        }
    }

    if !report.monthly_trend.is_empty() {
        println!();
        println!("Monthly enrollments:");
        for m in &report.monthly_trend {
            println!("  {}: {}", m.month, m.enrollments);
        }
    }

    Ok(())
}
