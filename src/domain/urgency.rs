//! Urgency score
//!
//! A floating-point score combining due, scheduled and start dates with the
//! priority. Higher means more urgent. Only the calendar date of "today"
//! matters, so the score is stable over a day.

use chrono::NaiveDate;

use super::priority::Priority;
use super::task::Task;

const DUE_COEFFICIENT: f64 = 12.0;
const SCHEDULED_COEFFICIENT: f64 = 5.0;
const STARTED_COEFFICIENT: f64 = -3.0;
const PRIORITY_COEFFICIENT: f64 = 6.0;

/// Computes the urgency of `task` as of `today`
pub fn urgency(task: &Task, today: NaiveDate) -> f64 {
    let mut score = 0.0;

    if let Some(due) = task.dates.due {
        let days_overdue = (today - due.date()).num_days() as f64;
        let multiplier = if days_overdue >= 7.0 {
            1.0
        } else if days_overdue >= -14.0 {
            ((days_overdue + 14.0) * 0.8) / 21.0 + 0.2
        } else {
            0.2
        };
        score += multiplier * DUE_COEFFICIENT;
    }

    if let Some(scheduled) = task.dates.scheduled {
        if today >= scheduled.date() {
            score += SCHEDULED_COEFFICIENT;
        }
    }

    if let Some(start) = task.dates.start {
        if today < start.date() {
            score += STARTED_COEFFICIENT;
        }
    }

    score + priority_multiplier(task.priority) * PRIORITY_COEFFICIENT
}

fn priority_multiplier(priority: Priority) -> f64 {
    match priority {
        Priority::Highest => 1.5,
        Priority::High => 1.0,
        Priority::Medium => 0.65,
        Priority::None => 0.325,
        Priority::Low => 0.0,
        Priority::Lowest => -0.3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn plain_task_scores_priority_only() {
        let today = date("2023-06-10");
        assert_close(urgency(&Task::new("x"), today), 1.95);
        assert_close(urgency(&Task::new("x").with_priority(Priority::Highest), today), 9.0);
        assert_close(urgency(&Task::new("x").with_priority(Priority::Lowest), today), -1.8);
    }

    #[test]
    fn due_today() {
        let today = date("2023-06-10");
        let task = Task::new("x").with_due(today).with_priority(Priority::Low);
        // (14 * 0.8 / 21 + 0.2) * 12
        assert_close(urgency(&task, today), 8.8);
    }

    #[test]
    fn due_far_in_past_and_future() {
        let today = date("2023-06-10");
        let overdue = Task::new("x").with_due(date("2023-05-01")).with_priority(Priority::Low);
        let future = Task::new("x").with_due(date("2023-12-01")).with_priority(Priority::Low);
        assert_close(urgency(&overdue, today), 12.0);
        assert_close(urgency(&future, today), 2.4);
    }

    #[test]
    fn scheduled_and_start_dates() {
        let today = date("2023-06-10");
        let scheduled = Task::new("x")
            .with_scheduled(date("2023-06-09"))
            .with_priority(Priority::Low);
        let not_started = Task::new("x")
            .with_start(date("2023-06-11"))
            .with_priority(Priority::Low);
        assert_close(urgency(&scheduled, today), 5.0);
        assert_close(urgency(&not_started, today), -3.0);
    }
}
