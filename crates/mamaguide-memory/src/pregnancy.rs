//! Pregnancy week arithmetic.

use chrono::NaiveDate;

pub const FULL_TERM_WEEKS: i64 = 40;
pub const MAX_WEEK: u32 = 45;

/// Current pregnancy week for a due date, clamped to 1..=45.
///
/// Counts back from week 40 by whole weeks remaining until the due date.
/// No due date means week 1.
pub fn current_week(due_date: Option<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(due) = due_date else {
        return 1;
    };
    let days_until_due = (due - today).num_days();
    let week = FULL_TERM_WEEKS - days_until_due.div_euclid(7);
    week.clamp(1, MAX_WEEK as i64) as u32
}
