//! Read-only projections of the task collection.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::config::LocalClock;
use crate::internal_error::{InternalError, InternalResult};

use super::data::*;
use super::rollover::is_overdue;

#[derive(Serialize, Debug, Clone)]
pub struct DayView {
    pub date: NaiveDate,
    /// Non-schedule tasks, unfinished first.
    pub todos: Vec<Task>,
    pub schedule: Vec<Task>,
    pub remaining: usize,
    /// Unfinished todos from earlier days; non-zero means a rollover is offered.
    pub overdue: usize,
}

pub fn day_view(tasks: &[Task], date: NaiveDate, clock: &LocalClock) -> DayView {
    let mut on_day: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.day(&clock.offset) == date)
        .collect();
    on_day.sort_by_key(|task| task.position);

    let (schedule, mut todos): (Vec<&Task>, Vec<&Task>) =
        on_day.into_iter().partition(|task| task.category.is_schedule());
    todos.sort_by_key(|task| !task.is_todo());

    DayView {
        date,
        remaining: todos.iter().filter(|task| task.is_todo()).count(),
        overdue: tasks.iter().filter(|task| is_overdue(task, date, clock)).count(),
        todos: todos.into_iter().cloned().collect(),
        schedule: schedule.into_iter().cloned().collect(),
    }
}

pub fn event_color(task: &Task) -> &'static str {
    if task.category.is_schedule() {
        SCHEDULE_COLOR
    } else if task.status == TaskStatus::Done {
        DONE_COLOR
    } else {
        TODO_COLOR
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub id: TaskID,
    pub title: String,
    pub status: TaskStatus,
    pub category: TaskCategory,
    pub color: &'static str,
}

#[derive(Serialize, Debug, Clone)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub in_month: bool,
    pub events: Vec<CalendarEvent>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    /// Whole weeks, Monday first.
    pub weeks: Vec<Vec<CalendarDay>>,
}

/// `date` moved by `days`, or `Invalid` past the representable calendar.
pub fn shift(date: NaiveDate, days: i64) -> InternalResult<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
        .ok_or_else(|| InternalError::invalid(format!("{} {:+} days is out of range", date, days)))
}

pub fn monday_of(date: NaiveDate) -> InternalResult<NaiveDate> {
    shift(date, -i64::from(date.weekday().num_days_from_monday()))
}

pub fn calendar_month(
    tasks: &[Task],
    year: i32,
    month: u32,
    clock: &LocalClock,
) -> InternalResult<CalendarMonth> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| InternalError::invalid(format!("no such month {}-{}", year, month)))?;
    let next_month = if month == 12 {
        year.checked_add(1).and_then(|next| NaiveDate::from_ymd_opt(next, 1, 1))
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| InternalError::invalid("month out of range"))?;
    let last = shift(next_month, -1)?;

    let mut weeks = vec![];
    let mut week_start = monday_of(first)?;
    while week_start <= last {
        let week = (0..7)
            .map(|offset| {
                let date = shift(week_start, offset)?;
                Ok(CalendarDay {
                    date,
                    in_month: date.month() == month && date.year() == year,
                    events: tasks
                        .iter()
                        .filter(|task| task.day(&clock.offset) == date)
                        .map(|task| CalendarEvent {
                            id: task.id,
                            title: task.title.clone(),
                            status: task.status,
                            category: task.category.clone(),
                            color: event_color(task),
                        })
                        .collect(),
                })
            })
            .collect::<InternalResult<Vec<CalendarDay>>>()?;
        weeks.push(week);
        week_start = shift(week_start, 7)?;
    }

    Ok(CalendarMonth { year, month, weeks })
}
