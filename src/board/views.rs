use chrono::NaiveDate;
use serde::Serialize;

use crate::internal_error::InternalResult;
use crate::todo::views::{monday_of, shift};

use super::data::*;

#[derive(Serialize, Debug, Clone)]
pub struct BoardCell {
    pub date: NaiveDate,
    pub tasks: Vec<BoardTask>,
}

#[derive(Serialize, Debug, Clone)]
pub struct BoardRow {
    pub category: BoardCategory,
    pub cells: Vec<BoardCell>,
}

#[derive(Serialize, Debug, Clone)]
pub struct BoardWeek {
    pub days: Vec<NaiveDate>,
    pub rows: Vec<BoardRow>,
}

pub fn week_days(anchor: NaiveDate) -> InternalResult<Vec<NaiveDate>> {
    let monday = monday_of(anchor)?;
    (0..7).map(|i| shift(monday, i)).collect()
}

/// The Monday-first week containing `anchor`, one row per category.
pub fn board_week(
    categories: &[BoardCategory],
    tasks: &[BoardTask],
    anchor: NaiveDate,
) -> InternalResult<BoardWeek> {
    let days = week_days(anchor)?;

    let mut categories: Vec<&BoardCategory> = categories.iter().collect();
    categories.sort_by_key(|category| category.position);

    let rows = categories
        .into_iter()
        .map(|category| BoardRow {
            category: category.clone(),
            cells: days
                .iter()
                .map(|date| {
                    let mut cell_tasks: Vec<BoardTask> = tasks
                        .iter()
                        .filter(|task| task.category_id == category.id && task.task_date == *date)
                        .cloned()
                        .collect();
                    cell_tasks.sort_by_key(|task| task.position);
                    BoardCell {
                        date: *date,
                        tasks: cell_tasks,
                    }
                })
                .collect(),
        })
        .collect();

    Ok(BoardWeek { days, rows })
}
