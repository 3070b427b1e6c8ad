//! A personal dashboard service: dated tasks with a schedule list, a weekly
//! timeline board, a month calendar and a scratch note, all served as JSON.

use rocket::figment::Figment;
use rocket::{routes, Build, Rocket};

pub mod board;
pub mod bridge;
pub mod config;
pub mod data;
pub mod gateway;
pub mod internal_error;
pub mod ordering;
pub mod scratch;
pub mod todo;

use crate::config::DashboardConfig;
use crate::gateway::SqliteTableStore;
use crate::internal_error::InternalResult;
use crate::scratch::helpers::SqliteScratchStore;

/// Opens the database named in `figment` and mounts every route under `/api`.
pub fn build(figment: Figment) -> InternalResult<Rocket<Build>> {
    let config = DashboardConfig::from_figment(&figment)?;
    let clock = config.clock();
    let connection = data::open_database(&config.database)?;
    tracing::info!(database = %config.database, offset = %clock.offset, "dashboard configured");

    Ok(rocket::custom(figment)
        .manage(SqliteTableStore::new(connection.clone()))
        .manage(SqliteScratchStore::new(connection))
        .manage(clock)
        .manage(config)
        .mount(
            "/api",
            routes![
                todo::endpoints::get_tasks,
                todo::endpoints::get_day,
                todo::endpoints::get_calendar,
                todo::endpoints::add_task_endpoint,
                todo::endpoints::set_task_endpoint,
                todo::endpoints::toggle_task_endpoint,
                todo::endpoints::delete_task_endpoint,
                todo::endpoints::move_task_endpoint,
                todo::endpoints::rollover_tasks,
                board::endpoints::get_palette,
                board::endpoints::get_board,
                board::endpoints::get_board_week,
                board::endpoints::add_category_endpoint,
                board::endpoints::set_category_endpoint,
                board::endpoints::delete_category_endpoint,
                board::endpoints::reorder_category_endpoint,
                board::endpoints::add_board_task_endpoint,
                board::endpoints::set_board_task_endpoint,
                board::endpoints::toggle_board_task_endpoint,
                board::endpoints::delete_board_task_endpoint,
                board::endpoints::move_board_task_endpoint,
                scratch::endpoints::get_scratchpad,
                scratch::endpoints::set_scratchpad,
            ],
        ))
}
