use chrono::Utc;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use serde::Serialize;

use crate::bridge::{settle, IntoOutcome, MutationResponse};
use crate::data::{DayParam, Owner};
use crate::gateway::SqliteTableStore;
use crate::internal_error::InternalResult;

use super::data::*;
use super::helpers::*;
use super::views::*;

#[derive(Serialize, Debug)]
pub struct BoardCollections {
    pub categories: Vec<BoardCategory>,
    pub tasks: Vec<BoardTask>,
}

fn fetch_collections(store: &SqliteTableStore, owner: &Owner) -> InternalResult<BoardCollections> {
    Ok(BoardCollections {
        categories: fetch_categories(store, owner)?,
        tasks: fetch_board_tasks(store, owner)?,
    })
}

fn refreshed<T: IntoOutcome>(
    intent: &str,
    result: InternalResult<T>,
    store: &SqliteTableStore,
    owner: &Owner,
) -> InternalResult<MutationResponse<BoardCollections>> {
    let settled = settle(intent, result);

    Ok(settled.respond(fetch_collections(store, owner)?))
}

#[get("/board/palette")]
pub fn get_palette() -> Json<&'static [PaletteColor]> {
    Json(&PALETTE[..])
}

#[get("/<owner>/board/categories")]
pub fn get_board(owner: Owner, store: &State<SqliteTableStore>) -> InternalResult<Json<BoardCollections>> {
    fetch_collections(store.inner(), &owner).map(Json)
}

#[get("/<owner>/board/week/<date>")]
pub fn get_board_week(
    owner: Owner,
    date: DayParam,
    store: &State<SqliteTableStore>,
) -> InternalResult<Json<BoardWeek>> {
    let board = fetch_collections(store.inner(), &owner)?;

    board_week(&board.categories, &board.tasks, date.0).map(Json)
}

#[post("/<owner>/add_category", format = "json", data = "<request>")]
pub fn add_category_endpoint(
    owner: Owner,
    request: Json<CategoryDraft>,
    store: &State<SqliteTableStore>,
) -> InternalResult<MutationResponse<BoardCollections>> {
    let store = store.inner();
    let result = add_category(store, &owner, &request, Utc::now());

    refreshed("add_category", result, store, &owner)
}

#[post("/<owner>/set_category", format = "json", data = "<request>")]
pub fn set_category_endpoint(
    owner: Owner,
    request: Json<SetCategoryRequest>,
    store: &State<SqliteTableStore>,
) -> InternalResult<MutationResponse<BoardCollections>> {
    let store = store.inner();
    let result = set_category(store, &owner, &request);

    refreshed("set_category", result, store, &owner)
}

/// Also drops the category's tasks, so both collections come back.
#[post("/<owner>/delete_category", format = "json", data = "<request>")]
pub fn delete_category_endpoint(
    owner: Owner,
    request: Json<CategoryIdRequest>,
    store: &State<SqliteTableStore>,
) -> InternalResult<MutationResponse<BoardCollections>> {
    let store = store.inner();
    let result = delete_category(store, &owner, request.category_id);

    refreshed("delete_category", result, store, &owner)
}

#[post("/<owner>/reorder_category", format = "json", data = "<request>")]
pub fn reorder_category_endpoint(
    owner: Owner,
    request: Json<ReorderCategoryRequest>,
    store: &State<SqliteTableStore>,
) -> InternalResult<MutationResponse<BoardCollections>> {
    let store = store.inner();
    let result = reorder_category(store, &owner, &request);

    refreshed("reorder_category", result, store, &owner)
}

#[post("/<owner>/add_board_task", format = "json", data = "<request>")]
pub fn add_board_task_endpoint(
    owner: Owner,
    request: Json<BoardTaskDraft>,
    store: &State<SqliteTableStore>,
) -> InternalResult<MutationResponse<BoardCollections>> {
    let store = store.inner();
    let result = add_board_task(store, &owner, &request, Utc::now());

    refreshed("add_board_task", result, store, &owner)
}

#[post("/<owner>/set_board_task", format = "json", data = "<request>")]
pub fn set_board_task_endpoint(
    owner: Owner,
    request: Json<SetBoardTaskRequest>,
    store: &State<SqliteTableStore>,
) -> InternalResult<MutationResponse<BoardCollections>> {
    let store = store.inner();
    let result = set_board_task(store, &owner, &request);

    refreshed("set_board_task", result, store, &owner)
}

#[post("/<owner>/toggle_board_task", format = "json", data = "<request>")]
pub fn toggle_board_task_endpoint(
    owner: Owner,
    request: Json<BoardTaskIdRequest>,
    store: &State<SqliteTableStore>,
) -> InternalResult<MutationResponse<BoardCollections>> {
    let store = store.inner();
    let result = toggle_board_task(store, &owner, request.task_id);

    refreshed("toggle_board_task", result, store, &owner)
}

#[post("/<owner>/delete_board_task", format = "json", data = "<request>")]
pub fn delete_board_task_endpoint(
    owner: Owner,
    request: Json<BoardTaskIdRequest>,
    store: &State<SqliteTableStore>,
) -> InternalResult<MutationResponse<BoardCollections>> {
    let store = store.inner();
    let result = delete_board_task(store, &owner, request.task_id);

    refreshed("delete_board_task", result, store, &owner)
}

#[post("/<owner>/move_board_task", format = "json", data = "<request>")]
pub fn move_board_task_endpoint(
    owner: Owner,
    request: Json<BoardTaskMove>,
    store: &State<SqliteTableStore>,
) -> InternalResult<MutationResponse<BoardCollections>> {
    let store = store.inner();
    let result = move_board_task(store, &owner, &request);

    refreshed("move_board_task", result, store, &owner)
}
