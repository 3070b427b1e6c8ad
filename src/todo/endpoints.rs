use chrono::Utc;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use serde::Serialize;

use crate::bridge::{settle, IntoOutcome, MutationResponse};
use crate::config::LocalClock;
use crate::data::{DayParam, Owner};
use crate::gateway::{BatchReport, SqliteTableStore};
use crate::internal_error::InternalResult;

use super::data::*;
use super::helpers::*;
use super::rollover::{rollover, RolloverOutcome};
use super::views::*;

#[derive(Serialize, Debug)]
pub struct TaskList {
    pub tasks: Vec<Task>,
}

fn refreshed<T: IntoOutcome>(
    intent: &str,
    result: InternalResult<T>,
    store: &SqliteTableStore,
    owner: &Owner,
) -> InternalResult<MutationResponse<TaskList>> {
    let settled = settle(intent, result);
    let tasks = fetch_tasks(store, owner)?;

    Ok(settled.respond(TaskList { tasks }))
}

#[get("/<owner>/tasks")]
pub fn get_tasks(owner: Owner, store: &State<SqliteTableStore>) -> InternalResult<Json<TaskList>> {
    let tasks = fetch_tasks(store.inner(), &owner)?;

    Ok(Json(TaskList { tasks }))
}

#[get("/<owner>/tasks/day/<date>")]
pub fn get_day(
    owner: Owner,
    date: DayParam,
    store: &State<SqliteTableStore>,
    clock: &State<LocalClock>,
) -> InternalResult<Json<DayView>> {
    let tasks = fetch_tasks(store.inner(), &owner)?;

    Ok(Json(day_view(&tasks, date.0, clock)))
}

#[get("/<owner>/calendar/<year>/<month>")]
pub fn get_calendar(
    owner: Owner,
    year: i32,
    month: u32,
    store: &State<SqliteTableStore>,
    clock: &State<LocalClock>,
) -> InternalResult<Json<CalendarMonth>> {
    let tasks = fetch_tasks(store.inner(), &owner)?;

    calendar_month(&tasks, year, month, clock).map(Json)
}

#[post("/<owner>/add_task", format = "json", data = "<request>")]
pub fn add_task_endpoint(
    owner: Owner,
    request: Json<AddTaskRequest>,
    store: &State<SqliteTableStore>,
    clock: &State<LocalClock>,
) -> InternalResult<MutationResponse<TaskList>> {
    let store = store.inner();
    let result = add_task(store, &owner, &request, Utc::now(), clock);

    refreshed("add_task", result, store, &owner)
}

#[post("/<owner>/set_task", format = "json", data = "<request>")]
pub fn set_task_endpoint(
    owner: Owner,
    request: Json<SetTaskRequest>,
    store: &State<SqliteTableStore>,
) -> InternalResult<MutationResponse<TaskList>> {
    let store = store.inner();
    let result = set_task(store, &owner, &request);

    refreshed("set_task", result, store, &owner)
}

#[post("/<owner>/toggle_task", format = "json", data = "<request>")]
pub fn toggle_task_endpoint(
    owner: Owner,
    request: Json<TaskIdRequest>,
    store: &State<SqliteTableStore>,
) -> InternalResult<MutationResponse<TaskList>> {
    let store = store.inner();
    let result = toggle_task(store, &owner, request.task_id);

    refreshed("toggle_task", result, store, &owner)
}

#[post("/<owner>/delete_task", format = "json", data = "<request>")]
pub fn delete_task_endpoint(
    owner: Owner,
    request: Json<TaskIdRequest>,
    store: &State<SqliteTableStore>,
) -> InternalResult<MutationResponse<TaskList>> {
    let store = store.inner();
    let result = delete_task(store, &owner, request.task_id);

    refreshed("delete_task", result, store, &owner)
}

#[post("/<owner>/move_task", format = "json", data = "<request>")]
pub fn move_task_endpoint(
    owner: Owner,
    request: Json<TaskMove>,
    store: &State<SqliteTableStore>,
    clock: &State<LocalClock>,
) -> InternalResult<MutationResponse<TaskList>> {
    let store = store.inner();
    let result: InternalResult<BatchReport> = move_task(store, &owner, &request, clock);

    refreshed("move_task", result, store, &owner)
}

#[derive(Serialize, Debug)]
pub struct RolloverResponse {
    pub rollover: RolloverOutcome,
    pub tasks: Vec<Task>,
}

#[post("/<owner>/rollover_tasks", format = "json", data = "<request>")]
pub fn rollover_tasks(
    owner: Owner,
    request: Json<RolloverRequest>,
    store: &State<SqliteTableStore>,
    clock: &State<LocalClock>,
) -> InternalResult<Json<RolloverResponse>> {
    let store = store.inner();
    let reference = request.reference_date.unwrap_or_else(|| clock.today());
    let outcome = rollover(store, &owner, reference, clock, |_| request.confirmed)?;
    let tasks = fetch_tasks(store, &owner)?;

    Ok(Json(RolloverResponse {
        rollover: outcome,
        tasks,
    }))
}
