use rocket::serde::json::Json;
use rocket::{get, post, State};

use crate::config::DashboardConfig;
use crate::internal_error::InternalResult;

use super::data::*;
use super::helpers::*;

#[get("/scratchpad")]
pub fn get_scratchpad(
    scratch_store: &State<SqliteScratchStore>,
    config: &State<DashboardConfig>,
) -> InternalResult<Json<ScratchNote>> {
    let content = scratch_store.get(&config.scratch_key)?;

    Ok(Json(ScratchNote { content }))
}

#[post("/set_scratchpad", format = "json", data = "<request>")]
pub fn set_scratchpad(
    request: Json<SetScratchRequest>,
    scratch_store: &State<SqliteScratchStore>,
    config: &State<DashboardConfig>,
) -> InternalResult<()> {
    scratch_store.set(&config.scratch_key, &request.content)?;

    Ok(())
}
