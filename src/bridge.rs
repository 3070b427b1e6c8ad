//! Turns user intents into store writes and always re-reads the owning collection.
//!
//! The HTTP routes use [`settle`] and [`Refreshed`] directly. [`Session`] is the
//! same flow for an in-process client: it keeps the fetched collections, marks
//! optimistic edits as pending until an authoritative re-fetch replaces them, and
//! drops fetch results that belong to a previous owner.

use chrono::{NaiveDate, Utc};
use rocket::http::Status;
use rocket::serde::json::Json;
use serde::Serialize;

use crate::board::data::*;
use crate::board::helpers as board;
use crate::config::LocalClock;
use crate::data::Owner;
use crate::gateway::{BatchReport, TableStore};
use crate::internal_error::InternalResult;
use crate::todo::data::*;
use crate::todo::helpers as todo;
use crate::todo::rollover::{self, RolloverOutcome, RolloverPlan};

/// What a single intent did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Written,
    /// Failed validation; nothing was sent.
    Ignored,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntentOutcome {
    Applied,
    Ignored,
    Failed { message: String },
}

pub trait IntoOutcome {
    fn into_outcome(self) -> IntentOutcome;
}

impl IntoOutcome for Effect {
    fn into_outcome(self) -> IntentOutcome {
        match self {
            Effect::Written => IntentOutcome::Applied,
            Effect::Ignored => IntentOutcome::Ignored,
        }
    }
}

impl IntoOutcome for BatchReport {
    fn into_outcome(self) -> IntentOutcome {
        if !self.is_complete() {
            IntentOutcome::Failed {
                message: format!(
                    "{} of {} updates failed",
                    self.failed,
                    self.failed + self.succeeded
                ),
            }
        } else if self.succeeded == 0 {
            IntentOutcome::Ignored
        } else {
            IntentOutcome::Applied
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled {
    pub outcome: IntentOutcome,
    pub status: Status,
}

pub fn settle<T: IntoOutcome>(intent: &str, result: InternalResult<T>) -> Settled {
    match result {
        Ok(value) => {
            let outcome = value.into_outcome();
            let status = match &outcome {
                IntentOutcome::Failed { message } => {
                    tracing::warn!(intent, %message, "intent partially failed");
                    Status::InternalServerError
                }
                _ => Status::Ok,
            };
            Settled { outcome, status }
        }
        Err(e) => {
            tracing::warn!(intent, error = %e, "intent failed");
            Settled {
                status: e.status(),
                outcome: IntentOutcome::Failed {
                    message: e.to_string(),
                },
            }
        }
    }
}

/// A mutation's outcome together with the re-fetched collections.
#[derive(Serialize, Debug)]
pub struct Refreshed<T> {
    pub outcome: IntentOutcome,
    #[serde(flatten)]
    pub collections: T,
}

pub type MutationResponse<T> = (Status, Json<Refreshed<T>>);

impl Settled {
    pub fn respond<T>(self, collections: T) -> MutationResponse<T> {
        (
            self.status,
            Json(Refreshed {
                outcome: self.outcome,
                collections,
            }),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tracked<T> {
    pub item: T,
    /// Locally changed and not yet confirmed by a re-fetch.
    pub pending: bool,
}

impl<T> Tracked<T> {
    fn confirmed(item: T) -> Tracked<T> {
        Tracked {
            item,
            pending: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerContext {
    pub owner: Owner,
    pub epoch: u64,
}

/// Identifies the context a fetch was issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    owner: Owner,
    epoch: u64,
}

pub struct Session<S> {
    store: S,
    clock: LocalClock,
    context: OwnerContext,
    tasks: Vec<Tracked<Task>>,
    categories: Vec<Tracked<BoardCategory>>,
    board_tasks: Vec<Tracked<BoardTask>>,
}

fn confirmed_all<T>(items: Vec<T>) -> Vec<Tracked<T>> {
    items.into_iter().map(Tracked::confirmed).collect()
}

impl<S: TableStore> Session<S> {
    pub fn new(store: S, owner: Owner, clock: LocalClock) -> Session<S> {
        Session {
            store,
            clock,
            context: OwnerContext { owner, epoch: 0 },
            tasks: vec![],
            categories: vec![],
            board_tasks: vec![],
        }
    }

    pub fn context(&self) -> &OwnerContext {
        &self.context
    }

    pub fn tasks(&self) -> &[Tracked<Task>] {
        &self.tasks
    }

    pub fn categories(&self) -> &[Tracked<BoardCategory>] {
        &self.categories
    }

    pub fn board_tasks(&self) -> &[Tracked<BoardTask>] {
        &self.board_tasks
    }

    pub fn ticket(&self) -> FetchTicket {
        FetchTicket {
            owner: self.context.owner.clone(),
            epoch: self.context.epoch,
        }
    }

    fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.epoch == self.context.epoch && ticket.owner == self.context.owner
    }

    /// Starts a new context. Results of fetches issued before this are discarded.
    pub fn switch_owner(&mut self, owner: Owner) -> FetchTicket {
        self.context = OwnerContext {
            owner,
            epoch: self.context.epoch + 1,
        };
        self.tasks.clear();
        self.categories.clear();
        self.board_tasks.clear();
        tracing::debug!(owner = %self.context.owner, epoch = self.context.epoch, "owner switched");

        self.ticket()
    }

    pub fn fetch_tasks(&self, ticket: &FetchTicket) -> InternalResult<Vec<Task>> {
        todo::fetch_tasks(&self.store, &ticket.owner)
    }

    pub fn fetch_board(
        &self,
        ticket: &FetchTicket,
    ) -> InternalResult<(Vec<BoardCategory>, Vec<BoardTask>)> {
        Ok((
            board::fetch_categories(&self.store, &ticket.owner)?,
            board::fetch_board_tasks(&self.store, &ticket.owner)?,
        ))
    }

    /// Returns false when the ticket is stale and the rows were dropped.
    pub fn accept_tasks(&mut self, ticket: &FetchTicket, tasks: Vec<Task>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(epoch = ticket.epoch, "discarding stale task fetch");
            return false;
        }
        self.tasks = confirmed_all(tasks);
        true
    }

    pub fn accept_board(
        &mut self,
        ticket: &FetchTicket,
        categories: Vec<BoardCategory>,
        tasks: Vec<BoardTask>,
    ) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(epoch = ticket.epoch, "discarding stale board fetch");
            return false;
        }
        self.categories = confirmed_all(categories);
        self.board_tasks = confirmed_all(tasks);
        true
    }

    pub fn refresh_tasks(&mut self) -> InternalResult<()> {
        let ticket = self.ticket();
        let tasks = self.fetch_tasks(&ticket)?;
        self.accept_tasks(&ticket, tasks);
        Ok(())
    }

    pub fn refresh_board(&mut self) -> InternalResult<()> {
        let ticket = self.ticket();
        let (categories, tasks) = self.fetch_board(&ticket)?;
        self.accept_board(&ticket, categories, tasks);
        Ok(())
    }

    pub fn refresh(&mut self) -> InternalResult<()> {
        self.refresh_tasks()?;
        self.refresh_board()
    }

    fn after_write(&mut self, refresh: fn(&mut Self) -> InternalResult<()>) {
        if let Err(e) = refresh(self) {
            tracing::warn!(error = %e, "re-fetch after write failed; local state may be stale");
        }
    }

    fn run_task_intent<T: IntoOutcome>(
        &mut self,
        intent: &'static str,
        write: impl FnOnce(&S, &Owner, &LocalClock) -> InternalResult<T>,
    ) -> IntentOutcome {
        let owner = self.context.owner.clone();
        let settled = settle(intent, write(&self.store, &owner, &self.clock));
        self.after_write(Self::refresh_tasks);
        settled.outcome
    }

    fn run_board_intent<T: IntoOutcome>(
        &mut self,
        intent: &'static str,
        write: impl FnOnce(&S, &Owner) -> InternalResult<T>,
    ) -> IntentOutcome {
        let owner = self.context.owner.clone();
        let settled = settle(intent, write(&self.store, &owner));
        self.after_write(Self::refresh_board);
        settled.outcome
    }

    fn mark_task(&mut self, task_id: TaskID, patch: &TaskPatch) {
        if let Some(tracked) = self.tasks.iter_mut().find(|t| t.item.id == task_id) {
            patch.apply_to(&mut tracked.item);
            tracked.pending = true;
        }
    }

    fn mark_board_task(&mut self, task_id: BoardTaskID, patch: &BoardTaskPatch) {
        if let Some(tracked) = self.board_tasks.iter_mut().find(|t| t.item.id == task_id) {
            patch.apply_to(&mut tracked.item);
            tracked.pending = true;
        }
    }

    fn mark_category(&mut self, category_id: CategoryID, patch: &CategoryPatch) {
        if let Some(tracked) = self.categories.iter_mut().find(|c| c.item.id == category_id) {
            patch.apply_to(&mut tracked.item);
            tracked.pending = true;
        }
    }

    // Tasks

    pub fn add_task(&mut self, request: &AddTaskRequest) -> IntentOutcome {
        self.run_task_intent("add_task", |store, owner, clock| {
            todo::add_task(store, owner, request, Utc::now(), clock)
        })
    }

    pub fn set_task(&mut self, request: &SetTaskRequest) -> IntentOutcome {
        if let Some(patch) = todo::edit_patch(request) {
            self.mark_task(request.task_id, &patch);
        }
        self.run_task_intent("set_task", |store, owner, _| todo::set_task(store, owner, request))
    }

    pub fn toggle_task(&mut self, task_id: TaskID) -> IntentOutcome {
        let patch = self
            .tasks
            .iter()
            .find(|t| t.item.id == task_id)
            .map(|t| todo::toggle_patch(&t.item));
        if let Some(patch) = patch {
            self.mark_task(task_id, &patch);
        }
        self.run_task_intent("toggle_task", |store, owner, _| {
            todo::toggle_task(store, owner, task_id)
        })
    }

    pub fn delete_task(&mut self, task_id: TaskID) -> IntentOutcome {
        self.run_task_intent("delete_task", |store, owner, _| {
            todo::delete_task(store, owner, task_id)
        })
    }

    pub fn move_task(&mut self, spec: &TaskMove) -> IntentOutcome {
        let tasks: Vec<Task> = self.tasks.iter().map(|t| t.item.clone()).collect();
        let patches = match todo::plan_task_move(&tasks, spec, &self.clock) {
            Ok(patches) => patches,
            Err(e) => {
                let settled = settle::<BatchReport>("move_task", Err(e));
                self.after_write(Self::refresh_tasks);
                return settled.outcome;
            }
        };
        for (task_id, patch) in &patches {
            self.mark_task(*task_id, patch);
        }

        self.run_task_intent("move_task", |store, owner, _| {
            Ok(todo::persist_task_patches(store, owner, &patches))
        })
    }

    /// Rolls unfinished tasks from before `reference` onto it. `confirm` is only
    /// consulted for a non-empty selection.
    pub fn rollover(
        &mut self,
        reference: NaiveDate,
        confirm: impl FnOnce(&RolloverPlan) -> bool,
    ) -> InternalResult<RolloverOutcome> {
        let owner = self.context.owner.clone();
        let outcome = rollover::rollover(&self.store, &owner, reference, &self.clock, confirm);
        self.after_write(Self::refresh_tasks);
        outcome
    }

    // Board

    pub fn add_category(&mut self, draft: &CategoryDraft) -> IntentOutcome {
        self.run_board_intent("add_category", |store, owner| {
            board::add_category(store, owner, draft, Utc::now())
        })
    }

    pub fn set_category(&mut self, request: &SetCategoryRequest) -> IntentOutcome {
        if let Some(patch) = board::category_patch(&request.draft) {
            self.mark_category(request.category_id, &patch);
        }
        self.run_board_intent("set_category", |store, owner| {
            board::set_category(store, owner, request)
        })
    }

    pub fn delete_category(&mut self, category_id: CategoryID) -> IntentOutcome {
        self.run_board_intent("delete_category", |store, owner| {
            board::delete_category(store, owner, category_id)
        })
    }

    pub fn reorder_category(&mut self, request: &ReorderCategoryRequest) -> IntentOutcome {
        let categories: Vec<BoardCategory> = self.categories.iter().map(|c| c.item.clone()).collect();
        if let Ok(patches) = board::plan_category_reorder(&categories, request) {
            for (category_id, patch) in &patches {
                self.mark_category(*category_id, patch);
            }
        }
        self.run_board_intent("reorder_category", |store, owner| {
            board::reorder_category(store, owner, request)
        })
    }

    pub fn add_board_task(&mut self, draft: &BoardTaskDraft) -> IntentOutcome {
        self.run_board_intent("add_board_task", |store, owner| {
            board::add_board_task(store, owner, draft, Utc::now())
        })
    }

    pub fn set_board_task(&mut self, request: &SetBoardTaskRequest) -> IntentOutcome {
        if let Some(patch) = board::board_task_patch(&request.draft) {
            self.mark_board_task(request.task_id, &patch);
        }
        self.run_board_intent("set_board_task", |store, owner| {
            board::set_board_task(store, owner, request)
        })
    }

    pub fn toggle_board_task(&mut self, task_id: BoardTaskID) -> IntentOutcome {
        let patch = self
            .board_tasks
            .iter()
            .find(|t| t.item.id == task_id)
            .map(|t| board::board_toggle_patch(&t.item));
        if let Some(patch) = patch {
            self.mark_board_task(task_id, &patch);
        }
        self.run_board_intent("toggle_board_task", |store, owner| {
            board::toggle_board_task(store, owner, task_id)
        })
    }

    pub fn delete_board_task(&mut self, task_id: BoardTaskID) -> IntentOutcome {
        self.run_board_intent("delete_board_task", |store, owner| {
            board::delete_board_task(store, owner, task_id)
        })
    }

    pub fn move_board_task(&mut self, spec: &BoardTaskMove) -> IntentOutcome {
        let tasks: Vec<BoardTask> = self.board_tasks.iter().map(|t| t.item.clone()).collect();
        let categories: Vec<BoardCategory> =
            self.categories.iter().map(|c| c.item.clone()).collect();
        let patches = match board::plan_board_move(&tasks, &categories, spec) {
            Ok(patches) => patches,
            Err(e) => {
                let settled = settle::<BatchReport>("move_board_task", Err(e));
                self.after_write(Self::refresh_board);
                return settled.outcome;
            }
        };
        for (task_id, patch) in &patches {
            self.mark_board_task(*task_id, patch);
        }

        self.run_board_intent("move_board_task", |store, owner| {
            Ok(board::persist_board_patches(store, owner, &patches))
        })
    }
}
