//! Client-side view of the remote task list.
//!
//! The server is the only authority: every mutation is written through to the
//! API and followed by a full re-fetch that replaces the local snapshot. The
//! snapshot is written in exactly one place, the success path of `refresh`.
//!
//! Overlapping refreshes are not serialized. A slow, older response can land
//! after a newer one and overwrite it; `ControllerSettings::discard_stale`
//! turns on sequence-number discarding for callers that need ordering.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use focusflow_shared::{TaskCreate, TaskDto, TaskId, TaskPatch};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::api::TaskApi;
use crate::debounce::Debouncer;
use crate::error::ClientError;
use crate::query::{Query, StatusFilter};
use crate::stats::DerivedStats;

pub const DELETE_PROMPT: &str = "Delete this task?";
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Gate in front of destructive actions.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub search_debounce: Duration,
    pub discard_stale: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            discard_stale: false,
        }
    }
}

#[derive(Debug, Default)]
struct ViewState {
    tasks: Vec<TaskDto>,
    query: Query,
    loading: bool,
    draft_title: String,
    viewing: Option<TaskDto>,
    editing: Option<TaskDto>,
    last_error: Option<ClientError>,
    applied_seq: u64,
}

struct Shared<A> {
    api: A,
    discard_stale: bool,
    state: Mutex<ViewState>,
    next_seq: AtomicU64,
    version: watch::Sender<u64>,
}

impl<A: TaskApi> Shared<A> {
    async fn refresh(&self) -> Result<(), ClientError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let args = {
            let mut state = self.state.lock();
            state.loading = true;
            state.query.to_list_args()
        };
        debug!(seq, search = ?args.search, status = ?args.status, "refreshing task snapshot");

        let result = self.api.list_tasks(&args).await;

        let mut state = self.state.lock();
        state.loading = false;
        match result {
            Ok(tasks) => {
                if self.discard_stale && seq < state.applied_seq {
                    debug!(
                        seq,
                        applied = state.applied_seq,
                        "discarding stale task snapshot"
                    );
                    return Ok(());
                }
                debug!(seq, count = tasks.len(), "applied task snapshot");
                state.applied_seq = seq;
                state.tasks = tasks;
                state.last_error = None;
                drop(state);
                self.version.send_modify(|v| *v += 1);
                Ok(())
            }
            Err(err) => {
                warn!(seq, error = %err, "task refresh failed; keeping previous snapshot");
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Follow-up fetch after a successful mutation. Its failure is recorded,
    /// not returned, because the mutation itself already went through.
    async fn refresh_after(&self, op: &'static str) {
        if let Err(err) = self.refresh().await {
            debug!(op, error = %err, "refresh after mutation failed");
        }
    }

    fn report(&self, op: &'static str, err: ClientError) -> ClientError {
        warn!(op, error = %err, "task operation failed");
        self.state.lock().last_error = Some(err.clone());
        err
    }
}

pub struct TaskListController<A> {
    shared: Arc<Shared<A>>,
    debouncer: Mutex<Debouncer>,
}

impl<A> TaskListController<A>
where
    A: TaskApi + 'static,
{
    pub fn new(api: A, settings: ControllerSettings) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                api,
                discard_stale: settings.discard_stale,
                state: Mutex::new(ViewState::default()),
                next_seq: AtomicU64::new(0),
                version,
            }),
            debouncer: Mutex::new(Debouncer::new(settings.search_debounce)),
        }
    }

    pub fn api(&self) -> &A {
        &self.shared.api
    }

    /// Updates the search text and re-arms the debounced refresh. Does not
    /// fetch by itself. Must be called inside a tokio runtime.
    #[instrument(skip(self, text))]
    pub fn set_search_text(&self, text: impl Into<String>) {
        let text = text.into();
        debug!(search = %text, "search text changed");
        self.shared.state.lock().query.search_text = text;

        let shared = Arc::clone(&self.shared);
        self.debouncer.lock().schedule(async move {
            // failure is already logged and kept in last_error
            let _ = shared.refresh().await;
        });
    }

    /// Filter changes are discrete, so they refresh immediately. The
    /// immediate fetch already carries the latest search text, which makes a
    /// pending debounced refresh redundant.
    #[instrument(skip(self))]
    pub async fn set_status_filter(&self, filter: StatusFilter) -> Result<(), ClientError> {
        self.debouncer.lock().cancel();
        self.shared.state.lock().query.status_filter = filter;
        self.shared.refresh().await
    }

    /// Replaces the whole query without fetching; drops any pending search.
    pub fn set_query(&self, query: Query) {
        self.debouncer.lock().cancel();
        self.shared.state.lock().query = query;
    }

    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), ClientError> {
        self.shared.refresh().await
    }

    pub fn set_draft_title(&self, text: impl Into<String>) {
        self.shared.state.lock().draft_title = text.into();
    }

    pub async fn submit_draft(&self) -> Result<TaskDto, ClientError> {
        let draft = self.draft_title();
        self.add_task(&draft).await
    }

    /// Blank titles are rejected before any request is made. The draft is
    /// cleared only when it is what got submitted.
    #[instrument(skip(self, title), fields(title_len = title.len()))]
    pub async fn add_task(&self, title: &str) -> Result<TaskDto, ClientError> {
        let title = title.trim();
        if title.is_empty() {
            debug!("ignoring blank task title");
            return Err(ClientError::validation("task title must not be empty"));
        }

        let create = TaskCreate {
            title: title.to_string(),
        };
        let created = self
            .shared
            .api
            .create_task(&create)
            .await
            .map_err(|err| self.shared.report("add_task", err))?;

        info!(task_id = created.id, "task created");
        {
            let mut state = self.shared.state.lock();
            if state.draft_title.trim() == title {
                state.draft_title.clear();
            }
        }
        self.shared.refresh_after("add_task").await;
        Ok(created)
    }

    /// Round-trips through the server; the local row is not flipped first.
    #[instrument(skip(self, task), fields(task_id = task.id, status = task.status))]
    pub async fn toggle_completion(&self, task: &TaskDto) -> Result<TaskDto, ClientError> {
        let updated = self
            .shared
            .api
            .update_task(task.id, &TaskPatch::status(!task.status))
            .await
            .map_err(|err| self.shared.report("toggle_completion", err))?;

        info!(task_id = task.id, status = updated.status, "task completion toggled");
        self.shared.refresh_after("toggle_completion").await;
        Ok(updated)
    }

    #[instrument(skip(self, title, remarks))]
    pub async fn update_task(
        &self,
        task_id: TaskId,
        title: &str,
        remarks: Option<&str>,
    ) -> Result<TaskDto, ClientError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ClientError::validation("task title must not be empty"));
        }

        let patch = TaskPatch::details(title, remarks.map(str::to_string));
        let updated = self
            .shared
            .api
            .update_task(task_id, &patch)
            .await
            .map_err(|err| self.shared.report("update_task", err))?;

        info!(task_id, "task details updated");
        self.shared.state.lock().editing = None;
        self.shared.refresh_after("update_task").await;
        Ok(updated)
    }

    /// Returns `Ok(false)` when the confirmation was declined and nothing was sent.
    #[instrument(skip(self, confirm))]
    pub async fn delete_task<C>(&self, task_id: TaskId, confirm: &C) -> Result<bool, ClientError>
    where
        C: Confirm + ?Sized,
    {
        if !confirm.confirm(DELETE_PROMPT) {
            debug!(task_id, "delete not confirmed");
            return Ok(false);
        }

        self.shared
            .api
            .delete_task(task_id)
            .await
            .map_err(|err| self.shared.report("delete_task", err))?;

        info!(task_id, "task deleted");
        self.shared.refresh_after("delete_task").await;
        Ok(true)
    }

    pub fn select_for_view(&self, task: &TaskDto) {
        self.shared.state.lock().viewing = Some(task.clone());
    }

    pub fn select_for_edit(&self, task: &TaskDto) {
        self.shared.state.lock().editing = Some(task.clone());
    }

    pub fn clear_view(&self) {
        self.shared.state.lock().viewing = None;
    }

    pub fn clear_edit(&self) {
        self.shared.state.lock().editing = None;
    }

    pub fn clear_selection(&self) {
        let mut state = self.shared.state.lock();
        state.viewing = None;
        state.editing = None;
    }

    /// Returns false when no task is selected for editing.
    pub fn set_edit_title(&self, title: impl Into<String>) -> bool {
        match self.shared.state.lock().editing.as_mut() {
            Some(task) => {
                task.title = title.into();
                true
            }
            None => false,
        }
    }

    pub fn set_edit_remarks(&self, remarks: impl Into<String>) -> bool {
        match self.shared.state.lock().editing.as_mut() {
            Some(task) => {
                task.remarks = Some(remarks.into());
                true
            }
            None => false,
        }
    }

    pub async fn save_edit(&self) -> Result<TaskDto, ClientError> {
        let Some(edit) = self.editing() else {
            return Err(ClientError::validation("no task selected for editing"));
        };
        self.update_task(edit.id, &edit.title, edit.remarks.as_deref())
            .await
    }

    pub fn stats(&self) -> DerivedStats {
        DerivedStats::from_tasks(&self.shared.state.lock().tasks)
    }

    pub fn tasks(&self) -> Vec<TaskDto> {
        self.shared.state.lock().tasks.clone()
    }

    pub fn find(&self, task_id: TaskId) -> Option<TaskDto> {
        self.shared
            .state
            .lock()
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
    }

    pub fn query(&self) -> Query {
        self.shared.state.lock().query.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state.lock().loading
    }

    pub fn draft_title(&self) -> String {
        self.shared.state.lock().draft_title.clone()
    }

    pub fn viewing(&self) -> Option<TaskDto> {
        self.shared.state.lock().viewing.clone()
    }

    pub fn editing(&self) -> Option<TaskDto> {
        self.shared.state.lock().editing.clone()
    }

    pub fn last_error(&self) -> Option<ClientError> {
        self.shared.state.lock().last_error.clone()
    }

    /// Bumped every time a fetched snapshot is applied.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.version.subscribe()
    }

    pub fn has_pending_search(&self) -> bool {
        self.debouncer.lock().is_pending()
    }

    /// Teardown: disarms the search timer. A refresh it already started runs to completion.
    pub fn shutdown(&self) {
        self.debouncer.lock().cancel();
    }
}
