use crate::model::{DateKey, DayTasks, TaskError, TaskStore};
use crate::storage::{load_store, save_store, StorageError, StoreLocation};
use crate::view::{self, ActionKind, ViewTree};
use tracing::{debug, info, warn};

/// One user interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    DateChanged(DateKey),
    ActionFired { kind: ActionKind, index: usize },
    TaskAdded { text: String },
    RolledOver,
}

/// What the surface shows after an event: the rebuilt tree and the value the
/// new-task input should hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub view: ViewTree,
    pub input: String,
    pub message: String,
}

#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Process state: every day's lists, the selected date and its working copy.
pub struct AppState {
    store: TaskStore,
    location: StoreLocation,
    selected: DateKey,
    current: DayTasks,
}

impl AppState {
    pub fn new(store: TaskStore, location: StoreLocation, selected: DateKey) -> Self {
        let current = store.day(selected);
        AppState {
            store,
            location,
            selected,
            current,
        }
    }

    pub fn open(location: StoreLocation, selected: DateKey) -> Result<Self, StorageError> {
        let store = load_store(&location)?;
        Ok(AppState::new(store, location, selected))
    }

    pub fn selected_date(&self) -> DateKey {
        self.selected
    }

    pub fn current(&self) -> &DayTasks {
        &self.current
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn view(&self) -> ViewTree {
        view::render(&self.current)
    }

    /// Applies exactly one mutation. `None` means nothing was triggered and
    /// the previous output stays as it is.
    pub fn dispatch(
        &mut self,
        event: Option<Event>,
        input: &str,
    ) -> Result<Option<Outcome>, DispatchError> {
        let Some(event) = event else {
            return Ok(None);
        };
        debug!(?event, date = %self.selected, "dispatching");
        let mut input = input.to_string();
        let before = self.current.clone();
        let message = match event {
            Event::DateChanged(date) => {
                self.selected = date;
                self.current = self.store.day(date);
                info!(date = %date, "selected date changed");
                let message = match self.store.get(date) {
                    Some(_) => format!("Showing {}", date),
                    None => format!("No tasks yet for {}", date),
                };
                return Ok(Some(self.outcome(input, message)));
            }
            Event::ActionFired { kind, index } => self.apply_action(kind, index)?,
            Event::TaskAdded { text } => {
                if text.trim().is_empty() {
                    debug!("ignoring blank task submission");
                    return Ok(None);
                }
                let message = format!("Added \"{}\"", text);
                self.current.add(text);
                input.clear();
                message
            }
            Event::RolledOver => {
                let carried = self.store.previous_todo(self.selected);
                match self.current.carry(carried) {
                    0 => "Nothing to roll over from the previous day".to_string(),
                    1 => "Rolled over 1 task".to_string(),
                    n => format!("Rolled over {} tasks", n),
                }
            }
        };
        let stored = self.store.get(self.selected).cloned();
        self.store.set_day(self.selected, self.current.clone());
        if let Err(err) = save_store(&self.location, &self.store) {
            warn!(error = %err, date = %self.selected, "save failed, reverting");
            self.current = before;
            match stored {
                Some(day) => self.store.set_day(self.selected, day),
                None => {
                    self.store.remove_day(self.selected);
                }
            }
            return Err(err.into());
        }
        info!(date = %self.selected, "{}", message);
        Ok(Some(self.outcome(input, message)))
    }

    fn apply_action(&mut self, kind: ActionKind, index: usize) -> Result<String, TaskError> {
        let message = match kind {
            ActionKind::Bottom => {
                self.current.move_to_bottom(index)?;
                "Moved to bottom".to_string()
            }
            ActionKind::Down => {
                if self.current.move_down(index)? {
                    "Moved down".to_string()
                } else {
                    "Already last".to_string()
                }
            }
            ActionKind::Up => {
                if self.current.move_up(index)? {
                    "Moved up".to_string()
                } else {
                    "Already first".to_string()
                }
            }
            ActionKind::Top => {
                self.current.move_to_top(index)?;
                "Moved to top".to_string()
            }
            ActionKind::Delete => {
                let removed = self.current.delete(index)?;
                format!("Deleted \"{}\"", removed)
            }
            ActionKind::Tick => {
                let done = self.current.tick(index)?;
                format!("Completed \"{}\"", done)
            }
        };
        Ok(message)
    }

    fn outcome(&self, input: String, message: String) -> Outcome {
        Outcome {
            view: self.view(),
            input,
            message,
        }
    }
}
