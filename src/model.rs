use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type DateKey = NaiveDate;

/// Every day's lists, keyed by date. Serializes as a YAML mapping with the
/// keys in ascending order.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct TaskStore {
    days: BTreeMap<DateKey, DayTasks>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct DayTasks {
    #[serde(default)]
    pub completed: Vec<String>,
    #[serde(default)]
    pub todo: Vec<String>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TaskError {
    #[error("no to-do item at index {index} (list has {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

impl TaskStore {
    /// Working copy of a day's lists, empty when the store has no entry.
    pub fn day(&self, date: DateKey) -> DayTasks {
        self.days.get(&date).cloned().unwrap_or_default()
    }

    pub fn get(&self, date: DateKey) -> Option<&DayTasks> {
        self.days.get(&date)
    }

    pub fn set_day(&mut self, date: DateKey, tasks: DayTasks) {
        self.days.insert(date, tasks);
    }

    /// Unfinished items of the calendar day before `date`.
    pub fn previous_todo(&self, date: DateKey) -> Vec<String> {
        date.pred_opt()
            .and_then(|prev| self.days.get(&prev))
            .map(|day| day.todo.clone())
            .unwrap_or_default()
    }

    pub fn remove_day(&mut self, date: DateKey) -> Option<DayTasks> {
        self.days.remove(&date)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DateKey, &DayTasks)> {
        self.days.iter()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl DayTasks {
    pub fn move_to_bottom(&mut self, index: usize) -> Result<(), TaskError> {
        self.check(index)?;
        let item = self.todo.remove(index);
        self.todo.push(item);
        Ok(())
    }

    /// Swaps with the next item. Returns `false` when already last.
    pub fn move_down(&mut self, index: usize) -> Result<bool, TaskError> {
        self.check(index)?;
        if index + 1 >= self.todo.len() {
            return Ok(false);
        }
        self.todo.swap(index, index + 1);
        Ok(true)
    }

    /// Swaps with the previous item. Returns `false` when already first.
    pub fn move_up(&mut self, index: usize) -> Result<bool, TaskError> {
        self.check(index)?;
        if index == 0 {
            return Ok(false);
        }
        self.todo.swap(index, index - 1);
        Ok(true)
    }

    pub fn move_to_top(&mut self, index: usize) -> Result<(), TaskError> {
        self.check(index)?;
        let item = self.todo.remove(index);
        self.todo.insert(0, item);
        Ok(())
    }

    /// New tasks go to the front of the list.
    pub fn add(&mut self, text: impl Into<String>) {
        self.todo.insert(0, text.into());
    }

    pub fn delete(&mut self, index: usize) -> Result<String, TaskError> {
        self.check(index)?;
        Ok(self.todo.remove(index))
    }

    pub fn tick(&mut self, index: usize) -> Result<&str, TaskError> {
        self.check(index)?;
        let item = self.todo.remove(index);
        self.completed.push(item);
        Ok(self.completed.last().map(String::as_str).unwrap_or_default())
    }

    pub fn carry(&mut self, items: Vec<String>) -> usize {
        let count = items.len();
        self.todo.extend(items);
        count
    }

    fn check(&self, index: usize) -> Result<(), TaskError> {
        if index >= self.todo.len() {
            return Err(TaskError::IndexOutOfRange {
                index,
                len: self.todo.len(),
            });
        }
        Ok(())
    }
}
