//! Builds the displayable tree for one day's lists.
//!
//! The tree is plain data: the terminal UI draws it, and tests inspect it
//! directly. Nothing here reads state other than the lists passed in.

use crate::model::DayTasks;
use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTree {
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Completed,
    Todo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub title: &'static str,
    pub expanded: bool,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub index: usize,
    pub text: String,
    pub controls: Vec<Control>,
}

/// Per-row action on a to-do item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Bottom,
    Down,
    Up,
    Top,
    Delete,
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    pub kind: ActionKind,
    pub index: usize,
}

impl ActionKind {
    /// Display order of the controls on a to-do row.
    pub const ALL: [ActionKind; 6] = [
        ActionKind::Bottom,
        ActionKind::Down,
        ActionKind::Up,
        ActionKind::Top,
        ActionKind::Delete,
        ActionKind::Tick,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            ActionKind::Bottom => "⇊",
            ActionKind::Down => "↓",
            ActionKind::Up => "↑",
            ActionKind::Top => "⇈",
            ActionKind::Delete => "✗",
            ActionKind::Tick => "✓",
        }
    }
}

impl SectionKind {
    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Completed => "Completed",
            SectionKind::Todo => "To Do",
        }
    }
}

impl ViewTree {
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }
}

pub fn render(day: &DayTasks) -> ViewTree {
    let completed = day
        .completed
        .iter()
        .enumerate()
        .map(|(index, text)| Row {
            index,
            text: text.clone(),
            controls: Vec::new(),
        })
        .collect();
    let todo = day
        .todo
        .iter()
        .enumerate()
        .map(|(index, text)| Row {
            index,
            text: text.clone(),
            controls: ActionKind::ALL
                .iter()
                .map(|&kind| Control { kind, index })
                .collect(),
        })
        .collect();
    ViewTree {
        sections: vec![
            section(SectionKind::Completed, completed),
            section(SectionKind::Todo, todo),
        ],
    }
}

fn section(kind: SectionKind, rows: Vec<Row>) -> Section {
    Section {
        kind,
        title: kind.title(),
        expanded: true,
        rows,
    }
}

/// Header form of a date, e.g. `2nd January 2024`.
pub fn long_date(date: NaiveDate) -> String {
    let day = date.day();
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{} {}", day, suffix, date.format("%B %Y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn completed_rows_have_no_controls() {
        let day = DayTasks {
            completed: vec!["done one".into(), "done two".into()],
            todo: Vec::new(),
        };
        let tree = render(&day);
        let completed = tree.section(SectionKind::Completed).unwrap();
        assert_eq!(completed.title, "Completed");
        assert_eq!(completed.rows.len(), 2);
        assert!(completed.rows.iter().all(|r| r.controls.is_empty()));
        assert!(tree.section(SectionKind::Todo).unwrap().rows.is_empty());
    }

    #[test]
    fn todo_rows_carry_six_indexed_controls_in_order() {
        let day = DayTasks {
            completed: Vec::new(),
            todo: vec!["first".into(), "second".into()],
        };
        let tree = render(&day);
        let todo = tree.section(SectionKind::Todo).unwrap();
        let row = &todo.rows[1];
        assert_eq!(row.text, "second");
        assert_eq!(
            row.controls,
            ActionKind::ALL
                .iter()
                .map(|&kind| Control { kind, index: 1 })
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn sections_are_ordered_and_expanded() {
        let tree = render(&DayTasks::default());
        let kinds: Vec<_> = tree.sections.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SectionKind::Completed, SectionKind::Todo]);
        assert!(tree.sections.iter().all(|s| s.expanded));
    }

    #[test]
    fn long_date_uses_ordinal_suffixes() {
        let fmt = |y, m, d| long_date(NaiveDate::from_ymd_opt(y, m, d).unwrap());
        assert_eq!(fmt(2024, 1, 1), "1st January 2024");
        assert_eq!(fmt(2024, 1, 2), "2nd January 2024");
        assert_eq!(fmt(2024, 3, 3), "3rd March 2024");
        assert_eq!(fmt(2024, 3, 11), "11th March 2024");
        assert_eq!(fmt(2024, 3, 12), "12th March 2024");
        assert_eq!(fmt(2024, 3, 13), "13th March 2024");
        assert_eq!(fmt(2024, 3, 21), "21st March 2024");
        assert_eq!(fmt(2024, 3, 22), "22nd March 2024");
        assert_eq!(fmt(2024, 12, 30), "30th December 2024");
    }
}
