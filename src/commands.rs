use crate::dispatch::{AppState, Event, Outcome};
use crate::storage::{init_store, StoreLocation};
use crate::ui;
use crate::view::{long_date, SectionKind, ViewTree};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use std::path::PathBuf;
use tracing::info;

pub fn init(file: Option<PathBuf>) -> Result<()> {
    let location = StoreLocation::resolve(file).context("resolving task file")?;
    if init_store(&location)? {
        info!(path = %location.path.display(), "created task file");
        println!("Initialized task file at {}", location.path.display());
    } else {
        println!("Task file already exists at {}", location.path.display());
    }
    Ok(())
}

pub fn list(file: Option<PathBuf>, date: Option<String>) -> Result<()> {
    let state = open_state(file, date)?;
    println!("{}", long_date(state.selected_date()));
    print_view(&state.view());
    Ok(())
}

pub fn add(file: Option<PathBuf>, date: Option<String>, text: String) -> Result<()> {
    if text.trim().is_empty() {
        bail!("task text is empty");
    }
    let mut state = open_state(file, date)?;
    let outcome = dispatch(&mut state, Event::TaskAdded { text })?;
    println!(
        "{} on {} ({} to do)",
        outcome.message,
        state.selected_date(),
        state.current().todo.len()
    );
    Ok(())
}

pub fn rollover(file: Option<PathBuf>, date: Option<String>) -> Result<()> {
    let mut state = open_state(file, date)?;
    let outcome = dispatch(&mut state, Event::RolledOver)?;
    println!("{} into {}", outcome.message, state.selected_date());
    print_view(&outcome.view);
    Ok(())
}

pub fn tui(file: Option<PathBuf>, date: Option<String>) -> Result<()> {
    let state = open_state(file, date)?;
    ui::run(state)
}

fn open_state(file: Option<PathBuf>, date: Option<String>) -> Result<AppState> {
    let location = StoreLocation::resolve(file).context("resolving task file")?;
    let date = match date {
        Some(raw) => parse_date(&raw)?,
        None => today(),
    };
    let state = AppState::open(location, date)?;
    Ok(state)
}

fn dispatch(state: &mut AppState, event: Event) -> Result<Outcome> {
    state
        .dispatch(Some(event), "")?
        .ok_or_else(|| anyhow!("nothing to do"))
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow!("invalid date format (use YYYY-MM-DD): {}", input))
}

fn print_view(view: &ViewTree) {
    for section in &view.sections {
        println!("{}", section.title);
        if section.rows.is_empty() {
            println!("  (empty)");
        }
        for row in &section.rows {
            match section.kind {
                SectionKind::Completed => println!("  ✓ {}", row.text),
                SectionKind::Todo => println!("  {}. {}", row.index + 1, row.text),
            }
        }
        println!();
    }
}
