use crate::commands::{parse_date, today};
use crate::dispatch::{AppState, Event};
use crate::view::{long_date, ActionKind, Control, Row, SectionKind, ViewTree};
use anyhow::Result;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::warn;

const TITLE: &str = "To Do Stack";

pub fn run(state: AppState) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(state);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    state: AppState,
    view: ViewTree,
    input: FieldValue,
    selected: usize,
    scroll_offset: usize,
    completed_offset: usize,
    completed_viewport: usize,
    last_save: Option<Instant>,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    Adding,
    PickingDate(FieldValue),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_char(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_char(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_char(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }

    /// Applies an editing key. Returns `false` for keys it does not handle.
    fn edit(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(c)
            }
            _ => return false,
        }
        true
    }
}

impl App {
    fn new(state: AppState) -> Self {
        let status = format!(
            "Loaded {} days from {}",
            state.store().len(),
            state.location().path.display()
        );
        let view = state.view();
        App {
            state,
            view,
            input: FieldValue::new(""),
            selected: 0,
            scroll_offset: 0,
            completed_offset: 0,
            completed_viewport: 0,
            last_save: None,
            status,
            mode: Mode::Normal,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let TermEvent::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.mode {
            Mode::Normal => return self.handle_normal_key(key),
            Mode::Adding => self.handle_adding_key(key),
            Mode::PickingDate(_) => self.handle_date_key(key),
        }
        false
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        if let Some(kind) = action_for_key(key) {
            match self.control(kind) {
                Some(control) => {
                    let index = control.index;
                    if self.fire(Event::ActionFired { kind, index }) {
                        self.follow(kind, index);
                        if kind == ActionKind::Tick {
                            self.completed_offset = usize::MAX;
                        }
                    }
                }
                None => self.status = "No task selected".into(),
            }
            return false;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.todo_len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('a') | KeyCode::Char('n') | KeyCode::Char('i') => {
                self.mode = Mode::Adding;
                self.status = "Adding task (Enter add, Esc back)".into();
            }
            KeyCode::Char('r') => {
                self.fire(Event::RolledOver);
            }
            KeyCode::PageUp => self.scroll_completed(false),
            KeyCode::PageDown => self.scroll_completed(true),
            KeyCode::Char('[') | KeyCode::Left | KeyCode::Char('h') => self.step_date(false),
            KeyCode::Char(']') | KeyCode::Right | KeyCode::Char('l') => self.step_date(true),
            KeyCode::Char('.') => {
                self.fire(Event::DateChanged(today()));
            }
            KeyCode::Char('g') => {
                let current = self.state.selected_date().format("%Y-%m-%d").to_string();
                self.mode = Mode::PickingDate(FieldValue::new(&current));
                self.status = "Go to date (YYYY-MM-DD, Enter go, Esc cancel)".into();
            }
            _ => {}
        }
        false
    }

    fn handle_adding_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.status = "Back to list".into();
            }
            KeyCode::Enter => {
                let text = self.input.value.clone();
                if self.fire(Event::TaskAdded { text }) {
                    self.selected = 0;
                }
            }
            _ => {
                self.input.edit(key);
            }
        }
    }

    fn handle_date_key(&mut self, key: KeyEvent) {
        let mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let Mode::PickingDate(mut field) = mode else {
            self.mode = mode;
            return;
        };
        match key.code {
            KeyCode::Esc => self.status = "Canceled".into(),
            KeyCode::Enter => match parse_date(&field.value) {
                Ok(date) => {
                    self.fire(Event::DateChanged(date));
                }
                Err(err) => {
                    self.status = err.to_string();
                    self.mode = Mode::PickingDate(field);
                }
            },
            _ => {
                field.edit(key);
                self.mode = Mode::PickingDate(field);
            }
        }
    }

    fn step_date(&mut self, forward: bool) {
        let current = self.state.selected_date();
        let target = if forward {
            current.succ_opt()
        } else {
            current.pred_opt()
        };
        match target {
            Some(date) => {
                self.fire(Event::DateChanged(date));
            }
            None => self.status = "Date out of range".into(),
        }
    }

    /// Sends one event through the dispatcher and takes over its output.
    /// Returns whether the event produced a new view.
    fn fire(&mut self, event: Event) -> bool {
        let saves = !matches!(event, Event::DateChanged(_));
        match self.state.dispatch(Some(event), &self.input.value) {
            Ok(Some(outcome)) => {
                if outcome.input != self.input.value {
                    self.input = FieldValue::new(&outcome.input);
                }
                self.view = outcome.view;
                self.status = outcome.message;
                if saves {
                    self.last_save = Some(Instant::now());
                }
                self.clamp_selection();
                true
            }
            Ok(None) => {
                self.status = "Nothing to add".into();
                false
            }
            Err(err) => {
                warn!(error = %err, "dispatch failed");
                self.view = self.state.view();
                self.clamp_selection();
                self.status = format!("Failed: {}", err);
                false
            }
        }
    }

    fn follow(&mut self, kind: ActionKind, index: usize) {
        self.selected = match kind {
            ActionKind::Bottom => self.todo_len().saturating_sub(1),
            ActionKind::Down => (index + 1).min(self.todo_len().saturating_sub(1)),
            ActionKind::Up => index.saturating_sub(1),
            ActionKind::Top => 0,
            ActionKind::Delete | ActionKind::Tick => index,
        };
        self.clamp_selection();
    }

    fn scroll_completed(&mut self, forward: bool) {
        self.completed_offset = scroll_window(
            self.completed_offset,
            self.completed_len(),
            self.completed_viewport,
            forward,
        );
    }

    fn completed_len(&self) -> usize {
        self.view
            .section(SectionKind::Completed)
            .map(|s| s.rows.len())
            .unwrap_or(0)
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.todo_len().saturating_sub(1));
    }

    fn todo_rows(&self) -> &[Row] {
        self.view
            .section(SectionKind::Todo)
            .map(|s| s.rows.as_slice())
            .unwrap_or(&[])
    }

    /// The selected row's control of the given kind.
    fn control(&self, kind: ActionKind) -> Option<Control> {
        self.todo_rows()
            .get(self.selected)
            .and_then(|row| row.controls.iter().find(|c| c.kind == kind))
            .copied()
    }

    fn todo_len(&self) -> usize {
        self.todo_rows().len()
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(3),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.draw_sections(f, layout[1]);
        self.draw_input(f, layout[2]);
        self.draw_footer(f, layout[3]);

        if let Mode::PickingDate(field) = &self.mode {
            self.draw_date_picker(f, field);
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let saved = match self.last_save {
            Some(at) => format!("saved {}", format_elapsed(at)),
            None => "no changes".to_string(),
        };
        let title = Line::from(vec![
            Span::styled(
                TITLE,
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(
                long_date(self.state.selected_date()),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.state.location().path.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(saved, Style::default().fg(Color::Gray)),
        ]);

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_sections(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(area);
        let width = area.width.saturating_sub(2);

        if let Some(section) = self.view.section(SectionKind::Completed) {
            let len = section.rows.len();
            let items = if section.rows.is_empty() || !section.expanded {
                vec![ListItem::new("Nothing completed yet")
                    .style(Style::default().fg(Color::DarkGray))]
            } else {
                section
                    .rows
                    .iter()
                    .map(|row| completed_item(row, width))
                    .collect()
            };
            let viewport = chunks[0].height.saturating_sub(2) as usize;
            let offset = self.completed_offset.min(len.saturating_sub(viewport));
            let mut state = ListState::default();
            *state.offset_mut() = offset;
            let block = section_block(section.title, len, Color::LightGreen, false);
            f.render_stateful_widget(List::new(items).block(block), chunks[0], &mut state);
            self.completed_offset = offset;
            self.completed_viewport = viewport;
        }

        let rows = self.todo_rows();
        let len = rows.len();
        let items = if rows.is_empty() {
            vec![ListItem::new("No tasks for this day (a to add, r to roll over)")
                .style(Style::default().fg(Color::DarkGray))]
        } else {
            rows.iter()
                .map(|row| ListItem::new(todo_line(row, width, row.index == self.selected)))
                .collect()
        };
        let viewport = chunks[1].height.saturating_sub(2) as usize;
        let offset = adjust_offset(self.selected, self.scroll_offset, viewport, 1, len);
        let mut state = ListState::default();
        if len > 0 {
            state.select(Some(self.selected));
        }
        *state.offset_mut() = offset;
        let focused = matches!(self.mode, Mode::Normal);
        let block = section_block(SectionKind::Todo.title(), len, Color::Cyan, focused);
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(Color::LightCyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, chunks[1], &mut state);
        self.scroll_offset = offset;
    }

    fn draw_input(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let active = matches!(self.mode, Mode::Adding);
        let line = if active {
            Line::from(Span::styled(
                self.input.with_caret(),
                Style::default().fg(Color::Cyan),
            ))
        } else if self.input.value.is_empty() {
            Line::from(Span::styled(
                "Add a new task..",
                Style::default().fg(Color::DarkGray),
            ))
        } else {
            Line::from(Span::raw(self.input.value.clone()))
        };
        let accent = if active { Color::Cyan } else { Color::DarkGray };
        let block = Block::default()
            .title(Span::styled(
                "New task",
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent));
        f.render_widget(Paragraph::new(line).block(block), area);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let key = |k: &'static str, color: Color| Span::styled(k, Style::default().fg(color));
        match self.mode {
            Mode::Normal => Line::from(vec![
                key("↑↓ / j k", Color::LightCyan),
                Span::raw(" select  "),
                key("b J K t", Color::LightGreen),
                Span::raw(" bottom/down/up/top  "),
                key("x", Color::LightGreen),
                Span::raw(" done  "),
                key("d", Color::LightRed),
                Span::raw(" delete  "),
                key("a", Color::LightMagenta),
                Span::raw(" add  "),
                key("r", Color::LightYellow),
                Span::raw(" rollover  "),
                key("[ ] . g", Color::LightCyan),
                Span::raw(" date  "),
                key("PgUp PgDn", Color::LightGreen),
                Span::raw(" completed  "),
                key("q", Color::LightRed),
                Span::raw(" quit"),
            ]),
            Mode::Adding => Line::from(vec![
                key("Enter", Color::LightGreen),
                Span::raw(" add to top  "),
                key("Esc", Color::LightRed),
                Span::raw(" back"),
            ]),
            Mode::PickingDate(_) => Line::from(vec![
                key("Enter", Color::LightGreen),
                Span::raw(" go  "),
                key("Esc", Color::LightRed),
                Span::raw(" cancel"),
            ]),
        }
    }

    fn draw_date_picker(&self, f: &mut ratatui::Frame<'_>, field: &FieldValue) {
        let area = centered_rect(40, 25, f.size());
        let body = vec![
            Line::from(Span::styled(
                field.with_caret(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "YYYY-MM-DD • Enter to go • Esc to cancel",
                Style::default().fg(Color::Gray),
            )),
        ];
        let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    "Go to date",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

/// Row action bound to a key in the list view.
fn action_for_key(key: KeyEvent) -> Option<ActionKind> {
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    match key.code {
        KeyCode::Char('b') | KeyCode::End => Some(ActionKind::Bottom),
        KeyCode::Char('J') => Some(ActionKind::Down),
        KeyCode::Down if shift => Some(ActionKind::Down),
        KeyCode::Char('K') => Some(ActionKind::Up),
        KeyCode::Up if shift => Some(ActionKind::Up),
        KeyCode::Char('t') | KeyCode::Home => Some(ActionKind::Top),
        KeyCode::Char('d') | KeyCode::Delete => Some(ActionKind::Delete),
        KeyCode::Char('x') | KeyCode::Char(' ') | KeyCode::Enter => Some(ActionKind::Tick),
        _ => None,
    }
}

fn section_block(title: &str, count: usize, accent: Color, focused: bool) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            format!("{} ({})", title, count),
            Style::default().fg(accent).add_modifier(if focused {
                Modifier::BOLD | Modifier::UNDERLINED
            } else {
                Modifier::BOLD
            }),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { accent } else { Color::DarkGray }))
}

fn completed_item(row: &Row, width: u16) -> ListItem<'static> {
    let text = truncate_text(&row.text, width.saturating_sub(4) as usize);
    ListItem::new(Line::from(vec![
        Span::styled("✓ ", Style::default().fg(Color::LightGreen)),
        Span::styled(
            text,
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::CROSSED_OUT),
        ),
    ]))
}

/// Text keeps no colour of its own so the list highlight shows through.
fn todo_line(row: &Row, width: u16, selected: bool) -> Line<'static> {
    let controls = row
        .controls
        .iter()
        .map(|c| c.kind.symbol())
        .collect::<Vec<_>>()
        .join(" ");
    let number = format!("{:>2}. ", row.index + 1);
    let reserved = number.chars().count() + controls.chars().count() + 2;
    let text = truncate_text(&row.text, (width as usize).saturating_sub(reserved).max(8));
    let mut spans = vec![
        Span::styled(number, Style::default().fg(Color::DarkGray)),
        Span::raw(text),
    ];
    if selected {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            controls,
            Style::default().add_modifier(Modifier::BOLD),
        ));
    }
    Line::from(spans)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Moves a list window by one page, keeping the last page full.
fn scroll_window(offset: usize, len: usize, viewport: usize, forward: bool) -> usize {
    let max_offset = len.saturating_sub(viewport);
    let step = viewport.max(1);
    let offset = offset.min(max_offset);
    if forward {
        offset.saturating_add(step).min(max_offset)
    } else {
        offset.saturating_sub(step)
    }
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn prev_char(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_char(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskStore;
    use crate::storage::{StoreLocation, STORE_FILE_NAME};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn shifted(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::SHIFT)
    }

    fn app_in(dir: &tempfile::TempDir) -> App {
        let location = StoreLocation::at(dir.path().join(STORE_FILE_NAME));
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        App::new(AppState::new(TaskStore::default(), location, date))
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(key(KeyCode::Char(ch)));
        }
    }

    fn todo_texts(app: &App) -> Vec<String> {
        app.todo_rows().iter().map(|r| r.text.clone()).collect()
    }

    #[test]
    fn keys_map_to_row_actions() {
        assert_eq!(action_for_key(key(KeyCode::Char('b'))), Some(ActionKind::Bottom));
        assert_eq!(action_for_key(shifted(KeyCode::Char('J'))), Some(ActionKind::Down));
        assert_eq!(action_for_key(shifted(KeyCode::Down)), Some(ActionKind::Down));
        assert_eq!(action_for_key(shifted(KeyCode::Up)), Some(ActionKind::Up));
        assert_eq!(action_for_key(key(KeyCode::Char('t'))), Some(ActionKind::Top));
        assert_eq!(action_for_key(key(KeyCode::Char('d'))), Some(ActionKind::Delete));
        assert_eq!(action_for_key(key(KeyCode::Char('x'))), Some(ActionKind::Tick));
        assert_eq!(action_for_key(key(KeyCode::Down)), None);
        assert_eq!(action_for_key(key(KeyCode::Char('q'))), None);
    }

    #[test]
    fn adding_through_keys_clears_input_and_selects_new_task() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        app.handle_key(key(KeyCode::Char('a')));
        type_text(&mut app, "Buy milk");
        app.handle_key(key(KeyCode::Enter));
        type_text(&mut app, "Call mom");
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(todo_texts(&app), vec!["Call mom", "Buy milk"]);
        assert_eq!(app.input, FieldValue::new(""));
        assert_eq!(app.selected, 0);
        assert!(app.last_save.is_some());
    }

    #[test]
    fn selection_follows_moved_task() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        app.handle_key(key(KeyCode::Char('a')));
        for text in ["c", "b", "a"] {
            type_text(&mut app, text);
            app.handle_key(key(KeyCode::Enter));
        }
        app.handle_key(key(KeyCode::Esc));

        app.handle_key(shifted(KeyCode::Char('J')));
        assert_eq!(todo_texts(&app), vec!["b", "a", "c"]);
        assert_eq!(app.selected, 1);

        app.handle_key(key(KeyCode::Char('b')));
        assert_eq!(todo_texts(&app), vec!["b", "c", "a"]);
        assert_eq!(app.selected, 2);

        app.handle_key(key(KeyCode::Char('x')));
        assert_eq!(todo_texts(&app), vec!["b", "c"]);
        assert_eq!(app.selected, 1);
        assert_eq!(app.state.current().completed, vec!["a"]);
    }

    #[test]
    fn actions_on_empty_list_only_update_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        app.handle_key(key(KeyCode::Char('d')));
        assert_eq!(app.status, "No task selected");
        assert!(app.last_save.is_none());
    }

    #[test]
    fn date_keys_change_selected_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        app.handle_key(key(KeyCode::Char('[')));
        assert_eq!(
            app.state.selected_date(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );

        app.handle_key(key(KeyCode::Char('g')));
        for _ in 0..10 {
            app.handle_key(key(KeyCode::Backspace));
        }
        type_text(&mut app, "2024-03-01");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            app.state.selected_date(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(matches!(app.mode, Mode::Normal));
        assert!(app.last_save.is_none());
    }

    #[test]
    fn invalid_date_keeps_picker_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        app.handle_key(key(KeyCode::Char('g')));
        type_text(&mut app, "x");
        app.handle_key(key(KeyCode::Enter));
        assert!(matches!(app.mode, Mode::PickingDate(_)));
        assert!(app.status.starts_with("invalid date format"));
    }

    #[test]
    fn field_editing_handles_multibyte_chars() {
        let mut field = FieldValue::new("añb");
        field.move_left();
        field.move_left();
        field.backspace();
        assert_eq!(field.value, "ñb");
        assert_eq!(field.cursor, 0);
        field.move_right();
        field.insert_char('!');
        assert_eq!(field.value, "ñ!b");
        assert_eq!(field.with_caret(), "ñ!▌b");
    }

    #[test]
    fn offset_keeps_selection_visible() {
        assert_eq!(adjust_offset(0, 0, 5, 1, 20), 0);
        assert_eq!(adjust_offset(10, 0, 5, 1, 20), 7);
        assert_eq!(adjust_offset(19, 7, 5, 1, 20), 15);
        assert_eq!(adjust_offset(3, 0, 0, 1, 20), 0);
    }

    #[test]
    fn failed_save_shows_unchanged_lists() {
        let dir = tempfile::tempdir().unwrap();
        let location = StoreLocation::at(dir.path());
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut app = App::new(AppState::new(TaskStore::default(), location, date));
        app.handle_key(key(KeyCode::Char('a')));
        type_text(&mut app, "Buy milk");
        app.handle_key(key(KeyCode::Enter));

        assert!(todo_texts(&app).is_empty());
        assert!(app.state.current().todo.is_empty());
        assert_eq!(app.view, app.state.view());
        assert!(app.status.starts_with("Failed"));
        assert!(app.last_save.is_none());
        assert_eq!(app.input.value, "Buy milk");
    }

    #[test]
    fn task_text_takes_highlight_colour() {
        let row = Row {
            index: 0,
            text: "Buy milk".into(),
            controls: ActionKind::ALL
                .iter()
                .map(|&kind| Control { kind, index: 0 })
                .collect(),
        };
        let line = todo_line(&row, 60, true);
        let text = line
            .spans
            .iter()
            .find(|span| span.content == "Buy milk")
            .unwrap();
        assert_eq!(text.style.fg, None);
        assert!(line.spans.iter().skip(1).all(|span| span.style.fg.is_none()));
        assert_eq!(todo_line(&row, 60, false).spans.len(), 2);
    }

    #[test]
    fn completed_window_pages_within_bounds() {
        assert_eq!(scroll_window(0, 20, 5, true), 5);
        assert_eq!(scroll_window(10, 20, 5, true), 15);
        assert_eq!(scroll_window(15, 20, 5, true), 15);
        assert_eq!(scroll_window(15, 20, 5, false), 10);
        assert_eq!(scroll_window(3, 20, 5, false), 0);
        assert_eq!(scroll_window(0, 3, 5, true), 0);
        assert_eq!(scroll_window(usize::MAX, 20, 5, false), 10);
        assert_eq!(scroll_window(0, 4, 0, true), 1);
    }

    #[test]
    fn page_keys_scroll_completed_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(&dir);
        app.handle_key(key(KeyCode::Char('a')));
        for text in ["f", "e", "d", "c", "b", "a"] {
            type_text(&mut app, text);
            app.handle_key(key(KeyCode::Enter));
        }
        app.handle_key(key(KeyCode::Esc));
        for _ in 0..6 {
            app.handle_key(key(KeyCode::Char('x')));
        }
        assert_eq!(app.completed_len(), 6);
        assert_eq!(app.completed_offset, usize::MAX);

        app.completed_viewport = 2;
        app.handle_key(key(KeyCode::PageUp));
        assert_eq!(app.completed_offset, 2);
        app.handle_key(key(KeyCode::PageUp));
        assert_eq!(app.completed_offset, 0);
        app.handle_key(key(KeyCode::PageDown));
        app.handle_key(key(KeyCode::PageDown));
        app.handle_key(key(KeyCode::PageDown));
        assert_eq!(app.completed_offset, 4);
    }

    #[test]
    fn truncates_long_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a much longer task", 10), "a much ...");
    }
}
