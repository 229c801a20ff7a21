use std::mem;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::Context;
use crossterm::event::KeyCode;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use tracing::{debug, info, warn};

use crate::catalog::{ApplyResult, CatalogStore, LoadOutcome, LoadState};
use crate::error::LoadError;
use crate::models::{CategoryFilter, CodeDetail};

use super::helpers::{
    category_line, hint_line, input_cursor_x, market_label, surface_error, yes_no,
};
use super::selector::FilterableSelector;

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Header space for the category radio group and the load state.
const HEADER_HEIGHT: u16 = 3;
/// Rows skipped by PageUp/PageDown.
const PAGE_STEP: isize = 10;

/// Messages delivered to the event loop. Worker threads produce catalog and
/// detail outcomes; the selector's callback produces `Chosen`.
#[derive(Debug)]
pub enum AppEvent {
    Catalog(LoadOutcome),
    Chosen(String),
    Detail(DetailOutcome),
}

impl From<LoadOutcome> for AppEvent {
    fn from(outcome: LoadOutcome) -> Self {
        AppEvent::Catalog(outcome)
    }
}

/// Finished detail lookup. `generation` plays the same role as a catalog
/// ticket: only the lookup for the latest choice is shown.
#[derive(Debug)]
pub struct DetailOutcome {
    generation: u64,
    code: String,
    result: Result<CodeDetail, LoadError>,
}

/// Modes scoped to the selector screen.
enum Mode {
    Normal,
    Searching,
}

/// What the side panel currently shows for the selected code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailPanel {
    Empty,
    Loading(String),
    Ready(CodeDetail),
    Unavailable { code: String, reason: String },
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Hosting page for the selector. It owns the store, feeds the selector its
/// snapshot, and keeps the selected code that the selector reports upward.
pub struct App {
    store: CatalogStore,
    selector: FilterableSelector,
    events_tx: Sender<AppEvent>,
    events_rx: Receiver<AppEvent>,
    mode: Mode,
    selected_code: Option<String>,
    detail: DetailPanel,
    detail_generation: u64,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(store: CatalogStore) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let chosen_tx = events_tx.clone();
        let selector = FilterableSelector::new(move |code| {
            let _ = chosen_tx.send(AppEvent::Chosen(code.to_string()));
        });

        let mut app = Self {
            store,
            selector,
            events_tx,
            events_rx,
            mode: Mode::Normal,
            selected_code: None,
            detail: DetailPanel::Empty,
            detail_generation: 0,
            status: None,
        };
        app.selector.refresh(app.store.get_all());
        app
    }

    /// Kick off the catalog request that populates the selector.
    pub fn start(&mut self) {
        self.reload();
    }

    /// Issue a fresh catalog request. Any request still in flight becomes
    /// stale; the current snapshot stays visible until the new one lands.
    pub fn reload(&mut self) {
        self.store.load(&self.events_tx);
        self.set_status("Loading catalog...", StatusKind::Info);
    }

    /// Stop listening to in-flight requests before the page goes away.
    pub fn shutdown(&mut self) {
        self.store.cancel();
        self.detail_generation += 1;
    }

    pub fn selected_code(&self) -> Option<&str> {
        self.selected_code.as_deref()
    }

    pub fn selector(&self) -> &FilterableSelector {
        &self.selector
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn detail(&self) -> &DetailPanel {
        &self.detail
    }

    pub fn is_searching(&self) -> bool {
        matches!(self.mode, Mode::Searching)
    }

    /// Apply every event that is already waiting. Returns how many ran.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Catalog(outcome) => self.apply_catalog(outcome),
            AppEvent::Chosen(code) => self.accept_selection(code),
            AppEvent::Detail(outcome) => self.apply_detail(outcome),
        }
    }

    /// Route a key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit),
            Mode::Searching => self.handle_search_key(code),
        };

        // Choices travel through the channel; settle them before the next
        // frame so the page never shows a stale selection.
        self.process_events();
        exit
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                *exit = true;
            }
            KeyCode::Up => self.selector.move_selection(-1),
            KeyCode::Down => self.selector.move_selection(1),
            KeyCode::PageUp => self.selector.move_selection(-PAGE_STEP),
            KeyCode::PageDown => self.selector.move_selection(PAGE_STEP),
            KeyCode::Home => self.selector.select_first(),
            KeyCode::End => self.selector.select_last(),
            KeyCode::Enter => self.choose_highlighted(),
            KeyCode::Char('a') | KeyCode::Char('A') => self.set_category(CategoryFilter::All),
            KeyCode::Char('e') | KeyCode::Char('E') => self.set_category(CategoryFilter::Etf),
            KeyCode::Char('s') | KeyCode::Char('S') => self.set_category(CategoryFilter::Spac),
            KeyCode::Tab => self.set_category(self.selector.category().cycle(1)),
            KeyCode::BackTab => self.set_category(self.selector.category().cycle(-1)),
            KeyCode::Char('r') | KeyCode::Char('R') => self.reload(),
            KeyCode::Char('f') | KeyCode::Char('/') => {
                self.clear_status();
                return Mode::Searching;
            }
            _ => {}
        }
        Mode::Normal
    }

    fn handle_search_key(&mut self, code: KeyCode) -> Mode {
        match code {
            KeyCode::Esc => {
                self.selector.set_query("");
                return Mode::Normal;
            }
            KeyCode::Up => self.selector.move_selection(-1),
            KeyCode::Down => self.selector.move_selection(1),
            KeyCode::PageUp => self.selector.move_selection(-PAGE_STEP),
            KeyCode::PageDown => self.selector.move_selection(PAGE_STEP),
            KeyCode::Enter => {
                self.choose_highlighted();
                return Mode::Normal;
            }
            KeyCode::Tab => self.set_category(self.selector.category().cycle(1)),
            KeyCode::BackTab => self.set_category(self.selector.category().cycle(-1)),
            KeyCode::Backspace => {
                let mut query = self.selector.query().to_string();
                query.pop();
                self.selector.set_query(query);
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                let mut query = self.selector.query().to_string();
                query.push(ch);
                self.selector.set_query(query);
            }
            _ => {}
        }
        Mode::Searching
    }

    fn set_category(&mut self, category: CategoryFilter) {
        self.selector.set_category(category);
        self.clear_status();
    }

    fn choose_highlighted(&mut self) {
        if !self.selector.choose_highlighted() {
            self.set_status("Nothing to select.", StatusKind::Error);
        }
    }

    fn apply_catalog(&mut self, outcome: LoadOutcome) {
        if self.store.apply(outcome) == ApplyResult::Stale {
            return;
        }
        self.selector.refresh(self.store.get_all());

        match self.store.state() {
            LoadState::Loaded { count, dropped } => {
                let mut message = format!("Loaded {count} codes.");
                if dropped > 0 {
                    message.push_str(&format!(" Skipped {dropped} malformed entries."));
                }
                self.set_status(message, StatusKind::Info);
            }
            LoadState::Failed(reason) => {
                self.set_status(
                    format!("Could not load catalog: {reason}. Press r to retry."),
                    StatusKind::Error,
                );
            }
            LoadState::Idle | LoadState::Loading => {}
        }
    }

    /// Record the code reported by the selector and look up its details.
    fn accept_selection(&mut self, code: String) {
        info!(%code, "code selected");
        self.set_status(format!("Selected {code}."), StatusKind::Info);
        self.selected_code = Some(code.clone());
        self.request_detail(code);
    }

    fn request_detail(&mut self, code: String) {
        self.detail_generation += 1;
        let generation = self.detail_generation;
        let source = self.store.source();
        let events = self.events_tx.clone();
        let worker_code = code.clone();

        let spawned = thread::Builder::new()
            .name("code-detail".to_string())
            .spawn(move || {
                let result = source.fetch_detail(&worker_code);
                let _ = events.send(AppEvent::Detail(DetailOutcome {
                    generation,
                    code: worker_code,
                    result,
                }));
            });

        let panel = match spawned.context("could not start detail worker") {
            Ok(_) => DetailPanel::Loading(code),
            Err(err) => {
                let reason = surface_error(&err);
                warn!(%code, error = %reason, "detail lookup not started");
                self.set_status(format!("Detail lookup failed: {reason}"), StatusKind::Error);
                DetailPanel::Unavailable { code, reason }
            }
        };
        self.detail = panel;
    }

    fn apply_detail(&mut self, outcome: DetailOutcome) {
        if outcome.generation != self.detail_generation {
            debug!(code = %outcome.code, "discarding stale detail response");
            return;
        }
        self.detail = match outcome.result {
            Ok(detail) => DetailPanel::Ready(detail),
            Err(err) => {
                warn!(code = %outcome.code, error = %err, "detail lookup failed");
                DetailPanel::Unavailable {
                    code: outcome.code,
                    reason: err.to_string(),
                }
            }
        };
    }

    pub fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(HEADER_HEIGHT), Constraint::Min(0)])
            .split(content_area);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(sections[1]);

        self.draw_header(frame, sections[0]);
        self.draw_selector(frame, columns[0]);
        self.draw_detail(frame, columns[1]);

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        if self.is_searching() {
            self.draw_search_bar(frame, columns[0]);
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let state = match self.store.state() {
            LoadState::Idle => "not loaded".to_string(),
            LoadState::Loading => "loading...".to_string(),
            LoadState::Loaded { count, .. } => format!("{count} codes"),
            LoadState::Failed(_) => "load failed".to_string(),
        };
        let summary = Line::from(vec![
            Span::raw(format!(
                "Showing {} of {}   ",
                self.selector.visible_len(),
                self.selector.snapshot_len()
            )),
            Span::styled(format!("Catalog: {state}"), Style::default().fg(Color::DarkGray)),
        ]);

        let block = Block::default().borders(Borders::ALL).title("Category");
        let paragraph = Paragraph::new(vec![category_line(self.selector.category()), summary])
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_selector(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Codes");

        if self.selector.is_empty() {
            let message = match self.store.state() {
                LoadState::Idle => "Catalog not loaded. Press 'r' to load.".to_string(),
                LoadState::Loading => "Loading catalog...".to_string(),
                LoadState::Failed(_) => "Catalog unavailable. Press 'r' to retry.".to_string(),
                LoadState::Loaded { .. } if !self.selector.query().trim().is_empty() => {
                    format!("No codes match \"{}\".", self.selector.query())
                }
                LoadState::Loaded { .. } => {
                    format!("No {} codes.", self.selector.category().label())
                }
            };
            let paragraph = Paragraph::new(message)
                .style(Style::default().fg(Color::DarkGray))
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        }

        let selected_code = self.selected_code();
        let items: Vec<ListItem> = self
            .selector
            .visible()
            .map(|entry| {
                let marker = if Some(entry.value.as_str()) == selected_code {
                    "* "
                } else {
                    "  "
                };
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{marker}{}", entry.label)),
                    Span::styled(
                        format!("  {}", market_label(&entry.market)),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("> ");

        let mut list_state = ListState::default();
        list_state.select(Some(self.selector.selected_index()));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn draw_detail(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Selected");
        let label = Style::default().fg(Color::DarkGray);

        let lines: Vec<Line> = match &self.detail {
            DetailPanel::Empty => vec![Line::from("No code selected.")],
            DetailPanel::Loading(code) => vec![
                Line::from(vec![Span::styled("Code: ", label), Span::raw(code.clone())]),
                Line::from("Loading details..."),
            ],
            DetailPanel::Unavailable { code, reason } => vec![
                Line::from(vec![Span::styled("Code: ", label), Span::raw(code.clone())]),
                Line::from(Span::styled(reason.clone(), Style::default().fg(Color::Red))),
            ],
            DetailPanel::Ready(detail) => {
                let field = |name: &'static str, value: String| {
                    Line::from(vec![Span::styled(name, label), Span::raw(value)])
                };
                vec![
                    field("Code: ", detail.code.clone()),
                    field("Name: ", detail.name.clone().unwrap_or_default()),
                    field(
                        "Extended code: ",
                        detail.extend_code.clone().unwrap_or_default(),
                    ),
                    field(
                        "Market: ",
                        market_label(detail.market.as_deref().unwrap_or_default()).to_string(),
                    ),
                    field(
                        "Order unit: ",
                        detail
                            .memedan
                            .map(|unit| unit.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                    ),
                    field("ETF: ", yes_no(detail.is_etf()).to_string()),
                    field("SPAC: ", yes_no(detail.is_spac()).to_string()),
                ]
            }
        };

        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let query = self.selector.query();
        let block = Block::default().borders(Borders::ALL).title("Search");
        let paragraph = Paragraph::new(Span::raw(format!("Search: {query}")))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        frame.set_cursor_position((input_cursor_x(inner, "Search: ", query), inner.y));
    }

    fn footer_instructions(&self) -> Line<'static> {
        match self.mode {
            Mode::Searching => hint_line(&[
                ("↑↓", "Navigate"),
                ("Tab", "Category"),
                ("Enter", "Select"),
                ("Esc", "Clear"),
            ]),
            Mode::Normal => hint_line(&[
                ("↑↓", "Navigate"),
                ("Enter", "Select"),
                ("a/e/s", "All/ETF/SPAC"),
                ("f", "Search"),
                ("r", "Reload"),
                ("q", "Quit"),
            ]),
        }
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    /// Footer text currently shown, if any.
    pub fn status_text(&self) -> Option<&str> {
        self.status.as_ref().map(|status| status.text.as_str())
    }
}
