//! Terminal reader UI using ratatui
//!
//! Renders the grouped chapter sidebar, the chapter content pane, and an
//! optional table-of-contents panel. All state mutation goes through the
//! [`ReaderSession`]; the UI only issues loads and draws whatever the session
//! pushed into its view model.

use color_eyre::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use regex::Regex;
use std::collections::VecDeque;
use std::io::stdout;
use std::sync::OnceLock;
use std::sync::mpsc;
use std::time::Duration;

use crate::catalog::ChapterGroup;
use crate::loader::{HttpFetcher, LoadResult};
use crate::navigation::Direction;
use crate::session::{
    Applied, ContentView, LoadTicket, ReaderSession, SidebarView, fetch_document,
};
use crate::theme::{Palette, Theme};
use crate::toc::{Toc, TocEntry};

/// Log level for status line events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error,
}

/// A log event routed from tracing into the status line
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
}

/// Event sender - multiple producers can clone and send
pub type EventTx = mpsc::Sender<LogEvent>;
/// Event receiver - TUI drains events
pub type EventRx = mpsc::Receiver<LogEvent>;

/// Create a new event channel
pub fn event_channel() -> (EventTx, EventRx) {
    mpsc::channel()
}

/// Initialize terminal for TUI
pub fn init_terminal() -> Result<DefaultTerminal> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = ratatui::init();
    Ok(terminal)
}

/// Restore terminal to normal state
pub fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    ratatui::restore();
    Ok(())
}

fn tag_strip_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<[^>]+>").unwrap())
}

fn block_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)</(p|h[1-6]|li|ul|ol|pre|blockquote|table|tr)>|<br\s*/?>").unwrap()
    })
}

/// Flatten a chapter HTML fragment into displayable lines. Block-level
/// closers become line breaks; remaining tags are stripped and the common
/// entities decoded.
pub fn html_to_lines(fragment: &str) -> Vec<String> {
    let broken = block_break_re().replace_all(fragment, "\n");
    let stripped = tag_strip_re().replace_all(&broken, "");
    let decoded = stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");

    let mut lines = Vec::new();
    let mut blank_run = 0usize;
    for raw in decoded.lines() {
        let line = raw.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            lines.push(String::new());
        } else {
            blank_run = 0;
            lines.push(line.trim_start().to_string());
        }
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    lines
}

/// What the content pane is currently showing
#[derive(Debug, Default)]
enum ContentState {
    #[default]
    Empty,
    Loading(String),
    Chapter {
        id: String,
        lines: Vec<String>,
    },
    Error(String),
}

/// One contents-panel row, paired with the content line its heading starts on
#[derive(Debug, Clone, PartialEq, Eq)]
struct TocRow {
    level: u8,
    text: String,
    line: u16,
}

/// Pair each heading with the content line it starts on. Heading text is
/// matched after entity decoding; duplicate headings resolve in document
/// order.
fn toc_rows(entries: &[TocEntry], lines: &[String]) -> Vec<TocRow> {
    let mut from = 0usize;
    entries
        .iter()
        .map(|entry| {
            let wanted = html_to_lines(&entry.text)
                .into_iter()
                .next()
                .unwrap_or_else(|| entry.text.clone());
            let found = lines[from..]
                .iter()
                .position(|l| *l == wanted)
                .map(|p| from + p);
            if let Some(at) = found {
                from = at + 1;
            }
            TocRow {
                level: entry.level,
                text: wanted,
                line: found.unwrap_or(0) as u16,
            }
        })
        .collect()
}

/// View model the session writes into and the draw loop reads from
pub struct ReaderViewModel {
    groups: Vec<ChapterGroup>,
    highlighted: Option<String>,
    visible: Vec<bool>,
    content: ContentState,
    toc: Vec<TocRow>,
    scroll: u16,
    palette: &'static Palette,
}

impl Default for ReaderViewModel {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            highlighted: None,
            visible: Vec::new(),
            content: ContentState::Empty,
            toc: Vec::new(),
            scroll: 0,
            palette: Theme::Dark.palette(),
        }
    }
}

impl SidebarView for ReaderViewModel {
    fn render(&mut self, groups: &[ChapterGroup]) {
        self.groups = groups.to_vec();
        let total: usize = groups.iter().map(|g| g.chapters.len()).sum();
        self.visible = vec![true; total];
    }

    fn highlight(&mut self, id: Option<&str>) {
        self.highlighted = id.map(str::to_string);
    }

    fn apply_filter(&mut self, visible: &[bool]) {
        self.visible = visible.to_vec();
    }

    fn show_catalog_error(&mut self, message: &str) {
        self.content = ContentState::Error(message.to_string());
    }
}

impl ContentView for ReaderViewModel {
    fn show_loading(&mut self, id: &str) {
        self.content = ContentState::Loading(id.to_string());
    }

    fn show_chapter(&mut self, id: &str, toc: &Toc) {
        let lines = html_to_lines(&toc.html);
        self.toc = if toc.is_empty() {
            Vec::new()
        } else {
            toc_rows(&toc.entries, &lines)
        };
        self.content = ContentState::Chapter {
            id: id.to_string(),
            lines,
        };
    }

    fn show_error(&mut self, message: &str) {
        self.content = ContentState::Error(message.to_string());
        self.toc.clear();
    }

    fn scroll_to_top(&mut self) {
        self.scroll = 0;
    }

    fn apply_theme(&mut self, theme: Theme) {
        self.palette = theme.palette();
    }
}

/// A completed fetch delivered back to the UI thread
struct LoadDelivery {
    ticket: LoadTicket,
    index: usize,
    id: String,
    result: LoadResult,
}

/// Interactive reader application
pub struct ReaderApp {
    session: ReaderSession<HttpFetcher, ReaderViewModel>,
    /// Sidebar cursor as a catalog index
    cursor: usize,
    searching: bool,
    search_input: String,
    show_toc: bool,
    /// Cursor into the view model's contents rows
    toc_cursor: usize,
    should_quit: bool,
    event_rx: EventRx,
    status: VecDeque<LogEvent>,
    load_tx: mpsc::Sender<LoadDelivery>,
    load_rx: mpsc::Receiver<LoadDelivery>,
}

/// Maximum number of status events to keep
const MAX_EVENTS: usize = 20;

impl ReaderApp {
    pub fn new(session: ReaderSession<HttpFetcher, ReaderViewModel>, event_rx: EventRx) -> Self {
        let (load_tx, load_rx) = mpsc::channel();
        Self {
            session,
            cursor: 0,
            searching: false,
            search_input: String::new(),
            show_toc: false,
            toc_cursor: 0,
            should_quit: false,
            event_rx,
            status: VecDeque::with_capacity(MAX_EVENTS),
            load_tx,
            load_rx,
        }
    }

    /// Issue a load for the chapter at `index`; the fetch runs on the tokio
    /// runtime and delivers its result back through the load channel.
    fn request_load(&mut self, index: usize, handle: &tokio::runtime::Handle) {
        let Some((ticket, id)) = self.session.begin_load(index) else {
            return;
        };
        let fetcher = self.session.fetcher().clone();
        let cache = self.session.cache().cloned();
        let tx = self.load_tx.clone();
        handle.spawn(async move {
            let result = fetch_document(&fetcher, cache.as_ref(), &id).await;
            let _ = tx.send(LoadDelivery {
                ticket,
                index,
                id,
                result,
            });
        });
    }

    /// Run the reader event loop. Blocking; fetches run on `handle`.
    pub fn run(
        &mut self,
        terminal: &mut DefaultTerminal,
        handle: &tokio::runtime::Handle,
        initial: Option<&str>,
    ) -> Result<()> {
        if let Some(id) = initial {
            match self.session.catalog().index_of(id) {
                Some(index) => {
                    self.cursor = index;
                    self.request_load(index, handle);
                }
                None => tracing::warn!("unknown chapter {id}, starting at the sidebar"),
            }
        }

        while !self.should_quit {
            self.drain_loads();
            self.drain_events();

            terminal.draw(|frame| self.draw(frame))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers, handle);
                    }
                }
            }
        }
        Ok(())
    }

    /// Apply completed fetches; the session discards stale ones.
    fn drain_loads(&mut self) {
        while let Ok(delivery) = self.load_rx.try_recv() {
            let applied = self.session.apply_load(
                delivery.ticket,
                delivery.index,
                &delivery.id,
                delivery.result,
            );
            if applied == Applied::Rendered {
                self.cursor = delivery.index;
                self.toc_cursor = 0;
            }
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.status.push_back(event);
            if self.status.len() > MAX_EVENTS {
                self.status.pop_front();
            }
        }
    }

    fn handle_key(
        &mut self,
        code: KeyCode,
        modifiers: KeyModifiers,
        handle: &tokio::runtime::Handle,
    ) {
        if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.searching {
            match code {
                KeyCode::Esc => {
                    self.searching = false;
                    self.search_input.clear();
                    self.session.filter("");
                }
                KeyCode::Enter => self.searching = false,
                KeyCode::Backspace => {
                    self.search_input.pop();
                    let term = self.search_input.clone();
                    self.session.filter(&term);
                }
                KeyCode::Char(c) => {
                    self.search_input.push(c);
                    let term = self.search_input.clone();
                    self.session.filter(&term);
                }
                _ => {}
            }
            return;
        }

        // The contents panel is modal: it owns the cursor keys while open
        if self.show_toc {
            match code {
                KeyCode::Char('q') | KeyCode::Esc | KeyCode::Char('t') => self.show_toc = false,
                KeyCode::Up | KeyCode::Char('k') => {
                    self.toc_cursor = self.toc_cursor.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    let len = self.session.view().toc.len();
                    if self.toc_cursor + 1 < len {
                        self.toc_cursor += 1;
                    }
                }
                KeyCode::Enter => self.activate_toc_entry(),
                _ => {}
            }
            return;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('/') => self.searching = true,
            KeyCode::Char('t') => {
                self.show_toc = true;
                self.toc_cursor = 0;
            }
            KeyCode::Char('d') => {
                self.session.toggle_theme();
            }
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Enter => self.request_load(self.cursor, handle),
            KeyCode::Left => self.step(Direction::Prev, handle),
            KeyCode::Right => self.step(Direction::Next, handle),
            KeyCode::Char('[') | KeyCode::Backspace => {
                self.traverse_history(Direction::Prev, handle);
            }
            KeyCode::Char(']') => self.traverse_history(Direction::Next, handle),
            KeyCode::PageUp => {
                let view = self.session.view_mut();
                view.scroll = view.scroll.saturating_sub(10);
            }
            KeyCode::PageDown => {
                let view = self.session.view_mut();
                view.scroll = view.scroll.saturating_add(10);
            }
            KeyCode::Home => self.session.view_mut().scroll = 0,
            _ => {}
        }
    }

    /// Move the sidebar cursor to the next visible chapter in `delta`'s
    /// direction, skipping filtered-out entries.
    fn move_cursor(&mut self, delta: isize) {
        let len = self.session.catalog().len();
        if len == 0 {
            return;
        }
        let visible = &self.session.view().visible;
        let mut candidate = self.cursor as isize;
        loop {
            candidate += delta;
            if candidate < 0 || candidate >= len as isize {
                return;
            }
            if visible.get(candidate as usize).copied().unwrap_or(true) {
                self.cursor = candidate as usize;
                return;
            }
        }
    }

    /// Jump the content pane to the selected heading and close the panel.
    fn activate_toc_entry(&mut self) {
        let line = self
            .session
            .view()
            .toc
            .get(self.toc_cursor)
            .map(|row| row.line);
        if let Some(line) = line {
            self.session.view_mut().scroll = line;
            self.show_toc = false;
        }
    }

    /// History back/forward: move the cursor, then reissue the load through
    /// the channel like any other navigation.
    fn traverse_history(&mut self, direction: Direction, handle: &tokio::runtime::Handle) {
        let index = match direction {
            Direction::Prev => self.session.begin_back(),
            Direction::Next => self.session.begin_forward(),
        };
        if let Some(index) = index {
            self.request_load(index, handle);
        }
    }

    /// Prev/next relative to the loaded chapter; no wraparound.
    fn step(&mut self, direction: Direction, handle: &tokio::runtime::Handle) {
        let nav = self.session.nav();
        let allowed = match direction {
            Direction::Prev => nav.can_go_prev(),
            Direction::Next => nav.can_go_next(),
        };
        if !allowed {
            return;
        }
        if let Some(current) = nav.current_index() {
            let target = match direction {
                Direction::Prev => current - 1,
                Direction::Next => current + 1,
            };
            self.request_load(target, handle);
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let palette = self.session.view().palette;
        let area = frame.area();

        frame.render_widget(
            Block::default().style(Style::default().bg(palette.bg).fg(palette.fg)),
            area,
        );

        let columns = if self.show_toc {
            Layout::horizontal([
                Constraint::Length(34),
                Constraint::Min(30),
                Constraint::Length(30),
            ])
            .split(area)
        } else {
            Layout::horizontal([Constraint::Length(34), Constraint::Min(30)]).split(area)
        };

        let left = Layout::vertical([Constraint::Min(3), Constraint::Length(3)]).split(columns[0]);
        self.draw_sidebar(frame, left[0], palette);
        self.draw_search(frame, left[1], palette);

        let right = Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).split(columns[1]);
        self.draw_content(frame, right[0], palette);
        self.draw_footer(frame, right[1], palette);

        if self.show_toc {
            self.draw_toc(frame, columns[2], palette);
        }
    }

    fn draw_sidebar(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let view = self.session.view();
        let mut lines = Vec::new();
        let mut index = 0usize;
        for group in &view.groups {
            lines.push(Line::from(Span::styled(
                group.part.clone(),
                Style::default().fg(palette.part_title),
            )));
            for chapter in &group.chapters {
                let shown = view.visible.get(index).copied().unwrap_or(true);
                if shown {
                    let is_current = view.highlighted.as_deref() == Some(chapter.id.as_str());
                    let is_cursor = index == self.cursor;
                    let marker = if is_cursor { "> " } else { "  " };
                    let mut style = Style::default().fg(palette.fg);
                    if is_current {
                        style = style.fg(palette.accent);
                    }
                    if is_cursor {
                        style = style.bg(palette.highlight_bg);
                    }
                    lines.push(Line::from(Span::styled(
                        format!("{marker}{}", chapter.title),
                        style,
                    )));
                }
                index += 1;
            }
        }

        // Keep the cursor in view
        let inner_height = area.height.saturating_sub(2) as usize;
        let cursor_line = lines
            .iter()
            .position(|l| l.spans.first().is_some_and(|s| s.content.starts_with("> ")))
            .unwrap_or(0);
        let offset = cursor_line.saturating_sub(inner_height.saturating_sub(1)) as u16;

        let widget = Paragraph::new(lines).scroll((offset, 0)).block(
            Block::default()
                .title(" Chapters ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.fg_dim)),
        );
        frame.render_widget(widget, area);
    }

    fn draw_search(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let (title, style) = if self.searching {
            (" Search (esc clears) ", Style::default().fg(palette.accent))
        } else {
            (" Search (/) ", Style::default().fg(palette.fg_dim))
        };
        let widget = Paragraph::new(self.search_input.as_str()).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(style),
        );
        frame.render_widget(widget, area);
    }

    fn draw_content(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let view = self.session.view();
        let (title, lines): (String, Vec<Line>) = match &view.content {
            ContentState::Empty => (
                " Lectern ".to_string(),
                vec![
                    Line::from(""),
                    Line::from(Span::styled(
                        "  Select a chapter to begin reading",
                        Style::default().fg(palette.fg_dim),
                    )),
                ],
            ),
            ContentState::Loading(id) => (
                format!(" {id} "),
                vec![
                    Line::from(""),
                    Line::from(Span::styled(
                        "  Loading...",
                        Style::default().fg(palette.fg_dim),
                    )),
                ],
            ),
            ContentState::Chapter { id, lines } => (
                format!(" {id} "),
                lines
                    .iter()
                    .map(|l| Line::from(Span::raw(l.clone())))
                    .collect(),
            ),
            ContentState::Error(message) => (
                " Error ".to_string(),
                html_to_lines(message)
                    .into_iter()
                    .map(|l| Line::from(Span::styled(l, Style::default().fg(palette.error))))
                    .collect(),
            ),
        };

        let widget = Paragraph::new(lines)
            .scroll((view.scroll, 0))
            .wrap(ratatui::widgets::Wrap { trim: false })
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.fg_dim)),
            );
        frame.render_widget(widget, area);
    }

    fn draw_toc(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let view = self.session.view();
        let lines: Vec<Line> = if view.toc.is_empty() {
            vec![
                Line::from(""),
                Line::from(Span::styled(
                    "  No sections",
                    Style::default().fg(palette.fg_dim),
                )),
            ]
        } else {
            view.toc
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    let indent = if row.level >= 3 { "    " } else { "  " };
                    let marker = if i == self.toc_cursor { "> " } else { "  " };
                    let mut style = Style::default().fg(palette.fg);
                    if i == self.toc_cursor {
                        style = style.bg(palette.highlight_bg);
                    }
                    Line::from(Span::styled(
                        format!("{marker}{indent}{}", row.text),
                        style,
                    ))
                })
                .collect()
        };
        let widget = Paragraph::new(lines).block(
            Block::default()
                .title(" Contents ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.fg_dim)),
        );
        frame.render_widget(widget, area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let mut spans = vec![
            Span::styled("enter", Style::default().fg(palette.accent)),
            Span::styled(" open  ", Style::default().fg(palette.fg_dim)),
            Span::styled("←/→", Style::default().fg(palette.accent)),
            Span::styled(" prev/next  ", Style::default().fg(palette.fg_dim)),
            Span::styled("[/]", Style::default().fg(palette.accent)),
            Span::styled(" back/fwd  ", Style::default().fg(palette.fg_dim)),
            Span::styled("t", Style::default().fg(palette.accent)),
            Span::styled(" contents  ", Style::default().fg(palette.fg_dim)),
            Span::styled("d", Style::default().fg(palette.accent)),
            Span::styled(" theme  ", Style::default().fg(palette.fg_dim)),
            Span::styled("q", Style::default().fg(palette.accent)),
            Span::styled(" quit", Style::default().fg(palette.fg_dim)),
        ];
        if let Some(event) = self.status.back() {
            let color = match event.level {
                LogLevel::Error => palette.error,
                LogLevel::Warn => palette.part_title,
                LogLevel::Info => palette.fg_dim,
            };
            spans.push(Span::styled("  │ ", Style::default().fg(palette.fg_dim)));
            spans.push(Span::styled(
                event.message.clone(),
                Style::default().fg(color),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, ChapterDescriptor};
    use crate::config::ContentSource;
    use crate::theme::ThemeStore;
    use crate::toc::build_toc;
    use camino::Utf8PathBuf;

    fn reader_app(tmp: &tempfile::TempDir) -> ReaderApp {
        let catalog = Catalog::new(vec![
            ChapterDescriptor {
                id: "alpha".into(),
                title: "Alpha".into(),
                part: "PartI".into(),
            },
            ChapterDescriptor {
                id: "beta".into(),
                title: "Beta".into(),
                part: "PartI".into(),
            },
        ]);
        let dir = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let theme = ThemeStore::open(&dir);
        let fetcher = HttpFetcher::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            ContentSource::Static,
        );
        let session = ReaderSession::new(
            catalog,
            fetcher,
            theme,
            None,
            ReaderViewModel::default(),
        );
        let (_event_tx, event_rx) = event_channel();
        ReaderApp::new(session, event_rx)
    }

    /// Render a chapter into the app as a completed load would.
    fn render_chapter(app: &mut ReaderApp, index: usize, fragment: &str) {
        let (ticket, id) = app.session.begin_load(index).unwrap();
        app.session
            .apply_load(ticket, index, &id, Ok(fragment.to_string()));
    }

    #[test]
    fn toc_rows_match_headings_to_content_lines() {
        let toc = build_toc("<h2>Intro</h2><p>one</p><h3>Queries &amp; keys</h3><p>two</p>");
        let mut view = ReaderViewModel::default();
        view.show_chapter("c1", &toc);
        assert_eq!(view.toc.len(), 2);
        assert_eq!(view.toc[0].line, 0);
        assert_eq!(view.toc[1].text, "Queries & keys");
        assert_eq!(view.toc[1].line, 2);
    }

    #[test]
    fn chapters_without_headings_have_no_contents_rows() {
        let toc = build_toc("<p>plain prose only</p>");
        let mut view = ReaderViewModel::default();
        view.show_chapter("c1", &toc);
        assert!(view.toc.is_empty());
    }

    #[test]
    fn activating_a_contents_row_scrolls_and_closes_the_panel() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = reader_app(&tmp);
        render_chapter(
            &mut app,
            0,
            "<h2>Alpha</h2><p>one</p><p>two</p><h2>Omega</h2><p>three</p>",
        );

        app.show_toc = true;
        app.toc_cursor = 1;
        app.activate_toc_entry();

        assert!(!app.show_toc);
        assert_eq!(app.session.view().scroll, 3);
    }

    #[test]
    fn activation_is_inert_when_there_are_no_sections() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = reader_app(&tmp);
        render_chapter(&mut app, 0, "<p>no headings here</p>");

        app.show_toc = true;
        app.activate_toc_entry();

        assert!(app.show_toc);
        assert_eq!(app.session.view().scroll, 0);
    }

    #[tokio::test]
    async fn history_keys_reissue_loads_for_prior_chapters() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = reader_app(&tmp);
        let handle = tokio::runtime::Handle::current();

        render_chapter(&mut app, 0, "<h2>A</h2>");
        render_chapter(&mut app, 1, "<h2>B</h2>");
        assert_eq!(app.session.current_fragment(), Some("beta"));

        app.handle_key(KeyCode::Char('['), KeyModifiers::NONE, &handle);
        assert_eq!(app.session.current_fragment(), Some("alpha"));
        assert!(matches!(
            &app.session.view().content,
            ContentState::Loading(id) if id.as_str() == "alpha"
        ));

        app.handle_key(KeyCode::Char(']'), KeyModifiers::NONE, &handle);
        assert_eq!(app.session.current_fragment(), Some("beta"));
        assert!(matches!(
            &app.session.view().content,
            ContentState::Loading(id) if id.as_str() == "beta"
        ));
    }

    #[test]
    fn html_flattens_to_readable_lines() {
        let fragment = "<h2 id=\"heading-0\">Attention</h2><p>Queries &amp; keys.</p><p>Second paragraph.</p>";
        let lines = html_to_lines(fragment);
        assert_eq!(
            lines,
            vec![
                "Attention".to_string(),
                "Queries & keys.".to_string(),
                "Second paragraph.".to_string(),
            ]
        );
    }

    #[test]
    fn blank_runs_collapse() {
        let fragment = "<p>one</p>\n\n\n\n<p>two</p>";
        let lines = html_to_lines(fragment);
        assert!(lines.iter().filter(|l| l.is_empty()).count() <= 2);
        assert!(lines.contains(&"one".to_string()));
        assert!(lines.contains(&"two".to_string()));
    }

    #[test]
    fn entities_decode_in_order() {
        // &amp;lt; must stay as the literal "&lt;" -> "<" only after the
        // ampersand pass, so amp is decoded last
        assert_eq!(html_to_lines("<p>a &lt; b &amp; c</p>"), vec!["a < b & c"]);
    }
}
