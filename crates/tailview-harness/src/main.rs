#![forbid(unsafe_code)]

//! Terminal harness for the tailview engine.
//!
//! Streams lines from stdin (or a synthetic generator when stdin is a
//! terminal) into a [`TailBuffer`] and draws the render window of a
//! [`VirtualLogList`] with crossterm.
//!
//! # Environment
//! - `TAILVIEW_HARNESS_MAX_ITEMS`: retention cap (default 10000)
//! - `TAILVIEW_HARNESS_SYNTHETIC_MS`: generate a line every N ms instead of reading stdin
//! - `TAILVIEW_HARNESS_WRAP`: `none`, `char` or `word` (default)
//! - `TAILVIEW_HARNESS_EMPTY_TEXT`: placeholder shown while nothing is visible
//! - `TAILVIEW_LOG_FILE`: write tracing output to this file, filtered by `RUST_LOG`
//! - `TAILVIEW_*` list tunables, layered over terminal defaults
//!
//! # Keys
//! `j`/`k` or arrows scroll, PgUp/PgDn page, `g`/Home top, `G`/End tail,
//! `/` search, `n`/`N` next/previous match, `f` filter, `c` case
//! sensitivity, `w` wrap mode, `r` reset, `q` quit.

use std::cell::Cell;
use std::fs::OpenOptions;
use std::io::{self, BufRead, IsTerminal, Write};
use std::panic;
use std::rc::Rc;
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use crossterm::cursor::{self, MoveTo};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{
    self, BeginSynchronizedUpdate, Clear, ClearType, EndSynchronizedUpdate, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use tailview::measure::clip_to_width;
use tailview::{
    HeightUpdate, ItemClick, ListController, ListLayout, LogLevel, RowMeasurer, TailBuffer,
    VirtualListConfig, VirtualLogList, WrapMode,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_MAX_ITEMS: usize = 10_000;
const DEFAULT_SYNTHETIC: Duration = Duration::from_millis(120);
const DEFAULT_EMPTY_TEXT: &str = "waiting for log lines...";
const FRAME_INTERVAL: Duration = Duration::from_millis(33);
/// Lines moved from the feed into the buffer per frame.
const MAX_LINES_PER_FRAME: usize = 4_096;
/// Measure/relayout rounds per frame; newly mounted rows need their own pass.
const MEASURE_PASSES: usize = 3;
const GUTTER: usize = 2;
const WHEEL_STEP: f64 = 3.0;
const TAB: &str = "    ";

// ============================================================================
// Environment
// ============================================================================

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_wrap(value: &str) -> Option<WrapMode> {
    match value.to_ascii_lowercase().as_str() {
        "none" | "off" => Some(WrapMode::None),
        "char" | "grapheme" => Some(WrapMode::Char),
        "word" => Some(WrapMode::Word),
        _ => None,
    }
}

fn init_logging() -> io::Result<()> {
    let Some(path) = env_string("TAILVIEW_LOG_FILE") else {
        return Ok(());
    };
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tailview=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(io::Error::other)
}

// ============================================================================
// Terminal
// ============================================================================

/// Raw mode, alternate screen and mouse capture for the guard's lifetime.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        install_panic_hook();
        terminal::enable_raw_mode()?;
        // Constructed before the remaining setup so a failure still restores.
        let guard = Self;
        execute!(
            io::stdout(),
            EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide
        )?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

fn restore_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, DisableMouseCapture);
    let _ = execute!(stdout, cursor::Show);
    let _ = execute!(stdout, LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
    let _ = stdout.flush();
}

fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        restore_terminal();
        previous(info);
    }));
}

// ============================================================================
// Input feed
// ============================================================================

fn spawn_feed(tx: Sender<String>, synthetic: Option<Duration>) -> io::Result<()> {
    let builder = thread::Builder::new().name("tailview-feed".into());
    match synthetic {
        Some(interval) => builder.spawn(move || synthetic_feed(&tx, interval))?,
        None => builder.spawn(move || stdin_feed(&tx))?,
    };
    Ok(())
}

fn stdin_feed(tx: &Sender<String>) {
    read_feed(io::stdin().lock(), tx);
}

/// Forward newline-terminated lines until EOF. Bytes that are not UTF-8
/// become U+FFFD instead of ending the feed.
fn read_feed(mut reader: impl BufRead, tx: &Sender<String>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return,
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                let line = String::from_utf8_lossy(&buf).replace('\t', TAB);
                if tx.send(line).is_err() {
                    return;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => {
                tracing::warn!(%err, "stdin read failed");
                return;
            }
        }
    }
}

fn synthetic_feed(tx: &Sender<String>, interval: Duration) {
    for n in 0u64.. {
        if tx.send(synthetic_line(n)).is_err() {
            return;
        }
        thread::sleep(interval);
    }
}

fn synthetic_line(n: u64) -> String {
    match n % 7 {
        0 => format!(
            "[WARN] upstream db-replica-{} slow to respond; retrying in 250ms with \
             exponential backoff (attempt {})",
            n % 4,
            n / 7 % 5 + 1
        ),
        3 => format!(
            "[ERROR] job {n} failed\n  caused by: connection reset by peer\n  retry scheduled"
        ),
        5 => format!("[DEBUG] cache lookup key=session:{n:06} hit={}", n % 2 == 0),
        _ => format!("[INFO] request {n} served path=/api/items status=200"),
    }
}

// ============================================================================
// App
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    Search,
    Filter,
}

#[derive(Debug, Clone)]
struct Prompt {
    kind: PromptKind,
    text: String,
}

struct App {
    buffer: TailBuffer,
    list: VirtualLogList,
    measurer: RowMeasurer,
    cols: u16,
    /// Rows available to the list; the last terminal row is the status line.
    rows: u16,
    prompt: Option<Prompt>,
    empty_text: String,
    selected: Rc<Cell<Option<ItemClick>>>,
    feed_closed: bool,
}

fn list_rows(terminal_rows: u16) -> u16 {
    terminal_rows.saturating_sub(1).max(1)
}

fn row_measurer(cols: u16, wrap: WrapMode) -> RowMeasurer {
    RowMeasurer::new(usize::from(cols))
        .with_wrap(wrap)
        .with_gutter(GUTTER)
}

fn level_color(level: Option<LogLevel>) -> Color {
    match level {
        Some(LogLevel::Error) => Color::Red,
        Some(LogLevel::Warn) => Color::Yellow,
        Some(LogLevel::Debug | LogLevel::Trace) => Color::DarkGrey,
        Some(LogLevel::Info) | None => Color::Reset,
    }
}

impl App {
    fn new(
        cols: u16,
        terminal_rows: u16,
        max_items: usize,
        wrap: WrapMode,
        empty_text: String,
    ) -> Self {
        let rows = list_rows(terminal_rows);
        // The buffer evicts from the front once full; keep that incremental.
        let parsed = VirtualListConfig::terminal(rows)
            .with_preserve_on_front_trim(true)
            .overlay_env();
        for error in &parsed.errors {
            tracing::warn!(%error, "ignoring list config value");
        }

        let selected = Rc::new(Cell::new(None));
        let sink = Rc::clone(&selected);
        let mut list = VirtualLogList::new(parsed.config)
            .with_on_item_click(move |click| sink.set(Some(click)));
        list.set_viewport_height(f64::from(rows));

        Self {
            buffer: TailBuffer::new(max_items),
            list,
            measurer: row_measurer(cols, wrap),
            cols,
            rows,
            prompt: None,
            empty_text,
            selected,
            feed_closed: false,
        }
    }

    fn run(&mut self, feed: &Receiver<String>) -> io::Result<()> {
        let mut stdout = io::stdout();
        loop {
            self.drain(feed);
            self.frame(&mut stdout)?;
            if event::poll(FRAME_INTERVAL)? {
                loop {
                    if !self.handle_event(event::read()?) {
                        return Ok(());
                    }
                    if !event::poll(Duration::ZERO)? {
                        break;
                    }
                }
            }
        }
    }

    fn drain(&mut self, feed: &Receiver<String>) {
        for _ in 0..MAX_LINES_PER_FRAME {
            match feed.try_recv() {
                Ok(line) => {
                    self.buffer.push(line);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.feed_closed {
                        tracing::info!(lines = self.buffer.len(), "input feed closed");
                        self.feed_closed = true;
                    }
                    break;
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------------

    fn frame(&mut self, out: &mut impl Write) -> io::Result<()> {
        self.list.sync(&self.buffer.visible_items());
        self.list.tick();
        self.list.on_frame();

        let mut layout = self.list.layout();
        for _ in 0..MEASURE_PASSES {
            if !self.measure(&layout) {
                break;
            }
            self.list.on_frame();
            layout = self.list.layout();
        }
        self.draw(out, &layout)
    }

    /// Report the row count of every mounted item. True if any height moved.
    fn measure(&mut self, layout: &ListLayout) -> bool {
        let mut changed = false;
        for row in &layout.rows {
            if let Some(item) = self.buffer.visible(row.index) {
                let update = self
                    .list
                    .report_height(row.id, self.measurer.height(&item.content));
                changed |= matches!(update, HeightUpdate::Changed { .. });
            }
        }
        changed
    }

    fn draw(&self, out: &mut impl Write, layout: &ListLayout) -> io::Result<()> {
        queue!(out, BeginSynchronizedUpdate)?;
        for y in 0..self.rows {
            queue!(out, MoveTo(0, y), Clear(ClearType::CurrentLine))?;
        }

        if layout.is_empty() {
            queue!(
                out,
                MoveTo(0, self.rows / 2),
                SetAttribute(Attribute::Dim),
                Print(clip_to_width(&self.empty_text, usize::from(self.cols))),
                SetAttribute(Attribute::Reset)
            )?;
        }

        let text_width = usize::from(self.cols).saturating_sub(GUTTER);
        let current_match = self.buffer.current_match();
        for row in &layout.rows {
            let Some(item) = self.buffer.visible(row.index) else {
                continue;
            };
            let marker = if current_match == Some(row.index) {
                "> "
            } else {
                "| "
            };
            let top = row.top.floor() as i64;
            for (line_no, line) in self.measurer.wrap(&item.content).into_iter().enumerate() {
                let Ok(y) = u16::try_from(top + line_no as i64) else {
                    continue;
                };
                if y >= self.rows {
                    break;
                }
                queue!(
                    out,
                    MoveTo(0, y),
                    SetForegroundColor(Color::DarkGrey),
                    Print(if line_no == 0 { marker } else { "  " }),
                    SetForegroundColor(level_color(item.level)),
                    Print(clip_to_width(line, text_width)),
                    ResetColor
                )?;
            }
        }

        self.draw_status(out)?;
        queue!(out, EndSynchronizedUpdate)?;
        out.flush()
    }

    fn draw_status(&self, out: &mut impl Write) -> io::Result<()> {
        let status = match &self.prompt {
            Some(prompt) => {
                let label = match prompt.kind {
                    PromptKind::Search => "/",
                    PromptKind::Filter => "filter: ",
                };
                format!("{label}{}", prompt.text)
            }
            None => self.status_line(),
        };
        queue!(
            out,
            MoveTo(0, self.rows),
            Clear(ClearType::CurrentLine),
            SetAttribute(Attribute::Reverse),
            Print(clip_to_width(&status, usize::from(self.cols))),
            SetAttribute(Attribute::Reset)
        )
    }

    fn status_line(&self) -> String {
        let mut parts = vec![format!(
            "{}/{} lines",
            self.buffer.visible_len(),
            self.buffer.len()
        )];
        if self.buffer.evicted() > 0 {
            parts.push(format!("{} evicted", self.buffer.evicted()));
        }
        parts.push(if self.list.auto_follow() { "following" } else { "paused" }.to_string());
        if let Some(filter) = self.buffer.filter() {
            parts.push(format!("filter: {filter}"));
        }
        if let Some((current, total)) = self.buffer.search_info() {
            parts.push(format!("match {current}/{total}"));
        }
        if let Some(click) = self.selected.get() {
            parts.push(format!("selected #{}", click.index + 1));
        }
        let wrap = match self.measurer.wrap {
            WrapMode::None => "none",
            WrapMode::Char => "char",
            WrapMode::Word => "word",
        };
        parts.push(format!("wrap: {wrap}"));
        if self.feed_closed {
            parts.push("input closed".to_string());
        }
        format!(" {}", parts.join(" | "))
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    /// Returns false when the app should exit.
    fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => return self.on_key(key),
            Event::Mouse(mouse) => self.on_mouse(mouse),
            Event::Resize(cols, rows) => self.resize(cols, rows),
            _ => {}
        }
        true
    }

    fn on_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return false;
        }
        if let Some(prompt) = self.prompt.take() {
            self.on_prompt_key(prompt, key.code);
            return true;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Up | KeyCode::Char('k') => {
                self.list.scroll_by(-1.0);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.list.scroll_by(1.0);
            }
            KeyCode::PageUp => {
                self.list.page_up();
            }
            KeyCode::PageDown | KeyCode::Char(' ') => {
                self.list.page_down();
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.list.scroll_to_top();
            }
            KeyCode::End | KeyCode::Char('G') => self.list.scroll_to_bottom(),
            KeyCode::Char('/') => {
                self.prompt = Some(Prompt {
                    kind: PromptKind::Search,
                    text: String::new(),
                });
            }
            KeyCode::Char('f') => {
                self.prompt = Some(Prompt {
                    kind: PromptKind::Filter,
                    text: self.buffer.filter().unwrap_or_default().to_string(),
                });
            }
            KeyCode::Char('n') => {
                let position = self.buffer.next_match();
                self.reveal(position);
            }
            KeyCode::Char('N') => {
                let position = self.buffer.prev_match();
                self.reveal(position);
            }
            KeyCode::Char('c') => {
                let case_sensitive = !self.buffer.case_sensitive();
                self.buffer.set_case_sensitive(case_sensitive);
            }
            KeyCode::Char('w') => {
                let wrap = match self.measurer.wrap {
                    WrapMode::None => WrapMode::Char,
                    WrapMode::Char => WrapMode::Word,
                    WrapMode::Word => WrapMode::None,
                };
                self.measurer = row_measurer(self.cols, wrap);
                // Heights measured under the old wrap mode are stale.
                self.list.reset();
            }
            KeyCode::Char('r') => self.list.reset(),
            _ => {}
        }
        true
    }

    fn on_prompt_key(&mut self, mut prompt: Prompt, code: KeyCode) {
        match code {
            KeyCode::Esc => {}
            KeyCode::Enter => self.apply_prompt(prompt),
            KeyCode::Backspace => {
                prompt.text.pop();
                self.prompt = Some(prompt);
            }
            KeyCode::Char(c) => {
                prompt.text.push(c);
                self.prompt = Some(prompt);
            }
            _ => self.prompt = Some(prompt),
        }
    }

    fn apply_prompt(&mut self, prompt: Prompt) {
        match prompt.kind {
            PromptKind::Search if prompt.text.is_empty() => self.buffer.clear_search(),
            PromptKind::Search => {
                let count = self.buffer.search(&prompt.text);
                tracing::debug!(query = %prompt.text, count, "search");
                let position = self.buffer.current_match();
                self.reveal(position);
            }
            PromptKind::Filter => {
                let pattern = (!prompt.text.is_empty()).then_some(prompt.text.as_str());
                self.buffer.set_filter(pattern);
                tracing::debug!(
                    filter = ?pattern,
                    visible = self.buffer.visible_len(),
                    "filter applied"
                );
            }
        }
    }

    /// Scroll a view position into the top of the viewport.
    fn reveal(&mut self, position: Option<usize>) {
        let Some(position) = position else {
            return;
        };
        // Navigation indexes the buffer's current view; the list may lag a frame.
        self.list.sync(&self.buffer.visible_items());
        self.list.scroll_to_index(position);
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => {
                self.list.scroll_by(-WHEEL_STEP);
            }
            MouseEventKind::ScrollDown => {
                self.list.scroll_by(WHEEL_STEP);
            }
            MouseEventKind::Down(MouseButton::Left) if mouse.row < self.rows => {
                self.list.click_at(f64::from(mouse.row) + 0.5);
            }
            _ => {}
        }
    }

    fn resize(&mut self, cols: u16, terminal_rows: u16) {
        let rows = list_rows(terminal_rows);
        tracing::debug!(cols, rows, "terminal resized");
        self.rows = rows;
        self.list.set_viewport_height(f64::from(rows));
        if cols != self.cols {
            self.cols = cols;
            self.measurer = row_measurer(cols, self.measurer.wrap);
            // Row counts depend on the width.
            self.list.reset();
        }
    }
}

fn main() -> io::Result<()> {
    init_logging()?;

    let max_items = env_u64("TAILVIEW_HARNESS_MAX_ITEMS")
        .map_or(DEFAULT_MAX_ITEMS, |value| {
            usize::try_from(value).unwrap_or(usize::MAX)
        });
    let synthetic = env_u64("TAILVIEW_HARNESS_SYNTHETIC_MS")
        .map(Duration::from_millis)
        .or_else(|| io::stdin().is_terminal().then_some(DEFAULT_SYNTHETIC));
    let wrap = match env_string("TAILVIEW_HARNESS_WRAP") {
        Some(value) => parse_wrap(&value).unwrap_or_else(|| {
            tracing::warn!(%value, "unknown wrap mode, using word");
            WrapMode::Word
        }),
        None => WrapMode::Word,
    };
    let empty_text =
        env_string("TAILVIEW_HARNESS_EMPTY_TEXT").unwrap_or_else(|| DEFAULT_EMPTY_TEXT.to_string());

    let (tx, rx) = mpsc::channel();
    spawn_feed(tx, synthetic)?;
    tracing::info!(max_items, synthetic = synthetic.is_some(), "harness starting");

    let _guard = TerminalGuard::enter()?;
    let (cols, rows) = terminal::size()?;
    let mut app = App::new(cols, rows, max_items, wrap, empty_text);
    let result = app.run(&rx);
    app.list.unmount();
    result
}
