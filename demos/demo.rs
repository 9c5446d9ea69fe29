use std::cell::RefCell;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, TimeDelta};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEventKind,
};
use crossterm::execute;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::{DefaultTerminal, Frame};
use tokio::runtime::Runtime;

use tui_cliplist::{
    AssetError, AssetSource, Backend, BackendError, ClipItem, ClipListStyle, ClipListView,
    ItemKey, ListAction, ListConfig, ListEvent, ListManager, ListNotice, ListRegistry, ListTab,
};

// In-memory stand-in for the clipboard service.
struct MemoryBackend {
    items: RefCell<Vec<ClipItem>>,
    grouped: bool,
}

impl MemoryBackend {
    fn new(items: Vec<ClipItem>, grouped: bool) -> Self {
        Self {
            items: RefCell::new(items),
            grouped,
        }
    }

    fn position(&self, key: &ItemKey) -> Result<usize, BackendError> {
        self.items
            .borrow()
            .iter()
            .position(|item| &item.key == key)
            .ok_or_else(|| BackendError::NotFound { key: key.clone() })
    }
}

impl Backend for MemoryBackend {
    async fn fetch_all(&self) -> Result<Vec<ClipItem>, BackendError> {
        Ok(self.items.borrow().clone())
    }

    async fn move_item(&self, key: &ItemKey, to_index: usize) -> Result<(), BackendError> {
        let from = self.position(key)?;
        let mut items = self.items.borrow_mut();
        let moved = items.remove(from);
        let at = if self.grouped {
            // `to_index` counts only items of the moved item's group.
            let mut same_group = items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.group_id == moved.group_id)
                .map(|(idx, _)| idx);
            let last = items
                .iter()
                .rposition(|item| item.group_id == moved.group_id)
                .map_or(items.len(), |idx| idx + 1);
            same_group.nth(to_index).unwrap_or(last)
        } else {
            to_index.min(items.len())
        };
        items.insert(at, moved);
        Ok(())
    }

    async fn delete_item(&self, key: &ItemKey) -> Result<(), BackendError> {
        let idx = self.position(key)?;
        self.items.borrow_mut().remove(idx);
        Ok(())
    }

    async fn move_item_to_group(&self, key: &ItemKey, group_id: &str) -> Result<(), BackendError> {
        let idx = self.position(key)?;
        let mut items = self.items.borrow_mut();
        items[idx].group_id = (!group_id.is_empty()).then(|| group_id.to_owned());
        Ok(())
    }
}

// Pretends to read image bytes from disk.
struct DemoAssets;

impl AssetSource for DemoAssets {
    async fn fetch_asset(&self, asset_id: &str, thumbnail: bool) -> Result<String, AssetError> {
        tokio::time::sleep(Duration::from_millis(if thumbnail { 150 } else { 400 })).await;
        if asset_id.ends_with("broken") {
            return Err(AssetError::Fetch {
                asset_id: asset_id.to_owned(),
                reason: "file missing".to_owned(),
            });
        }
        Ok(format!("data:image/png;base64,{}", "A".repeat(asset_id.len() * 64)))
    }
}

fn history_items() -> Vec<ClipItem> {
    let now = Local::now();
    let files = r#"[{"name":"report.pdf","path":"/home/me/report.pdf","type":"file"},{"name":"notes","path":"/home/me/notes","type":"directory"}]"#;
    let mut items = vec![
        ClipItem::text("h0", "cargo run --example demo --features keymap"),
        ClipItem::text("h1", "https://docs.rs/ratatui/latest/ratatui/"),
        ClipItem::image("h2", "screenshot-1"),
        ClipItem::files("h3", files),
        ClipItem::rich_text("h4", "Hello world", "<p><b>Hello</b> world</p>"),
        ClipItem::image("h5", "screenshot-broken"),
        ClipItem::files("h6", "{oops"),
    ];
    for n in 7..200 {
        items.push(ClipItem::text(format!("h{n}"), format!("clip #{n}\nsecond line of clip {n}")));
    }
    for (idx, item) in items.iter_mut().enumerate() {
        let copied = now - TimeDelta::minutes(i64::try_from(idx).unwrap_or(0));
        item.timestamp = copied.timestamp();
    }
    items
}

fn quick_text_items() -> Vec<ClipItem> {
    let mut items = Vec::new();
    for (group, count) in [("work", 6), ("personal", 4)] {
        for n in 0..count {
            items.push(
                ClipItem::text(format!("{group}-{n}"), format!("{group} snippet {n}"))
                    .with_title(format!("{group} #{n}"))
                    .with_group(group),
            );
        }
    }
    items
}

struct App {
    registry: ListRegistry,
    history: MemoryBackend,
    quick_texts: MemoryBackend,
    assets: Arc<DemoAssets>,
    searching: bool,
    status: String,
    drag_from: Option<usize>,
    list_area: Rect,
}

// Splits out the list for `tab` and the backend it persists to.
fn parts(app: &mut App, tab: ListTab) -> (&mut ListManager, &MemoryBackend) {
    let backend = match tab {
        ListTab::History => &app.history,
        ListTab::QuickTexts => &app.quick_texts,
    };
    (app.registry.get_mut(tab), backend)
}

impl App {
    // Row index inside the list's drawable area for a terminal line.
    fn visual_at(&self, row: u16) -> Option<usize> {
        let top = self.list_area.y + 1;
        if row < top || row >= self.list_area.bottom().saturating_sub(1) {
            return None;
        }
        self.registry.active().visual_at(u32::from(row - top))
    }
}

fn main() -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let config = ListConfig::default();
    let mut app = App {
        registry: ListRegistry::new(config, vec!["work".to_owned(), "personal".to_owned()]),
        history: MemoryBackend::new(history_items(), false),
        quick_texts: MemoryBackend::new(quick_text_items(), true),
        assets: Arc::new(DemoAssets),
        searching: false,
        status: String::from("q quit | 1/2 tabs | / search | tab type filter | mouse drag reorders"),
        drag_from: None,
        list_area: Rect::default(),
    };
    for tab in [ListTab::History, ListTab::QuickTexts] {
        let (list, backend) = parts(&mut app, tab);
        let _ = runtime.block_on(list.refresh(backend));
    }

    let terminal = ratatui::init();
    execute!(io::stdout(), EnableMouseCapture)?;
    let result = run_app(terminal, &runtime, &mut app);
    execute!(io::stdout(), DisableMouseCapture)?;
    ratatui::restore();
    result
}

fn run_app(mut terminal: DefaultTerminal, runtime: &Runtime, app: &mut App) -> io::Result<()> {
    let _guard = runtime.enter();
    let mut notices = [
        app.registry.get(ListTab::History).subscribe(),
        app.registry.get(ListTab::QuickTexts).subscribe(),
    ];

    loop {
        terminal.draw(|frame| render(frame, app))?;

        let tab = app.registry.active_tab();
        let assets = Arc::clone(&app.assets);
        let list = app.registry.active_mut();
        list.tick(Instant::now());
        list.pump_assets(&assets);
        runtime.block_on(async {
            while let Ok(Some(_)) = tokio::time::timeout(Duration::from_millis(5), list.next_asset()).await {
                list.pump_assets(&assets);
            }
        });

        for rx in &mut notices {
            while let Ok(notice) = rx.try_recv() {
                if let ListNotice::Notification(message) = notice {
                    app.status = message;
                }
            }
        }

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if app.searching {
                    let list = app.registry.active_mut();
                    let mut term = list.filter().search_term.clone();
                    match key.code {
                        KeyCode::Esc | KeyCode::Enter => app.searching = false,
                        KeyCode::Backspace => {
                            term.pop();
                            list.set_search(term);
                        }
                        KeyCode::Char(c) => {
                            term.push(c);
                            list.set_search(term);
                        }
                        _ => {}
                    }
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char('1') => {
                        app.registry.switch_tab(ListTab::History);
                    }
                    KeyCode::Char('2') => {
                        app.registry.switch_tab(ListTab::QuickTexts);
                    }
                    KeyCode::Char('/') => app.searching = true,
                    KeyCode::Char('r') => {
                        let (list, backend) = parts(app, tab);
                        let _ = runtime.block_on(list.refresh(backend));
                    }
                    _ => {
                        let event = app.registry.active_mut().handle_key(key);
                        handle_event(runtime, app, tab, event);
                    }
                }
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => {
                    if let Some(visual) = app.visual_at(mouse.row)
                        && app.registry.active_mut().drag_start(visual)
                    {
                        app.drag_from = Some(visual);
                    }
                }
                MouseEventKind::Up(MouseButton::Left) => {
                    let Some(from) = app.drag_from.take() else {
                        continue;
                    };
                    let to = app.visual_at(mouse.row).unwrap_or(from);
                    let (list, backend) = parts(app, tab);
                    if to == from {
                        list.drag_cancel();
                        if let Some(key) = list.click(to) {
                            app.status = format!("selected {key}");
                        }
                    } else {
                        let outcome = runtime.block_on(list.drag_end(backend, to));
                        app.status = format!("{outcome:?}");
                    }
                }
                MouseEventKind::ScrollDown => {
                    app.registry.active_mut().scroll_by(3, Instant::now());
                }
                MouseEventKind::ScrollUp => {
                    app.registry.active_mut().scroll_by(-3, Instant::now());
                }
                _ => {}
            },
            _ => {}
        }
    }

    Ok(())
}

fn handle_event(runtime: &Runtime, app: &mut App, tab: ListTab, event: ListEvent) {
    match event {
        ListEvent::Execute(key) => app.status = format!("pasted {key}"),
        ListEvent::Action(ListAction::Delete) => {
            let Some(key) = app.registry.get(tab).active_item().map(|item| item.key.clone()) else {
                return;
            };
            let (list, backend) = parts(app, tab);
            if runtime.block_on(list.delete(backend, &key)).is_ok() {
                app.status = format!("deleted {key}");
            }
        }
        ListEvent::Handled | ListEvent::Unhandled | ListEvent::Action(_) => {}
    }
}

fn render(frame: &mut Frame, app: &mut App) {
    let [header, body, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());
    app.list_area = body;

    let tab = app.registry.active_tab();
    let list = app.registry.active();
    let tabs = match tab {
        ListTab::History => "[History]  Quick texts ",
        ListTab::QuickTexts => " History  [Quick texts]",
    };
    let search = if app.searching { "_" } else { "" };
    let filter = list.filter();
    let header_line = Line::from(format!(
        "{tabs}   type: {:?}   search: {}{search}   {}/{}",
        filter.type_filter,
        filter.search_term,
        list.view().len(),
        list.items().len(),
    ));
    frame.render_widget(Paragraph::new(header_line), header);
    frame.render_widget(
        Paragraph::new(app.status.as_str()).style(Style::default().fg(Color::Rgb(140, 150, 170))),
        footer,
    );

    let mut style = ClipListStyle::default().title(match tab {
        ListTab::History => " Clipboard history ",
        ListTab::QuickTexts => " Quick texts ",
    });
    style.block_style = Style::default()
        .fg(Color::Rgb(221, 227, 235))
        .bg(Color::Rgb(24, 28, 36));
    style.border_style = Style::default().fg(Color::Rgb(92, 110, 140));
    style.badge_style = Style::default().fg(Color::Rgb(229, 201, 133));
    style.highlight_style = Style::default()
        .fg(Color::Rgb(255, 255, 255))
        .bg(Color::Rgb(52, 66, 96))
        .add_modifier(Modifier::BOLD);
    style.error_style = Style::default().fg(Color::Rgb(191, 97, 106));

    frame.render_stateful_widget(ClipListView::new(style), body, app.registry.active_mut());
}
