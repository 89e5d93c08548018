use crate::controller::{TaskListController, lock_dashboard};
use crate::email_panel::EmailStatusPanel;
use crate::interaction::UserInteraction;
use crate::notifications::Severity;
use crate::view::{
    Badge, Dashboard, EmailPanelView, HistoryView, TaskCard, TaskForm, TaskListBody,
};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::{io, time::Duration, time::Instant};

const ACCENT: Color = Color::Rgb(255, 107, 138);
const TICK: Duration = Duration::from_millis(250);

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FormField {
    Title,
    Description,
    DueDate,
    Reminder,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::Title => FormField::Description,
            FormField::Description => FormField::DueDate,
            FormField::DueDate => FormField::Reminder,
            FormField::Reminder => FormField::Title,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum InputMode {
    Normal,
    Editing(FormField),
}

pub struct App {
    pub controller: TaskListController,
    pub panel: EmailStatusPanel,
    pub list_state: ListState,
    pub input_mode: InputMode,
    pub show_help: bool,
    pub show_history: bool,
}

impl App {
    pub fn new(controller: TaskListController, panel: EmailStatusPanel) -> App {
        App {
            controller,
            panel,
            list_state: ListState::default(),
            input_mode: InputMode::Normal,
            show_help: false,
            show_history: false,
        }
    }

    fn selected_task(&self) -> Option<TaskCard> {
        let selected = self.list_state.selected()?;
        let dashboard = self.controller.dashboard();
        let d = lock_dashboard(&dashboard);
        d.tasks.as_ref()?.cards().get(selected).cloned()
    }

    fn task_count(&self) -> usize {
        let dashboard = self.controller.dashboard();
        let d = lock_dashboard(&dashboard);
        d.tasks.as_ref().map(|t| t.cards().len()).unwrap_or(0)
    }

    pub fn next_task(&mut self) {
        let total = self.task_count();
        if total == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < total => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous_task(&mut self) {
        let total = self.task_count();
        if total == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => total - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    /// Keeps the selection inside the list after a reload shrank it.
    fn clamp_selection(&mut self) {
        let total = self.task_count();
        match self.list_state.selected() {
            _ if total == 0 => self.list_state.select(None),
            Some(i) if i >= total => self.list_state.select(Some(total - 1)),
            None => self.list_state.select(Some(0)),
            _ => {}
        }
    }

    /// Dismisses the banner shown at `slot` (0 is the newest), leaving the rest.
    fn dismiss_banner(&self, slot: usize) -> bool {
        let dashboard = self.controller.dashboard();
        let mut d = lock_dashboard(&dashboard);
        let Some(id) = d.notifications.visible().get(slot).map(|n| n.id) else {
            return false;
        };
        d.notifications.dismiss(id)
    }

    fn edit_form(&mut self, field: FormField, key: KeyCode) {
        let dashboard = self.controller.dashboard();
        match key {
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Tab => self.input_mode = InputMode::Editing(field.next()),
            KeyCode::Enter => {
                // Fire and forget; the outcome arrives as a notification.
                if self.controller.add_task().is_some() {
                    self.input_mode = InputMode::Normal;
                }
            }
            KeyCode::Char(' ') if field == FormField::Reminder => {
                let mut d = lock_dashboard(&dashboard);
                d.form.email_reminder = !d.form.email_reminder;
            }
            KeyCode::Char(c) => {
                if let Some(text) = form_text(&mut lock_dashboard(&dashboard).form, field) {
                    text.push(c);
                }
            }
            KeyCode::Backspace => {
                if let Some(text) = form_text(&mut lock_dashboard(&dashboard).form, field) {
                    text.pop();
                }
            }
            _ => {}
        }
    }
}

fn form_text(form: &mut TaskForm, field: FormField) -> Option<&mut String> {
    match field {
        FormField::Title => Some(&mut form.title),
        FormField::Description => Some(&mut form.description),
        FormField::DueDate => Some(&mut form.due_date),
        FormField::Reminder => None,
    }
}

/// Confirm and prompt dialogs drawn as a modal popup.
struct PopupDialogs<'a, B: Backend> {
    terminal: &'a mut Terminal<B>,
}

impl<B: Backend> PopupDialogs<'_, B> {
    fn show(&mut self, title: &str, body: Vec<Line<'static>>) -> io::Result<()> {
        self.terminal.draw(|f| {
            let area = centered_rect(60, 30, f.size());
            f.render_widget(Clear, area);
            let dialog = Paragraph::new(body)
                .block(
                    Block::default()
                        .title(title.to_string())
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(ACCENT)),
                )
                .wrap(Wrap { trim: true });
            f.render_widget(dialog, area);
        })?;
        Ok(())
    }

    fn next_key() -> io::Result<KeyCode> {
        loop {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(key.code);
                }
            }
        }
    }
}

impl<B: Backend> UserInteraction for PopupDialogs<'_, B> {
    fn confirm(&mut self, question: &str) -> bool {
        let body = vec![
            Line::from(question.to_string()),
            Line::from(""),
            Line::from(Span::styled("y: yes   n/Esc: no", Style::default().fg(Color::DarkGray))),
        ];
        loop {
            if self.show("Confirm", body.clone()).is_err() {
                return false;
            }
            match Self::next_key() {
                Ok(KeyCode::Char('y')) | Ok(KeyCode::Char('Y')) => return true,
                Ok(KeyCode::Char('n')) | Ok(KeyCode::Char('N')) | Ok(KeyCode::Esc) => return false,
                Err(_) => return false,
                _ => {}
            }
        }
    }

    fn prompt(&mut self, question: &str, default: &str) -> Option<String> {
        let mut input = default.to_string();
        loop {
            let body = vec![
                Line::from(question.to_string()),
                Line::from(""),
                Line::from(Span::styled(format!("> {}", input), Style::default().fg(ACCENT))),
                Line::from(""),
                Line::from(Span::styled("Enter: ok   Esc: cancel", Style::default().fg(Color::DarkGray))),
            ];
            self.show("Input", body).ok()?;
            match Self::next_key().ok()? {
                KeyCode::Enter => return Some(input),
                KeyCode::Esc => return None,
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) => input.push(c),
                _ => {}
            }
        }
    }
}

pub fn run_tui(controller: TaskListController, panel: EmailStatusPanel) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = App::new(controller, panel);
    app.controller.initialize(&app.panel);
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    let dashboard = app.controller.dashboard();
    loop {
        lock_dashboard(&dashboard).notifications.expire(Instant::now());
        app.clamp_selection();

        terminal.draw(|f| {
            let d = lock_dashboard(&dashboard);
            ui(f, &mut app, &d);
        })?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        // Any key dismisses the help and history popups
        if app.show_help || app.show_history {
            app.show_help = false;
            app.show_history = false;
            continue;
        }

        match app.input_mode {
            InputMode::Editing(field) => app.edit_form(field, key.code),
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Char('a') | KeyCode::Char('i') => {
                    app.input_mode = InputMode::Editing(FormField::Title);
                }
                KeyCode::Char('j') | KeyCode::Down => app.next_task(),
                KeyCode::Char('k') | KeyCode::Up => app.previous_task(),
                KeyCode::Char(' ') | KeyCode::Enter => {
                    if let Some(card) = app.selected_task() {
                        app.controller.toggle_complete(card.id);
                    }
                }
                KeyCode::Char('d') | KeyCode::Delete => {
                    if let Some(card) = app.selected_task() {
                        app.controller
                            .delete_task(card.id, &mut PopupDialogs { terminal: &mut *terminal });
                    }
                }
                KeyCode::Char('e') => {
                    if let Some(card) = app.selected_task().filter(|c| c.can_send_reminder) {
                        app.controller
                            .send_test_reminder(card.id, &mut PopupDialogs { terminal: &mut *terminal });
                    }
                }
                KeyCode::Char('r') => {
                    app.controller.load_tasks();
                }
                KeyCode::Char('s') => {
                    app.panel.check_status();
                }
                KeyCode::Char('t') => {
                    app.panel.test_connection();
                }
                KeyCode::Char('b') => {
                    app.panel
                        .send_bulk_reminders(&mut PopupDialogs { terminal: &mut *terminal });
                }
                KeyCode::Char('m') => {
                    app.panel.show_history();
                    app.show_history = true;
                }
                KeyCode::Char('h') | KeyCode::F(1) => app.show_help = !app.show_help,
                KeyCode::Char(c @ '1'..='3') => {
                    app.dismiss_banner(c as usize - '1' as usize);
                }
                KeyCode::Esc => {
                    lock_dashboard(&dashboard).notifications.dismiss_latest();
                }
                _ => {}
            },
        }
    }
}

fn ui(f: &mut Frame, app: &mut App, d: &Dashboard) {
    if app.show_help {
        draw_help_popup(f);
        return;
    }

    if app.show_history {
        draw_history_popup(f, d);
        return;
    }

    let banners = d.notifications.visible().len().min(3) as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(banners), // Notifications
            Constraint::Min(3),          // Tasks + email panel
            Constraint::Length(3),       // Form
            Constraint::Length(1),       // Status line
        ])
        .split(f.size());

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
        .split(chunks[1]);

    draw_notifications(f, d, chunks[0]);
    draw_task_list(f, app, d, main[0]);
    draw_email_panel(f, d, main[1]);
    draw_form(f, app, &d.form, chunks[2]);
    draw_status_line(f, app, d, chunks[3]);
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Success => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Danger => Color::Red,
        Severity::Info => Color::Cyan,
    }
}

fn draw_notifications(f: &mut Frame, d: &Dashboard, area: Rect) {
    if d.notifications.is_empty() {
        return;
    }
    let lines: Vec<Line> = d
        .notifications
        .visible()
        .iter()
        .take(3)
        .enumerate()
        .map(|(slot, n)| {
            Line::from(vec![
                Span::styled(format!("[{}]", slot + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!(" {} ", n.severity.label().to_uppercase()),
                    Style::default().fg(Color::Black).bg(severity_color(n.severity)),
                ),
                Span::styled(format!(" {}", n.message), Style::default().fg(severity_color(n.severity))),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), area);
}

fn task_item(card: &TaskCard) -> ListItem<'static> {
    let mut spans = Vec::new();

    let checkbox = if card.completed_style { "☑" } else { "☐" };
    spans.push(Span::styled(
        format!("{} ", checkbox),
        if card.completed_style {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(ACCENT)
        },
    ));

    let title_style = if card.completed_style {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else if card.overdue_style {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    spans.push(Span::styled(card.title.clone(), title_style));

    if card.bell {
        spans.push(Span::styled(" 🔔", Style::default().fg(Color::Yellow)));
    }

    let due_color = if card.overdue_style { Color::Red } else { Color::DarkGray };
    spans.push(Span::styled(format!("  🕒 {}", card.due_label), Style::default().fg(due_color)));

    for badge in &card.badges {
        let (text, color) = match badge {
            Badge::Completed => (" ✓ Completed", Color::Green),
            Badge::Overdue => (" ⚠️ Overdue", Color::Red),
        };
        spans.push(Span::styled(text, Style::default().fg(color).add_modifier(Modifier::BOLD)));
    }

    let mut lines = vec![Line::from(spans)];
    if let Some(description) = &card.description {
        lines.push(Line::from(Span::styled(
            format!("    {}", description),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }
    ListItem::new(lines)
}

fn draw_task_list(f: &mut Frame, app: &mut App, d: &Dashboard, area: Rect) {
    let (title, items) = match &d.tasks {
        None => ("Tasks (loading…)".to_string(), Vec::new()),
        Some(view) => {
            let items = match &view.body {
                TaskListBody::Empty(message) => vec![ListItem::new(Line::from(Span::styled(
                    *message,
                    Style::default().fg(Color::DarkGray),
                )))],
                TaskListBody::Cards(cards) => cards.iter().map(task_item).collect(),
            };
            (format!("Tasks ({})", view.count_label), items)
        }
    };

    let tasks_list = List::new(items)
        .block(Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(ACCENT)))
        .highlight_style(Style::default().bg(Color::Black).fg(ACCENT))
        .highlight_symbol("► ");

    f.render_stateful_widget(tasks_list, area, &mut app.list_state);
}

fn draw_email_panel(f: &mut Frame, d: &Dashboard, area: Rect) {
    let label = |s: &str| Span::styled(s.to_string(), Style::default().fg(ACCENT));
    let lines = match &d.email_panel {
        EmailPanelView::Unchecked => vec![Line::from("Checking email status…")],
        EmailPanelView::Configuration { mode, configured } => {
            let badge = if *configured {
                Span::styled(" Yes ", Style::default().fg(Color::Black).bg(Color::Green))
            } else {
                Span::styled(" No ", Style::default().fg(Color::White).bg(Color::Red))
            };
            vec![
                Line::from(vec![label("Mode: "), Span::raw(mode.clone())]),
                Line::from(vec![label("Email Configured: "), badge]),
                Line::from(""),
                Line::from(Span::styled(
                    "All email functions are simulated in demo mode",
                    Style::default().fg(Color::DarkGray),
                )),
            ]
        }
        EmailPanelView::Summary { total, successful, failed, last_activity } => vec![
            Line::from(vec![label("Total Emails: "), Span::raw(total.to_string())]),
            Line::from(vec![
                label("Successful: "),
                Span::styled(successful.to_string(), Style::default().fg(Color::Green)),
            ]),
            Line::from(vec![
                label("Failed: "),
                Span::styled(failed.to_string(), Style::default().fg(Color::Red)),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                format!("Last activity: {}", last_activity),
                Style::default().fg(Color::DarkGray),
            )),
        ],
        EmailPanelView::Error(message) => vec![Line::from(Span::styled(
            format!("⚠️ {}", message),
            Style::default().fg(Color::Red),
        ))],
    };

    let panel = Paragraph::new(lines)
        .block(Block::default()
            .borders(Borders::ALL)
            .title("Email System")
            .border_style(Style::default().fg(ACCENT)))
        .wrap(Wrap { trim: true });
    f.render_widget(panel, area);
}

fn draw_form(f: &mut Frame, app: &App, form: &TaskForm, area: Rect) {
    let focused = match app.input_mode {
        InputMode::Editing(field) => Some(field),
        InputMode::Normal => None,
    };
    let field = |name: &str, value: String, which: FormField| {
        let style = if focused == Some(which) {
            Style::default().fg(ACCENT).add_modifier(Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::White)
        };
        vec![
            Span::styled(format!("{}: ", name), Style::default().fg(Color::DarkGray)),
            Span::styled(value, style),
            Span::raw("  "),
        ]
    };

    let mut spans = Vec::new();
    spans.extend(field("Title", form.title.clone(), FormField::Title));
    spans.extend(field("Desc", form.description.clone(), FormField::Description));
    spans.extend(field("Due", form.due_date.clone(), FormField::DueDate));
    spans.extend(field(
        "🔔",
        if form.email_reminder { "[x]" } else { "[ ]" }.to_string(),
        FormField::Reminder,
    ));

    let title = if form.min_due.is_empty() {
        "Add Task".to_string()
    } else {
        format!("Add Task (due on or after {})", form.min_due)
    };
    let input = Paragraph::new(Line::from(spans))
        .block(Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(ACCENT)))
        .wrap(Wrap { trim: true });

    f.render_widget(input, area);
}

fn draw_status_line(f: &mut Frame, app: &App, d: &Dashboard, area: Rect) {
    let mode_text = match app.input_mode {
        InputMode::Normal => "NORMAL",
        InputMode::Editing(_) => "EDITING (Tab: next field, Enter: add, Esc: back)",
    };
    let count = d
        .tasks
        .as_ref()
        .map(|t| t.count_label.clone())
        .unwrap_or_default();

    let status_text = format!(
        "{} | {} | e:remind s:status t:test b:bulk m:history h:help q:quit",
        mode_text, count
    );

    let status = Paragraph::new(status_text)
        .style(Style::default().fg(Color::White).bg(Color::Black));

    f.render_widget(status, area);
}

fn draw_history_popup(f: &mut Frame, d: &Dashboard) {
    let popup_area = centered_rect(70, 70, f.size());
    f.render_widget(Clear, popup_area);

    let mut lines = Vec::new();
    match &d.history {
        None => lines.push(Line::from("Loading email history…")),
        Some(HistoryView::Empty(message)) => {
            lines.push(Line::from(Span::styled(*message, Style::default().fg(Color::DarkGray))))
        }
        Some(HistoryView::Entries(entries)) => {
            for entry in entries {
                let badge_color = if entry.delivered { Color::Green } else { Color::Red };
                lines.push(Line::from(vec![
                    Span::styled(entry.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" "),
                    Span::styled(
                        format!(" {} ", entry.status.as_str()),
                        Style::default().fg(Color::Black).bg(badge_color),
                    ),
                ]));
                lines.push(Line::from(Span::styled(
                    entry.meta.clone(),
                    Style::default().fg(Color::DarkGray),
                )));
                if let Some(message) = &entry.message {
                    lines.push(Line::from(message.clone()));
                }
                lines.push(Line::from(""));
            }
        }
    }
    lines.push(Line::from(Span::styled("Press any key to close", Style::default().fg(Color::DarkGray))));

    let history = Paragraph::new(lines)
        .block(Block::default()
            .title("Email History")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ACCENT)))
        .wrap(Wrap { trim: true });

    f.render_widget(history, popup_area);
}

fn draw_help_popup(f: &mut Frame) {
    let popup_area = centered_rect(70, 80, f.size());

    f.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from("duetask - Help"),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  j/↓    - Next task"),
        Line::from("  k/↑    - Previous task"),
        Line::from("  Enter  - Toggle task completion"),
        Line::from("  Space  - Toggle task completion"),
        Line::from(""),
        Line::from("Task Management:"),
        Line::from("  a/i    - Edit the new task form (Tab moves between fields)"),
        Line::from("  d/Del  - Delete selected task"),
        Line::from("  e      - Send a reminder email for the selected task"),
        Line::from("  r      - Reload tasks from the server"),
        Line::from(""),
        Line::from("Email:"),
        Line::from("  s      - Check email system status"),
        Line::from("  t      - Test email connection"),
        Line::from("  b      - Send reminders for all reminder-enabled tasks"),
        Line::from("  m      - Show email history"),
        Line::from(""),
        Line::from("Due dates:"),
        Line::from("  2026-10-20T09:00, 2026-10-20 09:00, tomorrow, next friday"),
        Line::from(""),
        Line::from("Other:"),
        Line::from("  Esc    - Dismiss the newest notification"),
        Line::from("  1-3    - Dismiss the notification with that number"),
        Line::from("  h/F1   - Toggle this help"),
        Line::from("  q      - Quit"),
        Line::from(""),
        Line::from("Press any key to close help"),
    ];

    let help_paragraph = Paragraph::new(help_text)
        .block(Block::default()
            .title("Help")
            .borders(Borders::ALL)
            .style(Style::default().bg(Color::Black)))
        .wrap(Wrap { trim: true });

    f.render_widget(help_paragraph, popup_area);
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
