use crate::calendar::{Calendar, Command, DayDetail, Outcome, EMPTY_DAY};
use crate::grid::{CalendarMonth, DayCell, MonthGrid};
use crate::locale::WEEKDAYS;
use crate::model::EventFields;
use crate::storage::StoreLocation;
use anyhow::Result;
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub fn run(calendar: Calendar, location: StoreLocation) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(calendar, location);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    calendar: Calendar,
    location: StoreLocation,
    last_save: Option<Instant>,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    Creating(EventForm),
}

struct EventForm {
    title: FieldValue,
    date: FieldValue,
    time: FieldValue,
    location: FieldValue,
    description: FieldValue,
    field: FormField,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum FormField {
    Title,
    Date,
    Time,
    Location,
    Description,
}

#[derive(Clone, Debug)]
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
        self.cursor = prev_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_boundary(self.cursor, &self.value);
    }

    fn move_up(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx == 0 {
            return;
        }
        self.cursor = index_at_col(&self.value, line_starts[line_idx - 1], col);
    }

    fn move_down(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx + 1 >= line_starts.len() {
            return;
        }
        self.cursor = index_at_col(&self.value, line_starts[line_idx + 1], col);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_boundary(self.cursor, &self.value);
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
}

impl EventForm {
    fn new(date: &str) -> Self {
        EventForm {
            title: FieldValue::new(""),
            date: FieldValue::new(date),
            time: FieldValue::new(""),
            location: FieldValue::new(""),
            description: FieldValue::new(""),
            field: FormField::Title,
        }
    }

    fn fields(&self) -> EventFields {
        EventFields {
            title: self.title.value.clone(),
            date: self.date.value.clone(),
            time: self.time.value.clone(),
            location: self.location.value.clone(),
            description: self.description.value.clone(),
        }
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Date,
            FormField::Date => FormField::Time,
            FormField::Time => FormField::Location,
            FormField::Location => FormField::Description,
            FormField::Description => FormField::Title,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Description,
            FormField::Date => FormField::Title,
            FormField::Time => FormField::Date,
            FormField::Location => FormField::Time,
            FormField::Description => FormField::Location,
        };
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            FormField::Title => &mut self.title,
            FormField::Date => &mut self.date,
            FormField::Time => &mut self.time,
            FormField::Location => &mut self.location,
            FormField::Description => &mut self.description,
        }
    }
}

impl App {
    fn new(mut calendar: Calendar, location: StoreLocation) -> Self {
        let today = calendar.today();
        calendar.apply(Command::SelectDate(today));
        let status = format!(
            "{} eventos cargados de {}",
            calendar.store().len(),
            calendar.store().storage_label()
        );
        App {
            calendar,
            location,
            last_save: None,
            status,
            mode: Mode::Normal,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
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
        let mode = std::mem::replace(&mut self.mode, Mode::Normal);
        match mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Creating(mut form) => {
                if !self.process_form_key(&mut form, key) {
                    self.mode = Mode::Creating(form);
                }
                false
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Left | KeyCode::Char('h') => self.step_selection(-1),
            KeyCode::Right | KeyCode::Char('l') => self.step_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.step_selection(-7),
            KeyCode::Down | KeyCode::Char('j') => self.step_selection(7),
            KeyCode::PageUp | KeyCode::Char('<') | KeyCode::Char('[') => self.navigate(-1),
            KeyCode::PageDown | KeyCode::Char('>') | KeyCode::Char(']') => self.navigate(1),
            KeyCode::Char('t') => self.jump_to_today(),
            KeyCode::Char('n') | KeyCode::Char('a') => {
                let date = self.calendar.detail().form_date;
                self.mode = Mode::Creating(EventForm::new(&date));
                self.status =
                    "Nuevo evento (Tab/Shift-Tab campos, Ctrl+Enter guardar, Esc cancelar)".into();
            }
            _ => {}
        }
        false
    }

    fn navigate(&mut self, delta: i32) {
        if self.calendar.apply(Command::NavigateMonth(delta)) == Outcome::Changed {
            self.status = self.calendar.state().current_month.title();
        }
    }

    fn step_selection(&mut self, days: i64) {
        let state = *self.calendar.state();
        let target = step_within_month(state.current_month, state.selected, days);
        self.calendar.apply(Command::SelectDate(target));
    }

    fn jump_to_today(&mut self) {
        let today = self.calendar.today();
        let current = self.calendar.state().current_month;
        let delta = months_between(current, today);
        if delta != 0 {
            self.calendar.apply(Command::NavigateMonth(delta));
        }
        self.calendar.apply(Command::SelectDate(today));
        self.status = "Hoy".into();
    }

    /// Returns true once the form should close.
    fn process_form_key(&mut self, form: &mut EventForm, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.status = "Cancelado".into();
                return true;
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Left => form.active_field_mut().move_left(),
            KeyCode::Right => form.active_field_mut().move_right(),
            KeyCode::Up => form.active_field_mut().move_up(),
            KeyCode::Down => form.active_field_mut().move_down(),
            KeyCode::Enter => {
                let control = key.modifiers.contains(KeyModifiers::CONTROL);
                if form.field == FormField::Description && !control {
                    form.active_field_mut().insert_char('\n');
                } else {
                    return self.submit(form);
                }
            }
            KeyCode::Backspace => form.active_field_mut().backspace(),
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    form.active_field_mut().insert_char(c);
                }
            }
            _ => {}
        }
        false
    }

    fn submit(&mut self, form: &EventForm) -> bool {
        let fields = form.fields();
        let title = fields.title.trim().to_string();
        match self.calendar.apply(Command::SubmitEvent(fields)) {
            Outcome::Rejected => {
                debug!("form kept open after rejected submission");
                false
            }
            _ if self.calendar.unsaved() => {
                self.status = format!("No se pudo guardar: {}", title);
                true
            }
            _ => {
                info!(%title, "event added from form");
                self.last_save = Some(Instant::now());
                self.status = format!("Evento guardado: {}", title);
                true
            }
        }
    }

    fn draw(&self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(16),
                Constraint::Length(4),
            ])
            .split(f.size());

        let view = self.calendar.view();
        self.draw_header(f, layout[0], &view.title);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(layout[1]);
        draw_grid(f, body[0], &view.title, &view.grid);
        draw_detail(f, body[1], &view.detail);
        self.draw_footer(f, layout[2], &view.grid);

        if let Mode::Creating(form) = &self.mode {
            draw_form(f, form);
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect, month_title: &str) {
        let saved = match self.last_save {
            Some(at) => format!("guardado {}", format_elapsed(at)),
            None => "sin cambios".to_string(),
        };
        let title = Line::from(vec![
            Span::styled(
                "calendario ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                month_title.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(
                self.location.scope.label(),
                Style::default().fg(Color::Green),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.location.path.display()),
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

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect, grid: &MonthGrid) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let label = self
            .calendar
            .state()
            .selected
            .and_then(|date| grid.cell_for(date))
            .and_then(|cell| cell.label.clone())
            .unwrap_or_default();
        let selected = Paragraph::new(Span::styled(label, Style::default().fg(Color::Gray)))
            .alignment(Alignment::Right)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(selected, bottom[1]);
    }
}

fn draw_grid(f: &mut ratatui::Frame<'_>, area: Rect, title: &str, grid: &MonthGrid) {
    let cell_width = (area.width.saturating_sub(2) / 7).clamp(4, 12) as usize;
    let mut lines = Vec::new();
    let header: Vec<Span<'static>> = WEEKDAYS
        .iter()
        .map(|(short, _)| {
            Span::styled(
                format!("{:^width$}", short, width = cell_width),
                Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
            )
        })
        .collect();
    lines.push(Line::from(header));
    lines.push(Line::from(""));

    for week in grid.weeks() {
        let numbers: Vec<Span<'static>> = week
            .iter()
            .map(|cell| {
                Span::styled(
                    format!("{:^width$}", cell.day, width = cell_width),
                    cell_style(cell),
                )
            })
            .collect();
        let markers: Vec<Span<'static>> = week
            .iter()
            .map(|cell| {
                Span::styled(
                    format!("{:^width$}", "•".repeat(cell.markers), width = cell_width),
                    Style::default().fg(Color::LightMagenta),
                )
            })
            .collect();
        lines.push(Line::from(numbers));
        lines.push(Line::from(markers));
    }

    let block = Block::default()
        .title(Span::styled(
            title.to_string(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block);
    f.render_widget(paragraph, area);
}

fn cell_style(cell: &DayCell) -> Style {
    if cell.is_outside() {
        return Style::default().fg(Color::DarkGray);
    }
    let mut style = Style::default().fg(if cell.event_count > 0 {
        Color::LightYellow
    } else {
        Color::White
    });
    if cell.is_today {
        style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
    }
    if cell.is_selected {
        style = style
            .bg(Color::Cyan)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD);
    }
    style
}

fn draw_detail(f: &mut ratatui::Frame<'_>, area: Rect, detail: &DayDetail) {
    let mut lines = vec![
        Line::from(Span::styled(
            detail.heading.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    if detail.date.is_some() && detail.events.is_empty() {
        lines.push(Line::from(Span::styled(
            EMPTY_DAY,
            Style::default().fg(Color::Gray),
        )));
    }
    for event in &detail.events {
        lines.push(Line::from(Span::styled(
            event.title.clone(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            format!("⏰ {}", event.time),
            Style::default().fg(Color::LightRed),
        )));
        if let Some(location) = &event.location {
            lines.push(Line::from(Span::styled(
                format!("📍 {}", location),
                Style::default().fg(Color::LightGreen),
            )));
        }
        if let Some(description) = &event.description {
            lines.push(Line::from(Span::styled(
                description.clone(),
                Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
            )));
        }
        lines.push(Line::from(""));
    }

    let block = Block::default()
        .title(Span::styled(
            "Eventos",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(block);
    f.render_widget(paragraph, area);
}

fn draw_form(f: &mut ratatui::Frame<'_>, form: &EventForm) {
    let area = centered_rect(70, 60, f.size());
    let mut fields = Vec::new();
    fields.extend(field_lines(
        "Título",
        &form.title,
        form.field == FormField::Title,
    ));
    fields.extend(field_lines(
        "Fecha (AAAA-MM-DD)",
        &form.date,
        form.field == FormField::Date,
    ));
    fields.extend(field_lines(
        "Hora (HH:MM, vacío = todo el día)",
        &form.time,
        form.field == FormField::Time,
    ));
    fields.extend(field_lines(
        "Lugar",
        &form.location,
        form.field == FormField::Location,
    ));
    fields.extend(field_lines(
        "Descripción",
        &form.description,
        form.field == FormField::Description,
    ));
    fields.push(Line::from(""));
    fields.push(Line::from(Span::styled(
        "Ctrl+Enter guardar • Esc cancelar • Tab/Shift-Tab cambiar campo • Enter en Descripción añade una línea",
        Style::default().fg(Color::Gray),
    )));
    let dialog = Paragraph::new(fields)
        .block(
            Block::default()
                .title(Span::styled(
                    "Nuevo evento",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn help_line() -> Line<'static> {
    Line::from(vec![
        Span::styled("←↑↓→ / h j k l", Style::default().fg(Color::LightCyan)),
        Span::raw(" día  "),
        Span::styled("[ ] / PgUp PgDn", Style::default().fg(Color::LightCyan)),
        Span::raw(" mes  "),
        Span::styled("t", Style::default().fg(Color::LightYellow)),
        Span::raw(" hoy  "),
        Span::styled("n", Style::default().fg(Color::LightMagenta)),
        Span::raw(" nuevo evento  "),
        Span::styled("q", Style::default().fg(Color::LightRed)),
        Span::raw(" salir"),
    ])
}

/// Moves the selection by `days`, clamped to the displayed month. A missing or
/// stale selection starts from the 1st.
fn step_within_month(month: CalendarMonth, selected: Option<NaiveDate>, days: i64) -> NaiveDate {
    let first = month.first_day();
    let origin = selected.filter(|d| month.contains(*d)).unwrap_or(first);
    let last_offset = month.days() as i64 - 1;
    let offset = (origin.signed_duration_since(first).num_days() + days).clamp(0, last_offset);
    first
        .checked_add_signed(ChronoDuration::days(offset))
        .unwrap_or(origin)
}

fn months_between(month: CalendarMonth, date: NaiveDate) -> i32 {
    (date.year() - month.year()) * 12 + date.month() as i32 - month.month() as i32
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

fn field_lines(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let prefix = format!("{}: ", label);
    let spacer = " ".repeat(prefix.chars().count());
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| {
            let lead = if idx == 0 { prefix.clone() } else { spacer.clone() };
            Line::from(vec![
                Span::styled(lead, label_style),
                Span::styled(line.to_string(), value_style),
            ])
        })
        .collect()
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("hace {}s", secs)
    } else if secs < 3600 {
        format!("hace {}m", secs / 60)
    } else {
        format!("hace {}h", secs / 3600)
    }
}

fn prev_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn line_state(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    starts.extend(
        text.char_indices()
            .filter(|(_, ch)| *ch == '\n')
            .map(|(idx, _)| idx + 1),
    );
    let line_idx = starts.iter().rposition(|start| *start <= cursor).unwrap_or(0);
    let col = text[starts[line_idx]..cursor].chars().count();
    (starts, line_idx, col)
}

fn index_at_col(text: &str, start: usize, target_col: usize) -> usize {
    let slice = &text[start..];
    let limit = slice.find('\n').unwrap_or(slice.len());
    slice[..limit]
        .char_indices()
        .nth(target_col)
        .map(|(idx, _)| start + idx)
        .unwrap_or(start + limit)
}
