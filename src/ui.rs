use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ledger_insights::{AnalyticsError, ReportKind, ReportTable};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;

const PAGE_SIZE: usize = 20;

/// One tab of the browser: a finished report or the error that stopped it
pub struct ReportPage {
    pub kind: ReportKind,
    pub outcome: Result<ReportTable, AnalyticsError>,
}

impl ReportPage {
    fn row_count(&self) -> usize {
        self.outcome.as_ref().map(|t| t.len()).unwrap_or(0)
    }
}

pub struct App {
    pub pages: Vec<ReportPage>,
    pub current: usize,
    pub state: TableState,
    pub show_detail: bool,
    pub transaction_count: usize,
}

impl App {
    pub fn new(pages: Vec<ReportPage>, transaction_count: usize) -> Self {
        let mut app = Self {
            pages,
            current: 0,
            state: TableState::default(),
            show_detail: false,
            transaction_count,
        };
        app.reset_selection();
        app
    }

    pub fn page(&self) -> Option<&ReportPage> {
        self.pages.get(self.current)
    }

    fn rows_len(&self) -> usize {
        self.page().map(ReportPage::row_count).unwrap_or(0)
    }

    fn reset_selection(&mut self) {
        let selection = if self.rows_len() > 0 { Some(0) } else { None };
        self.state.select(selection);
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn next_page(&mut self) {
        if !self.pages.is_empty() {
            self.current = (self.current + 1) % self.pages.len();
            self.reset_selection();
        }
    }

    pub fn previous_page(&mut self) {
        if !self.pages.is_empty() {
            self.current = (self.current + self.pages.len() - 1) % self.pages.len();
            self.reset_selection();
        }
    }

    /// Selected row as (column, cell) pairs
    pub fn selected_row(&self) -> Option<Vec<(&str, &str)>> {
        let table = self.page()?.outcome.as_ref().ok()?;
        let row = table.rows.get(self.state.selected()?)?;
        Some(
            table
                .columns
                .iter()
                .zip(row)
                .map(|(c, v)| (c.as_str(), v.as_str()))
                .collect(),
        )
    }

    pub fn next(&mut self) {
        let len = self.rows_len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.rows_len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.rows_len();
        if len == 0 {
            return;
        }
        let i = self
            .state
            .selected()
            .map_or(0, |i| (i + PAGE_SIZE).min(len - 1));
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.rows_len() == 0 {
            return;
        }
        let i = self
            .state
            .selected()
            .map_or(0, |i| i.saturating_sub(PAGE_SIZE));
        self.state.select(Some(i));
    }

    pub fn first(&mut self) {
        self.reset_selection();
    }

    pub fn last(&mut self) {
        let len = self.rows_len();
        if len > 0 {
            self.state.select(Some(len - 1));
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("UI loop failed: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::Right | KeyCode::Char('l') => app.next_page(),
                KeyCode::Left | KeyCode::Char('h') => app.previous_page(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.first(),
                KeyCode::End => app.last(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with report tabs
            Constraint::Min(0),    // Report
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(chunks[1]);

        render_report(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_report(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in app.pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if i == app.current {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else if page.outcome.is_err() {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(format!("{}", i + 1), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Transactions: {}", app.transaction_count),
        Style::default().fg(Color::White),
    ));

    let title = app
        .page()
        .map(|p| format!(" {} ", p.kind.title()))
        .unwrap_or_default();

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(title),
    );

    f.render_widget(header, area);
}

fn render_report(f: &mut Frame, area: Rect, app: &mut App) {
    let Some(page) = app.pages.get(app.current) else {
        return;
    };

    let table = match &page.outcome {
        Ok(table) => table,
        Err(err) => {
            let message = Paragraph::new(format!("❌ {}", err))
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title(" Report failed "));
            f.render_widget(message, area);
            return;
        }
    };

    let header_cells = table.columns.iter().map(|h| {
        Cell::from(h.clone()).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = table.rows.iter().map(|row| {
        let cells = row.iter().map(|cell| {
            let style = if cell.starts_with('-') {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            Cell::from(truncate(cell, 28)).style(style)
        });
        Row::new(cells).height(1)
    });

    let widths: Vec<Constraint> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let widest = table
                .rows
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            Constraint::Length(widest.max(column.chars().count()).min(28) as u16 + 1)
        })
        .collect();

    let widget = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" {} ", page.kind.slug())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(widget, area, &mut app.state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let lines: Vec<Line> = match app.selected_row() {
        Some(pairs) => pairs
            .into_iter()
            .map(|(column, value)| {
                Line::from(vec![
                    Span::styled(format!("{}: ", column), Style::default().fg(Color::Cyan)),
                    Span::raw(value.to_string()),
                ])
            })
            .collect(),
        None => vec![Line::from("No row selected")],
    };

    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Row "));

    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.rows_len();

    let status_spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected, total),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Details | "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Report | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Nav | "),
        Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)),
        Span::raw(" Fast | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_page(kind: ReportKind, rows: usize) -> ReportPage {
        ReportPage {
            kind,
            outcome: Ok(ReportTable {
                kind,
                title: kind.title().to_string(),
                columns: vec!["id".to_string(), "value".to_string()],
                rows: (0..rows)
                    .map(|i| vec![i.to_string(), format!("{}.00", i * 10)])
                    .collect(),
            }),
        }
    }

    #[test]
    fn test_row_navigation_wraps() {
        let mut app = App::new(vec![create_test_page(ReportKind::AccountActivity, 3)], 3);

        assert_eq!(app.state.selected(), Some(0));
        app.previous();
        assert_eq!(app.state.selected(), Some(2));
        app.next();
        assert_eq!(app.state.selected(), Some(0));

        app.page_down();
        assert_eq!(app.state.selected(), Some(2));
        app.page_up();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_tab_switches_report_and_resets_selection() {
        let failed = ReportPage {
            kind: ReportKind::BalanceRank,
            outcome: Err(AnalyticsError::missing("account #1", "balance")),
        };
        let mut app = App::new(
            vec![create_test_page(ReportKind::AccountActivity, 5), failed],
            5,
        );

        app.last();
        assert_eq!(app.state.selected(), Some(4));

        app.next_page();
        assert_eq!(app.current, 1);
        assert_eq!(app.state.selected(), None);
        assert!(app.selected_row().is_none());

        app.next_page();
        assert_eq!(app.current, 0);
        app.previous_page();
        assert_eq!(app.current, 1);
    }

    #[test]
    fn test_selected_row_pairs_columns() {
        let mut app = App::new(vec![create_test_page(ReportKind::CustomerPortfolio, 2)], 2);
        app.next();

        assert_eq!(app.selected_row(), Some(vec![("id", "1"), ("value", "10.00")]));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ñandú ñandú ñandú", 8), "ñandú...");
    }
}
