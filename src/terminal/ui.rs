use ratatui::{
    Frame,
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table, Wrap},
};

use crate::terminal::state::{AppState, ViewMode};

pub fn render(f: &mut Frame, state: &mut AppState) {
    let [main, footer] = Layout::vertical([Constraint::Min(0), Constraint::Length(1)])
        .margin(1)
        .areas(f.area());

    let (table_area, detail_area) = if state.mode == ViewMode::Detail {
        let [top, bottom] =
            Layout::vertical([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(main);
        (top, Some(bottom))
    } else {
        (main, None)
    };

    let title = match state.filter_label() {
        Some(stage) => format!(
            " Job emails: {} = {stage} ({}/{}) ",
            state.stage_header,
            state.visible_rows().len(),
            state.total_rows()
        ),
        None => format!(" Job emails ({}) ", state.total_rows()),
    };

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let header = Row::new(["Date", "From", "Subject", state.stage_header.as_str()]).style(bold);
    let rows: Vec<Row> = state
        .visible_rows()
        .into_iter()
        .map(|r| {
            let stage_style = match r.stage.as_str() {
                "Offer" | "Interview Invite" | "yes" => Style::default().fg(Color::Green),
                "Rejection" => Style::default().fg(Color::Red),
                _ => Style::default(),
            };
            Row::new([
                Span::raw(r.date.clone()),
                Span::raw(r.from.clone()),
                Span::raw(r.subject.clone()),
                Span::styled(r.stage.clone(), stage_style),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(19),
            Constraint::Percentage(25),
            Constraint::Fill(1),
            Constraint::Length(24),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    )
    .highlight_symbol("➜ ")
    .row_highlight_style(Style::default().fg(Color::Green));

    f.render_stateful_widget(table, table_area, &mut state.table_state);

    if let Some(area) = detail_area {
        let text = match state.selected_row() {
            Some(r) => vec![
                Line::from(vec![Span::styled("From: ", bold), Span::raw(r.from.clone())]),
                Line::from(vec![Span::styled("Date: ", bold), Span::raw(r.date.clone())]),
                Line::from(vec![Span::styled("Subject: ", bold), Span::raw(r.subject.clone())]),
                Line::from(""),
                Line::from(r.summary.clone()),
            ],
            None => vec![Line::from("Nothing selected.")],
        };
        let detail = Paragraph::new(text)
            .block(Block::default().title(" Summary ").borders(Borders::ALL))
            .wrap(Wrap { trim: false });
        f.render_widget(detail, area);
    }

    let hint = Paragraph::new(Line::from(vec![
        Span::styled("j/k", bold),
        Span::raw(" move  "),
        Span::styled("Enter", bold),
        Span::raw(" summary  "),
        Span::styled("f", bold),
        Span::raw(" filter  "),
        Span::styled("a", bold),
        Span::raw(" all  "),
        Span::styled("q", bold),
        Span::raw(" quit"),
    ]));
    f.render_widget(hint, footer);
}
