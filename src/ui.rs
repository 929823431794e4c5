//! TUI rendering module.
//!
//! This module handles all visual rendering using ratatui:
//! - Tabs for the generated and mutated tables
//! - Request inputs, with the mutation note
//! - The focused result table with sort indicators
//! - The structure surface next to it
//! - Status bar, command line and help overlay
//!
//! Rendering only reads [`AppState`]; it never changes it.

pub mod glyphs;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use crate::fasta::parse_reference;
use crate::forms::{GenerateForm, MutateForm, MutationKind, POINT_MUTATION_NOTE};
use crate::model::{AppMode, AppState, Field, NoticeLevel, Panel};
use crate::sort::Direction as SortDirection;
use crate::structure::SurfaceContent;
use crate::table::ResultTable;
use glyphs::Glyphs;

/// Height of the status bar.
const STATUS_BAR_HEIGHT: u16 = 1;
/// Width of the structure panel, in percent.
const SURFACE_PERCENT: u16 = 40;
/// Minimum width for the table panel.
const MIN_TABLE_WIDTH: u16 = 30;

const HELP_LINES: &[&str] = &[
    "Navigation",
    "  j/k, arrows      move selection",
    "  g/G, Home/End    first/last row",
    "  Tab              switch Generated/Mutated",
    "  1-7              sort by column (again to reverse)",
    "  Enter            show structure of selected row",
    "  S                save structure image (rna_structure.svg)",
    "  y                copy table to clipboard",
    "",
    "Commands",
    "  :load <file>     read reference FASTA",
    "  :seq <text>      set reference sequence",
    "  :gc/:len/:tm <min> <max>   constraints (- for open)",
    "  :count <n>       aptamers to generate",
    "  :generate        generate aptamers",
    "  :aptamer <seq>   aptamer to mutate",
    "  :mutations <n>   number of mutations",
    "  :mutate [point|random]",
    "  :sort <field>    sort focused table",
    "  :export [txt|csv|xls|xlsx] [path]",
    "  :copy  :reset  :q",
    "",
    "Press any key to close",
];

/// Renders the complete UI.
pub fn render(frame: &mut Frame, state: &AppState, glyphs: &Glyphs) {
    let area = frame.area();
    let inputs = input_lines(&state.generate_form, &state.mutate_form, area.width.saturating_sub(2));

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(inputs.len() as u16 + 2),
            Constraint::Min(3),
            Constraint::Length(STATUS_BAR_HEIGHT),
        ])
        .split(area);

    render_tabs(frame, state, main_layout[0], glyphs);
    render_inputs(frame, inputs, main_layout[1]);

    let content_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(MIN_TABLE_WIDTH),
            Constraint::Percentage(SURFACE_PERCENT),
        ])
        .split(main_layout[2]);

    render_table(frame, state.active_table(), content_layout[0], glyphs);
    render_surface(frame, state, content_layout[1]);
    render_status_bar(frame, state, main_layout[3], glyphs);

    if state.show_help {
        render_help(frame, area);
    }
}

fn render_tabs(frame: &mut Frame, state: &AppState, area: Rect, glyphs: &Glyphs) {
    let mut spans = Vec::new();
    for panel in [Panel::Generated, Panel::Mutated] {
        let table = state.table(panel);
        let busy = match panel {
            Panel::Generated => state.pending.generate,
            Panel::Mutated => state.pending.mutate,
        };
        let label = if busy {
            format!(" {} ({}) {} ", table.title, table.len(), glyphs.busy)
        } else {
            format!(" {} ({}) ", table.title, table.len())
        };
        let style = if panel == state.panel {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(glyphs.separator));
    }
    spans.push(Span::styled(" Tab to switch, ? for help", Style::default().fg(Color::DarkGray)));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Summary of the reference input.
fn reference_summary(reference: &str) -> String {
    if reference.trim().is_empty() {
        return "(none, use :seq or :load)".to_string();
    }
    match parse_reference(reference) {
        Ok(records) => {
            let residues: usize = records.iter().map(|r| r.len()).sum();
            let first = &records[0].id;
            if records.len() == 1 {
                format!("{} ({} residues)", first, residues)
            } else {
                format!("{} +{} more ({} residues)", first, records.len() - 1, residues)
            }
        }
        Err(e) => format!("invalid: {}", e),
    }
}

/// Lines of the inputs panel, wrapped to `width`.
pub fn input_lines(generate: &GenerateForm, mutate: &MutateForm, width: u16) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Reference: {}   Count: {}",
            reference_summary(&generate.reference),
            generate.count
        ),
        format!(
            "GC %: {}   Length: {}   Tm: {}",
            generate.gc, generate.length, generate.tm
        ),
        format!(
            "Aptamer: {}   Mutations: {} ({})",
            if mutate.aptamer.trim().is_empty() {
                "(none, use :aptamer)"
            } else {
                mutate.aptamer.trim()
            },
            mutate.count,
            mutate.kind
        ),
    ];
    if mutate.kind == MutationKind::Point {
        let width = (width as usize).max(20);
        lines.extend(
            textwrap::wrap(POINT_MUTATION_NOTE, width)
                .into_iter()
                .map(|l| l.into_owned()),
        );
    }
    lines
}

fn render_inputs(frame: &mut Frame, lines: Vec<String>, area: Rect) {
    let note_start = 3;
    let lines: Vec<Line> = lines
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            if i >= note_start {
                Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))
            } else {
                Line::from(text)
            }
        })
        .collect();
    let block = Block::default().borders(Borders::ALL).title("Inputs");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Header label of one column, with its key and sort arrow.
pub fn column_header(table: &ResultTable, column: usize, field: Field, glyphs: &Glyphs) -> String {
    let arrow = match table.sort().field() {
        Some(active) if active == field => match table.sort().direction() {
            SortDirection::Ascending => glyphs.arrow_up,
            SortDirection::Descending => glyphs.arrow_down,
        },
        _ => "",
    };
    format!("{} {}{}", column, field.label(), arrow)
}

fn column_width(field: Field) -> Constraint {
    match field {
        Field::Sequence | Field::Structure => Constraint::Fill(1),
        Field::Length | Field::Tm => Constraint::Length(8),
        Field::GcContent => Constraint::Length(7),
        Field::Mfe => Constraint::Length(18),
        Field::Kd => Constraint::Length(11),
    }
}

fn render_table(frame: &mut Frame, table: &ResultTable, area: Rect, glyphs: &Glyphs) {
    let header = Row::new(
        Field::ALL
            .iter()
            .enumerate()
            .map(|(i, &field)| Cell::from(column_header(table, i + 1, field, glyphs))),
    )
    .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan));

    let rows = table.rows().map(|record| {
        Row::new(
            Field::ALL
                .iter()
                .map(|&field| Cell::from(record.display_text(field))),
        )
    });

    let title = match table.sort().field() {
        Some(field) => format!(
            "{} [{} rows | sorted by {} {}]",
            table.title,
            table.len(),
            field,
            table.sort().direction()
        ),
        None => format!("{} [{} rows]", table.title, table.len()),
    };

    let widget = Table::new(rows, Field::ALL.map(column_width))
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
        .highlight_symbol(glyphs.row_marker);

    let mut table_state = TableState::default();
    if !table.is_empty() {
        table_state.select(Some(table.selected()));
    }
    frame.render_stateful_widget(widget, area, &mut table_state);
}

fn render_surface(frame: &mut Frame, state: &AppState, area: Rect) {
    match state.surface.content() {
        SurfaceContent::Empty => {
            let hint = if state.active_table().is_empty() {
                "No results yet."
            } else {
                "Press Enter to show the structure of the selected aptamer."
            };
            let paragraph = Paragraph::new(Span::styled(hint, Style::default().fg(Color::DarkGray)))
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title("Structure"));
            frame.render_widget(paragraph, area);
        }
        SurfaceContent::Diagram { title, lines } => {
            let lines: Vec<Line> = lines.iter().map(|l| Line::from(l.as_str())).collect();
            let paragraph = Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title(title.as_str()));
            frame.render_widget(paragraph, area);
        }
        SurfaceContent::Alert(message) => {
            let paragraph = Paragraph::new(Span::styled(
                message.as_str(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title("Alert"),
            );
            frame.render_widget(paragraph, area);
        }
    }
}

fn notice_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Info => Color::Black,
        NoticeLevel::Success => Color::Green,
        NoticeLevel::Warning => Color::Yellow,
        NoticeLevel::Error => Color::Red,
    }
}

/// Renders the status bar at the bottom.
fn render_status_bar(frame: &mut Frame, state: &AppState, area: Rect, glyphs: &Glyphs) {
    let mode_str = match &state.mode {
        AppMode::Normal => "NORMAL",
        AppMode::Command(_) => "COMMAND",
        AppMode::ConfirmReset => "CONFIRM",
    };

    let mut busy = Vec::new();
    if state.pending.generate {
        busy.push("generating");
    }
    if state.pending.mutate {
        busy.push("mutating");
    }
    if state.pending.plot {
        busy.push("plotting");
    }
    let table = state.active_table();
    let mut right = if table.is_empty() {
        "Row 0/0 ".to_string()
    } else {
        format!("Row {}/{} ", table.selected() + 1, table.len())
    };
    if !busy.is_empty() {
        right = format!("{} {} | {}", glyphs.busy, busy.join(", "), right);
    }

    let (message, message_style) = match (&state.mode, &state.notice) {
        (AppMode::Command(cmd), _) => (format!(":{}", cmd), Style::default().fg(Color::Black)),
        (_, Some(notice)) => (
            notice.text.clone(),
            Style::default()
                .fg(notice_color(notice.level))
                .add_modifier(Modifier::BOLD),
        ),
        (_, None) => (String::new(), Style::default()),
    };

    let left = format!(" {} | ", mode_str);
    let used = left.chars().count() + message.chars().count() + right.chars().count();
    let status_line = Line::from(vec![
        Span::styled(left, Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::styled(message, message_style.bg(Color::Cyan)),
        Span::styled(
            " ".repeat((area.width as usize).saturating_sub(used)),
            Style::default().bg(Color::Cyan),
        ),
        Span::styled(
            right,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
    ]);

    frame.render_widget(Paragraph::new(status_line), area);
}

/// A rectangle of at most `width` x `height`, centred in `area`.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_help(frame: &mut Frame, area: Rect) {
    let width = HELP_LINES.iter().map(|l| l.len()).max().unwrap_or(0) as u16 + 4;
    let popup = centered_rect(width, HELP_LINES.len() as u16 + 2, area);
    let lines: Vec<Line> = HELP_LINES.iter().map(|&l| Line::from(l)).collect();
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help")),
        popup,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen(state: &AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal
            .draw(|frame| render(frame, state, &glyphs::select(false)))
            .unwrap();
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_column_header_arrows() {
        let glyphs = glyphs::select(false);
        let mut table = ResultTable::new("Generated", "generated");
        assert_eq!(column_header(&table, 7, Field::Kd, &glyphs), "7 Kd (nM)");
        table.select_sort(Field::Kd);
        assert_eq!(column_header(&table, 7, Field::Kd, &glyphs), "7 Kd (nM)^");
        table.select_sort(Field::Kd);
        assert_eq!(column_header(&table, 7, Field::Kd, &glyphs), "7 Kd (nM)v");
        assert_eq!(column_header(&table, 6, Field::Tm, &glyphs), "6 Tm");
    }

    #[test]
    fn test_input_lines_show_note_for_point_mutation() {
        let mut mutate = MutateForm::default();
        let lines = input_lines(&GenerateForm::default(), &mutate, 40);
        assert!(lines.len() > 3);
        assert!(lines[0].contains("(none, use :seq or :load)"));
        assert!(lines[3..].iter().all(|l| l.chars().count() <= 40));

        mutate.kind = MutationKind::Random;
        assert_eq!(input_lines(&GenerateForm::default(), &mutate, 40).len(), 3);
    }

    #[test]
    fn test_reference_summary() {
        assert_eq!(reference_summary(">a\nMKT\n>b\nAA"), "a +1 more (5 residues)");
        assert_eq!(reference_summary("ACGU"), "input (4 residues)");
    }

    #[test]
    fn test_render_table_and_alert() {
        let mut state = AppState::default();
        state.table_mut(Panel::Generated).replace(vec![Record::new("AUGA")
            .with(Field::Structure, "(())")
            .with(Field::Kd, "<2")]);
        let text = screen(&state);
        assert!(text.contains("Generated (1)"));
        assert!(text.contains("AUGA"));
        assert!(text.contains("<2"));

        state.show_structure();
        let text = screen(&state);
        assert!(text.contains("Alert"));
    }

    #[test]
    fn test_render_help_overlay() {
        let mut state = AppState::default();
        state.show_help();
        assert!(screen(&state).contains("Press any key to close"));
    }
}
