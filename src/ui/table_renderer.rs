use crate::config::config::DisplayConfig;
use crate::system::render_spec::ColumnDescriptor;
use crate::system::row::Row;
use crate::table_display::display_cell;
use ratatui::layout::Constraint;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Row as TableRow, Table};

const MIN_COLUMN_WIDTH: u16 = 4;
const MAX_COLUMN_WIDTH: u16 = 40;
const SAMPLE_ROWS: usize = 200;

/// Width per column from the header and a sample of cell values.
pub fn column_widths(
    rows: &[Row],
    columns: &[ColumnDescriptor],
    display: &DisplayConfig,
) -> Vec<u16> {
    columns
        .iter()
        .map(|column| {
            let header = column.title.chars().count() + if column.is_clickable() { 2 } else { 0 };
            let widest = rows
                .iter()
                .take(SAMPLE_ROWS)
                .map(|row| display_cell(row, &column.key, display).chars().count())
                .max()
                .unwrap_or(0);
            (header.max(widest) as u16).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
        })
        .collect()
}

/// Build the ratatui table for a level or a flat result.
pub fn build_table<'a>(
    rows: &'a [Row],
    columns: &'a [ColumnDescriptor],
    display: &'a DisplayConfig,
    selected_column: Option<usize>,
    title: String,
) -> Table<'a> {
    let link_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::UNDERLINED);

    let mut header_cells: Vec<Cell> = Vec::new();
    if display.show_row_numbers {
        header_cells.push(Cell::from("#").style(Style::default().fg(Color::DarkGray)));
    }
    header_cells.extend(columns.iter().enumerate().map(|(index, column)| {
        let mut style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
        if selected_column == Some(index) {
            style = style.add_modifier(Modifier::REVERSED);
        }
        let text = if column.is_clickable() {
            format!("{} {}", column.title, display.link_marker())
        } else {
            column.title.clone()
        };
        Cell::from(text).style(style)
    }));
    let header = TableRow::new(header_cells).height(1).bottom_margin(1);

    let body: Vec<TableRow> = rows
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let mut cells: Vec<Cell> = Vec::new();
            if display.show_row_numbers {
                cells.push(
                    Cell::from((row_index + 1).to_string())
                        .style(Style::default().fg(Color::DarkGray)),
                );
            }
            cells.extend(columns.iter().map(|column| {
                let cell = Cell::from(display_cell(row, &column.key, display));
                if column.is_clickable() {
                    cell.style(link_style)
                } else {
                    cell
                }
            }));
            TableRow::new(cells).height(1)
        })
        .collect();

    let mut widths: Vec<Constraint> = Vec::new();
    if display.show_row_numbers {
        widths.push(Constraint::Length(rows.len().to_string().len().max(1) as u16 + 1));
    }
    widths.extend(
        column_widths(rows, columns, display)
            .into_iter()
            .map(Constraint::Length),
    );

    Table::new(body, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol(">> ")
}
