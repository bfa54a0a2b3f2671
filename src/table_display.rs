use crate::config::config::DisplayConfig;
use crate::system::catalog::CategoryGroup;
use crate::system::navigation::NavigationFrame;
use crate::system::row::{cell_text, Row};
use crate::system::schema::Schema;
use anyhow::Result;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;
use std::path::Path;

/// Build a printable table for one level. The link column header is marked.
pub fn level_table(rows: &[Row], schema: &Schema, display: &DisplayConfig) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut headers: Vec<Cell> = Vec::new();
    if display.show_row_numbers {
        headers.push(Cell::new("#").add_attribute(Attribute::Dim));
    }
    headers.extend(schema.columns.iter().map(|key| {
        let title = if schema.is_navigable(key) {
            format!("{} {}", key, display.link_marker())
        } else {
            key.clone()
        };
        Cell::new(title).add_attribute(Attribute::Bold)
    }));
    table.set_header(headers);

    for (index, row) in rows.iter().enumerate() {
        let mut cells: Vec<String> = Vec::new();
        if display.show_row_numbers {
            cells.push((index + 1).to_string());
        }
        cells.extend(
            schema
                .columns
                .iter()
                .map(|key| display_cell(row, key, display)),
        );
        table.add_row(cells);
    }

    table
}

pub fn display_cell(row: &Row, key: &str, display: &DisplayConfig) -> String {
    let text = cell_text(row, key);
    if text.is_empty() {
        display.null_text.clone()
    } else {
        text
    }
}

/// Command that opens the level below `frame` for the first drillable row.
pub fn drill_hint(frame: &NavigationFrame, rows: &[Row], schema: &Schema) -> Option<String> {
    let column = schema.navigable_column.as_deref()?;
    let value = rows
        .iter()
        .map(|row| cell_text(row, column))
        .find(|value| !value.is_empty())?;
    let next = frame.child(&value);

    Some(format!(
        "cluster-console show {} {}",
        next.function_name,
        next.nested_path.unwrap_or_default()
    ))
}

pub fn display_level(
    frame: &NavigationFrame,
    rows: &[Row],
    schema: &Schema,
    display: &DisplayConfig,
) {
    if rows.is_empty() {
        println!("{}", "No results found.".yellow());
        return;
    }

    println!("{}", level_table(rows, schema, display));
    println!("\n{}", format!("{} rows returned", rows.len()).green());
    if let (Some(column), Some(hint)) = (&schema.navigable_column, drill_hint(frame, rows, schema)) {
        println!(
            "{}",
            format!("Drill down with: {} (any {} value works)", hint, column).dark_grey()
        );
    }
}

/// Print the catalog grouped by category.
pub fn display_catalog(groups: &[CategoryGroup], display: &DisplayConfig) {
    for group in groups {
        println!("{}", group.name.clone().bold());
        for function in &group.functions {
            let marker = if function.is_favorited {
                display.favorite_marker()
            } else {
                " "
            };
            let kind = if function.is_system_defined { "" } else { " (custom)" };
            println!(
                "  {} {:<24} {}{}",
                marker, function.name, function.description, kind
            );
        }
        if group.is_truncated() {
            println!(
                "{}",
                format!("  ... {} more", group.total - group.functions.len()).dark_grey()
            );
        }
        println!();
    }
}

/// Write rows to CSV in column order. Null and missing cells are written empty.
pub fn export_to_csv(rows: &[Row], columns: &[String], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(columns)?;

    for row in rows {
        let record: Vec<String> = columns.iter().map(|key| cell_text(row, key)).collect();
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
