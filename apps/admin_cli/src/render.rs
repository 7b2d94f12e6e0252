//! Plain-text rendering of company grids and detail views.

use chrono::{DateTime, Local};
use serde_json::Value;
use shared::{
    company::{field_spec, grid_columns, section_fields, FieldKind, FieldSpec, Section, BASIC_COLUMNS},
    domain::{Record, RecordId},
};

const MAX_CELL_WIDTH: usize = 32;

pub fn cell_text(spec: Option<&FieldSpec>, value: Option<&Value>) -> String {
    let kind = spec.map_or(FieldKind::Text, |spec| spec.kind);
    match (kind, value) {
        (_, None | Some(Value::Null)) => String::new(),
        (FieldKind::Checkbox, Some(value)) => {
            if is_truthy(value) {
                "Yes".to_string()
            } else {
                "No".to_string()
            }
        }
        (FieldKind::Timestamp, Some(Value::String(raw))) => local_time(raw),
        (_, Some(Value::String(text))) => text.clone(),
        (_, Some(other)) => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// RFC 3339 timestamps in local time; anything else is shown as given.
fn local_time(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn clip(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(MAX_CELL_WIDTH - 1).collect();
    clipped.push('~');
    clipped
}

pub fn columns(all: bool) -> Vec<&'static FieldSpec> {
    if all {
        grid_columns().collect()
    } else {
        BASIC_COLUMNS.iter().filter_map(|name| field_spec(name)).collect()
    }
}

/// Renders `rows` as an aligned grid; the first column marks selected rows.
pub fn render_grid(
    rows: &[Record],
    columns: &[&FieldSpec],
    id_field: &str,
    selected: &[RecordId],
) -> String {
    let headers: Vec<String> = std::iter::once(" ".to_string())
        .chain(
            columns
                .iter()
                .map(|spec| spec.column.unwrap_or(spec.label).to_string()),
        )
        .collect();

    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let marker = match RecordId::of(row, id_field) {
                Some(id) if selected.contains(&id) => "*",
                _ => " ",
            };
            std::iter::once(marker.to_string())
                .chain(
                    columns
                        .iter()
                        .map(|spec| clip(&cell_text(Some(*spec), row.get(spec.name)))),
                )
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for line in &body {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths);
    for line in &body {
        push_line(&mut out, line, &widths);
    }
    if body.is_empty() {
        out.push_str("(no companies)\n");
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Renders one record grouped by form section, then any fields the metadata
/// does not know about.
pub fn render_detail(record: &Record) -> String {
    let mut out = String::new();
    let label_width = shared::company::COMPANY_FIELDS
        .iter()
        .map(|spec| spec.label.len())
        .max()
        .unwrap_or(0);

    for section in Section::ALL {
        out.push_str(&format!("[{}]\n", section.title()));
        for spec in section_fields(section) {
            let value = cell_text(Some(spec), record.get(spec.name));
            out.push_str(&format!("  {:<label_width$}  {value}\n", spec.label));
        }
    }

    let unsectioned: Vec<(&String, &Value)> = record
        .iter()
        .filter(|(name, _)| field_spec(name).map_or(true, |spec| spec.section.is_none()))
        .collect();
    if !unsectioned.is_empty() {
        out.push_str("[Other]\n");
        for (name, value) in unsectioned {
            let spec = field_spec(name);
            let label = spec.map_or(name.as_str(), |spec| spec.label);
            let value = cell_text(spec, Some(value));
            out.push_str(&format!("  {label:<label_width$}  {value}\n"));
        }
    }
    out
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
