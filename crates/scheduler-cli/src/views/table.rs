use chrono_humanize::Humanize;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use scheduler_core::models::{Category, OccurrenceSource, ResolvedOccurrence, Series};
use scheduler_core::runtime_state::{CurrentStatus, NextEvent};

pub fn display_resolved_occurrences(occurrences: &[ResolvedOccurrence]) {
    if occurrences.is_empty() {
        println!("No occurrences in that window.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Series", "Start", "End", "Value", "Category", "Source"]);

    for occ in occurrences {
        let mut row = Row::new();
        row.add_cell(Cell::new(&occ.title));
        row.add_cell(Cell::new(occ.start.to_rfc3339()));
        row.add_cell(Cell::new(occ.end.to_rfc3339()));
        row.add_cell(Cell::new(occ.target_value.as_text()));

        let mut category_cell = Cell::new(occ.category_id.to_string());
        if let Some(color) = parse_hex_color(&occ.bg_color) {
            category_cell = category_cell.bg(color);
        }
        row.add_cell(category_cell);

        let source_cell = match occ.source {
            OccurrenceSource::Weekly => Cell::new("weekly"),
            OccurrenceSource::Holiday => Cell::new("holiday").fg(Color::Cyan),
            OccurrenceSource::Exception => Cell::new("exception").fg(Color::Yellow),
            OccurrenceSource::Override => Cell::new("override").fg(Color::Red).add_attribute(Attribute::Bold),
        };
        row.add_cell(source_cell);

        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_series_list(series: &[Series]) {
    if series.is_empty() {
        println!("No series defined.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "RRULE", "Category", "Priority", "Enabled"]);

    for s in series {
        let mut row = Row::new();
        row.add_cell(Cell::new(s.id.to_string()));
        row.add_cell(Cell::new(&s.task_name));
        row.add_cell(Cell::new(&s.rrule_str));
        row.add_cell(Cell::new(s.category_id.to_string()));
        row.add_cell(Cell::new(s.priority.to_string()));

        let enabled_cell = if s.enabled {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkGrey).add_attribute(Attribute::CrossedOut)
        };
        row.add_cell(enabled_cell);

        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_categories(categories: &[Category]) {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "BG", "FG", "Sort", "System"]);
    for c in categories {
        let mut row = Row::new();
        row.add_cell(Cell::new(c.id.to_string()));

        let mut name_cell = Cell::new(&c.name);
        if let Some(color) = parse_hex_color(&c.bg_color) {
            name_cell = name_cell.bg(color);
        }
        if let Some(color) = parse_hex_color(&c.fg_color) {
            name_cell = name_cell.fg(color);
        }
        row.add_cell(name_cell);

        row.add_cell(Cell::new(&c.bg_color));
        row.add_cell(Cell::new(&c.fg_color));
        row.add_cell(Cell::new(c.sort_order.to_string()));
        row.add_cell(Cell::new(if c.is_system { "yes" } else { "no" }));
        table.add_row(row);
    }
    println!("{table}");
}

pub fn display_status(status: Option<&CurrentStatus>, next: Option<&NextEvent>) {
    match status {
        Some(status) => {
            println!(
                "Current: {} = {} (source: {:?}, busy until {})",
                status.title,
                status.value.as_text(),
                status.source,
                status.busy_until.humanize()
            );
        }
        None => println!("Current: idle"),
    }
    match next {
        Some(next) => println!("Next: {} at {} ({})", next.title, next.start.to_rfc3339(), next.start.humanize()),
        None => println!("Next: none within horizon"),
    }
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb { r, g, b })
}
