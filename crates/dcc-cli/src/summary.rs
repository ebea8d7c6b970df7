use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use dcc_cli::pipeline::{OrderEntry, ProjectResult};
use dcc_model::{ErrorRecord, KeyErrorKind, SURJECTION_LINE_NUMBER, SubmissionState};

use crate::types::ValidateResult;

pub fn print_validate_summary(result: &ValidateResult, max_errors: usize) {
    let report = &result.report;
    println!("Report: {}", result.report_path.display());
    println!("Fingerprint: {}", result.fingerprint);

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File type"),
        header_cell("Files"),
        header_cell("Rows"),
        header_cell("Keys"),
        header_cell("Duplicates"),
        header_cell("Errors"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=5 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let mut total_rows = 0u64;
    let mut total_errors = 0usize;
    for summary in &report.file_types {
        total_rows += summary.rows;
        total_errors += summary.errors;
        let name = if summary.files == 0 {
            dim_cell(&summary.name)
        } else {
            Cell::new(&summary.name)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold)
        };
        table.add_row(vec![
            name,
            Cell::new(summary.files),
            Cell::new(summary.rows),
            Cell::new(summary.distinct_keys),
            count_cell(summary.duplicates as usize, Color::Yellow),
            count_cell(summary.errors, Color::Red),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(total_rows).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        count_cell(total_errors, Color::Red).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");

    if !report.errors.is_empty() {
        print_error_table(&report.errors, max_errors);
    }
    println!("{}", verdict_line(report.valid));
}

fn print_error_table(errors: &[ErrorRecord], max_errors: usize) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("Line"),
        header_cell("Kind"),
        header_cell("Message"),
    ]);
    apply_error_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for error in errors.iter().take(max_errors) {
        let line = if error.line_number == SURJECTION_LINE_NUMBER {
            dim_cell("-")
        } else {
            Cell::new(error.line_number)
        };
        table.add_row(vec![
            Cell::new(&error.file_name),
            line,
            kind_cell(error.kind),
            Cell::new(error.message()),
        ]);
    }
    println!();
    println!("Errors:");
    println!("{table}");
    if errors.len() > max_errors {
        println!("... {} more in the report", errors.len() - max_errors);
    }
}

pub fn print_order(entries: &[OrderEntry]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("File type"),
        header_cell("Primary key"),
        header_cell("Parents"),
        header_cell("Surjective children"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.position),
            Cell::new(&entry.name)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            list_cell(&entry.primary_key),
            list_cell(&entry.parents),
            list_cell(&entry.surjective_children),
        ]);
    }
    println!("{table}");
}

pub fn print_release_summary(results: &[ProjectResult]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Project"),
        header_cell("State"),
        header_cell("Key errors"),
        header_cell("Report"),
        header_cell("Message"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    align_column(&mut table, 2, CellAlignment::Right);
    for result in results {
        table.add_row(vec![
            Cell::new(&result.project)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            state_cell(result.state),
            count_cell(result.errors, Color::Red),
            result
                .report_path
                .as_ref()
                .map_or_else(|| dim_cell("-"), |path| Cell::new(path.display())),
            result
                .message
                .as_ref()
                .map_or_else(|| dim_cell("-"), Cell::new),
        ]);
    }
    println!("{table}");
}

fn verdict_line(valid: bool) -> String {
    if valid {
        "Submission keys are valid.".to_string()
    } else {
        "Submission keys are INVALID.".to_string()
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(120);
}

fn apply_error_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(200);
    if table.column_count() >= 4 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Percentage(25)),
            ColumnConstraint::LowerBoundary(Width::Fixed(6)),
            ColumnConstraint::UpperBoundary(Width::Fixed(22)),
            ColumnConstraint::UpperBoundary(Width::Percentage(60)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn kind_cell(kind: KeyErrorKind) -> Cell {
    let color = if kind.is_uniqueness() {
        Color::Yellow
    } else {
        Color::Red
    };
    Cell::new(kind.as_str()).fg(color)
}

fn state_cell(state: SubmissionState) -> Cell {
    match state {
        SubmissionState::Valid => Cell::new(state.as_str())
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        SubmissionState::Invalid | SubmissionState::Error => Cell::new(state.as_str())
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        SubmissionState::Cancelled => Cell::new(state.as_str()).fg(Color::Yellow),
        SubmissionState::Queued | SubmissionState::Validating => dim_cell(state.as_str()),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn list_cell(values: &[String]) -> Cell {
    if values.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(values.join(", "))
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
