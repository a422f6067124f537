// src/services/export.rs
//! CSV and XLSX rendering of a user's task list

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, XlsxError};

use crate::tasks::models::Task;

pub const EXPORT_HEADERS: [&str; 6] = [
    "ID",
    "Title",
    "Description",
    "Deadline",
    "Priority",
    "Completed",
];

const DEADLINE_FORMAT: &str = "%Y-%m-%d %H:%M";
const XLSX_COLUMN_WIDTHS: [f64; 6] = [8.0, 32.0, 60.0, 18.0, 12.0, 12.0];
const HEADER_BLUE: u32 = 0x4472C4;

/// One export row in header order
pub fn export_row(task: &Task) -> [String; 6] {
    [
        task.id.to_string(),
        task.title.clone(),
        task.description.clone().unwrap_or_default(),
        task.deadline
            .map(|d| d.format(DEADLINE_FORMAT).to_string())
            .unwrap_or_default(),
        task.priority.to_string(),
        if task.completed { "Yes" } else { "No" }.to_string(),
    ]
}

fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\r', '\n'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Header line plus one line per task, CRLF terminated
pub fn render_csv(tasks: &[Task]) -> String {
    let header: Vec<String> = EXPORT_HEADERS.iter().map(|h| h.to_string()).collect();

    let mut out = csv_line(&header);
    out.push_str("\r\n");
    for task in tasks {
        out.push_str(&csv_line(&export_row(task)));
        out.push_str("\r\n");
    }
    out
}

pub fn render_xlsx(tasks: &[Task]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Tasks")?;

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_BLUE))
        .set_align(FormatAlign::Center);
    let wrap_format = Format::new().set_text_wrap().set_align(FormatAlign::Top);

    for (col, header) in EXPORT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
        worksheet.set_column_width(col as u16, XLSX_COLUMN_WIDTHS[col])?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (idx, task) in tasks.iter().enumerate() {
        let row = (idx + 1) as u32;
        let cells = export_row(task);

        worksheet.write_number(row, 0, task.id as f64)?;
        for (col, value) in cells.iter().enumerate().skip(1) {
            if col == 1 || col == 2 {
                worksheet.write_string_with_format(row, col as u16, value, &wrap_format)?;
            } else {
                worksheet.write_string(row, col as u16, value)?;
            }
        }
    }

    workbook.save_to_buffer()
}
