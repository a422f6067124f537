// PDF rendering for task exports
use anyhow::Result;
use chrono::NaiveDateTime;
use printpdf::*;
use std::io::BufWriter;

use super::export::{export_row, EXPORT_HEADERS};
use crate::tasks::models::Task;

// A4 landscape
const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 15.0;
const LINE_HEIGHT: f32 = 4.5;
const ROW_GAP: f32 = 2.5;
const FONT_SIZE: f32 = 9.0;

/// Column x offsets from the left margin, and wrap widths in characters
const COLUMN_X: [f32; 6] = [0.0, 15.0, 75.0, 185.0, 220.0, 242.0];
const WRAP_CHARS: [usize; 6] = [6, 32, 60, 18, 10, 10];

const TITLE_BLOCK_HEIGHT: f32 = 17.0;
const HEADER_HEIGHT: f32 = 7.0;

/// One line of cell text placed on a page
#[derive(Debug, Clone, PartialEq)]
struct PlacedText {
    col: usize,
    y: f32,
    text: String,
}

/// Render the tasks as a paginated table
pub fn render_tasks_pdf(tasks: &[Task], generated_at: NaiveDateTime) -> Result<Vec<u8>> {
    let (doc, page1, layer1) = PdfDocument::new(
        "Tasks Export",
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );

    let font_bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
    let font_regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;

    for (index, placed) in layout_pages(tasks).into_iter().enumerate() {
        let layer = if index == 0 {
            let layer = doc.get_page(page1).get_layer(layer1);
            let top = PAGE_HEIGHT - MARGIN;
            layer.use_text("Tasks Export", 16.0, Mm(MARGIN), Mm(top), &font_bold);
            layer.use_text(
                format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M")),
                FONT_SIZE,
                Mm(MARGIN),
                Mm(top - 7.0),
                &font_regular,
            );
            draw_header(&layer, &font_bold, top - TITLE_BLOCK_HEIGHT);
            layer
        } else {
            let (page, page_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            let layer = doc.get_page(page).get_layer(page_layer);
            draw_header(&layer, &font_bold, PAGE_HEIGHT - MARGIN);
            layer
        };

        for line in placed {
            layer.use_text(
                line.text,
                FONT_SIZE,
                Mm(MARGIN + COLUMN_X[line.col]),
                Mm(line.y),
                &font_regular,
            );
        }
    }

    let mut writer = BufWriter::new(Vec::new());
    doc.save(&mut writer)?;
    Ok(writer.into_inner()?)
}

/// Place every wrapped cell line on a page, one `Vec` per page.
///
/// A row that does not fit the remaining space moves to a new page; a row taller
/// than a whole page is split line by line and continues under a fresh header.
fn layout_pages(tasks: &[Task]) -> Vec<Vec<PlacedText>> {
    let fresh_page_top = PAGE_HEIGHT - MARGIN - HEADER_HEIGHT;
    let mut pages: Vec<Vec<PlacedText>> = vec![Vec::new()];
    let mut current_y = PAGE_HEIGHT - MARGIN - TITLE_BLOCK_HEIGHT - HEADER_HEIGHT;

    if tasks.is_empty() {
        pages[0].push(PlacedText {
            col: 0,
            y: current_y,
            text: "No tasks".to_string(),
        });
        return pages;
    }

    for task in tasks {
        let cells: Vec<Vec<String>> = export_row(task)
            .iter()
            .zip(WRAP_CHARS)
            .map(|(value, width)| wrap_text(value, width))
            .collect();
        let row_lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let row_height = row_lines as f32 * LINE_HEIGHT;

        let fits_here = current_y - row_height >= MARGIN;
        let fits_fresh_page = fresh_page_top - row_height >= MARGIN;
        let page_has_rows = pages.last().map_or(false, |p| !p.is_empty());
        if !fits_here && fits_fresh_page && page_has_rows {
            pages.push(Vec::new());
            current_y = fresh_page_top;
        }

        for line_index in 0..row_lines {
            if current_y - LINE_HEIGHT < MARGIN {
                pages.push(Vec::new());
                current_y = fresh_page_top;
            }
            if let Some(page) = pages.last_mut() {
                for (col, lines) in cells.iter().enumerate() {
                    if let Some(text) = lines.get(line_index).filter(|t| !t.is_empty()) {
                        page.push(PlacedText {
                            col,
                            y: current_y,
                            text: text.clone(),
                        });
                    }
                }
            }
            current_y -= LINE_HEIGHT;
        }

        current_y -= ROW_GAP;
    }

    pages
}

/// Draws the bold header row and its rule
fn draw_header(layer: &PdfLayerReference, font: &IndirectFontRef, y: f32) {
    for (col, header) in EXPORT_HEADERS.iter().enumerate() {
        layer.use_text(*header, FONT_SIZE + 1.0, Mm(MARGIN + COLUMN_X[col]), Mm(y), font);
    }

    let rule_y = y - 2.0;
    layer.set_outline_thickness(0.5);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(MARGIN), Mm(rule_y)), false),
            (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(rule_y)), false),
        ],
        is_closed: false,
    });
}

/// Wrap text to fit within specified character width; words longer than the width are split
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current_line.is_empty() {
                lines.push(std::mem::take(&mut current_line));
            }
            lines.push(word.drain(..max_chars).collect());
        }
        let word: String = word.into_iter().collect();

        let current_len = current_line.chars().count();
        if current_len > 0 && current_len + word.chars().count() + 1 > max_chars {
            lines.push(std::mem::take(&mut current_line));
        }

        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(&word);
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}
