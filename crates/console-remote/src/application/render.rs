//! Turns output frames into terminal text.
//!
//! The host sends structured frames and leaves the layout to the viewer.
//! This renderer prints lines as-is, lays tables out in as many columns as
//! fit the terminal width, and prints exceptions as a header, the error text
//! and an indented stack trace.

use console_core::output::OutputFrame;

/// Default terminal width when the real one is unknown.
pub const DEFAULT_WIDTH: usize = 80;

/// Gap between table columns.
const COLUMN_GAP: usize = 2;

/// Where rendered lines go.
#[cfg_attr(test, mockall::automock)]
pub trait Terminal {
    fn print_line(&mut self, text: &str);
}

/// Writes to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutTerminal;

impl Terminal for StdoutTerminal {
    fn print_line(&mut self, text: &str) {
        println!("{text}");
    }
}

pub fn render_frame(frame: &OutputFrame, width: usize, term: &mut dyn Terminal) {
    match frame {
        OutputFrame::Line(text) => {
            for line in text.lines() {
                term.print_line(line);
            }
            if text.is_empty() {
                term.print_line("");
            }
        }
        OutputFrame::Table(cells) => {
            for row in layout_table(cells, width) {
                term.print_line(&row);
            }
        }
        OutputFrame::Exception {
            message,
            exception_message,
            stack_trace,
        } => {
            term.print_line(&format!("!! {message}"));
            term.print_line(&format!("   {exception_message}"));
            for line in stack_trace.lines().filter(|l| !l.trim().is_empty()) {
                term.print_line(&format!("     {}", line.trim_end()));
            }
        }
    }
}

/// Lays `cells` out row by row in equal-width columns.
pub fn layout_table(cells: &[String], width: usize) -> Vec<String> {
    let Some(widest) = cells.iter().map(|c| c.chars().count()).max() else {
        return Vec::new();
    };
    let column_width = widest + COLUMN_GAP;
    let columns = (width / column_width).max(1);

    cells
        .chunks(columns)
        .map(|row| {
            let mut line = String::new();
            for cell in row {
                line.push_str(cell);
                let pad = column_width - cell.chars().count();
                line.extend(std::iter::repeat(' ').take(pad));
            }
            line.trim_end().to_string()
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
