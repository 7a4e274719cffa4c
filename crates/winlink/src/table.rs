use winlink_core::WindowRecord;

const HEADERS: [&str; 7] = ["Id", "X", "Y", "Width", "Height", "Type", "Metadata"];
const MAX_METADATA_WIDTH: usize = 40;

pub struct TableFormatter {
    widths: [usize; 7],
}

impl TableFormatter {
    pub fn new(windows: &[WindowRecord]) -> Self {
        let mut widths = HEADERS.map(str::len);
        for cells in windows.iter().map(row_cells) {
            for (width, cell) in widths.iter_mut().zip(cells.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }
        widths[6] = widths[6].min(MAX_METADATA_WIDTH);
        Self { widths }
    }

    pub fn print_table(&self, windows: &[WindowRecord]) {
        println!("{}", self.border('┌', '┬', '┐'));
        println!("{}", self.row(&HEADERS.map(String::from)));
        println!("{}", self.border('├', '┼', '┤'));
        for window in windows {
            println!("{}", self.row(&row_cells(window)));
        }
        println!("{}", self.border('└', '┴', '┘'));
    }

    fn row(&self, cells: &[String; 7]) -> String {
        let inner: Vec<String> = cells
            .iter()
            .zip(self.widths)
            .map(|(cell, width)| truncate(cell, width))
            .collect();
        format!("│ {} │", inner.join(" │ "))
    }

    fn border(&self, left: char, join: char, right: char) -> String {
        let segments: Vec<String> = self.widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{}{}{}", left, segments.join(&join.to_string()), right)
    }
}

fn row_cells(window: &WindowRecord) -> [String; 7] {
    let kind = window
        .metadata
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or("-")
        .to_string();
    let metadata = if window.metadata.is_empty() {
        "-".to_string()
    } else {
        serde_json::Value::Object(window.metadata.clone()).to_string()
    };

    [
        window.id.to_string(),
        window.shape.x.to_string(),
        window.shape.y.to_string(),
        window.shape.w.to_string(),
        window.shape.h.to_string(),
        kind,
        metadata,
    ]
}

/// Truncate a string to a maximum display width, adding "..." if truncated.
///
/// Counts characters, not bytes, so multi-byte text is cut safely.
pub fn truncate(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        format!("{:<width$}", s, width = max_len)
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{:<width$}", format!("{}...", truncated), width = max_len)
    }
}
