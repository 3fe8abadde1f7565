//! Markdown pipe tables.

/// Column alignment marker in the separator row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// A pipe table whose first column is the row label (group key or row index).
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownTable {
    headers: Vec<String>,
    align: Vec<Align>,
    rows: Vec<Vec<String>>,
}

impl MarkdownTable {
    /// `index` names the label column; `columns` are the value columns,
    /// right-aligned.
    pub fn new(index: &str, columns: &[&str]) -> Self {
        let mut headers = vec![index.to_string()];
        headers.extend(columns.iter().map(|c| c.to_string()));
        let mut align = vec![Align::Left];
        align.extend(std::iter::repeat(Align::Right).take(columns.len()));
        Self {
            headers,
            align,
            rows: Vec::new(),
        }
    }

    /// Override one column's alignment (0 is the label column).
    pub fn align(mut self, column: usize, align: Align) -> Self {
        if let Some(slot) = self.align.get_mut(column) {
            *slot = align;
        }
        self
    }

    /// Append a row. Short rows are padded with empty cells; extra cells dropped.
    pub fn push_row(&mut self, label: impl Into<String>, cells: Vec<String>) {
        let mut row = Vec::with_capacity(self.headers.len());
        row.push(label.into());
        row.extend(cells);
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Render with columns padded to their widest cell.
    pub fn render(&self) -> String {
        let widths: Vec<usize> = (0..self.headers.len())
            .map(|c| {
                self.rows
                    .iter()
                    .map(|r| r[c].chars().count())
                    .chain(std::iter::once(self.headers[c].chars().count()))
                    .max()
                    .unwrap_or(0)
                    .max(3)
            })
            .collect();

        let mut out = String::new();
        out.push_str(&self.render_line(&self.headers, &widths));

        let separator: Vec<String> = widths
            .iter()
            .zip(&self.align)
            .map(|(w, a)| match a {
                Align::Left => format!(":{}", "-".repeat(w - 1)),
                Align::Right => format!("{}:", "-".repeat(w - 1)),
            })
            .collect();
        let separator: Vec<String> = separator.iter().map(|s| format!(" {s} ")).collect();
        out.push_str(&format!("|{}|\n", separator.join("|")));

        for row in &self.rows {
            out.push_str(&self.render_line(row, &widths));
        }
        out
    }

    fn render_line(&self, cells: &[String], widths: &[usize]) -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .zip(&self.align)
            .map(|((cell, &w), a)| match a {
                Align::Left => format!(" {cell:<w$} "),
                Align::Right => format!(" {cell:>w$} "),
            })
            .collect();
        format!("|{}|\n", padded.join("|"))
    }
}

/// Fixed-precision cell; missing values render as `nan`.
pub fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.decimals$}"),
        _ => "nan".to_string(),
    }
}
