//! Text tables for chat replies.
//!
//! A [`Table`] renders either as padded columns with a dashed rule under the
//! header, or as CSV. [`code_blocks`] packs rendered lines into fenced blocks
//! that fit one chat message.
//!
//! ```
//! use redstar_bot::table::{Align, Table};
//!
//! let mut table = Table::new(["User", "Score"], &Align::columns("lr"));
//! table.push_row(["ada", "1200"]);
//! table.push_row(["bob", "87"]);
//!
//! assert_eq!(
//!     table.lines(false),
//!     ["User Score", "---- -----", "ada   1200", "bob     87"]
//! );
//! assert_eq!(table.lines(true), ["User,Score", "ada,1200", "bob,87"]);
//! ```

/// Largest chat message, in characters.
pub const MESSAGE_LIMIT: usize = 2000;

/// Fence characters wrapped around a block, counted with the first line's
/// newline.
const FENCE_OVERHEAD: usize = 7;

/// Reply appended when a line had to be cut.
pub const TRUNCATED_NOTICE: &str = "Some lines truncated";

/// Column alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    /// Pad on the right.
    Left,
    /// Pad on the left.
    Right,
}

impl Align {
    /// Alignments from a compact pattern: `l` is left, anything else right.
    #[must_use]
    pub fn columns(pattern: &str) -> Vec<Self> {
        pattern
            .chars()
            .map(|c| if c == 'l' { Self::Left } else { Self::Right })
            .collect()
    }
}

/// Header, alignments and rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    header: Vec<String>,
    align: Vec<Align>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates an empty table. Missing alignments default to left.
    pub fn new<I, S>(header: I, align: &[Align]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            align: align.to_vec(),
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rendered lines, padded or CSV.
    #[must_use]
    pub fn lines(&self, csv: bool) -> Vec<String> {
        if csv {
            std::iter::once(&self.header)
                .chain(&self.rows)
                .map(|row| row.join(","))
                .collect()
        } else {
            self.padded()
        }
    }

    fn padded(&self) -> Vec<String> {
        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0);

        let mut widths = vec![0; columns];
        for row in std::iter::once(&self.header).chain(&self.rows) {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let render = |row: &[String]| {
            widths
                .iter()
                .enumerate()
                .map(|(index, width)| {
                    let cell = row.get(index).map_or("", String::as_str);
                    match self.align.get(index).copied().unwrap_or(Align::Left) {
                        Align::Left => format!("{cell:<width$}"),
                        Align::Right => format!("{cell:>width$}"),
                    }
                })
                .collect::<Vec<_>>()
                .join(" ")
                .trim_end()
                .to_string()
        };

        let rule = widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join(" ");

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(render(self.header.as_slice()));
        lines.push(rule);
        lines.extend(self.rows.iter().map(|row| render(row.as_slice())));
        lines
    }
}

/// Packs lines into fenced code blocks of at most [`MESSAGE_LIMIT`]
/// characters.
///
/// Trailing whitespace is stripped. A line too long for any block gets a block
/// of its own, cut to fit, and [`TRUNCATED_NOTICE`] is appended to the
/// replies.
#[must_use]
pub fn code_blocks(lines: &[String]) -> Vec<String> {
    let fence = |block: &[&str]| format!("```\n{}\n```", block.join("\n"));
    let longest = MESSAGE_LIMIT - FENCE_OVERHEAD - 1;

    let mut replies = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut used = FENCE_OVERHEAD;
    let mut truncated = false;

    for line in lines {
        let line = line.trim_end();
        let len = line.chars().count();

        if len > longest {
            if !block.is_empty() {
                replies.push(fence(&block));
            }
            block.clear();
            used = FENCE_OVERHEAD;

            let cut: String = line.chars().take(MESSAGE_LIMIT - 8).collect();
            replies.push(format!("```\n{cut}\n```"));
            truncated = true;
        } else if used + len + 1 > MESSAGE_LIMIT {
            if !block.is_empty() {
                replies.push(fence(&block));
            }
            block = vec![line];
            used = FENCE_OVERHEAD + len + 1;
        } else {
            block.push(line);
            used += len + 1;
        }
    }

    if !block.is_empty() {
        replies.push(fence(&block));
    }
    if truncated {
        replies.push(TRUNCATED_NOTICE.to_string());
    }
    replies
}

/// Renders a table straight into reply blocks.
#[must_use]
pub fn render(table: &Table, csv: bool) -> Vec<String> {
    code_blocks(&table.lines(csv))
}
