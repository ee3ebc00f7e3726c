//! Cell partitioning into output streams.
//!
//! Both policies are pure functions of the cell sequence, so re-running on an
//! unchanged notebook yields byte-identical text.

use nbcatalog_shared::SplitMode;

use crate::{Cell, Notebook};

/// Separator placed between consecutive cells of one stream.
const CELL_SEPARATOR: &str = "\n\n";

/// Percent-format marker preceding a code cell.
const CODE_MARKER: &str = "# %%";

/// Percent-format marker preceding a markdown cell.
const MARKDOWN_MARKER: &str = "# %% [markdown]";

/// Text produced for one notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitOutput {
    Full {
        /// Code cell bodies in order.
        code: String,
        /// Markdown cell bodies in order.
        markdown: String,
    },
    Legacy {
        /// All cells in order, markdown rendered as comments.
        combined: String,
        /// Markdown cell bodies in order.
        markdown: String,
    },
}

impl SplitOutput {
    pub fn mode(&self) -> SplitMode {
        match self {
            Self::Full { .. } => SplitMode::Full,
            Self::Legacy { .. } => SplitMode::Legacy,
        }
    }

    /// The script stream (`code` or `combined`).
    pub fn script(&self) -> &str {
        match self {
            Self::Full { code, .. } => code,
            Self::Legacy { combined, .. } => combined,
        }
    }

    /// The markdown-only stream.
    pub fn markdown(&self) -> &str {
        match self {
            Self::Full { markdown, .. } | Self::Legacy { markdown, .. } => markdown,
        }
    }
}

/// Partition `notebook` according to `mode`.
pub fn split(notebook: &Notebook, mode: SplitMode) -> SplitOutput {
    let cells = notebook.cells();
    let markdown = join_bodies(cells.iter().filter(|c| !c.is_code()));

    match mode {
        SplitMode::Full => SplitOutput::Full {
            code: join_bodies(cells.iter().filter(|c| c.is_code())),
            markdown,
        },
        SplitMode::Legacy => SplitOutput::Legacy {
            combined: cells
                .iter()
                .map(percent_cell)
                .collect::<Vec<_>>()
                .join(CELL_SEPARATOR),
            markdown,
        },
    }
}

fn join_bodies<'a>(cells: impl Iterator<Item = &'a Cell>) -> String {
    cells.map(Cell::body).collect::<Vec<_>>().join(CELL_SEPARATOR)
}

/// Render one cell as a percent-format block.
fn percent_cell(cell: &Cell) -> String {
    match cell {
        Cell::Code(body) if body.is_empty() => CODE_MARKER.to_string(),
        Cell::Code(body) => format!("{CODE_MARKER}\n{body}"),
        Cell::Markdown(body) if body.is_empty() => MARKDOWN_MARKER.to_string(),
        Cell::Markdown(body) => {
            let commented = body
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        "#".to_string()
                    } else {
                        format!("# {line}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("{MARKDOWN_MARKER}\n{commented}")
        }
    }
}
