//! Sheet model: rows carry an explicit kind tag
//!
//! Header rows are tagged when the sheet is built, so the formatter styles
//! them by kind instead of re-deriving headers by matching literal cell
//! text. Renaming a section title can no longer silently drop its styling.

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Number(n as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    SectionHeader,
    SubHeader,
    ColumnHeader,
    Data,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub kind: RowKind,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn section(title: &str) -> Self {
        Self {
            kind: RowKind::SectionHeader,
            cells: vec![Cell::from(title)],
        }
    }

    pub fn sub(title: &str) -> Self {
        Self {
            kind: RowKind::SubHeader,
            cells: vec![Cell::from(title)],
        }
    }

    pub fn columns(titles: &[&str]) -> Self {
        Self {
            kind: RowKind::ColumnHeader,
            cells: titles.iter().map(|t| Cell::from(*t)).collect(),
        }
    }

    pub fn data(cells: Vec<Cell>) -> Self {
        Self {
            kind: RowKind::Data,
            cells,
        }
    }

    /// First cell as text; section/sub-section titles live there.
    pub fn title(&self) -> &str {
        match self.cells.first() {
            Some(Cell::Text(s)) => s,
            _ => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Rows may have varying lengths; formatting pads to the widest one.
    pub fn max_columns(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }
}
