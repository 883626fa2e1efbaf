use anyhow::Result;

use crate::domain::email::OutputRow;
use crate::pipeline::classifier::ClassifierMode;

/// One row as read back from the persisted table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub from: String,
    pub date: String,
    pub subject: String,
    pub summary: String,
    pub stage: String,
}

#[derive(Debug, Clone)]
pub struct StoredTable {
    /// Header of the last column: "Classification" or "Next Stage".
    pub stage_header: String,
    pub rows: Vec<TableRow>,
}

pub trait TableRepository {
    /// Replace the whole table with `rows`; nothing from earlier runs survives.
    fn replace_all(&self, rows: &[OutputRow], mode: ClassifierMode) -> Result<()>;

    /// `None` when no run has written a table yet.
    fn load(&self) -> Result<Option<StoredTable>>;
}
