use anyhow::{Context, Result, bail};
use log::debug;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::domain::email::OutputRow;
use crate::pipeline::classifier::ClassifierMode;
use crate::store::repo::{StoredTable, TableRepository, TableRow};

const FIXED_COLUMNS: [&str; 4] = ["From", "Date", "Subject", "Summary"];

pub fn write_table<W: Write>(out: W, rows: &[OutputRow], mode: ClassifierMode) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = FIXED_COLUMNS.to_vec();
    header.push(mode.column_header());
    writer.write_record(&header)?;

    for row in rows {
        let date = row.date_cell();
        writer.write_record([
            row.sender.as_str(),
            date.as_str(),
            row.subject.as_str(),
            row.summary.as_str(),
            row.stage.cell(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_table<R: Read>(input: R) -> Result<StoredTable> {
    let mut reader = csv::Reader::from_reader(input);

    let header = reader.headers()?.clone();
    if header.len() != FIXED_COLUMNS.len() + 1 {
        bail!("expected {} columns, found {}", FIXED_COLUMNS.len() + 1, header.len());
    }
    let stage_header = header[FIXED_COLUMNS.len()].to_string();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(TableRow {
            from: record[0].to_string(),
            date: record[1].to_string(),
            subject: record[2].to_string(),
            summary: record[3].to_string(),
            stage: record[4].to_string(),
        });
    }
    Ok(StoredTable { stage_header, rows })
}

/// CSV file replaced atomically on every run.
pub struct CsvTable {
    path: PathBuf,
}

impl CsvTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "job_emails.csv".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TableRepository for CsvTable {
    fn replace_all(&self, rows: &[OutputRow], mode: ClassifierMode) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.temp_path();
        {
            let file = File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
            let mut out = BufWriter::new(file);
            write_table(&mut out, rows, mode)?;
            out.flush()?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;

        debug!("wrote {} rows to {}", rows.len(), self.path.display());
        Ok(())
    }

    fn load(&self) -> Result<Option<StoredTable>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file = File::open(&self.path)?;
        let table = read_table(file).with_context(|| format!("reading {}", self.path.display()))?;
        Ok(Some(table))
    }
}
