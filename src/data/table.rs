//! In-memory tables and lookup mappings
//!
//! Delimited text files are parsed into rows of strings. Files in any other
//! format are kept as an opaque payload with no columns, so they can still
//! be cached and sized but not filtered.

use crate::error::{CacheError, CacheResult};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Column holding the observation date
pub const PERIOD_COLUMN: &str = "period";

/// Column holding the series id
pub const ID_COLUMN: &str = "id";

/// Leading metadata columns of a wide drilling productivity table
const DPR_METADATA: [&str; 4] = ["id", "name", "release_date", "uom"];

/// A loaded table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    size_bytes: usize,
}

impl Table {
    /// Table with the given columns and rows
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let size_bytes = rows
            .iter()
            .flat_map(|r| r.iter())
            .chain(headers.iter())
            .map(String::len)
            .sum();
        Self {
            headers,
            rows,
            size_bytes,
        }
    }

    /// Opaque payload of a file that is not delimited text
    pub fn opaque(size_bytes: usize) -> Self {
        Self {
            headers: Vec::new(),
            rows: Vec::new(),
            size_bytes,
        }
    }

    /// Parse CSV bytes with a header row
    pub fn from_csv(bytes: &[u8]) -> CacheResult<Self> {
        let mut reader = csv::Reader::from_reader(bytes);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        let mut table = Self::new(headers, rows);
        table.size_bytes = bytes.len();
        Ok(table)
    }

    /// Column names
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Approximate size of the source data
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Index of a column
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn require_column(&self, name: &str) -> CacheResult<usize> {
        self.column(name)
            .ok_or_else(|| CacheError::User(format!("Table has no '{}' column", name)))
    }

    /// Rows whose period is on or after `start`
    pub fn filter_since(&self, start: NaiveDate) -> CacheResult<Self> {
        let col = self.require_column(PERIOD_COLUMN)?;
        let rows = self
            .rows
            .iter()
            .filter(|row| {
                row.get(col)
                    .and_then(|v| parse_date(v))
                    .is_some_and(|date| date >= start)
            })
            .cloned()
            .collect();
        Ok(Self::new(self.headers.clone(), rows))
    }

    /// Restrict to the given series
    ///
    /// Long tables (with an `id` column) keep matching rows. Wide tables keep
    /// the `period` column plus one column per requested id.
    pub fn select_ids(&self, ids: &[String]) -> CacheResult<Self> {
        if let Some(col) = self.column(ID_COLUMN) {
            let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
            let rows = self
                .rows
                .iter()
                .filter(|row| row.get(col).is_some_and(|v| wanted.contains(v.as_str())))
                .cloned()
                .collect();
            return Ok(Self::new(self.headers.clone(), rows));
        }

        let mut columns = vec![self.require_column(PERIOD_COLUMN)?];
        for id in ids {
            columns.push(self.require_column(id)?);
        }
        let headers: Vec<String> = columns.iter().map(|&i| self.headers[i].clone()).collect();
        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect::<Vec<String>>()
            })
            .collect();
        Ok(Self::new(headers, rows))
    }

    /// Rows where every `column = value` pair matches
    pub fn filter_eq<'a, I>(&self, conditions: I) -> CacheResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut checks = Vec::new();
        for (name, value) in conditions {
            checks.push((self.require_column(name)?, value));
        }
        let rows = self
            .rows
            .iter()
            .filter(|row| {
                checks
                    .iter()
                    .all(|(col, value)| row.get(*col).is_some_and(|v| v == value))
            })
            .cloned()
            .collect();
        Ok(Self::new(self.headers.clone(), rows))
    }

    /// Melt a wide productivity table into one row per delivery month
    ///
    /// Output columns: the metadata columns, `delivery_month`, `value`, and
    /// `region` looked up from `mapping`. When `region` is given only rows in
    /// that region are kept.
    pub fn melt_dpr(&self, mapping: &Mapping, region: Option<&str>) -> CacheResult<Self> {
        let meta: Vec<usize> = DPR_METADATA
            .iter()
            .map(|c| self.require_column(c))
            .collect::<CacheResult<_>>()?;
        let id_col = meta[0];
        let months: Vec<(usize, NaiveDate)> = self
            .headers
            .iter()
            .enumerate()
            .filter(|(i, _)| !meta.contains(i))
            .filter_map(|(i, h)| parse_date(h).map(|d| (i, d)))
            .collect();

        let mut headers: Vec<String> = DPR_METADATA.iter().map(|c| c.to_string()).collect();
        headers.extend(["delivery_month", "value", "region"].map(String::from));

        let mut rows = Vec::new();
        for row in &self.rows {
            let id = row.get(id_col).map(String::as_str).unwrap_or_default();
            let row_region = mapping.lookup(id, "region").unwrap_or_default();
            if region.is_some_and(|r| r != row_region) {
                continue;
            }
            for (col, month) in &months {
                let mut out: Vec<String> = meta
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect();
                out.push(month.format("%Y-%m-%d").to_string());
                out.push(row.get(*col).cloned().unwrap_or_default());
                out.push(row_region.to_string());
                rows.push(out);
            }
        }
        Ok(Self::new(headers, rows))
    }
}

/// Lookup file keyed by its first column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    headers: Vec<String>,
    entries: BTreeMap<String, Vec<String>>,
}

impl Mapping {
    /// Parse a CSV lookup file; later rows win on duplicate keys
    pub fn from_csv(bytes: &[u8]) -> CacheResult<Self> {
        let table = Table::from_csv(bytes)?;
        let entries = table
            .rows
            .into_iter()
            .filter_map(|row| row.first().cloned().map(|key| (key, row)))
            .collect();
        Ok(Self {
            headers: table.headers,
            entries,
        })
    }

    /// Value of `column` for the row keyed by `key`
    pub fn lookup(&self, key: &str, column: &str) -> Option<&str> {
        let col = self.headers.iter().position(|h| h == column)?;
        self.entries
            .get(key)
            .and_then(|row| row.get(col))
            .map(String::as_str)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping has no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether a file should be parsed as delimited text
pub fn is_delimited(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

// Accepts plain dates and timestamps with a date prefix
fn parse_date(value: &str) -> Option<NaiveDate> {
    let prefix = value.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}
