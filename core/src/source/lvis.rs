use crate::prelude::{NmbimError, NmbimResult};
use log::warn;
use std::collections::HashMap;
use std::io::BufRead;

/// Whitespace-delimited LVIS L2 product, keyed by `(LFID, SHOTNUMBER)`.
///
/// The header is the `#` comment line naming `LFID`; all other comment lines
/// are ignored. Field names are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct LvisL2Table {
    path: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    keys: HashMap<(i64, i64), usize>,
}

impl LvisL2Table {
    pub fn parse<R: BufRead>(path: impl Into<String>, reader: R) -> NmbimResult<Self> {
        let path = path.into();
        let mut header: Option<Vec<String>> = None;
        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|err| {
                NmbimError::MalformedSource(format!("reading {}: {}", path, err))
            })?;
            match line.strip_prefix('#') {
                Some(comment) if comment.contains("LFID") => {
                    header = Some(
                        comment
                            .split_whitespace()
                            .map(str::to_uppercase)
                            .collect(),
                    );
                }
                Some(_) => {}
                None if line.trim().is_empty() => {}
                None => lines.push(line),
            }
        }
        let columns = header.ok_or_else(|| {
            NmbimError::MalformedSource(format!("{}: no header line naming LFID", path))
        })?;

        let mut rows = Vec::with_capacity(lines.len());
        for line in lines {
            let row: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            if row.len() == columns.len() {
                rows.push(row);
            } else {
                warn!(
                    "{}: skipping row with {} fields (expected {})",
                    path,
                    row.len(),
                    columns.len()
                );
            }
        }

        let mut table = Self {
            path,
            columns,
            rows,
            keys: HashMap::new(),
        };
        table.index_keys();
        Ok(table)
    }

    fn index_keys(&mut self) {
        let (Some(lfid_col), Some(shot_col)) = (self.column("LFID"), self.column("SHOTNUMBER"))
        else {
            warn!("{}: LFID or SHOTNUMBER column missing", self.path);
            return;
        };
        for (position, row) in self.rows.iter().enumerate() {
            let lfid = parse_integer(&row[lfid_col]);
            let shot = parse_integer(&row[shot_col]);
            if let (Some(lfid), Some(shot)) = (lfid, shot) {
                self.keys.entry((lfid, shot)).or_insert(position);
            }
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column position of `field`, ignoring case.
    pub fn column(&self, field: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|name| name.eq_ignore_ascii_case(field))
    }

    pub fn has_row(&self, lfid: i64, shot_number: i64) -> bool {
        self.keys.contains_key(&(lfid, shot_number))
    }

    /// Numeric `field` of the row for `(lfid, shot_number)`.
    pub fn value(&self, lfid: i64, shot_number: i64, field: &str) -> Option<f64> {
        let row = self.keys.get(&(lfid, shot_number))?;
        let column = self.column(field)?;
        self.rows.get(*row)?.get(column)?.parse().ok()
    }
}

fn parse_integer(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.fract() == 0.0)
            .map(|value| value as i64)
    })
}
