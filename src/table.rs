//! Per-shot table: a `time` column, ordered feature columns, optional target.
//!
//! CSV layout (features file, then label file):
//!
//! ```text
//! time,SSXcore,IPLA,...        time,target
//! 60.2,0.013,1.2e6,...         60.2,0
//! ```
//!
//! Values are written with Rust's shortest round-trip float formatting, so a
//! table read back from its own CSV compares equal. Empty fields and `NaN`
//! read back as NaN.
use std::io::{Read, Write};

use tracing::debug;

use crate::error::{PrepError, Result};
use crate::shot::Channel;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShotTable {
    time: Vec<f64>,
    columns: Vec<(Channel, Vec<f64>)>,
    target: Option<Vec<u8>>,
}

impl ShotTable {
    /// Table with a time axis and no feature columns.
    pub fn new(time: Vec<f64>) -> Self {
        Self { time, columns: Vec::new(), target: None }
    }

    /// Single-column table.
    pub fn from_column(time: Vec<f64>, ch: Channel, values: Vec<f64>) -> Result<Self> {
        let mut t = Self::new(time);
        t.push_column(ch, values)?;
        Ok(t)
    }

    /// Append a column. Replaces an existing column of the same channel.
    pub fn push_column(&mut self, ch: Channel, values: Vec<f64>) -> Result<()> {
        self.check_len("column vs time", values.len())?;
        match self.columns.iter_mut().find(|(c, _)| *c == ch) {
            Some((_, v)) => *v = values,
            None => self.columns.push((ch, values)),
        }
        Ok(())
    }

    /// Attach the target column.
    pub fn with_target(mut self, target: Vec<u8>) -> Result<Self> {
        self.check_len("target vs time", target.len())?;
        self.target = Some(target);
        Ok(self)
    }

    fn check_len(&self, what: &'static str, n: usize) -> Result<()> {
        if n != self.time.len() {
            return Err(PrepError::LengthMismatch { what, left: n, right: self.time.len() });
        }
        Ok(())
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn n_rows(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.columns.iter().map(|(c, _)| *c)
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, ch: Channel) -> Option<&[f64]> {
        self.columns.iter().find(|(c, _)| *c == ch).map(|(_, v)| v.as_slice())
    }

    pub fn target(&self) -> Option<&[u8]> {
        self.target.as_deref()
    }

    /// NaN / ±inf values across every feature column.
    pub fn non_finite_count(&self) -> usize {
        self.columns
            .iter()
            .flat_map(|(_, v)| v.iter())
            .filter(|v| !v.is_finite())
            .count()
    }

    // ── Join ──────────────────────────────────────────────────────────────

    /// Inner join on exact `time` equality.
    ///
    /// Both time axes must be ascending. Columns of `other` already present
    /// in `self` are not duplicated. Any target is dropped.
    pub fn inner_join(&self, other: &ShotTable) -> ShotTable {
        let (mut i, mut j) = (0, 0);
        let mut rows: Vec<(usize, usize)> = Vec::with_capacity(self.n_rows().min(other.n_rows()));
        while i < self.time.len() && j < other.time.len() {
            let (a, b) = (self.time[i], other.time[j]);
            if a == b {
                rows.push((i, j));
                i += 1;
                j += 1;
            } else if a < b {
                i += 1;
            } else {
                j += 1;
            }
        }
        let dropped = self.n_rows().max(other.n_rows()) - rows.len();
        if dropped > 0 {
            debug!(dropped, "inner join dropped rows");
        }

        let time = rows.iter().map(|&(i, _)| self.time[i]).collect();
        let mut columns: Vec<(Channel, Vec<f64>)> = self
            .columns
            .iter()
            .map(|(c, v)| (*c, rows.iter().map(|&(i, _)| v[i]).collect()))
            .collect();
        for (c, v) in &other.columns {
            if self.column(*c).is_none() {
                columns.push((*c, rows.iter().map(|&(_, j)| v[j]).collect()));
            }
        }
        ShotTable { time, columns, target: None }
    }

    // ── CSV ───────────────────────────────────────────────────────────────

    /// Features file: `time,<ch>...`.
    pub fn write_features_csv<W: Write>(&self, w: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(w);
        let mut header = vec!["time".to_string()];
        header.extend(self.columns.iter().map(|(c, _)| c.to_string()));
        wtr.write_record(&header)?;

        let mut row = Vec::with_capacity(header.len());
        for (i, t) in self.time.iter().enumerate() {
            row.clear();
            row.push(t.to_string());
            row.extend(self.columns.iter().map(|(_, v)| v[i].to_string()));
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Label file: `time,target`. Fails if no target is attached.
    pub fn write_target_csv<W: Write>(&self, w: W) -> Result<()> {
        let target = self
            .target
            .as_ref()
            .ok_or(PrepError::MissingMetadata("target column"))?;
        let mut wtr = csv::Writer::from_writer(w);
        wtr.write_record(["time", "target"])?;
        for (t, y) in self.time.iter().zip(target) {
            wtr.write_record([t.to_string(), y.to_string()])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Read a features file. Unknown column names are rejected.
    pub fn read_features_csv<R: Read>(r: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(r);
        let headers = rdr.headers()?.clone();
        let mut names = headers.iter();
        if names.next() != Some("time") {
            return Err(PrepError::MalformedRecord("first column must be `time`".into()));
        }
        let chans = names.map(str::parse).collect::<Result<Vec<Channel>>>()?;

        let mut time = Vec::new();
        let mut cols: Vec<Vec<f64>> = vec![Vec::new(); chans.len()];
        for rec in rdr.records() {
            let rec = rec?;
            time.push(parse_field(rec.get(0))?);
            for (k, col) in cols.iter_mut().enumerate() {
                col.push(parse_field(rec.get(k + 1))?);
            }
        }
        Ok(ShotTable {
            time,
            columns: chans.into_iter().zip(cols).collect(),
            target: None,
        })
    }

    /// Read a label file into `(time, target)`.
    pub fn read_target_csv<R: Read>(r: R) -> Result<(Vec<f64>, Vec<u8>)> {
        let mut rdr = csv::Reader::from_reader(r);
        let mut time = Vec::new();
        let mut target = Vec::new();
        for rec in rdr.records() {
            let rec = rec?;
            time.push(parse_field(rec.get(0))?);
            let y = rec.get(1).unwrap_or("").trim();
            target.push(match y {
                "0" | "0.0" | "False" | "false" => 0,
                "1" | "1.0" | "True" | "true" => 1,
                other => {
                    return Err(PrepError::MalformedRecord(format!("target value {other:?}")));
                }
            });
        }
        Ok((time, target))
    }
}

fn parse_field(field: Option<&str>) -> Result<f64> {
    match field.map(str::trim) {
        None | Some("") => Ok(f64::NAN),
        Some(s) => s
            .parse()
            .map_err(|_| PrepError::MalformedRecord(format!("not a number: {s:?}"))),
    }
}
