//! Fixed width field extraction and column storage
use log::warn;
use std::str::FromStr;

use crate::prelude::{Error, SV};

/// Missing sample marker. Every per satellite series keeps one value per
/// grid epoch, absent samples are this NaN. Any arithmetic involving it
/// yields NaN, so reductions over a series must filter it explicitly
/// (see [is_missing]).
pub const MISSING: f64 = f64::NAN;

/// Returns true if this sample is the [MISSING] marker
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// Fixed width layout of the numeric fields of one data line
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FieldLayout {
    /// Offset of the first field
    pub offset: usize,
    /// Distance between two consecutive fields
    pub stride: usize,
    /// Number of characters read in each field
    pub width: usize,
}

impl FieldLayout {
    /// RINEX v3 observation: 3 char SV prefix, then F14.3 + LLI + SSI
    pub const RINEX_OBS: Self = Self {
        offset: 4,
        stride: 16,
        width: 13,
    };
    /// SP3 position & clock: 4 char `Pxnn` prefix, then 4 x F14.6
    pub const SP3_POSITION: Self = Self {
        offset: 5,
        stride: 14,
        width: 13,
    };

    /// Returns the raw (trimmed) content of field #nth, None when the line is too short.
    pub fn raw<'a>(&self, line: &'a str, nth: usize) -> Option<&'a str> {
        let start = self.offset + nth * self.stride;
        if start >= line.len() {
            return None;
        }
        let end = std::cmp::min(start + self.width, line.len());
        line.get(start..end).map(|s| s.trim())
    }

    /// Slices one numeric field per label out of this line. Blank or absent fields
    /// are [MISSING]. Non blank content that is not a number is reported
    /// as [Error::FieldParse] and also becomes [MISSING].
    pub fn slice(&self, sv: SV, labels: &[String], line: &str) -> Vec<f64> {
        labels
            .iter()
            .enumerate()
            .map(|(nth, label)| match self.raw(line, nth) {
                Some(content) if !content.is_empty() => {
                    parse_field(label, content).unwrap_or_else(|e| {
                        warn!("{}: {}", sv, e);
                        MISSING
                    })
                },
                _ => MISSING,
            })
            .collect()
    }
}

/// Parses a single numeric field. Fortran `D` exponents are tolerated.
pub(crate) fn parse_field(label: &str, content: &str) -> Result<f64, Error> {
    f64::from_str(&content.replace('D', "E")).or(Err(Error::FieldParse {
        label: label.to_string(),
        content: content.to_string(),
    }))
}

/// Column oriented numeric table: one series per label,
/// all series share the same length.
#[derive(Debug, Clone, Default)]
pub struct Record {
    labels: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl Record {
    /// Builds an empty [Record] described by these labels
    pub fn new(labels: &[String], capacity: usize) -> Self {
        Self {
            labels: labels.to_vec(),
            columns: labels
                .iter()
                .map(|_| Vec::with_capacity(capacity))
                .collect(),
        }
    }
    /// Builds [Record] from already aligned columns
    pub(crate) fn from_columns(labels: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self, Error> {
        if labels.len() != columns.len() {
            return Err(Error::Artifact(format!(
                "{} labels but {} columns",
                labels.len(),
                columns.len()
            )));
        }
        if let Some(first) = columns.first() {
            if columns.iter().any(|c| c.len() != first.len()) {
                return Err(Error::Artifact("columns of uneven length".to_string()));
            }
        }
        Ok(Self { labels, columns })
    }
    /// Labels, in declaration order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
    /// Number of rows (grid epochs) in this [Record]
    pub fn len(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Series for this label
    pub fn get(&self, label: &str) -> Option<&[f64]> {
        let index = self.labels.iter().position(|l| l == label)?;
        Some(&self.columns[index])
    }
    /// Iterates (label, series)
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> + '_ {
        self.labels
            .iter()
            .zip(self.columns.iter())
            .map(|(l, c)| (l.as_str(), c.as_slice()))
    }
    /// Row at this grid index
    pub fn row(&self, index: usize) -> Option<Vec<f64>> {
        self.columns.iter().map(|c| c.get(index).copied()).collect()
    }
    /// Appends one row. Missing trailing values are [MISSING].
    pub(crate) fn push_row(&mut self, values: &[f64]) {
        for (nth, column) in self.columns.iter_mut().enumerate() {
            column.push(values.get(nth).copied().unwrap_or(MISSING));
        }
    }
    /// Appends `count` rows of [MISSING]
    pub(crate) fn push_missing(&mut self, count: usize) {
        for column in self.columns.iter_mut() {
            column.extend(std::iter::repeat(MISSING).take(count));
        }
    }
    /// Keeps the rows for which `mask` is true
    pub(crate) fn retain_mask(&mut self, mask: &[bool]) {
        for column in self.columns.iter_mut() {
            let mut keep = mask.iter();
            column.retain(|_| *keep.next().unwrap_or(&false));
        }
    }
    pub(crate) fn columns_mut(&mut self) -> impl Iterator<Item = (&str, &mut Vec<f64>)> + '_ {
        self.labels
            .iter()
            .zip(self.columns.iter_mut())
            .map(|(l, c)| (l.as_str(), c))
    }
}
