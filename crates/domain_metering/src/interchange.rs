//! CSV interchange for spreadsheets
//!
//! Export writes one row per bill with the derived columns next to the raw
//! readings. Import reads back only the raw columns (date, amount, kWh and
//! both readings); derived columns are ignored and recomputed.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use core_kernel::money::parse_decimal;
use core_kernel::{Kwh, Money};

use crate::bill::NewBill;
use crate::engine::MeteredBill;

const BOM: &str = "\u{feff}";

/// Column positions read on import
const COL_DATE: usize = 0;
const COL_AMOUNT: usize = 1;
const COL_KWH: usize = 2;
const COL_TOP: usize = 3;
const COL_BOTTOM: usize = 6;

/// Errors that stop an import or export as a whole
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV file is too large: {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("CSV file has no data rows")]
    Empty,

    #[error("CSV read error: {0}")]
    Read(#[from] csv::Error),

    #[error("CSV write error: {0}")]
    Write(String),
}

/// Sanity limits applied to imported rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportLimits {
    pub max_file_bytes: usize,
    pub max_cell_chars: usize,
    pub min_columns: usize,
    pub max_amount: Decimal,
    pub max_kwh: Decimal,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 5 * 1024 * 1024,
            max_cell_chars: 1000,
            min_columns: 9,
            max_amount: Decimal::from(1_000_000),
            max_kwh: Decimal::from(100_000),
        }
    }
}

/// Why a row was left out of an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum SkipReason {
    TooFewColumns { found: usize },
    InvalidValues,
    DuplicateDate { date: NaiveDate },
    /// The row's costs cannot be computed against its neighbours
    OutOfRange,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooFewColumns { found } => write!(f, "too few columns ({})", found),
            SkipReason::InvalidValues => write!(f, "invalid values"),
            SkipReason::DuplicateDate { date } => write!(f, "a bill dated {} already exists", date),
            SkipReason::OutOfRange => write!(f, "costs exceed the representable range"),
        }
    }
}

/// A skipped row and its 1-based line number in the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIssue {
    pub row: u64,
    pub reason: SkipReason,
}

/// Outcome of reading a CSV file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub accepted: Vec<NewBill>,
    pub skipped: Vec<RowIssue>,
    /// Line numbers of `accepted`, index for index
    #[serde(skip)]
    pub(crate) accepted_rows: Vec<u64>,
}

impl ImportReport {
    /// Moves the accepted rows matching `reject` to `skipped` with `reason`
    pub(crate) fn reject_where(&mut self, reason: SkipReason, mut reject: impl FnMut(usize) -> bool) {
        let accepted = std::mem::take(&mut self.accepted);
        let rows = std::mem::take(&mut self.accepted_rows);
        for (index, (bill, row)) in accepted.into_iter().zip(rows).enumerate() {
            if reject(index) {
                self.skipped.push(RowIssue {
                    row,
                    reason: reason.clone(),
                });
            } else {
                self.accepted.push(bill);
                self.accepted_rows.push(row);
            }
        }
        self.skipped.sort_by_key(|issue| issue.row);
    }
}

#[derive(Serialize)]
struct ExportRow {
    date: String,
    #[serde(rename = "main.amount")]
    amount: String,
    #[serde(rename = "main.kwh")]
    kwh: String,
    #[serde(rename = "readings.top")]
    reading_top: String,
    #[serde(rename = "consumptionTop")]
    consumption_top: String,
    #[serde(rename = "costTop")]
    cost_top: String,
    #[serde(rename = "readings.bottom")]
    reading_bottom: String,
    #[serde(rename = "consumptionBottom")]
    consumption_bottom: String,
    #[serde(rename = "costBottom")]
    cost_bottom: String,
    #[serde(rename = "commonKwh")]
    common_kwh: String,
    #[serde(rename = "commonCost")]
    common_cost: String,
}

impl From<&MeteredBill> for ExportRow {
    fn from(row: &MeteredBill) -> Self {
        let bill = &row.bill;
        let m = &row.metrics;
        Self {
            date: bill.date.format("%Y-%m-%d").to_string(),
            amount: bill.main.amount.amount().normalize().to_string(),
            kwh: kwh(bill.main.kwh),
            reading_top: kwh(bill.readings.top),
            consumption_top: kwh(m.consumption_top),
            cost_top: m.cost_top.to_string(),
            reading_bottom: kwh(bill.readings.bottom),
            consumption_bottom: kwh(m.consumption_bottom),
            cost_bottom: m.cost_bottom.to_string(),
            common_kwh: kwh(m.common_kwh),
            common_cost: m.common_cost.to_string(),
        }
    }
}

fn kwh(value: Kwh) -> String {
    value.value().normalize().to_string()
}

/// Renders ledger rows as CSV, optionally prefixed with a UTF-8 BOM
pub fn export(rows: &[MeteredBill], with_bom: bool) -> Result<String, CsvError> {
    let mut out = Vec::new();
    if with_bom {
        out.extend_from_slice(BOM.as_bytes());
    }

    let mut writer = WriterBuilder::new().from_writer(out);
    if rows.is_empty() {
        writer.write_record(HEADER)?;
    }
    for row in rows {
        writer.serialize(ExportRow::from(row))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::Write(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CsvError::Write(e.to_string()))
}

/// Export column names in order
pub const HEADER: [&str; 11] = [
    "date",
    "main.amount",
    "main.kwh",
    "readings.top",
    "consumptionTop",
    "costTop",
    "readings.bottom",
    "consumptionBottom",
    "costBottom",
    "commonKwh",
    "commonCost",
];

/// Reads a CSV file into new bills.
///
/// The first non-blank line is a header and is skipped. Rows are skipped,
/// not fatal, when they have too few columns, fail the sanity limits, or
/// carry a date already in `existing_dates` or earlier in the same file.
pub fn import(
    input: &[u8],
    existing_dates: &HashSet<NaiveDate>,
    limits: &ImportLimits,
) -> Result<ImportReport, CsvError> {
    if input.len() > limits.max_file_bytes {
        return Err(CsvError::TooLarge {
            size: input.len(),
            limit: limits.max_file_bytes,
        });
    }
    let input = input.strip_prefix(BOM.as_bytes()).unwrap_or(input);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);

    let mut report = ImportReport::default();
    let mut seen_dates = existing_dates.clone();
    let mut header_seen = false;
    let mut data_rows = 0usize;
    let mut record = StringRecord::new();

    while reader.read_record(&mut record)? {
        if record.iter().all(str::is_empty) {
            continue;
        }
        if !header_seen {
            header_seen = true;
            continue;
        }
        data_rows += 1;
        let row = record.position().map(|p| p.line()).unwrap_or(data_rows as u64 + 1);

        if record.len() < limits.min_columns {
            report.skipped.push(RowIssue {
                row,
                reason: SkipReason::TooFewColumns { found: record.len() },
            });
            continue;
        }

        let Some(bill) = parse_row(&record, limits) else {
            report.skipped.push(RowIssue {
                row,
                reason: SkipReason::InvalidValues,
            });
            continue;
        };

        if !seen_dates.insert(bill.date) {
            report.skipped.push(RowIssue {
                row,
                reason: SkipReason::DuplicateDate { date: bill.date },
            });
            continue;
        }

        report.accepted.push(bill);
        report.accepted_rows.push(row);
    }

    if data_rows == 0 {
        return Err(CsvError::Empty);
    }
    Ok(report)
}

fn parse_row(record: &StringRecord, limits: &ImportLimits) -> Option<NewBill> {
    let cell = |i: usize| sanitize(record.get(i).unwrap_or_default(), limits.max_cell_chars);
    let number = |i: usize| parse_decimal(&cell(i)).ok();

    let date = NaiveDate::parse_from_str(&cell(COL_DATE), "%Y-%m-%d").ok()?;
    let amount = number(COL_AMOUNT)?;
    let kwh = number(COL_KWH)?;
    let top = number(COL_TOP)?;
    let bottom = number(COL_BOTTOM)?;

    let in_range = |v: Decimal, max: Decimal| v >= Decimal::ZERO && v <= max;
    if top.is_sign_negative() || bottom.is_sign_negative() {
        return None;
    }
    if !in_range(amount, limits.max_amount) || !in_range(kwh, limits.max_kwh) {
        return None;
    }

    Some(NewBill::new(
        date,
        Money::new(amount),
        Kwh::new(kwh),
        Kwh::new(top),
        Kwh::new(bottom),
    ))
}

/// Strips markup from a cell and caps its length
pub fn sanitize(raw: &str, max_chars: usize) -> String {
    let without_scripts = strip_scripts(raw.trim());

    let mut out = String::with_capacity(without_scripts.len());
    let mut in_tag = false;
    for c in without_scripts.chars() {
        match c {
            '<' if !in_tag => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    // An unclosed '<' is not a tag
    if in_tag {
        if let Some(start) = without_scripts.rfind('<') {
            out.push_str(&without_scripts[start..]);
        }
    }

    out.chars().take(max_chars).collect()
}

fn strip_scripts(input: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;

    while let Some(offset) = lower[cursor..].find("<script") {
        let start = cursor + offset;
        let Some(close) = lower[start..].find("</script>") else {
            break;
        };
        out.push_str(&input[cursor..start]);
        cursor = start + close + "</script>".len();
    }
    out.push_str(&input[cursor..]);
    out
}
