// Primitives for reading CSV files.

use log::debug;
use std::fs;

use crate::maps::io_common::{Cell, Row, Table};
use crate::maps::*;

/// Converts byte offsets, given in increasing order, to line numbers.
struct LineCounter<'a> {
    content: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    fn new(content: &'a [u8]) -> LineCounter<'a> {
        LineCounter {
            content,
            pos: 0,
            line: 1,
        }
    }

    /// The line of the record that starts at `byte`.
    ///
    /// The reader reports the end of the previous record, before the blank
    /// lines it skips, so the line breaks found at `byte` are jumped over.
    fn line_at(&mut self, byte: u64) -> usize {
        let len = self.content.len();
        let mut start = (byte as usize).clamp(self.pos, len);
        while start < len && (self.content[start] == b'\n' || self.content[start] == b'\r') {
            start += 1;
        }
        self.line += self.content[self.pos..start]
            .iter()
            .filter(|b| **b == b'\n')
            .count();
        self.pos = start;
        self.line
    }
}

/// Reads a CSV file with a header line.
///
/// All the cells are kept as text, so that identifiers such as `01001` keep
/// their leading zeros.
pub fn read_csv_table(path: &str) -> MapResult<Table> {
    let content = fs::read(path)
        .map_err(csv::Error::from)
        .context(CsvOpenSnafu { path })?;
    let mut lines = LineCounter::new(&content);
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_slice());
    let mut records = rdr.into_records();
    let header: Vec<String> = match records.next() {
        Some(line_r) => line_r
            .context(CsvLineParseSnafu { lineno: 1_usize })?
            .iter()
            .map(|s| s.trim_start_matches('\u{feff}').trim().to_string())
            .collect(),
        None => Vec::new(),
    };
    debug!("read_csv_table: header: {:?}", header);

    // Blank lines are skipped and quoted fields may span several lines, so
    // the line numbers come from the byte positions of the records.
    let mut rows: Vec<Row> = Vec::new();
    let mut last_lineno: usize = 1;
    for line_r in records {
        let line = match line_r {
            Ok(line) => line,
            Err(e) => {
                let lineno = e
                    .position()
                    .map(|p| lines.line_at(p.byte()))
                    .unwrap_or(last_lineno + 1);
                return Err(e).context(CsvLineParseSnafu { lineno });
            }
        };
        let lineno = line
            .position()
            .map(|p| lines.line_at(p.byte()))
            .unwrap_or(last_lineno + 1);
        last_lineno = lineno;
        let cells: Vec<Cell> = line
            .iter()
            .map(|s| {
                if s.trim().is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(s.to_string())
                }
            })
            .collect();
        rows.push(Row { lineno, cells });
    }
    Ok(Table {
        path: path.to_string(),
        header,
        rows,
    })
}
