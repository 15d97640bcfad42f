// Shared primitives for reading tabular files.

use log::{debug, warn};
use std::collections::HashSet;
use std::path::Path;

use choropleth::map::Place;

use crate::maps::config_reader::{DataSource, PlacesSource};
use crate::maps::{io_csv, io_excel, *};

/// The content of a cell, independently of the file format.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    fn content(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(x) => format!("{}", x),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(x) => Some(*x),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Empty => None,
        }
    }
}

/// A line of a sheet, with its line number in the file (starting at 1).
#[derive(PartialEq, Debug, Clone)]
pub struct Row {
    pub lineno: usize,
    pub cells: Vec<Cell>,
}

/// A sheet with a header row.
#[derive(PartialEq, Debug, Clone)]
pub struct Table {
    pub path: String,
    pub header: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    fn column_index(&self, column: &str) -> MapResult<usize> {
        self.header
            .iter()
            .position(|h| h.trim() == column)
            .context(MissingColumnSnafu {
                column,
                path: self.path.clone(),
            })
    }

    /// The first column whose header is a usual name for the region names.
    fn name_column_index(&self) -> Option<usize> {
        self.header
            .iter()
            .position(|h| NAME_HEADERS.contains(&h.trim().to_lowercase().as_str()))
    }

    /// The non-empty rows with their line number.
    fn lines(&self) -> impl Iterator<Item = (usize, &Vec<Cell>)> {
        self.rows
            .iter()
            .filter(|row| !row.cells.iter().all(|c| c.is_empty()))
            .map(|row| (row.lineno, &row.cells))
    }
}

/// Headers read as the region names when no name column is configured.
const NAME_HEADERS: [&str; 2] = ["name", "county"];

static EMPTY_CELL: Cell = Cell::Empty;

// Short rows are padded with empty cells.
fn cell(row: &[Cell], idx: usize) -> &Cell {
    row.get(idx).unwrap_or(&EMPTY_CELL)
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Reads a table from a spreadsheet or a CSV file.
pub fn read_table(
    path: &str,
    provider: &Option<String>,
    worksheet: &Option<String>,
) -> MapResult<Table> {
    let provider = match provider {
        Some(p) => p.to_lowercase(),
        None => Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default(),
    };
    match provider.as_str() {
        "xlsx" | "excel" => io_excel::read_excel_table(path, worksheet),
        "csv" => io_csv::read_csv_table(path),
        x => whatever!(
            "Cannot read {}: unknown provider {:?}, expected xlsx or csv",
            simplify_file_name(path),
            x
        ),
    }
}

fn region_id(content: &Cell, width: Option<usize>) -> Option<String> {
    let s = match content {
        Cell::Empty => return None,
        Cell::Text(s) => s.trim().to_string(),
        // Spreadsheets store codes such as 51013 as numbers.
        Cell::Number(x) if x.fract() == 0.0 => format!("{}", *x as i64),
        Cell::Number(x) => format!("{}", x),
    };
    if s.is_empty() {
        return None;
    }
    match width {
        Some(w) if s.chars().all(|c| c.is_ascii_digit()) => Some(format!("{:0>w$}", s, w = w)),
        _ => Some(s),
    }
}

fn vote_count(content: &Cell, lineno: usize, column: &str) -> MapResult<u64> {
    match content.as_number() {
        Some(x) if x >= 0.0 && x.fract() == 0.0 && x <= u64::MAX as f64 => Ok(x as u64),
        _ => NonNumericVoteSnafu {
            lineno,
            column,
            content: content.content(),
        }
        .fail(),
    }
}

fn number_field(content: &Cell, lineno: usize, column: &str) -> MapResult<f64> {
    match content.as_number() {
        Some(x) if x.is_finite() => Ok(x),
        _ => NonNumericFieldSnafu {
            lineno,
            column,
            content: content.content(),
        }
        .fail(),
    }
}

/// Reads the results of all the regions.
///
/// The candidates are the columns listed in the configuration, or all the
/// columns except the identifier and the name. Without a configured name
/// column, a column called `name` or `county` holds the names.
pub fn read_regions(table: &Table, ds: &DataSource) -> MapResult<Vec<RegionVotes>> {
    let id_idx = table.column_index(&ds.id_column())?;
    let name_idx = match &ds.name_column {
        Some(n) => Some(table.column_index(n)?),
        None => table.name_column_index().filter(|idx| *idx != id_idx),
    };
    let result_idx = match &ds.result_column {
        Some(r) => Some(table.column_index(r)?),
        None => None,
    };
    let candidate_cols: Vec<(String, usize)> = match (&ds.candidate_columns, result_idx) {
        (Some(cols), _) => cols
            .iter()
            .map(|c| table.column_index(c).map(|idx| (c.clone(), idx)))
            .collect::<MapResult<Vec<_>>>()?,
        (None, Some(_)) => Vec::new(),
        (None, None) => table
            .header
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != id_idx && Some(*idx) != name_idx)
            .map(|(idx, h)| (h.trim().to_string(), idx))
            .collect(),
    };
    debug!(
        "read_regions: id: {:?} name: {:?} result: {:?} candidates: {:?}",
        id_idx, name_idx, result_idx, candidate_cols
    );

    let mut seen: HashSet<String> = HashSet::new();
    let mut res: Vec<RegionVotes> = Vec::new();
    for (lineno, row) in table.lines() {
        let id = region_id(cell(row, id_idx), ds.id_width)
            .context(EmptyRegionIdSnafu { lineno })?;
        if !seen.insert(id.clone()) {
            return DuplicateRegionSnafu { lineno, id }.fail();
        }
        let name = name_idx
            .map(|idx| cell(row, idx))
            .filter(|c| !c.is_empty())
            .map(|c| c.content().trim().to_string());
        let data = match (result_idx, &ds.result_column) {
            (Some(idx), Some(column)) if ds.candidate_columns.is_none() => {
                let lean = number_field(cell(row, idx), lineno, column)?;
                if !(-100.0..=100.0).contains(&lean) {
                    warn!(
                        "read_regions: line {}: the result {} of {} is outside -100..100",
                        lineno, lean, id
                    );
                }
                RegionData::Lean(lean)
            }
            _ => {
                let mut votes: Vec<(String, u64)> = Vec::new();
                for (cname, idx) in candidate_cols.iter() {
                    votes.push((cname.clone(), vote_count(cell(row, *idx), lineno, cname)?));
                }
                RegionData::Votes(votes)
            }
        };
        res.push(RegionVotes { id, name, data });
    }
    if res.is_empty() {
        warn!("read_regions: no region found in {}", table.path);
    }
    Ok(res)
}

/// Reads the places drawn on top of the map.
pub fn read_places(table: &Table, ps: &PlacesSource) -> MapResult<Vec<Place>> {
    let name_col = ps.name_column.clone().unwrap_or_else(|| "name".to_string());
    let lat_col = ps.lat_column.clone().unwrap_or_else(|| "lat".to_string());
    let lon_col = ps.lon_column.clone().unwrap_or_else(|| "lon".to_string());
    let name_idx = table.column_index(&name_col)?;
    let lat_idx = table.column_index(&lat_col)?;
    let lon_idx = table.column_index(&lon_col)?;
    let mut res: Vec<Place> = Vec::new();
    for (lineno, row) in table.lines() {
        res.push(Place {
            name: cell(row, name_idx).content().trim().to_string(),
            lat: number_field(cell(row, lat_idx), lineno, &lat_col)?,
            lon: number_field(cell(row, lon_idx), lineno, &lon_col)?,
        });
    }
    debug!("read_places: {} places", res.len());
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn table(header: &[&str], rows: Vec<Vec<Cell>>) -> Table {
        Table {
            path: "results.csv".to_string(),
            header: header.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .into_iter()
                .enumerate()
                .map(|(idx, cells)| Row {
                    lineno: idx + 2,
                    cells,
                })
                .collect(),
        }
    }

    fn source() -> DataSource {
        DataSource {
            provider: None,
            file_path: "results.csv".to_string(),
            excel_worksheet_name: None,
            id_column: None,
            id_width: None,
            name_column: Some("county".to_string()),
            result_column: None,
            candidate_columns: None,
        }
    }

    #[test]
    fn votes_in_column_order() {
        let t = table(
            &["id", "county", "Sanders", "Christie"],
            vec![
                vec![text("51013"), text("Arlington"), text("600"), text("400")],
                vec![Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty],
                vec![Cell::Number(51059.0), text("Fairfax"), Cell::Number(250.0), text(" 750 ")],
            ],
        );
        let regions = read_regions(&t, &source()).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].name.as_deref(), Some("Arlington"));
        assert_eq!(
            regions[0].data,
            RegionData::Votes(vec![
                ("Sanders".to_string(), 600),
                ("Christie".to_string(), 400)
            ])
        );
        assert_eq!(regions[1].id, "51059");
        assert_eq!(
            regions[1].data,
            RegionData::Votes(vec![
                ("Sanders".to_string(), 250),
                ("Christie".to_string(), 750)
            ])
        );
    }

    #[test]
    fn leading_zeros() {
        let t = table(
            &["id", "A"],
            vec![vec![Cell::Number(1001.0), text("1")], vec![text("01003"), text("2")]],
        );
        let mut ds = source();
        ds.name_column = None;
        ds.id_width = Some(5);
        let regions = read_regions(&t, &ds).unwrap();
        assert_eq!(regions[0].id, "01001");
        assert_eq!(regions[1].id, "01003");
    }

    #[test]
    fn bad_rows_are_reported_with_line_numbers() {
        let header = ["id", "county", "Sanders", "Christie"];
        let t = table(
            &header,
            vec![
                vec![text("1"), text("a"), text("3"), text("4")],
                vec![text("2"), text("b"), text("3.5"), text("4")],
            ],
        );
        match read_regions(&t, &source()).unwrap_err() {
            MapError::NonNumericVote {
                lineno,
                column,
                content,
            } => {
                assert_eq!(lineno, 3);
                assert_eq!(column, "Sanders");
                assert_eq!(content, "3.5");
            }
            e => panic!("unexpected error {:?}", e),
        }

        let t = table(&header, vec![vec![text("1"), text("a"), text("-3"), text("4")]]);
        assert!(matches!(
            read_regions(&t, &source()),
            Err(MapError::NonNumericVote { lineno: 2, .. })
        ));

        // Missing cells are not counted as zero votes.
        let t = table(&header, vec![vec![text("1"), text("a"), text("3")]]);
        match read_regions(&t, &source()).unwrap_err() {
            MapError::NonNumericVote { column, content, .. } => {
                assert_eq!(column, "Christie");
                assert_eq!(content, "");
            }
            e => panic!("unexpected error {:?}", e),
        }

        let t = table(&header, vec![vec![text(" "), text("a"), text("3"), text("4")]]);
        assert!(matches!(
            read_regions(&t, &source()),
            Err(MapError::EmptyRegionId { lineno: 2 })
        ));

        let t = table(
            &header,
            vec![
                vec![text("1"), text("a"), text("3"), text("4")],
                vec![text("1"), text("a"), text("3"), text("4")],
            ],
        );
        let err = read_regions(&t, &source()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
        assert!(matches!(err, MapError::DuplicateRegion { lineno: 3, .. }));
    }

    #[test]
    fn errors_use_the_line_of_the_row() {
        let mut t = table(
            &["id", "A"],
            vec![vec![text("1"), text("5")], vec![text("2"), text("x")]],
        );
        t.rows[1].lineno = 7;
        let mut ds = source();
        ds.name_column = None;
        assert!(matches!(
            read_regions(&t, &ds),
            Err(MapError::NonNumericVote { lineno: 7, .. })
        ));
    }

    #[test]
    fn usual_name_columns() {
        let mut ds = source();
        ds.name_column = None;
        for name in ["county", "Name", " COUNTY "] {
            let t = table(
                &["id", name, "Sanders", "Christie"],
                vec![vec![text("51013"), text("Arlington"), text("600"), text("400")]],
            );
            let regions = read_regions(&t, &ds).unwrap();
            assert_eq!(regions[0].name.as_deref(), Some("Arlington"));
            assert_eq!(
                regions[0].data,
                RegionData::Votes(vec![
                    ("Sanders".to_string(), 600),
                    ("Christie".to_string(), 400)
                ])
            );
        }

        // Any other text column is read as a candidate.
        let t = table(
            &["id", "region", "Sanders"],
            vec![vec![text("51013"), text("Arlington"), text("600")]],
        );
        assert!(matches!(
            read_regions(&t, &ds),
            Err(MapError::NonNumericVote { .. })
        ));
    }

    #[test]
    fn missing_column() {
        let t = table(&["fips", "A"], vec![]);
        let err = read_regions(&t, &source()).unwrap_err();
        assert!(matches!(err, MapError::MissingColumn { .. }));
        assert_eq!(err.kind(), ErrorKind::DataFormat);
    }

    #[test]
    fn lean_column() {
        let t = table(
            &["id", "result"],
            vec![vec![text("1"), text("-12.5")], vec![text("2"), Cell::Number(40.0)]],
        );
        let mut ds = source();
        ds.name_column = None;
        ds.result_column = Some("result".to_string());
        let regions = read_regions(&t, &ds).unwrap();
        assert_eq!(regions[0].data, RegionData::Lean(-12.5));
        assert_eq!(regions[1].data, RegionData::Lean(40.0));

        let t = table(&["id", "result"], vec![vec![text("1"), text("n/a")]]);
        assert!(matches!(
            read_regions(&t, &ds),
            Err(MapError::NonNumericField { lineno: 2, .. })
        ));
    }

    #[test]
    fn places() {
        let t = table(
            &["name", "lat", "lon"],
            vec![vec![text("Richmond"), text("37.54"), Cell::Number(-77.43)]],
        );
        let ps = PlacesSource {
            provider: None,
            file_path: "cities.csv".to_string(),
            excel_worksheet_name: None,
            name_column: None,
            lat_column: None,
            lon_column: None,
        };
        let places = read_places(&t, &ps).unwrap();
        assert_eq!(
            places,
            vec![Place {
                name: "Richmond".to_string(),
                lon: -77.43,
                lat: 37.54
            }]
        );
    }

    #[test]
    fn unknown_provider() {
        let err = read_table("results.ods", &None, &None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
