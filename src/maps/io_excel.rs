// Primitives for reading Excel files.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};
use log::{debug, warn};

use crate::maps::io_common::{Cell, Row, Table};
use crate::maps::*;

pub fn read_excel_table(path: &str, worksheet: &Option<String>) -> MapResult<Table> {
    let wrange = get_range(path, worksheet)?;
    // The range starts at the first used cell, which is not always on the first line.
    let header_lineno = wrange.start().map(|(r, _)| r as usize + 1).unwrap_or(1);
    let mut rows = wrange.rows();
    let header: Vec<String> = rows
        .next()
        .context(EmptyExcelSnafu { path })?
        .iter()
        .map(|c| match to_cell(c) {
            Cell::Text(s) => s,
            Cell::Number(x) => format!("{}", x),
            Cell::Empty => String::new(),
        })
        .collect();
    debug!("read_excel_table: header: {:?}", header);
    let rows: Vec<Row> = rows
        .enumerate()
        .map(|(idx, row)| Row {
            lineno: header_lineno + 1 + idx,
            cells: row.iter().map(to_cell).collect(),
        })
        .collect();
    Ok(Table {
        path: path.to_string(),
        header,
        rows,
    })
}

fn to_cell(c: &DataType) -> Cell {
    match c {
        DataType::Empty => Cell::Empty,
        DataType::String(s) if s.trim().is_empty() => Cell::Empty,
        DataType::String(s) => Cell::Text(s.clone()),
        DataType::Float(x) | DataType::DateTime(x) => Cell::Number(*x),
        DataType::Int(x) => Cell::Number(*x as f64),
        DataType::Bool(b) => Cell::Text(b.to_string()),
        x => Cell::Text(format!("{:?}", x)),
    }
}

fn get_range(path: &str, worksheet_name_o: &Option<String>) -> MapResult<Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(worksheet_name)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let names = workbook.sheet_names().to_vec();
        if names.len() > 1 {
            warn!(
                "get_range: {} has {} worksheets, reading the first one {:?}",
                path,
                names.len(),
                names[0]
            );
        }
        let wrange = workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::config_reader::DataSource;
    use crate::maps::io_common::read_regions;
    use rust_xlsxwriter::Workbook;

    fn write_results(path: &std::path::Path) {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        ws.set_name("Counties").unwrap();
        for (col, h) in ["fips", "county", "Sanders", "Christie"].iter().enumerate() {
            ws.write_string(0, col as u16, *h).unwrap();
        }
        ws.write_number(1, 0, 1001).unwrap();
        ws.write_string(1, 1, "Autauga").unwrap();
        ws.write_number(1, 2, 5908).unwrap();
        ws.write_number(1, 3, 19838).unwrap();
        ws.write_string(2, 0, "01003").unwrap();
        ws.write_string(2, 1, "Baldwin").unwrap();
        ws.write_number(2, 2, 24578).unwrap();
        ws.write_string(2, 3, "many").unwrap();
        wb.save(path).unwrap();
    }

    #[test]
    fn read_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.xlsx");
        write_results(&path);
        let path_s = path.display().to_string();

        let table = read_excel_table(&path_s, &Some("Counties".to_string())).unwrap();
        assert_eq!(table.header, vec!["fips", "county", "Sanders", "Christie"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].cells[0], Cell::Number(1001.0));
        assert_eq!(table.rows[1].cells[0], Cell::Text("01003".to_string()));
        assert_eq!(table.rows[1].lineno, 3);

        let default_sheet = read_excel_table(&path_s, &None).unwrap();
        assert_eq!(default_sheet, table);

        let ds = DataSource {
            provider: Some("xlsx".to_string()),
            file_path: path_s.clone(),
            excel_worksheet_name: None,
            id_column: Some("fips".to_string()),
            id_width: Some(5),
            name_column: Some("county".to_string()),
            result_column: None,
            candidate_columns: None,
        };
        let err = read_regions(&table, &ds).unwrap_err();
        assert!(matches!(err, MapError::NonNumericVote { lineno: 3, .. }));
    }

    #[test]
    fn header_below_the_first_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.xlsx");
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        // Header on line 3, bad count on line 5.
        ws.write_string(2, 0, "id").unwrap();
        ws.write_string(2, 1, "A").unwrap();
        ws.write_number(3, 0, 1).unwrap();
        ws.write_number(3, 1, 5).unwrap();
        ws.write_number(4, 0, 2).unwrap();
        ws.write_string(4, 1, "x").unwrap();
        wb.save(&path).unwrap();
        let path_s = path.display().to_string();

        let table = read_excel_table(&path_s, &None).unwrap();
        assert_eq!(table.header, vec!["id", "A"]);
        let lines: Vec<usize> = table.rows.iter().map(|r| r.lineno).collect();
        assert_eq!(lines, vec![4, 5]);

        let ds = DataSource {
            provider: None,
            file_path: path_s,
            excel_worksheet_name: None,
            id_column: None,
            id_width: None,
            name_column: None,
            result_column: None,
            candidate_columns: None,
        };
        let err = read_regions(&table, &ds).unwrap_err();
        assert!(matches!(err, MapError::NonNumericVote { lineno: 5, .. }));
    }

    #[test]
    fn missing_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.xlsx");
        write_results(&path);
        let err = read_excel_table(&path.display().to_string(), &Some("Cities".to_string()))
            .unwrap_err();
        assert!(matches!(err, MapError::EmptyExcel { .. }));
    }

    #[test]
    fn missing_file() {
        let err = read_excel_table("/nonexistent/results.xlsx", &None).unwrap_err();
        assert!(matches!(err, MapError::OpeningExcel { .. }));
        assert_eq!(err.kind(), ErrorKind::DataFormat);
    }
}
