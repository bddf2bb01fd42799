//! CSV input/output for batch analysis and per-run summaries.
//!
//! Input tables carry at least a `WKT` and a `name` column (matched
//! case-insensitively after trimming); every other column is passed through
//! to the output untouched, followed by one count column per category.

use hashbrown::HashSet;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::analyzer::PolygonReport;
use crate::error::{Error, Result};
use crate::models::{Category, CategoryCounts};
use crate::pip::SearchPolygon;

/// One input row: the raw record plus its polygon fields
#[derive(Debug, Clone)]
pub struct PolygonRow {
    pub record: Vec<String>,
    pub name: String,
    pub wkt: String,
}

impl PolygonRow {
    pub fn polygon(&self) -> SearchPolygon {
        SearchPolygon::from_wkt(self.name.clone(), &self.wkt)
    }
}

/// Parsed input table
#[derive(Debug, Clone)]
pub struct PolygonTable {
    pub headers: Vec<String>,
    pub rows: Vec<PolygonRow>,
}

fn find_column(headers: &[String], wanted: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(wanted))
}

fn missing_column(column: &str, headers: &[String]) -> Error {
    Error::MissingColumn {
        column: column.to_string(),
        available: headers.join(", "),
    }
}

impl PolygonTable {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

        let wkt_idx = find_column(&headers, "wkt").ok_or_else(|| missing_column("WKT", &headers))?;
        let name_idx = find_column(&headers, "name").ok_or_else(|| missing_column("name", &headers))?;

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let mut fields: Vec<String> = record.iter().map(str::to_string).collect();
            fields.resize(headers.len(), String::new());

            rows.push(PolygonRow {
                name: fields[name_idx].trim().to_string(),
                wkt: fields[wkt_idx].trim().to_string(),
                record: fields,
            });
        }

        if rows.is_empty() {
            return Err(Error::InvalidInput("CSV file has no data rows".to_string()));
        }
        if rows.iter().all(|r| r.wkt.is_empty()) {
            return Err(Error::InvalidInput("WKT column is empty".to_string()));
        }
        if rows.iter().all(|r| r.name.is_empty()) {
            return Err(Error::InvalidInput("name column is empty".to_string()));
        }

        debug!("Read {} polygon rows ({} columns)", rows.len(), headers.len());
        Ok(Self { headers, rows })
    }

    /// Output header: input columns followed by one count column per category
    pub fn output_headers(&self) -> Vec<String> {
        let mut headers = self.headers.clone();
        headers.extend(Category::all().iter().map(|c| c.column_name().to_string()));
        headers
    }
}

/// Names already present in a previous output file
pub fn processed_names<P: AsRef<Path>>(path: P) -> Result<HashSet<String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(HashSet::new());
    }

    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let name_idx = find_column(&headers, "name").ok_or_else(|| missing_column("name", &headers))?;

    let mut names = HashSet::new();
    for record in rdr.records() {
        if let Some(name) = record?.get(name_idx) {
            names.insert(name.trim().to_string());
        }
    }
    Ok(names)
}

/// Streams result rows, flushing after each one so an interrupted run
/// leaves a usable file behind
pub struct ResultWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl ResultWriter<File> {
    /// Create (truncating) `path` and write the header row
    pub fn create<P: AsRef<Path>>(path: P, headers: &[String]) -> Result<Self> {
        let mut writer = Self::from_writer(File::create(path)?);
        writer.writer.write_record(headers)?;
        writer.writer.flush()?;
        Ok(writer)
    }

    /// Append to `path`, writing the header only if the file is new or empty
    pub fn append<P: AsRef<Path>>(path: P, headers: &[String]) -> Result<Self> {
        let path = path.as_ref();
        let fresh = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let mut writer = Self::from_writer(file);
        if fresh {
            writer.writer.write_record(headers)?;
            writer.writer.flush()?;
        } else {
            info!("Appending to existing results in {}", path.display());
        }
        Ok(writer)
    }
}

impl<W: Write> ResultWriter<W> {
    pub fn from_writer(inner: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().flexible(true).from_writer(inner),
        }
    }

    pub fn write_header(&mut self, headers: &[String]) -> Result<()> {
        self.writer.write_record(headers)?;
        Ok(())
    }

    pub fn write_row(&mut self, row: &PolygonRow, counts: &CategoryCounts) -> Result<()> {
        let mut record = row.record.clone();
        record.extend(Category::all().iter().map(|c| counts.get(*c).to_string()));
        self.writer.write_record(&record)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))
    }
}

/// Render a full result table in memory
pub fn results_to_csv(table: &PolygonTable, counts: &[CategoryCounts]) -> Result<String> {
    let mut writer = ResultWriter::from_writer(Vec::new());
    writer.write_header(&table.output_headers())?;
    for (row, row_counts) in table.rows.iter().zip(counts) {
        writer.write_row(row, row_counts)?;
    }
    let bytes = writer.into_inner()?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidInput(e.to_string()))
}

/// Single-row `WKT,name` table, ready to feed back in as analysis input
pub fn polygon_csv(wkt: &str, name: &str) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["WKT", "name"])?;
    writer.write_record([wkt, name])?;
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidInput(e.to_string()))
}

/// Mean count per polygon for each category
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryAverages {
    pub eateries: f64,
    pub offices: f64,
    pub apartments: f64,
    pub pgs: f64,
    pub gyms: f64,
    pub salons: f64,
}

impl CategoryAverages {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Eatery => self.eateries,
            Category::Office => self.offices,
            Category::Apartment => self.apartments,
            Category::Pg => self.pgs,
            Category::Gym => self.gyms,
            Category::Salon => self.salons,
        }
    }
}

/// Totals and averages over a batch of polygons
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_polygons: usize,
    pub totals: CategoryCounts,
    pub averages: CategoryAverages,
}

impl Summary {
    pub fn from_counts<'a>(counts: impl IntoIterator<Item = &'a CategoryCounts>) -> Self {
        let mut totals = CategoryCounts::default();
        let mut n = 0usize;
        for c in counts {
            n += 1;
            for category in Category::all() {
                totals.set(*category, totals.get(*category) + c.get(*category));
            }
        }

        let avg = |category: Category| {
            if n == 0 {
                0.0
            } else {
                totals.get(category) as f64 / n as f64
            }
        };

        Self {
            total_polygons: n,
            totals,
            averages: CategoryAverages {
                eateries: avg(Category::Eatery),
                offices: avg(Category::Office),
                apartments: avg(Category::Apartment),
                pgs: avg(Category::Pg),
                gyms: avg(Category::Gym),
                salons: avg(Category::Salon),
            },
        }
    }

    pub fn from_reports(reports: &[PolygonReport]) -> Self {
        Self::from_counts(reports.iter().map(|r| &r.counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const INPUT: &str = "id, Name ,wkt,zone\n\
        1,Area_1,\"POLYGON((77.1 28.6, 77.2 28.6, 77.2 28.7, 77.1 28.6))\",north\n\
        2,Area_2,\"POLYGON((77.3 28.6, 77.4 28.6, 77.4 28.7, 77.3 28.6))\",south\n";

    fn counts(eateries: usize, gyms: usize) -> CategoryCounts {
        CategoryCounts {
            eateries,
            gyms,
            ..CategoryCounts::default()
        }
    }

    #[test]
    fn test_columns_found_case_insensitively() {
        let table = PolygonTable::from_reader(INPUT.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["id", "Name", "wkt", "zone"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].name, "Area_1");
        assert!(table.rows[1].wkt.starts_with("POLYGON"));
        assert!(table.rows[0].polygon().is_valid());
    }

    #[test]
    fn test_missing_column_lists_available() {
        let err = PolygonTable::from_reader("id,geometry\n1,x\n".as_bytes()).unwrap_err();
        match err {
            Error::MissingColumn { column, available } => {
                assert_eq!(column, "WKT");
                assert_eq!(available, "id, geometry");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_tables_rejected() {
        assert!(PolygonTable::from_reader("WKT,name\n".as_bytes()).is_err());
        assert!(PolygonTable::from_reader("WKT,name\n,a\n,b\n".as_bytes()).is_err());
    }

    #[test]
    fn test_results_csv_appends_count_columns() {
        let table = PolygonTable::from_reader(INPUT.as_bytes()).unwrap();
        let csv = results_to_csv(&table, &[counts(3, 1), counts(0, 2)]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,Name,wkt,zone,no. of eateries,no. of offices,no. of apartments,no. of PGs,no. of gyms,no. of salons"
        );
        assert!(lines.next().unwrap().ends_with(",north,3,0,0,0,1,0"));
        assert!(lines.next().unwrap().ends_with(",south,0,0,0,0,2,0"));
    }

    #[test]
    fn test_resume_appends_and_reports_processed() {
        let table = PolygonTable::from_reader(INPUT.as_bytes()).unwrap();
        let headers = table.output_headers();
        let out = NamedTempFile::new().unwrap();

        // empty file: header gets written
        {
            let mut writer = ResultWriter::append(out.path(), &headers).unwrap();
            writer.write_row(&table.rows[0], &counts(1, 0)).unwrap();
        }
        let names = processed_names(out.path()).unwrap();
        assert_eq!(names.len(), 1);
        assert!(names.contains("Area_1"));

        {
            let mut writer = ResultWriter::append(out.path(), &headers).unwrap();
            writer.write_row(&table.rows[1], &counts(0, 1)).unwrap();
        }
        let names = processed_names(out.path()).unwrap();
        assert_eq!(names.len(), 2);

        let content = std::fs::read_to_string(out.path()).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert_eq!(content.matches("no. of salons").count(), 1);
    }

    #[test]
    fn test_processed_names_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(processed_names(dir.path().join("none.csv")).unwrap().is_empty());
    }

    #[test]
    fn test_create_truncates() {
        let mut out = NamedTempFile::new().unwrap();
        writeln!(out, "stale,content").unwrap();
        let headers = vec!["name".to_string(), "WKT".to_string()];
        drop(ResultWriter::create(out.path(), &headers).unwrap());
        assert_eq!(std::fs::read_to_string(out.path()).unwrap(), "name,WKT\n");
    }

    #[test]
    fn test_polygon_csv_feeds_back_as_input() {
        let wkt = "POLYGON((77.1 28.6, 77.2 28.6, 77.2 28.7, 77.1 28.6))";
        let csv = polygon_csv(wkt, "iso_10min").unwrap();
        assert!(csv.starts_with("WKT,name\n\"POLYGON("));

        let table = PolygonTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.rows[0].name, "iso_10min");
        assert_eq!(table.rows[0].wkt, wkt);
    }

    #[test]
    fn test_summary_totals_and_averages() {
        let summary = Summary::from_counts(&[counts(4, 1), counts(2, 0)]);
        assert_eq!(summary.total_polygons, 2);
        assert_eq!(summary.totals.eateries, 6);
        assert_eq!(summary.totals.gyms, 1);
        assert_eq!(summary.averages.eateries, 3.0);
        assert_eq!(summary.averages.gyms, 0.5);
        assert_eq!(summary.averages.salons, 0.0);

        let empty = Summary::from_counts(&[]);
        assert_eq!(empty.total_polygons, 0);
        assert_eq!(empty.averages.eateries, 0.0);
    }
}
