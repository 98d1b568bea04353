use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};

use super::{Cell, Table};
use crate::error::Result;

impl Table {
    /// Read a table from CSV with a header line
    pub fn from_csv<R: Read>(reader: R) -> Result<Table> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let mut table = Table::new(reader.headers()?.iter());
        for record in reader.records() {
            let row = record?.iter().map(Cell::parse).collect();
            table.push_row(row)?;
        }

        Ok(table)
    }

    /// Read a table from a CSV file with a header line
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Table> {
        let file = File::open(path)?;
        Table::from_csv(file)
    }

    /// Write the table as CSV, missing cells become empty fields
    pub fn to_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = WriterBuilder::new().from_writer(writer);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Serialize the table to CSV bytes, used when uploading a dataset
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.to_csv(&mut buf)?;

        Ok(buf)
    }
}
