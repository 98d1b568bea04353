//! Tables
//!
//! The platform hands explanations back as a wide table mixing text (feature names, class
//! labels) and numbers (strengths, probabilities), and the raw dataset a user scores is usually
//! read from a CSV file with the same mix. `Table` keeps the column names and a row-major grid of
//! [`Cell`]s so that both can be carried through the pipeline without losing the row order.
use std::fmt;

use ndarray::Array1;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{Error, Result};

mod io;

/// A single value in a table
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Interpret a raw field, empty fields become `Missing` and anything parsing as a float
    /// becomes a `Number`
    pub fn parse(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Missing
        } else if let Ok(value) = trimmed.parse::<f64>() {
            Cell::Number(value)
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(x) => Some(*x),
            _ => None,
        }
    }

    /// True for missing cells and for text made only of whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Missing => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(x) => write!(f, "{}", x),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Missing => Ok(()),
        }
    }
}

impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        Cell::Number(x)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(x: Option<T>) -> Self {
        x.map(Into::into).unwrap_or(Cell::Missing)
    }
}

/// Named columns over a row-major grid of cells
///
/// Every row has exactly as many cells as there are columns, this is checked whenever a row is
/// added.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create an empty table with the given column names
    pub fn new<I, S>(columns: I) -> Table
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Table {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Create a table from column names and rows
    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Cell>>) -> Result<Table>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Table::new(columns);
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row)?;
        }

        Ok(table)
    }

    /// Append a row at the end of the table
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::RaggedRow {
                row: self.rows.len(),
                found: row.len(),
                expected: self.columns.len(),
            });
        }
        self.rows.push(row);

        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, idx: usize) -> &[Cell] {
        &self.rows[idx]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.rows[row][col]
    }

    /// Position of the first column with this name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate over the cells of a column
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Cell> + '_> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))?;

        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Read a column where every cell has to be a number
    pub fn numeric_column(&self, name: &str) -> Result<Array1<f64>> {
        self.column(name)?
            .enumerate()
            .map(|(row, cell)| {
                cell.as_f64().ok_or_else(|| Error::NotNumeric {
                    column: name.to_string(),
                    row,
                    value: cell.to_string(),
                })
            })
            .collect()
    }

    /// True if every cell of the column at `col` is either a number or missing
    ///
    /// A column without any number (only missing cells) is not considered numeric.
    pub fn is_numeric(&self, col: usize) -> bool {
        let mut any = false;
        for row in &self.rows {
            match &row[col] {
                Cell::Number(_) => any = true,
                Cell::Missing => {}
                Cell::Text(_) => return false,
            }
        }
        any
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cells() {
        assert_eq!(Cell::parse("1.5"), Cell::Number(1.5));
        assert_eq!(Cell::parse(" 3 "), Cell::Number(3.0));
        assert_eq!(Cell::parse(""), Cell::Missing);
        assert_eq!(Cell::parse("age"), Cell::Text("age".into()));
        assert!(Cell::Text("  ".into()).is_blank());
        assert!(!Cell::Number(0.0).is_blank());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let res = Table::from_rows(
            vec!["a", "b"],
            vec![vec![1.0.into(), 2.0.into()], vec![3.0.into()]],
        );
        assert!(matches!(
            res,
            Err(Error::RaggedRow {
                row: 1,
                found: 1,
                expected: 2
            })
        ));
    }

    #[test]
    fn numeric_columns() {
        let table = Table::from_rows(
            vec!["x", "name", "sparse"],
            vec![
                vec![1.0.into(), "a".into(), Cell::Missing],
                vec![2.0.into(), "b".into(), 4.0.into()],
            ],
        )
        .unwrap();

        assert_eq!(table.numeric_column("x").unwrap().to_vec(), vec![1.0, 2.0]);
        assert!(matches!(
            table.numeric_column("name"),
            Err(Error::NotNumeric { row: 0, .. })
        ));
        assert!(matches!(
            table.numeric_column("nope"),
            Err(Error::UnknownColumn(_))
        ));
        assert!(table.is_numeric(0));
        assert!(!table.is_numeric(1));
        assert!(table.is_numeric(2));
    }
}
