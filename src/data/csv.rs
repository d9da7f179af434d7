//! CSV loading for [`DataMatrix`].
//!
//! Header row required, comma-separated. Empty cells and the literal
//! tokens `NA`, `N/A`, `?` are missing values; every other cell must
//! parse as an f32. A row whose cell count differs from the header is
//! fatal, as is any unparseable cell.

use std::fs::File;
use std::io::{BufRead, BufReader};

use super::{DataMatrix, MISSING_VALUE};
use crate::error::{BoostError, Result};

fn parse_cell(cell: &str, row: usize, col: usize) -> Result<f32> {
    if cell.is_empty() || cell == "NA" || cell == "N/A" || cell == "?" {
        return Ok(MISSING_VALUE);
    }
    cell.trim().parse::<f32>().map_err(|e| BoostError::Parse {
        row,
        col,
        message: format!("cannot parse {cell:?} as a number: {e}"),
    })
}

pub fn load_csv(path: &str, label_column: i32) -> Result<DataMatrix> {
    let file = File::open(path)?;
    let mut lines = BufReader::new(file).lines();

    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| BoostError::Parse {
            row: 0,
            col: 0,
            message: format!("{path}: empty file, header row required"),
        })?;
    let header_cols = header.trim_end_matches('\r').split(',').count();

    let has_label = label_column >= 0;
    if has_label && label_column as usize >= header_cols {
        return Err(BoostError::ShapeMismatch(format!(
            "label column {label_column} out of range for {header_cols} columns"
        )));
    }
    let n_cols = if has_label {
        header_cols - 1
    } else {
        header_cols
    };

    let mut features: Vec<f32> = Vec::new();
    let mut labels: Vec<f32> = Vec::new();
    let mut n_rows = 0usize;

    for line in lines {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let mut row_cols = 0usize;
        for (col, cell) in line.split(',').enumerate() {
            let value = parse_cell(cell, n_rows + 1, col)?;
            if has_label && col == label_column as usize {
                labels.push(value);
            } else {
                features.push(value);
            }
            row_cols += 1;
        }

        if row_cols != header_cols {
            return Err(BoostError::ShapeMismatch(format!(
                "row {} has {} columns, header has {}",
                n_rows + 1,
                row_cols,
                header_cols
            )));
        }
        n_rows += 1;
    }

    DataMatrix::from_parts(features, labels, n_rows, n_cols)
}
