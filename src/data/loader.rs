//! CSV loading for the command-line front end

use crate::error::{BurnwiseError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Reads session tables from delimited text files
#[derive(Debug, Clone)]
pub struct DataLoader {
    delimiter: u8,
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            infer_schema_length: 100,
        }
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| BurnwiseError::DataError(format!("{}: {}", path.display(), e)))?;

        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()?;

        tracing::info!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            "Loaded dataset"
        );
        Ok(df)
    }
}
