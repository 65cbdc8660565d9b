//! JSON batch files
//!
//! Each stage writes its batch as a dated JSON array so the next stage can
//! run from the file alone:
//! - `products_list_<date>.json` holds an array of URL strings
//! - `products_data_<date>.json` holds an array of flat variant objects

use crate::crawler::VariantRecord;
use crate::output::traits::{BatchSink, OutputError, OutputResult};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes and reads dated JSON batches in one directory
#[derive(Debug, Clone)]
pub struct JsonBatchStore {
    directory: PathBuf,
    date: NaiveDate,
}

impl JsonBatchStore {
    /// Creates a store for today's batches
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self::for_date(directory, chrono::Local::now().date_naive())
    }

    pub fn for_date(directory: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self {
            directory: directory.into(),
            date,
        }
    }

    pub fn product_urls_path(&self) -> PathBuf {
        self.directory.join(format!("products_list_{}.json", self.date))
    }

    pub fn variants_path(&self) -> PathBuf {
        self.directory.join(format!("products_data_{}.json", self.date))
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> OutputResult<()> {
        std::fs::create_dir_all(&self.directory).map_err(|e| OutputError::io(&self.directory, e))?;

        let file = File::create(path).map_err(|e| OutputError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, value)?;
        writer.flush().map_err(|e| OutputError::io(path, e))?;

        tracing::info!(path = %path.display(), "Data saved into the json file");
        Ok(())
    }
}

impl BatchSink for JsonBatchStore {
    fn write_product_urls(&mut self, urls: &[String]) -> OutputResult<()> {
        let path = self.product_urls_path();
        self.write_json(&path, urls)
    }

    fn write_variants(&mut self, records: &[VariantRecord]) -> OutputResult<()> {
        let path = self.variants_path();
        self.write_json(&path, records)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> OutputResult<T> {
    let file = File::open(path).map_err(|e| OutputError::io(path, e))?;
    let value = serde_json::from_reader(BufReader::new(file))?;
    tracing::info!(path = %path.display(), "Read the json file");
    Ok(value)
}

/// Reads a product URL batch
pub fn read_product_urls(path: &Path) -> OutputResult<Vec<String>> {
    read_json(path)
}

/// Reads a variant record batch
pub fn read_variants(path: &Path) -> OutputResult<Vec<VariantRecord>> {
    read_json(path)
}
