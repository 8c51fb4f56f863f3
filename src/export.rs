use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::config::AnalysisConfig;
use crate::error::Result;

/// Where report files go. Passed in explicitly; nothing here is global.
#[derive(Debug, Clone)]
pub struct OutputLocations {
    pub table_folder: PathBuf,
    pub plot_folder: PathBuf,
}

impl OutputLocations {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        OutputLocations {
            table_folder: config.table_folder.clone(),
            plot_folder: config.plot_folder.clone(),
        }
    }

    /// Tabular output, e.g. the title table.
    pub fn write_table<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        write_json(&self.table_folder, name, value)
    }

    /// Numeric input for a chart.
    pub fn write_plot_data<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        write_json(&self.plot_folder, name, value)
    }
}

fn write_json<T: Serialize>(folder: &Path, name: &str, value: &T) -> Result<PathBuf> {
    fs::create_dir_all(folder)?;
    let path = folder.join(format!("{}.json", name));

    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;

    info!("Saved {}", path.display());
    Ok(path)
}
