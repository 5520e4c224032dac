//! Output formatting for recipes and command results
//!
//! Everything the binary prints on stdout goes through [`OutputFormatter`] so the
//! JSON and YAML renderings stay consistent across subcommands.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON, the form submitted to the scheduler
    Json,
    Yaml,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(value).context("Failed to serialize output to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(value).context("Failed to serialize output to YAML")
            }
        }
    }

    /// Formats `value` and writes it to `path`, or stdout when no path is given
    pub fn write<T: Serialize>(&self, value: &T, path: Option<&Path>) -> Result<()> {
        let rendered = self.format(value)?;
        match path {
            Some(path) => fs::write(path, rendered)
                .with_context(|| format!("Failed to write output to {}", path.display())),
            None => {
                println!("{}", rendered.trim_end());
                Ok(())
            }
        }
    }
}
