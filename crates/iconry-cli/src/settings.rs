//! Runtime settings: an optional TOML file layered under `ICONRY_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use iconry_core::code::CodeRange;
use serde::Deserialize;

pub const DEFAULT_PROBLEM_CODES_URL: &str =
  "https://raw.githubusercontent.com/YMFE/yicon-problem-code/master/index.json";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// SQLite database file.
  #[serde(default = "default_database")]
  pub database:          PathBuf,
  #[serde(default = "default_code_start")]
  pub code_start:        u32,
  #[serde(default = "default_code_end")]
  pub code_end:          u32,
  /// Where the shared list of misrendering codes is published.
  #[serde(default = "default_problem_codes_url")]
  pub problem_codes_url: String,
}

fn default_database() -> PathBuf { PathBuf::from("iconry.db") }

fn default_code_start() -> u32 { CodeRange::PRIVATE_USE.start() }

fn default_code_end() -> u32 { CodeRange::PRIVATE_USE.end() }

fn default_problem_codes_url() -> String { DEFAULT_PROBLEM_CODES_URL.to_string() }

impl Settings {
  /// Read `path` (if it exists), then the environment.
  pub fn load(path: &Path) -> Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(config::Environment::with_prefix("ICONRY"))
      .build()
      .with_context(|| format!("failed to read settings from {}", path.display()))?
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  pub fn code_range(&self) -> Result<CodeRange> {
    CodeRange::new(self.code_start, self.code_end).with_context(|| {
      format!(
        "invalid code range {:#x}..={:#x}",
        self.code_start, self.code_end
      )
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let settings = Settings::load(Path::new("does-not-exist.toml")).unwrap();
    assert_eq!(settings.problem_codes_url, DEFAULT_PROBLEM_CODES_URL);
    assert_eq!(settings.code_range().unwrap(), CodeRange::PRIVATE_USE);
  }

  #[test]
  fn inverted_range_is_rejected() {
    let settings = Settings {
      database:          default_database(),
      code_start:        0xF000,
      code_end:          0xE000,
      problem_codes_url: default_problem_codes_url(),
    };
    assert!(settings.code_range().is_err());
  }
}
