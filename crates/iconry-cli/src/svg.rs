//! Reading SVG files into upload payloads.
//!
//! Only the `d` attributes of `<path>` elements are kept; they are joined in
//! document order into the single outline the store records.

use std::path::Path;

use anyhow::{Context as _, Result, bail};
use iconry_core::store::UploadedSvg;
use quick_xml::{Reader, events::Event};

/// Concatenate the outlines of every `<path>` in `svg`.
pub fn extract_path(svg: &str) -> Result<String> {
  let mut reader = Reader::from_str(svg);
  reader.config_mut().trim_text(true);

  let mut outlines: Vec<String> = Vec::new();
  loop {
    match reader.read_event().context("malformed SVG")? {
      Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"path" => {
        if let Some(d) = e.try_get_attribute("d").context("malformed path attribute")? {
          let d = d.unescape_value().context("malformed path data")?;
          let d = d.trim();
          if !d.is_empty() {
            outlines.push(d.to_string());
          }
        }
      }
      Event::Eof => break,
      _ => {}
    }
  }

  if outlines.is_empty() {
    bail!("SVG contains no path data");
  }
  Ok(outlines.join(" "))
}

/// Load `file` as an upload named after its stem.
pub fn load(file: &Path) -> Result<UploadedSvg> {
  let raw = std::fs::read_to_string(file)
    .with_context(|| format!("reading {}", file.display()))?;
  let name = file
    .file_stem()
    .and_then(|s| s.to_str())
    .with_context(|| format!("{} has no usable file name", file.display()))?
    .to_string();
  let path = extract_path(&raw).with_context(|| format!("parsing {}", file.display()))?;
  Ok(UploadedSvg { name, path, svg: Some(raw) })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn joins_paths_in_document_order() {
    let svg = r#"<?xml version="1.0"?>
      <svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1024 1024">
        <g><path d="M0 0L10 10z"/></g>
        <path fill="red" d=" M5 5h2v2z "></path>
      </svg>"#;
    assert_eq!(extract_path(svg).unwrap(), "M0 0L10 10z M5 5h2v2z");
  }

  #[test]
  fn namespaced_paths_are_found() {
    let svg = r#"<svg:svg xmlns:svg="http://www.w3.org/2000/svg"><svg:path d="M1 1z"/></svg:svg>"#;
    assert_eq!(extract_path(svg).unwrap(), "M1 1z");
  }

  #[test]
  fn svg_without_paths_is_refused() {
    let svg = r#"<svg><circle cx="5" cy="5" r="4"/><path fill="none"/></svg>"#;
    assert!(extract_path(svg).is_err());
  }

  #[test]
  fn malformed_svg_is_refused() {
    assert!(extract_path("<svg><path d=\"M0 0\"></svg>").is_err());
  }

  #[test]
  fn load_names_upload_after_file_stem() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("arrow-left.svg");
    std::fs::write(&file, r#"<svg><path d="M0 0z"/></svg>"#).unwrap();

    let upload = load(&file).unwrap();

    assert_eq!(upload.name, "arrow-left");
    assert_eq!(upload.path, "M0 0z");
    assert!(upload.svg.is_some());
  }
}
