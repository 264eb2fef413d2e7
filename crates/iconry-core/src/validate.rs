//! Format rules for user-supplied text.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const NAME_MAX_CHARS: usize = 20;
pub const TAGS_MAX_CHARS: usize = 500;

pub const MOBILE_MAX_CHARS: usize = 100;
pub const OS_MAX_CHARS: usize = 100;
pub const OTHER_MAX_CHARS: usize = 2000;

fn is_name_char(c: char) -> bool { c.is_alphanumeric() || c == '-' || c == '_' }

/// An icon name is 1–20 letters (any script), digits, `-` or `_`.
pub fn validate_name(name: &str) -> Result<()> {
  let len = name.chars().count();
  if len == 0 || len > NAME_MAX_CHARS {
    return Err(Error::InvalidName {
      name: name.to_owned(),
      rule: "must be 1 to 20 characters long",
    });
  }
  if !name.chars().all(is_name_char) {
    return Err(Error::InvalidName {
      name: name.to_owned(),
      rule: "may only contain letters, digits, '-' and '_'",
    });
  }
  Ok(())
}

/// Tags are a comma-separated list (ASCII or full-width comma) of 1–500
/// characters in total; every tag is non-empty and uses the name alphabet.
pub fn validate_tags(tags: &str) -> Result<()> {
  let len = tags.chars().count();
  if len == 0 || len > TAGS_MAX_CHARS {
    return Err(Error::InvalidTags {
      tags: tags.to_owned(),
      rule: "must be 1 to 500 characters long",
    });
  }
  for tag in split_tags(tags) {
    if tag.is_empty() {
      return Err(Error::InvalidTags {
        tags: tags.to_owned(),
        rule: "must not contain empty tags",
      });
    }
    if !tag.chars().all(is_name_char) {
      return Err(Error::InvalidTags {
        tags: tags.to_owned(),
        rule: "tags may only contain letters, digits, '-' and '_'",
      });
    }
  }
  Ok(())
}

pub fn split_tags(tags: &str) -> impl Iterator<Item = &str> {
  tags.split([',', '，'])
}

// ─── Disabled-code descriptions ──────────────────────────────────────────────

/// Why a code was disabled: the devices and systems it misrenders on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDescription {
  #[serde(default)]
  pub mobile: String,
  #[serde(default)]
  pub os:     String,
  #[serde(default)]
  pub other:  String,
}

impl CodeDescription {
  pub fn validate(&self) -> Result<()> {
    check_len("mobile", &self.mobile, MOBILE_MAX_CHARS)?;
    check_len("os", &self.os, OS_MAX_CHARS)?;
    check_len("other", &self.other, OTHER_MAX_CHARS)
  }

  pub fn to_json(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }

  /// Parse a stored or submitted description.
  pub fn from_json(raw: &str) -> Result<Self> {
    serde_json::from_str(raw).map_err(|e| Error::InvalidDescription(e.to_string()))
  }
}

/// Limits are exclusive: a field must be shorter than `limit` characters.
fn check_len(field: &'static str, value: &str, limit: usize) -> Result<()> {
  let len = value.chars().count();
  if len >= limit {
    return Err(Error::FieldTooLong { field, len, limit });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names() {
    validate_name("arrow-left_2").unwrap();
    validate_name("箭头").unwrap();
    assert!(validate_name("").is_err());
    assert!(validate_name("has space").is_err());
    assert!(validate_name("a".repeat(21).as_str()).is_err());
    validate_name("中".repeat(20).as_str()).unwrap();
  }

  #[test]
  fn tags() {
    validate_tags("arrow,left，方向").unwrap();
    assert!(validate_tags("").is_err());
    assert!(validate_tags("arrow,,left").is_err());
    assert!(validate_tags("arrow;left").is_err());
  }

  #[test]
  fn description_limits_are_exclusive() {
    let ok = CodeDescription {
      mobile: "m".repeat(99),
      os:     "ios".into(),
      other:  String::new(),
    };
    ok.validate().unwrap();

    let too_long = CodeDescription { mobile: "m".repeat(100), ..ok.clone() };
    assert!(matches!(
      too_long.validate(),
      Err(Error::FieldTooLong { field: "mobile", len: 100, limit: 100 })
    ));

    let other = CodeDescription { other: "x".repeat(2000), ..ok };
    assert!(matches!(
      other.validate(),
      Err(Error::FieldTooLong { field: "other", .. })
    ));
  }

  #[test]
  fn description_json_defaults_missing_fields() {
    let d = CodeDescription::from_json(r#"{"os":"android 4"}"#).unwrap();
    assert_eq!(d.os, "android 4");
    assert!(d.mobile.is_empty());
    assert!(CodeDescription::from_json("not json").is_err());
  }
}
