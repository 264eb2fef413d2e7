//! Font class names.
//!
//! A resolved icon's font class is `<repo alias>-<slug><hex code><suffix>`,
//! lower-cased. The slug comes from a [`Transliterate`] implementation; the
//! default one keeps the ASCII word characters of the name and drops the rest.
//! Deployments with non-Latin icon names plug in a real transliterator.

use crate::code::to_hex;

/// Turns a display name into an ASCII slug.
pub trait Transliterate: Send + Sync {
  fn to_ascii_slug(&self, name: &str) -> String;
}

/// Keeps ASCII letters, digits and `_`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiSlug;

impl Transliterate for AsciiSlug {
  fn to_ascii_slug(&self, name: &str) -> String {
    name
      .chars()
      .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
      .collect()
  }
}

/// Build the font class of an icon that has just been assigned `code`.
pub fn font_class(
  transliterator: &dyn Transliterate,
  repo_alias: &str,
  name: &str,
  code: u32,
  suffix: Option<&str>,
) -> String {
  let slug: String = transliterator
    .to_ascii_slug(name)
    .chars()
    .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
    .collect();
  format!("{repo_alias}-{slug}{}{}", to_hex(code), suffix.unwrap_or_default())
    .to_lowercase()
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Fixed(&'static str);

  impl Transliterate for Fixed {
    fn to_ascii_slug(&self, _: &str) -> String { self.0.to_owned() }
  }

  #[test]
  fn builds_lowercase_class() {
    let class = font_class(&AsciiSlug, "Fin", "Arrow-Left", 0xE61A, Some("Bold"));
    assert_eq!(class, "fin-arrowlefte61abold");
  }

  #[test]
  fn non_ascii_names_fall_back_to_code() {
    assert_eq!(font_class(&AsciiSlug, "fin", "箭头", 0xE000, None), "fin-e000");
  }

  #[test]
  fn transliterator_output_is_sanitised() {
    let class = font_class(&Fixed("jian tou!"), "fin", "箭头", 0xE001, None);
    assert_eq!(class, "fin-jiantoue001");
  }
}
