//! The code space: the bounded range of font codepoints icons are assigned
//! from, and the allocator that hands out free codes.
//!
//! Allocation is positional. Given a snapshot of occupied codes, the i-th
//! icon of a batch receives the i-th smallest free code, so the same snapshot
//! and the same batch order always produce the same assignment. Callers must
//! hold the store's allocation lock between reading the snapshot and writing
//! the assigned codes.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Range ───────────────────────────────────────────────────────────────────

/// An inclusive range of codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRange {
  start: u32,
  end:   u32,
}

impl CodeRange {
  /// The Unicode Private Use Area of the Basic Multilingual Plane.
  pub const PRIVATE_USE: CodeRange = CodeRange { start: 0xE000, end: 0xF8FF };

  pub fn new(start: u32, end: u32) -> Result<Self> {
    if start > end {
      return Err(Error::InvalidCodeRange { start, end });
    }
    Ok(Self { start, end })
  }

  pub fn start(&self) -> u32 { self.start }

  pub fn end(&self) -> u32 { self.end }

  pub fn contains(&self, code: u32) -> bool {
    (self.start..=self.end).contains(&code)
  }

  /// Number of codes in the range.
  pub fn len(&self) -> usize { (self.end - self.start) as usize + 1 }

  pub fn is_empty(&self) -> bool { false }

  pub fn ensure_contains(&self, code: u32) -> Result<()> {
    if self.contains(code) {
      Ok(())
    } else {
      Err(Error::CodeOutOfRange { code, range: *self })
    }
  }
}

impl Default for CodeRange {
  fn default() -> Self { Self::PRIVATE_USE }
}

impl fmt::Display for CodeRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{:#x}, {:#x}]", self.start, self.end)
  }
}

// ─── Allocator ───────────────────────────────────────────────────────────────

/// The free codes of a range at one point in time.
#[derive(Debug, Clone)]
pub struct CodeSpace {
  range: CodeRange,
  free:  Vec<u32>,
}

impl CodeSpace {
  /// Build the free list from the codes currently held by RESOLVED and
  /// DISABLED icons. Occupied codes outside `range` are ignored.
  pub fn new(range: CodeRange, occupied: impl IntoIterator<Item = u32>) -> Self {
    let taken: BTreeSet<u32> = occupied.into_iter().collect();
    let free = (range.start..=range.end)
      .filter(|code| !taken.contains(code))
      .collect();
    Self { range, free }
  }

  pub fn range(&self) -> CodeRange { self.range }

  /// Free codes in ascending order.
  pub fn free(&self) -> &[u32] { &self.free }

  pub fn available(&self) -> usize { self.free.len() }

  /// The `count` smallest free codes. Fails without assigning anything when
  /// fewer than `count` codes are free.
  pub fn allocate(&self, count: usize) -> Result<Vec<u32>> {
    if count > self.free.len() {
      return Err(Error::CodeSpaceExhausted {
        requested: count,
        available: self.free.len(),
      });
    }
    Ok(self.free[..count].to_vec())
  }

  /// Pair each item with the free code at the same position.
  pub fn assign<T>(&self, items: Vec<T>) -> Result<Vec<(T, u32)>> {
    let codes = self.allocate(items.len())?;
    Ok(items.into_iter().zip(codes).collect())
  }
}

// ─── Formatting ──────────────────────────────────────────────────────────────

/// Lower-case hexadecimal form used inside font class names.
pub fn to_hex(code: u32) -> String { format!("{code:x}") }

/// The HTML character reference of a code, e.g. `&#xe61a;`.
pub fn to_entity(code: u32) -> String { format!("&#x{code:x};") }

/// Parse a character reference of the form `&#xEXXX;` or `&#xFXXX;` (case
/// insensitive). Anything else is not a code query.
pub fn parse_entity(query: &str) -> Option<u32> {
  let lower = query.trim().to_ascii_lowercase();
  let hex = lower.strip_prefix("&#x")?.strip_suffix(';')?;
  let first = hex.chars().next()?;
  if hex.len() != 4
    || !matches!(first, 'e' | 'f')
    || !hex.chars().all(|c| c.is_ascii_hexdigit())
  {
    return None;
  }
  u32::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn range(start: u32, end: u32) -> CodeRange { CodeRange::new(start, end).unwrap() }

  #[test]
  fn free_codes_skip_occupied() {
    let space = CodeSpace::new(range(5, 9), [6, 8]);
    assert_eq!(space.free(), &[5, 7, 9]);
  }

  #[test]
  fn occupied_codes_outside_range_are_ignored() {
    let space = CodeSpace::new(range(1, 3), [0, 2, 99]);
    assert_eq!(space.free(), &[1, 3]);
  }

  #[test]
  fn assignment_is_positional_and_deterministic() {
    let space = CodeSpace::new(range(5, 9), [6, 8]);
    let first = space.assign(vec!["a", "b"]).unwrap();
    let second = space.assign(vec!["a", "b"]).unwrap();
    assert_eq!(first, vec![("a", 5), ("b", 7)]);
    assert_eq!(first, second);
  }

  #[test]
  fn exhaustion_assigns_nothing() {
    let space = CodeSpace::new(range(5, 9), [6, 8]);
    let err = space.assign(vec![1, 2, 3, 4]).unwrap_err();
    assert!(matches!(
      err,
      Error::CodeSpaceExhausted { requested: 4, available: 3 }
    ));
  }

  #[test]
  fn empty_batch_needs_no_codes() {
    let space = CodeSpace::new(range(1, 1), [1]);
    assert!(space.allocate(0).unwrap().is_empty());
  }

  #[test]
  fn inverted_range_is_rejected() {
    assert!(matches!(
      CodeRange::new(10, 2),
      Err(Error::InvalidCodeRange { start: 10, end: 2 })
    ));
  }

  #[test]
  fn private_use_range_bounds() {
    let r = CodeRange::default();
    assert_eq!(r.len(), 0xF8FF - 0xE000 + 1);
    assert!(r.contains(0xE000));
    assert!(!r.contains(0xF900));
  }

  #[test]
  fn entity_parsing() {
    assert_eq!(parse_entity("&#xe61a;"), Some(0xE61A));
    assert_eq!(parse_entity("&#XF000;"), Some(0xF000));
    assert_eq!(parse_entity("&#xa61a;"), None);
    assert_eq!(parse_entity("&#xe61;"), None);
    assert_eq!(parse_entity("arrow"), None);
    assert_eq!(to_entity(0xE61A), "&#xe61a;");
    assert_eq!(to_hex(0xE61A), "e61a");
  }
}
