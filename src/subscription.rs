use std::fmt;

use super::event::{self, EventKind, UnknownEvent};

/// The set of events we ask the server for and act upon.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Subscription(u16);

impl Subscription {
  pub fn all() -> Self {
    Self(event::all().iter().fold(0, |mask, e| mask | e.mask_bit))
  }

  /// No tokens selects every event. One unknown token rejects the whole list.
  pub fn build<I, S>(tokens: I) -> Result<Self, UnknownEvent>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut mask = None;
    for token in tokens {
      let e = event::lookup_by_name(token.as_ref())?;
      mask = Some(mask.unwrap_or(0) | e.mask_bit);
    }
    Ok(mask.map(Self).unwrap_or_else(Self::all))
  }

  pub fn contains(&self, kind: EventKind) -> bool {
    self.0 & kind.mask_bit() != 0
  }

  pub fn bits(&self) -> u16 {
    self.0
  }
}

impl fmt::Display for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let names: Vec<_> = (0..u16::BITS)
      .filter_map(|i| event::lookup_by_bit(self.0 & (1 << i)))
      .map(|e| e.name)
      .collect();
    write!(f, "{}", names.join(","))
  }
}
