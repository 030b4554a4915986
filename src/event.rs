use std::fmt;

use thiserror::Error;

/// The closed set of RandR notification kinds we know how to publish.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum EventKind {
  ScreenChange = 0,
  CrtcChange = 1,
  OutputChange = 2,
  OutputProperty = 3,
  ProviderChange = 4,
  ProviderProperty = 5,
  ResourceChange = 6,
}

impl EventKind {
  pub fn descriptor(self) -> &'static EventDescriptor {
    &EVENTS[self as usize]
  }

  pub fn name(self) -> &'static str {
    self.descriptor().name
  }

  pub fn mask_bit(self) -> u16 {
    self.descriptor().mask_bit
  }
}

impl fmt::Display for EventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// How a field value becomes the text of its environment variable.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Format {
  /// decimal, signed or unsigned according to the field's width
  Dec,
  /// lowercase hexadecimal with a `0x` prefix
  Hex,
  /// an atom, published as its name
  Atom,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Field {
  pub name: &'static str,
  pub format: Format,
}

#[derive(Debug, PartialEq, Eq)]
pub struct EventDescriptor {
  pub kind: EventKind,
  pub mask_bit: u16,
  pub name: &'static str,
  pub fields: &'static [Field],
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown event: {0}")]
pub struct UnknownEvent(pub String);

macro_rules! fields {
  ($($name:ident: $format:ident),* $(,)?) => {
    &[$(Field { name: stringify!($name), format: Format::$format }),*]
  };
}

/// Every known event, indexed by `EventKind`.
pub static EVENTS: [EventDescriptor; 7] = [
  EventDescriptor {
    kind: EventKind::ScreenChange,
    mask_bit: 1 << 0,
    name: "ScreenChange",
    fields: fields![
      timestamp: Dec,
      config_timestamp: Dec,
      size_index: Dec,
      subpixel_order: Dec,
      rotation: Dec,
      width: Dec,
      height: Dec,
      mwidth: Dec,
      mheight: Dec,
    ],
  },
  EventDescriptor {
    kind: EventKind::CrtcChange,
    mask_bit: 1 << 1,
    name: "CrtcChange",
    fields: fields![
      crtc: Hex,
      mode: Hex,
      rotation: Dec,
      x: Dec,
      y: Dec,
      width: Dec,
      height: Dec,
    ],
  },
  EventDescriptor {
    kind: EventKind::OutputChange,
    mask_bit: 1 << 2,
    name: "OutputChange",
    fields: fields![
      output: Hex,
      crtc: Hex,
      mode: Hex,
      rotation: Dec,
      connection: Dec,
      subpixel_order: Dec,
    ],
  },
  EventDescriptor {
    kind: EventKind::OutputProperty,
    mask_bit: 1 << 3,
    name: "OutputProperty",
    fields: fields![
      output: Hex,
      property: Atom,
      timestamp: Dec,
      state: Dec,
    ],
  },
  EventDescriptor {
    kind: EventKind::ProviderChange,
    mask_bit: 1 << 4,
    name: "ProviderChange",
    fields: fields![
      provider: Hex,
      timestamp: Dec,
      current_role: Dec,
    ],
  },
  EventDescriptor {
    kind: EventKind::ProviderProperty,
    mask_bit: 1 << 5,
    name: "ProviderProperty",
    fields: fields![
      provider: Hex,
      property: Atom,
      timestamp: Dec,
      state: Dec,
    ],
  },
  EventDescriptor {
    kind: EventKind::ResourceChange,
    mask_bit: 1 << 6,
    name: "ResourceChange",
    fields: fields![
      timestamp: Dec,
    ],
  },
];

pub fn all() -> &'static [EventDescriptor] {
  &EVENTS
}

pub fn lookup_by_name(name: &str) -> Result<&'static EventDescriptor, UnknownEvent> {
  EVENTS.iter()
    .find(|e| e.name == name)
    .ok_or_else(|| UnknownEvent(name.to_owned()))
}

pub fn lookup_by_bit(bit: u16) -> Option<&'static EventDescriptor> {
  EVENTS.iter().find(|e| e.mask_bit == bit)
}
