//! RandR wire events: classifying a raw 32-byte record and decoding it into
//! a typed notification.

use std::io::Cursor;

use byteorder::{NativeEndian, ReadBytesExt};
use thiserror::Error;

use super::event::{EventDescriptor, EventKind};

pub const RECORD_LEN: usize = 32;

/// `RRScreenChangeNotify`, relative to the extension's first event
pub const SCREEN_CHANGE_NOTIFY: u8 = 0;
/// `RRNotify`, whose second byte carries the subtype
pub const NOTIFY: u8 = 1;

#[derive(Debug, Error)]
pub enum DecodeError {
  #[error("{kind} record is {len} bytes, expected 32")]
  Truncated { kind: EventKind, len: usize },
  #[error("failed to read {kind} record: {source}")]
  Read { kind: EventKind, source: std::io::Error },
}

/// Map a base type (and for `RRNotify` its subtype) to an event.
///
/// `RRNotify_ProviderProperty` (subtype 4) is never classified, so
/// `ProviderProperty` can be selected and subscribed to but never fires.
pub fn classify(base_type: u8, subtype: Option<u8>) -> Option<&'static EventDescriptor> {
  let kind = match (base_type, subtype) {
    (SCREEN_CHANGE_NOTIFY, _) => EventKind::ScreenChange,
    (NOTIFY, Some(0)) => EventKind::CrtcChange,
    (NOTIFY, Some(1)) => EventKind::OutputChange,
    (NOTIFY, Some(2)) => EventKind::OutputProperty,
    (NOTIFY, Some(3)) => EventKind::ProviderChange,
    (NOTIFY, Some(5)) => EventKind::ResourceChange,
    _ => return None,
  };
  Some(kind.descriptor())
}

/// A wire event as delivered by the server, not yet interpreted.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
  bytes: &'a [u8],
  first_event: u8,
}

impl<'a> RawRecord<'a> {
  pub fn new(bytes: &'a [u8], first_event: u8) -> Self {
    Self { bytes, first_event }
  }

  /// The event code relative to RandR's first event, if this is one of its events.
  pub fn base_type(&self) -> Option<u8> {
    // the high bit marks events delivered via SendEvent
    let code = self.bytes.first()? & 0x7f;
    code.checked_sub(self.first_event)
  }

  pub fn subtype(&self) -> Option<u8> {
    match self.base_type()? {
      NOTIFY => self.bytes.get(1).copied(),
      _ => None,
    }
  }

  pub fn classify(&self) -> Option<&'static EventDescriptor> {
    classify(self.base_type()?, self.subtype())
  }

  pub fn bytes(&self) -> &'a [u8] {
    self.bytes
  }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ScreenChange {
  pub timestamp: u32,
  pub config_timestamp: u32,
  pub size_index: u16,
  pub subpixel_order: u16,
  pub rotation: u8,
  pub width: u16,
  pub height: u16,
  pub mwidth: u16,
  pub mheight: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CrtcChange {
  pub crtc: u32,
  pub mode: u32,
  pub rotation: u16,
  pub x: i16,
  pub y: i16,
  pub width: u16,
  pub height: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct OutputChange {
  pub output: u32,
  pub crtc: u32,
  pub mode: u32,
  pub rotation: u16,
  pub connection: u8,
  pub subpixel_order: u8,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct OutputProperty {
  pub output: u32,
  pub property: u32,
  pub timestamp: u32,
  pub state: u8,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ProviderChange {
  pub provider: u32,
  pub timestamp: u32,
  pub current_role: u32,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ProviderProperty {
  pub provider: u32,
  pub property: u32,
  pub timestamp: u32,
  pub state: u8,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ResourceChange {
  pub timestamp: u32,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Notification {
  ScreenChange(ScreenChange),
  CrtcChange(CrtcChange),
  OutputChange(OutputChange),
  OutputProperty(OutputProperty),
  ProviderChange(ProviderChange),
  ProviderProperty(ProviderProperty),
  ResourceChange(ResourceChange),
}

struct Reader<'a> {
  kind: EventKind,
  cursor: Cursor<&'a [u8]>,
}

impl<'a> Reader<'a> {
  fn new(kind: EventKind, bytes: &'a [u8]) -> Result<Self, DecodeError> {
    if bytes.len() < RECORD_LEN {
      return Err(DecodeError::Truncated { kind, len: bytes.len() });
    }
    Ok(Self { kind, cursor: Cursor::new(bytes) })
  }

  fn at(&mut self, offset: u64) -> &mut Self {
    self.cursor.set_position(offset);
    self
  }

  fn wrap(&self, source: std::io::Error) -> DecodeError {
    DecodeError::Read { kind: self.kind, source }
  }

  fn u8(&mut self, offset: u64) -> Result<u8, DecodeError> {
    self.at(offset).cursor.read_u8().map_err(|e| self.wrap(e))
  }

  fn u16(&mut self, offset: u64) -> Result<u16, DecodeError> {
    self.at(offset).cursor.read_u16::<NativeEndian>().map_err(|e| self.wrap(e))
  }

  fn i16(&mut self, offset: u64) -> Result<i16, DecodeError> {
    self.at(offset).cursor.read_i16::<NativeEndian>().map_err(|e| self.wrap(e))
  }

  fn u32(&mut self, offset: u64) -> Result<u32, DecodeError> {
    self.at(offset).cursor.read_u32::<NativeEndian>().map_err(|e| self.wrap(e))
  }
}

impl Notification {
  pub fn decode(kind: EventKind, bytes: &[u8]) -> Result<Self, DecodeError> {
    let mut r = Reader::new(kind, bytes)?;
    let n = match kind {
      EventKind::ScreenChange => Notification::ScreenChange(ScreenChange {
        rotation: r.u8(1)?,
        timestamp: r.u32(4)?,
        config_timestamp: r.u32(8)?,
        size_index: r.u16(20)?,
        subpixel_order: r.u16(22)?,
        width: r.u16(24)?,
        height: r.u16(26)?,
        mwidth: r.u16(28)?,
        mheight: r.u16(30)?,
      }),
      EventKind::CrtcChange => Notification::CrtcChange(CrtcChange {
        crtc: r.u32(12)?,
        mode: r.u32(16)?,
        rotation: r.u16(20)?,
        x: r.i16(24)?,
        y: r.i16(26)?,
        width: r.u16(28)?,
        height: r.u16(30)?,
      }),
      EventKind::OutputChange => Notification::OutputChange(OutputChange {
        output: r.u32(16)?,
        crtc: r.u32(20)?,
        mode: r.u32(24)?,
        rotation: r.u16(28)?,
        connection: r.u8(30)?,
        subpixel_order: r.u8(31)?,
      }),
      EventKind::OutputProperty => Notification::OutputProperty(OutputProperty {
        output: r.u32(8)?,
        property: r.u32(12)?,
        timestamp: r.u32(16)?,
        state: r.u8(20)?,
      }),
      EventKind::ProviderChange => Notification::ProviderChange(ProviderChange {
        timestamp: r.u32(4)?,
        provider: r.u32(12)?,
        current_role: r.u32(16)?,
      }),
      EventKind::ProviderProperty => Notification::ProviderProperty(ProviderProperty {
        provider: r.u32(8)?,
        property: r.u32(12)?,
        timestamp: r.u32(16)?,
        state: r.u8(20)?,
      }),
      EventKind::ResourceChange => Notification::ResourceChange(ResourceChange {
        timestamp: r.u32(4)?,
      }),
    };
    Ok(n)
  }

  pub fn kind(&self) -> EventKind {
    match self {
      Notification::ScreenChange(_) => EventKind::ScreenChange,
      Notification::CrtcChange(_) => EventKind::CrtcChange,
      Notification::OutputChange(_) => EventKind::OutputChange,
      Notification::OutputProperty(_) => EventKind::OutputProperty,
      Notification::ProviderChange(_) => EventKind::ProviderChange,
      Notification::ProviderProperty(_) => EventKind::ProviderProperty,
      Notification::ResourceChange(_) => EventKind::ResourceChange,
    }
  }
}
