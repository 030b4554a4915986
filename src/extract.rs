use eyre::{bail, Result, WrapErr};

use super::event::{EventDescriptor, Field, Format};
use super::record::Notification;

/// Something that can turn an atom into its name, normally the X server.
pub trait AtomResolver {
  fn atom_name(&self, atom: u32) -> Result<String>;
}

/// A field value with its wire width preserved.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Value {
  U8(u8),
  U16(u16),
  U32(u32),
  I16(i16),
}

impl Value {
  fn render(self, format: Format) -> Option<String> {
    let s = match (format, self) {
      (Format::Dec, Value::U8(v)) => v.to_string(),
      (Format::Dec, Value::U16(v)) => v.to_string(),
      (Format::Dec, Value::U32(v)) => v.to_string(),
      (Format::Dec, Value::I16(v)) => v.to_string(),
      (Format::Hex, Value::U8(v)) => format!("{:#x}", v),
      (Format::Hex, Value::U16(v)) => format!("{:#x}", v),
      (Format::Hex, Value::U32(v)) => format!("{:#x}", v),
      (Format::Hex, Value::I16(v)) => format!("{:#x}", v),
      (Format::Atom, _) => return None,
    };
    Some(s)
  }
}

/// Field values of a notification, named and in the order its descriptor
/// declares them.
pub fn values(n: &Notification) -> Vec<(&'static str, Value)> {
  use Value::*;

  match n {
    Notification::ScreenChange(e) => vec![
      ("timestamp", U32(e.timestamp)),
      ("config_timestamp", U32(e.config_timestamp)),
      ("size_index", U16(e.size_index)),
      ("subpixel_order", U16(e.subpixel_order)),
      ("rotation", U8(e.rotation)),
      ("width", U16(e.width)),
      ("height", U16(e.height)),
      ("mwidth", U16(e.mwidth)),
      ("mheight", U16(e.mheight)),
    ],
    Notification::CrtcChange(e) => vec![
      ("crtc", U32(e.crtc)),
      ("mode", U32(e.mode)),
      ("rotation", U16(e.rotation)),
      ("x", I16(e.x)),
      ("y", I16(e.y)),
      ("width", U16(e.width)),
      ("height", U16(e.height)),
    ],
    Notification::OutputChange(e) => vec![
      ("output", U32(e.output)),
      ("crtc", U32(e.crtc)),
      ("mode", U32(e.mode)),
      ("rotation", U16(e.rotation)),
      ("connection", U8(e.connection)),
      ("subpixel_order", U8(e.subpixel_order)),
    ],
    Notification::OutputProperty(e) => vec![
      ("output", U32(e.output)),
      ("property", U32(e.property)),
      ("timestamp", U32(e.timestamp)),
      ("state", U8(e.state)),
    ],
    Notification::ProviderChange(e) => vec![
      ("provider", U32(e.provider)),
      ("timestamp", U32(e.timestamp)),
      ("current_role", U32(e.current_role)),
    ],
    Notification::ProviderProperty(e) => vec![
      ("provider", U32(e.provider)),
      ("property", U32(e.property)),
      ("timestamp", U32(e.timestamp)),
      ("state", U8(e.state)),
    ],
    Notification::ResourceChange(e) => vec![
      ("timestamp", U32(e.timestamp)),
    ],
  }
}

fn render(field: &Field, value: Value, atoms: &impl AtomResolver) -> Result<String> {
  if field.format != Format::Atom {
    return value.render(field.format)
      .ok_or_else(|| eyre::eyre!("cannot render {} as {:?}", field.name, field.format));
  }
  let Value::U32(atom) = value else {
    bail!("{} is not an atom: {:?}", field.name, value);
  };
  atoms.atom_name(atom)
    .wrap_err_with(|| format!("failed to resolve atom {} for {}", atom, field.name))
}

/// The environment for one action program run: `type` first, then every
/// field of the event in declared order.
///
/// An atom that cannot be resolved fails the whole notification.
pub fn extract(
  n: &Notification,
  atoms: &impl AtomResolver,
) -> Result<Vec<(&'static str, String)>> {
  publish(n.kind().descriptor(), values(n), atoms)
}

fn publish(
  desc: &EventDescriptor,
  values: Vec<(&'static str, Value)>,
  atoms: &impl AtomResolver,
) -> Result<Vec<(&'static str, String)>> {
  if values.len() != desc.fields.len() {
    bail!("{} declares {} fields but has {} values", desc.name, desc.fields.len(), values.len());
  }

  let mut vars = Vec::with_capacity(desc.fields.len() + 1);
  vars.push(("type", desc.name.to_owned()));
  for (field, (name, value)) in desc.fields.iter().zip(values) {
    if field.name != name {
      bail!("{} declares field {} where its value is {}", desc.name, field.name, name);
    }
    vars.push((field.name, render(field, value, atoms)?));
  }
  Ok(vars)
}
