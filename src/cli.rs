use std::ffi::OsString;
use std::fmt::Write;

use thiserror::Error;

use super::event::{self, UnknownEvent};
use super::subscription::Subscription;

#[derive(Debug)]
pub struct Invocation {
  pub subscription: Subscription,
  /// the action program and its arguments, never empty
  pub command: Vec<OsString>,
}

#[derive(Debug)]
pub enum Parsed {
  Watch(Invocation),
  Help,
}

#[derive(Debug, Error)]
pub enum UsageError {
  #[error(transparent)]
  UnknownEvent(#[from] UnknownEvent),
  #[error("event name is not valid UTF-8: {0:?}")]
  NotUnicode(OsString),
  #[error("missing command after --")]
  MissingCommand,
}

/// Parse `[event]... -- command...`, without the program name.
pub fn parse<I>(args: I) -> Result<Parsed, UsageError>
where
  I: IntoIterator<Item = OsString>,
{
  let mut args = args.into_iter();
  let mut tokens = Vec::new();
  let mut command = None;
  for arg in args.by_ref() {
    if arg == "--" {
      command = Some(args.by_ref().collect::<Vec<_>>());
      break;
    }
    tokens.push(arg.into_string().map_err(UsageError::NotUnicode)?);
  }

  if tokens.iter().any(|t| t == "-h" || t == "--help") {
    return Ok(Parsed::Help);
  }
  let subscription = Subscription::build(&tokens)?;
  match command {
    Some(command) if !command.is_empty() => {
      Ok(Parsed::Watch(Invocation { subscription, command }))
    }
    _ => Err(UsageError::MissingCommand),
  }
}

pub fn usage(prog: &str) -> String {
  let names: Vec<_> = event::all().iter().map(|e| e.name).collect();
  format!("Usage: {} [event]... -- command...\nEvents: {}\n", prog, names.join(" "))
}

pub fn help(prog: &str) -> String {
  let mut s = usage(prog);
  s.push_str("\nRuns command once per RandR notification, one at a time.\n");
  s.push_str("No events selects all of them. Variables set for each event:\n");
  for e in event::all() {
    let _ = write!(s, "  {:<17} type", e.name);
    for f in e.fields {
      let _ = write!(s, " {}", f.name);
    }
    s.push('\n');
  }
  s
}
