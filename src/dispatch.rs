use std::ffi::OsString;
use std::process::ExitStatus;

use tokio::process::Command;
use tracing::{debug, error, info, trace, warn};

use super::event::EventKind;
use super::extract::{extract, AtomResolver};
use super::record::{Notification, RawRecord};
use super::subscription::Subscription;

/// What became of one delivered record.
#[derive(Debug)]
pub enum Outcome {
  /// not an event we model
  Unrecognized,
  /// an event outside the subscription
  Filtered(EventKind),
  Malformed(EventKind),
  /// a field could not be rendered; nothing was run
  Aborted(EventKind),
  SpawnFailed(EventKind),
  WaitFailed(EventKind),
  Exited(EventKind, ExitStatus),
}

impl Outcome {
  /// The event the record was classified as, if any.
  pub fn kind(&self) -> Option<EventKind> {
    match *self {
      Outcome::Unrecognized => None,
      Outcome::Filtered(kind)
      | Outcome::Malformed(kind)
      | Outcome::Aborted(kind)
      | Outcome::SpawnFailed(kind)
      | Outcome::WaitFailed(kind)
      | Outcome::Exited(kind, _) => Some(kind),
    }
  }

  /// Whether the action program ran to completion.
  pub fn ran(&self) -> bool {
    matches!(self, Outcome::Exited(..))
  }

  pub fn report(&self) {
    match self {
      Outcome::Unrecognized => {}
      Outcome::Filtered(kind) => debug!("{} not subscribed, skipping", kind),
      Outcome::Exited(kind, status) if !status.success() => {
        info!("action for {} exited with {}", kind, status);
      }
      _ => match self.kind() {
        Some(kind) if self.ran() => debug!("action for {} finished", kind),
        Some(kind) => debug!("no action completed for {}", kind),
        None => {}
      },
    }
  }
}

/// Runs the action program once per accepted notification, one at a time.
pub struct Dispatcher {
  subscription: Subscription,
  command: Vec<OsString>,
}

impl Dispatcher {
  /// `command` must not be empty.
  pub fn new(subscription: Subscription, command: Vec<OsString>) -> Self {
    assert!(!command.is_empty(), "no action program given");
    Self { subscription, command }
  }

  /// Returns only after the action program for `raw`, if any, has exited.
  pub async fn handle(&self, raw: RawRecord<'_>, atoms: &impl AtomResolver) -> Outcome {
    let Some(desc) = raw.classify() else {
      trace!("ignoring record {:?}", raw.bytes().get(..2));
      return Outcome::Unrecognized;
    };
    let kind = desc.kind;
    if !self.subscription.contains(kind) {
      return Outcome::Filtered(kind);
    }

    let notification = match Notification::decode(kind, raw.bytes()) {
      Ok(n) => n,
      Err(e) => {
        warn!("{}", e);
        return Outcome::Malformed(kind);
      }
    };
    debug!("got {:?}", notification);

    let vars = match extract(&notification, atoms) {
      Ok(vars) => vars,
      Err(e) => {
        error!("dropping {}: {:#}", kind, e);
        return Outcome::Aborted(kind);
      }
    };

    let mut child = match Command::new(&self.command[0])
      .args(&self.command[1..])
      .envs(vars)
      .spawn()
    {
      Ok(child) => child,
      Err(e) => {
        warn!("failed to run {:?} for {}: {}", self.command[0], kind, e);
        return Outcome::SpawnFailed(kind);
      }
    };

    match child.wait().await {
      Ok(status) => Outcome::Exited(kind, status),
      Err(e) => {
        error!("waiting for action of {}: {}", kind, e);
        Outcome::WaitFailed(kind)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::fs;
  use std::path::{Path, PathBuf};

  use super::*;
  use crate::extract::fake::Atoms;
  use crate::record::wire::{Builder, FIRST_EVENT};

  fn scratch(name: &str) -> PathBuf {
    let path = std::env::temp_dir()
      .join(format!("onrandr-{}-{}", std::process::id(), name));
    let _ = fs::remove_file(&path);
    path
  }

  fn sh(script: &str, out: &Path) -> Vec<OsString> {
    vec!["sh".into(), "-c".into(), script.into(), out.into()]
  }

  fn screen_change() -> Vec<u8> {
    Builder::screen_change()
      .u32(4, 1000)
      .u16(24, 1920)
      .u16(26, 1080)
      .build()
  }

  fn output_change() -> Vec<u8> {
    Builder::notify(1).u32(16, 0x42).build()
  }

  #[tokio::test]
  async fn runs_action_with_event_environment() {
    let out = scratch("env");
    let d = Dispatcher::new(
      Subscription::all(),
      sh(r#"printf '%s %s %s %s' "$type" "$timestamp" "$width" "$height" > "$0""#, &out),
    );
    let bytes = screen_change();
    let outcome = d.handle(RawRecord::new(&bytes, FIRST_EVENT), &Atoms::default()).await;
    assert!(matches!(outcome, Outcome::Exited(EventKind::ScreenChange, s) if s.success()));
    assert!(outcome.ran());
    assert_eq!(outcome.kind(), Some(EventKind::ScreenChange));
    assert_eq!(fs::read_to_string(&out).unwrap(), "ScreenChange 1000 1920 1080");
    let _ = fs::remove_file(&out);
  }

  #[tokio::test]
  async fn parent_environment_is_untouched() {
    let d = Dispatcher::new(Subscription::all(), vec!["true".into()]);
    let bytes = screen_change();
    d.handle(RawRecord::new(&bytes, FIRST_EVENT), &Atoms::default()).await;
    assert!(std::env::var_os("mheight").is_none());
  }

  #[tokio::test]
  async fn unsubscribed_events_are_not_run() {
    let out = scratch("filtered");
    let subscription = Subscription::build(["ScreenChange", "ResourceChange"]).unwrap();
    let d = Dispatcher::new(subscription, sh(r#"echo ran > "$0""#, &out));
    let bytes = output_change();
    let outcome = d.handle(RawRecord::new(&bytes, FIRST_EVENT), &Atoms::default()).await;
    assert!(matches!(outcome, Outcome::Filtered(EventKind::OutputChange)));
    assert!(!out.exists());
  }

  #[tokio::test]
  async fn unknown_records_are_ignored() {
    let d = Dispatcher::new(Subscription::all(), vec!["true".into()]);
    // an RRNotify lease event
    let bytes = Builder::notify(6).build();
    let outcome = d.handle(RawRecord::new(&bytes, FIRST_EVENT), &Atoms::default()).await;
    assert!(matches!(outcome, Outcome::Unrecognized));
    let bytes = Builder::with_code(FIRST_EVENT + 2, 0).build();
    let outcome = d.handle(RawRecord::new(&bytes, FIRST_EVENT), &Atoms::default()).await;
    assert!(matches!(outcome, Outcome::Unrecognized));
  }

  #[tokio::test]
  async fn actions_do_not_overlap() {
    let out = scratch("serial");
    let d = Dispatcher::new(
      Subscription::all(),
      sh(r#"sleep 0.2; echo "$type" >> "$0""#, &out),
    );
    let first = screen_change();
    let second = Builder::notify(5).u32(4, 7).build();

    d.handle(RawRecord::new(&first, FIRST_EVENT), &Atoms::default()).await;
    assert_eq!(fs::read_to_string(&out).unwrap(), "ScreenChange\n");
    d.handle(RawRecord::new(&second, FIRST_EVENT), &Atoms::default()).await;
    assert_eq!(fs::read_to_string(&out).unwrap(), "ScreenChange\nResourceChange\n");
    let _ = fs::remove_file(&out);
  }

  #[tokio::test]
  async fn property_atom_is_resolved() {
    let out = scratch("atom");
    let d = Dispatcher::new(
      Subscription::build(["OutputProperty"]).unwrap(),
      sh(r#"printf '%s=%s' "$output" "$property" > "$0""#, &out),
    );
    let bytes = Builder::notify(2).u32(8, 0x42).u32(12, 301).build();
    d.handle(RawRecord::new(&bytes, FIRST_EVENT), &Atoms::with(301, "Backlight")).await;
    assert_eq!(fs::read_to_string(&out).unwrap(), "0x42=Backlight");
    let _ = fs::remove_file(&out);
  }

  #[tokio::test]
  async fn unresolvable_atom_skips_the_action() {
    let out = scratch("badatom");
    let d = Dispatcher::new(Subscription::all(), sh(r#"echo ran > "$0""#, &out));
    let bytes = Builder::notify(2).u32(8, 0x42).u32(12, 999).build();
    let outcome = d.handle(RawRecord::new(&bytes, FIRST_EVENT), &Atoms::default()).await;
    assert!(matches!(outcome, Outcome::Aborted(EventKind::OutputProperty)));
    assert!(!outcome.ran());
    assert!(!out.exists());
  }

  #[tokio::test]
  async fn provider_property_records_never_run() {
    let out = scratch("providerprop");
    let d = Dispatcher::new(
      Subscription::build(["ProviderProperty"]).unwrap(),
      sh(r#"echo ran > "$0""#, &out),
    );
    let bytes = Builder::notify(4).u32(8, 0x7).u32(12, 301).build();
    let outcome = d.handle(RawRecord::new(&bytes, FIRST_EVENT), &Atoms::with(301, "EDID")).await;
    assert!(matches!(outcome, Outcome::Unrecognized));
    assert_eq!(outcome.kind(), None);
    assert!(!out.exists());
  }

  #[test]
  fn outcome_kind() {
    assert_eq!(Outcome::Filtered(EventKind::CrtcChange).kind(), Some(EventKind::CrtcChange));
    assert_eq!(Outcome::SpawnFailed(EventKind::ScreenChange).kind(), Some(EventKind::ScreenChange));
    assert!(!Outcome::WaitFailed(EventKind::ScreenChange).ran());
  }

  #[tokio::test]
  async fn failures_are_reported_not_fatal() {
    let d = Dispatcher::new(
      Subscription::all(),
      vec!["/nonexistent/onrandr-action".into()],
    );
    let bytes = screen_change();
    let outcome = d.handle(RawRecord::new(&bytes, FIRST_EVENT), &Atoms::default()).await;
    assert!(matches!(outcome, Outcome::SpawnFailed(EventKind::ScreenChange)));

    let d = Dispatcher::new(Subscription::all(), vec!["false".into()]);
    let outcome = d.handle(RawRecord::new(&bytes, FIRST_EVENT), &Atoms::default()).await;
    assert!(matches!(outcome, Outcome::Exited(_, s) if !s.success()));
  }

  #[tokio::test]
  async fn short_records_are_dropped() {
    let d = Dispatcher::new(Subscription::all(), vec!["true".into()]);
    let bytes = [FIRST_EVENT + 1, 5, 0, 0];
    let outcome = d.handle(RawRecord::new(&bytes, FIRST_EVENT), &Atoms::default()).await;
    assert!(matches!(outcome, Outcome::Malformed(EventKind::ResourceChange)));
  }
}
