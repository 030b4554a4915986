use std::os::unix::io::AsRawFd;

use eyre::Result;
use thiserror::Error;
use tokio::io::unix::AsyncFd;
use tracing::{debug, info};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::{ConnectError, ConnectionError, ReplyError};
use x11rb::protocol::{randr, xproto};
use x11rb::rust_connection::RustConnection;

use super::dispatch::Dispatcher;
use super::extract::AtomResolver;
use super::record::RawRecord;
use super::subscription::Subscription;

#[derive(Debug, Error)]
pub enum SetupError {
  #[error("failed to open X display {display}: {source}")]
  Connect { display: String, source: ConnectError },
  #[error("screen {0} has no root window")]
  NoRoot(usize),
  #[error("X RandR extension not available")]
  MissingExtension,
  #[error("server does not support RandR 1.2 or newer (it has {major}.{minor})")]
  TooOld { major: u32, minor: u32 },
  #[error(transparent)]
  Connection(#[from] ConnectionError),
  #[error(transparent)]
  Reply(#[from] ReplyError),
}

/// A connection to the X server with RandR notifications selected on the root window.
pub struct Display {
  conn: RustConnection,
  first_event: u8,
}

impl Display {
  pub fn connect(subscription: Subscription) -> Result<Self, SetupError> {
    let (conn, screen) = x11rb::connect(None).map_err(|source| SetupError::Connect {
      display: std::env::var("DISPLAY").unwrap_or_default(),
      source,
    })?;
    let root = conn.setup().roots.get(screen)
      .map(|s| s.root)
      .ok_or(SetupError::NoRoot(screen))?;

    let ext = conn.extension_information(randr::X11_EXTENSION_NAME)?
      .ok_or(SetupError::MissingExtension)?;
    let version = randr::query_version(&conn, 1, 2)?.reply()?;
    let (major, minor) = (version.major_version, version.minor_version);
    if (major, minor) < (1, 2) {
      return Err(SetupError::TooOld { major, minor });
    }
    info!("RandR {}.{}, first event {}", major, minor, ext.first_event);

    randr::select_input(&conn, root, randr::NotifyMask::from(subscription.bits()))?.check()?;
    info!("watching {} on root window {:#x}", subscription, root);

    Ok(Self { conn, first_event: ext.first_event })
  }

  /// Dispatch notifications forever.
  pub async fn run(&self, dispatcher: &Dispatcher) -> Result<()> {
    let afd = AsyncFd::new(self.conn.stream().as_raw_fd())?;
    loop {
      self.drain(dispatcher).await?;
      debug!("waiting to read from X server...");
      afd.readable().await?.clear_ready();
    }
  }

  /// Handle every event that can be read without blocking, including those
  /// queued while waiting for atom replies.
  async fn drain(&self, dispatcher: &Dispatcher) -> Result<()> {
    while let Some(event) = self.conn.poll_for_raw_event()? {
      dispatcher.handle(RawRecord::new(&event, self.first_event), self).await.report();
    }
    Ok(())
  }
}

impl AtomResolver for Display {
  fn atom_name(&self, atom: u32) -> Result<String> {
    let reply = xproto::get_atom_name(&self.conn, atom)?.reply()?;
    Ok(String::from_utf8_lossy(&reply.name).into_owned())
  }
}
