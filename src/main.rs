use std::process::ExitCode;

use eyre::Result;
use tracing_subscriber::EnvFilter;

mod cli;
mod dispatch;
mod event;
mod extract;
mod record;
mod subscription;
mod x11;

use dispatch::Dispatcher;

fn main() -> Result<ExitCode> {
  if std::env::var("RUST_LOG").is_err() {
    std::env::set_var("RUST_LOG", "warn")
  }
  if std::env::var("RUST_SPANTRACE").is_err() {
    std::env::set_var("RUST_SPANTRACE", "0");
  }
  color_eyre::install()?;
  let fmt = tracing_subscriber::fmt::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(EnvFilter::from_default_env());
  if !atty::is(atty::Stream::Stderr) {
    fmt.without_time().init();
  } else {
    fmt.init();
  }

  let mut args = std::env::args_os();
  let prog = args.next()
    .map(|p| p.to_string_lossy().into_owned())
    .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_owned());
  let invocation = match cli::parse(args) {
    Ok(cli::Parsed::Watch(invocation)) => invocation,
    Ok(cli::Parsed::Help) => {
      print!("{}", cli::help(&prog));
      return Ok(ExitCode::SUCCESS);
    }
    Err(e) => {
      eprintln!("{}", e);
      eprint!("{}", cli::usage(&prog));
      return Ok(ExitCode::from(1));
    }
  };

  let display = x11::Display::connect(invocation.subscription)?;
  let dispatcher = Dispatcher::new(invocation.subscription, invocation.command);

  let rt = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()?;
  rt.block_on(display.run(&dispatcher))?;
  Ok(ExitCode::SUCCESS)
}
