//! Wraps an arbitrary command as a service until Ctrl-C.
//!
//! ```bash
//! cargo run --example wrap_command -- node index.js
//! ```

use anyhow::{bail, Context};
use service_supervisor::{ServiceBuilder, ServiceState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args_os().skip(1);
    let Some(program) = args.next() else {
        bail!("usage: wrap_command <program> [args...]");
    };
    let cwd = std::env::current_dir().context("reading current directory")?;

    let handle = ServiceBuilder::new(program)
        .with_working_dir(cwd)
        .with_args(args)
        .with_service_name("wrap-command")
        .build()
        .run();

    handle.start().await.context("starting service")?;

    let mut states = handle.subscribe();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!("Ctrl-C received, stopping...");
        }
        _ = states.wait_for(|state| *state == ServiceState::Stopped) => {
            println!("Service stopped on its own.");
        }
    }

    handle.shutdown().await?;
    Ok(())
}
