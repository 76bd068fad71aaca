//! Foreground mode: hosts the async driver and prints every event as one
//! JSON line until Ctrl-C.

use missionbalance_core::{Config, EngineRuntime, Event};
use tokio::sync::broadcast::error::RecvError;

use super::{CliResult, Session};

pub fn run(config: &Config) -> CliResult {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(drive(config))
}

async fn drive(config: &Config) -> CliResult {
    let (engine, persistence) = Session::open(config)?.into_parts();
    let handle = EngineRuntime::spawn(engine, persistence, config);
    let mut events = handle.subscribe();

    println!("{}", serde_json::to_string(&handle.state().await?)?);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => print_event(&event)?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                break;
            }
        }
    }

    handle.shutdown().await?;
    Ok(())
}

fn print_event(event: &Event) -> CliResult {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}
