use std::process::ExitCode;

use clap::Parser;
use ecs_exec::cli::{exit_status, run, Args};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let res = run(args).await;
    if let Err(e) = &res {
        eprintln!("{}\n{e:?}", "[error]:".red());
    }
    ExitCode::from(exit_status(&res))
}
