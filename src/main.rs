use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

mod cli;
mod config;
mod error;
mod handler;
mod http;
mod logger;
mod server;

use cli::ParseOutcome;
use config::{AppState, Config, Scheme};

fn main() -> ExitCode {
    let cli = match cli::parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(ParseOutcome::Info(text)) => {
            print!("{text}");
            return ExitCode::SUCCESS;
        }
        Err(ParseOutcome::Failure(failure)) => {
            eprint!("{}", failure.render(std::io::stderr().is_terminal()));
            return ExitCode::from(2);
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &cli::Cli) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load(cli)?;
    logger::init(&cfg)?;

    // Tokio runtime; thread count from performance.workers, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.performance.workers.filter(|&n| n > 0) {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.server.scheme == Scheme::Https {
        logger::log_warning(
            "Scheme https only changes the advertised URL; TLS must be terminated by a proxy in front of this server",
        );
    }

    let addr = cfg.server.socket_addr;
    let listener = server::create_listener(addr, cfg.performance.backlog)
        .map_err(|e| format!("failed to bind {addr}: {e}"))?;

    let state = Arc::new(AppState::new(cfg)?);
    logger::log_server_start(&state.config);

    server::start_server_loop(listener, state, server::signal::shutdown_signal()).await;
    Ok(())
}
