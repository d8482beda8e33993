// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Millbridge: console host for the engine command bridge.
//
// Entry point. Initialises logging, loads the bridge config, starts the bridge,
// and runs the main thread as the UI event loop. A reader thread turns stdin
// lines into method calls; answers are printed on the main thread.

mod services;

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use crossbeam_channel::{Sender, select};
use serde_json::Value;

use millbridge_bridge::{EventLoop, MethodCall, MethodResult};
use millbridge_core::config::BridgeConfig;

use services::config_store::{load_config, load_config_file};
use services::data_dir::data_dir;
use services::host::HostServices;

/// Command line for the console host.
#[derive(Debug, Parser)]
#[command(about = "Millbridge engine bridge console", author, version)]
struct Cli {
    /// Bridge config file (defaults to bridge.json in the data dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// External engine executable, overriding the config
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Maximum outstanding commands, overriding the config
    #[arg(long = "queue-bound")]
    queue_bound: Option<usize>,

    /// Write the effective config back to the data dir and continue
    #[arg(long = "save-config", default_value_t = false)]
    save_config: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "millbridge failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> millbridge_core::error::Result<()> {
    let dir = data_dir();
    let mut config = match &cli.config {
        Some(path) => load_config_file(path)?,
        None => load_config(&dir).unwrap_or_default(),
    };
    apply_overrides(&mut config, &cli);

    tracing::info!(data_dir = %dir.display(), engine = ?config.engine.program, "millbridge starting");

    let ui = EventLoop::new();
    let host = HostServices::init(config, dir, Arc::new(ui.handle()))?;
    if cli.save_config {
        host.save_config()?;
        tracing::info!(dir = %host.data_dir().display(), "config saved");
    }

    let (input_tx, input_rx) = crossbeam_channel::unbounded();
    spawn_stdin_reader(input_tx);

    let mut running = true;
    while running {
        select! {
            recv(input_rx) -> line => {
                match line.map(|l| parse_line(&l)) {
                    Ok(Ok(Input::Call(call))) => {
                        let method = call.method.clone();
                        host.handle(call, Box::new(ConsoleResult { method }));
                    }
                    Ok(Ok(Input::Empty)) => {}
                    Ok(Err(e)) => eprintln!("! could not parse input: {e}"),
                    // `quit`, or stdin closed.
                    Ok(Ok(Input::Quit)) | Err(_) => running = false,
                }
            }
            recv(ui.receiver()) -> task => {
                if let Ok(task) = task {
                    task();
                }
            }
        }
    }

    let outcome = host.shutdown();
    // Answers produced while draining still belong on this thread.
    ui.run_pending();
    tracing::info!(?outcome, dropped = host.bridge().dropped_response_count(), "millbridge stopped");
    Ok(())
}

fn apply_overrides(config: &mut BridgeConfig, cli: &Cli) {
    if let Some(program) = &cli.engine {
        config.engine.program = Some(program.clone());
    }
    if let Some(bound) = cli.queue_bound {
        config.queue_bound = Some(bound);
    }
}

fn spawn_stdin_reader(tx: Sender<String>) {
    let spawned = thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        tracing::error!(error = %e, "could not start stdin reader");
    }
}

/// One console input line, decoded.
#[derive(Debug, PartialEq)]
enum Input {
    Call(MethodCall),
    Quit,
    Empty,
}

/// `send go depth 5` style shorthand, or a raw JSON method call such as
/// `{"method":"send","arguments":"go"}`.
fn parse_line(line: &str) -> Result<Input, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Empty);
    }
    if line == "quit" || line == "exit" {
        return Ok(Input::Quit);
    }
    if line.starts_with('{') {
        return serde_json::from_str(line).map(Input::Call);
    }

    let (method, rest) = match line.split_once(char::is_whitespace) {
        Some((method, rest)) => (method, rest.trim()),
        None => (line, ""),
    };
    let arguments = (!rest.is_empty()).then(|| Value::String(rest.to_string()));
    Ok(Input::Call(MethodCall::new(method, arguments)))
}

/// Prints the answer to a console call.
struct ConsoleResult {
    method: String,
}

impl MethodResult for ConsoleResult {
    fn success(self: Box<Self>, value: Value) {
        println!("{} -> {value}", self.method);
    }

    fn error(self: Box<Self>, code: &str, message: &str) {
        println!("{} !! {code}: {message}", self.method);
    }

    fn not_implemented(self: Box<Self>) {
        println!("{} !! not implemented", self.method);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_keeps_the_rest_of_the_line_as_one_argument() {
        assert_eq!(
            parse_line("send  go depth 5 ").unwrap(),
            Input::Call(MethodCall::new("send", Some(Value::String("go depth 5".into()))))
        );
        assert_eq!(
            parse_line("isThinking").unwrap(),
            Input::Call(MethodCall::new("isThinking", None))
        );
    }

    #[test]
    fn json_lines_are_method_calls() {
        assert_eq!(
            parse_line(r#"{"method":"getResponseDroppedCount"}"#).unwrap(),
            Input::Call(MethodCall::new("getResponseDroppedCount", None))
        );
        assert!(parse_line("{ broken").is_err());
    }

    #[test]
    fn quit_and_blank_lines() {
        assert_eq!(parse_line("quit").unwrap(), Input::Quit);
        assert_eq!(parse_line("   ").unwrap(), Input::Empty);
    }

    #[test]
    fn flags_override_the_loaded_config() {
        let cli = Cli::parse_from(["millbridge", "--engine", "/opt/mill", "--queue-bound", "4"]);
        let mut config = BridgeConfig::default();
        apply_overrides(&mut config, &cli);
        assert_eq!(config.engine.program, Some(PathBuf::from("/opt/mill")));
        assert_eq!(config.queue_bound, Some(4));
        assert!(!cli.save_config);
    }
}
