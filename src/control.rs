//! Console control surface.
//!
//! Lines typed on stdin are read on a dedicated thread and forwarded over a
//! channel to the control task, which is the only place the [`App`] is
//! mutated.

use crate::app::{App, ServerStatus};
use log::{info, warn};
use std::io::BufRead;
use std::thread;
use tokio::sync::mpsc;

const HELP: &str = "commands: port <number> | status | start | stop | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Port(String),
    Status,
    Start,
    Stop,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

/// How the control loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    Quit,
    /// Input closed, e.g. when running without a terminal.
    Eof,
}

pub fn parse_command(line: &str) -> Command {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Command::Empty;
    };

    match verb.to_lowercase().as_str() {
        "port" => Command::Port(words.collect::<Vec<_>>().join(" ")),
        "status" => Command::Status,
        "start" => Command::Start,
        "stop" => Command::Stop,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(line.trim().to_string()),
    }
}

/// Forwards stdin lines until EOF. The thread is detached; it ends with the
/// process if stdin never closes.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Applies one command. Returns `false` when the console should stop.
pub async fn handle(app: &mut App, command: Command) -> bool {
    match command {
        Command::Port(input) => {
            // Failures are already logged by the app.
            let _ = app.apply_port(&input).await;
        }
        Command::Status => match app.status() {
            ServerStatus::Running { addr, since } => {
                info!("Server running on {} since {}", addr, since.format("%H:%M:%S"))
            }
            ServerStatus::Stopped => info!("Server stopped (port {})", app.config().server.port),
        },
        Command::Start => {
            let _ = app.start().await;
        }
        Command::Stop => {
            if !app.stop().await {
                info!("Server is not running");
            }
        }
        Command::Help => info!("{}", HELP),
        Command::Quit => return false,
        Command::Empty => {}
        Command::Unknown(line) => warn!("Unknown command {:?}; {}", line, HELP),
    }
    true
}

pub async fn run(app: &mut App, mut lines: mpsc::Receiver<String>) -> ConsoleExit {
    info!("{}", HELP);
    while let Some(line) = lines.recv().await {
        if !handle(app, parse_command(&line)).await {
            return ConsoleExit::Quit;
        }
    }
    ConsoleExit::Eof
}
