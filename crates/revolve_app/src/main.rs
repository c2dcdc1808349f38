mod config;
mod console;
mod logging;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use revolve_core::SessionState;
use revolve_engine::{ReqwestTransport, SessionHandle};
use session_logging::{session_info, session_warn};

use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};
use crate::console::Console;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

enum Command {
    Quit,
    Cancel,
    Dismiss(u64),
    ShowLog,
    Help,
    Send(String),
}

fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let command = match trimmed.split_once(' ') {
        Some(("/dismiss", id)) => match id.trim().parse() {
            Ok(id) => Command::Dismiss(id),
            Err(_) => Command::Help,
        },
        _ => match trimmed {
            "/quit" | "/exit" => Command::Quit,
            "/cancel" => Command::Cancel,
            "/log" => Command::ShowLog,
            "/help" => Command::Help,
            _ => Command::Send(trimmed.to_string()),
        },
    };
    Some(command)
}

fn print_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Type a message and press enter to send it.")?;
    writeln!(out, "  /cancel       stop waiting for the current reply")?;
    writeln!(out, "  /dismiss <id> remove a notification")?;
    writeln!(out, "  /log          show the system log")?;
    writeln!(out, "  /quit         leave")
}

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let loaded = config::load(&config_path)?;
    let found = loaded.is_some();
    let config = loaded.unwrap_or_default();

    logging::initialize(config.log_destination, config.log_level());
    if found {
        session_info!("Loaded config from {:?}", config_path);
    } else {
        session_warn!("No config at {:?}; using defaults", config_path);
    }

    run(config)
}

fn run(config: AppConfig) -> anyhow::Result<()> {
    let transport = ReqwestTransport::new(config.transport_settings(), config.passthrough()?)
        .context("failed to set up the agent connection")?;
    session_info!("Talking to {}", transport.settings().endpoint);
    let handle = SessionHandle::new(transport, SessionState::with_greeting(&config.greeting))
        .context("failed to start the session worker")?;

    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut console = Console::new();
    let stdout = io::stdout();
    print_help(&mut stdout.lock())?;

    loop {
        while let Some(event) = handle.try_recv() {
            console.apply(event, &mut stdout.lock())?;
        }

        match line_rx.try_recv() {
            Ok(line) => match parse_command(&line) {
                Some(Command::Quit) => break,
                Some(Command::Cancel) => handle.cancel(),
                Some(Command::Dismiss(id)) => handle.dismiss(id),
                Some(Command::ShowLog) => console.print_log(&mut stdout.lock())?,
                Some(Command::Help) => print_help(&mut stdout.lock())?,
                Some(Command::Send(text)) => {
                    if console.view().loading {
                        writeln!(stdout.lock(), "(queued until the current reply finishes)")?;
                    }
                    handle.submit(text);
                }
                None => {}
            },
            Err(mpsc::TryRecvError::Empty) => thread::sleep(POLL_INTERVAL),
            Err(mpsc::TryRecvError::Disconnected) => break,
        }
    }

    handle.cancel();
    session_info!("Session closed");
    Ok(())
}
