//! Remote shell: answers commands pushed by observers

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use vantage_terminal::{MemoryConfigStore, Terminal};
use vantage_trace::TraceRegistry;

use crate::demo::REGISTRY;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

const HELP: &str = "\
commands:
  help                 show this text
  echo <text>          print text back
  tracers              list registered tracers
  get <path>           read a demo config value
  set <path> <json>    write a demo config value
";

/// A parsed shell line
#[derive(Debug, PartialEq)]
enum Command<'a> {
    Empty,
    Help,
    Echo(&'a str),
    Tracers,
    Get(&'a str),
    Set(&'a str, &'a str),
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match head {
            "" => Self::Empty,
            "help" => Self::Help,
            "echo" => Self::Echo(rest),
            "tracers" => Self::Tracers,
            "get" if !rest.is_empty() => Self::Get(rest),
            "set" => match rest.split_once(char::is_whitespace) {
                Some((path, value)) => Self::Set(path, value.trim()),
                None => Self::Unknown(line),
            },
            _ => Self::Unknown(line),
        }
    }
}

pub struct Shell {
    registry: TraceRegistry,
    store: Arc<MemoryConfigStore>,
}

impl Shell {
    pub fn new(registry: TraceRegistry, store: Arc<MemoryConfigStore>) -> Self {
        Self { registry, store }
    }

    /// Answer commands until `running` is cleared
    pub fn run(&self, terminal: &Terminal, running: &AtomicBool) {
        while running.load(Ordering::Relaxed) {
            let Some(line) = terminal.poll_command(POLL_INTERVAL) else {
                continue;
            };
            debug!(command = %line, "shell command");

            let mut output = format!("> {line}\n");
            output.push_str(&self.execute(&line));
            terminal.write_shell(&output);
        }
    }

    fn execute(&self, line: &str) -> String {
        match Command::parse(line) {
            Command::Empty => String::new(),
            Command::Help => HELP.to_string(),
            Command::Echo(text) => format!("{text}\n"),
            Command::Tracers => {
                let names = self.registry.names();
                if names.is_empty() {
                    "no tracers\n".to_string()
                } else {
                    format!("{}\n", names.join("\n"))
                }
            }
            Command::Get(path) => match self.store.get(REGISTRY, path) {
                Some(value) => format!("{path} = {value}\n"),
                None => format!("unknown path: {path}\n"),
            },
            Command::Set(path, raw) => {
                let value = match serde_json::from_str::<Value>(raw) {
                    Ok(value) => value,
                    Err(e) => return format!("invalid value: {e}\n"),
                };
                if self.store.set(REGISTRY, path, value.clone()) {
                    format!("{path} = {value}\n")
                } else {
                    format!("unknown path: {path}\n")
                }
            }
            Command::Unknown(line) => format!("unknown command: {line}\n"),
        }
    }
}
