//
// main.rs
//
// Copyright (C) 2024-2025 Posit Software, PBC. All rights reserved.
//
//

//! Command-line driver: talks to a running Jupyter kernel.

use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io::Write;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use jkclient::{InputReply, KernelConnection, KernelEvents, PollTimeout, ReplyCallbacks};
use jkshared::iopub_messages::{DisplayData, ErrorOutput, ExecuteResult, Stream};
use jkshared::shell_messages::{ExecuteRequest, ReplyError};
use log::LevelFilter;
use serde_json::{Map, Value};
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode, WriteLogger};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The ID of the kernel to connect to, or the path to its connection file
    #[arg(short, long)]
    kernel: String,

    /// The username to stamp on outgoing messages. Defaults to `$USER`.
    #[arg(short, long)]
    username: Option<String>,

    /// The log level to use. Valid values are "trace", "debug", "info", "warn",
    /// and "error". If not specified, the default log level is "info", or the
    /// value of `RUST_LOG` if set.
    #[arg(short, long)]
    log_level: Option<String>,

    /// The path to a log file. If specified, log output will be written to this
    /// file in addition to standard streams.
    #[arg(long)]
    log_file: Option<String>,

    /// How long to wait for the kernel to answer, in seconds
    #[arg(short, long, default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute code and print its output
    Execute {
        code: String,

        /// Run without broadcasting output or storing history
        #[arg(long)]
        silent: bool,
    },

    /// Print the kernel's info reply
    Info,

    /// List completions at the cursor
    Complete {
        code: String,

        /// Cursor position; defaults to the end of the code
        #[arg(long)]
        cursor: Option<usize>,
    },

    /// Show help for the object at the cursor
    Inspect {
        code: String,

        #[arg(long)]
        cursor: Option<usize>,

        /// 0 for a summary, 1 for full detail
        #[arg(long, default_value_t = 0)]
        detail: u8,
    },

    /// Print the kernel's input history
    History {
        /// The number of most recent entries to show
        #[arg(long, default_value_t = 10)]
        tail: i64,

        /// Show only entries matching this glob pattern
        #[arg(long)]
        search: Option<String>,
    },

    /// Ask the kernel to shut down
    Shutdown {
        #[arg(long)]
        restart: bool,
    },

    /// Print everything the kernel broadcasts until interrupted
    Listen,
}

/// Prints kernel output to the terminal.
struct ConsoleEvents {
    /// Set when the kernel goes idle
    idle: Rc<Cell<bool>>,
}

/// The plain-text form of a MIME bundle.
fn plain_text(data: &Map<String, Value>) -> Option<&str> {
    data.get("text/plain").and_then(Value::as_str)
}

impl KernelEvents for ConsoleEvents {
    fn on_stream(&mut self, stream: &Stream) {
        if stream.name == "stderr" {
            eprint!("{}", stream.data);
        } else {
            print!("{}", stream.data);
        }
        let _ = std::io::stdout().flush();
    }

    fn on_status(&mut self, busy: bool) {
        log::debug!("Kernel is {}", if busy { "busy" } else { "idle" });
        if !busy {
            self.idle.set(true);
        }
    }

    fn on_execute_result(&mut self, result: &ExecuteResult) {
        if let Some(text) = plain_text(&result.data) {
            println!("Out[{}]: {}", result.execution_count, text);
        }
    }

    fn on_error(&mut self, error: &ErrorOutput) {
        for line in &error.traceback {
            eprintln!("{}", line);
        }
    }

    fn on_display_data(&mut self, display: &DisplayData) {
        match plain_text(&display.data) {
            Some(text) => println!("{}", text),
            None => log::info!(
                "Display data with no plain text form ({} MIME types)",
                display.data.len()
            ),
        }
    }

    fn on_input_request(&mut self, prompt: &str, password: bool, reply: InputReply) {
        let value = match read_input(prompt, password) {
            Ok(value) => value,
            Err(err) => {
                // The kernel waits until it gets a reply
                log::error!("Failed to read input: {}", err);
                String::new()
            }
        };
        if let Err(err) = reply.send(value) {
            err.log();
        }
    }
}

/// The kernel's prompt without its trailing colon; dialoguer adds its own.
fn prompt_label(prompt: &str) -> &str {
    prompt.trim_end().trim_end_matches(':').trim_end()
}

/// Prompt on the terminal, without echo for passwords.
fn read_input(prompt: &str, password: bool) -> dialoguer::Result<String> {
    let prompt = prompt_label(prompt);
    if password {
        Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
    } else {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
    }
}

/// Poll until `done` is set or `timeout` passes.
fn wait_until(
    connection: &KernelConnection,
    done: impl Fn() -> bool,
    timeout: Duration,
) -> anyhow::Result<()> {
    let deadline = Instant::now() + timeout;
    while !done() {
        let now = Instant::now();
        if now >= deadline {
            bail!("Timed out after {:?} waiting for the kernel", timeout);
        }
        connection.poll(PollTimeout::After(deadline - now))?;
    }
    Ok(())
}

/// Where a reply lands: its body, or how it failed.
type ReplySlot<T> = Rc<RefCell<Option<Result<T, String>>>>;

fn reply_slot<T: 'static>() -> (ReplySlot<T>, ReplyCallbacks<T>) {
    let slot: ReplySlot<T> = Rc::new(RefCell::new(None));
    let ok = slot.clone();
    let error = slot.clone();
    let abort = slot.clone();
    let callbacks = ReplyCallbacks::<T>::new()
        .on_ok(move |body| *ok.borrow_mut() = Some(Ok(body)))
        .on_error(move |err: ReplyError| {
            *error.borrow_mut() = Some(Err(format!("{}: {}", err.ename, err.evalue)))
        })
        .on_abort(move || *abort.borrow_mut() = Some(Err(String::from("request aborted"))));
    (slot, callbacks)
}

fn await_reply<T>(
    connection: &KernelConnection,
    slot: &ReplySlot<T>,
    timeout: Duration,
) -> anyhow::Result<T> {
    wait_until(connection, || slot.borrow().is_some(), timeout)?;
    let reply = slot
        .borrow_mut()
        .take()
        .ok_or_else(|| anyhow!("No reply received"))?;
    reply.map_err(|err| anyhow!(err))
}

fn run(args: Args) -> anyhow::Result<()> {
    let username = args
        .username
        .clone()
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| String::from("jkclient"));
    let timeout = Duration::from_secs(args.timeout);

    let connection = KernelConnection::connect(&args.kernel, &username)
        .with_context(|| format!("Failed to connect to kernel {}", args.kernel))?;
    let idle = Rc::new(Cell::new(false));
    connection.set_events(ConsoleEvents { idle: idle.clone() });

    match args.command {
        Commands::Execute { code, silent } => {
            let mut request = ExecuteRequest::new(code);
            request.silent = silent;
            request.store_history = !silent;
            let (slot, callbacks) = reply_slot();
            idle.set(false);
            connection.execute_request(request, callbacks)?;
            let reply = await_reply(&connection, &slot, timeout)?;
            // Output may still be in flight until the kernel reports idle
            wait_until(&connection, || idle.get(), timeout)?;
            log::info!("Executed as [{}]", reply.execution_count);
        }
        Commands::Info => {
            let (slot, callbacks) = reply_slot();
            connection.kernel_info_request(callbacks)?;
            let info = await_reply(&connection, &slot, timeout)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Complete { code, cursor } => {
            let cursor = cursor.unwrap_or_else(|| code.chars().count());
            let (slot, callbacks) = reply_slot();
            connection.complete_request(&code, cursor, callbacks)?;
            let reply = await_reply(&connection, &slot, timeout)?;
            for candidate in reply.matches {
                println!("{}", candidate);
            }
        }
        Commands::Inspect {
            code,
            cursor,
            detail,
        } => {
            let cursor = cursor.unwrap_or_else(|| code.chars().count());
            let (slot, callbacks) = reply_slot();
            connection.inspect_request(&code, cursor, detail, callbacks)?;
            let reply = await_reply(&connection, &slot, timeout)?;
            match plain_text(&reply.data) {
                Some(text) if reply.found => println!("{}", text),
                _ => println!("Nothing found"),
            }
        }
        Commands::History { tail, search } => {
            let (slot, callbacks) = reply_slot();
            match search {
                Some(pattern) => {
                    connection.history_request_search(false, true, &pattern, true, tail, callbacks)?
                }
                None => connection.history_request_tail(false, true, tail, callbacks)?,
            };
            let reply = await_reply(&connection, &slot, timeout)?;
            for entry in reply.history {
                let input = match &entry.2 {
                    Value::String(input) => input.clone(),
                    other => other.to_string(),
                };
                println!("[{}:{}] {}", entry.0, entry.1, input);
            }
        }
        Commands::Shutdown { restart } => {
            let (slot, callbacks) = reply_slot();
            connection.shutdown_request(restart, callbacks)?;
            let reply = await_reply(&connection, &slot, timeout)?;
            log::info!(
                "Kernel acknowledged {}",
                if reply.restart { "restart" } else { "shutdown" }
            );
        }
        Commands::Listen => loop {
            connection.poll(PollTimeout::Forever)?;
        },
    }

    connection.close();
    Ok(())
}

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // Derive the log level
    let log_level = match args.log_level {
        Some(ref level) => {
            // If the log level is set in the command-line arguments, use it
            level.to_string()
        }
        None => match std::env::var("RUST_LOG") {
            Ok(level) => {
                // If the log level is set in the RUST_LOG environment variable, use it
                level
            }
            Err(_) => {
                // If no log level is set, use "info"
                "info".to_string()
            }
        },
    };

    // Match the log level to a `LevelFilter`
    let log_level = match log_level.as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => {
            eprintln!("Invalid log level '{}'; using 'info'", log_level);
            LevelFilter::Info
        }
    };

    // Check to see if a log file was provided
    let logging = match args.log_file {
        Some(ref log_file) => File::create(log_file)
            .map_err(|err| format!("Failed to create log file {}: {}", log_file, err))
            .and_then(|file| {
                // Log to the file and the terminal
                CombinedLogger::init(vec![
                    TermLogger::new(
                        log_level,
                        Config::default(),
                        TerminalMode::Stderr,
                        ColorChoice::Auto,
                    ),
                    WriteLogger::new(log_level, Config::default(), file),
                ])
                .map_err(|err| {
                    format!("Failed to initialize combined file/terminal logging: {}", err)
                })
            }),
        None => TermLogger::init(
            log_level,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )
        .map_err(|err| format!("Failed to initialize terminal logging: {}", err)),
    };
    if let Err(err) = logging {
        // Consider it a fatal error if we can't initialize logging
        eprintln!("{}", err);
        std::process::exit(1);
    }

    if let Err(err) = run(args) {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}
