mod cli;
mod commands;
mod dispatch;
mod logging;
mod model;
mod storage;
mod ui;
mod view;

use anyhow::Result;
use clap::Parser;
use logging::LogSink;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    let sink = match command {
        cli::Command::Tui => LogSink::File,
        _ => LogSink::Stderr,
    };
    logging::init_tracing(args.verbose, sink)?;
    match command {
        cli::Command::Init => commands::init(args.file),
        cli::Command::List => commands::list(args.file, args.date),
        cli::Command::Add { text } => commands::add(args.file, args.date, text),
        cli::Command::Rollover => commands::rollover(args.file, args.date),
        cli::Command::Tui => commands::tui(args.file, args.date),
    }
}
