// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only operator inspection for a running controller. Never talks to
//! the bus or mutates anything — every command loads the controller's own
//! on-disk snapshot file and reads it.

mod color;
mod commands;
mod exit_error;
mod output;
mod snapshot;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use exit_error::ExitError;
use output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "talus-cli", version, styles = color::styles())]
struct Cli {
    /// Path to the controller's snapshot file. Defaults to
    /// `<state-dir>/snapshot.json`, where `<state-dir>` is `TALUS_STATE_DIR`
    /// or `~/.local/state/talus`.
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the per-queue job summary and slave roster.
    Status,
    /// Inspect one job by id or unique id prefix.
    Job {
        #[command(subcommand)]
        command: JobCommand,
    },
    /// Inspect known worker hosts.
    Slave {
        #[command(subcommand)]
        command: SlaveCommand,
    },
}

#[derive(Subcommand, Debug)]
enum JobCommand {
    /// Print one job's status, progress, and errors/logs.
    Show { id: String },
}

#[derive(Subcommand, Debug)]
enum SlaveCommand {
    /// List known slaves and their running_vms/total_jobs_run.
    List,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        if let Some(exit) = err.downcast_ref::<ExitError>() {
            eprintln!("{}", exit.message);
            std::process::exit(exit.code);
        }
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let path = cli.snapshot.unwrap_or_else(snapshot::default_snapshot_path);
    let state = snapshot::load(&path)?;

    match cli.command {
        Command::Status => commands::status::run(&state, cli.output),
        Command::Job { command: JobCommand::Show { id } } => commands::job::show(&state, &id, cli.output),
        Command::Slave { command: SlaveCommand::List } => commands::slave::list(&state, cli.output),
    }
}
