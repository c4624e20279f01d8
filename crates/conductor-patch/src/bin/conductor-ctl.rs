// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Conductor Control CLI
//!
//! Applies patch requests and inspects solutions on a remote control plane.
//!
//! Usage:
//!   conductor-ctl <command> [options]
//!
//! Commands:
//!   patch --file <request.json>   Apply a patch request
//!   get-solution <name>           Print a solution spec

use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use conductor_client::ControlPlaneClient;
use conductor_core::ObservabilityContext;
use conductor_patch::PatchEngine;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::info;

fn print_usage() {
    eprintln!(
        r#"Usage: conductor-ctl <command> [options]

Patch and inspect solutions on a conductor control plane.

COMMANDS:
    patch --file <path>             Apply the patch request in a JSON file
    get-solution <name>             Print a solution spec as JSON

ENVIRONMENT:
    CONDUCTOR_BASE_URL              Control-plane API base URL (required)
    CONDUCTOR_USER                  User name (required)
    CONDUCTOR_PASSWORD              Password (required, may be empty)
    CONDUCTOR_REQUEST_TIMEOUT_MS    Request timeout in ms (default: 30000)
    RUST_LOG                        Log filter (default: conductor=info)

EXAMPLES:
    # Append the catalog1 bag to ebpf-module's input.adapter array
    echo '{{"objectType":"solution","objectName":"solution1","patchSource":"catalog",
           "patchContent":"catalog1","component":"ebpf-module","property":"input",
           "subKey":"adapter","patchAction":"add"}}' > patch.json
    conductor-ctl patch --file patch.json

    # Show the result
    conductor-ctl get-solution solution1
"#
    );
}

#[derive(Debug, PartialEq)]
enum Command {
    Patch { file: String },
    GetSolution { name: String },
}

fn parse_args_from_vec(args: &[String]) -> Result<Command, String> {
    if args.len() < 2 {
        return Err("No command specified".to_string());
    }

    match args[1].as_str() {
        "help" | "--help" | "-h" => {
            print_usage();
            std::process::exit(0);
        }
        "patch" => {
            let mut file: Option<String> = None;

            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--file" | "-f" => {
                        i += 1;
                        file = Some(args.get(i).ok_or("--file requires a path")?.clone());
                    }
                    arg => return Err(format!("Unknown argument: {}", arg)),
                }
                i += 1;
            }

            Ok(Command::Patch {
                file: file.ok_or("--file is required")?,
            })
        }
        "get-solution" => {
            let name = args.get(2).ok_or("Solution name required")?.clone();
            Ok(Command::GetSolution { name })
        }
        cmd => Err(format!("Unknown command: {}", cmd)),
    }
}

async fn execute_command(client: ControlPlaneClient, cmd: Command) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    match cmd {
        Command::Patch { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed to read patch request {}", file))?;
            let inputs: Map<String, Value> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON object", file))?;

            let engine = PatchEngine::new(Arc::new(client))
                .with_context(ObservabilityContext::new("conductor-ctl"));
            let outputs = engine.process(&inputs, &cancel).await?;
            info!(file = %file, "Patch applied");
            println!("{}", serde_json::to_string_pretty(&outputs)?);
        }
        Command::GetSolution { name } => {
            let solution = client.fetch_solution(&name, &cancel).await?;
            println!("{}", serde_json::to_string_pretty(&solution)?);
        }
    }

    Ok(())
}

async fn run(cmd: Command) -> anyhow::Result<()> {
    let client = ControlPlaneClient::from_env().context("invalid client configuration")?;
    execute_command(client, cmd).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("conductor=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cmd = match parse_args_from_vec(&args) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match run(cmd).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
