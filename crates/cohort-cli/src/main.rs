//! Cohort CLI Application
//!
//! Command-line interface for plan validation and multi-agent sessions.

mod args;
mod cli;
mod mcp;
mod renderer;

use anyhow::{Context, Result};
use args::{Args, Commands};
use clap::Parser;
use cli::Cli;
use cohort_core::CoordinatorBuilder;
use log::info;
use mcp::{run_stdio_server, CohortMcpServer};
use renderer::TerminalRenderer;
use Commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Args {
        database_file,
        no_color,
        command,
    } = Args::parse();

    let coordinator = CoordinatorBuilder::new()
        .with_database_path(database_file)
        .build()
        .await
        .context("Failed to initialize coordinator")?;

    let renderer = TerminalRenderer::new(!no_color);

    info!("Cohort started");

    match command {
        Some(Plan { command }) => {
            Cli::new(coordinator, renderer)
                .handle_plan_command(command)
                .await
        }
        Some(Session { command }) => {
            Cli::new(coordinator, renderer)
                .handle_session_command(command)
                .await
        }
        Some(Task { command }) => {
            Cli::new(coordinator, renderer)
                .handle_task_command(command)
                .await
        }
        Some(Serve) => {
            info!("Starting Cohort MCP server");
            run_stdio_server(CohortMcpServer::new(coordinator))
                .await
                .context("MCP server failed")
        }
        None => Cli::new(coordinator, renderer).list_sessions().await,
    }
}
