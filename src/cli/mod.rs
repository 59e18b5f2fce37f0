// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod acquire;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Adaptive web content acquisition
#[derive(Parser, Debug)]
#[command(name = "smart-web-query")]
#[command(version = "0.1.0")]
#[command(about = "Search the web and fetch page text, rendering only when needed", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search for a query and fetch the top results
    Query(acquire::QueryArgs),

    /// Classify a query without touching the network
    Analyze(acquire::AnalyzeArgs),

    /// Fetch a single URL through the hybrid pipeline
    Fetch(acquire::FetchArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Query(args) => acquire::run_query(args).await,
        Commands::Analyze(args) => acquire::analyze(args),
        Commands::Fetch(args) => acquire::fetch_url(args).await,
    }
}
