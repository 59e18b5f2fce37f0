// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Args;
use serde_json::json;
use std::time::Duration;
use tracing::info;

use crate::config::EngineConfig;
use crate::orchestrator::{build_pipeline, QueryOrchestrator, RunOptions};
use crate::pipeline::FetchOptions;
use crate::strategy::{QueryClassifier, QueryContext};
use crate::telemetry::TelemetrySink;

/// Arguments for the query command
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Query text
    pub query: String,

    /// Number of search results to request
    #[arg(long, default_value_t = 5)]
    pub max_results: usize,

    /// Number of pages to fetch (defaults to the strategy's choice)
    #[arg(long)]
    pub max_content_sources: Option<usize>,

    /// Render every fetched page in a browser
    #[arg(long)]
    pub force_rendering: bool,

    /// Skip query classification and use engine defaults
    #[arg(long)]
    pub no_auto_strategy: bool,

    /// Leave search snippets out of the source list
    #[arg(long)]
    pub no_snippets: bool,

    /// Overall deadline in seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Render hosts known to need scripts even for basic queries
    #[arg(long)]
    pub host_hints: bool,

    #[command(flatten)]
    pub context: ContextArgs,
}

/// Caller context that nudges classification
#[derive(Args, Debug)]
pub struct ContextArgs {
    /// A previous attempt at this query came back empty
    #[arg(long)]
    pub previous_failed: bool,

    /// The caller wants detailed information
    #[arg(long)]
    pub detailed: bool,
}

impl ContextArgs {
    fn to_context(&self) -> Option<QueryContext> {
        if self.previous_failed || self.detailed {
            Some(QueryContext {
                previous_failed: self.previous_failed,
                detailed_request: self.detailed,
            })
        } else {
            None
        }
    }
}

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Query text
    pub query: String,

    #[command(flatten)]
    pub context: ContextArgs,
}

/// Arguments for the fetch command
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Page to fetch
    pub url: String,

    /// Skip the cheap fetch and render immediately
    #[arg(long)]
    pub render: bool,
}

impl QueryArgs {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            max_results: self.max_results,
            max_content_sources: self.max_content_sources,
            force_rendering: self.force_rendering.then_some(true),
            auto_strategy: !self.no_auto_strategy,
            include_snippets: !self.no_snippets,
            context: self.context.to_context(),
            deadline: self.deadline_secs.map(Duration::from_secs),
            use_host_hints: self.host_hints,
        }
    }
}

fn load_config() -> Result<EngineConfig> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();
    Ok(EngineConfig::from_env()?)
}

/// Run a full acquisition and print the result as JSON
pub async fn run_query(args: QueryArgs) -> Result<()> {
    let config = load_config()?;
    let orchestrator = QueryOrchestrator::from_config(&config)?;

    info!("Running acquisition for '{}'", args.query);
    let outcome = orchestrator.run(&args.query, args.run_options()).await;
    orchestrator.shutdown().await;

    let result = outcome?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Print the classifier's analysis and derived strategy
pub fn analyze(args: AnalyzeArgs) -> Result<()> {
    let config = load_config()?;
    let classifier = QueryClassifier::new(config.rules);

    let analysis = classifier.analyze(&args.query, args.context.to_context().as_ref());
    let strategy = classifier.strategy_config(&analysis);

    let output = json!({
        "query": args.query,
        "analysis": analysis,
        "strategy": strategy,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Fetch one URL and print the fetch result as JSON
pub async fn fetch_url(args: FetchArgs) -> Result<()> {
    let config = load_config()?;
    config.validate()?;

    let telemetry = TelemetrySink::from_config(&config.telemetry);
    let pipeline = build_pipeline(&config, telemetry.clone())?;

    let options = FetchOptions {
        force_rendering: args.render,
        ..Default::default()
    };
    let result = pipeline.fetch_with(&args.url, options).await;
    pipeline.pool().shutdown().await;
    telemetry.flush().await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
