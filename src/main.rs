// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Run a single connector action from a test JSON file
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use cybereason_connector::actions;
use cybereason_connector::config::{AssetConfig, RuntimeConfig};
use cybereason_connector::core::models::ActionRequest;
use cybereason_connector::state::ConnectorState;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input test JSON: {"identifier", "config", "parameters"}
    input_test_json: PathBuf,

    /// Asset configuration file, replaces the input's "config" object
    #[arg(long)]
    asset: Option<PathBuf>,

    /// State file, loaded before and saved after the action
    #[arg(long)]
    state: Option<PathBuf>,

    /// Console username override
    #[arg(short, long)]
    username: Option<String>,

    /// Console password override
    #[arg(short, long)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let runtime = RuntimeConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config from env, using defaults: {}", e);
        RuntimeConfig::default()
    });
    init_tracing(&runtime);

    let input = std::fs::read_to_string(&cli.input_test_json)
        .with_context(|| format!("Cannot read {:?}", cli.input_test_json))?;
    let request: ActionRequest =
        serde_json::from_str(&input).context("Input is not a valid action request")?;

    let mut asset = match &cli.asset {
        Some(path) => AssetConfig::from_file(path)?,
        None => AssetConfig::from_json(request.config.clone())?,
    };
    if cli.username.is_some() {
        asset.username = cli.username.clone();
    }
    if cli.password.is_some() {
        asset.password = cli.password.clone();
    }

    let state = match &cli.state {
        Some(path) => ConnectorState::load(path)?,
        None => ConnectorState::default(),
    };

    info!(action = %request.identifier, parameter_sets = request.parameters.len(), "Running action");
    let outcome = actions::execute(&request, asset, &runtime, state).await?;

    if let Some(path) = &cli.state {
        outcome.state.save(path)?;
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.all_succeeded() {
        error!(action = %outcome.action, "Action finished with failures");
        std::process::exit(1);
    }
    Ok(())
}

/// Logs go to stderr; stdout carries only the action outcome
fn init_tracing(config: &RuntimeConfig) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
