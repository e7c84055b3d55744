use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use url::Url;

use beacon_modifiers::modifiers::{Data, MODIFIER_NAMESPACE};
use beacon_modifiers::plugins::{default_plugin_dirs, scan, scan_all};
use beacon_modifiers::{
    HostConfig, PathRewriter, Phase, PluginHost, RequestWrapper, ResponseWrapper,
};

/// Beacon Modifiers - request/response modifier plugins for the Beacon gateway
#[derive(Parser)]
#[command(name = "beacon-modifiers", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/omni/beacon/modifiers.toml)
    #[arg(short, long, global = true, env = "BEACON_MODIFIERS_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List plugin files in the plugin folder
    Scan {
        /// Folder to scan (defaults to the configured and standard plugin folders)
        #[arg(short, long)]
        folder: Option<PathBuf>,
        /// Substring plugin file names must contain
        #[arg(short, long)]
        pattern: Option<String>,
    },
    /// Run the built-in path rewriter over a request path
    Demo {
        /// Request path to rewrite
        #[arg(long)]
        path: String,
        /// Suffix appended to the path (overrides config)
        #[arg(long)]
        suffix: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,beacon_modifiers=info",
        1 => "info,beacon_modifiers=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => HostConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => HostConfig::load()?,
    };

    match cli.command {
        Command::Scan { folder, pattern } => {
            let pattern = pattern.unwrap_or(config.plugin_pattern);

            let plugins = match folder {
                Some(folder) => scan(&folder, &pattern)?,
                None => {
                    let mut folders = vec![config.plugin_folder];
                    for dir in default_plugin_dirs() {
                        if !folders.contains(&dir) {
                            folders.push(dir);
                        }
                    }
                    scan_all(&folders, &pattern)
                }
            };
            if plugins.is_empty() {
                println!("No plugins matching '{pattern}'");
            }
            for plugin in plugins {
                println!("{}", plugin.display());
            }
            Ok(())
        }
        Command::Demo { path, suffix } => demo(config, &path, suffix).await,
    }
}

async fn demo(config: HostConfig, path: &str, suffix: Option<String>) -> anyhow::Result<()> {
    let rewriter = PathRewriter::new();
    let request_name = Phase::Request.modifier_name(rewriter.state().name());
    let response_name = Phase::Response.modifier_name(rewriter.state().name());

    let mut host = PluginHost::new();
    host.register(Arc::new(rewriter));

    let mut extra_config = config.extra_config;
    let namespace = extra_config
        .entry(MODIFIER_NAMESPACE)
        .or_insert_with(|| json!({ "name": [&request_name, &response_name] }));
    if let (Some(suffix), Some(namespace)) = (suffix, namespace.as_object_mut()) {
        namespace.insert(request_name, json!({ "suffix": suffix }));
    }

    let pipeline = host.pipeline(&extra_config);

    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    let url = Url::parse(&format!("http://localhost{path}"))
        .with_context(|| format!("invalid request path: {path}"))?;

    let request = pipeline.modify_request(RequestWrapper::new("GET", url));
    let response = pipeline.modify_response(
        ResponseWrapper::new(200, Data::new()).with_request(request.clone()),
    );
    tracing::debug!(status = response.status_code, "response passed through modifiers");

    println!("{}", request.path);

    let token = host.shutdown_token();
    let waiter = tokio::spawn(async move { token.cancelled().await });
    host.shutdown();
    waiter.await.context("shutdown waiter panicked")?;

    Ok(())
}
