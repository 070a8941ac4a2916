use std::{path::PathBuf, process::exit, sync::Arc};

use clap::Parser;
use serde_json::Value;

use crate::{
    app::App,
    client::{DebugConfig, HttpConnector},
    config::{default_config_path, IsrenConfig},
    diagnostics::Diagnostics,
    logging::{init_logging, LoggingConfig},
    output::Payload,
    provider::{ForgeHosts, ProviderRequest},
    result::{IsrenError, Result},
    util::{normalize_output, parse_json_options},
};

mod app;
mod client;
mod config;
mod diagnostics;
mod domain;
mod id;
mod logging;
mod output;
mod provider;
mod result;
mod util;

/// isren - ISsue Rendering ENgine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Url of the project or group whose issues are rendered
    #[arg(value_name = "HOSTED_GIT_URL", required_unless_present = "print_config_path")]
    url: Option<String>,
    /// Hosted git API authentication token
    #[arg(short, long, value_name = "TOKEN")]
    auth: Option<String>,
    /// Ignore SSL certificate check
    #[arg(short = 'k', long)]
    insecure: bool,
    /// Enable debug mode
    #[arg(short, long)]
    debug: bool,
    /// Comma separated paths of transform scripts
    #[arg(short, long, value_name = "PATHS")]
    transform: Option<String>,
    /// Comma separated output formats: console, json, csv, file
    #[arg(short, long, value_name = "FORMATS")]
    out: Option<String>,
    /// Additional options for output configuration, as a JSON object
    #[arg(long, value_name = "JSON")]
    out_options: Option<String>,
    /// Additional options for the issue listing, as a JSON object
    #[arg(long, value_name = "JSON")]
    issue_options: Option<String>,
    /// The path of the output file
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,
    /// Alternate path to the configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print the path to the configuration file and exit.
    #[arg(short, long)]
    print_config_path: bool,
}

fn main() {
    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(default_config_path);

    if args.print_config_path {
        println!("{}", config_path.display());
        exit(0);
    }

    let startup = Diagnostics::new(args.debug);
    if let Err(e) = color_eyre::install() {
        startup.fatal(IsrenError::General(e.to_string().into()));
    }

    let config = match IsrenConfig::load(&config_path)
        .and_then(|config| config.with_env(|key| std::env::var(key).ok()))
    {
        Ok(config) => config,
        Err(e) => startup.fatal(e),
    };

    let debug = args.debug || config.debug;
    let diagnostics = Diagnostics::new(debug);

    let log_guard = match init_logging(LoggingConfig::from_env(debug)) {
        Ok(guard) => guard,
        Err(e) => diagnostics.fatal(e),
    };

    let result = tokio::runtime::Runtime::new()
        .map_err(|e| IsrenError::General(format!("Failed to create runtime: {e}").into()))
        .and_then(|rt| rt.block_on(run(args, config, debug)));

    // flush the file log before a fatal exit skips destructors
    drop(log_guard);
    if let Err(e) = result {
        diagnostics.fatal(e);
    }
}

async fn run(args: Args, config: IsrenConfig, debug: bool) -> Result<Payload> {
    let out_options = match args.out_options.as_deref() {
        Some(options) => parse_json_options("--out-options", Some(options))?,
        None => config.out_options,
    };
    let issue_options = match args.issue_options.as_deref() {
        Some(options) => parse_json_options("--issue-options", Some(options))?,
        None => config.issue_options,
    };
    let out = match args.out {
        Some(out) => normalize_output(Some(&Value::String(out))),
        None => normalize_output(config.out.as_ref()),
    };

    let hosts = ForgeHosts::new(config.gitlab_url.as_deref())?;
    let transform_root = std::env::current_dir()
        .map_err(|e| IsrenError::General(format!("Failed to read working directory: {e}").into()))?;

    let mut connector = HttpConnector::new();
    if let Some(dir) = std::env::var_os("ISREN_RESPONSE_LOG_DIR").filter(|_| debug) {
        connector = connector
            .with_debug(DebugConfig { log_responses: true, log_directory: Some(dir.into()) });
    }

    let request = ProviderRequest {
        url: args.url.unwrap_or_default().into(),
        auth: args.auth.map(Into::into),
        insecure: args.insecure,
        membership: config.membership,
        transform: args.transform,
        transform_root,
        out,
        out_options,
        file: args.file,
        issue_options,
    };

    let mut stdout = std::io::stdout();
    App::new(hosts, Arc::new(connector))
        .run(request, config.auth.as_deref(), &mut stdout)
        .await
}
