// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use loandesk_api::{Client, LoanApi, MemoryApi, Session};
use loandesk_app::{AllowAll, AppState, GuidedWorkflow, TransitionPolicy};
use loandesk_tui::ViewOptions;
use runtime::ApiRuntime;
use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEMO_LATENCY: Duration = Duration::from_millis(150);

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `loandesk --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let policy: Box<dyn TransitionPolicy> = if config.strict_status_workflow() {
        Box::new(GuidedWorkflow)
    } else {
        Box::new(AllowAll)
    };
    let view = ViewOptions {
        page_size: config.page_size(),
        filter_authority: config.filter_authority(),
    };

    if options.demo {
        let portfolio = loandesk_testkit::demo_portfolio();
        let api = MemoryApi::new(
            portfolio.loan_types,
            portfolio.customers,
            portfolio.applications,
        )
        .with_latency(DEMO_LATENCY);
        let session = Session::new(Some(api.issue_token()?));
        if options.check_only {
            return Ok(());
        }
        init_logging(&config)?;
        info!("starting in demo mode");
        return launch(&config, ApiRuntime::new(api, session, policy), view);
    }

    let client = Client::new(config.base_url(), config.timeout()?).with_context(|| {
        format!(
            "invalid [api] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;
    if options.check_only {
        return Ok(());
    }

    init_logging(&config)?;
    info!(base_url = client.base_url(), "starting");
    let session = Session::new(env::var("LOANDESK_TOKEN").ok().filter(|token| !token.is_empty()));
    launch(&config, ApiRuntime::new(client, session, policy), view)
}

fn launch<A>(config: &Config, mut runtime: ApiRuntime<A>, view: ViewOptions) -> Result<()>
where
    A: LoanApi + Clone + Send + Sync + 'static,
{
    let mut state = AppState::new(config.show_dashboard());
    loandesk_tui::run_app(&mut state, &mut runtime, view)
}

/// Sends events to a log file; the terminal belongs to the UI.
fn init_logging(config: &Config) -> Result<()> {
    let path = config.log_path()?;
    let file = open_log_file(&path)?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level()))
        .with_context(|| {
            format!(
                "invalid [log].level {:?}; use a tracing filter such as info or loandesk_api=debug",
                config.log_level()
            )
        })?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .context("install log subscriber")?;
    Ok(())
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| {
            format!(
                "open log file {} -- set [log].file to a writable path",
                path.display()
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("loandesk - lending back-office terminal");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Launch against an in-memory portfolio");
    println!("  --check                  Validate config and API settings, then exit");
    println!("  --help                   Show this help");
    println!();
    println!("Environment:");
    println!("  LOANDESK_CONFIG_PATH     Override the config file location");
    println!("  LOANDESK_TOKEN           Start with an existing bearer token");
    println!("  RUST_LOG                 Override [log].level");
}
