//! oaslint CLI binary entry point.
//! Delegates to the library for linting and serving, and maps outcomes to
//! exit codes: 0 clean, 1 error findings, 2 usage/config/IO failure.

use clap::Parser;
use oaslint::cli::{Cli, Commands};
use oaslint::config::{self, Transport};
use oaslint::rules::RuleSet;
use oaslint::utils::{error_prefix, info_prefix, note_prefix};
use oaslint::{lint, output, server};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", error_prefix());
            2
        }
    };
    std::process::exit(code);
}

/// Logs always go to stderr so stdout stays clean for stdio transport and
/// JSON output.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
        Commands::Serve {
            root,
            transport,
            bind,
        } => {
            init_tracing("info");
            let eff = config::resolve_effective(
                root.as_deref(),
                None,
                transport.as_deref(),
                bind.as_deref(),
            )?;
            let rules = RuleSet::from_config(&eff.rules)?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(async {
                match eff.transport {
                    Transport::Stdio => server::serve_stdio(rules).await,
                    Transport::Http => server::serve_http(rules, &eff.bind).await,
                }
            })?;
            Ok(0)
        }
        Commands::Lint {
            patterns,
            root,
            output,
        } => {
            init_tracing("warn");
            let eff = config::resolve_effective(root.as_deref(), output.as_deref(), None, None)?;
            if eff.config_path.is_none() && eff.output != "json" {
                eprintln!("{} No oaslint.toml found; using defaults.", note_prefix());
            }
            let rules = RuleSet::from_config(&eff.rules)?;
            let reports = lint::lint_files(&eff.root, &patterns, &rules)?;
            if reports.is_empty() {
                eprintln!(
                    "{} No files matched: [{}]",
                    error_prefix(),
                    patterns.join(", ")
                );
                return Ok(2);
            }
            if eff.output != "json" {
                eprintln!("{} Linting {} file(s).", info_prefix(), reports.len());
            }
            output::print_lint(&reports, &eff.output)?;
            if output::total_summary(&reports).errors > 0 {
                return Ok(1);
            }
            Ok(0)
        }
        Commands::Rules { root } => {
            init_tracing("warn");
            let eff = config::resolve_effective(root.as_deref(), None, None, None)?;
            let rules = RuleSet::from_config(&eff.rules)?;
            for r in rules.rules() {
                println!(
                    "{:<26} {:<8} {}",
                    r.id(),
                    r.severity.as_str(),
                    r.rule.description()
                );
            }
            Ok(0)
        }
    }
}
