use anyhow::{Context, Result};
use clap::Parser;
use riskdash_common::observability::{LogConfig, LogFormat, init_logging};
use riskdash_config::{DashConfig, DashConfigLoader};
use std::path::PathBuf;
use wiring::{Wiring, build_from_config};
mod wiring;

#[derive(Parser, Debug)]
#[command(name = "riskdash", version)]
#[command(about = "Terminal dashboard for real-time transaction risk analysis")]
struct Args {
    /// YAML config file. A missing file is not an error.
    #[arg(long, env = "RISKDASH_CONFIG", default_value = "riskdash.yaml")]
    config: PathBuf,

    /// Scoring service origin, overrides `api.base_url`.
    #[arg(long)]
    api_base: Option<String>,
}

fn load_config(args: &Args) -> Result<DashConfig> {
    let mut loader = DashConfigLoader::new().with_optional_file(&args.config);
    if let Some(base) = &args.api_base {
        loader = loader.with_override("api.base_url", base.clone());
    }
    loader
        .load()
        .with_context(|| format!("loading config from {}", args.config.display()))
}

fn log_config(cfg: &DashConfig) -> Result<LogConfig> {
    let format: LogFormat = cfg.logging.format.parse().map_err(anyhow::Error::msg)?;
    Ok(LogConfig {
        log_dir: cfg.logging.dir.as_ref().map(PathBuf::from),
        format,
        default_filter: cfg.logging.filter.clone(),
        ..LogConfig::default()
    })
}

/// Put the terminal back before the default hook prints the panic.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        riskdash_tui::restore_terminal();
        default_hook(info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = load_config(&args)?;

    let log_file = init_logging(log_config(&cfg)?)?;
    tracing::info!(
        log_file = %log_file.display(),
        base_url = %cfg.api.base_url,
        "riskdash.start"
    );

    install_panic_hook();
    let mut wiring = Wiring::new();
    let res = match build_from_config(&mut wiring, &cfg) {
        Ok(()) => wiring.run().await,
        Err(e) => Err(e),
    };
    riskdash_tui::restore_terminal();
    if let Err(e) = &res {
        tracing::error!(error = ?e, "riskdash.exit_with_error");
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_base_flag_overrides_config() {
        let args = Args::try_parse_from([
            "riskdash",
            "--config",
            "does-not-exist.yaml",
            "--api-base",
            "http://scoring.internal:9000",
        ])
        .unwrap();
        let cfg = load_config(&args).unwrap();
        assert_eq!(cfg.api.base_url, "http://scoring.internal:9000");
        assert_eq!(cfg.api.verify_path, "/api/v1/transactions/verify");
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let mut cfg = DashConfig::default();
        cfg.logging.format = "xml".into();
        assert!(log_config(&cfg).is_err());

        cfg.logging.format = "json".into();
        cfg.logging.dir = Some("/tmp/riskdash-logs".into());
        let log = log_config(&cfg).unwrap();
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.log_dir, Some(PathBuf::from("/tmp/riskdash-logs")));
        assert!(!log.emit_stderr);
    }
}
