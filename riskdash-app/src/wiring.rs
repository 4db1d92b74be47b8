use anyhow::{Result, anyhow};
use riskdash_actors::{VerifierActor, builder::Builder};
use riskdash_config::{ApiConfig, DashConfig};
use riskdash_http::HttpClient;
use riskdash_tui::{TuiActor, TuiMsg, spawn_tui_feeders};
use riskdash_verify::HttpVerifier;
use std::sync::Arc;

const VERIFIER_MAILBOX: usize = 16;
const TUI_MAILBOX: usize = 256;

pub struct Wiring {
    builder: Builder,
}

impl Wiring {
    pub fn new() -> Self {
        Self {
            builder: Builder::new(),
        }
    }

    pub fn builder_mut(&mut self) -> &mut Builder {
        &mut self.builder
    }

    pub async fn run(self) -> Result<()> {
        self.builder.run_until_ctrl_c().await
    }
}

pub fn build_verifier(api: &ApiConfig) -> Result<HttpVerifier> {
    let client = HttpClient::with_connect_timeout(&api.base_url, api.connect_timeout())?
        .with_timeout(api.request_timeout());
    Ok(HttpVerifier::new(client).with_paths(api.verify_path.clone(), api.health_path.clone()))
}

/// Start the verifier, then the TUI and its feeders, then the first health probe.
pub fn build_from_config(w: &mut Wiring, cfg: &DashConfig) -> Result<()> {
    let b = w.builder_mut();
    let shutdown = b.shutdown_handle();

    let verifier = Arc::new(build_verifier(&cfg.api)?);
    let verifier_addr = b.spawn("verifier", VERIFIER_MAILBOX, VerifierActor::new(verifier));

    let tui = TuiActor::new(verifier_addr, shutdown.clone())?.with_tick_rate(cfg.ui.tick());
    let tui_addr = b.spawn("tui", TUI_MAILBOX, tui);
    spawn_tui_feeders(tui_addr.clone(), shutdown, cfg.ui.tick())?;

    tui_addr
        .try_send(TuiMsg::ProbeHealth)
        .map_err(|_| anyhow!("tui mailbox closed before start"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_uses_configured_paths() {
        let api = ApiConfig {
            base_url: "http://localhost:8000".into(),
            verify_path: "/v2/verify".into(),
            health_path: "/v2/health".into(),
            connect_timeout_secs: 2,
            request_timeout_secs: Some(30),
        };
        let verifier = build_verifier(&api).unwrap();
        assert_eq!(verifier.verify_path(), "/v2/verify");
        assert_eq!(verifier.health_path(), "/v2/health");
    }

    #[test]
    fn bad_base_url_is_reported() {
        let api = ApiConfig {
            base_url: "not a url".into(),
            ..ApiConfig::default()
        };
        assert!(build_verifier(&api).is_err());
    }
}
