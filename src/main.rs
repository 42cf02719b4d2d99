use clap::Parser;
use miette::{IntoDiagnostic, Result, miette};
use novac_checkout::application::orchestrator::SessionOrchestrator;
use novac_checkout::application::redirect::RedirectValidator;
use novac_checkout::domain::config::{Callbacks, CheckoutOptions, SessionConfig};
use novac_checkout::domain::ports::{GatewayRef, NavigatorRef, ProbeRef};
use novac_checkout::domain::state::SessionState;
use novac_checkout::infrastructure::http::{HttpGateway, HttpProbe};
use novac_checkout::infrastructure::in_memory::{ScriptedGateway, StaticProbe};
use novac_checkout::interfaces::cli::{StdoutNavigator, outcome_line};
use novac_checkout::interfaces::surface::{PresentationSurface, SurfaceView};
use novac_checkout::settings::{GatewaySettings, OrchestratorSettings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Checkout options JSON file (publicKey, amount, currency, email, ...)
    options: PathBuf,

    /// Do not wait for Enter before polling; treat the payment page as loaded
    #[arg(long)]
    no_wait: bool,

    /// Run offline against a scripted gateway, e.g. "pending,drop,successful"
    #[arg(long, value_name = "STATUSES")]
    simulate: Option<String>,

    /// Skip probing upgraded return URLs and treat them as reachable
    #[arg(long)]
    assume_reachable: bool,

    /// Override the verification poll interval
    #[arg(long, value_name = "MS")]
    poll_interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let json = std::fs::read_to_string(&cli.options).into_diagnostic()?;
    let options = CheckoutOptions::from_json(&json).into_diagnostic()?;
    let callbacks = Callbacks::new()
        .on_success(|result| println!("on_success: {}", result.raw))
        .on_error(|error| println!("on_error: {error}"));
    let config = SessionConfig::new(options, callbacks).into_diagnostic()?;

    let mut settings = OrchestratorSettings::from_env();
    if let Some(ms) = cli.poll_interval_ms {
        settings.poll_interval = Duration::from_millis(ms);
    }

    let gateway: GatewayRef = match &cli.simulate {
        Some(script) => Arc::new(ScriptedGateway::from_script(script)),
        None => Arc::new(HttpGateway::new(&GatewaySettings::from_env()).into_diagnostic()?),
    };
    let probe: ProbeRef = if cli.assume_reachable {
        Arc::new(StaticProbe::reachable())
    } else {
        Arc::new(HttpProbe::default())
    };
    let navigator: NavigatorRef = Arc::new(StdoutNavigator);

    let surface = PresentationSurface::new(SessionOrchestrator::new(
        config,
        gateway,
        RedirectValidator::new(probe, navigator),
        settings,
    ));
    println!("reference: {}", surface.orchestrator().reference());

    surface.open().await;
    if let SurfaceView::PaymentPage { url, .. } = surface.view() {
        println!("payment page: {url}");
        if !cli.no_wait {
            eprintln!("Press Enter once the payment page has loaded.");
            let mut line = String::new();
            BufReader::new(tokio::io::stdin())
                .read_line(&mut line)
                .await
                .into_diagnostic()?;
        }
        surface.frame_loaded();
    }

    let final_state = tokio::select! {
        state = surface.orchestrator().finished() => state,
        _ = tokio::signal::ctrl_c() => {
            surface.close();
            surface.orchestrator().state()
        }
    };
    println!("{}", outcome_line(&final_state));

    match final_state {
        SessionState::Errored { cause } => Err(miette!("checkout session failed: {cause}")),
        _ => Ok(()),
    }
}
