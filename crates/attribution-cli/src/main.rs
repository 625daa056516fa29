use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use attribution::cookie::http_date;
use attribution::platform::cli::{FileStore, HttpTransport};
use attribution::{
    AttributionStore, BeaconConfig, Clock, CompletionNotifier, ConversionReporter, FixedClock, LandingAttributor,
    NavigationType, QueryMap, RecordingTransport, SystemClock, Transport,
};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "attribution")]
#[command(about = "Simulate attribution beacon page loads against a local cookie jar")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON file holding cookies and local storage
    #[arg(long, global = true, default_value = "attribution-jar.json")]
    jar: PathBuf,

    /// Print the requests instead of sending them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Pretend the current time is this RFC 3339 timestamp
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Report stored identifiers to the tracking endpoint
    Report,
    /// Land on a URL and persist its tracking identifiers
    Land {
        /// Full landing URL, including its query string
        url: String,
        /// How the page was reached
        #[arg(long, value_enum, default_value = "navigate")]
        navigation: Navigation,
    },
    /// Print the jar contents
    Show,
}

#[derive(Clone, Copy, ValueEnum)]
enum Navigation {
    Navigate,
    Reload,
    BackForward,
}

impl From<Navigation> for NavigationType {
    fn from(navigation: Navigation) -> Self {
        match navigation {
            Navigation::Navigate => NavigationType::Navigate,
            Navigation::Reload => NavigationType::Reload,
            Navigation::BackForward => NavigationType::BackForward,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let clock: Rc<dyn Clock> = match cli.now {
        Some(now) => Rc::new(FixedClock::new(now)),
        None => Rc::new(SystemClock),
    };
    let store = FileStore::open(&cli.jar, clock.clone())
        .with_context(|| format!("Failed to open jar {}", cli.jar.display()))?;

    match cli.command {
        Commands::Report => {
            if cli.dry_run {
                let transport = RecordingTransport::new();
                report(config, &store, transport.clone()).await;
                print_requests(&transport);
            } else {
                report(config, &store, HttpTransport::new()).await;
            }
        }
        Commands::Land { url, navigation } => {
            let landing = QueryMap::from_url(&url);
            let navigation = NavigationType::from(navigation);
            if cli.dry_run {
                let transport = RecordingTransport::new();
                land(config, &store, transport.clone(), clock, &landing, navigation).await;
                print_requests(&transport);
            } else {
                let transport = HttpTransport::with_base(&url).context("Invalid landing URL")?;
                land(config, &store, transport, clock, &landing, navigation).await;
            }
        }
        Commands::Show => show(&store, &config),
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<BeaconConfig> {
    let Some(path) = path else {
        return Ok(BeaconConfig::default());
    };
    let source = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    BeaconConfig::from_toml_str(&source).with_context(|| format!("Invalid configuration in {}", path.display()))
}

async fn report(config: BeaconConfig, store: &impl AttributionStore, transport: impl Transport) {
    let reporter = ConversionReporter::new(config, store, transport);
    println!("Report URL: {}", reporter.report_url());
    reporter.run().await;
}

async fn land(
    config: BeaconConfig,
    store: &impl AttributionStore,
    transport: impl Transport,
    clock: Rc<dyn Clock>,
    landing: &QueryMap,
    navigation: NavigationType,
) {
    let notifier = CompletionNotifier::new();
    notifier.register(|| log::info!("Attribution complete"));
    LandingAttributor::new(config, store, transport, clock, notifier)
        .run(landing, navigation)
        .await;
}

fn print_requests(transport: &RecordingTransport) {
    for url in transport.requests() {
        println!("GET {url}");
    }
}

fn show<C: Clock>(store: &FileStore<C>, config: &BeaconConfig) {
    let jar = store.jar();
    println!("Jar: {} (configured page id {})", store.path().display(), config.page_id);
    println!("Cookies:");
    for (name, cookie) in &jar.cookies {
        let state = if store.cookie(name).is_some() { "" } else { " (expired)" };
        println!("  {name}={}; expires={}{state}", cookie.value, http_date(cookie.expires));
    }
    println!("Local storage:");
    for (key, value) in &jar.local_storage {
        println!("  {key}={value}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_land_with_global_flags() {
        let cli = Cli::try_parse_from([
            "attribution",
            "land",
            "https://lp.example.com/?p=1&cid=c",
            "--navigation",
            "back-forward",
            "--dry-run",
            "--now",
            "2026-10-19T00:00:00Z",
        ])
        .unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.now.map(|now| now.timestamp()), Some(1_792_368_000));
        let Commands::Land { url, navigation } = cli.command else {
            panic!("expected land");
        };
        assert_eq!(url, "https://lp.example.com/?p=1&cid=c");
        assert_eq!(NavigationType::from(navigation), NavigationType::BackForward);
    }

    #[test]
    fn missing_config_path_uses_defaults() {
        assert_eq!(load_config(None).unwrap(), BeaconConfig::default());
    }

    #[test]
    fn unreadable_config_is_an_error() {
        let path = PathBuf::from("/nonexistent/attribution.toml");
        assert!(load_config(Some(&path)).is_err());
    }
}
