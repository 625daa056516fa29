//! Browser backend and page-load entry points.

pub mod storage;
pub mod transport;

pub use storage::BrowserStore;
pub use transport::XhrTransport;

use log::{Level, LevelFilter, Log, Metadata, Record};
use zoon::{Task, eprintln, println};

use crate::attributor::{LandingAttributor, NavigationType};
use crate::clock::SystemClock;
use crate::completion::CompletionNotifier;
use crate::config::BeaconConfig;
use crate::query::QueryMap;
use crate::reporter::ConversionReporter;

/// Forwards `log` records to the browser console.
struct ConsoleLogger;

static CONSOLE_LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error | Level::Warn => eprintln!("[attribution] {}", record.args()),
            _ => println!("[attribution] {}", record.args()),
        }
    }

    fn flush(&self) {}
}

/// Route log output to the console unless the page installed its own logger.
fn install_console_logger() {
    if log::set_logger(&CONSOLE_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}

/// Report stored identifiers without blocking the page.
pub fn start_conversion_reporter(config: BeaconConfig) {
    install_console_logger();
    Task::start(async move {
        ConversionReporter::new(config, BrowserStore, XhrTransport).run().await;
    });
}

/// Attribute the current page load. Listeners registered on `notifier`
/// run once identifiers have been persisted.
pub fn start_landing_attributor(config: BeaconConfig, notifier: CompletionNotifier) {
    install_console_logger();
    let landing = current_query();
    let navigation = current_navigation_type();
    Task::start(async move {
        LandingAttributor::new(config, BrowserStore, XhrTransport, SystemClock, notifier)
            .run(&landing, navigation)
            .await;
    });
}

fn current_query() -> QueryMap {
    web_sys::window()
        .and_then(|window| window.location().search().ok())
        .map(|search| QueryMap::parse(&search))
        .unwrap_or_default()
}

fn current_navigation_type() -> NavigationType {
    web_sys::window()
        .and_then(|window| window.performance())
        .map(|performance| NavigationType::from_code(performance.navigation().type_()))
        .unwrap_or_default()
}
