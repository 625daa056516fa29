//! Affiliate attribution beacons.
//!
//! Two page-load flows share a cookie / local-storage substrate:
//!
//! - [`ConversionReporter`] reads stored identifiers and reports them to the
//!   tracking endpoint.
//! - [`LandingAttributor`] captures identifiers from the landing URL,
//!   resolving impression markers first, and persists them.
//!
//! Both are generic over [`AttributionStore`] and [`Transport`]; concrete
//! backends live in [`platform`].

pub mod attributor;
pub mod clock;
pub mod completion;
pub mod config;
pub mod cookie;
pub mod error;
pub mod identifier;
pub mod platform;
pub mod query;
pub mod reporter;
pub mod store;
pub mod transport;

pub use attributor::{AttributionOutcome, LandingAttributor, NavigationType, Persisted};
pub use clock::{Clock, FixedClock, SystemClock};
pub use completion::CompletionNotifier;
pub use config::BeaconConfig;
pub use cookie::Cookie;
pub use error::{BeaconError, TransportError};
pub use identifier::{IdentifierKind, IdentifierPair, Provenance, StorageKey};
pub use query::QueryMap;
pub use reporter::ConversionReporter;
pub use store::{AttributionStore, MemoryStore};
pub use transport::{HttpResponse, RecordingTransport, Transport};
