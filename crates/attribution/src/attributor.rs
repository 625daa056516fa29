//! Landing Attributor: captures tracking identifiers from the landing URL,
//! resolving impression markers first, and persists them.

use log::{debug, info, warn};
use serde_json::{Number, Value};

use crate::clock::Clock;
use crate::completion::CompletionNotifier;
use crate::config::{BeaconConfig, FORWARDED_CLICK_KEYS};
use crate::cookie::{Cookie, decode_value};
use crate::error::BeaconError;
use crate::identifier::{IdentifierKind, IdentifierPair, Provenance, StorageKey};
use crate::query::{QueryMap, UrlBuilder};
use crate::store::AttributionStore;
use crate::transport::{HttpResponse, Transport};

/// Page-id field name used by the resolution response and confirmation request.
const WIRE_PAGE_KEY: &str = "p";
const RESOLUTION_MARKER_PARAM: &str = "im";
const RESOLUTION_NAVIGATION_PARAM: &str = "navi";

/// How the visitor reached the page (`performance.navigation.type`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NavigationType {
    #[default]
    Navigate,
    Reload,
    BackForward,
    Reserved,
}

impl NavigationType {
    pub fn code(self) -> u16 {
        match self {
            Self::Navigate => 0,
            Self::Reload => 1,
            Self::BackForward => 2,
            Self::Reserved => 255,
        }
    }

    pub fn from_code(code: u16) -> Self {
        match code {
            0 => Self::Navigate,
            1 => Self::Reload,
            2 => Self::BackForward,
            _ => Self::Reserved,
        }
    }
}

/// Identifiers stored by one persistence attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Persisted {
    pub page_id: String,
    pub identifiers: Vec<IdentifierPair>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributionOutcome {
    /// No page id or no identifier in the mapping; nothing stored, nobody notified.
    Skipped,
    /// Confirmation endpoint answered 200 with an empty body; local storage only.
    AlreadyConfirmed(Persisted),
    /// Any other confirmation result; cookies written as well.
    CookiesWritten(Persisted),
}

pub struct LandingAttributor<S, T, C> {
    config: BeaconConfig,
    store: S,
    transport: T,
    clock: C,
    notifier: CompletionNotifier,
}

impl<S: AttributionStore, T: Transport, C: Clock> LandingAttributor<S, T, C> {
    pub fn new(config: BeaconConfig, store: S, transport: T, clock: C, notifier: CompletionNotifier) -> Self {
        Self {
            config,
            store,
            transport,
            clock,
            notifier,
        }
    }

    /// Page-load entry point: attribute and drop the outcome after logging it.
    pub async fn run(&self, landing: &QueryMap, navigation: NavigationType) {
        match self.attribute(landing, navigation).await {
            Ok(outcome) => info!("Attribution finished: {outcome:?}"),
            Err(error) => warn!("Attribution dropped: {error}"),
        }
    }

    pub async fn attribute(
        &self,
        landing: &QueryMap,
        navigation: NavigationType,
    ) -> Result<AttributionOutcome, BeaconError> {
        let Some(marker) = landing.get(&self.config.impression_key) else {
            return self.persist(landing).await;
        };
        let url = self.resolution_url(marker, landing, navigation);
        debug!("Resolving impression: {url}");
        let response = self.transport.get(&url).await?;
        if !response.is_ok() {
            return Err(BeaconError::UnexpectedStatus {
                url,
                status: response.status,
            });
        }
        let resolved = parse_resolution(&response.body, &self.config.page_key)?;
        self.persist(&merge_url_precedence(resolved, landing)).await
    }

    pub fn resolution_url(&self, marker: &str, landing: &QueryMap, navigation: NavigationType) -> String {
        let mut url = UrlBuilder::new(self.config.resolution_endpoint.as_str())
            .param(RESOLUTION_MARKER_PARAM, marker)
            .param(RESOLUTION_NAVIGATION_PARAM, &navigation.code().to_string());
        for key in FORWARDED_CLICK_KEYS {
            if let Some(value) = landing.get(key) {
                url = url.param(key, value);
            }
        }
        url.build()
    }

    /// Store the identifiers of `mapping` and confirm them with the first-party endpoint.
    pub async fn persist(&self, mapping: &QueryMap) -> Result<AttributionOutcome, BeaconError> {
        let Some(page_id) = mapping.non_empty(&self.config.page_key) else {
            return Ok(AttributionOutcome::Skipped);
        };
        let present: Vec<(IdentifierKind, &str)> = IdentifierKind::ALL
            .into_iter()
            .filter_map(|kind| mapping.non_empty(kind.landing_key()).map(|value| (kind, value)))
            .collect();
        if present.is_empty() {
            return Ok(AttributionOutcome::Skipped);
        }

        let mut url = UrlBuilder::new(self.config.confirmation_path.as_str()).param(WIRE_PAGE_KEY, page_id);
        for &(kind, value) in &present {
            url = url.param(kind.confirmation_key(), value);
            self.store.set_local_item(StorageKey::value(kind, page_id).as_str(), value)?;
        }
        let url = url.build();
        debug!("Confirming identifiers: {url}");

        let already_confirmed = match self.transport.get(&url).await {
            Ok(HttpResponse { status: 200, body }) if body.is_empty() => true,
            Ok(response) => {
                debug!("Confirmation answered {} with {} bytes", response.status, response.body.len());
                false
            }
            Err(error) => {
                debug!("Confirmation failed: {error}");
                false
            }
        };

        let outcome = if already_confirmed {
            let identifiers = present
                .iter()
                .map(|&(kind, value)| IdentifierPair {
                    kind,
                    value: value.to_owned(),
                    provenance: None,
                })
                .collect();
            AttributionOutcome::AlreadyConfirmed(Persisted {
                page_id: page_id.to_owned(),
                identifiers,
            })
        } else {
            AttributionOutcome::CookiesWritten(self.write_cookies(page_id, &present))
        };
        self.notifier.notify();
        Ok(outcome)
    }

    fn write_cookies(&self, page_id: &str, present: &[(IdentifierKind, &str)]) -> Persisted {
        let now = self.clock.now();
        let lifetime = self.config.cookie_lifetime_ms;
        let provenance = Provenance::ScriptSet;
        let mut identifiers = Vec::with_capacity(present.len());
        for &(kind, raw) in present {
            let value = decode_value(raw).unwrap_or_else(|| {
                warn!("Storing undecodable {kind} verbatim");
                raw.to_owned()
            });
            let cookies = [
                Cookie::cross_site(StorageKey::value(kind, page_id).as_str(), value.as_str(), now, lifetime),
                Cookie::cross_site(StorageKey::tag(kind, page_id).as_str(), provenance.wire_tag(), now, lifetime),
            ];
            for cookie in &cookies {
                if let Err(error) = self.store.set_cookie(cookie) {
                    warn!("Failed to write cookie `{}`: {error}", cookie.name);
                }
            }
            identifiers.push(IdentifierPair {
                kind,
                value,
                provenance: Some(provenance.clone()),
            });
        }
        Persisted {
            page_id: page_id.to_owned(),
            identifiers,
        }
    }
}

/// Flatten a resolution response body into a mapping.
///
/// The body must be a JSON object. String values are taken as-is, numbers as
/// a browser would print them, anything else is ignored. The page-id field is copied to
/// `page_key` when the deployment uses a different name.
pub fn parse_resolution(body: &str, page_key: &str) -> Result<QueryMap, BeaconError> {
    let value: Value = serde_json::from_str(body).map_err(|error| BeaconError::MalformedResponse(error.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(BeaconError::MalformedResponse("expected a JSON object".to_owned()));
    };
    let mut resolved: QueryMap = fields
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(text) => Some((key, text)),
            Value::Number(number) => Some((key, number_text(&number))),
            _ => None,
        })
        .collect();
    if page_key != WIRE_PAGE_KEY {
        match resolved.get(WIRE_PAGE_KEY).map(str::to_owned) {
            Some(page_id) => resolved.insert(page_key, page_id),
            None => {
                resolved.remove(page_key);
            }
        }
    }
    Ok(resolved)
}

/// Integral floats lose their fraction: `1.0` reads as `1`.
fn number_text(number: &Number) -> String {
    match number.as_f64() {
        Some(float) if number.is_f64() && float == 0.0 => "0".to_owned(),
        Some(float) if number.is_f64() && float.fract() == 0.0 && float.abs() < 1e21 => format!("{float:.0}"),
        _ => number.to_string(),
    }
}

/// Overlay the landing URL's identifiers onto the resolved mapping.
pub fn merge_url_precedence(mut resolved: QueryMap, landing: &QueryMap) -> QueryMap {
    for kind in IdentifierKind::ALL {
        if let Some(value) = landing.non_empty(kind.landing_key()) {
            resolved.insert(kind.landing_key(), value);
        }
    }
    resolved
}
