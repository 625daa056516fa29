//! Conversion Reporter: tells the tracking endpoint which identifiers this
//! visitor carries.

use log::{debug, warn};

use crate::config::BeaconConfig;
use crate::error::BeaconError;
use crate::identifier::{IdentifierKind, IdentifierPair, Provenance, StorageKey};
use crate::query::UrlBuilder;
use crate::store::AttributionStore;
use crate::transport::Transport;

pub struct ConversionReporter<S, T> {
    config: BeaconConfig,
    store: S,
    transport: T,
}

impl<S: AttributionStore, T: Transport> ConversionReporter<S, T> {
    pub fn new(config: BeaconConfig, store: S, transport: T) -> Self {
        Self {
            config,
            store,
            transport,
        }
    }

    /// Stored identifiers, cookies first, local storage as fallback.
    pub fn stored_identifiers(&self) -> Vec<IdentifierPair> {
        let page_id = &self.config.page_id;
        IdentifierKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let value_key = StorageKey::value(kind, page_id);
                if let Some(value) = self.store.cookie(value_key.as_str()) {
                    let provenance = self
                        .store
                        .cookie(StorageKey::tag(kind, page_id).as_str())
                        .map(Provenance::Cookie);
                    return Some(IdentifierPair {
                        kind,
                        value,
                        provenance,
                    });
                }
                self.store.local_item(value_key.as_str()).map(|value| IdentifierPair {
                    kind,
                    value,
                    provenance: Some(Provenance::LocalStorage),
                })
            })
            .collect()
    }

    pub fn report_url(&self) -> String {
        let page_id = &self.config.page_id;
        let mut url = UrlBuilder::new(self.config.report_endpoint.as_str()).param("p", page_id);
        for pair in self.stored_identifiers() {
            url = url.param(pair.kind.report_key(), &pair.value);
            if let Some(provenance) = &pair.provenance {
                url = url.param(StorageKey::tag(pair.kind, page_id).as_str(), provenance.wire_tag());
            }
        }
        url.build()
    }

    /// Send the report. The response is not inspected.
    pub async fn report(&self) -> Result<(), BeaconError> {
        let url = self.report_url();
        debug!("Reporting conversion: {url}");
        let response = self.transport.get(&url).await?;
        debug!("Conversion report answered with status {}", response.status);
        Ok(())
    }

    /// Page-load entry point: report and drop the outcome after logging it.
    pub async fn run(&self) {
        if let Err(error) = self.report().await {
            warn!("Conversion report dropped: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::transport::{HttpResponse, RecordingTransport};

    fn config() -> BeaconConfig {
        BeaconConfig {
            page_id: "pg1".to_owned(),
            report_endpoint: "https://t.test/track.php".to_owned(),
            ..BeaconConfig::default()
        }
    }

    fn reporter(store: MemoryStore) -> ConversionReporter<MemoryStore, RecordingTransport> {
        ConversionReporter::new(config(), store, RecordingTransport::new())
    }

    #[test]
    fn reports_cookie_values_with_tags() {
        let store = MemoryStore::new()
            .with_cookie("CL_pg1", "click")
            .with_cookie("ACT_pg1", "js")
            .with_cookie("PL_pg1", "link");
        assert_eq!(
            reporter(store).report_url(),
            "https://t.test/track.php?p=pg1&cid=click&ACT_pg1=js&plid=link"
        );
    }

    #[test]
    fn local_storage_fallback_is_tagged_ls() {
        let store = MemoryStore::new().with_local_item("PL_pg1", "link");
        let reporter = reporter(store);
        assert_eq!(
            reporter.stored_identifiers(),
            vec![IdentifierPair {
                kind: IdentifierKind::PartnerLinkId,
                value: "link".to_owned(),
                provenance: Some(Provenance::LocalStorage),
            }]
        );
        assert_eq!(reporter.report_url(), "https://t.test/track.php?p=pg1&plid=link&APT_pg1=ls");
    }

    #[test]
    fn cookie_takes_precedence_over_local_storage() {
        let store = MemoryStore::new()
            .with_cookie("CL_pg1", "from-cookie")
            .with_local_item("CL_pg1", "from-ls");
        assert_eq!(reporter(store).report_url(), "https://t.test/track.php?p=pg1&cid=from-cookie");
    }

    #[test]
    fn tag_cookie_without_value_is_ignored() {
        let store = MemoryStore::new().with_cookie("ACT_pg1", "js");
        assert_eq!(reporter(store).report_url(), "https://t.test/track.php?p=pg1");
    }

    #[test]
    fn other_pages_are_not_reported() {
        let store = MemoryStore::new().with_cookie("CL_other", "click");
        assert_eq!(reporter(store).report_url(), "https://t.test/track.php?p=pg1");
    }

    #[tokio::test]
    async fn report_issues_single_request() {
        let store = MemoryStore::new().with_cookie("CL_pg1", "click");
        let transport = RecordingTransport::new().respond_with(HttpResponse::new(500, ""));
        let reporter = ConversionReporter::new(config(), store, transport.clone());
        reporter.report().await.unwrap();
        assert_eq!(transport.requests(), vec!["https://t.test/track.php?p=pg1&cid=click"]);
    }

    #[tokio::test]
    async fn network_failure_is_swallowed_by_run() {
        let transport = RecordingTransport::new().fail_with("offline");
        let reporter = ConversionReporter::new(config(), MemoryStore::new(), transport.clone());
        reporter.run().await;
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn network_failure_surfaces_from_report() {
        let transport = RecordingTransport::new().fail_with("offline");
        let reporter = ConversionReporter::new(config(), MemoryStore::new(), transport);
        assert!(matches!(reporter.report().await, Err(BeaconError::Transport(_))));
    }
}
