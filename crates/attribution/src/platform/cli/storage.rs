//! File-backed cookie jar and local storage.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::cookie::Cookie;
use crate::error::BeaconError;
use crate::store::AttributionStore;

/// On-disk contents: cookies by name and local-storage items by key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jar {
    #[serde(default)]
    pub cookies: BTreeMap<String, Cookie>,
    #[serde(default)]
    pub local_storage: BTreeMap<String, String>,
}

/// Every write is flushed to disk immediately. Expired cookies stay in the
/// file but read as absent.
pub struct FileStore<C> {
    path: PathBuf,
    clock: C,
    jar: RefCell<Jar>,
}

impl<C: Clock> FileStore<C> {
    /// Load the jar at `path`; a missing file is an empty jar.
    pub fn open(path: impl Into<PathBuf>, clock: C) -> Result<Self, BeaconError> {
        let path = path.into();
        let jar = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|error| BeaconError::Storage(format!("failed to parse {}: {error}", path.display())))?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Jar::default(),
            Err(error) => {
                return Err(BeaconError::Storage(format!("failed to read {}: {error}", path.display())));
            }
        };
        Ok(Self {
            path,
            clock,
            jar: RefCell::new(jar),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn jar(&self) -> Jar {
        self.jar.borrow().clone()
    }

    fn save(&self) -> Result<(), BeaconError> {
        let contents = serde_json::to_string_pretty(&*self.jar.borrow())
            .map_err(|error| BeaconError::Storage(error.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|error| BeaconError::Storage(format!("failed to create {}: {error}", parent.display())))?;
        }
        fs::write(&self.path, contents)
            .map_err(|error| BeaconError::Storage(format!("failed to write {}: {error}", self.path.display())))?;
        debug!("Saved jar to {}", self.path.display());
        Ok(())
    }
}

impl<C: Clock> AttributionStore for FileStore<C> {
    fn cookie(&self, name: &str) -> Option<String> {
        let now = self.clock.now();
        self.jar
            .borrow()
            .cookies
            .get(name)
            .filter(|cookie| !cookie.is_expired_at(now) && !cookie.value.is_empty())
            .map(|cookie| cookie.value.clone())
    }

    fn set_cookie(&self, cookie: &Cookie) -> Result<(), BeaconError> {
        self.jar.borrow_mut().cookies.insert(cookie.name.clone(), cookie.clone());
        self.save()
    }

    fn local_item(&self, key: &str) -> Option<String> {
        self.jar
            .borrow()
            .local_storage
            .get(key)
            .filter(|value| !value.is_empty())
            .cloned()
    }

    fn set_local_item(&self, key: &str, value: &str) -> Result<(), BeaconError> {
        self.jar.borrow_mut().local_storage.insert(key.to_owned(), value.to_owned());
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributor::{AttributionOutcome, LandingAttributor, NavigationType};
    use crate::clock::FixedClock;
    use crate::completion::CompletionNotifier;
    use crate::config::BeaconConfig;
    use crate::query::QueryMap;
    use crate::transport::{HttpResponse, RecordingTransport};
    use chrono::TimeDelta;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn missing_file_is_empty_jar() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("jar.json"), FixedClock::at_millis(0)).unwrap();
        assert_eq!(store.jar(), Jar::default());
        assert_eq!(store.cookie("CL_p"), None);
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("jar.json");
        let clock = FixedClock::at_millis(0);
        {
            let store = FileStore::open(&path, &clock).unwrap();
            store.set_local_item("CL_p", "raw%20value").unwrap();
            store
                .set_cookie(&Cookie::cross_site("CL_p", "raw value", clock.now(), 10_000))
                .unwrap();
        }
        let store = FileStore::open(&path, &clock).unwrap();
        assert_eq!(store.local_item("CL_p").as_deref(), Some("raw%20value"));
        assert_eq!(store.cookie("CL_p").as_deref(), Some("raw value"));
    }

    #[test]
    fn expired_cookies_read_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let clock = FixedClock::at_millis(0);
        let store = FileStore::open(dir.path().join("jar.json"), &clock).unwrap();
        store
            .set_cookie(&Cookie::cross_site("CL_p", "v", clock.now(), 1_000))
            .unwrap();
        clock.advance_by(TimeDelta::milliseconds(999));
        assert_eq!(store.cookie("CL_p").as_deref(), Some("v"));
        clock.advance_by(TimeDelta::milliseconds(1));
        assert_eq!(store.cookie("CL_p"), None);
        assert!(store.jar().cookies.contains_key("CL_p"));
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jar.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            FileStore::open(&path, FixedClock::at_millis(0)),
            Err(BeaconError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn landing_attribution_persists_to_jar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jar.json");
        let clock = FixedClock::at_millis(0);
        let transport = RecordingTransport::new()
            .respond_with(HttpResponse::new(200, r#"{"p":"9","cid":"resolved"}"#))
            .respond_with(HttpResponse::new(200, "new"));
        let notifier = CompletionNotifier::new();
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        notifier.register(move || counter.set(counter.get() + 1));
        {
            let store = FileStore::open(&path, &clock).unwrap();
            let attributor = LandingAttributor::new(BeaconConfig::default(), &store, transport.clone(), &clock, notifier);
            let outcome = attributor
                .attribute(&QueryMap::from_url("https://lp.test/?im=XYZ&gclid=g%2F1"), NavigationType::Navigate)
                .await
                .unwrap();
            assert!(matches!(outcome, AttributionOutcome::CookiesWritten(_)));
        }
        assert_eq!(transport.requests()[1], "./lptag.php?p=9&cid=resolved&gclid=g%2F1");
        assert_eq!(fired.get(), 1);

        let store = FileStore::open(&path, &clock).unwrap();
        assert_eq!(store.local_item("CL_9").as_deref(), Some("resolved"));
        assert_eq!(store.local_item("PL_9").as_deref(), Some("g%2F1"));
        assert_eq!(store.cookie("PL_9").as_deref(), Some("g/1"));
        assert_eq!(store.cookie("ACT_9").as_deref(), Some("js"));
        assert_eq!(store.cookie("APT_9").as_deref(), Some("js"));
        assert_eq!(store.jar().cookies["CL_9"].expires.timestamp_millis(), 63_072_000_000);
    }
}
