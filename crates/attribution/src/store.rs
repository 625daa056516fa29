//! Durable cookie and local-storage substrate shared by the beacons.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::cookie::Cookie;
use crate::error::BeaconError;

/// Cookie jar plus local storage, as seen by a single page load.
///
/// Methods take `&self`: backends are handles onto state owned elsewhere
/// (the browser, a file, a shared in-memory map).
pub trait AttributionStore {
    /// Current cookie value, `None` when absent or empty.
    fn cookie(&self, name: &str) -> Option<String>;
    fn set_cookie(&self, cookie: &Cookie) -> Result<(), BeaconError>;
    /// Current local-storage value, `None` when absent or empty.
    fn local_item(&self, key: &str) -> Option<String>;
    fn set_local_item(&self, key: &str, value: &str) -> Result<(), BeaconError>;
}

impl<S: AttributionStore + ?Sized> AttributionStore for &S {
    fn cookie(&self, name: &str) -> Option<String> {
        (**self).cookie(name)
    }
    fn set_cookie(&self, cookie: &Cookie) -> Result<(), BeaconError> {
        (**self).set_cookie(cookie)
    }
    fn local_item(&self, key: &str) -> Option<String> {
        (**self).local_item(key)
    }
    fn set_local_item(&self, key: &str, value: &str) -> Result<(), BeaconError> {
        (**self).set_local_item(key, value)
    }
}

impl<S: AttributionStore + ?Sized> AttributionStore for Rc<S> {
    fn cookie(&self, name: &str) -> Option<String> {
        (**self).cookie(name)
    }
    fn set_cookie(&self, cookie: &Cookie) -> Result<(), BeaconError> {
        (**self).set_cookie(cookie)
    }
    fn local_item(&self, key: &str) -> Option<String> {
        (**self).local_item(key)
    }
    fn set_local_item(&self, key: &str, value: &str) -> Result<(), BeaconError> {
        (**self).set_local_item(key, value)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryState {
    pub cookies: BTreeMap<String, Cookie>,
    pub local: BTreeMap<String, String>,
}

/// In-memory store. Clones share the same state.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cookie that never expires.
    pub fn with_cookie(self, name: &str, value: &str) -> Self {
        let cookie = Cookie::cross_site(name, value, DateTime::<Utc>::MAX_UTC, 0);
        self.state.borrow_mut().cookies.insert(name.to_owned(), cookie);
        self
    }

    pub fn with_local_item(self, key: &str, value: &str) -> Self {
        self.state.borrow_mut().local.insert(key.to_owned(), value.to_owned());
        self
    }

    /// The full cookie record last written under `name`.
    pub fn cookie_record(&self, name: &str) -> Option<Cookie> {
        self.state.borrow().cookies.get(name).cloned()
    }

    pub fn snapshot(&self) -> MemoryState {
        self.state.borrow().clone()
    }
}

impl AttributionStore for MemoryStore {
    fn cookie(&self, name: &str) -> Option<String> {
        self.state
            .borrow()
            .cookies
            .get(name)
            .map(|cookie| cookie.value.clone())
            .filter(|value| !value.is_empty())
    }

    fn set_cookie(&self, cookie: &Cookie) -> Result<(), BeaconError> {
        self.state.borrow_mut().cookies.insert(cookie.name.clone(), cookie.clone());
        Ok(())
    }

    fn local_item(&self, key: &str) -> Option<String> {
        self.state.borrow().local.get(key).cloned().filter(|value| !value.is_empty())
    }

    fn set_local_item(&self, key: &str, value: &str) -> Result<(), BeaconError> {
        self.state.borrow_mut().local.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let store = MemoryStore::new();
        let handle = store.clone();
        handle.set_local_item("CL_p", "abc").unwrap();
        assert_eq!(store.local_item("CL_p").as_deref(), Some("abc"));
    }

    #[test]
    fn empty_values_read_as_absent() {
        let store = MemoryStore::new().with_cookie("CL_p", "").with_local_item("PL_p", "");
        assert_eq!(store.cookie("CL_p"), None);
        assert_eq!(store.local_item("PL_p"), None);
    }

    #[test]
    fn cookie_write_overwrites_by_name() {
        let store = MemoryStore::new().with_cookie("CL_p", "old");
        let now = DateTime::from_timestamp_millis(0).unwrap();
        store.set_cookie(&Cookie::cross_site("CL_p", "new", now, 1_000)).unwrap();
        assert_eq!(store.cookie("CL_p").as_deref(), Some("new"));
        assert_eq!(store.snapshot().cookies.len(), 1);
    }
}
