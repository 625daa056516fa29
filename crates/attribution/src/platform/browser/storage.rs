//! `document.cookie` and `window.localStorage`.

use wasm_bindgen::JsCast;
use web_sys::{HtmlDocument, Storage};

use crate::cookie::{Cookie, parse_cookie_header};
use crate::error::BeaconError;
use crate::store::AttributionStore;

/// The current page's cookies and local storage.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserStore;

fn html_document() -> Option<HtmlDocument> {
    web_sys::window()?.document()?.dyn_into::<HtmlDocument>().ok()
}

fn local_storage() -> Option<Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

impl AttributionStore for BrowserStore {
    fn cookie(&self, name: &str) -> Option<String> {
        let header = html_document()?.cookie().ok()?;
        parse_cookie_header(&header).remove(name)
    }

    fn set_cookie(&self, cookie: &Cookie) -> Result<(), BeaconError> {
        let document = html_document().ok_or_else(|| BeaconError::Storage("no HTML document".to_owned()))?;
        document
            .set_cookie(&cookie.to_assignment())
            .map_err(|error| BeaconError::Storage(format!("cookie `{}` rejected: {error:?}", cookie.name)))
    }

    fn local_item(&self, key: &str) -> Option<String> {
        local_storage()?
            .get_item(key)
            .ok()
            .flatten()
            .filter(|value| !value.is_empty())
    }

    fn set_local_item(&self, key: &str, value: &str) -> Result<(), BeaconError> {
        let storage = local_storage().ok_or_else(|| BeaconError::Storage("localStorage unavailable".to_owned()))?;
        storage
            .set_item(key, value)
            .map_err(|error| BeaconError::Storage(format!("localStorage item `{key}` rejected: {error:?}")))
    }
}
