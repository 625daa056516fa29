//! `XMLHttpRequest` transport, completing on `loadend`.

use std::future::Future;

use futures_channel::oneshot;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::XmlHttpRequest;

use crate::error::TransportError;
use crate::transport::{HttpResponse, Transport};

#[derive(Clone, Copy, Debug, Default)]
pub struct XhrTransport;

fn network_error(url: &str, error: JsValue) -> TransportError {
    TransportError::Network {
        url: url.to_owned(),
        reason: format!("{error:?}"),
    }
}

impl Transport for XhrTransport {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, TransportError>> {
        let url = url.to_owned();
        async move {
            let request = XmlHttpRequest::new().map_err(|error| network_error(&url, error))?;
            request.open("GET", &url).map_err(|error| network_error(&url, error))?;

            let (loadend_sender, loadend_receiver) = oneshot::channel::<()>();
            let mut loadend_sender = Some(loadend_sender);
            let on_loadend = Closure::<dyn FnMut()>::new(move || {
                if let Some(sender) = loadend_sender.take() {
                    let _ = sender.send(());
                }
            });
            request.set_onloadend(Some(on_loadend.as_ref().unchecked_ref()));
            request.send().map_err(|error| network_error(&url, error))?;

            // `on_loadend` must outlive the request.
            let ended = loadend_receiver.await;
            request.set_onloadend(None);
            drop(on_loadend);
            if ended.is_err() {
                return Err(TransportError::Network {
                    url,
                    reason: "request abandoned".to_owned(),
                });
            }

            let status = request.status().map_err(|error| network_error(&url, error))?;
            // Status 0: the request ended without any response.
            if status == 0 {
                return Err(TransportError::Network {
                    url,
                    reason: "no response".to_owned(),
                });
            }
            let body = request.response_text().ok().flatten().unwrap_or_default();
            Ok(HttpResponse::new(status, body))
        }
    }
}
