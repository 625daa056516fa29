//! Single-shot HTTP GET used by both beacons.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;

use crate::error::TransportError;

/// Status and body of a completed request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Issues a GET and resolves once the exchange has ended.
///
/// Implementations never retry and never time out. Relative URLs are
/// resolved by the backend against the current page.
pub trait Transport {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, TransportError>>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, TransportError>> {
        (**self).get(url)
    }
}

impl<T: Transport + ?Sized> Transport for Rc<T> {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, TransportError>> {
        (**self).get(url)
    }
}

#[derive(Debug, Default)]
struct Recording {
    requests: Vec<String>,
    scripted: VecDeque<Result<HttpResponse, String>>,
}

/// Transport that records every URL and answers from a script.
///
/// Unscripted requests get `200` with an empty body. Clones share the
/// recording, so a test can keep one handle and give another to a beacon.
#[derive(Clone, Debug, Default)]
pub struct RecordingTransport {
    recording: Rc<RefCell<Recording>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the response for the next unanswered request.
    pub fn respond_with(self, response: HttpResponse) -> Self {
        self.recording.borrow_mut().scripted.push_back(Ok(response));
        self
    }

    /// Queue a network failure for the next unanswered request.
    pub fn fail_with(self, reason: impl Into<String>) -> Self {
        self.recording.borrow_mut().scripted.push_back(Err(reason.into()));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.recording.borrow().requests.clone()
    }
}

impl Transport for RecordingTransport {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, TransportError>> {
        let answer = {
            let mut recording = self.recording.borrow_mut();
            recording.requests.push(url.to_owned());
            recording.scripted.pop_front()
        };
        let url = url.to_owned();
        async move {
            match answer {
                None => Ok(HttpResponse::new(200, "")),
                Some(Ok(response)) => Ok(response),
                Some(Err(reason)) => Err(TransportError::Network { url, reason }),
            }
        }
    }
}
