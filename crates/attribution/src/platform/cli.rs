//! Native backend: a JSON file standing in for the browser's cookie jar and
//! local storage, and a `reqwest` transport.

pub mod storage;
pub mod transport;

pub use storage::{FileStore, Jar};
pub use transport::HttpTransport;
