//! Tile sources and the HTTP client used to reach them.
//!
//! A [`TileSource`] turns a [`TileCoord`](crate::coord::TileCoord) into a
//! URL; an [`AsyncHttpClient`] turns a URL into bytes. Keeping the two apart
//! lets tests replace the network without touching URL construction.

mod http;
mod template;
mod types;

pub use http::{
    AsyncHttpClient, AsyncReqwestClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};
pub use template::{SourcePreset, TemplateError, TileSource, UrlTemplate};
pub use types::ProviderError;

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
