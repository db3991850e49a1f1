//! HTTP adapters: the transport seam, the authorizing pipeline and the
//! catalog API built on top of it

pub mod authorizing;
pub mod catalog;
pub mod http_client;

pub use authorizing::AuthorizingClient;
pub use catalog::CatalogClient;
pub use http_client::{
    HttpClient, MockHttpClient, RecordedRequest, ReqwestHttpClient, SimpleHttpResponse,
};
