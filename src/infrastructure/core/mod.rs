pub mod http_client_factory;
pub mod http_transport;

pub use http_client_factory::HttpClientFactory;
pub use http_transport::ReqwestTransport;
