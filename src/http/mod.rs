// Gateway module for http - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod executor;
mod kv;
mod normalizer;
mod transport;
mod types;

// Public re-exports - the ONLY way to access http functionality
pub use executor::{build_request, effective_url, validate_url, RequestExecutor};
pub use kv::{KeyValueList, KeyValuePair};
pub use normalizer::normalize;
pub use transport::{OutgoingRequest, RawResponse, ReqwestTransport, Transport};
pub use types::{
    HttpMethod, ProxySetting, RequestDescriptor, ResponseBody, ResponseRecord, StatusClass,
};
