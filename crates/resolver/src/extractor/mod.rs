mod default;
pub mod error;
pub mod platform_extractor;
pub mod platforms;

pub use default::{DEFAULT_REFERER, DEFAULT_TIMEOUT, DEFAULT_UA, ProxyConfig, create_client};
