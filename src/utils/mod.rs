pub mod encoding;
pub mod http;
pub mod normalize;
pub mod retry;
