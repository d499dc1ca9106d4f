mod request;

pub use request::{Method, StreamRequest};
