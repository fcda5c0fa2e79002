pub mod error;

pub use error::{FetchPoolError, Result, TransportError};
