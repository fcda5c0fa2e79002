pub mod response;

pub use response::{FailureKind, FetchFailure, FetchOutcome, FetchResponse};
