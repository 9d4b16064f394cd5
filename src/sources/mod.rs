pub mod backend;

pub use backend::{AnalysisBackend, ApiClient, BackendFuture};
