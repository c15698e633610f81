//! Concrete adapters for the external search provider and verification scorer.

mod http_scorer;
mod ytdlp;

pub use http_scorer::HttpVerificationScorer;
pub use ytdlp::{YtDlpSearchProvider, parse_dump};
