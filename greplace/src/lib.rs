pub mod config;
pub mod encoding;
pub mod errors;
pub mod filters;
pub mod pattern;
pub mod results;
pub mod search;
pub mod text_file;
pub mod walker;

pub use config::SearchConfig;
pub use encoding::TextEncoding;
pub use errors::{SearchError, SearchResult};
pub use results::{ByteRange, FileMatch, LineRecord};
pub use search::{IncludeFilter, SearchEngine, SearchObserver, SearchParams};
