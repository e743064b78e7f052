/*!
# Core Module

Core functionality shared by every stage: error taxonomy, load reports
and file system helpers.
*/

pub mod errors;
pub mod fs_utils;

pub use errors::{CacheError, LoadError, LoadReport, SearchError};
pub use fs_utils::{read_metadata_file, SourceSignature};
