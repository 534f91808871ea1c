// crates/picaimport-cli/src/services/mod.rs - Service layer modules
pub mod prompt;
pub mod record_files;
pub mod result_log;

pub use prompt::{Confirm, TerminalPrompt};
pub use record_files::RecordFiles;
pub use result_log::ResultLog;
