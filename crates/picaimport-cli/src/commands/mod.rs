// crates/picaimport-cli/src/commands/mod.rs - Batch processing
//
// - dispatch: one resolved line -> store call, local file work, outcome
// - batch: input lines -> dispatcher -> result log, plus the delete gate

pub mod batch;
pub mod dispatch;
