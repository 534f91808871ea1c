// crates/picaimport-cli/src/commands/dispatch.rs - Per-line operation dispatch
//
// Turns one resolved Action into store calls and local file work, and
// reduces whatever happened to a single OperationOutcome.
//
// OUTCOMES:
// - record could not be loaded        -> "- FILE TS failed", no store call
// - store refused / failed            -> "- FILE TS failed"
// - stored, local write-back failed   -> "PPN FILE TS failed"
// - stored                            -> "PPN FILE TS"
// - deleted                           -> "PPN FILE TS deleted"
//
// A write-back failure keeps the PPN in the log on purpose: the store already
// holds the record, and a retry must update it rather than create a copy.
//
// Error messages travel next to the outcome on one line each; they go to the
// error channel, never into the result log.

use tracing::debug;

use picaimport_core::store::flatten_message;
use picaimport_core::{
    Action, Clock, OperationOutcome, Ppn, RecordStore, RunOptions, STDIO, StoreResult,
    StoredRecord,
};

use crate::services::RecordFiles;

/// Everything the batch driver needs to finish one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub outcome: OperationOutcome,
    /// One-line message for the error channel
    pub error: Option<String>,
    /// Source file to remove once the outcome is logged (-move)
    pub remove_after_log: Option<String>,
}

impl Dispatched {
    fn done(outcome: OperationOutcome) -> Self {
        Self {
            outcome,
            error: None,
            remove_after_log: None,
        }
    }

    fn with_error(outcome: OperationOutcome, error: impl AsRef<str>) -> Self {
        Self {
            outcome,
            error: Some(flatten_message(error.as_ref())),
            remove_after_log: None,
        }
    }
}

/// Runs store operations for resolved lines
pub struct Dispatcher<'a> {
    store: &'a mut dyn RecordStore,
    files: &'a mut RecordFiles,
    clock: &'a dyn Clock,
    options: RunOptions,
    check_ppn: bool,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        store: &'a mut dyn RecordStore,
        files: &'a mut RecordFiles,
        clock: &'a dyn Clock,
        options: RunOptions,
    ) -> Self {
        Self {
            store,
            files,
            clock,
            options,
            check_ppn: false,
        }
    }

    /// Verify PPN check characters before calling the store
    pub fn check_ppn(mut self, enabled: bool) -> Self {
        self.check_ppn = enabled;
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Remove a source file after its outcome has been logged
    pub fn remove_source(&mut self, name: &str) -> anyhow::Result<()> {
        self.files.remove(name)
    }

    /// Carry out one action
    pub fn dispatch(&mut self, action: Action) -> Dispatched {
        debug!(?action, "dispatching");

        match action {
            Action::Create { file } => self.import(None, file, false),
            Action::CreateOrUpdate { file } => self.import(None, file, true),
            Action::Update { ppn, file } => self.import(Some(ppn), file, false),
            Action::Get { ppn, file } => self.get(ppn, file),
            Action::GetFromContent { file } => self.get_from_content(file),
            Action::Delete { ppn, file } => {
                self.delete(ppn, file.unwrap_or_else(|| STDIO.to_string()))
            }
        }
    }

    fn import(&mut self, ppn: Option<Ppn>, file: String, from_content: bool) -> Dispatched {
        if let Some(error) = ppn.as_ref().and_then(|ppn| self.invalid_ppn(ppn)) {
            return self.failed(file, error);
        }

        let record = match self.files.read_record(&file) {
            Ok(record) => record,
            Err(e) => return self.failed(file, format!("{:#}", e)),
        };

        let target = match ppn {
            Some(ppn) => Some(ppn),
            None if from_content => record.ppn(),
            None => None,
        };

        let result = match &target {
            Some(ppn) => {
                if let Some(error) = self.invalid_ppn(ppn) {
                    return self.failed(file, error);
                }
                debug!(ppn = %ppn, file = %file, "update");
                self.store.update(ppn, &record)
            }
            None => {
                debug!(file = %file, "create");
                self.store.create(&record)
            }
        };

        self.finish_stored(result, file)
    }

    fn get(&mut self, ppn: Ppn, file: String) -> Dispatched {
        if let Some(error) = self.invalid_ppn(&ppn) {
            return self.failed(file, error);
        }

        debug!(ppn = %ppn, file = %file, "get");
        let result = self.store.get(&ppn);
        self.finish_stored(result, file)
    }

    fn get_from_content(&mut self, file: String) -> Dispatched {
        let ppn = match self.files.read_record(&file) {
            Ok(record) => record.ppn(),
            Err(e) => return self.failed(file, format!("{:#}", e)),
        };

        match ppn {
            Some(ppn) => self.get(ppn, file),
            None => {
                let error = format!("{}: no PPN found in record", file);
                self.failed(file, error)
            }
        }
    }

    fn delete(&mut self, ppn: Ppn, file: String) -> Dispatched {
        if let Some(error) = self.invalid_ppn(&ppn) {
            return self.failed(file, error);
        }

        debug!(ppn = %ppn, "delete");
        match self.store.delete(&ppn) {
            Ok(deleted) => Dispatched::done(OperationOutcome::deleted(
                deleted,
                file,
                self.clock.now(),
            )),
            Err(e) => {
                let error = format!("{}: {}", ppn, e.one_line());
                self.failed(file, error)
            }
        }
    }

    /// Apply write-back or move after a store call that returns a record
    fn finish_stored(&mut self, result: StoreResult<StoredRecord>, file: String) -> Dispatched {
        let stored = match result {
            Ok(stored) => stored,
            Err(e) => {
                let error = format!("{}: {}", file, e.one_line());
                return self.failed(file, error);
            }
        };

        if self.options.write_back {
            if let Err(e) = self.files.write_record(&file, &stored.record) {
                let outcome =
                    OperationOutcome::stored_with_local_failure(stored.ppn, file, self.clock.now());
                return Dispatched::with_error(outcome, format!("{:#}", e));
            }
        }

        let remove_after_log = (self.options.move_source && file != STDIO).then(|| file.clone());

        Dispatched {
            outcome: OperationOutcome::success(stored.ppn, file, self.clock.now()),
            error: None,
            remove_after_log,
        }
    }

    fn invalid_ppn(&self, ppn: &Ppn) -> Option<String> {
        if !self.check_ppn {
            return None;
        }
        ppn.verify().err().map(|e| e.to_string())
    }

    fn failed(&self, file: String, error: impl AsRef<str>) -> Dispatched {
        Dispatched::with_error(OperationOutcome::failure(file, self.clock.now()), error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{RecordingStore, new_year};
    use crate::services::result_log::testing::SharedBuffer;
    use picaimport_core::{FixedClock, ModeFlags, PicaRecord};
    use std::fs;
    use tempfile::TempDir;

    const TITLE: &str = "021A $aTitle\n";

    fn ppn(s: &str) -> Ppn {
        Ppn::parse(s).unwrap()
    }

    fn options(flags: ModeFlags) -> RunOptions {
        flags.resolve().unwrap()
    }

    struct Fixture {
        temp: TempDir,
        store: RecordingStore,
        stdout: SharedBuffer,
        clock: FixedClock,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                temp: TempDir::new().unwrap(),
                store: RecordingStore::default(),
                stdout: SharedBuffer::default(),
                clock: FixedClock(new_year()),
            }
        }

        fn write(&self, name: &str, content: &str) {
            fs::write(self.temp.path().join(name), content).unwrap();
        }

        fn read(&self, name: &str) -> String {
            fs::read_to_string(self.temp.path().join(name)).unwrap()
        }

        fn dispatch(&mut self, flags: ModeFlags, action: Action) -> Dispatched {
            let mut files = RecordFiles::with_stdout(
                self.temp.path().to_path_buf(),
                Box::new(self.stdout.clone()),
            );
            let mut dispatcher =
                Dispatcher::new(&mut self.store, &mut files, &self.clock, options(flags));
            dispatcher.dispatch(action)
        }
    }

    #[test]
    fn test_update_example() {
        let mut fx = Fixture::new();
        fx.store.seed(ppn("000073067"), TITLE);
        fx.write("title1.pica", "021A $aNew title\n");

        let result = fx.dispatch(
            ModeFlags::default(),
            Action::Update {
                ppn: ppn("000073067"),
                file: "title1.pica".to_string(),
            },
        );

        assert_eq!(fx.store.calls(), vec!["update 000073067"]);
        assert_eq!(
            result.outcome.log_line(),
            "000073067 title1.pica 2024-01-01T00:00:00"
        );
        assert_eq!(result.error, None);
        assert_eq!(result.remove_after_log, None);
    }

    #[test]
    fn test_create_example() {
        let mut fx = Fixture::new();
        fx.write("myrecord.pica", TITLE);

        let result = fx.dispatch(
            ModeFlags::default(),
            Action::Create {
                file: "myrecord.pica".to_string(),
            },
        );

        assert_eq!(fx.store.calls(), vec!["create"]);
        let new_ppn = result.outcome.store_id().unwrap().clone();
        assert_eq!(
            result.outcome.log_line(),
            format!("{} myrecord.pica 2024-01-01T00:00:00", new_ppn)
        );
        // Without -write the local file is untouched
        assert_eq!(fx.read("myrecord.pica"), TITLE);
    }

    #[test]
    fn test_empty_record_never_reaches_store() {
        let mut fx = Fixture::new();
        fx.write("empty.pica", "\n");

        let result = fx.dispatch(
            ModeFlags::default(),
            Action::Create {
                file: "empty.pica".to_string(),
            },
        );

        assert!(fx.store.calls().is_empty());
        assert_eq!(
            result.outcome.log_line(),
            "- empty.pica 2024-01-01T00:00:00 failed"
        );
        assert!(result.error.unwrap().contains("Empty record"));
    }

    #[test]
    fn test_missing_file_is_local_failure() {
        let mut fx = Fixture::new();

        let result = fx.dispatch(
            ModeFlags::default(),
            Action::Update {
                ppn: ppn("000073067"),
                file: "missing.pica".to_string(),
            },
        );

        assert!(fx.store.calls().is_empty());
        assert!(!result.outcome.is_stored());
        assert!(result.error.is_some());
    }

    #[test]
    fn test_backend_error_is_one_line() {
        let mut fx = Fixture::new();
        fx.store.fail_with("first line\nsecond line");
        fx.write("a.pica", TITLE);

        let result = fx.dispatch(
            ModeFlags::default(),
            Action::Create {
                file: "a.pica".to_string(),
            },
        );

        assert_eq!(fx.store.calls(), vec!["create"]);
        assert_eq!(result.outcome.log_line(), "- a.pica 2024-01-01T00:00:00 failed");
        let error = result.error.unwrap();
        assert!(!error.contains('\n'));
        assert!(error.contains("first line second line"));
    }

    #[test]
    fn test_create_or_update_uses_record_ppn() {
        let mut fx = Fixture::new();
        fx.store.seed(ppn("000073067"), TITLE);
        fx.write("with.pica", "003@ $0000073067\n021A $aChanged\n");
        fx.write("without.pica", TITLE);

        let derive = ModeFlags {
            derive_ppn: true,
            ..Default::default()
        };
        fx.dispatch(
            derive,
            Action::CreateOrUpdate {
                file: "with.pica".to_string(),
            },
        );
        fx.dispatch(
            derive,
            Action::CreateOrUpdate {
                file: "without.pica".to_string(),
            },
        );

        assert_eq!(fx.store.calls(), vec!["update 000073067", "create"]);
    }

    #[test]
    fn test_write_back_rewrites_file() {
        let mut fx = Fixture::new();
        fx.write("a.pica", TITLE);

        let write = ModeFlags {
            write: true,
            ..Default::default()
        };
        let result = fx.dispatch(
            write,
            Action::Create {
                file: "a.pica".to_string(),
            },
        );

        let new_ppn = result.outcome.store_id().unwrap().clone();
        let local = PicaRecord::parse(&fx.read("a.pica")).unwrap();
        assert_eq!(local.ppn(), Some(new_ppn));
        assert!(result.outcome.is_clean_success());
    }

    #[test]
    fn test_write_back_failure_keeps_ppn() {
        let mut fx = Fixture::new();
        fx.store.seed(ppn("000073067"), TITLE);
        // A directory where the file should go cannot be written
        fs::create_dir(fx.temp.path().join("down.pica")).unwrap();

        let get = ModeFlags {
            get: true,
            ..Default::default()
        };
        let result = fx.dispatch(
            get,
            Action::Get {
                ppn: ppn("000073067"),
                file: "down.pica".to_string(),
            },
        );

        assert_eq!(
            result.outcome.log_line(),
            "000073067 down.pica 2024-01-01T00:00:00 failed"
        );
        assert!(result.outcome.is_stored());
        assert!(result.error.is_some());
    }

    #[test]
    fn test_get_example() {
        let mut fx = Fixture::new();
        fx.store.seed(ppn("000073067"), TITLE);
        let get = ModeFlags {
            get: true,
            ..Default::default()
        };

        let ok = fx.dispatch(
            get,
            Action::Get {
                ppn: ppn("000073067"),
                file: "down.pica".to_string(),
            },
        );
        assert_eq!(ok.outcome.log_line(), "000073067 down.pica 2024-01-01T00:00:00");
        assert_eq!(fx.read("down.pica"), "003@ $0000073067\n021A $aTitle\n");

        let missing = fx.dispatch(
            get,
            Action::Get {
                ppn: ppn("12345678X"),
                file: "down.pica".to_string(),
            },
        );
        assert_eq!(
            missing.outcome.log_line(),
            "- down.pica 2024-01-01T00:00:00 failed"
        );
        assert_eq!(fx.store.calls(), vec!["get 000073067", "get 12345678X"]);
    }

    #[test]
    fn test_get_to_stdout() {
        let mut fx = Fixture::new();
        fx.store.seed(ppn("000073067"), TITLE);

        let get = ModeFlags {
            get: true,
            ..Default::default()
        };
        fx.dispatch(
            get,
            Action::Get {
                ppn: ppn("000073067"),
                file: "-".to_string(),
            },
        );

        assert_eq!(fx.stdout.contents(), "003@ $0000073067\n021A $aTitle\n");
    }

    #[test]
    fn test_get_from_content() {
        let mut fx = Fixture::new();
        fx.store.seed(ppn("000073067"), "021A $aServer copy\n");
        fx.write("local.pica", "003@ $0000073067\n021A $aStale\n");
        fx.write("anonymous.pica", TITLE);

        let get = ModeFlags {
            get: true,
            derive_ppn: true,
            ..Default::default()
        };
        let found = fx.dispatch(
            get,
            Action::GetFromContent {
                file: "local.pica".to_string(),
            },
        );
        assert!(found.outcome.is_clean_success());
        assert!(fx.read("local.pica").contains("Server copy"));

        let without = fx.dispatch(
            get,
            Action::GetFromContent {
                file: "anonymous.pica".to_string(),
            },
        );
        assert!(!without.outcome.is_stored());
        assert_eq!(fx.store.calls(), vec!["get 000073067"]);
    }

    #[test]
    fn test_move_removes_after_success_only() {
        let mut fx = Fixture::new();
        fx.write("a.pica", TITLE);
        fx.write("empty.pica", "");

        let moving = ModeFlags {
            move_source: true,
            ..Default::default()
        };
        let ok = fx.dispatch(
            moving,
            Action::Create {
                file: "a.pica".to_string(),
            },
        );
        assert_eq!(ok.remove_after_log.as_deref(), Some("a.pica"));
        // Removal is left to the driver, after logging
        assert!(fx.temp.path().join("a.pica").exists());

        let failed = fx.dispatch(
            moving,
            Action::Create {
                file: "empty.pica".to_string(),
            },
        );
        assert_eq!(failed.remove_after_log, None);
    }

    #[test]
    fn test_delete() {
        let mut fx = Fixture::new();
        fx.store.seed(ppn("000073067"), TITLE);
        let delete = ModeFlags {
            delete: true,
            force: true,
            ..Default::default()
        };

        let deleted = fx.dispatch(
            delete,
            Action::Delete {
                ppn: ppn("000073067"),
                file: None,
            },
        );
        assert_eq!(
            deleted.outcome.log_line(),
            "000073067 - 2024-01-01T00:00:00 deleted"
        );

        let again = fx.dispatch(
            delete,
            Action::Delete {
                ppn: ppn("000073067"),
                file: Some("old.pica".to_string()),
            },
        );
        assert_eq!(
            again.outcome.log_line(),
            "- old.pica 2024-01-01T00:00:00 failed"
        );
        assert!(again.error.unwrap().contains("not found"));
    }

    #[test]
    fn test_check_ppn_rejects_before_store() {
        let mut fx = Fixture::new();
        let mut files = RecordFiles::new(fx.temp.path().to_path_buf());
        let delete = options(ModeFlags {
            delete: true,
            force: true,
            ..Default::default()
        });
        let mut dispatcher =
            Dispatcher::new(&mut fx.store, &mut files, &fx.clock, delete).check_ppn(true);

        let result = dispatcher.dispatch(Action::Delete {
            ppn: ppn("000073068"),
            file: None,
        });

        assert!(!result.outcome.is_stored());
        assert!(result.error.unwrap().contains("check character"));
        drop(dispatcher);
        assert!(fx.store.calls().is_empty());
    }
}
