use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use tracing::{error, info};

use super::super::domain::{Application, NationalId, NewApplication, PhoneNumber};
use super::{poisoned, ApplicationStore, Ledger, StoreError};

/// Append-only CSV file holding one application per row. Existing rows are loaded into the unique
/// indexes when the store is opened.
pub struct CsvApplicationStore {
    path: PathBuf,
    state: Mutex<CsvState>,
}

impl std::fmt::Debug for CsvApplicationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvApplicationStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

struct CsvState {
    ledger: Ledger,
    file: File,
    has_header: bool,
    /// Set when a failed append could not be rolled back; the file tail is unknown.
    broken: bool,
}

/// Byte log the rows are appended to.
trait AppendLog: Write {
    fn end(&mut self) -> io::Result<u64>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl AppendLog for File {
    fn end(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Whether a failed append left the log as it was before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppendFailure {
    RolledBack,
    Dirty,
}

/// Writes `bytes` as one unit: either all of them reach the log, or the log is cut back to its
/// previous length.
fn append_all<L: AppendLog>(log: &mut L, bytes: &[u8]) -> Result<(), (AppendFailure, io::Error)> {
    let before = log.end().map_err(|err| (AppendFailure::RolledBack, err))?;

    let written = log
        .write_all(bytes)
        .and_then(|()| log.flush())
        .and_then(|()| log.sync());

    match written {
        Ok(()) => Ok(()),
        Err(err) => match log.truncate(before) {
            Ok(()) => Err((AppendFailure::RolledBack, err)),
            Err(_) => Err((AppendFailure::Dirty, err)),
        },
    }
}

fn encode_row(record: &Application, with_header: bool) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(with_header)
        .from_writer(Vec::new());
    writer.serialize(record)?;
    writer
        .into_inner()
        .map_err(|err| StoreError::Io(err.into_error()))
}

impl CsvApplicationStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut ledger = Ledger::default();
        let has_header = path.exists() && fs::metadata(&path)?.len() > 0;
        if has_header {
            let mut reader = csv::Reader::from_path(&path)?;
            for row in reader.deserialize::<Application>() {
                ledger.commit(row?);
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        info!(path = %path.display(), applications = ledger.len(), "application store opened");

        Ok(Self {
            path,
            state: Mutex::new(CsvState {
                ledger,
                file,
                has_header,
                broken: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ApplicationStore for CsvApplicationStore {
    fn create(&self, application: NewApplication) -> Result<Application, StoreError> {
        let mut guard = self.state.lock().map_err(poisoned)?;
        let state = &mut *guard;
        if state.broken {
            return Err(StoreError::Unavailable(
                "store file has an unrecoverable partial write".to_string(),
            ));
        }

        let record = state.ledger.prepare(application, Utc::now())?;
        let bytes = encode_row(&record, !state.has_header)?;

        if let Err((failure, err)) = append_all(&mut state.file, &bytes) {
            if failure == AppendFailure::Dirty {
                error!(
                    path = %self.path.display(),
                    error = %err,
                    "partial write could not be rolled back"
                );
                state.broken = true;
            }
            return Err(err.into());
        }

        state.has_header = true;
        state.ledger.commit(record.clone());
        Ok(record)
    }

    fn exists_by_phone(&self, phone: &PhoneNumber) -> Result<bool, StoreError> {
        let guard = self.state.lock().map_err(poisoned)?;
        Ok(guard.ledger.has_phone(phone))
    }

    fn exists_by_national_id(&self, national_id: &NationalId) -> Result<bool, StoreError> {
        let guard = self.state.lock().map_err(poisoned)?;
        Ok(guard.ledger.has_national_id(national_id))
    }

    fn count(&self) -> Result<usize, StoreError> {
        let guard = self.state.lock().map_err(poisoned)?;
        Ok(guard.ledger.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::intake::domain::{ApplicationId, FormField};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn new_application(phone: &str, national_id: &str) -> NewApplication {
        NewApplication {
            full_name: "Zeynep Kaya".to_string(),
            phone: PhoneNumber::parse(phone).expect("valid phone"),
            birth_date: NaiveDate::from_ymd_opt(1975, 11, 23).expect("valid date"),
            is_existing_customer: true,
            national_id: NationalId::parse(national_id).expect("valid national id"),
        }
    }

    #[test]
    fn reopening_restores_rows_and_unique_indexes() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("leads").join("applications.csv");

        {
            let store = CsvApplicationStore::open(&path).expect("store opens");
            store
                .create(new_application("5321234567", "10000000146"))
                .expect("first insert");
            store
                .create(new_application("5339876543", "12345678950"))
                .expect("second insert");
        }

        let reopened = CsvApplicationStore::open(&path).expect("store reopens");
        assert_eq!(reopened.count().expect("count"), 2);
        assert!(reopened
            .exists_by_phone(&PhoneNumber::parse("5339876543").expect("phone"))
            .expect("lookup"));

        match reopened.create(new_application("5000000000", "12345678950")) {
            Err(StoreError::Conflict { fields }) => {
                assert_eq!(fields, vec![FormField::NationalId]);
            }
            other => panic!("expected conflict, got {other:?}"),
        }

        let third = reopened
            .create(new_application("5000000000", "11111111110"))
            .expect("third insert");
        assert_eq!(third.id, ApplicationId(3));

        let contents = fs::read_to_string(&path).expect("file readable");
        assert_eq!(contents.lines().count(), 4, "header plus three rows");
        assert!(contents.starts_with("id,full_name,phone,birth_date"));
    }

    /// In-memory log that accepts `capacity` bytes and then reports a full disk.
    struct LimitedLog {
        bytes: Vec<u8>,
        capacity: usize,
        can_truncate: bool,
    }

    impl LimitedLog {
        fn new(capacity: usize) -> Self {
            Self {
                bytes: Vec::new(),
                capacity,
                can_truncate: true,
            }
        }
    }

    impl Write for LimitedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let room = self.capacity.saturating_sub(self.bytes.len());
            if room == 0 {
                return Err(io::Error::other("no space left on device"));
            }
            let accepted = room.min(buf.len());
            self.bytes.extend_from_slice(&buf[..accepted]);
            Ok(accepted)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl AppendLog for LimitedLog {
        fn end(&mut self) -> io::Result<u64> {
            Ok(self.bytes.len() as u64)
        }

        fn truncate(&mut self, len: u64) -> io::Result<()> {
            if !self.can_truncate {
                return Err(io::Error::other("truncate unsupported"));
            }
            self.bytes.truncate(len as usize);
            Ok(())
        }

        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn record(id: u64, phone: &str, national_id: &str) -> Application {
        Application::from_new(
            ApplicationId(id),
            new_application(phone, national_id),
            Utc::now(),
        )
    }

    #[test]
    fn failed_append_leaves_no_partial_row_behind() {
        let first = encode_row(&record(1, "5321234567", "10000000146"), true).expect("encodes");
        let second = encode_row(&record(2, "5339876543", "12345678950"), false).expect("encodes");
        let mut log = LimitedLog::new(first.len() + second.len() / 2);

        append_all(&mut log, &first).expect("first row fits");
        match append_all(&mut log, &second) {
            Err((AppendFailure::RolledBack, _)) => {}
            other => panic!("expected rolled back failure, got {other:?}"),
        }
        assert_eq!(log.bytes, first, "half-written row removed");

        log.capacity = usize::MAX;
        append_all(&mut log, &second).expect("retry succeeds");

        let mut reader = csv::Reader::from_reader(log.bytes.as_slice());
        let ids: Vec<ApplicationId> = reader
            .deserialize::<Application>()
            .map(|row| row.expect("row parses").id)
            .collect();
        assert_eq!(ids, vec![ApplicationId(1), ApplicationId(2)]);
    }

    #[test]
    fn failed_rollback_is_reported_as_dirty() {
        let row = encode_row(&record(1, "5321234567", "10000000146"), true).expect("encodes");
        let mut log = LimitedLog::new(row.len() / 2);
        log.can_truncate = false;

        match append_all(&mut log, &row) {
            Err((AppendFailure::Dirty, _)) => {}
            other => panic!("expected dirty failure, got {other:?}"),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn write_failure_is_not_committed_or_replayed() {
        if !Path::new("/dev/full").exists() {
            return;
        }
        let store = CsvApplicationStore::open("/dev/full").expect("device opens");

        match store.create(new_application("5321234567", "10000000146")) {
            Err(StoreError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
        assert_eq!(store.count().expect("count"), 0);
        assert!(!store
            .exists_by_phone(&PhoneNumber::parse("5321234567").expect("phone"))
            .expect("lookup"));

        // The device cannot be truncated, so the store refuses further writes.
        match store.create(new_application("5339876543", "12345678950")) {
            Err(StoreError::Unavailable(_)) => {}
            other => panic!("expected unavailable store, got {other:?}"),
        }
        assert_eq!(store.count().expect("count"), 0);
    }
}
