use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::path::Path;
use std::ptr::{self, NonNull};
use std::sync::{Arc, Mutex, MutexGuard};

use libsqlite3_sys as ffi;
use tracing::debug;

use crate::config::{ConnectionOptions, OpenMode};
use crate::error::{Result, RowFlowError};
use crate::traits::{DatabaseDriver, RawStatement, StepResult};
use crate::types::Value;

/// Raw connection pointer. Null once closed.
struct RawDb(*mut ffi::sqlite3);

// The connection is always opened with SQLITE_OPEN_FULLMUTEX, so the
// engine serializes access to the handle itself.
unsafe impl Send for RawDb {}

struct DbHandle {
    db: Mutex<RawDb>,
    path: String,
}

impl DbHandle {
    fn lock(&self) -> MutexGuard<'_, RawDb> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for DbHandle {
    fn drop(&mut self) {
        let db = self.lock().0;
        if !db.is_null() {
            unsafe {
                ffi::sqlite3_close(db);
            }
            debug!(path = %self.path, "sqlite connection closed");
        }
    }
}

/// SQLite driver implementation over the SQLite C API.
///
/// Every prepared statement keeps the connection alive, so a statement can
/// never outlive the database handle it was compiled against.
#[derive(Clone)]
pub struct SqliteDriver {
    handle: Arc<DbHandle>,
}

impl SqliteDriver {
    /// Open a database file. `":memory:"` opens a private in-memory database.
    pub fn open(path: impl AsRef<Path>, options: &ConnectionOptions) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_str().ok_or_else(|| RowFlowError::Connection {
            code: ffi::SQLITE_MISUSE,
            message: format!("path is not valid UTF-8: {}", path.display()),
        })?;
        let c_path = CString::new(path_str).map_err(|_| RowFlowError::Connection {
            code: ffi::SQLITE_MISUSE,
            message: "path contains NUL byte".to_string(),
        })?;

        let flags = match options.mode {
            OpenMode::ReadOnly => ffi::SQLITE_OPEN_READONLY,
            OpenMode::ReadWrite => ffi::SQLITE_OPEN_READWRITE,
            OpenMode::ReadWriteCreate => ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE,
        } | ffi::SQLITE_OPEN_FULLMUTEX
            | ffi::SQLITE_OPEN_URI;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };
        if rc != ffi::SQLITE_OK {
            let message = if db.is_null() {
                error_string(rc)
            } else {
                unsafe { error_message(db) }
            };
            unsafe {
                ffi::sqlite3_close(db);
            }
            return Err(RowFlowError::Connection { code: rc, message });
        }

        let driver = Self {
            handle: Arc::new(DbHandle {
                db: Mutex::new(RawDb(db)),
                path: path_str.to_string(),
            }),
        };

        if let Some(timeout) = options.busy_timeout {
            let ms = c_int::try_from(timeout.as_millis()).unwrap_or(c_int::MAX);
            let rc = unsafe { ffi::sqlite3_busy_timeout(db, ms) };
            if rc != ffi::SQLITE_OK {
                return Err(RowFlowError::Connection {
                    code: rc,
                    message: unsafe { error_message(db) },
                });
            }
        }
        if options.mode == OpenMode::ReadOnly {
            driver.exec("PRAGMA query_only = 1")?;
        }

        debug!(path = %path_str, mode = ?options.mode, "sqlite connection opened");
        Ok(driver)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:", &ConnectionOptions::default())
    }

    fn exec(&self, sql: &str) -> Result<()> {
        let guard = self.handle.lock();
        let c_sql = CString::new(sql).map_err(|_| RowFlowError::Connection {
            code: ffi::SQLITE_MISUSE,
            message: "SQL contains NUL byte".to_string(),
        })?;
        let rc = unsafe {
            ffi::sqlite3_exec(guard.0, c_sql.as_ptr(), None, ptr::null_mut(), ptr::null_mut())
        };
        if rc != ffi::SQLITE_OK {
            return Err(RowFlowError::Connection {
                code: rc,
                message: unsafe { error_message(guard.0) },
            });
        }
        Ok(())
    }
}

impl DatabaseDriver for SqliteDriver {
    fn prepare(&self, sql: &str) -> Result<Box<dyn RawStatement>> {
        let guard = self.handle.lock();
        let db = guard.0;
        if db.is_null() {
            return Err(RowFlowError::Connection {
                code: ffi::SQLITE_MISUSE,
                message: "connection is closed".to_string(),
            });
        }
        let c_sql = CString::new(sql).map_err(|_| RowFlowError::Prepare {
            code: ffi::SQLITE_MISUSE,
            message: "SQL contains NUL byte".to_string(),
        })?;

        let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();
        let mut tail: *const c_char = ptr::null();
        let rc = unsafe { ffi::sqlite3_prepare_v2(db, c_sql.as_ptr(), -1, &mut stmt, &mut tail) };
        if rc != ffi::SQLITE_OK {
            return Err(RowFlowError::Prepare {
                code: rc,
                message: unsafe { error_message(db) },
            });
        }
        // Empty input or a comment compiles to no statement at all.
        let stmt = NonNull::new(stmt).ok_or_else(|| RowFlowError::Prepare {
            code: ffi::SQLITE_MISUSE,
            message: "no SQL statement to prepare".to_string(),
        })?;

        if unsafe { trailing_statement(db, tail) } {
            unsafe {
                ffi::sqlite3_finalize(stmt.as_ptr());
            }
            return Err(RowFlowError::Prepare {
                code: ffi::SQLITE_MISUSE,
                message: "multiple SQL statements; only one can be prepared at a time"
                    .to_string(),
            });
        }

        Ok(Box::new(SqliteStatement {
            stmt,
            db,
            _handle: Arc::clone(&self.handle),
        }))
    }

    fn close(&self) -> Result<()> {
        let mut guard = self.handle.lock();
        if guard.0.is_null() {
            return Ok(());
        }
        let rc = unsafe { ffi::sqlite3_close(guard.0) };
        if rc != ffi::SQLITE_OK {
            return Err(RowFlowError::Connection {
                code: rc,
                message: unsafe { error_message(guard.0) },
            });
        }
        guard.0 = ptr::null_mut();
        debug!(path = %self.handle.path, "sqlite connection closed");
        Ok(())
    }
}

struct SqliteStatement {
    stmt: NonNull<ffi::sqlite3_stmt>,
    db: *mut ffi::sqlite3,
    _handle: Arc<DbHandle>,
}

// Owned by exactly one statement handle; the connection runs in serialized mode.
unsafe impl Send for SqliteStatement {}

impl SqliteStatement {
    fn bind_error(&self, position: usize, code: c_int) -> RowFlowError {
        RowFlowError::Bind {
            position,
            code,
            message: unsafe { error_message(self.db) },
        }
    }

    fn column(&self, index: usize) -> c_int {
        c_int::try_from(index).unwrap_or(c_int::MAX)
    }
}

impl RawStatement for SqliteStatement {
    fn bind(&mut self, position: usize, value: Option<&Value>) -> Result<()> {
        let stmt = self.stmt.as_ptr();
        let index = c_int::try_from(position).map_err(|_| RowFlowError::Bind {
            position,
            code: ffi::SQLITE_RANGE,
            message: "parameter index out of range".to_string(),
        })?;
        let too_big = || RowFlowError::Bind {
            position,
            code: ffi::SQLITE_TOOBIG,
            message: "parameter value too large".to_string(),
        };

        let rc = unsafe {
            match value {
                None | Some(Value::Null) => ffi::sqlite3_bind_null(stmt, index),
                Some(Value::Integer(v)) => ffi::sqlite3_bind_int64(stmt, index, *v),
                Some(Value::Real(v)) => ffi::sqlite3_bind_double(stmt, index, *v),
                Some(Value::Text(v)) => {
                    let len = c_int::try_from(v.len()).map_err(|_| too_big())?;
                    ffi::sqlite3_bind_text(
                        stmt,
                        index,
                        v.as_ptr() as *const c_char,
                        len,
                        ffi::SQLITE_TRANSIENT(),
                    )
                }
                Some(Value::Blob(v)) => {
                    let len = c_int::try_from(v.len()).map_err(|_| too_big())?;
                    ffi::sqlite3_bind_blob(
                        stmt,
                        index,
                        v.as_ptr() as *const c_void,
                        len,
                        ffi::SQLITE_TRANSIENT(),
                    )
                }
            }
        };
        if rc != ffi::SQLITE_OK {
            return Err(self.bind_error(position, rc));
        }
        Ok(())
    }

    fn step(&mut self) -> Result<StepResult> {
        let rc = unsafe { ffi::sqlite3_step(self.stmt.as_ptr()) };
        match rc {
            ffi::SQLITE_ROW => Ok(StepResult::Row),
            ffi::SQLITE_DONE => Ok(StepResult::Done),
            code => Err(RowFlowError::Step {
                code,
                message: unsafe { error_message(self.db) },
            }),
        }
    }

    fn column_count(&self) -> usize {
        let count = unsafe { ffi::sqlite3_column_count(self.stmt.as_ptr()) };
        usize::try_from(count).unwrap_or(0)
    }

    fn column_type(&self, index: usize) -> i32 {
        unsafe { ffi::sqlite3_column_type(self.stmt.as_ptr(), self.column(index)) }
    }

    fn column_integer(&self, index: usize) -> i64 {
        unsafe { ffi::sqlite3_column_int64(self.stmt.as_ptr(), self.column(index)) }
    }

    fn column_real(&self, index: usize) -> f64 {
        unsafe { ffi::sqlite3_column_double(self.stmt.as_ptr(), self.column(index)) }
    }

    fn column_text(&self, index: usize) -> Result<String> {
        let bytes = unsafe {
            let text = ffi::sqlite3_column_text(self.stmt.as_ptr(), self.column(index));
            let len = ffi::sqlite3_column_bytes(self.stmt.as_ptr(), self.column(index));
            raw_bytes(text as *const u8, len)
        };
        String::from_utf8(bytes.to_vec())
            .map_err(|_| RowFlowError::mismatch(format!("invalid UTF-8 in column {}", index)))
    }

    fn column_blob(&self, index: usize) -> Vec<u8> {
        unsafe {
            let blob = ffi::sqlite3_column_blob(self.stmt.as_ptr(), self.column(index));
            let len = ffi::sqlite3_column_bytes(self.stmt.as_ptr(), self.column(index));
            raw_bytes(blob as *const u8, len).to_vec()
        }
    }

    fn finalize(self: Box<Self>) -> Result<()> {
        let rc = unsafe { ffi::sqlite3_finalize(self.stmt.as_ptr()) };
        if rc != ffi::SQLITE_OK {
            return Err(RowFlowError::Finalize {
                code: rc,
                message: unsafe { error_message(self.db) },
            });
        }
        Ok(())
    }
}

/// # Safety
/// `ptr` must be null or point to at least `len` readable bytes that stay
/// valid for the returned lifetime.
unsafe fn raw_bytes<'a>(ptr: *const u8, len: c_int) -> &'a [u8] {
    if ptr.is_null() || len <= 0 {
        return &[];
    }
    std::slice::from_raw_parts(ptr, len as usize)
}

/// Whether `tail` holds SQL beyond whitespace and comments.
///
/// # Safety
/// `db` must be a live connection handle and `tail` null or a NUL-terminated
/// string.
unsafe fn trailing_statement(db: *mut ffi::sqlite3, tail: *const c_char) -> bool {
    if tail.is_null() || *tail == 0 {
        return false;
    }
    let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();
    let rc = ffi::sqlite3_prepare_v2(db, tail, -1, &mut stmt, ptr::null_mut());
    if !stmt.is_null() {
        ffi::sqlite3_finalize(stmt);
    }
    rc != ffi::SQLITE_OK || !stmt.is_null()
}

/// # Safety
/// `db` must be a live connection handle.
unsafe fn error_message(db: *mut ffi::sqlite3) -> String {
    let msg = ffi::sqlite3_errmsg(db);
    if msg.is_null() {
        return String::new();
    }
    CStr::from_ptr(msg).to_string_lossy().into_owned()
}

fn error_string(code: c_int) -> String {
    unsafe {
        let msg = ffi::sqlite3_errstr(code);
        if msg.is_null() {
            return format!("sqlite error {}", code);
        }
        CStr::from_ptr(msg).to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepare(driver: &SqliteDriver, sql: &str) -> Box<dyn RawStatement> {
        driver.prepare(sql).unwrap()
    }

    #[test]
    fn test_prepare_error_carries_engine_message() {
        let driver = SqliteDriver::open_in_memory().unwrap();
        let err = driver.prepare("SELEC 1").err().unwrap();
        match err {
            RowFlowError::Prepare { code, message } => {
                assert_eq!(code, ffi::SQLITE_ERROR);
                assert!(message.contains("syntax error"), "{}", message);
            }
            other => panic!("Expected Prepare error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_sql_is_rejected() {
        let driver = SqliteDriver::open_in_memory().unwrap();
        assert!(matches!(
            driver.prepare("   ").err(),
            Some(RowFlowError::Prepare { .. })
        ));
    }

    #[test]
    fn test_trailing_statement_is_rejected() {
        let driver = SqliteDriver::open_in_memory().unwrap();
        let err = driver.prepare("SELECT 1; SELECT 2").err().unwrap();
        assert!(matches!(
            err,
            RowFlowError::Prepare { code, .. } if code == ffi::SQLITE_MISUSE
        ));
        assert!(matches!(
            driver.prepare("SELECT 1; SELEC 2").err(),
            Some(RowFlowError::Prepare { .. })
        ));
        driver.close().unwrap();
    }

    #[test]
    fn test_trailing_whitespace_and_comments_are_accepted() {
        let driver = SqliteDriver::open_in_memory().unwrap();
        for sql in ["SELECT 1;", "SELECT 1;  \n", "SELECT 1; -- done", "SELECT 1; /* done */"] {
            let mut stmt = prepare(&driver, sql);
            assert_eq!(stmt.step().unwrap(), StepResult::Row, "{}", sql);
            assert_eq!(stmt.column_integer(0), 1);
            stmt.finalize().unwrap();
        }
    }

    #[test]
    fn test_invalid_utf8_text_is_rejected() {
        let driver = SqliteDriver::open_in_memory().unwrap();
        let mut stmt = prepare(&driver, "SELECT CAST(x'ff61' AS TEXT)");
        assert_eq!(stmt.step().unwrap(), StepResult::Row);
        assert_eq!(stmt.column_type(0), ffi::SQLITE_TEXT);
        assert_eq!(
            stmt.column_text(0).unwrap_err(),
            RowFlowError::MismatchOutputType("invalid UTF-8 in column 0".to_string())
        );
        stmt.finalize().unwrap();
    }

    #[test]
    fn test_step_and_read_columns() {
        let driver = SqliteDriver::open_in_memory().unwrap();
        let mut stmt = prepare(&driver, "SELECT ?, ?, ?, ?, ?");
        stmt.bind(1, Some(&Value::Integer(7))).unwrap();
        stmt.bind(2, Some(&Value::Real(0.5))).unwrap();
        stmt.bind(3, Some(&Value::from("héllo"))).unwrap();
        stmt.bind(4, Some(&Value::Blob(vec![0, 1, 2]))).unwrap();
        stmt.bind(5, None).unwrap();

        assert_eq!(stmt.step().unwrap(), StepResult::Row);
        assert_eq!(stmt.column_count(), 5);
        assert_eq!(stmt.column_type(0), ffi::SQLITE_INTEGER);
        assert_eq!(stmt.column_integer(0), 7);
        assert_eq!(stmt.column_type(1), ffi::SQLITE_FLOAT);
        assert_eq!(stmt.column_real(1), 0.5);
        assert_eq!(stmt.column_text(2).unwrap(), "héllo");
        assert_eq!(stmt.column_blob(3), vec![0, 1, 2]);
        assert_eq!(stmt.column_type(4), ffi::SQLITE_NULL);
        assert_eq!(stmt.step().unwrap(), StepResult::Done);
        stmt.finalize().unwrap();
    }

    #[test]
    fn test_bind_out_of_range() {
        let driver = SqliteDriver::open_in_memory().unwrap();
        let mut stmt = prepare(&driver, "SELECT ?");
        let err = stmt.bind(2, Some(&Value::Integer(1))).unwrap_err();
        assert!(matches!(
            err,
            RowFlowError::Bind { position: 2, code, .. } if code == ffi::SQLITE_RANGE
        ));
        stmt.finalize().unwrap();
    }

    #[test]
    fn test_close_waits_for_statements() {
        let driver = SqliteDriver::open_in_memory().unwrap();
        let stmt = prepare(&driver, "SELECT 1");
        let err = driver.close().unwrap_err();
        assert_eq!(err.code(), Some(ffi::SQLITE_BUSY));

        stmt.finalize().unwrap();
        driver.close().unwrap();
        assert!(matches!(
            driver.prepare("SELECT 1").err(),
            Some(RowFlowError::Connection { .. })
        ));
    }
}
