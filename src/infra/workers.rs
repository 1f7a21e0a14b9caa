// ============================================================
// Layer 6 — Worker Count
// ============================================================
// On the cluster, NSLOTS is the number of cores requested with
// `-pe omp=NSLOTS`. It decides how many threads decode the
// images of each training batch.
//
//   NSLOTS unset        → 1 worker
//   NSLOTS="8"          → 8 workers
//   NSLOTS="eight"/"0"  → configuration error, never a silent fallback

use std::env::{self, VarError};
use thiserror::Error;

pub const WORKERS_ENV: &str = "NSLOTS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkerConfigError {
    #[error("{WORKERS_ENV}={value:?} is not a positive integer")]
    Invalid { value: String },
    #[error("{WORKERS_ENV} is not valid unicode")]
    NotUnicode,
}

/// Parse the raw environment value. `None` means the variable is unset.
pub fn parse_worker_count(raw: Option<&str>) -> Result<usize, WorkerConfigError> {
    let Some(raw) = raw else {
        return Ok(1);
    };
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(WorkerConfigError::Invalid { value: raw.to_string() }),
    }
}

/// Read the worker count from `NSLOTS`.
pub fn workers_from_env() -> Result<usize, WorkerConfigError> {
    workers_from_var(env::var(WORKERS_ENV))
}

/// Worker count for the result of looking the variable up.
fn workers_from_var(var: Result<String, VarError>) -> Result<usize, WorkerConfigError> {
    let raw = match var {
        Ok(v) => Some(v),
        Err(VarError::NotPresent) => {
            tracing::info!("{WORKERS_ENV} is not set, using a single worker");
            None
        }
        Err(VarError::NotUnicode(_)) => return Err(WorkerConfigError::NotUnicode),
    };
    parse_worker_count(raw.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_falls_back_to_one() {
        assert_eq!(parse_worker_count(None), Ok(1));
    }

    #[test]
    fn test_valid_count() {
        assert_eq!(parse_worker_count(Some("8")), Ok(8));
        assert_eq!(parse_worker_count(Some(" 3 ")), Ok(3));
    }

    #[test]
    fn test_unset_variable_gives_one_worker() {
        assert_eq!(workers_from_var(Err(VarError::NotPresent)), Ok(1));
    }

    #[test]
    fn test_set_variable_is_parsed() {
        assert_eq!(workers_from_var(Ok("4".to_string())), Ok(4));
        assert_eq!(
            workers_from_var(Ok("four".to_string())),
            Err(WorkerConfigError::Invalid { value: "four".to_string() })
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_variable_is_error() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(vec![b'4', 0xff]);
        assert_eq!(workers_from_var(Err(VarError::NotUnicode(raw))), Err(WorkerConfigError::NotUnicode));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(parse_worker_count(Some("eight")).is_err());
        assert!(parse_worker_count(Some("0")).is_err());
        assert!(parse_worker_count(Some("-2")).is_err());
        assert!(parse_worker_count(Some("")).is_err());
    }
}
