use connectors::sql::base::error::DbError;
use engine_core::{error::SinkError, retry::RetryDisposition};
use tokio_postgres::{Error as PgError, error::SqlState};

/// Only transient write failures are worth resubmitting the chunk for.
pub fn classify_sink_error(err: &SinkError) -> RetryDisposition {
    match err {
        // A flush that outlived its deadline may still have committed, so
        // resubmitting it could write the chunk twice.
        SinkError::Timeout { .. } => RetryDisposition::Stop,
        SinkError::WriteFailed { source, .. } => classify_db_error(source),
    }
}

pub fn classify_db_error(err: &DbError) -> RetryDisposition {
    match err {
        DbError::Io(_) | DbError::Unavailable(_) => RetryDisposition::Retry,
        DbError::PgError(pg_err) => classify_pg_error(pg_err),
        DbError::Write(_) => RetryDisposition::Stop,
        DbError::Decode(_) => RetryDisposition::Stop,
        DbError::QueryBuildError(_) => RetryDisposition::Stop,
    }
}

fn classify_pg_error(err: &PgError) -> RetryDisposition {
    if err.is_closed() {
        return RetryDisposition::Retry;
    }

    if let Some(code) = err.code()
        && is_retryable_pg_code(code)
    {
        return RetryDisposition::Retry;
    }

    RetryDisposition::Stop
}

fn is_retryable_pg_code(code: &SqlState) -> bool {
    matches!(
        *code,
        SqlState::T_R_SERIALIZATION_FAILURE
            | SqlState::T_R_DEADLOCK_DETECTED
            | SqlState::LOCK_NOT_AVAILABLE
            | SqlState::TOO_MANY_CONNECTIONS
            | SqlState::ADMIN_SHUTDOWN
            | SqlState::CRASH_SHUTDOWN
            | SqlState::CANNOT_CONNECT_NOW
            | SqlState::CONNECTION_FAILURE
            | SqlState::CONNECTION_DOES_NOT_EXIST
            | SqlState::SQLCLIENT_UNABLE_TO_ESTABLISH_SQLCONNECTION
            | SqlState::SQLSERVER_REJECTED_ESTABLISHMENT_OF_SQLCONNECTION
            | SqlState::CONNECTION_EXCEPTION
            | SqlState::QUERY_CANCELED
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn connection_drops_are_retried() {
        let err = SinkError::WriteFailed {
            count: 3,
            source: DbError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        };
        assert_eq!(classify_sink_error(&err), RetryDisposition::Retry);
    }

    #[test]
    fn timed_out_flush_is_not_resubmitted() {
        let err = SinkError::Timeout {
            count: 3,
            elapsed_ms: 10,
        };
        assert_eq!(classify_sink_error(&err), RetryDisposition::Stop);
    }

    #[test]
    fn rejected_writes_are_not_retried() {
        let err = SinkError::WriteFailed {
            count: 1,
            source: DbError::Write("value too long".into()),
        };
        assert_eq!(classify_sink_error(&err), RetryDisposition::Stop);
    }
}
