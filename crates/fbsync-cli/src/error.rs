use anyhow::Error;
use fbsync_config::ConfigError;
use fbsync_core::CoreError;
use fbsync_sync::SyncError;
use std::process::ExitCode;
use thiserror::Error as ThisError;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_INVALID_INPUT: u8 = 3;
pub const EXIT_EMPTY_PHONEBOOK: u8 = 4;

#[derive(Debug, ThisError)]
pub enum CliError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("phonebook is empty, upload blocked: {0}")]
    EmptyPhonebook(String),
}

pub fn invalid_input(message: impl Into<String>) -> Error {
    CliError::InvalidInput(message.into()).into()
}

pub fn empty_phonebook(message: impl Into<String>) -> Error {
    CliError::EmptyPhonebook(message.into()).into()
}

pub fn report_error(err: &Error, verbose: bool) {
    if verbose {
        eprintln!("error: {:#}", err);
    } else {
        eprintln!("error: {}", err);
    }
}

pub fn exit_code_for(err: &Error) -> ExitCode {
    ExitCode::from(exit_status(err))
}

fn exit_status(err: &Error) -> u8 {
    for cause in err.chain() {
        if let Some(cli_err) = cause.downcast_ref::<CliError>() {
            return match cli_err {
                CliError::InvalidInput(_) => EXIT_INVALID_INPUT,
                CliError::EmptyPhonebook(_) => EXIT_EMPTY_PHONEBOOK,
            };
        }
        if let Some(config_err) = cause.downcast_ref::<ConfigError>() {
            return config_exit_code(config_err);
        }
        if let Some(sync_err) = cause.downcast_ref::<SyncError>() {
            return sync_exit_code(sync_err);
        }
        if let Some(_core_err) = cause.downcast_ref::<CoreError>() {
            return EXIT_INVALID_INPUT;
        }
    }
    EXIT_FAILURE
}

fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::MissingHomeDir | ConfigError::Write { .. } => EXIT_FAILURE,
        ConfigError::InvalidConfigPath(_)
        | ConfigError::InvalidDataPath(_)
        | ConfigError::MissingConfigFile(_)
        | ConfigError::InsecurePermissions(_)
        | ConfigError::InvalidUploadMode(_)
        | ConfigError::InvalidField { .. }
        | ConfigError::MissingNameRules
        | ConfigError::InvalidConversion(_)
        | ConfigError::MissingSecret(_)
        | ConfigError::Read { .. }
        | ConfigError::Parse { .. } => EXIT_INVALID_INPUT,
    }
}

fn sync_exit_code(err: &SyncError) -> u8 {
    match err {
        SyncError::Unavailable(_) => EXIT_INVALID_INPUT,
        SyncError::Io(_) | SyncError::Login(_) | SyncError::UploadRejected(_) => EXIT_FAILURE,
        SyncError::Core(_) | SyncError::Parse(_) => EXIT_INVALID_INPUT,
        #[cfg(any(feature = "dav-sync", feature = "box-sync"))]
        SyncError::Http(_) => EXIT_FAILURE,
        #[cfg(any(feature = "dav-sync", feature = "box-sync"))]
        SyncError::Url(_) => EXIT_INVALID_INPUT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_phonebook_has_its_own_exit_code() {
        let err = empty_phonebook("no contacts converted").context("run");
        assert_eq!(exit_status(&err), EXIT_EMPTY_PHONEBOOK);
    }

    #[test]
    fn malformed_csv_is_invalid_input() {
        let err = Error::new(CoreError::CsvColumnCount {
            line: 2,
            expected: 8,
            found: 3,
        });
        assert_eq!(exit_status(&err), EXIT_INVALID_INPUT);
    }

    #[test]
    fn rejected_upload_is_a_failure() {
        let err = Error::new(SyncError::UploadRejected("no confirmation".to_string()));
        assert_eq!(exit_status(&err), EXIT_FAILURE);
    }
}
