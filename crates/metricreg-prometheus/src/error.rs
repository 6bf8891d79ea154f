//! Translation of prometheus errors into registry errors.

use metricreg_core::Error;

/// Substring prometheus uses when a name is reused with a different shape.
const CONFLICTING_DESCRIPTOR: &str = "previously registered descriptor";

/// Map an error raised while building or registering a family.
pub(crate) fn registration_error(name: &str, err: prometheus::Error) -> Error {
    match err {
        prometheus::Error::AlreadyReg => Error::AlreadyRegistered {
            name: name.to_owned(),
        },
        prometheus::Error::Msg(message) if message.contains(CONFLICTING_DESCRIPTOR) => {
            Error::AlreadyRegistered {
                name: name.to_owned(),
            }
        }
        other => Error::Backend {
            name: name.to_owned(),
            message: other.to_string(),
        },
    }
}

/// Map an error raised while materializing an instance.
pub(crate) fn instance_error(
    name: &str,
    expected: &[String],
    found: &[String],
    err: prometheus::Error,
) -> Error {
    match err {
        prometheus::Error::InconsistentCardinality { .. } => Error::LabelMismatch {
            name: name.to_owned(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        },
        other => Error::Backend {
            name: name.to_owned(),
            message: other.to_string(),
        },
    }
}
