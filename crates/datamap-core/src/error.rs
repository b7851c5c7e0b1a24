// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Error taxonomy for descriptor construction and command execution.
//!
//! Every failure that leaves the [`DataClient`](crate::DataClient) is one of
//! the variants of [`Error`]. Driver failures are never surfaced raw: they
//! are wrapped into [`CommandExecutionError`] (with the command text and the
//! bound parameters) or [`ConnectionError`] before they reach the caller.
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | [`Error::Mapping`] | a type cannot produce a usable descriptor |
//! | [`Error::Binding`] | a parameter source has an unsupported shape |
//! | [`Error::Conversion`] | a value cannot be coerced to a member type |
//! | [`Error::Access`] | a member getter/setter rejected the call |
//! | [`Error::Command`] | the driver failed to execute a built command |
//! | [`Error::TransactionState`] | begin/end pairing was violated |
//! | [`Error::Connection`] | the connection could not be opened or closed |
//! | [`Error::Cancelled`] | an async operation observed its cancellation token |

use std::error::Error as StdError;

use thiserror::Error;

use crate::{binder::Params, command::Command};

/// Convenient result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error returned by every public operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Descriptor construction or lookup failed.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// Parameter binding failed.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// A value could not be converted.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A member accessor rejected the call.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// The driver failed to execute a command.
    #[error(transparent)]
    Command(#[from] Box<CommandExecutionError>),

    /// Transaction begin/end pairing was violated.
    #[error(transparent)]
    TransactionState(#[from] TransactionStateError),

    /// The connection could not be opened or closed.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The operation observed its cancellation token.
    #[error("operation cancelled")]
    Cancelled
}

impl Error {
    /// Check if this is a mapping error.
    pub const fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }

    /// Check if this is a command execution error.
    pub const fn is_command(&self) -> bool {
        matches!(self, Self::Command(_))
    }

    /// Check if this is a transaction state error.
    pub const fn is_transaction_state(&self) -> bool {
        matches!(self, Self::TransactionState(_))
    }

    /// Check if this is a connection error.
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Check if the operation was cancelled.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<CommandExecutionError> for Error {
    fn from(value: CommandExecutionError) -> Self {
        Self::Command(Box::new(value))
    }
}

/// A type's member graph cannot produce a usable descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// No constructor can be satisfied by the available columns.
    #[error("no usable constructor for `{type_name}` with columns [{columns}]")]
    NoUsableConstructor {
        /// Declared type name.
        type_name: String,
        /// Comma-separated column names of the result set.
        columns:   String
    },

    /// The operation needs a primary key and the type has none.
    #[error("`{type_name}` has no primary key; `{operation}` needs one or an explicit predicate")]
    MissingKey {
        /// Declared type name.
        type_name: String,
        /// Operation that required the key.
        operation: &'static str
    },

    /// A member or column name does not exist on the type.
    #[error("`{type_name}` has no member or column named `{member}`")]
    UnknownMember {
        /// Declared type name.
        type_name: String,
        /// Requested member name.
        member:    String
    },

    /// Two members share a name or a column.
    #[error("`{type_name}` declares `{member}` more than once")]
    DuplicateMember {
        /// Declared type name.
        type_name: String,
        /// Duplicated member or column name.
        member:    String
    },

    /// An annotation carries an unusable value.
    #[error("malformed annotation on `{type_name}{}`: {reason}", member_suffix(.member))]
    MalformedAnnotation {
        /// Declared type name.
        type_name: String,
        /// Member carrying the annotation, if any.
        member:    Option<String>,
        /// What is wrong with it.
        reason:    String
    },

    /// A composite type was required but a scalar shape was supplied.
    #[error("`{type_name}` is not a composite type")]
    NotComposite {
        /// Declared type name.
        type_name: String
    },

    /// A write would assign no columns.
    #[error("`{operation}` of `{type_name}` has no columns to write")]
    NoColumns {
        /// Declared type name.
        type_name: String,
        /// Operation that found nothing to write.
        operation: &'static str
    },

    /// Two parts of one command bind the same parameter name.
    #[error("parameter `{name}` is bound more than once")]
    DuplicateParameter {
        /// Clashing parameter name.
        name: String
    },

    /// A materialized object did not have the requested type.
    #[error("descriptor for `{type_name}` produced an object of another type")]
    TypeMismatch {
        /// Declared type name.
        type_name: String
    }
}

fn member_suffix(member: &Option<String>) -> String {
    member.as_deref().map(|m| format!(".{m}")).unwrap_or_default()
}

/// A parameter source could not be converted into a name/value map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// The source is none of the supported parameter shapes.
    #[error("unsupported parameter source; pass pairs, a map, a tuple or a described object")]
    UnsupportedShape,

    /// A member of a parameter object could not be read.
    #[error("cannot read parameter `{member}`: {reason}")]
    UnreadableMember {
        /// Member name.
        member: String,
        /// Accessor failure description.
        reason: String
    },

    /// The type of a parameter object cannot be described.
    #[error(transparent)]
    Mapping(#[from] MappingError)
}

/// A value cannot be represented as the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The type has no single-value representation.
    #[error("`{type_name}` is not a scalar type")]
    NotScalar {
        /// Target type name.
        type_name: &'static str
    },

    /// The value kind does not fit the target type.
    #[error("cannot convert {found} value into `{target}`")]
    Incompatible {
        /// Target type name.
        target: &'static str,
        /// Kind of the offending value.
        found:  &'static str
    },

    /// The numeric value does not fit the target type.
    #[error("value {value} is out of range for `{target}`")]
    OutOfRange {
        /// Target type name.
        target: &'static str,
        /// Offending value rendered as text.
        value:  String
    },

    /// The text could not be parsed into the target type.
    #[error("cannot parse `{text}` as `{target}`")]
    Parse {
        /// Target type name.
        target: &'static str,
        /// Offending text.
        text:   String
    }
}

impl ConversionError {
    /// Build a [`ConversionError::NotScalar`] for `T`.
    pub fn not_scalar<T: ?Sized>() -> Self {
        Self::NotScalar {
            type_name: std::any::type_name::<T>()
        }
    }

    /// Build a [`ConversionError::Incompatible`] for `T`.
    pub fn incompatible<T: ?Sized>(found: &crate::Value) -> Self {
        Self::Incompatible {
            target: std::any::type_name::<T>(),
            found:  found.kind().name()
        }
    }

    /// Build a [`ConversionError::OutOfRange`] for `T`.
    pub fn out_of_range<T: ?Sized>(value: impl ToString) -> Self {
        Self::OutOfRange {
            target: std::any::type_name::<T>(),
            value:  value.to_string()
        }
    }

    /// Build a [`ConversionError::Parse`] for `T`.
    pub fn parse<T: ?Sized>(text: impl Into<String>) -> Self {
        Self::Parse {
            target: std::any::type_name::<T>(),
            text:   text.into()
        }
    }
}

/// A member accessor rejected a get or set call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The member has no setter (read-only property).
    #[error("member `{member}` is read-only")]
    ReadOnly {
        /// Member name.
        member: String
    },

    /// The member has no getter.
    #[error("member `{member}` is not readable")]
    NotReadable {
        /// Member name.
        member: String
    },

    /// The object passed to the accessor is not the owning type.
    #[error("member `{member}` expects an object of type `{expected}`")]
    TypeMismatch {
        /// Member name.
        member:   String,
        /// Owning type name.
        expected: &'static str
    },

    /// The generic access path does not know the member.
    #[error("member `{member}` is unknown to the generic accessor")]
    UnknownMember {
        /// Member name.
        member: String
    },

    /// The value could not be converted to or from the member type.
    #[error("member `{member}`: {source}")]
    Convert {
        /// Member name.
        member: String,
        /// Underlying conversion failure.
        #[source]
        source: ConversionError
    }
}

/// The underlying driver failed to execute a built command.
///
/// Always carries the exact command text and the bound parameter values.
#[derive(Debug, Error)]
#[error("command failed: {source}\n  command: {text}\n  parameters: {params}")]
pub struct CommandExecutionError {
    /// Command text as sent to the driver.
    pub text:   String,
    /// Parameters bound to the command.
    pub params: Params,
    /// Original driver failure.
    #[source]
    pub source: DriverError
}

impl CommandExecutionError {
    /// Wrap a driver failure with the command that caused it.
    pub fn new(source: DriverError, command: &Command) -> Self {
        Self {
            text: command.text.clone(),
            params: command.params.clone(),
            source
        }
    }
}

/// Transaction begin/end pairing was violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionStateError {
    /// A transaction is already active on this client.
    #[error("a transaction is already active on this client")]
    AlreadyActive,

    /// No transaction is active on this client.
    #[error("no transaction is active on this client")]
    NotActive,

    /// The handle does not belong to the active transaction.
    #[error("transaction handle #{found} does not match the active transaction #{active}")]
    HandleMismatch {
        /// Identifier of the active transaction.
        active: u64,
        /// Identifier carried by the supplied handle.
        found:  u64
    }
}

/// Failure to open or close the underlying connection.
#[derive(Debug, Error)]
#[error("failed to {operation} connection: {source}")]
pub struct ConnectionError {
    /// `"open"` or `"close"`.
    pub operation: &'static str,
    /// Original driver failure.
    #[source]
    pub source:    DriverError
}

impl ConnectionError {
    /// Wrap a failure to open the connection.
    pub const fn open(source: DriverError) -> Self {
        Self {
            operation: "open",
            source
        }
    }

    /// Wrap a failure to close the connection.
    pub const fn close(source: DriverError) -> Self {
        Self {
            operation: "close",
            source
        }
    }
}

/// Failure reported by a database driver.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DriverError {
    message:   String,
    cancelled: bool,
    #[source]
    source:    Option<Box<dyn StdError + Send + Sync>>
}

impl DriverError {
    /// Wrap a driver-specific error.
    pub fn new<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static
    {
        Self {
            message:   source.to_string(),
            cancelled: false,
            source:    Some(Box::new(source))
        }
    }

    /// Create an error from a message alone.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message:   message.into(),
            cancelled: false,
            source:    None
        }
    }

    /// Error reported when a cancellation token fired mid-operation.
    pub fn cancelled() -> Self {
        Self {
            message:   "operation cancelled".into(),
            cancelled: true,
            source:    None
        }
    }

    /// Error reported when an operation needs an open connection.
    pub fn closed() -> Self {
        Self::message("connection is not open")
    }

    /// Check if the driver stopped because of cancellation.
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn command_error_carries_text_and_params() {
        let mut params = Params::new();
        params.insert("Name", Value::from("Ann"));
        let command = Command::with_params("INSERT INTO people (Name) VALUES (@Name)", params);
        let err = CommandExecutionError::new(DriverError::message("disk I/O error"), &command);

        assert_eq!(err.text, command.text);
        assert_eq!(err.params.get("Name"), Some(&Value::from("Ann")));
        let shown = err.to_string();
        assert!(shown.contains("disk I/O error"));
        assert!(shown.contains("INSERT INTO people"));
        assert!(shown.contains("Name='Ann'"));
    }

    #[test]
    fn error_kind_checks() {
        let err: Error = TransactionStateError::AlreadyActive.into();
        assert!(err.is_transaction_state());
        assert!(!err.is_command());

        let err: Error = CommandExecutionError::new(DriverError::message("x"), &Command::new("SELECT 1")).into();
        assert!(err.is_command());
        assert!(Error::Cancelled.is_cancelled());
    }

    #[test]
    fn malformed_annotation_display() {
        let err = MappingError::MalformedAnnotation {
            type_name: "Person".into(),
            member:    Some("name".into()),
            reason:    "empty column name".into()
        };
        assert_eq!(err.to_string(), "malformed annotation on `Person.name`: empty column name");
    }

    #[test]
    fn driver_error_source() {
        let io = std::io::Error::other("boom");
        let err = DriverError::new(io);
        assert_eq!(err.to_string(), "boom");
        assert!(err.source().is_some());
        assert!(!err.is_cancelled());
        assert!(DriverError::cancelled().is_cancelled());
    }
}
