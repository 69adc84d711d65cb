use crate::errors::{FlowgateError, Result};
use prost::Message;

/// Try encoding any envoy message to ensure protobuf compatibility.
pub fn encode_check<T: Message>(message: &T, context: &str) -> Result<()> {
    if message.encode_to_vec().is_empty() {
        return Err(FlowgateError::validation(format!("{}: failed envoy-types encoding", context)));
    }
    Ok(())
}

/// Prefix an error message with the element it came from.
pub fn nested(context: impl std::fmt::Display, error: FlowgateError) -> FlowgateError {
    match error {
        FlowgateError::Validation { message, field } => FlowgateError::Validation {
            message: format!("{}: {}", context, message),
            field,
        },
        other => FlowgateError::validation(format!("{}: {}", context, other)),
    }
}
