use crate::task::TaskError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Network failure, timeout or a 5xx answer from the provider.
    #[error("Provider unavailable: {message}")]
    ProviderUnavailable {
        message: String,
        status: Option<u16>,
    },

    /// A 4xx answer or a response body the provider contract does not allow.
    #[error("Provider rejected request: {message}")]
    ProviderRejected {
        message: String,
        status: Option<u16>,
    },

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// A live check failed while the task is still inside its grace period.
    #[error("Status check for task {task_id} failed: {message}")]
    TransientCheckFailure { task_id: String, message: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Classify a provider failure by its HTTP status code.
    ///
    /// No status (transport failure) and 5xx are `ProviderUnavailable`;
    /// everything else is `ProviderRejected`.
    pub fn from_provider_status(message: String, status: Option<u16>) -> Self {
        match status {
            Some(code) if code < 500 => CoreError::ProviderRejected { message, status },
            _ => CoreError::ProviderUnavailable { message, status },
        }
    }

    /// Rebuild the provider error recorded on a task.
    pub fn from_task_error(err: &TaskError) -> Self {
        Self::from_provider_status(err.message.clone(), err.provider_status_code)
    }

    /// HTTP status code reported by the provider, if any.
    pub fn provider_status_code(&self) -> Option<u16> {
        match self {
            CoreError::ProviderUnavailable { status, .. }
            | CoreError::ProviderRejected { status, .. } => *status,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn transport_failure_is_unavailable() {
        let err = CoreError::from_provider_status("connection refused".into(), None);
        assert_matches!(err, CoreError::ProviderUnavailable { status: None, .. });
    }

    #[test]
    fn server_error_is_unavailable() {
        let err = CoreError::from_provider_status("bad gateway".into(), Some(502));
        assert_matches!(err, CoreError::ProviderUnavailable { status: Some(502), .. });
    }

    #[test]
    fn client_error_is_rejected() {
        let err = CoreError::from_provider_status("bad prompt".into(), Some(422));
        assert_matches!(err, CoreError::ProviderRejected { status: Some(422), .. });
        assert_eq!(err.provider_status_code(), Some(422));
    }
}
