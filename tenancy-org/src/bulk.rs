//! Best-effort batch results.
//!
//! A bulk operation applies the single-item operation to every input and
//! partitions the outcomes. One failing item never stops the rest.

use serde::{Deserialize, Serialize};

use crate::error::{OrgError, OrgResult};

/// Per-item failure code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkErrorCode {
    AlreadyExists,
    NotFound,
    Forbidden,
}

impl BulkErrorCode {
    /// Classify a single-item error.
    ///
    /// Every error other than a duplicate or a missing entity, including
    /// limits, invalid input, hook rejections and invalid state, is reported
    /// as `Forbidden`; `BulkError::message` tells them apart.
    pub fn from_error(err: &OrgError) -> Self {
        match err {
            OrgError::AlreadyExists(_) => BulkErrorCode::AlreadyExists,
            OrgError::NotFound(_) => BulkErrorCode::NotFound,
            _ => BulkErrorCode::Forbidden,
        }
    }
}

/// A failed item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkError {
    /// Identifier of the input item (user id or invitee identifier)
    pub id: String,
    pub code: BulkErrorCode,
    pub message: String,
}

/// Partitioned result of a bulk operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkResult<T> {
    pub success: Vec<T>,
    pub errors: Vec<BulkError>,
}

impl<T> Default for BulkResult<T> {
    fn default() -> Self {
        Self {
            success: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> BulkResult<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_success(&mut self, item: T) {
        self.success.push(item);
    }

    pub fn push_error(&mut self, id: impl ToString, err: &OrgError) {
        self.errors.push(BulkError {
            id: id.to_string(),
            code: BulkErrorCode::from_error(err),
            message: err.to_string(),
        });
    }

    /// Record the outcome of one item.
    ///
    /// Domain errors become entries in `errors`; store and policy-engine
    /// failures are returned so the caller can abort the batch.
    pub fn record(&mut self, id: impl ToString, outcome: OrgResult<T>) -> OrgResult<()> {
        match outcome {
            Ok(item) => self.push_success(item),
            Err(err) if err.is_server_error() => return Err(err),
            Err(err) => self.push_error(id, &err),
        }
        Ok(())
    }

    /// Whether every item succeeded.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let mut result: BulkResult<u32> = BulkResult::new();
        result.push_success(1);
        result.push_error("a", &OrgError::AlreadyExists("already a member".into()));
        result.push_error("b", &OrgError::not_found("team"));
        result.push_error("c", &OrgError::InvalidState("membership is suspended".into()));

        assert!(!result.is_complete());
        let codes: Vec<BulkErrorCode> = result.errors.iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![
                BulkErrorCode::AlreadyExists,
                BulkErrorCode::NotFound,
                BulkErrorCode::Forbidden
            ]
        );
        assert_eq!(result.errors[1].message, "team not found");
    }

    #[test]
    fn test_forbidden_code_keeps_distinct_messages() {
        let mut result: BulkResult<u32> = BulkResult::new();
        result.push_error(
            "a",
            &OrgError::LimitExceeded {
                resource: "members",
                limit: 3,
            },
        );
        result.push_error("b", &OrgError::Rejected("frozen".into()));
        result.push_error("c", &OrgError::InvalidInput("role must not be empty".into()));

        assert!(result.errors.iter().all(|e| e.code == BulkErrorCode::Forbidden));
        let messages: Vec<&str> = result.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "members limit reached (max 3)",
                "Rejected: frozen",
                "Invalid input: role must not be empty"
            ]
        );
    }

    #[test]
    fn test_record_aborts_on_infrastructure_errors() {
        use crate::store::StoreError;

        let mut result: BulkResult<u32> = BulkResult::new();
        result.record("ok", Ok(7)).unwrap();
        result
            .record("dup", Err(OrgError::AlreadyExists("dup".into())))
            .unwrap();
        let err = result
            .record("db", Err(StoreError::Backend("down".into()).into()))
            .unwrap_err();

        assert!(err.is_server_error());
        assert_eq!(result.success, vec![7]);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_codes_serialize_screaming() {
        let json = serde_json::to_string(&BulkErrorCode::AlreadyExists).unwrap();
        assert_eq!(json, "\"ALREADY_EXISTS\"");
    }
}
