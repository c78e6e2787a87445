//! Wire types for the catalog intake task protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{TaskId, TaskStatus};

/// JSON body of `POST /api/agents/catalog-intake` for text and category
/// queries. Photos go as a multipart `file` part instead.
///
/// Exactly one field is populated by the console; the other is omitted
/// from the JSON entirely.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntakePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_query: Option<String>,
}

/// Acknowledgement of an accepted background task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTicket {
    pub task_id: TaskId,
    pub status: TaskStatus,
}

/// Body of `GET /api/agents/task-status/{task_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub task_id: TaskId,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_payload_carries_single_field() {
        let payload = IntakePayload {
            category_query: Some("laticinios".into()),
            ..IntakePayload::default()
        };
        assert_eq!(
            serde_json::to_value(&payload).expect("json"),
            json!({"category_query": "laticinios"})
        );
    }

    #[test]
    fn test_status_response_with_null_result() {
        let response: TaskStatusResponse =
            serde_json::from_value(json!({"task_id": "t1", "status": "SUCCESS", "result": null}))
                .expect("status");
        assert_eq!(response.status, TaskStatus::Success);
        assert!(response.result.is_none());
    }
}
