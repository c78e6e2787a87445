//! Agents service endpoints used by catalog intake.

use async_trait::async_trait;
use preco_real_core::{TaskId, TaskStatus, TaskStatusResponse, TaskTicket};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use secrecy::SecretString;
use serde_json::Value;
use tracing::instrument;

use super::request::IntakeBody;
use crate::error::ConsoleError;
use crate::services::ServiceClient;

const INTAKE_PATH: &str = "/api/agents/catalog-intake";

/// What the agents service answered to a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Accepted as a background task.
    Queued(TaskTicket),
    /// Answered synchronously with the result itself.
    Completed(Value),
}

impl SubmitOutcome {
    /// Interpret a submission response body.
    ///
    /// A body with a `task_id` is a ticket; anything else is a result.
    #[must_use]
    pub fn from_body(body: Value) -> Self {
        let task_id = body
            .get("task_id")
            .and_then(Value::as_str)
            .map(TaskId::from);
        match task_id {
            Some(task_id) => {
                let status = body
                    .get("status")
                    .cloned()
                    .and_then(|s| serde_json::from_value(s).ok())
                    .unwrap_or(TaskStatus::Pending);
                Self::Queued(TaskTicket { task_id, status })
            }
            None => Self::Completed(body),
        }
    }
}

/// Backend that accepts intake jobs and reports on them.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// `POST /api/agents/catalog-intake`.
    async fn submit(
        &self,
        body: &IntakeBody,
        credential: &SecretString,
    ) -> Result<SubmitOutcome, ConsoleError>;

    /// `GET /api/agents/task-status/{task_id}`.
    async fn status(
        &self,
        task_id: &TaskId,
        credential: &SecretString,
    ) -> Result<TaskStatusResponse, ConsoleError>;
}

/// [`TaskBackend`] over HTTP.
#[derive(Clone)]
pub struct AgentsClient {
    client: ServiceClient,
}

impl AgentsClient {
    #[must_use]
    pub const fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TaskBackend for AgentsClient {
    #[instrument(skip_all)]
    async fn submit(
        &self,
        body: &IntakeBody,
        credential: &SecretString,
    ) -> Result<SubmitOutcome, ConsoleError> {
        let answer: Value = match body {
            IntakeBody::Query(payload) => {
                self.client
                    .send(
                        Method::POST,
                        INTAKE_PATH,
                        &[],
                        Some(payload),
                        Some(credential),
                    )
                    .await?
            }
            IntakeBody::Image(image) => {
                let part = Part::bytes(image.bytes.clone())
                    .file_name(image.file_name.clone())
                    .mime_str(image.content_type)?;
                self.client
                    .post_multipart(INTAKE_PATH, Form::new().part("file", part), Some(credential))
                    .await?
            }
        };
        Ok(SubmitOutcome::from_body(answer))
    }

    #[instrument(skip(self, credential), fields(task_id = %task_id))]
    async fn status(
        &self,
        task_id: &TaskId,
        credential: &SecretString,
    ) -> Result<TaskStatusResponse, ConsoleError> {
        self.client
            .get(
                &format!("/api/agents/task-status/{task_id}"),
                Some(credential),
            )
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use preco_real_core::IntakePayload;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_json, body_string_contains, header, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::Service;
    use crate::intake::request::ImageFile;

    fn agents(server: &MockServer) -> AgentsClient {
        AgentsClient::new(ServiceClient::new(
            reqwest::Client::new(),
            Service::Agents,
            Url::parse(&server.uri()).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_image_is_sent_as_multipart_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/agents/catalog-intake"))
            .and(header("authorization", "Bearer op-token"))
            .and(header_regex("content-type", "^multipart/form-data; boundary="))
            .and(body_string_contains(r#"name="file""#))
            .and(body_string_contains(r#"filename="leite.jpg""#))
            .and(body_string_contains("image/jpeg"))
            .and(body_string_contains("fake-jpeg-bytes"))
            .respond_with(
                ResponseTemplate::new(202).set_body_json(json!({"task_id": "t9", "status": "PENDING"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let body = IntakeBody::Image(ImageFile {
            file_name: "leite.jpg".to_string(),
            content_type: "image/jpeg",
            bytes: b"fake-jpeg-bytes".to_vec(),
        });
        let outcome = agents(&server)
            .submit(&body, &SecretString::from("op-token"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Queued(TaskTicket {
                task_id: TaskId::new("t9"),
                status: TaskStatus::Pending,
            })
        );
    }

    #[tokio::test]
    async fn test_query_is_sent_as_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/agents/catalog-intake"))
            .and(body_json(json!({"category_query": "laticínios"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"products": []})))
            .expect(1)
            .mount(&server)
            .await;

        let body = IntakeBody::Query(IntakePayload {
            category_query: Some("laticínios".to_string()),
            ..IntakePayload::default()
        });
        let outcome = agents(&server)
            .submit(&body, &SecretString::from("op-token"))
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::Completed(json!({"products": []})));
    }

    #[tokio::test]
    async fn test_rejected_upload_carries_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "detail": [{"loc": ["body", "file"], "msg": "Field required"}]
            })))
            .mount(&server)
            .await;

        let body = IntakeBody::Image(ImageFile {
            file_name: "x.png".to_string(),
            content_type: "image/png",
            bytes: vec![1],
        });
        let err = agents(&server)
            .submit(&body, &SecretString::from("op-token"))
            .await
            .unwrap_err();
        assert_eq!(err, ConsoleError::http(422, Some("Field required".to_string())));
    }

    #[test]
    fn test_ticket_body() {
        assert_eq!(
            SubmitOutcome::from_body(json!({"task_id": "t1", "status": "PENDING"})),
            SubmitOutcome::Queued(TaskTicket {
                task_id: TaskId::new("t1"),
                status: TaskStatus::Pending,
            })
        );
        // Status is optional on the ticket
        assert!(matches!(
            SubmitOutcome::from_body(json!({"task_id": "t2"})),
            SubmitOutcome::Queued(TaskTicket { status: TaskStatus::Pending, .. })
        ));
    }

    #[test]
    fn test_synchronous_body() {
        let body = json!({"product_name": "Leite Integral 1L", "category_standard": "Laticínios"});
        assert_eq!(
            SubmitOutcome::from_body(body.clone()),
            SubmitOutcome::Completed(body)
        );
    }
}
