//! `pr-cli intake`: sign in, submit, follow the task until it ends.

use std::sync::Arc;

use preco_real_admin::config::AdminConfig;
use preco_real_admin::identity::FirebaseIdentity;
use preco_real_admin::intake::{
    AgentsClient, ImageSource, IntakeFields, TaskOrchestrator, TaskUpdate,
};
use preco_real_admin::routes::session::NOT_ADMIN_MESSAGE;
use preco_real_admin::services::Services;
use preco_real_admin::session::SessionGate;
use preco_real_core::Email;
use secrecy::SecretString;

use super::{CliError, print_json};
use crate::IntakeArgs;

pub async fn run(args: IntakeArgs) -> Result<(), CliError> {
    let config = AdminConfig::from_env()?;
    let http = config.http_client()?;

    let mut fields = IntakeFields::new();
    if let Some(text) = args.text {
        fields.set_text(text);
    } else if let Some(category) = args.category {
        fields.set_category(category);
    } else if let Some(image) = args.image {
        fields.set_image(ImageSource::Path(image));
    }
    let request = fields.to_request()?;

    let agents = Services::new(http.clone(), config.services.clone()).agents()?;
    let orchestrator = TaskOrchestrator::new(
        Arc::new(AgentsClient::new(agents)),
        config.intake.poll_interval,
    );

    let provider = FirebaseIdentity::new(http, &config.identity)?;
    let gate = SessionGate::start(Arc::new(provider));
    let email = Email::parse(&args.email)?;

    let result = async {
        let session = gate
            .sign_in(&email, &SecretString::from(args.password))
            .await?;
        let credential = match session.credential() {
            Some(credential) if session.is_admin() => credential.clone(),
            _ => return Err(CliError::NotAdmin(NOT_ADMIN_MESSAGE)),
        };

        tracing::info!(kind = request.kind(), "submitting catalog intake");
        follow(orchestrator.submit(request, credential)).await
    }
    .await;

    if let Err(e) = gate.sign_out(config.sign_out_policy).await {
        tracing::warn!(error = %e, "sign-out failed");
    }
    gate.shutdown().await;
    result
}

async fn follow(mut handle: preco_real_admin::intake::TaskHandle) -> Result<(), CliError> {
    while let Some(update) = handle.next().await {
        match update {
            TaskUpdate::Pending { task_id } => {
                tracing::info!(%task_id, "task pending");
            }
            TaskUpdate::Succeeded { task_id, result } => {
                tracing::info!(task_id = ?task_id, "task succeeded");
                return print_json(&result);
            }
            TaskUpdate::Failed { error, .. } => return Err(error.into()),
        }
    }
    Err(CliError::NoResult)
}
