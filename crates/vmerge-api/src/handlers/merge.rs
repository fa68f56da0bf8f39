//! The merge endpoint.

use axum::extract::{Multipart, State};
use axum::Json;
use tokio::sync::oneshot;
use tracing::debug;

use vmerge_models::{MergeRequest, MergeResponse};
use vmerge_pipeline::{MergeFailure, MergeJob, MergeOutcome};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Fields of the merge form.
#[derive(Debug, Default)]
struct MergeForm {
    merge_request: Option<String>,
    narration: Option<Vec<u8>>,
    upload_to_drive: Option<String>,
}

impl MergeForm {
    async fn read(multipart: &mut Multipart) -> ApiResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Error reading form field: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "merge_request" => form.merge_request = Some(text(field).await?),
                "upload_to_drive" => form.upload_to_drive = Some(text(field).await?),
                "narration_file" => {
                    let bytes = field.bytes().await.map_err(|e| {
                        ApiError::bad_request(format!("Error reading narration_file: {e}"))
                    })?;
                    form.narration = Some(bytes.to_vec());
                }
                other => debug!(field = other, "Ignoring unknown form field"),
            }
        }
        Ok(form)
    }

    fn into_job(self) -> ApiResult<MergeJob> {
        let text = self
            .merge_request
            .ok_or_else(|| ApiError::bad_request("merge_request field is required"))?;
        let mut request = MergeRequest::from_json(&text)?;
        request.apply_upload_override(self.upload_to_drive.as_deref());

        let job = MergeJob::new(request);
        Ok(match self.narration {
            Some(bytes) => job.with_narration(bytes),
            None => job,
        })
    }
}

async fn text(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    let name = field.name().unwrap_or_default().to_string();
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("Error reading {name}: {e}")))
}

/// Merge the submitted videos.
///
/// The pipeline runs on its own task, which also queues deferred cleanup
/// once the response is built. A client that disconnects mid-merge stops
/// neither.
pub async fn merge(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<MergeResponse>> {
    let job = MergeForm::read(&mut multipart).await?.into_job()?;

    let (reply, outcome) = oneshot::channel::<Result<Json<MergeResponse>, MergeFailure>>();
    let orchestrator = state.orchestrator.clone();
    let queue = state.cleanup.clone();
    tokio::spawn(async move {
        match orchestrator.run(job).await {
            Ok(MergeOutcome { response, cleanup }) => {
                let body = Json(response);
                if reply.send(Ok(body)).is_err() {
                    debug!("Client left before the merge finished");
                }
                queue.enqueue(cleanup);
            }
            Err(failure) => {
                let _ = reply.send(Err(failure));
            }
        }
    });

    let body = outcome
        .await
        .map_err(|_| ApiError::internal("merge task ended without a result"))??;
    Ok(body)
}
