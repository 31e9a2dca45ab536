//! Execution service
//!
//! Accepts pack requests over HTTP (`POST /`), runs the packer in a
//! private scratch directory and answers with an archive of everything the
//! packer wrote. The scratch directory is removed when the request ends,
//! whether the job succeeded or not.

use crate::error::{PackError, PackResult};
use crate::processor::PackerTool;
use crate::protocol::{Archive, PackRequest, PackResponse};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::CONTENT_ENCODING;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::future::try_join_all;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::net::TcpListener;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Shared state of the execution service
#[derive(Debug, Clone)]
pub struct ExecutionService {
    inner: Arc<ServiceState>,
}

#[derive(Debug)]
struct ServiceState {
    tool: PackerTool,
    scratch_dir: PathBuf,
}

impl ExecutionService {
    /// Create a service running `tool`, with per-request scratch
    /// directories under `scratch_dir` (system temp dir when `None`)
    pub fn new(tool: PackerTool, scratch_dir: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(ServiceState {
                tool,
                scratch_dir: scratch_dir.unwrap_or_else(std::env::temp_dir),
            }),
        }
    }

    /// HTTP routes, with request bodies capped at `body_limit` bytes
    pub fn router(&self, body_limit: usize) -> Router {
        Router::new()
            .route("/", post(handle_pack))
            .layer(DefaultBodyLimit::max(body_limit))
            .with_state(self.clone())
    }

    /// Run one request and collect its outputs.
    ///
    /// Inputs land in `<scratch>/input/<name>`, outputs in
    /// `<scratch>/output/`. The archive holds every file under `output/`.
    pub async fn execute(&self, id: Uuid, request: &PackRequest) -> PackResult<Archive> {
        request.validate()?;

        fs::create_dir_all(&self.inner.scratch_dir)
            .await
            .map_err(|e| {
                PackError::io(
                    format!("creating scratch root {}", self.inner.scratch_dir.display()),
                    e,
                )
            })?;
        let scratch = tempfile::Builder::new()
            .prefix(&format!("sheetpack-{}-", id))
            .tempdir_in(&self.inner.scratch_dir)
            .map_err(|e| PackError::io("creating scratch directory", e))?;
        debug!("Scratch directory {}", scratch.path().display());

        let input_dir = scratch.path().join("input");
        let output_dir = scratch.path().join("output");
        for dir in [&input_dir, &output_dir] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| PackError::io(format!("creating {}", dir.display()), e))?;
        }

        // One file per basename (the last entry wins), but one packer
        // argument per transmitted entry
        let inputs: Vec<PathBuf> = request
            .files
            .iter()
            .map(|file| input_dir.join(&file.name))
            .collect();
        let contents: BTreeMap<&str, &[u8]> = request
            .files
            .iter()
            .map(|file| (file.name.as_str(), file.data.as_slice()))
            .collect();
        try_join_all(contents.into_iter().map(|(name, data)| {
            let path = input_dir.join(name);
            async move {
                fs::write(&path, data)
                    .await
                    .map_err(|e| PackError::io(format!("writing input {}", path.display()), e))
            }
        }))
        .await?;

        self.inner
            .tool
            .run(
                &request.sheet,
                &request.params,
                &output_dir.join(&request.sheet),
                &output_dir.join(&request.data),
                &inputs,
            )
            .await?;

        let archive = Archive::from_dir(&output_dir).await?;
        info!("{}: packed {} output file(s)", request.sheet, archive.len());

        if let Err(e) = scratch.close() {
            warn!("Failed to remove scratch directory: {}", e);
        }
        Ok(archive)
    }
}

async fn handle_pack(
    State(service): State<ExecutionService>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let id = Uuid::new_v4();
    let span = info_span!("request", id = %id);

    async move {
        let gzipped = headers
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("gzip"));
        debug!("Received {} byte body (gzip: {})", body.len(), gzipped);

        let result = match PackRequest::decode(&body, gzipped) {
            Ok(request) => {
                info!(
                    "{}: {} input file(s), {} param(s)",
                    request.sheet,
                    request.files.len(),
                    request.params.len()
                );
                service
                    .execute(id, &request)
                    .await
                    .and_then(|archive| archive.to_bytes())
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(bytes) => (StatusCode::OK, Json(PackResponse::success(&bytes))).into_response(),
            Err(e) => {
                let status = match e {
                    PackError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                error!("Request failed: {}", e);
                (status, Json(PackResponse::failure(e.to_string()))).into_response()
            }
        }
    }
    .instrument(span)
    .await
}

/// Serve until `shutdown` resolves, then finish in-flight requests
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    service: ExecutionService,
    body_limit: usize,
    shutdown: F,
) -> PackResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| PackError::io("reading listener address", e))?;
    info!("Execution service listening on {}", addr);

    axum::serve(listener, service.router(body_limit))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| PackError::io("serving requests", e))?;

    info!("Execution service stopped");
    Ok(())
}

/// Serve until Ctrl-C
pub async fn serve(
    listener: TcpListener,
    service: ExecutionService,
    body_limit: usize,
) -> PackResult<()> {
    serve_with_shutdown(listener, service, body_limit, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
    })
    .await
}
