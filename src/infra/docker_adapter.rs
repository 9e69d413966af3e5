use crate::domain::{ContainerEngine, ContainerSummary, EngineVersion, LogStream, PruneReport};
use crate::error::EngineError;
use async_trait::async_trait;
use bollard::container::{ListContainersOptions, PruneContainersOptions};
use bollard::image::PruneImagesOptions;
use bollard::models;
use bollard::volume::PruneVolumesOptions;
use bollard::{API_DEFAULT_VERSION, Docker};
use futures::TryStreamExt;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::client::conn::http1;
use hyper::{Request, header};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::net::UnixStream;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_SOCKET: &str = "/var/run/docker.sock";

/// Request timeout handed to the API client, in seconds.
const API_TIMEOUT_SECS: u64 = 120;

/// Docker Engine API client over the daemon's unix socket.
///
/// Listing, pruning and version go through bollard. Log streams are read as
/// the raw multiplexed body of a plain HTTP/1.1 request so the frame decoder
/// sees the engine's bytes untouched.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    socket: PathBuf,
}

impl DockerEngine {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
        }
    }

    /// Socket from `DOCKER_HOST` when it is a `unix://` URL, the default socket otherwise.
    pub fn from_env() -> Self {
        let socket = std::env::var("DOCKER_HOST")
            .ok()
            .and_then(|host| host.strip_prefix("unix://").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET));
        Self::new(socket)
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    fn api(&self, operation: &str) -> Result<Docker, EngineError> {
        Docker::connect_with_unix(
            &self.socket.to_string_lossy(),
            API_TIMEOUT_SECS,
            API_DEFAULT_VERSION,
        )
        .map_err(|source| api_error(operation, source))
    }

    async fn follow_logs(
        &self,
        container: &str,
        operation: &str,
    ) -> Result<LogStream, EngineError> {
        let stream = UnixStream::connect(&self.socket)
            .await
            .map_err(|source| EngineError::Connect {
                path: self.socket.clone(),
                source,
            })?;
        let (mut sender, connection) = http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|source| http_error(operation, source))?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                debug!("log connection closed: {err}");
            }
        });

        let path = format!(
            "/containers/{}/logs?follow=1&stdout=1&stderr=1",
            query_escape(container)
        );
        debug!("GET {path}");
        let request = Request::get(path)
            .header(header::HOST, "docker")
            .header(header::USER_AGENT, "devenv")
            .body(Empty::<Bytes>::new())
            .map_err(|e| EngineError::Protocol {
                operation: operation.to_string(),
                message: e.to_string(),
            })?;
        let response = sender
            .send_request(request)
            .await
            .map_err(|source| http_error(operation, source))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|source| http_error(operation, source))?
                .to_bytes();
            return Err(EngineError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body = response
            .into_body()
            .into_data_stream()
            .map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(body)))
    }
}

impl Default for DockerEngine {
    fn default() -> Self {
        Self::from_env()
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, EngineError> {
        let operation = "list containers";
        let containers = self
            .api(operation)?
            .list_containers(None::<ListContainersOptions<String>>)
            .await
            .map_err(|source| api_error(operation, source))?;
        Ok(containers.into_iter().map(container_summary).collect())
    }

    async fn open_log_stream(
        &self,
        container: &str,
        cancel: &CancellationToken,
    ) -> Result<LogStream, EngineError> {
        let operation = format!("logs of {container}");
        tokio::select! {
            _ = cancel.cancelled() => Err(EngineError::Cancelled(operation)),
            stream = self.follow_logs(container, &operation) => stream,
        }
    }

    async fn prune_containers(&self) -> Result<PruneReport, EngineError> {
        let operation = "prune containers";
        let response = self
            .api(operation)?
            .prune_containers(None::<PruneContainersOptions<String>>)
            .await
            .map_err(|source| api_error(operation, source))?;
        Ok(PruneReport {
            deleted: response.containers_deleted.unwrap_or_default(),
            untagged: Vec::new(),
            space_reclaimed: reclaimed(response.space_reclaimed),
        })
    }

    async fn prune_volumes(&self, keep_label: &str) -> Result<PruneReport, EngineError> {
        let operation = "prune volumes";
        let response = self
            .api(operation)?
            .prune_volumes(Some(keep_label_filter(keep_label)))
            .await
            .map_err(|source| api_error(operation, source))?;
        Ok(PruneReport {
            deleted: response.volumes_deleted.unwrap_or_default(),
            untagged: Vec::new(),
            space_reclaimed: reclaimed(response.space_reclaimed),
        })
    }

    async fn prune_images(&self) -> Result<PruneReport, EngineError> {
        let operation = "prune images";
        let response = self
            .api(operation)?
            .prune_images(None::<PruneImagesOptions<String>>)
            .await
            .map_err(|source| api_error(operation, source))?;
        Ok(image_prune_report(response))
    }

    async fn server_version(&self) -> Result<EngineVersion, EngineError> {
        let operation = "engine version";
        let version = self
            .api(operation)?
            .version()
            .await
            .map_err(|source| api_error(operation, source))?;
        Ok(EngineVersion {
            version: version.version.unwrap_or_default(),
            api_version: version.api_version.unwrap_or_default(),
            os: version.os.unwrap_or_default(),
            arch: version.arch.unwrap_or_default(),
        })
    }
}

fn container_summary(container: models::ContainerSummary) -> ContainerSummary {
    ContainerSummary {
        id: container.id.unwrap_or_default(),
        names: container.names.unwrap_or_default(),
        labels: container.labels.unwrap_or_default(),
        state: container.state.unwrap_or_default(),
    }
}

fn keep_label_filter(keep_label: &str) -> PruneVolumesOptions<String> {
    PruneVolumesOptions {
        filters: HashMap::from([("label!".to_string(), vec![keep_label.to_string()])]),
    }
}

fn image_prune_report(response: models::ImagePruneResponse) -> PruneReport {
    let items = response.images_deleted.unwrap_or_default();
    PruneReport {
        deleted: items.iter().filter_map(|i| i.deleted.clone()).collect(),
        untagged: items.iter().filter_map(|i| i.untagged.clone()).collect(),
        space_reclaimed: reclaimed(response.space_reclaimed),
    }
}

fn reclaimed(bytes: Option<i64>) -> u64 {
    bytes.map_or(0, |b| u64::try_from(b).unwrap_or(0))
}

fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}

fn api_error(operation: &str, source: bollard::errors::Error) -> EngineError {
    EngineError::Api {
        operation: operation.to_string(),
        source,
    }
}

fn http_error(operation: &str, source: hyper::Error) -> EngineError {
    EngineError::Http {
        operation: operation.to_string(),
        source,
    }
}

/// Percent-encodes everything outside the URL unreserved set.
fn query_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() * 3);
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
