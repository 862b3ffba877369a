// src/client.rs
use crate::command::ControlCommand;
use crate::error::ClientError;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Anything that can deliver a [`ControlCommand`] to the audio service.
///
/// The dispatch worker is the only caller; recognition never awaits it.
pub trait ControlClient: Send + Sync + 'static {
    fn send(
        &self,
        command: &ControlCommand,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}

/// HTTP client for the loop/volume/beat endpoints of the control service.
#[derive(Debug, Clone)]
pub struct HttpControlClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpControlClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::BaseUrl(base_url));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::Transport {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Checks that the service root answers with a success status.
    pub async fn ping(&self) -> Result<(), ClientError> {
        self.get(&format!("{}/", self.base_url)).await
    }

    pub async fn start_loop(&self, id: &str) -> Result<(), ClientError> {
        self.get(&format!("{}/start/{}", self.base_url, id)).await
    }

    pub async fn play(&self, id: &str) -> Result<(), ClientError> {
        self.get(&format!("{}/play/{}", self.base_url, id)).await
    }

    pub async fn pause(&self, id: &str) -> Result<(), ClientError> {
        self.get(&format!("{}/pause/{}", self.base_url, id)).await
    }

    pub async fn set_volume(&self, id: &str, value: &str) -> Result<(), ClientError> {
        let url = format!("{}/volume/{}", self.base_url, id);
        self.post_value(&url, value).await
    }

    pub async fn set_tempo(&self, id: &str, value: &str) -> Result<(), ClientError> {
        let url = format!("{}/beat/{}", self.base_url, id);
        self.post_value(&url, value).await
    }

    async fn get(&self, url: &str) -> Result<(), ClientError> {
        let request = self.http.get(url);
        self.execute(url, request).await
    }

    async fn post_value(&self, url: &str, value: &str) -> Result<(), ClientError> {
        let request = self.http.post(url).form(&[("value", value)]);
        self.execute(url, request).await
    }

    async fn execute(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<(), ClientError> {
        let response = request.send().await.map_err(|source| ClientError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url: url.to_string(),
                status,
            });
        }

        debug!("{} -> {}", url, status);
        Ok(())
    }
}

impl ControlClient for HttpControlClient {
    async fn send(&self, command: &ControlCommand) -> Result<(), ClientError> {
        match command {
            ControlCommand::StartLoop(id) => self.start_loop(id).await,
            ControlCommand::Play(id) => self.play(id).await,
            ControlCommand::Pause(id) => self.pause(id).await,
            ControlCommand::SetVolume(id, value) => self.set_volume(id, value).await,
            ControlCommand::SetTempo(id, value) => self.set_tempo(id, value).await,
        }
    }
}
