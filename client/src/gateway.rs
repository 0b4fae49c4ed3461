use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use shared::{DeviceConfig, Script, ScriptAction, ScriptPayload, ScriptRequest};

use crate::error::GatewayError;

const SCRIPT_RESOURCE: &str = "script";
const CONFIG_RESOURCE: &str = "config";

/// The four exchanges the panel has with the device.
///
/// Every call is independent: nothing is cached, retried, or timed out here.
#[async_trait]
pub trait DeviceGateway: Send + Sync + 'static {
    async fn load_script(&self) -> Result<Script, GatewayError>;

    async fn submit_script(&self, script: Script, action: ScriptAction) -> Result<(), GatewayError>;

    async fn load_config(&self) -> Result<DeviceConfig, GatewayError>;

    async fn submit_config(&self, config: DeviceConfig) -> Result<(), GatewayError>;
}

/// [`DeviceGateway`] over the device's JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    script_url: Url,
    config_url: Url,
}

impl HttpGateway {
    /// Resources are resolved relative to `base_url`, so a path prefix such
    /// as `http://host/panel` is kept.
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, GatewayError> {
        let mut base = Url::parse(base_url.trim())
            .map_err(|err| GatewayError::request_failed(format!("invalid device URL '{base_url}': {err}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let join = |resource: &str| {
            base.join(resource)
                .map_err(|err| GatewayError::request_failed(format!("invalid device URL '{base_url}': {err}")))
        };

        Ok(Self {
            script_url: join(SCRIPT_RESOURCE)?,
            config_url: join(CONFIG_RESOURCE)?,
            client,
        })
    }

    pub fn script_url(&self) -> &Url {
        &self.script_url
    }

    pub fn config_url(&self) -> &Url {
        &self.config_url
    }

    pub async fn run_script(&self, script: Script) -> Result<(), GatewayError> {
        self.submit_script(script, ScriptAction::Run).await
    }

    pub async fn save_script(&self, script: Script) -> Result<(), GatewayError> {
        self.submit_script(script, ScriptAction::Save).await
    }
}

#[async_trait]
impl DeviceGateway for HttpGateway {
    async fn load_script(&self) -> Result<Script, GatewayError> {
        debug!("Sending GET {}", self.script_url);
        let response = self.client.get(self.script_url.clone()).send().await?;
        let payload: ScriptPayload = decode(response, "GET /script").await?;
        Ok(payload.script)
    }

    async fn submit_script(&self, script: Script, action: ScriptAction) -> Result<(), GatewayError> {
        debug!("Sending POST {} ({action:?})", self.script_url);
        let request = ScriptRequest { script, action };
        let response = self.client.post(self.script_url.clone()).json(&request).send().await?;
        acknowledge(response, "POST /script").await
    }

    async fn load_config(&self) -> Result<DeviceConfig, GatewayError> {
        debug!("Sending GET {}", self.config_url);
        let response = self.client.get(self.config_url.clone()).send().await?;
        decode(response, "GET /config").await
    }

    async fn submit_config(&self, config: DeviceConfig) -> Result<(), GatewayError> {
        debug!("Sending POST {}", self.config_url);
        let response = self.client.post(self.config_url.clone()).json(&config).send().await?;
        acknowledge(response, "POST /config").await
    }
}

fn check_status(response: Response, endpoint: &str) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(GatewayError::request_failed(format!("{endpoint} returned {status}")))
    }
}

async fn decode<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T, GatewayError> {
    let body = check_status(response, endpoint)?.text().await?;
    serde_json::from_str(&body)
        .map_err(|err| GatewayError::request_failed(format!("{endpoint} returned an invalid body: {err}")))
}

// 2xx bodies are not parsed; the device's acknowledgement is only logged.
async fn acknowledge(response: Response, endpoint: &str) -> Result<(), GatewayError> {
    match check_status(response, endpoint)?.text().await {
        Ok(body) => info!("{endpoint} response: {body}"),
        Err(err) => debug!("{endpoint} succeeded but its body could not be read: {err}"),
    }
    Ok(())
}
