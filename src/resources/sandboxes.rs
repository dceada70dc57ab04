//! Sandbox model and manager.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use super::{required_str, ToJson, ToTableRow};
use crate::client::TorqueClient;
use crate::errors::ClientError;

/// Sandbox status values the start-and-wait loop cares about.
pub const STATUS_ACTIVE: &str = "Active";
pub const STATUS_LAUNCHING: &str = "Launching";
pub const STATUS_ENDED: &str = "Ended";

/// A running (or ended) environment provisioned from a blueprint.
#[derive(Debug, Clone)]
pub struct Sandbox {
    pub id: String,
    pub name: String,
    pub blueprint_name: String,
    pub status: String,
    /// Checkpoint name -> status, present while the sandbox is launching.
    pub launching_progress: Vec<(String, String)>,
}

impl Sandbox {
    pub fn from_json(value: &Value) -> Result<Self, ClientError> {
        let id = required_str(value, "id")?;
        let name = required_str(value, "name")?;
        let blueprint_name = value
            .get("blueprint_name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let status = required_str(value, "sandbox_status")?;

        let launching_progress = value
            .get("launching_progress")
            .and_then(|v| v.as_object())
            .map(progress_steps)
            .unwrap_or_default();

        Ok(Self { id, name, blueprint_name, status, launching_progress })
    }
}

fn progress_steps(progress: &Map<String, Value>) -> Vec<(String, String)> {
    progress
        .iter()
        .map(|(checkpoint, properties)| {
            let status = properties
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            (checkpoint.clone(), status)
        })
        .collect()
}

impl ToJson for Sandbox {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "blueprint_name": self.blueprint_name,
            "status": self.status,
        })
    }
}

impl ToTableRow for Sandbox {
    fn table_row(&self) -> Vec<(String, String)> {
        vec![
            ("Sandbox ID".to_string(), self.id.clone()),
            ("Sandbox Name".to_string(), self.name.clone()),
            ("Blueprint Name".to_string(), self.blueprint_name.clone()),
            ("Status".to_string(), self.status.clone()),
        ]
    }
}

/// Everything `sb start` sends to the service.
#[derive(Debug, Clone, Default)]
pub struct StartRequest {
    pub name: String,
    pub blueprint_name: String,
    pub duration_minutes: Option<i64>,
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub inputs: HashMap<String, String>,
    pub artifacts: HashMap<String, String>,
}

impl StartRequest {
    fn to_body(&self) -> Value {
        let mut body = json!({
            "sandbox_name": self.name,
            "blueprint_name": self.blueprint_name,
            "inputs": self.inputs,
            "artifacts": self.artifacts,
        });
        if let Some(duration) = self.duration_minutes {
            body["duration"] = json!(format!("PT{duration}M"));
        }
        if let Some(branch) = &self.branch {
            body["source"] = json!({
                "branch": branch,
                "commit": self.commit.as_deref().unwrap_or(""),
            });
        }
        body
    }
}

/// HTTP facade for sandbox operations.
#[derive(Debug)]
pub struct SandboxesManager {
    client: TorqueClient,
}

impl SandboxesManager {
    pub fn new(client: TorqueClient) -> Self {
        Self { client }
    }

    /// Fetch one sandbox.
    pub async fn get(&self, sandbox_id: &str) -> Result<Sandbox, ClientError> {
        let response = self.client.get(&format!("sandboxes/{sandbox_id}")).await?;
        Sandbox::from_json(&response)
    }

    /// Raw single-sandbox response, for `--detail` output.
    pub async fn get_detailed(&self, sandbox_id: &str) -> Result<Value, ClientError> {
        self.client.get(&format!("sandboxes/{sandbox_id}")).await
    }

    /// List sandboxes in the space, newest first as the service returns
    /// them.
    pub async fn list(&self, filter: &str, count: u32) -> Result<Vec<Sandbox>, ClientError> {
        let response = self
            .client
            .get(&format!("sandboxes?count={count}&filter={filter}"))
            .await?;
        let items = response
            .as_array()
            .ok_or_else(|| ClientError::missing_field("sandboxes"))?;
        items.iter().map(Sandbox::from_json).collect()
    }

    /// Start a sandbox; returns the new sandbox id.
    pub async fn start(&self, request: &StartRequest) -> Result<String, ClientError> {
        let response = self.client.post("sandboxes", &request.to_body()).await?;
        required_str(&response, "id")
    }

    /// Request sandbox teardown.
    pub async fn end(&self, sandbox_id: &str) -> Result<(), ClientError> {
        self.client.delete(&format!("sandboxes/{sandbox_id}")).await?;
        Ok(())
    }

    /// Link to the sandbox page in the web UI.
    pub fn ui_link(&self, sandbox_id: &str) -> String {
        format!("https://{}/{}/sandboxes/{}", self.client.host(), self.client.space(), sandbox_id)
    }

    /// API URL of the sandbox resource.
    pub fn api_url(&self, sandbox_id: &str) -> String {
        self.client.space_url(&format!("sandboxes/{sandbox_id}"))
    }
}
