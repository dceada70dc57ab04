//! Blueprint model and manager.

use serde_json::{json, Value};

use super::{required_str, unwrap_details, ToJson, ToTableRow};
use crate::client::TorqueClient;
use crate::errors::ClientError;

/// A blueprint published in the space catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blueprint {
    pub name: String,
    pub url: String,
    pub enabled: bool,
    pub description: String,
}

impl Blueprint {
    /// Build a blueprint from a server response. Accepts both the flat
    /// object and the `details`-wrapped shape; identity fields (name, url)
    /// must be present, everything else is tolerated.
    pub fn from_json(value: &Value) -> Result<Self, ClientError> {
        let obj = unwrap_details(value);

        let name = obj
            .get("blueprint_name")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .map(Ok)
            .unwrap_or_else(|| required_str(obj, "name"))?;
        let url = required_str(obj, "url")?;
        let enabled = obj.get("enabled").and_then(|v| v.as_bool()).unwrap_or(true);
        let description = obj
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(Self { name, url, enabled, description })
    }
}

impl ToJson for Blueprint {
    fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "url": self.url,
            "enabled": self.enabled,
        })
    }
}

impl ToTableRow for Blueprint {
    fn table_row(&self) -> Vec<(String, String)> {
        vec![
            ("Name".to_string(), self.name.clone()),
            ("Description".to_string(), self.description.clone()),
            ("Enabled".to_string(), self.enabled.to_string()),
        ]
    }
}

/// One problem reported by blueprint validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub name: String,
    pub message: String,
}

impl ToJson for ValidationIssue {
    fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "message": self.message,
        })
    }
}

impl ToTableRow for ValidationIssue {
    fn table_row(&self) -> Vec<(String, String)> {
        vec![
            ("NAME".to_string(), self.name.clone()),
            ("MESSAGE".to_string(), self.message.clone()),
        ]
    }
}

/// Issues reported by a validation run; empty means the blueprint is valid.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    fn from_json(value: &Value) -> Self {
        let obj = unwrap_details(value);
        let issues = obj
            .get("errors")
            .and_then(|v| v.as_array())
            .map(|errors| {
                errors
                    .iter()
                    .map(|err| ValidationIssue {
                        name: err.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                        message: err
                            .get("message")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { issues }
    }

    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// HTTP facade for blueprint operations.
#[derive(Debug)]
pub struct BlueprintsManager {
    client: TorqueClient,
}

impl BlueprintsManager {
    pub fn new(client: TorqueClient) -> Self {
        Self { client }
    }

    /// List blueprints in the space.
    pub async fn list(&self) -> Result<Vec<Blueprint>, ClientError> {
        let response = self.client.get("blueprints").await?;
        let items = response
            .as_array()
            .ok_or_else(|| ClientError::missing_field("blueprints"))?;
        items.iter().map(Blueprint::from_json).collect()
    }

    /// Raw list response, for `--detail` output.
    pub async fn list_detailed(&self) -> Result<Value, ClientError> {
        self.client.get("blueprints").await
    }

    /// Fetch one blueprint from the catalog.
    pub async fn get(&self, name: &str) -> Result<Blueprint, ClientError> {
        let response = self.client.get(&format!("catalog/{name}")).await?;
        Blueprint::from_json(&response)
    }

    /// Raw single-blueprint response, for `--detail` output.
    pub async fn get_detailed(&self, name: &str) -> Result<Value, ClientError> {
        self.client.get(&format!("catalog/{name}")).await
    }

    /// Validate a blueprint without deploying it. A commit without a branch
    /// is rejected here, before any request goes out.
    pub async fn validate(
        &self,
        blueprint: &str,
        branch: Option<&str>,
        commit: Option<&str>,
    ) -> Result<ValidationResult, ClientError> {
        if commit.is_some() && branch.map_or(true, str::is_empty) {
            return Err(ClientError::InvalidRequest(
                "Since commit is specified, branch is required".to_string(),
            ));
        }

        let mut body = json!({
            "blueprint_name": blueprint,
            "type": "sandbox",
        });
        if let Some(branch) = branch {
            body["source"] = json!({
                "branch": branch,
                "commit": commit.unwrap_or(""),
            });
        }

        let response = self.client.post("validations/blueprints", &body).await?;
        Ok(ValidationResult::from_json(&response))
    }
}
