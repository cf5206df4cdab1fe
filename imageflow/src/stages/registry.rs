//! Registry of stage contracts.
//!
//! Each stage type maps to a JSON schema describing its options. The
//! built-in contracts document the wire format the executor reads; callers
//! can register contracts for their own stage types.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

use super::options::{
    BOOTUPD_GEN_METADATA, FIRST_BOOT, OSTREE_COMMIT, OSTREE_INIT, OSTREE_PREPTREE, RPM, SELINUX,
    SKOPEO,
};
use super::Stage;
use crate::errors::ContractViolation;

/// Registered contract for one stage type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageContract {
    /// Stage type identifier.
    pub stage_type: String,
    /// JSON schema of the options.
    pub schema: serde_json::Value,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StageContract {
    /// Creates a new contract.
    #[must_use]
    pub fn new(stage_type: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            stage_type: stage_type.into(),
            schema,
            description: None,
        }
    }

    /// Adds a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Fields the schema marks as required.
    #[must_use]
    pub fn required_fields(&self) -> Vec<&str> {
        self.schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }
}

/// In-memory registry of stage contracts.
#[derive(Debug, Default)]
pub struct StageRegistry {
    entries: RwLock<BTreeMap<String, StageContract>>,
}

impl StageRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the contracts of every built-in stage.
    #[must_use]
    pub fn builtin() -> Self {
        let registry = Self::new();
        {
            let mut entries = registry.entries.write();
            for contract in builtin_contracts() {
                entries.insert(contract.stage_type.clone(), contract);
            }
        }
        registry
    }

    /// Registers a contract.
    ///
    /// Registering an identical schema again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ContractViolation::SchemaConflict`] if the type is already
    /// registered with a different schema.
    pub fn register(&self, contract: StageContract) -> Result<StageContract, ContractViolation> {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(&contract.stage_type) {
            if existing.schema == contract.schema {
                return Ok(existing.clone());
            }
            return Err(ContractViolation::SchemaConflict {
                stage_type: contract.stage_type,
            });
        }

        entries.insert(contract.stage_type.clone(), contract.clone());
        Ok(contract)
    }

    /// Fetch the contract for a stage type.
    #[must_use]
    pub fn get(&self, stage_type: &str) -> Option<StageContract> {
        self.entries.read().get(stage_type).cloned()
    }

    /// All registered stage types, sorted.
    #[must_use]
    pub fn stage_types(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Checks a stage against its contract.
    ///
    /// # Errors
    ///
    /// Returns a violation if the type is unknown or a required option is
    /// absent from the serialized options.
    pub fn validate(&self, stage: &Stage) -> Result<(), ContractViolation> {
        let stage_type = stage.stage_type();
        let contract = self.get(stage_type).ok_or_else(|| ContractViolation::Unregistered {
            stage_type: stage_type.to_string(),
        })?;

        let options = serde_json::to_value(stage.options())
            .map_err(|_| ContractViolation::missing_field(stage_type, "options"))?;

        for field in contract.required_fields() {
            if options.get(field).is_none() {
                return Err(ContractViolation::missing_field(stage_type, field));
            }
        }
        Ok(())
    }

    /// Returns the number of registered contracts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn builtin_contracts() -> Vec<StageContract> {
    vec![
        StageContract::new(
            RPM,
            json!({
                "type": "object",
                "required": ["packages"],
                "properties": {
                    "gpgkeys": {"type": "array", "items": {"type": "string"}},
                    "packages": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["name", "checksum"],
                            "properties": {
                                "name": {"type": "string"},
                                "checksum": {"type": "string"}
                            }
                        }
                    }
                }
            }),
        )
        .with_description("Install the listed packages into the tree"),
        StageContract::new(
            SKOPEO,
            json!({
                "type": "object",
                "required": ["destination", "images"],
                "properties": {
                    "destination": {"type": "string"},
                    "images": {"type": "array"}
                }
            }),
        )
        .with_description("Copy container images into the tree's container storage"),
        StageContract::new(
            FIRST_BOOT,
            json!({
                "type": "object",
                "required": ["commands"],
                "properties": {
                    "commands": {"type": "array", "items": {"type": "string"}},
                    "wait_for_network": {"type": "boolean"}
                }
            }),
        )
        .with_description("Run the commands once, in order, on first boot"),
        StageContract::new(BOOTUPD_GEN_METADATA, json!({"type": "object"}))
            .with_description("Generate bootloader update metadata for the tree"),
        StageContract::new(
            SELINUX,
            json!({
                "type": "object",
                "required": ["file_contexts"],
                "properties": {"file_contexts": {"type": "string"}}
            }),
        )
        .with_description("Relabel the tree using the policy's file contexts"),
        StageContract::new(
            OSTREE_PREPTREE,
            json!({
                "type": "object",
                "properties": {
                    "etc_group_members": {"type": "array", "items": {"type": "string"}}
                }
            }),
        )
        .with_description("Reshape the tree into the layout ostree commits expect"),
        StageContract::new(
            OSTREE_INIT,
            json!({
                "type": "object",
                "required": ["path"],
                "properties": {"path": {"type": "string"}}
            }),
        )
        .with_description("Create an ostree repository"),
        StageContract::new(
            OSTREE_COMMIT,
            json!({
                "type": "object",
                "required": ["ref", "tree"],
                "properties": {
                    "ref": {"type": "string"},
                    "os_version": {"type": "string"},
                    "parent": {"type": "string"},
                    "tree": {"type": "string"}
                }
            }),
        )
        .with_description("Commit a pipeline's tree into the repository"),
    ]
}
