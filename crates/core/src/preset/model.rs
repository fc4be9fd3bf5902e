use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::AgentDefinition;
use crate::{Error, Result};

/// A named agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub agent_id: String,
    pub model: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub tools: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Preset {
    pub fn new(
        name: impl Into<String>,
        agent_id: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            agent_id: agent_id.into(),
            model: model.into(),
            system_prompt: None,
            tools: None,
            created_at: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("agent_id", &self.agent_id),
            ("model", &self.model),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidInput(format!("preset {} is required", field)));
            }
        }
        Ok(())
    }

    /// Agent definition described by this preset. Tool entries are not carried over.
    pub fn to_definition(&self) -> AgentDefinition {
        let mut def = AgentDefinition::new(&self.agent_id, &self.model).with_name(&self.name);
        def.system_prompt = self.system_prompt.clone();
        def
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_fields() {
        assert!(Preset::new("Helper", "helper", "gpt-4o-mini").validate().is_ok());

        match Preset::new("Helper", " ", "gpt-4o-mini").validate() {
            Err(Error::InvalidInput(msg)) => assert!(msg.contains("agent_id")),
            other => panic!("Expected InvalidInput error, got: {:?}", other),
        }
    }

    #[test]
    fn test_serializes_snake_case_record() {
        let preset = Preset::new("Helper", "helper", "gpt-4o-mini").with_system_prompt("hi");
        let value = serde_json::to_value(&preset).unwrap();

        assert_eq!(value["agent_id"], "helper");
        assert_eq!(value["system_prompt"], "hi");
        assert!(value["tools"].is_null());
        assert!(value.get("created_at").is_none());
    }

    #[test]
    fn test_to_definition() {
        let def = Preset::new("Helper", "helper", "gpt-4o-mini")
            .with_system_prompt("be terse")
            .to_definition();

        assert_eq!(def.id, "helper");
        assert_eq!(def.name, "Helper");
        assert_eq!(def.system_prompt(), Some("be terse"));
    }
}
