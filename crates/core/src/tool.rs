//! Capability descriptors and the catalog the model is allowed to call.
//!
//! A [`CapabilityCatalog`] is fixed at configuration time and plays two
//! roles: it is rendered into the planning prompt, and it is the dispatch
//! guard that rejects tool names the model made up.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// One named parameter of a capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// JSON type name ("string", "boolean", ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    /// Any other JSON-schema keywords (enum, items, ...), kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PropertySchema {
    pub fn typed(kind: &str, description: &str) -> Self {
        Self {
            kind: Some(kind.to_string()),
            description: Some(description.to_string()),
            default: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn string(description: &str) -> Self {
        Self::typed("string", description)
    }

    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }
}

fn default_object_type() -> String {
    "object".into()
}

/// Object-typed parameter schema of a capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type", default = "default_object_type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertySchema>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self {
            kind: default_object_type(),
            properties: BTreeMap::new(),
            required: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

impl ParameterSchema {
    /// Add a required parameter.
    pub fn require(mut self, name: &str, schema: PropertySchema) -> Self {
        self.properties.insert(name.to_string(), schema);
        self.required.push(name.to_string());
        self
    }

    /// Add an optional parameter.
    pub fn optional(mut self, name: &str, schema: PropertySchema) -> Self {
        self.properties.insert(name.to_string(), schema);
        self
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

/// A tool the model may request: name, human description, typed parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: ParameterSchema,
}

impl CapabilityDescriptor {
    pub fn new(name: &str, description: &str, parameters: ParameterSchema) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    /// Wire record sent to the model.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: serde_json::to_value(&self.parameters)
                .unwrap_or_else(|_| serde_json::json!({"type": "object"})),
        }
    }

    pub fn from_definition(def: &ToolDefinition) -> Result<Self, ToolError> {
        let parameters = if def.parameters.is_null() {
            ParameterSchema::default()
        } else {
            serde_json::from_value(def.parameters.clone()).map_err(|e| {
                ToolError::InvalidCatalog(format!("tool '{}' has a bad schema: {e}", def.name))
            })?
        };
        Ok(Self {
            name: def.name.clone(),
            description: def.description.clone(),
            parameters,
        })
    }
}

/// Ordered, read-only set of capabilities with unique names.
#[derive(Debug, Clone, Default)]
pub struct CapabilityCatalog {
    descriptors: Vec<CapabilityDescriptor>,
}

impl CapabilityCatalog {
    /// Build a catalog. Duplicate or empty names are rejected.
    pub fn new(descriptors: Vec<CapabilityDescriptor>) -> Result<Self, ToolError> {
        let mut seen = HashSet::new();
        for d in &descriptors {
            if d.name.trim().is_empty() {
                return Err(ToolError::InvalidCatalog("capability with empty name".into()));
            }
            if !seen.insert(d.name.as_str()) {
                return Err(ToolError::InvalidCatalog(format!(
                    "duplicate capability name '{}'",
                    d.name
                )));
            }
        }
        Ok(Self { descriptors })
    }

    /// Build a catalog from the definitions a remote session advertises.
    pub fn from_definitions(defs: &[ToolDefinition]) -> Result<Self, ToolError> {
        let descriptors = defs
            .iter()
            .map(CapabilityDescriptor::from_definition)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(descriptors)
    }

    /// All descriptors, in catalog order.
    pub fn describe(&self) -> &[CapabilityDescriptor] {
        &self.descriptors
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.iter().any(|d| d.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&CapabilityDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Dispatch guard.
    pub fn ensure_registered(&self, name: &str) -> Result<(), ToolError> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(ToolError::NotRegistered(name.to_string()))
        }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.descriptors.iter().map(CapabilityDescriptor::to_definition).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather() -> CapabilityDescriptor {
        CapabilityDescriptor::new(
            "maps_weather",
            "根据城市名称或者标准adcode查询指定城市的天气",
            ParameterSchema::default().require("city", PropertySchema::string("城市名称或者adcode")),
        )
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = CapabilityCatalog::new(vec![weather(), weather()]).unwrap_err();
        assert!(matches!(err, ToolError::InvalidCatalog(_)));
        assert!(err.to_string().contains("maps_weather"));
    }

    #[test]
    fn guard_is_case_sensitive() {
        let catalog = CapabilityCatalog::new(vec![weather()]).unwrap();
        assert!(catalog.ensure_registered("maps_weather").is_ok());
        let err = catalog.ensure_registered("Maps_Weather").unwrap_err();
        assert!(matches!(err, ToolError::NotRegistered(name) if name == "Maps_Weather"));
    }

    #[test]
    fn definition_shape_matches_function_tools() {
        let def = weather().to_definition();
        assert_eq!(def.parameters["type"], "object");
        assert_eq!(def.parameters["properties"]["city"]["type"], "string");
        assert_eq!(def.parameters["required"], json!(["city"]));
    }

    #[test]
    fn descriptor_round_trips_through_definition() {
        let schema = ParameterSchema::default()
            .require("keywords", PropertySchema::string("搜索关键词"))
            .optional(
                "citylimit",
                PropertySchema::typed("boolean", "是否强制限定在设置的城市内搜索").with_default(json!(false)),
            );
        let original = CapabilityDescriptor::new("maps_text_search", "关键词搜索", schema);
        let back = CapabilityDescriptor::from_definition(&original.to_definition()).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn unknown_schema_keywords_survive() {
        let def = ToolDefinition {
            name: "maps_distance".into(),
            description: "距离测量".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "type": {"type": "string", "enum": ["0", "1", "3"]}
                },
                "additionalProperties": false
            }),
        };
        let descriptor = CapabilityDescriptor::from_definition(&def).unwrap();
        assert_eq!(descriptor.to_definition().parameters, def.parameters);
    }

    #[test]
    fn catalog_preserves_order() {
        let other = CapabilityDescriptor::new("maps_geo", "地理编码", ParameterSchema::default());
        let catalog = CapabilityCatalog::new(vec![weather(), other]).unwrap();
        assert_eq!(catalog.names(), vec!["maps_weather", "maps_geo"]);
        assert_eq!(catalog.definitions()[1].name, "maps_geo");
    }
}
