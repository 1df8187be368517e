//! Tool descriptors and the function-calling export format.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// JSON type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
        }
    }
}

/// Value constraint applied on top of the type check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamConstraint {
    /// Trading symbol; normalized to upper case.
    Symbol,
    /// Strictly greater than zero and at most `max`.
    Positive { max: f64 },
    /// Inclusive bounds.
    Range { min: f64, max: f64 },
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ParamConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
            constraints: Vec::new(),
            description: None,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type)
        }
    }

    pub fn with_constraint(mut self, constraint: ParamConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn json_schema(&self) -> Value {
        let mut schema = json!({ "type": self.param_type.as_str() });
        if let Some(desc) = &self.description {
            schema["description"] = json!(desc);
        }
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        for constraint in &self.constraints {
            match constraint {
                ParamConstraint::Symbol => {
                    schema["pattern"] = json!(crate::validation::SYMBOL_PATTERN_SOURCE);
                }
                ParamConstraint::Positive { max } => {
                    schema["exclusiveMinimum"] = json!(0);
                    schema["maximum"] = json!(max);
                }
                ParamConstraint::Range { min, max } => {
                    schema["minimum"] = json!(min);
                    schema["maximum"] = json!(max);
                }
            }
        }
        schema
    }
}

/// Name, ordered parameter schema and description of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn find_param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// JSON Schema for the argument object (MCP `inputSchema`).
    pub fn input_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        for p in &self.params {
            properties.insert(p.name.clone(), p.json_schema());
        }
        let mut schema = json!({
            "type": "object",
            "properties": Value::Object(properties),
        });
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    /// Entry of a `tools/list` result.
    pub fn to_listing(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }

    pub fn to_tool_definition(&self) -> ToolDefinition {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name.clone(),
                description: Some(self.description.clone()),
                parameters: Some(self.input_schema()),
            },
        }
    }
}

/// Tool definition in function-calling form, for agent frameworks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String, // "function"
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Option<Value>, // JSON Schema
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orderbook() -> ToolDescriptor {
        ToolDescriptor::new("get_orderbook", "Order book depth")
            .param(
                ParamSpec::required("symbol", ParamType::String)
                    .with_constraint(ParamConstraint::Symbol),
            )
            .param(
                ParamSpec::optional("limit", ParamType::Integer)
                    .with_default(json!(5))
                    .with_constraint(ParamConstraint::Range { min: 1.0, max: 100.0 }),
            )
    }

    #[test]
    fn test_input_schema_shape() {
        let schema = orderbook().input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["symbol"]["type"], "string");
        assert_eq!(schema["properties"]["limit"]["default"], 5);
        assert_eq!(schema["properties"]["limit"]["maximum"], 100.0);
        assert_eq!(schema["required"], json!(["symbol"]));
    }

    #[test]
    fn test_schema_without_required_omits_key() {
        let schema = ToolDescriptor::new("check_balance", "Wallet").input_schema();
        assert!(schema.get("required").is_none());
        assert_eq!(schema["properties"], json!({}));
    }

    #[test]
    fn test_tool_definition_export() {
        let def = orderbook().to_tool_definition();
        assert_eq!(def.tool_type, "function");
        assert_eq!(def.function.name, "get_orderbook");
        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["type"], "function");
        assert!(value["function"]["parameters"]["properties"]["symbol"].is_object());
    }
}
