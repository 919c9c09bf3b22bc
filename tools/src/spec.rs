//! Tool interface descriptions.
//!
//! A [`ToolDefinition`] names a tool, says what it does, and lists its
//! parameters. It renders to the OpenAI function-tool format and checks
//! the arguments a model sends back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Data types for tool parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl DataType {
    /// Convert to JSON Schema type string.
    pub fn to_json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// One named parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInput {
    /// Parameter name.
    pub name: String,

    /// Accepted types; more than one renders as a JSON Schema type list.
    pub data_types: Vec<DataType>,

    /// Element type when arrays are accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<DataType>,

    /// Description of the parameter.
    pub description: String,

    /// Whether the parameter is required.
    pub required: bool,
}

impl ToolInput {
    /// Create a new required input parameter.
    pub fn required(
        name: impl Into<String>,
        data_type: DataType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_types: vec![data_type],
            items: None,
            description: description.into(),
            required: true,
        }
    }

    /// Create a new optional input parameter.
    pub fn optional(
        name: impl Into<String>,
        data_type: DataType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, data_type, description)
        }
    }

    /// Also accept `data_type`.
    pub fn or(mut self, data_type: DataType) -> Self {
        self.data_types.push(data_type);
        self
    }

    /// Set the array element type.
    pub fn with_items(mut self, items: DataType) -> Self {
        self.items = Some(items);
        self
    }

    /// Convert to JSON Schema.
    pub fn to_schema(&self) -> Value {
        let types: Vec<&str> = self.data_types.iter().map(|t| t.to_json_type()).collect();
        let mut schema = json!({ "description": self.description });
        schema["type"] = match types.as_slice() {
            [single] => json!(single),
            _ => json!(types),
        };
        if let Some(items) = self.items {
            schema["items"] = json!({ "type": items.to_json_type() });
        }
        schema
    }

    /// Check a value against the accepted types.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        if !self.data_types.iter().any(|t| t.accepts(value)) {
            return Err(format!(
                "invalid type for {}: expected {:?}",
                self.name, self.data_types
            ));
        }
        if let (Some(items), Some(elements)) = (self.items, value.as_array()) {
            if let Some(bad) = elements.iter().position(|e| !items.accepts(e)) {
                return Err(format!(
                    "invalid element {bad} of {}: expected {items:?}",
                    self.name
                ));
            }
        }
        Ok(())
    }
}

/// Name, purpose and parameters of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Name the model calls the tool by.
    pub name: String,

    /// What the tool does, for the model.
    pub description: String,

    /// Parameters, in declaration order.
    pub inputs: Vec<ToolInput>,
}

impl ToolDefinition {
    /// Create a definition without parameters.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            inputs: Vec::new(),
        }
    }

    /// Add a parameter.
    pub fn with_input(mut self, input: ToolInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// JSON Schema of the parameter object.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for input in &self.inputs {
            properties.insert(input.name.clone(), input.to_schema());
            if input.required {
                required.push(Value::String(input.name.clone()));
            }
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }
        schema
    }

    /// The definition in OpenAI function-tool format.
    pub fn to_openai(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters_schema(),
            }
        })
    }

    /// Check that `args` is an object carrying every required parameter with
    /// an accepted type.
    pub fn validate_inputs(&self, args: &Value) -> Result<(), String> {
        let obj = args
            .as_object()
            .ok_or_else(|| "arguments must be an object".to_string())?;

        for input in &self.inputs {
            match obj.get(&input.name) {
                Some(value) => input.validate(value)?,
                None if input.required => {
                    return Err(format!("missing required argument: {}", input.name));
                }
                None => {}
            }
        }
        Ok(())
    }
}
