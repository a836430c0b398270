//! Tool System
//!
//! Contract for tools exposed to an agent. Every tool returns a
//! [`ToolResponse`]; schemas are declared explicitly when the tool is built.

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::message::{extract_text, ContentBlock, Reply};

/// Tool call request from the LLM
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: HashMap<String, Value>,

    /// Optional call ID for tracking
    #[serde(default)]
    pub id: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: HashMap::new(),
            id: None,
        }
    }

    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// String argument, if present
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// Structured value every tool returns
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Content shown to the model
    pub content: Vec<ContentBlock>,

    /// Extra data for the caller, not shown to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ToolResponse {
    /// Response with a single text block
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            metadata: None,
        }
    }

    #[must_use]
    pub fn with_block(mut self, block: ContentBlock) -> Self {
        self.content.push(block);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Concatenated text of the response
    pub fn to_text(&self) -> String {
        extract_text(&Reply::Blocks(self.content.clone()))
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default value if not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    pub fn required(name: impl Into<String>, param_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
            default: None,
            enum_values: None,
        }
    }

    pub fn optional(name: impl Into<String>, param_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSchema {
    /// OpenAI-style function schema
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut prop = Map::new();
            prop.insert("type".into(), json!(param.param_type));
            prop.insert("description".into(), json!(param.description));
            if let Some(default) = &param.default {
                prop.insert("default".into(), default.clone());
            }
            if let Some(values) = &param.enum_values {
                prop.insert("enum".into(), Value::Array(values.clone()));
            }
            properties.insert(param.name.clone(), Value::Object(prop));
            if param.required {
                required.push(json!(param.name));
            }
        }

        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                },
            },
        })
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    async fn execute(&self, call: &ToolCall) -> Result<ToolResponse>;

    /// Validate arguments before execution (optional)
    fn validate(&self, call: &ToolCall) -> Result<()> {
        let schema = self.schema();

        for param in &schema.parameters {
            if param.required && !call.arguments.contains_key(&param.name) {
                return Err(CoreError::ToolValidation(format!(
                    "Missing required parameter: {}",
                    param.name
                )));
            }
        }

        Ok(())
    }
}

type Handler = Arc<dyn Fn(ToolCall) -> BoxFuture<'static, Result<ToolResponse>> + Send + Sync>;

/// Tool backed by a closure, with an explicitly declared schema
pub struct FunctionTool {
    schema: ToolSchema,
    handler: Handler,
}

impl FunctionTool {
    pub fn builder(name: impl Into<String>) -> FunctionToolBuilder {
        FunctionToolBuilder {
            schema: ToolSchema {
                name: name.into(),
                description: String::new(),
                parameters: Vec::new(),
            },
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResponse> {
        (self.handler)(call.clone()).await
    }
}

/// Builder for [`FunctionTool`]
pub struct FunctionToolBuilder {
    schema: ToolSchema,
}

impl FunctionToolBuilder {
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.schema.description = description.into();
        self
    }

    #[must_use]
    pub fn param(mut self, param: ParameterSchema) -> Self {
        self.schema.parameters.push(param);
        self
    }

    /// Finish with an async handler
    pub fn handler<F, Fut>(self, f: F) -> FunctionTool
    where
        F: Fn(ToolCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResponse>> + Send + 'static,
    {
        FunctionTool {
            schema: self.schema,
            handler: Arc::new(move |call| Box::pin(f(call))),
        }
    }

    /// Finish with a synchronous handler
    pub fn sync_handler<F>(self, f: F) -> FunctionTool
    where
        F: Fn(&ToolCall) -> Result<ToolResponse> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.handler(move |call| {
            let f = Arc::clone(&f);
            async move { f(&call) }
        })
    }
}

/// Result of one call in a batch, keyed by the originating call id
#[derive(Debug)]
pub struct ToolOutcome {
    pub id: String,
    pub name: String,
    pub result: Result<ToolResponse>,
}

/// Tools available to one agent
pub struct Toolkit {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    timeout: Option<Duration>,
}

impl Default for Toolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl Toolkit {
    pub const fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            timeout: None,
        }
    }

    /// Bound every execution by `timeout`
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_shared(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.schema().name;
        if self.tools.contains_key(&name) {
            return Err(CoreError::DuplicateToolName(name));
        }
        tracing::debug!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Execute a tool call
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResponse> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| CoreError::ToolNotFound(call.name.clone()))?;

        tool.validate(call)?;

        tracing::debug!(tool = %call.name, "Executing tool");
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, tool.execute(call))
                .await
                .map_err(|_| CoreError::ToolTimeout {
                    name: call.name.clone(),
                    limit,
                })?,
            None => tool.execute(call).await,
        }
    }

    /// Execute all calls of one turn.
    ///
    /// Calls without an id get a fresh one. Outcomes come back in request
    /// order whether the calls ran concurrently or one after another.
    pub async fn execute_all(&self, calls: Vec<ToolCall>, parallel: bool) -> Vec<ToolOutcome> {
        let calls: Vec<ToolCall> = calls
            .into_iter()
            .map(|mut call| {
                if call.id.is_none() {
                    call.id = Some(uuid::Uuid::new_v4().to_string());
                }
                call
            })
            .collect();

        let results = if parallel {
            join_all(calls.iter().map(|call| self.execute(call))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                results.push(self.execute(call).await);
            }
            results
        };

        calls
            .into_iter()
            .zip(results)
            .map(|(call, result)| {
                if let Err(e) = &result {
                    tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                }
                ToolOutcome {
                    id: call.id.unwrap_or_default(),
                    name: call.name,
                    result,
                }
            })
            .collect()
    }

    /// All tool schemas, ordered by name
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Function-calling schemas, ordered by name
    pub fn json_schemas(&self) -> Vec<Value> {
        self.schemas().iter().map(ToolSchema::to_json_schema).collect()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_tool() -> FunctionTool {
        FunctionTool::builder("echo")
            .description("Echo the input back")
            .param(ParameterSchema::required("text", "string", "Text to echo"))
            .sync_handler(|call| {
                let text = call.str_arg("text").unwrap_or_default();
                Ok(ToolResponse::text(text))
            })
    }

    fn sleepy_tool(name: &'static str, millis: u64) -> FunctionTool {
        FunctionTool::builder(name).handler(move |_call| async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok(ToolResponse::text(name))
        })
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut toolkit = Toolkit::new();
        toolkit.register(echo_tool()).unwrap();

        let err = toolkit.register(echo_tool()).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateToolName(ref n) if n == "echo"));
        assert_eq!(toolkit.len(), 1);
    }

    #[test]
    fn test_json_schema_shape() {
        let schema = echo_tool().schema().to_json_schema();
        assert_eq!(schema["type"], "function");
        assert_eq!(schema["function"]["name"], "echo");
        assert_eq!(schema["function"]["parameters"]["properties"]["text"]["type"], "string");
        assert_eq!(schema["function"]["parameters"]["required"], json!(["text"]));
    }

    #[tokio::test]
    async fn test_execute_validates_and_runs() {
        let mut toolkit = Toolkit::new();
        toolkit.register(echo_tool()).unwrap();

        let response = toolkit
            .execute(&ToolCall::new("echo").with_arg("text", json!("hi")))
            .await
            .unwrap();
        assert_eq!(response.to_text(), "hi");

        let err = toolkit.execute(&ToolCall::new("echo")).await.unwrap_err();
        assert!(matches!(err, CoreError::ToolValidation(_)));

        let err = toolkit.execute(&ToolCall::new("missing")).await.unwrap_err();
        assert!(matches!(err, CoreError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_handler_errors_propagate() {
        let mut toolkit = Toolkit::new();
        toolkit
            .register(FunctionTool::builder("broken").handler(|_call| async {
                Err(CoreError::from(anyhow::anyhow!("disk on fire")))
            }))
            .unwrap();

        let err = toolkit.execute(&ToolCall::new("broken")).await.unwrap_err();
        assert!(err.is_tool_error());
        assert!(err.to_string().contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let mut toolkit = Toolkit::new().with_timeout(Duration::from_millis(10));
        toolkit.register(sleepy_tool("slow", 500)).unwrap();

        let err = toolkit.execute(&ToolCall::new("slow")).await.unwrap_err();
        assert!(matches!(err, CoreError::ToolTimeout { limit, .. } if limit == Duration::from_millis(10)));
        assert_eq!(err.to_string(), "Tool 'slow' timed out after 10ms");
    }

    #[tokio::test]
    async fn test_execute_all_matches_results_to_calls() {
        let mut toolkit = Toolkit::new();
        toolkit.register(sleepy_tool("first", 30)).unwrap();
        toolkit.register(sleepy_tool("second", 1)).unwrap();

        for parallel in [true, false] {
            let outcomes = toolkit
                .execute_all(
                    vec![
                        ToolCall::new("first").with_id("a"),
                        ToolCall::new("second"),
                        ToolCall::new("nope").with_id("c"),
                    ],
                    parallel,
                )
                .await;

            assert_eq!(outcomes.len(), 3);
            assert_eq!(outcomes[0].id, "a");
            assert_eq!(outcomes[0].result.as_ref().unwrap().to_text(), "first");
            assert!(!outcomes[1].id.is_empty());
            assert_eq!(outcomes[1].result.as_ref().unwrap().to_text(), "second");
            assert!(matches!(outcomes[2].result, Err(CoreError::ToolNotFound(_))));
        }
    }

    #[test]
    fn test_tool_names_sorted() {
        let mut toolkit = Toolkit::new();
        toolkit.register(sleepy_tool("zeta", 0)).unwrap();
        toolkit.register(echo_tool()).unwrap();
        assert_eq!(toolkit.names(), vec!["echo", "zeta"]);
    }
}
