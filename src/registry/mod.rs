//! 工具注册表：tool name → handler + descriptor.
//!
//! Tool registry. Populated by explicit [`ToolRegistry::register`] calls at
//! startup and read-only afterwards; the bridge holds it behind an `Arc`, so
//! lookups need no locking. Names are unique and matched exactly
//! (case-sensitive). [`ToolRegistry::list`] preserves registration order,
//! which is also the order `tools/list` reports.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{JsonObject, StructuredResult, ToolDefinition, ToolDescriptor};
use crate::{Error, Result};

/// Per-call information handed to a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    /// Identity of the caller the tool runs on behalf of.
    pub user_id: String,
    /// Bridge request id, for log correlation.
    pub request_id: u64,
}

/// Business logic behind one tool.
///
/// Arguments arrive already validated against the tool's descriptor. An `Err`
/// is normalized by the bridge into a `Failure` result; domain failures the
/// caller should see verbatim (e.g. insufficient funds) are returned as
/// `Ok(StructuredResult::Failure { .. })`.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, ctx: ToolContext, arguments: JsonObject) -> Result<StructuredResult>;
}

/// A descriptor paired with its handler.
#[derive(Clone)]
pub struct RegisteredTool {
    pub descriptor: Arc<ToolDescriptor>,
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails with [`Error::DuplicateTool`] if the name is taken.
    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<()> {
        if self.index.contains_key(&descriptor.name) {
            return Err(Error::DuplicateTool {
                name: descriptor.name,
            });
        }
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            descriptor: Arc::new(descriptor),
            handler,
        });
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool(
        mut self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<Self> {
        self.register(descriptor, handler)?;
        Ok(self)
    }

    /// Look up a tool by exact name.
    pub fn resolve(&self, name: &str) -> Result<&RegisteredTool> {
        self.index
            .get(name)
            .and_then(|&i| self.tools.get(i))
            .ok_or_else(|| Error::UnknownTool {
                name: name.to_string(),
            })
    }

    /// Descriptors in registration order.
    pub fn list(&self) -> Vec<&ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor.as_ref()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Export every tool in function-calling form.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| t.descriptor.to_tool_definition())
            .collect()
    }
}
