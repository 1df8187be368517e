//! Core type definitions: tool descriptors and structured results.

pub mod result;
pub mod tool;

pub use result::{object, JsonObject, StructuredResult};
pub use tool::{
    FunctionDefinition, ParamConstraint, ParamSpec, ParamType, ToolDefinition, ToolDescriptor,
};
