use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::catalog::ToolDescription;
use crate::error::{AgentError, Result};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// Run the tool against the raw JSON argument text of a tool call.
    async fn call(&self, arguments: &str) -> Result<String>;
}

/// Decode the raw JSON arguments of a call into the tool's typed parameters.
///
/// An empty argument string is read as `{}`.
pub fn decode_arguments<T: DeserializeOwned>(tool: &str, arguments: &str) -> Result<T> {
    let raw = if arguments.trim().is_empty() {
        "{}"
    } else {
        arguments
    };
    serde_json::from_str(raw).map_err(|source| AgentError::InvalidArguments {
        name: tool.to_string(),
        source,
    })
}

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn call(&self, name: &str, arguments: &str) -> Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;
        tool.call(arguments).await
    }

    /// Total form of [`ToolRegistry::call`]: failures come back as `Error: ...` text
    /// so they can be fed to the model like any other tool output.
    pub async fn invoke(&self, name: &str, arguments: &str) -> String {
        match self.call(name, arguments).await {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(tool = name, error = %err, "tool call failed");
                format!("Error: {err}")
            }
        }
    }

    /// Check that every advertised tool has a binding and every binding is advertised.
    pub fn verify_catalog(&self, catalog: &[ToolDescription]) -> Result<()> {
        let advertised: BTreeSet<&str> = catalog.iter().map(|tool| tool.name.as_str()).collect();
        if advertised.len() != catalog.len() {
            return Err(AgentError::Config(
                "tool catalog declares the same name twice".into(),
            ));
        }
        let bound: BTreeSet<&str> = self.tools.keys().map(String::as_str).collect();

        let unbound: Vec<&str> = advertised.difference(&bound).copied().collect();
        if !unbound.is_empty() {
            return Err(AgentError::Config(format!(
                "advertised tools without a binding: {}",
                unbound.join(", ")
            )));
        }
        let hidden: Vec<&str> = bound.difference(&advertised).copied().collect();
        if !hidden.is_empty() {
            return Err(AgentError::Config(format!(
                "bound tools missing from the catalog: {}",
                hidden.join(", ")
            )));
        }
        Ok(())
    }
}
