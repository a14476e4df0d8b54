//! MCP Prompt Templates
//!
//! Pre-defined prompts that help a client author new CCPlugins commands and
//! tune development workflows.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// A prompt argument definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// A prompt template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// A prompt message (the actual content).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: PromptContent,
}

/// Prompt content types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PromptContent {
    Text { text: String },
}

/// Result of prompts/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPromptsResult {
    pub prompts: Vec<Prompt>,
}

/// Result of prompts/get.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptResult {
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

/// Template for generating prompt messages.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Description returned with the rendered messages.
    pub title: String,
    pub template: String,
    /// Values used for optional arguments the caller left out.
    pub defaults: HashMap<String, String>,
}

/// Prompt registry, in registration order.
#[derive(Debug, Clone, Default)]
pub struct PromptRegistry {
    prompts: Vec<(Prompt, PromptTemplate)>,
    index: HashMap<String, usize>,
}

impl PromptRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the two built-in prompts.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        registry.register_builtin_prompts()?;
        Ok(registry)
    }

    /// Register built-in prompts.
    fn register_builtin_prompts(&mut self) -> Result<()> {
        let builtins = [
            (
                Prompt {
                    name: "create_command".to_string(),
                    description: "Generate a new CCPlugins command based on context".to_string(),
                    arguments: vec![
                        PromptArgument {
                            name: "purpose".to_string(),
                            description: "What the command should accomplish".to_string(),
                            required: true,
                        },
                        PromptArgument {
                            name: "context".to_string(),
                            description: "Project context for the command".to_string(),
                            required: false,
                        },
                    ],
                },
                PromptTemplate {
                    title: "Generate CCPlugins command".to_string(),
                    template: r#"Write a CCPlugins command whose job is to {{purpose}}.

Project context:
{{context}}

Requirements for the command:
1. Speak in the first person, the way existing CCPlugins commands do ("I'll ...")
2. Stay focused on one developer task and finish it
3. Validate inputs and explain failures plainly
4. Report what was done at the end
5. Reuse tools already present in the project where possible

Return the command as a markdown file ready to drop into the commands directory."#
                        .to_string(),
                    defaults: HashMap::from([("context".to_string(), "{}".to_string())]),
                },
            ),
            (
                Prompt {
                    name: "optimize_workflow".to_string(),
                    description: "Suggest workflow optimizations based on project analysis"
                        .to_string(),
                    arguments: vec![PromptArgument {
                        name: "current_workflow".to_string(),
                        description: "Description of current workflow".to_string(),
                        required: true,
                    }],
                },
                PromptTemplate {
                    title: "Optimize development workflow".to_string(),
                    template: r#"Review this development workflow and propose improvements:

{{current_workflow}}

Cover:
1. Steps that could be automated
2. Integrations (issue trackers, CI, scaffolding) that would remove manual work
3. CCPlugins commands worth adding or extending
4. Habits that would make the team faster

Prefer concrete changes that can be adopted this week."#
                        .to_string(),
                    defaults: HashMap::new(),
                },
            ),
        ];

        for (prompt, template) in builtins {
            self.register(prompt, template)?;
        }
        Ok(())
    }

    /// Register a prompt. Names must be unique.
    pub fn register(&mut self, prompt: Prompt, template: PromptTemplate) -> Result<()> {
        if self.index.contains_key(&prompt.name) {
            return Err(Error::DuplicateCapability(format!("prompt {}", prompt.name)));
        }
        self.index.insert(prompt.name.clone(), self.prompts.len());
        self.prompts.push((prompt, template));
        Ok(())
    }

    /// List all prompts, in registration order.
    pub fn list(&self) -> Vec<Prompt> {
        self.prompts.iter().map(|(p, _)| p.clone()).collect()
    }

    /// Get a prompt by name with arguments substituted.
    ///
    /// String values are inserted as-is; anything else is rendered as
    /// pretty-printed JSON.
    pub fn get(&self, name: &str, arguments: &Map<String, Value>) -> Result<GetPromptResult> {
        let (prompt, template) = self
            .index
            .get(name)
            .map(|&i| &self.prompts[i])
            .ok_or_else(|| Error::PromptNotFound(name.to_string()))?;

        let mut text = template.template.clone();
        for arg in &prompt.arguments {
            let value = match arguments.get(&arg.name) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => match template.defaults.get(&arg.name) {
                    Some(default) if !arg.required => default.clone(),
                    _ if arg.required => {
                        return Err(Error::InvalidParams(format!(
                            "Missing required argument: {}",
                            arg.name
                        )))
                    }
                    _ => String::new(),
                },
                Some(other) => serde_json::to_string_pretty(other)?,
            };
            text = text.replace(&format!("{{{{{}}}}}", arg.name), &value);
        }

        Ok(GetPromptResult {
            description: Some(template.title.clone()),
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: PromptContent::Text { text },
            }],
        })
    }
}
