//! Project scaffolding from built-in templates.
//!
//! Templates are compiled into the binary. File paths and contents may carry
//! `{{VAR}}` placeholders which are filled from the project name, the
//! template's variable defaults and caller-supplied options, in that order.

use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::fs;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// A variable a template understands.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateVariable {
    pub name: &'static str,
    pub description: &'static str,
    pub default: &'static str,
}

#[derive(Debug, Clone)]
struct TemplateFile {
    path: &'static str,
    contents: &'static str,
}

/// A built-in project template.
#[derive(Debug, Clone, Serialize)]
pub struct Template {
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub variables: Vec<TemplateVariable>,
    #[serde(skip)]
    directories: Vec<&'static str>,
    #[serde(skip)]
    files: Vec<TemplateFile>,
}

/// Outcome of a successful scaffold.
#[derive(Debug, Clone, Serialize)]
pub struct ScaffoldResult {
    pub path: PathBuf,
    pub template: String,
    pub variables_used: BTreeMap<String, String>,
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").unwrap())
}

/// Replace `{{VAR}}` with known variables; unknown placeholders stay as-is.
pub fn substitute(text: &str, variables: &BTreeMap<String, String>) -> String {
    placeholder()
        .replace_all(text, |caps: &Captures| match variables.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// `my-cool-app` -> `my_cool_app`.
pub fn snake_case(name: &str) -> String {
    name.to_lowercase().replace(&['-', ' '][..], "_")
}

/// `my-cool-app` -> `MyCoolApp`.
pub fn camel_case(name: &str) -> String {
    name.split(&['-', '_', ' '][..])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect()
}

/// Builds projects from the built-in templates.
#[derive(Debug, Clone)]
pub struct ProjectScaffolder {
    templates: Vec<Template>,
}

impl Default for ProjectScaffolder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectScaffolder {
    pub fn new() -> Self {
        Self {
            templates: builtin_templates(),
        }
    }

    /// Templates in catalog order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// Generate `<target_dir>/<name>` from `template`.
    ///
    /// Nothing is left behind when generation fails part-way.
    pub async fn scaffold(
        &self,
        template: &str,
        name: &str,
        target_dir: &Path,
        options: &Map<String, Value>,
    ) -> Result<ScaffoldResult> {
        let tpl = self
            .template(template)
            .ok_or_else(|| Error::Scaffold(format!("Template '{}' not found", template)))?;

        if name.is_empty() || name.contains(&['/', '\\'][..]) || name == "." || name == ".." {
            return Err(Error::Scaffold(format!("Invalid project name '{}'", name)));
        }

        let root = target_dir.join(name);
        if fs::try_exists(&root).await? {
            return Err(Error::Scaffold(format!(
                "Directory '{}' already exists",
                root.display()
            )));
        }

        let variables = resolve_variables(tpl, name, options);

        fs::create_dir_all(&root).await?;
        if let Err(e) = write_template(tpl, &root, &variables).await {
            warn!("Scaffolding {} failed, removing {}: {}", template, root.display(), e);
            if let Err(cleanup) = fs::remove_dir_all(&root).await {
                warn!("Failed to clean up {}: {}", root.display(), cleanup);
            }
            return Err(Error::Scaffold(format!("Error scaffolding project: {}", e)));
        }

        info!("Scaffolded {} project at {}", template, root.display());
        Ok(ScaffoldResult {
            path: root,
            template: template.to_string(),
            variables_used: variables,
        })
    }
}

fn resolve_variables(
    tpl: &Template,
    name: &str,
    options: &Map<String, Value>,
) -> BTreeMap<String, String> {
    let mut variables = BTreeMap::from([
        ("PROJECT_NAME".to_string(), name.to_string()),
        ("PROJECT_NAME_SNAKE".to_string(), snake_case(name)),
        ("PROJECT_NAME_CAMEL".to_string(), camel_case(name)),
    ]);
    for var in &tpl.variables {
        variables.insert(var.name.to_string(), var.default.to_string());
    }
    for (key, value) in options {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        variables.insert(key.clone(), value);
    }
    variables
}

async fn write_template(
    tpl: &Template,
    root: &Path,
    variables: &BTreeMap<String, String>,
) -> Result<()> {
    for dir in &tpl.directories {
        let rel = substitute(dir, variables);
        fs::create_dir_all(safe_join(root, &rel)?).await?;
    }
    for file in &tpl.files {
        let rel = substitute(file.path, variables);
        let dest = safe_join(root, &rel)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&dest, substitute(file.contents, variables)).await?;
    }
    Ok(())
}

/// Join a substituted relative path, refusing anything that escapes `root`.
fn safe_join(root: &Path, rel: &str) -> Result<PathBuf> {
    let rel_path = Path::new(rel);
    let escapes = rel_path.is_absolute()
        || rel_path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir));
    if escapes {
        return Err(Error::Scaffold(format!(
            "Template path '{}' escapes the project directory",
            rel
        )));
    }
    Ok(root.join(rel_path))
}

fn builtin_templates() -> Vec<Template> {
    vec![
        Template {
            name: "python-cli",
            description: "Python CLI application template",
            category: "python",
            variables: vec![
                TemplateVariable {
                    name: "AUTHOR_NAME",
                    description: "Author name",
                    default: "Your Name",
                },
                TemplateVariable {
                    name: "AUTHOR_EMAIL",
                    description: "Author email",
                    default: "you@example.com",
                },
            ],
            directories: vec!["tests"],
            files: vec![
                TemplateFile {
                    path: "src/{{PROJECT_NAME_SNAKE}}/__init__.py",
                    contents: PYTHON_CLI_MAIN,
                },
                TemplateFile {
                    path: "setup.py",
                    contents: PYTHON_CLI_SETUP,
                },
                TemplateFile {
                    path: "README.md",
                    contents: PYTHON_CLI_README,
                },
                TemplateFile {
                    path: "tests/test_{{PROJECT_NAME_SNAKE}}.py",
                    contents: PYTHON_CLI_TEST,
                },
            ],
        },
        Template {
            name: "web-app",
            description: "Web application starter template",
            category: "web",
            variables: vec![TemplateVariable {
                name: "PORT",
                description: "Server port",
                default: "3000",
            }],
            directories: vec!["public"],
            files: vec![
                TemplateFile {
                    path: "package.json",
                    contents: WEB_APP_PACKAGE,
                },
                TemplateFile {
                    path: "src/index.js",
                    contents: WEB_APP_INDEX,
                },
            ],
        },
        Template {
            name: "api-service",
            description: "REST API service template",
            category: "api",
            variables: vec![TemplateVariable {
                name: "API_VERSION",
                description: "API version",
                default: "v1",
            }],
            directories: vec!["src/routes", "src/models", "src/middleware"],
            files: vec![
                TemplateFile {
                    path: "package.json",
                    contents: API_SERVICE_PACKAGE,
                },
                TemplateFile {
                    path: "src/server.js",
                    contents: API_SERVICE_SERVER,
                },
            ],
        },
        Template {
            name: "claude-plugin",
            description: "Claude Code CLI plugin template",
            category: "claude",
            variables: vec![TemplateVariable {
                name: "COMMAND_NAME",
                description: "Command name",
                default: "my-command",
            }],
            directories: vec![],
            files: vec![
                TemplateFile {
                    path: "commands/{{COMMAND_NAME}}.md",
                    contents: PLUGIN_COMMAND,
                },
                TemplateFile {
                    path: "install.py",
                    contents: PLUGIN_INSTALL,
                },
                TemplateFile {
                    path: "README.md",
                    contents: PLUGIN_README,
                },
            ],
        },
    ]
}

const PYTHON_CLI_MAIN: &str = r#"#!/usr/bin/env python3
"""{{PROJECT_NAME}}: a command line application."""

import argparse
import sys
from typing import List, Optional


def main(args: Optional[List[str]] = None) -> int:
    parser = argparse.ArgumentParser(description="{{PROJECT_NAME}} CLI")
    parser.add_argument("--version", action="version", version="{{PROJECT_NAME}} 1.0.0")
    parser.add_argument("--verbose", "-v", action="store_true", help="Verbose output")

    parsed = parser.parse_args(args)
    if parsed.verbose:
        print("Running {{PROJECT_NAME}} in verbose mode")

    print("Hello from {{PROJECT_NAME}}!")
    return 0


if __name__ == "__main__":
    sys.exit(main())
"#;

const PYTHON_CLI_SETUP: &str = r#"from setuptools import setup, find_packages

setup(
    name="{{PROJECT_NAME}}",
    version="1.0.0",
    author="{{AUTHOR_NAME}}",
    author_email="{{AUTHOR_EMAIL}}",
    description="A Python CLI application",
    packages=find_packages(where="src"),
    package_dir={"": "src"},
    python_requires=">=3.8",
    entry_points={
        "console_scripts": [
            "{{PROJECT_NAME}}={{PROJECT_NAME_SNAKE}}:main",
        ],
    },
)
"#;

const PYTHON_CLI_README: &str = r#"# {{PROJECT_NAME}}

A Python CLI application.

## Installation

```bash
pip install -e .
```

## Usage

```bash
{{PROJECT_NAME}} --help
```

## Development

```bash
python -m pytest tests/
```
"#;

const PYTHON_CLI_TEST: &str = r#"from {{PROJECT_NAME_SNAKE}} import main


def test_main():
    assert main([]) == 0
"#;

const WEB_APP_PACKAGE: &str = r#"{
  "name": "{{PROJECT_NAME}}",
  "version": "1.0.0",
  "description": "Web application",
  "main": "src/index.js",
  "scripts": {
    "start": "node src/index.js",
    "dev": "nodemon src/index.js"
  },
  "dependencies": {
    "express": "^4.18.0"
  },
  "devDependencies": {
    "nodemon": "^3.0.0"
  }
}
"#;

const WEB_APP_INDEX: &str = r#"const express = require('express');
const path = require('path');

const app = express();
const PORT = process.env.PORT || {{PORT}};

app.use(express.static(path.join(__dirname, '../public')));

app.get('/', (req, res) => {
    res.send('<h1>Welcome to {{PROJECT_NAME}}!</h1>');
});

app.listen(PORT, () => {
    console.log(`{{PROJECT_NAME}} server running on port ${PORT}`);
});
"#;

const API_SERVICE_PACKAGE: &str = r#"{
  "name": "{{PROJECT_NAME}}-api",
  "version": "1.0.0",
  "description": "REST API service",
  "main": "src/server.js",
  "scripts": {
    "start": "node src/server.js",
    "dev": "nodemon src/server.js"
  },
  "dependencies": {
    "express": "^4.18.0",
    "cors": "^2.8.5",
    "helmet": "^7.0.0",
    "dotenv": "^16.0.0"
  },
  "devDependencies": {
    "nodemon": "^3.0.0"
  }
}
"#;

const API_SERVICE_SERVER: &str = r#"require('dotenv').config();
const express = require('express');
const cors = require('cors');
const helmet = require('helmet');

const app = express();
app.use(helmet());
app.use(cors());
app.use(express.json());

app.get('/api/{{API_VERSION}}/health', (req, res) => {
    res.json({ service: '{{PROJECT_NAME}}', status: 'ok' });
});

const port = process.env.PORT || 8080;
app.listen(port, () => {
    console.log(`{{PROJECT_NAME}} API listening on port ${port}`);
});
"#;

const PLUGIN_COMMAND: &str = r#"# {{PROJECT_NAME_CAMEL}} Command

I'll help you with {{PROJECT_NAME}} functionality.

## What I'll do:

1. Analyze the current project context
2. Perform the requested {{PROJECT_NAME}} operation
3. Provide clear feedback on the results

Let me start by checking the project structure.

```bash
pwd
ls -la
```
"#;

const PLUGIN_INSTALL: &str = r#"#!/usr/bin/env python3
"""{{PROJECT_NAME}} plugin installer."""

import shutil
import sys
from pathlib import Path


def main():
    source = Path(__file__).parent.absolute() / "commands"
    dest = Path.home() / ".claude" / "commands"

    if not source.exists():
        print(f"[ERROR] Commands directory not found at {source}")
        sys.exit(1)

    dest.mkdir(parents=True, exist_ok=True)
    files = list(source.glob("*.md"))
    for file in files:
        shutil.copy2(file, dest / file.name)
        print(f"  + {file.name}")

    print("[SUCCESS] {{PROJECT_NAME}} plugin installed!")
    print("Use /{{COMMAND_NAME}} to run your command")


if __name__ == "__main__":
    main()
"#;

const PLUGIN_README: &str = r#"# {{PROJECT_NAME}}

A Claude Code CLI plugin.

## Installation

```bash
python install.py
```

## Usage

```
/{{COMMAND_NAME}}
```

To modify the command, edit `commands/{{COMMAND_NAME}}.md` and reinstall.
"#;
