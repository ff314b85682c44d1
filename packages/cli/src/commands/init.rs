use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::json;
use std::fs;
use std::path::PathBuf;

const EXAMPLE_PAGE: &str = r#"<template id="todo-list">
  <style>li.done { text-decoration: line-through; }</style>
  <h1>@title</h1>
  <ul>
    <li :for="todo of todos" :key="todo.id" :class="todo.state">@todo.text</li>
  </ul>
  <p :if="empty">Nothing to do</p>
</template>

<todo-list :owner="user"></todo-list>
"#;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Name of the example page
    #[arg(short, long, default_value = "index.html")]
    pub page: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Ripple project...".bright_blue().bold());

    let page_path = PathBuf::from(cwd).join(&args.page);
    if !page_path.exists() {
        fs::write(&page_path, EXAMPLE_PAGE)?;
        println!("  {} Created {}", "✓".green(), args.page);
    }

    let config = Config {
        globals: serde_json::from_value(json!({ "user": "me" }))?,
        data: serde_json::from_value(json!({
            "todo-list": {
                "title": "Todos",
                "todos": [
                    { "id": 1, "text": "Write a template", "state": "done" },
                    { "id": 2, "text": "Render it", "state": "open" }
                ],
                "empty": false
            }
        }))?,
        ..Config::default()
    };

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {}", args.page);
    println!("  2. Run: ripple render {}", args.page);

    Ok(())
}
