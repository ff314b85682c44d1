use crate::config::Config;
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use ripple_dom::{to_html, Document};
use ripple_reactive::{Object, Value};
use ripple_runtime::{Registry, Runtime, StaticComponent};
use serde_json::{Map, Value as Json};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Page markup containing `<template id>` definitions and their usages
    pub page: PathBuf,

    /// JSON file with initial data per component tag
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Override one data key, e.g. `--set todo-app.title='"Home"'`
    #[arg(long = "set", value_name = "TAG.KEY=JSON")]
    pub assignments: Vec<String>,

    /// Display frames to run after mounting (defaults to the config value)
    #[arg(short, long)]
    pub frames: Option<usize>,

    /// Only print the rendered HTML
    #[arg(long)]
    pub stdout_only: bool,
}

pub fn render(args: RenderArgs, config: &Config, cwd: &str) -> Result<()> {
    let page = PathBuf::from(cwd).join(&args.page);
    let source = fs::read_to_string(&page)
        .with_context(|| format!("Cannot read page {}", page.display()))?;

    let mut data = config.data.clone();
    if let Some(file) = &args.data {
        let path = PathBuf::from(cwd).join(file);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read data file {}", path.display()))?;
        let overrides: Map<String, Json> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid data file {}", path.display()))?;
        merge_data(&mut data, overrides);
    }
    for assignment in &args.assignments {
        apply_assignment(&mut data, assignment)?;
    }

    let frames = args.frames.unwrap_or(config.frames);
    if !args.stdout_only {
        eprintln!(
            "{} {}",
            "🎨 Rendering".bright_blue().bold(),
            args.page.display()
        );
    }

    let html = render_page(&source, &data, &config.globals, frames)?;
    println!("{}", html);

    if !args.stdout_only {
        eprintln!("  {} Rendered after {} frame(s)", "✓".green(), frames);
    }
    Ok(())
}

/// Register every template as a tag of the same name, upgrade the page and
/// serialize it once `frames` display frames have run
pub fn render_page(
    source: &str,
    data: &Map<String, Json>,
    globals: &Map<String, Json>,
    frames: usize,
) -> Result<String> {
    let mut runtime = Runtime::new(Document::new(), Registry::new());
    let fragment = runtime.load(source)?;

    let ids: Vec<String> = runtime
        .registry()
        .template_ids()
        .into_iter()
        .map(String::from)
        .collect();
    for id in &ids {
        let initial = to_object(data.get(id).cloned().unwrap_or(Json::Null));
        runtime.define(id, id, move || Box::new(StaticComponent::new(initial.clone())));
    }
    debug!(templates = ids.len(), "Registered page templates");

    runtime.set_globals(to_object(Json::Object(globals.clone())));
    let root = runtime.document().root();
    runtime.document_mut().move_children(fragment, root)?;

    let mounted = runtime.upgrade_all(root)?;
    info!(components = mounted.len(), frames, "Upgraded page");

    runtime.tick()?;
    runtime.run_frames(frames)?;
    Ok(to_html(runtime.document(), root))
}

fn to_object(json: Json) -> Object {
    match Value::from(json) {
        Value::Object(object) => object,
        _ => Object::new(),
    }
}

/// Shallow per-tag merge: keys in `overrides` replace keys in `data`
fn merge_data(data: &mut Map<String, Json>, overrides: Map<String, Json>) {
    for (tag, value) in overrides {
        match (data.get_mut(&tag), value) {
            (Some(Json::Object(existing)), Json::Object(incoming)) => existing.extend(incoming),
            (_, value) => {
                data.insert(tag, value);
            }
        }
    }
}

/// Apply `tag.key=JSON`. Values that aren't valid JSON are taken as strings.
fn apply_assignment(data: &mut Map<String, Json>, assignment: &str) -> Result<()> {
    let Some((target, raw)) = assignment.split_once('=') else {
        bail!("Expected TAG.KEY=VALUE, got `{}`", assignment);
    };
    let Some((tag, key)) = target.split_once('.') else {
        bail!("Expected TAG.KEY before `=`, got `{}`", target);
    };
    if tag.is_empty() || key.is_empty() {
        bail!("Empty tag or key in `{}`", assignment);
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Json::String(raw.to_string()));
    let entry = data
        .entry(tag.to_ascii_lowercase())
        .or_insert_with(|| Json::Object(Map::new()));
    if !entry.is_object() {
        *entry = Json::Object(Map::new());
    }
    if let Json::Object(map) = entry {
        map.insert(key.to_string(), value);
    }
    Ok(())
}
