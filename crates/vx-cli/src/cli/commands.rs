//! Dispatch: parses argv, calls into [`vx_engine::api::Engine`], and prints
//! the result. This is the only place in the binary that knows about
//! terminal output, process exit codes, or argument parsing — everything
//! past this module is plain library calls.

use std::sync::Arc;

use console::style;
use serde_json::Value;

use vx_engine::api::Engine;
use vx_engine::config::{AppConfig, DefaultPaths, FileSessionSink, PathsProvider, SessionSink};
use vx_engine::error::{Result, VxError};
use vx_engine::model::NotebookKind;

use super::setup::{Cli, Commands, ConfigCommands, NotebookCommands, TagCommands};

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Version => {
            println!("vx {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Config { action } => match action {
            ConfigCommands::Dump => handle_config_dump(),
        },
        Commands::Notebook { action } => handle_notebook(action),
        Commands::Tag { action } => handle_tag(action),
    }
}

/// `VX_DATA_DIR` lets tests (and anyone else) point the CLI at a scratch
/// directory instead of the real OS app-data dir, without touching the
/// engine's own test-mode switch.
fn make_paths() -> DefaultPaths {
    match std::env::var_os("VX_DATA_DIR") {
        Some(dir) => DefaultPaths::with_root(dir),
        None => DefaultPaths::new(),
    }
}

fn make_engine() -> Engine {
    let paths: Arc<dyn PathsProvider> = Arc::new(make_paths());
    Engine::with_collaborators(paths, None)
}

fn parse_kind(kind: &str) -> Result<NotebookKind> {
    match kind {
        "bundled" => Ok(NotebookKind::Bundled),
        "raw" => Ok(NotebookKind::Raw),
        other => Err(VxError::InvalidParam(format!(
            "unknown notebook kind \"{other}\" (expected \"bundled\" or \"raw\")"
        ))),
    }
}

fn parse_json(raw: &str, what: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| VxError::InvalidParam(format!("invalid {what} JSON: {e}")))
}

fn handle_config_dump() -> Result<()> {
    let paths = make_paths();
    let config = AppConfig::load(&paths)?;
    println!("{}", serde_json::to_string_pretty(&config).map_err(VxError::serialize)?);
    Ok(())
}

fn handle_notebook(action: NotebookCommands) -> Result<()> {
    match action {
        NotebookCommands::Create { path, kind, properties } => {
            let kind = parse_kind(&kind)?;
            let properties = parse_json(&properties, "properties")?;
            let mut engine = make_engine();
            let handle = engine.create_notebook(&path, kind, properties)?;
            let config = engine.get_notebook_config(handle)?;
            println!("created notebook {} at {}", style(&config.id).green().bold(), path);
        }
        NotebookCommands::Open { path } => {
            let mut engine = make_engine();
            let handle = engine.open_notebook(&path)?;
            let config = engine.get_notebook_config(handle)?;
            println!("opened notebook {} at {}", style(&config.id).green().bold(), path);
        }
        NotebookCommands::Close { path } => {
            let mut engine = make_engine();
            let handle = engine.open_notebook(&path)?;
            engine.close_notebook(handle)?;
            println!("closed notebook at {}", path);
        }
        NotebookCommands::List => {
            let paths: Arc<dyn PathsProvider> = Arc::new(make_paths());
            let sink = FileSessionSink::new(paths.as_ref());
            let sessions = sink.list()?;
            if sessions.is_empty() {
                println!("no open notebooks");
            }
            for (id, root) in sessions {
                println!("{}  {}", style(&id).green(), root);
            }
        }
        NotebookCommands::GetProps { path } => {
            let mut engine = make_engine();
            let handle = engine.open_notebook(&path)?;
            let config = engine.get_notebook_config(handle)?;
            println!("{}", serde_json::to_string_pretty(&config).map_err(VxError::serialize)?);
            engine.close_notebook(handle)?;
        }
        NotebookCommands::SetProps { path, patch } => {
            let patch = parse_json(&patch, "patch")?;
            let mut engine = make_engine();
            let handle = engine.open_notebook(&path)?;
            engine.update_notebook_config(handle, patch)?;
            let config = engine.get_notebook_config(handle)?;
            println!("{}", serde_json::to_string_pretty(&config).map_err(VxError::serialize)?);
            engine.close_notebook(handle)?;
        }
    }
    Ok(())
}

fn handle_tag(action: TagCommands) -> Result<()> {
    match action {
        TagCommands::Create { root, name } => {
            let mut engine = make_engine();
            let handle = engine.open_notebook(&root)?;
            engine.tag_create_path(handle, &name)?;
            println!("created tag {}", style(&name).green());
            engine.close_notebook(handle)?;
        }
        TagCommands::Delete { root, name } => {
            let mut engine = make_engine();
            let handle = engine.open_notebook(&root)?;
            engine.tag_delete(handle, &name)?;
            println!("deleted tag {}", style(&name).red());
            engine.close_notebook(handle)?;
        }
        TagCommands::List { root } => {
            let mut engine = make_engine();
            let handle = engine.open_notebook(&root)?;
            let tags = engine.tag_list(handle)?;
            if tags.is_empty() {
                println!("no tags defined");
            }
            for tag in tags {
                println!("{}", tag.name);
            }
            engine.close_notebook(handle)?;
        }
        TagCommands::Add { root, file, tag } => {
            let mut engine = make_engine();
            let handle = engine.open_notebook(&root)?;
            engine.file_tag(handle, &file, &tag)?;
            println!("tagged {} with {}", file, style(&tag).green());
            engine.close_notebook(handle)?;
        }
        TagCommands::Remove { root, file, tag } => {
            let mut engine = make_engine();
            let handle = engine.open_notebook(&root)?;
            engine.file_untag(handle, &file, &tag)?;
            println!("removed {} from {}", style(&tag).red(), file);
            engine.close_notebook(handle)?;
        }
    }
    Ok(())
}
