//! Argument parsing. Mirrors the operation surface of `vx-engine`'s C8
//! facade one-to-one; this binary never implements business logic, only
//! argument shapes and output formatting (see [`super::commands`]).

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "vx", bin_name = "vx", version, about = "Notebook metadata engine command line", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the engine version.
    Version,

    /// Inspect resolved configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Operate on a notebook (content-on-disk, index-in-database).
    Notebook {
        #[command(subcommand)]
        action: NotebookCommands,
    },

    /// Manage a notebook's tag hierarchy.
    Tag {
        #[command(subcommand)]
        action: TagCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the resolved layered configuration (project file, global file,
    /// environment, compiled defaults) as JSON.
    Dump,
}

#[derive(Subcommand, Debug)]
pub enum NotebookCommands {
    /// Create a new notebook rooted at PATH.
    Create {
        /// Root folder of the new notebook.
        path: String,

        /// Notebook kind: "bundled" (default, fully managed) or "raw"
        /// (existing directory, metadata-only).
        #[arg(long, default_value = "bundled")]
        kind: String,

        /// Initial notebook-config properties as a JSON object, merged into
        /// the default config (e.g. `{"name":"My Notebook"}`).
        #[arg(long, default_value = "null")]
        properties: String,
    },

    /// Open an existing notebook rooted at PATH, recording it in the
    /// session list.
    Open {
        /// Root folder of the notebook.
        path: String,
    },

    /// Close a notebook, removing it from the session list.
    Close {
        /// Root folder of the notebook.
        path: String,
    },

    /// List notebooks recorded in the session list.
    List,

    /// Print a notebook's config as JSON.
    GetProps {
        /// Root folder of the notebook.
        path: String,
    },

    /// Merge a JSON patch into a notebook's config.
    SetProps {
        /// Root folder of the notebook.
        path: String,

        /// JSON object to merge into the notebook config.
        patch: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum TagCommands {
    /// Create a tag, auto-creating any missing ancestors (mkdir -p style).
    Create {
        /// Root folder of the notebook.
        #[arg(long)]
        root: String,

        /// Hierarchical tag name (e.g. "work/urgent").
        name: String,
    },

    /// Delete a tag and every descendant; untags every file that had it.
    Delete {
        #[arg(long)]
        root: String,

        name: String,
    },

    /// List every tag defined in the notebook.
    List {
        #[arg(long)]
        root: String,
    },

    /// Tag a file. The tag must already exist (see `tag create`).
    Add {
        #[arg(long)]
        root: String,

        /// Notebook-relative path of the file.
        file: String,

        /// Tag name.
        tag: String,
    },

    /// Remove a tag from a file.
    Remove {
        #[arg(long)]
        root: String,

        file: String,

        tag: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_notebook_create() {
        let cli = Cli::try_parse_from(["vx", "notebook", "create", "/tmp/nb1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Notebook {
                action: NotebookCommands::Create { .. }
            }
        ));
    }

    #[test]
    fn test_parses_notebook_create_with_kind() {
        let cli =
            Cli::try_parse_from(["vx", "notebook", "create", "/tmp/nb1", "--kind", "raw"]).unwrap();
        match cli.command {
            Commands::Notebook {
                action: NotebookCommands::Create { kind, .. },
            } => assert_eq!(kind, "raw"),
            _ => panic!("expected Create"),
        }
    }

    #[test]
    fn test_parses_tag_add() {
        let cli = Cli::try_parse_from([
            "vx", "tag", "add", "--root", "/tmp/nb1", "readme.md", "work",
        ])
        .unwrap();
        match cli.command {
            Commands::Tag {
                action: TagCommands::Add { root, file, tag },
            } => {
                assert_eq!(root, "/tmp/nb1");
                assert_eq!(file, "readme.md");
                assert_eq!(tag, "work");
            }
            _ => panic!("expected Add"),
        }
    }

    #[test]
    fn test_parses_config_dump() {
        let cli = Cli::try_parse_from(["vx", "config", "dump"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigCommands::Dump
            }
        ));
    }

    #[test]
    fn test_version_requires_no_args() {
        let cli = Cli::try_parse_from(["vx", "version"]).unwrap();
        assert!(matches!(cli.command, Commands::Version));
    }
}
