//! Command-line definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "glotsync")]
#[command(version)]
#[command(about = "Keep translation keys in sync across every project language", long_about = None)]
pub struct Cli {
    /// Config file (defaults to <config dir>/glotsync/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Act on behalf of this organization; project commands outside it are refused
    #[arg(long, global = true)]
    pub org: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a config file with every default spelled out
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Create or update a workspace, a project and its languages and namespaces
    Setup(SetupArgs),

    /// Create a key from its primary-language text and translate it
    CreateKey {
        project: String,
        /// Namespace id or name
        namespace: String,
        /// Dotted key path, e.g. `home.title`
        key: String,
        text: String,
    },

    /// Set one language's value of a key
    Set {
        key_id: String,
        /// Language id or code
        language: String,
        text: String,
    },

    /// Remove one non-primary value of a key
    Clear { key_id: String, language: String },

    /// Delete keys
    Delete {
        #[arg(required = true)]
        key_ids: Vec<String>,
    },

    /// Re-translate keys from the primary language
    Translate {
        project: String,
        /// Keys to translate; every live key of the project when omitted
        #[arg(long = "key")]
        keys: Vec<String>,
        /// Target languages (id or code); every language when omitted
        #[arg(long = "language")]
        languages: Vec<String>,
    },

    /// Show per-language state of a key
    Status { key_id: String },

    /// List live keys of a project
    List {
        project: String,
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Search key names and values
    Search {
        project: String,
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },

    /// Show the live key count of a scope
    Usage {
        #[arg(value_enum)]
        scope: ScopeKind,
        id: String,
    },

    /// Export one namespace and language as a nested JSON file
    Export {
        project: String,
        namespace: String,
        language: String,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Bring the store in line with an edited locale file
    Import {
        project: String,
        namespace: String,
        language: String,
        file: PathBuf,
    },

    /// Print the change patch between two locale files
    Diff { old: PathBuf, new: PathBuf },

    /// Apply a change patch to a locale file and print the result
    Apply { base: PathBuf, patch: PathBuf },

    /// Manage glossary rules
    #[command(subcommand)]
    Glossary(GlossaryCommand),
}

#[derive(Args, Debug)]
pub struct SetupArgs {
    #[arg(long)]
    pub workspace: String,
    #[arg(long)]
    pub organization: String,
    /// Maximum number of live keys in the workspace
    #[arg(long)]
    pub key_limit: Option<u64>,
    #[arg(long)]
    pub project: String,
    #[arg(long)]
    pub project_name: Option<String>,
    /// Primary language code
    #[arg(long)]
    pub primary: String,
    /// Target language as `code` or `code=Display name`; repeatable
    #[arg(long = "language")]
    pub languages: Vec<String>,
    /// Namespace name; repeatable
    #[arg(long = "namespace")]
    pub namespaces: Vec<String>,
    /// Project-wide style instruction; repeatable
    #[arg(long = "style-rule")]
    pub style_rules: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum GlossaryCommand {
    /// Add or update a rule
    Add(GlossaryAddArgs),
    /// List every rule of a project
    List { project: String },
    /// Show the rules and prompt lines that apply to one language
    Resolve { project: String, language: String },
    /// Remove a rule
    Remove { rule_id: String },
}

#[derive(Args, Debug)]
pub struct GlossaryAddArgs {
    pub project: String,
    pub term: String,
    /// Existing rule id to overwrite
    #[arg(long)]
    pub id: Option<String>,
    /// Limit the rule to one language (id or code)
    #[arg(long)]
    pub language: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub non_translatable: bool,
    #[arg(long)]
    pub forbidden: bool,
    #[arg(long)]
    pub case_sensitive: bool,
    #[arg(long)]
    pub translation: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Workspace,
    Project,
    Namespace,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn translate_collects_repeated_flags() {
        let cli = Cli::try_parse_from([
            "glotsync",
            "translate",
            "app",
            "--key",
            "k1",
            "--key",
            "k2",
            "--language",
            "de",
        ])
        .unwrap();
        match cli.command {
            Command::Translate {
                project,
                keys,
                languages,
            } => {
                assert_eq!(project, "app");
                assert_eq!(keys, vec!["k1", "k2"]);
                assert_eq!(languages, vec!["de"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["glotsync", "status", "k1", "-v", "--config", "/tmp/c.toml"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn delete_requires_ids() {
        assert!(Cli::try_parse_from(["glotsync", "delete"]).is_err());
    }
}
