//! CLI definitions.
//!
//! The command surface is a thin collaborator over the store: it
//! resolves a store directory, parses flags, and formats results as
//! JSON or tables. All semantics live in [`crate::store`].

use clap::{ArgAction, Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

pub mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "tissue",
    version,
    about = "Git-native issue tracker: a JSONL log with a derived SQLite cache"
)]
pub struct Cli {
    /// Store directory (default: nearest .tissue, then $TISSUE_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Emit JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a store in ./.tissue
    Init(InitArgs),
    /// Create an issue
    Create(CreateArgs),
    /// Update fields of an issue
    Update(UpdateArgs),
    /// Shorthand for `update <id> --status <status>`
    Status(StatusArgs),
    /// Show an issue with comments and dependencies
    Show(ShowArgs),
    /// Add a comment to an issue
    Comment(CommentArgs),
    /// List an issue's comments
    Comments(CommentsArgs),
    /// Manage dependencies
    Dep {
        #[command(subcommand)]
        command: DepCommands,
    },
    /// List an issue's active dependencies
    Deps(DepsArgs),
    /// List issues
    List(ListArgs),
    /// Full-text search over titles, bodies, and comments
    Search(SearchArgs),
    /// Open issues with no transitive active blocker
    Ready(ReadyArgs),
    /// Remove terminal issues from the log
    Clean(CleanArgs),
    /// Splice another store's log into this one
    Migrate(MigrateArgs),
    /// Rebuild the cache from the whole log
    Reimport,
    /// Generate shell completions
    Completions(CompletionsArgs),
    /// Print the version
    Version,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Issue id prefix (default: the project directory name)
    #[arg(long)]
    pub prefix: Option<String>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Issue title
    pub title: String,

    /// Issue body
    #[arg(short, long, default_value = "")]
    pub body: String,

    /// Priority 1 (highest) to 5
    #[arg(short, long)]
    pub priority: Option<String>,

    /// Tag (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    /// Issue id (or unique prefix / hash suffix)
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub body: Option<String>,

    /// One of: open, in_progress, paused, duplicate, closed
    #[arg(long)]
    pub status: Option<String>,

    /// Priority 1 (highest) to 5
    #[arg(long)]
    pub priority: Option<String>,

    /// Tag to add (repeatable)
    #[arg(long = "add-tag")]
    pub add_tags: Vec<String>,

    /// Tag to remove (repeatable; removals apply after additions)
    #[arg(long = "remove-tag")]
    pub remove_tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    pub id: String,
    /// One of: open, in_progress, paused, duplicate, closed
    pub status: String,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct CommentArgs {
    pub id: String,
    pub body: String,
}

#[derive(Args, Debug)]
pub struct CommentsArgs {
    pub id: String,
}

#[derive(Subcommand, Debug)]
pub enum DepCommands {
    /// Record that <ID> depends on <TARGET> (blocks: target blocks
    /// id; parent: target is id's parent; relates: symmetric)
    Add {
        id: String,
        /// One of: blocks, parent, relates
        kind: String,
        target: String,
    },
    /// Tombstone a dependency recorded with the same arguments
    Rm {
        id: String,
        kind: String,
        target: String,
    },
}

#[derive(Args, Debug)]
pub struct DepsArgs {
    pub id: String,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Exact status filter (accepts any value, including ones only
    /// present in imported logs)
    #[arg(long)]
    pub status: Option<String>,

    /// Exact tag filter
    #[arg(long)]
    pub tag: Option<String>,

    /// Full-text query
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub query: String,

    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ReadyArgs {
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Only issues untouched for at least this many days
    #[arg(long, value_name = "DAYS")]
    pub older_than: Option<i64>,

    /// Actually rewrite the log (default is a dry run)
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Source store directory (a .tissue directory, or a project
    /// directory containing one)
    pub src: PathBuf,

    /// Actually append (default is a dry run)
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}
