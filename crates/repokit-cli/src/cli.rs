use clap::{ArgAction, Parser, Subcommand, ValueHint};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List declared models
    #[clap(name = "models")]
    Models,

    /// List entities of a model, one page at a time
    #[command(arg_required_else_help = true)]
    #[clap(name = "list", visible_alias = "ls")]
    List {
        /// Model name
        #[arg(required = true)]
        model: String,

        /// Filter as key=value, passed to the model's filters
        #[arg(required = false, short, long = "filter")]
        filters: Vec<String>,

        /// Comma separated order columns
        #[arg(required = false, short = 'o', long = "order")]
        order: Option<String>,

        /// Order direction (asc or desc)
        #[arg(required = false, short = 'd', long = "dir")]
        dir: Option<String>,

        /// Page size
        #[arg(required = false, short, long)]
        limit: Option<u64>,

        /// Page number
        #[arg(required = false, short, long)]
        page: Option<u64>,

        /// Relations to load
        #[arg(required = false, short, long = "with")]
        with: Vec<String>,

        /// Return every match instead of a page
        #[arg(required = false, long)]
        all: bool,
    },

    /// Find an entity by key or attribute
    #[command(arg_required_else_help = true)]
    #[clap(name = "find")]
    Find {
        #[arg(required = true)]
        model: String,

        #[arg(required = true)]
        id: String,

        /// Attribute to match instead of the key
        #[arg(required = false, long)]
        by: Option<String>,
    },

    /// Create an entity
    #[command(arg_required_else_help = true)]
    #[clap(name = "create", visible_alias = "add")]
    Create {
        #[arg(required = true)]
        model: String,

        /// Attribute as key=value
        #[arg(required = true, short, long = "set")]
        set: Vec<String>,
    },

    /// Update entities matching a key or attribute
    #[command(arg_required_else_help = true)]
    #[clap(name = "update")]
    Update {
        #[arg(required = true)]
        model: String,

        #[arg(required = true)]
        id: String,

        /// Attribute as key=value
        #[arg(required = true, short, long = "set")]
        set: Vec<String>,

        /// Attribute to match instead of the key
        #[arg(required = false, long)]
        by: Option<String>,

        /// Update with a single statement, skipping observers
        #[arg(required = false, long)]
        bulk: bool,
    },

    /// Delete entities by key
    #[command(arg_required_else_help = true)]
    #[clap(name = "delete", visible_alias = "rm")]
    Delete {
        #[arg(required = true)]
        model: String,

        #[arg(required = true)]
        ids: Vec<String>,
    },
}
