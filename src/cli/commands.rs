use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "stickyboard")]
#[command(version, about = "Grouped tasks and sticky notes")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new stickyboard project in the current directory
    Init,

    /// Create an account and sign in
    Signup {
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Sign in with email and password
    Login {
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Sign in with a Google account
    LoginGoogle {
        /// Email address Google vouches for
        email: String,

        /// Display name from the Google profile
        #[arg(long)]
        name: Option<String>,
    },

    /// Sign out
    Logout,

    /// Show the signed-in account
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage sticky notes
    Note(NoteCommand),

    /// Manage task groups
    Group(GroupCommand),

    /// Manage tasks inside groups
    Task(TaskCommand),
}

#[derive(Args, Debug)]
pub struct NoteCommand {
    #[command(subcommand)]
    pub action: NoteAction,
}

#[derive(Subcommand, Debug)]
pub enum NoteAction {
    /// Add a new note
    Add {
        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        content: Option<String>,

        /// Note color (yellow, blue, green, pink)
        #[arg(long)]
        color: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List notes, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a note's fields
    Edit {
        /// Note ID (or unique prefix)
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        content: Option<String>,

        /// Note color (yellow, blue, green, pink)
        #[arg(long)]
        color: Option<String>,
    },

    /// Delete a note
    Delete {
        /// Note ID (or unique prefix)
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct GroupCommand {
    #[command(subcommand)]
    pub action: GroupAction,
}

#[derive(Subcommand, Debug)]
pub enum GroupAction {
    /// Add an empty task group
    Add {
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List groups and their tasks
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct TaskCommand {
    #[command(subcommand)]
    pub action: TaskAction,
}

#[derive(Subcommand, Debug)]
pub enum TaskAction {
    /// Append a task to a group
    Add {
        /// Group ID (or unique prefix)
        group: String,

        title: String,

        #[arg(long)]
        description: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mark a task done, or not done again
    Toggle {
        /// Group ID (or unique prefix)
        group: String,

        /// Task ID (or unique prefix)
        task: String,
    },
}
