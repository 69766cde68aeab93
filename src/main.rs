use clap::Parser;
use stickyboard::cli::{
    find_project_root, handle_group_add, handle_group_list, handle_init, handle_login,
    handle_login_google, handle_logout, handle_note_add, handle_note_delete, handle_note_edit,
    handle_note_list, handle_signup, handle_task_add, handle_task_toggle, handle_whoami, Cli,
    Commands, GroupAction, NoteAction, TaskAction,
};
use stickyboard::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = Config::load(&find_project_root())
        .map(|c| c.log_filter)
        .unwrap_or_else(|_| Config::default().log_filter);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Init => handle_init(),
        Commands::Signup { email, password } => handle_signup(email, password).await,
        Commands::Login { email, password } => handle_login(email, password).await,
        Commands::LoginGoogle { email, name } => handle_login_google(email, name).await,
        Commands::Logout => handle_logout().await,
        Commands::Whoami { json } => handle_whoami(json),
        Commands::Note(note) => match note.action {
            NoteAction::Add {
                title,
                content,
                color,
                json,
            } => handle_note_add(title, content, color, json).await,
            NoteAction::List { json } => handle_note_list(json).await,
            NoteAction::Edit {
                id,
                title,
                content,
                color,
            } => handle_note_edit(id, title, content, color).await,
            NoteAction::Delete { id, force } => handle_note_delete(id, force).await,
        },
        Commands::Group(group) => match group.action {
            GroupAction::Add { name, json } => handle_group_add(name, json).await,
            GroupAction::List { json } => handle_group_list(json).await,
        },
        Commands::Task(task) => match task.action {
            TaskAction::Add {
                group,
                title,
                description,
                due,
                json,
            } => handle_task_add(group, title, description, due, json).await,
            TaskAction::Toggle { group, task } => handle_task_toggle(group, task).await,
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
