use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::auth::{
    clear_stored_identity, load_stored_identity, store_identity, FederatedAssertion,
    FederatedProvider, LocalAuth, Session,
};
use crate::config::{Config, PROJECT_DIR};
use crate::entity::{NewTask, Note, NoteColor, NoteDraft, TaskGroup};
use crate::error::{Result, StickyError};
use crate::storage::LoroDocumentStore;
use crate::sync::{NoteEditor, NoteWall, TaskBoard};

/// Find the project root by looking for .stickyboard/ in the current
/// directory and its parents.
pub fn find_project_root() -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut current = cwd.as_path();
    loop {
        if current.join(PROJECT_DIR).exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return cwd,
        }
    }
}

struct Workspace {
    root: PathBuf,
    config: Config,
    store: Arc<LoroDocumentStore>,
}

fn open_workspace() -> Result<Workspace> {
    let root = find_project_root();
    let store = LoroDocumentStore::open(&root)?;
    let config = Config::load(&root)?;
    Ok(Workspace {
        root,
        config,
        store: Arc::new(store),
    })
}

fn ensure_initialized(root: &Path) -> Result<()> {
    if root.join(PROJECT_DIR).exists() {
        Ok(())
    } else {
        Err(StickyError::NotInitialized)
    }
}

/// Restore the signed-in session; note and task commands need one.
fn require_session(root: &Path) -> Result<Session<LocalAuth>> {
    let identity = load_stored_identity(root)?.ok_or(StickyError::NotSignedIn)?;
    let auth = LocalAuth::open(root)?;
    let identity = auth.resume(identity)?;
    debug!(uid = %identity.uid, "session resumed");
    Ok(Session::resume(Arc::new(auth), identity))
}

fn short(id: &str) -> String {
    id.chars().take(7).collect()
}

/// Match a full id or a unique prefix of one.
fn resolve_id<'a>(candidates: impl IntoIterator<Item = &'a str>, query: &str) -> Result<Option<String>> {
    let mut matches = Vec::new();
    for candidate in candidates {
        if candidate == query {
            return Ok(Some(candidate.to_string()));
        }
        if candidate.starts_with(query) {
            matches.push(candidate);
        }
    }
    match matches.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(only.to_string())),
        _ => Err(StickyError::InvalidInput(format!(
            "'{}' matches {} ids, use a longer prefix",
            query,
            matches.len()
        ))),
    }
}

fn parse_color(color: Option<String>, default: NoteColor) -> Result<NoteColor> {
    match color {
        Some(c) => c.parse().map_err(StickyError::InvalidInput),
        None => Ok(default),
    }
}

fn print_note(n: &Note) {
    let id = n.id.as_deref().map(short).unwrap_or_else(|| "unsaved".to_string());
    println!(
        "  ({}) [{}] {}  {}",
        id,
        n.color,
        n.title,
        n.created_at.format("%Y-%m-%d %H:%M")
    );
    for line in n.content.lines() {
        println!("      {}", line);
    }
}

fn print_group(g: &TaskGroup) {
    println!("{} ({})", g.name, short(&g.id));
    if g.tasks.is_empty() {
        println!("  (no tasks)");
    }
    for t in &g.tasks {
        let mark = if t.completed { "x" } else { " " };
        let due_str = t
            .due_date
            .map(|d| format!(" due:{}", d.format("%Y-%m-%d")))
            .unwrap_or_default();
        println!("  [{}] {} ({}){}", mark, t.title, short(&t.id), due_str);
        if let Some(ref description) = t.description {
            println!("      {}", description);
        }
    }
}

pub fn handle_init() -> Result<()> {
    let root = env::current_dir()?;

    let _store = LoroDocumentStore::init(&root)?;
    Config::default().save(&root)?;

    println!("Initialized stickyboard project in {}", root.display());
    Ok(())
}

pub async fn handle_signup(email: String, password: String) -> Result<()> {
    let root = find_project_root();
    ensure_initialized(&root)?;

    let auth = Arc::new(LocalAuth::open(&root)?);
    let session = Session::sign_up(auth, &email, &password).await?;
    store_identity(&root, session.identity())?;

    println!("Signed up and signed in as {}", session.identity().email);
    Ok(())
}

pub async fn handle_login(email: String, password: String) -> Result<()> {
    let root = find_project_root();
    ensure_initialized(&root)?;

    let auth = Arc::new(LocalAuth::open(&root)?);
    let session = Session::sign_in(auth, &email, &password).await?;
    store_identity(&root, session.identity())?;

    println!("Signed in as {}", session.identity().email);
    Ok(())
}

pub async fn handle_login_google(email: String, name: Option<String>) -> Result<()> {
    let root = find_project_root();
    ensure_initialized(&root)?;

    let auth = LocalAuth::open(&root)?;
    // Linking Google to a password account needs its owner signed in.
    if let Some(identity) = load_stored_identity(&root)? {
        if let Err(e) = auth.resume(identity) {
            debug!(error = %e, "stored session no longer valid");
        }
    }
    let auth = Arc::new(auth);
    let assertion = FederatedAssertion {
        subject: email.trim().to_lowercase(),
        email,
        display_name: name,
    };
    let session = Session::sign_in_with_provider(auth, FederatedProvider::Google, assertion).await?;
    store_identity(&root, session.identity())?;

    println!("Signed in with google as {}", session.identity().email);
    Ok(())
}

pub async fn handle_logout() -> Result<()> {
    let root = find_project_root();
    ensure_initialized(&root)?;

    let Some(identity) = load_stored_identity(&root)? else {
        println!("Not signed in.");
        return Ok(());
    };

    let auth = LocalAuth::open(&root)?;
    if let Ok(identity) = auth.resume(identity) {
        Session::resume(Arc::new(auth), identity).end().await?;
    }
    clear_stored_identity(&root)?;

    println!("Signed out.");
    Ok(())
}

pub fn handle_whoami(json: bool) -> Result<()> {
    let root = find_project_root();
    ensure_initialized(&root)?;

    let identity = load_stored_identity(&root)?.ok_or(StickyError::NotSignedIn)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&identity)?);
    } else {
        match identity.display_name {
            Some(ref name) => println!("{} <{}>", name, identity.email),
            None => println!("{}", identity.email),
        }
    }
    Ok(())
}

pub async fn handle_note_add(
    title: Option<String>,
    content: Option<String>,
    color: Option<String>,
    json: bool,
) -> Result<()> {
    let ws = open_workspace()?;
    let _session = require_session(&ws.root)?;

    let defaults = NoteDraft::default();
    let draft = NoteDraft {
        title: title.unwrap_or(defaults.title),
        content: content.unwrap_or(defaults.content),
        color: parse_color(color, ws.config.default_color)?,
    };

    let mut wall = NoteWall::new(ws.store.clone(), ws.config.notes_collection.as_str());
    let id = wall.create_note(draft).await?;
    wall.refresh().await?;

    let note = wall
        .note(&id)
        .ok_or_else(|| StickyError::NoteNotFound(id.clone()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(note)?);
    } else {
        println!("Added note ({}) {}", short(&id), note.title);
    }
    Ok(())
}

pub async fn handle_note_list(json: bool) -> Result<()> {
    let ws = open_workspace()?;
    let _session = require_session(&ws.root)?;

    let mut wall = NoteWall::new(ws.store.clone(), ws.config.notes_collection.as_str());
    wall.refresh().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(wall.notes())?);
    } else if wall.notes().is_empty() {
        println!("No notes yet. Add one!");
    } else {
        println!("Notes:\n");
        for n in wall.notes() {
            print_note(n);
        }
    }
    Ok(())
}

pub async fn handle_note_edit(
    id: String,
    title: Option<String>,
    content: Option<String>,
    color: Option<String>,
) -> Result<()> {
    let ws = open_workspace()?;
    let _session = require_session(&ws.root)?;

    let mut wall = NoteWall::new(ws.store.clone(), ws.config.notes_collection.as_str());
    wall.refresh().await?;

    let resolved = resolve_id(wall.notes().iter().filter_map(|n| n.id.as_deref()), &id)?
        .ok_or_else(|| StickyError::NoteNotFound(id.clone()))?;
    let note = wall
        .note(&resolved)
        .cloned()
        .ok_or_else(|| StickyError::NoteNotFound(id.clone()))?;

    if title.is_none() && content.is_none() && color.is_none() {
        println!("Nothing to change. Pass --title, --content or --color.");
        return Ok(());
    }

    let mut editor = NoteEditor::new(note);
    if let Some(title) = title {
        editor.set_title(title);
    }
    if let Some(content) = content {
        editor.set_content(content);
    }
    if let Some(color) = color {
        editor.set_color(parse_color(Some(color), NoteColor::default())?);
    }

    wall.commit_editor(&mut editor).await?;
    println!("Updated note ({}) {}", short(&resolved), editor.note().title);
    Ok(())
}

pub async fn handle_note_delete(id: String, force: bool) -> Result<()> {
    let ws = open_workspace()?;
    let _session = require_session(&ws.root)?;

    let mut wall = NoteWall::new(ws.store.clone(), ws.config.notes_collection.as_str());
    wall.refresh().await?;

    let resolved = resolve_id(wall.notes().iter().filter_map(|n| n.id.as_deref()), &id)?
        .ok_or_else(|| StickyError::NoteNotFound(id.clone()))?;
    let title = wall
        .note(&resolved)
        .map(|n| n.title.clone())
        .unwrap_or_default();

    if !force {
        eprintln!("Delete note ({}) - {}? [y/N] ", short(&resolved), title);

        if atty::is(atty::Stream::Stdin) {
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled.");
                return Ok(());
            }
        } else {
            return Err(StickyError::InvalidInput(
                "Use --force to delete in non-interactive mode".to_string(),
            ));
        }
    }

    wall.delete_note(&resolved).await?;
    println!("Deleted note ({}) {}", short(&resolved), title);
    Ok(())
}

pub async fn handle_group_add(name: String, json: bool) -> Result<()> {
    let ws = open_workspace()?;
    let _session = require_session(&ws.root)?;

    let mut board = TaskBoard::new(ws.store.clone(), ws.config.groups_collection.as_str());
    let id = board.create_group(&name).await?;

    if json {
        if let Some(group) = board.group(&id) {
            println!("{}", serde_json::to_string_pretty(group)?);
        }
    } else {
        println!("Added group ({}) {}", short(&id), name.trim());
    }
    Ok(())
}

pub async fn handle_group_list(json: bool) -> Result<()> {
    let ws = open_workspace()?;
    let _session = require_session(&ws.root)?;

    let mut board = TaskBoard::new(ws.store.clone(), ws.config.groups_collection.as_str());
    board.refresh().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(board.groups())?);
    } else if board.groups().is_empty() {
        println!("No task groups found.");
    } else {
        let today = chrono::Local::now().format("%a, %d %b");
        println!("Today: {}\n", today);
        for g in board.groups() {
            print_group(g);
        }
    }
    Ok(())
}

fn resolve_group(board: &TaskBoard<LoroDocumentStore>, query: &str) -> Result<String> {
    resolve_id(board.groups().iter().map(|g| g.id.as_str()), query)?
        .ok_or_else(|| StickyError::GroupNotFound(query.to_string()))
}

pub async fn handle_task_add(
    group: String,
    title: String,
    description: Option<String>,
    due: Option<String>,
    json: bool,
) -> Result<()> {
    let ws = open_workspace()?;
    let _session = require_session(&ws.root)?;

    let due_date = match due.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => {
            let date = NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|_| {
                StickyError::InvalidInput(format!("Invalid due date '{}', expected YYYY-MM-DD", d))
            })?;
            date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
        }
        None => None,
    };

    let mut board = TaskBoard::new(ws.store.clone(), ws.config.groups_collection.as_str());
    board.refresh().await?;
    let group_id = resolve_group(&board, &group)?;

    let task = board
        .add_task(
            &group_id,
            NewTask {
                title,
                description,
                due_date,
            },
        )
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else {
        println!("Added task ({}) {}", short(&task.id), task.title);
    }
    Ok(())
}

pub async fn handle_task_toggle(group: String, task: String) -> Result<()> {
    let ws = open_workspace()?;
    let _session = require_session(&ws.root)?;

    let mut board = TaskBoard::new(ws.store.clone(), ws.config.groups_collection.as_str());
    board.refresh().await?;
    let group_id = resolve_group(&board, &group)?;

    let task_ids: Vec<String> = board
        .group(&group_id)
        .map(|g| g.tasks.iter().map(|t| t.id.clone()).collect())
        .unwrap_or_default();
    let task_id = resolve_id(task_ids.iter().map(String::as_str), &task)?.ok_or_else(|| {
        StickyError::TaskNotFound {
            group_id: group_id.clone(),
            task_id: task.clone(),
        }
    })?;

    board.toggle_task(&group_id, &task_id).await?;

    if let Some(t) = board.group(&group_id).and_then(|g| g.find_task(&task_id)) {
        let state = if t.completed { "done" } else { "not done" };
        println!("Marked ({}) {} as {}", short(&t.id), t.title, state);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_id_exact_and_prefix() {
        let ids = ["abc123", "abd456", "x"];
        assert_eq!(resolve_id(ids, "abc123").unwrap(), Some("abc123".to_string()));
        assert_eq!(resolve_id(ids, "abd").unwrap(), Some("abd456".to_string()));
        assert_eq!(resolve_id(ids, "zzz").unwrap(), None);
        assert!(matches!(resolve_id(ids, "ab"), Err(StickyError::InvalidInput(_))));
    }

    #[test]
    fn test_resolve_id_exact_beats_prefix() {
        let ids = ["a", "ab"];
        assert_eq!(resolve_id(ids, "a").unwrap(), Some("a".to_string()));
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short("0123456789"), "0123456");
        assert_eq!(short("t1"), "t1");
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color(None, NoteColor::Green).unwrap(), NoteColor::Green);
        assert_eq!(parse_color(Some("pink".to_string()), NoteColor::Green).unwrap(), NoteColor::Pink);
        assert!(parse_color(Some("plaid".to_string()), NoteColor::Green).is_err());
    }
}
