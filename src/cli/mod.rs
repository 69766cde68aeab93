mod commands;
mod handlers;

pub use commands::{
    Cli, Commands, GroupAction, GroupCommand, NoteAction, NoteCommand, TaskAction, TaskCommand,
};
pub use handlers::{
    find_project_root, handle_group_add, handle_group_list, handle_init, handle_login,
    handle_login_google, handle_logout, handle_note_add, handle_note_delete, handle_note_edit,
    handle_note_list, handle_signup, handle_task_add, handle_task_toggle, handle_whoami,
};
