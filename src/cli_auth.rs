use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};

mod cli_style;

use cli_style::{
    get_prompt, get_styles, print_command_echo, print_empty_list, print_error, print_goodbye,
    print_help, print_key_value, print_list_item, print_section_footer, print_section_header,
    print_success, print_welcome, CommandHelp, TableBuilder,
};
use shul_board_server::user::{SqliteUserStore, UserManager, UserRole};

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

const USER_DB_FILE_NAME: &str = "user.db";

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Resolves the user database path. A directory means the user database
/// inside the board server's db dir.
fn resolve_db_path(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p,
        None => std::env::current_dir()?,
    };
    if path.is_dir() {
        return Ok(path.join(USER_DB_FILE_NAME));
    }
    if path.extension().is_none() {
        bail!(
            "{} is neither a directory nor a database file.",
            path.display()
        );
    }
    Ok(path)
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    /// The user database file, or the board server's db dir. Defaults to the
    /// current directory.
    #[clap(value_parser = parse_path)]
    pub path: Option<PathBuf>,
}

#[derive(Parser)]
#[command(styles=get_styles(), name = "", disable_help_subcommand = true)]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Creates a user with the given handle.
    AddUser {
        user_handle: String,
        /// Gabbai or Viewer.
        #[clap(default_value = "gabbai")]
        role: String,
    },

    /// Creates a password for the given user.
    /// Fails if the user already has a password set.
    AddLogin {
        user_handle: String,
        password: String,
    },

    /// Changes the password of a user, fails if no password was set.
    UpdateLogin {
        user_handle: String,
        password: String,
    },

    /// Deletes the password of a given user.
    DeleteLogin { user_handle: String },

    /// Shows role, permissions and tokens of a given user.
    Show { user_handle: String },

    /// Verifies the password of a given user without issuing a token.
    CheckPassword {
        user_handle: String,
        password: String,
    },

    /// Changes the role of a user.
    SetRole { user_handle: String, role: String },

    /// Lists all users with their roles.
    UserHandles,

    /// Shows the path of the current user db.
    Where,

    /// Shows this help.
    Help,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

fn commands_help() -> Vec<CommandHelp> {
    vec![
        CommandHelp {
            name: "add-user",
            args: "<handle> [role]",
            description: "Create a user (role defaults to gabbai)",
        },
        CommandHelp {
            name: "user-handles",
            args: "",
            description: "List all users",
        },
        CommandHelp {
            name: "show",
            args: "<handle>",
            description: "Show role, permissions and tokens",
        },
        CommandHelp {
            name: "set-role",
            args: "<handle> <role>",
            description: "Change a user's role",
        },
        CommandHelp {
            name: "add-login",
            args: "<handle> <password>",
            description: "Set a password",
        },
        CommandHelp {
            name: "update-login",
            args: "<handle> <password>",
            description: "Change a password",
        },
        CommandHelp {
            name: "delete-login",
            args: "<handle>",
            description: "Remove a password",
        },
        CommandHelp {
            name: "check-password",
            args: "<handle> <password>",
            description: "Verify a password",
        },
        CommandHelp {
            name: "where",
            args: "",
            description: "Show the database path",
        },
        CommandHelp {
            name: "help",
            args: "",
            description: "Show this help",
        },
        CommandHelp {
            name: "exit",
            args: "",
            description: "Quit",
        },
    ]
}

fn parse_role(role: &str) -> Result<UserRole, String> {
    UserRole::from_str(role)
        .ok_or_else(|| format!("Invalid role '{}'. Valid roles are: Gabbai, Viewer", role))
}

fn show_user(user_manager: &UserManager, user_handle: &str) -> Result<(), String> {
    let role = match user_manager.get_user_role(user_handle) {
        Ok(Some(role)) => role,
        Ok(None) => return Err(format!("User {} not found.", user_handle)),
        Err(err) => return Err(format!("{}", err)),
    };
    let credentials = user_manager
        .get_user_credentials(user_handle)
        .map_err(|e| format!("{}", e))?;
    let tokens = user_manager
        .get_user_tokens(user_handle)
        .map_err(|e| format!("{}", e))?;

    print_section_header(user_handle);
    print_key_value("Role", role.as_str());
    let has_password = credentials
        .map(|c| c.username_password.is_some())
        .unwrap_or(false);
    print_key_value("Password", if has_password { "set" } else { "not set" });

    println!();
    println!("  Permissions:");
    if role.permissions().is_empty() {
        print_empty_list("no permissions");
    }
    for permission in role.permissions() {
        print_list_item(&format!("{:?}", permission), 1);
    }

    println!();
    println!("  Auth tokens:");
    if tokens.is_empty() {
        print_empty_list("no tokens");
    }
    for token in tokens.iter() {
        let created = chrono::DateTime::<chrono::Utc>::from(token.created);
        print_list_item(&format!("issued {}", created.to_rfc3339()), 1);
    }
    print_section_footer();
    Ok(())
}

fn list_users(user_manager: &UserManager) -> Result<(), String> {
    let handles = user_manager
        .get_all_user_handles()
        .map_err(|e| format!("{}", e))?;
    if handles.is_empty() {
        print_empty_list("no users yet");
        return Ok(());
    }
    let mut table = TableBuilder::new(vec!["Handle", "Role"]);
    for handle in handles.iter() {
        let role = match user_manager.get_user_role(handle) {
            Ok(Some(role)) => role.as_str(),
            _ => "?",
        };
        table.add_row(vec![handle.as_str(), role]);
    }
    table.print();
    Ok(())
}

fn execute_command(
    line: String,
    user_manager: &UserManager,
    db_path: &str,
) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    let cli = match cli {
        Ok(cli) => cli,
        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
            return CommandExecutionResult::Ok;
        }
    };

    print_command_echo(&line);
    let outcome: Result<(), String> = match cli.command {
        InnerCommand::AddUser { user_handle, role } => parse_role(&role).and_then(|role| {
            user_manager
                .add_user(&user_handle, role)
                .map(|_| print_success(&format!("Created {} ({})", user_handle, role.as_str())))
                .map_err(|e| format!("{}", e))
        }),
        InnerCommand::AddLogin {
            user_handle,
            password,
        } => user_manager
            .create_password_credentials(&user_handle, &password)
            .map(|_| print_success(&format!("Password set for {}", user_handle)))
            .map_err(|e| format!("{}", e)),
        InnerCommand::UpdateLogin {
            user_handle,
            password,
        } => user_manager
            .update_password_credentials(&user_handle, &password)
            .map(|_| print_success(&format!("Password updated for {}", user_handle)))
            .map_err(|e| format!("{}", e)),
        InnerCommand::DeleteLogin { user_handle } => user_manager
            .delete_password_credentials(&user_handle)
            .map(|_| print_success(&format!("Password removed for {}", user_handle)))
            .map_err(|e| format!("{}", e)),
        InnerCommand::Show { user_handle } => show_user(user_manager, &user_handle),
        InnerCommand::CheckPassword {
            user_handle,
            password,
        } => match user_manager.check_password(&user_handle, &password) {
            Ok(Some(_)) => {
                print_success("The password provided is correct!");
                Ok(())
            }
            Ok(None) => Err("Wrong password, or the user has no password set.".to_string()),
            Err(err) => Err(format!(
                "Could not verify the password, something went wrong: {}",
                err
            )),
        },
        InnerCommand::SetRole { user_handle, role } => parse_role(&role).and_then(|role| {
            user_manager
                .set_user_role(&user_handle, role)
                .map(|_| print_success(&format!("{} is now {}", user_handle, role.as_str())))
                .map_err(|e| format!("{}", e))
        }),
        InnerCommand::UserHandles => list_users(user_manager),
        InnerCommand::Where => {
            print_key_value("Database", db_path);
            Ok(())
        }
        InnerCommand::Help => {
            print_help(&commands_help());
            Ok(())
        }
        InnerCommand::Exit => return CommandExecutionResult::Exit,
    };

    match outcome {
        Ok(()) => CommandExecutionResult::Ok,
        Err(err) => CommandExecutionResult::Error(err),
    }
}

#[derive(rustyline_derive::Hinter)]
struct ShulHelper {
    commands_names: Vec<String>,
}

impl ShulHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        ShulHelper { commands_names }
    }
}

impl Completer for ShulHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .cloned()
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for ShulHelper {}
impl Validator for ShulHelper {}
impl Helper for ShulHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let db_path = resolve_db_path(cli_args.path)?;
    let user_store = SqliteUserStore::new(&db_path)?;
    let user_manager = UserManager::new(Arc::new(user_store));
    let db_path_str = db_path.display().to_string();

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<ShulHelper, FileHistory>::with_config(config)?;
    rl.set_helper(Some(ShulHelper::new()));
    let _ = rl.clear_screen();
    print_welcome(&db_path_str);

    let prompt = get_prompt();
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line.trim().to_string(), &user_manager, &db_path_str) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => break,
                    CommandExecutionResult::Error(err) => print_error(&err),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                print_error(&format!("{:?}", e));
                break;
            }
        }
    }
    print_goodbye();
    Ok(())
}
