use std::{error::Error, io::Write, sync::Arc};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Engine, EngineError, WorkspaceService, parse_uuid};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use server::AuthConfig;

#[derive(Parser, Debug)]
#[command(name = "fintrack_admin")]
#[command(about = "Admin utilities for FinTrack (bootstrap users/workspaces)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./fintrack.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Workspace(Workspace),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
    /// Print a bearer token for an existing user.
    Token(UserTokenArgs),
    /// Revoke a refresh token, ending that session.
    Logout(UserLogoutArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args, Debug)]
struct UserTokenArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "FINTRACK__AUTH__JWT_SECRET")]
    jwt_secret: String,
    #[arg(long, default_value_t = 60)]
    ttl_minutes: i64,
}

#[derive(Args, Debug)]
struct UserLogoutArgs {
    /// Refresh token to revoke.
    #[arg(long)]
    refresh_token: String,
}

#[derive(Args, Debug)]
struct Workspace {
    #[command(subcommand)]
    command: WorkspaceCommand,
}

#[derive(Subcommand, Debug)]
enum WorkspaceCommand {
    Create(WorkspaceCreateArgs),
    Members(WorkspaceMembersArgs),
}

#[derive(Args, Debug)]
struct WorkspaceCreateArgs {
    /// Email of the user who becomes the owner.
    #[arg(long)]
    owner: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    currency: Option<String>,
}

#[derive(Args, Debug)]
struct WorkspaceMembersArgs {
    #[arg(long)]
    workspace: String,
}

const PASSWORD_ATTEMPTS: usize = 3;
const MIN_PASSWORD_CHARS: usize = 8;

/// Keeps the terminal in raw mode for masked input; restores it on drop,
/// including when a prompt is interrupted.
struct MaskedTerminal;

impl MaskedTerminal {
    fn acquire() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for MaskedTerminal {
    fn drop(&mut self) {
        if let Err(err) = terminal::disable_raw_mode() {
            eprintln!("could not restore the terminal: {err}");
        }
    }
}

/// Print a full line over whatever the prompt left on the current one.
fn notice(out: &mut impl Write, message: &str) -> std::io::Result<()> {
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(message),
        Print("\r\n")
    )
}

/// Read one secret from the terminal, echoing `*` per character.
fn read_masked(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _masked = MaskedTerminal::acquire()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;

    let mut secret = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                return Ok(secret);
            }
            KeyCode::Char('c' | 'd') if ctrl => {
                execute!(out, Print("\r\n"))?;
                return Err("password entry cancelled".into());
            }
            KeyCode::Backspace if secret.pop().is_some() => {
                execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
            }
            KeyCode::Char(ch) if !ctrl => {
                secret.push(ch);
                execute!(out, Print("*"))?;
            }
            _ => {}
        }
        out.flush()?;
    }
}

/// Ask for the new account's password and its confirmation.
///
/// Length is checked here too, so a short password is retried instead of
/// failing the registration.
fn read_new_password(email: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..PASSWORD_ATTEMPTS {
        let password = read_masked(&format!("FinTrack password for {email}: "))?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            notice(
                &mut out,
                &format!("FinTrack passwords need at least {MIN_PASSWORD_CHARS} characters."),
            )?;
            continue;
        }

        if read_masked("Repeat password: ")? == password {
            return Ok(password);
        }
        notice(&mut out, "The passwords differ, try again.")?;
    }

    Err(format!("no password set for {email} after {PASSWORD_ATTEMPTS} attempts").into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Expected failures become a message and exit code 1; the rest bubble up.
fn exit_on_rejection<T>(result: Result<T, EngineError>) -> Result<T, EngineError> {
    match result {
        Err(err) if !err.is_internal() => {
            eprintln!("{err}");
            std::process::exit(1);
        }
        other => other,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Arc::new(Engine::builder().database(db).build().await?);

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = read_new_password(&args.email)?;
            let user = exit_on_rejection(
                engine
                    .register_user(&args.email, &password, args.name.as_deref())
                    .await,
            )?;
            println!("created user: {} ({})", user.email, user.id);
        }
        Command::User(User {
            command: UserCommand::Token(args),
        }) => {
            let user_id = exit_on_rejection(engine.find_user_id_by_email(&args.email).await)?;
            let auth = AuthConfig {
                jwt_secret: args.jwt_secret,
                token_ttl_minutes: args.ttl_minutes,
                refresh_token_ttl_days: 0,
            };
            let Ok(token) = server::issue_token(user_id, &auth) else {
                return Err("failed to issue token".into());
            };
            println!("{token}");
        }
        Command::User(User {
            command: UserCommand::Logout(args),
        }) => {
            exit_on_rejection(engine.revoke_refresh_token(&args.refresh_token).await)?;
            println!("refresh token revoked");
        }
        Command::Workspace(Workspace {
            command: WorkspaceCommand::Create(args),
        }) => {
            let owner = exit_on_rejection(engine.find_user_id_by_email(&args.owner).await)?;
            let service = WorkspaceService::new(engine.clone());
            let (workspace, _) = exit_on_rejection(
                service
                    .create_workspace(owner, &args.name, args.currency.as_deref())
                    .await,
            )?;
            println!(
                "created workspace: {} ({}, {})",
                workspace.name, workspace.id, workspace.default_currency
            );
        }
        Command::Workspace(Workspace {
            command: WorkspaceCommand::Members(args),
        }) => {
            let workspace_id = exit_on_rejection(parse_uuid(&args.workspace, "workspace"))?;
            let service = WorkspaceService::new(engine.clone());
            for member in exit_on_rejection(service.list_members(workspace_id).await)? {
                println!("{}\t{}\t{}", member.role, member.email, member.user_id);
            }
        }
    }

    Ok(())
}
