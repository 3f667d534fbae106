//! Command line front end for the account store.
//!
//! # Responsibility
//! - Open the configured database and run one account command.
//! - Print accounts as one JSON object per line (`Account::to_dict` form).
//!
//! ```text
//! account_cli [--db PATH] list
//! account_cli [--db PATH] show <id>
//! account_cli [--db PATH] import <fixture.json>
//! account_cli [--db PATH] delete <id>
//! account_cli [--db PATH] purge
//! account_cli version
//! ```

use account_core::db::open_db;
use account_core::{
    core_version, create_accounts_atomic, init_logging, load_fixture, Account, AccountId,
    AccountService, AccountsConfig, RepoResult, SqliteAccountRepository,
};
use log::info;
use rusqlite::Connection;
use serde_json::Value;
use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "usage: account_cli [--db PATH] <list|show ID|import FILE|delete ID|purge|version>";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    List,
    Show(AccountId),
    Import(PathBuf),
    Delete(AccountId),
    Purge,
    Version,
}

#[derive(Debug, PartialEq, Eq)]
struct Invocation {
    db_override: Option<PathBuf>,
    command: Command,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match run(&args, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String], out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    let invocation = parse_args(args)?;
    if invocation.command == Command::Version {
        writeln!(out, "account_core version={}", core_version())?;
        return Ok(());
    }

    let mut config = AccountsConfig::from_env()?;
    if let Some(path) = invocation.db_override {
        config.db_path = path;
    }
    if let Some(log_dir) = config.log_dir.as_ref() {
        init_logging(config.log_level, log_dir)?;
    }

    let mut conn = open_db(&config.db_path)?;
    execute(invocation.command, &mut conn, out)
}

/// Runs one command against an open session, writing results to `out`.
fn execute(
    command: Command,
    conn: &mut Connection,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    info!("event=cli_command module=cli status=start command={command:?}");

    match command {
        Command::List => {
            let repo = SqliteAccountRepository::try_new(conn)?;
            write_accounts(out, &Account::all(&repo)?)?;
        }
        Command::Show(id) => match open_service(conn)?.get(id)? {
            Some(account) => write_accounts(out, std::slice::from_ref(&account))?,
            None => return Err(format!("account not found: {id}").into()),
        },
        Command::Import(path) => {
            let mut accounts = load_fixture(&path)?;
            create_accounts_atomic(conn, &mut accounts)?;
            write_accounts(out, &accounts)?;
        }
        Command::Delete(id) => {
            open_service(conn)?.remove(id)?;
            writeln!(out, "deleted account {id}")?;
        }
        Command::Purge => {
            let removed = open_service(conn)?.purge()?;
            writeln!(out, "deleted {removed} accounts")?;
        }
        Command::Version => writeln!(out, "account_core version={}", core_version())?,
    }

    Ok(())
}

fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut db_override = None;
    let mut rest = args;
    if let [flag, path, tail @ ..] = rest {
        if flag == "--db" {
            db_override = Some(PathBuf::from(path));
            rest = tail;
        }
    }

    let command = match rest {
        [cmd] if cmd == "list" => Command::List,
        [cmd] if cmd == "purge" => Command::Purge,
        [cmd] if cmd == "version" => Command::Version,
        [cmd, id] if cmd == "show" => Command::Show(parse_id(id)?),
        [cmd, id] if cmd == "delete" => Command::Delete(parse_id(id)?),
        [cmd, path] if cmd == "import" => Command::Import(PathBuf::from(path)),
        _ => return Err(USAGE.to_string()),
    };

    Ok(Invocation {
        db_override,
        command,
    })
}

fn open_service(conn: &Connection) -> RepoResult<AccountService<SqliteAccountRepository<'_>>> {
    Ok(AccountService::new(SqliteAccountRepository::try_new(conn)?))
}

fn parse_id(raw: &str) -> Result<AccountId, String> {
    raw.parse::<AccountId>()
        .map_err(|_| format!("invalid account id `{raw}`"))
}

/// Writes one `to_dict()` JSON object per line.
fn write_accounts(out: &mut impl Write, accounts: &[Account]) -> io::Result<()> {
    for account in accounts {
        writeln!(out, "{}", Value::Object(account.to_dict()))?;
    }
    out.flush()
}
