use std::fmt;

use lingua_core::model::LanguageCode;
use services::{AppServices, Clock};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidLanguage { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLanguage { raw } => write!(f, "invalid --language value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- roadmap [--db <sqlite_url>] [--language <code>]");
    eprintln!("  cargo run -p app -- reset   [--db <sqlite_url>] [--language <code>] --yes");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:lingua.sqlite3");
    eprintln!("  --language taken from the stored selection, if any");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LINGUA_DB_URL, LINGUA_LANGUAGE, LINGUA_AI_API_KEY");
    eprintln!("  LOG_LEVEL, LOG_FORMAT");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Roadmap,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "roadmap" => Some(Self::Roadmap),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    language: Option<LanguageCode>,
    yes: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("LINGUA_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://lingua.sqlite3".into(), normalize_sqlite_url);
        let mut language = std::env::var("LINGUA_LANGUAGE")
            .ok()
            .and_then(|value| LanguageCode::new(value).ok());
        let mut yes = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--language" => {
                    let value = require_value(args, "--language")?;
                    let code = LanguageCode::new(value.as_str())
                        .map_err(|_| ArgsError::InvalidLanguage { raw: value })?;
                    language = Some(code);
                }
                "--yes" => yes = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, language, yes })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    // Logs go to stderr so roadmap output stays pipeable.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: show the roadmap when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Roadmap,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Roadmap,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so
    // core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::default()).await?;
    tracing::info!(db = %parsed.db_url, "storage ready");
    let active = services.activate_startup_language(parsed.language).await?;

    match cmd {
        Command::Roadmap => print_roadmap(&services, active.as_ref()),
        Command::Reset => reset_progress(&services, active.as_ref(), parsed.yes).await,
    }
}

fn print_roadmap(
    services: &AppServices,
    active: Option<&LanguageCode>,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = services.catalog();
    let Some(code) = active else {
        return Err(no_language_selected(&catalog));
    };

    let progress = services.progress();
    let name = catalog
        .language(code)
        .map_or_else(|| code.to_string(), |l| l.name().to_owned());
    println!("{name} roadmap, {} XP", progress.xp());

    for row in progress.roadmap() {
        let marker = if row.completed {
            "[x]"
        } else if row.unlocked {
            "[ ]"
        } else {
            "[-]"
        };
        let score = row
            .score
            .map_or_else(String::new, |s| format!(", best {s}%"));
        println!(
            "{marker} {}  ({}/{}{score})",
            row.title, row.completed_sublevels, row.total_sublevels
        );
        if let Some(reason) = &row.lock_reason {
            println!("    locked: {reason}");
        }
    }

    Ok(())
}

async fn reset_progress(
    services: &AppServices,
    active: Option<&LanguageCode>,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(code) = active else {
        return Err(no_language_selected(&services.catalog()));
    };

    if !yes {
        eprintln!("reset would erase all {code} progress; pass --yes to confirm");
        return Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "reset not confirmed",
        )));
    }

    services.progress().reset_active_language().await?;
    // Cached questions survive a reset; only progress is erased.
    println!("reset {code} progress");
    Ok(())
}

fn no_language_selected(catalog: &lingua_core::model::Catalog) -> Box<dyn std::error::Error> {
    eprintln!("no language selected; pass --language <code> or set LINGUA_LANGUAGE");
    eprintln!();
    eprintln!("Available languages:");
    for language in catalog.languages() {
        eprintln!(
            "  {:<4} {} ({})",
            language.code(),
            language.name(),
            language.native_name()
        );
    }
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        "no language selected",
    ))
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
