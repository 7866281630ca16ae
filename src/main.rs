//! CLI entry point for `mail2matrix`.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};

use mail2matrix::config::{self, Config, Overrides};
use mail2matrix::deliver::{self, MatrixClient};
use mail2matrix::pipeline::{Outcome, Pipeline};

#[derive(Parser)]
#[command(name = "mail2matrix", version)]
#[command(about = "Forward an email from stdin to a Matrix room as plain text")]
#[command(
    after_help = "Typical use is as an MTA pipe, e.g. in /etc/aliases:\n  alerts: \"|/usr/local/bin/mail2matrix forward\""
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: $MAIL2MATRIX_CONFIG or the platform config dir)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    overrides: OverrideArgs,
}

/// Settings that override the config file.
#[derive(Args)]
struct OverrideArgs {
    /// Homeserver base URL
    #[arg(long, global = true, value_name = "URL")]
    server: Option<String>,

    /// Access token
    #[arg(long, global = true, env = "MAIL2MATRIX_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Room ID to post into
    #[arg(long, global = true, value_name = "ROOM_ID")]
    room: Option<String>,

    /// Message template (minijinja syntax)
    #[arg(long, global = true)]
    template: Option<String>,

    /// Text placed before the message by the default template
    #[arg(long, global = true)]
    preface: Option<String>,

    /// Text placed after the message by the default template
    #[arg(long, global = true)]
    epilogue: Option<String>,

    /// Do not forward messages matching this regex (repeatable)
    #[arg(long = "skip", global = true, value_name = "REGEX")]
    skip: Vec<String>,
}

impl From<OverrideArgs> for Overrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            server: args.server,
            token: args.token,
            room: args.room,
            template: args.template,
            preface: args.preface,
            epilogue: args.epilogue,
            skip: args.skip,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Read an email from stdin and post it to the room
    Forward,
    /// Read an email from stdin and print the message that would be posted
    Render {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log in, ask for the room and write the config file
    Setup {
        /// Matrix user name or full user ID (asked when omitted)
        #[arg(short, long)]
        user: Option<String>,
        /// Password (asked when omitted)
        #[arg(short, long, env = "MAIL2MATRIX_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Log in with a password and print an access token
    Login {
        /// Matrix user name or full user ID
        #[arg(short, long)]
        user: String,
        /// Password (read from stdin when omitted)
        #[arg(short, long, env = "MAIL2MATRIX_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // These two do not need a configuration
    match cli.command {
        Commands::Completions { shell } => return cmd_completions(shell),
        Commands::Manpage => return cmd_manpage(),
        _ => {}
    }

    // Setup may create the file it is pointed at
    let setup_path = match cli.command {
        Commands::Setup { .. } => Some(config::config_path(cli.config.as_deref())?),
        _ => None,
    };
    let mut config = match &setup_path {
        Some(path) => config::load_or_default(path)?,
        None => config::load_config(cli.config.as_deref())?,
    };
    config.apply(cli.overrides.into());

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Forward => cmd_forward(&config),
        Commands::Render { json } => cmd_render(&config, json),
        Commands::Setup { user, password } => match setup_path {
            Some(path) => cmd_setup(config, &path, user, password),
            None => Ok(()),
        },
        Commands::Login { user, password } => cmd_login(&config, &user, password),
        Commands::Completions { .. } | Commands::Manpage => Ok(()),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config.general.log_dir.as_ref();
    match log_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok()) {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::never(dir, "mail2matrix.log");
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_appender);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
            if let Some(dir) = log_dir {
                tracing::warn!(dir = %dir.display(), "Cannot create log directory, logging to stderr only");
            }
        }
    }
}

/// Process the email on stdin and post it unless a skip pattern matched.
fn cmd_forward(config: &Config) -> anyhow::Result<()> {
    config.validate_for_delivery()?;
    let pipeline = Pipeline::new(&config.message)?;
    let client = MatrixClient::new(&config.matrix.server, config.matrix.token.clone())?;

    pipeline.forward(std::io::stdin().lock(), &client, &config.matrix.room)?;
    Ok(())
}

/// Process the email on stdin and print the outcome without sending it.
fn cmd_render(config: &Config, json: bool) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(&config.message)?;
    let outcome = pipeline.process_reader(std::io::stdin().lock())?;

    if json {
        print_outcome_json(&outcome)?;
    } else {
        print_outcome(&outcome)?;
    }
    Ok(())
}

fn print_outcome(outcome: &Outcome) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(outcome.rendered.as_bytes())?;
    if !outcome.rendered.ends_with('\n') {
        writeln!(stdout)?;
    }
    writeln!(stdout, "---")?;
    writeln!(stdout, "source:  {}", outcome.message.source)?;
    writeln!(
        stdout,
        "forward: {}",
        if outcome.forward { "yes" } else { "no (skipped)" }
    )?;
    Ok(())
}

/// Print the outcome as JSON.
fn print_outcome_json(outcome: &Outcome) -> anyhow::Result<()> {
    let report = serde_json::json!({
        "forward": outcome.forward,
        "body": outcome.rendered,
        "subject": outcome.message.subject,
        "source": outcome.message.source.to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Prompt on stderr and read one line; an empty answer keeps `default`.
fn ask(input: &mut impl BufRead, prompt: &str, default: &str) -> anyhow::Result<String> {
    if default.is_empty() {
        eprint!("{prompt}: ");
    } else {
        eprint!("{prompt} [{default}]: ");
    }
    std::io::stderr().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim_end_matches(['\r', '\n']);
    Ok(if answer.is_empty() { default } else { answer }.to_string())
}

/// Like [`ask`], but an empty result is an error.
fn ask_required(input: &mut impl BufRead, prompt: &str, default: &str) -> anyhow::Result<String> {
    let answer = ask(input, prompt, default)?;
    if answer.is_empty() {
        anyhow::bail!("{prompt} is required");
    }
    Ok(answer)
}

/// Log in interactively and write server, token, room and preface to the
/// config file.
fn cmd_setup(
    mut config: Config,
    path: &Path,
    user: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    let mut input = std::io::stdin().lock();

    config.matrix.server = ask_required(&mut input, "Homeserver URL", &config.matrix.server)?;
    let user = match user {
        Some(user) => user,
        None => ask_required(&mut input, "User", "")?,
    };
    let password = match password {
        Some(password) => password,
        None => ask_required(&mut input, "Password", "")?,
    };
    config.matrix.token = deliver::login(&config.matrix.server, &user, &password)?;

    config.matrix.room = ask_required(&mut input, "Room ID", &config.matrix.room)?;
    config.message.preface = ask(&mut input, "Preface", &config.message.preface)?;

    config::save_config(&config, path)?;
    eprintln!("Saved config to: {}", path.display());
    Ok(())
}

/// Log in with a password and print the access token.
fn cmd_login(config: &Config, user: &str, password: Option<String>) -> anyhow::Result<()> {
    let password = match password {
        Some(password) => password,
        None => ask_required(
            &mut std::io::stdin().lock(),
            &format!("Password for {user}"),
            "",
        )?,
    };
    if password.is_empty() {
        anyhow::bail!("empty password");
    }

    let token = deliver::login(&config.matrix.server, user, &password)?;
    println!("{token}");
    eprintln!("Put this token in the [matrix] section of your config file or in MAIL2MATRIX_TOKEN.");
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mail2matrix", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_keeps_default_on_empty_answer() {
        let mut input = &b"\n!other:example.org\n"[..];
        assert_eq!(ask(&mut input, "Server", "https://matrix.org").unwrap(), "https://matrix.org");
        assert_eq!(ask(&mut input, "Room ID", "!r:x").unwrap(), "!other:example.org");
    }

    #[test]
    fn test_ask_required_rejects_empty() {
        let mut input = &b""[..];
        assert!(ask_required(&mut input, "User", "").is_err());
    }
}
