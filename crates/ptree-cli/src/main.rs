#![forbid(unsafe_code)]

mod cmd;
mod output;
mod pid_file;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use ptree_core::config::load_config;
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "pt: view, edit, analyze and export product trees",
    long_about = None
)]
struct Cli {
    /// Enable debug logging (overridden by PTREE_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format: pretty, text or json (default: pretty on a TTY, text otherwise).
    #[arg(long, value_enum, global = true)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Read configuration from this file instead of ./ptree.toml.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "Import a product tree",
        long_about = "Parse a product tree XML document, summarise it, and optionally save a snapshot or push it to the analysis service.",
        after_help = "EXAMPLES:\n    # Summarise a tree\n    pt import roadmap.xml\n\n    # Save a JSON snapshot alongside\n    pt import roadmap.xml --out roadmap.json\n\n    # Push to [service] import_url\n    pt import roadmap.xml --push"
    )]
    Import(cmd::import::ImportArgs),

    #[command(
        next_help_heading = "Read",
        about = "Print the tree view",
        long_about = "Print the visible rows of the tree, honoring expansion, selection and search.",
        after_help = "EXAMPLES:\n    # Top level only\n    pt tree roadmap.xml\n\n    # Everything\n    pt tree roadmap.xml --expand-all\n\n    # Matches and their ancestors\n    pt tree roadmap.xml --search login"
    )]
    Tree(cmd::tree::TreeArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one node",
        long_about = "Show every field of a node plus its parent and child counts.",
        after_help = "EXAMPLES:\n    # Show a node\n    pt show roadmap.xml g1\n\n    # Emit machine-readable output\n    pt show roadmap.xml g1 --format json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "Export as XML, Jira CSV or JSON",
        long_about = "Render the tree as product tree XML, a Jira bulk-import CSV or a snapshot JSON.",
        after_help = "EXAMPLES:\n    # XML to stdout\n    pt export roadmap.json --to xml\n\n    # Jira CSV to a file\n    pt export roadmap.xml --to jira -o issues.csv --reporter pm"
    )]
    Export(cmd::export::ExportArgs),

    #[command(
        next_help_heading = "Read",
        about = "Analyze the tree graph",
        long_about = "Report cycles, orphans, duplicate titles, dependency outliers and graph statistics.",
        after_help = "EXAMPLES:\n    # Human summary\n    pt analyze roadmap.xml\n\n    # Stricter fan-out limit\n    pt analyze roadmap.xml --out-threshold 3\n\n    # Emit machine-readable output\n    pt analyze roadmap.xml --format json"
    )]
    Analyze(cmd::analyze::AnalyzeArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Create a node",
        long_about = "Add a node under a parent (or at top level) and save the tree.",
        after_help = "EXAMPLES:\n    # Add a goal under a product\n    pt create roadmap.xml --parent p1 --type goal --title \"Faster checkout\"\n\n    # Add a top-level product\n    pt create roadmap.xml --parent none --type product --title Billing"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Update node fields",
        long_about = "Change one or more fields of an existing node and save the tree.",
        after_help = "EXAMPLES:\n    # Move work forward\n    pt update roadmap.xml w1 --status in_progress\n\n    # Write the result elsewhere\n    pt update roadmap.xml w1 --priority high -o edited.xml"
    )]
    Update(cmd::update::UpdateArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Delete a node and its subtree",
        long_about = "Remove a node together with all of its descendants and save the tree.",
        after_help = "EXAMPLES:\n    # Delete a goal and everything under it\n    pt delete roadmap.xml g1"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Move a node under a new parent",
        long_about = "Reparent a node. Moving a node under its own descendant is rejected.",
        after_help = "EXAMPLES:\n    # Move under another goal\n    pt move roadmap.xml w1 --parent g2\n\n    # Make it top-level\n    pt move roadmap.xml g1 --parent none"
    )]
    Move(cmd::move_cmd::MoveArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Interactive session",
        long_about = "Open a line-oriented shell that keeps the tree and view in memory until saved.",
        after_help = "EXAMPLES:\n    # Start a session\n    pt session roadmap.xml\n\n    # Script one\n    printf 'select g1\\nset status done\\nsave\\n' | pt session roadmap.xml"
    )]
    Session(cmd::session::SessionArgs),

    #[command(
        next_help_heading = "AI",
        about = "Ask the AI backend",
        long_about = "Send a question with tree context to the configured AI backend.",
        after_help = "EXAMPLES:\n    # Whole-tree question\n    pt ask roadmap.xml \"what should we prioritize?\"\n\n    # Focus on one node\n    pt ask roadmap.xml \"break this down\" --node g1\n\n    # Rule-based answers without a server\n    PTREE_AI_BACKEND=offline pt ask roadmap.xml \"any issues?\""
    )]
    Ask(cmd::ask::AskArgs),

    #[command(
        next_help_heading = "AI",
        about = "Check AI backend health",
        long_about = "Probe the configured AI backend and report whether it is ready.",
        after_help = "EXAMPLES:\n    # Check the backend\n    pt status\n\n    # Emit machine-readable output\n    pt status --format json"
    )]
    Status(cmd::status::StatusArgs),

    #[command(
        next_help_heading = "AI",
        about = "Start or stop a local AI backend",
        long_about = "Launch [launcher] command, wait for it to become healthy, and track it with a PID file.",
        after_help = "EXAMPLES:\n    # Start and wait for health\n    pt backend start\n\n    # Inspect\n    pt backend status\n\n    # Stop it\n    pt backend stop"
    )]
    Backend(cmd::backend::BackendArgs),

    #[command(
        next_help_heading = "Shell",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Bash\n    pt completions bash > ~/.local/share/bash-completion/completions/pt"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("PTREE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "ptree=debug,pt=debug,info"
        } else {
            "warn"
        })
    });

    let format = env::var("PTREE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_root = env::current_dir()?;
    let output = cli.output_mode();

    let config = match load_config(&project_root, cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            render_error(output, &CliError::from(&err))?;
            return Err(err.into());
        }
    };
    debug!(backend = %config.ai.backend, endpoint = %config.ai.endpoint, "configuration loaded");

    match cli.command {
        Commands::Import(ref args) => cmd::import::run_import(args, output, &config),
        Commands::Tree(ref args) => cmd::tree::run_tree(args, output),
        Commands::Show(ref args) => cmd::show::run_show(args, output),
        Commands::Export(ref args) => cmd::export::run_export(args, output, &config),
        Commands::Analyze(ref args) => cmd::analyze::run_analyze(args, output, &config),
        Commands::Create(ref args) => cmd::create::run_create(args, output),
        Commands::Update(ref args) => cmd::update::run_update(args, output),
        Commands::Delete(ref args) => cmd::delete::run_delete(args, output),
        Commands::Move(ref args) => cmd::move_cmd::run_move(args, output),
        Commands::Session(ref args) => cmd::session::run_session(args, output, &config),
        Commands::Ask(ref args) => cmd::ask::run_ask(args, output, &config),
        Commands::Status(ref args) => cmd::status::run_status(args, output, &config),
        Commands::Backend(ref args) => {
            cmd::backend::run_backend(args, output, &config, &project_root)
        }
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["pt", "tree", "t.xml", "--format", "json"]);
        assert_eq!(cli.format, Some(OutputMode::Json));
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn hidden_json_flag_sets_output_mode() {
        let cli = Cli::parse_from(["pt", "--json", "show", "t.xml", "g1"]);
        assert!(cli.json);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["pt", "status", "--config", "alt.toml"]);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("alt.toml")));
    }

    #[test]
    fn create_requires_parent_type_and_title() {
        assert!(Cli::try_parse_from(["pt", "create", "t.xml", "--title", "x"]).is_err());
        let cli = Cli::parse_from([
            "pt", "create", "t.xml", "--parent", "none", "--type", "goal", "--title", "x",
        ]);
        assert!(matches!(cli.command, Commands::Create(_)));
    }

    #[test]
    fn export_rejects_unknown_target() {
        assert!(Cli::try_parse_from(["pt", "export", "t.xml", "--to", "yaml"]).is_err());
    }

    #[test]
    fn ask_node_conflicts_with_no_context() {
        assert!(
            Cli::try_parse_from(["pt", "ask", "t.xml", "q", "--node", "g1", "--no-context"])
                .is_err()
        );
    }

    #[test]
    fn backend_subcommands_parse() {
        let cli = Cli::parse_from(["pt", "backend", "stop", "--force"]);
        assert!(matches!(
            cli.command,
            Commands::Backend(cmd::backend::BackendArgs {
                command: cmd::backend::BackendCommand::Stop { force: true },
            })
        ));
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["pt", "completions", "zsh"]);
        assert!(matches!(
            cli.command,
            Commands::Completions(cmd::completions::CompletionsArgs {
                shell: clap_complete::Shell::Zsh,
            })
        ));
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["pt", "import", "t.xml"],
            vec!["pt", "tree", "t.xml", "--expand", "a", "--expand", "b"],
            vec!["pt", "show", "t.xml", "x"],
            vec!["pt", "export", "t.xml", "--to", "jira"],
            vec!["pt", "analyze", "t.xml", "--in-threshold", "3"],
            vec!["pt", "create", "t.xml", "--parent", "p", "--type", "job", "--title", "t"],
            vec!["pt", "update", "t.xml", "x", "--status", "done"],
            vec!["pt", "delete", "t.xml", "x"],
            vec!["pt", "move", "t.xml", "x", "--parent", "p"],
            vec!["pt", "session", "t.xml"],
            vec!["pt", "ask", "t.xml", "why?"],
            vec!["pt", "status"],
            vec!["pt", "backend", "start"],
            vec!["pt", "completions", "bash"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "failed to parse {args:?}: {:?}", result.err());
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
