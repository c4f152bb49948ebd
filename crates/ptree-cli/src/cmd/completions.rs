use anyhow::Result;
use clap::Args;
use clap_complete::{Shell, generate};

/// Arguments for `pt completions`.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for the completion script.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `shell` to stdout.
pub fn run_completions(shell: Shell, command: &mut clap::Command) -> Result<()> {
    let mut out = std::io::stdout();
    generate(shell, command, "pt", &mut out);
    Ok(())
}
