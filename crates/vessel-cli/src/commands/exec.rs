//! `vessel exec` — Run a command inside a running container.

use clap::Args;
use vessel_runtime::lifecycle::Engine;

/// Arguments for the `exec` command.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Target container.
    pub container: String,

    /// Command to run inside it.
    #[arg(trailing_var_arg = true, required = true)]
    pub command: Vec<String>,
}

/// Executes the `exec` command; the process exits with the inner
/// command's exit code.
///
/// # Errors
///
/// Returns an error if the container is not running or the namespaces
/// cannot be joined.
pub fn execute(args: ExecArgs) -> anyhow::Result<()> {
    let engine = Engine::with_defaults();
    let code = engine
        .exec(&args.container, &args.command)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}
