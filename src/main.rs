//! flagenv - config-driven argument parsing for shell scripts.

use std::env;
use std::io::{self, IsTerminal, Read};
use std::process;

use anyhow::{bail, Context, Result};
use flagenv::{read_config, write_env, Binder, ClapEngine, CliEngine, UsageError};

fn main() {
    if let Err(err) = run() {
        // Usage and help text arrive fully rendered by the engine; anything
        // else gets the binary prefix and the context chain.
        match err.downcast_ref::<UsageError>() {
            Some(usage) => eprint!("{usage}"),
            None => eprintln!("flagenv: {err:#}"),
        }
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let raw = read_stdin()?;
    let schema = read_config(&raw)?;

    let mut engine = ClapEngine::new(&schema.name, &schema.help);
    let mut binder = Binder::new();
    binder.bind(&schema, &mut engine)?;

    let argv: Vec<String> = env::args().skip(1).collect();
    let parsed = engine.parse(&argv)?;
    let vars = binder.resolve(&parsed);

    let stdout = io::stdout();
    write_env(&mut stdout.lock(), &vars).context("failed to write variables")?;
    Ok(())
}

/// Read the whole config document from stdin. A terminal on stdin means
/// nothing was piped in, which is an error rather than a reason to block.
fn read_stdin() -> Result<Vec<u8>> {
    let stdin = io::stdin();
    read_input(stdin.is_terminal(), &mut stdin.lock())
}

fn read_input<R: Read>(interactive: bool, input: &mut R) -> Result<Vec<u8>> {
    if interactive {
        bail!("you need to pipe a config to stdin");
    }
    let mut raw = Vec::new();
    input
        .read_to_end(&mut raw)
        .context("failed to read config from stdin")?;
    Ok(raw)
}
