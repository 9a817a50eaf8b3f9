use chromalign::{
    cli::{init_verbose, Cli, Command, FULL_VERSION},
    commands::{align, batch, simmat},
    utils::{handle_error_and_exit, Result},
};
use clap::Parser;

fn runner() -> Result<()> {
    let cli = Cli::parse();
    init_verbose(&cli);
    let subcommand_name = match cli.command {
        Command::Align(_) => "align",
        Command::Batch(_) => "batch",
        Command::Simmat(_) => "simmat",
    };

    log::info!(
        "Running {}-{} [{}]",
        env!("CARGO_PKG_NAME"),
        *FULL_VERSION,
        subcommand_name
    );
    match cli.command {
        Command::Align(args) => align::align(args)?,
        Command::Batch(args) => batch::batch(args)?,
        Command::Simmat(args) => simmat::simmat(args)?,
    }
    log::info!("{} end", env!("CARGO_PKG_NAME"));
    Ok(())
}

fn main() {
    if let Err(e) = runner() {
        handle_error_and_exit(e);
    }
}
