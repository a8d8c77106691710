mod cli;
mod commands;

use cli::{Cli, Command};

fn main() {
    let cli = <Cli as clap::Parser>::parse();
    cli::init_logging(cli.log.as_deref());

    let code = match cli.command {
        Command::Single { path } => commands::single::run(path.as_deref()),
        Command::Server => commands::server::run(),
    };
    std::process::exit(code);
}
