use clap::Parser;

mod cli;

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    cli::init_logging();

    let clean = match args.command {
        cli::Command::Check(check) => cli::check::run(check)?,
        cli::Command::DumpModule(dump) => cli::dump::run(dump)?,
    };
    if !clean {
        std::process::exit(1);
    }
    Ok(())
}
