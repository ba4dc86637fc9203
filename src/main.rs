use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    codelabify::logging::init().context("init logging")?;

    let cli = codelabify::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        codelabify::cli::Command::Parse(args) => {
            codelabify::commands::parse(args).context("parse")?;
        }
        codelabify::cli::Command::Render(args) => {
            codelabify::commands::render(args).context("render")?;
        }
        codelabify::cli::Command::Convert(args) => {
            codelabify::commands::convert(args).await.context("convert")?;
        }
        codelabify::cli::Command::Records(args) => {
            codelabify::commands::records(args).await.context("records")?;
        }
    }

    Ok(())
}
