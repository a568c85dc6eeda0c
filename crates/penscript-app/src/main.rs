// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Penscript: handwriting-styled pages from plain text
//
// Entry point. Initialises logging, loads the config, starts an engine behind
// the bridge, and runs one command.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use penscript_core::error::Result;
use penscript_core::human_errors::humanize_error;
use penscript_core::types::{InkEffect, QualityTier};

use services::session::Session;
use services::{data_dir, settings};

#[derive(Debug, Parser)]
#[command(name = "penscript", version, about = "Turn text into handwritten-looking PDF pages")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a text file into a handwriting PDF.
    Generate {
        text_file: PathBuf,
        #[arg(long, short)]
        out: PathBuf,
        #[arg(long, value_enum)]
        quality: Option<Quality>,
        #[arg(long, value_enum)]
        effect: Option<Effect>,
        /// Also keep each rendered page as a JPEG in this directory.
        #[arg(long)]
        images_dir: Option<PathBuf>,
    },
    /// Print the text content of a PDF.
    Extract { pdf: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Quality {
    Low,
    Medium,
    High,
}

impl From<Quality> for QualityTier {
    fn from(q: Quality) -> Self {
        match q {
            Quality::Low => QualityTier::Low,
            Quality::Medium => QualityTier::Medium,
            Quality::High => QualityTier::High,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Effect {
    None,
    Shadow,
    Scanner,
}

impl From<Effect> for InkEffect {
    fn from(e: Effect) -> Self {
        match e {
            Effect::None => InkEffect::None,
            Effect::Shadow => InkEffect::Shadow,
            Effect::Scanner => InkEffect::Scanner,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("Penscript starting");

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(code = %err.code(), error = %err, "command failed");
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    let config = settings::load_or_init(&data_dir::data_dir());
    let cwd = std::env::current_dir()?;

    match command {
        Command::Generate {
            text_file,
            out,
            quality,
            effect,
            images_dir,
        } => {
            let mut style = config.generation.clone();
            if let Some(q) = quality {
                style.quality = q.into();
            }
            if let Some(e) = effect {
                style.effect = e.into();
            }

            let session = Session::start(config, cwd).await?;
            let doc = session
                .generate(&text_file, &out, &style, images_dir.as_deref())
                .await?;
            println!("{} ({} page(s))", doc.pdf.display(), doc.pages);
        }
        Command::Extract { pdf } => {
            let session = Session::start(config, cwd).await?;
            let text = session.extract(&pdf).await?;
            println!("{text}");
        }
    }
    Ok(())
}
