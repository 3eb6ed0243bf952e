//! CLI for the hlsget segment fetch-and-glue tool.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hlsget_core::config::Container;
use std::path::PathBuf;

use commands::{run_download, run_inspect};

/// Top-level CLI for hlsget.
#[derive(Debug, Parser)]
#[command(name = "hlsget")]
#[command(about = "hlsget: fetch media segments in parallel and glue them in order", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every segment in an index file and assemble the artifact.
    Download {
        /// Index file: a local path or an http(s) URL.
        #[arg(long)]
        index: String,

        /// Directory that receives the artifact (and temp_segments/).
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Output filename; extension follows --format.
        #[arg(long, default_value = "combined_video.ts")]
        name: String,

        /// Worker pool size (default: host core count).
        #[arg(long, value_name = "N")]
        workers: Option<usize>,

        /// Retries per segment after the first attempt.
        #[arg(long, value_name = "N")]
        retries: Option<u32>,

        /// Per-request timeout in seconds.
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// HTTP handle pool size (default: worker count).
        #[arg(long, value_name = "N")]
        pool: Option<usize>,

        /// Output container: ts or mp4 (rename only, no transcoding).
        #[arg(long, default_value = "ts")]
        format: Container,

        /// Keep the temporary segment files after assembly.
        #[arg(long)]
        keep_temp: bool,
    },

    /// Parse an index file and show what would be downloaded.
    Inspect {
        /// Index file: a local path or an http(s) URL.
        #[arg(long)]
        index: String,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        match cli.command {
            CliCommand::Download {
                index,
                out_dir,
                name,
                workers,
                retries,
                timeout,
                pool,
                format,
                keep_temp,
            } => run_download(
                &index, out_dir, name, workers, retries, timeout, pool, format, keep_temp,
            ),
            CliCommand::Inspect { index } => run_inspect(&index),
        }
    }
}
