use clap::{Parser, Subcommand};
use std::path::PathBuf;
use track_log_lib::WireVersion;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
/// Track Log - Inspect and convert GPX 1.0 / 1.1 track logs
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print version, contents, length and bounds of GPX files
    Info {
        /// GPX files to summarize (loaded in parallel)
        #[clap(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Re-encode a GPX file in another wire version
    Convert {
        /// GPX file to read
        #[clap(value_name = "INPUT")]
        input: PathBuf,

        /// Target GPX version (1.0 or 1.1)
        #[clap(long, value_parser = parse_version)]
        to: WireVersion,

        /// Output file (standard output if omitted)
        #[clap(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Write everything on one line
        #[clap(long)]
        compact: bool,

        /// Creator attribute for documents that lack one
        #[clap(long)]
        creator: Option<String>,
    },
}

fn parse_version(text: &str) -> Result<WireVersion, String> {
    text.parse().map_err(|err: track_log_lib::CodecError| err.to_string())
}

/// Parses the command line, exiting with usage on error
pub fn parse_args() -> Cli {
    match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => e.exit(),
    }
}
