use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "bilivod",
    about = "Resolve Bilibili videos into playable sources and bridge DASH tracks to HLS players",
    version,
    author
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds (overrides the configuration)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Session cookies, e.g. "SESSDATA=...; bili_jct=..."
    #[arg(long, global = true, env = "BILIVOD_COOKIES", hide_env_values = true)]
    pub cookies: Option<String>,

    /// Proxy URL (supports http, https, socks5)
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// Proxy username (if proxy requires authentication)
    #[arg(long, global = true)]
    pub proxy_username: Option<String>,

    /// Proxy password (if proxy requires authentication)
    #[arg(long, global = true)]
    pub proxy_password: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub output: Option<OutputFormat>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a video into a playable source
    Resolve {
        /// BV id or video URL
        input: String,

        /// Page id (cid); defaults to the first page
        #[arg(short, long)]
        page: Option<u64>,

        /// Save output to file
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,
    },

    /// List the pages of a multi-part video
    Pages {
        /// BV id or video URL
        input: String,
    },

    /// Resolve a video and serve its HLS playlists over loopback HTTP
    Serve {
        /// BV id or video URL
        input: String,

        /// Page id (cid); defaults to the first page
        #[arg(short, long)]
        page: Option<u64>,

        /// Address to listen on (overrides the configuration)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Show configuration information
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Pretty-printed human-readable output
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// Compact JSON output
    JsonCompact,
    /// Table format
    Table,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Pretty => write!(f, "pretty"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonCompact => write!(f, "json-compact"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_serve() {
        let args = Args::parse_from([
            "bilivod",
            "serve",
            "BV1xx411c7mD",
            "--page",
            "42",
            "--bind",
            "127.0.0.1:9000",
            "-o",
            "json",
        ]);
        assert_eq!(args.output, Some(OutputFormat::Json));
        match args.command {
            Commands::Serve { input, page, bind } => {
                assert_eq!(input, "BV1xx411c7mD");
                assert_eq!(page, Some(42));
                assert_eq!(bind, Some("127.0.0.1:9000".parse().unwrap()));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
