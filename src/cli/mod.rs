use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "transcript-scraper",
    about = "Transcript Scraper - Save YouTube transcripts as JSON into a project tree",
    version,
    long_about = "A CLI tool for collecting YouTube transcripts of single videos or whole playlists. Requests go through a local Tor proxy with optional browser cookies, falling back to a direct connection and the legacy timed-text endpoint when blocked."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output root (overrides the configured one)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Configuration file
    #[arg(long, global = true, value_name = "FILE", env = "TRANSCRIPT_SCRAPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the transcript of a video or every video of a playlist
    Fetch {
        /// Watch URL, short URL, bare video ID or playlist URL
        #[arg(value_name = "URL_OR_ID")]
        input: String,

        /// Project to save into
        #[arg(short, long)]
        project: Option<String>,

        /// Subproject of the project to save into
        #[arg(short, long, requires = "project")]
        subproject: Option<String>,

        /// Transcript language code
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Connect directly instead of through the proxy
        #[arg(long)]
        no_proxy: bool,

        /// Netscape cookie file
        #[arg(long, value_name = "FILE")]
        cookies: Option<PathBuf>,
    },

    /// Manage projects
    Projects {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Manage subprojects
    Subprojects {
        #[command(subcommand)]
        action: SubprojectAction,
    },

    /// Show file, token and size totals
    Stats {
        /// One row per subproject instead of per project
        #[arg(long)]
        subprojects: bool,
    },

    /// Write tokens/tokens.csv for a project or subproject
    Tokens {
        project: String,
        subproject: Option<String>,
    },

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectAction {
    /// List projects
    List,
    /// Create a project
    Create { name: String },
}

#[derive(Subcommand, Debug)]
pub enum SubprojectAction {
    /// List the subprojects of a project
    List { project: String },
    /// Create a subproject under an existing project
    Create { project: String, name: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fetch_arguments() {
        let cli = Cli::parse_from([
            "transcript-scraper",
            "fetch",
            "https://youtu.be/dQw4w9WgXcQ",
            "-p",
            "alpha",
            "-s",
            "beta",
            "-l",
            "en",
            "--no-proxy",
        ]);

        match cli.command {
            Commands::Fetch {
                input,
                project,
                subproject,
                language,
                no_proxy,
                cookies,
            } => {
                assert_eq!(input, "https://youtu.be/dQw4w9WgXcQ");
                assert_eq!(project.as_deref(), Some("alpha"));
                assert_eq!(subproject.as_deref(), Some("beta"));
                assert_eq!(language.as_deref(), Some("en"));
                assert!(no_proxy);
                assert!(cookies.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_subproject_requires_project() {
        let result = Cli::try_parse_from(["transcript-scraper", "fetch", "dQw4w9WgXcQ", "-s", "beta"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_root_after_subcommand() {
        let cli = Cli::parse_from(["transcript-scraper", "stats", "--subprojects", "--root", "/tmp/out"]);
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/out")));
        assert!(matches!(cli.command, Commands::Stats { subprojects: true }));
    }
}
