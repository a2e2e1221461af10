// crates/cli/src/args.rs
//! Command-line surface of `gource-jobs`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use gource_studio_types::{
    BulkImportRequest, CloneRequest, FadeFilter, FilterRequest, MusicFilter, ProjectCreationMode,
    Quality, RenderRequest, StartRequest,
};

#[derive(Debug, Parser)]
#[command(name = "gource-jobs")]
#[command(about = "Start and track gource-studio backend jobs", version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write JSON logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Backend API base URL (default: $GOURCE_STUDIO_API_URL or http://localhost:5000/api)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Tracking config file (default: ~/.config/gource-studio/tracking.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Print the final job snapshot as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Clone a single repository
    Clone {
        /// Repository URL
        url: String,

        /// Create a dashboard project for the repository
        #[arg(long)]
        create_project: bool,
    },

    /// Import every repository of one or more GitHub users or organizations
    BulkImport {
        /// GitHub user/org names or URLs
        #[arg(required = true)]
        sources: Vec<String>,

        /// How imported repositories are grouped into projects
        #[arg(long, value_enum, default_value_t = ModeArg::None)]
        mode: ModeArg,

        /// Project name template for per-owner mode
        #[arg(long, default_value = "{owner}")]
        name_template: String,

        /// Maximum repositories per source
        #[arg(long, default_value_t = 99_999)]
        limit: u32,

        /// Skip forked repositories
        #[arg(long)]
        exclude_forks: bool,

        /// Number of repositories you expect (sizes the progress estimate)
        #[arg(long)]
        expected: Option<usize>,
    },

    /// Render a project's visualization to video
    Render {
        /// Project id
        project_id: String,

        /// Custom name for the render
        #[arg(long)]
        name: Option<String>,
    },

    /// Re-encode an existing render with fade, music and quality filters
    Filter {
        /// Render id to process
        render_id: String,

        /// Fade in and out
        #[arg(long)]
        fade: bool,

        /// Fade-in duration in seconds
        #[arg(long, default_value_t = 3.0)]
        fade_in: f64,

        /// Fade-out duration in seconds
        #[arg(long, default_value_t = 3.0)]
        fade_out: f64,

        /// Uploaded audio file to mix in
        #[arg(long)]
        music: Option<String>,

        /// Music volume, 0.0 to 1.0
        #[arg(long, default_value_t = 0.8)]
        volume: f64,

        #[arg(long, value_enum, default_value_t = QualityArg::High)]
        quality: QualityArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    None,
    Single,
    PerOwner,
}

impl From<ModeArg> for ProjectCreationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::None => ProjectCreationMode::None,
            ModeArg::Single => ProjectCreationMode::Single,
            ModeArg::PerOwner => ProjectCreationMode::PerOwner,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QualityArg {
    Low,
    Medium,
    High,
}

impl From<QualityArg> for Quality {
    fn from(quality: QualityArg) -> Self {
        match quality {
            QualityArg::Low => Quality::Low,
            QualityArg::Medium => Quality::Medium,
            QualityArg::High => Quality::High,
        }
    }
}

impl Command {
    pub fn into_request(self) -> StartRequest {
        match self {
            Command::Clone {
                url,
                create_project,
            } => StartRequest::Clone(CloneRequest {
                url,
                create_project,
            }),
            Command::BulkImport {
                sources,
                mode,
                name_template,
                limit,
                exclude_forks,
                expected,
            } => {
                let mut request = BulkImportRequest::new(sources.join(", "));
                request.project_creation_mode = mode.into();
                request.project_name_template = name_template;
                request.repo_limit = limit;
                request.exclude_forks = exclude_forks;
                request.expected_items = expected;
                StartRequest::BulkImport(request)
            }
            Command::Render { project_id, name } => StartRequest::Render(RenderRequest {
                project_id,
                custom_name: name,
            }),
            Command::Filter {
                render_id,
                fade,
                fade_in,
                fade_out,
                music,
                volume,
                quality,
            } => StartRequest::Filter(FilterRequest {
                render_id,
                fade: FadeFilter {
                    enabled: fade,
                    duration_in: fade_in,
                    duration_out: fade_out,
                },
                music: MusicFilter {
                    enabled: music.is_some(),
                    file: music.unwrap_or_default(),
                    volume: volume.clamp(0.0, 1.0),
                },
                quality: quality.into(),
            }),
        }
    }
}
