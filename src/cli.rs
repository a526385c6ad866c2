use clap::Parser;

/// Command line interface for the application
#[derive(Parser)]
#[command(version, about = "Style-augmented image prompt workflow")]
pub struct Cli {
    /// Path to the YAML configuration file
    /// Default: <config_dir>/promptsmith/config.yaml when present, else built-in defaults
    #[arg(short, long)]
    pub config: Option<String>,

    /// Request text; asked interactively when omitted
    #[arg(short, long)]
    pub text: Option<String>,

    /// File holding a base64 encoded mask, turns the request into a region edit
    #[arg(long)]
    pub mask_file: Option<String>,

    /// Image the mask applies to
    #[arg(long, requires = "mask_file")]
    pub reference_image_url: Option<String>,

    /// Model forwarded to the artifact backend
    #[arg(short, long)]
    pub model: Option<String>,

    /// Overrides workflow.max_retry_count from the configuration
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Print the style catalog and exit
    #[arg(long)]
    pub list_styles: bool,

    /// Print raw event envelopes as JSON lines instead of the console view
    #[arg(long)]
    pub json: bool,

    /// Also write logs to rolling files in "logs"
    #[arg(long)]
    pub log_file: bool,

    /// Sets the logging verbosity level for the application
    /// Possible values: "error", "warn", "info", "debug", "trace"
    /// Default: "warn"
    #[arg(long, default_value_t = String::from("warn"))]
    pub logging_level: String,
}
