use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::application::origin::RequestOrigin;

/// Command-line arguments for the prerender binary.
#[derive(Debug, Parser)]
#[command(
    name = "prerender",
    version,
    about = "Server-side rendered blog post pages and sitemap"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "PRERENDER_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve post pages, sitemap.xml and robots.txt over HTTP.
    Serve(Box<ServeArgs>),
    /// Render one post page to stdout.
    Render(RenderArgs),
    /// Render the sitemap to stdout.
    Sitemap(SitemapArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StoreOverrides {
    /// Override the document store project identifier.
    #[arg(long = "store-project-id", value_name = "PROJECT")]
    pub store_project_id: Option<String>,

    /// Override the document store REST base URL.
    #[arg(long = "store-base-url", value_name = "URL", value_hint = ValueHint::Url)]
    pub store_base_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub store: StoreOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub store: StoreOverrides,

    /// Origin used for canonical URLs, e.g. `https://blog.example.com`.
    #[arg(long, value_name = "ORIGIN", value_parser = parse_origin)]
    pub origin: RequestOrigin,

    /// Identifier of the post document.
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Debug, Args, Clone)]
pub struct SitemapArgs {
    #[command(flatten)]
    pub store: StoreOverrides,

    /// Origin used for sitemap locations, e.g. `https://blog.example.com`.
    #[arg(long, value_name = "ORIGIN", value_parser = parse_origin)]
    pub origin: RequestOrigin,
}

fn parse_origin(value: &str) -> Result<RequestOrigin, String> {
    RequestOrigin::parse(value)
        .ok_or_else(|| format!("`{value}` is not an origin of the form scheme://host"))
}
