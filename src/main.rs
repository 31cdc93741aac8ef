use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use prompt_studio::connector::api::{Container, ContainerConfig, Router};
use prompt_studio::domain::{
    BackendConfig, PreviewBackendKind, DEFAULT_CHAT_MODEL, DEFAULT_CHAT_URL, DEFAULT_CHECKPOINT,
    DEFAULT_TIMEOUT_SECS,
};
use prompt_studio::Commands;

#[derive(Parser)]
#[command(name = "prompt-studio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Chat completions endpoint (full URL, /v1 root or bare host)
    #[arg(long, global = true, env = "PROMPT_STUDIO_CHAT_URL", default_value = DEFAULT_CHAT_URL)]
    chat_url: String,

    #[arg(long, global = true, env = "PROMPT_STUDIO_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    model: String,

    #[arg(long, global = true, env = "PROMPT_STUDIO_PREVIEW_URL")]
    preview_url: Option<String>,

    /// comfyui or automatic1111
    #[arg(long, global = true, env = "PROMPT_STUDIO_PREVIEW_BACKEND", default_value = "comfyui")]
    preview_backend: PreviewBackendKind,

    #[arg(long, global = true, env = "PROMPT_STUDIO_CHECKPOINT", default_value = DEFAULT_CHECKPOINT)]
    checkpoint: String,

    #[arg(long, global = true, env = "PROMPT_STUDIO_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[arg(long, global = true, env = "PROMPT_STUDIO_ENABLE_PREVIEW")]
    enable_preview: bool,

    /// Use in-process mock backends instead of LM Studio and the image server
    #[arg(long, global = true)]
    mock_backends: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let show_progress = matches!(cli.command, Commands::Compose { .. });
    let container = Container::new(ContainerConfig {
        backends: BackendConfig {
            chat_base_url: cli.chat_url,
            chat_model: cli.model,
            preview_base_url: cli.preview_url,
            preview_backend: cli.preview_backend,
            checkpoint: cli.checkpoint,
            request_timeout_secs: cli.timeout_secs,
            enable_preview: cli.enable_preview,
        },
        mock_backends: cli.mock_backends,
        show_progress,
    })?;

    let output = Router::new(&container).route(cli.command).await?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
