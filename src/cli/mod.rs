use std::path::PathBuf;

use clap::Subcommand;

use crate::domain::StyleValue;

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a cinematic SDXL prompt in one chat call
    Generate {
        /// Character name, e.g. "Aria Nightshade"
        name: String,

        /// Style hint as key=value; a bare key or key=true sets a flag
        #[arg(short, long = "style", value_name = "KEY=VALUE", value_parser = parse_style_pair)]
        styles: Vec<(String, StyleValue)>,

        /// Render a preview image after the prompt is ready
        #[arg(long)]
        preview: bool,

        /// Where to save an inline preview image
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a structured prompt facet by facet (one chat call per facet)
    Compose {
        name: String,

        /// Print the structure as JSON
        #[arg(long)]
        json: bool,

        #[arg(long)]
        preview: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Describe an image with the chat server's vision model
    Caption {
        /// PNG, JPEG, WebP or GIF file
        image: PathBuf,

        /// Override the detected image type, e.g. image/jpeg
        #[arg(long)]
        mime_type: Option<String>,

        /// Use the caption as the character input and generate a prompt
        #[arg(long)]
        generate: bool,
    },

    /// Probe the configured backends
    Check,

    /// Start the local HTTP API on 127.0.0.1
    Serve {
        #[arg(short, long, default_value = "8710")]
        port: u16,
    },
}

/// Parse `key=value` (or a bare `key`) into a style option.
pub fn parse_style_pair(raw: &str) -> Result<(String, StyleValue), String> {
    let (key, value) = match raw.split_once('=') {
        Some((key, value)) => (key.trim(), StyleValue::parse(value)),
        None => (raw.trim(), StyleValue::Flag(true)),
    };
    if key.is_empty() {
        return Err(format!("style option '{}' has no name", raw));
    }
    Ok((key.to_string(), value))
}
