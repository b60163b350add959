//! Server command-line configuration.

use std::path::PathBuf;

use clap::Parser;

use authlens_core::TargetLayer;

/// authlens inference server.
#[derive(Debug, Parser)]
#[command(name = "authlens-server")]
#[command(author, version)]
#[command(about = "Deepfake detection HTTP service with GradCAM explanations")]
pub struct ServerConfig {
    /// Path to the detector checkpoint (named-MessagePack weights).
    #[arg(long, value_name = "PATH", required_unless_present = "random_init")]
    pub weights: Option<PathBuf>,

    /// Use randomly initialized weights instead of a checkpoint
    /// (demo and testing only; predictions are meaningless).
    #[arg(long)]
    pub random_init: bool,

    /// Layer whose activations feed the GradCAM explanation
    /// ('entry' or 'blockN').
    #[arg(long, default_value = "block3", value_name = "LAYER")]
    pub target_layer: TargetLayer,

    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 5001)]
    pub port: u16,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
