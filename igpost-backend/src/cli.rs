use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use igpost_backend::resolve::Credentials;

#[derive(Debug, Parser)]
#[command(
    name = "igpost",
    version,
    about = "HTTP façade and CLI for posting videos to Instagram"
)]
pub struct Cli {
    /// Path to configuration file (overrides IGPOST_CONFIG_PATH)
    #[arg(short = 'c', long)]
    pub config_path: Option<PathBuf>,

    /// Enable verbose logging of steps
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (the default when no subcommand is given)
    Serve,
    /// Upload a single video and print the post URL
    Upload(UploadArgs),
    /// Print the current account info as JSON
    Profile(ProfileArgs),
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Path to the video file to upload
    #[arg(short = 'v', long)]
    pub video: PathBuf,

    /// Caption/description for the video
    #[arg(short = 'd', long)]
    pub description: String,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,
}

#[derive(Debug, Args)]
pub struct CredentialArgs {
    /// Instagram username
    #[arg(short = 'u', long)]
    pub username: Option<String>,

    /// Instagram password
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// Previously issued session token, used as-is
    #[arg(long)]
    pub session_id: Option<String>,

    /// Path to persist/restore the session token
    #[arg(long)]
    pub session_file: Option<PathBuf>,
}

impl CredentialArgs {
    pub fn into_credentials(self) -> Credentials {
        Credentials {
            session_id: self.session_id,
            username: self.username,
            password: self.password,
            session_file: self.session_file.map(|p| p.display().to_string()),
        }
    }
}
