//! CLI definition using clap derive.

use clap::{Parser, Subcommand};

use agentdeck_core::types::TileRole;

#[derive(Parser)]
#[command(name = "agentdeck", about = "multi-agent session console")]
pub struct Cli {
    /// Gateway UDS socket path (default: $XDG_RUNTIME_DIR/agentdeck/gateway.sock)
    #[arg(long, short = 's', global = true)]
    pub socket_path: Option<String>,

    /// State directory (default: $AGENTDECK_STATE_DIR or ~/.agentdeck)
    #[arg(long, global = true, env = "AGENTDECK_STATE_DIR")]
    pub state_dir: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the engine: apply gateway events to the tile document
    Run,
    /// List projects and tiles
    Ls,
    /// Create an agent tile
    Create(CreateOpts),
    /// Remove a tile and its agent artifacts
    Rm(RmOpts),
    /// Print a tile's transcript as activity blocks
    Show(ShowOpts),
    /// Send a message to a tile's session
    Send(SendOpts),
    /// Send a message to every active tile in a project
    Broadcast(BroadcastOpts),
    /// List selectable models
    Models,
}

#[derive(clap::Args)]
pub struct CreateOpts {
    /// Project id (default: the active project)
    #[arg(long)]
    pub project: Option<String>,

    /// Display name for the agent
    pub name: String,

    /// Agent role: coding, research, or marketing
    #[arg(long, default_value = "coding")]
    pub role: TileRole,
}

#[derive(clap::Args)]
pub struct RmOpts {
    #[arg(long)]
    pub project: Option<String>,

    /// Tile id
    pub tile: String,
}

#[derive(clap::Args)]
pub struct ShowOpts {
    #[arg(long)]
    pub project: Option<String>,

    /// Tile id
    pub tile: String,
}

#[derive(clap::Args)]
pub struct SendOpts {
    #[arg(long)]
    pub project: Option<String>,

    /// Tile id
    pub tile: String,

    /// Message text
    pub message: String,
}

#[derive(clap::Args)]
pub struct BroadcastOpts {
    #[arg(long)]
    pub project: Option<String>,

    /// Message text
    pub message: String,
}

/// Default socket path using $USER for per-user isolation.
pub fn default_socket_path() -> String {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        return format!("{dir}/agentdeck/gateway.sock");
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    format!("/tmp/agentdeck-{user}/gateway.sock")
}
