//! agentdeck: multi-agent session console runtime binary.
//!
//! `run` keeps the persisted tile document in step with the gateway
//! event stream; the other subcommands are one-shot operations against
//! the same document and gateway.

use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;

use agentdeck_gateway::channel::ChannelGateway;
use agentdeck_gateway::client::GatewayClient;
use agentdeck_store::document::JsonDocumentStore;
use agentdeck_store::router::RouteOutcome;
use agentdeck_sync::paths::{expand_home, projects_doc_path, resolve_state_dir};

mod cli;
mod service;
mod uds;

use service::SessionService;
use uds::UdsGateway;

fn resolve_dirs(args: &cli::Cli) -> (PathBuf, PathBuf) {
    let state_dir = args
        .state_dir
        .as_deref()
        .map(expand_home)
        .unwrap_or_else(resolve_state_dir);
    let doc_path = projects_doc_path(&state_dir);
    (state_dir, doc_path)
}

fn open_service<G: GatewayClient>(
    gateway: G,
    state_dir: PathBuf,
    doc_path: PathBuf,
) -> anyhow::Result<SessionService<G, JsonDocumentStore>> {
    Ok(SessionService::open(
        gateway,
        JsonDocumentStore::new(doc_path),
        state_dir,
    )?)
}

/// Gateway stand-in for subcommands that never leave the local state
/// directory. Any accidental RPC fails fast as a closed connection.
fn offline_gateway() -> ChannelGateway {
    let (gateway, _requests) = ChannelGateway::new();
    gateway
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = std::env::var("AGENTDECK_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let socket_path = args
        .socket_path
        .clone()
        .unwrap_or_else(cli::default_socket_path);
    let (state_dir, doc_path) = resolve_dirs(&args);

    match args.command {
        cli::Command::Run => {
            let gateway = UdsGateway::connect(&socket_path).await?;
            let mut service = open_service(gateway, state_dir, doc_path)?;
            run_event_loop(&mut service).await?;
        }
        cli::Command::Ls => {
            let service = open_service(offline_gateway(), state_dir, doc_path)?;
            print_tiles(&service);
        }
        cli::Command::Create(opts) => {
            let mut service = open_service(offline_gateway(), state_dir, doc_path)?;
            let project_id = match opts.project.as_deref() {
                Some(id) => service.resolve_project(Some(id))?,
                None => service.ensure_active_project(Utc::now())?,
            };
            let (address, warnings) =
                service.create_tile(&project_id, &opts.name, opts.role, Utc::now())?;
            println!("created {} in {}", address.tile_id, address.project_id);
            print_warnings(&warnings);
        }
        cli::Command::Rm(opts) => {
            let mut service = open_service(offline_gateway(), state_dir, doc_path)?;
            let project_id = service.resolve_project(opts.project.as_deref())?;
            let warnings = service.delete_tile(&project_id, &opts.tile, Utc::now())?;
            println!("removed {}", opts.tile);
            print_warnings(&warnings);
        }
        cli::Command::Show(opts) => {
            let service = open_service(offline_gateway(), state_dir, doc_path)?;
            let project_id = service.resolve_project(opts.project.as_deref())?;
            print_transcript(&service, &project_id, &opts.tile)?;
        }
        cli::Command::Send(opts) => {
            let gateway = UdsGateway::connect(&socket_path).await?;
            let mut service = open_service(gateway, state_dir, doc_path)?;
            let project_id = service.resolve_project(opts.project.as_deref())?;
            service
                .send_message(&project_id, &opts.tile, &opts.message, Utc::now())
                .await?;
        }
        cli::Command::Broadcast(opts) => {
            let gateway = UdsGateway::connect(&socket_path).await?;
            let mut service = open_service(gateway, state_dir, doc_path)?;
            let project_id = service.resolve_project(opts.project.as_deref())?;
            let delivered = service
                .broadcast(&project_id, &opts.message, Utc::now())
                .await?;
            println!("delivered to {delivered} agent(s)");
        }
        cli::Command::Models => {
            let gateway = UdsGateway::connect(&socket_path).await?;
            let service = open_service(gateway, state_dir, doc_path)?;
            for model in service.list_models().await? {
                let name = model.name.as_deref().unwrap_or(&model.id);
                let reasoning = if model.reasoning { " [reasoning]" } else { "" };
                println!("{}\t{name}{reasoning}", model.id);
            }
        }
    }
    Ok(())
}

/// Apply gateway frames to the document until the stream ends or the
/// process is interrupted.
async fn run_event_loop<G: GatewayClient>(
    service: &mut SessionService<G, JsonDocumentStore>,
) -> anyhow::Result<()> {
    let mut events = service.subscribe();
    tracing::info!("agentdeck engine running");
    loop {
        tokio::select! {
            frame = events.recv() => match frame {
                Ok(frame) => {
                    match service.handle_frame(&frame, Utc::now())? {
                        Some(RouteOutcome::Applied { project_id, tile_id }) => {
                            tracing::debug!(project_id, tile_id, "applied frame");
                        }
                        Some(RouteOutcome::UnknownSession) | Some(RouteOutcome::NoChange) | None => {}
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "event stream lagged; frames dropped");
                }
                Err(RecvError::Closed) => {
                    tracing::info!("gateway stream closed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }
    Ok(())
}

fn print_tiles<G: GatewayClient>(service: &SessionService<G, JsonDocumentStore>) {
    for project in &service.store().doc().projects {
        println!("{} ({})", project.name, project.id);
        for tile in &project.tiles {
            if tile.archived_at.is_some() {
                continue;
            }
            println!(
                "  {}  {}  [{}]  {}  {}",
                tile.id, tile.name, tile.role, tile.status, tile.session_key
            );
        }
    }
}

fn print_transcript<G: GatewayClient>(
    service: &SessionService<G, JsonDocumentStore>,
    project_id: &str,
    tile_id: &str,
) -> anyhow::Result<()> {
    let tile = service
        .store()
        .tile(project_id, tile_id)
        .ok_or_else(|| anyhow::anyhow!("unknown tile: {tile_id}"))?;
    println!("{} [{}] {}", tile.name, tile.role, tile.status);
    let blocks = agentdeck_core::transcript::segment(
        &tile.output_lines,
        tile.stream_text.as_deref(),
        tile.thinking_trace.as_deref(),
    );
    for block in blocks {
        if let Some(user) = &block.user {
            println!("you> {user}");
        }
        for trace in &block.traces {
            for line in trace.lines() {
                println!("  .. {line}");
            }
        }
        for line in &block.assistant {
            println!("  {line}");
        }
    }
    Ok(())
}

fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}
