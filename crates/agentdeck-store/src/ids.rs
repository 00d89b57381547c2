//! Identity minting for tiles, agents, and gateway sessions.

use uuid::Uuid;

/// Mint a tile id.
pub fn new_tile_id() -> String {
    format!("tile-{}", Uuid::new_v4())
}

/// Mint a project id.
pub fn new_project_id() -> String {
    format!("proj-{}", Uuid::new_v4())
}

/// Mint an agent id from a display name: a lowercase slug plus a short
/// random suffix so renames never collide.
pub fn new_agent_id(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-').to_string();
    let slug = if slug.is_empty() { "agent".to_string() } else { slug };
    let suffix = &Uuid::new_v4().simple().to_string()[..8];
    format!("{slug}-{suffix}")
}

/// Session key correlating a tile to exactly one gateway conversation.
pub fn session_key_for(agent_id: &str) -> String {
    format!("agent:{agent_id}:main")
}
