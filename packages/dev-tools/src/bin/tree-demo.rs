//! Category Tree Demo Binary
//!
//! Seeds a small category tree, then renames and moves subtrees and prints
//! the materialized paths after each step. Useful for eyeballing cascades
//! and for inspecting the event stream as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin tree-demo
//!
//! # Custom database and verbose logging
//! NODEPATH_DB_PATH=/tmp/demo.db RUST_LOG=nodepath_core=debug cargo run --bin tree-demo
//! ```
//!
//! # Environment Variables
//!
//! - `NODEPATH_DB_PATH`: Database file (default: `nodepath-demo.db` in the temp dir)
//! - `NODEPATH_*`: Any other engine setting, see `TreeConfig::from_env`
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")
//!
//! The demo owns its database: any tree left by a previous run is deleted
//! (cascade) before seeding.

use std::env;

use nodepath_core::{CreateNodeParams, DeletePolicy, Node, TreeConfig, TreeService};

/// (key, label, parent key)
const SEED: &[(&str, &str, Option<&str>)] = &[
    ("top", "Top", None),
    ("science", "Science", Some("top")),
    ("maths", "Mathematics", Some("science")),
    ("biology", "Biology", Some("science")),
    ("genetics", "Genetics", Some("biology")),
    ("neuroscience", "Neuroscience", Some("biology")),
    ("sport", "Sport", Some("top")),
    ("rugby", "Rugby", Some("sport")),
    ("football", "Football", Some("sport")),
    ("champions_league", "Champions League", Some("football")),
    ("world_cup", "World Cup", Some("football")),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = TreeConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    if env::var_os("NODEPATH_DB_PATH").is_none() {
        config.database_path = env::temp_dir().join("nodepath-demo.db");
    }
    config.delete_policy = DeletePolicy::Cascade;

    tracing::info!("Database: {}", config.database_path.display());
    let service = TreeService::open(&config).await?;

    let mut events = service.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => tracing::debug!(event = event.event_type(), "{}", json),
                Err(e) => tracing::warn!("Failed to encode event: {}", e),
            }
        }
    });

    for root in service.get_roots().await? {
        let removed = service.delete_node(&root.id).await?;
        tracing::info!(key = %root.key, removed = removed.removed, "Cleared previous tree");
    }

    for (key, label, parent_key) in SEED {
        let params = match parent_key {
            Some(parent_key) => {
                let parent = service
                    .get_node_by_key(parent_key)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("seed parent '{}' missing", parent_key))?;
                CreateNodeParams::child(*key, *label, parent.id)
            }
            None => CreateNodeParams::root(*key, *label),
        };
        service.create_node(params).await?;
    }

    let top = require(&service, "top").await?;
    print_tree("Seeded", &service.descendants(&top.id).await?);

    let science = require(&service, "science").await?;
    service.rename_node(&science.id, "magic").await?;
    print_tree("Renamed science -> magic", &service.descendants(&top.id).await?);

    let biology = require(&service, "biology").await?;
    service.move_node(&biology.id, Some(&top.id)).await?;
    print_tree("Moved biology under top", &service.descendants(&top.id).await?);

    let neuroscience = require(&service, "neuroscience").await?;
    let chain: Vec<String> = service
        .ancestors(&neuroscience.id)
        .await?
        .into_iter()
        .map(|n| n.key)
        .collect();
    println!("\nAncestors of neuroscience: {}", chain.join(" > "));

    if let Err(e) = service.move_node(&top.id, Some(&biology.id)).await {
        println!("Moving top under biology rejected: {}", e);
    }

    let drift = service.verify_integrity().await?;
    println!("\nIntegrity: {} drifted path(s)", drift.len());
    if !drift.is_empty() {
        println!("{}", serde_json::to_string_pretty(&drift)?);
    }

    drop(service);
    printer.await?;
    Ok(())
}

async fn require(service: &TreeService, key: &str) -> anyhow::Result<Node> {
    service
        .get_node_by_key(key)
        .await?
        .ok_or_else(|| anyhow::anyhow!("node '{}' not found", key))
}

fn print_tree(title: &str, nodes: &[Node]) {
    println!("\n{}:", title);
    for node in nodes {
        let indent = "  ".repeat(node.depth().saturating_sub(1));
        println!("  {}{:<20} {}", indent, node.key, node.path);
    }
}
