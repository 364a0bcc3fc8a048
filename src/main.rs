//! Taskboard CLI Entry Point
//!
//! `taskboard [config.json]` restores the session, loads the boards and
//! prints them as an indented table.

use std::sync::Arc;

use taskboard::account::FileTokenStore;
use taskboard::status::progress;
use taskboard::tree::RowKind;
use taskboard::{AccountSession, BoardEngine, ClientConfig, HttpApi, SyncResult};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("taskboard: {}", e);
            std::process::exit(2);
        }
    };

    match rolling_logger::init_logger(&config.log_dir, "taskboard") {
        Ok(()) => {
            if let Some(path) = rolling_logger::log_file_path() {
                rolling_logger::info(&format!("logging to {}", path.display()));
            }
        }
        Err(e) => eprintln!("taskboard: logger disabled: {}", e),
    }

    if let Err(e) = run(config).await {
        rolling_logger::error(&format!("taskboard failed: {}", e));
        eprintln!("taskboard: {}", e);
        std::process::exit(1);
    }
}

fn load_config() -> SyncResult<ClientConfig> {
    match std::env::args().nth(1) {
        Some(path) => ClientConfig::from_file(path),
        None => Ok(ClientConfig::default().with_env_overrides()),
    }
}

async fn run(config: ClientConfig) -> SyncResult<()> {
    info!(api = %config.api_base_url, "starting");

    let tokens = Arc::new(FileTokenStore::new(&config.token_path));
    let api = Arc::new(HttpApi::new(&config, tokens.clone())?);

    let session = AccountSession::new(api.clone(), tokens);
    match session.load_user().await? {
        Some(user) => println!("Signed in as {} <{}>", user.full_name, user.email),
        None => {
            rolling_logger::warn("no stored session, requests are sent without a token");
            println!("Not signed in");
        }
    }

    let engine = BoardEngine::new(api, config.engine.clone());
    engine.load().await?;

    let tree = engine.snapshot();
    for row in tree.flatten() {
        let mark = if row.done { "[x]" } else { "[ ]" };
        let indent = "  ".repeat(row.depth);
        match row.kind {
            RowKind::Board => println!("{}{} {} (#{})", indent, mark, row.label, row.id),
            RowKind::Todo | RowKind::SubTask => println!("{}{} {}", indent, mark, row.label),
        }
    }

    let (done, total) = progress(&tree);
    println!(
        "{} boards, {}/{} sub-tasks done, all done: {}",
        tree.len(),
        done,
        total,
        engine.all_done()
    );

    engine.shutdown();
    Ok(())
}
