//! Shopwright CLI
//!
//! 用法：shopwright "find laptops under $1000"；不带参数时逐行读取 stdin，每行输出一个 JSON 响应。
//! 配置：config/default.toml 或 SHOPWRIGHT_CONFIG 指定的文件，SHOPWRIGHT__* 环境变量覆盖。

use std::path::PathBuf;

use anyhow::Context;
use shopwright::config::load_config_or_default;
use shopwright::core::{create_store_from_config, Orchestrator, OrchestratorBuilder};
use tokio::io::{AsyncBufReadExt, BufReader};

async fn handle(orchestrator: &Orchestrator, message: &str) -> anyhow::Result<()> {
    let response = orchestrator
        .process_message_with_timeout(message, orchestrator.request_timeout())
        .await
        .context("Message processing did not complete")?;
    let json = serde_json::to_string_pretty(&response).context("Failed to serialize response")?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shopwright::observability::init();

    let config_path = std::env::var("SHOPWRIGHT_CONFIG").ok().map(PathBuf::from);
    let cfg = load_config_or_default(config_path);
    let store = create_store_from_config(&cfg).await;
    let orchestrator = OrchestratorBuilder::new(cfg).with_store(store).build();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        return handle(&orchestrator, &args.join(" ")).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(e) = handle(&orchestrator, line).await {
            tracing::warn!("{:#}", e);
        }
    }
    Ok(())
}
