use anyhow::Context;
use position_ledger::orchestration::LedgerInput;
use position_ledger::{config::Config, db::init_db, Ledger, Replayer, Repository};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;

    let pool = init_db(&config.database_path)
        .await
        .with_context(|| format!("Failed to initialize database at {}", config.database_path))?;
    let repo = Arc::new(Repository::new(pool));
    let ledger = Ledger::new(repo, config.chain.clone(), config.shard);
    let mut replayer = Replayer::new(ledger, config.reconcile);

    match &config.replay_path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path))?;
            replay(BufReader::new(file), &mut replayer).await?;
        }
        None => replay(BufReader::new(tokio::io::stdin()), &mut replayer).await?,
    }

    let summary = replayer.summary();
    tracing::info!(
        changes = summary.changes,
        duplicate_changes = summary.duplicate_changes,
        skipped = summary.skipped,
        snapshots = summary.snapshots,
        batches = summary.batches,
        refreshed = summary.refreshed,
        failed_reads = summary.failed_reads,
        "replay complete"
    );
    Ok(())
}

async fn replay<R: AsyncBufRead + Unpin>(reader: R, replayer: &mut Replayer) -> anyhow::Result<()> {
    let mut lines = reader.lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let input: LedgerInput = serde_json::from_str(&line)
            .with_context(|| format!("Invalid ledger input on line {}", line_no))?;
        replayer
            .apply(input)
            .await
            .with_context(|| format!("Failed to apply line {}", line_no))?;
    }
    Ok(())
}
