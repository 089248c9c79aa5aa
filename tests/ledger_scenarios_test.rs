//! Integration tests for the position ledger, change recorder and snapshot writer.

use position_ledger::domain::ids::{change_id, snapshot_id};
use position_ledger::engine::ShardConfig;
use position_ledger::orchestration::{ChangeOutcome, SkipReason};
use position_ledger::protocols::FixedInvestment;
use position_ledger::{
    db::init_db, Address, Amount, BlockRef, EventContext, InvestmentHelper, Ledger, LedgerError,
    PositionChangeAction, PositionKind, PositionParams, Repository, TxHash,
};
use std::sync::Arc;
use tempfile::TempDir;

const CHAIN: &str = "linea";

async fn setup_test_db() -> (Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    (Arc::new(Repository::new(pool)), temp_dir)
}

fn addr(b: u8) -> Address {
    Address::new([b; 20])
}

fn vault() -> FixedInvestment {
    FixedInvestment::new("Vault", addr(0xaa), vec![addr(0x01)])
}

fn farm() -> FixedInvestment {
    FixedInvestment::new("Farm", addr(0xbb), vec![addr(0x01), addr(0x02)])
        .with_reward_tokens(vec![addr(0x03)])
}

fn ctx(block: u64, tx: &str, log_index: u32) -> EventContext {
    EventContext::new(BlockRef::new(block, block * 12), TxHash::new(tx), log_index)
}

fn amounts(values: &[i64]) -> Vec<Amount> {
    values.iter().map(|v| Amount::from(*v)).collect()
}

fn params(owner: Address, inputs: &[i64]) -> PositionParams {
    PositionParams::new(owner, PositionKind::Invest, amounts(inputs))
}

#[tokio::test]
async fn test_deposit_creates_position_change_snapshot_and_holder() {
    let (repo, _temp) = setup_test_db().await;
    let ledger = Ledger::new(repo.clone(), CHAIN, ShardConfig::single());
    let helper = vault();
    let owner = addr(0x11);

    let outcome = ledger
        .record_change(
            &ctx(100, "0xaa01", 0),
            PositionChangeAction::Deposit,
            &helper,
            &params(owner, &[100]),
            &amounts(&[100]),
            &[],
        )
        .await
        .unwrap();

    let (position, change) = match outcome {
        ChangeOutcome::Recorded {
            position,
            change,
            inserted,
        } => {
            assert!(inserted);
            (position, change)
        }
        other => panic!("Expected Recorded, got {:?}", other),
    };
    assert_eq!(position.amounts, amounts(&[100]));
    assert_eq!(position.initial_amounts, amounts(&[100]));
    assert!(!position.closed);
    assert_eq!(change.d_amounts, amounts(&[100]));
    assert_eq!(change.after_amounts, amounts(&[100]));

    let investment_id = helper.investment_id(CHAIN);
    let stored = ledger.require_position(&investment_id, &owner, "").await.unwrap();
    assert_eq!(stored, position);

    let changes = repo.list_changes(&position.id).await.unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].id, change_id(&TxHash::new("0xaa01"), 0));

    let snapshots = repo.list_snapshots(&position.id).await.unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].amounts, amounts(&[100]));
    assert_eq!(snapshots[0].block_timestamp, 1200);

    let holders = repo.list_holders(&investment_id).await.unwrap();
    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0].owner, owner);

    let protocol = repo
        .get_protocol(&helper.protocol_id(CHAIN))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(protocol.name, "Vault");
    assert_eq!(protocol.batch_cursor, 0);
}

#[tokio::test]
async fn test_withdraw_keeps_initial_amounts() {
    let (repo, _temp) = setup_test_db().await;
    let ledger = Ledger::new(repo.clone(), CHAIN, ShardConfig::single());
    let helper = vault();
    let owner = addr(0x11);

    ledger
        .record_change(
            &ctx(100, "0xaa01", 0),
            PositionChangeAction::Deposit,
            &helper,
            &params(owner, &[100]),
            &amounts(&[100]),
            &[],
        )
        .await
        .unwrap();
    let outcome = ledger
        .record_change(
            &ctx(101, "0xaa02", 3),
            PositionChangeAction::Withdraw,
            &helper,
            &params(owner, &[40]),
            &amounts(&[-60]),
            &[],
        )
        .await
        .unwrap();

    let ChangeOutcome::Recorded { position, change, .. } = outcome else {
        panic!("Expected Recorded");
    };
    assert_eq!(position.amounts, amounts(&[40]));
    assert_eq!(position.initial_amounts, amounts(&[100]));
    assert!(!position.closed);
    assert_eq!(change.d_amounts, amounts(&[-60]));
    assert_eq!(change.after_amounts, amounts(&[40]));

    let changes = repo.list_changes(&position.id).await.unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[1].action, PositionChangeAction::Withdraw);
    assert_eq!(repo.list_snapshots(&position.id).await.unwrap().len(), 2);
    // holders are added once
    assert_eq!(
        repo.list_holders(&helper.investment_id(CHAIN)).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_full_withdraw_closes_position() {
    let (repo, _temp) = setup_test_db().await;
    let ledger = Ledger::new(repo.clone(), CHAIN, ShardConfig::single());
    let helper = vault();
    let owner = addr(0x11);

    for (block, tx, value, delta) in [(1u64, "0x01", 50i64, 50i64), (2, "0x02", 0, -50)] {
        ledger
            .record_change(
                &ctx(block, tx, 0),
                PositionChangeAction::Deposit,
                &helper,
                &params(owner, &[value]),
                &amounts(&[delta]),
                &[],
            )
            .await
            .unwrap();
    }

    let investment_id = helper.investment_id(CHAIN);
    let position = ledger.require_position(&investment_id, &owner, "").await.unwrap();
    assert!(position.closed);
    assert!(repo.list_open_positions(&helper.protocol_id(CHAIN)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_open_rewards_keep_position_open() {
    let (repo, _temp) = setup_test_db().await;
    let ledger = Ledger::new(repo, CHAIN, ShardConfig::single());
    let helper = farm();
    let owner = addr(0x11);

    let outcome = ledger
        .record_change(
            &ctx(5, "0x05", 1),
            PositionChangeAction::Withdraw,
            &helper,
            &params(owner, &[0, 0]).with_rewards(amounts(&[7])),
            &amounts(&[-10, -20]),
            &amounts(&[7]),
        )
        .await
        .unwrap();
    let ChangeOutcome::Recorded { position, change, .. } = outcome else {
        panic!("Expected Recorded");
    };
    assert_eq!(position.input_count, 2);
    assert_eq!(position.amounts, amounts(&[0, 0, 7]));
    assert_eq!(position.reward_amounts(), amounts(&[7]).as_slice());
    assert!(!position.closed);
    assert_eq!(change.d_amounts, amounts(&[-10, -20, 7]));
}

#[tokio::test]
async fn test_replayed_change_is_not_duplicated() {
    let (repo, _temp) = setup_test_db().await;
    let ledger = Ledger::new(repo.clone(), CHAIN, ShardConfig::single());
    let helper = vault();
    let owner = addr(0x11);

    let event = ctx(100, "0xaa01", 4);
    let p = params(owner, &[100]);
    let first = ledger
        .record_change(&event, PositionChangeAction::Deposit, &helper, &p, &amounts(&[100]), &[])
        .await
        .unwrap();
    let second = ledger
        .record_change(&event, PositionChangeAction::Deposit, &helper, &p, &amounts(&[100]), &[])
        .await
        .unwrap();

    assert!(matches!(first, ChangeOutcome::Recorded { inserted: true, .. }));
    let ChangeOutcome::Recorded { position, inserted, .. } = second else {
        panic!("Expected Recorded");
    };
    assert!(!inserted);
    assert_eq!(position.amounts, amounts(&[100]));
    assert_eq!(repo.list_changes(&position.id).await.unwrap().len(), 1);
    assert_eq!(repo.list_snapshots(&position.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_zero_deltas_are_noop() {
    let (repo, _temp) = setup_test_db().await;
    let ledger = Ledger::new(repo.clone(), CHAIN, ShardConfig::single());
    let helper = vault();

    let outcome = ledger
        .record_change(
            &ctx(1, "0x01", 0),
            PositionChangeAction::Harvest,
            &helper,
            &params(addr(0x11), &[0]),
            &amounts(&[0]),
            &[],
        )
        .await
        .unwrap();
    assert_eq!(outcome, ChangeOutcome::Skipped(SkipReason::NoOp));
    // nothing was created, not even the investment
    assert!(repo.get_investment(&helper.investment_id(CHAIN)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_other_shard_is_skipped_before_any_write() {
    let (repo, _temp) = setup_test_db().await;
    // prefix shard of [0x11; 20] over 2 shards is 1
    let ledger = Ledger::new(repo.clone(), CHAIN, ShardConfig::new(0, 2));
    let helper = vault();
    assert!(!ledger.admits(&addr(0x11)));
    assert!(ledger.admits(&addr(0x22)));

    let outcome = ledger
        .record_change(
            &ctx(1, "0x01", 0),
            PositionChangeAction::Deposit,
            &helper,
            &params(addr(0x11), &[100]),
            &amounts(&[100]),
            &[],
        )
        .await
        .unwrap();
    assert_eq!(outcome, ChangeOutcome::Skipped(SkipReason::OtherShard));

    let snapshot = ledger
        .snapshot_position(BlockRef::new(2, 24), &helper, &params(addr(0x11), &[100]))
        .await
        .unwrap();
    assert!(snapshot.is_none());
    assert!(repo.get_investment(&helper.investment_id(CHAIN)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_shape_mismatch_rolls_back() {
    let (repo, _temp) = setup_test_db().await;
    let ledger = Ledger::new(repo.clone(), CHAIN, ShardConfig::single());
    let helper = farm();
    let owner = addr(0x11);

    let err = ledger
        .record_change(
            &ctx(1, "0x01", 0),
            PositionChangeAction::Deposit,
            &helper,
            &params(owner, &[10, 20]).with_rewards(amounts(&[0])),
            &amounts(&[10, 20]),
            &[],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ShapeMismatch(_)));

    // first-use investment and protocol creation roll back with the position
    let investment_id = helper.investment_id(CHAIN);
    assert!(repo.get_investment(&investment_id).await.unwrap().is_none());
    assert!(repo.get_protocol(&helper.protocol_id(CHAIN)).await.unwrap().is_none());
    assert!(ledger.find_position(&investment_id, &owner, "").await.unwrap().is_none());
    assert!(repo.list_holders(&investment_id).await.unwrap().is_empty());

    // a later well-formed change creates everything in one go
    ledger
        .record_change(
            &ctx(2, "0x02", 0),
            PositionChangeAction::Deposit,
            &helper,
            &params(owner, &[10, 20]).with_rewards(amounts(&[0])),
            &amounts(&[10, 20]),
            &amounts(&[0]),
        )
        .await
        .unwrap();
    assert!(repo.get_investment(&investment_id).await.unwrap().is_some());
    assert_eq!(repo.list_holders(&investment_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_upsert_is_idempotent() {
    let (repo, _temp) = setup_test_db().await;
    let ledger = Ledger::new(repo.clone(), CHAIN, ShardConfig::single());
    let helper = vault();
    let investment = ledger
        .get_or_create_investment(&helper, BlockRef::new(1, 12))
        .await
        .unwrap();

    let p = params(addr(0x11), &[75]).with_meta(vec!["note".to_string()]);
    let first = ledger
        .upsert_position(&investment.id, &p, BlockRef::new(2, 24))
        .await
        .unwrap();
    let second = ledger
        .upsert_position(&investment.id, &p, BlockRef::new(2, 24))
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(repo.list_positions(&investment.id).await.unwrap().len(), 1);
    assert_eq!(second.meta, vec!["note".to_string()]);
}

#[tokio::test]
async fn test_upsert_unknown_investment_is_not_found() {
    let (repo, _temp) = setup_test_db().await;
    let ledger = Ledger::new(repo, CHAIN, ShardConfig::single());
    let err = ledger
        .upsert_position(
            &vault().investment_id(CHAIN),
            &params(addr(0x11), &[1]),
            BlockRef::new(1, 12),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[tokio::test]
async fn test_tags_separate_positions() {
    let (repo, _temp) = setup_test_db().await;
    let ledger = Ledger::new(repo.clone(), CHAIN, ShardConfig::single());
    let helper = vault();
    let owner = addr(0x11);

    ledger
        .snapshot_position(BlockRef::new(1, 12), &helper, &params(owner, &[5]).with_tag("a"))
        .await
        .unwrap();
    ledger
        .snapshot_position(BlockRef::new(1, 12), &helper, &params(owner, &[9]).with_tag("b"))
        .await
        .unwrap();

    let investment_id = helper.investment_id(CHAIN);
    let a = ledger.require_position(&investment_id, &owner, "a").await.unwrap();
    let b = ledger.require_position(&investment_id, &owner, "b").await.unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(a.amounts, amounts(&[5]));
    assert_eq!(b.amounts, amounts(&[9]));
    assert!(ledger.find_position(&investment_id, &owner, "").await.unwrap().is_none());
    assert_eq!(repo.list_holders(&investment_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_snapshot_same_block_overwrites() {
    let (repo, _temp) = setup_test_db().await;
    let ledger = Ledger::new(repo.clone(), CHAIN, ShardConfig::single());
    let helper = vault();
    let owner = addr(0x11);
    let block = BlockRef::new(7, 84);

    ledger
        .snapshot_position(block, &helper, &params(owner, &[10]))
        .await
        .unwrap();
    let position = ledger
        .snapshot_position(block, &helper, &params(owner, &[12]))
        .await
        .unwrap()
        .unwrap();

    let snapshots = repo.list_snapshots(&position.id).await.unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].id, snapshot_id(&position.id, 7));
    assert_eq!(snapshots[0].amounts, amounts(&[12]));
}

#[tokio::test]
async fn test_update_investment_meta() {
    let (repo, _temp) = setup_test_db().await;
    let ledger = Ledger::new(repo.clone(), CHAIN, ShardConfig::single());
    let investment = ledger
        .get_or_create_investment(&vault().with_meta(vec!["0".to_string()]), BlockRef::new(1, 12))
        .await
        .unwrap();
    assert_eq!(investment.meta, vec!["0".to_string()]);

    ledger
        .update_investment_meta(&investment.id, vec!["5".to_string(), "6".to_string()])
        .await
        .unwrap();
    let stored = repo.get_investment(&investment.id).await.unwrap().unwrap();
    assert_eq!(stored.meta, vec!["5".to_string(), "6".to_string()]);

    let err = ledger
        .update_investment_meta(&investment.id, vec!["x".to_string(); 9])
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
}
