//! Liquidity Flow Tests
//!
//! Provision a pool on the in-memory exchange, then deposit and withdraw
//! through the operator and check the balance receipts.

use amm::plan_add_liquidity;
use lpkit_config::HarnessConfig;
use provisioning::testing::{SandboxCall, SandboxExchange};
use provisioning::{
    BalanceChange, CreatorError, Holding, LiquidityAction, LiquidityOperator, LiquiditySettings,
    ProvisionError, ProvisioningWorkflow, ResourceCreator, ResourceKind,
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;
use types::{AccountId, BaseUnitAmount, LiquidityError, PoolId, PoolSide, SlippageTolerance};

const ONE: BaseUnitAmount = BaseUnitAmount(1_000_000);

struct Harness {
    _temp_dir: TempDir,
    exchange: Arc<SandboxExchange>,
    operator: LiquidityOperator,
    pool_id: PoolId,
}

async fn provisioned(configure: impl FnOnce(&mut HarnessConfig)) -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let mut config = HarnessConfig::default();
    config.cache.dir = temp_dir.path().to_path_buf();
    config.market.base_mint = "MintA111".to_string();
    config.market.quote_mint = "MintB111".to_string();
    config.network.confirmation_wait_secs = 0;
    configure(&mut config);

    let owner = AccountId::new("Owner111");
    let exchange = Arc::new(SandboxExchange::new(owner.clone()));
    let workflow = ProvisioningWorkflow::new(&config, exchange.clone(), exchange.clone()).unwrap();
    workflow.ensure_mints().await.unwrap();
    let resources = workflow.provision().await.unwrap();

    let settings = LiquiditySettings::from_config(&config, owner);
    let operator = LiquidityOperator::new(settings, exchange.clone(), exchange.clone());

    Harness {
        _temp_dir: temp_dir,
        exchange,
        operator,
        pool_id: resources.pool.address,
    }
}

#[tokio::test]
async fn test_add_then_remove_liquidity() {
    let harness = provisioned(|config| {
        config.liquidity.slippage = SlippageTolerance::from_percent(4).unwrap();
    })
    .await;
    let reads_before = harness.exchange.calls(SandboxCall::PoolState).await;

    let (added, removed) = harness
        .operator
        .add_remove_liquidity(&harness.pool_id)
        .await
        .unwrap();

    // Each step plans against its own pool snapshot
    assert_eq!(
        harness.exchange.calls(SandboxCall::PoolState).await,
        reads_before + 2
    );

    // One base token at 1:1 reserves buys one share token
    assert_eq!(added.change(Holding::Share), BalanceChange::Increased(ONE));
    assert_eq!(added.change(Holding::Base), BalanceChange::Decreased(ONE));
    assert_eq!(added.change(Holding::Quote), BalanceChange::Decreased(ONE));
    match &added.action {
        LiquidityAction::Add(plan) => {
            assert_eq!(plan.fixed_side, PoolSide::Base);
            assert_eq!(plan.fixed_amount, ONE);
            assert_eq!(plan.other_amount_min, BaseUnitAmount(960_000));
            assert_eq!(plan.other_amount_max, BaseUnitAmount(1_040_000));
        }
        other => panic!("expected deposit, got {:?}", other),
    }

    assert_eq!(removed.change(Holding::Share), BalanceChange::Decreased(ONE));
    assert_eq!(removed.change(Holding::Base), BalanceChange::Increased(ONE));
    assert_eq!(removed.change(Holding::Quote), BalanceChange::Increased(ONE));
    match &removed.action {
        LiquidityAction::Remove(plan) => {
            assert_eq!(plan.share_amount, ONE);
            assert_eq!(plan.base_amount_min, BaseUnitAmount(960_000));
            assert_eq!(plan.quote_amount_min, BaseUnitAmount(960_000));
        }
        other => panic!("expected withdrawal, got {:?}", other),
    }

    // Back where it started
    let pool = harness.exchange.pool(&harness.pool_id).await.unwrap();
    assert_eq!(pool.base_reserve, BaseUnitAmount(1_000_000_000_000));
    assert_eq!(pool.share_supply, BaseUnitAmount(1_000_000_000_000));
}

#[tokio::test]
async fn test_withdrawal_plans_against_moved_reserves() {
    let harness = provisioned(|_| {}).await;

    harness
        .operator
        .add_liquidity(&harness.pool_id)
        .await
        .unwrap();

    // A trade doubles the quote reserve after the deposit
    let reserve = 1_000_001_000_000;
    harness
        .exchange
        .set_reserves(
            &harness.pool_id,
            BaseUnitAmount(reserve),
            BaseUnitAmount(2 * reserve),
        )
        .await
        .unwrap();

    let removed = harness
        .operator
        .remove_liquidity(&harness.pool_id)
        .await
        .unwrap();

    match &removed.action {
        LiquidityAction::Remove(plan) => {
            assert_eq!(plan.projection.base_amount, ONE);
            assert_eq!(plan.projection.quote_amount, BaseUnitAmount(2_000_000));
        }
        other => panic!("expected withdrawal, got {:?}", other),
    }
    assert_eq!(
        removed.change(Holding::Quote),
        BalanceChange::Increased(BaseUnitAmount(2_000_000))
    );
}

#[tokio::test]
async fn test_quote_side_deposit_follows_pool_price() {
    let harness = provisioned(|config| {
        config.liquidity.fixed_side = PoolSide::Quote;
    })
    .await;

    // Base now trades at half a quote token
    harness
        .exchange
        .set_reserves(
            &harness.pool_id,
            BaseUnitAmount(2_000_000_000_000),
            BaseUnitAmount(1_000_000_000_000),
        )
        .await
        .unwrap();

    let receipt = harness
        .operator
        .add_liquidity(&harness.pool_id)
        .await
        .unwrap();

    assert_eq!(receipt.change(Holding::Quote), BalanceChange::Decreased(ONE));
    assert_eq!(
        receipt.change(Holding::Base),
        BalanceChange::Decreased(BaseUnitAmount(2_000_000))
    );
    assert_eq!(receipt.change(Holding::Share), BalanceChange::Increased(ONE));
}

#[tokio::test]
async fn test_stale_plan_rejected_by_exchange() {
    let harness = provisioned(|_| {}).await;

    let pool = harness
        .operator
        .fresh_pool(&harness.pool_id)
        .await
        .unwrap();
    let plan = plan_add_liquidity(
        &pool,
        PoolSide::Base,
        dec!(1),
        SlippageTolerance::from_percent(1).unwrap(),
    )
    .unwrap();

    // Reserves move 10% between planning and submission
    harness
        .exchange
        .set_reserves(
            &harness.pool_id,
            BaseUnitAmount(1_000_000_000_000),
            BaseUnitAmount(1_100_000_000_000),
        )
        .await
        .unwrap();

    let result = harness.exchange.add_liquidity(&plan).await;
    assert!(matches!(result, Err(CreatorError::Rejected { .. })));
}

#[tokio::test]
async fn test_rejected_submission_maps_to_external_failure() {
    let harness = provisioned(|_| {}).await;

    harness
        .exchange
        .fail_next(
            SandboxCall::RemoveLiquidity,
            CreatorError::Rejected {
                message: "exceeds desired slippage limit".to_string(),
            },
        )
        .await;

    match harness.operator.remove_liquidity(&harness.pool_id).await {
        Err(ProvisionError::ExternalCallFailure {
            kind,
            identity,
            message,
        }) => {
            assert_eq!(kind, ResourceKind::Pool);
            assert!(identity.contains(harness.pool_id.as_str()));
            assert!(message.contains("slippage"));
        }
        other => panic!("expected external call failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_pool_outside_allow_list_rejected() {
    let harness = provisioned(|config| {
        config.programs.amm_program = Some("UnknownAmm1111".to_string());
    })
    .await;

    let result = harness.operator.add_liquidity(&harness.pool_id).await;
    assert!(matches!(
        result,
        Err(ProvisionError::UnsupportedResourceType {
            kind: ResourceKind::Pool,
            ..
        })
    ));
    assert_eq!(harness.exchange.calls(SandboxCall::AddLiquidity).await, 0);
}

#[tokio::test]
async fn test_withdrawing_more_than_supply_fails_before_submission() {
    let harness = provisioned(|_| {}).await;

    let result = harness
        .operator
        .remove_liquidity_amount(&harness.pool_id, dec!(2_000_000))
        .await;
    assert!(matches!(
        result,
        Err(ProvisionError::Liquidity(
            LiquidityError::InsufficientLiquidity { .. }
        ))
    ));
    assert_eq!(harness.exchange.calls(SandboxCall::RemoveLiquidity).await, 0);
}

#[tokio::test]
async fn test_zero_deposit_fails_before_submission() {
    let harness = provisioned(|_| {}).await;

    let result = harness
        .operator
        .add_liquidity_amount(&harness.pool_id, PoolSide::Base, dec!(0.0000001))
        .await;
    assert!(matches!(
        result,
        Err(ProvisionError::Liquidity(LiquidityError::ZeroAmount))
    ));
    assert_eq!(harness.exchange.calls(SandboxCall::AddLiquidity).await, 0);
}
