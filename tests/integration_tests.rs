use issuance_engine::core::account::AccountId;
use issuance_engine::core::asset::{AssetConfig, AssetId, AssetRegistry};
use issuance_engine::core::fixed::WAD;
use issuance_engine::engine::error::EngineError;
use issuance_engine::engine::issuance::IssuanceEngine;
use issuance_engine::engine::solvency::HealthFactor;
use issuance_engine::oracle::FeedId;
use issuance_engine::simulation::harness::{
    FeedBoard, InMemoryCollateralLedger, InMemoryDebtToken,
};
use issuance_engine::simulation::price_shock::apply_price_shock;
use issuance_engine::simulation::scenario::{
    run_scenario, Scenario, ScenarioAsset, ScenarioOp, ScenarioRuntime,
};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn weth() -> AssetId {
    AssetId::new("WETH")
}

fn wbtc() -> AssetId {
    AssetId::new("WBTC")
}

/// Two-asset engine: WETH at $2000 (18 decimals) and WBTC at $40000
/// (8 decimals), with funded wallets for alice and bob.
fn two_asset_engine() -> IssuanceEngine {
    let registry = Arc::new(
        AssetRegistry::new(vec![
            (weth(), AssetConfig::new(FeedId::new("ETH/USD"))),
            (
                wbtc(),
                AssetConfig::new(FeedId::new("BTC/USD")).with_decimals(8),
            ),
        ])
        .unwrap(),
    );
    let mut board = FeedBoard::new();
    board.set_price(&FeedId::new("ETH/USD"), 2_000_0000_0000, 8);
    board.set_price(&FeedId::new("BTC/USD"), 40_000_0000_0000, 8);
    let mut bank = InMemoryCollateralLedger::new();
    for account in ["alice", "bob"] {
        bank.fund(&AccountId::new(account), &weth(), 1_000 * WAD);
        bank.fund(&AccountId::new(account), &wbtc(), 1_000 * 100_000_000);
    }
    IssuanceEngine::new(
        registry,
        Box::new(bank),
        Box::new(InMemoryDebtToken::new()),
        Box::new(board),
        AssetId::new("USDz"),
    )
}

/// Full pipeline: deposit → mint → price drop → liquidation, checked
/// against hand-computed amounts and the external wallet balances.
#[test]
fn full_pipeline_liquidation_scenario() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let alice = AccountId::new("alice");
    let bob = AccountId::new("bob");

    let registry = Arc::new(
        AssetRegistry::new(vec![
            (weth(), AssetConfig::new(FeedId::new("ETH/USD"))),
            (
                wbtc(),
                AssetConfig::new(FeedId::new("BTC/USD")).with_decimals(8),
            ),
        ])
        .unwrap(),
    );
    let feeds = Rc::new(RefCell::new(FeedBoard::new()));
    feeds
        .borrow_mut()
        .set_price(&FeedId::new("ETH/USD"), 2_000_0000_0000, 8);
    feeds
        .borrow_mut()
        .set_price(&FeedId::new("BTC/USD"), 40_000_0000_0000, 8);
    let bank = Rc::new(RefCell::new(InMemoryCollateralLedger::new()));
    for account in [&alice, &bob] {
        bank.borrow_mut().fund(account, &weth(), 1_000 * WAD);
        bank.borrow_mut().fund(account, &wbtc(), 1_000 * 100_000_000);
    }
    let token = Rc::new(RefCell::new(InMemoryDebtToken::new()));
    let mut engine = IssuanceEngine::new(
        registry,
        Box::new(Rc::clone(&bank)),
        Box::new(Rc::clone(&token)),
        Box::new(Rc::clone(&feeds)),
        AssetId::new("USDz"),
    );

    // Alice posts 15 ETH ($30000) and mints the maximum $15000.
    engine.deposit_collateral(&alice, &weth(), 15 * WAD).unwrap();
    engine.mint_debt(&alice, 15_000 * WAD).unwrap();
    assert_eq!(engine.health_factor(&alice).unwrap(), HealthFactor::MIN);
    assert_eq!(token.borrow().balance_of(&alice), 15_000 * WAD);

    // Bob posts mixed collateral and mints conservatively.
    engine.deposit_collateral(&bob, &weth(), 10 * WAD).unwrap();
    engine.deposit_collateral(&bob, &wbtc(), 100_000_000).unwrap(); // 1 BTC
    engine.mint_debt(&bob, 14_000 * WAD).unwrap();
    assert_eq!(
        engine.collateral_value_usd(&bob).unwrap(),
        (20_000 + 40_000) * WAD
    );

    // ETH drops 25% to $1500. Alice: $22500 * 0.5 / $15000 = 0.75.
    feeds
        .borrow_mut()
        .set_price(&FeedId::new("ETH/USD"), 1_500_0000_0000, 8);
    assert!(engine.health_factor(&alice).unwrap().is_liquidatable());
    // Bob holds $15000 + $40000 = $55000, adjusted $27500 vs $14000.
    assert!(engine.health_factor(&bob).unwrap().is_solvent());

    // Bob covers $12000 of alice's debt against her ETH.
    let bob_wallet_before = bank.borrow().balance_of(&bob, &weth());
    let outcome = engine
        .liquidate(&weth(), &alice, &bob, 12_000 * WAD)
        .unwrap();

    // $12000 / $1500 = 8 ETH principal, 0.8 ETH bonus.
    assert_eq!(outcome.collateral_seized, 8_800_000_000_000_000_000);
    assert_eq!(outcome.bonus, 800_000_000_000_000_000);
    assert_eq!(engine.debt_of(&alice), 3_000 * WAD);
    assert_eq!(
        engine.collateral_balance(&alice, &weth()),
        15 * WAD - outcome.collateral_seized
    );
    assert!(outcome.target_health_after > HealthFactor::MIN);

    // The seizure landed in bob's external wallet, and his debt-token
    // payment was destroyed.
    assert_eq!(
        bank.borrow().balance_of(&bob, &weth()),
        bob_wallet_before + outcome.collateral_seized
    );
    assert_eq!(token.borrow().balance_of(&bob), 2_000 * WAD);
    assert_eq!(token.borrow().destroyed_total(), 12_000 * WAD);

    let events = engine.take_events();
    assert_eq!(events.len(), 6);
    assert_eq!(events.last().unwrap().label(), "liquidate");
}

#[test]
fn boundary_mint_is_accepted() {
    let alice = AccountId::new("alice");
    let mut engine = two_asset_engine();
    engine.deposit_collateral(&alice, &weth(), 10 * WAD).unwrap();
    // $20000 collateral supports exactly $10000: boundary, inclusive.
    engine.mint_debt(&alice, 10_000 * WAD).unwrap();
    assert_eq!(engine.health_factor(&alice).unwrap(), HealthFactor::MIN);
    // One more unit is too much.
    let err = engine.mint_debt(&alice, 1).unwrap_err();
    assert!(matches!(err, EngineError::SolvencyViolation { .. }));
}

#[test]
fn scenario_pipeline_with_price_drop_and_liquidation() {
    let scenario = Scenario {
        assets: vec![ScenarioAsset {
            asset: "WETH".to_string(),
            price: dec!(2000),
            decimals: 18,
        }],
        operations: vec![
            ScenarioOp::Deposit {
                account: "alice".to_string(),
                asset: "WETH".to_string(),
                amount: dec!(15),
            },
            ScenarioOp::Mint {
                account: "alice".to_string(),
                amount: dec!(15000),
            },
            ScenarioOp::Deposit {
                account: "bob".to_string(),
                asset: "WETH".to_string(),
                amount: dec!(50),
            },
            ScenarioOp::Mint {
                account: "bob".to_string(),
                amount: dec!(15000),
            },
            ScenarioOp::SetPrice {
                asset: "WETH".to_string(),
                price: dec!(1500),
            },
            ScenarioOp::Liquidate {
                target: "alice".to_string(),
                liquidator: "bob".to_string(),
                asset: "WETH".to_string(),
                debt_to_cover: dec!(12000),
            },
        ],
    };

    let report = run_scenario(&scenario).unwrap();
    assert!(
        report.steps.iter().all(|s| s.ok),
        "failing step: {:?}",
        report.steps.iter().find(|s| !s.ok)
    );

    let alice = report
        .accounts
        .iter()
        .find(|a| a.account == "alice")
        .unwrap();
    assert_eq!(alice.debt, "3000");

    // deposit, mint, deposit, mint, liquidate — SetPrice emits nothing.
    assert_eq!(report.events.len(), 5);
}

#[test]
fn stale_price_blocks_every_valuation() {
    use chrono::{Duration, Utc};
    use issuance_engine::oracle::PriceQuote;

    let alice = AccountId::new("alice");
    let registry = Arc::new(
        AssetRegistry::new(vec![(weth(), AssetConfig::new(FeedId::new("ETH/USD")))]).unwrap(),
    );
    let mut board = FeedBoard::new();
    board.set_quote(
        &FeedId::new("ETH/USD"),
        PriceQuote::new(2_000_0000_0000, 8, Utc::now() - Duration::hours(4)),
    );
    let mut bank = InMemoryCollateralLedger::new();
    bank.fund(&alice, &weth(), 10 * WAD);
    let mut engine = IssuanceEngine::new(
        registry,
        Box::new(bank),
        Box::new(InMemoryDebtToken::new()),
        Box::new(board),
        AssetId::new("USDz"),
    );

    // Deposits need no valuation and still work.
    engine.deposit_collateral(&alice, &weth(), 10 * WAD).unwrap();
    // Everything touching the oracle hard-errors.
    assert!(matches!(
        engine.mint_debt(&alice, WAD).unwrap_err(),
        EngineError::Price(_)
    ));
    assert!(matches!(
        engine.collateral_value_usd(&alice).unwrap_err(),
        EngineError::Price(_)
    ));
    // And the failed mint left no debt behind.
    assert_eq!(engine.debt_of(&alice), 0);
}

#[test]
fn transfer_refusal_aborts_with_no_state_change() {
    let alice = AccountId::new("alice");
    let registry = Arc::new(
        AssetRegistry::new(vec![(weth(), AssetConfig::new(FeedId::new("ETH/USD")))]).unwrap(),
    );
    let mut board = FeedBoard::new();
    board.set_price(&FeedId::new("ETH/USD"), 2_000_0000_0000, 8);
    let mut bank = InMemoryCollateralLedger::new();
    bank.fund(&alice, &weth(), 10 * WAD);
    bank.refuse(&weth());
    let mut engine = IssuanceEngine::new(
        registry,
        Box::new(bank),
        Box::new(InMemoryDebtToken::new()),
        Box::new(board),
        AssetId::new("USDz"),
    );

    let err = engine
        .deposit_collateral(&alice, &weth(), 10 * WAD)
        .unwrap_err();
    assert!(matches!(err, EngineError::TransferFailure { .. }));
    assert_eq!(engine.collateral_balance(&alice, &weth()), 0);
    assert!(engine.events().is_empty());
}

#[test]
fn issuance_refusal_is_distinct_from_solvency_failure() {
    let alice = AccountId::new("alice");
    let registry = Arc::new(
        AssetRegistry::new(vec![(weth(), AssetConfig::new(FeedId::new("ETH/USD")))]).unwrap(),
    );
    let mut board = FeedBoard::new();
    board.set_price(&FeedId::new("ETH/USD"), 2_000_0000_0000, 8);
    let mut bank = InMemoryCollateralLedger::new();
    bank.fund(&alice, &weth(), 10 * WAD);
    let mut token = InMemoryDebtToken::new();
    token.refuse_issuance(true);
    let mut engine = IssuanceEngine::new(
        registry,
        Box::new(bank),
        Box::new(token),
        Box::new(board),
        AssetId::new("USDz"),
    );

    engine.deposit_collateral(&alice, &weth(), 10 * WAD).unwrap();
    let err = engine.mint_debt(&alice, 1_000 * WAD).unwrap_err();
    assert_eq!(err, EngineError::IssuanceFailure { amount: 1_000 * WAD });
    assert_eq!(engine.debt_of(&alice), 0);
}

#[test]
fn shock_report_finds_underwater_account() {
    let assets = vec![ScenarioAsset {
        asset: "WETH".to_string(),
        price: dec!(2000),
        decimals: 18,
    }];
    let mut runtime = ScenarioRuntime::new(&assets).unwrap();
    let steps = runtime.execute(&[
        ScenarioOp::Deposit {
            account: "alice".to_string(),
            asset: "WETH".to_string(),
            amount: dec!(15),
        },
        ScenarioOp::Mint {
            account: "alice".to_string(),
            amount: dec!(15000),
        },
    ]);
    assert!(steps.iter().all(|s| s.ok));

    let report = apply_price_shock(&mut runtime, &weth(), -25).unwrap();
    assert_eq!(report.price_after, dec!(1500));
    assert_eq!(report.liquidatable.len(), 1);
    assert_eq!(report.liquidatable[0].health_factor_after, "0.75");
}

#[test]
fn scenario_json_serializes_with_string_amounts() {
    let scenario = Scenario {
        assets: vec![ScenarioAsset {
            asset: "WETH".to_string(),
            price: dec!(2000),
            decimals: 18,
        }],
        operations: vec![ScenarioOp::Deposit {
            account: "alice".to_string(),
            asset: "WETH".to_string(),
            amount: dec!(15),
        }],
    };

    let json = serde_json::to_string_pretty(&scenario).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["assets"][0]["asset"], "WETH");
    assert_eq!(parsed["operations"][0]["op"], "deposit");

    let restored: Scenario = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.operations.len(), 1);
}
