//! Basic deposit, mint, and redeem walkthrough.
//!
//! Demonstrates the overcollateralization requirement: how much can be
//! minted against a deposit, and how the solvency guard blocks
//! redemptions that would undercut outstanding debt.

use issuance_engine::core::account::AccountId;
use issuance_engine::core::asset::{AssetConfig, AssetId, AssetRegistry};
use issuance_engine::core::fixed::{to_decimal, WAD, WAD_DECIMALS};
use issuance_engine::engine::issuance::IssuanceEngine;
use issuance_engine::oracle::FeedId;
use issuance_engine::simulation::harness::{
    FeedBoard, InMemoryCollateralLedger, InMemoryDebtToken,
};
use std::sync::Arc;

fn usd(value: u128) -> String {
    to_decimal(value, WAD_DECIMALS)
        .map(|d| d.normalize().to_string())
        .unwrap_or_default()
}

fn main() {
    println!("╔══════════════════════════════════════════════╗");
    println!("║  issuance-engine: Mint & Redeem Walkthrough  ║");
    println!("╚══════════════════════════════════════════════╝\n");

    let weth = AssetId::new("WETH");
    let alice = AccountId::new("alice");

    let registry = Arc::new(
        AssetRegistry::new(vec![(weth.clone(), AssetConfig::new(FeedId::new("ETH/USD")))])
            .unwrap(),
    );
    let mut board = FeedBoard::new();
    board.set_price(&FeedId::new("ETH/USD"), 2_000_0000_0000, 8);
    let mut bank = InMemoryCollateralLedger::new();
    bank.fund(&alice, &weth, 15 * WAD);

    let mut engine = IssuanceEngine::new(
        registry,
        Box::new(bank),
        Box::new(InMemoryDebtToken::new()),
        Box::new(board),
        AssetId::new("USDz"),
    );

    // --- Scenario 1: Deposit and mint up to the limit ---
    println!("━━━ Scenario 1: Deposit and mint ━━━\n");

    engine.deposit_collateral(&alice, &weth, 15 * WAD).unwrap();
    println!("Deposited:          15 WETH at $2000");
    println!(
        "Collateral value:   ${}",
        usd(engine.collateral_value_usd(&alice).unwrap())
    );

    engine.mint_debt(&alice, 10_000 * WAD).unwrap();
    println!("Minted:             $10000 USDz");
    println!(
        "Health factor:      {}",
        engine.health_factor(&alice).unwrap()
    );
    println!();

    // --- Scenario 2: The guard blocks an unsafe redemption ---
    println!("━━━ Scenario 2: Solvency guard ━━━\n");

    match engine.redeem_collateral(&alice, &weth, 10 * WAD) {
        Ok(()) => println!("Redeemed 10 WETH (unexpected!)"),
        Err(err) => println!("Redeem 10 WETH rejected: {}", err),
    }

    engine.redeem_collateral(&alice, &weth, 5 * WAD).unwrap();
    println!("Redeem 5 WETH accepted");
    println!(
        "Health factor:      {}",
        engine.health_factor(&alice).unwrap()
    );
    println!();

    // --- Scenario 3: Burn debt to free the rest ---
    println!("━━━ Scenario 3: Burn and exit ━━━\n");

    engine.burn_debt(&alice, 10_000 * WAD).unwrap();
    engine.redeem_collateral(&alice, &weth, 10 * WAD).unwrap();
    println!("Burned $10000, redeemed the remaining 10 WETH");
    println!(
        "Final health:       {}",
        engine.health_factor(&alice).unwrap()
    );

    println!("\n--- Events ---");
    for event in engine.take_events() {
        println!("  {}", event);
    }
}
