//! Liquidation walkthrough: price drop, undercollateralization, and a
//! third-party liquidation restoring solvency.

use issuance_engine::core::account::AccountId;
use issuance_engine::core::asset::AssetId;
use issuance_engine::simulation::price_shock::apply_price_shock;
use issuance_engine::simulation::scenario::{ScenarioAsset, ScenarioOp, ScenarioRuntime};
use rust_decimal_macros::dec;

fn main() {
    println!("╔═══════════════════════════════════════════╗");
    println!("║  issuance-engine: Liquidation Walkthrough ║");
    println!("╚═══════════════════════════════════════════╝\n");

    let weth = AssetId::new("WETH");
    let assets = vec![ScenarioAsset {
        asset: "WETH".to_string(),
        price: dec!(2000),
        decimals: 18,
    }];
    let mut runtime = ScenarioRuntime::new(&assets).unwrap();

    // Alice maxes out; bob keeps headroom and a war chest of USDz.
    println!("━━━ Setup: two positions at $2000/ETH ━━━\n");
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
        ScenarioOp::Deposit {
            account: "bob".to_string(),
            asset: "WETH".to_string(),
            amount: dec!(50),
        },
        ScenarioOp::Mint {
            account: "bob".to_string(),
            amount: dec!(15000),
        },
    ]);
    for step in &steps {
        println!("  {} -> {}", step.description, if step.ok { "ok" } else { "FAIL" });
    }

    // The market turns.
    println!("\n━━━ ETH drops 25% ━━━\n");
    let report = apply_price_shock(&mut runtime, &weth, -25).unwrap();
    println!("{}", report);

    // Bob steps in.
    println!("━━━ Bob liquidates alice ━━━\n");
    let outcome = runtime
        .engine
        .liquidate(
            &weth,
            &AccountId::new("alice"),
            &AccountId::new("bob"),
            12_000_000_000_000_000_000_000, // $12000 in 18-decimal units
        )
        .unwrap();
    println!("Debt covered:        $12000");
    println!(
        "Collateral seized:   {} wei of WETH (incl. {} bonus)",
        outcome.collateral_seized, outcome.bonus
    );
    println!("Target health after: {}", outcome.target_health_after);

    println!("\n--- Final accounts ---");
    for account in runtime.account_reports() {
        println!(
            "  {:<8} debt {:<8} collateral ${:<8} health {}",
            account.account, account.debt, account.collateral_value_usd, account.health_factor
        );
    }
}
