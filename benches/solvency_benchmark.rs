use criterion::{black_box, criterion_group, criterion_main, Criterion};
use issuance_engine::simulation::scenario::{run_scenario, ScenarioRuntime};
use issuance_engine::simulation::stress_test::{generate_random_scenario, ScenarioConfig};

fn bench_scenario_100_accounts(c: &mut Criterion) {
    let config = ScenarioConfig {
        account_count: 100,
        avg_ops_per_account: 5,
        ..Default::default()
    };
    let scenario = generate_random_scenario(&config);

    c.bench_function("scenario_100_accounts", |b| {
        b.iter(|| run_scenario(black_box(&scenario)))
    });
}

fn bench_health_factor_1000_accounts(c: &mut Criterion) {
    let config = ScenarioConfig {
        account_count: 1000,
        avg_ops_per_account: 3,
        ..Default::default()
    };
    let scenario = generate_random_scenario(&config);
    let mut runtime = ScenarioRuntime::new(&scenario.assets).unwrap();
    runtime.execute(&scenario.operations);

    c.bench_function("health_factor_1000_accounts", |b| {
        b.iter(|| {
            for account in runtime.engine.positions().accounts() {
                let _ = black_box(runtime.engine.health_factor(&account));
            }
        })
    });
}

fn bench_liquidation_scan_1000_accounts(c: &mut Criterion) {
    use issuance_engine::simulation::price_shock::liquidatable_accounts;

    let config = ScenarioConfig {
        account_count: 1000,
        avg_ops_per_account: 3,
        ..Default::default()
    };
    let scenario = generate_random_scenario(&config);
    let mut runtime = ScenarioRuntime::new(&scenario.assets).unwrap();
    runtime.execute(&scenario.operations);

    c.bench_function("liquidation_scan_1000_accounts", |b| {
        b.iter(|| liquidatable_accounts(black_box(&runtime.engine)))
    });
}

criterion_group!(
    benches,
    bench_scenario_100_accounts,
    bench_health_factor_1000_accounts,
    bench_liquidation_scan_1000_accounts
);
criterion_main!(benches);
