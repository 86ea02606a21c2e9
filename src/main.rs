//! issuance-engine CLI
//!
//! Drive the synthetic-dollar engine from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Execute a JSON scenario through the engine
//! issuance-engine run --input scenario.json
//!
//! # Output as JSON
//! issuance-engine run --input scenario.json --format json
//!
//! # Apply a price shock after running a scenario
//! issuance-engine shock --input scenario.json --asset WETH --percent -30
//!
//! # Generate a random scenario for testing
//! issuance-engine generate --accounts 10 --ops 30
//! ```

use issuance_engine::core::asset::AssetId;
use issuance_engine::simulation::price_shock::apply_price_shock;
use issuance_engine::simulation::scenario::{run_scenario, Scenario, ScenarioRuntime};
use issuance_engine::simulation::stress_test::{generate_random_scenario, ScenarioConfig};
use rust_decimal::Decimal;
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"issuance-engine — overcollateralized synthetic-dollar issuance engine

USAGE:
    issuance-engine <COMMAND> [OPTIONS]

COMMANDS:
    run         Execute a scenario's operations through the engine
    shock       Run a scenario, then apply a price shock and report
                which accounts become liquidatable
    generate    Generate a random scenario (for testing)
    help        Show this message

OPTIONS (run):
    --input <FILE>      Path to JSON scenario file
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (shock):
    --input <FILE>      Path to JSON scenario file
    --asset <ASSET>     Asset whose price to shock
    --percent <N>       Signed percent move (e.g. -30)
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (generate):
    --accounts <N>      Number of accounts (default: 10)
    --ops <N>           Number of operations beyond the opening deposits
                        (default: 30)
    --assets <LIST>     Comma-separated SYMBOL:PRICE pairs
                        (default: WETH:2000)
    --output <FILE>     Write to file instead of stdout

EXAMPLES:
    issuance-engine run --input scenario.json
    issuance-engine run --input scenario.json --format json
    issuance-engine shock --input scenario.json --asset WETH --percent -30
    issuance-engine generate --accounts 20 --ops 60
    issuance-engine generate --assets WETH:2000,WBTC:40000 --output test.json"#
    );
}

fn load_scenario(path: &str) -> Scenario {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });

    serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "assets": [ {{ "asset": "WETH", "price": "2000" }} ],
  "operations": [
    {{ "op": "deposit", "account": "alice", "asset": "WETH", "amount": "15" }},
    {{ "op": "mint", "account": "alice", "amount": "10000" }}
  ]
}}"#
        );
        process::exit(1);
    })
}

fn parse_flag(args: &[String], i: &mut usize, name: &str) -> String {
    *i += 1;
    args.get(*i).cloned().unwrap_or_else(|| {
        eprintln!("{} requires a value", name);
        process::exit(1);
    })
}

fn cmd_run(args: &[String]) {
    let mut input_path = None;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => input_path = Some(parse_flag(args, &mut i, "--input")),
            "--format" => format = parse_flag(args, &mut i, "--format"),
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    let scenario = load_scenario(&path);
    let report = run_scenario(&scenario).unwrap_or_else(|e| {
        eprintln!("Error building scenario: {}", e);
        process::exit(1);
    });

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report).unwrap());
    } else {
        println!("{}", report);
        println!("--- Events ---");
        for event in &report.events {
            println!("  {}", event);
        }
    }
}

fn cmd_shock(args: &[String]) {
    let mut input_path = None;
    let mut asset = None;
    let mut percent: Option<i64> = None;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => input_path = Some(parse_flag(args, &mut i, "--input")),
            "--asset" => asset = Some(parse_flag(args, &mut i, "--asset")),
            "--percent" => {
                let raw = parse_flag(args, &mut i, "--percent");
                percent = Some(raw.parse().unwrap_or_else(|_| {
                    eprintln!("--percent requires a signed integer, got '{}'", raw);
                    process::exit(1);
                }));
            }
            "--format" => format = parse_flag(args, &mut i, "--format"),
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });
    let asset = AssetId::new(asset.unwrap_or_else(|| {
        eprintln!("Error: --asset <ASSET> is required");
        process::exit(1);
    }));
    let percent = percent.unwrap_or_else(|| {
        eprintln!("Error: --percent <N> is required");
        process::exit(1);
    });

    let scenario = load_scenario(&path);
    let mut runtime = ScenarioRuntime::new(&scenario.assets).unwrap_or_else(|e| {
        eprintln!("Error building scenario: {}", e);
        process::exit(1);
    });
    let steps = runtime.execute(&scenario.operations);
    let failed = steps.iter().filter(|s| !s.ok).count();
    if failed > 0 {
        eprintln!("Note: {} of {} scenario steps failed", failed, steps.len());
    }

    let report = apply_price_shock(&mut runtime, &asset, percent).unwrap_or_else(|e| {
        eprintln!("Error applying shock: {}", e);
        process::exit(1);
    });

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report).unwrap());
    } else {
        println!("{}", report);
    }
}

fn cmd_generate(args: &[String]) {
    let mut accounts = 10usize;
    let mut ops = 30usize;
    let mut assets_str = "WETH:2000".to_string();
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--accounts" => {
                let raw = parse_flag(args, &mut i, "--accounts");
                accounts = raw.parse().unwrap_or_else(|_| {
                    eprintln!("--accounts requires a number");
                    process::exit(1);
                });
            }
            "--ops" => {
                let raw = parse_flag(args, &mut i, "--ops");
                ops = raw.parse().unwrap_or_else(|_| {
                    eprintln!("--ops requires a number");
                    process::exit(1);
                });
            }
            "--assets" => assets_str = parse_flag(args, &mut i, "--assets"),
            "--output" => output_path = Some(parse_flag(args, &mut i, "--output")),
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let assets = assets_str
        .split(',')
        .map(|pair| {
            let (symbol, price) = pair.split_once(':').unwrap_or_else(|| {
                eprintln!("--assets entries must be SYMBOL:PRICE, got '{}'", pair);
                process::exit(1);
            });
            let price: Decimal = price.trim().parse().unwrap_or_else(|_| {
                eprintln!("Invalid price '{}' for asset '{}'", price, symbol);
                process::exit(1);
            });
            issuance_engine::simulation::scenario::ScenarioAsset {
                asset: symbol.trim().to_string(),
                price,
                decimals: 18,
            }
        })
        .collect();

    let config = ScenarioConfig {
        account_count: accounts,
        assets,
        avg_ops_per_account: ops / accounts.max(1),
        ..Default::default()
    };

    let scenario = generate_random_scenario(&config);
    let json = serde_json::to_string_pretty(&scenario).unwrap();

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!(
            "Generated {} operations across {} accounts → {}",
            scenario.operations.len(),
            accounts,
            path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "run" => cmd_run(rest),
        "shock" => cmd_shock(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
