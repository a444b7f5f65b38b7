//! CLI smoke entry point.
//!
//! # Responsibility
//! - Bootstrap a registry from one config resource and report what was
//!   discovered.
//! - Optionally invoke a single contract method for quick local checks.

use querymap_core::{bootstrap, BootConfig, DataValue};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(config_path) = args.first() else {
        eprintln!("usage: querymap_cli <config.json> [component method [param]]");
        return ExitCode::FAILURE;
    };

    println!("querymap_core version={}", querymap_core::core_version());

    let config = match BootConfig::from_path(config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let bootstrapped = match bootstrap(&config) {
        Ok(bootstrapped) => bootstrapped,
        Err(err) => {
            eprintln!("bootstrap error: {err}");
            return ExitCode::FAILURE;
        }
    };

    for component_id in bootstrapped.registry.component_ids() {
        println!("component {component_id}");
    }

    if let (Some(component), Some(method)) = (args.get(1), args.get(2)) {
        let proxy = match bootstrapped.registry.get(component) {
            Ok(proxy) => proxy,
            Err(err) => {
                eprintln!("lookup error: {err}");
                return ExitCode::FAILURE;
            }
        };
        let params: Vec<DataValue> = args.get(3).map(|raw| vec![parse_param(raw)]).unwrap_or_default();
        let value = proxy.invoke(method, &params);
        println!("{component}.{method} => {value}");
    }

    ExitCode::SUCCESS
}

// Positional params are untyped on the command line; numbers win over text.
fn parse_param(raw: &str) -> DataValue {
    if let Ok(value) = raw.parse::<i64>() {
        return DataValue::Integer(value);
    }
    if let Ok(value) = raw.parse::<f64>() {
        return DataValue::Real(value);
    }
    DataValue::Text(raw.to_string())
}
