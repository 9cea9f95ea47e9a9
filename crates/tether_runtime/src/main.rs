//! Tether Runtime
//!
//! Boots the script bridge, loads hook scripts and drives a short game loop
//! through them.
//!
//! Usage: `tether [--config <bridge.json>] [script.js ...]`

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use tether_metrics::TargetStats;
use tether_script::{declare_script_object, BridgeConfig, CallReturn, ScriptBridge, ScriptRuntime};

const HOOKS: &str = "GameHooks";
const DEFAULT_HOOKS: &str = include_str!("../scripts/defaults.js");

/// City snapshot handed to hooks
#[derive(Debug, Clone, Serialize)]
struct CityInfo {
    name: String,
    population: u32,
    x: i32,
    y: i32,
}

declare_script_object!(CityInfo);

#[derive(Debug, Default)]
struct Options {
    config: Option<PathBuf>,
    scripts: Vec<PathBuf>,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<Options> {
    let mut options = Options::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => match args.next() {
                Some(path) => options.config = Some(PathBuf::from(path)),
                None => bail!("--config needs a file path"),
            },
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            _ => options.scripts.push(PathBuf::from(&arg)),
        }
    }
    Ok(options)
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Tether v{}", tether_script::VERSION);
    let options = parse_options(std::env::args().skip(1))?;

    let config = match &options.config {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("loading bridge config {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    tracing::info!(?config, "bridge configured");

    let runtime = ScriptRuntime::new().context("starting script runtime")?;
    runtime
        .execute(DEFAULT_HOOKS)
        .context("loading default hooks")?;
    for script in &options.scripts {
        runtime
            .execute_file(script)
            .with_context(|| format!("loading {}", script.display()))?;
        tracing::info!(script = %script.display(), "script loaded");
    }

    let bridge = ScriptBridge::with_config(runtime, config);
    run_game(&bridge);

    report(&bridge.total_stats());
    tracing::info!("Runtime shut down cleanly");
    Ok(())
}

fn run_game(bridge: &ScriptBridge<ScriptRuntime>) {
    bridge.call(HOOKS, "onStartup");

    let turn_limit: CallReturn<u32> = bridge.call_returning(HOOKS, "getTurnLimit");
    let mut cities = vec![
        CityInfo {
            name: "Memphis".into(),
            population: 3,
            x: 4,
            y: 2,
        },
        CityInfo {
            name: "Nineveh".into(),
            population: 6,
            x: 7,
            y: 2,
        },
    ];

    for turn in 0..turn_limit.value {
        for city in &mut cities {
            let args = bridge.args() << turn << &*city;
            bridge.call_with(HOOKS, "onTurn", &args);
            drop(args);

            let food = [2i32, 3, city.population as i32 % 4];
            let mut growth = 0i32;
            let args = bridge.args() << &*city << &food[..];
            if bridge.call_override_with_returning(HOOKS, "cityGrowth", &args, &mut growth) {
                tracing::info!(turn, city = %city.name, growth, "mod growth rule");
            } else {
                growth = 1;
            }
            drop(args);
            city.population = city.population.saturating_add_signed(growth);
        }

        let site = (turn as i32, 3);
        let mut allowed = true;
        let args = bridge.args() << site.0 << site.1;
        if bridge.call_override_with_returning(HOOKS, "canFoundCity", &args, &mut allowed) {
            tracing::info!(turn, x = site.0, y = site.1, allowed, "mod decided city site");
        }
    }

    if !bridge.call_optional(HOOKS, "onShutdown") {
        tracing::warn!("no shutdown hook available");
    }
}

fn report(stats: &TargetStats) {
    tracing::info!(
        issued = stats.issued,
        failed = stats.failed,
        defaulted = stats.defaulted,
        elapsed_us = stats.elapsed.as_micros() as u64,
        "script call summary"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> impl Iterator<Item = String> {
        args.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_config_and_scripts() {
        let options = parse_options(strings(&["--config", "b.json", "a.js", "c.js"])).unwrap();
        assert_eq!(options.config, Some(PathBuf::from("b.json")));
        assert_eq!(options.scripts, vec![PathBuf::from("a.js"), PathBuf::from("c.js")]);
    }

    #[test]
    fn rejects_dangling_config_flag() {
        assert!(parse_options(strings(&["--config"])).is_err());
        assert!(parse_options(strings(&["--verbose"])).is_err());
    }

    #[test]
    fn sample_mod_runs_against_defaults() {
        let runtime = ScriptRuntime::new().unwrap();
        runtime.execute(DEFAULT_HOOKS).unwrap();
        runtime.execute(include_str!("../scripts/hooks.js")).unwrap();
        let bridge = ScriptBridge::new(runtime);

        let mut limit = 0u32;
        assert!(!bridge.call_override_returning(HOOKS, "getTurnLimit", &mut limit));
        assert!(bridge.call_optional_returning(HOOKS, "getTurnLimit", &mut limit));
        assert_eq!(limit, 3);

        let mut allowed = false;
        let args = bridge.args() << 2 << 4;
        assert!(bridge.call_override_with_returning(HOOKS, "canFoundCity", &args, &mut allowed));
        assert!(allowed);

        run_game(&bridge);
        assert_eq!(bridge.total_stats().failed, 0);
    }
}
