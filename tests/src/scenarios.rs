/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::fs::read;

use zune_core::options::ToolkitOptions;
use zune_toolkit::Toolkit;

use crate::{hash, run_scenario, scenarios_path, Scenario};

fn load_scenarios() -> Vec<Scenario> {
    let json_file = read(scenarios_path()).unwrap();
    serde_json::from_slice(&json_file).unwrap()
}

#[test]
fn scenarios_parse() {
    let scenarios = load_scenarios();
    assert!(!scenarios.is_empty());
}

/// Output may depend neither on the thread count nor on the kernel family
#[test]
#[allow(clippy::uninlined_format_args)]
fn single_scalar_thread_matches_simd_pool() {
    let reference = Toolkit::new(ToolkitOptions::new_scalar().set_num_threads(1));
    let pooled = Toolkit::new(ToolkitOptions::new_fast().set_num_threads(6));
    assert_eq!(reference.thread_count(), 1);

    let mut failures = Vec::new();
    for scenario in &load_scenarios() {
        let expected = hash(&run_scenario(&reference, scenario).unwrap());
        let found = hash(&run_scenario(&pooled, scenario).unwrap());

        if expected != found {
            let err = format!(
                "Hash mismatch for {}\nExpected {} but found {}\nConfig:{:#?}",
                scenario.name, expected, found, scenario
            );
            eprintln!("{}\n", err);
            failures.push(scenario.name.clone());
        }
    }
    if !failures.is_empty() {
        panic!("Outputs differ across toolkits\n {:#?}", failures);
    }
}

#[test]
fn repeated_runs_are_deterministic() {
    let toolkit = Toolkit::new(ToolkitOptions::default().set_num_threads(4));
    for scenario in &load_scenarios() {
        let first = hash(&run_scenario(&toolkit, scenario).unwrap());
        let second = hash(&run_scenario(&toolkit, scenario).unwrap());
        assert_eq!(first, second, "{}", scenario.name);
    }
}
