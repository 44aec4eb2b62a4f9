#![cfg(test)]
use crate::config::ValidatorConfig;
use crate::strategy::VALIDATE_ALL_STRATEGY;
use crate::validator::IlValidator;
use jitval_tril::il::Symbol;
use jitval_tril::{MethodBuilder, MethodIl, OpCode};
use std::time::Instant;

/// `blocks` blocks, each summing a few parameters into a temp, with every
/// other block an extension of the one before.
fn wide_method(blocks: u32) -> MethodIl {
    let mut b = MethodBuilder::new("wide");
    for i in 0..blocks {
        b.begin_block(i % 2 == 1);
        let x = b.load(OpCode::ILoad, Symbol::Parm(0));
        let y = b.load(OpCode::ILoad, Symbol::Parm(1));
        let sum = b.create(OpCode::IAdd, &[x, y]);
        let c = b.iconst(i as i32);
        let scaled = b.create(OpCode::IMul, &[sum, c]);
        b.store(OpCode::IStore, Symbol::Temp(i), scaled);
        b.anchor(OpCode::Treetop, &[sum]);
        b.end_block();
    }
    b.begin_block(false);
    let r = b.iconst(0);
    b.anchor(OpCode::IReturn, &[r]);
    b.finish()
}

#[test]
fn benchmark_validate_all_20k_blocks() {
    let il = wide_method(20_000);
    let config = ValidatorConfig { echo_to_stderr: false, ..ValidatorConfig::default() };
    let mut validator = IlValidator::new(config);

    let start = Instant::now();
    let report = validator.validate(&il, VALIDATE_ALL_STRATEGY).unwrap();
    let duration = start.elapsed();
    assert!(report.is_clean(), "{:?}", report.defects.first());
    println!("Validated {} nodes in {:?}", il.node_capacity(), duration);

    // Every rule is linear in the IL; anything slower means a quadratic walk crept in.
    assert!(duration.as_millis() < 2500, "Validation is scaling poorly! Took {:?}! Limit is 2.5s", duration);
}

#[test]
fn benchmark_deep_chain_regression_guard() {
    let mut b = MethodBuilder::new("deep");
    b.begin_block(false);
    let mut value = b.load(OpCode::ILoad, Symbol::Parm(0));
    for _ in 0..100_000 {
        value = b.create(OpCode::INeg, &[value]);
    }
    b.anchor(OpCode::IReturn, &[value]);
    let il = b.finish();

    let config = ValidatorConfig { echo_to_stderr: false, ..ValidatorConfig::default() };
    let mut validator = IlValidator::new(config);
    let start = Instant::now();
    let report = validator.validate(&il, VALIDATE_ALL_STRATEGY).unwrap();
    let duration = start.elapsed();
    assert!(report.is_clean());
    println!("Validated a 100,000 deep tree in {:?}", duration);
    assert!(duration.as_millis() < 1000, "Deep-tree Regression Guard Triggered. Expected < 1000ms, took {:?}", duration);
}
