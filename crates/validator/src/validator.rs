/// The validation driver.
///
/// An `IlValidator` owns one instance of every rule for its whole lifetime.
/// `validate` filters them against a strategy (keeping strategy order) and
/// runs method rules once, block rules once per extended block, and node
/// rules once per node in preorder.

use crate::config::ValidatorConfig;
use crate::diagnostics::{Defect, RuleContext, Severity};
use crate::error::ValidationError;
use crate::rules::{
    BlockValidationRule, MethodValidationRule, NodeValidationRule, RuleId, SoundnessRule, Strictness,
    ValidateAxaddPlatformSpecificRequirement, ValidateBinaryOpcodeChildLayout, ValidateChildCount,
    ValidateChildTypes, ValidateIreturnReturnType, ValidateLivenessBoundaries, ValidateNoDeprecatedOpcodes,
    ValidateNodeRefCountWithinBlock,
};
use crate::strategy::{StrategyEntry, ValidationPhase};
use crate::traversal::preorder_nodes;
use jitval_tril::{MethodIl, NodeId};
use serde::Serialize;
use std::fmt;
use std::fs::{File, OpenOptions};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub method: String,
    /// Rules in the order they ran.
    pub rules_run: Vec<RuleId>,
    pub defects: Vec<Defect>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.defects.is_empty()
    }

    pub fn errors(&self) -> usize {
        self.defects.iter().filter(|d| d.severity != Severity::Warning).count()
    }

    pub fn warnings(&self) -> usize {
        self.defects.iter().filter(|d| d.severity == Severity::Warning).count()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} rule(s) run, {} error(s), {} warning(s)",
            self.method,
            self.rules_run.len(),
            self.errors(),
            self.warnings()
        )
    }
}

pub struct IlValidator {
    config: ValidatorConfig,
    method_rules: Vec<Box<dyn MethodValidationRule>>,
    block_rules: Vec<Box<dyn BlockValidationRule>>,
    node_rules: Vec<Box<dyn NodeValidationRule>>,
}

impl IlValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
            method_rules: vec![
                Box::new(SoundnessRule::new()),
                Box::new(ValidateLivenessBoundaries::new()),
            ],
            block_rules: vec![Box::new(ValidateNodeRefCountWithinBlock::new())],
            node_rules: vec![
                Box::new(ValidateChildCount::new()),
                Box::new(ValidateChildTypes::new()),
                Box::new(ValidateIreturnReturnType::new()),
                Box::new(ValidateAxaddPlatformSpecificRequirement::new()),
                Box::new(ValidateBinaryOpcodeChildLayout::new()),
                Box::new(ValidateNoDeprecatedOpcodes::new()),
            ],
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn validate_phase(
        &mut self,
        il: &MethodIl,
        phase: ValidationPhase,
    ) -> Result<ValidationReport, ValidationError> {
        self.validate(il, phase.strategy())
    }

    pub fn validate(
        &mut self,
        il: &MethodIl,
        strategy: &[StrategyEntry],
    ) -> Result<ValidationReport, ValidationError> {
        log::debug!("validating {} with {} strategy entries", il.signature(), strategy.len());

        let mut log_file: Option<File> = match &self.config.log_file {
            Some(path) => Some(OpenOptions::new().create(true).append(true).open(path)?),
            None => None,
        };
        let mut cx = RuleContext::new(il, &self.config, RuleId::SoundnessRule, Strictness::Strict);
        if let Some(file) = log_file.as_mut() {
            cx = cx.with_log(file);
        }
        let mut rules_run = vec![];

        for entry in strategy {
            for rule in self.method_rules.iter_mut().filter(|r| r.id() == entry.rule) {
                cx.select(entry.rule, strictness_of(entry));
                log::debug!("running method rule {}", entry.rule);
                rule.validate(il, &mut cx)?;
                rules_run.push(entry.rule);
            }
        }

        for entry in strategy {
            for rule in self.block_rules.iter_mut().filter(|r| r.id() == entry.rule) {
                cx.select(entry.rule, strictness_of(entry));
                log::debug!("running block rule {}", entry.rule);
                let mut next = il.first_treetop();
                let mut remaining = il.num_treetops();
                while let Some(first) = next {
                    if Some(first) == il.stop_treetop() || remaining == 0 {
                        break;
                    }
                    remaining -= 1;
                    let exit = il.extended_block_exit(first);
                    rule.validate(first, exit, &mut cx)?;
                    next = il.next_treetop(exit);
                }
                rules_run.push(entry.rule);
            }
        }

        let mut nodes: Option<Vec<NodeId>> = None;
        for entry in strategy {
            for rule in self.node_rules.iter_mut().filter(|r| r.id() == entry.rule) {
                cx.select(entry.rule, strictness_of(entry));
                log::debug!("running node rule {}", entry.rule);
                let order = nodes.get_or_insert_with(|| preorder_nodes(il));
                for node in order.iter().filter_map(|id| il.node(*id)) {
                    rule.validate(node, &mut cx)?;
                }
                rules_run.push(entry.rule);
            }
        }

        let report = ValidationReport {
            method: il.signature().to_string(),
            rules_run,
            defects: cx.into_defects(),
        };
        log::debug!("{}", report);
        Ok(report)
    }
}

fn strictness_of(entry: &StrategyEntry) -> Strictness {
    if entry.rule == RuleId::SoundnessRule {
        Strictness::Strict
    } else {
        entry.strictness
    }
}
