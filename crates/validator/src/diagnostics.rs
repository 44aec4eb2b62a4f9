/// Defect reporting shared by every rule.
///
/// `RuleContext::check`/`fail` is the one failure primitive: it formats the
/// diagnostic, echoes it to stderr and the optional log sink, records it, and
/// returns `Err` only when the active strictness says the failure aborts.

use crate::config::{Target, ValidatorConfig};
use crate::error::ValidationError;
use crate::rules::{RuleId, Strictness};
use jitval_tril::il::Node;
use jitval_tril::{MethodIl, NodeId};
use serde::Serialize;
use std::fmt;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Structural failure; validation always stops.
    Unsound,
    /// Failure of a strict rule.
    Error,
    /// Failure of a lenient rule.
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Defect {
    pub rule: RuleId,
    pub severity: Severity,
    pub node: Option<NodeId>,
    pub opcode: Option<&'static str>,
    pub method: String,
    pub message: String,
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.severity, self.node) {
            (Severity::Unsound, Some(node)) => {
                writeln!(f, "*** VALIDATION ERROR: IL is unsound at {} ***", node)?
            }
            (Severity::Unsound, None) => writeln!(f, "*** VALIDATION ERROR: IL is unsound ***")?,
            (_, node) => {
                writeln!(f, "*** VALIDATION ERROR ***")?;
                let opcode = self.opcode.unwrap_or("<none>");
                match node {
                    Some(node) => writeln!(f, "Node: {} {}", opcode, node)?,
                    None => writeln!(f, "Node: {}", opcode)?,
                }
            }
        }
        writeln!(f, "Method: {}", self.method)?;
        write!(f, "{}", self.message)
    }
}

pub struct RuleContext<'a> {
    il: &'a MethodIl,
    config: &'a ValidatorConfig,
    log: Option<&'a mut dyn Write>,
    rule: RuleId,
    strictness: Strictness,
    defects: Vec<Defect>,
}

impl<'a> RuleContext<'a> {
    pub fn new(il: &'a MethodIl, config: &'a ValidatorConfig, rule: RuleId, strictness: Strictness) -> Self {
        Self {
            il,
            config,
            log: None,
            rule,
            strictness,
            defects: vec![],
        }
    }

    /// Mirror every diagnostic into `log` as well.
    pub fn with_log(mut self, log: &'a mut dyn Write) -> Self {
        self.log = Some(log);
        self
    }

    pub fn il(&self) -> &'a MethodIl {
        self.il
    }

    pub fn config(&self) -> &'a ValidatorConfig {
        self.config
    }

    pub fn target(&self) -> Target {
        self.config.target
    }

    /// Make `rule` the rule that subsequent failures are charged to.
    pub fn select(&mut self, rule: RuleId, strictness: Strictness) {
        self.rule = rule;
        self.strictness = strictness;
    }

    pub fn rule(&self) -> RuleId {
        self.rule
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub fn defects(&self) -> &[Defect] {
        &self.defects
    }

    pub fn into_defects(self) -> Vec<Defect> {
        self.defects
    }

    pub fn check(
        &mut self,
        node: &Node,
        condition: bool,
        message: impl FnOnce() -> String,
    ) -> Result<(), ValidationError> {
        if condition {
            Ok(())
        } else {
            self.fail(node, message())
        }
    }

    pub fn fail(&mut self, node: &Node, message: impl Into<String>) -> Result<(), ValidationError> {
        let severity = match self.strictness {
            Strictness::Strict => Severity::Error,
            Strictness::Lenient => Severity::Warning,
        };
        let defect = Defect {
            rule: self.rule,
            severity,
            node: Some(node.global_index()),
            opcode: Some(node.opcode.name()),
            method: self.il.signature().to_string(),
            message: message.into(),
        };
        self.emit(&defect)?;
        self.defects.push(defect.clone());

        if severity == Severity::Warning {
            log::warn!("{} (lenient): {} at {}", self.rule, defect.message, node.global_index());
            return Ok(());
        }
        if self.config.continue_after_error {
            return Ok(());
        }
        Err(ValidationError::Aborted { rule: self.rule, defect })
    }

    pub fn check_sound(
        &mut self,
        location: Option<&Node>,
        condition: bool,
        message: impl FnOnce() -> String,
    ) -> Result<(), ValidationError> {
        if condition {
            Ok(())
        } else {
            self.unsound(location, message())
        }
    }

    /// Report unsound IL at the treetop rooted by `location`. Always `Err`.
    pub fn unsound(&mut self, location: Option<&Node>, message: impl Into<String>) -> Result<(), ValidationError> {
        let defect = Defect {
            rule: RuleId::SoundnessRule,
            severity: Severity::Unsound,
            node: location.map(|n| n.global_index()),
            opcode: location.map(|n| n.opcode.name()),
            method: self.il.signature().to_string(),
            message: message.into(),
        };
        self.emit(&defect)?;
        self.defects.push(defect.clone());
        Err(ValidationError::Unsound { defect })
    }

    fn emit(&mut self, defect: &Defect) -> Result<(), ValidationError> {
        if self.config.echo_to_stderr {
            eprintln!("{}", defect);
        }
        if let Some(log) = self.log.as_deref_mut() {
            writeln!(log, "{}", defect)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jitval_tril::{MethodBuilder, OpCode};

    fn quiet() -> ValidatorConfig {
        ValidatorConfig { echo_to_stderr: false, ..ValidatorConfig::default() }
    }

    fn sample() -> (MethodIl, NodeId) {
        let mut b = MethodBuilder::new("sample(I)I");
        b.begin_block(false);
        let c = b.iconst(1);
        b.anchor(OpCode::IReturn, &[c]);
        (b.finish(), c)
    }

    #[test]
    fn test_strict_failure_aborts() {
        let (il, c) = sample();
        let config = quiet();
        let mut cx = RuleContext::new(&il, &config, RuleId::ValidateChildCount, Strictness::Strict);
        let err = cx.fail(il.node(c).unwrap(), "boom").unwrap_err();
        match err {
            ValidationError::Aborted { rule, defect } => {
                assert_eq!(rule, RuleId::ValidateChildCount);
                assert_eq!(defect.node, Some(c));
                assert_eq!(defect.severity, Severity::Error);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(cx.defects().len(), 1);
    }

    #[test]
    fn test_continue_override_records_and_proceeds() {
        let (il, c) = sample();
        let config = ValidatorConfig { continue_after_error: true, ..quiet() };
        let mut cx = RuleContext::new(&il, &config, RuleId::ValidateChildCount, Strictness::Strict);
        assert!(cx.fail(il.node(c).unwrap(), "first").is_ok());
        assert!(cx.check(il.node(c).unwrap(), false, || "second".to_string()).is_ok());
        assert_eq!(cx.defects().len(), 2);
    }

    #[test]
    fn test_unsound_ignores_continue_override() {
        let (il, c) = sample();
        let config = ValidatorConfig { continue_after_error: true, ..quiet() };
        let mut cx = RuleContext::new(&il, &config, RuleId::SoundnessRule, Strictness::Lenient);
        let err = cx.unsound(il.node(c), "bad").unwrap_err();
        assert!(matches!(err, ValidationError::Unsound { .. }));
    }

    #[test]
    fn test_diagnostic_format() {
        let (il, c) = sample();
        let config = quiet();
        let mut log: Vec<u8> = vec![];
        {
            let mut cx = RuleContext::new(&il, &config, RuleId::ValidateChildTypes, Strictness::Lenient)
                .with_log(&mut log);
            cx.fail(il.node(c).unwrap(), "Child 0 has unexpected type Float (expected Int32)")
                .unwrap();
            cx.unsound(il.node(c), "n1n must not be its own ancestor").unwrap_err();
        }
        let text = String::from_utf8(log).unwrap();
        let expected = format!(
            "*** VALIDATION ERROR ***\nNode: iconst {c}\nMethod: sample(I)I\n\
             Child 0 has unexpected type Float (expected Int32)\n\
             *** VALIDATION ERROR: IL is unsound at {c} ***\nMethod: sample(I)I\n\
             n1n must not be its own ancestor\n"
        );
        assert_eq!(text, expected);
    }
}
