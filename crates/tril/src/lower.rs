/// Lowering from parsed Tril forms to method IL.
///
/// Reference counts come from the builder (one per parent reference); a
/// `refcount=` attribute overrides the computed value once the whole method
/// is built, which is how deliberately invalid IL is written.

use crate::ast::{attribute, Attribute, Form, MethodForm, Value};
use crate::error::ParseError;
use crate::il::{MethodBuilder, MethodIl, NodeId, OpCode, Payload, Symbol};
use std::collections::HashMap;

pub fn lower_method(form: &MethodForm<'_>) -> Result<MethodIl, ParseError> {
    let name = match attribute(&form.attributes, "name").map(|a| &a.value) {
        Some(Value::String(s)) | Some(Value::Identifier(s)) => s.clone(),
        Some(_) => {
            return Err(ParseError::InvalidAttribute { line: form.line, name: "name".to_string() });
        }
        None => "<unnamed>".to_string(),
    };

    let mut lowerer = Lowerer {
        builder: MethodBuilder::new(name),
        labels: HashMap::new(),
        overrides: vec![],
    };

    for block in &form.blocks {
        let extension = match attribute(&block.attributes, "extension") {
            Some(attr) => flag(attr)?,
            None => false,
        };
        lowerer.builder.begin_block(extension);
        for treetop in &block.treetops {
            let node = lowerer.lower_form(treetop)?;
            lowerer.builder.append_treetop(node);
        }
        lowerer.builder.end_block();
    }

    let Lowerer { builder, overrides, .. } = lowerer;
    let mut il = builder.finish();
    for (node, count) in overrides {
        il.set_reference_count(node, count);
    }
    log::debug!("lowered method {} ({} nodes)", il.signature(), il.node_capacity());
    Ok(il)
}

struct Lowerer {
    builder: MethodBuilder,
    labels: HashMap<String, NodeId>,
    overrides: Vec<(NodeId, u32)>,
}

impl Lowerer {
    fn lower_form(&mut self, form: &Form<'_>) -> Result<NodeId, ParseError> {
        match form {
            Form::Reference { name, line } => self
                .labels
                .get(name)
                .copied()
                .ok_or_else(|| ParseError::UndefinedReference { line: *line, name: name.clone() }),
            Form::Node { opcode, attributes, children, line } => {
                let op = OpCode::from_name(opcode)
                    .ok_or_else(|| ParseError::UnknownOpcode { line: *line, name: opcode.clone() })?;

                let mut child_ids = Vec::with_capacity(children.len());
                for child in children {
                    child_ids.push(self.lower_form(child)?);
                }

                let payload = payload(op, attributes)?;
                let node = self.builder.create_with(op, &child_ids, payload);

                if let Some(attr) = attribute(attributes, "id") {
                    let label = match &attr.value {
                        Value::Identifier(s) | Value::String(s) => s.clone(),
                        Value::Integer(n) => n.to_string(),
                        Value::Float(_) => {
                            return Err(ParseError::InvalidAttribute { line: attr.line, name: "id".to_string() });
                        }
                    };
                    if self.labels.insert(label.clone(), node).is_some() {
                        return Err(ParseError::DuplicateLabel { line: attr.line, name: label });
                    }
                }
                if let Some(attr) = attribute(attributes, "refcount") {
                    self.overrides.push((node, unsigned(attr)?));
                }
                Ok(node)
            }
        }
    }
}

fn payload(op: OpCode, attributes: &[Attribute]) -> Result<Payload, ParseError> {
    if let Some(attr) = attribute(attributes, "value") {
        let wants_float = matches!(op, OpCode::FConst | OpCode::DConst);
        return match (&attr.value, wants_float) {
            (Value::Integer(n), false) => Ok(Payload::Int(*n)),
            (Value::Integer(n), true) => Ok(Payload::Float(*n as f64)),
            (Value::Float(f), true) => Ok(Payload::Float(*f)),
            _ => Err(ParseError::InvalidAttribute { line: attr.line, name: attr.name.clone() }),
        };
    }
    if let Some(attr) = attribute(attributes, "parm") {
        return Ok(Payload::Symbol(Symbol::Parm(unsigned(attr)?)));
    }
    if let Some(attr) = attribute(attributes, "temp") {
        return Ok(Payload::Symbol(Symbol::Temp(unsigned(attr)?)));
    }
    Ok(Payload::None)
}

fn unsigned(attr: &Attribute) -> Result<u32, ParseError> {
    match attr.value {
        Value::Integer(n) => u32::try_from(n)
            .map_err(|_| ParseError::InvalidAttribute { line: attr.line, name: attr.name.clone() }),
        _ => Err(ParseError::InvalidAttribute { line: attr.line, name: attr.name.clone() }),
    }
}

fn flag(attr: &Attribute) -> Result<bool, ParseError> {
    match &attr.value {
        Value::Identifier(s) if s == "true" => Ok(true),
        Value::Identifier(s) if s == "false" => Ok(false),
        _ => Err(ParseError::InvalidAttribute { line: attr.line, name: attr.name.clone() }),
    }
}

#[cfg(test)]
mod tests {
    use crate::il::{OpCode, Payload};
    use crate::parse_methods;

    #[test]
    fn test_lowering_counts_references() {
        let methods = parse_methods(
            "(method name=m (block (ireturn (iadd id=s (iload parm=0) (iload parm=1)))) \
             (block extension (treetop @s)))",
        )
        .unwrap();
        let il = &methods[0];
        assert_eq!(il.signature(), "m");
        let iadd = il.nodes().find(|n| n.opcode == OpCode::IAdd).unwrap();
        assert_eq!(iadd.reference_count, 2);
        assert!(il.blocks()[1].is_extension_of_previous);
    }

    #[test]
    fn test_refcount_override() {
        let methods =
            parse_methods("(method (block (treetop (iconst value=5 refcount=3))))").unwrap();
        let c = methods[0].nodes().find(|n| n.opcode == OpCode::IConst).unwrap();
        assert_eq!(c.reference_count, 3);
        assert_eq!(c.payload, Payload::Int(5));
    }

    #[test]
    fn test_undefined_reference() {
        let err = parse_methods("(method (block (treetop @nope)))").unwrap_err();
        assert!(err[0].to_string().contains("undefined node '@nope'"));
    }

    #[test]
    fn test_unknown_opcode() {
        let err = parse_methods("(method (block (frobnicate)))").unwrap_err();
        assert!(err[0].to_string().contains("unknown opcode 'frobnicate'"));
    }

    #[test]
    fn test_float_constant() {
        let methods = parse_methods("(method (block (dreturn (dconst value=2))))").unwrap();
        let c = methods[0].nodes().find(|n| n.opcode == OpCode::DConst).unwrap();
        assert_eq!(c.payload, Payload::Float(2.0));
    }
}
