//! Per-block YAIL translation.

use smol_str::SmolStr;
use tracing::debug;

use crate::error::GenerationError;
use crate::linearize::LinearGraph;
use crate::snapshot::Block;

const GLOBAL_PREFIX: &str = "global ";

/// Translates validated blocks into s-expressions.
pub(crate) struct Emitter<'g, 'a> {
    graph: &'g LinearGraph<'a>,
}

impl<'g, 'a> Emitter<'g, 'a> {
    pub(crate) fn new(graph: &'g LinearGraph<'a>) -> Self {
        Self { graph }
    }

    /// Emit one block and, for statements, the chain that follows it.
    pub(crate) fn top_level(&self, block: &Block) -> Result<String, GenerationError> {
        self.chain(block)
    }

    /// Blocks along `next` links, joined by spaces. Disabled blocks are left
    /// out; their successors are not.
    fn chain(&self, first: &Block) -> Result<String, GenerationError> {
        let mut parts = Vec::new();
        let mut cursor = Some(first);
        while let Some(block) = cursor {
            if block.disabled {
                debug!("skipping disabled block {}", block.id);
            } else {
                parts.push(self.block(block)?);
            }
            cursor = match &block.next {
                Some(id) => Some(self.lookup(block, "next", id)?),
                None => None,
            };
        }
        Ok(parts.join(" "))
    }

    fn block(&self, block: &Block) -> Result<String, GenerationError> {
        match block.kind.as_str() {
            "global_declaration" => {
                let name = field(block, "NAME")?;
                let value = self.value(block, "VALUE")?;
                Ok(format!("(def g${name} {value})"))
            }
            "lexical_variable_get" => {
                let name = field(block, "VAR")?;
                Ok(match name.strip_prefix(GLOBAL_PREFIX) {
                    Some(global) => format!("(get-var g${global})"),
                    None => format!("(lexical-value ${name})"),
                })
            }
            "lexical_variable_set" => {
                let name = field(block, "VAR")?;
                let value = self.value(block, "VALUE")?;
                Ok(match name.strip_prefix(GLOBAL_PREFIX) {
                    Some(global) => format!("(set-var! g${global} {value})"),
                    None => format!("(set-lexical! ${name} {value})"),
                })
            }
            "math_number" => {
                let text = field(block, "NUM")?.trim();
                if text.parse::<f64>().is_err() {
                    return Err(evaluation(block, format!("invalid number '{text}'")));
                }
                Ok(text.to_string())
            }
            "math_arithmetic" => {
                let op = field(block, "OP")?;
                let (primitive, symbol) = match op {
                    "ADD" => ("+", "+"),
                    "MINUS" => ("-", "-"),
                    "MULTIPLY" => ("*", "*"),
                    "DIVIDE" => ("yail-divide", "/"),
                    "POWER" => ("expt", "^"),
                    other => return Err(evaluation(block, format!("unknown operator '{other}'"))),
                };
                let a = self.value(block, "A")?;
                let b = self.value(block, "B")?;
                Ok(format!(
                    "(call-yail-primitive {primitive} (*list-for-runtime* {a} {b}) '(number number) \"{symbol}\")"
                ))
            }
            "text" => Ok(quote(field(block, "TEXT")?)),
            "logic_boolean" => match field(block, "BOOL")? {
                "TRUE" => Ok("#t".to_string()),
                "FALSE" => Ok("#f".to_string()),
                other => Err(evaluation(block, format!("invalid boolean '{other}'"))),
            },
            "controls_if" => {
                let condition = self.value(block, "IF0")?;
                let then = self.statements(block, "DO0")?;
                match block.inputs.get("ELSE") {
                    Some(_) => {
                        let otherwise = self.statements(block, "ELSE")?;
                        Ok(format!(
                            "(if {condition} {} {})",
                            begin(&then),
                            begin(&otherwise)
                        ))
                    }
                    None => Ok(format!("(if {condition} {})", begin(&then))),
                }
            }
            "component_event" => {
                let component = field(block, "COMPONENT")?;
                let event = field(block, "EVENT")?;
                let body = self.statements(block, "DO")?;
                if body.is_empty() {
                    Ok(format!("(define-event {component} {event} () (set-this-form))"))
                } else {
                    Ok(format!(
                        "(define-event {component} {event} () (set-this-form) {body})"
                    ))
                }
            }
            "component_set_get" => {
                let component = field(block, "COMPONENT")?;
                let property = field(block, "PROPERTY")?;
                match block.fields.get("MODE").map(String::as_str).unwrap_or("get") {
                    "set" => {
                        let value = self.value(block, "VALUE")?;
                        Ok(format!(
                            "(set-and-coerce-property! '{component} '{property} {value} 'any)"
                        ))
                    }
                    "get" => Ok(format!("(get-property '{component} '{property})")),
                    other => Err(evaluation(block, format!("unknown mode '{other}'"))),
                }
            }
            _ => Err(GenerationError::UnsupportedBlock {
                block: block.id.clone(),
                kind: block.kind.clone(),
            }),
        }
    }

    /// Required value socket.
    fn value(&self, block: &Block, socket: &str) -> Result<String, GenerationError> {
        let Some(id) = block.inputs.get(socket) else {
            return Err(GenerationError::MissingSocket {
                block: block.id.clone(),
                kind: block.kind.clone(),
                socket: SmolStr::new(socket),
            });
        };
        let target = self.lookup(block, socket, id)?;
        self.block(target)
    }

    /// Optional statement socket; empty when nothing is plugged in.
    fn statements(&self, block: &Block, socket: &str) -> Result<String, GenerationError> {
        match block.inputs.get(socket) {
            Some(id) => self.chain(self.lookup(block, socket, id)?),
            None => Ok(String::new()),
        }
    }

    fn lookup(
        &self,
        parent: &Block,
        socket: &str,
        id: &SmolStr,
    ) -> Result<&'a Block, GenerationError> {
        self.graph
            .get(id.as_str())
            .ok_or_else(|| GenerationError::MissingBlock {
                block: parent.id.clone(),
                socket: SmolStr::new(socket),
                target: id.clone(),
            })
    }
}

fn field<'b>(block: &'b Block, name: &str) -> Result<&'b str, GenerationError> {
    block
        .fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| GenerationError::MissingField {
            block: block.id.clone(),
            kind: block.kind.clone(),
            field: SmolStr::new(name),
        })
}

fn evaluation(block: &Block, message: String) -> GenerationError {
    GenerationError::Evaluation {
        block: block.id.clone(),
        message: message.into(),
    }
}

fn begin(body: &str) -> String {
    if body.is_empty() {
        "(begin)".to_string()
    } else {
        format!("(begin {body})")
    }
}

/// Quote a string as a YAIL literal.
pub(crate) fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::BlockGraph;

    fn emit_all(json: &str) -> Result<Vec<String>, GenerationError> {
        let graph: BlockGraph = serde_json::from_str(json).unwrap();
        let linear = LinearGraph::build(&graph)?;
        let emitter = Emitter::new(&linear);
        linear
            .roots()
            .iter()
            .map(|block| emitter.top_level(block))
            .collect()
    }

    #[test]
    fn global_with_arithmetic() {
        let out = emit_all(
            r#"{"blocks":[
                {"id":"g","type":"global_declaration","fields":{"NAME":"total"},"inputs":{"VALUE":"sum"}},
                {"id":"sum","type":"math_arithmetic","fields":{"OP":"ADD"},"inputs":{"A":"one","B":"two"}},
                {"id":"one","type":"math_number","fields":{"NUM":"1"}},
                {"id":"two","type":"math_number","fields":{"NUM":" 2.5 "}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            out,
            vec![
                "(def g$total (call-yail-primitive + (*list-for-runtime* 1 2.5) '(number number) \"+\"))"
            ]
        );
    }

    #[test]
    fn event_body_follows_next_chain() {
        let out = emit_all(
            r#"{"blocks":[
                {"id":"e","type":"component_event","fields":{"COMPONENT":"Button1","EVENT":"Click"},"inputs":{"DO":"s1"}},
                {"id":"s1","type":"lexical_variable_set","fields":{"VAR":"global count"},"inputs":{"VALUE":"t"},"next":"s2"},
                {"id":"t","type":"logic_boolean","fields":{"BOOL":"TRUE"}},
                {"id":"s2","type":"component_set_get","fields":{"COMPONENT":"Label1","PROPERTY":"Text","MODE":"set"},"inputs":{"VALUE":"msg"}},
                {"id":"msg","type":"text","fields":{"TEXT":"say \"hi\""}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            out[0],
            "(define-event Button1 Click () (set-this-form) (set-var! g$count #t) \
             (set-and-coerce-property! 'Label1 'Text \"say \\\"hi\\\"\" 'any))"
        );
    }

    #[test]
    fn if_without_body_and_local_variable() {
        let out = emit_all(
            r#"{"blocks":[
                {"id":"i","type":"controls_if","inputs":{"IF0":"v"}},
                {"id":"v","type":"lexical_variable_get","fields":{"VAR":"flag"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(out, vec!["(if (lexical-value $flag) (begin))"]);
    }

    #[test]
    fn missing_value_socket() {
        let err = emit_all(
            r#"{"blocks":[{"id":"g","type":"global_declaration","fields":{"NAME":"x"}}]}"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            GenerationError::MissingSocket {
                block: "g".into(),
                kind: "global_declaration".into(),
                socket: "VALUE".into(),
            }
        );
    }

    #[test]
    fn bad_literals_fail_evaluation() {
        let err = emit_all(r#"{"blocks":[{"id":"n","type":"math_number","fields":{"NUM":"12a"}}]}"#)
            .unwrap_err();
        assert!(matches!(err, GenerationError::Evaluation { ref block, .. } if block == "n"));

        let err = emit_all(r#"{"blocks":[{"id":"x","type":"procedures_defnoreturn"}]}"#)
            .unwrap_err();
        assert_eq!(
            err,
            GenerationError::UnsupportedBlock {
                block: "x".into(),
                kind: "procedures_defnoreturn".into(),
            }
        );
    }

    #[test]
    fn disabled_statements_are_left_out_of_chains() {
        let out = emit_all(
            r#"{"blocks":[
                {"id":"e","type":"component_event","fields":{"COMPONENT":"Button1","EVENT":"Click"},"inputs":{"DO":"s1"}},
                {"id":"s1","type":"lexical_variable_set","fields":{"VAR":"a"},"inputs":{"VALUE":"one"},"next":"s2","disabled":true},
                {"id":"one","type":"math_number","fields":{"NUM":"1"}},
                {"id":"s2","type":"lexical_variable_set","fields":{"VAR":"b"},"inputs":{"VALUE":"two"},"next":"s3"},
                {"id":"two","type":"math_number","fields":{"NUM":"2"}},
                {"id":"s3","type":"procedures_callnoreturn","disabled":true}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            out,
            vec!["(define-event Button1 Click () (set-this-form) (set-lexical! $b 2))"]
        );

        let out = emit_all(
            r#"{"blocks":[
                {"id":"i","type":"controls_if","inputs":{"IF0":"t","DO0":"off"}},
                {"id":"t","type":"logic_boolean","fields":{"BOOL":"TRUE"}},
                {"id":"off","type":"text","fields":{"TEXT":"x"},"disabled":true}
            ]}"#,
        )
        .unwrap();
        assert_eq!(out, vec!["(if #t (begin))"]);
    }

    #[test]
    fn unresolved_link_names_its_socket() {
        let graph: BlockGraph = serde_json::from_str(r#"{"blocks":[]}"#).unwrap();
        let linear = LinearGraph::build(&graph).unwrap();
        let emitter = Emitter::new(&linear);

        let orphan: Block = serde_json::from_str(
            r#"{"id":"g","type":"global_declaration","fields":{"NAME":"x"},"inputs":{"VALUE":"zz"}}"#,
        )
        .unwrap();
        assert_eq!(
            emitter.top_level(&orphan).unwrap_err(),
            GenerationError::MissingBlock {
                block: "g".into(),
                socket: "VALUE".into(),
                target: "zz".into(),
            }
        );

        let orphan: Block = serde_json::from_str(
            r#"{"id":"e","type":"component_event","fields":{"COMPONENT":"Button1","EVENT":"Click"},"inputs":{"DO":"zz"}}"#,
        )
        .unwrap();
        assert_eq!(
            emitter.top_level(&orphan).unwrap_err(),
            GenerationError::MissingBlock {
                block: "e".into(),
                socket: "DO".into(),
                target: "zz".into(),
            }
        );
    }
}
