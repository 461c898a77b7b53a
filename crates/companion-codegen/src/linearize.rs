//! Block graph validation and ordering.
//! - index: id lookup, duplicate detection
//! - links: dangling references
//! - cycles: depth-first walk over inputs and `next`
//! - parents: a block plugs into at most one socket
//! - depth: input nesting stays under [`MAX_NESTING`]

use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;

use crate::error::GenerationError;
use crate::snapshot::{Block, BlockGraph};

/// Deepest input nesting accepted. A `next` link stays at its parent's depth.
pub(crate) const MAX_NESTING: usize = 128;

/// A validated graph: every link resolves, no block has two parents and there
/// are no cycles and nesting is bounded, so recursive emission terminates
/// within a fixed stack depth.
#[derive(Debug)]
pub(crate) struct LinearGraph<'a> {
    index: IndexMap<&'a str, &'a Block>,
    roots: Vec<&'a Block>,
}

impl<'a> LinearGraph<'a> {
    pub(crate) fn build(graph: &'a BlockGraph) -> Result<Self, GenerationError> {
        let mut index = IndexMap::with_capacity(graph.blocks.len());
        for block in &graph.blocks {
            if index.insert(block.id.as_str(), block).is_some() {
                return Err(GenerationError::DuplicateBlock(block.id.clone()));
            }
        }

        for block in &graph.blocks {
            for (socket, target) in block.links() {
                if !index.contains_key(target.as_str()) {
                    return Err(GenerationError::MissingBlock {
                        block: block.id.clone(),
                        socket: SmolStr::new(socket),
                        target: target.clone(),
                    });
                }
            }
        }

        check_cycles(&index)?;

        let mut parented: IndexSet<&str> = IndexSet::new();
        for block in &graph.blocks {
            for (_, target) in block.links() {
                if !parented.insert(target.as_str()) {
                    return Err(GenerationError::SharedBlock(target.clone()));
                }
            }
        }

        let roots = graph
            .blocks
            .iter()
            .filter(|block| !parented.contains(block.id.as_str()))
            .collect::<Vec<_>>();
        check_depth(&index, &roots)?;
        Ok(Self { index, roots })
    }

    /// Top-level blocks in document order.
    pub(crate) fn roots(&self) -> &[&'a Block] {
        &self.roots
    }

    pub(crate) fn get(&self, id: &str) -> Option<&'a Block> {
        self.index.get(id).copied()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

fn check_cycles(index: &IndexMap<&str, &Block>) -> Result<(), GenerationError> {
    let mut marks: IndexMap<&str, Mark> = IndexMap::with_capacity(index.len());
    for &id in index.keys() {
        if marks.contains_key(id) {
            continue;
        }
        // Explicit stack of (block, next link position) so deep chains cannot
        // overflow the call stack.
        let mut stack: Vec<(&str, usize)> = vec![(id, 0)];
        marks.insert(id, Mark::Visiting);
        while let Some((current, position)) = stack.pop() {
            let block = index[current];
            let Some((_, target)) = block.links().nth(position) else {
                marks.insert(current, Mark::Done);
                continue;
            };
            stack.push((current, position + 1));
            match marks.get(target.as_str()) {
                Some(Mark::Visiting) => return Err(GenerationError::Cycle(target.clone())),
                Some(Mark::Done) => {}
                None => {
                    marks.insert(target.as_str(), Mark::Visiting);
                    stack.push((target.as_str(), 0));
                }
            }
        }
    }
    Ok(())
}

fn check_depth(
    index: &IndexMap<&str, &Block>,
    roots: &[&Block],
) -> Result<(), GenerationError> {
    let mut stack: Vec<(&Block, usize)> = roots.iter().map(|&block| (block, 0)).collect();
    while let Some((block, depth)) = stack.pop() {
        if depth > MAX_NESTING {
            return Err(GenerationError::TooDeep {
                block: block.id.clone(),
                limit: MAX_NESTING,
            });
        }
        for (socket, target) in block.links() {
            let child_depth = if socket == "next" { depth } else { depth + 1 };
            stack.push((index[target.as_str()], child_depth));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(json: &str) -> BlockGraph {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn roots_keep_document_order() {
        let graph = graph(
            r#"{"blocks":[
                {"id":"b","type":"math_number","fields":{"NUM":"1"}},
                {"id":"a","type":"global_declaration","fields":{"NAME":"x"},"inputs":{"VALUE":"b"}},
                {"id":"c","type":"text","fields":{"TEXT":"hi"}}
            ]}"#,
        );
        let linear = LinearGraph::build(&graph).unwrap();
        let roots = linear
            .roots()
            .iter()
            .map(|block| block.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(roots, vec!["a", "c"]);
        assert!(linear.get("b").is_some());
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let graph = graph(r#"{"blocks":[{"id":"a","type":"controls_if","next":"a"}]}"#);
        assert_eq!(
            LinearGraph::build(&graph).unwrap_err(),
            GenerationError::Cycle("a".into())
        );
    }

    #[test]
    fn rootless_ring_is_a_cycle() {
        let graph = graph(
            r#"{"blocks":[
                {"id":"a","type":"controls_if","next":"b"},
                {"id":"b","type":"controls_if","next":"c"},
                {"id":"c","type":"controls_if","next":"a"}
            ]}"#,
        );
        assert!(matches!(
            LinearGraph::build(&graph),
            Err(GenerationError::Cycle(_))
        ));
    }

    #[test]
    fn dangling_input_is_reported() {
        let graph = graph(
            r#"{"blocks":[{"id":"a","type":"global_declaration","inputs":{"VALUE":"zz"}}]}"#,
        );
        assert_eq!(
            LinearGraph::build(&graph).unwrap_err(),
            GenerationError::MissingBlock {
                block: "a".into(),
                socket: "VALUE".into(),
                target: "zz".into(),
            }
        );
    }

    #[test]
    fn duplicate_ids_and_shared_children_are_rejected() {
        let duplicate = graph(
            r#"{"blocks":[{"id":"a","type":"text"},{"id":"a","type":"text"}]}"#,
        );
        assert_eq!(
            LinearGraph::build(&duplicate).unwrap_err(),
            GenerationError::DuplicateBlock("a".into())
        );

        let shared = graph(
            r#"{"blocks":[
                {"id":"a","type":"math_arithmetic","inputs":{"A":"n","B":"n"}},
                {"id":"n","type":"math_number","fields":{"NUM":"2"}}
            ]}"#,
        );
        assert_eq!(
            LinearGraph::build(&shared).unwrap_err(),
            GenerationError::SharedBlock("n".into())
        );
    }

    #[test]
    fn nesting_limit_counts_inputs_not_next() {
        let mut blocks = Vec::new();
        for i in 0..=MAX_NESTING {
            blocks.push(format!(
                r#"{{"id":"s{i}","type":"controls_if","inputs":{{"DO0":"s{}"}},"next":"t{i}"}}"#,
                i + 1
            ));
            blocks.push(format!(r#"{{"id":"t{i}","type":"controls_if"}}"#));
        }
        blocks.push(format!(r#"{{"id":"s{}","type":"controls_if"}}"#, MAX_NESTING + 1));
        let deep = graph(&format!(r#"{{"blocks":[{}]}}"#, blocks.join(",")));
        assert_eq!(
            LinearGraph::build(&deep).unwrap_err(),
            GenerationError::TooDeep {
                block: SmolStr::new(format!("s{}", MAX_NESTING + 1)),
                limit: MAX_NESTING,
            }
        );

        let long_chain = (0..1000)
            .map(|i| format!(r#"{{"id":"c{i}","type":"controls_if","next":"c{}"}}"#, i + 1))
            .chain(std::iter::once(r#"{"id":"c1000","type":"controls_if"}"#.to_string()))
            .collect::<Vec<_>>();
        let chain = graph(&format!(r#"{{"blocks":[{}]}}"#, long_chain.join(",")));
        assert_eq!(LinearGraph::build(&chain).unwrap().roots().len(), 1);
    }
}
