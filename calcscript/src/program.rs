//! Program assembly.
//!
//! The embedder cuts a document into fenced blocks (the CLI does this for
//! markdown files) and hands them over in document order. Assembly parses
//! the known block kinds, enforces the shared name space across inputs,
//! tables and calc nodes, and rebases every diagnostic onto document line
//! numbers. Unknown block langs ride along untouched so embedders can
//! still render them.

use std::collections::HashMap;

use calcscript_core::{codes, Diagnostic};

use crate::compile::{compile_decl, CalcNode};
use crate::datablock::{self, DataTable};
use crate::extract::{self, ExtractItem};
use crate::input::{self, InputDefinition};

/// One fenced block of a source document.
#[derive(Debug, Clone)]
pub struct Block {
    /// Fence language tag: `inputs`, `data`, `calc`, or anything else.
    pub lang: String,
    /// Body without the fences.
    pub content: String,
    /// 1-based document line of the first content line.
    pub line: u32,
}

impl Block {
    pub fn new(lang: impl Into<String>, content: impl Into<String>, line: u32) -> Self {
        Self {
            lang: lang.into(),
            content: content.into(),
            line,
        }
    }
}

/// An assembled program, ready to evaluate any number of times.
///
/// Lines in `inputs`, `tables` and `nodes` are document-absolute.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub front_matter: Option<String>,
    /// Every block in document order, unknown langs included.
    pub blocks: Vec<Block>,
    pub inputs: Vec<InputDefinition>,
    pub tables: Vec<DataTable>,
    pub nodes: Vec<CalcNode>,
}

/// Assemble a program from pre-fenced blocks.
///
/// Never fails as a whole: every problem becomes a diagnostic and the
/// surviving definitions are returned.
pub fn assemble(front_matter: Option<String>, blocks: Vec<Block>) -> (Program, Vec<Diagnostic>) {
    let mut diags = Vec::new();
    let mut inputs: Vec<InputDefinition> = Vec::new();
    let mut tables: Vec<DataTable> = Vec::new();
    let mut nodes: Vec<CalcNode> = Vec::new();
    let mut taken: HashMap<String, &'static str> = HashMap::new();

    for block in &blocks {
        match block.lang.as_str() {
            "inputs" => {
                let (defs, block_diags) = input::parse_block(&block.content);
                diags.extend(block_diags.into_iter().map(|d| place(d, block)));
                for mut def in defs {
                    def.line = block.line + def.line - 1;
                    match claim(&mut taken, &def.name, "an input") {
                        Ok(()) => inputs.push(def),
                        Err(d) => diags.push(d.at_line(def.line).in_block("inputs")),
                    }
                }
            }
            "data" => {
                let (table, block_diags) = datablock::parse_block(&block.content);
                diags.extend(block_diags.into_iter().map(|d| place(d, block)));
                if let Some(mut table) = table {
                    table.line = block.line + table.line - 1;
                    match claim(&mut taken, &table.name, "a table") {
                        Ok(()) => tables.push(table),
                        Err(d) => diags.push(d.at_line(table.line).in_block("data")),
                    }
                }
            }
            "calc" => {
                for item in extract::extract(&block.content) {
                    match item {
                        ExtractItem::Malformed { line, message } => diags.push(
                            Diagnostic::error(codes::PARSE_ERROR, message)
                                .at_line(block.line + line - 1)
                                .in_block("calc"),
                        ),
                        ExtractItem::Decl(mut decl) => {
                            decl.line = block.line + decl.line - 1;
                            match claim(&mut taken, &decl.name, "a calc node") {
                                Ok(()) => {
                                    let (node, diag) = compile_decl(&decl);
                                    if let Some(d) = diag {
                                        diags.push(d.in_block("calc"));
                                    }
                                    nodes.push(node);
                                }
                                Err(d) => diags.push(
                                    d.at_line(decl.line)
                                        .in_block("calc")
                                        .for_node(decl.name.as_str()),
                                ),
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let program = Program {
        front_matter,
        blocks,
        inputs,
        tables,
        nodes,
    };
    (program, diags)
}

/// Rebase a within-block diagnostic onto document lines and tag its block.
fn place(mut diag: Diagnostic, block: &Block) -> Diagnostic {
    diag.line = Some(match diag.line {
        Some(rel) => block.line + rel - 1,
        None => block.line,
    });
    diag.in_block(block.lang.as_str())
}

/// Reserve `name` in the shared name space, or say why it cannot be.
fn claim(
    taken: &mut HashMap<String, &'static str>,
    name: &str,
    kind: &'static str,
) -> Result<(), Diagnostic> {
    if name == crate::ROOT_NAME {
        return Err(Diagnostic::error(
            codes::RESERVED_NAME_USED,
            format!("'{}' is reserved for the standard library root", name),
        ));
    }
    if let Some(prior) = taken.get(name) {
        return Err(Diagnostic::error(
            codes::DUPLICATE_NAME,
            format!("duplicate name '{}': first defined as {}", name, prior),
        ));
    }
    taken.insert(name.to_string(), kind);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcscript_core::Severity;

    fn doc_blocks() -> Vec<Block> {
        vec![
            Block::new("inputs", "rate: percent = 5\nyears: integer = 10\n", 4),
            Block::new(
                "data",
                "name: loans\nprimaryKey: id\ncolumns:\n  id: number\n  principal: number\n---\n\
                 {\"id\": 1, \"principal\": 1000}\n",
                9,
            ),
            Block::new(
                "calc",
                "const monthly = calc.finance.toMonthlyRate(rate);\nconst n = years * 12;\n",
                20,
            ),
            Block::new("view", "# chart: loans by principal\n", 25),
        ]
    }

    #[test]
    fn test_assembles_all_block_kinds() {
        let (program, diags) = assemble(Some("title: Loans".to_string()), doc_blocks());
        assert!(diags.is_empty(), "{:?}", diags);
        assert_eq!(program.front_matter.as_deref(), Some("title: Loans"));
        assert_eq!(program.blocks.len(), 4);
        assert_eq!(program.inputs.len(), 2);
        assert_eq!(program.tables.len(), 1);
        assert_eq!(program.nodes.len(), 2);
        assert_eq!(program.nodes[0].deps, vec!["rate"]);
    }

    #[test]
    fn test_lines_are_document_absolute() {
        let (program, _) = assemble(None, doc_blocks());
        assert_eq!(program.inputs[0].line, 4);
        assert_eq!(program.inputs[1].line, 5);
        assert_eq!(program.tables[0].line, 9);
        assert_eq!(program.nodes[0].line, 20);
        assert_eq!(program.nodes[1].line, 21);
    }

    #[test]
    fn test_block_diagnostics_are_rebased_and_tagged() {
        let blocks = vec![Block::new("inputs", "rate: percent = 5\n???\n", 7)];
        let (program, diags) = assemble(None, blocks);
        assert_eq!(program.inputs.len(), 1);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, Some(8));
        assert_eq!(diags[0].block_lang.as_deref(), Some("inputs"));
    }

    #[test]
    fn test_duplicate_names_across_kinds() {
        let blocks = vec![
            Block::new("inputs", "x: number = 1\n", 1),
            Block::new(
                "data",
                "name: x\nprimaryKey: id\ncolumns:\n  id: number\n---\n",
                3,
            ),
            Block::new("calc", "const x = 2;", 10),
        ];
        let (program, diags) = assemble(None, blocks);
        assert_eq!(program.inputs.len(), 1);
        assert!(program.tables.is_empty());
        assert!(program.nodes.is_empty());
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.code == codes::DUPLICATE_NAME));
        assert!(diags[0].message.contains("first defined as an input"));
        assert_eq!(diags[0].block_lang.as_deref(), Some("data"));
        assert_eq!(diags[1].block_lang.as_deref(), Some("calc"));
        assert_eq!(diags[1].node_name.as_deref(), Some("x"));
    }

    #[test]
    fn test_reserved_root_name_is_rejected_everywhere() {
        let blocks = vec![
            Block::new("inputs", "calc: number = 1\n", 1),
            Block::new("calc", "const calc = 2;", 3),
        ];
        let (program, diags) = assemble(None, blocks);
        assert!(program.inputs.is_empty());
        assert!(program.nodes.is_empty());
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.code == codes::RESERVED_NAME_USED));
    }

    #[test]
    fn test_malformed_calc_text_does_not_sink_siblings() {
        let blocks = vec![Block::new(
            "calc",
            "flotsam\nconst a = 1;\n",
            30,
        )];
        let (program, diags) = assemble(None, blocks);
        assert_eq!(program.nodes.len(), 1);
        assert_eq!(program.nodes[0].name, "a");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, codes::PARSE_ERROR);
        assert_eq!(diags[0].line, Some(30));
    }

    #[test]
    fn test_unparseable_node_is_kept_as_failed() {
        let blocks = vec![Block::new("calc", "const a = 1 +;\nconst b = a;\n", 1)];
        let (program, diags) = assemble(None, blocks);
        assert_eq!(program.nodes.len(), 2);
        assert!(program.nodes[0].expr.is_none());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[0].code, codes::PARSE_ERROR);
        assert_eq!(diags[0].node_name.as_deref(), Some("a"));
    }

    #[test]
    fn test_unknown_lang_blocks_ride_along() {
        let blocks = vec![Block::new("view", "chart: bar\n", 2)];
        let (program, diags) = assemble(None, blocks);
        assert!(diags.is_empty());
        assert_eq!(program.blocks[0].lang, "view");
        assert_eq!(program.blocks[0].content, "chart: bar\n");
    }
}
