//! Text dump of IR trees.
//!
//! One line per statement-like node, children indented under their owner.
//! Loop and function bodies are printed directly under the loop or
//! function header. Operand positions print a short reference form:
//! declarations by name, registers as `%name`, memory as `[0x..]`.
//! A weak operand whose node is gone prints as `<expired>`.

use crate::arena::{Id, Ir, NodeId};
use crate::error::IrError;
use crate::node::{Add, Div, Mul, Node, Sub, TypeIdentifier};

/// Formatting knobs for [`Ir::dump_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintConfig {
    /// Spaces per nesting level.
    pub indent: usize,
    /// Append resolved widths to type names (`int32[4]`).
    pub show_widths: bool,
    /// Prefix every line with the node's handle (`#3`).
    pub show_ids: bool,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            indent: 2,
            show_widths: true,
            show_ids: false,
        }
    }
}

impl Ir {
    /// Dump the tree under `root` with the default configuration.
    pub fn dump(&self, root: impl Into<NodeId>) -> Result<String, IrError> {
        self.dump_with(root, &PrintConfig::default())
    }

    pub fn dump_with(
        &self,
        root: impl Into<NodeId>,
        config: &PrintConfig,
    ) -> Result<String, IrError> {
        let mut printer = Printer {
            ir: self,
            config,
            lines: Vec::new(),
        };
        printer.run(root.into())?;
        Ok(printer.lines.join("\n"))
    }
}

struct Printer<'a> {
    ir: &'a Ir,
    config: &'a PrintConfig,
    lines: Vec<String>,
}

impl Printer<'_> {
    fn line(&mut self, id: NodeId, depth: usize, text: String) {
        let pad = " ".repeat(depth * self.config.indent);
        if self.config.show_ids {
            self.lines.push(format!("{}{} {}", pad, id, text));
        } else {
            self.lines.push(format!("{}{}", pad, text));
        }
    }

    /// Print `root` and everything under it, one line per node. Scope,
    /// loop and function bodies are expanded from an explicit stack.
    fn run(&mut self, root: NodeId) -> Result<(), IrError> {
        let ir = self.ir;
        let mut pending = vec![(root, 0usize)];
        while let Some((id, depth)) = pending.pop() {
            let mut children: &[NodeId] = &[];
            let text = match ir.node(id)? {
                Node::Scope(scope) => {
                    children = scope.children.as_slice();
                    "scope".to_string()
                }
                Node::Loop(l) => {
                    children = ir.get(l.body)?.children.as_slice();
                    "loop".to_string()
                }
                Node::FunctionDefinition(func) => {
                    children = ir.get(func.body)?.children.as_slice();
                    let params: Vec<String> = func
                        .parameters
                        .iter()
                        .map(|p| self.declaration(p.raw()))
                        .collect::<Result<_, _>>()?;
                    format!("fn {}({})", func.name, params.join(", "))
                }
                Node::TypeIdentifier(_) => format!("type {}", self.type_text(Id::from_raw(id))?),
                Node::CpuRegister(reg) => format!("register {}", reg),
                Node::MemoryAddress(mem) => format!("memory {}", mem),
                Node::VariableDeclaration(_) => format!("var {}", self.declaration(id)?),
                Node::Assignment(assign) => format!(
                    "{} = {}",
                    self.operand(assign.lhs.id()),
                    self.operand(assign.rhs.id())
                ),
                Node::Label(label) => format!("{}:", label),
                Node::Jump(jump) => format!("jump {}", ir.get(jump.label)?),
                Node::Add(op) => self.binary(Add::MNEMONIC, [op.result.id(), op.lhs.id(), op.rhs.id()]),
                Node::Sub(op) => self.binary(Sub::MNEMONIC, [op.result.id(), op.lhs.id(), op.rhs.id()]),
                Node::Mul(op) => self.binary(Mul::MNEMONIC, [op.result.id(), op.lhs.id(), op.rhs.id()]),
                Node::Div(op) => self.binary(Div::MNEMONIC, [op.result.id(), op.lhs.id(), op.rhs.id()]),
                Node::Call(_) => self.operand(id),
            };
            self.line(id, depth, text);
            pending.extend(children.iter().rev().map(|child| (*child, depth + 1)));
        }
        Ok(())
    }

    fn binary(&self, mnemonic: &str, [result, lhs, rhs]: [NodeId; 3]) -> String {
        format!(
            "{} = {} {}, {}",
            self.operand(result),
            mnemonic,
            self.operand(lhs),
            self.operand(rhs)
        )
    }

    /// `name: type`, plus `@ location` once resolved.
    fn declaration(&self, id: NodeId) -> Result<String, IrError> {
        let Node::VariableDeclaration(var) = self.ir.node(id)? else {
            return Ok(self.operand(id));
        };
        let mut text = format!("{}: {}", var.name, self.type_text(var.ty)?);
        if let Some(loc) = var.location {
            text.push_str(&format!(" @ {}", self.operand(loc.id())));
        }
        Ok(text)
    }

    fn type_text(&self, id: Id<TypeIdentifier>) -> Result<String, IrError> {
        enum Piece {
            Type(Id<TypeIdentifier>),
            Text(String),
        }

        let mut text = String::new();
        let mut pending = vec![Piece::Type(id)];
        while let Some(piece) = pending.pop() {
            let id = match piece {
                Piece::Text(t) => {
                    text.push_str(&t);
                    continue;
                }
                Piece::Type(id) => id,
            };
            let ty = self.ir.get(id)?;
            let width = if self.config.show_widths && ty.is_resolved() {
                format!("[{}]", ty.width)
            } else {
                String::new()
            };
            text.push_str(&ty.name);
            if ty.is_primitive() {
                text.push_str(&width);
                continue;
            }
            text.push('{');
            pending.push(Piece::Text(format!("}}{}", width)));
            for (i, component) in ty.components.iter().enumerate().rev() {
                pending.push(Piece::Type(*component));
                if i > 0 {
                    pending.push(Piece::Text(", ".to_string()));
                }
            }
        }
        Ok(text)
    }

    fn operand(&self, id: NodeId) -> String {
        let Ok(node) = self.ir.node(id) else {
            return "<expired>".to_string();
        };
        match node {
            Node::VariableDeclaration(var) => var.name.clone(),
            Node::CpuRegister(reg) => reg.to_string(),
            Node::MemoryAddress(mem) => mem.to_string(),
            Node::FunctionDefinition(func) => func.name.clone(),
            Node::Label(label) => label.name.clone(),
            Node::Call(call) => {
                let args: Vec<String> = call
                    .arguments
                    .iter()
                    .map(|a| self.short_operand(a.id()))
                    .collect();
                format!("call {}({})", self.short_operand(call.callee.id()), args.join(", "))
            }
            _ => self.short_operand(id),
        }
    }

    /// Operand form that never looks through another node.
    fn short_operand(&self, id: NodeId) -> String {
        let Ok(node) = self.ir.node(id) else {
            return "<expired>".to_string();
        };
        match node {
            Node::VariableDeclaration(var) => var.name.clone(),
            Node::CpuRegister(reg) => reg.to_string(),
            Node::MemoryAddress(mem) => mem.to_string(),
            Node::FunctionDefinition(func) => func.name.clone(),
            Node::Label(label) => label.name.clone(),
            other => format!("{}{}", other.kind(), id),
        }
    }
}
