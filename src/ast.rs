//! Expression tree produced by the parser.

use std::borrow::Cow;

use ptree::TreeItem;

use crate::operator::OpTag;
use crate::token::Constant;
use crate::value::Value;

/// The originating literal behind a [Expr::Value] node.
#[derive(Debug, Clone)]
pub enum ValueSource {
    Embedded(Value),
    Constant(Constant),
}

/// One comma-separated dimension inside a `[...]` subscript (GLOSSARY). A
/// dimension with all three slots empty is the "empty" dimension produced
/// by `[:]` / `[::]`.
#[derive(Debug, Clone, Default)]
pub struct Dimension {
    pub start: Option<Box<Expr>>,
    pub end: Option<Box<Expr>>,
    pub step: Option<Box<Expr>>,
}

/// Tagged record produced by the parser.
#[derive(Debug, Clone)]
pub enum Expr {
    Value(ValueSource),
    Identifier(String),
    Unary {
        op: OpTag,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: OpTag,
        right: Box<Expr>,
    },
    AccessProperty {
        object: Box<Expr>,
        property: String,
    },
    Indexing {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Slicing {
        target: Box<Expr>,
        dimensions: Vec<Dimension>,
    },
    Invoke {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Print the tree to stdout as a debugging aid over the parsed
    /// structure.
    pub fn print(&self) -> std::io::Result<()> {
        ptree::print_tree(self)
    }

    fn label(&self) -> String {
        match self {
            Expr::Value(ValueSource::Embedded(_)) => "${..}".to_string(),
            Expr::Value(ValueSource::Constant(c)) => format!("{:?}", c),
            Expr::Identifier(name) => name.clone(),
            Expr::Unary { op, .. } => format!("unary {:?}", op),
            Expr::Binary { op, .. } => format!("binary {:?}", op),
            Expr::AccessProperty { property, .. } => format!(".{}", property),
            Expr::Indexing { .. } => "[i]".to_string(),
            Expr::Slicing { .. } => "[:]".to_string(),
            Expr::Invoke { args, .. } => format!("(...{} args)", args.len()),
        }
    }

    fn child_nodes(&self) -> Vec<Expr> {
        match self {
            Expr::Value(_) | Expr::Identifier(_) => vec![],
            Expr::Unary { operand, .. } => vec![operand.as_ref().clone()],
            Expr::Binary { left, right, .. } => vec![left.as_ref().clone(), right.as_ref().clone()],
            Expr::AccessProperty { object, .. } => vec![object.as_ref().clone()],
            Expr::Indexing { target, index } => vec![target.as_ref().clone(), index.as_ref().clone()],
            Expr::Slicing { target, dimensions } => {
                let mut children = vec![target.as_ref().clone()];
                for dim in dimensions {
                    children.extend(dim.start.iter().map(|e| e.as_ref().clone()));
                    children.extend(dim.end.iter().map(|e| e.as_ref().clone()));
                    children.extend(dim.step.iter().map(|e| e.as_ref().clone()));
                }
                children
            }
            Expr::Invoke { callee, args } => {
                let mut children = vec![callee.as_ref().clone()];
                children.extend(args.iter().cloned());
                children
            }
        }
    }
}

impl TreeItem for Expr {
    type Child = Expr;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _: &ptree::Style) -> std::io::Result<()> {
        write!(f, "{}", self.label())
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Owned(self.child_nodes())
    }
}
