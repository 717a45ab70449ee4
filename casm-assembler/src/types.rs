//! Type table consulted by `symbolic(<type>, ...)`
//!
//! The table is filled before code generation and only read afterwards.

use crate::ast::TypeExpr;
use crate::lexer::Span;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// A type the resolver knows about
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedType {
    Felt,
    CodeOffset,
    Struct(String),
    Pointer(Box<ResolvedType>),
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedType::Felt => f.write_str("felt"),
            ResolvedType::CodeOffset => f.write_str("codeoffset"),
            ResolvedType::Struct(name) => f.write_str(name),
            ResolvedType::Pointer(inner) => write!(f, "{}*", inner),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("unknown type '{name}' at {span}")]
    UnknownType { name: String, span: Span },
}

impl TypeError {
    pub fn span(&self) -> Span {
        match self {
            TypeError::UnknownType { span, .. } => *span,
        }
    }
}

/// Known type names: the built-ins plus registered structs
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    structs: BTreeSet<String>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a struct name; returns false if it was already known
    pub fn register_struct(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if is_builtin(&name) {
            return false;
        }
        self.structs.insert(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        is_builtin(name) || self.structs.contains(name)
    }

    /// Resolve a type expression, wrapping it in one pointer per `*`
    pub fn resolve(&self, ty: &TypeExpr) -> Result<ResolvedType, TypeError> {
        let mut resolved = match ty.name.as_str() {
            "felt" => ResolvedType::Felt,
            "codeoffset" => ResolvedType::CodeOffset,
            name if self.structs.contains(name) => ResolvedType::Struct(name.to_string()),
            name => {
                return Err(TypeError::UnknownType {
                    name: name.to_string(),
                    span: ty.span,
                })
            }
        };
        for _ in 0..ty.pointer_depth {
            resolved = ResolvedType::Pointer(Box::new(resolved));
        }
        Ok(resolved)
    }
}

fn is_builtin(name: &str) -> bool {
    matches!(name, "felt" | "codeoffset")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(name: &str, pointer_depth: usize) -> TypeExpr {
        TypeExpr {
            name: name.to_string(),
            pointer_depth,
            span: Span::new(0, name.len(), 1, 1),
        }
    }

    #[test]
    fn test_builtins() {
        let table = TypeTable::new();
        assert_eq!(table.resolve(&ty("felt", 0)), Ok(ResolvedType::Felt));
        assert_eq!(table.resolve(&ty("codeoffset", 0)), Ok(ResolvedType::CodeOffset));
    }

    #[test]
    fn test_structs_and_pointers() {
        let mut table = TypeTable::new();
        assert!(table.register_struct("Point"));
        assert!(!table.register_struct("Point"));
        assert!(!table.register_struct("felt"));

        let resolved = table.resolve(&ty("Point", 2)).unwrap();
        assert_eq!(resolved.to_string(), "Point**");
        assert!(table.contains("Point"));
    }

    #[test]
    fn test_unknown_type() {
        let table = TypeTable::new();
        assert_eq!(
            table.resolve(&ty("Missing", 1)),
            Err(TypeError::UnknownType {
                name: "Missing".to_string(),
                span: Span::new(0, 7, 1, 1),
            })
        );
    }
}
