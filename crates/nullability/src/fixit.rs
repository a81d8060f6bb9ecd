//! Fix-it generation. Pure: a violation maps to edits and notes, independent
//! of how its message is worded.

use crate::diag::{Category, FixIt, Note};
use crate::span::Span;

/// The `let`/`var` a diagnosed value was being bound with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSite {
    pub keyword: Span,
    pub mutable: bool,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// An optional value used where a non-optional one is required.
    UnwrapRequired {
        expr: Span,
        binding: Option<BindingSite>,
    },
    NilIncompatible {
        nil: Span,
    },
    TypeMismatch {
        expr: Span,
    },
    ForceUnwrapNonOptional {
        bang: Span,
    },
    OptionalChainNonOptional {
        question: Span,
    },
    OptionalCondition {
        expr: Span,
    },
}

impl Violation {
    pub fn category(&self) -> Category {
        match self {
            Violation::UnwrapRequired { .. } => Category::UnwrapRequired,
            Violation::NilIncompatible { .. } => Category::NilIncompatible,
            Violation::TypeMismatch { .. } | Violation::OptionalCondition { .. } => {
                Category::TypeMismatch
            }
            Violation::ForceUnwrapNonOptional { .. }
            | Violation::OptionalChainNonOptional { .. } => Category::Usage,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Violation::UnwrapRequired { expr, .. }
            | Violation::TypeMismatch { expr }
            | Violation::OptionalCondition { expr } => *expr,
            Violation::NilIncompatible { nil } => *nil,
            Violation::ForceUnwrapNonOptional { bang } => *bang,
            Violation::OptionalChainNonOptional { question } => *question,
        }
    }
}

pub fn fixits(violation: &Violation) -> Vec<FixIt> {
    match violation {
        Violation::UnwrapRequired { expr, .. } => vec![FixIt::insert(expr.end, "!")],
        Violation::ForceUnwrapNonOptional { bang } => vec![FixIt::remove(*bang)],
        Violation::OptionalChainNonOptional { question } => vec![FixIt::remove(*question)],
        Violation::OptionalCondition { expr } => vec![FixIt::insert(expr.end, " != nil")],
        Violation::NilIncompatible { .. } | Violation::TypeMismatch { .. } => Vec::new(),
    }
}

/// Notes offering alternative rewrites. The conditional-unwrap note is only
/// produced when `conditional_unwrap` is enabled.
pub fn notes(violation: &Violation, conditional_unwrap: bool) -> Vec<Note> {
    let Violation::UnwrapRequired {
        expr,
        binding: Some(binding),
    } = violation
    else {
        return Vec::new();
    };
    if !conditional_unwrap {
        return Vec::new();
    }
    let keyword = if binding.mutable { "if var" } else { "if let" };
    let message = match &binding.name {
        Some(name) => format!("use '{keyword}' to bind '{name}' only when the value is present"),
        None => format!("use '{keyword}' to bind the value only when it is present"),
    };
    vec![Note {
        message,
        span: Some(binding.keyword),
        fixits: vec![
            FixIt::replace(binding.keyword, keyword),
            FixIt::insert(expr.end, " { }"),
        ],
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrap_inserts_bang_after_the_expression() {
        let violation = Violation::UnwrapRequired {
            expr: Span::new(10, 14),
            binding: None,
        };
        assert_eq!(fixits(&violation), vec![FixIt::insert(14, "!")]);
        assert!(notes(&violation, true).is_empty());
    }

    #[test]
    fn nil_and_mismatch_have_no_fixits() {
        assert!(fixits(&Violation::NilIncompatible { nil: Span::new(3, 6) }).is_empty());
        assert!(fixits(&Violation::TypeMismatch { expr: Span::new(3, 4) }).is_empty());
    }

    #[test]
    fn binding_gets_conditional_unwrap_note() {
        let violation = Violation::UnwrapRequired {
            expr: Span::new(20, 23),
            binding: Some(BindingSite {
                keyword: Span::new(2, 5),
                mutable: false,
                name: Some("sc3a".to_string()),
            }),
        };
        let notes_on = notes(&violation, true);
        assert_eq!(notes_on.len(), 1);
        assert_eq!(notes_on[0].fixits[0], FixIt::replace(Span::new(2, 5), "if let"));
        assert!(notes_on[0].message.contains("'sc3a'"));
        assert!(notes(&violation, false).is_empty());
    }

    #[test]
    fn redundant_operators_are_removed() {
        let bang = Span::new(7, 8);
        assert_eq!(
            fixits(&Violation::ForceUnwrapNonOptional { bang }),
            vec![FixIt::remove(bang)]
        );
    }
}
