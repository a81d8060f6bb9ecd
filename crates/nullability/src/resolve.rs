//! Nullability annotation resolution: one verdict per slot, always.

use crate::decl::ctype::{Specifier, SpecifierUse};
use crate::decl::{
    AuditContext, DeclId, DeclKind, ForeignDeclaration, ForeignModule, NonnullParams, RawSlot,
    SlotShape,
};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NullabilityVerdict {
    NonNull,
    Nullable,
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotPosition {
    Param(usize),
    Result,
}

impl fmt::Display for SlotPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotPosition::Param(idx) => write!(f, "parameter {}", idx + 1),
            SlotPosition::Result => write!(f, "result"),
        }
    }
}

/// A malformed or conflicting annotation. The slot it names resolved to
/// `Unspecified`; the rest of the declaration is unaffected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationIssue {
    pub decl: DeclId,
    pub symbol: String,
    pub position: SlotPosition,
    pub message: String,
}

impl fmt::Display for AnnotationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of '{}': {}", self.position, self.symbol, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSlot {
    /// `None` when the type could not be understood at all.
    pub shape: Option<SlotShape>,
    /// Verdict for the outermost level.
    pub verdict: NullabilityVerdict,
    /// Verdicts for the levels below the outermost, innermost first.
    pub inner: Vec<NullabilityVerdict>,
    /// `null_resettable` property: the setter accepts nil.
    pub resettable: bool,
}

impl ResolvedSlot {
    fn unresolved(shape: Option<SlotShape>) -> Self {
        let inner = shape
            .as_ref()
            .map(|shape| vec![NullabilityVerdict::Unspecified; shape.levels.len().saturating_sub(1)])
            .unwrap_or_default();
        Self {
            shape,
            verdict: NullabilityVerdict::Unspecified,
            inner,
            resettable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDeclaration {
    pub decl: DeclId,
    pub params: Vec<ResolvedSlot>,
    pub result: ResolvedSlot,
}

/// A declaration-level attribute asserting that one slot is nonnull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NonnullAttribute {
    Absent,
    /// `nonnull` without indices: non-pointer parameters are skipped.
    AllPointers,
    /// `nonnull(i)` or `returns_nonnull`, naming this slot directly.
    Named(&'static str),
}

fn report_issue(
    issues: &mut Vec<AnnotationIssue>,
    decl: &ForeignDeclaration,
    position: SlotPosition,
    message: String,
) {
    tracing::warn!("{} of '{}': {}", position, decl.display_name(), message);
    issues.push(AnnotationIssue {
        decl: decl.id,
        symbol: decl.display_name(),
        position,
        message,
    });
}

/// Per-parameter attribute state; bad indices are reported and dropped.
fn param_attributes(
    decl: &ForeignDeclaration,
    issues: &mut Vec<AnnotationIssue>,
) -> Vec<NonnullAttribute> {
    let count = decl.params.len();
    match &decl.attributes.nonnull {
        NonnullParams::None => vec![NonnullAttribute::Absent; count],
        NonnullParams::AllPointers => vec![NonnullAttribute::AllPointers; count],
        NonnullParams::Indices(indices) => {
            let mut attributes = vec![NonnullAttribute::Absent; count];
            for &index in indices {
                match index.checked_sub(1).filter(|idx| *idx < count) {
                    Some(idx) => attributes[idx] = NonnullAttribute::Named("nonnull"),
                    None => report_issue(
                        issues,
                        decl,
                        SlotPosition::Param(index.saturating_sub(1)),
                        format!(
                            "'nonnull' attribute index {index} is out of range ({count} parameter(s))"
                        ),
                    ),
                }
            }
            attributes
        }
    }
}

pub fn resolve_declaration(
    module: &ForeignModule,
    decl: &ForeignDeclaration,
    issues: &mut Vec<AnnotationIssue>,
) -> ResolvedDeclaration {
    let audit = decl.audit;
    let attributes = param_attributes(decl, issues);
    let params = decl
        .params
        .iter()
        .zip(attributes)
        .enumerate()
        .map(|(idx, (slot, attribute))| {
            resolve_slot(module, decl, slot, SlotPosition::Param(idx), audit, attribute, issues)
        })
        .collect();
    let result_attribute = if decl.attributes.returns_nonnull {
        NonnullAttribute::Named("returns_nonnull")
    } else {
        NonnullAttribute::Absent
    };
    let result = resolve_slot(
        module,
        decl,
        &decl.result,
        SlotPosition::Result,
        audit,
        result_attribute,
        issues,
    );
    ResolvedDeclaration {
        decl: decl.id,
        params,
        result,
    }
}

fn resolve_slot(
    module: &ForeignModule,
    decl: &ForeignDeclaration,
    slot: &RawSlot,
    position: SlotPosition,
    audit: AuditContext,
    attribute: NonnullAttribute,
    issues: &mut Vec<AnnotationIssue>,
) -> ResolvedSlot {
    let mut report = |message: String| report_issue(issues, decl, position, message);

    let ty = match &slot.ty {
        Ok(ty) => ty,
        Err(err) => {
            report(err.clone());
            return ResolvedSlot::unresolved(None);
        }
    };
    let shape = match module.shape(ty, decl.owner.as_deref()) {
        Ok(shape) => shape,
        Err(err) => {
            report(err);
            return ResolvedSlot::unresolved(None);
        }
    };

    if shape.levels.is_empty() {
        if let Some(first) = ty.context_specifiers.first() {
            report(format!(
                "nullability specifier '{}' cannot be applied to non-pointer type '{}'",
                first.spelling, ty.spelling
            ));
        }
        if let NonnullAttribute::Named(name) = attribute {
            report(format!(
                "'{name}' attribute only applies to pointer types, not '{}'",
                ty.spelling
            ));
        }
        return ResolvedSlot::unresolved(Some(shape));
    }

    let mut inner = Vec::with_capacity(shape.levels.len() - 1);
    for level in &shape.levels[..shape.levels.len() - 1] {
        match single_specifier(&level.specifiers) {
            Ok(Some(Specifier::Resettable)) | Err(_) => {
                report("conflicting nullability on an inner pointer level".to_string());
                return ResolvedSlot::unresolved(Some(shape));
            }
            Ok(specifier) => inner.push(specifier.map(verdict_of).unwrap_or(NullabilityVerdict::Unspecified)),
        }
    }

    let mut outermost: Vec<SpecifierUse> = ty.context_specifiers.clone();
    if let Some(level) = shape.levels.last() {
        outermost.extend(level.specifiers.iter().cloned());
    }

    let explicit = match single_specifier(&outermost) {
        Ok(specifier) => specifier,
        Err((left, right)) => {
            report(format!(
                "conflicting nullability specifiers '{left}' and '{right}'"
            ));
            return ResolvedSlot::unresolved(Some(shape));
        }
    };

    // The attribute is an explicit annotation of its own.
    let explicit = match (explicit, attribute) {
        (_, NonnullAttribute::Absent) => explicit,
        (Some(Specifier::Nullable | Specifier::Unspecified), attribute) => {
            let name = match attribute {
                NonnullAttribute::Named(name) => name,
                _ => "nonnull",
            };
            let spelling = outermost
                .iter()
                .find(|entry| entry.specifier != Specifier::NonNull)
                .map(|entry| entry.spelling.as_str())
                .unwrap_or_default();
            report(format!(
                "nullability specifier '{spelling}' conflicts with the '{name}' attribute"
            ));
            return ResolvedSlot::unresolved(Some(shape));
        }
        (None, _) => Some(Specifier::NonNull),
        (explicit, _) => explicit,
    };

    let is_property_value =
        matches!(decl.kind, DeclKind::Property { .. }) && position == SlotPosition::Result;
    let (verdict, resettable) = match explicit {
        Some(Specifier::Resettable) if !is_property_value => {
            report("'null_resettable' is only valid on properties".to_string());
            return ResolvedSlot::unresolved(Some(shape));
        }
        Some(Specifier::Resettable) => (NullabilityVerdict::NonNull, true),
        Some(specifier) => (verdict_of(specifier), false),
        // Assumed nonnull covers single-level pointers only.
        None if audit.audited && shape.levels.len() == 1 => (NullabilityVerdict::NonNull, false),
        None => (NullabilityVerdict::Unspecified, false),
    };

    ResolvedSlot {
        shape: Some(shape),
        verdict,
        inner,
        resettable,
    }
}

fn verdict_of(specifier: Specifier) -> NullabilityVerdict {
    match specifier {
        Specifier::NonNull | Specifier::Resettable => NullabilityVerdict::NonNull,
        Specifier::Nullable => NullabilityVerdict::Nullable,
        Specifier::Unspecified => NullabilityVerdict::Unspecified,
    }
}

/// Repeating the same specifier is harmless; two different ones conflict.
fn single_specifier(uses: &[SpecifierUse]) -> Result<Option<Specifier>, (String, String)> {
    let Some(first) = uses.first() else {
        return Ok(None);
    };
    if let Some(other) = uses.iter().find(|entry| entry.specifier != first.specifier) {
        return Err((first.spelling.clone(), other.spelling.clone()));
    }
    Ok(Some(first.specifier))
}
