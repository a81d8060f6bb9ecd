//! Optional-type projection and the imported module the checker consults.

use crate::config::ResolveConfig;
use crate::decl::ctype::{BaseType, CScalar};
use crate::decl::naming::HostName;
use crate::decl::{
    DeclId, DeclKind, ForeignDeclaration, ForeignModule, ObjectRef, ShapeRoot, SlotShape,
};
use crate::error::ImportError;
use crate::resolve::{
    AnnotationIssue, NullabilityVerdict, ResolvedDeclaration, ResolvedSlot, SlotPosition,
    resolve_declaration,
};
use crate::typeck::{ProjectedType, Scalar, Type};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

fn project_scalar(scalar: CScalar) -> Scalar {
    match scalar {
        CScalar::Char => Scalar::CChar,
        CScalar::SChar => Scalar::CSignedChar,
        CScalar::UChar => Scalar::CUnsignedChar,
        CScalar::Short => Scalar::CShort,
        CScalar::UShort => Scalar::CUnsignedShort,
        CScalar::Int => Scalar::CInt,
        CScalar::UInt => Scalar::CUnsignedInt,
        CScalar::Long => Scalar::CLong,
        CScalar::ULong => Scalar::CUnsignedLong,
        CScalar::LongLong => Scalar::CLongLong,
        CScalar::ULongLong => Scalar::CUnsignedLongLong,
        CScalar::Float => Scalar::Float,
        CScalar::Double => Scalar::Double,
        CScalar::Bool | CScalar::ObjCBool => Scalar::Bool,
        CScalar::NSInteger => Scalar::Int,
        CScalar::NSUInteger => Scalar::UInt,
        CScalar::CGFloat => Scalar::CGFloat,
    }
}

fn wrap(ty: Type, verdict: NullabilityVerdict) -> Type {
    match verdict {
        NullabilityVerdict::NonNull => ty,
        NullabilityVerdict::Nullable | NullabilityVerdict::Unspecified => Type::optional(ty),
    }
}

/// Map a resolved foreign slot to its host type. Scalars are never wrapped;
/// every reference level is wrapped unless its verdict is `NonNull`.
pub fn project_slot(slot: &ResolvedSlot) -> ProjectedType {
    let Some(shape) = &slot.shape else {
        return ProjectedType::plain(Type::Unknown);
    };
    project_shape(shape, slot.verdict, &slot.inner)
}

pub fn project_shape(
    shape: &SlotShape,
    verdict: NullabilityVerdict,
    inner: &[NullabilityVerdict],
) -> ProjectedType {
    let Some(first) = shape.levels.first() else {
        let base = match &shape.root {
            ShapeRoot::Scalar(scalar) => Type::Scalar(project_scalar(*scalar)),
            ShapeRoot::Void => Type::Void,
            ShapeRoot::Struct(_) | ShapeRoot::Object(_) => Type::Unknown,
        };
        return ProjectedType::plain(base);
    };

    let verdict_at = |idx: usize| {
        inner
            .get(idx)
            .copied()
            .unwrap_or(NullabilityVerdict::Unspecified)
    };

    // The first level turns the root into a reference.
    let mut ty = match &shape.root {
        ShapeRoot::Object(ObjectRef::Id) => Type::AnyObject,
        ShapeRoot::Object(ObjectRef::Class) => Type::AnyClass,
        ShapeRoot::Object(ObjectRef::Instance(name)) => Type::Object(name.clone()),
        ShapeRoot::Object(ObjectRef::CoreFoundation(name)) => Type::CoreFoundation(name.clone()),
        ShapeRoot::Struct(_) => Type::OpaquePointer,
        ShapeRoot::Void => Type::RawPointer {
            mutable: !first.const_pointee,
        },
        ShapeRoot::Scalar(scalar) => Type::Pointer {
            pointee: Box::new(Type::Scalar(project_scalar(*scalar))),
            mutable: !first.const_pointee,
        },
    };

    for (idx, level) in shape.levels.iter().enumerate().skip(1) {
        ty = Type::Pointer {
            pointee: Box::new(wrap(ty, verdict_at(idx - 1))),
            mutable: !level.const_pointee,
        };
    }

    ProjectedType {
        base: ty,
        optional: verdict != NullabilityVerdict::NonNull,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub decl: DeclId,
    pub position: SlotPosition,
}

/// Memoized projections, keyed by declaration and slot.
#[derive(Debug, Default)]
pub struct ProjectionCache {
    entries: HashMap<SlotKey, ProjectedType>,
}

impl ProjectionCache {
    pub fn project(&mut self, key: SlotKey, slot: &ResolvedSlot) -> ProjectedType {
        self.entries
            .entry(key)
            .or_insert_with(|| project_slot(slot))
            .clone()
    }

    pub fn get(&self, key: SlotKey) -> Option<&ProjectedType> {
        self.entries.get(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A callable or property as the host language sees it.
#[derive(Debug, Clone)]
pub struct Signature {
    pub decl: DeclId,
    pub kind: DeclKind,
    pub name: HostName,
    pub owner: Option<String>,
    pub params: Vec<ProjectedType>,
    pub result: ProjectedType,
    /// The result is `instancetype` and follows the receiver's class.
    pub returns_instance: bool,
    /// Property setter accepts nil (`null_resettable`).
    pub resettable: bool,
}

impl Signature {
    pub fn param_types(&self) -> Vec<Type> {
        self.params.iter().map(ProjectedType::to_type).collect()
    }

    /// Result type when the member is reached through `receiver`.
    pub fn result_for(&self, receiver: Option<&str>) -> Type {
        let mut result = self.result.clone();
        if self.returns_instance {
            if let (Some(receiver), Type::Object(_)) = (receiver, &result.base) {
                result.base = Type::Object(receiver.to_string());
            }
        }
        result.to_type()
    }

    pub fn setter_type(&self) -> Type {
        if self.resettable {
            Type::optional(self.result.base.clone())
        } else {
            self.result.to_type()
        }
    }

    pub fn is_failable_init(&self) -> bool {
        self.kind == DeclKind::Initializer && self.result.optional
    }
}

/// The foreign module after resolution and projection. Immutable once built.
#[derive(Debug)]
pub struct ImportedModule {
    foreign: ForeignModule,
    resolved: Vec<ResolvedDeclaration>,
    cache: ProjectionCache,
    signatures: Vec<Signature>,
    issues: Vec<AnnotationIssue>,
}

impl ImportedModule {
    pub fn load(path: &Path, config: &ResolveConfig) -> Result<Self, ImportError> {
        Ok(Self::import(ForeignModule::load(path, config)?))
    }

    pub fn import(foreign: ForeignModule) -> Self {
        let mut issues = Vec::new();
        let mut cache = ProjectionCache::default();
        let mut resolved = Vec::with_capacity(foreign.declarations.len());
        let mut signatures = Vec::with_capacity(foreign.declarations.len());

        for decl in &foreign.declarations {
            let resolution = resolve_declaration(&foreign, decl, &mut issues);
            signatures.push(build_signature(decl, &resolution, &mut cache));
            resolved.push(resolution);
        }

        tracing::debug!(
            "projected {} slots for module '{}' ({} annotation issues)",
            cache.len(),
            foreign.name,
            issues.len()
        );

        Self {
            foreign,
            resolved,
            cache,
            signatures,
            issues,
        }
    }

    pub fn name(&self) -> &str {
        &self.foreign.name
    }

    pub fn foreign(&self) -> &ForeignModule {
        &self.foreign
    }

    pub fn issues(&self) -> &[AnnotationIssue] {
        &self.issues
    }

    pub fn resolution(&self, decl: DeclId) -> &ResolvedDeclaration {
        &self.resolved[decl.0 as usize]
    }

    pub fn projected(&self, key: SlotKey) -> Option<&ProjectedType> {
        self.cache.get(key)
    }

    pub fn signature(&self, decl: DeclId) -> &Signature {
        &self.signatures[decl.0 as usize]
    }

    pub fn is_class(&self, name: &str) -> bool {
        self.foreign.is_class(name)
    }

    pub fn is_cf_type(&self, host_name: &str) -> bool {
        self.signatures.iter().any(|sig| {
            sig.params
                .iter()
                .chain(std::iter::once(&sig.result))
                .any(|ty| matches!(&ty.base, Type::CoreFoundation(name) if name == host_name))
        }) || self.foreign.typedefs.iter().any(|(name, typedef)| {
            typedef.host_name.as_deref() == Some(host_name)
                || name.strip_suffix("Ref") == Some(host_name)
        })
    }

    pub fn superclass(&self, class: &str) -> Option<&str> {
        self.foreign
            .classes
            .get(class)
            .and_then(|decl| decl.superclass.as_deref())
    }

    pub fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        let mut current = Some(sub);
        while let Some(class) = current {
            if class == sup {
                return true;
            }
            current = self.superclass(class);
        }
        false
    }

    pub fn functions(&self, base: &str) -> Vec<&Signature> {
        self.foreign
            .functions
            .iter()
            .map(|id| self.signature(*id))
            .filter(|sig| sig.name.base == base)
            .collect()
    }

    /// Members named `base` across the class chain. A declaration hides an
    /// inherited one only when both take the same argument labels.
    pub fn members(&self, class: &str, base: &str, filter: impl Fn(DeclKind) -> bool) -> Vec<&Signature> {
        let mut found: Vec<&Signature> = Vec::new();
        let mut current = Some(class);
        while let Some(name) = current {
            if let Some(decl) = self.foreign.classes.get(name) {
                let inherited: Vec<&Signature> = decl
                    .members
                    .iter()
                    .map(|id| self.signature(*id))
                    .filter(|sig| sig.name.base == base && filter(sig.kind))
                    .filter(|sig| !found.iter().any(|seen| seen.name.labels == sig.name.labels))
                    .collect();
                found.extend(inherited);
            }
            current = self.superclass(name);
        }
        found
    }

    pub fn methods(&self, class: &str, base: &str, class_side: bool) -> Vec<&Signature> {
        self.members(class, base, |kind| {
            matches!(kind, DeclKind::Method { class_method } if class_method == class_side)
        })
    }

    pub fn property(&self, class: &str, name: &str) -> Option<&Signature> {
        self.members(class, name, |kind| matches!(kind, DeclKind::Property { .. }))
            .into_iter()
            .next()
    }

    /// Initializers of the nearest class that declares any.
    pub fn initializers(&self, class: &str) -> Vec<&Signature> {
        let mut current = Some(class);
        while let Some(name) = current {
            let own: Vec<&Signature> = self
                .foreign
                .classes
                .get(name)
                .into_iter()
                .flat_map(|decl| decl.members.iter())
                .map(|id| self.signature(*id))
                .filter(|sig| sig.kind == DeclKind::Initializer)
                .collect();
            if !own.is_empty() {
                return own;
            }
            current = self.superclass(name);
        }
        Vec::new()
    }

    /// Render the projected interface, one declaration per line.
    pub fn render_interface(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "module {}", self.name());
        for id in &self.foreign.functions {
            let sig = self.signature(*id);
            let _ = writeln!(out, "func {}", render_callable(sig));
        }
        for (name, class) in &self.foreign.classes {
            if class.members.is_empty() {
                continue;
            }
            match &class.superclass {
                Some(superclass) => {
                    let _ = writeln!(out, "class {name} : {superclass} {{");
                }
                None => {
                    let _ = writeln!(out, "class {name} {{");
                }
            }
            for id in &class.members {
                let sig = self.signature(*id);
                let line = match sig.kind {
                    DeclKind::Initializer => {
                        let marker = if sig.is_failable_init() { "?" } else { "" };
                        format!("init{marker}({})", render_params(sig))
                    }
                    DeclKind::Method { class_method } => {
                        let prefix = if class_method { "class func" } else { "func" };
                        format!("{prefix} {}", render_callable(sig))
                    }
                    DeclKind::Property { readonly } => {
                        let access = if readonly { "get" } else { "get set" };
                        let resettable = if sig.resettable { " // null_resettable" } else { "" };
                        format!(
                            "var {}: {} {{ {access} }}{resettable}",
                            sig.name.base,
                            sig.result_for(Some(name.as_str()))
                        )
                    }
                    DeclKind::Function => render_callable(sig),
                };
                let _ = writeln!(out, "  {line}");
            }
            let _ = writeln!(out, "}}");
        }
        out
    }
}

fn render_params(sig: &Signature) -> String {
    sig.name
        .labels
        .iter()
        .zip(&sig.params)
        .map(|(label, ty)| format!("{}: {ty}", label.as_deref().unwrap_or("_")))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_callable(sig: &Signature) -> String {
    let params = render_params(sig);
    let result = sig.result_for(sig.owner.as_deref());
    if result == Type::Void {
        format!("{}({params})", sig.name.base)
    } else {
        format!("{}({params}) -> {result}", sig.name.base)
    }
}

fn build_signature(
    decl: &ForeignDeclaration,
    resolution: &ResolvedDeclaration,
    cache: &mut ProjectionCache,
) -> Signature {
    let params = resolution
        .params
        .iter()
        .enumerate()
        .map(|(idx, slot)| {
            let key = SlotKey {
                decl: decl.id,
                position: SlotPosition::Param(idx),
            };
            cache.project(key, slot)
        })
        .collect();
    let result_key = SlotKey {
        decl: decl.id,
        position: SlotPosition::Result,
    };
    let result = cache.project(result_key, &resolution.result);
    let returns_instance = decl
        .result
        .ty
        .as_ref()
        .is_ok_and(|ty| ty.base == BaseType::InstanceType);

    Signature {
        decl: decl.id,
        kind: decl.kind,
        name: decl.host_name.clone(),
        owner: decl.owner.clone(),
        params,
        result,
        returns_instance,
        resettable: resolution.result.resettable,
    }
}
