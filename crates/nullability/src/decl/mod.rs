//! Foreign declaration model: the imported C / Objective-C surface before
//! any nullability has been decided.

pub mod ctype;
pub mod naming;

use crate::config::ResolveConfig;
use crate::error::ImportError;
use ctype::{BaseType, CScalar, CType, SpecifierUse, parse_ctype};
use naming::HostName;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

pub const ROOT_CLASS: &str = "NSObject";

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub module: String,
    #[serde(default)]
    pub typedef: Vec<TypedefEntry>,
    #[serde(default)]
    pub class: Vec<ClassEntry>,
    #[serde(default)]
    pub function: Vec<FunctionEntry>,
    #[serde(default)]
    pub region: Vec<RegionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionEntry {
    #[serde(default)]
    pub audited: bool,
    #[serde(default)]
    pub typedef: Vec<TypedefEntry>,
    #[serde(default)]
    pub class: Vec<ClassEntry>,
    #[serde(default)]
    pub function: Vec<FunctionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypedefEntry {
    pub name: String,
    pub target: String,
    pub host_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassEntry {
    pub name: String,
    pub superclass: Option<String>,
    #[serde(default)]
    pub method: Vec<MethodEntry>,
    #[serde(default)]
    pub property: Vec<PropertyEntry>,
    #[serde(default)]
    pub initializer: Vec<InitializerEntry>,
}

fn void_type() -> String {
    "void".to_string()
}

fn instancetype() -> String {
    "instancetype".to_string()
}

/// `__attribute__((nonnull))`: `true` covers every pointer parameter, a list
/// names 1-based parameter indices.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NonnullEntry {
    All(bool),
    Indices(Vec<usize>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct MethodEntry {
    pub selector: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default = "void_type")]
    pub returns: String,
    #[serde(default)]
    pub class_method: bool,
    pub host_name: Option<String>,
    pub nonnull: Option<NonnullEntry>,
    #[serde(default)]
    pub returns_nonnull: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub readonly: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitializerEntry {
    pub selector: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default = "instancetype")]
    pub returns: String,
    pub host_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionEntry {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default = "void_type")]
    pub returns: String,
    pub host_name: Option<String>,
    pub nonnull: Option<NonnullEntry>,
    #[serde(default)]
    pub returns_nonnull: bool,
}

impl Manifest {
    pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self, ImportError> {
        toml::from_str(contents).map_err(|source| ImportError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json_str(contents: &str, path: &Path) -> Result<Self, ImportError> {
        serde_json::from_str(contents).map_err(|source| ImportError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a manifest, choosing JSON for `.json` files and TOML otherwise.
    pub fn load(path: &Path) -> Result<Self, ImportError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&contents, path)
        } else {
            Self::from_toml_str(&contents, path)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Function,
    Method { class_method: bool },
    Initializer,
    Property { readonly: bool },
}

impl DeclKind {
    pub fn describe(&self) -> &'static str {
        match self {
            DeclKind::Function => "function",
            DeclKind::Method { class_method: true } => "class method",
            DeclKind::Method { class_method: false } => "method",
            DeclKind::Initializer => "initializer",
            DeclKind::Property { .. } => "property",
        }
    }
}

/// Audit state of the header region a declaration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuditContext {
    pub audited: bool,
}

/// Which parameters a declaration-level `nonnull` attribute covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NonnullParams {
    #[default]
    None,
    AllPointers,
    /// 1-based, as written; not yet checked against the parameter count.
    Indices(Vec<usize>),
}

impl NonnullParams {
    fn from_entry(entry: Option<&NonnullEntry>) -> Self {
        match entry {
            None | Some(NonnullEntry::All(false)) => NonnullParams::None,
            // `nonnull()` with no indices means every pointer parameter.
            Some(NonnullEntry::All(true)) => NonnullParams::AllPointers,
            Some(NonnullEntry::Indices(indices)) if indices.is_empty() => NonnullParams::AllPointers,
            Some(NonnullEntry::Indices(indices)) => NonnullParams::Indices(indices.clone()),
        }
    }
}

/// GCC-style attributes written on the declaration rather than in a type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeclAttributes {
    pub nonnull: NonnullParams,
    pub returns_nonnull: bool,
}

#[derive(Debug, Clone)]
pub struct RawSlot {
    pub spelling: String,
    pub ty: Result<CType, String>,
}

impl RawSlot {
    pub fn new(spelling: &str) -> Self {
        Self {
            spelling: spelling.to_string(),
            ty: parse_ctype(spelling),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForeignDeclaration {
    pub id: DeclId,
    /// Selector, function name or property name as written in the header.
    pub symbol: String,
    pub host_name: HostName,
    pub kind: DeclKind,
    pub owner: Option<String>,
    pub params: Vec<RawSlot>,
    pub result: RawSlot,
    pub audit: AuditContext,
    pub attributes: DeclAttributes,
}

impl ForeignDeclaration {
    pub fn display_name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{owner}.{}", self.symbol),
            None => self.symbol.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClassDecl {
    pub name: String,
    pub superclass: Option<String>,
    pub members: Vec<DeclId>,
}

#[derive(Debug, Clone)]
pub struct Typedef {
    pub name: String,
    pub target: Result<CType, String>,
    pub host_name: Option<String>,
}

/// What a reference-like slot refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectRef {
    Id,
    Class,
    Instance(String),
    /// Core Foundation style `XRef` typedef, carrying the host name.
    CoreFoundation(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeRoot {
    Scalar(CScalar),
    Void,
    Struct(String),
    /// `levels[0]` of the shape describes this reference.
    Object(ObjectRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShapeLevel {
    pub specifiers: Vec<SpecifierUse>,
    pub const_pointee: bool,
}

/// A slot type with typedefs expanded, laid out as nullable levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotShape {
    pub root: ShapeRoot,
    /// Innermost first.
    pub levels: Vec<ShapeLevel>,
}

impl SlotShape {
    pub fn is_reference_like(&self) -> bool {
        !self.levels.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForeignModule {
    pub name: String,
    pub declarations: Vec<ForeignDeclaration>,
    pub classes: BTreeMap<String, ClassDecl>,
    pub typedefs: HashMap<String, Typedef>,
    pub functions: Vec<DeclId>,
}

impl ForeignModule {
    pub fn load(path: &Path, config: &ResolveConfig) -> Result<Self, ImportError> {
        let manifest = Manifest::load(path)?;
        Self::from_manifest(&manifest, config)
    }

    pub fn from_manifest(manifest: &Manifest, config: &ResolveConfig) -> Result<Self, ImportError> {
        let mut module = ForeignModule {
            name: manifest.module.clone(),
            ..Default::default()
        };
        module.classes.insert(
            ROOT_CLASS.to_string(),
            ClassDecl {
                name: ROOT_CLASS.to_string(),
                ..Default::default()
            },
        );

        let top_level = AuditContext {
            audited: config.default_audited,
        };
        module.add_region(&manifest.typedef, &manifest.class, &manifest.function, top_level)?;
        for region in &manifest.region {
            let audit = AuditContext {
                audited: region.audited,
            };
            module.add_region(&region.typedef, &region.class, &region.function, audit)?;
        }
        module.check_superclasses()?;

        tracing::debug!(
            "imported module '{}': {} declarations, {} classes",
            module.name,
            module.declarations.len(),
            module.classes.len()
        );
        Ok(module)
    }

    fn add_region(
        &mut self,
        typedefs: &[TypedefEntry],
        classes: &[ClassEntry],
        functions: &[FunctionEntry],
        audit: AuditContext,
    ) -> Result<(), ImportError> {
        for entry in typedefs {
            if self.typedefs.contains_key(&entry.name) {
                return Err(ImportError::Duplicate {
                    kind: "typedef",
                    name: entry.name.clone(),
                });
            }
            self.typedefs.insert(
                entry.name.clone(),
                Typedef {
                    name: entry.name.clone(),
                    target: parse_ctype(&entry.target),
                    host_name: entry.host_name.clone(),
                },
            );
        }
        for entry in classes {
            self.add_class(entry, audit)?;
        }
        for entry in functions {
            if self.functions.iter().any(|id| self.decl(*id).symbol == entry.name) {
                return Err(ImportError::Duplicate {
                    kind: "function",
                    name: entry.name.clone(),
                });
            }
            let host_name = match &entry.host_name {
                Some(text) => naming::parse_host_name(text).map_err(ImportError::Parse)?,
                None => HostName::unlabeled(&entry.name, entry.params.len()),
            };
            check_arity(&entry.name, &host_name, entry.params.len())?;
            let attributes = DeclAttributes {
                nonnull: NonnullParams::from_entry(entry.nonnull.as_ref()),
                returns_nonnull: entry.returns_nonnull,
            };
            let id = self.push_decl(
                &entry.name,
                host_name,
                DeclKind::Function,
                None,
                &entry.params,
                &entry.returns,
                audit,
                attributes,
            );
            self.functions.push(id);
        }
        Ok(())
    }

    fn add_class(&mut self, entry: &ClassEntry, audit: AuditContext) -> Result<(), ImportError> {
        let class = self
            .classes
            .entry(entry.name.clone())
            .or_insert_with(|| ClassDecl {
                name: entry.name.clone(),
                ..Default::default()
            });
        if let Some(new) = &entry.superclass {
            // A class first seen without a superclass only has the root default.
            if let Some(existing) = class.superclass.as_deref() {
                if existing != new && existing != ROOT_CLASS {
                    return Err(ImportError::Parse(format!(
                        "class '{}' declared with superclasses '{existing}' and '{new}'",
                        entry.name
                    )));
                }
            }
            class.superclass = Some(new.clone());
        }
        if class.superclass.is_none() && entry.name != ROOT_CLASS {
            class.superclass = Some(ROOT_CLASS.to_string());
        }

        let mut members = Vec::new();
        for method in &entry.method {
            let host_name = match &method.host_name {
                Some(text) => naming::parse_host_name(text),
                None => naming::method_name(&method.selector),
            }
            .map_err(ImportError::Parse)?;
            check_arity(&method.selector, &host_name, method.params.len())?;
            let kind = DeclKind::Method {
                class_method: method.class_method,
            };
            self.ensure_unique_member(&entry.name, &method.selector, kind)?;
            let attributes = DeclAttributes {
                nonnull: NonnullParams::from_entry(method.nonnull.as_ref()),
                returns_nonnull: method.returns_nonnull,
            };
            members.push(self.push_decl(
                &method.selector,
                host_name,
                kind,
                Some(&entry.name),
                &method.params,
                &method.returns,
                audit,
                attributes,
            ));
        }
        for init in &entry.initializer {
            let host_name = match &init.host_name {
                Some(text) => naming::parse_host_name(text),
                None => naming::initializer_name(&init.selector),
            }
            .map_err(ImportError::Parse)?;
            check_arity(&init.selector, &host_name, init.params.len())?;
            self.ensure_unique_member(&entry.name, &init.selector, DeclKind::Initializer)?;
            members.push(self.push_decl(
                &init.selector,
                host_name,
                DeclKind::Initializer,
                Some(&entry.name),
                &init.params,
                &init.returns,
                audit,
                DeclAttributes::default(),
            ));
        }
        for property in &entry.property {
            let kind = DeclKind::Property {
                readonly: property.readonly,
            };
            self.ensure_unique_member(&entry.name, &property.name, kind)?;
            members.push(self.push_decl(
                &property.name,
                HostName::plain(&property.name),
                kind,
                Some(&entry.name),
                &[],
                &property.ty,
                audit,
                DeclAttributes::default(),
            ));
        }

        if let Some(class) = self.classes.get_mut(&entry.name) {
            class.members.extend(members);
        }
        Ok(())
    }

    fn ensure_unique_member(
        &self,
        class: &str,
        symbol: &str,
        kind: DeclKind,
    ) -> Result<(), ImportError> {
        let Some(existing) = self.classes.get(class) else {
            return Ok(());
        };
        let clash = existing.members.iter().any(|id| {
            let decl = self.decl(*id);
            decl.symbol == symbol && same_member_namespace(decl.kind, kind)
        });
        if clash {
            return Err(ImportError::Duplicate {
                kind: kind.describe(),
                name: format!("{class}.{symbol}"),
            });
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn push_decl(
        &mut self,
        symbol: &str,
        host_name: HostName,
        kind: DeclKind,
        owner: Option<&str>,
        params: &[String],
        result: &str,
        audit: AuditContext,
        attributes: DeclAttributes,
    ) -> DeclId {
        let id = DeclId(self.declarations.len() as u32);
        self.declarations.push(ForeignDeclaration {
            id,
            symbol: symbol.to_string(),
            host_name,
            kind,
            owner: owner.map(|owner| owner.to_string()),
            params: params.iter().map(|spelling| RawSlot::new(spelling)).collect(),
            result: RawSlot::new(result),
            audit,
            attributes,
        });
        id
    }

    fn check_superclasses(&mut self) -> Result<(), ImportError> {
        let missing: Vec<String> = self
            .classes
            .values()
            .filter_map(|class| class.superclass.clone())
            .filter(|name| !self.classes.contains_key(name))
            .collect();
        for name in missing {
            tracing::debug!("implicitly declaring superclass '{name}'");
            self.classes.insert(
                name.clone(),
                ClassDecl {
                    name: name.clone(),
                    superclass: Some(ROOT_CLASS.to_string()),
                    members: Vec::new(),
                },
            );
        }

        for name in self.classes.keys() {
            let mut seen = HashSet::new();
            let mut current = Some(name.as_str());
            while let Some(class) = current {
                if !seen.insert(class) {
                    return Err(ImportError::SuperclassCycle {
                        class: name.clone(),
                    });
                }
                current = self
                    .classes
                    .get(class)
                    .and_then(|decl| decl.superclass.as_deref());
            }
        }
        Ok(())
    }

    pub fn decl(&self, id: DeclId) -> &ForeignDeclaration {
        &self.declarations[id.0 as usize]
    }

    pub fn is_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Expand typedefs and lay a slot type out as nullable levels.
    pub fn shape(&self, ty: &CType, owner: Option<&str>) -> Result<SlotShape, String> {
        let mut visiting = HashSet::new();
        self.shape_inner(ty, owner, &mut visiting)
    }

    fn shape_inner<'m>(
        &'m self,
        ty: &CType,
        owner: Option<&str>,
        visiting: &mut HashSet<&'m str>,
    ) -> Result<SlotShape, String> {
        // Class and struct bases consume the first `*` as their own reference level.
        let mut consumed = 0;
        let mut shape = match &ty.base {
            BaseType::Scalar(scalar) => SlotShape {
                root: ShapeRoot::Scalar(*scalar),
                levels: Vec::new(),
            },
            BaseType::Void => SlotShape {
                root: ShapeRoot::Void,
                levels: Vec::new(),
            },
            BaseType::Id => object_shape(ObjectRef::Id),
            BaseType::Class => object_shape(ObjectRef::Class),
            BaseType::InstanceType => match owner {
                Some(owner) => object_shape(ObjectRef::Instance(owner.to_string())),
                None => {
                    return Err("'instancetype' is only valid in a class member".to_string());
                }
            },
            BaseType::Struct(name) => {
                let Some(level) = ty.pointers.first() else {
                    return Err(format!("struct '{name}' cannot be passed by value"));
                };
                consumed = 1;
                SlotShape {
                    root: ShapeRoot::Struct(name.clone()),
                    levels: vec![pointer_level(level, ty.base_const)],
                }
            }
            BaseType::Named(name) => {
                if let Some((key, typedef)) = self.typedefs.get_key_value(name) {
                    if !visiting.insert(key.as_str()) {
                        return Err(format!("typedef '{name}' refers to itself"));
                    }
                    let target = typedef
                        .target
                        .as_ref()
                        .map_err(|err| format!("typedef '{name}': {err}"))?;
                    let mut shape = self.shape_inner(target, owner, visiting)?;
                    visiting.remove(key.as_str());
                    if matches!(shape.root, ShapeRoot::Struct(_)) && shape.levels.len() == 1 {
                        let host = typedef
                            .host_name
                            .clone()
                            .unwrap_or_else(|| cf_host_name(name));
                        shape.root = ShapeRoot::Object(ObjectRef::CoreFoundation(host));
                    }
                    // Nullability written in the typedef travels with every use of it.
                    if let Some(level) = shape.levels.last_mut() {
                        level.specifiers.extend(target.context_specifiers.iter().cloned());
                    }
                    shape
                } else if self.is_class(name) {
                    let Some(level) = ty.pointers.first() else {
                        return Err(format!("interface type '{name}' cannot be passed by value"));
                    };
                    consumed = 1;
                    SlotShape {
                        root: ShapeRoot::Object(ObjectRef::Instance(name.clone())),
                        levels: vec![pointer_level(level, ty.base_const)],
                    }
                } else {
                    return Err(format!("unknown type name '{name}'"));
                }
            }
        };

        if let Some(first) = ty.base_specifiers.first() {
            match shape.levels.last_mut() {
                Some(level) if consumed == 0 => {
                    level.specifiers.extend(ty.base_specifiers.iter().cloned());
                }
                _ => {
                    return Err(format!(
                        "nullability specifier '{}' cannot be applied to non-pointer type '{}'",
                        first.spelling,
                        base_spelling(&ty.base)
                    ));
                }
            }
        }

        for (idx, level) in ty.pointers.iter().enumerate().skip(consumed) {
            let pointee_const = match idx {
                0 => ty.base_const,
                _ => ty.pointers[idx - 1].is_const,
            };
            shape.levels.push(pointer_level(level, pointee_const));
        }
        Ok(shape)
    }
}

fn object_shape(object: ObjectRef) -> SlotShape {
    SlotShape {
        root: ShapeRoot::Object(object),
        levels: vec![ShapeLevel::default()],
    }
}

fn pointer_level(level: &ctype::PointerLevel, const_pointee: bool) -> ShapeLevel {
    ShapeLevel {
        specifiers: level.specifiers.clone(),
        const_pointee,
    }
}

fn base_spelling(base: &BaseType) -> String {
    match base {
        BaseType::Void => "void".to_string(),
        BaseType::Scalar(scalar) => scalar.c_name().to_string(),
        BaseType::Id => "id".to_string(),
        BaseType::Class => "Class".to_string(),
        BaseType::InstanceType => "instancetype".to_string(),
        BaseType::Struct(name) => format!("struct {name}"),
        BaseType::Named(name) => name.clone(),
    }
}

/// `CCRefrigeratorRef` is imported as `CCRefrigerator`.
fn cf_host_name(typedef: &str) -> String {
    typedef
        .strip_suffix("Ref")
        .filter(|stem| !stem.is_empty())
        .unwrap_or(typedef)
        .to_string()
}

fn same_member_namespace(left: DeclKind, right: DeclKind) -> bool {
    match (left, right) {
        (DeclKind::Method { class_method: a }, DeclKind::Method { class_method: b }) => a == b,
        (DeclKind::Initializer, DeclKind::Initializer) => true,
        (DeclKind::Property { .. }, DeclKind::Property { .. }) => true,
        _ => false,
    }
}

fn check_arity(symbol: &str, host_name: &HostName, params: usize) -> Result<(), ImportError> {
    if host_name.labels.len() != params {
        return Err(ImportError::Parse(format!(
            "'{symbol}' takes {} argument(s) but {params} parameter type(s) were listed",
            host_name.labels.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(contents: &str) -> ForeignModule {
        let manifest = Manifest::from_toml_str(contents, Path::new("test.toml")).unwrap();
        ForeignModule::from_manifest(&manifest, &ResolveConfig::default()).unwrap()
    }

    fn shape_of(module: &ForeignModule, spelling: &str) -> Result<SlotShape, String> {
        let ty = parse_ctype(spelling).unwrap();
        module.shape(&ty, Some("Widget"))
    }

    const WIDGETS: &str = r#"
        module = "Widgets"

        [[typedef]]
        name = "WidgetRef"
        target = "struct __Widget *"

        [[typedef]]
        name = "Count"
        target = "unsigned long"

        [[typedef]]
        name = "MaybeWidget"
        target = "Widget * _Nullable"

        [[class]]
        name = "Widget"
        [[class.method]]
        selector = "attach:to:"
        params = ["Widget *", "id"]
        [[class.property]]
        name = "title"
        type = "id"
    "#;

    #[test]
    fn collects_members_and_implicit_root() {
        let module = module(WIDGETS);
        let widget = &module.classes["Widget"];
        assert_eq!(widget.superclass.as_deref(), Some(ROOT_CLASS));
        assert_eq!(widget.members.len(), 2);
        let attach = module.decl(widget.members[0]);
        assert_eq!(attach.host_name.to_string(), "attach(_:to:)");
        assert_eq!(attach.params.len(), 2);
        assert!(module.is_class(ROOT_CLASS));
    }

    #[test]
    fn shapes_object_pointers() {
        let module = module(WIDGETS);
        let shape = shape_of(&module, "Widget * _Nonnull").unwrap();
        assert_eq!(shape.root, ShapeRoot::Object(ObjectRef::Instance("Widget".into())));
        assert_eq!(shape.levels.len(), 1);
        assert_eq!(shape.levels[0].specifiers.len(), 1);

        let shape = shape_of(&module, "id _Nullable").unwrap();
        assert_eq!(shape.root, ShapeRoot::Object(ObjectRef::Id));
        assert_eq!(shape.levels[0].specifiers.len(), 1);
    }

    #[test]
    fn shapes_cf_typedefs() {
        let module = module(WIDGETS);
        let shape = shape_of(&module, "WidgetRef _Nullable").unwrap();
        assert_eq!(shape.root, ShapeRoot::Object(ObjectRef::CoreFoundation("Widget".into())));
        assert_eq!(shape.levels.len(), 1);
        assert_eq!(shape.levels[0].specifiers.len(), 1);
    }

    #[test]
    fn typedef_nullability_is_carried_to_uses() {
        let module = module(WIDGETS);
        let shape = shape_of(&module, "MaybeWidget").unwrap();
        assert_eq!(shape.root, ShapeRoot::Object(ObjectRef::Instance("Widget".into())));
        assert_eq!(shape.levels[0].specifiers.len(), 1);
        assert_eq!(shape.levels[0].specifiers[0].specifier, ctype::Specifier::Nullable);

        // A use-site specifier lands on the same level.
        let shape = shape_of(&module, "MaybeWidget _Nonnull").unwrap();
        assert_eq!(shape.levels[0].specifiers.len(), 2);

        // Through one more pointer the typedef's level is the inner one.
        let shape = shape_of(&module, "MaybeWidget *").unwrap();
        assert_eq!(shape.levels.len(), 2);
        assert_eq!(shape.levels[0].specifiers.len(), 1);
        assert!(shape.levels[1].specifiers.is_empty());
    }

    #[test]
    fn declaration_attributes_are_read_from_the_manifest() {
        let manifest = Manifest::from_toml_str(
            r#"
            module = "Attrs"
            [[function]]
            name = "Every"
            params = ["id", "id"]
            nonnull = true
            [[function]]
            name = "First"
            params = ["id", "id"]
            nonnull = [1]
            returns = "id"
            returns_nonnull = true
            [[function]]
            name = "Bare"
            params = ["id"]
            nonnull = []
            "#,
            Path::new("attrs.toml"),
        )
        .unwrap();
        let module = ForeignModule::from_manifest(&manifest, &ResolveConfig::default()).unwrap();
        let attrs: Vec<&DeclAttributes> = module.declarations.iter().map(|decl| &decl.attributes).collect();
        assert_eq!(attrs[0].nonnull, NonnullParams::AllPointers);
        assert!(!attrs[0].returns_nonnull);
        assert_eq!(attrs[1].nonnull, NonnullParams::Indices(vec![1]));
        assert!(attrs[1].returns_nonnull);
        assert_eq!(attrs[2].nonnull, NonnullParams::AllPointers);
    }

    #[test]
    fn scalar_typedef_stays_scalar() {
        let module = module(WIDGETS);
        let shape = shape_of(&module, "Count").unwrap();
        assert_eq!(shape.root, ShapeRoot::Scalar(CScalar::ULong));
        assert!(!shape.is_reference_like());
    }

    #[test]
    fn rejects_specifier_on_scalar() {
        let module = module(WIDGETS);
        let err = shape_of(&module, "int _Nonnull").unwrap_err();
        assert!(err.contains("non-pointer type 'int'"), "{err}");
        let err = shape_of(&module, "Count _Nullable").unwrap_err();
        assert!(err.contains("non-pointer type 'Count'"), "{err}");
    }

    #[test]
    fn rejects_unknown_names_and_by_value_classes() {
        let module = module(WIDGETS);
        assert!(shape_of(&module, "Gadget *").unwrap_err().contains("unknown type name"));
        assert!(shape_of(&module, "Widget").unwrap_err().contains("by value"));
    }

    #[test]
    fn pointer_levels_track_constness() {
        let module = module(WIDGETS);
        let shape = shape_of(&module, "const char * _Nonnull").unwrap();
        assert_eq!(shape.root, ShapeRoot::Scalar(CScalar::Char));
        assert_eq!(shape.levels.len(), 1);
        assert!(shape.levels[0].const_pointee);

        let shape = shape_of(&module, "id _Nullable * _Nonnull").unwrap();
        assert_eq!(shape.levels.len(), 2);
        assert!(!shape.levels[1].const_pointee);
    }

    #[test]
    fn duplicate_functions_are_rejected() {
        let manifest = Manifest::from_toml_str(
            r#"
            module = "Dup"
            [[function]]
            name = "f"
            [[function]]
            name = "f"
            "#,
            Path::new("dup.toml"),
        )
        .unwrap();
        let err = ForeignModule::from_manifest(&manifest, &ResolveConfig::default()).unwrap_err();
        assert!(matches!(err, ImportError::Duplicate { kind: "function", .. }));
    }

    #[test]
    fn superclass_cycles_are_rejected() {
        let manifest = Manifest::from_toml_str(
            r#"
            module = "Cycle"
            [[class]]
            name = "A"
            superclass = "B"
            [[class]]
            name = "B"
            superclass = "A"
            "#,
            Path::new("cycle.toml"),
        )
        .unwrap();
        let err = ForeignModule::from_manifest(&manifest, &ResolveConfig::default()).unwrap_err();
        assert!(matches!(err, ImportError::SuperclassCycle { .. }));
    }

    #[test]
    fn selector_arity_must_match_params() {
        let manifest = Manifest::from_toml_str(
            r#"
            module = "Arity"
            [[class]]
            name = "A"
            [[class.method]]
            selector = "take:"
            "#,
            Path::new("arity.toml"),
        )
        .unwrap();
        assert!(ForeignModule::from_manifest(&manifest, &ResolveConfig::default()).is_err());
    }
}
