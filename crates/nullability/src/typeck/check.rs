use crate::config::{CheckConfig, NilComparisonPolicy};
use crate::decl::DeclKind;
use crate::decl::naming::render_labels;
use crate::diag::{Category, Diagnostic};
use crate::fixit::{self, BindingSite, Violation};
use crate::project::{ImportedModule, Signature};
use crate::span::Span;
use crate::syntax::ast::{
    Arg, BinaryOp, Expr, ExprId, Ident, Param, Program, Stmt, StmtId, TypeExpr,
};
use crate::typeck::types::{Scalar, Type};
use std::collections::HashMap;

/// Modules that are always importable besides the foreign module itself.
const SYSTEM_MODULES: &[&str] = &["Swift", "Foundation", "ObjectiveC"];

#[derive(Debug, Clone)]
struct CallTarget {
    labels: Vec<Option<String>>,
    params: Vec<Type>,
    result: Type,
}

impl CallTarget {
    fn from_signature(sig: &Signature, receiver: Option<&str>) -> Self {
        Self {
            labels: sig.name.labels.clone(),
            params: sig.param_types(),
            result: sig.result_for(receiver),
        }
    }

    fn label_list(&self) -> String {
        render_labels(self.labels.iter().map(|label| label.as_deref()))
    }
}

#[derive(Debug, Clone)]
enum Binding {
    Value { ty: Type, mutable: bool },
    Function(CallTarget),
}

/// Where a value flows; decides the wording of conversion errors.
#[derive(Debug, Clone)]
enum Site {
    Argument,
    Binding(BindingSite),
    Assignment,
    Return,
}

impl Site {
    fn mismatch(&self, actual: &Type, expected: &Type) -> String {
        match self {
            Site::Argument => format!(
                "cannot convert value of type '{actual}' to expected argument type '{expected}'"
            ),
            Site::Binding(_) => {
                format!("cannot convert value of type '{actual}' to specified type '{expected}'")
            }
            Site::Assignment => format!("cannot assign value of type '{actual}' to type '{expected}'"),
            Site::Return => format!(
                "cannot convert return expression of type '{actual}' to return type '{expected}'"
            ),
        }
    }

    fn nil_incompatible(&self, expected: &Type) -> String {
        match self {
            Site::Argument => format!("nil is not compatible with expected argument type '{expected}'"),
            Site::Binding(_) => format!("nil cannot initialize specified type '{expected}'"),
            Site::Assignment => format!("'nil' cannot be assigned to type '{expected}'"),
            Site::Return => format!("'nil' is incompatible with return type '{expected}'"),
        }
    }
}

fn unwrap_message(ty: &Type) -> String {
    format!("value of optional type '{ty}' not unwrapped; did you mean to use '!' or '?'?")
}

fn label_name<'a>(label: Option<&Ident<'a>>) -> Option<&'a str> {
    label.map(|label| label.name).filter(|name| *name != "_")
}

/// Whether a literal expression can take on `target`, and the type it has
/// without context. `None` for non-literals.
fn literal_fit(expr: &Expr, target: &Type) -> Option<(bool, Type)> {
    let scalar = |target: &Type| match target {
        Type::Scalar(scalar) => Some(*scalar),
        _ => None,
    };
    match expr.unparenthesized() {
        Expr::Int { .. } => Some((
            scalar(target).is_some_and(|s| s.is_integer() || s.is_floating()),
            Type::Scalar(Scalar::Int),
        )),
        Expr::Float { .. } => Some((
            scalar(target).is_some_and(|s| s.is_floating()),
            Type::Scalar(Scalar::Double),
        )),
        Expr::Str { .. } => {
            let c_string = Type::Pointer {
                pointee: Box::new(Type::Scalar(Scalar::CChar)),
                mutable: false,
            };
            Some((
                *target == Type::String || target.same_as(&c_string),
                Type::String,
            ))
        }
        Expr::Bool { .. } => Some((target.is_bool(), Type::Scalar(Scalar::Bool))),
        Expr::Neg { expr, .. } => match expr.unparenthesized() {
            Expr::Int { .. } | Expr::Float { .. } => literal_fit(expr, target),
            _ => None,
        },
        _ => None,
    }
}

/// Check a parsed program against an imported module. Checking never stops
/// early; diagnostics come back in the order they were found.
pub fn check_program(
    program: &Program,
    module: &ImportedModule,
    config: &CheckConfig,
) -> Vec<Diagnostic> {
    let mut ctx = CheckContext::new(module, config);
    ctx.check_block(program.statements);
    // Hoisted signatures are checked before the bodies around them.
    ctx.diagnostics.sort_by_key(|diag| diag.span.map(|span| span.start));
    tracing::debug!(
        "checked {} top-level statements: {} diagnostics",
        program.statements.len(),
        ctx.diagnostics.len()
    );
    ctx.diagnostics
}

struct CheckContext<'m> {
    module: &'m ImportedModule,
    config: &'m CheckConfig,
    diagnostics: Vec<Diagnostic>,
    scopes: Vec<HashMap<String, Binding>>,
    /// `None` outside of any function body.
    return_type: Option<Type>,
}

impl<'m> CheckContext<'m> {
    fn new(module: &'m ImportedModule, config: &'m CheckConfig) -> Self {
        Self {
            module,
            config,
            diagnostics: Vec::new(),
            scopes: vec![HashMap::new()],
            return_type: None,
        }
    }

    fn error(&mut self, category: Category, span: Span, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(category, span, message));
    }

    fn violation(&mut self, violation: Violation, message: String) {
        let fixits = fixit::fixits(&violation);
        let notes = fixit::notes(&violation, self.config.conditional_unwrap_notes);
        self.diagnostics.push(
            Diagnostic::error(violation.category(), violation.span(), message)
                .with_fixits(fixits)
                .with_notes(notes),
        );
    }

    fn lookup(&self, name: &str) -> Option<Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
    }

    fn declare(&mut self, name: Ident, binding: Binding) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if scope.insert(name.name.to_string(), binding).is_some() {
            self.error(
                Category::Usage,
                name.span,
                format!("invalid redeclaration of '{}'", name.name),
            );
        }
    }

    fn with_scope(&mut self, f: impl FnOnce(&mut Self)) {
        self.scopes.push(HashMap::new());
        f(self);
        self.scopes.pop();
    }

    fn check_block(&mut self, statements: &[StmtId]) {
        self.declare_functions(statements);
        for stmt in statements {
            self.check_stmt(stmt);
        }
    }

    /// Functions are visible throughout the block that declares them.
    fn declare_functions(&mut self, statements: &[StmtId]) {
        for stmt in statements {
            if let Stmt::Function {
                name,
                params,
                return_type,
                ..
            } = **stmt
            {
                let target = CallTarget {
                    labels: params
                        .iter()
                        .map(|param| label_name(param.label.as_ref()).map(str::to_string))
                        .collect(),
                    params: params
                        .iter()
                        .map(|param| self.resolve_type(param.ty, true))
                        .collect(),
                    result: return_type
                        .map(|ty| self.resolve_type(ty, true))
                        .unwrap_or(Type::Void),
                };
                self.declare(name, Binding::Function(target));
            }
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match *stmt {
            Stmt::Import { module, .. } => {
                if module.name != self.module.name() && !SYSTEM_MODULES.contains(&module.name) {
                    self.error(
                        Category::Unresolved,
                        module.span,
                        format!("no such module '{}'", module.name),
                    );
                }
            }
            Stmt::Function {
                params,
                return_type,
                body,
                ..
            } => self.check_function(params, return_type, body),
            Stmt::Let {
                mutable,
                keyword,
                name,
                ty,
                init,
                span,
            } => self.check_binding(mutable, keyword, name, ty, init, span),
            Stmt::Discard { value, .. } => {
                self.infer_expr(value);
            }
            Stmt::Assign { target, value, .. } => self.check_assign(target, value),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.check_condition(condition);
                self.with_scope(|ctx| ctx.check_block(then_branch));
                if let Some(else_branch) = else_branch {
                    self.with_scope(|ctx| ctx.check_block(else_branch));
                }
            }
            Stmt::Return { value, span } => self.check_return(value, span),
            Stmt::Expression { expr, .. } => {
                self.infer_expr(expr);
            }
        }
    }

    fn check_function(
        &mut self,
        params: &[Param],
        return_type: Option<&TypeExpr>,
        body: &[StmtId],
    ) {
        // Types were already reported while hoisting the declaration.
        let result = return_type
            .map(|ty| self.resolve_type(ty, false))
            .unwrap_or(Type::Void);
        let outer = self.return_type.replace(result);
        self.with_scope(|ctx| {
            for param in params {
                let ty = ctx.resolve_type(param.ty, false);
                ctx.declare(param.name, Binding::Value { ty, mutable: false });
            }
            ctx.check_block(body);
        });
        self.return_type = outer;
    }

    fn check_binding(
        &mut self,
        mutable: bool,
        keyword: Span,
        name: Option<Ident>,
        ty: Option<&TypeExpr>,
        init: Option<ExprId>,
        span: Span,
    ) {
        let declared = ty.map(|ty| self.resolve_type(ty, true));
        let bound = match (declared, init) {
            (Some(declared), Some(init)) => {
                let site = Site::Binding(BindingSite {
                    keyword,
                    mutable,
                    name: name.map(|name| name.name.to_string()),
                });
                self.coerce(init, &declared, &site);
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(init)) => {
                let inferred = self.infer_expr(init);
                if inferred == Type::Void {
                    if let Some(name) = name {
                        let kind = if mutable { "variable" } else { "constant" };
                        self.diagnostics.push(Diagnostic::warning(
                            Category::Usage,
                            Some(name.span),
                            format!(
                                "{kind} '{}' inferred to have type 'Void', which may be unexpected",
                                name.name
                            ),
                        ));
                    }
                }
                inferred
            }
            (None, None) => {
                self.error(Category::Usage, span, "type annotation missing in pattern");
                Type::Unknown
            }
        };
        if let Some(name) = name {
            self.declare(name, Binding::Value { ty: bound, mutable });
        }
    }

    fn check_assign(&mut self, target: ExprId, value: ExprId) {
        let module = self.module;
        match *target.unparenthesized() {
            Expr::Name(ident) => match self.lookup(ident.name) {
                Some(Binding::Value { ty, mutable }) => {
                    if !mutable {
                        self.error(
                            Category::Usage,
                            ident.span,
                            format!("cannot assign to value: '{}' is a 'let' constant", ident.name),
                        );
                    }
                    self.coerce(value, &ty, &Site::Assignment);
                }
                Some(Binding::Function(_)) => {
                    self.error(
                        Category::Usage,
                        ident.span,
                        format!("cannot assign to value: '{}' is a function", ident.name),
                    );
                    self.infer_expr(value);
                }
                None => {
                    self.infer_name(ident);
                    self.infer_expr(value);
                }
            },
            Expr::Member {
                base,
                name,
                question,
                ..
            } => {
                let Some(receiver) = self.receiver(base, question) else {
                    self.infer_expr(value);
                    return;
                };
                let property = match &receiver {
                    Type::Object(class) => module.property(class, name.name),
                    _ => None,
                };
                match property {
                    Some(sig) => {
                        if matches!(sig.kind, DeclKind::Property { readonly: true }) {
                            self.error(
                                Category::Usage,
                                name.span,
                                format!(
                                    "cannot assign to property: '{}' is a get-only property",
                                    name.name
                                ),
                            );
                        }
                        self.coerce(value, &sig.setter_type(), &Site::Assignment);
                    }
                    None => {
                        self.member_type(&receiver, name);
                        self.infer_expr(value);
                    }
                }
            }
            Expr::ForceUnwrap { .. } => {
                let ty = self.infer_expr(target);
                self.coerce(value, &ty, &Site::Assignment);
            }
            _ => {
                self.infer_expr(target);
                self.error(
                    Category::Usage,
                    target.span(),
                    "cannot assign to value: expression is not assignable",
                );
                self.infer_expr(value);
            }
        }
    }

    fn check_condition(&mut self, condition: ExprId) {
        let ty = self.infer_expr(condition);
        if ty.is_unknown() || ty.is_bool() {
            return;
        }
        if ty.is_optional() {
            self.violation(
                Violation::OptionalCondition {
                    expr: condition.span(),
                },
                format!(
                    "optional type '{ty}' cannot be used as a boolean; test for '!= nil' instead"
                ),
            );
            return;
        }
        self.error(
            Category::TypeMismatch,
            condition.span(),
            format!("cannot convert value of type '{ty}' to expected condition type 'Bool'"),
        );
    }

    fn check_return(&mut self, value: Option<ExprId>, span: Span) {
        let Some(expected) = self.return_type.clone() else {
            self.error(Category::Usage, span, "return invalid outside of a func");
            if let Some(value) = value {
                self.infer_expr(value);
            }
            return;
        };
        match value {
            Some(value) if expected == Type::Void => {
                self.infer_expr(value);
                self.error(
                    Category::Usage,
                    value.span(),
                    "unexpected non-void return value in void function",
                );
            }
            Some(value) => self.coerce(value, &expected, &Site::Return),
            None if expected != Type::Void && !expected.is_unknown() => {
                self.error(Category::Usage, span, "non-void function should return a value");
            }
            None => {}
        }
    }

    fn resolve_type(&mut self, ty: &TypeExpr, report: bool) -> Type {
        match *ty {
            TypeExpr::Optional { inner, .. } => Type::optional(self.resolve_type(inner, report)),
            TypeExpr::Named { name, args, span } => {
                let args: Vec<Type> = args
                    .iter()
                    .map(|arg| self.resolve_type(arg, report))
                    .collect();
                let message = match (name.name, args.as_slice()) {
                    ("UnsafePointer", [pointee]) => {
                        return Type::Pointer {
                            pointee: Box::new(pointee.clone()),
                            mutable: false,
                        };
                    }
                    ("UnsafeMutablePointer", [pointee]) => {
                        return Type::Pointer {
                            pointee: Box::new(pointee.clone()),
                            mutable: true,
                        };
                    }
                    ("Optional", [inner]) => return Type::optional(inner.clone()),
                    ("UnsafePointer" | "UnsafeMutablePointer" | "Optional", []) => format!(
                        "reference to generic type '{}' requires arguments in <...>",
                        name.name
                    ),
                    ("UnsafePointer" | "UnsafeMutablePointer" | "Optional", _) => format!(
                        "generic type '{}' specialized with too many type parameters (got {}, but expected 1)",
                        name.name,
                        args.len()
                    ),
                    (_, [_, ..]) => format!("cannot specialize non-generic type '{}'", name.name),
                    (simple, []) => match self.named_type(simple) {
                        Some(ty) => return ty,
                        None => format!("cannot find type '{simple}' in scope"),
                    },
                };
                if report {
                    self.error(Category::Unresolved, span, message);
                }
                Type::Unknown
            }
        }
    }

    fn named_type(&self, name: &str) -> Option<Type> {
        if let Some(scalar) = Scalar::from_name(name) {
            return Some(Type::Scalar(scalar));
        }
        let ty = match name {
            "String" => Type::String,
            "Void" => Type::Void,
            "AnyObject" => Type::AnyObject,
            "AnyClass" => Type::AnyClass,
            "OpaquePointer" => Type::OpaquePointer,
            "UnsafeRawPointer" => Type::RawPointer { mutable: false },
            "UnsafeMutableRawPointer" => Type::RawPointer { mutable: true },
            _ if self.module.is_class(name) => Type::Object(name.to_string()),
            _ if self.module.is_cf_type(name) => Type::CoreFoundation(name.to_string()),
            _ => return None,
        };
        Some(ty)
    }

    fn is_convertible(&self, from: &Type, to: &Type) -> bool {
        match (from, to) {
            (Type::Unknown, _) | (_, Type::Unknown) => true,
            (Type::Optional(from), Type::Optional(to)) => self.is_convertible(from, to),
            (from, Type::Optional(to)) => self.is_convertible(from, to),
            (Type::Optional(_), _) => false,
            (from, to) if from.same_as(to) => true,
            (Type::Object(sub), Type::Object(sup)) => self.module.is_subclass(sub, sup),
            (from, Type::AnyObject) => from.is_object_like(),
            (Type::Metatype(_), Type::AnyClass) => true,
            (
                Type::Pointer {
                    pointee: from,
                    mutable: true,
                },
                Type::Pointer {
                    pointee: to,
                    mutable: false,
                },
            ) => from.same_as(to),
            (Type::Pointer { mutable, .. }, Type::RawPointer { mutable: raw_mutable }) => {
                *mutable || !*raw_mutable
            }
            (Type::RawPointer { mutable: true }, Type::RawPointer { mutable: false }) => true,
            _ => false,
        }
    }

    /// Check a value flowing into a slot of type `expected`.
    fn coerce(&mut self, expr: ExprId, expected: &Type, site: &Site) {
        if expected.is_unknown() {
            self.infer_expr(expr);
            return;
        }
        if expr.is_nil() {
            if !expected.is_optional() {
                self.violation(
                    Violation::NilIncompatible { nil: expr.span() },
                    site.nil_incompatible(expected),
                );
            }
            return;
        }
        if let Some((fits, literal_ty)) = literal_fit(expr, expected.non_optional()) {
            if !fits {
                self.violation(
                    Violation::TypeMismatch { expr: expr.span() },
                    site.mismatch(&literal_ty, expected),
                );
            }
            return;
        }

        let actual = self.infer_expr(expr);
        if actual.is_unknown() || self.is_convertible(&actual, expected) {
            return;
        }
        // Base types are compared before nullability.
        if actual.is_optional()
            && !expected.is_optional()
            && self.is_convertible(actual.non_optional(), expected)
        {
            let binding = match site {
                Site::Binding(binding) => Some(binding.clone()),
                _ => None,
            };
            self.violation(
                Violation::UnwrapRequired {
                    expr: expr.span(),
                    binding,
                },
                unwrap_message(&actual),
            );
            return;
        }
        self.violation(
            Violation::TypeMismatch { expr: expr.span() },
            site.mismatch(&actual, expected),
        );
    }

    fn infer_expr(&mut self, expr: ExprId) -> Type {
        match *expr {
            Expr::Name(ident) => self.infer_name(ident),
            Expr::Nil { span } => {
                self.error(Category::Usage, span, "'nil' requires a contextual type");
                Type::Unknown
            }
            Expr::Bool { .. } => Type::Scalar(Scalar::Bool),
            Expr::Int { .. } => Type::Scalar(Scalar::Int),
            Expr::Float { .. } => Type::Scalar(Scalar::Double),
            Expr::Str { .. } => Type::String,
            Expr::Member {
                base,
                name,
                question,
                ..
            } => {
                let Some(receiver) = self.receiver(base, question) else {
                    return Type::Unknown;
                };
                let ty = self.member_type(&receiver, name);
                if question.is_some() {
                    Type::optional(ty)
                } else {
                    ty
                }
            }
            Expr::Call { callee, args, span } => self.infer_call(callee, args, span),
            Expr::ForceUnwrap { expr: inner, bang, .. } => {
                let ty = self.infer_expr(inner);
                if ty.is_unknown() || ty.is_optional() {
                    return ty.non_optional().clone();
                }
                self.violation(
                    Violation::ForceUnwrapNonOptional { bang },
                    format!("cannot force unwrap value of non-optional type '{ty}'"),
                );
                ty
            }
            Expr::Not { expr: inner, .. } => {
                let ty = self.infer_expr(inner);
                if !ty.is_unknown() && !ty.is_bool() {
                    self.error(
                        Category::TypeMismatch,
                        inner.span(),
                        format!("cannot convert value of type '{ty}' to expected argument type 'Bool'"),
                    );
                }
                Type::Scalar(Scalar::Bool)
            }
            Expr::Neg { expr: inner, span } => {
                let ty = self.infer_expr(inner);
                let numeric = matches!(&ty, Type::Scalar(s) if s.is_integer() || s.is_floating());
                if !ty.is_unknown() && !numeric {
                    self.error(
                        Category::TypeMismatch,
                        span,
                        format!("unary operator '-' cannot be applied to an operand of type '{ty}'"),
                    );
                }
                ty
            }
            Expr::Binary {
                op,
                left,
                right,
                span,
            } => {
                self.check_equality(op, left, right, span);
                Type::Scalar(Scalar::Bool)
            }
            Expr::Paren { expr: inner, .. } => self.infer_expr(inner),
            Expr::Error { .. } => Type::Unknown,
        }
    }

    fn infer_name(&mut self, ident: Ident) -> Type {
        match self.lookup(ident.name) {
            Some(Binding::Value { ty, .. }) => ty,
            Some(Binding::Function(_)) => Type::Unknown,
            None if self.module.is_class(ident.name) => Type::Metatype(ident.name.to_string()),
            None if !self.module.functions(ident.name).is_empty() => Type::Unknown,
            None => {
                self.error(
                    Category::Unresolved,
                    ident.span,
                    format!("cannot find '{}' in scope", ident.name),
                );
                Type::Unknown
            }
        }
    }

    /// Type a member-access base. An optional base needs `!` or `?.`.
    fn receiver(&mut self, base: ExprId, question: Option<Span>) -> Option<Type> {
        let base_ty = self.infer_expr(base);
        if base_ty.is_unknown() {
            return None;
        }
        match question {
            Some(question) if !base_ty.is_optional() => self.violation(
                Violation::OptionalChainNonOptional { question },
                format!("cannot use optional chaining on non-optional value of type '{base_ty}'"),
            ),
            None if base_ty.is_optional() => self.violation(
                Violation::UnwrapRequired {
                    expr: base.span(),
                    binding: None,
                },
                unwrap_message(&base_ty),
            ),
            _ => {}
        }
        Some(base_ty.non_optional().clone())
    }

    fn no_member(&mut self, receiver: &Type, name: Ident) {
        let message = match receiver {
            Type::Metatype(class) => format!("type '{class}' has no member '{}'", name.name),
            other => format!("value of type '{other}' has no member '{}'", name.name),
        };
        self.error(Category::Unresolved, name.span, message);
    }

    /// Type of `receiver.name` used as a value.
    fn member_type(&mut self, receiver: &Type, name: Ident) -> Type {
        let module = self.module;
        match receiver {
            // Dynamic lookup; the result is unchecked.
            Type::AnyObject => Type::Unknown,
            Type::Object(class) => {
                if let Some(property) = module.property(class, name.name) {
                    return property.result_for(Some(class));
                }
                if !module.methods(class, name.name, false).is_empty() {
                    return Type::Unknown;
                }
                self.no_member(receiver, name);
                Type::Unknown
            }
            Type::Metatype(class) if !module.methods(class, name.name, true).is_empty() => {
                Type::Unknown
            }
            _ => {
                self.no_member(receiver, name);
                Type::Unknown
            }
        }
    }

    fn infer_args(&mut self, args: &[Arg]) {
        for arg in args {
            self.infer_expr(arg.value);
        }
    }

    fn non_function(&mut self, span: Span, ty: &Type, args: &[Arg]) -> Type {
        self.error(
            Category::Usage,
            span,
            format!("cannot call value of non-function type '{ty}'"),
        );
        self.infer_args(args);
        Type::Unknown
    }

    fn infer_call(&mut self, callee: ExprId, args: &[Arg], span: Span) -> Type {
        let module = self.module;
        match *callee.unparenthesized() {
            Expr::Name(ident) => {
                match self.lookup(ident.name) {
                    Some(Binding::Function(target)) => {
                        let describe = format!("local function '{}'", ident.name);
                        return self.check_call(&[target], args, span, &describe);
                    }
                    Some(Binding::Value { ty, .. }) => {
                        return self.non_function(ident.span, &ty, args);
                    }
                    None => {}
                }
                let functions = module.functions(ident.name);
                if !functions.is_empty() {
                    let targets: Vec<CallTarget> = functions
                        .iter()
                        .map(|sig| CallTarget::from_signature(sig, None))
                        .collect();
                    let describe = format!("global function '{}'", ident.name);
                    return self.check_call(&targets, args, span, &describe);
                }
                if module.is_class(ident.name) {
                    return self.construct(ident.name, args, span);
                }
                self.error(
                    Category::Unresolved,
                    ident.span,
                    format!("cannot find '{}' in scope", ident.name),
                );
                self.infer_args(args);
                Type::Unknown
            }
            Expr::Member {
                base,
                name,
                question,
                ..
            } => {
                let Some(receiver) = self.receiver(base, question) else {
                    self.infer_args(args);
                    return Type::Unknown;
                };
                let result = self.call_member(&receiver, name, args, span);
                if question.is_some() {
                    Type::optional(result)
                } else {
                    result
                }
            }
            _ => {
                let ty = self.infer_expr(callee);
                if ty.is_unknown() {
                    self.infer_args(args);
                    return Type::Unknown;
                }
                self.non_function(callee.span(), &ty, args)
            }
        }
    }

    fn call_member(&mut self, receiver: &Type, name: Ident, args: &[Arg], span: Span) -> Type {
        let module = self.module;
        let (class, class_side) = match receiver {
            Type::AnyObject => {
                self.infer_args(args);
                return Type::Unknown;
            }
            Type::Metatype(class) if name.name == "init" => {
                return self.construct(class, args, span);
            }
            Type::Object(class) => (class, false),
            Type::Metatype(class) => (class, true),
            _ => {
                self.no_member(receiver, name);
                self.infer_args(args);
                return Type::Unknown;
            }
        };

        let methods = module.methods(class, name.name, class_side);
        if methods.is_empty() {
            match module.property(class, name.name) {
                Some(property) if !class_side => {
                    let ty = property.result_for(Some(class));
                    return self.non_function(name.span, &ty, args);
                }
                _ => {
                    self.no_member(receiver, name);
                    self.infer_args(args);
                    return Type::Unknown;
                }
            }
        }
        let targets: Vec<CallTarget> = methods
            .iter()
            .map(|sig| CallTarget::from_signature(sig, Some(class)))
            .collect();
        let kind = if class_side { "class method" } else { "instance method" };
        let describe = format!("{kind} '{}'", name.name);
        self.check_call(&targets, args, span, &describe)
    }

    fn construct(&mut self, class: &str, args: &[Arg], span: Span) -> Type {
        let mut targets: Vec<CallTarget> = self
            .module
            .initializers(class)
            .iter()
            .map(|sig| CallTarget::from_signature(sig, Some(class)))
            .collect();
        if targets.is_empty() {
            // Inherited `init()` from the root class.
            targets.push(CallTarget {
                labels: Vec::new(),
                params: Vec::new(),
                result: Type::Object(class.to_string()),
            });
        }
        let describe = format!("initializer of '{class}'");
        self.check_call(&targets, args, span, &describe)
    }

    fn check_call(
        &mut self,
        targets: &[CallTarget],
        args: &[Arg],
        span: Span,
        describe: &str,
    ) -> Type {
        let arg_labels: Vec<Option<&str>> = args
            .iter()
            .map(|arg| label_name(arg.label.as_ref()))
            .collect();
        let matching = targets.iter().find(|target| {
            target.labels.len() == arg_labels.len()
                && target
                    .labels
                    .iter()
                    .zip(&arg_labels)
                    .all(|(expected, have)| expected.as_deref() == *have)
        });
        let target = match (matching, targets) {
            (Some(target), _) => target,
            (None, [only]) => {
                self.report_call_shape(only, args, &arg_labels, span);
                only
            }
            (None, _) => {
                self.error(
                    Category::Usage,
                    span,
                    format!("no exact matches in call to {describe}"),
                );
                self.infer_args(args);
                return Type::Unknown;
            }
        };

        for (arg, param) in args.iter().zip(&target.params) {
            self.coerce(arg.value, param, &Site::Argument);
        }
        if args.len() > target.params.len() {
            self.infer_args(&args[target.params.len()..]);
        }
        target.result.clone()
    }

    fn report_call_shape(
        &mut self,
        target: &CallTarget,
        args: &[Arg],
        arg_labels: &[Option<&str>],
        span: Span,
    ) {
        let expected = target.params.len();
        if args.len() < expected {
            let missing = args.len();
            let message = match &target.labels[missing] {
                Some(label) => format!("missing argument for parameter '{label}' in call"),
                None => format!("missing argument for parameter #{} in call", missing + 1),
            };
            self.error(Category::Usage, Span::point(span.end.saturating_sub(1)), message);
            return;
        }
        if args.len() > expected {
            let extra = &args[expected];
            let message = match label_name(extra.label.as_ref()) {
                Some(label) => format!("extra argument '{label}' in call"),
                None => "extra argument in call".to_string(),
            };
            self.error(Category::Usage, extra.span, message);
            return;
        }
        let mismatched: Vec<usize> = target
            .labels
            .iter()
            .zip(arg_labels)
            .enumerate()
            .filter(|(_, (expected, have))| expected.as_deref() != **have)
            .map(|(idx, _)| idx)
            .collect();
        let Some(first) = mismatched.first() else {
            return;
        };
        let noun = if mismatched.len() == 1 { "label" } else { "labels" };
        self.error(
            Category::Usage,
            args[*first].span,
            format!(
                "incorrect argument {noun} in call (have '{}', expected '{}')",
                render_labels(arg_labels.iter().copied()),
                target.label_list()
            ),
        );
    }

    fn check_equality(&mut self, op: BinaryOp, left: ExprId, right: ExprId, span: Span) {
        match (left.is_nil(), right.is_nil()) {
            (true, true) => {}
            (true, false) => {
                let ty = self.infer_expr(right);
                self.nil_comparison(&ty, right.span(), op);
            }
            (false, true) => {
                let ty = self.infer_expr(left);
                self.nil_comparison(&ty, left.span(), op);
            }
            (false, false) => {
                let (left_ty, right_ty, compatible) = self.operand_types(left, right);
                if !compatible {
                    self.error(
                        Category::TypeMismatch,
                        span,
                        format!(
                            "binary operator '{}' cannot be applied to operands of type '{left_ty}' and '{right_ty}'",
                            op.symbol()
                        ),
                    );
                }
            }
        }
    }

    /// Operand types of `==`, with a literal operand taking the type of the
    /// other side when it can.
    fn operand_types(&mut self, left: ExprId, right: ExprId) -> (Type, Type, bool) {
        let literal = |expr: ExprId| literal_fit(expr, &Type::Unknown).map(|(_, ty)| ty);
        match (literal(left), literal(right)) {
            (Some(left_ty), Some(right_ty)) => {
                let compatible = left_ty == right_ty
                    || literal_fit(left, &right_ty).is_some_and(|(fits, _)| fits);
                (left_ty, right_ty, compatible)
            }
            (Some(left_ty), None) => {
                let right_ty = self.infer_expr(right);
                let compatible = right_ty.is_unknown()
                    || literal_fit(left, right_ty.non_optional()).is_some_and(|(fits, _)| fits);
                (left_ty, right_ty, compatible)
            }
            (None, Some(right_ty)) => {
                let left_ty = self.infer_expr(left);
                let compatible = left_ty.is_unknown()
                    || literal_fit(right, left_ty.non_optional()).is_some_and(|(fits, _)| fits);
                (left_ty, right_ty, compatible)
            }
            (None, None) => {
                let left_ty = self.infer_expr(left);
                let right_ty = self.infer_expr(right);
                let compatible = self.is_convertible(&left_ty, &right_ty)
                    || self.is_convertible(&right_ty, &left_ty);
                (left_ty, right_ty, compatible)
            }
        }
    }

    fn nil_comparison(&mut self, ty: &Type, span: Span, op: BinaryOp) {
        if self.config.nil_comparison != NilComparisonPolicy::ReferenceOnly {
            return;
        }
        if ty.is_unknown() || ty.is_optional() || ty.is_reference_like() {
            return;
        }
        let outcome = match op {
            BinaryOp::Eq => "false",
            BinaryOp::NotEq => "true",
        };
        self.diagnostics.push(Diagnostic::warning(
            Category::Usage,
            Some(span),
            format!("comparing non-optional value of type '{ty}' to 'nil' always returns {outcome}"),
        ));
    }
}
