use crate::span::Span;
use crate::syntax::ParseError;

pub type ExprId<'ast> = &'ast Expr<'ast>;
pub type StmtId<'ast> = &'ast Stmt<'ast>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident<'ast> {
    pub name: &'ast str,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Arg<'ast> {
    pub label: Option<Ident<'ast>>,
    pub value: ExprId<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub enum Expr<'ast> {
    Name(Ident<'ast>),
    Nil {
        span: Span,
    },
    Bool {
        value: bool,
        span: Span,
    },
    Int {
        span: Span,
    },
    Float {
        span: Span,
    },
    Str {
        span: Span,
    },
    /// `base.name`, or `base?.name` when `question` is set.
    Member {
        base: ExprId<'ast>,
        name: Ident<'ast>,
        question: Option<Span>,
        span: Span,
    },
    Call {
        callee: ExprId<'ast>,
        args: &'ast [Arg<'ast>],
        span: Span,
    },
    ForceUnwrap {
        expr: ExprId<'ast>,
        bang: Span,
        span: Span,
    },
    Not {
        expr: ExprId<'ast>,
        span: Span,
    },
    Neg {
        expr: ExprId<'ast>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: ExprId<'ast>,
        right: ExprId<'ast>,
        span: Span,
    },
    Paren {
        expr: ExprId<'ast>,
        span: Span,
    },
    Error {
        span: Span,
    },
}

impl<'ast> Expr<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Expr::Name(ident) => ident.span,
            Expr::Nil { span }
            | Expr::Bool { span, .. }
            | Expr::Int { span }
            | Expr::Float { span }
            | Expr::Str { span }
            | Expr::Member { span, .. }
            | Expr::Call { span, .. }
            | Expr::ForceUnwrap { span, .. }
            | Expr::Not { span, .. }
            | Expr::Neg { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Paren { span, .. }
            | Expr::Error { span } => *span,
        }
    }

    /// Look through parentheses.
    pub fn unparenthesized(&self) -> &Expr<'ast> {
        match self {
            Expr::Paren { expr, .. } => expr.unparenthesized(),
            other => other,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.unparenthesized(), Expr::Nil { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub enum TypeExpr<'ast> {
    Named {
        name: Ident<'ast>,
        args: &'ast [TypeExpr<'ast>],
        span: Span,
    },
    Optional {
        inner: &'ast TypeExpr<'ast>,
        span: Span,
    },
}

impl TypeExpr<'_> {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Named { span, .. } | TypeExpr::Optional { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Param<'ast> {
    /// Argument label; `None` for `_`.
    pub label: Option<Ident<'ast>>,
    pub name: Ident<'ast>,
    pub ty: &'ast TypeExpr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub enum Stmt<'ast> {
    Import {
        module: Ident<'ast>,
        span: Span,
    },
    Function {
        name: Ident<'ast>,
        params: &'ast [Param<'ast>],
        return_type: Option<&'ast TypeExpr<'ast>>,
        body: &'ast [StmtId<'ast>],
        span: Span,
    },
    /// `let` or `var`; a `_` pattern has no name.
    Let {
        mutable: bool,
        keyword: Span,
        name: Option<Ident<'ast>>,
        ty: Option<&'ast TypeExpr<'ast>>,
        init: Option<ExprId<'ast>>,
        span: Span,
    },
    /// `_ = value`
    Discard {
        value: ExprId<'ast>,
        span: Span,
    },
    Assign {
        target: ExprId<'ast>,
        value: ExprId<'ast>,
        span: Span,
    },
    If {
        condition: ExprId<'ast>,
        then_branch: &'ast [StmtId<'ast>],
        else_branch: Option<&'ast [StmtId<'ast>]>,
        span: Span,
    },
    Return {
        value: Option<ExprId<'ast>>,
        span: Span,
    },
    Expression {
        expr: ExprId<'ast>,
        span: Span,
    },
}

impl Stmt<'_> {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Import { span, .. }
            | Stmt::Function { span, .. }
            | Stmt::Let { span, .. }
            | Stmt::Discard { span, .. }
            | Stmt::Assign { span, .. }
            | Stmt::If { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Expression { span, .. } => *span,
        }
    }
}

#[derive(Debug)]
pub struct Program<'ast> {
    pub statements: &'ast [StmtId<'ast>],
    pub errors: Vec<ParseError>,
}
