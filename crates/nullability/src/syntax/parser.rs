use crate::span::Span;
use crate::syntax::ParseError;
use crate::syntax::ast::{
    Arg, BinaryOp, Expr, ExprId, Ident, Param, Program, Stmt, StmtId, TypeExpr,
};
use crate::syntax::lexer::{Lexer, Token, TokenKind};
use bumpalo::Bump;

/// Recursive descent parser. Statements end at a line break or `;`; after an
/// error the parser skips to the next line at the same brace depth.
pub struct Parser<'src, 'ast> {
    source: &'src [u8],
    tokens: Vec<Token>,
    pos: usize,
    arena: &'ast Bump,
    errors: Vec<ParseError>,
}

impl<'src, 'ast> Parser<'src, 'ast> {
    pub fn new(lexer: Lexer<'src>, arena: &'ast Bump) -> Self {
        let source = lexer.source();
        let (tokens, errors) = lexer.tokenize();
        Self {
            source,
            tokens,
            pos: 0,
            arena,
            errors,
        }
    }

    pub fn parse_program(&mut self) -> Program<'ast> {
        let mut statements = Vec::new();
        while !self.at(TokenKind::Eof) {
            if self.at(TokenKind::RBrace) {
                let token = self.advance();
                self.error(token.span, "extraneous '}' at top level");
                continue;
            }
            if let Some(stmt) = self.parse_statement_recovering() {
                statements.push(stmt);
            }
        }
        Program {
            statements: self.arena.alloc_slice_copy(&statements),
            errors: std::mem::take(&mut self.errors),
        }
    }

    fn peek(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_nth(&self, offset: usize) -> Token {
        self.tokens[(self.pos + offset).min(self.tokens.len() - 1)]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn previous_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .map(|idx| self.tokens[idx].span.end)
            .unwrap_or(0)
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.errors.push(ParseError::new(span, message));
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Option<Token> {
        if let Some(token) = self.eat(kind) {
            return Some(token);
        }
        let span = self.peek().span;
        self.error(span, message);
        None
    }

    fn text(&self, span: Span) -> &'ast str {
        let text = std::str::from_utf8(&self.source[span.start..span.end]).unwrap_or("");
        self.arena.alloc_str(text)
    }

    fn ident(&mut self, token: Token) -> Ident<'ast> {
        Ident {
            name: self.text(token.span),
            span: token.span,
        }
    }

    fn expect_ident(&mut self, message: &str) -> Option<Ident<'ast>> {
        let token = self.expect(TokenKind::Identifier, message)?;
        Some(self.ident(token))
    }

    fn alloc_expr(&self, expr: Expr<'ast>) -> ExprId<'ast> {
        self.arena.alloc(expr)
    }

    fn parse_statement_recovering(&mut self) -> Option<StmtId<'ast>> {
        let errors_before = self.errors.len();
        let start = self.pos;
        let stmt = self.parse_statement();
        if self.errors.len() > errors_before {
            self.synchronize(start);
            return stmt;
        }
        self.finish_statement();
        stmt
    }

    /// Skip to the first token that starts a new line at the current depth.
    fn synchronize(&mut self, start: usize) {
        let mut depth = 0usize;
        loop {
            let token = self.peek();
            if token.kind == TokenKind::Eof {
                return;
            }
            if depth == 0 && self.pos > start && token.newline_before {
                return;
            }
            match token.kind {
                TokenKind::RBrace if depth == 0 => return,
                TokenKind::RBrace => depth -= 1,
                TokenKind::LBrace => depth += 1,
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                _ => {}
            }
            self.advance();
        }
    }

    fn finish_statement(&mut self) {
        if self.eat(TokenKind::Semicolon).is_some() {
            return;
        }
        let next = self.peek();
        if next.newline_before || matches!(next.kind, TokenKind::RBrace | TokenKind::Eof) {
            return;
        }
        self.error(
            Span::point(self.previous_end()),
            "consecutive statements on a line must be separated by ';'",
        );
    }

    fn parse_statement(&mut self) -> Option<StmtId<'ast>> {
        let token = self.peek();
        let stmt = match token.kind {
            TokenKind::Import => {
                self.advance();
                let module = self.expect_ident("expected module name in import declaration")?;
                Stmt::Import {
                    module,
                    span: token.span.to(module.span),
                }
            }
            TokenKind::Func => self.parse_function()?,
            TokenKind::Let | TokenKind::Var => self.parse_binding()?,
            TokenKind::If => self.parse_if()?,
            TokenKind::Return => {
                self.advance();
                let next = self.peek();
                let has_value = !next.newline_before
                    && !matches!(
                        next.kind,
                        TokenKind::RBrace | TokenKind::Semicolon | TokenKind::Eof
                    );
                let value = has_value.then(|| self.parse_expr());
                let end = value.map(|value| value.span()).unwrap_or(token.span);
                Stmt::Return {
                    value,
                    span: token.span.to(end),
                }
            }
            TokenKind::Underscore if self.peek_nth(1).kind == TokenKind::Assign => {
                self.advance();
                self.advance();
                let value = self.parse_expr();
                Stmt::Discard {
                    value,
                    span: token.span.to(value.span()),
                }
            }
            _ => {
                let expr = self.parse_expr();
                if self.eat(TokenKind::Assign).is_some() {
                    let value = self.parse_expr();
                    Stmt::Assign {
                        target: expr,
                        value,
                        span: expr.span().to(value.span()),
                    }
                } else {
                    Stmt::Expression {
                        expr,
                        span: expr.span(),
                    }
                }
            }
        };
        Some(self.arena.alloc(stmt))
    }

    fn parse_block(&mut self) -> Option<(&'ast [StmtId<'ast>], Span)> {
        let open = self.expect(TokenKind::LBrace, "expected '{' to start block")?;
        let mut statements = Vec::new();
        loop {
            if let Some(close) = self.eat(TokenKind::RBrace) {
                let body = self.arena.alloc_slice_copy(&statements);
                return Some((body, open.span.to(close.span)));
            }
            if self.at(TokenKind::Eof) {
                self.error(self.peek().span, "expected '}' at end of block");
                return None;
            }
            if let Some(stmt) = self.parse_statement_recovering() {
                statements.push(stmt);
            }
        }
    }

    fn parse_function(&mut self) -> Option<Stmt<'ast>> {
        let keyword = self.advance();
        let name = self.expect_ident("expected identifier in function declaration")?;
        self.expect(TokenKind::LParen, "expected '(' in parameter list")?;
        let mut params = Vec::new();
        if self.eat(TokenKind::RParen).is_none() {
            loop {
                params.push(self.parse_param()?);
                if self.eat(TokenKind::Comma).is_some() {
                    continue;
                }
                self.expect(TokenKind::RParen, "expected ')' in parameter list")?;
                break;
            }
        }
        let return_type = match self.eat(TokenKind::Arrow) {
            Some(_) => Some(self.parse_type()?),
            None => None,
        };
        let (body, body_span) = self.parse_block()?;
        Some(Stmt::Function {
            name,
            params: self.arena.alloc_slice_copy(&params),
            return_type,
            body,
            span: keyword.span.to(body_span),
        })
    }

    fn parse_param(&mut self) -> Option<Param<'ast>> {
        let first = self.peek();
        let (label, name) = match (first.kind, self.peek_nth(1).kind) {
            (TokenKind::Underscore, _) => {
                self.advance();
                (None, self.expect_ident("expected parameter name")?)
            }
            (TokenKind::Identifier, TokenKind::Identifier) => {
                let label_token = self.advance();
                let label = self.ident(label_token);
                (Some(label), self.expect_ident("expected parameter name")?)
            }
            _ => {
                let name = self.expect_ident("expected parameter name")?;
                (Some(name), name)
            }
        };
        self.expect(TokenKind::Colon, "expected ':' following parameter name")?;
        let ty = self.parse_type()?;
        Some(Param {
            label,
            name,
            ty,
            span: first.span.to(ty.span()),
        })
    }

    fn parse_type(&mut self) -> Option<&'ast TypeExpr<'ast>> {
        let name = self.expect_ident("expected type")?;
        let mut span = name.span;
        let mut args = Vec::new();
        if self.eat(TokenKind::Lt).is_some() {
            loop {
                args.push(*self.parse_type()?);
                if self.eat(TokenKind::Comma).is_some() {
                    continue;
                }
                let close = self.expect(TokenKind::Gt, "expected '>' to complete generic argument list")?;
                span = span.to(close.span);
                break;
            }
        }
        let mut ty: &'ast TypeExpr<'ast> = self.arena.alloc(TypeExpr::Named {
            name,
            args: self.arena.alloc_slice_copy(&args),
            span,
        });
        while self.peek().kind == TokenKind::Question && !self.peek().space_before {
            let question = self.advance();
            span = span.to(question.span);
            ty = self.arena.alloc(TypeExpr::Optional { inner: ty, span });
        }
        Some(ty)
    }

    fn parse_binding(&mut self) -> Option<Stmt<'ast>> {
        let keyword = self.advance();
        let mutable = keyword.kind == TokenKind::Var;
        let name = match self.eat(TokenKind::Underscore) {
            Some(_) => None,
            None => Some(self.expect_ident("expected pattern")?),
        };
        let ty = match self.eat(TokenKind::Colon) {
            Some(_) => Some(self.parse_type()?),
            None => None,
        };
        let init = self.eat(TokenKind::Assign).map(|_| self.parse_expr());
        let end = init
            .map(|init| init.span())
            .or(ty.map(|ty| ty.span()))
            .or(name.map(|name| name.span))
            .unwrap_or(keyword.span);
        Some(Stmt::Let {
            mutable,
            keyword: keyword.span,
            name,
            ty,
            init,
            span: keyword.span.to(end),
        })
    }

    fn parse_if(&mut self) -> Option<Stmt<'ast>> {
        let keyword = self.advance();
        let condition = self.parse_expr();
        let (then_branch, then_span) = self.parse_block()?;
        let mut span = keyword.span.to(then_span);
        let else_branch = if self.eat(TokenKind::Else).is_some() {
            if self.at(TokenKind::If) {
                let nested = self.parse_if()?;
                let nested: StmtId<'ast> = self.arena.alloc(nested);
                span = span.to(nested.span());
                Some(&*self.arena.alloc_slice_copy(&[nested]))
            } else {
                let (body, body_span) = self.parse_block()?;
                span = span.to(body_span);
                Some(body)
            }
        } else {
            None
        };
        Some(Stmt::If {
            condition,
            then_branch,
            else_branch,
            span,
        })
    }

    pub fn parse_expr(&mut self) -> ExprId<'ast> {
        let mut left = self.parse_unary();
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                _ => return left,
            };
            self.advance();
            let right = self.parse_unary();
            left = self.alloc_expr(Expr::Binary {
                op,
                left,
                right,
                span: left.span().to(right.span()),
            });
        }
    }

    fn parse_unary(&mut self) -> ExprId<'ast> {
        let token = self.peek();
        match token.kind {
            TokenKind::Bang => {
                self.advance();
                let expr = self.parse_unary();
                self.alloc_expr(Expr::Not {
                    expr,
                    span: token.span.to(expr.span()),
                })
            }
            TokenKind::Minus => {
                self.advance();
                let expr = self.parse_unary();
                self.alloc_expr(Expr::Neg {
                    expr,
                    span: token.span.to(expr.span()),
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> ExprId<'ast> {
        let mut expr = self.parse_primary();
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Dot => {
                    self.advance();
                    let Some(name) = self.expect_ident("expected member name following '.'") else {
                        return expr;
                    };
                    expr = self.alloc_expr(Expr::Member {
                        base: expr,
                        name,
                        question: None,
                        span: expr.span().to(name.span),
                    });
                }
                TokenKind::Question
                    if !token.space_before && self.peek_nth(1).kind == TokenKind::Dot =>
                {
                    self.advance();
                    self.advance();
                    let Some(name) = self.expect_ident("expected member name following '?.'") else {
                        return expr;
                    };
                    expr = self.alloc_expr(Expr::Member {
                        base: expr,
                        name,
                        question: Some(token.span),
                        span: expr.span().to(name.span),
                    });
                }
                TokenKind::LParen if !token.newline_before => {
                    self.advance();
                    let args = self.parse_args();
                    let end = self.previous_end();
                    expr = self.alloc_expr(Expr::Call {
                        callee: expr,
                        args,
                        span: Span::new(expr.span().start, end),
                    });
                }
                TokenKind::Bang if !token.space_before => {
                    self.advance();
                    expr = self.alloc_expr(Expr::ForceUnwrap {
                        expr,
                        bang: token.span,
                        span: expr.span().to(token.span),
                    });
                }
                _ => return expr,
            }
        }
    }

    fn parse_args(&mut self) -> &'ast [Arg<'ast>] {
        let mut args = Vec::new();
        if self.eat(TokenKind::RParen).is_some() {
            return self.arena.alloc_slice_copy(&args);
        }
        loop {
            let start = self.peek();
            let label = if matches!(start.kind, TokenKind::Identifier | TokenKind::Underscore)
                && self.peek_nth(1).kind == TokenKind::Colon
            {
                self.advance();
                self.advance();
                Some(self.ident(start))
            } else {
                None
            };
            let value = self.parse_expr();
            args.push(Arg {
                label,
                value,
                span: start.span.to(value.span()),
            });
            if self.eat(TokenKind::Comma).is_some() {
                continue;
            }
            // A missing ')' is left to statement recovery.
            let _ = self.expect(TokenKind::RParen, "expected ',' separator");
            break;
        }
        self.arena.alloc_slice_copy(&args)
    }

    fn parse_primary(&mut self) -> ExprId<'ast> {
        let token = self.peek();
        let expr = match token.kind {
            TokenKind::Identifier => {
                self.advance();
                Expr::Name(self.ident(token))
            }
            TokenKind::Nil => {
                self.advance();
                Expr::Nil { span: token.span }
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Expr::Bool {
                    value: token.kind == TokenKind::True,
                    span: token.span,
                }
            }
            TokenKind::Integer => {
                self.advance();
                Expr::Int { span: token.span }
            }
            TokenKind::Float => {
                self.advance();
                Expr::Float { span: token.span }
            }
            TokenKind::String => {
                self.advance();
                Expr::Str { span: token.span }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr();
                let end = match self.expect(TokenKind::RParen, "expected ')' in expression list") {
                    Some(close) => close.span,
                    None => inner.span(),
                };
                Expr::Paren {
                    expr: inner,
                    span: token.span.to(end),
                }
            }
            _ => {
                self.error(token.span, "expected expression");
                Expr::Error {
                    span: Span::point(token.span.start),
                }
            }
        };
        self.alloc_expr(expr)
    }
}
