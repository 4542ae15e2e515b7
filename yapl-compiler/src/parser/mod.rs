use anyhow::{bail, Result};

use crate::ast::*;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::lexer::{Keyword, Token, TokenKind};

/// Binding power of infix operators, lowest first. Dispatch (`.` and `@`)
/// binds tighter than everything and is handled outside this table.
#[derive(Copy, Clone, PartialEq, PartialOrd)]
enum Precedence {
    Lowest = 0,
    Not,
    Comparison,
    Term,
    Factor,
    IsVoid,
    Negate,
}

impl Precedence {
    fn of(kind: &TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Less | TokenKind::LessEqual | TokenKind::Equal => {
                Some(Precedence::Comparison)
            }
            TokenKind::Plus | TokenKind::Minus => Some(Precedence::Term),
            TokenKind::Star | TokenKind::Slash => Some(Precedence::Factor),
            _ => None,
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    diagnostics: Diagnostics,
    ids: ExprIdAllocator,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            diagnostics: Diagnostics::new(),
            ids: ExprIdAllocator::new(),
        }
    }

    fn span_from_token(token: &Token) -> SourceSpan {
        let len = token.lexeme.chars().count().max(1);
        SourceSpan::new(
            token.line,
            token.column,
            token.line,
            token.column + len.saturating_sub(1),
        )
    }

    fn union_spans(a: &SourceSpan, b: &SourceSpan) -> SourceSpan {
        SourceSpan::union(a, b)
    }

    fn make_expression(&mut self, span: SourceSpan, kind: ExpressionKind) -> Expression {
        self.ids.make(span, kind)
    }

    pub fn parse(&mut self) -> Result<Program> {
        let mut classes = Vec::new();

        while !self.is_at_end() {
            let class = self.parse_class()?;
            self.expect_token(TokenKind::Semicolon, "expected ';' after class body")?;
            classes.push(class);
        }

        if classes.is_empty() {
            return self.syntax_error("expected at least one class declaration");
        }

        Ok(Program::new(classes, self.ids.allocated()))
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    fn parse_class(&mut self) -> Result<ClassDeclaration> {
        let class_token = self.peek().clone();
        self.expect_keyword(Keyword::Class, "expected 'class'")?;
        let name = self.expect_type_name("expected class name")?;

        let parent = if self.check_keyword(Keyword::Inherits) {
            self.advance(); // consume 'inherits'
            Some(self.expect_type_name("expected parent class name after 'inherits'")?)
        } else {
            None
        };

        self.expect_token(TokenKind::LBrace, "expected '{' to start class body")?;
        let mut features = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::RBrace) && !self.is_at_end() {
            features.push(self.parse_feature()?);
            self.expect_token(TokenKind::Semicolon, "expected ';' after feature")?;
        }
        let closing_token = self.peek().clone();
        self.expect_token(TokenKind::RBrace, "expected '}' to close class body")?;

        let span = Self::union_spans(
            &Self::span_from_token(&class_token),
            &Self::span_from_token(&closing_token),
        );
        Ok(ClassDeclaration {
            name: name.name,
            name_span: name.span,
            parent,
            features,
            span,
        })
    }

    fn parse_feature(&mut self) -> Result<Feature> {
        let name_token = self.peek().clone();
        self.expect_token(TokenKind::ObjectId, "expected feature name")?;
        let name_span = Self::span_from_token(&name_token);

        if matches!(self.peek_kind(), TokenKind::LParen) {
            self.advance(); // consume '('
            let formals = self.parse_formals()?;
            self.expect_token(TokenKind::Colon, "expected ':' before method return type")?;
            let return_type = self.expect_type_name("expected method return type")?;
            self.expect_token(TokenKind::LBrace, "expected '{' to start method body")?;
            let body = self.parse_expression()?;
            self.expect_token(TokenKind::RBrace, "expected '}' to close method body")?;
            return Ok(Feature::Method(MethodDeclaration {
                name: name_token.lexeme,
                name_span,
                formals,
                return_type,
                body,
            }));
        }

        self.expect_token(TokenKind::Colon, "expected ':' or '(' after feature name")?;
        let type_name = self.expect_type_name("expected attribute type")?;
        let initializer = if matches!(self.peek_kind(), TokenKind::Assign) {
            self.advance(); // consume '<-'
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Feature::Attribute(AttributeDeclaration {
            name: name_token.lexeme,
            name_span,
            type_name,
            initializer,
        }))
    }

    fn parse_formals(&mut self) -> Result<Vec<Formal>> {
        let mut formals = Vec::new();
        if matches!(self.peek_kind(), TokenKind::RParen) {
            self.advance();
            return Ok(formals);
        }

        loop {
            let name_token = self.peek().clone();
            self.expect_token(TokenKind::ObjectId, "expected parameter name")?;
            self.expect_token(TokenKind::Colon, "expected ':' after parameter name")?;
            let type_name = self.expect_type_name("expected parameter type")?;
            formals.push(Formal {
                name: name_token.lexeme.clone(),
                span: Self::span_from_token(&name_token),
                type_name,
            });

            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    return Ok(formals);
                }
                _ => return self.syntax_error("expected ',' or ')' in parameter list"),
            }
        }
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_expression_prec(Precedence::Lowest)
    }

    fn parse_expression_prec(&mut self, precedence: Precedence) -> Result<Expression> {
        let mut expr = self.parse_prefix_expression()?;

        loop {
            match self.peek_kind() {
                TokenKind::Dot | TokenKind::At => {
                    expr = self.finish_dispatch(expr)?;
                    continue;
                }
                _ => {}
            }

            let next_precedence = match Precedence::of(self.peek_kind()) {
                Some(p) => p,
                None => break,
            };

            if precedence >= next_precedence {
                break;
            }

            expr = self.parse_infix_expression(expr, next_precedence)?;

            if next_precedence == Precedence::Comparison
                && Precedence::of(self.peek_kind()) == Some(Precedence::Comparison)
            {
                return self.syntax_error("comparison operators cannot be chained");
            }
        }

        Ok(expr)
    }

    fn parse_prefix_expression(&mut self) -> Result<Expression> {
        let token = self.peek().clone();
        let token_span = Self::span_from_token(&token);
        match token.kind {
            TokenKind::ObjectId => {
                self.advance();
                match self.peek_kind() {
                    TokenKind::Assign => self.parse_assignment(token),
                    TokenKind::LParen => {
                        let method = Identifier {
                            name: token.lexeme,
                            span: token_span,
                        };
                        let (arguments, closing_span) = self.parse_arguments()?;
                        let span = Self::union_spans(&token_span, &closing_span);
                        Ok(self.make_expression(
                            span,
                            ExpressionKind::Call(CallExpression { method, arguments }),
                        ))
                    }
                    _ if token.lexeme == "self" => {
                        Ok(self.make_expression(token_span, ExpressionKind::SelfReference))
                    }
                    _ => Ok(self.make_expression(
                        token_span,
                        ExpressionKind::Identifier(Identifier {
                            name: token.lexeme,
                            span: token_span,
                        }),
                    )),
                }
            }
            TokenKind::IntegerLiteral(value) => {
                self.advance();
                Ok(self.make_expression(
                    token_span,
                    ExpressionKind::Literal(Literal::Integer(value)),
                ))
            }
            TokenKind::StringLiteral(ref string) => {
                self.advance();
                Ok(self.make_expression(
                    token_span,
                    ExpressionKind::Literal(Literal::String(string.clone())),
                ))
            }
            TokenKind::BooleanLiteral(value) => {
                self.advance();
                Ok(self.make_expression(
                    token_span,
                    ExpressionKind::Literal(Literal::Boolean(value)),
                ))
            }
            TokenKind::Tilde => {
                self.advance();
                self.parse_unary(UnaryOperator::Negate, Precedence::Negate, token_span)
            }
            TokenKind::Keyword(Keyword::IsVoid) => {
                self.advance();
                self.parse_unary(UnaryOperator::IsVoid, Precedence::IsVoid, token_span)
            }
            TokenKind::Keyword(Keyword::Not) => {
                self.advance();
                self.parse_unary(UnaryOperator::Not, Precedence::Not, token_span)
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                let closing_token = self.peek().clone();
                self.expect_token(TokenKind::RParen, "expected ')' after expression")?;
                let closing_span = Self::span_from_token(&closing_token);
                let span =
                    Self::union_spans(&token_span, &Self::union_spans(&expr.span, &closing_span));
                Ok(self.make_expression(span, ExpressionKind::Grouping(Box::new(expr))))
            }
            TokenKind::LBrace => {
                self.advance();
                self.parse_block(token_span)
            }
            TokenKind::Keyword(Keyword::If) => {
                self.advance();
                self.parse_conditional(token_span)
            }
            TokenKind::Keyword(Keyword::While) => {
                self.advance();
                self.parse_loop(token_span)
            }
            TokenKind::Keyword(Keyword::Let) => {
                self.advance();
                self.parse_let(token_span)
            }
            TokenKind::Keyword(Keyword::New) => {
                self.advance();
                let type_name = self.expect_type_name("expected type name after 'new'")?;
                let span = Self::union_spans(&token_span, &type_name.span);
                Ok(self.make_expression(span, ExpressionKind::New(type_name)))
            }
            _ => self.syntax_error("expected expression"),
        }
    }

    fn parse_assignment(&mut self, target_token: Token) -> Result<Expression> {
        self.advance(); // consume '<-'
        let target_span = Self::span_from_token(&target_token);
        let value = self.parse_expression()?;
        let span = Self::union_spans(&target_span, &value.span);
        Ok(self.make_expression(
            span,
            ExpressionKind::Assignment(AssignmentExpression {
                target: Identifier {
                    name: target_token.lexeme,
                    span: target_span,
                },
                value: Box::new(value),
            }),
        ))
    }

    fn parse_unary(
        &mut self,
        operator: UnaryOperator,
        precedence: Precedence,
        token_span: SourceSpan,
    ) -> Result<Expression> {
        let operand = self.parse_expression_prec(precedence)?;
        let span = Self::union_spans(&token_span, &operand.span);
        Ok(self.make_expression(
            span,
            ExpressionKind::Unary(UnaryExpression {
                operator,
                operand: Box::new(operand),
            }),
        ))
    }

    fn parse_block(&mut self, opening_span: SourceSpan) -> Result<Expression> {
        let mut expressions = Vec::new();
        loop {
            expressions.push(self.parse_expression()?);
            self.expect_token(TokenKind::Semicolon, "expected ';' after block expression")?;
            if matches!(self.peek_kind(), TokenKind::RBrace) {
                break;
            }
        }
        let closing_token = self.advance().clone();
        let span = Self::union_spans(&opening_span, &Self::span_from_token(&closing_token));
        Ok(self.make_expression(span, ExpressionKind::Block(expressions)))
    }

    fn parse_conditional(&mut self, if_span: SourceSpan) -> Result<Expression> {
        let condition = self.parse_expression()?;
        self.expect_keyword(Keyword::Then, "expected 'then' after condition")?;
        let consequent = self.parse_expression()?;
        self.expect_keyword(Keyword::Else, "expected 'else' in conditional")?;
        let alternative = self.parse_expression()?;
        let closing_token = self.peek().clone();
        self.expect_keyword(Keyword::Fi, "expected 'fi' to close conditional")?;
        let span = Self::union_spans(&if_span, &Self::span_from_token(&closing_token));
        Ok(self.make_expression(
            span,
            ExpressionKind::Conditional(ConditionalExpression {
                condition: Box::new(condition),
                consequent: Box::new(consequent),
                alternative: Box::new(alternative),
            }),
        ))
    }

    fn parse_loop(&mut self, while_span: SourceSpan) -> Result<Expression> {
        let condition = self.parse_expression()?;
        self.expect_keyword(Keyword::Loop, "expected 'loop' after loop condition")?;
        let body = self.parse_expression()?;
        let closing_token = self.peek().clone();
        self.expect_keyword(Keyword::Pool, "expected 'pool' to close loop")?;
        let span = Self::union_spans(&while_span, &Self::span_from_token(&closing_token));
        Ok(self.make_expression(
            span,
            ExpressionKind::Loop(LoopExpression {
                condition: Box::new(condition),
                body: Box::new(body),
            }),
        ))
    }

    fn parse_let(&mut self, let_span: SourceSpan) -> Result<Expression> {
        let mut bindings = Vec::new();
        loop {
            let name_token = self.peek().clone();
            self.expect_token(TokenKind::ObjectId, "expected binding name after 'let'")?;
            self.expect_token(TokenKind::Colon, "expected ':' after binding name")?;
            let type_name = self.expect_type_name("expected binding type")?;
            let initializer = if matches!(self.peek_kind(), TokenKind::Assign) {
                self.advance(); // consume '<-'
                Some(self.parse_expression()?)
            } else {
                None
            };
            bindings.push(LetBinding {
                name: name_token.lexeme.clone(),
                span: Self::span_from_token(&name_token),
                type_name,
                initializer,
            });

            if matches!(self.peek_kind(), TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect_keyword(Keyword::In, "expected 'in' after let bindings")?;
        let body = self.parse_expression()?;
        let span = Self::union_spans(&let_span, &body.span);
        Ok(self.make_expression(
            span,
            ExpressionKind::Let(LetExpression {
                bindings,
                body: Box::new(body),
            }),
        ))
    }

    fn parse_infix_expression(
        &mut self,
        left: Expression,
        precedence: Precedence,
    ) -> Result<Expression> {
        let operator_token = self.advance().clone();
        let operator = match binary_operator_from_token(&operator_token.kind) {
            Some(operator) => operator,
            None => bail!(
                "unexpected infix operator {:?} at line {}, column {}",
                operator_token.kind,
                operator_token.line,
                operator_token.column
            ),
        };
        let right = self.parse_expression_prec(precedence)?;
        let span = Self::union_spans(&left.span, &right.span);
        Ok(self.make_expression(
            span,
            ExpressionKind::Binary(BinaryExpression {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            }),
        ))
    }

    /// `receiver.method(args)` or `receiver@Type.method(args)`.
    fn finish_dispatch(&mut self, receiver: Expression) -> Result<Expression> {
        let static_type = if matches!(self.peek_kind(), TokenKind::At) {
            self.advance(); // consume '@'
            Some(self.expect_type_name("expected type name after '@'")?)
        } else {
            None
        };

        self.expect_token(TokenKind::Dot, "expected '.' before method name")?;
        let method_token = self.peek().clone();
        self.expect_token(TokenKind::ObjectId, "expected method name after '.'")?;
        let method = Identifier {
            name: method_token.lexeme.clone(),
            span: Self::span_from_token(&method_token),
        };
        let (arguments, closing_span) = self.parse_arguments()?;
        let span = Self::union_spans(&receiver.span, &closing_span);
        Ok(self.make_expression(
            span,
            ExpressionKind::Dispatch(DispatchExpression {
                receiver: Box::new(receiver),
                static_type,
                method,
                arguments,
            }),
        ))
    }

    fn parse_arguments(&mut self) -> Result<(Vec<Expression>, SourceSpan)> {
        self.expect_token(TokenKind::LParen, "expected '(' to start argument list")?;
        let mut arguments = Vec::new();
        if matches!(self.peek_kind(), TokenKind::RParen) {
            let closing_token = self.advance().clone();
            return Ok((arguments, Self::span_from_token(&closing_token)));
        }

        loop {
            arguments.push(self.parse_expression()?);
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    let closing_token = self.advance().clone();
                    return Ok((arguments, Self::span_from_token(&closing_token)));
                }
                _ => return self.syntax_error("expected ',' or ')' in argument list"),
            }
        }
    }

    fn expect_type_name(&mut self, message: &str) -> Result<TypeName> {
        let token = self.peek().clone();
        self.expect_token(TokenKind::TypeId, message)?;
        Ok(TypeName {
            span: Self::span_from_token(&token),
            name: token.lexeme,
        })
    }

    fn expect_keyword(&mut self, keyword: Keyword, message: &str) -> Result<()> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            self.syntax_error(message)
        }
    }

    fn expect_token(&mut self, expected: TokenKind, message: &str) -> Result<()> {
        if std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(&expected) {
            self.advance();
            Ok(())
        } else {
            self.syntax_error(message)
        }
    }

    /// Records a syntax diagnostic at the current token and aborts the parse.
    fn syntax_error<T>(&mut self, message: &str) -> Result<T> {
        let token = self.peek().clone();
        let found = if matches!(token.kind, TokenKind::Eof) {
            "end of input".to_string()
        } else {
            format!("'{}'", token.lexeme)
        };
        self.diagnostics.push_with_span(
            DiagnosticKind::Syntax,
            format!("{} (found {})", message, found),
            Some(Self::span_from_token(&token)),
        );
        bail!(
            "{} at line {}, column {} (found {})",
            message,
            token.line,
            token.column,
            found
        );
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(kw) if *kw == keyword)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.current].kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }
}

fn binary_operator_from_token(kind: &TokenKind) -> Option<BinaryOperator> {
    let operator = match kind {
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Minus => BinaryOperator::Subtract,
        TokenKind::Star => BinaryOperator::Multiply,
        TokenKind::Slash => BinaryOperator::Divide,
        TokenKind::Less => BinaryOperator::Less,
        TokenKind::LessEqual => BinaryOperator::LessEqual,
        TokenKind::Equal => BinaryOperator::Equal,
        _ => return None,
    };
    Some(operator)
}
