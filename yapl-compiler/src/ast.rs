use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl SourceSpan {
    pub fn new(line: usize, column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    pub fn single_point(line: usize, column: usize) -> Self {
        Self::new(line, column, line, column)
    }

    pub fn union(a: &Self, b: &Self) -> Self {
        if a.line == 0 {
            return *b;
        }
        if b.line == 0 {
            return *a;
        }

        let (start_line, start_column) =
            if (a.line < b.line) || (a.line == b.line && a.column <= b.column) {
                (a.line, a.column)
            } else {
                (b.line, b.column)
            };

        let (end_line, end_column) = if (a.end_line > b.end_line)
            || (a.end_line == b.end_line && a.end_column >= b.end_column)
        {
            (a.end_line, a.end_column)
        } else {
            (b.end_line, b.end_column)
        };

        Self::new(start_line, start_column, end_line, end_column)
    }
}

impl Default for SourceSpan {
    fn default() -> Self {
        Self {
            line: 0,
            column: 0,
            end_line: 0,
            end_column: 0,
        }
    }
}

/// Stable identity of an expression node, assigned sequentially when the tree is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExprId(pub usize);

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub classes: Vec<ClassDeclaration>,
    /// Number of expression ids handed out while building this program.
    pub expression_count: usize,
}

impl Program {
    pub fn new(classes: Vec<ClassDeclaration>, expression_count: usize) -> Self {
        Self {
            classes,
            expression_count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassDeclaration {
    pub name: String,
    pub name_span: SourceSpan,
    pub parent: Option<TypeName>,
    pub features: Vec<Feature>,
    pub span: SourceSpan,
}

/// A type identifier as written in the source.
#[derive(Debug, Clone)]
pub struct TypeName {
    pub name: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum Feature {
    Method(MethodDeclaration),
    Attribute(AttributeDeclaration),
}

impl Feature {
    pub fn name(&self) -> &str {
        match self {
            Feature::Method(method) => &method.name,
            Feature::Attribute(attribute) => &attribute.name,
        }
    }

    pub fn span(&self) -> SourceSpan {
        match self {
            Feature::Method(method) => method.name_span,
            Feature::Attribute(attribute) => attribute.name_span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodDeclaration {
    pub name: String,
    pub name_span: SourceSpan,
    pub formals: Vec<Formal>,
    pub return_type: TypeName,
    pub body: Expression,
}

#[derive(Debug, Clone)]
pub struct AttributeDeclaration {
    pub name: String,
    pub name_span: SourceSpan,
    pub type_name: TypeName,
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct Formal {
    pub name: String,
    pub span: SourceSpan,
    pub type_name: TypeName,
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub id: ExprId,
    pub span: SourceSpan,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Let(LetExpression),
    Block(Vec<Expression>),
    Dispatch(DispatchExpression),
    Call(CallExpression),
    Assignment(AssignmentExpression),
    Binary(BinaryExpression),
    Grouping(Box<Expression>),
    SelfReference,
    Identifier(Identifier),
    New(TypeName),
    Unary(UnaryExpression),
    Conditional(ConditionalExpression),
    Loop(LoopExpression),
    Literal(Literal),
}

#[derive(Debug, Clone)]
pub struct LetExpression {
    pub bindings: Vec<LetBinding>,
    pub body: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct LetBinding {
    pub name: String,
    pub span: SourceSpan,
    pub type_name: TypeName,
    pub initializer: Option<Expression>,
}

/// `receiver.method(args)` or, with `static_type`, `receiver@Type.method(args)`.
#[derive(Debug, Clone)]
pub struct DispatchExpression {
    pub receiver: Box<Expression>,
    pub static_type: Option<TypeName>,
    pub method: Identifier,
    pub arguments: Vec<Expression>,
}

/// Unqualified `method(args)` call on `self`.
#[derive(Debug, Clone)]
pub struct CallExpression {
    pub method: Identifier,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub struct AssignmentExpression {
    pub target: Identifier,
    pub value: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Less,
    LessEqual,
    Equal,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Equal => "=",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
        )
    }
}

#[derive(Debug, Clone)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// `~e`
    Negate,
    /// `not e`
    Not,
    /// `isvoid e`
    IsVoid,
}

#[derive(Debug, Clone)]
pub struct ConditionalExpression {
    pub condition: Box<Expression>,
    pub consequent: Box<Expression>,
    pub alternative: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct LoopExpression {
    pub condition: Box<Expression>,
    pub body: Box<Expression>,
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum Literal {
    Integer(i64),
    String(String),
    Boolean(bool),
}

/// Hands out sequential [`ExprId`]s while a tree is being built.
#[derive(Debug, Default)]
pub struct ExprIdAllocator {
    next: usize,
}

impl ExprIdAllocator {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn make(&mut self, span: SourceSpan, kind: ExpressionKind) -> Expression {
        let id = ExprId(self.next);
        self.next += 1;
        Expression { id, span, kind }
    }

    pub fn allocated(&self) -> usize {
        self.next
    }
}
