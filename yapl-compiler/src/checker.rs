//! Semantic analysis over a parsed [`Program`].
//!
//! Checking runs in two phases. The first registers every class, declares
//! its features and resolves parent links; the second re-enters the scopes
//! built by the first and checks feature bodies. Every expression node is
//! annotated at most once with its static type and whether it raised an
//! error itself.

use std::collections::HashMap;

use log::{debug, trace};
use serde::Serialize;

use crate::ast::*;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::scope::{MethodRef, ScopeId, ScopeKind, ScopeTree, Symbol, SymbolKind};
use crate::types::{TypeRegistry, BOOL, BUILTIN_CLASSES, INT, IO, MAIN, OBJECT, SELF_TYPE, STRING};

const SELF_NAME: &str = "self";

/// Owning class, method name, formals and return type.
type BuiltinMethod = (
    &'static str,
    &'static str,
    &'static [(&'static str, &'static str)],
    &'static str,
);

const BUILTIN_METHODS: &[BuiltinMethod] = &[
    (OBJECT, "abort", &[], OBJECT),
    (OBJECT, "type_name", &[], STRING),
    (OBJECT, "copy", &[], SELF_TYPE),
    (IO, "out_string", &[("x", STRING)], SELF_TYPE),
    (IO, "out_int", &[("x", INT)], SELF_TYPE),
    (IO, "in_string", &[], STRING),
    (IO, "in_int", &[], INT),
    (STRING, "length", &[], INT),
    (STRING, "concat", &[("s", STRING)], STRING),
    (STRING, "substr", &[("i", INT), ("l", INT)], STRING),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub span: SourceSpan,
    /// Static type, absent when the expression could not be resolved.
    pub ty: Option<String>,
    /// The node itself raised a diagnostic. Errors inside children do not propagate.
    pub has_error: bool,
}

impl Annotation {
    fn new(span: SourceSpan, ty: Option<String>, has_error: bool) -> Self {
        Self {
            span,
            ty,
            has_error,
        }
    }

    fn typed(span: SourceSpan, ty: &str) -> Self {
        Self::new(span, Some(ty.to_string()), false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Annotations {
    entries: HashMap<ExprId, Annotation>,
}

impl Annotations {
    pub fn get(&self, id: ExprId) -> Option<&Annotation> {
        self.entries.get(&id)
    }

    pub fn type_of(&self, id: ExprId) -> Option<&str> {
        self.get(id).and_then(|annotation| annotation.ty.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Annotations ordered by expression id.
    pub fn iter(&self) -> impl Iterator<Item = (ExprId, &Annotation)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(id, a)| (*id, a)).collect();
        entries.sort_by_key(|(id, _)| *id);
        entries.into_iter()
    }

    fn insert(&mut self, id: ExprId, annotation: Annotation) {
        self.entries.insert(id, annotation);
    }
}

/// Everything one checking run produced.
#[derive(Debug)]
pub struct Analysis {
    pub annotations: Annotations,
    pub diagnostics: Diagnostics,
    pub scopes: ScopeTree,
    pub types: TypeRegistry,
}

/// Scopes opened for one class during signature collection.
#[derive(Debug, Clone)]
struct ClassLayout {
    scope: ScopeId,
    /// Parameter scope per feature, `None` for attributes.
    methods: Vec<Option<ScopeId>>,
}

#[derive(Debug, Clone)]
struct MethodSignature {
    name: String,
    parameters: Vec<String>,
    return_type: String,
    self_typed: bool,
}

impl From<MethodRef<'_>> for MethodSignature {
    fn from(method: MethodRef<'_>) -> Self {
        Self {
            name: method.symbol.name.clone(),
            parameters: method
                .parameters()
                .iter()
                .map(|parameter| parameter.ty.clone())
                .collect(),
            return_type: method.return_type().to_string(),
            self_typed: method.symbol.self_typed,
        }
    }
}

pub struct SemanticChecker {
    types: TypeRegistry,
    scopes: ScopeTree,
    diagnostics: Diagnostics,
    annotations: Annotations,
    layouts: HashMap<usize, ClassLayout>,
}

impl Default for SemanticChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticChecker {
    pub fn new() -> Self {
        let mut checker = Self {
            types: TypeRegistry::with_builtins(),
            scopes: ScopeTree::new(),
            diagnostics: Diagnostics::new(),
            annotations: Annotations::default(),
            layouts: HashMap::new(),
        };
        checker.install_builtins();
        checker
    }

    pub fn check_program(&mut self, program: &Program) {
        debug!(
            "collecting signatures for {} class(es)",
            program.classes.len()
        );
        self.collect_signatures(program);
        self.resolve_inheritance(program);
        self.check_entry_point(program);

        for (index, class) in program.classes.iter().enumerate() {
            self.check_class(index, class);
        }
        debug!(
            "semantic analysis finished with {} diagnostic(s)",
            self.diagnostics.len()
        );
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    pub fn into_analysis(self) -> Analysis {
        Analysis {
            annotations: self.annotations,
            diagnostics: self.diagnostics,
            scopes: self.scopes,
            types: self.types,
        }
    }

    fn report_error(&mut self, kind: DiagnosticKind, message: impl Into<String>, span: SourceSpan) {
        self.diagnostics.push_with_span(kind, message, Some(span));
    }

    fn report_redeclaration(
        &mut self,
        kind: SymbolKind,
        name: &str,
        owner: &str,
        span: SourceSpan,
    ) {
        self.report_error(
            DiagnosticKind::DuplicateSymbol,
            format!("{} '{}' is already defined in {}", kind.describe(), name, owner),
            span,
        );
    }

    fn install_builtins(&mut self) {
        for class_name in BUILTIN_CLASSES {
            self.scopes.declare(Symbol::new(
                class_name,
                class_name,
                SymbolKind::ClassDef,
                format!("class {}", class_name),
                SourceSpan::default(),
            ));
            self.scopes
                .open_scope(class_name, class_name, ScopeKind::Class);
            for (owner, name, formals, return_type) in BUILTIN_METHODS {
                if *owner != class_name {
                    continue;
                }
                let formals = formals
                    .iter()
                    .map(|(formal, ty)| (*formal, *ty, SourceSpan::default()));
                self.declare_method(class_name, name, SourceSpan::default(), return_type, formals);
            }
            self.scopes.close_scope();
        }

        let object_scope = self.scopes.lookup_scope(OBJECT);
        for class_name in BUILTIN_CLASSES.iter().skip(1) {
            if let Some(scope) = self.scopes.lookup_scope(class_name) {
                self.scopes.set_inherits(scope, object_scope);
            }
        }
    }

    /// Declares a method symbol in the current class scope and opens a
    /// parameter scope holding its formals. The parameter scope is opened even
    /// when the method name is a duplicate so that its body can still be checked.
    fn declare_method<'f>(
        &mut self,
        class_name: &str,
        name: &str,
        span: SourceSpan,
        return_type: &str,
        formals: impl IntoIterator<Item = (&'f str, &'f str, SourceSpan)>,
    ) -> ScopeId {
        let (ty, self_typed) = resolve_self_type(return_type, class_name);
        let declared = self.scopes.declare(
            Symbol::new(
                name,
                ty.as_str(),
                SymbolKind::FeatureDef,
                format!("{}.{} -> {}", class_name, name, return_type),
                span,
            )
            .self_typed(self_typed),
        );
        if !declared {
            self.report_redeclaration(
                SymbolKind::FeatureDef,
                name,
                &format!("class '{}'", class_name),
                span,
            );
        }

        let parameters = self.scopes.open_scope(name, &ty, ScopeKind::Method);
        for (formal, formal_type, formal_span) in formals {
            let (formal_ty, formal_self_typed) = resolve_self_type(formal_type, class_name);
            let symbol = Symbol::new(
                formal,
                formal_ty,
                SymbolKind::FormalDef,
                format!("{}.{}({}: {})", class_name, name, formal, formal_type),
                formal_span,
            )
            .self_typed(formal_self_typed);
            if !self.scopes.declare(symbol) {
                self.report_redeclaration(
                    SymbolKind::FormalDef,
                    formal,
                    &format!("method '{}'", name),
                    formal_span,
                );
            }
        }
        self.scopes.close_scope();

        if declared {
            self.scopes.attach_parameters(name, parameters);
        }
        parameters
    }

    fn collect_signatures(&mut self, program: &Program) {
        for (index, class) in program.classes.iter().enumerate() {
            let parent = class.parent.as_ref().map(|parent| parent.name.as_str());
            if !self.types.register(&class.name, parent) {
                self.report_error(
                    DiagnosticKind::DuplicateClass,
                    format!("class '{}' is already defined", class.name),
                    class.name_span,
                );
                continue;
            }

            if class.name == MAIN {
                if let Some(parent) = &class.parent {
                    self.report_error(
                        DiagnosticKind::InvalidProgramEntry,
                        format!("class 'Main' must not inherit from '{}'", parent.name),
                        parent.span,
                    );
                }
            }

            self.scopes.declare(Symbol::new(
                class.name.as_str(),
                class.name.as_str(),
                SymbolKind::ClassDef,
                format!("class {}", class.name),
                class.name_span,
            ));
            let scope = self
                .scopes
                .open_scope(&class.name, &class.name, ScopeKind::Class);
            trace!("declaring features of class '{}'", class.name);

            let mut methods = Vec::with_capacity(class.features.len());
            for feature in &class.features {
                match feature {
                    Feature::Method(method) => {
                        let formals = method.formals.iter().map(|formal| {
                            (
                                formal.name.as_str(),
                                formal.type_name.name.as_str(),
                                formal.span,
                            )
                        });
                        let parameters = self.declare_method(
                            &class.name,
                            &method.name,
                            method.name_span,
                            &method.return_type.name,
                            formals,
                        );
                        methods.push(Some(parameters));
                    }
                    Feature::Attribute(attribute) => {
                        self.declare_attribute(&class.name, attribute);
                        methods.push(None);
                    }
                }
            }

            self.scopes.close_scope();
            self.layouts.insert(index, ClassLayout { scope, methods });
        }
    }

    fn declare_attribute(&mut self, class_name: &str, attribute: &AttributeDeclaration) {
        let (ty, self_typed) = resolve_self_type(&attribute.type_name.name, class_name);
        let symbol = Symbol::new(
            attribute.name.as_str(),
            ty,
            SymbolKind::FeatureDef,
            format!("{}.{}: {}", class_name, attribute.name, attribute.type_name.name),
            attribute.name_span,
        )
        .self_typed(self_typed);
        if !self.scopes.declare(symbol) {
            self.report_redeclaration(
                SymbolKind::FeatureDef,
                &attribute.name,
                &format!("class '{}'", class_name),
                attribute.name_span,
            );
        }
    }

    /// Links each class scope to its parent's scope. Unknown and cyclic
    /// parents are reported and replaced by the root class.
    fn resolve_inheritance(&mut self, program: &Program) {
        let object_scope = self.scopes.lookup_scope(OBJECT);

        for (index, class) in program.classes.iter().enumerate() {
            let Some(scope) = self.layouts.get(&index).map(|layout| layout.scope) else {
                continue;
            };
            let Some(parent) = &class.parent else {
                self.scopes.set_inherits(scope, object_scope);
                continue;
            };

            if !self.types.contains(&parent.name) {
                self.report_error(
                    DiagnosticKind::UnknownParentClass,
                    format!(
                        "class '{}' inherits from undefined class '{}'",
                        class.name, parent.name
                    ),
                    parent.span,
                );
                self.types.reparent(&class.name, OBJECT);
                self.scopes.set_inherits(scope, object_scope);
                continue;
            }

            let cyclic = self
                .types
                .ancestors(&class.name)
                .iter()
                .skip(1)
                .any(|ancestor| *ancestor == class.name);
            if cyclic {
                self.report_error(
                    DiagnosticKind::InheritanceCycle,
                    format!(
                        "class '{}' inherits from itself through '{}'",
                        class.name, parent.name
                    ),
                    parent.span,
                );
                self.types.reparent(&class.name, OBJECT);
                self.scopes.set_inherits(scope, object_scope);
                continue;
            }

            let parent_scope = self.scopes.lookup_scope(&parent.name);
            self.scopes.set_inherits(scope, parent_scope);
        }
    }

    fn check_entry_point(&mut self, program: &Program) {
        if self.types.contains(MAIN) {
            return;
        }
        let span = program
            .classes
            .first()
            .map(|class| class.name_span)
            .unwrap_or_default();
        self.report_error(
            DiagnosticKind::InvalidProgramEntry,
            "program does not define a 'Main' class",
            span,
        );
    }

    fn check_class(&mut self, index: usize, class: &ClassDeclaration) {
        let Some(layout) = self.layouts.get(&index).cloned() else {
            return;
        };
        debug!("checking class '{}'", class.name);
        self.scopes.enter_scope(layout.scope);

        for (feature, parameters) in class.features.iter().zip(layout.methods) {
            match (feature, parameters) {
                (Feature::Method(method), Some(parameters)) => {
                    self.check_method(&class.name, method, parameters)
                }
                (Feature::Attribute(attribute), _) => {
                    self.check_attribute(&class.name, attribute)
                }
                (Feature::Method(_), None) => {}
            }
        }

        self.scopes.close_scope();
    }

    fn check_method(&mut self, class_name: &str, method: &MethodDeclaration, parameters: ScopeId) {
        self.scopes.enter_scope(parameters);
        let body_type = self.check_expression(&method.body);
        self.scopes.close_scope();

        let (declared, _) = resolve_self_type(&method.return_type.name, class_name);
        if let Some(body_type) = body_type {
            if !self.conforms(&body_type, &declared) {
                self.report_error(
                    DiagnosticKind::TypeMismatch,
                    format!(
                        "method '{}' declares return type '{}' but its body has type '{}'",
                        method.name, method.return_type.name, body_type
                    ),
                    method.body.span,
                );
            }
        }
    }

    fn check_attribute(&mut self, class_name: &str, attribute: &AttributeDeclaration) {
        let Some(initializer) = &attribute.initializer else {
            return;
        };
        let (declared, _) = resolve_self_type(&attribute.type_name.name, class_name);
        if let Some(init_type) = self.check_expression(initializer) {
            if !self.conforms(&init_type, &declared) {
                self.report_error(
                    DiagnosticKind::TypeMismatch,
                    format!(
                        "attribute '{}' of type '{}' cannot be initialized with '{}'",
                        attribute.name, attribute.type_name.name, init_type
                    ),
                    initializer.span,
                );
            }
        }
    }

    /// Infers the static type of `expression`, reusing the annotation from an
    /// earlier visit of the same node.
    pub fn check_expression(&mut self, expression: &Expression) -> Option<String> {
        if let Some(annotation) = self.annotations.get(expression.id) {
            return annotation.ty.clone();
        }

        let span = expression.span;
        let annotation = match &expression.kind {
            ExpressionKind::Let(let_expr) => self.check_let(span, let_expr),
            ExpressionKind::Block(expressions) => {
                let mut ty = None;
                for inner in expressions {
                    ty = self.check_expression(inner);
                }
                Annotation::new(span, ty, false)
            }
            ExpressionKind::Dispatch(dispatch) => self.check_dispatch(span, dispatch),
            ExpressionKind::Call(call) => self.check_call(span, call),
            ExpressionKind::Assignment(assignment) => self.check_assignment(span, assignment),
            ExpressionKind::Binary(binary) => self.check_binary(span, binary),
            ExpressionKind::Grouping(inner) => {
                let ty = self.check_expression(inner);
                Annotation::new(span, ty, false)
            }
            ExpressionKind::SelfReference => {
                Annotation::new(span, Some(self.current_class()), false)
            }
            ExpressionKind::Identifier(identifier) => self.check_identifier(span, identifier),
            ExpressionKind::New(type_name) => {
                let (ty, _) = resolve_self_type(&type_name.name, &self.current_class());
                Annotation::new(span, Some(ty), false)
            }
            ExpressionKind::Unary(unary) => self.check_unary(span, unary),
            ExpressionKind::Conditional(conditional) => self.check_conditional(span, conditional),
            ExpressionKind::Loop(loop_expr) => {
                let has_error = self.check_condition(&loop_expr.condition, "while");
                self.check_expression(&loop_expr.body);
                Annotation::new(span, Some(OBJECT.to_string()), has_error)
            }
            ExpressionKind::Literal(literal) => match literal {
                Literal::Integer(_) => Annotation::typed(span, INT),
                Literal::String(_) => Annotation::typed(span, STRING),
                Literal::Boolean(_) => Annotation::typed(span, BOOL),
            },
        };

        trace!("{:?} : {:?}", expression.id, annotation.ty);
        let ty = annotation.ty.clone();
        self.annotations.insert(expression.id, annotation);
        ty
    }

    fn check_let(&mut self, span: SourceSpan, let_expr: &LetExpression) -> Annotation {
        let mut has_error = false;
        let mut opened = 0;

        for binding in &let_expr.bindings {
            let (declared, self_typed) =
                resolve_self_type(&binding.type_name.name, &self.current_class());
            if let Some(initializer) = &binding.initializer {
                if let Some(init_type) = self.check_expression(initializer) {
                    if !self.conforms(&init_type, &declared) {
                        self.report_error(
                            DiagnosticKind::TypeMismatch,
                            format!(
                                "let binding '{}' of type '{}' cannot be initialized with '{}'",
                                binding.name, binding.type_name.name, init_type
                            ),
                            initializer.span,
                        );
                        has_error = true;
                    }
                }
            }

            // `self` is bound implicitly in every class and cannot be rebound.
            if binding.name == SELF_NAME {
                self.report_redeclaration(
                    SymbolKind::LetBinding,
                    &binding.name,
                    &format!("class '{}'", self.current_class()),
                    binding.span,
                );
                has_error = true;
                continue;
            }

            self.scopes
                .open_scope(&binding.name, &declared, ScopeKind::Let);
            opened += 1;
            self.scopes.declare(
                Symbol::new(
                    binding.name.as_str(),
                    declared.as_str(),
                    SymbolKind::LetBinding,
                    format!("let {}: {}", binding.name, binding.type_name.name),
                    binding.span,
                )
                .self_typed(self_typed),
            );
        }

        let body_type = self.check_expression(&let_expr.body);
        for _ in 0..opened {
            self.scopes.close_scope();
        }
        Annotation::new(span, body_type, has_error)
    }

    fn check_dispatch(&mut self, span: SourceSpan, dispatch: &DispatchExpression) -> Annotation {
        let receiver_type = self.check_expression(&dispatch.receiver);
        let argument_types = self.check_arguments(&dispatch.arguments);
        let Some(receiver_type) = receiver_type else {
            return Annotation::new(span, None, false);
        };

        let mut has_error = false;
        let lookup_class = match &dispatch.static_type {
            Some(static_type) => {
                if !self.types.is_inherited_from(&receiver_type, &static_type.name) {
                    self.report_error(
                        DiagnosticKind::StaticDispatchViolation,
                        format!(
                            "static dispatch type '{}' is not an ancestor of '{}'",
                            static_type.name, receiver_type
                        ),
                        static_type.span,
                    );
                    has_error = true;
                }
                static_type.name.clone()
            }
            None => receiver_type.clone(),
        };

        let signature = self
            .scopes
            .find_method(&lookup_class, &dispatch.method.name)
            .map(MethodSignature::from);
        let Some(signature) = signature else {
            self.report_error(
                DiagnosticKind::UndefinedMethod,
                format!(
                    "method '{}' is not defined for type '{}'",
                    dispatch.method.name, lookup_class
                ),
                dispatch.method.span,
            );
            return Annotation::new(span, None, true);
        };

        let mut annotation = self.apply_signature(
            span,
            &signature,
            &receiver_type,
            &dispatch.arguments,
            &argument_types,
        );
        annotation.has_error |= has_error;
        annotation
    }

    fn check_call(&mut self, span: SourceSpan, call: &CallExpression) -> Annotation {
        let argument_types = self.check_arguments(&call.arguments);
        let receiver_type = self.current_class();

        let signature = self
            .scopes
            .lookup(&call.method.name)
            .and_then(|symbol| self.scopes.method_ref(symbol))
            .map(MethodSignature::from);
        let Some(signature) = signature else {
            self.report_error(
                DiagnosticKind::UndefinedMethod,
                format!(
                    "method '{}' is not defined for type '{}'",
                    call.method.name, receiver_type
                ),
                call.method.span,
            );
            return Annotation::new(span, None, true);
        };

        self.apply_signature(span, &signature, &receiver_type, &call.arguments, &argument_types)
    }

    fn check_arguments(&mut self, arguments: &[Expression]) -> Vec<Option<String>> {
        arguments
            .iter()
            .map(|argument| self.check_expression(argument))
            .collect()
    }

    /// Validates arguments against `signature` and yields the call's type.
    fn apply_signature(
        &mut self,
        span: SourceSpan,
        signature: &MethodSignature,
        receiver_type: &str,
        arguments: &[Expression],
        argument_types: &[Option<String>],
    ) -> Annotation {
        let mut has_error = false;

        if signature.parameters.len() != arguments.len() {
            self.report_error(
                DiagnosticKind::ArityMismatch,
                format!(
                    "method '{}' expects {} argument(s) but {} were given",
                    signature.name,
                    signature.parameters.len(),
                    arguments.len()
                ),
                span,
            );
            has_error = true;
        } else {
            for ((argument, argument_type), parameter) in arguments
                .iter()
                .zip(argument_types)
                .zip(&signature.parameters)
            {
                let Some(argument_type) = argument_type else {
                    continue;
                };
                if !self.conforms(argument_type, parameter) {
                    self.report_error(
                        DiagnosticKind::TypeMismatch,
                        format!(
                            "argument of method '{}' expects '{}' but found '{}'",
                            signature.name, parameter, argument_type
                        ),
                        argument.span,
                    );
                    has_error = true;
                }
            }
        }

        let ty = if signature.self_typed {
            receiver_type.to_string()
        } else {
            signature.return_type.clone()
        };
        Annotation::new(span, Some(ty), has_error)
    }

    fn check_assignment(
        &mut self,
        span: SourceSpan,
        assignment: &AssignmentExpression,
    ) -> Annotation {
        let value_type = self.check_expression(&assignment.value);
        let target_type = self
            .scopes
            .lookup(&assignment.target.name)
            .filter(|symbol| !symbol.is_method())
            .map(|symbol| symbol.ty.clone());

        let Some(target_type) = target_type else {
            self.report_error(
                DiagnosticKind::UndefinedSymbol,
                format!("'{}' is not defined", assignment.target.name),
                assignment.target.span,
            );
            return Annotation::new(span, value_type, true);
        };

        let mut has_error = false;
        if let Some(value) = &value_type {
            if !self.conforms(value, &target_type) {
                self.report_error(
                    DiagnosticKind::TypeMismatch,
                    format!(
                        "cannot assign '{}' to '{}' of type '{}'",
                        value, assignment.target.name, target_type
                    ),
                    assignment.value.span,
                );
                has_error = true;
            }
        }
        Annotation::new(span, value_type, has_error)
    }

    fn check_binary(&mut self, span: SourceSpan, binary: &BinaryExpression) -> Annotation {
        let left = self.check_expression(&binary.left);
        let right = self.check_expression(&binary.right);

        if binary.operator.is_arithmetic() {
            let mut has_error = false;
            if let (Some(left), Some(right)) = (&left, &right) {
                if !self.arithmetic_operands(left, right) {
                    self.report_error(
                        DiagnosticKind::TypeMismatch,
                        format!(
                            "operator '{}' cannot be applied to '{}' and '{}'",
                            binary.operator.symbol(),
                            left,
                            right
                        ),
                        span,
                    );
                    has_error = true;
                }
            }
            return Annotation::new(span, Some(INT.to_string()), has_error);
        }

        let (Some(left), Some(right)) = (left, right) else {
            return Annotation::typed(span, BOOL);
        };
        match self.types.can_compare(&left, &right) {
            Ok(result) => Annotation::typed(span, result),
            Err(offending) => {
                self.report_error(
                    DiagnosticKind::IncomparableTypes,
                    format!(
                        "operator '{}' cannot compare '{}' with '{}'",
                        binary.operator.symbol(),
                        offending,
                        right
                    ),
                    span,
                );
                Annotation::new(span, Some(OBJECT.to_string()), true)
            }
        }
    }

    /// Both operands `Int`, after coercing at most one `Bool` operand, left first.
    fn arithmetic_operands(&self, left: &str, right: &str) -> bool {
        if self.types.is_numeric_pair(left, right) {
            return true;
        }
        if left == BOOL {
            return self.types.is_numeric_pair(INT, right);
        }
        if right == BOOL {
            return self.types.is_numeric_pair(left, INT);
        }
        false
    }

    fn check_identifier(&mut self, span: SourceSpan, identifier: &Identifier) -> Annotation {
        let ty = self
            .scopes
            .lookup(&identifier.name)
            .filter(|symbol| !symbol.is_method())
            .map(|symbol| symbol.ty.clone());
        if ty.is_none() {
            self.report_error(
                DiagnosticKind::UndefinedSymbol,
                format!("'{}' is not defined", identifier.name),
                identifier.span,
            );
            return Annotation::new(span, None, true);
        }
        Annotation::new(span, ty, false)
    }

    fn check_unary(&mut self, span: SourceSpan, unary: &UnaryExpression) -> Annotation {
        let operand = self.check_expression(&unary.operand);
        let (expected, result, symbol) = match unary.operator {
            UnaryOperator::IsVoid => return Annotation::typed(span, BOOL),
            UnaryOperator::Negate => (INT, INT, "~"),
            UnaryOperator::Not => (BOOL, BOOL, "not"),
        };

        let mut has_error = false;
        if let Some(operand) = operand {
            if operand != expected && operand != OBJECT {
                self.report_error(
                    DiagnosticKind::InvalidOperandType,
                    format!(
                        "operator '{}' expects '{}' but found '{}'",
                        symbol, expected, operand
                    ),
                    unary.operand.span,
                );
                has_error = true;
            }
        }
        Annotation::new(span, Some(result.to_string()), has_error)
    }

    fn check_conditional(
        &mut self,
        span: SourceSpan,
        conditional: &ConditionalExpression,
    ) -> Annotation {
        let has_error = self.check_condition(&conditional.condition, "if");
        let consequent = self.check_expression(&conditional.consequent);
        let alternative = self.check_expression(&conditional.alternative);

        let ty = match (consequent, alternative) {
            (Some(consequent), Some(alternative)) => {
                Some(self.types.least_upper_bound(&consequent, &alternative))
            }
            (Some(only), None) | (None, Some(only)) => Some(only),
            (None, None) => None,
        };
        Annotation::new(span, ty, has_error)
    }

    /// Conditions accept `Bool`, `Object`, or `Int` coerced to `Bool`.
    fn check_condition(&mut self, condition: &Expression, keyword: &str) -> bool {
        let Some(ty) = self.check_expression(condition) else {
            return false;
        };
        if ty == BOOL || ty == OBJECT || ty == INT {
            return false;
        }
        self.report_error(
            DiagnosticKind::InvalidOperandType,
            format!("'{}' condition must be 'Bool' but found '{}'", keyword, ty),
            condition.span,
        );
        true
    }

    /// `actual` may stand where `expected` is required. Everything conforms
    /// to the root class, registered or not.
    fn conforms(&self, actual: &str, expected: &str) -> bool {
        expected == OBJECT || self.types.is_subtype(actual, expected)
    }

    fn current_class(&self) -> String {
        self.scopes
            .enclosing_class(self.scopes.current())
            .map(|scope| scope.owner_type.clone())
            .unwrap_or_else(|| OBJECT.to_string())
    }
}

/// `SELF_TYPE` stands for the enclosing class; the flag records that it was written.
fn resolve_self_type(type_name: &str, class_name: &str) -> (String, bool) {
    if type_name == SELF_TYPE {
        (class_name.to_string(), true)
    } else {
        (type_name.to_string(), false)
    }
}

/// Runs a full check of `program` with a fresh checker.
pub fn analyze(program: &Program) -> Analysis {
    let mut checker = SemanticChecker::new();
    checker.check_program(program);
    checker.into_analysis()
}
