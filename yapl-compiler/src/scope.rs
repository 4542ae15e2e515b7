//! Lexical scopes and the symbols declared in them.
//!
//! Scopes live in an arena owned by [`ScopeTree`] and refer to each other by
//! [`ScopeId`]. Class scopes additionally carry an `inherits` link to the
//! parent class's scope; inherited members are found by following that link
//! at lookup time rather than by copying symbols down the hierarchy.

use std::collections::HashMap;

use log::trace;

use crate::ast::SourceSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Program,
    Class,
    Method,
    Let,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    ClassDef,
    FeatureDef,
    FormalDef,
    LetBinding,
}

impl SymbolKind {
    pub fn describe(self) -> &'static str {
        match self {
            SymbolKind::ClassDef => "class",
            SymbolKind::FeatureDef => "feature",
            SymbolKind::FormalDef => "formal parameter",
            SymbolKind::LetBinding => "let binding",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: String,
    pub kind: SymbolKind,
    pub scope: ScopeId,
    /// Readable origin such as `Main.main -> Int`, used in messages only.
    pub derivation: String,
    pub span: SourceSpan,
    /// Declared as `SELF_TYPE`; `ty` then holds the declaring class.
    pub self_typed: bool,
    /// Parameter scope of a method feature. Attributes have none.
    pub parameters: Option<ScopeId>,
}

impl Symbol {
    pub fn new(
        name: impl Into<String>,
        ty: impl Into<String>,
        kind: SymbolKind,
        derivation: impl Into<String>,
        span: SourceSpan,
    ) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            kind,
            scope: ScopeId(0),
            derivation: derivation.into(),
            span,
            self_typed: false,
            parameters: None,
        }
    }

    pub fn is_method(&self) -> bool {
        self.parameters.is_some()
    }

    pub fn self_typed(mut self, self_typed: bool) -> Self {
        self.self_typed = self_typed;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub owner_name: String,
    pub owner_type: String,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub inherits: Option<ScopeId>,
    symbols: Vec<Symbol>,
    index: HashMap<String, usize>,
}

impl Scope {
    fn new(
        id: ScopeId,
        kind: ScopeKind,
        owner_name: String,
        owner_type: String,
        parent: Option<ScopeId>,
    ) -> Self {
        Self {
            id,
            kind,
            owner_name,
            owner_type,
            parent,
            children: Vec::new(),
            inherits: None,
            symbols: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|position| &self.symbols[*position])
    }

    /// Symbols in declaration order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}

/// A method's parameter scope together with the symbol that declares it.
#[derive(Debug, Clone, Copy)]
pub struct MethodRef<'a> {
    pub scope: &'a Scope,
    pub symbol: &'a Symbol,
}

impl<'a> MethodRef<'a> {
    pub fn parameters(&self) -> &'a [Symbol] {
        self.scope.symbols()
    }

    pub fn return_type(&self) -> &'a str {
        &self.symbol.ty
    }
}

#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    current: ScopeId,
    class_scopes: HashMap<String, ScopeId>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> Self {
        let root = Scope::new(
            ScopeId(0),
            ScopeKind::Program,
            "program".to_string(),
            crate::types::OBJECT.to_string(),
            None,
        );
        Self {
            scopes: vec![root],
            current: ScopeId(0),
            class_scopes: HashMap::new(),
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn current(&self) -> ScopeId {
        self.current
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn current_scope(&self) -> &Scope {
        self.scope(self.current)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Creates a child of the current scope and makes it current.
    pub fn open_scope(&mut self, name: &str, ty: &str, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        let parent = self.current;
        self.scopes.push(Scope::new(
            id,
            kind,
            name.to_string(),
            ty.to_string(),
            Some(parent),
        ));
        self.scopes[parent.0].children.push(id);
        if kind == ScopeKind::Class {
            self.class_scopes.entry(name.to_string()).or_insert(id);
        }
        self.current = id;
        trace!("open {:?} scope '{}' ({:?})", kind, name, id);
        id
    }

    /// Makes an existing child of the current scope current again.
    pub fn enter_scope(&mut self, id: ScopeId) {
        debug_assert_eq!(self.scope(id).parent, Some(self.current));
        trace!("enter scope '{}' ({:?})", self.scope(id).owner_name, id);
        self.current = id;
    }

    /// Returns to the parent of the current scope. Closing the root is a no-op.
    pub fn close_scope(&mut self) {
        if let Some(parent) = self.current_scope().parent {
            trace!(
                "close scope '{}' ({:?})",
                self.current_scope().owner_name,
                self.current
            );
            self.current = parent;
        }
    }

    /// Declares into the current scope. A name already present there is kept
    /// and the new symbol rejected.
    pub fn declare(&mut self, mut symbol: Symbol) -> bool {
        let scope = &mut self.scopes[self.current.0];
        if scope.index.contains_key(&symbol.name) {
            return false;
        }
        symbol.scope = scope.id;
        scope.index.insert(symbol.name.clone(), scope.symbols.len());
        scope.symbols.push(symbol);
        true
    }

    /// Links the method symbol `name` of the current scope to its parameter scope.
    pub fn attach_parameters(&mut self, name: &str, parameters: ScopeId) {
        let scope = &mut self.scopes[self.current.0];
        if let Some(position) = scope.index.get(name) {
            scope.symbols[*position].parameters = Some(parameters);
        }
    }

    pub fn set_inherits(&mut self, class_scope: ScopeId, parent_scope: Option<ScopeId>) {
        self.scopes[class_scope.0].inherits = parent_scope;
    }

    /// Nearest declaration of `name` visible from the current scope.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.lookup_from(self.current, name)
    }

    pub fn lookup_from(&self, start: ScopeId, name: &str) -> Option<&Symbol> {
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            let scope = self.scope(id);
            if let Some(symbol) = scope.get(name) {
                return Some(symbol);
            }
            if scope.kind == ScopeKind::Class {
                if let Some(symbol) = self.lookup_inherited(scope, name) {
                    return Some(symbol);
                }
            }
            cursor = scope.parent;
        }
        None
    }

    fn lookup_inherited(&self, class_scope: &Scope, name: &str) -> Option<&Symbol> {
        self.inherited_chain(class_scope.id)
            .skip(1)
            .find_map(|scope| scope.get(name))
    }

    /// `class_scope` followed by the scopes of its ancestors.
    fn inherited_chain(&self, class_scope: ScopeId) -> impl Iterator<Item = &Scope> + '_ {
        let limit = self.class_scopes.len() + 1;
        std::iter::successors(Some(self.scope(class_scope)), move |scope| {
            scope.inherits.map(|id| self.scope(id))
        })
        .take(limit)
    }

    /// The class scope opened for `type_name`.
    pub fn lookup_scope(&self, type_name: &str) -> Option<ScopeId> {
        self.class_scopes.get(type_name).copied()
    }

    /// The method named `name` declared in `class_scope` itself.
    pub fn method_in(&self, class_scope: ScopeId, name: &str) -> Option<MethodRef<'_>> {
        let symbol = self.scope(class_scope).get(name)?;
        self.method_ref(symbol)
    }

    /// Resolves a method symbol to its parameter scope.
    pub fn method_ref<'a>(&'a self, symbol: &'a Symbol) -> Option<MethodRef<'a>> {
        if symbol.kind != SymbolKind::FeatureDef {
            return None;
        }
        let scope = self.scope(symbol.parameters?);
        Some(MethodRef { scope, symbol })
    }

    /// The method named `name` on `class_name` or its nearest ancestor.
    pub fn find_method(&self, class_name: &str, name: &str) -> Option<MethodRef<'_>> {
        let class_scope = self.lookup_scope(class_name)?;
        self.inherited_chain(class_scope)
            .find_map(|scope| self.method_in(scope.id, name))
    }

    /// Nearest class scope enclosing `id`, `id` included.
    pub fn enclosing_class(&self, id: ScopeId) -> Option<&Scope> {
        let mut cursor = Some(id);
        while let Some(scope_id) = cursor {
            let scope = self.scope(scope_id);
            if scope.kind == ScopeKind::Class {
                return Some(scope);
            }
            cursor = scope.parent;
        }
        None
    }

    /// Number of enclosing scopes between `id` and the root.
    pub fn depth(&self, id: ScopeId) -> usize {
        std::iter::successors(self.scope(id).parent, |parent| self.scope(*parent).parent).count()
    }
}
