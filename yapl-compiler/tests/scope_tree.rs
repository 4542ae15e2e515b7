use yapl_compiler::{ScopeKind, ScopeTree, SourceSpan, Symbol, SymbolKind};

fn symbol(name: &str, ty: &str, kind: SymbolKind) -> Symbol {
    Symbol::new(name, ty, kind, format!("test {name}"), SourceSpan::default())
}

#[test]
fn redeclaration_in_one_scope_keeps_the_original() {
    let mut tree = ScopeTree::new();
    tree.open_scope("A", "A", ScopeKind::Class);
    assert!(tree.declare(symbol("x", "Int", SymbolKind::FeatureDef)));
    assert!(!tree.declare(symbol("x", "String", SymbolKind::FeatureDef)));
    assert_eq!(tree.lookup("x").map(|s| s.ty.as_str()), Some("Int"));
    assert_eq!(tree.current_scope().symbols().len(), 1);
}

#[test]
fn inner_scopes_shadow_until_closed() {
    let mut tree = ScopeTree::new();
    let class_scope = tree.open_scope("A", "A", ScopeKind::Class);
    tree.declare(symbol("x", "Int", SymbolKind::FeatureDef));

    let let_scope = tree.open_scope("x", "String", ScopeKind::Let);
    tree.declare(symbol("x", "String", SymbolKind::LetBinding));
    assert_eq!(tree.lookup("x").map(|s| s.scope), Some(let_scope));
    assert_eq!(tree.lookup("x").map(|s| s.ty.as_str()), Some("String"));

    tree.close_scope();
    assert_eq!(tree.current(), class_scope);
    assert_eq!(tree.lookup("x").map(|s| s.ty.as_str()), Some("Int"));
}

#[test]
fn closing_the_root_is_a_no_op() {
    let mut tree = ScopeTree::new();
    tree.close_scope();
    assert_eq!(tree.current(), tree.root());
    assert_eq!(tree.len(), 1);
}

#[test]
fn class_scopes_delegate_to_inherited_scopes() {
    let mut tree = ScopeTree::new();
    let parent = tree.open_scope("A", "A", ScopeKind::Class);
    tree.declare(symbol("count", "Int", SymbolKind::FeatureDef));
    tree.close_scope();
    let child = tree.open_scope("B", "B", ScopeKind::Class);
    tree.close_scope();
    tree.set_inherits(child, Some(parent));

    assert!(tree.scope(child).get("count").is_none());
    tree.enter_scope(child);
    let found = tree.lookup("count").expect("inherited attribute should resolve");
    assert_eq!(found.scope, parent);
    tree.close_scope();
    assert_eq!(tree.current(), tree.root());
}

#[test]
fn find_method_walks_the_inherited_chain() {
    let mut tree = ScopeTree::new();
    let parent = tree.open_scope("A", "A", ScopeKind::Class);
    tree.declare(symbol("greet", "String", SymbolKind::FeatureDef));
    let parameters = tree.open_scope("greet", "String", ScopeKind::Method);
    tree.declare(symbol("name", "String", SymbolKind::FormalDef));
    tree.close_scope();
    tree.attach_parameters("greet", parameters);
    tree.declare(symbol("size", "Int", SymbolKind::FeatureDef));
    tree.close_scope();

    let child = tree.open_scope("B", "B", ScopeKind::Class);
    tree.close_scope();
    tree.set_inherits(child, Some(parent));

    let method = tree
        .find_method("B", "greet")
        .expect("inherited method should resolve");
    assert_eq!(method.return_type(), "String");
    assert_eq!(method.parameters().len(), 1);
    assert_eq!(method.parameters()[0].name, "name");
    assert_eq!(method.scope.id, parameters);

    assert!(tree.find_method("B", "size").is_none(), "attributes are not methods");
    assert!(tree.find_method("B", "missing").is_none());
    assert!(tree.find_method("Ghost", "greet").is_none());
}

#[test]
fn self_inheriting_scopes_terminate() {
    let mut tree = ScopeTree::new();
    let a = tree.open_scope("A", "A", ScopeKind::Class);
    tree.close_scope();
    tree.set_inherits(a, Some(a));
    assert!(tree.find_method("A", "anything").is_none());
    assert!(tree.lookup_from(a, "anything").is_none());
}

#[test]
fn enclosing_class_and_depth() {
    let mut tree = ScopeTree::new();
    tree.open_scope("A", "A", ScopeKind::Class);
    tree.open_scope("run", "Int", ScopeKind::Method);
    let inner = tree.open_scope("x", "Int", ScopeKind::Let);

    let class_scope = tree.enclosing_class(inner).expect("let is inside a class");
    assert_eq!(class_scope.owner_name, "A");
    assert_eq!(tree.depth(inner), 3);
    assert!(tree.enclosing_class(tree.root()).is_none());
    assert_eq!(tree.lookup_scope("A"), Some(class_scope.id));
}
