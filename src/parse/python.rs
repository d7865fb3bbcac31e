// src/parse/python.rs
//! Python parsing via tree-sitter.
//!
//! A pre-pass collects the module's top-level functions, classes, methods
//! and imports. The main walk then emits the keyword stream in source order
//! and records, per routine, the slice of the stream it covers together with
//! its callees, referenced classes and imports.

use super::closure;
use super::types::{ClassBase, ClassDef, CodeFile, ImportDep, Routine};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tree_sitter::{Node, Parser};

pub const LANGUAGE: &str = "python";

/// Parses Python source into a `CodeFile`.
#[must_use]
pub fn parse(source: &str) -> CodeFile {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&tree_sitter_python::LANGUAGE.into()) {
        return CodeFile::failed(LANGUAGE, format!("grammar unavailable: {e}"));
    }
    let Some(tree) = parser.parse(source, None) else {
        return CodeFile::failed(LANGUAGE, "parser produced no tree");
    };

    let root = tree.root_node();
    let src = source.as_bytes();
    if root.has_error() {
        return CodeFile::failed(LANGUAGE, describe_error(root));
    }

    let defs = Definitions::collect(root, src);
    let mut walker = Walker::new(src, &defs);
    walker.visit(root);
    let mut file = walker.finish();

    if let Err(e) = closure::resolve_all(&mut file.routines, &file.classes) {
        tracing::warn!(error = %e, "dependency closure failed");
        return CodeFile::failed(LANGUAGE, e.to_string());
    }
    file
}

fn describe_error(root: Node) -> String {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            let what = if node.is_missing() { "missing token" } else { "syntax error" };
            return format!("{what} at line {}, column {}", pos.row + 1, pos.column + 1);
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(
            children
                .into_iter()
                .rev()
                .filter(|c| c.has_error() || c.is_missing()),
        );
    }
    "syntax error".to_string()
}

fn text<'a>(node: Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

fn children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Unwraps `decorated_definition` to the function or class it decorates.
fn definition(node: Node) -> Node {
    if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition").unwrap_or(node)
    } else {
        node
    }
}

/// Names defined at module level.
#[derive(Debug, Default)]
struct Definitions {
    functions: HashSet<String>,
    classes: HashSet<String>,
    methods: HashMap<String, HashSet<String>>,
    /// (bound name, import) for every module-level import.
    imports: Vec<(String, ImportDep)>,
}

impl Definitions {
    fn collect(root: Node, src: &[u8]) -> Self {
        let mut defs = Self::default();
        for child in children(root) {
            let node = definition(child);
            match node.kind() {
                "function_definition" => {
                    if let Some(name) = node.child_by_field_name("name") {
                        defs.functions.insert(text(name, src).to_string());
                    }
                }
                "class_definition" => defs.collect_class(node, src),
                "import_statement" | "import_from_statement" => {
                    defs.imports.extend(import_bindings(node, src));
                }
                _ => {}
            }
        }
        defs
    }

    fn collect_class(&mut self, node: Node, src: &[u8]) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let class = text(name, src).to_string();
        let mut methods = HashSet::new();
        if let Some(body) = node.child_by_field_name("body") {
            for stmt in children(body) {
                let def = definition(stmt);
                if def.kind() == "function_definition" {
                    if let Some(m) = def.child_by_field_name("name") {
                        methods.insert(text(m, src).to_string());
                    }
                }
            }
        }
        self.classes.insert(class.clone());
        self.methods.insert(class, methods);
    }

    fn has_method(&self, class: &str, method: &str) -> bool {
        self.methods.get(class).is_some_and(|m| m.contains(method))
    }
}

/// Bindings introduced by an import statement as `(bound name, import)`.
fn import_bindings(node: Node, src: &[u8]) -> Vec<(String, ImportDep)> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    if node.kind() == "import_from_statement" {
        let module = node
            .child_by_field_name("module_name")
            .map(|m| text(m, src).to_string())
            .unwrap_or_default();
        if children(node).iter().any(|c| c.kind() == "wildcard_import") {
            out.push((
                "*".to_string(),
                ImportDep {
                    module,
                    name: Some("*".to_string()),
                },
            ));
            return out;
        }
        for name in node.children_by_field_name("name", &mut cursor) {
            let (imported, bound) = aliased(name, src);
            out.push((
                bound,
                ImportDep {
                    module: module.clone(),
                    name: Some(imported),
                },
            ));
        }
    } else {
        for name in node.children_by_field_name("name", &mut cursor) {
            let (module, bound) = aliased(name, src);
            let bound = if name.kind() == "aliased_import" {
                bound
            } else {
                module.split('.').next().unwrap_or(&module).to_string()
            };
            out.push((bound, ImportDep { module, name: None }));
        }
    }
    out
}

/// `(original, bound)` for `dotted_name` or `aliased_import`.
fn aliased(node: Node, src: &[u8]) -> (String, String) {
    if node.kind() == "aliased_import" {
        let original = node
            .child_by_field_name("name")
            .map(|n| text(n, src).to_string())
            .unwrap_or_default();
        let alias = node
            .child_by_field_name("alias")
            .map_or_else(|| original.clone(), |a| text(a, src).to_string());
        (original, alias)
    } else {
        let t = text(node, src).to_string();
        (t.clone(), t)
    }
}

/// Docstring of a function or class body, quotes removed.
fn docstring(node: Node, src: &[u8]) -> String {
    let Some(body) = node.child_by_field_name("body") else {
        return String::new();
    };
    let mut cursor = body.walk();
    let Some(first) = body.named_children(&mut cursor).next() else {
        return String::new();
    };
    if first.kind() != "expression_statement" {
        return String::new();
    }
    let mut inner = first.walk();
    let doc = match first.named_children(&mut inner).next() {
        Some(s) if s.kind() == "string" => strip_quotes(text(s, src)),
        _ => String::new(),
    };
    doc
}

fn strip_quotes(raw: &str) -> String {
    let body = raw.trim_start_matches(|c: char| "rRbBuUfF".contains(c));
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = body.strip_prefix(quote).and_then(|b| b.strip_suffix(quote)) {
            return inner.trim().to_string();
        }
    }
    body.trim().to_string()
}

struct ClassFrame {
    name: String,
    methods: Vec<String>,
}

struct Walker<'a> {
    src: &'a [u8],
    defs: &'a Definitions,
    keywords: Vec<String>,
    routines: BTreeMap<String, Routine>,
    classes: BTreeMap<String, ClassDef>,
    current: Option<Routine>,
    class: Option<ClassFrame>,
    /// Depth of classes nested inside the current class.
    nested: usize,
}

impl<'a> Walker<'a> {
    fn new(src: &'a [u8], defs: &'a Definitions) -> Self {
        Self {
            src,
            defs,
            keywords: Vec::new(),
            routines: BTreeMap::new(),
            classes: BTreeMap::new(),
            current: None,
            class: None,
            nested: 0,
        }
    }

    fn finish(self) -> CodeFile {
        CodeFile {
            language: LANGUAGE.to_string(),
            keywords: self.keywords,
            routines: self.routines,
            classes: self.classes,
            parse_error: None,
        }
    }

    fn emit(&mut self, token: &str) {
        self.keywords.push(token.to_string());
    }

    fn visit(&mut self, node: Node) {
        match node.kind() {
            "function_definition" if self.current.is_none() && self.nested == 0 => {
                self.visit_routine(node);
            }
            "class_definition" if self.current.is_none() && self.class.is_none() => {
                self.visit_class(node);
            }
            "class_definition" if self.current.is_none() => {
                self.nested += 1;
                self.visit_except_name(node);
                self.nested -= 1;
            }
            "function_definition" | "class_definition" => self.visit_except_name(node),
            "for_statement" | "for_in_clause" => self.keyword_then_children("for", node),
            "while_statement" => self.keyword_then_children("while", node),
            "if_statement" | "elif_clause" | "if_clause" => self.keyword_then_children("if", node),
            "else_clause" => self.keyword_then_children("else", node),
            "not_operator" => self.keyword_then_children("not", node),
            "break_statement" => self.emit("break"),
            "continue_statement" => self.emit("continue"),
            "try_statement" => self.keyword_then_children("try_except", node),
            "boolean_operator" => {
                let op = node
                    .child_by_field_name("operator")
                    .map_or("", |o| text(o, self.src));
                if op == "and" || op == "or" {
                    self.emit(op);
                }
                self.visit_children(node);
            }
            "import_statement" => self.visit_import("import", node),
            "import_from_statement" => self.visit_import("import_from", node),
            "call" => self.visit_call(node),
            "attribute" => {
                if let Some(object) = node.child_by_field_name("object") {
                    self.visit(object);
                }
            }
            "keyword_argument" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.visit(value);
                }
            }
            "parameters" | "lambda_parameters" => self.visit_defaults(node),
            "identifier" => self.visit_identifier(node),
            "string" | "concatenated_string" | "comment" => {}
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: Node) {
        for child in children(node) {
            self.visit(child);
        }
    }

    fn visit_except_name(&mut self, node: Node) {
        let name_id = node.child_by_field_name("name").map(|n| n.id());
        for child in children(node) {
            if Some(child.id()) != name_id {
                self.visit(child);
            }
        }
    }

    fn keyword_then_children(&mut self, keyword: &str, node: Node) {
        self.emit(keyword);
        self.visit_children(node);
    }

    fn visit_defaults(&mut self, node: Node) {
        for param in children(node) {
            if matches!(param.kind(), "default_parameter" | "typed_default_parameter") {
                if let Some(value) = param.child_by_field_name("value") {
                    self.visit(value);
                }
            }
        }
    }

    fn visit_routine(&mut self, node: Node) {
        let src = self.src;
        let name = node
            .child_by_field_name("name")
            .map_or("", |n| text(n, src))
            .to_string();
        let qualified = match &self.class {
            Some(frame) => format!("{}.{name}", frame.name),
            None => name,
        };
        let start = self.keywords.len();
        self.current = Some(Routine {
            name: qualified.clone(),
            first_line: node.start_position().row,
            last_line: node.end_position().row,
            docstring: docstring(node, src),
            span: start..start,
            keywords: Vec::new(),
            callees: BTreeSet::new(),
            local_callees: BTreeSet::new(),
            classes: BTreeSet::new(),
            imports: Vec::new(),
            dependencies: BTreeSet::new(),
            class_dependencies: BTreeSet::new(),
        });

        self.visit_except_name(node);

        let end = self.keywords.len();
        if let Some(mut routine) = self.current.take() {
            routine.span = start..end;
            routine.keywords = self.keywords[start..end].to_vec();
            routine.imports.sort();
            routine.imports.dedup();
            if let Some(frame) = self.class.as_mut() {
                frame.methods.push(qualified.clone());
            }
            self.routines.insert(qualified, routine);
        }
    }

    fn visit_class(&mut self, node: Node) {
        let src = self.src;
        let name = node
            .child_by_field_name("name")
            .map_or("", |n| text(n, src))
            .to_string();
        let base = node
            .child_by_field_name("superclasses")
            .and_then(|args| {
                let mut cursor = args.walk();
                let first = args
                    .named_children(&mut cursor)
                    .find(|a| matches!(a.kind(), "identifier" | "attribute"));
                first.map(|b| ClassBase::Named(text(b, src).to_string()))
            })
            .unwrap_or(ClassBase::Classic);

        let start = self.keywords.len();
        self.class = Some(ClassFrame {
            name: name.clone(),
            methods: Vec::new(),
        });
        self.visit_except_name(node);
        let end = self.keywords.len();
        let methods = self.class.take().map(|f| f.methods).unwrap_or_default();

        self.classes.insert(
            name.clone(),
            ClassDef {
                name,
                base,
                first_line: node.start_position().row,
                last_line: node.end_position().row,
                docstring: docstring(node, src),
                methods,
                span: start..end,
                keywords: self.keywords[start..end].to_vec(),
            },
        );
    }

    fn visit_import(&mut self, keyword: &str, node: Node) {
        self.emit(keyword);
        if let Some(routine) = self.current.as_mut() {
            routine
                .imports
                .extend(import_bindings(node, self.src).into_iter().map(|(_, dep)| dep));
        }
    }

    fn visit_call(&mut self, node: Node) {
        let src = self.src;
        if let Some(function) = node.child_by_field_name("function") {
            match function.kind() {
                "identifier" => {
                    let name = text(function, src);
                    self.emit(name);
                    self.note_call(name, None);
                    self.note_import(name);
                }
                "attribute" => {
                    let attr = function
                        .child_by_field_name("attribute")
                        .map_or("", |a| text(a, src));
                    let object = function.child_by_field_name("object");
                    let receiver = object
                        .filter(|o| o.kind() == "identifier")
                        .map(|o| text(o, src));
                    if let Some(object) = object {
                        self.visit(object);
                    }
                    self.emit(attr);
                    self.note_call(attr, receiver);
                }
                _ => self.visit(function),
            }
        }
        if let Some(arguments) = node.child_by_field_name("arguments") {
            self.visit(arguments);
        }
    }

    fn note_call(&mut self, name: &str, receiver: Option<&str>) {
        let defs = self.defs;
        let class = self.class.as_ref().map(|f| f.name.as_str());
        let Some(routine) = self.current.as_mut() else {
            return;
        };
        routine.callees.insert(name.to_string());
        match receiver {
            None => {
                if defs.functions.contains(name) {
                    routine.local_callees.insert(name.to_string());
                }
                if defs.classes.contains(name) {
                    routine.classes.insert(name.to_string());
                }
            }
            Some("self" | "cls") => {
                if let Some(class) = class.filter(|c| defs.has_method(c, name)) {
                    routine.local_callees.insert(format!("{class}.{name}"));
                }
            }
            Some(object) if defs.classes.contains(object) => {
                routine.classes.insert(object.to_string());
                if defs.has_method(object, name) {
                    routine.local_callees.insert(format!("{object}.{name}"));
                }
            }
            Some(_) => {}
        }
    }

    fn visit_identifier(&mut self, node: Node) {
        let defs = self.defs;
        let name = text(node, self.src);
        let is_function = defs.functions.contains(name);
        let is_class = defs.classes.contains(name);
        if is_function || is_class {
            self.emit(name);
        }
        let Some(routine) = self.current.as_mut() else {
            return;
        };
        if is_function {
            routine.local_callees.insert(name.to_string());
        }
        if is_class {
            routine.classes.insert(name.to_string());
        }
        self.note_import(name);
    }

    /// Records module-level imports bound to `name` on the current routine.
    fn note_import(&mut self, name: &str) {
        let defs = self.defs;
        let Some(routine) = self.current.as_mut() else {
            return;
        };
        for (bound, dep) in &defs.imports {
            if bound == name {
                routine.imports.push(dep.clone());
            }
        }
    }
}
