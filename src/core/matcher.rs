//! Pattern matching over a parsed Python syntax tree.
//!
//! [`Matches`] walks the tree depth-first in document order. Import
//! statements feed a per-file binding table (local name to qualified name)
//! and yield framework findings; call expressions are named, resolved one
//! hop through the bindings and checked against the registry.

use std::collections::{BTreeMap, HashMap, VecDeque};
use tree_sitter::Node as TSNode;

use super::finding::{Finding, Location};
use super::literal::{resolve_literal, LiteralValue};
use super::signatures::{Category, FrameworkSignature, Signature, SignatureRegistry};
use super::versions::VersionLookup;
use crate::parsers::common::extract_text;
use crate::parsers::ParsedSource;

/// Placeholder stored for redacted arguments.
pub const REDACTED: &str = "redacted";

pub struct PatternMatcher<'r> {
    registry: &'r SignatureRegistry,
    include_prompts: bool,
    versions: Option<&'r dyn VersionLookup>,
}

impl<'r> PatternMatcher<'r> {
    pub fn new(registry: &'r SignatureRegistry) -> Self {
        Self {
            registry,
            include_prompts: false,
            versions: None,
        }
    }

    /// Keep redacted argument values (prompt templates) verbatim.
    pub fn include_prompts(mut self, include: bool) -> Self {
        self.include_prompts = include;
        self
    }

    pub fn with_versions(mut self, versions: &'r dyn VersionLookup) -> Self {
        self.versions = Some(versions);
        self
    }

    pub fn registry(&self) -> &'r SignatureRegistry {
        self.registry
    }

    /// Lazily match one parsed file. `file` is the path recorded in
    /// locations.
    pub fn matches<'a>(&'a self, parsed: &'a ParsedSource, file: &str) -> Matches<'a, 'r> {
        Matches {
            matcher: self,
            source: parsed.source_bytes(),
            file: file.to_string(),
            stack: vec![parsed.tree.root_node()],
            pending: VecDeque::new(),
            bindings: HashMap::new(),
        }
    }
}

/// Iterator over the findings of a single file.
pub struct Matches<'a, 'r> {
    matcher: &'a PatternMatcher<'r>,
    source: &'a [u8],
    file: String,
    stack: Vec<TSNode<'a>>,
    pending: VecDeque<Finding>,
    bindings: HashMap<String, String>,
}

impl<'a, 'r> Iterator for Matches<'a, 'r> {
    type Item = Finding;

    fn next(&mut self) -> Option<Finding> {
        loop {
            if let Some(finding) = self.pending.pop_front() {
                return Some(finding);
            }
            let node = self.stack.pop()?;
            self.visit(node);
        }
    }
}

impl<'a, 'r> Matches<'a, 'r> {
    fn visit(&mut self, node: TSNode<'a>) {
        match node.kind() {
            "import_statement" => {
                self.visit_import(&node);
                return;
            }
            "import_from_statement" => {
                self.visit_import_from(&node);
                return;
            }
            "call" => self.visit_call(&node),
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<TSNode<'a>> = node.named_children(&mut cursor).collect();
        self.stack.extend(children.into_iter().rev());
    }

    fn text(&self, node: &TSNode) -> &'a str {
        extract_text(node, self.source)
    }

    fn location(&self, node: &TSNode) -> Location {
        let position = node.start_position();
        Location::new(self.file.clone(), position.row + 1, position.column + 1)
    }

    /// `import a.b` binds `a`; `import a.b as c` binds `c` to `a.b`.
    fn visit_import(&mut self, node: &TSNode<'a>) {
        let mut modules: Vec<&'a str> = Vec::new();
        let mut cursor = node.walk();
        let children: Vec<TSNode<'a>> = node.named_children(&mut cursor).collect();
        for child in children {
            match child.kind() {
                "dotted_name" => {
                    let module = self.text(&child);
                    let root = root_segment(module);
                    self.bindings.insert(root.to_string(), root.to_string());
                    modules.push(module);
                }
                "aliased_import" => {
                    let (Some(name), Some(alias)) = (
                        child.child_by_field_name("name"),
                        child.child_by_field_name("alias"),
                    ) else {
                        continue;
                    };
                    let module = self.text(&name);
                    self.bindings
                        .insert(self.text(&alias).to_string(), module.to_string());
                    modules.push(module);
                }
                _ => {}
            }
        }
        self.frameworks_for(node, &modules);
    }

    /// `from m import x as y` binds `y` to `m.x`; wildcards bind nothing.
    fn visit_import_from(&mut self, node: &TSNode<'a>) {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };
        let written = self.text(&module_node);
        let module = written.trim_start_matches('.');

        let mut cursor = node.walk();
        let children: Vec<TSNode<'a>> = node.named_children(&mut cursor).collect();
        for child in children {
            if child.id() == module_node.id() {
                continue;
            }
            let (name, local) = match child.kind() {
                "dotted_name" => {
                    let name = self.text(&child);
                    (name, name)
                }
                "aliased_import" => {
                    let (Some(name), Some(alias)) = (
                        child.child_by_field_name("name"),
                        child.child_by_field_name("alias"),
                    ) else {
                        continue;
                    };
                    (self.text(&name), self.text(&alias))
                }
                _ => continue,
            };
            let qualified = if module.is_empty() {
                name.to_string()
            } else {
                format!("{module}.{name}")
            };
            self.bindings.insert(local.to_string(), qualified);
        }

        // Relative imports point into the scanned project itself.
        if module_node.kind() == "dotted_name" {
            self.frameworks_for(node, &[written]);
        }
    }

    /// At most one framework finding per framework per statement.
    fn frameworks_for(&mut self, statement: &TSNode<'a>, modules: &[&'a str]) {
        let registry = self.matcher.registry;
        let mut seen: Vec<&str> = Vec::new();
        for module in modules {
            let Some(framework) = registry.framework_for_root(root_segment(module)) else {
                continue;
            };
            if seen.contains(&framework.name.as_str()) {
                continue;
            }
            seen.push(&framework.name);
            let finding = self.framework_finding(statement, framework, module);
            self.pending.push_back(finding);
        }
    }

    fn framework_finding(
        &self,
        statement: &TSNode<'a>,
        framework: &FrameworkSignature,
        module: &str,
    ) -> Finding {
        let mut arguments = BTreeMap::new();
        if let Some(version) = self
            .matcher
            .versions
            .and_then(|lookup| lookup.installed_version(framework))
        {
            arguments.insert("version".to_string(), LiteralValue::Str(version));
        }
        Finding {
            category: Category::Framework,
            symbol: framework.name.clone(),
            qualified_name: module.to_string(),
            call: module.to_string(),
            location: self.location(statement),
            arguments,
            primary: None,
            provider: framework.provider.clone(),
        }
    }

    fn visit_call(&mut self, node: &TSNode<'a>) {
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        let Some((name, rooted)) = self.callee_name(&function) else {
            return;
        };
        let qualified = if rooted { self.resolve(&name) } else { name };

        let registry = self.matcher.registry;
        let matched = registry.match_call(&qualified);
        if matched.is_empty() {
            return;
        }

        let arguments = CallArguments::collect(node.child_by_field_name("arguments"), self.source);
        for (signature, symbol) in matched {
            let finding =
                self.call_finding(node, &function, signature, symbol, &qualified, &arguments);
            self.pending.push_back(finding);
        }
    }

    /// Dotted name of a callee plus whether it starts at a plain identifier.
    /// Unnameable objects (calls, subscripts) contribute no segments.
    fn callee_name(&self, node: &TSNode<'a>) -> Option<(String, bool)> {
        let mut segments: Vec<&'a str> = Vec::new();
        let mut current = *node;
        let rooted = loop {
            match current.kind() {
                "identifier" => {
                    segments.push(self.text(&current));
                    break true;
                }
                "attribute" => {
                    segments.push(self.text(&current.child_by_field_name("attribute")?));
                    match current.child_by_field_name("object") {
                        Some(object) => current = object,
                        None => break false,
                    }
                }
                _ if segments.is_empty() => return None,
                _ => break false,
            }
        };
        segments.reverse();
        Some((segments.join("."), rooted))
    }

    fn resolve(&self, name: &str) -> String {
        let (head, rest) = match name.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (name, None),
        };
        match (self.bindings.get(head), rest) {
            (Some(bound), Some(rest)) => format!("{bound}.{rest}"),
            (Some(bound), None) => bound.clone(),
            (None, _) => name.to_string(),
        }
    }

    fn call_finding(
        &self,
        call: &TSNode<'a>,
        function: &TSNode<'a>,
        signature: &Signature,
        symbol: String,
        qualified: &str,
        arguments: &CallArguments<'a>,
    ) -> Finding {
        let mut values = BTreeMap::new();
        let mut primary = signature.primary.clone();

        for spec in &signature.args {
            let is_primary = primary.as_deref() == Some(spec.name.as_str());
            let value = match arguments.lookup(&spec.keywords, spec.position) {
                Supplied::Node(node) => resolve_literal(&node, self.source),
                Supplied::Opaque => LiteralValue::Unknown,
                Supplied::Absent if is_primary => LiteralValue::Unknown,
                Supplied::Absent => continue,
            };
            let value = if spec.redact && !self.matcher.include_prompts {
                if is_primary {
                    primary = None;
                }
                LiteralValue::Str(REDACTED.to_string())
            } else {
                value
            };
            values.insert(spec.name.clone(), value);
        }

        Finding {
            category: signature.category,
            symbol,
            qualified_name: qualified.to_string(),
            call: self.text(function).to_string(),
            location: self.location(call),
            arguments: values,
            primary,
            provider: signature.provider.clone(),
        }
    }
}

fn root_segment(module: &str) -> &str {
    module.split('.').next().unwrap_or(module)
}

enum Supplied<'a> {
    Node(TSNode<'a>),
    /// Supplied in a way that cannot be inspected (`*args`, `**kwargs`).
    Opaque,
    Absent,
}

/// Arguments of one call, split into positional slots and keywords.
struct CallArguments<'a> {
    /// `None` marks slots at or after a `*splat`, whose index is unknowable.
    positional: Vec<Option<TSNode<'a>>>,
    keywords: Vec<(String, TSNode<'a>)>,
    splat: bool,
}

impl<'a> CallArguments<'a> {
    fn collect(list: Option<TSNode<'a>>, source: &[u8]) -> Self {
        let mut args = Self {
            positional: Vec::new(),
            keywords: Vec::new(),
            splat: false,
        };
        let Some(list) = list else {
            return args;
        };
        if list.kind() == "generator_expression" {
            args.positional.push(Some(list));
            return args;
        }

        let mut after_star = false;
        let mut cursor = list.walk();
        let children: Vec<TSNode<'a>> = list.named_children(&mut cursor).collect();
        for child in children {
            match child.kind() {
                "comment" => {}
                "keyword_argument" => {
                    if let (Some(name), Some(value)) = (
                        child.child_by_field_name("name"),
                        child.child_by_field_name("value"),
                    ) {
                        args.keywords
                            .push((extract_text(&name, source).to_string(), value));
                    }
                }
                "list_splat" => {
                    after_star = true;
                    args.splat = true;
                    args.positional.push(None);
                }
                "dictionary_splat" => args.splat = true,
                _ if after_star => args.positional.push(None),
                _ => args.positional.push(Some(child)),
            }
        }
        args
    }

    fn lookup(&self, keywords: &[String], position: Option<usize>) -> Supplied<'a> {
        if let Some((_, node)) = self
            .keywords
            .iter()
            .find(|(name, _)| keywords.iter().any(|k| k == name))
        {
            return Supplied::Node(*node);
        }
        if let Some(index) = position {
            match self.positional.get(index) {
                Some(Some(node)) => return Supplied::Node(*node),
                Some(None) => return Supplied::Opaque,
                None => {}
            }
        }
        if self.splat {
            Supplied::Opaque
        } else {
            Supplied::Absent
        }
    }
}
