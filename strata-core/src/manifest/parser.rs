//! OXC frontend: lowers JavaScript/TypeScript source into a [`ScopeTree`].
//!
//! Scope resolution is delegated to `oxc_semantic`, which already handles
//! hoisting, block scoping, shadowing and destructuring. This module only
//! copies the result into the grammar-agnostic tree.

use std::collections::HashMap;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ArrowFunctionExpression, Declaration, ExportDefaultDeclarationKind, Expression, Function,
    IdentifierReference, Program, Statement, VariableDeclaration,
};
use oxc_ast_visit::Visit;
use oxc_parser::{Parser, ParserReturn};
use oxc_semantic::{Scoping, SemanticBuilder, SymbolFlags, SymbolId};
use oxc_span::{SourceType, Span};

use super::extractor::{SourceDialect, DEFAULT_EXPORT};
use super::scope::{Binding, BindingKind, FunctionScope, Reference, ScopeTree, TextRange};
use crate::error::ParseError;

impl From<Span> for TextRange {
    fn from(span: Span) -> Self {
        TextRange::new(span.start, span.end)
    }
}

impl SourceDialect {
    fn source_type(self) -> SourceType {
        match self {
            SourceDialect::JavaScript => SourceType::mjs(),
            SourceDialect::TypeScript => SourceType::ts(),
            SourceDialect::Jsx => SourceType::jsx(),
            SourceDialect::Tsx => SourceType::tsx(),
        }
    }
}

/// Parse `source` and build its scope tree.
///
/// `unit` names the function or file in the error if parsing fails.
pub(crate) fn scope_tree(
    source: &str,
    dialect: SourceDialect,
    unit: &str,
) -> Result<ScopeTree, ParseError> {
    let allocator = Allocator::default();

    let ParserReturn {
        program,
        errors,
        panicked,
        ..
    } = Parser::new(&allocator, source, dialect.source_type()).parse();

    if panicked || !errors.is_empty() {
        let message = errors
            .iter()
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        let message = if message.is_empty() {
            "parser aborted".to_string()
        } else {
            message
        };
        return Err(ParseError::new(unit, message));
    }

    let semantic = SemanticBuilder::new().build(&program).semantic;
    let scoping = semantic.scoping();

    let mut tree = ScopeTree::default();

    let mut symbols: HashMap<SymbolId, usize> = HashMap::new();
    for symbol_id in scoping.symbol_ids() {
        let kind = if scoping.symbol_flags(symbol_id).contains(SymbolFlags::Import) {
            BindingKind::Import
        } else {
            BindingKind::Declared
        };
        symbols.insert(symbol_id, tree.bindings.len());
        tree.bindings.push(Binding {
            name: scoping.symbol_name(symbol_id).to_string(),
            range: scoping.symbol_span(symbol_id).into(),
            scope: scoping.symbol_scope_id(symbol_id).index() as u32,
            kind,
        });
    }

    let mut collector = ReferenceCollector {
        scoping,
        symbols: &symbols,
        references: Vec::new(),
    };
    collector.visit_program(&program);
    tree.references = collector.references;

    collect_functions(&program, &mut tree);

    Ok(tree)
}

/// Records every value reference along with the binding it resolved to.
struct ReferenceCollector<'s> {
    scoping: &'s Scoping,
    symbols: &'s HashMap<SymbolId, usize>,
    references: Vec<Reference>,
}

impl<'s, 'ast> Visit<'ast> for ReferenceCollector<'s> {
    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'ast>) {
        let reference = self.scoping.get_reference(it.reference_id());

        // Type-only references (TypeScript annotations) carry no data.
        if !reference.is_value() {
            return;
        }

        let binding = reference
            .symbol_id()
            .and_then(|symbol_id| self.symbols.get(&symbol_id).copied());

        self.references.push(Reference {
            name: it.name.to_string(),
            range: it.span.into(),
            binding,
        });
    }
}

fn collect_functions(program: &Program<'_>, tree: &mut ScopeTree) {
    for statement in &program.body {
        match statement {
            Statement::FunctionDeclaration(function) => {
                push_function(tree, function, declared_name(function));
            }
            Statement::VariableDeclaration(declaration) => push_declarators(tree, declaration, false),
            Statement::ExportNamedDeclaration(export) => {
                match &export.declaration {
                    Some(Declaration::FunctionDeclaration(function)) => {
                        if let Some(id) = &function.id {
                            tree.exported.insert(id.name.to_string());
                        }
                        push_function(tree, function, declared_name(function));
                    }
                    Some(Declaration::VariableDeclaration(declaration)) => {
                        push_declarators(tree, declaration, true);
                    }
                    _ => {}
                }
                for specifier in &export.specifiers {
                    tree.exported.insert(specifier.local.name().to_string());
                }
            }
            Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(function) => {
                    if let Some(id) = &function.id {
                        tree.exported.insert(id.name.to_string());
                    }
                    let name = declared_name(function).unwrap_or_else(|| DEFAULT_EXPORT.to_string());
                    push_function(tree, function, Some(name));
                }
                ExportDefaultDeclarationKind::ArrowFunctionExpression(arrow) => {
                    push_arrow(tree, arrow, Some(DEFAULT_EXPORT.to_string()));
                }
                _ => {}
            },
            Statement::ExpressionStatement(statement) => {
                push_expression(tree, &statement.expression, None);
            }
            _ => {}
        }
    }
}

fn push_declarators(tree: &mut ScopeTree, declaration: &VariableDeclaration<'_>, exported: bool) {
    for declarator in &declaration.declarations {
        let name = declarator.id.get_identifier_name().map(|name| name.to_string());
        if exported {
            if let Some(name) = &name {
                tree.exported.insert(name.clone());
            }
        }
        if let Some(init) = &declarator.init {
            push_expression(tree, init, name);
        }
    }
}

fn push_expression(tree: &mut ScopeTree, expression: &Expression<'_>, name: Option<String>) {
    match expression {
        Expression::ArrowFunctionExpression(arrow) => push_arrow(tree, arrow, name),
        Expression::FunctionExpression(function) => push_function(tree, function, name),
        Expression::ParenthesizedExpression(inner) => push_expression(tree, &inner.expression, name),
        _ => {}
    }
}

/// Name a function declaration binds in its enclosing scope.
///
/// A function expression's own id is visible only inside its body, so
/// expressions are named by what they are assigned to instead.
fn declared_name(function: &Function<'_>) -> Option<String> {
    function.id.as_ref().map(|id| id.name.to_string())
}

fn push_function(tree: &mut ScopeTree, function: &Function<'_>, name: Option<String>) {
    tree.functions.push(FunctionScope {
        name,
        range: function.span.into(),
        params: function.params.span.into(),
        scope: function.scope_id().index() as u32,
    });
}

fn push_arrow(tree: &mut ScopeTree, arrow: &ArrowFunctionExpression<'_>, name: Option<String>) {
    tree.functions.push(FunctionScope {
        name,
        range: arrow.span.into(),
        params: arrow.params.span.into(),
        scope: arrow.scope_id().index() as u32,
    });
}
