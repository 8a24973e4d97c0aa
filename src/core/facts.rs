//! Structural classifier.
//!
//! Facts are computed once per candidate from its own subtree and
//! never consult neighbouring definitions. Filters are simple
//! predicates over those facts and compose with logical AND.

use tree_sitter::Node;

use crate::core::walker::{CandidateNode, SymbolKind, named_children};
use crate::parsers::SourceUnit;

/// Receiver names dropped from the first position of a method.
const RECEIVER_NAMES: &[&str] = &["self", "cls"];

/// Constructor method name.
const INIT: &str = "__init__";

/// Annotation coverage of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypingState
{
    Untyped,
    PartiallyTyped,
    FullyTyped,
    /// Classes carry no signature to annotate
    NotApplicable,
}

/// Read-only snapshot of everything the filters look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralFacts
{
    pub is_function: bool,
    pub is_async: bool,
    pub has_docstring: bool,
    pub is_public: bool,
    pub is_dunder: bool,
    pub has_plain_init: bool,
    pub typing: TypingState,
}

impl StructuralFacts
{
    /// Classify one candidate.
    pub fn of(
        unit: &SourceUnit,
        candidate: &CandidateNode<'_>,
    ) -> Self
    {
        let name = candidate.name;
        let is_function = candidate.kind == SymbolKind::Function;
        let is_dunder = is_dunder(name);

        let (typing, has_plain_init) = if is_function
        {
            let sig = Signature::read(unit, candidate);
            (sig.typing_state(name), sig.is_plain_init(name, candidate.is_method()))
        }
        else
        {
            (TypingState::NotApplicable, false)
        };

        Self {
            is_function,
            is_async: is_function && is_async(candidate.node),
            has_docstring: docstring_node(unit, candidate.node).is_some(),
            is_public: is_dunder || !name.starts_with('_'),
            is_dunder,
            has_plain_init,
            typing,
        }
    }
}

/// `__name__` style identifiers.
pub fn is_dunder(name: &str) -> bool
{
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

fn is_async(def: Node<'_>) -> bool
{
    def.child(0)
        .is_some_and(|c| c.kind() == "async")
}

/// First body statement when it is a plain string literal
/// expression; returns the literal node itself.
pub fn docstring_node<'t>(
    unit: &SourceUnit,
    def: Node<'t>,
) -> Option<Node<'t>>
{
    let body = def.child_by_field_name("body")?;

    // Comments are extras and may precede the first statement.
    let first = named_children(body)
        .into_iter()
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement"
    {
        return None;
    }

    let mut exprs = named_children(first)
        .into_iter()
        .filter(|n| n.kind() != "comment");
    let literal = exprs.next()?;
    if exprs
        .next()
        .is_some()
    {
        return None;
    }

    match literal.kind()
    {
        "string" if is_plain_string(unit, literal) => Some(literal),
        "concatenated_string"
            if named_children(literal)
                .into_iter()
                .filter(|n| n.kind() != "comment")
                .all(|s| s.kind() == "string" && is_plain_string(unit, s)) =>
        {
            Some(literal)
        }
        _ => None,
    }
}

/// `str` literals only: f-strings are expressions and bytes are not text.
fn is_plain_string(
    unit: &SourceUnit,
    string: Node<'_>,
) -> bool
{
    let Some(start) = string.child(0)
    else
    {
        return false;
    };
    !unit
        .node_text(start)
        .chars()
        .any(|c| matches!(c, 'f' | 'F' | 'b' | 'B'))
}

/// One formal parameter of a function.
#[derive(Debug, Clone)]
struct Param<'u>
{
    name: &'u str,
    annotated: bool,
    /// `*args`/`**kwargs` are listed but never counted.
    splat: bool,
}

/// Flattened view of a function header.
#[derive(Debug, Clone)]
struct Signature<'u>
{
    params: Vec<Param<'u>>,
    receiver_annotated: bool,
    returns_annotated: bool,
}

impl<'u> Signature<'u>
{
    fn read(
        unit: &'u SourceUnit,
        candidate: &CandidateNode<'u>,
    ) -> Self
    {
        let def = candidate.node;
        let mut params: Vec<Param<'u>> = def
            .child_by_field_name("parameters")
            .map(|list| {
                named_children(list)
                    .into_iter()
                    .filter_map(|p| Self::param(unit, p))
                    .collect()
            })
            .unwrap_or_default();

        // Drop an implicit receiver on methods.
        let mut receiver_annotated = false;
        if candidate.is_method()
            && let Some(first) = params.first()
            && !first.splat
            && RECEIVER_NAMES.contains(&first.name)
        {
            receiver_annotated = first.annotated;
            params.remove(0);
        }

        Self {
            params,
            receiver_annotated,
            returns_annotated: def
                .child_by_field_name("return_type")
                .is_some(),
        }
    }

    fn param(
        unit: &'u SourceUnit,
        node: Node<'u>,
    ) -> Option<Param<'u>>
    {
        let (inner, annotated) = match node.kind()
        {
            "identifier" => (node, false),
            "default_parameter" => (node.child_by_field_name("name")?, false),
            "typed_default_parameter" => (node.child_by_field_name("name")?, true),
            "typed_parameter" => (node.named_child(0)?, true),
            "list_splat_pattern" | "dictionary_splat_pattern" => (node, false),
            // Separators and comments are not parameters
            _ => return None,
        };

        let splat = matches!(inner.kind(), "list_splat_pattern" | "dictionary_splat_pattern");
        Some(Param { name: unit.node_text(inner), annotated, splat })
    }

    fn typing_state(
        &self,
        name: &str,
    ) -> TypingState
    {
        let counted = self
            .params
            .iter()
            .filter(|p| !p.splat);
        let total = counted
            .clone()
            .count();
        let annotated = counted
            .filter(|p| p.annotated)
            .count();

        // Constructors never need a return annotation.
        let return_ok = self.returns_annotated || name == INIT;

        if annotated == total && return_ok
        {
            TypingState::FullyTyped
        }
        else if annotated == 0 && !self.returns_annotated
        {
            TypingState::Untyped
        }
        else
        {
            TypingState::PartiallyTyped
        }
    }

    fn is_plain_init(
        &self,
        name: &str,
        is_method: bool,
    ) -> bool
    {
        is_method
            && name == INIT
            && self
                .params
                .is_empty()
            && !self.receiver_annotated
            && !self.returns_annotated
    }
}

/// Structural predicate requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralFilter
{
    Function,
    Class,
    Async,
    Unasync,
    Documented,
    Undocumented,
    Public,
    Private,
    Dunder,
    Typed,
    Untyped,
    PartiallyTyped,
    FullyTyped,
    NoInit,
}

impl StructuralFilter
{
    pub fn accepts(
        self,
        facts: &StructuralFacts,
    ) -> bool
    {
        use TypingState::*;

        match self
        {
            Self::Function => facts.is_function,
            Self::Class => !facts.is_function,
            Self::Async => facts.is_async,
            Self::Unasync => facts.is_function && !facts.is_async,
            Self::Documented => facts.has_docstring,
            Self::Undocumented => !facts.has_docstring,
            Self::Public => facts.is_public,
            Self::Private => !facts.is_public,
            Self::Dunder => facts.is_dunder,
            Self::Typed =>
            {
                matches!(facts.typing, PartiallyTyped | FullyTyped) && !facts.has_plain_init
            }
            Self::Untyped => facts.typing == Untyped || facts.has_plain_init,
            Self::PartiallyTyped => facts.typing == PartiallyTyped,
            Self::FullyTyped => facts.typing == FullyTyped,
            Self::NoInit => !facts.has_plain_init,
        }
    }
}

/// AND-composition of filters; empty accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet
{
    filters: Vec<StructuralFilter>,
}

impl FilterSet
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add a filter; duplicates are ignored.
    pub fn insert(
        &mut self,
        filter: StructuralFilter,
    )
    {
        if !self
            .filters
            .contains(&filter)
        {
            self.filters
                .push(filter);
        }
    }

    pub fn with(
        mut self,
        filter: StructuralFilter,
    ) -> Self
    {
        self.insert(filter);
        self
    }

    pub fn is_empty(&self) -> bool
    {
        self.filters
            .is_empty()
    }

    pub fn accepts(
        &self,
        facts: &StructuralFacts,
    ) -> bool
    {
        self.filters
            .iter()
            .all(|f| f.accepts(facts))
    }
}

impl FromIterator<StructuralFilter> for FilterSet
{
    fn from_iter<T: IntoIterator<Item = StructuralFilter>>(iter: T) -> Self
    {
        let mut set = Self::new();
        for f in iter
        {
            set.insert(f);
        }
        set
    }
}
