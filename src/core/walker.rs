//! Symbol walker: module-level definitions and the methods of
//! module-level classes, in source order.
//!
//! Depth is fixed at one class level. Functions nested in
//! functions and members of nested classes are never visited.

use tree_sitter::Node;

use crate::core::pattern::PatternSet;
use crate::parsers::SourceUnit;

/// Definition kind of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind
{
    Function,
    Class,
}

/// One function or class definition found by the walker.
#[derive(Debug, Clone, Copy)]
pub struct CandidateNode<'u>
{
    /// `function_definition` or `class_definition` node
    pub node: Node<'u>,

    /// Function or class
    pub kind: SymbolKind,

    /// Declared name
    pub name: &'u str,

    /// Enclosing class for methods, None at module level
    pub class_name: Option<&'u str>,

    /// 1-based line of the `def`/`class` keyword
    pub start_line: usize,

    /// 1-based line of the last non-comment statement
    pub end_line: usize,

    /// 1-based line of the first decorator, or `start_line`
    pub decorated_start_line: usize,
}

impl CandidateNode<'_>
{
    pub fn is_method(&self) -> bool
    {
        self.class_name
            .is_some()
    }
}

/// Every candidate in `unit`, in source order. A class is
/// yielded before its methods.
pub fn candidates(unit: &SourceUnit) -> impl Iterator<Item = CandidateNode<'_>>
{
    named_children(unit.root())
        .into_iter()
        .filter_map(move |child| candidate(unit, child, None))
        .flat_map(move |top| {
            let methods = match top.kind
            {
                SymbolKind::Class => methods_of(unit, &top),
                SymbolKind::Function => Vec::new(),
            };
            std::iter::once(top).chain(methods)
        })
}

/// Candidates accepted by at least one pattern.
pub fn matching<'u>(
    unit: &'u SourceUnit,
    patterns: &'u PatternSet,
) -> impl Iterator<Item = CandidateNode<'u>> + 'u
{
    candidates(unit).filter(move |c| patterns.matches(c.name, c.class_name))
}

/// Direct function members of a class body.
fn methods_of<'u>(
    unit: &'u SourceUnit,
    class: &CandidateNode<'u>,
) -> Vec<CandidateNode<'u>>
{
    let Some(body) = class
        .node
        .child_by_field_name("body")
    else
    {
        return Vec::new();
    };

    named_children(body)
        .into_iter()
        .filter_map(|stmt| candidate(unit, stmt, Some(class.name)))
        .filter(|c| c.kind == SymbolKind::Function)
        .collect()
}

/// Interpret a statement as a (possibly decorated) definition.
fn candidate<'u>(
    unit: &'u SourceUnit,
    stmt: Node<'u>,
    class_name: Option<&'u str>,
) -> Option<CandidateNode<'u>>
{
    // Decorators live on a wrapping `decorated_definition`.
    let (outer, def) = match stmt.kind()
    {
        "function_definition" | "class_definition" => (stmt, stmt),
        "decorated_definition" => (stmt, stmt.child_by_field_name("definition")?),
        _ => return None,
    };

    let kind = match def.kind()
    {
        "function_definition" => SymbolKind::Function,
        "class_definition" => SymbolKind::Class,
        _ => return None,
    };

    let name = unit.node_text(def.child_by_field_name("name")?);

    let start_line = def
        .start_position()
        .row
        + 1;
    let end_line = last_code_line(def).max(start_line);

    Some(CandidateNode {
        node: def,
        kind,
        name,
        class_name,
        start_line,
        end_line,
        decorated_start_line: outer
            .start_position()
            .row
            + 1,
    })
}

/// 1-based line on which the last non-comment token of `node`
/// ends. Trailing comments attached to the block belong to
/// whatever follows, so they are skipped at every level.
fn last_code_line(node: Node<'_>) -> usize
{
    let mut current = node;
    loop
    {
        let last = named_or_not_children(current)
            .into_iter()
            .rfind(|c| c.kind() != "comment");
        match last
        {
            Some(child) => current = child,
            None => break,
        }
    }

    let start = current.start_position();
    let end = current.end_position();

    // A token that ends exactly at a line start ends on the line before.
    if end.column == 0 && end.row > start.row { end.row } else { end.row + 1 }
}

/// Named children, comments included.
pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>>
{
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .collect()
}

/// All children, anonymous tokens included.
fn named_or_not_children(node: Node<'_>) -> Vec<Node<'_>>
{
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .collect()
}

#[cfg(test)]
mod tests
{
    use anyhow::Result;

    use super::*;

    fn names(
        unit: &SourceUnit,
        patterns: &[&str],
    ) -> Vec<(Option<String>, String)>
    {
        let set = PatternSet::new(patterns);
        matching(unit, &set)
            .map(|c| (c.class_name.map(str::to_string), c.name.to_string()))
            .collect()
    }

    #[test]
    fn walks_top_level_and_one_class_level() -> Result<()>
    {
        let src = "\
def outer():
    def inner():
        pass

class A:
    x = 1

    def m(self):
        pass

    class Nested:
        def deep(self):
            pass

    async def am(self):
        pass
";
        let unit = SourceUnit::parse(src, "t.py")?;
        let found: Vec<_> = candidates(&unit)
            .map(|c| (c.class_name, c.name, c.kind))
            .collect();

        assert_eq!(
            found,
            vec![
                (None, "outer", SymbolKind::Function),
                (None, "A", SymbolKind::Class),
                (Some("A"), "m", SymbolKind::Function),
                (Some("A"), "am", SymbolKind::Function),
            ]
        );
        Ok(())
    }

    #[test]
    fn dotted_and_plain_patterns_select_methods() -> Result<()>
    {
        let unit = SourceUnit::parse("class C:\n    def m(self, x): pass\n", "t.py")?;

        assert_eq!(names(&unit, &["C.m"]), vec![(Some("C".into()), "m".into())]);
        assert_eq!(names(&unit, &["m"]), vec![(Some("C".into()), "m".into())]);
        assert!(names(&unit, &["D.m"]).is_empty());
        Ok(())
    }

    #[test]
    fn dotted_pattern_never_matches_top_level() -> Result<()>
    {
        let unit = SourceUnit::parse("def method():\n    pass\n", "t.py")?;
        assert!(names(&unit, &["*.method"]).is_empty());
        assert_eq!(names(&unit, &["method"]).len(), 1);
        Ok(())
    }

    #[test]
    fn emission_follows_file_order_not_pattern_order() -> Result<()>
    {
        let unit = SourceUnit::parse("def foo(): pass\ndef bar(): pass\n", "t.py")?;
        let got: Vec<_> = names(&unit, &["bar", "foo"])
            .into_iter()
            .map(|(_, n)| n)
            .collect();
        assert_eq!(got, vec!["foo", "bar"]);
        Ok(())
    }

    #[test]
    fn node_matching_two_patterns_appears_once() -> Result<()>
    {
        let unit = SourceUnit::parse("def foo(): pass\n", "t.py")?;
        assert_eq!(names(&unit, &["foo", "f*", "*"]).len(), 1);
        Ok(())
    }

    #[test]
    fn decorators_move_span_start() -> Result<()>
    {
        let src = "import x\n\n@a\n@b(1)\ndef f():\n    pass\n";
        let unit = SourceUnit::parse(src, "t.py")?;
        let f = candidates(&unit)
            .next()
            .unwrap();

        assert_eq!(f.decorated_start_line, 3);
        assert_eq!(f.start_line, 5);
        assert_eq!(f.end_line, 6);
        Ok(())
    }

    #[test]
    fn end_line_skips_trailing_comments_and_blanks() -> Result<()>
    {
        let src = "\
def a():
    return 1
    # trailing, indented


# about b
def b():
    pass
";
        let unit = SourceUnit::parse(src, "t.py")?;
        let spans: Vec<_> = candidates(&unit)
            .map(|c| (c.name, c.decorated_start_line, c.end_line))
            .collect();

        assert_eq!(spans, vec![("a", 1, 2), ("b", 7, 8)]);
        Ok(())
    }

    #[test]
    fn one_line_definition_spans_one_line() -> Result<()>
    {
        let unit = SourceUnit::parse("def a(): pass\n", "t.py")?;
        let a = candidates(&unit)
            .next()
            .unwrap();
        assert_eq!((a.start_line, a.end_line), (1, 1));
        Ok(())
    }
}
