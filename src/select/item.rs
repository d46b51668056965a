//! Selector Items
//!
//! The immutable, compiled form of one selector step. An item knows which
//! node kinds it accepts, the name pattern, the attribute condition tree and
//! an optional sibling index condition. Items are freely shareable across
//! parses and threads; all mutable matching state lives in `SelectorChain`.

use std::fmt;

use memchr::memmem;

use super::buffer::ElementBuffer;
use crate::error::SelectorError;

/// Kind of node a step accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Element,
    /// Any node, elements included
    Content,
    Text,
    Comment,
    Cdata,
    DocType,
    XmlDeclaration,
    ProcessingInstruction,
}

impl NodeKind {
    /// Selector keyword for non-element kinds, e.g. `text()`
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            NodeKind::Element => None,
            NodeKind::Content => Some("content"),
            NodeKind::Text => Some("text"),
            NodeKind::Comment => Some("comment"),
            NodeKind::Cdata => Some("cdata"),
            NodeKind::DocType => Some("doctype"),
            NodeKind::XmlDeclaration => Some("xmldecl"),
            NodeKind::ProcessingInstruction => Some("procinstr"),
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "content" => NodeKind::Content,
            "text" => NodeKind::Text,
            "comment" => NodeKind::Comment,
            "cdata" => NodeKind::Cdata,
            "doctype" => NodeKind::DocType,
            "xmldecl" => NodeKind::XmlDeclaration,
            "procinstr" => NodeKind::ProcessingInstruction,
            _ => return None,
        })
    }
}

/// The node an item is evaluated against
#[derive(Debug, Clone, Copy)]
pub enum MarkupNode<'a> {
    Element(&'a ElementBuffer),
    Text,
    Comment,
    Cdata,
    DocType,
    XmlDeclaration,
    ProcessingInstruction { target: &'a [u8] },
}

impl MarkupNode<'_> {
    fn kind(&self) -> NodeKind {
        match self {
            MarkupNode::Element(_) => NodeKind::Element,
            MarkupNode::Text => NodeKind::Text,
            MarkupNode::Comment => NodeKind::Comment,
            MarkupNode::Cdata => NodeKind::Cdata,
            MarkupNode::DocType => NodeKind::DocType,
            MarkupNode::XmlDeclaration => NodeKind::XmlDeclaration,
            MarkupNode::ProcessingInstruction { .. } => NodeKind::ProcessingInstruction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeOperator {
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    Contains,
    Exists,
    NotExists,
}

impl AttributeOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            AttributeOperator::Equals => "=",
            AttributeOperator::NotEquals => "!=",
            AttributeOperator::StartsWith => "^=",
            AttributeOperator::EndsWith => "$=",
            AttributeOperator::Contains => "*=",
            AttributeOperator::Exists | AttributeOperator::NotExists => "",
        }
    }
}

/// Attribute predicate tree: leaves combined with AND/OR
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeCondition {
    Simple {
        name: String,
        operator: AttributeOperator,
        value: String,
    },
    And(Box<AttributeCondition>, Box<AttributeCondition>),
    Or(Box<AttributeCondition>, Box<AttributeCondition>),
}

impl AttributeCondition {
    pub fn simple(name: impl Into<String>, operator: AttributeOperator, value: impl Into<String>) -> Self {
        AttributeCondition::Simple {
            name: name.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn and(self, other: AttributeCondition) -> Self {
        AttributeCondition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: AttributeCondition) -> Self {
        AttributeCondition::Or(Box::new(self), Box::new(other))
    }

    /// Evaluate against the attributes of `element`, left to right with
    /// short-circuiting
    pub fn evaluate(&self, element: &ElementBuffer, html: bool) -> bool {
        match self {
            AttributeCondition::And(left, right) => {
                left.evaluate(element, html) && right.evaluate(element, html)
            }
            AttributeCondition::Or(left, right) => {
                left.evaluate(element, html) || right.evaluate(element, html)
            }
            AttributeCondition::Simple {
                name,
                operator,
                value,
            } => {
                let tokenized = html && name.eq_ignore_ascii_case("class");
                let mut instances = element
                    .attributes()
                    .filter(|(attr_name, _)| names_equal(attr_name, name.as_bytes(), html))
                    .map(|(_, attr_value)| attr_value);

                match operator {
                    AttributeOperator::Exists => {
                        instances.any(|v| !tokenized || tokens(v).next().is_some())
                    }
                    AttributeOperator::NotExists => {
                        !instances.any(|v| !tokenized || tokens(v).next().is_some())
                    }
                    AttributeOperator::NotEquals => !instances.any(|v| {
                        value_matches(v, AttributeOperator::Equals, value.as_bytes(), tokenized)
                    }),
                    op => instances.any(|v| value_matches(v, *op, value.as_bytes(), tokenized)),
                }
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            AttributeCondition::Or(..) => 0,
            AttributeCondition::And(..) => 1,
            AttributeCondition::Simple { .. } => 2,
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        let wrap = self.precedence() < parent;
        if wrap {
            write!(f, "(")?;
        }
        match self {
            AttributeCondition::Simple {
                name,
                operator,
                value,
            } => match operator {
                AttributeOperator::Exists => write!(f, "{}", name)?,
                AttributeOperator::NotExists => write!(f, "!{}", name)?,
                op => {
                    let quote = if value.contains('\'') { '"' } else { '\'' };
                    write!(f, "{}{}{}{}{}", name, op.symbol(), quote, value, quote)?
                }
            },
            AttributeCondition::And(left, right) => {
                left.fmt_nested(f, 1)?;
                write!(f, " and ")?;
                right.fmt_nested(f, 2)?;
            }
            AttributeCondition::Or(left, right) => {
                left.fmt_nested(f, 0)?;
                write!(f, " or ")?;
                right.fmt_nested(f, 1)?;
            }
        }
        if wrap {
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl fmt::Display for AttributeCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_nested(f, 0)
    }
}

#[inline]
fn names_equal(actual: &[u8], expected: &[u8], html: bool) -> bool {
    if html {
        actual.eq_ignore_ascii_case(expected)
    } else {
        actual == expected
    }
}

fn tokens(value: &[u8]) -> impl Iterator<Item = &[u8]> {
    value
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
}

fn compare(actual: &[u8], operator: AttributeOperator, expected: &[u8]) -> bool {
    match operator {
        AttributeOperator::Equals => actual == expected,
        AttributeOperator::StartsWith => actual.starts_with(expected),
        AttributeOperator::EndsWith => actual.ends_with(expected),
        AttributeOperator::Contains => memmem::find(actual, expected).is_some(),
        AttributeOperator::NotEquals => actual != expected,
        AttributeOperator::Exists | AttributeOperator::NotExists => true,
    }
}

fn value_matches(actual: &[u8], operator: AttributeOperator, expected: &[u8], tokenized: bool) -> bool {
    if !tokenized {
        return compare(actual, operator, expected);
    }
    // An explicitly empty class only equals the empty string
    if expected.is_empty() && operator == AttributeOperator::Equals {
        return actual.is_empty();
    }
    tokens(actual).any(|token| compare(token, operator, expected))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexCondition {
    Value(usize),
    LessThan(usize),
    MoreThan(usize),
    Even,
    Odd,
}

impl IndexCondition {
    /// Evaluate against a 0-based position among matching siblings
    #[inline]
    pub fn matches(self, position: usize) -> bool {
        match self {
            IndexCondition::Value(n) => position == n,
            IndexCondition::LessThan(n) => position < n,
            IndexCondition::MoreThan(n) => position > n,
            IndexCondition::Even => position % 2 == 0,
            IndexCondition::Odd => position % 2 == 1,
        }
    }
}

impl fmt::Display for IndexCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexCondition::Value(n) => write!(f, "[{}]", n),
            IndexCondition::LessThan(n) => write!(f, "[<{}]", n),
            IndexCondition::MoreThan(n) => write!(f, "[>{}]", n),
            IndexCondition::Even => write!(f, "[even()]"),
            IndexCondition::Odd => write!(f, "[odd()]"),
        }
    }
}

/// Name and attribute test for a single node kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeMatcher {
    pub kind: NodeKind,
    /// Element or processing instruction target; `None` matches any name.
    /// Stored lowercase in HTML mode.
    pub name: Option<String>,
    pub attributes: Option<AttributeCondition>,
    pub html: bool,
}

impl NodeMatcher {
    pub fn element(name: Option<String>, attributes: Option<AttributeCondition>, html: bool) -> Self {
        NodeMatcher {
            kind: NodeKind::Element,
            name,
            attributes,
            html,
        }
    }

    pub fn matches(&self, node: &MarkupNode<'_>) -> bool {
        if self.kind == NodeKind::Content {
            return true;
        }
        if self.kind != node.kind() {
            return false;
        }
        match node {
            MarkupNode::Element(element) => {
                let name_ok = self
                    .name
                    .as_ref()
                    .is_none_or(|name| names_equal(element.name(), name.as_bytes(), self.html));
                name_ok
                    && self
                        .attributes
                        .as_ref()
                        .is_none_or(|condition| condition.evaluate(element, self.html))
            }
            MarkupNode::ProcessingInstruction { target } => self
                .name
                .as_ref()
                .is_none_or(|name| names_equal(target, name.as_bytes(), self.html)),
            _ => true,
        }
    }
}

impl fmt::Display for NodeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind.keyword(), &self.name) {
            (None, Some(name)) => write!(f, "{}", name)?,
            (None, None) => write!(f, "*")?,
            (Some(keyword), Some(name)) => write!(f, "{}('{}')", keyword, name)?,
            (Some(keyword), None) => write!(f, "{}()", keyword)?,
        }
        if let Some(attributes) = &self.attributes {
            write!(f, "[{}]", attributes)?;
        }
        Ok(())
    }
}

/// Node predicate; compound tests come from reference resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeTest {
    Match(NodeMatcher),
    All(Box<NodeTest>, Box<NodeTest>),
    Any(Box<NodeTest>, Box<NodeTest>),
}

impl NodeTest {
    pub fn matches(&self, node: &MarkupNode<'_>) -> bool {
        match self {
            NodeTest::Match(matcher) => matcher.matches(node),
            NodeTest::All(left, right) => left.matches(node) && right.matches(node),
            NodeTest::Any(left, right) => left.matches(node) || right.matches(node),
        }
    }
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeTest::Match(matcher) => write!(f, "{}", matcher),
            NodeTest::All(left, right) => write!(f, "({} & {})", left, right),
            NodeTest::Any(left, right) => write!(f, "({} | {})", left, right),
        }
    }
}

/// How two items are merged into one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

/// One compiled selector step
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectorItem {
    any_level: bool,
    test: NodeTest,
    index: Option<IndexCondition>,
}

impl SelectorItem {
    pub fn new(any_level: bool, test: NodeTest, index: Option<IndexCondition>) -> Self {
        Self {
            any_level,
            test,
            index,
        }
    }

    /// `//x` (any descendant) rather than `/x` (direct child)
    #[inline]
    pub fn any_level(&self) -> bool {
        self.any_level
    }

    #[inline]
    pub fn index(&self) -> Option<IndexCondition> {
        self.index
    }

    pub fn test(&self) -> &NodeTest {
        &self.test
    }

    /// Name and attribute predicate, without the index condition
    #[inline]
    pub fn matches_node(&self, node: &MarkupNode<'_>) -> bool {
        self.test.matches(node)
    }

    /// Merge with a reference-resolved item. Both must agree on level
    /// matching and at most one may carry an index condition.
    pub fn combine(
        self,
        other: SelectorItem,
        combinator: Combinator,
        selector: &str,
    ) -> Result<SelectorItem, SelectorError> {
        if self.any_level != other.any_level {
            return Err(SelectorError::IncompatibleLevels {
                selector: selector.to_string(),
            });
        }
        if self.index.is_some() && other.index.is_some() {
            return Err(SelectorError::DuplicateIndex {
                selector: selector.to_string(),
            });
        }
        let (left, right) = (Box::new(self.test), Box::new(other.test));
        let test = match combinator {
            Combinator::And => NodeTest::All(left, right),
            Combinator::Or => NodeTest::Any(left, right),
        };
        Ok(SelectorItem {
            any_level: self.any_level,
            test,
            index: self.index.or(other.index),
        })
    }

    /// Attach an index condition, refusing a second one
    pub fn with_index(
        mut self,
        index: Option<IndexCondition>,
        selector: &str,
    ) -> Result<SelectorItem, SelectorError> {
        if index.is_some() {
            if self.index.is_some() {
                return Err(SelectorError::DuplicateIndex {
                    selector: selector.to_string(),
                });
            }
            self.index = index;
        }
        Ok(self)
    }
}

impl fmt::Display for SelectorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", if self.any_level { "//" } else { "/" }, self.test)?;
        if let Some(index) = self.index {
            write!(f, "{}", index)?;
        }
        Ok(())
    }
}
