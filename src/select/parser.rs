//! Selector Parser
//!
//! Compiles a selector string into one `SelectorItem` per path step.
//!
//! ```text
//! selector  := step (('/' | '//') step)*
//! step      := head? modifier* index?
//! head      := name | '*' | kind '(' quoted? ')'
//! modifier  := '#' id | '.' class | '%' reference | '[' attr-expr ']'
//! index     := '[' (n | '<' n | '>' n | 'even()' | 'odd()') ']'
//! attr-expr := and-expr ('or' and-expr)*
//! and-expr  := primary ('and' primary)*
//! primary   := '(' attr-expr ')' | '!' '@'? name | '@'? name (op value)?
//! ```
//!
//! A selector not starting with `/` matches at any level, as if written with
//! a leading `//`.

use super::item::{
    AttributeCondition, AttributeOperator, Combinator, IndexCondition, NodeKind, NodeMatcher,
    NodeTest, SelectorItem,
};
use super::lexer::{Lexer, Token};
use super::repository::ReferenceResolver;
use crate::error::SelectorError;
use crate::markup::ParsingMode;

/// Parse `selector` into its chain of items
pub fn parse_selector(
    selector: &str,
    mode: ParsingMode,
    resolver: Option<&dyn ReferenceResolver>,
) -> Result<Vec<SelectorItem>, SelectorError> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(SelectorError::Empty);
    }
    let parser = SelectorParser {
        selector,
        mode,
        html: mode.is_html(),
        resolver,
    };
    parser
        .split_steps()?
        .into_iter()
        .map(|(any_level, step)| parser.parse_step(step, any_level))
        .collect()
}

struct SelectorParser<'s> {
    selector: &'s str,
    mode: ParsingMode,
    html: bool,
    resolver: Option<&'s dyn ReferenceResolver>,
}

impl<'s> SelectorParser<'s> {
    fn syntax(&self, reason: impl Into<String>) -> SelectorError {
        SelectorError::syntax(self.selector, reason)
    }

    /// Split on `/` and `//` outside brackets, parentheses and quotes
    fn split_steps(&self) -> Result<Vec<(bool, &'s str)>, SelectorError> {
        let text = self.selector;
        let bytes = text.as_bytes();
        let mut steps = Vec::new();

        let (mut any_level, mut pos) = if bytes.starts_with(b"//") {
            (true, 2)
        } else if bytes.starts_with(b"/") {
            (false, 1)
        } else {
            (true, 0)
        };
        let mut start = pos;
        let mut brackets = 0usize;
        let mut parens = 0usize;
        let mut quote: Option<u8> = None;

        while pos < bytes.len() {
            let b = bytes[pos];
            if let Some(q) = quote {
                if b == q {
                    quote = None;
                }
                pos += 1;
                continue;
            }
            match b {
                b'\'' | b'"' => quote = Some(b),
                b'[' => brackets += 1,
                b']' => {
                    brackets = brackets
                        .checked_sub(1)
                        .ok_or_else(|| self.syntax("unbalanced brackets"))?;
                }
                b'(' => parens += 1,
                b')' => {
                    parens = parens
                        .checked_sub(1)
                        .ok_or_else(|| self.syntax("unbalanced parentheses"))?;
                }
                b'/' if brackets == 0 && parens == 0 => {
                    steps.push((any_level, self.step_text(start, pos)?));
                    if bytes.get(pos + 1) == Some(&b'/') {
                        any_level = true;
                        pos += 2;
                    } else {
                        any_level = false;
                        pos += 1;
                    }
                    start = pos;
                    continue;
                }
                b if b.is_ascii_whitespace() && brackets == 0 && parens == 0 => {
                    return Err(self.syntax("whitespace is only allowed inside brackets"));
                }
                _ => {}
            }
            pos += 1;
        }

        if quote.is_some() {
            return Err(self.syntax("unterminated string"));
        }
        if brackets > 0 {
            return Err(self.syntax("unbalanced brackets"));
        }
        if parens > 0 {
            return Err(self.syntax("unbalanced parentheses"));
        }
        steps.push((any_level, self.step_text(start, bytes.len())?));
        Ok(steps)
    }

    fn step_text(&self, start: usize, end: usize) -> Result<&'s str, SelectorError> {
        if start == end {
            return Err(self.syntax("empty path step"));
        }
        Ok(&self.selector[start..end])
    }

    #[inline]
    fn is_name_byte(&self, b: u8) -> bool {
        b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b':') || b >= 0x80 || (b == b'.' && !self.html)
    }

    fn name_end(&self, bytes: &[u8], from: usize) -> usize {
        let mut end = from;
        while end < bytes.len() && self.is_name_byte(bytes[end]) {
            end += 1;
        }
        end
    }

    /// End of an id, class or reference name
    fn modifier_end(&self, bytes: &[u8], from: usize) -> usize {
        let mut end = from;
        while end < bytes.len()
            && !matches!(bytes[end], b'#' | b'%' | b'[')
            && !(bytes[end] == b'.' && self.html)
        {
            end += 1;
        }
        end
    }

    /// Case-fold element and attribute names in HTML mode
    fn fold(&self, name: &str) -> String {
        if self.html {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        }
    }

    fn parse_step(&self, text: &'s str, any_level: bool) -> Result<SelectorItem, SelectorError> {
        let bytes = text.as_bytes();
        let mut pos = 0;
        let mut kind = NodeKind::Element;
        let mut name: Option<String> = None;
        let mut raw_name: Option<&str> = None;
        let mut has_head = false;

        if bytes[0] == b'*' {
            pos = 1;
            has_head = true;
        } else if is_name_start_byte(bytes[0]) {
            let end = self.name_end(bytes, 0);
            let word = &text[..end];
            pos = end;
            has_head = true;
            if bytes.get(pos) == Some(&b'(') {
                kind = NodeKind::from_keyword(word)
                    .ok_or_else(|| self.syntax(format!("unknown node kind \"{}()\"", word)))?;
                let close = text[pos..]
                    .find(')')
                    .map(|i| pos + i)
                    .ok_or_else(|| self.syntax("unbalanced parentheses"))?;
                let argument = text[pos + 1..close].trim();
                if !argument.is_empty() {
                    if kind != NodeKind::ProcessingInstruction {
                        return Err(self.syntax(format!("{}() takes no argument", word)));
                    }
                    name = Some(self.unquote(argument)?.to_string());
                }
                pos = close + 1;
            } else {
                name = Some(self.fold(word));
                raw_name = Some(word);
            }
        }

        let mut attributes: Option<AttributeCondition> = None;
        let mut index: Option<IndexCondition> = None;
        let mut shorthand = false;
        let mut reference: Option<&str> = None;

        while pos < bytes.len() {
            match bytes[pos] {
                modifier @ (b'#' | b'.' | b'%') => {
                    if index.is_some() {
                        return Err(SelectorError::MisplacedIndex {
                            selector: self.selector.to_string(),
                        });
                    }
                    if modifier != b'%' && !self.html {
                        return Err(SelectorError::HtmlOnlyModifier {
                            selector: self.selector.to_string(),
                            modifier: modifier as char,
                        });
                    }
                    if shorthand {
                        return Err(SelectorError::ConflictingModifiers {
                            selector: self.selector.to_string(),
                        });
                    }
                    shorthand = true;

                    let start = pos + 1;
                    let end = self.modifier_end(bytes, start);
                    if end == start {
                        return Err(self.syntax(format!("missing name after '{}'", modifier as char)));
                    }
                    let value = &text[start..end];
                    match modifier {
                        b'#' => {
                            let id = AttributeCondition::simple("id", AttributeOperator::Equals, value);
                            attributes = Some(and_maybe(attributes, id));
                        }
                        b'.' => {
                            let class = AttributeCondition::simple("class", AttributeOperator::Equals, value);
                            attributes = Some(and_maybe(attributes, class));
                        }
                        _ => reference = Some(value),
                    }
                    pos = end;
                }
                b'[' => {
                    let close = self.bracket_end(bytes, pos)?;
                    let inner = text[pos + 1..close].trim();
                    if inner.is_empty() {
                        return Err(self.syntax("empty brackets"));
                    }
                    match self.parse_index(inner)? {
                        Some(_) if index.is_some() => {
                            return Err(SelectorError::DuplicateIndex {
                                selector: self.selector.to_string(),
                            });
                        }
                        Some(parsed) => index = Some(parsed),
                        None if index.is_some() => {
                            return Err(SelectorError::MisplacedIndex {
                                selector: self.selector.to_string(),
                            });
                        }
                        None => {
                            let condition = self.parse_attribute_expr(inner)?;
                            attributes = Some(and_maybe(attributes, condition));
                        }
                    }
                    pos = close + 1;
                }
                other => {
                    return Err(self.syntax(format!(
                        "unexpected '{}' in step \"{}\"",
                        other as char, text
                    )));
                }
            }
        }

        if kind != NodeKind::Element && (attributes.is_some() || reference.is_some()) {
            return Err(self.syntax(format!(
                "only element steps accept attribute modifiers, found in \"{}\"",
                text
            )));
        }

        if let Some(reference) = reference {
            let referenced = match self.resolve(reference, any_level)? {
                Some(item) => item,
                // Unresolved references match as a literal element name
                None => SelectorItem::new(
                    any_level,
                    NodeTest::Match(NodeMatcher::element(Some(self.fold(reference)), None, self.html)),
                    None,
                ),
            };
            if !has_head && attributes.is_none() {
                return referenced.with_index(index, self.selector);
            }
            let local = SelectorItem::new(
                any_level,
                NodeTest::Match(NodeMatcher::element(name, attributes, self.html)),
                index,
            );
            return local.combine(referenced, Combinator::And, self.selector);
        }

        // A bare name may also be a reference: either reading can match
        if let Some(raw_name) = raw_name {
            if let Some(referenced) = self.resolve(raw_name, any_level)? {
                let literal = SelectorItem::new(
                    any_level,
                    NodeTest::Match(NodeMatcher::element(name, None, self.html)),
                    None,
                );
                let mut item = literal.combine(referenced, Combinator::Or, self.selector)?;
                if let Some(attributes) = attributes {
                    let modifiers = SelectorItem::new(
                        any_level,
                        NodeTest::Match(NodeMatcher::element(None, Some(attributes), self.html)),
                        None,
                    );
                    item = item.combine(modifiers, Combinator::And, self.selector)?;
                }
                return item.with_index(index, self.selector);
            }
        }

        Ok(SelectorItem::new(
            any_level,
            NodeTest::Match(NodeMatcher {
                kind,
                name,
                attributes,
                html: self.html,
            }),
            index,
        ))
    }

    /// Expand a reference through the resolver into exactly one item
    fn resolve(&self, reference: &str, any_level: bool) -> Result<Option<SelectorItem>, SelectorError> {
        let Some(resolver) = self.resolver else {
            return Ok(None);
        };
        let Some(substitute) = resolver.resolve(reference) else {
            return Ok(None);
        };

        let substitute = if substitute.starts_with('/') {
            substitute
        } else {
            format!("{}{}", if any_level { "//" } else { "/" }, substitute)
        };

        let mut items = parse_selector(&substitute, self.mode, None)?;
        if items.len() != 1 {
            return Err(SelectorError::NonSingularReference {
                selector: self.selector.to_string(),
                reference: reference.to_string(),
                levels: items.len(),
            });
        }
        let item = items.remove(0);
        if item.any_level() != any_level {
            return Err(SelectorError::IncompatibleLevels {
                selector: self.selector.to_string(),
            });
        }
        Ok(Some(item))
    }

    /// Position of the `]` closing the bracket opened at `open`
    fn bracket_end(&self, bytes: &[u8], open: usize) -> Result<usize, SelectorError> {
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        for (i, &b) in bytes.iter().enumerate().skip(open) {
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'\'' | b'"') => quote = Some(b),
                (None, b'[') => depth += 1,
                (None, b']') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            }
        }
        Err(self.syntax("unbalanced brackets"))
    }

    /// Index condition, or `None` when `inner` is an attribute expression
    fn parse_index(&self, inner: &str) -> Result<Option<IndexCondition>, SelectorError> {
        match inner {
            "even()" => return Ok(Some(IndexCondition::Even)),
            "odd()" => return Ok(Some(IndexCondition::Odd)),
            _ => {}
        }

        let (comparison, digits) = match inner.as_bytes()[0] {
            b'<' | b'>' => (Some(inner.as_bytes()[0]), inner[1..].trim()),
            _ => (None, inner),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return match comparison {
                Some(_) => Err(self.syntax(format!("invalid index \"{}\"", inner))),
                None => Ok(None),
            };
        }
        let n: usize = digits
            .parse()
            .map_err(|_| self.syntax(format!("index out of range \"{}\"", inner)))?;

        Ok(Some(match comparison {
            Some(b'<') => IndexCondition::LessThan(n),
            Some(_) => IndexCondition::MoreThan(n),
            None => IndexCondition::Value(n),
        }))
    }

    fn parse_attribute_expr(&self, inner: &str) -> Result<AttributeCondition, SelectorError> {
        let mut parser = ConditionParser::new(inner, self);
        let condition = parser.parse_or_expr()?;
        if parser.current != Token::Eof {
            return Err(parser.unexpected());
        }
        Ok(condition)
    }

    fn unquote<'a>(&self, argument: &'a str) -> Result<&'a str, SelectorError> {
        let bytes = argument.as_bytes();
        match bytes {
            [q @ (b'\'' | b'"'), .., last] if bytes.len() >= 2 && last == q => {
                Ok(&argument[1..argument.len() - 1])
            }
            _ => Err(self.syntax(format!("expected a quoted name, found {}", argument))),
        }
    }
}

#[inline]
fn is_name_start_byte(b: u8) -> bool {
    b.is_ascii_alphabetic() || matches!(b, b'_' | b':') || b >= 0x80
}

fn and_maybe(existing: Option<AttributeCondition>, condition: AttributeCondition) -> AttributeCondition {
    match existing {
        Some(existing) => existing.and(condition),
        None => condition,
    }
}

/// Recursive-descent parser over attribute expression tokens
struct ConditionParser<'a, 's> {
    lexer: Lexer<'a>,
    current: Token,
    owner: &'a SelectorParser<'s>,
}

impl<'a, 's> ConditionParser<'a, 's> {
    fn new(input: &'a str, owner: &'a SelectorParser<'s>) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        ConditionParser {
            lexer,
            current,
            owner,
        }
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    fn unexpected(&self) -> SelectorError {
        let found = match &self.current {
            Token::Eof => "end of expression".to_string(),
            Token::Invalid(c) => format!("'{}'", c),
            Token::Name(s) | Token::Number(s) => format!("\"{}\"", s),
            Token::String(s) => format!("'{}'", s),
            other => format!("{:?}", other),
        };
        self.owner
            .syntax(format!("unexpected {} in attribute expression", found))
    }

    fn parse_or_expr(&mut self) -> Result<AttributeCondition, SelectorError> {
        let mut left = self.parse_and_expr()?;

        while matches!(self.current, Token::Or) {
            self.advance();
            let right = self.parse_and_expr()?;
            left = left.or(right);
        }

        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<AttributeCondition, SelectorError> {
        let mut left = self.parse_primary()?;

        while matches!(self.current, Token::And) {
            self.advance();
            let right = self.parse_primary()?;
            left = left.and(right);
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<AttributeCondition, SelectorError> {
        match self.current {
            Token::LeftParen => {
                self.advance();
                let inner = self.parse_or_expr()?;
                if self.current != Token::RightParen {
                    return Err(self.unexpected());
                }
                self.advance();
                Ok(inner)
            }
            Token::Not => {
                self.advance();
                let name = self.parse_name()?;
                Ok(AttributeCondition::simple(name, AttributeOperator::NotExists, ""))
            }
            _ => {
                let name = self.parse_name()?;
                let operator = match self.current {
                    Token::Eq => AttributeOperator::Equals,
                    Token::NotEq => AttributeOperator::NotEquals,
                    Token::StartsWith => AttributeOperator::StartsWith,
                    Token::EndsWith => AttributeOperator::EndsWith,
                    Token::Contains => AttributeOperator::Contains,
                    _ => return Ok(AttributeCondition::simple(name, AttributeOperator::Exists, "")),
                };
                self.advance();
                let value = match std::mem::replace(&mut self.current, Token::Eof) {
                    Token::String(s) | Token::Name(s) | Token::Number(s) => s,
                    other => {
                        self.current = other;
                        return Err(self.unexpected());
                    }
                };
                self.advance();
                Ok(AttributeCondition::simple(name, operator, value))
            }
        }
    }

    /// Attribute name with optional leading `@`
    fn parse_name(&mut self) -> Result<String, SelectorError> {
        if self.current == Token::At {
            self.advance();
        }
        match &self.current {
            Token::Name(name) => {
                let name = self.owner.fold(name);
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }
}
