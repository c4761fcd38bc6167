use crate::domain::CanonicalContact;
use crate::error::CoreError;

/// A display-name template such as `{lastname}, {firstname}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NameRule {
    template: String,
    tokens: Vec<String>,
}

impl NameRule {
    pub(crate) fn parse(template: &str) -> Result<Self, CoreError> {
        let tokens: Vec<String> = Segments::new(template)
            .filter_map(|segment| match segment {
                Segment::Token(token) => Some(token.to_string()),
                Segment::Literal(_) => None,
            })
            .collect();
        if tokens.is_empty() {
            return Err(CoreError::InvalidNameRule(template.to_string()));
        }
        Ok(Self {
            template: template.to_string(),
            tokens,
        })
    }

    /// Fills the template, or `None` when any token has no value.
    pub(crate) fn apply(&self, contact: &CanonicalContact) -> Option<String> {
        if self.tokens.iter().any(|token| contact.field(token).is_none()) {
            return None;
        }
        let mut out = String::with_capacity(self.template.len());
        for segment in Segments::new(&self.template) {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Token(token) => out.push_str(contact.field(token)?),
            }
        }
        Some(out)
    }
}

pub(crate) fn parse_rules(templates: &[String]) -> Result<Vec<NameRule>, CoreError> {
    templates.iter().map(|template| NameRule::parse(template)).collect()
}

pub(crate) fn synthesize(rules: &[NameRule], contact: &CanonicalContact) -> Option<String> {
    rules.iter().find_map(|rule| rule.apply(contact))
}

enum Segment<'a> {
    Literal(&'a str),
    Token(&'a str),
}

/// Splits a template into literal text and `{token}` segments. An unclosed
/// or empty brace pair is literal text.
struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Segments<'a> {
    fn new(template: &'a str) -> Self {
        Self { rest: template }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        if let Some(after_open) = self.rest.strip_prefix('{') {
            if let Some(close) = after_open.find('}') {
                if close > 0 && !after_open[..close].contains('{') {
                    let token = &after_open[..close];
                    self.rest = &after_open[close + 1..];
                    return Some(Segment::Token(token));
                }
            }
            let literal = &self.rest[..1];
            self.rest = &self.rest[1..];
            return Some(Segment::Literal(literal));
        }
        let end = self.rest.find('{').unwrap_or(self.rest.len());
        let literal = &self.rest[..end];
        self.rest = &self.rest[end..];
        Some(Segment::Literal(literal))
    }
}
