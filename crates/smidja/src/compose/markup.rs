//! # Markup — Declarative World Documents
//!
//! An XML-like element tree. The tag picks a recipe, attributes carry
//! component values, nesting makes parent/child entities:
//!
//! ```text
//! <?xml version="1.0"?>
//! <world>
//!   <!-- a ship with a turret on top -->
//!   <entity name="ship" transform="pos: 0 0 -5">
//!     <entity name="turret" transform.pos="0 1 0"/>
//!   </entity>
//!   <sequence name="intro" autoplay="true">
//!     <tween target="ship" attribute="transform.pos.y" to="2" duration="1"/>
//!     <pause duration="0.5"/>
//!   </sequence>
//! </world>
//! ```
//!
//! Supported: start/end and self-closing tags, single or double quoted
//! attribute values, the five predefined entities (`&lt;` `&gt;` `&amp;`
//! `&quot;` `&apos;`) plus numeric character references, comments, a prolog
//! and a doctype. Text content other than whitespace is rejected, since no
//! element carries text.
//!
//! The same tree deserializes from JSON:
//!
//! ```text
//! { "tag": "entity", "attributes": { "name": "ship" }, "children": [ ... ] }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One element of a world document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Recipe or keyword tag. Defaults to the `entity` recipe in JSON.
    #[serde(default = "default_tag")]
    pub tag: String,
    /// Attributes in document order.
    #[serde(default, with = "attribute_map")]
    pub attributes: Vec<(String, String)>,
    #[serde(default)]
    pub children: Vec<Element>,
    /// 1-based source line, 0 when not parsed from markup.
    #[serde(skip)]
    pub line: usize,
}

fn default_tag() -> String {
    super::DEFAULT_RECIPE.to_string()
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            line: 0,
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// First value of an attribute, matched by canonical name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        let key = crate::names::canonical(name);
        self.attributes
            .iter()
            .find(|(n, _)| crate::names::canonical(n) == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse a markup document into its top-level elements. A single `<world>`
/// root is unwrapped.
pub fn parse(source: &str) -> Result<Vec<Element>, ConfigError> {
    let mut parser = Parser { src: source, pos: 0 };
    let mut elements = Vec::new();
    loop {
        parser.skip_misc()?;
        if parser.at_end() {
            break;
        }
        if parser.peek() != Some('<') {
            return Err(parser.error("text outside of an element"));
        }
        elements.push(parser.element()?);
    }

    if let [root] = elements.as_slice() {
        if crate::names::canonical(&root.tag) == "world" {
            if !root.attributes.is_empty() {
                log::debug!("ignoring attributes on <world> root");
            }
            return Ok(elements.remove(0).children);
        }
    }
    Ok(elements)
}

/// Parse a JSON document: a single element object or an array of them. A
/// `world` root is unwrapped the same way markup is.
pub fn parse_json(source: &str) -> Result<Vec<Element>, ConfigError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Document {
        One(Element),
        Many(Vec<Element>),
    }

    let elements = match serde_json::from_str::<Document>(source)? {
        Document::One(root) if crate::names::canonical(&root.tag) == "world" => root.children,
        Document::One(root) => vec![root],
        Document::Many(elements) => elements,
    };
    Ok(elements)
}

// ── Parser ──────────────────────────────────────────────────────────

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), ConfigError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected `{token}`")))
        }
    }

    fn line_col(&self) -> (usize, usize) {
        let before = &self.src[..self.pos.min(self.src.len())];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before.chars().count(), |i| before[i + 1..].chars().count())
            + 1;
        (line, column)
    }

    fn error(&self, message: &str) -> ConfigError {
        let (line, column) = self.line_col();
        ConfigError::Markup {
            line,
            column,
            message: message.to_string(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn skip_until(&mut self, terminator: &str, what: &str) -> Result<(), ConfigError> {
        match self.rest().find(terminator) {
            Some(offset) => {
                self.pos += offset + terminator.len();
                Ok(())
            }
            None => Err(self.error(&format!("unterminated {what}"))),
        }
    }

    /// Skip whitespace, comments, prolog and doctype.
    fn skip_misc(&mut self) -> Result<(), ConfigError> {
        loop {
            self.skip_whitespace();
            if self.eat("<!--") {
                self.skip_until("-->", "comment")?;
            } else if self.eat("<?") {
                self.skip_until("?>", "processing instruction")?;
            } else if self.eat("<!") {
                self.skip_until(">", "declaration")?;
            } else {
                return Ok(());
            }
        }
    }

    fn name(&mut self) -> Result<String, ConfigError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
        {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected a name"));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn element(&mut self) -> Result<Element, ConfigError> {
        let (line, _) = self.line_col();
        self.expect("<")?;
        let tag = self.name()?;
        let mut element = Element::new(&tag);
        element.line = line;

        loop {
            self.skip_whitespace();
            if self.eat("/>") {
                return Ok(element);
            }
            if self.eat(">") {
                break;
            }
            if self.at_end() {
                return Err(self.error(&format!("unterminated <{tag}> tag")));
            }
            let name = self.name()?;
            self.skip_whitespace();
            self.expect("=")?;
            self.skip_whitespace();
            let value = self.quoted()?;
            if element.attributes.iter().any(|(n, _)| *n == name) {
                return Err(self.error(&format!("duplicate attribute `{name}` on <{tag}>")));
            }
            element.attributes.push((name, value));
        }

        loop {
            self.skip_misc()?;
            if self.at_end() {
                return Err(self.error(&format!("<{tag}> is never closed")));
            }
            if self.eat("</") {
                let closing = self.name()?;
                if closing != tag {
                    return Err(
                        self.error(&format!("expected </{tag}>, found </{closing}>"))
                    );
                }
                self.skip_whitespace();
                self.expect(">")?;
                return Ok(element);
            }
            if self.peek() == Some('<') {
                element.children.push(self.element()?);
            } else {
                return Err(self.error(&format!("unexpected text inside <{tag}>")));
            }
        }
    }

    fn quoted(&mut self) -> Result<String, ConfigError> {
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected a quoted attribute value")),
        };
        self.bump();
        let start = self.pos;
        let Some(len) = self.rest().find(quote) else {
            return Err(self.error("unterminated attribute value"));
        };
        self.pos += len + 1;
        let raw = &self.src[start..start + len];
        decode_entities(raw).map_err(|reason| {
            let (line, column) = self.line_col();
            ConfigError::Markup {
                line,
                column,
                message: reason,
            }
        })
    }
}

fn decode_entities(raw: &str) -> Result<String, String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| format!("unterminated entity in `{raw}`"))?;
        let entity = &after[..semi];
        let ch = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32)
                    .ok_or_else(|| format!("unknown entity `&{entity};`"))?
            }
        };
        out.push(ch);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Serialize attributes as a JSON object while keeping document order.
mod attribute_map {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        attributes: &[(String, String)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(attributes.len()))?;
        for (name, value) in attributes {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, String)>, D::Error> {
        struct AttributeVisitor;

        impl<'de> Visitor<'de> for AttributeVisitor {
            type Value = Vec<(String, String)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of attribute names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut attributes = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    attributes.push((name, value));
                }
                Ok(attributes)
            }
        }

        deserializer.deserialize_map(AttributeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_elements_and_attributes() {
        let doc = r#"
            <?xml version="1.0"?>
            <world>
              <!-- comment -->
              <entity name="ship" transform='pos: 0 0 -5'>
                <entity name="turret"/>
              </entity>
              <light/>
            </world>
        "#;
        let elements = parse(doc).unwrap();
        assert_eq!(elements.len(), 2);
        let ship = &elements[0];
        assert_eq!(ship.tag, "entity");
        assert_eq!(ship.attribute("name"), Some("ship"));
        assert_eq!(ship.attribute("transform"), Some("pos: 0 0 -5"));
        assert_eq!(ship.children.len(), 1);
        assert_eq!(ship.children[0].attribute("name"), Some("turret"));
        assert_eq!(elements[1].tag, "light");
        assert_eq!(ship.line, 5);
    }

    #[test]
    fn entities_are_decoded() {
        let elements = parse(r#"<label text="a &lt; b &amp;&#x41;"/>"#).unwrap();
        assert_eq!(elements[0].attribute("text"), Some("a < b &A"));
    }

    #[test]
    fn mismatched_close_reports_position() {
        let err = parse("<a>\n  <b></a>").unwrap_err();
        match err {
            ConfigError::Markup { line, message, .. } => {
                assert_eq!(line, 2);
                assert!(message.contains("</b>"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn malformed_documents_are_rejected() {
        for doc in [
            "<a",
            "<a>",
            "<a b=c/>",
            "<a b=\"1\" b=\"2\"/>",
            "<a>text</a>",
            "loose text",
            "<!-- never closed",
        ] {
            assert!(
                matches!(parse(doc), Err(ConfigError::Markup { .. })),
                "accepted {doc:?}"
            );
        }
    }

    #[test]
    fn json_keeps_attribute_order() {
        let json = r#"{
            "tag": "world",
            "children": [
                { "tag": "entity", "attributes": { "z": "1", "a": "2" },
                  "children": [ { "tag": "entity" } ] }
            ]
        }"#;
        let elements = parse_json(json).unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(
            elements[0].attributes,
            vec![("z".to_string(), "1".to_string()), ("a".to_string(), "2".to_string())]
        );
        assert_eq!(elements[0].children.len(), 1);
    }

    #[test]
    fn json_without_tag_is_an_entity() {
        let elements =
            parse_json(r#"[ { "attributes": { "name": "crate" } }, { "tag": "light" } ]"#).unwrap();
        assert_eq!(elements[0].tag, "entity");
        assert_eq!(elements[0].attribute("name"), Some("crate"));
        assert_eq!(elements[1].tag, "light");
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        assert!(matches!(parse_json("{ nope"), Err(ConfigError::Json(_))));
    }
}
