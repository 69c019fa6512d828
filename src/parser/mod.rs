//! A pull parser producing structural events.
//!
//! [`PullParser`] is a hand-rolled recursive descent parser over a string
//! slice, advancing one structural event per call. It is the crate's
//! built-in implementation of the [`XmlSource`] contract that the deferred
//! builder consumes; any other event producer can stand in for it.
//!
//! The parser is hand-rolled (not combinator-based) because pull-style
//! parsing requires suspendable state: each `next_event` call must leave
//! the cursor exactly one structural step further.

pub(crate) mod input;

use std::any::Any;
use std::collections::VecDeque;

use crate::error::ParseError;
use crate::stream::{StreamEvent, XmlSource};

use input::{split_name, NamespaceResolver, ParserInput, Reference};

const DEFAULT_MAX_DEPTH: u32 = 256;
const DEFAULT_MAX_NAME_LENGTH: usize = 50_000;

/// Parse options controlling parser behavior and security limits.
///
/// Use the builder pattern to configure options:
///
/// ```
/// use oxiom::parser::ParseOptions;
///
/// let opts = ParseOptions::default().max_depth(128);
/// ```
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Maximum element nesting depth (default: 256).
    pub max_depth: u32,
    /// Maximum length in bytes of an element or attribute name
    /// (default: 50,000).
    pub max_name_length: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
        }
    }
}

impl ParseOptions {
    /// Sets the maximum element nesting depth.
    #[must_use]
    pub fn max_depth(mut self, max: u32) -> Self {
        self.max_depth = max;
        self
    }

    /// Sets the maximum element/attribute name length in bytes.
    #[must_use]
    pub fn max_name_length(mut self, max: usize) -> Self {
        self.max_name_length = max;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Prolog,
    Content,
    Epilog,
    Finished,
}

/// A pull-based streaming XML parser.
///
/// # Examples
///
/// ```
/// use oxiom::parser::PullParser;
/// use oxiom::stream::{StreamEvent, XmlSource};
///
/// let mut parser = PullParser::new("<doc>text</doc>");
/// let mut names = Vec::new();
/// while let Some(event) = parser.next_event().unwrap() {
///     if let StreamEvent::StartElement { local_name, .. } = event {
///         names.push(local_name);
///     }
/// }
/// assert_eq!(names, vec!["doc"]);
/// ```
pub struct PullParser<'a> {
    input: ParserInput<'a>,
    ns: NamespaceResolver,
    /// Events already produced by the last parsing step, drained before the
    /// cursor moves again.
    queue: VecDeque<StreamEvent>,
    stage: Stage,
    /// Open element names (as written), for end-tag matching.
    element_stack: Vec<String>,
    /// The encoding the raw input was decoded from, if the caller decoded
    /// bytes before handing the text over.
    input_encoding: Option<String>,
    /// The first failure; replayed on any further advance.
    failure: Option<ParseError>,
}

impl<'a> PullParser<'a> {
    /// Creates a parser over a string slice with default options.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self::with_options(text, &ParseOptions::default())
    }

    /// Creates a parser with custom options.
    #[must_use]
    pub fn with_options(text: &'a str, options: &ParseOptions) -> Self {
        // A leading BOM is encoding metadata, not content.
        let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
        Self {
            input: ParserInput::new(text, options.max_depth, options.max_name_length),
            ns: NamespaceResolver::new(),
            queue: VecDeque::new(),
            stage: Stage::Start,
            element_stack: Vec::new(),
            input_encoding: None,
            failure: None,
        }
    }

    /// Records the encoding the input was decoded from; surfaced in the
    /// [`StreamEvent::StartDocument`] event.
    #[must_use]
    pub fn with_input_encoding(mut self, encoding: &str) -> Self {
        self.input_encoding = Some(encoding.to_string());
        self
    }

    fn step(&mut self) -> Result<Option<StreamEvent>, ParseError> {
        if let Some(event) = self.queue.pop_front() {
            return Ok(Some(event));
        }
        match self.stage {
            Stage::Start => self.read_start(),
            Stage::Prolog => self.read_prolog(),
            Stage::Content => self.read_content(),
            Stage::Epilog => self.read_epilog(),
            Stage::Finished => Ok(None),
        }
    }

    fn read_start(&mut self) -> Result<Option<StreamEvent>, ParseError> {
        self.stage = Stage::Prolog;
        let mut version = None;
        let mut encoding = None;
        let mut standalone = None;
        if self.input.looking_at(b"<?xml ")
            || self.input.looking_at(b"<?xml\t")
            || self.input.looking_at(b"<?xml\r")
            || self.input.looking_at(b"<?xml\n")
            || self.input.looking_at(b"<?xml?>")
        {
            self.input.expect_str(b"<?xml")?;
            while {
                self.input.skip_whitespace();
                !self.input.looking_at(b"?>")
            } {
                let name = self.input.parse_name()?;
                self.input.skip_whitespace();
                self.input.expect_byte(b'=')?;
                self.input.skip_whitespace();
                let value = self.input.parse_quoted_value()?;
                match name.as_str() {
                    "version" => version = Some(value),
                    "encoding" => encoding = Some(value),
                    "standalone" => match value.as_str() {
                        "yes" => standalone = Some(true),
                        "no" => standalone = Some(false),
                        _ => {
                            return Err(self
                                .input
                                .fatal("standalone must be 'yes' or 'no'"))
                        }
                    },
                    _ => {
                        return Err(self
                            .input
                            .fatal(format!("unexpected '{name}' in XML declaration")))
                    }
                }
            }
            self.input.expect_str(b"?>")?;
        }
        Ok(Some(StreamEvent::StartDocument {
            version,
            encoding,
            standalone,
            input_encoding: self.input_encoding.clone(),
        }))
    }

    fn read_prolog(&mut self) -> Result<Option<StreamEvent>, ParseError> {
        self.input.skip_whitespace();
        if self.input.at_end() {
            return Err(self.input.fatal("expected a root element"));
        }
        if self.input.looking_at(b"<!DOCTYPE") {
            return self.parse_doctype().map(Some);
        }
        if self.input.looking_at(b"<!--") {
            return self.parse_comment().map(Some);
        }
        if self.input.looking_at(b"<?") {
            return self.parse_processing_instruction().map(Some);
        }
        if self.input.peek() == Some(b'<')
            && self.input.peek_at(1).is_some_and(|b| b != b'!' && b != b'?')
        {
            return self.parse_start_tag().map(Some);
        }
        Err(self.input.fatal("expected a root element"))
    }

    fn read_content(&mut self) -> Result<Option<StreamEvent>, ParseError> {
        if self.input.at_end() {
            let unclosed = self
                .element_stack
                .last()
                .cloned()
                .unwrap_or_default();
            return Err(self
                .input
                .fatal(format!("unexpected end of input inside <{unclosed}>")));
        }
        if self.input.looking_at(b"</") {
            return self.parse_end_tag().map(Some);
        }
        if self.input.looking_at(b"<![CDATA[") {
            return self.parse_cdata().map(Some);
        }
        if self.input.looking_at(b"<!--") {
            return self.parse_comment().map(Some);
        }
        if self.input.looking_at(b"<?") {
            return self.parse_processing_instruction().map(Some);
        }
        if self.input.peek() == Some(b'<')
            && self.input.peek_at(1).is_some_and(|b| b != b'!' && b != b'?')
        {
            return self.parse_start_tag().map(Some);
        }
        // Any other '<' (a lone trailing '<', or an '<!...' that is neither
        // a comment nor CDATA) is not character data; handing it to
        // parse_char_data would make no progress.
        if self.input.peek() == Some(b'<') {
            return Err(self.input.fatal("unsupported or malformed markup"));
        }
        self.parse_char_data().map(Some)
    }

    fn read_epilog(&mut self) -> Result<Option<StreamEvent>, ParseError> {
        self.input.skip_whitespace();
        if self.input.at_end() {
            self.stage = Stage::Finished;
            return Ok(Some(StreamEvent::EndDocument));
        }
        if self.input.looking_at(b"<!--") {
            return self.parse_comment().map(Some);
        }
        if self.input.looking_at(b"<?") {
            return self.parse_processing_instruction().map(Some);
        }
        Err(self.input.fatal("content not allowed after the root element"))
    }

    fn parse_start_tag(&mut self) -> Result<StreamEvent, ParseError> {
        self.input.increment_depth()?;
        self.input.expect_byte(b'<')?;
        let name = self.input.parse_name()?;

        let mut raw_attrs: Vec<(String, String)> = Vec::new();
        loop {
            let had_ws = self.input.skip_whitespace();
            if self.input.peek() == Some(b'>') || self.input.looking_at(b"/>") {
                break;
            }
            if !had_ws {
                return Err(self.input.fatal("whitespace required between attributes"));
            }
            let attr_name = self.input.parse_name()?;
            if raw_attrs.iter().any(|(existing, _)| *existing == attr_name) {
                return Err(self
                    .input
                    .fatal(format!("duplicate attribute '{attr_name}'")));
            }
            self.input.skip_whitespace();
            self.input.expect_byte(b'=')?;
            self.input.skip_whitespace();
            let attr_value = self.input.parse_attribute_value()?;
            raw_attrs.push((attr_name, attr_value));
        }

        self.ns.push_scope();
        for (attr_name, attr_value) in &raw_attrs {
            if attr_name == "xmlns" {
                self.ns.bind(None, attr_value.clone());
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                self.ns.bind(Some(prefix.to_string()), attr_value.clone());
            }
        }

        let (prefix, local_name) = split_name(&name);
        let namespace_uri = self.ns.resolve(prefix).map(str::to_string);
        if prefix.is_some() && namespace_uri.is_none() {
            return Err(self.input.fatal(format!(
                "prefix '{}' is not bound to a namespace",
                prefix.unwrap_or_default()
            )));
        }

        let start = StreamEvent::StartElement {
            namespace_uri,
            local_name: local_name.to_string(),
            prefix: prefix.map(str::to_string),
        };

        for (attr_name, attr_value) in &raw_attrs {
            if attr_name == "xmlns" {
                self.queue.push_back(StreamEvent::NamespaceDeclaration {
                    prefix: None,
                    namespace_uri: attr_value.clone(),
                });
            } else if let Some(decl_prefix) = attr_name.strip_prefix("xmlns:") {
                self.queue.push_back(StreamEvent::NamespaceDeclaration {
                    prefix: Some(decl_prefix.to_string()),
                    namespace_uri: attr_value.clone(),
                });
            } else {
                let (attr_prefix, attr_local) = split_name(attr_name);
                let attr_ns = attr_prefix
                    .and_then(|p| self.ns.resolve(Some(p)))
                    .map(str::to_string);
                if attr_prefix.is_some() && attr_ns.is_none() {
                    return Err(self.input.fatal(format!(
                        "prefix '{}' is not bound to a namespace",
                        attr_prefix.unwrap_or_default()
                    )));
                }
                self.queue.push_back(StreamEvent::Attribute {
                    namespace_uri: attr_ns,
                    local_name: attr_local.to_string(),
                    prefix: attr_prefix.map(str::to_string),
                    value: attr_value.clone(),
                });
            }
        }
        self.queue.push_back(StreamEvent::AttributesCompleted);

        let is_empty = self.input.looking_at(b"/>");
        if is_empty {
            self.input.advance(2);
            self.queue.push_back(StreamEvent::EndElement);
            self.ns.pop_scope();
            self.input.decrement_depth();
            if self.element_stack.is_empty() {
                self.stage = Stage::Epilog;
            }
        } else {
            self.input.expect_byte(b'>')?;
            self.element_stack.push(name);
            self.stage = Stage::Content;
        }

        Ok(start)
    }

    fn parse_end_tag(&mut self) -> Result<StreamEvent, ParseError> {
        self.input.expect_str(b"</")?;
        let name = self.input.parse_name()?;
        self.input.skip_whitespace();
        self.input.expect_byte(b'>')?;

        match self.element_stack.pop() {
            Some(expected) if expected == name => {}
            Some(expected) => {
                return Err(self.input.fatal(format!(
                    "mismatched end tag: expected </{expected}>, found </{name}>"
                )))
            }
            None => {
                return Err(self
                    .input
                    .fatal(format!("unexpected end tag </{name}>")))
            }
        }
        self.ns.pop_scope();
        self.input.decrement_depth();
        if self.element_stack.is_empty() {
            self.stage = Stage::Epilog;
        }
        Ok(StreamEvent::EndElement)
    }

    fn parse_char_data(&mut self) -> Result<StreamEvent, ParseError> {
        let mut text = String::new();
        loop {
            let rest = self.input.rest();
            match memchr::memchr3(b'<', b'&', b']', rest) {
                None => {
                    let start = self.input.pos();
                    self.input.advance(rest.len());
                    text.push_str(self.input.slice(start, self.input.pos()));
                    break;
                }
                Some(offset) => {
                    let start = self.input.pos();
                    self.input.advance(offset);
                    text.push_str(self.input.slice(start, self.input.pos()));
                    match self.input.peek() {
                        Some(b'<') => break,
                        Some(b'&') => match self.input.parse_reference()? {
                            Reference::Char(c) => text.push(c),
                            Reference::Entity(name) => {
                                // Surface the unexpanded reference as its
                                // own event, after any accumulated text.
                                let reference = StreamEvent::EntityReference {
                                    name,
                                    replacement_text: None,
                                };
                                if text.is_empty() {
                                    return Ok(reference);
                                }
                                self.queue.push_back(reference);
                                return Ok(character_data(text));
                            }
                        },
                        Some(b']') => {
                            if self.input.looking_at(b"]]>") {
                                return Err(self
                                    .input
                                    .fatal("']]>' not allowed in character data"));
                            }
                            text.push(']');
                            self.input.advance(1);
                        }
                        None => break,
                        Some(_) => unreachable!(
                            "memchr3 only matches b'<', b'&', or b']'"
                        ),
                    }
                }
            }
        }
        Ok(character_data(text))
    }

    fn parse_comment(&mut self) -> Result<StreamEvent, ParseError> {
        self.input.expect_str(b"<!--")?;
        let start = self.input.pos();
        match memchr::memmem::find(self.input.rest(), b"-->") {
            Some(offset) => {
                self.input.advance(offset);
                let data = self.input.slice(start, self.input.pos()).to_string();
                if data.contains("--") {
                    return Err(self.input.fatal("'--' not allowed inside a comment"));
                }
                self.input.advance(3);
                Ok(StreamEvent::Comment { data })
            }
            None => Err(self.input.fatal("unterminated comment")),
        }
    }

    fn parse_cdata(&mut self) -> Result<StreamEvent, ParseError> {
        self.input.expect_str(b"<![CDATA[")?;
        let start = self.input.pos();
        match memchr::memmem::find(self.input.rest(), b"]]>") {
            Some(offset) => {
                self.input.advance(offset);
                let data = self.input.slice(start, self.input.pos()).to_string();
                self.input.advance(3);
                Ok(StreamEvent::CDataSection { data })
            }
            None => Err(self.input.fatal("unterminated CDATA section")),
        }
    }

    fn parse_processing_instruction(&mut self) -> Result<StreamEvent, ParseError> {
        self.input.expect_str(b"<?")?;
        let target = self.input.parse_name()?;
        if target.eq_ignore_ascii_case("xml") {
            return Err(self
                .input
                .fatal("the 'xml' target is reserved for the XML declaration"));
        }
        let had_ws = self.input.skip_whitespace();
        let start = self.input.pos();
        match memchr::memmem::find(self.input.rest(), b"?>") {
            Some(offset) => {
                self.input.advance(offset);
                let data = self.input.slice(start, self.input.pos());
                let data = (had_ws && !data.is_empty()).then(|| data.to_string());
                self.input.advance(2);
                Ok(StreamEvent::ProcessingInstruction { target, data })
            }
            None => Err(self.input.fatal("unterminated processing instruction")),
        }
    }

    fn parse_doctype(&mut self) -> Result<StreamEvent, ParseError> {
        self.input.expect_str(b"<!DOCTYPE")?;
        self.input.skip_whitespace_required()?;
        let root_name = self.input.parse_name()?;
        self.input.skip_whitespace();

        let mut public_id = None;
        let mut system_id = None;
        if self.input.looking_at(b"SYSTEM") {
            self.input.expect_str(b"SYSTEM")?;
            self.input.skip_whitespace_required()?;
            system_id = Some(self.input.parse_quoted_value()?);
            self.input.skip_whitespace();
        } else if self.input.looking_at(b"PUBLIC") {
            self.input.expect_str(b"PUBLIC")?;
            self.input.skip_whitespace_required()?;
            public_id = Some(self.input.parse_quoted_value()?);
            self.input.skip_whitespace_required()?;
            system_id = Some(self.input.parse_quoted_value()?);
            self.input.skip_whitespace();
        }

        let mut internal_subset = None;
        if self.input.peek() == Some(b'[') {
            self.input.advance(1);
            let start = self.input.pos();
            // A ']' inside a quoted literal (an entity value, a system id)
            // does not close the subset.
            let mut quote: Option<u8> = None;
            let mut end = None;
            for (offset, &b) in self.input.rest().iter().enumerate() {
                match quote {
                    Some(q) if b == q => quote = None,
                    Some(_) => {}
                    None => match b {
                        b'"' | b'\'' => quote = Some(b),
                        b']' => {
                            end = Some(offset);
                            break;
                        }
                        _ => {}
                    },
                }
            }
            match end {
                Some(offset) => {
                    self.input.advance(offset);
                    internal_subset =
                        Some(self.input.slice(start, self.input.pos()).to_string());
                    self.input.advance(1);
                    self.input.skip_whitespace();
                }
                None => return Err(self.input.fatal("unterminated internal subset")),
            }
        }
        self.input.expect_byte(b'>')?;

        Ok(StreamEvent::DocumentTypeDeclaration {
            root_name,
            public_id,
            system_id,
            internal_subset,
        })
    }
}

fn character_data(text: String) -> StreamEvent {
    let ignorable = text
        .bytes()
        .all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'));
    StreamEvent::CharacterData {
        data: text,
        ignorable,
    }
}

impl XmlSource for PullParser<'_> {
    fn next_event(&mut self) -> Result<Option<StreamEvent>, ParseError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        match self.step() {
            Ok(event) => Ok(event),
            Err(failure) => {
                self.failure = Some(failure.clone());
                Err(failure)
            }
        }
    }

    fn reader_property(&self, name: &str) -> Option<&dyn Any> {
        match name {
            "input-encoding" => self
                .input_encoding
                .as_ref()
                .map(|encoding| encoding as &dyn Any),
            _ => None,
        }
    }
}
