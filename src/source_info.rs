//! Declaration positions recovered from `.proto` text.
//!
//! The pure parser leaves `source_code_info` empty. [`attach`] scans the
//! source of a parsed file once and records where every declaration
//! starts, then writes those positions into the descriptor under the
//! usual descriptor paths so normalization reads them like protoc output.
//!
//! The text has already been accepted by the parser, so the scanner is
//! lenient: anything it does not recognize is skipped.

use protobuf::MessageField;
use protobuf::descriptor::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    ServiceDescriptorProto, SourceCodeInfo, source_code_info,
};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Identifiers, keywords, numbers and dotted type names
    Word(String),
    /// Quoted string literal, content dropped
    Str,
    Punct(char),
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    /// 0-based, as in `SourceCodeInfo`
    line: i32,
    column: i32,
}

fn lex(src: &str) -> Vec<Spanned> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    let mut line = 0i32;
    let mut column = 0i32;

    // Advances one char, keeping line and column in step.
    let step = |pos: &mut usize, line: &mut i32, column: &mut i32| {
        if chars[*pos] == '\n' {
            *line += 1;
            *column = 0;
        } else {
            *column += 1;
        }
        *pos += 1;
    };

    while pos < chars.len() {
        let c = chars[pos];

        // Line comment
        if c == '/' && chars.get(pos + 1) == Some(&'/') {
            while pos < chars.len() && chars[pos] != '\n' {
                step(&mut pos, &mut line, &mut column);
            }
            continue;
        }

        // Block comment
        if c == '/' && chars.get(pos + 1) == Some(&'*') {
            step(&mut pos, &mut line, &mut column);
            step(&mut pos, &mut line, &mut column);
            while pos < chars.len() {
                if chars[pos] == '*' && chars.get(pos + 1) == Some(&'/') {
                    step(&mut pos, &mut line, &mut column);
                    step(&mut pos, &mut line, &mut column);
                    break;
                }
                step(&mut pos, &mut line, &mut column);
            }
            continue;
        }

        if c.is_whitespace() {
            step(&mut pos, &mut line, &mut column);
            continue;
        }

        let (tok_line, tok_column) = (line, column);

        // String literal
        if c == '"' || c == '\'' {
            step(&mut pos, &mut line, &mut column);
            while pos < chars.len() && chars[pos] != c && chars[pos] != '\n' {
                if chars[pos] == '\\' && pos + 1 < chars.len() {
                    step(&mut pos, &mut line, &mut column);
                }
                step(&mut pos, &mut line, &mut column);
            }
            if pos < chars.len() && chars[pos] == c {
                step(&mut pos, &mut line, &mut column);
            }
            tokens.push(Spanned {
                token: Token::Str,
                line: tok_line,
                column: tok_column,
            });
            continue;
        }

        if is_word_char(c) {
            let start = pos;
            while pos < chars.len() && is_word_char(chars[pos]) {
                step(&mut pos, &mut line, &mut column);
            }
            tokens.push(Spanned {
                token: Token::Word(chars[start..pos].iter().collect()),
                line: tok_line,
                column: tok_column,
            });
            continue;
        }

        step(&mut pos, &mut line, &mut column);
        tokens.push(Spanned {
            token: Token::Punct(c),
            line: tok_line,
            column: tok_column,
        });
    }
    tokens
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// A declaration found in the text. Scopes are dotted paths of simple
/// names relative to the file, without the package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Message(String),
    Field(String, String),
    Oneof(String, String),
    Enum(String),
    EnumValue(String, String),
    Service(String),
    Method(String, String),
    Extension(String, String),
}

#[derive(Debug, Clone)]
enum Block {
    File,
    Message(String),
    Oneof(String),
    /// `extend` block; holds the scope its extensions are declared in.
    Extend(String),
    Enum(String),
    Service(String),
}

impl Block {
    /// Scope in which nested messages and enums are declared.
    fn scope(&self) -> &str {
        match self {
            Block::File => "",
            Block::Message(path) | Block::Oneof(path) | Block::Extend(path) => path,
            Block::Enum(path) | Block::Service(path) => path,
        }
    }
}

fn join(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

struct Scanner {
    tokens: Vec<Spanned>,
    pos: usize,
    found: HashMap<Key, (i32, i32)>,
}

impl Scanner {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn word(&self) -> Option<&str> {
        match self.peek() {
            Some(Token::Word(w)) => Some(w.as_str()),
            _ => None,
        }
    }

    fn is_punct(&self, c: char) -> bool {
        self.peek() == Some(&Token::Punct(c))
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    /// Takes a word, or nothing when the next token is not one.
    fn take_word(&mut self) -> Option<String> {
        let word = self.word().map(str::to_string);
        if word.is_some() {
            self.advance();
        }
        word
    }

    fn record(&mut self, key: Key, start: usize) {
        if let Some(token) = self.tokens.get(start) {
            let at = (token.line, token.column);
            self.found.entry(key).or_insert(at);
        }
    }

    /// Skips to the end of the current statement: a `;` outside brackets,
    /// or a `{...}` body that closes at the outer level.
    fn skip_statement(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::Punct('(' | '[' | '<') => depth += 1,
                Token::Punct(')' | ']' | '>') => depth = depth.saturating_sub(1),
                Token::Punct(';') if depth == 0 => {
                    self.advance();
                    return;
                }
                Token::Punct('{') => {
                    self.skip_braces();
                    if depth == 0 {
                        return;
                    }
                    continue;
                }
                Token::Punct('}') if depth == 0 => return,
                _ => {}
            }
            self.advance();
        }
    }

    /// Skips a balanced `{...}` starting at the current `{`.
    fn skip_braces(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::Punct('{') => depth += 1,
                Token::Punct('}') => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skips up to and including the next `{` that opens a body.
    fn open_body(&mut self) -> bool {
        while let Some(token) = self.peek() {
            match token {
                Token::Punct('{') => {
                    self.advance();
                    return true;
                }
                Token::Punct(';' | '}') => return false,
                _ => self.advance(),
            }
        }
        false
    }

    fn block(&mut self, block: &Block) {
        while let Some(token) = self.peek() {
            if *token == Token::Punct('}') {
                self.advance();
                return;
            }
            let before = self.pos;
            self.statement(block);
            if self.pos == before {
                self.advance();
            }
        }
    }

    fn nested(&mut self, block: Block) {
        if self.open_body() {
            self.block(&block);
        }
    }

    fn statement(&mut self, block: &Block) {
        let start = self.pos;
        let Some(word) = self.word().map(str::to_string) else {
            if self.is_punct(';') {
                self.advance();
            } else {
                self.skip_statement();
            }
            return;
        };

        match (block, word.as_str()) {
            (
                _,
                "syntax" | "edition" | "package" | "import" | "option" | "reserved" | "extensions",
            ) => self.skip_statement(),
            (Block::Enum(path), _) => {
                self.record(Key::EnumValue(path.clone(), word.clone()), start);
                self.skip_statement();
            }
            (Block::Service(path), "rpc") => {
                self.advance();
                if let Some(name) = self.take_word() {
                    self.record(Key::Method(path.clone(), name), start);
                }
                self.skip_statement();
            }
            (Block::Service(_), _) => self.skip_statement(),
            (Block::File | Block::Message(_), "message" | "enum" | "service") => {
                self.advance();
                let Some(name) = self.take_word() else {
                    return self.skip_statement();
                };
                let path = join(block.scope(), &name);
                let (key, inner) = match word.as_str() {
                    "message" => (Key::Message(path.clone()), Block::Message(path)),
                    "enum" => (Key::Enum(path.clone()), Block::Enum(path)),
                    _ => (Key::Service(path.clone()), Block::Service(path)),
                };
                self.record(key, start);
                self.nested(inner);
            }
            (Block::File | Block::Message(_), "extend") => {
                self.advance();
                self.nested(Block::Extend(block.scope().to_string()));
            }
            (Block::Message(path), "oneof") => {
                self.advance();
                if let Some(name) = self.take_word() {
                    self.record(Key::Oneof(path.clone(), name), start);
                }
                self.nested(Block::Oneof(path.clone()));
            }
            _ => self.field(block, start),
        }
    }

    fn field(&mut self, block: &Block, start: usize) {
        if matches!(self.word(), Some("optional" | "required" | "repeated")) {
            self.advance();
        }
        let group = self.word() == Some("group");
        let map = self.word() == Some("map")
            && self.tokens.get(self.pos + 1).map(|t| &t.token) == Some(&Token::Punct('<'));
        // Type, `group` or `map`
        self.advance();
        if map {
            while !self.is_punct('>') && self.peek().is_some() {
                self.advance();
            }
            self.advance();
        }
        let Some(name) = self.take_word() else {
            return self.skip_statement();
        };

        // A group declares a field named after it in lower case, and a
        // message of the same name in the enclosing scope.
        let field_name = if group { name.to_lowercase() } else { name.clone() };
        let key = match block {
            Block::Extend(scope) => Key::Extension(scope.clone(), field_name),
            _ => Key::Field(block.scope().to_string(), field_name),
        };
        self.record(key, start);

        if group {
            let path = join(block.scope(), &name);
            self.record(Key::Message(path.clone()), start);
            self.nested(Block::Message(path));
        } else {
            self.skip_statement();
        }
    }
}

fn scan(src: &str) -> HashMap<Key, (i32, i32)> {
    let mut scanner = Scanner {
        tokens: lex(src),
        pos: 0,
        found: HashMap::new(),
    };
    while scanner.pos < scanner.tokens.len() {
        let before = scanner.pos;
        scanner.statement(&Block::File);
        if scanner.pos == before {
            scanner.advance();
        }
    }
    scanner.found
}

/// Fills `file.source_code_info` from `src`, the text `file` was parsed from.
pub fn attach(src: &str, file: &mut FileDescriptorProto) {
    let found = scan(src);
    let mut out = Locations {
        found: &found,
        locations: Vec::new(),
    };

    for (i, message) in file.message_type.iter().enumerate() {
        out.message(message, "", vec![4, i as i32]);
    }
    for (i, en) in file.enum_type.iter().enumerate() {
        out.enumeration(en, "", vec![5, i as i32]);
    }
    for (i, service) in file.service.iter().enumerate() {
        out.service(service, vec![6, i as i32]);
    }
    for (i, extension) in file.extension.iter().enumerate() {
        out.extension(extension, "", vec![7, i as i32]);
    }

    let mut info = SourceCodeInfo::new();
    info.location = out.locations;
    file.source_code_info = MessageField::some(info);
}

struct Locations<'f> {
    found: &'f HashMap<Key, (i32, i32)>,
    locations: Vec<source_code_info::Location>,
}

impl Locations<'_> {
    fn push(&mut self, key: &Key, path: Vec<i32>) {
        if let Some(&(line, column)) = self.found.get(key) {
            let mut location = source_code_info::Location::new();
            location.path = path;
            location.span = vec![line, column, column];
            self.locations.push(location);
        }
    }

    fn message(&mut self, message: &DescriptorProto, scope: &str, path: Vec<i32>) {
        let name = join(scope, message.name());
        self.push(&Key::Message(name.clone()), path.clone());

        let child = |field: i32, index: usize| {
            let mut child = path.clone();
            child.extend([field, index as i32]);
            child
        };
        for (i, field) in message.field.iter().enumerate() {
            self.push(&Key::Field(name.clone(), field.name().to_string()), child(2, i));
        }
        for (i, nested) in message.nested_type.iter().enumerate() {
            self.message(nested, &name, child(3, i));
        }
        for (i, en) in message.enum_type.iter().enumerate() {
            self.enumeration(en, &name, child(4, i));
        }
        for (i, extension) in message.extension.iter().enumerate() {
            self.extension(extension, &name, child(6, i));
        }
        for (i, oneof) in message.oneof_decl.iter().enumerate() {
            self.push(&Key::Oneof(name.clone(), oneof.name().to_string()), child(8, i));
        }
    }

    fn enumeration(&mut self, en: &EnumDescriptorProto, scope: &str, path: Vec<i32>) {
        let name = join(scope, en.name());
        self.push(&Key::Enum(name.clone()), path.clone());
        for (i, value) in en.value.iter().enumerate() {
            let mut child = path.clone();
            child.extend([2, i as i32]);
            self.push(&Key::EnumValue(name.clone(), value.name().to_string()), child);
        }
    }

    fn service(&mut self, service: &ServiceDescriptorProto, path: Vec<i32>) {
        let name = service.name().to_string();
        self.push(&Key::Service(name.clone()), path.clone());
        for (i, method) in service.method.iter().enumerate() {
            let mut child = path.clone();
            child.extend([2, i as i32]);
            self.push(&Key::Method(name.clone(), method.name().to_string()), child);
        }
    }

    fn extension(&mut self, extension: &FieldDescriptorProto, scope: &str, path: Vec<i32>) {
        self.push(
            &Key::Extension(scope.to_string(), extension.name().to_string()),
            path,
        );
    }
}
