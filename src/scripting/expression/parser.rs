//! Expression syntax tree, parser and name resolver
//!
//! The grammar is the expression subset of JavaScript that one-line
//! instructions use: literals, member access with optional chaining, calls,
//! arrow functions, the usual operators, assignment to plain names and comma
//! sequences. Statements, object literals and `function` are rejected.
//!
//! Parsing is followed by name resolution: every identifier must be an arrow
//! parameter, a name assigned somewhere in the instruction, or one of the
//! globals `task`, `now` and `moment`. Anything else fails to compile.

use regex::{Regex, RegexBuilder};

use super::lexer::{tokenize, Token, TokenKind};

/// Names bound by the evaluation environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Global {
    Task,
    Now,
    Moment,
}

impl Global {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "task" => Some(Global::Task),
            "now" => Some(Global::Now),
            "moment" => Some(Global::Moment),
            _ => None,
        }
    }
}

/// Where a name lives at run time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Unresolved,
    Global(Global),
    /// `depth` frames up from the current one, at `slot`
    Local { depth: usize, slot: usize },
}

#[derive(Debug, Clone)]
pub struct Name {
    pub name: String,
    pub offset: usize,
    pub binding: Binding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

/// A `/pattern/flags` literal, compiled when the instruction compiles
#[derive(Debug, Clone)]
pub struct RegexLiteral {
    pub source: String,
    pub flags: String,
    pub regex: Regex,
}

impl RegexLiteral {
    pub fn new(source: &str, flags: &str) -> Result<Self, String> {
        let mut builder = RegexBuilder::new(source);
        for flag in flags.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'g' | 'u' | 'y' => {}
                other => return Err(format!("invalid regular expression flag '{}'", other)),
            }
        }
        let regex = builder
            .build()
            .map_err(|e| format!("invalid regular expression /{}/: {}", source, e))?;
        Ok(Self {
            source: source.to_string(),
            flags: flags.to_string(),
            regex,
        })
    }

    pub fn is_global(&self) -> bool {
        self.flags.contains('g')
    }
}

#[derive(Debug, Clone)]
pub struct Arrow {
    pub params: Vec<String>,
    pub body: Expr,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
    Array(Vec<Expr>),
    Regex(Box<RegexLiteral>),
    Name(Name),
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        optional: bool,
    },
    /// Boundary of an optional chain; a short circuit inside yields `undefined`
    Chain(Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Assign {
        target: Name,
        value: Box<Expr>,
    },
    Sequence(Vec<Expr>),
    Arrow(Box<Arrow>),
}

/// A parsed and resolved instruction
#[derive(Debug, Clone)]
pub struct Program {
    pub body: Expr,
    /// Names assigned at instruction level, one slot each
    pub top_level: Vec<String>,
}

/// Syntax or name error at a character offset
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    pub offset: usize,
}

impl SyntaxError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Parses and resolves `source`
pub fn parse(source: &str) -> Result<Program, SyntaxError> {
    let tokens = tokenize(source).map_err(|e| SyntaxError::new(e.message, e.offset))?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
        height: 0,
    };
    if parser.peek().kind == TokenKind::Eof {
        return Err(SyntaxError::new("empty expression", 0));
    }
    let mut body = parser.sequence()?;
    let trailing = parser.peek();
    if !(trailing.kind == TokenKind::Eof || (trailing.is_punct(";") && parser.at_end_after_semicolons())) {
        return Err(SyntaxError::new(
            format!("unexpected {}", trailing.describe()),
            trailing.offset,
        ));
    }

    let top_level = collect_assigned(&body, &mut Vec::new())?;
    let mut scopes = vec![top_level.clone()];
    resolve(&mut body, &mut scopes)?;
    Ok(Program { body, top_level })
}

const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "function", "new", "var", "let", "const", "this", "return", "if", "else", "for", "while",
    "do", "class", "delete", "void", "in", "instanceof", "yield", "await", "async", "switch",
    "throw", "try", "catch", "import", "export",
];

/// Deepest nesting of parentheses, arrows and unary operators accepted
const MAX_NESTING: usize = 64;

/// Deepest syntax tree accepted, counting operator and call chains
pub const MAX_HEIGHT: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    nesting: usize,
    height: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + ahead).min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, p: &str) -> bool {
        if self.peek().is_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, p: &str) -> Result<Token, SyntaxError> {
        let token = self.peek().clone();
        if token.is_punct(p) {
            self.pos += 1;
            Ok(token)
        } else {
            Err(SyntaxError::new(
                format!("expected '{}' but found {}", p, token.describe()),
                token.offset,
            ))
        }
    }

    fn at_end_after_semicolons(&self) -> bool {
        self.tokens[self.pos..]
            .iter()
            .all(|t| t.is_punct(";") || t.kind == TokenKind::Eof)
    }

    fn sequence(&mut self) -> Result<Expr, SyntaxError> {
        let first = self.assignment()?;
        if !self.peek().is_punct(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(",") {
            items.push(self.assignment()?);
        }
        Ok(Expr::Sequence(items))
    }

    fn too_deep(&self) -> SyntaxError {
        SyntaxError::new("expression is nested too deeply", self.peek().offset)
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.nesting >= MAX_NESTING || self.height >= MAX_HEIGHT {
            return Err(self.too_deep());
        }
        self.nesting += 1;
        self.height += 1;
        let result = parse(self);
        self.nesting -= 1;
        self.height -= 1;
        result
    }

    /// Runs a left-associative loop; each [`wrap`](Self::wrap) inside it
    /// adds one level until the loop ends
    fn left_chain(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Expr, SyntaxError>,
    ) -> Result<Expr, SyntaxError> {
        let height = self.height;
        let result = parse(self);
        self.height = height;
        result
    }

    fn wrap(&mut self) -> Result<(), SyntaxError> {
        if self.height >= MAX_HEIGHT {
            return Err(self.too_deep());
        }
        self.height += 1;
        Ok(())
    }

    fn assignment(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(Self::assignment_inner)
    }

    fn assignment_inner(&mut self) -> Result<Expr, SyntaxError> {
        if let Some(params) = self.arrow_params() {
            return self.arrow(params);
        }

        let start = self.peek().offset;
        let target = self.conditional()?;
        if !self.peek().is_punct("=") {
            return Ok(target);
        }
        self.advance();
        match target {
            Expr::Name(name) => {
                let value = self.assignment()?;
                Ok(Expr::Assign {
                    target: name,
                    value: Box::new(value),
                })
            }
            _ => Err(SyntaxError::new("only plain names can be assigned to", start)),
        }
    }

    /// Detects `x =>` and `(a, b) =>`, returning the parameter names
    fn arrow_params(&self) -> Option<Vec<String>> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            return self
                .peek_at(1)
                .is_punct("=>")
                .then(|| vec![name.clone()]);
        }
        if !self.peek().is_punct("(") {
            return None;
        }
        let mut params = Vec::new();
        let mut ahead = 1;
        if self.peek_at(ahead).is_punct(")") {
            return self.peek_at(ahead + 1).is_punct("=>").then_some(params);
        }
        loop {
            match &self.peek_at(ahead).kind {
                TokenKind::Ident(name) => params.push(name.clone()),
                _ => return None,
            }
            ahead += 1;
            if self.peek_at(ahead).is_punct(",") {
                ahead += 1;
                continue;
            }
            if self.peek_at(ahead).is_punct(")") {
                return self.peek_at(ahead + 1).is_punct("=>").then_some(params);
            }
            return None;
        }
    }

    fn arrow(&mut self, params: Vec<String>) -> Result<Expr, SyntaxError> {
        // Skip the parameter list; `arrow_params` has validated it.
        while !self.peek().is_punct("=>") {
            self.advance();
        }
        let arrow = self.expect("=>")?;
        for (i, param) in params.iter().enumerate() {
            if UNSUPPORTED_KEYWORDS.contains(&param.as_str()) {
                return Err(SyntaxError::new(
                    format!("'{}' cannot be a parameter name", param),
                    arrow.offset,
                ));
            }
            if params[..i].contains(param) {
                return Err(SyntaxError::new(
                    format!("duplicate parameter '{}'", param),
                    arrow.offset,
                ));
            }
        }
        if self.peek().is_punct("{") {
            return Err(SyntaxError::new(
                "arrow functions with a block body are not supported",
                self.peek().offset,
            ));
        }
        let body = self.assignment()?;
        Ok(Expr::Arrow(Box::new(Arrow { params, body })))
    }

    fn conditional(&mut self) -> Result<Expr, SyntaxError> {
        let test = self.logical_or()?;
        if !self.eat("?") {
            return Ok(test);
        }
        let consequent = self.assignment()?;
        self.expect(":")?;
        let alternate = self.assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn logical_or(&mut self) -> Result<Expr, SyntaxError> {
        self.left_chain(|p| {
            let mut left = p.logical_and()?;
            loop {
                let op = if p.eat("||") {
                    LogicalOp::Or
                } else if p.eat("??") {
                    LogicalOp::Nullish
                } else {
                    return Ok(left);
                };
                p.wrap()?;
                let right = p.logical_and()?;
                left = Expr::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                };
            }
        })
    }

    fn logical_and(&mut self) -> Result<Expr, SyntaxError> {
        self.left_chain(|p| {
            let mut left = p.equality()?;
            while p.eat("&&") {
                p.wrap()?;
                let right = p.equality()?;
                left = Expr::Logical {
                    op: LogicalOp::And,
                    left: Box::new(left),
                    right: Box::new(right),
                };
            }
            Ok(left)
        })
    }

    fn binary_level(
        &mut self,
        ops: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, SyntaxError>,
    ) -> Result<Expr, SyntaxError> {
        self.left_chain(|p| {
            let mut left = next(p)?;
            'outer: loop {
                for (symbol, op) in ops {
                    if p.eat(symbol) {
                        p.wrap()?;
                        let right = next(p)?;
                        left = Expr::Binary {
                            op: *op,
                            left: Box::new(left),
                            right: Box::new(right),
                        };
                        continue 'outer;
                    }
                }
                return Ok(left);
            }
        })
    }

    fn equality(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(
            &[
                ("===", BinaryOp::StrictEq),
                ("!==", BinaryOp::StrictNe),
                ("==", BinaryOp::Eq),
                ("!=", BinaryOp::Ne),
            ],
            Self::relational,
        )
    }

    fn relational(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(
            &[
                ("<=", BinaryOp::Le),
                (">=", BinaryOp::Ge),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(
            &[
                ("*", BinaryOp::Mul),
                ("/", BinaryOp::Div),
                ("%", BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match &self.peek().kind {
            TokenKind::Punct("!") => UnaryOp::Not,
            TokenKind::Punct("-") => UnaryOp::Neg,
            TokenKind::Punct("+") => UnaryOp::Plus,
            TokenKind::Ident(name) if name == "typeof" => UnaryOp::TypeOf,
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.nested(Self::unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        self.left_chain(Self::postfix_chain)
    }

    fn postfix_chain(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.primary()?;
        let mut chained = false;
        loop {
            if [".", "?.", "[", "("].iter().any(|p| self.peek().is_punct(p)) {
                self.wrap()?;
            }
            if self.eat(".") {
                let property = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                    optional: false,
                };
            } else if self.eat("?.") {
                chained = true;
                if self.eat("(") {
                    let args = self.arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        optional: true,
                    };
                } else if self.eat("[") {
                    let index = self.sequence()?;
                    self.expect("]")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        optional: true,
                    };
                } else {
                    let property = self.property_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        optional: true,
                    };
                }
            } else if self.eat("[") {
                let index = self.sequence()?;
                self.expect("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    optional: false,
                };
            } else if self.eat("(") {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    optional: false,
                };
            } else {
                break;
            }
        }
        Ok(if chained {
            Expr::Chain(Box::new(expr))
        } else {
            expr
        })
    }

    fn property_name(&mut self) -> Result<String, SyntaxError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Ident(name) => Ok(name),
            _ => Err(SyntaxError::new(
                format!("expected a property name but found {}", token.describe()),
                token.offset,
            )),
        }
    }

    /// Parses call arguments after the opening parenthesis
    fn arguments(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut args = Vec::new();
        while !self.peek().is_punct(")") {
            args.push(self.assignment()?);
            if !self.eat(",") {
                break;
            }
        }
        self.expect(")")?;
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::Regex { pattern, flags } => RegexLiteral::new(&pattern, &flags)
                .map(|r| Expr::Regex(Box::new(r)))
                .map_err(|message| SyntaxError::new(message, token.offset)),
            TokenKind::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                "null" => Ok(Expr::Null),
                "undefined" => Ok(Expr::Undefined),
                "NaN" => Ok(Expr::Number(f64::NAN)),
                "Infinity" => Ok(Expr::Number(f64::INFINITY)),
                keyword if UNSUPPORTED_KEYWORDS.contains(&keyword) => Err(SyntaxError::new(
                    format!("'{}' is not supported in expressions", keyword),
                    token.offset,
                )),
                _ => Ok(Expr::Name(Name {
                    name,
                    offset: token.offset,
                    binding: Binding::Unresolved,
                })),
            },
            TokenKind::Punct("(") => {
                let inner = self.sequence()?;
                self.expect(")")?;
                Ok(inner)
            }
            TokenKind::Punct("[") => {
                let mut items = Vec::new();
                while !self.peek().is_punct("]") {
                    items.push(self.assignment()?);
                    if !self.eat(",") {
                        break;
                    }
                }
                self.expect("]")?;
                Ok(Expr::Array(items))
            }
            TokenKind::Punct("{") => Err(SyntaxError::new(
                "object literals are not supported",
                token.offset,
            )),
            _ => Err(SyntaxError::new(
                format!("unexpected {}", token.describe()),
                token.offset,
            )),
        }
    }
}

/// Names assigned outside any arrow parameter scope, in first-seen order
fn collect_assigned(expr: &Expr, params: &mut Vec<Vec<String>>) -> Result<Vec<String>, SyntaxError> {
    let mut names = Vec::new();
    walk_assigned(expr, params, &mut names)?;
    Ok(names)
}

fn walk_assigned(
    expr: &Expr,
    params: &mut Vec<Vec<String>>,
    names: &mut Vec<String>,
) -> Result<(), SyntaxError> {
    match expr {
        Expr::Assign { target, value } => {
            let is_param = params.iter().any(|scope| scope.contains(&target.name));
            if !is_param {
                if Global::lookup(&target.name).is_some() {
                    return Err(SyntaxError::new(
                        format!("cannot assign to '{}'", target.name),
                        target.offset,
                    ));
                }
                if !names.contains(&target.name) {
                    names.push(target.name.clone());
                }
            }
            walk_assigned(value, params, names)
        }
        Expr::Arrow(arrow) => {
            params.push(arrow.params.clone());
            let result = walk_assigned(&arrow.body, params, names);
            params.pop();
            result
        }
        other => {
            for child in children(other) {
                walk_assigned(child, params, names)?;
            }
            Ok(())
        }
    }
}

fn children(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::Number(_)
        | Expr::Str(_)
        | Expr::Bool(_)
        | Expr::Null
        | Expr::Undefined
        | Expr::Regex(_)
        | Expr::Name(_) => Vec::new(),
        Expr::Array(items) | Expr::Sequence(items) => items.iter().collect(),
        Expr::Member { object, .. } => vec![object],
        Expr::Index { object, index, .. } => vec![object, index],
        Expr::Call { callee, args, .. } => {
            let mut all = vec![callee.as_ref()];
            all.extend(args.iter());
            all
        }
        Expr::Chain(inner) => vec![inner],
        Expr::Unary { operand, .. } => vec![operand],
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => vec![left, right],
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => vec![test, consequent, alternate],
        Expr::Assign { value, .. } => vec![value],
        Expr::Arrow(arrow) => vec![&arrow.body],
    }
}

fn lookup(scopes: &[Vec<String>], name: &str) -> Option<Binding> {
    scopes.iter().rev().enumerate().find_map(|(depth, scope)| {
        scope
            .iter()
            .position(|n| n == name)
            .map(|slot| Binding::Local { depth, slot })
    })
}

fn resolve_name(name: &mut Name, scopes: &[Vec<String>]) -> Result<(), SyntaxError> {
    name.binding = match lookup(scopes, &name.name) {
        Some(binding) => binding,
        None => match Global::lookup(&name.name) {
            Some(global) => Binding::Global(global),
            None => {
                return Err(SyntaxError::new(
                    format!("unknown name '{}'", name.name),
                    name.offset,
                ))
            }
        },
    };
    Ok(())
}

fn resolve(expr: &mut Expr, scopes: &mut Vec<Vec<String>>) -> Result<(), SyntaxError> {
    match expr {
        Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Null | Expr::Undefined | Expr::Regex(_) => {
            Ok(())
        }
        Expr::Name(name) => resolve_name(name, scopes),
        Expr::Assign { target, value } => {
            resolve_name(target, scopes)?;
            resolve(value, scopes)
        }
        Expr::Arrow(arrow) => {
            scopes.push(arrow.params.clone());
            let result = resolve(&mut arrow.body, scopes);
            scopes.pop();
            result
        }
        Expr::Array(items) | Expr::Sequence(items) => {
            items.iter_mut().try_for_each(|item| resolve(item, scopes))
        }
        Expr::Member { object, .. } => resolve(object, scopes),
        Expr::Index { object, index, .. } => {
            resolve(object, scopes)?;
            resolve(index, scopes)
        }
        Expr::Call { callee, args, .. } => {
            resolve(callee, scopes)?;
            args.iter_mut().try_for_each(|arg| resolve(arg, scopes))
        }
        Expr::Chain(inner) => resolve(inner, scopes),
        Expr::Unary { operand, .. } => resolve(operand, scopes),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            resolve(left, scopes)?;
            resolve(right, scopes)
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            resolve(test, scopes)?;
            resolve(consequent, scopes)?;
            resolve(alternate, scopes)
        }
    }
}
