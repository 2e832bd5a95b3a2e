//! Infix to postfix compilation of boolean policies.
//!
//! Grammar:
//! ```text
//! policy     := expr
//! expr       := expr ("and" | "or") expr | "(" expr ")" | threshold | attribute
//! threshold  := k "of" "(" expr ("," expr)* ")"
//! attribute  := word | word ("=" | ">=" | ">" | "<=" | "<") word
//! word       := [A-Za-z0-9_@]+
//! ```
//!
//! `and` binds tighter than `or`, both are left associative. A literal
//! `kofn` word is an operator already in postfix form and passes through.

use std::fmt::Display;

use crate::Error;

/// A postfix token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Attribute(String),
    /// `k` out of the `n` previous operands.
    Threshold { k: usize, n: usize },
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attribute(name) => write!(f, "{name}"),
            Self::Threshold { k, n } => write!(f, "{k}of{n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Eq,
    Ge,
    Gt,
    Le,
    Lt,
}

impl Comparison {
    /// Separator used to merge `attr <op> value` into a single attribute.
    fn separator(self) -> &'static str {
        match self {
            Self::Eq => "_",
            Self::Ge => "_ge_",
            Self::Gt => "_gt_",
            Self::Le => "_le_",
            Self::Lt => "_lt_",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ge => ">=",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Lt => "<",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lexeme {
    Word(String),
    Compare(Comparison),
    Open,
    Close,
    Comma,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '@'
}

fn lex(infix: &str) -> Result<Vec<Lexeme>, Error> {
    let mut lexemes = Vec::new();
    let mut chars = infix.char_indices().peekable();
    while let Some((pos, c)) = chars.next() {
        match c {
            '(' => lexemes.push(Lexeme::Open),
            ')' => lexemes.push(Lexeme::Close),
            ',' => lexemes.push(Lexeme::Comma),
            '=' => lexemes.push(Lexeme::Compare(Comparison::Eq)),
            '>' | '<' => {
                let or_equal = chars.next_if(|(_, c)| *c == '=').is_some();
                lexemes.push(Lexeme::Compare(match (c, or_equal) {
                    ('>', true) => Comparison::Ge,
                    ('>', false) => Comparison::Gt,
                    (_, true) => Comparison::Le,
                    (_, false) => Comparison::Lt,
                }));
            }
            c if c.is_whitespace() => {}
            c if is_word_char(c) => {
                let mut word = String::from(c);
                while let Some((_, c)) = chars.next_if(|(_, c)| is_word_char(*c)) {
                    word.push(c);
                }
                lexemes.push(Lexeme::Word(word));
            }
            c => {
                return Err(Error::PolicyCompile(format!(
                    "unexpected character '{c}' at position {pos} in '{infix}'"
                )))
            }
        }
    }
    Ok(lexemes)
}

/// Rewrites `attr <op> value` into a single attribute word.
fn merge_comparisons(lexemes: Vec<Lexeme>) -> Result<Vec<Lexeme>, Error> {
    let mut merged: Vec<Lexeme> = Vec::with_capacity(lexemes.len());
    let mut lexemes = lexemes.into_iter();
    while let Some(lexeme) = lexemes.next() {
        match lexeme {
            Lexeme::Compare(op) => match (merged.pop(), lexemes.next()) {
                (Some(Lexeme::Word(attribute)), Some(Lexeme::Word(value))) => {
                    merged.push(Lexeme::Word(format!(
                        "{attribute}{}{value}",
                        op.separator()
                    )));
                }
                _ => {
                    return Err(Error::PolicyCompile(format!(
                        "comparison '{}' must stand between an attribute and a value",
                        op.symbol()
                    )))
                }
            },
            lexeme => merged.push(lexeme),
        }
    }
    Ok(merged)
}

/// Parses a literal postfix threshold word such as `2of3`.
fn parse_threshold_literal(word: &str) -> Option<Result<Token, Error>> {
    let (k, n) = word.to_ascii_lowercase().split_once("of").map(|(k, n)| {
        (k.to_string(), n.to_string())
    })?;
    if k.is_empty()
        || n.is_empty()
        || !k.bytes().all(|b| b.is_ascii_digit())
        || !n.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    Some(
        k.parse::<usize>()
            .and_then(|k| n.parse::<usize>().map(|n| Token::Threshold { k, n }))
            .map_err(|e| Error::PolicyCompile(format!("invalid threshold '{word}': {e}"))),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    And,
    Or,
}

impl Operator {
    fn precedence(self) -> u8 {
        match self {
            Self::And => 2,
            Self::Or => 1,
        }
    }

    fn token(self) -> Token {
        match self {
            Self::And => Token::Threshold { k: 2, n: 2 },
            Self::Or => Token::Threshold { k: 1, n: 2 },
        }
    }
}

/// Entries of the shunting-yard operator stack.
#[derive(Debug)]
enum Frame {
    Operator(Operator),
    Parenthesis,
    /// An open `k of (` group and the number of items seen so far.
    Group { k: usize, items: usize },
}

/// Kind of the previous syntactic element, used to reject dangling
/// operators and empty groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Previous {
    Nothing,
    Operand,
    Operator,
    Open,
}

fn unexpected(what: &str, infix: &str) -> Error {
    Error::PolicyCompile(format!("unexpected {what} in '{infix}'"))
}

fn is_of(lexeme: Option<&Lexeme>) -> bool {
    matches!(lexeme, Some(Lexeme::Word(w)) if w.eq_ignore_ascii_case("of"))
}

/// Compiles an infix policy into its postfix token stream.
pub fn to_postfix(infix: &str) -> Result<Vec<Token>, Error> {
    let lexemes = merge_comparisons(lex(infix)?)?;

    let mut output = Vec::new();
    let mut stack = Vec::<Frame>::new();
    let mut previous = Previous::Nothing;

    let mut i = 0;
    while i < lexemes.len() {
        match &lexemes[i] {
            Lexeme::Word(word) => match word.to_ascii_lowercase().as_str() {
                keyword @ ("and" | "or") => {
                    if previous != Previous::Operand {
                        return Err(unexpected(&format!("operator '{keyword}'"), infix));
                    }
                    let operator = if keyword == "and" {
                        Operator::And
                    } else {
                        Operator::Or
                    };
                    while let Some(Frame::Operator(top)) = stack.last() {
                        if top.precedence() < operator.precedence() {
                            break;
                        }
                        output.push(top.token());
                        stack.pop();
                    }
                    stack.push(Frame::Operator(operator));
                    previous = Previous::Operator;
                }
                "not" => {
                    return Err(Error::PolicyCompile(format!(
                        "negation is not supported by threshold policies: '{infix}'"
                    )))
                }
                "of" => return Err(unexpected("'of' without a threshold", infix)),
                _ if is_of(lexemes.get(i + 1)) => {
                    let k = word.parse::<usize>().map_err(|_| {
                        Error::PolicyCompile(format!(
                            "threshold '{word}' of '{infix}' is not a number"
                        ))
                    })?;
                    if lexemes.get(i + 2) != Some(&Lexeme::Open) {
                        return Err(unexpected(
                            &format!("'{word} of' not followed by a parenthesis"),
                            infix,
                        ));
                    }
                    stack.push(Frame::Group { k, items: 1 });
                    previous = Previous::Open;
                    i += 2;
                }
                _ => match parse_threshold_literal(word) {
                    Some(token) => {
                        if previous != Previous::Operand {
                            return Err(unexpected(&format!("operator '{word}'"), infix));
                        }
                        output.push(token?);
                    }
                    None => {
                        output.push(Token::Attribute(word.clone()));
                        previous = Previous::Operand;
                    }
                },
            },
            Lexeme::Open => {
                stack.push(Frame::Parenthesis);
                previous = Previous::Open;
            }
            Lexeme::Comma => {
                if previous != Previous::Operand {
                    return Err(unexpected("','", infix));
                }
                loop {
                    match stack.last_mut() {
                        Some(Frame::Operator(op)) => {
                            output.push(op.token());
                            stack.pop();
                        }
                        Some(Frame::Group { items, .. }) => {
                            *items += 1;
                            break;
                        }
                        _ => return Err(unexpected("',' outside of a 'k of (...)' group", infix)),
                    }
                }
                previous = Previous::Open;
            }
            Lexeme::Close => {
                if previous != Previous::Operand {
                    return Err(unexpected("')'", infix));
                }
                loop {
                    match stack.pop() {
                        Some(Frame::Operator(op)) => output.push(op.token()),
                        Some(Frame::Parenthesis) => break,
                        Some(Frame::Group { k, items }) => {
                            output.push(Token::Threshold { k, n: items });
                            break;
                        }
                        None => return Err(unexpected("unbalanced ')'", infix)),
                    }
                }
            }
            Lexeme::Compare(_) => return Err(unexpected("comparison", infix)),
        }
        i += 1;
    }

    match previous {
        Previous::Operand => {}
        Previous::Nothing => {
            return Err(Error::PolicyCompile("empty policy".to_string()));
        }
        Previous::Operator | Previous::Open => {
            return Err(unexpected("end of policy", infix));
        }
    }

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Operator(op) => output.push(op.token()),
            Frame::Parenthesis | Frame::Group { .. } => {
                return Err(unexpected("unbalanced '('", infix));
            }
        }
    }

    Ok(output)
}

/// Renders a postfix token stream, e.g. `A B 2of2 C 1of2`.
#[must_use]
pub fn postfix_string(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
