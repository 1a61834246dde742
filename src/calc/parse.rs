/// Tokenizer and parser for Lisp-like calc expressions.
///
/// Grammar: an expression is a number, a quoted string (`'..'` or `".."`), a
/// symbol, or a parenthesized list of expressions.
use super::errors::CalcError;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Symbol(String),
    List(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open(usize),
    Close(usize),
    Atom(usize, String),
    Str(usize, String),
}

impl Token {
    fn pos(&self) -> usize {
        match self {
            Self::Open(p) | Self::Close(p) | Self::Atom(p, _) | Self::Str(p, _) => *p,
        }
    }
}

/// Parse a complete expression. Trailing input is an error.
///
/// # Errors
///
/// Returns `CalcError::Syntax` with the character position of the problem.
pub fn parse(src: &str) -> Result<Expr, CalcError> {
    let tokens = tokenize(src)?;
    let mut pos = 0;
    let expr = parse_expr(&tokens, &mut pos, src.chars().count())?;
    if let Some(extra) = tokens.get(pos) {
        return Err(syntax(extra.pos(), "unexpected input after expression"));
    }
    Ok(expr)
}

fn tokenize(src: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().enumerate().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '(' => tokens.push(Token::Open(i)),
            ')' => tokens.push(Token::Close(i)),
            '\'' | '"' => {
                let mut text = String::new();
                let mut closed = false;
                for (_, ch) in chars.by_ref() {
                    if ch == c {
                        closed = true;
                        break;
                    }
                    text.push(ch);
                }
                if !closed {
                    return Err(syntax(i, "unterminated string"));
                }
                tokens.push(Token::Str(i, text));
            }
            c if c.is_whitespace() => {}
            _ => {
                let mut text = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_whitespace() || matches!(next, '(' | ')' | '\'' | '"') {
                        break;
                    }
                    text.push(next);
                    chars.next();
                }
                tokens.push(Token::Atom(i, text));
            }
        }
    }
    Ok(tokens)
}

fn parse_expr(tokens: &[Token], pos: &mut usize, end: usize) -> Result<Expr, CalcError> {
    let Some(token) = tokens.get(*pos) else {
        return Err(syntax(end, "unexpected end of expression"));
    };
    *pos += 1;

    match token {
        Token::Open(start) => {
            let mut items = Vec::new();
            loop {
                match tokens.get(*pos) {
                    Some(Token::Close(_)) => {
                        *pos += 1;
                        break;
                    }
                    Some(_) => items.push(parse_expr(tokens, pos, end)?),
                    None => return Err(syntax(*start, "unbalanced '('")),
                }
            }
            if items.is_empty() {
                return Err(syntax(*start, "empty list"));
            }
            Ok(Expr::List(items))
        }
        Token::Close(p) => Err(syntax(*p, "unbalanced ')'")),
        Token::Str(_, text) => Ok(Expr::Str(text.clone())),
        Token::Atom(p, text) => atom(*p, text),
    }
}

fn atom(pos: usize, text: &str) -> Result<Expr, CalcError> {
    if looks_numeric(text) {
        return text
            .parse::<f64>()
            .map(Expr::Number)
            .map_err(|_| syntax(pos, &format!("invalid number '{text}'")));
    }
    Ok(Expr::Symbol(text.to_owned()))
}

// `-` and `+` alone are operators, `-1` and `.5` are numbers.
fn looks_numeric(text: &str) -> bool {
    let body = text.strip_prefix(['-', '+']).unwrap_or(text);
    body.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && body.chars().any(|c| c.is_ascii_digit())
}

fn syntax(pos: usize, message: &str) -> CalcError {
    CalcError::Syntax {
        pos,
        message: message.to_owned(),
    }
}
