//! Token-stream to AST.
//!
//! Statements (`if`, `while`, `for`, `return`) are recursive descent;
//! everything else is an *operator expression* parsed with the classic
//! two-stack Shunting-Yard algorithm, extended with aggregate literals,
//! function definitions/invocations, and subscripts lifted to nodes
//! before they enter the output stack.
//!
//! Two conditions interrupt parsing without being errors: running out of
//! tokens at a statement boundary (normal end of program) and a `}` that
//! closes a block (consumed by the enclosing function-definition parse).
//! Both travel as [`ParseInterrupt`] sentinels through the internal
//! `Result` channel and never reach the host.

use std::{collections::VecDeque, rc::Rc, str::FromStr};

use bigdecimal::BigDecimal;

use crate::{
    error::Error,
    node::{BinaryOp, Branch, Node, NodeKind, UnaryOp},
    token::{Assoc, Op, Token, TokenKind},
};

/// Parses a token stream into the root statement branch.
pub(crate) fn parse(tokens: Vec<Token>) -> Result<Branch, Error> {
    let mut parser = Parser::new(tokens);
    let mut tree = Branch::new();
    while parser.has_tokens() {
        match parser.handle_expression() {
            Ok(node) => tree.push(node),
            Err(ParseInterrupt::OutOfTokens(line)) => return Err(Error::UnexpectedEnd { line }),
            Err(ParseInterrupt::BlockEnd(line)) => return Err(Error::parse(line, "Unexpected }")),
            Err(ParseInterrupt::Fail(error)) => return Err(error),
        }
    }
    Ok(tree)
}

/// Non-error conditions that unwind the parser, plus real failures.
enum ParseInterrupt {
    /// More tokens were needed. Normal at a statement boundary, an error
    /// anywhere else.
    OutOfTokens(usize),
    /// A `}` ended the current block.
    BlockEnd(usize),
    Fail(Error),
}

impl From<Error> for ParseInterrupt {
    fn from(error: Error) -> Self {
        Self::Fail(error)
    }
}

type PResult<T> = Result<T, ParseInterrupt>;

/// One entry on the Shunting-Yard output stack.
enum OutItem {
    /// Literal or identifier token, converted to a node while folding.
    Atom(Token),
    /// Aggregate literal, function, invocation, or subscript already
    /// lifted to a node.
    Node(Node),
    Op { op: Op, line: usize },
}

/// Statement dispatch decision, made before the token queue is touched.
#[derive(Clone, Copy)]
enum Starter {
    If,
    While,
    For,
    Return,
    Bool(bool),
    Operator,
    Terminator,
    BlockEnd,
}

/// What the next token starts, decided before any borrow of the queue.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Lookahead {
    Dict,
    List,
    CloseBrace,
    CloseBracket,
    CloseParen,
    Other,
    End,
}

struct Parser {
    tokens: VecDeque<Token>,
    line: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into(),
            line: 1,
        }
    }

    fn has_tokens(&self) -> bool {
        !self.tokens.is_empty()
    }

    fn shift(&mut self) -> PResult<Token> {
        match self.tokens.pop_front() {
            Some(token) => {
                self.line = token.line;
                Ok(token)
            }
            None => Err(ParseInterrupt::OutOfTokens(self.line)),
        }
    }

    fn next_is(&self, kind: &TokenKind) -> bool {
        self.tokens.front().is_some_and(|t| &t.kind == kind)
    }

    fn next_is_identifier(&self, body: &str) -> bool {
        self.tokens.front().is_some_and(|t| t.kind.is_identifier(body))
    }

    fn second_is_identifier(&self, body: &str) -> bool {
        self.tokens.get(1).is_some_and(|t| t.kind.is_identifier(body))
    }

    fn expect_identifier(&mut self, body: &str, what: &str) -> PResult<()> {
        let token = self.shift()?;
        if token.kind.is_identifier(body) {
            Ok(())
        } else {
            Err(Error::parse(token.line, format!("expected {what}, got {}", token.kind)).into())
        }
    }

    /// Parses one statement-level expression.
    fn handle_expression(&mut self) -> PResult<Node> {
        let Some(front) = self.tokens.front() else {
            return Err(ParseInterrupt::OutOfTokens(self.line));
        };
        let line = front.line;
        let starter = match &front.kind {
            TokenKind::Identifier(body) => match body.as_str() {
                "if" => Starter::If,
                "while" => Starter::While,
                "for" => Starter::For,
                "return" => Starter::Return,
                "true" => Starter::Bool(true),
                "false" => Starter::Bool(false),
                _ => Starter::Operator,
            },
            TokenKind::Number(_) | TokenKind::Str { .. } => Starter::Operator,
            TokenKind::LineTerminator => Starter::Terminator,
            TokenKind::RightBrace => Starter::BlockEnd,
            other => {
                return Err(Error::parse(line, format!("unexpected {other}")).into());
            }
        };
        match starter {
            Starter::If => {
                self.shift()?;
                self.handle_if()
            }
            Starter::While => {
                self.shift()?;
                self.handle_while()
            }
            Starter::For => {
                self.shift()?;
                self.handle_for()
            }
            Starter::Return => {
                self.shift()?;
                self.handle_return()
            }
            Starter::Bool(value) => {
                self.shift()?;
                Ok(Node::new(line, NodeKind::Bool(value)))
            }
            Starter::Operator => self.expression_statement(),
            Starter::Terminator => {
                self.shift()?;
                Ok(Node::new(line, NodeKind::Nop))
            }
            Starter::BlockEnd => {
                self.shift()?;
                Err(ParseInterrupt::BlockEnd(line))
            }
        }
    }

    fn expression_statement(&mut self) -> PResult<Node> {
        let line = self.line;
        let node = self.handle_operator_expression()?;
        Ok(node.unwrap_or_else(|| Node::new(line, NodeKind::Nop)))
    }

    /// Parses a body expression inside a block statement, mapping the
    /// interrupts that cannot legally happen there to parse errors.
    fn block_expression(&mut self, missing_end: &str) -> PResult<Node> {
        match self.handle_expression() {
            Ok(node) => Ok(node),
            Err(ParseInterrupt::BlockEnd(line)) => Err(Error::parse(line, "Unexpected }").into()),
            Err(ParseInterrupt::OutOfTokens(line)) => Err(Error::parse(line, missing_end).into()),
            Err(fail) => Err(fail),
        }
    }

    fn require_expression(&mut self, line: usize) -> PResult<Node> {
        match self.handle_operator_expression()? {
            Some(node) => Ok(node),
            None => Err(Error::parse(line, "expected an expression").into()),
        }
    }

    fn handle_if(&mut self) -> PResult<Node> {
        let line = self.line;
        let condition = self.require_expression(line)?;
        let mut then_branch = Branch::new();
        let mut else_branch = Branch::new();
        loop {
            if !self.has_tokens() {
                return Err(Error::parse(self.line, "end if expected").into());
            }
            if self.next_is_identifier("else") || self.next_is_identifier("end") {
                break;
            }
            then_branch.push(self.block_expression("end if expected")?);
        }
        if self.next_is_identifier("else") {
            self.shift()?;
            loop {
                if !self.has_tokens() {
                    return Err(Error::parse(self.line, "end if expected").into());
                }
                if self.next_is_identifier("end") && self.second_is_identifier("if") {
                    break;
                }
                else_branch.push(self.block_expression("end if expected")?);
            }
        }
        self.expect_identifier("end", "'end if'")?;
        self.expect_identifier("if", "'end if'")?;
        Ok(Node::new(
            line,
            NodeKind::If {
                condition: Box::new(condition),
                then_branch,
                else_branch,
            },
        ))
    }

    fn handle_while(&mut self) -> PResult<Node> {
        let line = self.line;
        let condition = self.require_expression(line)?;
        let mut body = Branch::new();
        loop {
            if !self.has_tokens() {
                return Err(Error::parse(self.line, "end while expected").into());
            }
            if self.next_is_identifier("end") {
                break;
            }
            body.push(self.block_expression("end while expected")?);
        }
        self.expect_identifier("end", "'end while'")?;
        self.expect_identifier("while", "'end while'")?;
        Ok(Node::new(
            line,
            NodeKind::While {
                condition: Box::new(condition),
                body,
            },
        ))
    }

    fn handle_for(&mut self) -> PResult<Node> {
        let line = self.line;
        let name_token = self.shift()?;
        let TokenKind::Identifier(binding) = name_token.kind else {
            return Err(Error::parse(name_token.line, format!("Expected a name, got {}", name_token.kind)).into());
        };
        self.expect_identifier("in", "'in'")?;
        let iterable = self.require_expression(line)?;
        let mut body = Branch::new();
        loop {
            if !self.has_tokens() {
                return Err(Error::parse(self.line, "end for expected").into());
            }
            if self.next_is_identifier("end") {
                break;
            }
            body.push(self.block_expression("end for expected")?);
        }
        self.expect_identifier("end", "'end for'")?;
        self.expect_identifier("for", "'end for'")?;
        Ok(Node::new(
            line,
            NodeKind::For {
                binding,
                iterable: Box::new(iterable),
                body,
            },
        ))
    }

    fn handle_return(&mut self) -> PResult<Node> {
        let line = self.line;
        let value = self.handle_operator_expression()?;
        Ok(Node::new(line, NodeKind::Return(value.map(Box::new))))
    }

    /// Parses a maximal operator expression with Shunting-Yard.
    ///
    /// Returns `None` when the expression is empty (a stray newline after
    /// a comma, for instance).
    fn handle_operator_expression(&mut self) -> PResult<Option<Node>> {
        let mut output: Vec<OutItem> = Vec::new();
        let mut op_stack: Vec<(Op, usize)> = Vec::new();
        // distinguishes unary minus from subtraction: true after an atom,
        // an aggregate, or a closing paren
        let mut prev_is_operand = false;
        let mut paren_depth = 0usize;

        loop {
            let lookahead = match self.tokens.front().map(|t| &t.kind) {
                None => Lookahead::End,
                Some(TokenKind::LeftBrace) => Lookahead::Dict,
                Some(TokenKind::LeftBracket) => Lookahead::List,
                Some(TokenKind::RightBrace) => Lookahead::CloseBrace,
                Some(TokenKind::RightBracket) => Lookahead::CloseBracket,
                Some(TokenKind::RightParen) => Lookahead::CloseParen,
                Some(_) => Lookahead::Other,
            };
            match lookahead {
                Lookahead::End => break,
                Lookahead::Dict => {
                    let node = self.handle_dictionary_expression()?;
                    output.push(OutItem::Node(node));
                    prev_is_operand = true;
                    continue;
                }
                Lookahead::List => {
                    let node = self.handle_list_expression()?;
                    output.push(OutItem::Node(node));
                    prev_is_operand = true;
                    continue;
                }
                Lookahead::CloseBrace => {
                    if paren_depth > 0 {
                        return Err(Error::parse(self.line, "Unexpected }").into());
                    }
                    break;
                }
                Lookahead::CloseBracket => {
                    if paren_depth > 0 {
                        return Err(Error::parse(self.line, "Unexpected ]").into());
                    }
                    break;
                }
                // a ) with no open ( here belongs to the enclosing
                // invocation or grouping; leave it unconsumed
                Lookahead::CloseParen if paren_depth == 0 => break,
                Lookahead::CloseParen | Lookahead::Other => {}
            }

            let token = self.shift()?;
            match token.kind {
                TokenKind::LineTerminator | TokenKind::Comma => break,
                TokenKind::LeftParen => {
                    paren_depth += 1;
                    op_stack.push((Op::LParen, token.line));
                    prev_is_operand = false;
                }
                TokenKind::RightParen => {
                    paren_depth -= 1;
                    loop {
                        match op_stack.pop() {
                            Some((Op::LParen, _)) => break,
                            Some((op, line)) => output.push(OutItem::Op { op, line }),
                            None => return Err(Error::parse(token.line, "unmatched )").into()),
                        }
                    }
                    prev_is_operand = true;
                }
                TokenKind::Identifier(_) | TokenKind::Number(_) | TokenKind::Str { .. } => {
                    let lifted = if let TokenKind::Identifier(name) = &token.kind {
                        if self.next_is(&TokenKind::LeftParen) {
                            Some(if name == "function" {
                                self.handle_function_definition()?
                            } else {
                                self.handle_function_invocation(name.clone(), token.line)?
                            })
                        } else if self.next_is(&TokenKind::LeftBracket) {
                            Some(self.handle_subscript_notation(name.clone(), token.line)?)
                        } else {
                            None
                        }
                    } else {
                        None
                    };
                    match lifted {
                        Some(node) => output.push(OutItem::Node(node)),
                        None => output.push(OutItem::Atom(token)),
                    }
                    prev_is_operand = true;
                }
                TokenKind::Op(shifted) => {
                    let op = if shifted == Op::Sub && !prev_is_operand {
                        Op::Neg
                    } else {
                        shifted
                    };
                    while let Some(&(top, top_line)) = op_stack.last() {
                        if top == Op::LParen {
                            break;
                        }
                        let pops = match op.assoc() {
                            Assoc::Left => op.precedence() >= top.precedence(),
                            Assoc::Right => op.precedence() > top.precedence(),
                        };
                        if !pops {
                            break;
                        }
                        op_stack.pop();
                        output.push(OutItem::Op { op: top, line: top_line });
                    }
                    op_stack.push((op, token.line));
                    prev_is_operand = false;
                }
                other => {
                    return Err(Error::parse(
                        token.line,
                        format!("Expected an operator, literal, or identifier (got {other})"),
                    )
                    .into());
                }
            }
        }

        while let Some((op, line)) = op_stack.pop() {
            if op == Op::LParen {
                return Err(Error::parse(line, "unmatched (").into());
            }
            output.push(OutItem::Op { op, line });
        }

        self.fold_output(output)
    }

    /// Folds the postfix output stack into a single tree.
    fn fold_output(&self, output: Vec<OutItem>) -> PResult<Option<Node>> {
        if output.is_empty() {
            return Ok(None);
        }
        let mut stack: Vec<Node> = Vec::new();
        for item in output {
            match item {
                OutItem::Atom(token) => stack.push(atom_to_node(token)?),
                OutItem::Node(node) => stack.push(node),
                OutItem::Op { op, line } if op.is_unary() => {
                    let Some(target) = stack.pop() else {
                        return Err(Error::parse(line, "Malformed expression").into());
                    };
                    stack.push(Node::new(
                        line,
                        NodeKind::Unary {
                            op: UnaryOp::Neg,
                            target: Box::new(target),
                        },
                    ));
                }
                OutItem::Op { op, line } => {
                    let (Some(right), Some(left)) = (stack.pop(), stack.pop()) else {
                        return Err(Error::parse(line, "Malformed expression").into());
                    };
                    let op = binary_op(op)
                        .ok_or_else(|| Error::parse(line, format!("unexpected '{}'", op.symbol())))?;
                    if op == BinaryOp::Assign
                        && !matches!(
                            left.kind,
                            NodeKind::Variable(_)
                                | NodeKind::Binary {
                                    op: BinaryOp::Subscript,
                                    ..
                                }
                        )
                    {
                        return Err(Error::parse(line, "invalid assignment target").into());
                    }
                    stack.push(Node::new(
                        line,
                        NodeKind::Binary {
                            op,
                            left: Box::new(left),
                            right: Box::new(right),
                        },
                    ));
                }
            }
        }
        if stack.len() != 1 {
            return Err(Error::parse(self.line, "Malformed expression").into());
        }
        Ok(stack.pop())
    }

    /// `function ( name, ... ) { body }`, with `function` and the
    /// lookahead `(` already seen by the caller.
    fn handle_function_definition(&mut self) -> PResult<Node> {
        let line = self.line;
        self.shift()?;
        let mut params = Vec::new();
        loop {
            let token = self.shift()?;
            match token.kind {
                TokenKind::RightParen => break,
                TokenKind::Comma => {}
                TokenKind::Identifier(name) => params.push(name),
                other => {
                    return Err(Error::parse(token.line, format!("Expected an argument name, got {other}")).into());
                }
            }
        }
        let brace = self.shift()?;
        if brace.kind != TokenKind::LeftBrace {
            return Err(Error::parse(brace.line, format!("Expected {{, got {}", brace.kind)).into());
        }
        let mut body = Branch::new();
        loop {
            match self.handle_expression() {
                Ok(node) => body.push(node),
                Err(ParseInterrupt::BlockEnd(_)) => break,
                Err(other) => return Err(other),
            }
        }
        Ok(Node::new(
            line,
            NodeKind::Function {
                params,
                body: Rc::new(body),
            },
        ))
    }

    /// `name ( expr, ... )`, with the lookahead `(` still unconsumed.
    fn handle_function_invocation(&mut self, target: String, line: usize) -> PResult<Node> {
        self.shift()?;
        let mut args = Vec::new();
        loop {
            if !self.has_tokens() {
                return Err(ParseInterrupt::OutOfTokens(self.line));
            }
            if self.next_is(&TokenKind::RightParen) {
                self.shift()?;
                break;
            }
            let Some(arg) = self.handle_operator_expression()? else {
                return Err(Error::parse(self.line, "Unexpected character").into());
            };
            args.push(arg);
            if self.next_is(&TokenKind::Comma) {
                self.shift()?;
            }
        }
        Ok(Node::new(line, NodeKind::Invocation { target, args }))
    }

    /// `name [ expr ]`, with the lookahead `[` still unconsumed.
    fn handle_subscript_notation(&mut self, target: String, line: usize) -> PResult<Node> {
        self.shift()?;
        let Some(index) = self.handle_operator_expression()? else {
            return Err(Error::parse(self.line, "expected a subscript index").into());
        };
        let bracket = self.shift()?;
        if bracket.kind != TokenKind::RightBracket {
            return Err(Error::parse(
                bracket.line,
                format!("Unexpected {} during subscript notation parse", bracket.kind),
            )
            .into());
        }
        Ok(Node::new(
            line,
            NodeKind::Binary {
                op: BinaryOp::Subscript,
                left: Box::new(Node::new(line, NodeKind::Variable(target))),
                right: Box::new(index),
            },
        ))
    }

    /// `[ expr, ... ]`, with the `[` still unconsumed.
    fn handle_list_expression(&mut self) -> PResult<Node> {
        let line = self.line;
        self.shift()?;
        let mut elements = Vec::new();
        while self.next_is(&TokenKind::LineTerminator) {
            self.shift()?;
        }
        loop {
            if !self.has_tokens() {
                return Err(ParseInterrupt::OutOfTokens(self.line));
            }
            if self.next_is(&TokenKind::RightBracket) {
                self.shift()?;
                break;
            }
            let element = self.handle_operator_expression()?;
            if self.next_is(&TokenKind::Comma) {
                self.shift()?;
            }
            if let Some(element) = element {
                elements.push(element);
            }
        }
        Ok(Node::new(line, NodeKind::List(elements)))
    }

    /// `{ name : expr NL ... }`, with the `{` still unconsumed.
    ///
    /// Entries need no separating commas; each value expression runs to
    /// the end of its line. Keys are the textual bodies of identifier,
    /// number, or string tokens.
    fn handle_dictionary_expression(&mut self) -> PResult<Node> {
        let line = self.line;
        self.shift()?;
        let mut entries: Vec<(String, Node)> = Vec::new();
        loop {
            let name_token = self.shift()?;
            let key = match name_token.kind {
                TokenKind::LineTerminator => continue,
                TokenKind::RightBrace => break,
                TokenKind::Identifier(body) | TokenKind::Number(body) | TokenKind::Str { body, .. } => body,
                other => {
                    return Err(Error::parse(name_token.line, format!("Expected a name, got {other}")).into());
                }
            };
            let colon = self.shift()?;
            if colon.kind != TokenKind::Colon {
                return Err(Error::parse(colon.line, "Expected a colon").into());
            }
            if let Some(value) = self.handle_operator_expression()? {
                entries.push((key, value));
            }
        }
        Ok(Node::new(line, NodeKind::Dict(entries)))
    }
}

/// Converts a literal or identifier token to its node (`true`/`false`
/// identifiers become booleans, everything else keeps its role).
fn atom_to_node(token: Token) -> PResult<Node> {
    let node = match token.kind {
        TokenKind::Identifier(body) => match body.as_str() {
            "true" => NodeKind::Bool(true),
            "false" => NodeKind::Bool(false),
            _ => NodeKind::Variable(body),
        },
        TokenKind::Number(body) => match BigDecimal::from_str(&body) {
            Ok(value) => NodeKind::Number(value),
            Err(_) => {
                return Err(Error::parse(token.line, format!("invalid number literal '{body}'")).into());
            }
        },
        TokenKind::Str { body, .. } => NodeKind::Str(body),
        other => {
            return Err(Error::parse(token.line, format!("unexpected {other}")).into());
        }
    };
    Ok(Node::new(token.line, node))
}

fn binary_op(op: Op) -> Option<BinaryOp> {
    match op {
        Op::Assign => Some(BinaryOp::Assign),
        Op::Eq => Some(BinaryOp::Eq),
        Op::Lt => Some(BinaryOp::Lt),
        Op::Gt => Some(BinaryOp::Gt),
        Op::Le => Some(BinaryOp::Le),
        Op::Ge => Some(BinaryOp::Ge),
        Op::Add => Some(BinaryOp::Add),
        Op::Sub => Some(BinaryOp::Sub),
        Op::Mul => Some(BinaryOp::Mul),
        Op::Div => Some(BinaryOp::Div),
        Op::Pow => Some(BinaryOp::Pow),
        Op::Dot => Some(BinaryOp::Dot),
        Op::Neg | Op::LParen => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::lexer::lex;

    fn parse_source(source: &str) -> Result<Branch, Error> {
        parse(lex(source).unwrap())
    }

    fn statements(source: &str) -> Vec<Node> {
        parse_source(source)
            .unwrap()
            .nodes()
            .iter()
            .filter(|n| n.kind != NodeKind::Nop)
            .cloned()
            .collect()
    }

    fn num(line: usize, text: &str) -> Node {
        Node::new(line, NodeKind::Number(BigDecimal::from_str(text).unwrap()))
    }

    fn var(line: usize, name: &str) -> Node {
        Node::new(line, NodeKind::Variable(name.to_owned()))
    }

    fn binary(line: usize, op: BinaryOp, left: Node, right: Node) -> Node {
        Node::new(
            line,
            NodeKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let nodes = statements("x = 1 + 2 * 3\n");
        let expected = binary(
            1,
            BinaryOp::Assign,
            var(1, "x"),
            binary(
                1,
                BinaryOp::Add,
                num(1, "1"),
                binary(1, BinaryOp::Mul, num(1, "2"), num(1, "3")),
            ),
        );
        assert_eq!(nodes, vec![expected]);
    }

    #[test]
    fn exponent_is_right_associative() {
        let nodes = statements("x = 2 ** 3 ** 2\n");
        let expected = binary(
            1,
            BinaryOp::Assign,
            var(1, "x"),
            binary(
                1,
                BinaryOp::Pow,
                num(1, "2"),
                binary(1, BinaryOp::Pow, num(1, "3"), num(1, "2")),
            ),
        );
        assert_eq!(nodes, vec![expected]);
    }

    #[test]
    fn unary_minus_binds_like_exponent() {
        let nodes = statements("x = -2 ** 2\n");
        let expected = binary(
            1,
            BinaryOp::Assign,
            var(1, "x"),
            Node::new(
                1,
                NodeKind::Unary {
                    op: UnaryOp::Neg,
                    target: Box::new(binary(1, BinaryOp::Pow, num(1, "2"), num(1, "2"))),
                },
            ),
        );
        assert_eq!(nodes, vec![expected]);
    }

    #[test]
    fn minus_after_closing_paren_is_subtraction() {
        let nodes = statements("x = (1 + 2) - 3\n");
        let expected = binary(
            1,
            BinaryOp::Assign,
            var(1, "x"),
            binary(
                1,
                BinaryOp::Sub,
                binary(1, BinaryOp::Add, num(1, "1"), num(1, "2")),
                num(1, "3"),
            ),
        );
        assert_eq!(nodes, vec![expected]);
    }

    #[test]
    fn parentheses_override_precedence() {
        let nodes = statements("x = (1 + 2) * 3\n");
        let expected = binary(
            1,
            BinaryOp::Assign,
            var(1, "x"),
            binary(
                1,
                BinaryOp::Mul,
                binary(1, BinaryOp::Add, num(1, "1"), num(1, "2")),
                num(1, "3"),
            ),
        );
        assert_eq!(nodes, vec![expected]);
    }

    #[test]
    fn dot_chains_left_associatively() {
        let nodes = statements("r = a.b.c\n");
        let expected = binary(
            1,
            BinaryOp::Assign,
            var(1, "r"),
            binary(
                1,
                BinaryOp::Dot,
                binary(1, BinaryOp::Dot, var(1, "a"), var(1, "b")),
                var(1, "c"),
            ),
        );
        assert_eq!(nodes, vec![expected]);
    }

    #[test]
    fn no_operator_tokens_survive_in_the_ast() {
        // structural by construction: folding pops every operator; a
        // leftover would fail the single-root check
        let branch = parse_source("x = 1 + 2 * 3 - (4 / 5)\n").unwrap();
        assert_eq!(branch.nodes().len(), 1);
    }

    #[test]
    fn invocation_keeps_unreduced_argument_nodes() {
        let nodes = statements("r = adder(40, 2)\n");
        let NodeKind::Binary { right, .. } = &nodes[0].kind else {
            panic!("expected assignment");
        };
        let NodeKind::Invocation { target, args } = &right.kind else {
            panic!("expected invocation");
        };
        assert_eq!(target, "adder");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn function_definition_collects_params_and_body() {
        let nodes = statements("f = function(a, b) { return a + b }\n");
        let NodeKind::Binary { right, .. } = &nodes[0].kind else {
            panic!("expected assignment");
        };
        let NodeKind::Function { params, body } = &right.kind else {
            panic!("expected function definition");
        };
        assert_eq!(params, &["a".to_owned(), "b".to_owned()]);
        assert_eq!(body.nodes().len(), 1);
        assert!(matches!(body.nodes()[0].kind, NodeKind::Return(Some(_))));
    }

    #[test]
    fn if_else_collects_both_branches() {
        let source = "if 1 < 2\n  x = 10\nelse\n  x = 20\nend if\n";
        let nodes = statements(source);
        let NodeKind::If {
            then_branch,
            else_branch,
            ..
        } = &nodes[0].kind
        else {
            panic!("expected if");
        };
        assert!(then_branch.nodes().iter().any(|n| n.kind != NodeKind::Nop));
        assert!(else_branch.nodes().iter().any(|n| n.kind != NodeKind::Nop));
    }

    #[test]
    fn dictionary_entries_need_no_commas() {
        let nodes = statements("d = { a: 1\n      b: 2 }\n");
        let NodeKind::Binary { right, .. } = &nodes[0].kind else {
            panic!("expected assignment");
        };
        let NodeKind::Dict(entries) = &right.kind else {
            panic!("expected dictionary literal");
        };
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn list_literals_allow_internal_newlines() {
        let nodes = statements("l = [\n  1,\n  2,\n]\n");
        let NodeKind::Binary { right, .. } = &nodes[0].kind else {
            panic!("expected assignment");
        };
        let NodeKind::List(elements) = &right.kind else {
            panic!("expected list literal");
        };
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn assignment_to_a_literal_is_rejected() {
        let err = parse_source("5 = 3\n").unwrap_err();
        assert_eq!(err, Error::parse(1, "invalid assignment target"));
    }

    #[test]
    fn subscript_assignment_target_is_accepted() {
        let nodes = statements("d[\"a\"] = 9\n");
        let NodeKind::Binary { op, left, .. } = &nodes[0].kind else {
            panic!("expected assignment");
        };
        assert_eq!(*op, BinaryOp::Assign);
        assert!(matches!(
            left.kind,
            NodeKind::Binary {
                op: BinaryOp::Subscript,
                ..
            }
        ));
    }

    #[test]
    fn adjacent_atoms_are_malformed() {
        let err = parse_source("1 2\n").unwrap_err();
        assert_eq!(err, Error::parse(1, "Malformed expression"));
    }

    #[test]
    fn stray_close_brace_is_rejected() {
        let err = parse_source("}\n").unwrap_err();
        assert_eq!(err, Error::parse(1, "Unexpected }"));
    }

    #[test]
    fn empty_invocation_argument_is_rejected() {
        let err = parse_source("f(,)\n").unwrap_err();
        assert_eq!(err, Error::parse(1, "Unexpected character"));
    }

    #[test]
    fn missing_end_if_is_rejected() {
        let err = parse_source("if 1 < 2\nx = 1\n").unwrap_err();
        assert_eq!(err, Error::parse(2, "end if expected"));
    }

    #[test]
    fn true_statement_parses_bare() {
        let nodes = statements("true\n");
        assert_eq!(nodes[0].kind, NodeKind::Bool(true));
    }
}
