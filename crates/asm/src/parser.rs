// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assembly text parsing

use regex::Regex;
use sonde_core::{CodeError, CodeUnit, Constant, Instr, Program};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

// Function header: fn name(a, b)
#[allow(clippy::expect_used)]
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^fn\s+([A-Za-z_]\w*)\s*\(([^)]*)\)$").expect("constant regex pattern is valid")
});

// Label prefix: name: rest
#[allow(clippy::expect_used)]
static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_]\w*):\s*(.*)$").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_]\w*$").expect("constant regex pattern is valid"));

/// Errors that can occur while assembling
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    #[error("line {line}: {message}")]
    Syntax { line: u32, message: String },
    #[error("line {line}: undefined label {label}")]
    UndefinedLabel { line: u32, label: String },
    #[error("function {0} is missing `end`")]
    Unterminated(String),
    #[error(transparent)]
    Code(#[from] CodeError),
}

fn syntax(line: u32, message: impl Into<String>) -> AsmError {
    AsmError::Syntax {
        line,
        message: message.into(),
    }
}

/// Instruction whose jump target may still be a label
enum Pending {
    Ready(Instr),
    Jump {
        mnemonic: &'static str,
        label: String,
        line: u32,
    },
}

struct FnBuilder {
    name: String,
    arity: u8,
    locals: Vec<String>,
    code: Vec<Pending>,
    lines: Vec<u32>,
    labels: HashMap<String, usize>,
}

impl FnBuilder {
    fn new(name: &str, params: &str, line: u32) -> Result<Self, AsmError> {
        let mut locals = Vec::new();
        for param in params.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if !IDENT.is_match(param) {
                return Err(syntax(line, format!("invalid parameter name {:?}", param)));
            }
            if locals.iter().any(|l| l == param) {
                return Err(syntax(line, format!("duplicate parameter {}", param)));
            }
            locals.push(param.to_string());
        }
        let arity = u8::try_from(locals.len())
            .map_err(|_| syntax(line, "too many parameters"))?;
        Ok(Self {
            name: name.to_string(),
            arity,
            locals,
            code: Vec::new(),
            lines: Vec::new(),
            labels: HashMap::new(),
        })
    }

    fn slot(&mut self, name: &str, line: u32) -> Result<u16, AsmError> {
        if !IDENT.is_match(name) {
            return Err(syntax(line, format!("invalid local name {:?}", name)));
        }
        let index = match self.locals.iter().position(|l| l == name) {
            Some(index) => index,
            None => {
                self.locals.push(name.to_string());
                self.locals.len() - 1
            }
        };
        u16::try_from(index).map_err(|_| syntax(line, "too many locals"))
    }

    fn label(&mut self, label: &str, line: u32) -> Result<(), AsmError> {
        if self.labels.insert(label.to_string(), self.code.len()).is_some() {
            return Err(syntax(line, format!("duplicate label {}", label)));
        }
        Ok(())
    }

    fn emit(&mut self, pending: Pending, line: u32) {
        self.code.push(pending);
        self.lines.push(line);
    }

    fn statement(&mut self, text: &str, line: u32) -> Result<(), AsmError> {
        let (mnemonic, operand) = match text.split_once(char::is_whitespace) {
            Some((m, rest)) => (m, rest.trim()),
            None => (text, ""),
        };
        let no_operand = |instr: Instr| {
            if operand.is_empty() {
                Ok(instr)
            } else {
                Err(syntax(line, format!("{} takes no operand", mnemonic)))
            }
        };

        let instr = match mnemonic {
            "nop" => no_operand(Instr::Nop)?,
            "pop" => no_operand(Instr::Pop)?,
            "dup" => no_operand(Instr::Dup)?,
            "add" => no_operand(Instr::Add)?,
            "sub" => no_operand(Instr::Sub)?,
            "mul" => no_operand(Instr::Mul)?,
            "div" => no_operand(Instr::Div)?,
            "mod" => no_operand(Instr::Mod)?,
            "lt" => no_operand(Instr::Lt)?,
            "le" => no_operand(Instr::Le)?,
            "gt" => no_operand(Instr::Gt)?,
            "ge" => no_operand(Instr::Ge)?,
            "eq" => no_operand(Instr::Eq)?,
            "ne" => no_operand(Instr::Ne)?,
            "not" => no_operand(Instr::Not)?,
            "return" => no_operand(Instr::Return)?,
            "yield" => no_operand(Instr::Yield)?,
            "throw" => no_operand(Instr::Throw)?,
            "raise" => no_operand(Instr::Raise)?,
            "end_try" => no_operand(Instr::PopHandler)?,
            "push" => Instr::Push(constant(operand, line)?),
            "load" => Instr::Load(self.slot(operand, line)?),
            "store" => Instr::Store(self.slot(operand, line)?),
            "exception" => {
                if !IDENT.is_match(operand) {
                    return Err(syntax(line, "exception needs a kind name"));
                }
                Instr::NewException(Arc::from(operand))
            }
            "call" | "native" | "gen" => {
                let (name, argc) = callee(operand, line)?;
                match mnemonic {
                    "call" => Instr::Call {
                        function: name,
                        argc,
                    },
                    "native" => Instr::CallNative { native: name, argc },
                    _ => Instr::MakeGen {
                        function: name,
                        argc,
                    },
                }
            }
            "jump" | "jump_if_false" | "jump_if_true" | "for_iter" | "try" => {
                if !IDENT.is_match(operand) {
                    return Err(syntax(line, format!("{} needs a label", mnemonic)));
                }
                let mnemonic = match mnemonic {
                    "jump" => "jump",
                    "jump_if_false" => "jump_if_false",
                    "jump_if_true" => "jump_if_true",
                    "for_iter" => "for_iter",
                    _ => "try",
                };
                self.emit(
                    Pending::Jump {
                        mnemonic,
                        label: operand.to_string(),
                        line,
                    },
                    line,
                );
                return Ok(());
            }
            other => return Err(syntax(line, format!("unknown instruction {:?}", other))),
        };
        self.emit(Pending::Ready(instr), line);
        Ok(())
    }

    fn finish(mut self, line: u32) -> Result<CodeUnit, AsmError> {
        let falls_off = !matches!(
            self.code.last(),
            Some(Pending::Ready(Instr::Return | Instr::Raise) | Pending::Jump { mnemonic: "jump", .. })
        );
        let label_at_end = self.labels.values().any(|&t| t == self.code.len());
        if falls_off || label_at_end {
            self.emit(Pending::Ready(Instr::Push(Constant::None)), line);
            self.emit(Pending::Ready(Instr::Return), line);
        }

        let mut code = Vec::with_capacity(self.code.len());
        for pending in self.code {
            let instr = match pending {
                Pending::Ready(instr) => instr,
                Pending::Jump {
                    mnemonic,
                    label,
                    line,
                } => {
                    let Some(&target) = self.labels.get(&label) else {
                        return Err(AsmError::UndefinedLabel { line, label });
                    };
                    match mnemonic {
                        "jump" => Instr::Jump(target),
                        "jump_if_false" => Instr::JumpIfFalse(target),
                        "jump_if_true" => Instr::JumpIfTrue(target),
                        "for_iter" => Instr::ForIter(target),
                        _ => Instr::PushHandler(target),
                    }
                }
            };
            code.push(instr);
        }

        let locals = u16::try_from(self.locals.len()).map_err(|_| syntax(line, "too many locals"))?;
        Ok(CodeUnit::new(self.name, self.arity, locals, code, self.lines)?)
    }
}

/// Parse `name argc`
fn callee(operand: &str, line: u32) -> Result<(Arc<str>, u8), AsmError> {
    let mut parts = operand.split_whitespace();
    let (Some(name), argc, None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(syntax(line, "expected `name [argc]`"));
    };
    if !IDENT.is_match(name) {
        return Err(syntax(line, format!("invalid function name {:?}", name)));
    }
    let argc = match argc {
        Some(n) => n
            .parse()
            .map_err(|_| syntax(line, format!("invalid argument count {:?}", n)))?,
        None => 0,
    };
    Ok((Arc::from(name), argc))
}

fn constant(operand: &str, line: u32) -> Result<Constant, AsmError> {
    match operand {
        "" => Err(syntax(line, "push needs a value")),
        "none" => Ok(Constant::None),
        "true" => Ok(Constant::Bool(true)),
        "false" => Ok(Constant::Bool(false)),
        s if s.starts_with('"') => string_literal(s, line).map(|s| Constant::Str(Arc::from(s))),
        s => s
            .parse()
            .map(Constant::Int)
            .map_err(|_| syntax(line, format!("invalid constant {:?}", s))),
    }
}

fn string_literal(text: &str, line: u32) -> Result<String, AsmError> {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| syntax(line, "unterminated string"))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            other => {
                return Err(syntax(line, format!("invalid escape \\{}", other.unwrap_or(' '))))
            }
        }
    }
    Ok(out)
}

/// Split a source line into statements, dropping comments. `;` and `#`
/// inside string literals are kept.
fn statements(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            ';' => {
                out.push(&text[start..i]);
                start = i + 1;
            }
            '#' => {
                out.push(&text[start..i]);
                start = text.len();
                break;
            }
            _ => {}
        }
    }
    out.push(&text[start..]);
    out.into_iter().map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Assemble a program from source text
pub fn parse(source: &str) -> Result<Program, AsmError> {
    let mut units = Vec::new();
    let mut current: Option<FnBuilder> = None;

    for (index, text) in source.lines().enumerate() {
        let line = u32::try_from(index + 1).map_err(|_| syntax(u32::MAX, "source too long"))?;
        for stmt in statements(text) {
            if let Some(caps) = HEADER.captures(stmt) {
                if let Some(open) = &current {
                    return Err(syntax(line, format!("function {} is missing `end`", open.name)));
                }
                current = Some(FnBuilder::new(&caps[1], &caps[2], line)?);
                continue;
            }
            let Some(builder) = current.as_mut() else {
                return Err(syntax(line, "statement outside a function"));
            };
            if stmt == "end" {
                if let Some(done) = current.take() {
                    units.push(done.finish(line)?);
                }
                continue;
            }
            let stmt = match LABEL.captures(stmt) {
                Some(caps) => {
                    builder.label(&caps[1], line)?;
                    caps.get(2).map_or("", |m| m.as_str())
                }
                None => stmt,
            };
            if !stmt.is_empty() {
                builder.statement(stmt, line)?;
            }
        }
    }

    if let Some(open) = current {
        return Err(AsmError::Unterminated(open.name));
    }
    Ok(Program::new(units)?)
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
