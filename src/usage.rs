//! Usage-grammar parsing for command groups.
//!
//! Each command group declares its valid invocation forms as a verbatim
//! usage block (the same text rendered in every [`UsageError`]) plus an
//! option table. [`UsageGrammar::compile`] turns the block into match forms
//! once per process; [`UsageGrammar::parse`] validates a raw argument vector
//! against them and produces a [`ParsedArgs`] with the resolved action.
//!
//! Parsing is purely syntactic. Cross-field rules (commit requires branch,
//! numeric ranges) belong to the command handlers.

use std::collections::HashMap;

use crate::errors::UsageError;

/// Declaration of a single option: long name, optional short alias, whether
/// it consumes a value, and an optional closed set of accepted values.
#[derive(Debug, Clone)]
pub struct OptSpec {
    long: &'static str,
    short: Option<char>,
    takes_value: bool,
    choices: &'static [&'static str],
}

impl OptSpec {
    pub const fn flag(long: &'static str) -> Self {
        Self { long, short: None, takes_value: false, choices: &[] }
    }

    pub const fn value(long: &'static str) -> Self {
        Self { long, short: None, takes_value: true, choices: &[] }
    }

    pub const fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub const fn choices(mut self, choices: &'static [&'static str]) -> Self {
        self.choices = choices;
        self
    }
}

/// One positional element of a usage form.
#[derive(Debug, Clone)]
enum PosToken {
    /// Literal word, possibly with alternatives: `(bp | blueprint)`.
    Literal(Vec<String>),
    /// `<name>` placeholder binding one argument.
    Arg(String),
}

/// Option admitted by a form, optionally pinned to a literal value
/// (`--output=json` admits `--output` only with the value `json`).
#[derive(Debug, Clone)]
struct AllowedOpt {
    long: String,
    literal: Option<String>,
}

#[derive(Debug, Clone)]
struct Form {
    tokens: Vec<PosToken>,
    /// `[options]` in the form admits the whole option table.
    admits_all: bool,
    allowed: Vec<AllowedOpt>,
    action: Option<String>,
}

impl Form {
    /// Match the positional skeleton, binding `<name>` placeholders.
    fn match_positionals(&self, positionals: &[String]) -> Option<HashMap<String, ArgValue>> {
        if positionals.len() != self.tokens.len() {
            return None;
        }
        let mut bound = HashMap::new();
        for (token, word) in self.tokens.iter().zip(positionals) {
            match token {
                PosToken::Literal(alts) => {
                    if !alts.iter().any(|alt| alt == word) {
                        return None;
                    }
                }
                PosToken::Arg(name) => {
                    bound.insert(name.clone(), ArgValue::Str(word.clone()));
                }
            }
        }
        Some(bound)
    }

    fn admits(&self, opts: &[(String, Option<String>)]) -> bool {
        if self.admits_all {
            return true;
        }
        opts.iter().all(|(long, value)| {
            self.allowed.iter().any(|allowed| {
                allowed.long == *long
                    && match &allowed.literal {
                        Some(literal) => value.as_deref() == Some(literal.as_str()),
                        None => true,
                    }
            })
        })
    }
}

/// Compiled usage grammar for one command group.
#[derive(Debug)]
pub struct UsageGrammar {
    usage: String,
    forms: Vec<Form>,
    options: Vec<OptSpec>,
}

/// Immutable view of one parsed invocation: the resolved action plus every
/// bound option, flag, and positional. Never mutated after parsing.
#[derive(Debug)]
pub struct ParsedArgs {
    action: Option<String>,
    values: HashMap<String, ArgValue>,
}

#[derive(Debug, Clone)]
enum ArgValue {
    Str(String),
    Flag,
}

impl ParsedArgs {
    /// Action named by the matched form, if the form carries one. The base
    /// action-less form (`torque sb [--help]`) resolves to `None`.
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// String value of an option or positional.
    pub fn value(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// True when a boolean flag was given.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(ArgValue::Flag))
    }
}

impl UsageGrammar {
    /// Compile a usage block against its option table.
    ///
    /// Grammars are embedded constants; a malformed one is a programming
    /// error and panics at first use, like any other bad embedded data.
    pub fn compile(usage: &str, options: Vec<OptSpec>) -> Self {
        let mut forms = Vec::new();
        for line in usage.lines() {
            let line = line.trim();
            if line.is_empty() || line == "usage:" {
                continue;
            }
            forms.push(compile_form(line, &options));
        }
        assert!(!forms.is_empty(), "usage block declares no forms:\n{usage}");
        Self { usage: usage.to_string(), forms, options }
    }

    /// The verbatim usage block, doubling as help text.
    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// Action tokens declared across all forms, in declaration order.
    pub fn actions(&self) -> Vec<&str> {
        let mut actions = Vec::new();
        for form in &self.forms {
            if let Some(action) = form.action.as_deref() {
                if !actions.contains(&action) {
                    actions.push(action);
                }
            }
        }
        actions
    }

    /// Validate an argument vector. The first form whose positional skeleton
    /// and option set both match wins; a help flag short-circuits to a
    /// [`UsageError`] carrying the grammar, as does any mismatch.
    pub fn parse(&self, argv: &[String]) -> Result<ParsedArgs, UsageError> {
        let (positionals, opts) = self.lex(argv)?;

        if opts.iter().any(|(long, _)| long == "help") {
            return Err(UsageError::new(&self.usage));
        }

        for form in &self.forms {
            let Some(mut values) = form.match_positionals(&positionals) else {
                continue;
            };
            if !form.admits(&opts) {
                continue;
            }
            for (long, value) in &opts {
                let bound = match value {
                    Some(v) => ArgValue::Str(v.clone()),
                    None => ArgValue::Flag,
                };
                values.insert(long.clone(), bound);
            }
            return Ok(ParsedArgs { action: form.action.clone(), values });
        }

        Err(UsageError::new(&self.usage))
    }

    /// Split argv into positional words and resolved (long-name, value)
    /// option pairs. Unknown options, missing values, and out-of-set choices
    /// all fail here with the grammar.
    fn lex(
        &self,
        argv: &[String],
    ) -> Result<(Vec<String>, Vec<(String, Option<String>)>), UsageError> {
        let mut positionals = Vec::new();
        let mut opts = Vec::new();

        let mut iter = argv.iter();
        while let Some(word) = iter.next() {
            let spec = if let Some(rest) = word.strip_prefix("--") {
                if rest.is_empty() {
                    positionals.extend(iter.by_ref().cloned());
                    break;
                }
                let name = rest.split_once('=').map(|(n, _)| n).unwrap_or(rest);
                self.find_long(name)
            } else if let Some(rest) = word.strip_prefix('-') {
                let mut chars = rest.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphabetic() => self.find_short(c),
                    _ => {
                        // Not an option ("-", "-10"); let form matching
                        // reject it.
                        positionals.push(word.clone());
                        continue;
                    }
                }
            } else {
                positionals.push(word.clone());
                continue;
            };

            let Some(spec) = spec else {
                return Err(UsageError::new(&self.usage));
            };

            let inline = word.split_once('=').map(|(_, v)| v.to_string());
            if spec.takes_value {
                let value = match inline {
                    Some(v) => v,
                    None => match iter.next() {
                        Some(v) => v.clone(),
                        None => return Err(UsageError::new(&self.usage)),
                    },
                };
                if !spec.choices.is_empty() && !spec.choices.contains(&value.as_str()) {
                    return Err(UsageError::new(&self.usage));
                }
                opts.push((spec.long.to_string(), Some(value)));
            } else {
                if inline.is_some() {
                    return Err(UsageError::new(&self.usage));
                }
                opts.push((spec.long.to_string(), None));
            }
        }

        Ok((positionals, opts))
    }

    fn find_long(&self, name: &str) -> Option<&OptSpec> {
        self.options.iter().find(|spec| spec.long == name)
    }

    fn find_short(&self, short: char) -> Option<&OptSpec> {
        self.options.iter().find(|spec| spec.short == Some(short))
    }
}

/// Compile one usage line into a form. The leading program name is not part
/// of the argument vector and is skipped.
fn compile_form(line: &str, options: &[OptSpec]) -> Form {
    let mut tokens = Vec::new();
    let mut admits_all = false;
    let mut allowed = Vec::new();

    for (index, chunk) in chunks(line).into_iter().enumerate() {
        match chunk {
            Chunk::Word(word) if index == 0 => {
                // Program name ("torque"); argv starts at the group token.
                debug_assert!(!word.starts_with('-'), "usage line must start with the program name");
            }
            Chunk::Word(word) => {
                if let Some(name) = word.strip_prefix('<') {
                    let name = name.strip_suffix('>').unwrap_or_else(|| {
                        panic!("unterminated placeholder `{word}` in usage line: {line}")
                    });
                    tokens.push(PosToken::Arg(name.to_string()));
                } else {
                    tokens.push(PosToken::Literal(vec![word]));
                }
            }
            Chunk::Group(content) => {
                let alts = content.split('|').map(|alt| alt.trim().to_string()).collect();
                tokens.push(PosToken::Literal(alts));
            }
            Chunk::Optional(content) => {
                compile_optional(&content, options, line, &mut admits_all, &mut allowed);
            }
        }
    }

    // The action is the first literal after the group selector.
    let action = tokens
        .iter()
        .skip(1)
        .find_map(|token| match token {
            PosToken::Literal(alts) => alts.first().cloned(),
            PosToken::Arg(_) => None,
        });

    Form { tokens, admits_all, allowed, action }
}

/// Compile the contents of one `[...]` group into admitted options.
///
/// Alternation inside a group only pins literal values; the options
/// themselves are admitted independently, matching how docopt treats
/// bracketed elements. `[--output=json | --output=json --detail]` therefore
/// accepts `--detail` on its own.
fn compile_optional(
    content: &str,
    options: &[OptSpec],
    line: &str,
    admits_all: &mut bool,
    allowed: &mut Vec<AllowedOpt>,
) {
    for word in content.split_whitespace() {
        if word == "|" {
            continue;
        }
        if word == "options" {
            *admits_all = true;
            continue;
        }
        if word.starts_with('<') {
            // Value placeholder of the preceding option.
            continue;
        }
        for piece in split_alternatives(word) {
            let (name, literal) = if let Some(rest) = piece.strip_prefix("--") {
                match rest.split_once('=') {
                    Some((name, value)) if !value.starts_with('<') && !value.starts_with('{') => {
                        (name.to_string(), Some(value.to_string()))
                    }
                    Some((name, _)) => (name.to_string(), None),
                    None => (rest.to_string(), None),
                }
            } else if let Some(rest) = piece.strip_prefix('-') {
                let short = rest.chars().next().unwrap_or_else(|| {
                    panic!("dangling `-` in usage line: {line}")
                });
                let spec = options
                    .iter()
                    .find(|spec| spec.short == Some(short))
                    .unwrap_or_else(|| panic!("usage line mentions undeclared option -{short}: {line}"));
                (spec.long.to_string(), None)
            } else {
                panic!("unexpected token `{piece}` in optional group: {line}");
            };

            if options.iter().all(|spec| spec.long != name) {
                panic!("usage line mentions undeclared option --{name}: {line}");
            }
            allowed.push(AllowedOpt { long: name, literal });
        }
    }
}

/// Split an optional-group word on `|` at brace depth zero, so
/// `--help|-h` splits while `--filter={all|my|auto}` does not.
fn split_alternatives(word: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in word.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            '|' if depth == 0 => {
                if !current.is_empty() {
                    pieces.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

#[derive(Debug)]
enum Chunk {
    Word(String),
    /// `(a | b)` literal alternation.
    Group(String),
    /// `[...]` optional option group.
    Optional(String),
}

/// Split a usage line into top-level words, `(...)` groups, and `[...]`
/// groups.
fn chunks(line: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut rest = line.trim();
    while !rest.is_empty() {
        rest = rest.trim_start();
        if let Some(inner) = rest.strip_prefix('(') {
            let end = inner.find(')').unwrap_or_else(|| panic!("unbalanced `(` in usage line: {line}"));
            chunks.push(Chunk::Group(inner[..end].to_string()));
            rest = &inner[end + 1..];
        } else if let Some(inner) = rest.strip_prefix('[') {
            let end = inner.find(']').unwrap_or_else(|| panic!("unbalanced `[` in usage line: {line}"));
            chunks.push(Chunk::Optional(inner[..end].to_string()));
            rest = &inner[end + 1..];
        } else {
            let end = rest.find([' ', '(', '[']).unwrap_or(rest.len());
            chunks.push(Chunk::Word(rest[..end].to_string()));
            rest = &rest[end..];
        }
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    const USAGE: &str = "usage:
        torque (dm | demo) list [--output=json | --output=json --detail]
        torque (dm | demo) show <name> [--branch <branch>] [--count=<N>]
        torque (dm | demo) run <name> [options]
        torque (dm | demo) [--help]";

    fn grammar() -> UsageGrammar {
        UsageGrammar::compile(
            USAGE,
            vec![
                OptSpec::flag("help").short('h'),
                OptSpec::flag("detail"),
                OptSpec::value("output"),
                OptSpec::value("branch").short('b'),
                OptSpec::value("count"),
                OptSpec::value("wait").short('w'),
            ],
        )
    }

    fn argv(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn declared_actions_follow_form_order() {
        assert_eq!(grammar().actions(), vec!["list", "show", "run"]);
    }

    #[test]
    fn resolves_action_from_matched_form() {
        let args = grammar().parse(&argv("demo list")).unwrap();
        assert_eq!(args.action(), Some("list"));

        let args = grammar().parse(&argv("dm show thing")).unwrap();
        assert_eq!(args.action(), Some("show"));
        assert_eq!(args.value("name"), Some("thing"));
    }

    #[test]
    fn base_form_resolves_no_action() {
        let args = grammar().parse(&argv("demo")).unwrap();
        assert_eq!(args.action(), None);
    }

    #[test]
    fn empty_argv_fails_with_verbatim_usage() {
        let err = grammar().parse(&[]).unwrap_err();
        assert_eq!(err.to_string(), USAGE);
    }

    #[test]
    fn unknown_flag_fails_with_verbatim_usage() {
        let err = grammar().parse(&argv("demo list --frobnicate")).unwrap_err();
        assert_eq!(err.to_string(), USAGE);
    }

    #[test]
    fn missing_positional_fails() {
        assert!(grammar().parse(&argv("demo show")).is_err());
    }

    #[test]
    fn help_short_circuits() {
        let err = grammar().parse(&argv("demo list --help")).unwrap_err();
        assert_eq!(err.to_string(), USAGE);
        let err = grammar().parse(&argv("demo -h")).unwrap_err();
        assert_eq!(err.to_string(), USAGE);
    }

    #[test]
    fn option_values_bind_inline_and_split() {
        let args = grammar().parse(&argv("demo show x --branch dev")).unwrap();
        assert_eq!(args.value("branch"), Some("dev"));

        let args = grammar().parse(&argv("demo show x --count=7")).unwrap();
        assert_eq!(args.value("count"), Some("7"));
    }

    #[test]
    fn value_option_consumes_next_token_even_if_negative() {
        let args = grammar().parse(&argv("demo run x --wait -10")).unwrap();
        assert_eq!(args.value("wait"), Some("-10"));
    }

    #[test]
    fn bracketed_options_are_admitted_independently() {
        // Alternation does not tie --detail to --output=json; each option
        // in the group stands on its own.
        let args = grammar().parse(&argv("demo list --detail")).unwrap();
        assert!(args.flag("detail"));
        assert_eq!(args.value("output"), None);
    }

    #[test]
    fn literal_pinned_option_rejects_other_values() {
        assert!(grammar().parse(&argv("demo list --output=json")).is_ok());
        assert!(grammar().parse(&argv("demo list --output=yaml")).is_err());
    }

    #[test]
    fn options_shorthand_admits_whole_table() {
        let args = grammar().parse(&argv("demo run x --branch dev --count 3")).unwrap();
        assert_eq!(args.action(), Some("run"));
        assert_eq!(args.value("branch"), Some("dev"));
    }

    #[test]
    fn choices_are_enforced_at_lex_time() {
        let grammar = UsageGrammar::compile(
            "usage:\n        torque demo list [--filter={all|my|auto}]",
            vec![
                OptSpec::flag("help").short('h'),
                OptSpec::value("filter").choices(&["all", "my", "auto"]),
            ],
        );
        assert!(grammar.parse(&argv("demo list --filter my")).is_ok());
        assert!(grammar.parse(&argv("demo list --filter theirs")).is_err());
    }
}
