/// Statement rules
///
/// Single-line statements: action statements, specification statements
/// and the begin/end statements of program units. Statements that open
/// or continue a construct (`IF ... THEN`, `DO`, `CASE`, ...) live in
/// `construct`.
use std::sync::Arc;

use super::registry::{GrammarBuilder, RuleDescriptor};
use super::RuleId;
use crate::engine::combinators::{
    bracketed, built, call, canonical_keyword, end_stmt, find_assignment_eq, keyword_value,
    pattern, separator, sequence, starts_with_word_char, strip_keyword, terminal, word_cls,
    CallOptions, Callee, WordOptions, PARENS,
};
use crate::engine::{MatchResult, Session};
use crate::error::ParseError;
use crate::node::{Child, Node, Shape};
use crate::text::patterns::{ENTITY_DECL_RE, LABEL_RE, TYPE_SPEC_HEAD_RE};
use crate::text::{is_bracketed, mask, split_bracketed, Masked};

const REQUIRED: WordOptions = WordOptions {
    colons: false,
    require_cls: true,
};
const OPTIONAL: WordOptions = WordOptions {
    colons: false,
    require_cls: false,
};

// ===== SHARED PIECES =====

/// Split a leading `( ... )` group off `text`
pub(crate) fn leading_group(text: &str) -> Option<(&str, &str)> {
    if !text.starts_with('(') {
        return None;
    }
    let groups = split_bracketed(text, "(", ")");
    let first = groups.first()?;
    if !is_bracketed(first, '(', ')') {
        return None;
    }
    Some(text.split_at(first.len()))
}

/// `KEYWORD (condition) rest`: the matched condition and the untrimmed
/// text after it
pub(crate) fn keyword_condition<'a>(
    s: &mut Session<'_>,
    keyword: &str,
    input: &'a str,
) -> Result<Option<(Arc<Node>, &'a str)>, ParseError> {
    let Some(rest) = strip_keyword(input.trim(), keyword) else {
        return Ok(None);
    };
    let Some((group, after)) = leading_group(rest.trim_start()) else {
        return Ok(None);
    };
    let Some(condition) = s.match_rule(RuleId::Parenthesis, group)? else {
        return Ok(None);
    };
    Ok(Some((condition, after)))
}

/// `lhs <op> rhs` split at byte `pos` of the masked text
fn assign_parts(
    s: &mut Session<'_>,
    rule: RuleId,
    masked: &Masked,
    pos: usize,
    op: &str,
) -> MatchResult {
    let lhs = masked.map.unmask_trimmed(&masked.text[..pos]);
    let rhs = masked.map.unmask_trimmed(&masked.text[pos + op.len()..]);
    if lhs.is_empty() || rhs.is_empty() {
        return Ok(None);
    }
    let Some(target) = s.match_rule(RuleId::Designator, &lhs)? else {
        return Ok(None);
    };
    let Some(value) = s.match_rule(RuleId::Expr, &rhs)? else {
        return Ok(None);
    };
    built(
        rule,
        Shape::Binary,
        vec![Child::Node(target), Child::token(op), Child::Node(value)],
    )
}

// ===== ACTION STATEMENTS =====

fn assignment_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let masked = mask(input.trim());
    let Some(pos) = find_assignment_eq(&masked.text) else {
        return Ok(None);
    };
    assign_parts(s, RuleId::AssignmentStmt, &masked, pos, "=")
}

fn pointer_assignment_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let masked = mask(input.trim());
    let Some(pos) = masked.text.find("=>") else {
        return Ok(None);
    };
    assign_parts(s, RuleId::PointerAssignmentStmt, &masked, pos, "=>")
}

fn call_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    word_cls(s, RuleId::CallStmt, "CALL", RuleId::ProcedureCall, input, REQUIRED)
}

fn procedure_call(s: &mut Session<'_>, input: &str) -> MatchResult {
    let options = CallOptions {
        allow_bare: true,
        ..CallOptions::default()
    };
    call(
        s,
        RuleId::ProcedureCall,
        Callee::Rule(RuleId::Designator),
        RuleId::ActualArgSpecList,
        input,
        options,
    )
}

fn continue_stmt(_: &mut Session<'_>, input: &str) -> MatchResult {
    terminal(RuleId::ContinueStmt, input, &["CONTINUE"])
}

fn cycle_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    word_cls(s, RuleId::CycleStmt, "CYCLE", RuleId::Name, input, OPTIONAL)
}

fn exit_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    word_cls(s, RuleId::ExitStmt, "EXIT", RuleId::Name, input, OPTIONAL)
}

fn goto_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    word_cls(s, RuleId::GotoStmt, "GO TO", RuleId::Label, input, REQUIRED)
}

fn label(_: &mut Session<'_>, input: &str) -> MatchResult {
    pattern(RuleId::Label, &LABEL_RE, input, false)
}

/// `IF (cond) action`; the action may not be another IF statement
fn if_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let Some((condition, rest)) = keyword_condition(s, "IF", input)? else {
        return Ok(None);
    };
    let rest = rest.trim();
    if rest.is_empty() {
        return Ok(None);
    }
    let Some(action) = s.match_rule(RuleId::ActionStmt, rest)? else {
        return Ok(None);
    };
    if action.rule() == RuleId::IfStmt {
        return Ok(None);
    }
    built(
        RuleId::IfStmt,
        Shape::Words,
        vec![Child::token("IF"), Child::Node(condition), Child::Node(action)],
    )
}

fn print_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    word_cls(s, RuleId::PrintStmt, "PRINT", RuleId::OutputItemList, input, REQUIRED)
}

fn output_item_list(s: &mut Session<'_>, input: &str) -> MatchResult {
    sequence(s, RuleId::OutputItemList, ',', RuleId::OutputItem, input)
}

/// `READ (control) [items]` or `READ format, items`
fn read_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    if let Some(node) = io_stmt(s, RuleId::ReadStmt, "READ", RuleId::InputItemList, input)? {
        return Ok(Some(node));
    }
    word_cls(s, RuleId::ReadStmt, "READ", RuleId::OutputItemList, input, REQUIRED)
}

fn write_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    io_stmt(s, RuleId::WriteStmt, "WRITE", RuleId::OutputItemList, input)
}

fn io_stmt(
    s: &mut Session<'_>,
    rule: RuleId,
    keyword: &str,
    items: RuleId,
    input: &str,
) -> MatchResult {
    let Some(rest) = strip_keyword(input.trim(), keyword) else {
        return Ok(None);
    };
    let Some((group, after)) = leading_group(rest.trim_start()) else {
        return Ok(None);
    };
    let Some(control) = s.match_rule(RuleId::IoControl, group)? else {
        return Ok(None);
    };
    let mut children = vec![Child::token(keyword), Child::Node(control)];
    let after = after.trim();
    if !after.is_empty() {
        let Some(list) = s.match_rule(items, after)? else {
            return Ok(None);
        };
        children.push(Child::Node(list));
    }
    built(rule, Shape::Words, children)
}

fn io_control(s: &mut Session<'_>, input: &str) -> MatchResult {
    bracketed(s, RuleId::IoControl, PARENS, RuleId::IoControlSpecList, input, true)
}

fn io_control_spec_list(s: &mut Session<'_>, input: &str) -> MatchResult {
    sequence(s, RuleId::IoControlSpecList, ',', RuleId::IoControlSpec, input)
}

/// `[UNIT =] 10`, `FMT = *`, `IOSTAT = ios`, ...
fn io_control_spec(s: &mut Session<'_>, input: &str) -> MatchResult {
    keyword_value(s, RuleId::IoControlSpec, RuleId::Name, RuleId::IoUnit, input, false)
}

fn input_item_list(s: &mut Session<'_>, input: &str) -> MatchResult {
    sequence(s, RuleId::InputItemList, ',', RuleId::Designator, input)
}

fn return_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    word_cls(s, RuleId::ReturnStmt, "RETURN", RuleId::Expr, input, OPTIONAL)
}

fn stop_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    word_cls(s, RuleId::StopStmt, "STOP", RuleId::Expr, input, OPTIONAL)
}

/// `WHERE (mask) assignment`
fn where_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let Some((mask_expr, rest)) = keyword_condition(s, "WHERE", input)? else {
        return Ok(None);
    };
    let rest = rest.trim();
    if rest.is_empty() {
        return Ok(None);
    }
    let Some(assignment) = s.match_rule(RuleId::AssignmentStmt, rest)? else {
        return Ok(None);
    };
    built(
        RuleId::WhereStmt,
        Shape::Words,
        vec![
            Child::token("WHERE"),
            Child::Node(mask_expr),
            Child::Node(assignment),
        ],
    )
}

fn allocation(s: &mut Session<'_>, rule: RuleId, keyword: &str, input: &str) -> MatchResult {
    let options = CallOptions {
        require_args: true,
        ..CallOptions::default()
    };
    call(
        s,
        rule,
        Callee::Keyword(keyword),
        RuleId::ActualArgSpecList,
        input,
        options,
    )
}

fn allocate_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    allocation(s, RuleId::AllocateStmt, "ALLOCATE", input)
}

fn deallocate_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    allocation(s, RuleId::DeallocateStmt, "DEALLOCATE", input)
}

// ===== USE / IMPLICIT / ACCESS =====

/// `USE [, nature ::] module [, ONLY: list | , rename-list]`
fn use_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let Some(rest) = strip_keyword(input.trim(), "USE") else {
        return Ok(None);
    };
    if starts_with_word_char(rest) {
        return Ok(None);
    }
    let mut rest = rest.trim_start();
    let mut head = String::from("USE");
    if let Some(after) = rest.strip_prefix(',') {
        let after = after.trim_start();
        let (nature, after) = if let Some(a) = strip_keyword(after, "NON_INTRINSIC") {
            ("NON_INTRINSIC", a)
        } else if let Some(a) = strip_keyword(after, "INTRINSIC") {
            ("INTRINSIC", a)
        } else {
            return Ok(None);
        };
        head.push_str(", ");
        head.push_str(nature);
        rest = after.trim_start();
        if !rest.starts_with("::") {
            return Ok(None);
        }
    }
    if let Some(after) = rest.strip_prefix("::") {
        head.push_str(" ::");
        rest = after.trim_start();
    }
    head.push(' ');

    let (module, list) = match rest.split_once(',') {
        Some((module, list)) => (module.trim(), Some(list.trim())),
        None => (rest.trim(), None),
    };
    let Some(module) = s.match_rule(RuleId::Name, module)? else {
        return Ok(None);
    };
    let mut children = vec![Child::token(head), Child::Node(module)];
    let Some(list) = list else {
        return built(RuleId::UseStmt, Shape::Glued, children);
    };
    let only = strip_keyword(list, "ONLY")
        .map(str::trim_start)
        .and_then(|r| r.strip_prefix(':'))
        .filter(|r| !r.starts_with(':'));
    let (prefix, items) = match only {
        Some(items) if items.trim().is_empty() => {
            children.push(Child::token(", ONLY:"));
            return built(RuleId::UseStmt, Shape::Glued, children);
        }
        Some(items) => (", ONLY: ", items.trim()),
        None => (", ", list),
    };
    let Some(items) = s.match_rule(RuleId::OnlyList, items)? else {
        return Ok(None);
    };
    children.push(Child::token(prefix));
    children.push(Child::Node(items));
    built(RuleId::UseStmt, Shape::Glued, children)
}

fn only_list(s: &mut Session<'_>, input: &str) -> MatchResult {
    sequence(s, RuleId::OnlyList, ',', RuleId::Rename, input)
}

fn rename(s: &mut Session<'_>, input: &str) -> MatchResult {
    let text = input.trim();
    let Some((local, used)) = text.split_once("=>") else {
        return Ok(None);
    };
    let Some(local) = s.match_rule(RuleId::Name, local.trim())? else {
        return Ok(None);
    };
    let Some(used) = s.match_rule(RuleId::Name, used.trim())? else {
        return Ok(None);
    };
    built(
        RuleId::Rename,
        Shape::Binary,
        vec![Child::Node(local), Child::token("=>"), Child::Node(used)],
    )
}

fn implicit_stmt(_: &mut Session<'_>, input: &str) -> MatchResult {
    terminal(RuleId::ImplicitStmt, input, &["IMPLICIT NONE"])
}

fn access_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let options = WordOptions {
        colons: true,
        require_cls: false,
    };
    for keyword in ["PUBLIC", "PRIVATE"] {
        if let Some(node) = word_cls(s, RuleId::AccessStmt, keyword, RuleId::AccessIdList, input, options)? {
            return Ok(Some(node));
        }
    }
    Ok(None)
}

fn access_id_list(s: &mut Session<'_>, input: &str) -> MatchResult {
    sequence(s, RuleId::AccessIdList, ',', RuleId::Name, input)
}

// ===== TYPE DECLARATIONS =====

const INTRINSIC_TYPES: &[&str] = &[
    "DOUBLE PRECISION",
    "DOUBLE COMPLEX",
    "INTEGER",
    "REAL",
    "COMPLEX",
    "LOGICAL",
    "CHARACTER",
];

/// `type-spec [, attr-list] :: entity-list`, or the old form without
/// attributes and `::`. Always printed with `::`.
fn type_declaration_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let masked = mask(input.trim());
    let (head, entities) = match masked.text.find("::") {
        Some(pos) => (&masked.text[..pos], &masked.text[pos + 2..]),
        None => {
            let Some(found) = TYPE_SPEC_HEAD_RE.find(&masked.text) else {
                return Ok(None);
            };
            let rest = &masked.text[found.end()..];
            let separated = rest.starts_with(char::is_whitespace) || found.as_str().ends_with(')');
            if !separated || rest.trim_start().starts_with(',') {
                return Ok(None);
            }
            (found.as_str(), rest)
        }
    };
    let head = head.trim();
    let entities = masked.map.unmask_trimmed(entities);
    if head.is_empty() || entities.is_empty() {
        return Ok(None);
    }
    let (type_part, attrs) = match head.split_once(',') {
        Some((spec, attrs)) => (spec, Some(masked.map.unmask_trimmed(attrs))),
        None => (head, None),
    };
    let type_part = masked.map.unmask_trimmed(type_part);
    let Some(type_spec) = s.match_rule(RuleId::DeclarationTypeSpec, &type_part)? else {
        return Ok(None);
    };
    let mut children = vec![Child::Node(type_spec)];
    if let Some(attrs) = attrs {
        if attrs.is_empty() {
            return Ok(None);
        }
        let Some(attrs) = s.match_rule(RuleId::AttrSpecList, &attrs)? else {
            return Ok(None);
        };
        children.push(Child::token(", "));
        children.push(Child::Node(attrs));
    }
    let Some(entities) = s.match_rule(RuleId::EntityDeclList, &entities)? else {
        return Ok(None);
    };
    children.push(Child::token(" :: "));
    children.push(Child::Node(entities));
    built(RuleId::TypeDeclarationStmt, Shape::Glued, children)
}

/// `INTEGER`, `REAL(kind=dp)`, `CHARACTER*10`, `DOUBLE PRECISION`
fn intrinsic_type_spec(s: &mut Session<'_>, input: &str) -> MatchResult {
    let text = input.trim();
    for keyword in INTRINSIC_TYPES {
        let Some(rest) = strip_keyword(text, keyword) else {
            continue;
        };
        if starts_with_word_char(rest) {
            continue;
        }
        let keyword = canonical_keyword(keyword);
        let rest = rest.trim();
        if rest.is_empty() {
            return Ok(Some(Node::leaf(RuleId::IntrinsicTypeSpec, keyword).into_arc()));
        }
        let selector = if let Some(length) = rest.strip_prefix('*') {
            let length = length.trim();
            let valid = (!length.is_empty() && length.chars().all(|c| c.is_ascii_digit()))
                || leading_group(length).is_some_and(|(_, after)| after.is_empty());
            if !valid {
                return Ok(None);
            }
            Child::token(format!("*{length}"))
        } else {
            let Some(kind) = s.match_rule(RuleId::KindSelector, rest)? else {
                return Ok(None);
            };
            Child::Node(kind)
        };
        return built(
            RuleId::IntrinsicTypeSpec,
            Shape::Glued,
            vec![Child::token(keyword), selector],
        );
    }
    Ok(None)
}

fn kind_selector(s: &mut Session<'_>, input: &str) -> MatchResult {
    bracketed(s, RuleId::KindSelector, PARENS, RuleId::TypeParamSpecList, input, true)
}

/// `TYPE(name)`, `CLASS(name)`, `CLASS(*)`
fn derived_type_spec(s: &mut Session<'_>, input: &str) -> MatchResult {
    let text = input.trim();
    for keyword in ["TYPE", "CLASS"] {
        let Some(rest) = strip_keyword(text, keyword) else {
            continue;
        };
        let Some((group, after)) = leading_group(rest.trim_start()) else {
            continue;
        };
        if !after.trim().is_empty() {
            continue;
        }
        let inner = group[1..group.len() - 1].trim();
        let Some(spec) = s.match_rule(RuleId::TypeSpec, inner)? else {
            continue;
        };
        return built(
            RuleId::DerivedTypeSpec,
            Shape::Glued,
            vec![
                Child::token(format!("{keyword}(")),
                Child::Node(spec),
                Child::token(")"),
            ],
        );
    }
    Ok(None)
}

fn type_param_spec_list(s: &mut Session<'_>, input: &str) -> MatchResult {
    sequence(s, RuleId::TypeParamSpecList, ',', RuleId::TypeParamSpec, input)
}

fn type_param_spec(s: &mut Session<'_>, input: &str) -> MatchResult {
    keyword_value(s, RuleId::TypeParamSpec, RuleId::Name, RuleId::TypeParamValue, input, true)
}

fn type_param_value(_: &mut Session<'_>, input: &str) -> MatchResult {
    terminal(RuleId::TypeParamValue, input, &["*", ":"])
}

fn attr_spec_list(s: &mut Session<'_>, input: &str) -> MatchResult {
    sequence(s, RuleId::AttrSpecList, ',', RuleId::AttrSpec, input)
}

fn attr_keyword(_: &mut Session<'_>, input: &str) -> MatchResult {
    terminal(
        RuleId::AttrKeyword,
        input,
        &[
            "ALLOCATABLE",
            "ASYNCHRONOUS",
            "CONTIGUOUS",
            "EXTERNAL",
            "INTRINSIC",
            "OPTIONAL",
            "PARAMETER",
            "POINTER",
            "PRIVATE",
            "PROTECTED",
            "PUBLIC",
            "SAVE",
            "TARGET",
            "VALUE",
            "VOLATILE",
        ],
    )
}

fn dimension_spec(s: &mut Session<'_>, input: &str) -> MatchResult {
    let options = CallOptions {
        require_args: true,
        ..CallOptions::default()
    };
    call(
        s,
        RuleId::DimensionSpec,
        Callee::Keyword("DIMENSION"),
        RuleId::ArraySpec,
        input,
        options,
    )
}

fn intent_spec(s: &mut Session<'_>, input: &str) -> MatchResult {
    let options = CallOptions {
        require_args: true,
        ..CallOptions::default()
    };
    call(
        s,
        RuleId::IntentSpec,
        Callee::Keyword("INTENT"),
        RuleId::IntentKeyword,
        input,
        options,
    )
}

fn intent_keyword(_: &mut Session<'_>, input: &str) -> MatchResult {
    terminal(RuleId::IntentKeyword, input, &["INOUT", "IN OUT", "IN", "OUT"])
}

fn array_spec(s: &mut Session<'_>, input: &str) -> MatchResult {
    sequence(s, RuleId::ArraySpec, ',', RuleId::ShapeSpec, input)
}

fn range_spec(s: &mut Session<'_>, input: &str) -> MatchResult {
    separator(s, RuleId::RangeSpec, RuleId::Expr, RuleId::Expr, input)
}

fn entity_decl_list(s: &mut Session<'_>, input: &str) -> MatchResult {
    sequence(s, RuleId::EntityDeclList, ',', RuleId::EntityDecl, input)
}

/// `name [(array-spec)] [*len] [= init | => init]`
fn entity_decl(s: &mut Session<'_>, input: &str) -> MatchResult {
    let masked = mask(input.trim());
    let (decl, init) = if let Some(pos) = masked.text.find("=>") {
        (&masked.text[..pos], Some(("=>", &masked.text[pos + 2..])))
    } else if let Some(pos) = find_assignment_eq(&masked.text) {
        (&masked.text[..pos], Some(("=", &masked.text[pos + 1..])))
    } else {
        (masked.text.as_str(), None)
    };
    let Some(caps) = ENTITY_DECL_RE.captures(decl.trim()) else {
        return Ok(None);
    };
    let Some(name) = s.match_rule(RuleId::Name, &caps[1])? else {
        return Ok(None);
    };
    let mut children = vec![Child::Node(name)];
    if let Some(dims) = caps.get(2) {
        let dims = dims.as_str();
        let inner = masked.map.unmask_trimmed(&dims[1..dims.len() - 1]);
        let Some(spec) = s.match_rule(RuleId::ArraySpec, &inner)? else {
            return Ok(None);
        };
        children.extend([Child::token("("), Child::Node(spec), Child::token(")")]);
    }
    if let Some(length) = caps.get(3) {
        children.push(Child::token(format!(
            "*{}",
            masked.map.unmask_trimmed(length.as_str())
        )));
    }
    if let Some((op, value)) = init {
        let value = masked.map.unmask_trimmed(value);
        if value.is_empty() {
            return Ok(None);
        }
        let Some(value) = s.match_rule(RuleId::Expr, &value)? else {
            return Ok(None);
        };
        children.push(Child::token(format!(" {op} ")));
        children.push(Child::Node(value));
    }
    built(RuleId::EntityDecl, Shape::Glued, children)
}

/// `TYPE [[, attrs] ::] name`; the attributes are kept verbatim
fn derived_type_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let Some(rest) = strip_keyword(input.trim(), "TYPE") else {
        return Ok(None);
    };
    if starts_with_word_char(rest) {
        return Ok(None);
    }
    let rest = rest.trim();
    if rest.starts_with('(') {
        return Ok(None);
    }
    let masked = mask(rest);
    let mut head = String::from("TYPE");
    let name = match masked.text.find("::") {
        Some(pos) => {
            let attrs = masked.text[..pos].trim();
            if !attrs.is_empty() {
                let Some(attrs) = attrs.strip_prefix(',') else {
                    return Ok(None);
                };
                let attrs = masked.map.unmask_trimmed(attrs);
                if attrs.is_empty() {
                    return Ok(None);
                }
                head.push_str(", ");
                head.push_str(&attrs);
            }
            head.push_str(" :: ");
            masked.map.unmask_trimmed(&masked.text[pos + 2..])
        }
        None => {
            head.push(' ');
            rest.to_string()
        }
    };
    let Some(name) = s.match_rule(RuleId::Name, &name)? else {
        return Ok(None);
    };
    built(
        RuleId::DerivedTypeStmt,
        Shape::Glued,
        vec![Child::token(head), Child::Node(name)],
    )
}

fn end_type_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    end_stmt(s, RuleId::EndTypeStmt, "TYPE", Some(RuleId::Name), input, true)
}

// ===== PROGRAM UNITS =====

const PREFIX_KEYWORDS: &[&str] = &["ELEMENTAL", "IMPURE", "MODULE", "PURE", "RECURSIVE"];

fn program_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    word_cls(s, RuleId::ProgramStmt, "PROGRAM", RuleId::Name, input, REQUIRED)
}

fn end_program_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    end_stmt(s, RuleId::EndProgramStmt, "PROGRAM", Some(RuleId::Name), input, false)
}

fn module_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    word_cls(s, RuleId::ModuleStmt, "MODULE", RuleId::Name, input, REQUIRED)
}

fn end_module_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    end_stmt(s, RuleId::EndModuleStmt, "MODULE", Some(RuleId::Name), input, false)
}

fn end_subroutine_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    end_stmt(
        s,
        RuleId::EndSubroutineStmt,
        "SUBROUTINE",
        Some(RuleId::Name),
        input,
        false,
    )
}

fn end_function_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    end_stmt(s, RuleId::EndFunctionStmt, "FUNCTION", Some(RuleId::Name), input, false)
}

fn contains_stmt(_: &mut Session<'_>, input: &str) -> MatchResult {
    terminal(RuleId::ContainsStmt, input, &["CONTAINS"])
}

/// Byte offset of `keyword` as a whole word followed by whitespace, in
/// uppercased masked text
fn find_word(upper: &str, keyword: &str) -> Option<usize> {
    upper.match_indices(keyword).map(|(at, _)| at).find(|&at| {
        let before = upper[..at].chars().next_back();
        let after = upper[at + keyword.len()..].chars().next();
        before.map_or(true, char::is_whitespace) && after.is_some_and(char::is_whitespace)
    })
}

/// `[prefix] SUBROUTINE|FUNCTION name [(args)] [suffix]`
fn subprogram_stmt(s: &mut Session<'_>, rule: RuleId, keyword: &str, input: &str) -> MatchResult {
    let masked = mask(input.trim());
    let upper = masked.text.to_ascii_uppercase();
    let Some(at) = find_word(&upper, keyword) else {
        return Ok(None);
    };
    let mut children = Vec::new();
    let prefix = masked.map.unmask_trimmed(&masked.text[..at]);
    if !prefix.is_empty() {
        let Some(prefix) = s.match_rule(RuleId::PrefixSpec, &prefix)? else {
            return Ok(None);
        };
        children.push(Child::Node(prefix));
        children.push(Child::token(" "));
    }

    let after = masked.text[at + keyword.len()..].trim_start();
    let name_len = after
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(after.len());
    let Some(name) = s.match_rule(RuleId::Name, &after[..name_len])? else {
        return Ok(None);
    };
    children.push(Child::token(format!("{keyword} ")));
    children.push(Child::Node(name));

    let mut rest = after[name_len..].trim_start();
    if let Some((group, tail)) = leading_group(rest) {
        let inner = masked.map.unmask_trimmed(&group[1..group.len() - 1]);
        children.push(Child::token("("));
        if !inner.is_empty() {
            let Some(args) = s.match_rule(RuleId::DummyArgList, &inner)? else {
                return Ok(None);
            };
            children.push(Child::Node(args));
        }
        children.push(Child::token(")"));
        rest = tail.trim_start();
    } else if rule == RuleId::FunctionStmt {
        return Ok(None);
    }
    if !rest.is_empty() {
        let suffix = masked.map.unmask_trimmed(rest);
        let Some(suffix) = s.match_rule(RuleId::Suffix, &suffix)? else {
            return Ok(None);
        };
        children.push(Child::token(" "));
        children.push(Child::Node(suffix));
    }
    built(rule, Shape::Glued, children)
}

fn subroutine_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    subprogram_stmt(s, RuleId::SubroutineStmt, "SUBROUTINE", input)
}

fn function_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    subprogram_stmt(s, RuleId::FunctionStmt, "FUNCTION", input)
}

/// `PURE RECURSIVE INTEGER(8)`: prefix keywords and at most one type
fn prefix_spec(s: &mut Session<'_>, input: &str) -> MatchResult {
    let masked = mask(input.trim());
    let words: Vec<&str> = masked.text.split_whitespace().collect();
    let mut children = Vec::new();
    let mut typed = false;
    let mut i = 0;
    while i < words.len() {
        let word = words[i];
        i += 1;
        if PREFIX_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word)) {
            children.push(Child::token(word.to_ascii_uppercase()));
            continue;
        }
        if typed {
            return Ok(None);
        }
        let mut spec = word.to_string();
        if word.eq_ignore_ascii_case("DOUBLE") && i < words.len() {
            spec.push(' ');
            spec.push_str(words[i]);
            i += 1;
        }
        while i < words.len() && (words[i].starts_with('(') || words[i].starts_with('*')) {
            spec.push_str(words[i]);
            i += 1;
        }
        let spec = masked.map.unmask_trimmed(&spec);
        let Some(spec) = s.match_rule(RuleId::DeclarationTypeSpec, &spec)? else {
            return Ok(None);
        };
        children.push(Child::Node(spec));
        typed = true;
    }
    if children.is_empty() {
        return Ok(None);
    }
    built(RuleId::PrefixSpec, Shape::Words, children)
}

fn dummy_arg_list(s: &mut Session<'_>, input: &str) -> MatchResult {
    sequence(s, RuleId::DummyArgList, ',', RuleId::Name, input)
}

/// `RESULT(name)` and/or `BIND(C [, NAME=...])`
fn suffix(s: &mut Session<'_>, input: &str) -> MatchResult {
    let text = input.trim();
    let mut parts = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let open = rest.find('(').unwrap_or(rest.len());
        let keyword = rest[..open].trim();
        let Some((group, tail)) = leading_group(&rest[open..]) else {
            return Ok(None);
        };
        let (keyword, args) = if keyword.eq_ignore_ascii_case("RESULT") {
            ("RESULT", RuleId::Name)
        } else if keyword.eq_ignore_ascii_case("BIND") {
            ("BIND", RuleId::ActualArgSpecList)
        } else {
            return Ok(None);
        };
        let options = CallOptions {
            require_args: true,
            ..CallOptions::default()
        };
        let piece = format!("{keyword}{group}");
        let Some(part) = call(s, RuleId::Suffix, Callee::Keyword(keyword), args, &piece, options)?
        else {
            return Ok(None);
        };
        parts.push(part);
        rest = tail.trim_start();
    }
    if parts.len() < 2 {
        return Ok(parts.pop());
    }
    built(
        RuleId::Suffix,
        Shape::Words,
        parts.into_iter().map(Child::Node).collect(),
    )
}

// ===== REGISTRATION =====

pub fn register(builder: &mut GrammarBuilder) {
    use RuleId as R;

    builder
        .register(RuleDescriptor::delegate(
            R::ActionStmt,
            &[
                R::AssignmentStmt,
                R::PointerAssignmentStmt,
                R::CallStmt,
                R::ContinueStmt,
                R::CycleStmt,
                R::ExitStmt,
                R::GotoStmt,
                R::IfStmt,
                R::PrintStmt,
                R::ReadStmt,
                R::WriteStmt,
                R::ReturnStmt,
                R::StopStmt,
                R::WhereStmt,
                R::AllocateStmt,
                R::DeallocateStmt,
            ],
        ))
        .register(
            RuleDescriptor::text(R::AssignmentStmt, assignment_stmt)
                .uses(&[R::Designator, R::Expr]),
        )
        .register(
            RuleDescriptor::text(R::PointerAssignmentStmt, pointer_assignment_stmt)
                .uses(&[R::Designator, R::Expr]),
        )
        .register(RuleDescriptor::text(R::CallStmt, call_stmt).uses(&[R::ProcedureCall]))
        .register(
            RuleDescriptor::text(R::ProcedureCall, procedure_call)
                .uses(&[R::Designator, R::ActualArgSpecList]),
        )
        .register(RuleDescriptor::text(R::ContinueStmt, continue_stmt))
        .register(RuleDescriptor::text(R::CycleStmt, cycle_stmt).uses(&[R::Name]))
        .register(RuleDescriptor::text(R::ExitStmt, exit_stmt).uses(&[R::Name]))
        .register(RuleDescriptor::text(R::GotoStmt, goto_stmt).uses(&[R::Label]))
        .register(RuleDescriptor::text(R::Label, label))
        .register(
            RuleDescriptor::text(R::IfStmt, if_stmt).uses(&[R::Parenthesis, R::ActionStmt]),
        )
        .register(RuleDescriptor::text(R::PrintStmt, print_stmt).uses(&[R::OutputItemList]))
        .register(
            RuleDescriptor::text(R::OutputItemList, output_item_list).or(&[R::OutputItem]),
        )
        .register(RuleDescriptor::delegate(R::OutputItem, &[R::Star, R::Expr]))
        .register(
            RuleDescriptor::text(R::ReadStmt, read_stmt)
                .uses(&[R::IoControl, R::InputItemList, R::OutputItemList]),
        )
        .register(
            RuleDescriptor::text(R::WriteStmt, write_stmt)
                .uses(&[R::IoControl, R::OutputItemList]),
        )
        .register(
            RuleDescriptor::text(R::IoControl, io_control).uses(&[R::IoControlSpecList]),
        )
        .register(
            RuleDescriptor::text(R::IoControlSpecList, io_control_spec_list)
                .or(&[R::IoControlSpec]),
        )
        .register(
            RuleDescriptor::text(R::IoControlSpec, io_control_spec).uses(&[R::Name, R::IoUnit]),
        )
        .register(RuleDescriptor::delegate(R::IoUnit, &[R::Star, R::Expr]))
        .register(RuleDescriptor::text(R::InputItemList, input_item_list).or(&[R::Designator]))
        .register(RuleDescriptor::text(R::ReturnStmt, return_stmt).uses(&[R::Expr]))
        .register(RuleDescriptor::text(R::StopStmt, stop_stmt).uses(&[R::Expr]))
        .register(
            RuleDescriptor::text(R::WhereStmt, where_stmt)
                .uses(&[R::Parenthesis, R::AssignmentStmt]),
        )
        .register(
            RuleDescriptor::text(R::AllocateStmt, allocate_stmt).uses(&[R::ActualArgSpecList]),
        )
        .register(
            RuleDescriptor::text(R::DeallocateStmt, deallocate_stmt)
                .uses(&[R::ActualArgSpecList]),
        );

    builder
        .register(RuleDescriptor::text(R::UseStmt, use_stmt).uses(&[R::Name, R::OnlyList]))
        .register(RuleDescriptor::text(R::OnlyList, only_list).or(&[R::Rename]))
        .register(RuleDescriptor::text(R::Rename, rename).or(&[R::Name]))
        .register(RuleDescriptor::text(R::ImplicitStmt, implicit_stmt))
        .register(RuleDescriptor::text(R::AccessStmt, access_stmt).uses(&[R::AccessIdList]))
        .register(RuleDescriptor::text(R::AccessIdList, access_id_list).or(&[R::Name]))
        .register(
            RuleDescriptor::text(R::TypeDeclarationStmt, type_declaration_stmt).uses(&[
                R::DeclarationTypeSpec,
                R::AttrSpecList,
                R::EntityDeclList,
            ]),
        )
        .register(RuleDescriptor::delegate(
            R::DeclarationTypeSpec,
            &[R::IntrinsicTypeSpec, R::DerivedTypeSpec],
        ))
        .register(
            RuleDescriptor::text(R::IntrinsicTypeSpec, intrinsic_type_spec)
                .uses(&[R::KindSelector]),
        )
        .register(
            RuleDescriptor::text(R::KindSelector, kind_selector).uses(&[R::TypeParamSpecList]),
        )
        .register(
            RuleDescriptor::text(R::DerivedTypeSpec, derived_type_spec).uses(&[R::TypeSpec]),
        )
        .register(RuleDescriptor::delegate(
            R::TypeSpec,
            &[R::IntrinsicTypeSpec, R::Name, R::Star],
        ))
        .register(
            RuleDescriptor::text(R::TypeParamSpecList, type_param_spec_list)
                .or(&[R::TypeParamSpec]),
        )
        .register(
            RuleDescriptor::text(R::TypeParamSpec, type_param_spec)
                .or(&[R::TypeParamValue])
                .uses(&[R::Name]),
        )
        .register(RuleDescriptor::text(R::TypeParamValue, type_param_value).or(&[R::Expr]))
        .register(RuleDescriptor::text(R::AttrSpecList, attr_spec_list).or(&[R::AttrSpec]))
        .register(RuleDescriptor::delegate(
            R::AttrSpec,
            &[R::AttrKeyword, R::DimensionSpec, R::IntentSpec],
        ))
        .register(RuleDescriptor::text(R::AttrKeyword, attr_keyword))
        .register(RuleDescriptor::text(R::DimensionSpec, dimension_spec).uses(&[R::ArraySpec]))
        .register(RuleDescriptor::text(R::IntentSpec, intent_spec).uses(&[R::IntentKeyword]))
        .register(RuleDescriptor::text(R::IntentKeyword, intent_keyword))
        .register(RuleDescriptor::text(R::ArraySpec, array_spec).or(&[R::ShapeSpec]))
        .register(RuleDescriptor::delegate(
            R::ShapeSpec,
            &[R::RangeSpec, R::Star, R::Expr],
        ))
        .register(RuleDescriptor::text(R::RangeSpec, range_spec).uses(&[R::Expr]))
        .register(RuleDescriptor::text(R::EntityDeclList, entity_decl_list).or(&[R::EntityDecl]))
        .register(
            RuleDescriptor::text(R::EntityDecl, entity_decl)
                .uses(&[R::Name, R::ArraySpec, R::Expr]),
        )
        .register(RuleDescriptor::text(R::DerivedTypeStmt, derived_type_stmt).uses(&[R::Name]))
        .register(RuleDescriptor::text(R::EndTypeStmt, end_type_stmt).uses(&[R::Name]));

    builder
        .register(RuleDescriptor::text(R::ProgramStmt, program_stmt).uses(&[R::Name]))
        .register(RuleDescriptor::text(R::EndProgramStmt, end_program_stmt).uses(&[R::Name]))
        .register(RuleDescriptor::text(R::ModuleStmt, module_stmt).uses(&[R::Name]))
        .register(RuleDescriptor::text(R::EndModuleStmt, end_module_stmt).uses(&[R::Name]))
        .register(
            RuleDescriptor::text(R::SubroutineStmt, subroutine_stmt)
                .uses(&[R::PrefixSpec, R::Name, R::DummyArgList, R::Suffix]),
        )
        .register(
            RuleDescriptor::text(R::EndSubroutineStmt, end_subroutine_stmt).uses(&[R::Name]),
        )
        .register(
            RuleDescriptor::text(R::FunctionStmt, function_stmt)
                .uses(&[R::PrefixSpec, R::Name, R::DummyArgList, R::Suffix]),
        )
        .register(RuleDescriptor::text(R::EndFunctionStmt, end_function_stmt).uses(&[R::Name]))
        .register(RuleDescriptor::text(R::ContainsStmt, contains_stmt))
        .register(
            RuleDescriptor::text(R::PrefixSpec, prefix_spec).uses(&[R::DeclarationTypeSpec]),
        )
        .register(RuleDescriptor::text(R::DummyArgList, dummy_arg_list).or(&[R::Name]))
        .register(
            RuleDescriptor::text(R::Suffix, suffix).uses(&[R::Name, R::ActualArgSpecList]),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, Standard};

    fn session() -> Session<'static> {
        Session::new(Grammar::shared(Standard::F2008))
    }

    fn render(rule: RuleId, input: &str) -> Option<String> {
        session()
            .match_rule(rule, input)
            .unwrap()
            .map(|node| node.to_source_text(0))
    }

    #[test]
    fn test_leading_group() {
        assert_eq!(leading_group("(a(1)) b"), Some(("(a(1))", " b")));
        assert_eq!(leading_group("a (b)"), None);
        assert_eq!(leading_group("(a"), None);
    }

    #[test]
    fn test_assignments() {
        assert_eq!(render(RuleId::AssignmentStmt, "x=y+1").as_deref(), Some("x = y + 1"));
        assert_eq!(
            render(RuleId::AssignmentStmt, "a(i, j) = b%c(1:n)").as_deref(),
            Some("a(i, j) = b%c(1:n)")
        );
        assert_eq!(render(RuleId::PointerAssignmentStmt, "p=>t").as_deref(), Some("p => t"));
        assert!(render(RuleId::AssignmentStmt, "if (x == 1) y").is_none());
        assert!(render(RuleId::AssignmentStmt, "x == 1").is_none());
    }

    #[test]
    fn test_action_statements() {
        assert_eq!(
            render(RuleId::ActionStmt, "call foo(a, b=2)").as_deref(),
            Some("CALL foo(a, b = 2)")
        );
        assert_eq!(render(RuleId::ActionStmt, "call bar").as_deref(), Some("CALL bar"));
        assert_eq!(render(RuleId::ActionStmt, "goto 10").as_deref(), Some("GO TO 10"));
        assert_eq!(render(RuleId::ActionStmt, "exit outer").as_deref(), Some("EXIT outer"));
        assert_eq!(
            render(RuleId::ActionStmt, "print *, 'x', y").as_deref(),
            Some("PRINT *, 'x', y")
        );
        assert_eq!(render(RuleId::ActionStmt, "stop 1").as_deref(), Some("STOP 1"));
        assert_eq!(render(RuleId::ActionStmt, "return").as_deref(), Some("RETURN"));
        assert_eq!(
            render(RuleId::ActionStmt, "allocate(a(n), stat=ierr)").as_deref(),
            Some("ALLOCATE(a(n), stat = ierr)")
        );
        // a variable named like a keyword is still an assignment
        let node = session().match_rule(RuleId::ActionStmt, "stop = 1").unwrap().unwrap();
        assert_eq!(node.rule(), RuleId::AssignmentStmt);
    }

    #[test]
    fn test_read_and_write_statements() {
        assert_eq!(
            render(RuleId::ActionStmt, "write(*,*) 'x =', x").as_deref(),
            Some("WRITE (*, *) 'x =', x")
        );
        assert_eq!(
            render(RuleId::ActionStmt, "write (unit=10, fmt='(i5)', iostat=ios) a(1:n)").as_deref(),
            Some("WRITE (unit = 10, fmt = '(i5)', iostat = ios) a(1:n)")
        );
        assert_eq!(render(RuleId::ActionStmt, "write(6,100)").as_deref(), Some("WRITE (6, 100)"));
        assert_eq!(
            render(RuleId::ActionStmt, "read(5, *) n, a(i)").as_deref(),
            Some("READ (5, *) n, a(i)")
        );
        assert_eq!(render(RuleId::ActionStmt, "read *, n").as_deref(), Some("READ *, n"));
        // input items must be variables
        assert!(render(RuleId::ReadStmt, "read(5, *) n + 1").is_none());
        assert!(render(RuleId::WriteStmt, "write() x").is_none());
        // an array element named like the statement stays an assignment
        let node = session().match_rule(RuleId::ActionStmt, "write(1) = 2").unwrap().unwrap();
        assert_eq!(node.rule(), RuleId::AssignmentStmt);
    }

    #[test]
    fn test_if_and_where_statements() {
        assert_eq!(
            render(RuleId::IfStmt, "if(x>0) y = 1").as_deref(),
            Some("IF (x > 0) y = 1")
        );
        assert!(render(RuleId::IfStmt, "if (x) then").is_none());
        assert!(render(RuleId::IfStmt, "if (a) if (b) c = 1").is_none());
        assert_eq!(
            render(RuleId::WhereStmt, "where (m > 0) a = 0").as_deref(),
            Some("WHERE (m > 0) a = 0")
        );
        assert!(render(RuleId::WhereStmt, "where (m > 0)").is_none());
    }

    #[test]
    fn test_use_statements() {
        assert_eq!(render(RuleId::UseStmt, "use foo").as_deref(), Some("USE foo"));
        assert_eq!(
            render(RuleId::UseStmt, "use iso_fortran_env, only: int32, dp => real64").as_deref(),
            Some("USE iso_fortran_env, ONLY: int32, dp => real64")
        );
        assert_eq!(
            render(RuleId::UseStmt, "use, intrinsic :: iso_c_binding").as_deref(),
            Some("USE, INTRINSIC :: iso_c_binding")
        );
        assert_eq!(render(RuleId::UseStmt, "use m, only:").as_deref(), Some("USE m, ONLY:"));
        assert_eq!(render(RuleId::UseStmt, "use m, a => b").as_deref(), Some("USE m, a => b"));
        assert!(render(RuleId::UseStmt, "used = 1").is_none());
    }

    #[test]
    fn test_type_declarations() {
        assert_eq!(
            render(
                RuleId::TypeDeclarationStmt,
                "integer(kind=8), dimension(:), allocatable :: a, b(10)"
            )
            .as_deref(),
            Some("INTEGER(kind = 8), DIMENSION(:), ALLOCATABLE :: a, b(10)")
        );
        assert_eq!(render(RuleId::TypeDeclarationStmt, "real x, y").as_deref(), Some("REAL :: x, y"));
        assert_eq!(
            render(RuleId::TypeDeclarationStmt, "character(len=*), intent(in) :: s").as_deref(),
            Some("CHARACTER(len = *), INTENT(IN) :: s")
        );
        assert_eq!(
            render(RuleId::TypeDeclarationStmt, "type(point), pointer :: p => null()").as_deref(),
            Some("TYPE(point), POINTER :: p => null()")
        );
        assert_eq!(
            render(RuleId::TypeDeclarationStmt, "double precision :: z = 1.0d0").as_deref(),
            Some("DOUBLE PRECISION :: z = 1.0d0")
        );
        assert_eq!(
            render(RuleId::TypeDeclarationStmt, "character*10 name").as_deref(),
            Some("CHARACTER*10 :: name")
        );
        assert_eq!(
            render(RuleId::TypeDeclarationStmt, "class(*), intent(inout) :: x").as_deref(),
            Some("CLASS(*), INTENT(INOUT) :: x")
        );
        assert!(render(RuleId::TypeDeclarationStmt, "integer = 1").is_none());
        assert!(render(RuleId::TypeDeclarationStmt, "realx = 1").is_none());
        assert!(render(RuleId::TypeDeclarationStmt, "type point").is_none());
    }

    #[test]
    fn test_derived_type_statements() {
        assert_eq!(render(RuleId::DerivedTypeStmt, "type point").as_deref(), Some("TYPE point"));
        assert_eq!(
            render(RuleId::DerivedTypeStmt, "type, extends(base) :: circle").as_deref(),
            Some("TYPE, extends(base) :: circle")
        );
        assert!(render(RuleId::DerivedTypeStmt, "type(point) :: p").is_none());
        assert!(render(RuleId::DerivedTypeStmt, "type is (integer)").is_none());
        assert_eq!(
            render(RuleId::EndTypeStmt, "end type circle").as_deref(),
            Some("END TYPE circle")
        );
        assert!(render(RuleId::EndTypeStmt, "end").is_none());
    }

    #[test]
    fn test_subprogram_statements() {
        assert_eq!(
            render(RuleId::SubroutineStmt, "subroutine s(a, b) bind(c)").as_deref(),
            Some("SUBROUTINE s(a, b) BIND(c)")
        );
        assert_eq!(render(RuleId::SubroutineStmt, "subroutine s").as_deref(), Some("SUBROUTINE s"));
        assert_eq!(
            render(RuleId::FunctionStmt, "pure recursive integer function f(n) result(r)").as_deref(),
            Some("PURE RECURSIVE INTEGER FUNCTION f(n) RESULT(r)")
        );
        assert_eq!(
            render(RuleId::FunctionStmt, "real(8) function g()").as_deref(),
            Some("REAL(8) FUNCTION g()")
        );
        assert!(render(RuleId::FunctionStmt, "function f").is_none());
        assert!(render(RuleId::SubroutineStmt, "subroutine_count = 1").is_none());
        let node = session().match_rule(RuleId::SubroutineStmt, "subroutine a").unwrap().unwrap();
        assert_eq!(node.declared_name(), Some("a"));
    }

    #[test]
    fn test_program_unit_ends() {
        assert_eq!(render(RuleId::EndProgramStmt, "end").as_deref(), Some("END"));
        assert_eq!(
            render(RuleId::EndSubroutineStmt, "endsubroutine s").as_deref(),
            Some("END SUBROUTINE s")
        );
        assert!(render(RuleId::EndModuleStmt, "end subroutine").is_none());
        assert_eq!(render(RuleId::ContainsStmt, "contains").as_deref(), Some("CONTAINS"));
        assert!(render(RuleId::ModuleStmt, "module procedure foo").is_none());
    }

    #[test]
    fn test_access_and_implicit() {
        assert_eq!(render(RuleId::AccessStmt, "private").as_deref(), Some("PRIVATE"));
        assert_eq!(
            render(RuleId::AccessStmt, "public :: a, b").as_deref(),
            Some("PUBLIC :: a, b")
        );
        assert_eq!(
            render(RuleId::ImplicitStmt, "implicit  none").as_deref(),
            Some("IMPLICIT NONE")
        );
    }
}
