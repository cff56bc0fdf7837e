/// Construct rules
///
/// Block descriptors for program units and executable constructs, plus
/// the statements that open, continue and close them. Construct bodies
/// carry the execution lookahead hooks so `IF (...) THEN`, `DO` and
/// friends are tried in the right order.
use std::sync::Arc;

use super::registry::{GrammarBuilder, RuleDescriptor};
use super::stmt::{keyword_condition, leading_group};
use super::RuleId;
use crate::block::{execution_hooks, BlockSpec, LookaheadHook, NameCheck};
use crate::engine::combinators::{
    bracketed, built, call, end_stmt, find_assignment_eq, separator, sequence,
    starts_with_word_char, strip_keyword, word_cls, CallOptions, Callee, WordOptions, PARENS,
};
use crate::engine::{MatchResult, Session};
use crate::error::ParseError;
use crate::node::{Child, Node, Shape};
use crate::text::mask;

const ARGS: CallOptions = CallOptions {
    require_args: true,
    allow_bare: false,
    upper_name: false,
};

/// Optional trailing construct name
fn trailing_name(s: &mut Session<'_>, rest: &str) -> Result<Option<Child>, ParseError> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Ok(Some(Child::Absent));
    }
    Ok(s.match_rule(RuleId::Name, rest)?.map(Child::Node))
}

// ===== IF =====

fn if_then_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let Some((condition, rest)) = keyword_condition(s, "IF", input)? else {
        return Ok(None);
    };
    if !strip_keyword(rest.trim(), "THEN").is_some_and(str::is_empty) {
        return Ok(None);
    }
    built(
        RuleId::IfThenStmt,
        Shape::Words,
        vec![Child::token("IF"), Child::Node(condition), Child::token("THEN")],
    )
}

fn else_if_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let Some((condition, rest)) = keyword_condition(s, "ELSE IF", input)? else {
        return Ok(None);
    };
    let Some(after) = strip_keyword(rest.trim(), "THEN") else {
        return Ok(None);
    };
    if starts_with_word_char(after) {
        return Ok(None);
    }
    let Some(name) = trailing_name(s, after)? else {
        return Ok(None);
    };
    built(
        RuleId::ElseIfStmt,
        Shape::Words,
        vec![
            Child::token("ELSE IF"),
            Child::Node(condition),
            Child::token("THEN"),
            name,
        ],
    )
}

fn else_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    word_cls(s, RuleId::ElseStmt, "ELSE", RuleId::Name, input, WordOptions::default())
}

fn end_if_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    end_stmt(s, RuleId::EndIfStmt, "IF", Some(RuleId::Name), input, true)
}

// ===== DO =====

/// `DO 10 [,] [loop-control]`; the label stays a bare token
fn label_do_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let Some(rest) = strip_keyword(input.trim(), "DO") else {
        return Ok(None);
    };
    let rest = rest.trim_start();
    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits == 0 || digits > 5 {
        return Ok(None);
    }
    let (label, rest) = rest.split_at(digits);
    let control = rest.trim();
    let control = if control.is_empty() {
        Child::Absent
    } else {
        let Some(node) = s.match_rule(RuleId::LoopControl, control)? else {
            return Ok(None);
        };
        Child::Node(node)
    };
    built(
        RuleId::LabelDoStmt,
        Shape::Words,
        vec![Child::token("DO"), Child::token(label), control],
    )
}

fn nonlabel_do_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let Some(rest) = strip_keyword(input.trim(), "DO") else {
        return Ok(None);
    };
    if starts_with_word_char(rest) {
        return Ok(None);
    }
    let rest = rest.trim();
    if rest.is_empty() {
        return built(
            RuleId::NonlabelDoStmt,
            Shape::Words,
            vec![Child::token("DO"), Child::Absent],
        );
    }
    let Some(control) = s.match_rule(RuleId::LoopControl, rest)? else {
        return Ok(None);
    };
    built(
        RuleId::NonlabelDoStmt,
        Shape::Words,
        vec![Child::token("DO"), Child::Node(control)],
    )
}

/// `[,] WHILE (cond)` or `[,] var = start, end [, step]`
fn loop_control(s: &mut Session<'_>, input: &str) -> MatchResult {
    let text = input.trim();
    let text = text.strip_prefix(',').map_or(text, str::trim_start);
    if let Some((condition, rest)) = keyword_condition(s, "WHILE", text)? {
        if !rest.trim().is_empty() {
            return Ok(None);
        }
        return built(
            RuleId::LoopControl,
            Shape::Words,
            vec![Child::token("WHILE"), Child::Node(condition)],
        );
    }
    let masked = mask(text);
    let Some(pos) = find_assignment_eq(&masked.text) else {
        return Ok(None);
    };
    let variable = masked.map.unmask_trimmed(&masked.text[..pos]);
    let bounds = masked.map.unmask_trimmed(&masked.text[pos + 1..]);
    let Some(variable) = s.match_rule(RuleId::Name, &variable)? else {
        return Ok(None);
    };
    let Some(bounds) = s.match_rule(RuleId::LoopBounds, &bounds)? else {
        return Ok(None);
    };
    built(
        RuleId::LoopControl,
        Shape::Binary,
        vec![Child::Node(variable), Child::token("="), Child::Node(bounds)],
    )
}

/// Two or three bounds: start, end and an optional step
fn loop_bounds(s: &mut Session<'_>, input: &str) -> MatchResult {
    let Some(node) = sequence(s, RuleId::LoopBounds, ',', RuleId::Expr, input)? else {
        return Ok(None);
    };
    if node.children().len() > 3 {
        return Ok(None);
    }
    Ok(Some(node))
}

fn end_do_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    end_stmt(s, RuleId::EndDoStmt, "DO", Some(RuleId::Name), input, true)
}

// ===== SELECT CASE =====

fn select_case_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    call(
        s,
        RuleId::SelectCaseStmt,
        Callee::Keyword("SELECT CASE"),
        RuleId::Expr,
        input,
        ARGS,
    )
}

/// `CASE (selector) [name]` or `CASE DEFAULT [name]`
fn case_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let Some(rest) = strip_keyword(input.trim(), "CASE") else {
        return Ok(None);
    };
    let rest = rest.trim_start();
    let (head, tail) = if let Some(after) = strip_keyword(rest, "DEFAULT") {
        if starts_with_word_char(after) {
            return Ok(None);
        }
        (Child::token("CASE DEFAULT"), after)
    } else {
        let Some((group, after)) = leading_group(rest) else {
            return Ok(None);
        };
        let Some(selector) = s.match_rule(RuleId::CaseSelector, group)? else {
            return Ok(None);
        };
        (Child::Node(selector), after)
    };
    let Some(name) = trailing_name(s, tail)? else {
        return Ok(None);
    };
    let mut children = Vec::with_capacity(3);
    if matches!(head, Child::Node(_)) {
        children.push(Child::token("CASE"));
    }
    children.push(head);
    children.push(name);
    built(RuleId::CaseStmt, Shape::Words, children)
}

fn case_selector(s: &mut Session<'_>, input: &str) -> MatchResult {
    bracketed(s, RuleId::CaseSelector, PARENS, RuleId::CaseValueRangeList, input, true)
}

fn case_value_range_list(s: &mut Session<'_>, input: &str) -> MatchResult {
    sequence(s, RuleId::CaseValueRangeList, ',', RuleId::CaseValueRange, input)
}

fn case_range(s: &mut Session<'_>, input: &str) -> MatchResult {
    separator(s, RuleId::CaseRange, RuleId::Expr, RuleId::Expr, input)
}

fn end_select_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    end_stmt(s, RuleId::EndSelectStmt, "SELECT", Some(RuleId::Name), input, true)
}

// ===== SELECT TYPE =====

fn select_type_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    call(
        s,
        RuleId::SelectTypeStmt,
        Callee::Keyword("SELECT TYPE"),
        RuleId::Selector,
        input,
        ARGS,
    )
}

/// `associate-name => expr`
fn selector(s: &mut Session<'_>, input: &str) -> MatchResult {
    let masked = mask(input.trim());
    let Some(pos) = masked.text.find("=>") else {
        return Ok(None);
    };
    let alias = masked.map.unmask_trimmed(&masked.text[..pos]);
    let target = masked.map.unmask_trimmed(&masked.text[pos + 2..]);
    let Some(alias) = s.match_rule(RuleId::Name, &alias)? else {
        return Ok(None);
    };
    let Some(target) = s.match_rule(RuleId::Expr, &target)? else {
        return Ok(None);
    };
    built(
        RuleId::Selector,
        Shape::Binary,
        vec![Child::Node(alias), Child::token("=>"), Child::Node(target)],
    )
}

/// `TYPE IS (spec)`, `CLASS IS (spec)`, `CLASS DEFAULT`, each with an
/// optional construct name
fn type_guard_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let text = input.trim();
    if let Some(rest) = strip_keyword(text, "CLASS DEFAULT") {
        if starts_with_word_char(rest) {
            return Ok(None);
        }
        let Some(name) = trailing_name(s, rest)? else {
            return Ok(None);
        };
        return built(
            RuleId::TypeGuardStmt,
            Shape::Words,
            vec![Child::token("CLASS DEFAULT"), name],
        );
    }
    for keyword in ["TYPE IS", "CLASS IS"] {
        let Some(rest) = strip_keyword(text, keyword) else {
            continue;
        };
        let Some((group, tail)) = leading_group(rest.trim_start()) else {
            continue;
        };
        let inner = group[1..group.len() - 1].trim();
        let Some(spec) = s.match_rule(RuleId::TypeSpec, inner)? else {
            return Ok(None);
        };
        let Some(name) = trailing_name(s, tail)? else {
            return Ok(None);
        };
        // keep the guarded type apart from the construct name
        let spec = Node::new(RuleId::TypeSpec, Shape::Glued, vec![Child::Node(spec)]).into_arc();
        let guard = Node::new(
            RuleId::TypeGuardStmt,
            Shape::Glued,
            vec![Child::token(format!("{keyword} (")), Child::Node(spec), Child::token(")")],
        )
        .into_arc();
        return built(RuleId::TypeGuardStmt, Shape::Words, vec![Child::Node(guard), name]);
    }
    Ok(None)
}

// ===== WHERE =====

fn where_construct_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let Some((mask_expr, rest)) = keyword_condition(s, "WHERE", input)? else {
        return Ok(None);
    };
    if !rest.trim().is_empty() {
        return Ok(None);
    }
    built(
        RuleId::WhereConstructStmt,
        Shape::Words,
        vec![Child::token("WHERE"), Child::Node(mask_expr)],
    )
}

fn masked_elsewhere_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let Some((mask_expr, rest)) = keyword_condition(s, "ELSE WHERE", input)? else {
        return Ok(None);
    };
    let Some(name) = trailing_name(s, rest)? else {
        return Ok(None);
    };
    built(
        RuleId::MaskedElsewhereStmt,
        Shape::Words,
        vec![Child::token("ELSEWHERE"), Child::Node(mask_expr), name],
    )
}

fn elsewhere_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    let Some(rest) = strip_keyword(input.trim(), "ELSE WHERE") else {
        return Ok(None);
    };
    if starts_with_word_char(rest) || rest.trim_start().starts_with('(') {
        return Ok(None);
    }
    let Some(name) = trailing_name(s, rest)? else {
        return Ok(None);
    };
    built(
        RuleId::ElsewhereStmt,
        Shape::Words,
        vec![Child::token("ELSEWHERE"), name],
    )
}

fn end_where_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    end_stmt(s, RuleId::EndWhereStmt, "WHERE", Some(RuleId::Name), input, true)
}

fn where_hooks() -> Vec<Arc<dyn LookaheadHook>> {
    execution_hooks()
        .iter()
        .filter(|hook| hook.name() == "where")
        .cloned()
        .collect()
}

// ===== REGISTRATION =====

pub fn register(builder: &mut GrammarBuilder) {
    use RuleId as R;
    let hooks = execution_hooks();

    // program structure
    builder
        .register(RuleDescriptor::block(R::Program, BlockSpec::sequence(&[R::ProgramUnit])))
        .register(RuleDescriptor::delegate(
            R::ProgramUnit,
            &[
                R::MainProgram,
                R::Module,
                R::SubroutineSubprogram,
                R::FunctionSubprogram,
                R::MainProgramNoStmt,
            ],
        ))
        .register(RuleDescriptor::block(
            R::MainProgram,
            BlockSpec::new(
                Some(R::ProgramStmt),
                &[R::SpecificationPart, R::ExecutionPart, R::InternalSubprogramPart],
                Some(R::EndProgramStmt),
            )
            .names(NameCheck::StatementName("program"))
            .strict(),
        ))
        .register(RuleDescriptor::block(
            R::MainProgramNoStmt,
            BlockSpec::new(
                None,
                &[R::SpecificationPart, R::ExecutionPart, R::InternalSubprogramPart],
                Some(R::EndProgramStmt),
            )
            .strict(),
        ))
        .register(RuleDescriptor::block(
            R::Module,
            BlockSpec::new(
                Some(R::ModuleStmt),
                &[R::SpecificationPart, R::ModuleSubprogramPart],
                Some(R::EndModuleStmt),
            )
            .names(NameCheck::StatementName("module"))
            .strict(),
        ))
        .register(RuleDescriptor::block(
            R::SubroutineSubprogram,
            BlockSpec::new(
                Some(R::SubroutineStmt),
                &[R::SpecificationPart, R::ExecutionPart, R::InternalSubprogramPart],
                Some(R::EndSubroutineStmt),
            )
            .names(NameCheck::StatementName("subroutine"))
            .strict(),
        ))
        .register(RuleDescriptor::block(
            R::FunctionSubprogram,
            BlockSpec::new(
                Some(R::FunctionStmt),
                &[R::SpecificationPart, R::ExecutionPart, R::InternalSubprogramPart],
                Some(R::EndFunctionStmt),
            )
            .names(NameCheck::StatementName("function"))
            .strict(),
        ))
        .register(RuleDescriptor::delegate(
            R::InternalSubprogram,
            &[R::SubroutineSubprogram, R::FunctionSubprogram],
        ))
        .register(RuleDescriptor::block(
            R::InternalSubprogramPart,
            BlockSpec::new(Some(R::ContainsStmt), &[R::InternalSubprogram], None),
        ))
        .register(RuleDescriptor::block(
            R::ModuleSubprogramPart,
            BlockSpec::new(Some(R::ContainsStmt), &[R::InternalSubprogram], None),
        ))
        .register(RuleDescriptor::block(
            R::SpecificationPart,
            BlockSpec::sequence(&[R::UseStmt, R::ImplicitStmt, R::DeclarationConstruct]),
        ))
        .register(RuleDescriptor::delegate(
            R::DeclarationConstruct,
            &[R::DerivedTypeDef, R::TypeDeclarationStmt, R::AccessStmt],
        ))
        .register(RuleDescriptor::block(
            R::DerivedTypeDef,
            BlockSpec::new(
                Some(R::DerivedTypeStmt),
                &[R::AccessStmt, R::TypeDeclarationStmt],
                Some(R::EndTypeStmt),
            )
            .names(NameCheck::StatementName("type")),
        ))
        .register(RuleDescriptor::block(
            R::ExecutionPart,
            BlockSpec::sequence(&[R::ExecutionPartConstruct]).with_hooks(hooks),
        ))
        .register(RuleDescriptor::delegate(
            R::ExecutionPartConstruct,
            &[R::ExecutableConstruct],
        ))
        .register(RuleDescriptor::delegate(
            R::ExecutableConstruct,
            &[
                R::ActionStmt,
                R::CaseConstruct,
                R::DoConstruct,
                R::IfConstruct,
                R::SelectTypeConstruct,
                R::WhereConstruct,
            ],
        ));

    // IF
    builder
        .register(RuleDescriptor::block(
            R::IfConstruct,
            BlockSpec::new(
                Some(R::IfThenStmt),
                &[R::ElseIfStmt, R::ElseStmt, R::ExecutionPartConstruct],
                Some(R::EndIfStmt),
            )
            .names(NameCheck::ConstructName)
            .with_hooks(hooks),
        ))
        .register(
            RuleDescriptor::text(R::IfThenStmt, if_then_stmt).uses(&[R::Parenthesis]),
        )
        .register(
            RuleDescriptor::text(R::ElseIfStmt, else_if_stmt).uses(&[R::Parenthesis, R::Name]),
        )
        .register(RuleDescriptor::text(R::ElseStmt, else_stmt).uses(&[R::Name]))
        .register(RuleDescriptor::text(R::EndIfStmt, end_if_stmt).uses(&[R::Name]));

    // DO
    builder
        .register(RuleDescriptor::delegate(
            R::DoConstruct,
            &[R::LabelDoConstruct, R::NonlabelDoConstruct],
        ))
        .register(RuleDescriptor::block(
            R::LabelDoConstruct,
            BlockSpec::new(
                Some(R::LabelDoStmt),
                &[R::ExecutionPartConstruct],
                Some(R::EndDo),
            )
            .names(NameCheck::ConstructName)
            .label_terminated()
            .with_hooks(hooks),
        ))
        .register(RuleDescriptor::block(
            R::NonlabelDoConstruct,
            BlockSpec::new(
                Some(R::NonlabelDoStmt),
                &[R::ExecutionPartConstruct],
                Some(R::EndDoStmt),
            )
            .names(NameCheck::ConstructName)
            .with_hooks(hooks),
        ))
        .register(RuleDescriptor::text(R::LabelDoStmt, label_do_stmt).uses(&[R::LoopControl]))
        .register(
            RuleDescriptor::text(R::NonlabelDoStmt, nonlabel_do_stmt).uses(&[R::LoopControl]),
        )
        .register(
            RuleDescriptor::text(R::LoopControl, loop_control)
                .uses(&[R::Parenthesis, R::Name, R::LoopBounds]),
        )
        .register(RuleDescriptor::text(R::LoopBounds, loop_bounds).uses(&[R::Expr]))
        .register(RuleDescriptor::delegate(R::EndDo, &[R::EndDoStmt, R::ContinueStmt]))
        .register(RuleDescriptor::text(R::EndDoStmt, end_do_stmt).uses(&[R::Name]));

    // SELECT CASE
    builder
        .register(RuleDescriptor::block(
            R::CaseConstruct,
            BlockSpec::new(
                Some(R::SelectCaseStmt),
                &[R::CaseStmt, R::ExecutionPartConstruct],
                Some(R::EndSelectStmt),
            )
            .names(NameCheck::ConstructName)
            .with_hooks(hooks),
        ))
        .register(RuleDescriptor::text(R::SelectCaseStmt, select_case_stmt).uses(&[R::Expr]))
        .register(
            RuleDescriptor::text(R::CaseStmt, case_stmt).uses(&[R::CaseSelector, R::Name]),
        )
        .register(
            RuleDescriptor::text(R::CaseSelector, case_selector).uses(&[R::CaseValueRangeList]),
        )
        .register(
            RuleDescriptor::text(R::CaseValueRangeList, case_value_range_list)
                .or(&[R::CaseValueRange]),
        )
        .register(RuleDescriptor::delegate(R::CaseValueRange, &[R::CaseRange, R::Expr]))
        .register(RuleDescriptor::text(R::CaseRange, case_range).uses(&[R::Expr]))
        .register(RuleDescriptor::text(R::EndSelectStmt, end_select_stmt).uses(&[R::Name]));

    // SELECT TYPE
    builder
        .register(RuleDescriptor::block(
            R::SelectTypeConstruct,
            BlockSpec::new(
                Some(R::SelectTypeStmt),
                &[R::TypeGuardStmt, R::ExecutionPartConstruct],
                Some(R::EndSelectStmt),
            )
            .names(NameCheck::ConstructName)
            .with_hooks(hooks),
        ))
        .register(RuleDescriptor::text(R::SelectTypeStmt, select_type_stmt).uses(&[R::Selector]))
        .register(
            RuleDescriptor::text(R::Selector, selector)
                .or(&[R::Expr])
                .uses(&[R::Name]),
        )
        .register(
            RuleDescriptor::text(R::TypeGuardStmt, type_guard_stmt).uses(&[R::TypeSpec, R::Name]),
        );

    // WHERE
    builder
        .register(RuleDescriptor::block(
            R::WhereConstruct,
            BlockSpec::new(
                Some(R::WhereConstructStmt),
                &[
                    R::MaskedElsewhereStmt,
                    R::ElsewhereStmt,
                    R::AssignmentStmt,
                    R::WhereStmt,
                    R::WhereConstruct,
                ],
                Some(R::EndWhereStmt),
            )
            .names(NameCheck::ConstructName)
            .with_hooks(&where_hooks()),
        ))
        .register(
            RuleDescriptor::text(R::WhereConstructStmt, where_construct_stmt)
                .uses(&[R::Parenthesis]),
        )
        .register(
            RuleDescriptor::text(R::MaskedElsewhereStmt, masked_elsewhere_stmt)
                .uses(&[R::Parenthesis, R::Name]),
        )
        .register(RuleDescriptor::text(R::ElsewhereStmt, elsewhere_stmt).uses(&[R::Name]))
        .register(RuleDescriptor::text(R::EndWhereStmt, end_where_stmt).uses(&[R::Name]));
}
