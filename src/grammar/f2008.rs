/// Fortran 2008 additions
///
/// `ERROR STOP`, the BLOCK construct and the CRITICAL construct, layered
/// onto the 2003 rule set by registering new rules and extending the
/// alternatives of existing ones.
use super::registry::{GrammarBuilder, RuleDescriptor};
use super::RuleId;
use crate::block::{execution_hooks, BlockSpec, NameCheck};
use crate::engine::combinators::{end_stmt, terminal, word_cls, WordOptions};
use crate::engine::{MatchResult, Session};

fn error_stop_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    word_cls(
        s,
        RuleId::ErrorStopStmt,
        "ERROR STOP",
        RuleId::Expr,
        input,
        WordOptions::default(),
    )
}

fn block_stmt(_: &mut Session<'_>, input: &str) -> MatchResult {
    terminal(RuleId::BlockStmt, input, &["BLOCK"])
}

fn end_block_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    end_stmt(s, RuleId::EndBlockStmt, "BLOCK", Some(RuleId::Name), input, true)
}

fn critical_stmt(_: &mut Session<'_>, input: &str) -> MatchResult {
    terminal(RuleId::CriticalStmt, input, &["CRITICAL"])
}

fn end_critical_stmt(s: &mut Session<'_>, input: &str) -> MatchResult {
    end_stmt(s, RuleId::EndCriticalStmt, "CRITICAL", Some(RuleId::Name), input, true)
}

pub fn register(builder: &mut GrammarBuilder) {
    use RuleId as R;
    let hooks = execution_hooks();

    builder
        .register(RuleDescriptor::text(R::ErrorStopStmt, error_stop_stmt).uses(&[R::Expr]))
        .register(RuleDescriptor::block(
            R::BlockConstruct,
            BlockSpec::new(
                Some(R::BlockStmt),
                &[R::SpecificationPart, R::ExecutionPart],
                Some(R::EndBlockStmt),
            )
            .names(NameCheck::ConstructName)
            .strict(),
        ))
        .register(RuleDescriptor::text(R::BlockStmt, block_stmt))
        .register(RuleDescriptor::text(R::EndBlockStmt, end_block_stmt).uses(&[R::Name]))
        .register(RuleDescriptor::block(
            R::CriticalConstruct,
            BlockSpec::new(
                Some(R::CriticalStmt),
                &[R::ExecutionPartConstruct],
                Some(R::EndCriticalStmt),
            )
            .names(NameCheck::ConstructName)
            .with_hooks(hooks),
        ))
        .register(RuleDescriptor::text(R::CriticalStmt, critical_stmt))
        .register(RuleDescriptor::text(R::EndCriticalStmt, end_critical_stmt).uses(&[R::Name]));

    builder
        .append_alternatives(R::ActionStmt, &[R::ErrorStopStmt])
        .append_alternatives(
            R::ExecutableConstruct,
            &[R::BlockConstruct, R::CriticalConstruct],
        );
}
