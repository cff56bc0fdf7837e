/// Lookahead hooks
///
/// A hook peeks at the next item before a block tries its interior
/// candidates and re-ranks or filters them. This is how `IF (c) THEN` is
/// routed to the IF construct while `IF (c) x = 1` stays a one-line
/// statement, without every candidate having to reject the other form.
use std::sync::{Arc, LazyLock};

use crate::grammar::RuleId;
use crate::reader::Item;
use crate::text::patterns::{
    CASE_RE, DO_RE, IF_THEN_RE, LABEL_DO_RE, SELECT_CASE_RE, SELECT_TYPE_RE, TYPE_GUARD_RE,
    WHERE_RE,
};
use crate::text::{mask, split_bracketed};

pub trait LookaheadHook: Send + Sync {
    fn name(&self) -> &'static str;

    /// Reorder or drop entries of `candidates` after looking at `peek`
    fn rerank(&self, peek: &Item, candidates: &mut Vec<RuleId>);
}

fn promote(candidates: &mut Vec<RuleId>, rule: RuleId) {
    if let Some(pos) = candidates.iter().position(|&r| r == rule) {
        let rule = candidates.remove(pos);
        candidates.insert(0, rule);
    }
}

fn drop_rule(candidates: &mut Vec<RuleId>, rule: RuleId) {
    candidates.retain(|&r| r != rule);
}

/// `IF (...) THEN` opens a construct; anything else cannot
pub struct IfHook;

impl LookaheadHook for IfHook {
    fn name(&self) -> &'static str {
        "if"
    }

    fn rerank(&self, peek: &Item, candidates: &mut Vec<RuleId>) {
        if IF_THEN_RE.is_match(&peek.text) {
            promote(candidates, RuleId::IfConstruct);
        } else {
            drop_rule(candidates, RuleId::IfConstruct);
        }
    }
}

/// Labelled vs non-labelled DO
pub struct DoHook;

impl LookaheadHook for DoHook {
    fn name(&self) -> &'static str {
        "do"
    }

    fn rerank(&self, peek: &Item, candidates: &mut Vec<RuleId>) {
        if LABEL_DO_RE.is_match(&peek.text) {
            drop_rule(candidates, RuleId::NonlabelDoConstruct);
            promote(candidates, RuleId::LabelDoConstruct);
        } else if DO_RE.is_match(&peek.text) {
            drop_rule(candidates, RuleId::LabelDoConstruct);
            promote(candidates, RuleId::NonlabelDoConstruct);
        } else {
            drop_rule(candidates, RuleId::LabelDoConstruct);
            drop_rule(candidates, RuleId::NonlabelDoConstruct);
        }
    }
}

/// `CASE` inside a case construct, `SELECT CASE` opening one
pub struct CaseHook;

impl LookaheadHook for CaseHook {
    fn name(&self) -> &'static str {
        "case"
    }

    fn rerank(&self, peek: &Item, candidates: &mut Vec<RuleId>) {
        if CASE_RE.is_match(&peek.text) {
            promote(candidates, RuleId::CaseStmt);
        }
        if SELECT_CASE_RE.is_match(&peek.text) {
            promote(candidates, RuleId::CaseConstruct);
        } else {
            drop_rule(candidates, RuleId::CaseConstruct);
        }
    }
}

/// `TYPE IS` / `CLASS IS` / `CLASS DEFAULT` guards vs `TYPE(...)` declarations
pub struct SelectTypeHook;

impl LookaheadHook for SelectTypeHook {
    fn name(&self) -> &'static str {
        "select-type"
    }

    fn rerank(&self, peek: &Item, candidates: &mut Vec<RuleId>) {
        if TYPE_GUARD_RE.is_match(&peek.text) {
            promote(candidates, RuleId::TypeGuardStmt);
        } else {
            drop_rule(candidates, RuleId::TypeGuardStmt);
        }
        if SELECT_TYPE_RE.is_match(&peek.text) {
            promote(candidates, RuleId::SelectTypeConstruct);
        } else {
            drop_rule(candidates, RuleId::SelectTypeConstruct);
        }
    }
}

/// `WHERE (mask)` alone opens a construct; `WHERE (mask) a = b` does not
pub struct WhereHook;

impl WhereHook {
    fn opens_block(text: &str) -> bool {
        let masked = mask(text);
        let groups = split_bracketed(&masked.text, "(", ")");
        // ["WHERE ", "(mask)"] with nothing after the mask
        groups.len() == 2 && groups[1].starts_with('(') && groups[1].ends_with(')')
    }
}

impl LookaheadHook for WhereHook {
    fn name(&self) -> &'static str {
        "where"
    }

    fn rerank(&self, peek: &Item, candidates: &mut Vec<RuleId>) {
        if WHERE_RE.is_match(&peek.text) && Self::opens_block(&peek.text) {
            drop_rule(candidates, RuleId::WhereStmt);
            promote(candidates, RuleId::WhereConstruct);
        } else {
            drop_rule(candidates, RuleId::WhereConstruct);
        }
    }
}

static EXECUTION_HOOKS: LazyLock<Vec<Arc<dyn LookaheadHook>>> = LazyLock::new(|| {
    vec![
        Arc::new(IfHook) as Arc<dyn LookaheadHook>,
        Arc::new(DoHook),
        Arc::new(CaseHook),
        Arc::new(SelectTypeHook),
        Arc::new(WhereHook),
    ]
});

/// The hooks every block with executable contents uses
#[must_use]
pub fn execution_hooks() -> &'static [Arc<dyn LookaheadHook>] {
    &EXECUTION_HOOKS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Span;

    fn item(text: &str) -> Item {
        Item::statement(text, Span::new(1, 1, 1))
    }

    #[test]
    fn test_if_hook() {
        let mut c = vec![RuleId::AssignmentStmt, RuleId::IfStmt, RuleId::IfConstruct];
        IfHook.rerank(&item("if (x > 0) then"), &mut c);
        assert_eq!(c[0], RuleId::IfConstruct);

        let mut c = vec![RuleId::IfStmt, RuleId::IfConstruct];
        IfHook.rerank(&item("if (x > 0) y = 1"), &mut c);
        assert_eq!(c, vec![RuleId::IfStmt]);
    }

    #[test]
    fn test_do_hook() {
        let all = vec![
            RuleId::AssignmentStmt,
            RuleId::LabelDoConstruct,
            RuleId::NonlabelDoConstruct,
        ];
        let mut c = all.clone();
        DoHook.rerank(&item("do 10 i = 1, n"), &mut c);
        assert_eq!(c, vec![RuleId::LabelDoConstruct, RuleId::AssignmentStmt]);

        let mut c = all.clone();
        DoHook.rerank(&item("do i = 1, n"), &mut c);
        assert_eq!(c, vec![RuleId::NonlabelDoConstruct, RuleId::AssignmentStmt]);

        let mut c = all;
        DoHook.rerank(&item("done = 1"), &mut c);
        assert_eq!(c, vec![RuleId::AssignmentStmt]);
    }

    #[test]
    fn test_case_hook() {
        let mut c = vec![RuleId::AssignmentStmt, RuleId::CaseStmt, RuleId::CaseConstruct];
        CaseHook.rerank(&item("case (1:3)"), &mut c);
        assert_eq!(c, vec![RuleId::CaseStmt, RuleId::AssignmentStmt]);

        let mut c = vec![RuleId::AssignmentStmt, RuleId::CaseConstruct];
        CaseHook.rerank(&item("select case (k)"), &mut c);
        assert_eq!(c[0], RuleId::CaseConstruct);
    }

    #[test]
    fn test_select_type_hook() {
        let mut c = vec![RuleId::AssignmentStmt, RuleId::TypeGuardStmt];
        SelectTypeHook.rerank(&item("class is (shape)"), &mut c);
        assert_eq!(c[0], RuleId::TypeGuardStmt);

        let mut c = vec![RuleId::TypeDeclarationStmt, RuleId::TypeGuardStmt];
        SelectTypeHook.rerank(&item("type(point) :: p"), &mut c);
        assert_eq!(c, vec![RuleId::TypeDeclarationStmt]);
    }

    #[test]
    fn test_where_hook() {
        let mut c = vec![RuleId::WhereStmt, RuleId::WhereConstruct];
        WhereHook.rerank(&item("where (a > 0)"), &mut c);
        assert_eq!(c, vec![RuleId::WhereConstruct]);

        let mut c = vec![RuleId::WhereStmt, RuleId::WhereConstruct];
        WhereHook.rerank(&item("where (a > 0) a = 0"), &mut c);
        assert_eq!(c, vec![RuleId::WhereStmt]);
    }

    #[test]
    fn test_execution_hooks() {
        let names: Vec<&str> = execution_hooks().iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["if", "do", "case", "select-type", "where"]);
    }
}
