/// Grammar rule identifiers
use std::fmt;

macro_rules! rule_ids {
    ($($(#[$meta:meta])* $variant:ident),* $(,)?) => {
        /// Every grammar rule the matcher knows about
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum RuleId {
            $($(#[$meta])* $variant),*
        }

        impl RuleId {
            /// All rule identifiers, in declaration order
            pub const ALL: &'static [RuleId] = &[$(RuleId::$variant),*];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(RuleId::$variant => stringify!($variant)),*
                }
            }
        }
    };
}

rule_ids! {
    // Program structure
    Program,
    ProgramUnit,
    MainProgram,
    /// Main program without a `PROGRAM` statement
    MainProgramNoStmt,
    Module,
    SubroutineSubprogram,
    FunctionSubprogram,
    InternalSubprogram,
    SpecificationPart,
    ExecutionPart,
    InternalSubprogramPart,
    ModuleSubprogramPart,
    ProgramStmt,
    EndProgramStmt,
    ModuleStmt,
    EndModuleStmt,
    SubroutineStmt,
    EndSubroutineStmt,
    FunctionStmt,
    EndFunctionStmt,
    ContainsStmt,
    PrefixSpec,
    DummyArgList,
    Suffix,

    // Specification
    UseStmt,
    OnlyList,
    /// `local => use` in a USE list
    Rename,
    ImplicitStmt,
    AccessStmt,
    AccessIdList,
    DeclarationConstruct,
    TypeDeclarationStmt,
    DeclarationTypeSpec,
    IntrinsicTypeSpec,
    KindSelector,
    DerivedTypeSpec,
    TypeParamSpecList,
    TypeParamSpec,
    TypeParamValue,
    AttrSpecList,
    AttrSpec,
    AttrKeyword,
    DimensionSpec,
    IntentSpec,
    IntentKeyword,
    ArraySpec,
    ShapeSpec,
    RangeSpec,
    EntityDeclList,
    EntityDecl,
    DerivedTypeDef,
    DerivedTypeStmt,
    EndTypeStmt,

    // Execution
    ExecutionPartConstruct,
    ExecutableConstruct,
    ActionStmt,
    AssignmentStmt,
    PointerAssignmentStmt,
    CallStmt,
    ProcedureCall,
    ContinueStmt,
    CycleStmt,
    ExitStmt,
    GotoStmt,
    Label,
    IfStmt,
    PrintStmt,
    OutputItemList,
    OutputItem,
    ReadStmt,
    WriteStmt,
    /// `( io-control-spec-list )` of a READ or WRITE
    IoControl,
    IoControlSpecList,
    IoControlSpec,
    IoUnit,
    InputItemList,
    ReturnStmt,
    StopStmt,
    ErrorStopStmt,
    WhereStmt,
    AllocateStmt,
    DeallocateStmt,

    // Constructs
    IfConstruct,
    IfThenStmt,
    ElseIfStmt,
    ElseStmt,
    EndIfStmt,
    DoConstruct,
    LabelDoConstruct,
    NonlabelDoConstruct,
    LabelDoStmt,
    NonlabelDoStmt,
    LoopControl,
    LoopBounds,
    /// Anything that may close a labelled DO
    EndDo,
    EndDoStmt,
    CaseConstruct,
    SelectCaseStmt,
    CaseStmt,
    CaseSelector,
    CaseValueRangeList,
    CaseValueRange,
    CaseRange,
    EndSelectStmt,
    SelectTypeConstruct,
    SelectTypeStmt,
    Selector,
    TypeGuardStmt,
    TypeSpec,
    WhereConstruct,
    WhereConstructStmt,
    MaskedElsewhereStmt,
    ElsewhereStmt,
    EndWhereStmt,
    BlockConstruct,
    BlockStmt,
    EndBlockStmt,
    CriticalConstruct,
    CriticalStmt,
    EndCriticalStmt,

    // Expressions
    Expr,
    Level5Expr,
    EquivOperand,
    OrOperand,
    AndOperand,
    Level4Expr,
    Level3Expr,
    Level2Expr,
    Level2UnaryExpr,
    AddOperand,
    MultOperand,
    Level1Expr,
    Primary,
    Constant,
    LiteralConstant,
    IntLiteralConstant,
    RealLiteralConstant,
    ComplexLiteralConstant,
    LogicalLiteralConstant,
    CharLiteralConstant,
    BozLiteralConstant,
    Designator,
    DataRef,
    PartRef,
    SectionSubscriptList,
    SectionSubscript,
    SubscriptTriplet,
    FunctionReference,
    ActualArgSpecList,
    ActualArgSpec,
    ArrayConstructor,
    AcValueList,
    Parenthesis,
    Name,
    Star,

    // Reader items
    Comment,
    Directive,
    /// `INCLUDE 'file'`, kept in place like a comment
    IncludeStmt,
}

impl RuleId {
    /// Statements that continue an open construct rather than nest in it
    /// (`ELSE`, `CASE`, `CONTAINS`, ...). They print one level shallower
    /// than the construct body.
    #[must_use]
    pub fn is_continuation(self) -> bool {
        matches!(
            self,
            RuleId::ElseIfStmt
                | RuleId::ElseStmt
                | RuleId::CaseStmt
                | RuleId::TypeGuardStmt
                | RuleId::MaskedElsewhereStmt
                | RuleId::ElsewhereStmt
                | RuleId::ContainsStmt
        )
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<&str> = RuleId::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(names.len(), RuleId::ALL.len());
    }

    #[test]
    fn test_display() {
        assert_eq!(RuleId::IfConstruct.to_string(), "IfConstruct");
        assert_eq!(format!("{}", RuleId::Name), "Name");
    }

    #[test]
    fn test_continuation() {
        assert!(RuleId::ElseStmt.is_continuation());
        assert!(RuleId::ContainsStmt.is_continuation());
        assert!(!RuleId::EndIfStmt.is_continuation());
        assert!(!RuleId::AssignmentStmt.is_continuation());
    }
}
