use good_lp::Variable;

/// One (line, order) pair's decision variables.
#[derive(Debug, Clone, Copy)]
pub struct OrderLineVars {
    pub present: Variable,
    pub run_h: Variable,
    pub seg_a_start: Variable,
    pub seg_a_end: Variable,
    pub seg_a_run: Variable,
    pub seg_b_present: Variable,
    pub seg_b_start: Variable,
    pub seg_b_end: Variable,
    pub seg_b_run: Variable,
    pub eff_end: Variable,
}

/// Up to three optional CIP intervals on one line.
#[derive(Debug, Clone, Copy)]
pub struct CipVars {
    pub present: [Variable; 3],
    pub start: [Variable; 3],
    pub end: [Variable; 3],
}

/// A changeover-ordering pair `{i, j}` sharing a line: `order_before` is
/// true when `i` precedes `j`.
#[derive(Debug, Clone, Copy)]
pub struct PairOrderVars {
    pub order_before: Variable,
    pub succ_i_before_j: Variable,
    pub succ_j_before_i: Variable,
}

/// A generic interval used only for the NoOverlap pass: seg_b
/// continuations, CIP blocks and downtimes all reduce to this shape so one
/// pairwise disjunction routine can cover all of them.
#[derive(Debug, Clone, Copy)]
pub enum BlockEnd {
    Variable(Variable),
    Fixed(f64),
}

#[derive(Debug, Clone, Copy)]
pub struct NamedBlock {
    pub start: BlockEnd,
    pub end: BlockEnd,
    /// `None` means always present (e.g. a downtime).
    pub present: Option<Variable>,
}
