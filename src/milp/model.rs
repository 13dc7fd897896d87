//! Arena-style linear model.
//!
//! A [`Model`] accumulates variable definitions, linear constraint records,
//! and one objective. Builders materialize their index sets first and then
//! append constraints referring to variables by [`VarId`]; the model itself
//! is solver-agnostic and is handed to a [`Solver`](crate::solver::Solver)
//! implementation as-is.
//!
//! Coefficients, bounds and right-hand sides are integers: every formulation
//! in this crate is built from durations, priorities and big-M constants,
//! all integral.

/// Handle of one variable inside a [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(usize);

impl VarId {
    /// Position of the variable in the model's variable table.
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Domain of one decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarDomain {
    /// 0/1 variable.
    Binary,
    /// Integer variable with inclusive bounds.
    Integer { lb: i64, ub: i64 },
}

/// A named variable definition.
#[derive(Debug, Clone)]
pub struct VarDef {
    /// Diagnostic name (shows up in solver logs and test failures).
    pub name: String,
    /// Variable domain.
    pub domain: VarDomain,
}

/// A linear expression `Σ coeff · var + constant`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinExpr {
    /// (variable, coefficient) terms.
    pub terms: Vec<(VarId, i64)>,
    /// Constant offset.
    pub constant: i64,
}

impl LinExpr {
    /// Creates an empty expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the single-term expression `coeff · var`.
    pub fn term(var: VarId, coeff: i64) -> Self {
        Self {
            terms: vec![(var, coeff)],
            constant: 0,
        }
    }

    /// Appends `coeff · var` and returns the expression (builder form).
    pub fn plus(mut self, var: VarId, coeff: i64) -> Self {
        self.add(var, coeff);
        self
    }

    /// Appends `coeff · var`.
    pub fn add(&mut self, var: VarId, coeff: i64) {
        if coeff != 0 {
            self.terms.push((var, coeff));
        }
    }

    /// Evaluates the expression under a per-variable assignment.
    ///
    /// `values` is indexed by [`VarId::index`]; fractional solver output is
    /// accepted and summed exactly on the coefficients.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.constant as f64
            + self
                .terms
                .iter()
                .map(|(var, coeff)| *coeff as f64 * values[var.index()])
                .sum::<f64>()
    }
}

/// Comparison operator of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `expr ≤ rhs`
    Le,
    /// `expr ≥ rhs`
    Ge,
    /// `expr = rhs`
    Eq,
}

/// A linear constraint record `expr op rhs`.
#[derive(Debug, Clone)]
pub struct LinConstraint {
    /// Diagnostic label naming the constraint family and its index.
    pub label: String,
    /// Left-hand side.
    pub expr: LinExpr,
    /// Comparison operator.
    pub op: CmpOp,
    /// Right-hand side.
    pub rhs: i64,
}

impl LinConstraint {
    /// Whether the constraint holds under the given assignment.
    ///
    /// A small tolerance absorbs the fractional noise of MILP backends.
    pub fn is_satisfied(&self, values: &[f64]) -> bool {
        const EPS: f64 = 1e-6;
        let lhs = self.expr.evaluate(values);
        let rhs = self.rhs as f64;
        match self.op {
            CmpOp::Le => lhs <= rhs + EPS,
            CmpOp::Ge => lhs >= rhs - EPS,
            CmpOp::Eq => (lhs - rhs).abs() <= EPS,
        }
    }
}

/// Objective sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// Maximize the objective.
    Maximize,
    /// Minimize the objective.
    Minimize,
}

/// An assembled linear model: variables, constraints, one objective.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    vars: Vec<VarDef>,
    constraints: Vec<LinConstraint>,
    objective: LinExpr,
    sense: Sense,
}

impl Model {
    /// Creates an empty model with a zero maximization objective.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vars: Vec::new(),
            constraints: Vec::new(),
            objective: LinExpr::new(),
            sense: Sense::Maximize,
        }
    }

    /// Model name (used in logs and error messages).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a binary variable.
    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.push_var(name.into(), VarDomain::Binary)
    }

    /// Adds an integer variable with inclusive bounds.
    pub fn add_integer(&mut self, name: impl Into<String>, lb: i64, ub: i64) -> VarId {
        self.push_var(name.into(), VarDomain::Integer { lb, ub })
    }

    fn push_var(&mut self, name: String, domain: VarDomain) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(VarDef { name, domain });
        id
    }

    /// Appends a constraint record.
    pub fn add_constraint(&mut self, label: impl Into<String>, expr: LinExpr, op: CmpOp, rhs: i64) {
        self.constraints.push(LinConstraint {
            label: label.into(),
            expr,
            op,
            rhs,
        });
    }

    /// Sets the objective.
    pub fn set_objective(&mut self, sense: Sense, objective: LinExpr) {
        self.sense = sense;
        self.objective = objective;
    }

    /// Variable table.
    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    /// Constraint records.
    pub fn constraints(&self) -> &[LinConstraint] {
        &self.constraints
    }

    /// Objective expression.
    pub fn objective(&self) -> &LinExpr {
        &self.objective
    }

    /// Objective sense.
    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// Number of variables.
    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Label of the first constraint the assignment violates, if any.
    ///
    /// Test helper: lets formulation tests check a hand-built assignment
    /// without invoking a solver.
    pub fn first_violation(&self, values: &[f64]) -> Option<&str> {
        self.constraints
            .iter()
            .find(|c| !c.is_satisfied(values))
            .map(|c| c.label.as_str())
    }
}
