use crate::domain::{Constraint, LinearProblem};
use crate::optimizer::binder::BoundConverter;

/// Ties a converter output to its inputs: `output = Σ input_i * ratio_i`.
#[derive(Debug, Default)]
pub struct ConverterMixBuilder;

impl ConverterMixBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn add_converter(&mut self, problem: &mut LinearProblem, converter: &BoundConverter, t: usize) {
        let mut row = Constraint::equal(0.0)
            .with_name(format!("converter {} at t={}", converter.name, t))
            .with_term(converter.dest, 1.0);
        for src in &converter.sources {
            row.set_coefficient(src.variable, -src.ratio);
        }
        problem.add_constraint(row);
        tracing::debug!(converter = %converter.name, t, sources = converter.sources.len(), "converter row added");
    }
}
