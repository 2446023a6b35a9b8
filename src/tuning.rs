use tracing::info;

use crate::error::{PipelineError, Result};
use crate::optimizer::{Maximum, Optimizer};
use crate::table::FeatureTable;

pub const FORM_WEIGHT_RANGE: (f64, f64) = (0.0, 1.0);
pub const FORM_WEIGHT_STEP: f64 = 0.05;

/// Mean squared error of `predicted + weight * form_residual` against the margin,
/// relative to the error of `predicted` alone. Lower is better; 1.0 means no change.
pub fn relative_form_error(table: &FeatureTable, weight: f64) -> f64 {
    let rows = table.rows();
    let mut base = 0.0;
    let mut blended = 0.0;
    for row in rows {
        base += (row.points - row.predicted).powi(2);
        blended += (row.points - row.predicted - weight * row.form.residual).powi(2);
    }
    if base <= 0.0 {
        return 1.0;
    }
    blended / base
}

/// Finds the weight on the form-residual signal that best corrects the base model's
/// predictions on `table`. Rows need `predicted` and form columns populated.
///
/// The objective is the negated relative error, which keeps it near unit scale so the
/// optimizer's absolute slope tolerance stays meaningful.
pub fn tune_form_weight(optimizer: &Optimizer, table: &FeatureTable) -> Result<Maximum> {
    if table.is_empty() {
        return Err(PipelineError::NotEnoughRows { needed: 0, have: 0 });
    }
    let objective = |w: f64| -relative_form_error(table, w);
    let max = optimizer.par_find_maximum(objective, FORM_WEIGHT_RANGE, FORM_WEIGHT_STEP)?;
    info!(
        weight = max.argument,
        converged = max.converged,
        interior = max.is_interior(FORM_WEIGHT_RANGE),
        relative_error = relative_form_error(table, max.argument),
        "form weight tuned"
    );
    Ok(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{FormSignal, GameRow};

    #[test]
    fn recovers_weight_of_a_planted_correction() {
        let rows: Vec<GameRow> = (0..40)
            .map(|i| {
                let mut r = GameRow::new(i, "A", "B");
                let fr = (i as f64 * 0.7).sin() * 10.0;
                r.predicted = 3.0;
                r.form = FormSignal {
                    home_rate: 0.0,
                    points: 0.0,
                    residual: fr,
                };
                r.points = 3.0 + 0.4 * fr;
                r
            })
            .collect();
        let table = FeatureTable::new(Vec::new(), rows);
        let max = tune_form_weight(&Optimizer::default(), &table).unwrap();
        assert!(max.converged);
        assert!((max.argument - 0.4).abs() < 0.005, "{}", max.argument);
    }
}
