//! Precondition evaluation.
//!
//! Preconditions are folded left to right. Each precondition's `logic` is the connective
//! to the one after it, so `a(or) b(and) c` is `(a || b) && c`. No precedence is applied.

use thiserror::Error;

use crate::models::precondition::{Logic, Operand, Precondition, PreconditionList, PreconditionType};
use crate::models::value::Value;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreconditionError {
    #[error("Config reference not found: {0}")]
    ReferenceNotFound(String),
}

/// Values a precondition can test against.
pub trait PreconditionContext {
    /// Current value of the config item with this GUID, `None` if there is no such item.
    fn config_value(&self, guid: &str) -> Option<String>;

    /// A named variable. Unknown variables read as 0.
    fn variable(&self, name: &str) -> Value;

    /// State of a module input pin, `None` if unknown.
    fn pin_state(&self, serial: &str, pin: &str) -> Option<bool>;
}

/// True if every active, non-empty precondition holds under the sequential fold.
/// An empty list is satisfied.
pub fn evaluate(
    list: &PreconditionList,
    context: &dyn PreconditionContext,
) -> Result<bool, PreconditionError> {
    let mut result: Option<bool> = None;
    let mut connective = Logic::And;

    for precondition in list.effective() {
        let satisfied = evaluate_single(precondition, context)?;
        result = Some(match (result, connective) {
            (None, _) => satisfied,
            (Some(acc), Logic::And) => acc && satisfied,
            (Some(acc), Logic::Or) => acc || satisfied,
        });
        connective = precondition.logic;
    }

    Ok(result.unwrap_or(true))
}

fn evaluate_single(
    precondition: &Precondition,
    context: &dyn PreconditionContext,
) -> Result<bool, PreconditionError> {
    let reference = precondition.reference.as_deref().unwrap_or_default();

    match precondition.kind {
        PreconditionType::None => Ok(true),
        PreconditionType::Config => {
            let current = context
                .config_value(reference)
                .ok_or_else(|| PreconditionError::ReferenceNotFound(reference.to_string()))?;
            Ok(compare(precondition.operand, &current, &precondition.value))
        }
        PreconditionType::Variable => {
            let current = context.variable(reference).to_string();
            Ok(compare(precondition.operand, &current, &precondition.value))
        }
        PreconditionType::Pin => {
            let serial = precondition.serial.as_deref().unwrap_or_default();
            let pin = precondition.pin.as_deref().unwrap_or_default();
            let expected_on = precondition.value.trim().eq_ignore_ascii_case("on");
            Ok(context
                .pin_state(serial, pin)
                .is_some_and(|on| on == expected_on))
        }
    }
}

/// Compare numerically when both sides parse as numbers, textually otherwise.
pub fn compare(operand: Operand, current: &str, expected: &str) -> bool {
    let ordering = match (current.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b),
        _ => Some(current.cmp(expected)),
    };

    let Some(ordering) = ordering else {
        return operand == Operand::NotEqual;
    };

    match operand {
        Operand::Equal => ordering.is_eq(),
        Operand::NotEqual => ordering.is_ne(),
        Operand::Less => ordering.is_lt(),
        Operand::Greater => ordering.is_gt(),
        Operand::LessOrEqual => ordering.is_le(),
        Operand::GreaterOrEqual => ordering.is_ge(),
    }
}
