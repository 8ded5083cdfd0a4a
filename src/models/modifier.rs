use serde::{Deserialize, Serialize};

use crate::models::precondition::Operand;

/// A value transformation applied between reading a source and writing a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type", rename_all = "PascalCase")]
pub enum Modifier {
    /// Arithmetic expression over `$`, the incoming value
    #[serde(rename_all = "PascalCase")]
    Transformation { active: bool, expression: String },

    /// Chooses between two values depending on a comparison with the incoming value
    #[serde(rename_all = "PascalCase")]
    Comparison {
        active: bool,
        operand: Operand,
        value: String,
        if_value: String,
        else_value: String,
    },
}

impl Modifier {
    pub fn transformation(expression: impl Into<String>) -> Self {
        Modifier::Transformation {
            active: true,
            expression: expression.into(),
        }
    }

    pub fn comparison(
        operand: Operand,
        value: impl Into<String>,
        if_value: impl Into<String>,
        else_value: impl Into<String>,
    ) -> Self {
        Modifier::Comparison {
            active: true,
            operand,
            value: value.into(),
            if_value: if_value.into(),
            else_value: else_value.into(),
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Modifier::Transformation { active, .. } | Modifier::Comparison { active, .. } => *active,
        }
    }
}
