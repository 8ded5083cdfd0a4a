use serde::{Deserialize, Serialize, Serializer};

/// What a precondition tests against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreconditionType {
    /// Placeholder row, never evaluated or persisted
    #[default]
    None,
    /// Current value of another config item
    Config,
    /// A named variable
    Variable,
    /// Input pin state of a connected module
    Pin,
}

/// Connective joining a precondition with the one that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Logic {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Operand {
    #[default]
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">=")]
    GreaterOrEqual,
}

impl Operand {
    pub fn symbol(self) -> &'static str {
        match self {
            Operand::Equal => "=",
            Operand::NotEqual => "!=",
            Operand::Less => "<",
            Operand::Greater => ">",
            Operand::LessOrEqual => "<=",
            Operand::GreaterOrEqual => ">=",
        }
    }
}

/// A guard condition attached to a config item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Precondition {
    #[serde(rename = "Type", default)]
    pub kind: PreconditionType,
    #[serde(rename = "Ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(default)]
    pub operand: Operand,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub logic: Logic,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Default for Precondition {
    fn default() -> Self {
        Self {
            kind: PreconditionType::None,
            reference: None,
            serial: None,
            pin: None,
            operand: Operand::Equal,
            value: String::new(),
            logic: Logic::And,
            active: true,
        }
    }
}

impl Precondition {
    /// Compares the current value of another config item.
    pub fn config(reference: impl Into<String>, operand: Operand, value: impl Into<String>) -> Self {
        Self {
            kind: PreconditionType::Config,
            reference: Some(reference.into()),
            operand,
            value: value.into(),
            ..Self::default()
        }
    }

    /// Compares a named variable.
    pub fn variable(name: impl Into<String>, operand: Operand, value: impl Into<String>) -> Self {
        Self {
            kind: PreconditionType::Variable,
            reference: Some(name.into()),
            operand,
            value: value.into(),
            ..Self::default()
        }
    }

    /// Tests a module input pin against `"on"` / `"off"`.
    pub fn pin(serial: impl Into<String>, pin: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: PreconditionType::Pin,
            serial: Some(serial.into()),
            pin: Some(pin.into()),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn with_logic(mut self, logic: Logic) -> Self {
        self.logic = logic;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.kind == PreconditionType::None
    }

    /// Human readable summary used in the item list.
    pub fn label(&self) -> String {
        let logic = match self.logic {
            Logic::And => "and",
            Logic::Or => "or",
        };
        match self.kind {
            PreconditionType::None => String::new(),
            PreconditionType::Config => format!(
                "Config: <Ref:{}> {} {} <Logic:{}>",
                self.reference.as_deref().unwrap_or_default(),
                self.operand.symbol(),
                self.value,
                logic
            ),
            PreconditionType::Variable => format!(
                "Variable: <Ref:{}> {} {} <Logic:{}>",
                self.reference.as_deref().unwrap_or_default(),
                self.operand.symbol(),
                self.value,
                logic
            ),
            PreconditionType::Pin => format!(
                "Pin: <Serial:{}> <Pin:{}> = {} <Logic:{}>",
                self.serial.as_deref().unwrap_or_default(),
                self.pin.as_deref().unwrap_or_default(),
                self.value,
                logic
            ),
        }
    }
}

/// Ordered preconditions plus the fallback used when they fail.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PreconditionList {
    #[serde(default, serialize_with = "serialize_non_empty")]
    pub items: Vec<Precondition>,
    #[serde(default)]
    pub execute_on_false: bool,
    #[serde(default)]
    pub false_case_value: String,
}

fn serialize_non_empty<S>(items: &[Precondition], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(items.iter().filter(|p| !p.is_empty()))
}

impl PreconditionList {
    pub fn new(items: Vec<Precondition>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn push(&mut self, precondition: Precondition) {
        self.items.push(precondition);
    }

    /// Preconditions that take part in evaluation.
    pub fn effective(&self) -> impl Iterator<Item = &Precondition> {
        self.items.iter().filter(|p| p.active && !p.is_empty())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_precondition() {
        let p = Precondition::default();
        assert_eq!(p.kind, PreconditionType::None);
        assert!(p.active);
        assert_eq!(p.logic, Logic::And);
        assert_eq!(p.operand, Operand::Equal);
        assert!(p.is_empty());
    }

    #[test]
    fn test_non_default_precondition_is_not_empty() {
        let p = Precondition::config("ref", Operand::Less, "1");
        assert!(!p.is_empty());
    }

    #[test]
    fn test_empty_preconditions_are_not_serialized() {
        let mut list = PreconditionList::default();
        list.push(Precondition::default());
        list.push(Precondition::config("TestRef", Operand::Equal, "1"));
        list.push(Precondition::default());

        let json = serde_json::to_string(&list).unwrap();
        assert!(!json.contains("null"));
        assert!(json.contains("TestRef"));

        let restored: PreconditionList = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.items[0].reference.as_deref(), Some("TestRef"));
    }

    #[test]
    fn test_all_empty_serializes_as_empty_array() {
        let list = PreconditionList::new(vec![Precondition::default(), Precondition::default()]);
        let json = serde_json::to_string(&list).unwrap();
        assert!(json.contains("\"Items\":[]"));
    }

    #[test]
    fn test_label_format() {
        let p = Precondition::config("TestRef1", Operand::Less, "TestValue1").with_logic(Logic::Or);
        assert_eq!(p.label(), "Config: <Ref:TestRef1> < TestValue1 <Logic:or>");
    }

    #[test]
    fn test_effective_skips_inactive_and_empty() {
        let mut inactive = Precondition::variable("v", Operand::Equal, "1");
        inactive.active = false;
        let list = PreconditionList::new(vec![
            Precondition::default(),
            inactive,
            Precondition::variable("w", Operand::Equal, "1"),
        ]);

        assert_eq!(list.effective().count(), 1);
    }
}
