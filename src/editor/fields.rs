use serde_json::{Map, Value};

use crate::error::{Result, TallyError};

use super::list::ListItem;

/// Bounds of a numeric form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberField {
    pub name: &'static str,
    pub min: u32,
    pub max: Option<u32>,
    pub step: u32,
}

impl NumberField {
    /// Non-negative hours, step 1.
    pub const fn hours(name: &'static str) -> Self {
        Self {
            name,
            min: 0,
            max: None,
            step: 1,
        }
    }

    /// Percentage from 0 to 100, step 5.
    pub const fn percent(name: &'static str) -> Self {
        Self {
            name,
            min: 0,
            max: Some(100),
            step: 5,
        }
    }

    pub fn clamp(&self, value: i64) -> u32 {
        let upper = i64::from(self.max.unwrap_or(u32::MAX));
        let clamped = value.clamp(i64::from(self.min), upper);
        u32::try_from(clamped).unwrap_or(self.min)
    }

    /// Parses user input the lenient way a number input does: fractions are
    /// truncated and anything unparsable counts as zero.
    pub fn parse(&self, raw: &str) -> u32 {
        let value = raw.trim().parse::<f64>().unwrap_or(0.0);
        let value = if value.is_finite() { value.trunc() } else { 0.0 };
        #[allow(clippy::cast_possible_truncation)]
        self.clamp(value as i64)
    }
}

fn to_object<T: ListItem>(item: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(item)? {
        Value::Object(map) => Ok(map),
        _ => Err(TallyError::Input(format!("{} is not a record", T::TITLE))),
    }
}

fn number_field<T: ListItem>(name: &str) -> Option<&'static NumberField> {
    T::NUMBER_FIELDS.iter().find(|field| field.name == name)
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "on" => Ok(true),
        "false" | "no" | "n" | "0" | "off" | "" => Ok(false),
        other => Err(TallyError::Input(format!("Expected yes or no, got \"{other}\""))),
    }
}

/// Returns a copy of `item` with the field named `name` (wire name) set
/// from `raw`. Numeric fields are clamped to their bounds.
pub fn set_field<T: ListItem>(item: &T, name: &str, raw: &str) -> Result<T> {
    if name == "id" {
        return Err(TallyError::Input("The id field cannot be edited".into()));
    }

    let mut map = to_object(item)?;
    let current = map.get(name).ok_or_else(|| {
        TallyError::Input(format!("{} has no field \"{name}\"", T::TITLE))
    })?;

    let value = if let Some(field) = number_field::<T>(name) {
        Value::from(field.parse(raw))
    } else {
        match current {
            Value::Bool(_) => Value::Bool(parse_bool(raw)?),
            Value::Number(_) => {
                return Err(TallyError::Input(format!("Field \"{name}\" is not editable")))
            }
            _ => Value::String(raw.to_string()),
        }
    };

    map.insert(name.to_string(), value);
    Ok(serde_json::from_value(Value::Object(map))?)
}

fn step_field<T: ListItem>(item: &T, name: &str, up: bool) -> Result<T> {
    let field = number_field::<T>(name).ok_or_else(|| {
        TallyError::Input(format!("\"{name}\" is not a numeric field of {}", T::TITLE))
    })?;

    let mut map = to_object(item)?;
    let current = map.get(name).and_then(Value::as_i64).unwrap_or(0);
    let step = i64::from(field.step);
    let next = if up { current + step } else { current - step };

    map.insert(name.to_string(), Value::from(field.clamp(next)));
    Ok(serde_json::from_value(Value::Object(map))?)
}

pub fn increment<T: ListItem>(item: &T, name: &str) -> Result<T> {
    step_field(item, name, true)
}

pub fn decrement<T: ListItem>(item: &T, name: &str) -> Result<T> {
    step_field(item, name, false)
}

/// Wire names of the empty required fields.
pub fn missing_required<T: ListItem>(item: &T) -> Result<Vec<&'static str>> {
    let map = to_object(item)?;
    Ok(T::REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|name| {
            map.get(*name)
                .and_then(Value::as_str)
                .map_or(true, |value| value.trim().is_empty())
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::templates::{Risk, Task, TeamRole};

    #[test]
    fn test_parse_is_lenient() {
        let hours = NumberField::hours("hoursBestCase");
        assert_eq!(hours.parse("12"), 12);
        assert_eq!(hours.parse("4.9"), 4);
        assert_eq!(hours.parse("-3"), 0);
        assert_eq!(hours.parse("abc"), 0);
        assert_eq!(hours.parse("NaN"), 0);

        let percent = NumberField::percent("chanceOfOccurring");
        assert_eq!(percent.parse("250"), 100);
    }

    #[test]
    fn test_set_text_and_number_fields() {
        let task = Task::default();
        let task = set_field(&task, "taskDescription", "Provision cluster").unwrap();
        let task = set_field(&task, "hoursWorstCase", "40").unwrap();
        let task = set_field(&task, "phase", "Build").unwrap();

        assert_eq!(task.task_description, "Provision cluster");
        assert_eq!(task.hours_worst_case, 40);
        assert_eq!(task.classification.phase, "Build");
    }

    #[test]
    fn test_set_field_keeps_id() {
        let task = Task::default();
        let edited = set_field(&task, "scopingNotes", "n/a").unwrap();
        assert_eq!(edited.id, task.id);
        assert!(set_field(&task, "id", "x").is_err());
        assert!(set_field(&task, "nope", "x").is_err());
    }

    #[test]
    fn test_boolean_fields() {
        let role = TeamRole::default();
        let role = set_field(&role, "allowPartialWeeks", "yes").unwrap();
        assert!(role.allow_partial_weeks);
        assert!(set_field(&role, "subcontractorPermitted", "maybe").is_err());
    }

    #[test]
    fn test_increment_and_decrement_clamp() {
        let risk = Risk::default();
        let risk = increment(&risk, "chanceOfOccurring").unwrap();
        assert_eq!(risk.chance_of_occurring, 5);
        let risk = decrement(&risk, "chanceOfOccurring").unwrap();
        let risk = decrement(&risk, "chanceOfOccurring").unwrap();
        assert_eq!(risk.chance_of_occurring, 0);

        let risk = set_field(&risk, "chanceOfOccurring", "100").unwrap();
        let risk = increment(&risk, "chanceOfOccurring").unwrap();
        assert_eq!(risk.chance_of_occurring, 100);

        assert!(increment(&risk, "risk").is_err());
    }

    #[test]
    fn test_billable_percentage_is_bounded() {
        let role = TeamRole::default();
        assert_eq!(role.billable_percentage, 100);
        let role = increment(&role, "billablePercentage").unwrap();
        assert_eq!(role.billable_percentage, 100);
    }

    #[test]
    fn test_missing_required() {
        let task = Task::default();
        assert_eq!(missing_required(&task).unwrap(), vec!["taskDescription"]);

        let task = set_field(&task, "taskDescription", "  ").unwrap();
        assert_eq!(missing_required(&task).unwrap(), vec!["taskDescription"]);
    }
}
