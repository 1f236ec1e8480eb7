use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
}

/// A conjunction of field comparisons evaluated against an item's value,
/// which must be a JSON object for any non-empty filter to match.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub fields: Vec<(String, FilterOp)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, op: FilterOp) -> Self {
        self.fields.push((field.into(), op));
        self
    }

    pub fn matches(&self, value: &Value) -> bool {
        self.fields.iter().all(|(field, op)| {
            let field_value = value.get(field);
            match op {
                // `$eq`/`$ne` use serde_json::Value's own structural equality,
                // which already compares objects/arrays field-by-field rather
                // than by reference, so non-scalar values compare correctly
                // without extra handling.
                FilterOp::Eq(expected) => field_value == Some(expected),
                FilterOp::Ne(expected) => field_value != Some(expected),
                FilterOp::Gt(expected) => compare_numeric(field_value, expected, |a, b| a > b),
                FilterOp::Gte(expected) => compare_numeric(field_value, expected, |a, b| a >= b),
                FilterOp::Lt(expected) => compare_numeric(field_value, expected, |a, b| a < b),
                FilterOp::Lte(expected) => compare_numeric(field_value, expected, |a, b| a <= b),
                FilterOp::In(options) => field_value.map(|v| options.contains(v)).unwrap_or(false),
                FilterOp::Nin(options) => {
                    field_value.map(|v| !options.contains(v)).unwrap_or(true)
                }
            }
        })
    }
}

fn compare_numeric(actual: Option<&Value>, expected: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.and_then(Value::as_f64), expected.as_f64()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

/// Matches a namespace against a pattern where `*` matches exactly one
/// segment and `**` matches any number of segments, including zero.
pub fn namespace_matches(pattern: &[String], namespace: &[String]) -> bool {
    matches_from(pattern, namespace)
}

fn matches_from(pattern: &[String], namespace: &[String]) -> bool {
    match pattern.first() {
        None => namespace.is_empty(),
        Some(segment) if segment == "**" => {
            // `**` can consume zero or more segments; try every split point.
            (0..=namespace.len()).any(|take| matches_from(&pattern[1..], &namespace[take..]))
        }
        Some(segment) if segment == "*" => {
            !namespace.is_empty() && matches_from(&pattern[1..], &namespace[1..])
        }
        Some(segment) => {
            !namespace.is_empty() && &namespace[0] == segment && matches_from(&pattern[1..], &namespace[1..])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn eq_on_nested_objects_is_structural() {
        let filter = Filter::new().with("meta", FilterOp::Eq(json!({"a": 1, "b": 2})));
        assert!(filter.matches(&json!({"meta": {"a": 1, "b": 2}})));
        assert!(!filter.matches(&json!({"meta": {"a": 1, "b": 3}})));
    }

    #[test]
    fn numeric_range_operators_compare_as_numbers() {
        let filter = Filter::new().with("age", FilterOp::Gte(json!(18)));
        assert!(filter.matches(&json!({"age": 21})));
        assert!(!filter.matches(&json!({"age": 16})));
    }

    #[test]
    fn single_star_matches_exactly_one_segment() {
        let pattern = vec!["users".to_string(), "*".to_string()];
        assert!(namespace_matches(&pattern, &["users".into(), "42".into()]));
        assert!(!namespace_matches(&pattern, &["users".into()]));
        assert!(!namespace_matches(
            &pattern,
            &["users".into(), "42".into(), "profile".into()]
        ));
    }

    #[test]
    fn double_star_matches_any_depth_including_zero() {
        let pattern = vec!["users".to_string(), "**".to_string()];
        assert!(namespace_matches(&pattern, &["users".into()]));
        assert!(namespace_matches(&pattern, &["users".into(), "42".into()]));
        assert!(namespace_matches(
            &pattern,
            &["users".into(), "42".into(), "profile".into()]
        ));
        assert!(!namespace_matches(&pattern, &["orgs".into()]));
    }
}
