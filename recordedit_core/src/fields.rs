use serde_json::{Map, Value};

/// Pending field overrides for one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldEditState {
    original: Map<String, Value>,
    pending: Map<String, Value>,
}

impl FieldEditState {
    pub fn new(original: Map<String, Value>) -> Self {
        Self {
            original,
            pending: Map::new(),
        }
    }

    /// Stages `value` for `field`. Setting a field back to its original value
    /// drops the override for that field.
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        let field = field.into();
        let original = self.original.get(&field).unwrap_or(&Value::Null);
        if *original == value {
            self.pending.remove(&field);
            tracing::debug!(%field, "field back to original value");
        } else {
            tracing::debug!(%field, "field override staged");
            self.pending.insert(field, value);
        }
    }

    pub fn pending(&self) -> &Map<String, Value> {
        &self.pending
    }

    /// Value the field would have after saving.
    pub fn current(&self, field: &str) -> &Value {
        self.pending
            .get(field)
            .or_else(|| self.original.get(field))
            .unwrap_or(&Value::Null)
    }

    pub fn original(&self) -> &Map<String, Value> {
        &self.original
    }

    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn reset(&mut self) {
        self.pending.clear();
    }

    /// Adopts a persisted record as the new original and clears every override.
    pub fn commit(&mut self, persisted: Map<String, Value>) {
        self.original = persisted;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn original() -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("name".into(), json!("Beach house"));
        fields.insert("bedrooms".into(), json!(3));
        fields
    }

    #[test]
    fn changed_value_is_pending() {
        let mut state = FieldEditState::new(original());
        state.set("bedrooms", json!(4));

        assert!(state.is_dirty());
        assert_eq!(state.pending().get("bedrooms"), Some(&json!(4)));
        assert_eq!(state.current("bedrooms"), &json!(4));
        assert_eq!(state.current("name"), &json!("Beach house"));
    }

    #[test]
    fn restoring_original_clears_override() {
        let mut state = FieldEditState::new(original());
        state.set("bedrooms", json!(4));
        state.set("name", json!("Lake house"));
        state.set("bedrooms", json!(3));

        assert!(state.is_dirty());
        assert_eq!(state.pending().len(), 1);

        state.set("name", json!("Beach house"));
        assert!(!state.is_dirty());
    }

    #[test]
    fn unknown_field_compares_against_null() {
        let mut state = FieldEditState::new(original());
        state.set("pool", Value::Null);
        assert!(!state.is_dirty());
        state.set("pool", json!(true));
        assert!(state.is_dirty());
    }

    #[test]
    fn commit_adopts_new_original() {
        let mut state = FieldEditState::new(original());
        state.set("bedrooms", json!(5));
        let mut persisted = original();
        persisted.insert("bedrooms".into(), json!(5));
        state.commit(persisted);

        assert!(!state.is_dirty());
        state.set("bedrooms", json!(5));
        assert!(!state.is_dirty());
    }

    #[test]
    fn reset_clears_all_overrides() {
        let mut state = FieldEditState::new(original());
        state.set("bedrooms", json!(1));
        state.set("name", json!("x"));
        state.reset();
        assert!(state.pending().is_empty());
    }
}
