//! Append-only list of confirmed ingredient names.

/// Confirmed ingredients in the order the user confirmed them.
///
/// Duplicates are kept: confirming "Tomato" twice means the user asserted it
/// twice.  There is no removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientCollector {
    items: Vec<String>,
}

impl IngredientCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the controller appends, on confirm or manual submit.
    pub(crate) fn push(&mut self, name: String) {
        self.items.push(name);
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Owned copy for downstream consumers (UI, recipe assistant).
    pub fn to_vec(&self) -> Vec<String> {
        self.items.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_and_duplicates() {
        let mut c = IngredientCollector::new();
        c.push("Tomato".into());
        c.push("Basil".into());
        c.push("Tomato".into());
        assert_eq!(c.items(), ["Tomato", "Basil", "Tomato"]);
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn to_vec_is_a_copy() {
        let mut c = IngredientCollector::new();
        c.push("Mozzarella".into());
        let snapshot = c.to_vec();
        c.push("Basil".into());
        assert_eq!(snapshot, vec!["Mozzarella".to_string()]);
        assert_eq!(c.len(), 2);
    }
}
