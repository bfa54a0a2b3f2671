// Generic column descriptors handed to whatever renders the level table.
// The renderer owns layout; this only says which column is a link.

use super::row::Row;
use super::schema::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Text,
    /// Clicking the cell drills into the next level.
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub key: String,
    pub title: String,
    pub kind: CellKind,
}

impl ColumnDescriptor {
    pub fn is_clickable(&self) -> bool {
        self.kind == CellKind::Link
    }
}

/// Column descriptors plus the click callback wired to the link column.
pub struct TableRenderSpec<F> {
    columns: Vec<ColumnDescriptor>,
    on_click: F,
}

impl<F, R> TableRenderSpec<F>
where
    F: Fn(&Row, &str) -> R,
{
    pub fn build(columns: &[String], navigable_column: Option<&str>, on_click: F) -> Self {
        let columns = columns
            .iter()
            .map(|key| ColumnDescriptor {
                key: key.clone(),
                title: key.clone(),
                kind: if Some(key.as_str()) == navigable_column {
                    CellKind::Link
                } else {
                    CellKind::Text
                },
            })
            .collect();

        Self { columns, on_click }
    }

    pub fn from_schema(schema: &Schema, on_click: F) -> Self {
        Self::build(&schema.columns, schema.navigable_column.as_deref(), on_click)
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn link_column(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.is_clickable())
    }

    /// Report a click on `(row, column_key)`. Only the link column reacts.
    pub fn click(&self, row: &Row, column_key: &str) -> Option<R> {
        self.columns
            .iter()
            .find(|c| c.key == column_key && c.is_clickable())
            .map(|c| (self.on_click)(row, &c.key))
    }

    /// Click the link cell of a row, wherever the cursor is.
    pub fn click_link(&self, row: &Row) -> Option<R> {
        self.link_column().map(|c| (self.on_click)(row, &c.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> Row {
        serde_json::from_value(json!({"TransactionId": "5001", "State": "running"})).unwrap()
    }

    fn cols() -> Vec<String> {
        vec!["TransactionId".to_string(), "State".to_string()]
    }

    #[test]
    fn test_one_descriptor_per_column() {
        let spec = TableRenderSpec::build(&cols(), Some("TransactionId"), |_: &Row, k: &str| {
            k.to_string()
        });
        assert_eq!(spec.columns().len(), 2);
        assert_eq!(spec.columns()[0].kind, CellKind::Link);
        assert_eq!(spec.columns()[1].kind, CellKind::Text);
        assert_eq!(spec.columns()[1].title, "State");
    }

    #[test]
    fn test_only_link_column_invokes_callback() {
        let spec = TableRenderSpec::build(&cols(), Some("TransactionId"), |r: &Row, k: &str| {
            format!("{}={}", k, r[k])
        });
        assert_eq!(
            spec.click(&row(), "TransactionId").as_deref(),
            Some("TransactionId=\"5001\"")
        );
        assert_eq!(spec.click(&row(), "State"), None);
        assert_eq!(spec.click(&row(), "Nope"), None);
    }

    #[test]
    fn test_no_navigable_column() {
        let spec = TableRenderSpec::build(&cols(), None, |_: &Row, _: &str| ());
        assert!(spec.columns().iter().all(|c| !c.is_clickable()));
        assert!(spec.link_column().is_none());
        assert!(spec.click_link(&row()).is_none());
    }
}
