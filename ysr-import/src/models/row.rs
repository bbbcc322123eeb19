//! One parsed spreadsheet row

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Header → cell mapping for one spreadsheet row, in column order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cell; a repeated header replaces the earlier value
    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<String>) {
        let header = header.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(h, _)| *h == header) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((header, value)),
        }
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True when every cell is empty or whitespace
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }
}

impl<H, V> FromIterator<(H, V)> for Row
where
    H: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (H, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (header, value) in iter {
            row.insert(header, value);
        }
        row
    }
}

// Serialized as a JSON object, keeping column order
impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (header, value) in &self.cells {
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_in_column_order() {
        let row: Row = [("name", "Ana"), ("age", "12"), ("school", "North")]
            .into_iter()
            .collect();
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"name":"Ana","age":"12","school":"North"}"#
        );
    }

    #[test]
    fn test_repeated_header_replaces_value() {
        let mut row = Row::new();
        row.insert("name", "first");
        row.insert("name", "second");
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("name"), Some("second"));
    }

    #[test]
    fn test_blank_detection() {
        let blank: Row = [("a", " "), ("b", "")].into_iter().collect();
        let filled: Row = [("a", " "), ("b", "x")].into_iter().collect();
        assert!(blank.is_blank());
        assert!(!filled.is_blank());
    }
}
