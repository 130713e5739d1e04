use serde::{Deserialize, Serialize};

/// One sentence of the derived dataset, written as a single JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub id: String,
    pub text: String,
    pub year: Option<i32>,
}

impl CorpusRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>, year: Option<i32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            year,
        }
    }
}

/// The fields a dataset consumer relies on; `text` is mandatory.
#[derive(Debug, Deserialize)]
pub struct DatasetLine {
    pub text: String,
    #[serde(default)]
    pub year: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_fields_in_order_without_ascii_escaping() {
        let record = CorpusRecord::new("abcdefghij", "Góðan dag", Some(2022));
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"id":"abcdefghij","text":"Góðan dag","year":2022}"#
        );
    }

    #[test]
    fn missing_year_serializes_as_null() {
        let record = CorpusRecord::new("abcdefghij", "Bye", None);
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"id":"abcdefghij","text":"Bye","year":null}"#
        );
    }

    #[test]
    fn dataset_line_tolerates_missing_year() {
        let line: DatasetLine = serde_json::from_str(r#"{"text":"Hey"}"#).unwrap();
        assert_eq!(line.text, "Hey");
        assert_eq!(line.year, None);
    }

    #[test]
    fn dataset_line_requires_text() {
        assert!(serde_json::from_str::<DatasetLine>(r#"{"id":"x","year":2020}"#).is_err());
    }
}
