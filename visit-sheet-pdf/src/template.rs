//! Sheet template and per-record answer data
//!
//! A template describes the title, the labeled fields and the sectioned
//! questions of a visit sheet. A record maps field/question identifiers to the
//! answers for one document.

use crate::error::SheetError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

fn default_lines() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// A labeled slot. Without an `id` the field is label-only decoration and
/// always shows its placeholder lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_lines")]
    pub lines: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_lines")]
    pub lines: u32,
}

impl Template {
    /// Read, parse and validate a template file.
    pub fn load(path: &Path) -> Result<Self, SheetError> {
        let text = std::fs::read_to_string(path).map_err(|e| SheetError::io(path, e))?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn parse(json: &str, origin: &str) -> Result<Self, SheetError> {
        let template: Template =
            serde_json::from_str(json).map_err(|e| SheetError::json(origin, e))?;
        template.validate()?;
        Ok(template)
    }

    /// Every answer slot must reserve at least one line.
    pub fn validate(&self) -> Result<(), SheetError> {
        for (index, field) in self.fields.iter().enumerate() {
            if field.lines == 0 {
                return Err(SheetError::InvalidTemplate(format!(
                    "field #{} ({}) has lines = 0",
                    index + 1,
                    field.id.as_deref().unwrap_or(&field.label)
                )));
            }
        }
        for section in &self.sections {
            for (index, question) in section.questions.iter().enumerate() {
                if question.lines == 0 {
                    return Err(SheetError::InvalidTemplate(format!(
                        "question #{} in section '{}' has lines = 0",
                        index + 1,
                        section.title
                    )));
                }
            }
        }
        Ok(())
    }

    /// Number of answer slots (fields plus questions).
    pub fn slot_count(&self) -> usize {
        self.fields.len() + self.sections.iter().map(|s| s.questions.len()).sum::<usize>()
    }
}

/// Answer data for one output document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: Map<String, Value>,
}

impl Record {
    pub fn load(path: &Path) -> Result<Self, SheetError> {
        let text = std::fs::read_to_string(path).map_err(|e| SheetError::io(path, e))?;
        Self::parse(&text, &path.display().to_string())
    }

    /// The document must be a JSON object; anything else is rejected.
    pub fn parse(json: &str, origin: &str) -> Result<Self, SheetError> {
        let values: Map<String, Value> =
            serde_json::from_str(json).map_err(|e| SheetError::json(origin, e))?;
        Ok(Self { values })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        Self { values }
    }

    /// Resolve the answer for a slot.
    ///
    /// Returns `None` when the slot has no id, the id is absent, the value is
    /// `null`, or the text is blank.
    pub fn answer(&self, id: Option<&str>) -> Result<Option<String>, SheetError> {
        let Some(id) = id else {
            return Ok(None);
        };
        let text = match self.values.get(id) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => {
                return Err(SheetError::InvalidRecordValue { id: id.to_string() });
            }
        };
        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "title": "Visit Sheet",
        "fields": [{ "id": "name", "label": "Name", "lines": 1 }],
        "sections": [
            { "title": "Notes", "questions": [{ "id": "q1", "text": "Comment", "lines": 2 }] }
        ]
    }"#;

    #[test]
    fn test_parse_template() {
        let template = Template::parse(SCENARIO, "inline").unwrap();
        assert_eq!(template.title.as_deref(), Some("Visit Sheet"));
        assert_eq!(template.fields[0].id.as_deref(), Some("name"));
        assert_eq!(template.sections[0].questions[0].lines, 2);
        assert_eq!(template.slot_count(), 2);
    }

    #[test]
    fn test_template_defaults() {
        let template = Template::parse(
            r#"{ "fields": [{ "label": "Date" }], "sections": [{ "title": "Empty" }] }"#,
            "inline",
        )
        .unwrap();
        assert!(template.title.is_none());
        assert_eq!(template.fields[0].id, None);
        assert_eq!(template.fields[0].lines, 1);
        assert!(template.sections[0].questions.is_empty());
    }

    #[test]
    fn test_section_without_title_rejected() {
        let result = Template::parse(r#"{ "sections": [{ "questions": [] }] }"#, "inline");
        assert!(matches!(result, Err(SheetError::Json { .. })));
    }

    #[test]
    fn test_zero_lines_rejected() {
        let result = Template::parse(
            r#"{ "fields": [{ "id": "a", "label": "A", "lines": 0 }] }"#,
            "inline",
        );
        assert!(matches!(result, Err(SheetError::InvalidTemplate(_))));
    }

    #[test]
    fn test_record_answer_resolution() {
        let record = Record::parse(
            r#"{ "name": "Anna Kovács", "blank": "  ", "none": null, "age": 31, "ok": true, "list": [1] }"#,
            "inline",
        )
        .unwrap();

        assert_eq!(record.answer(Some("name")).unwrap().as_deref(), Some("Anna Kovács"));
        assert_eq!(record.answer(Some("blank")).unwrap(), None);
        assert_eq!(record.answer(Some("none")).unwrap(), None);
        assert_eq!(record.answer(Some("missing")).unwrap(), None);
        assert_eq!(record.answer(None).unwrap(), None);
        assert_eq!(record.answer(Some("age")).unwrap().as_deref(), Some("31"));
        assert_eq!(record.answer(Some("ok")).unwrap().as_deref(), Some("true"));
        assert!(matches!(
            record.answer(Some("list")),
            Err(SheetError::InvalidRecordValue { .. })
        ));
    }

    #[test]
    fn test_record_must_be_object() {
        assert!(Record::parse("[1, 2]", "inline").is_err());
        assert!(Record::parse("{ broken", "inline").is_err());
    }
}
