use std::borrow::Cow;

use anyhow::Result;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use super::{finish_document, new_document};

/// Anything that can hand out a display value for a named column.
///
/// Missing columns and SQL `NULL`s both come back as `None` and render as empty cells.
pub trait Record {
    fn field(&self, column: &str) -> Option<Cow<'_, str>>;
}

#[cfg(test)]
impl Record for std::collections::HashMap<String, String> {
    fn field(&self, column: &str) -> Option<Cow<'_, str>> {
        self.get(column).map(|value| Cow::Borrowed(value.as_str()))
    }
}

/// How a row gets its `id` attribute.
#[derive(Debug, Clone, Copy)]
pub enum RowKey {
    /// Value of a column, usually the primary key.
    Column(&'static str),
    /// Zero-based position in the result, optionally prefixed (`channelLine0`, ...).
    Counter { prefix: &'static str },
}

/// Fixed column list for one grid.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub key: RowKey,
    pub columns: &'static [&'static str],
}

impl Projection {
    pub const fn keyed(key: &'static str, columns: &'static [&'static str]) -> Self {
        Self {
            key: RowKey::Column(key),
            columns,
        }
    }

    pub const fn counted(prefix: &'static str, columns: &'static [&'static str]) -> Self {
        Self {
            key: RowKey::Counter { prefix },
            columns,
        }
    }

    fn row_id<R: Record + ?Sized>(&self, index: usize, record: &R) -> String {
        match self.key {
            RowKey::Column(column) => record
                .field(column)
                .map(Cow::into_owned)
                .unwrap_or_else(|| index.to_string()),
            RowKey::Counter { prefix } => format!("{prefix}{index}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: String,
    pub cells: Vec<String>,
}

impl Row {
    pub fn new(id: impl Into<String>, cells: Vec<String>) -> Self {
        Self {
            id: id.into(),
            cells,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSet {
    rows: Vec<Row>,
}

impl RowSet {
    pub fn project<'r, R, I>(records: I, projection: &Projection) -> Self
    where
        R: Record + ?Sized + 'r,
        I: IntoIterator<Item = &'r R>,
    {
        let rows = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let cells = projection
                    .columns
                    .iter()
                    .map(|column| {
                        record
                            .field(column)
                            .map(Cow::into_owned)
                            .unwrap_or_default()
                    })
                    .collect();
                Row::new(projection.row_id(index, record), cells)
            })
            .collect();

        Self { rows }
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut writer = new_document()?;
        writer.write_event(Event::Start(BytesStart::new("rows")))?;

        for row in &self.rows {
            writer.write_event(Event::Start(
                BytesStart::new("row").with_attributes([("id", row.id.as_str())]),
            ))?;
            for cell in &row.cells {
                writer.write_event(Event::Start(BytesStart::new("cell")))?;
                writer.write_event(Event::Text(BytesText::new(cell)))?;
                writer.write_event(Event::End(BytesEnd::new("cell")))?;
            }
            writer.write_event(Event::End(BytesEnd::new("row")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("rows")))?;
        Ok(finish_document(writer))
    }

    /// Like [`RowSet::to_xml`] but falls back to an empty `rows` document.
    pub fn into_document(self) -> String {
        self.to_xml().unwrap_or_else(|err| {
            tracing::error!(?err, "failed to serialize rows document");
            empty_rows_document()
        })
    }
}

impl FromIterator<Row> for RowSet {
    fn from_iter<T: IntoIterator<Item = Row>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

pub fn empty_rows_document() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?><rows></rows>"#.to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use quick_xml::{Reader, events::Event};

    use super::*;

    fn record(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn cell_texts(xml: &str) -> Vec<String> {
        let mut reader = Reader::from_str(xml);
        let mut inside_cell = false;
        let mut cells = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.name().as_ref() == b"cell" => {
                    inside_cell = true;
                    cells.push(String::new());
                }
                Event::End(e) if e.name().as_ref() == b"cell" => inside_cell = false,
                Event::Text(t) if inside_cell => {
                    let text = t.unescape().unwrap().into_owned();
                    cells.last_mut().unwrap().push_str(&text);
                }
                Event::Eof => break,
                _ => {}
            }
        }
        cells
    }

    const NAME_ONLY: Projection = Projection::keyed("id", &["name"]);

    #[test]
    fn empty_result_keeps_root() {
        let records: Vec<HashMap<String, String>> = Vec::new();
        let set = RowSet::project(&records, &NAME_ONLY);
        assert!(set.rows.is_empty());
        let xml = set.to_xml().unwrap();
        assert_eq!(xml, empty_rows_document());
    }

    #[test]
    fn escapes_markup_in_cells() {
        let records = vec![
            record(&[("id", "5"), ("name", "a&b")]),
            record(&[("id", "6"), ("name", "<c>")]),
        ];
        let xml = RowSet::project(&records, &NAME_ONLY).to_xml().unwrap();
        assert!(xml.contains(r#"<row id="5"><cell>a&amp;b</cell></row>"#));
        assert!(xml.contains(r#"<row id="6"><cell>&lt;c&gt;</cell></row>"#));
    }

    #[test]
    fn cell_text_survives_round_trip_through_parser() {
        let nasty = [
            r#"He said "hi" & left"#,
            "</cell></row><row id=\"x\">",
            "a&amp;b",
            "plain",
            "l'apostrophe",
        ];
        let records: Vec<_> = nasty
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let id = i.to_string();
                record(&[("id", id.as_str()), ("name", *name)])
            })
            .collect();
        let xml = RowSet::project(&records, &NAME_ONLY).to_xml().unwrap();

        let body = xml.split_once("?>").unwrap().1;
        for raw_cell in body.split("<cell>").skip(1) {
            let raw = raw_cell.split("</cell>").next().unwrap();
            assert!(!raw.contains(['<', '>', '"']), "unescaped markup in {raw}");
            for (at, _) in raw.match_indices('&') {
                assert!(
                    ["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"]
                        .iter()
                        .any(|entity| raw[at..].starts_with(entity)),
                    "bare ampersand in {raw}"
                );
            }
        }
        assert_eq!(cell_texts(&xml), nasty.map(str::to_string).to_vec());
    }

    #[test]
    fn cells_follow_projection_order() {
        const GRID: Projection = Projection::counted("userChan", &["nick", "level", "missing"]);
        let records = vec![
            record(&[("level", "500"), ("nick", "teuk")]),
            record(&[("nick", "bob"), ("level", "10")]),
        ];
        let set = RowSet::project(&records, &GRID);
        assert_eq!(
            set.rows,
            [
                Row::new("userChan0", vec!["teuk".into(), "500".into(), String::new()]),
                Row::new("userChan1", vec!["bob".into(), "10".into(), String::new()]),
            ]
        );
    }

    #[test]
    fn missing_key_column_falls_back_to_position() {
        let records = vec![record(&[("name", "x")])];
        let set = RowSet::project(&records, &NAME_ONLY);
        assert_eq!(set.rows[0].id, "0");
    }
}
