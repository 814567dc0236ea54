//! XML documents consumed by the grid and tree widgets.
//!
//! Everything leaving the console as XML is written through `quick_xml::Writer`,
//! so text and attribute values are always escaped.

mod rows;
mod tree;

pub use rows::{Projection, Record, Row, RowSet, empty_rows_document};
pub use tree::{
    AdjacencyIndex, RootSelector, TreeEntry, TreeExporter, TreeNode, empty_tree_document,
    tree_document,
};

use anyhow::Result;
use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error("node {id} is its own ancestor")]
    Cycle { id: String },
    #[error("hierarchy deeper than {limit} levels below node {id}")]
    TooDeep { id: String, limit: usize },
}

pub(crate) fn new_document() -> Result<Writer<Vec<u8>>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    Ok(writer)
}

pub(crate) fn finish_document(writer: Writer<Vec<u8>>) -> String {
    // quick-xml only ever writes the UTF-8 we hand it.
    String::from_utf8_lossy(&writer.into_inner()).into_owned()
}

/// `<?xml ...?><name>value</name>` documents used for single-value answers.
pub fn scalar_document(name: &str, value: &str) -> String {
    let build = || -> Result<String> {
        let mut writer = new_document()?;
        writer.write_event(Event::Start(BytesStart::new(name)))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(finish_document(writer))
    };
    build().unwrap_or_else(|_| format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?><{name}/>"))
}

/// Sentinel answered to data requests without a valid session.
pub fn unauthenticated_document() -> String {
    scalar_document("authentication", "0")
}

/// Sentinel answered to data requests above the member's level.
pub fn denied_document() -> String {
    scalar_document("null", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_match_widget_expectations() {
        assert_eq!(
            unauthenticated_document(),
            r#"<?xml version="1.0" encoding="UTF-8"?><authentication>0</authentication>"#
        );
        assert_eq!(
            denied_document(),
            r#"<?xml version="1.0" encoding="UTF-8"?><null></null>"#
        );
    }

    #[test]
    fn scalar_values_are_escaped() {
        let doc = scalar_document("consoleurl", "users?a=1&b=<2>");
        assert!(doc.ends_with("<consoleurl>users?a=1&amp;b=&lt;2&gt;</consoleurl>"));
    }
}
