use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::export::{
    ExportError, Projection, Record, RowSet, TreeNode, denied_document, empty_rows_document,
    empty_tree_document, tree_document, unauthenticated_document,
};

/// XML document answered to the grid and tree widgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xml(pub String);

impl Xml {
    pub fn unauthenticated() -> Self {
        Self(unauthenticated_document())
    }

    pub fn denied() -> Self {
        Self(denied_document())
    }

    pub fn empty_rows() -> Self {
        Self(empty_rows_document())
    }

    pub fn rows<R: Record>(records: &[R], projection: &Projection) -> Self {
        Self(RowSet::project(records, projection).into_document())
    }

    /// Grid answer for a store query; failures are logged and become an empty grid.
    pub fn from_query<R: Record>(
        result: sqlx::Result<Vec<R>>,
        projection: &Projection,
        source: &'static str,
    ) -> Self {
        match result {
            Ok(records) => Self::rows(&records, projection),
            Err(err) => {
                error!(?err, source, "grid query failed");
                Self::empty_rows()
            }
        }
    }

    /// Tree answer; a malformed hierarchy is logged and becomes an empty tree.
    pub fn tree(result: Result<Vec<TreeNode>, ExportError>, source: &'static str) -> Self {
        let document = result
            .map_err(anyhow::Error::from)
            .and_then(|roots| tree_document(&roots));
        match document {
            Ok(document) => Self(document),
            Err(err) => {
                error!(?err, source, "tree export failed");
                Self(empty_tree_document())
            }
        }
    }
}

impl IntoResponse for Xml {
    fn into_response(self) -> Response {
        (
            [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
            self.0,
        )
            .into_response()
    }
}
