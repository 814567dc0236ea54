use std::borrow::Cow;

use axum::{
    extract::{Form, State},
    response::{Html, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::{
    export::{RootSelector, TreeExporter, empty_tree_document, scalar_document},
    web::{
        AppState, Xml, data,
        gate::{require_page, require_xml},
        models::console_index,
    },
};

use super::{console_page, types::SelectConsoleForm};

const BLANK_PAGE: &str = "about:blank";

/// Console shell: the menu tree on the left, the selected screen in a frame.
pub async fn main_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Response> {
    let session = require_page(&state, &jar, None).await?;

    let body = format!(
        r#"        <div class="shell">
            <section class="panel">
                <h2>Menu</h2>
                <div class="tree" data-tree-source="/mbadm/xml/main-tree" data-select-url="/mbadm/xml/select-console" data-select-target="console-frame"></div>
            </section>
            <iframe id="console-frame" name="console-frame" src="{BLANK_PAGE}" title="Console"></iframe>
        </div>"#
    );

    Ok(console_page(
        &state,
        &state.settings().portal_name,
        &session,
        Cow::Borrowed(""),
        body,
    ))
}

/// Menu tree limited to the entries the member's level may open.
pub async fn main_tree(State(state): State<AppState>, jar: CookieJar) -> Xml {
    let session = match require_xml(&state, &jar, None).await {
        Ok(session) => session,
        Err(denied) => return denied,
    };

    let entries = match data::fetch_console_entries(state.pool_ref()).await {
        Ok(entries) => entries,
        Err(err) => {
            error!(?err, "failed to load console menu");
            return Xml(empty_tree_document());
        }
    };

    let index = console_index(&entries);
    let roots = TreeExporter::new(&index)
        .visible_to(session.member_level)
        .build(RootSelector::Orphans);
    Xml::tree(roots, "main-tree")
}

pub async fn select_console(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SelectConsoleForm>,
) -> Xml {
    let session = match require_xml(&state, &jar, None).await {
        Ok(session) => session,
        Err(denied) => return denied,
    };

    let Some(id_console) = form.console_id() else {
        return Xml(scalar_document("consoleurl", BLANK_PAGE));
    };

    match data::fetch_console_entry(state.pool_ref(), id_console).await {
        Ok(Some(entry))
            if entry
                .min_level()
                .is_some_and(|min_level| session.member_level.satisfies(min_level)) =>
        {
            Xml(scalar_document("consoleurl", &entry.url))
        }
        Ok(Some(_)) => Xml::denied(),
        Ok(None) => Xml(scalar_document("consoleurl", BLANK_PAGE)),
        Err(err) => {
            error!(?err, id_console, "failed to load console entry");
            Xml(scalar_document("consoleurl", BLANK_PAGE))
        }
    }
}
