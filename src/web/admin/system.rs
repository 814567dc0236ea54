use std::borrow::Cow;

use axum::{
    extract::State,
    response::{Html, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::{
    access::Level,
    diagnostics::NOT_AVAILABLE,
    export::{RootSelector, TreeExporter, empty_tree_document},
    system::{account_rows, process_index, process_root, process_rows, summary_rows},
    web::{
        AppState, Xml,
        gate::{require_page, require_xml},
        templates::{facts_panel, grid_panel, tree_panel},
    },
};

use super::console_page;

pub async fn system_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Response> {
    let session = require_page(&state, &jar, Some(Level::Master)).await?;

    let inspector = state.inspector();
    let (kernel, hostname, runlevel) =
        tokio::join!(inspector.kernel(), inspector.hostname(), inspector.runlevel());
    let or_placeholder = |value: Option<String>| value.unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let body = [
        facts_panel(
            "Machine",
            &[
                ("Hostname", or_placeholder(hostname)),
                ("Kernel", or_placeholder(kernel)),
                ("Runlevel", or_placeholder(runlevel)),
            ],
        ),
        grid_panel("Système", "/mbadm/xml/system-info", &["Information", "Valeur"]),
        grid_panel(
            "Processus",
            "/mbadm/xml/processes",
            &["UID", "PID", "PPID", "CMD", "STIME", "TTY", "TIME"],
        ),
        tree_panel("Arbre des processus", "/mbadm/xml/process-tree"),
    ]
    .join("\n");

    Ok(console_page(
        &state,
        "Système",
        &session,
        Cow::Borrowed(""),
        body,
    ))
}

pub async fn system_info(State(state): State<AppState>, jar: CookieJar) -> Xml {
    if let Err(denied) = require_xml(&state, &jar, Some(Level::Master)).await {
        return denied;
    }

    let summary = state.inspector().summary().await;
    Xml(summary_rows(&summary).into_document())
}

pub async fn processes(State(state): State<AppState>, jar: CookieJar) -> Xml {
    if let Err(denied) = require_xml(&state, &jar, Some(Level::Master)).await {
        return denied;
    }

    match state.inspector().processes().await {
        Ok(processes) => Xml(process_rows(&processes).into_document()),
        Err(err) => {
            error!(?err, "failed to list processes");
            Xml::empty_rows()
        }
    }
}

pub async fn process_tree(State(state): State<AppState>, jar: CookieJar) -> Xml {
    if let Err(denied) = require_xml(&state, &jar, Some(Level::Master)).await {
        return denied;
    }

    let processes = match state.inspector().processes().await {
        Ok(processes) => processes,
        Err(err) => {
            error!(?err, "failed to list processes");
            return Xml(empty_tree_document());
        }
    };

    let index = process_index(&processes);
    let roots = TreeExporter::new(&index).build(RootSelector::Node(process_root(&processes)));
    Xml::tree(roots, "process-tree")
}

pub async fn system_users_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Response> {
    let session = require_page(&state, &jar, Some(Level::Master)).await?;

    let body = grid_panel(
        "Comptes système",
        "/mbadm/xml/system-users",
        &["Nom", "UID", "GID", "Commentaire", "Home", "Shell"],
    );

    Ok(console_page(
        &state,
        "Utilisateurs système",
        &session,
        Cow::Borrowed(""),
        body,
    ))
}

pub async fn system_users(State(state): State<AppState>, jar: CookieJar) -> Xml {
    if let Err(denied) = require_xml(&state, &jar, Some(Level::Master)).await {
        return denied;
    }

    match state.inspector().accounts().await {
        Ok(accounts) => Xml(account_rows(&accounts).into_document()),
        Err(err) => {
            error!(?err, "failed to read system accounts");
            Xml::empty_rows()
        }
    }
}
