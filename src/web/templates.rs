use std::borrow::Cow;

use chrono::{Datelike, Utc};

use crate::access::Session;

const CONSOLE_BASE_STYLES: &str = r#"
        :root { color-scheme: light; }
        body { font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; background: #f8fafc; color: #0f172a; }
        header { background: #ffffff; padding: 1.5rem; border-bottom: 1px solid #e2e8f0; }
        .header-bar { display: flex; justify-content: space-between; align-items: center; flex-wrap: wrap; gap: 1rem; }
        .header-bar h1 { margin: 0; font-size: 1.5rem; }
        .member { color: #475569; font-size: 0.95rem; }
        .member form { display: inline; }
        .member button { padding: 0.4rem 0.85rem; border: 1px solid #fecaca; border-radius: 999px; background: #fee2e2; color: #0f172a; font-weight: 600; cursor: pointer; }
        main { padding: 1.5rem; max-width: 1200px; margin: 0 auto; box-sizing: border-box; }
        section { margin-bottom: 2rem; }
        .panel { background: #ffffff; border-radius: 12px; border: 1px solid #e2e8f0; padding: 1.25rem; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.08); }
        .panel h2 { margin-top: 0; font-size: 1.15rem; }
        table { width: 100%; border-collapse: collapse; background: #ffffff; }
        th, td { padding: 0.55rem 0.75rem; border-bottom: 1px solid #e2e8f0; text-align: left; font-size: 0.92rem; vertical-align: top; }
        th { background: #f1f5f9; font-weight: 600; }
        .tree ul { list-style: none; margin: 0; padding-left: 1.1rem; }
        .tree > ul { padding-left: 0; }
        .tree li { margin: 0.25rem 0; }
        .tree a { color: #1d4ed8; text-decoration: none; cursor: pointer; }
        .tree a.selected { font-weight: 700; }
        .shell { display: grid; grid-template-columns: 260px 1fr; gap: 1.5rem; }
        .shell iframe { width: 100%; min-height: 75vh; border: 1px solid #e2e8f0; border-radius: 12px; background: #ffffff; }
        dl.facts { display: grid; grid-template-columns: max-content 1fr; gap: 0.4rem 1rem; margin: 0; }
        dl.facts dt { font-weight: 600; }
        dl.facts dd { margin: 0; font-family: monospace; }
        .note { color: #475569; font-size: 0.95rem; line-height: 1.6; }
        .app-footer { margin-top: 3rem; text-align: center; font-size: 0.85rem; color: #94a3b8; }
        @media (max-width: 768px) {
            .shell { grid-template-columns: 1fr; }
            th, td { padding: 0.4rem; }
        }
"#;

/// Fills every `data-grid-source` table and `data-tree-source` list from its XML endpoint.
const WIDGET_SCRIPT: &str = r#"
<script>
(function () {
    function load(url, options) {
        return fetch(url, Object.assign({ credentials: "same-origin" }, options || {}))
            .then(function (response) { return response.text(); })
            .then(function (text) {
                var doc = new DOMParser().parseFromString(text, "text/xml");
                var auth = doc.querySelector("authentication");
                if (auth && auth.textContent === "0") {
                    window.top.location.href = "/mbadm";
                    return null;
                }
                return doc;
            });
    }

    function fillGrid(table) {
        var body = table.querySelector("tbody");
        load(table.dataset.gridSource).then(function (doc) {
            if (!doc) { return; }
            body.innerHTML = "";
            doc.querySelectorAll("rows > row").forEach(function (row) {
                var tr = document.createElement("tr");
                tr.dataset.rowId = row.getAttribute("id");
                row.querySelectorAll("cell").forEach(function (cell) {
                    var td = document.createElement("td");
                    td.textContent = cell.textContent;
                    tr.appendChild(td);
                });
                body.appendChild(tr);
            });
            var link = table.dataset.rowLink;
            if (link) {
                body.querySelectorAll("tr").forEach(function (tr) {
                    tr.style.cursor = "pointer";
                    tr.addEventListener("click", function () {
                        window.location.href = link + encodeURIComponent(tr.dataset.rowId);
                    });
                });
            }
        });
    }

    function buildItems(parent, items, container) {
        var list = document.createElement("ul");
        items.forEach(function (item) {
            var li = document.createElement("li");
            var anchor = document.createElement("a");
            anchor.textContent = item.getAttribute("text");
            anchor.dataset.itemId = item.getAttribute("id");
            if (item.getAttribute("select") === "1") { anchor.classList.add("selected"); }
            anchor.addEventListener("click", function () { selectItem(container, anchor); });
            li.appendChild(anchor);
            var children = Array.prototype.filter.call(item.children, function (child) {
                return child.tagName === "item";
            });
            if (children.length) { buildItems(li, children, container); }
            list.appendChild(li);
        });
        parent.appendChild(list);
    }

    function selectItem(container, anchor) {
        container.querySelectorAll("a.selected").forEach(function (a) { a.classList.remove("selected"); });
        anchor.classList.add("selected");
        var selectUrl = container.dataset.selectUrl;
        var target = container.dataset.selectTarget;
        if (!selectUrl || !target) { return; }
        var body = new URLSearchParams({ id_console: anchor.dataset.itemId });
        load(selectUrl, { method: "POST", body: body }).then(function (doc) {
            var url = doc && doc.querySelector("consoleurl");
            if (url && url.textContent) {
                document.getElementById(target).src = url.textContent;
            }
        });
    }

    function fillTree(container) {
        load(container.dataset.treeSource).then(function (doc) {
            if (!doc) { return; }
            container.innerHTML = "";
            var roots = Array.prototype.filter.call(doc.documentElement.children, function (child) {
                return child.tagName === "item";
            });
            buildItems(container, roots, container);
            var first = container.querySelector("a.selected");
            if (first) { selectItem(container, first); }
        });
    }

    document.querySelectorAll("table[data-grid-source]").forEach(fillGrid);
    document.querySelectorAll("[data-tree-source]").forEach(fillTree);
    document.querySelectorAll("[data-scalar-source]").forEach(function (node) {
        load(node.dataset.scalarSource).then(function (doc) {
            if (doc && doc.documentElement) { node.textContent = doc.documentElement.textContent; }
        });
    });
})();
</script>
"#;

pub struct ConsolePage<'a> {
    pub portal_name: &'a str,
    pub title: &'a str,
    pub member: Option<&'a Session>,
    pub note_html: Cow<'a, str>,
    pub body_html: Cow<'a, str>,
}

pub fn render_console_page(page: ConsolePage<'_>) -> String {
    let ConsolePage {
        portal_name,
        title,
        member,
        note_html,
        body_html,
    } = page;

    let member_html = member
        .map(|session| {
            format!(
                r#"<div class="member">{login} ({level}) <form method="post" action="/mbadm/logout"><button type="submit">Déconnexion</button></form></div>"#,
                login = escape_html(&session.member_login),
                level = escape_html(&session.member_level_description),
            )
        })
        .unwrap_or_default();
    let note_html = if note_html.is_empty() {
        String::new()
    } else {
        format!(r#"<p class="note">{note_html}</p>"#)
    };
    let footer = render_footer(portal_name);
    let portal_name = escape_html(portal_name);
    let title = escape_html(title);

    format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
    <meta charset="UTF-8">
    <title>{portal_name} - {title}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    <style>
{styles}
    </style>
</head>
<body>
    <header>
        <div class="header-bar">
            <h1>{title}</h1>
            {member_html}
        </div>
        {note_html}
    </header>
    <main>
{body_html}
        {footer}
    </main>
{scripts}
</body>
</html>"#,
        styles = CONSOLE_BASE_STYLES,
        scripts = WIDGET_SCRIPT,
    )
}

/// A grid widget loading its rows from `source`.
pub fn grid_panel(heading: &str, source: &str, columns: &[&str]) -> String {
    grid_panel_linked(heading, source, columns, None)
}

/// Same as [`grid_panel`], each row opening `row_link` followed by the row id.
pub fn grid_panel_linked(
    heading: &str,
    source: &str,
    columns: &[&str],
    row_link: Option<&str>,
) -> String {
    let headers = columns
        .iter()
        .map(|column| format!("<th>{}</th>", escape_html(column)))
        .collect::<String>();
    let link_attr = row_link
        .map(|link| format!(r#" data-row-link="{}""#, escape_html(link)))
        .unwrap_or_default();
    format!(
        r#"        <section class="panel">
            <h2>{heading}</h2>
            <table data-grid-source="{source}"{link_attr}>
                <thead><tr>{headers}</tr></thead>
                <tbody></tbody>
            </table>
        </section>"#,
        heading = escape_html(heading),
        source = escape_html(source),
    )
}

pub fn tree_panel(heading: &str, source: &str) -> String {
    format!(
        r#"        <section class="panel">
            <h2>{heading}</h2>
            <div class="tree" data-tree-source="{source}"></div>
        </section>"#,
        heading = escape_html(heading),
        source = escape_html(source),
    )
}

pub fn facts_panel(heading: &str, facts: &[(&str, String)]) -> String {
    let items = facts
        .iter()
        .map(|(name, value)| {
            format!(
                "<dt>{}</dt><dd>{}</dd>",
                escape_html(name),
                escape_html(value)
            )
        })
        .collect::<String>();
    format!(
        r#"        <section class="panel">
            <h2>{heading}</h2>
            <dl class="facts">{items}</dl>
        </section>"#,
        heading = escape_html(heading),
    )
}

pub fn render_login_page(portal_name: &str, error: Option<&str>) -> String {
    let footer = render_footer(portal_name);
    let portal_name = escape_html(portal_name);
    let error_html = error
        .map(|message| format!(r#"<p class="error">{}</p>"#, escape_html(message)))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
    <meta charset="UTF-8">
    <title>{portal_name} - Administration</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    <style>
        :root {{ color-scheme: light; }}
        body {{ font-family: "Helvetica Neue", Arial, sans-serif; display: flex; flex-direction: column; align-items: center; justify-content: center; min-height: 100vh; margin: 0; background: #f1f5f9; color: #0f172a; padding: 1.5rem; box-sizing: border-box; gap: 1.5rem; }}
        main {{ width: 100%; max-width: 420px; display: flex; flex-direction: column; align-items: center; gap: 1.5rem; }}
        .panel {{ background: #ffffff; padding: 2.25rem 2rem; border-radius: 18px; box-shadow: 0 20px 60px rgba(15, 23, 42, 0.08); width: 100%; border: 1px solid #e2e8f0; box-sizing: border-box; }}
        h1 {{ margin: 0 0 1rem; font-size: 1.6rem; text-align: center; }}
        label {{ display: block; margin-top: 1.2rem; font-weight: 600; }}
        input {{ width: 100%; padding: 0.85rem; margin-top: 0.65rem; border-radius: 10px; border: 1px solid #cbd5f5; background: #f8fafc; font-size: 1rem; box-sizing: border-box; }}
        button {{ margin-top: 2rem; width: 100%; padding: 0.95rem; border: none; border-radius: 10px; background: #2563eb; color: #ffffff; font-weight: 600; font-size: 1.05rem; cursor: pointer; }}
        button:hover {{ background: #1d4ed8; }}
        .error {{ color: #b91c1c; text-align: center; }}
        .app-footer {{ margin-top: 2.5rem; text-align: center; font-size: 0.85rem; color: #64748b; }}
    </style>
</head>
<body>
    <main>
        <section class="panel">
            <h1>{portal_name}</h1>
            {error_html}
            <form method="post" action="/mbadm/login">
                <label for="login">Identifiant</label>
                <input id="login" name="login" autocomplete="username" required>
                <label for="credential">Mot de passe</label>
                <input id="credential" type="password" name="credential" autocomplete="current-password" required>
                <button type="submit">Connexion</button>
            </form>
        </section>
        {footer}
    </main>
</body>
</html>"#,
    )
}

pub fn render_denied_page(portal_name: &str, member: Option<&Session>) -> String {
    render_console_page(ConsolePage {
        portal_name,
        title: "Accès refusé",
        member,
        note_html: Cow::Borrowed(""),
        body_html: Cow::Borrowed(
            r#"        <section class="panel"><p>Votre niveau ne permet pas d'afficher cette page.</p><p><a href="/mbadm/main">Retour à la console</a></p></section>"#,
        ),
    })
}

pub fn render_footer(portal_name: &str) -> String {
    let current_year = Utc::now().year();
    format!(
        r#"<footer class="app-footer">© {year} {portal_name}</footer>"#,
        year = current_year,
        portal_name = escape_html(portal_name),
    )
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Level;

    #[test]
    fn grid_panel_declares_source_and_headers() {
        let html = grid_panel("Utilisateurs", "/mbadm/xml/app-users", &["Id", "Nick & co"]);
        assert!(html.contains(r#"data-grid-source="/mbadm/xml/app-users""#));
        assert!(html.contains("<th>Nick &amp; co</th>"));
    }

    #[test]
    fn member_names_are_escaped_in_layout() {
        let session = Session {
            member_id: 1,
            member_login: "<b>teuk</b>".to_string(),
            member_level: Level::Owner,
            member_level_description: "Owner".to_string(),
        };
        let html = render_denied_page("Mediabot", Some(&session));
        assert!(html.contains("&lt;b&gt;teuk&lt;/b&gt;"));
        assert!(!html.contains("<b>teuk</b>"));
    }

    #[test]
    fn login_page_posts_login_and_credential() {
        let html = render_login_page("Mediabot", Some("Identifiants invalides"));
        assert!(html.contains(r#"name="login""#));
        assert!(html.contains(r#"name="credential""#));
        assert!(html.contains("Identifiants invalides"));
    }
}
