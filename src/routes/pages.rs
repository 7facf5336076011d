//! Server-rendered page shells.
//!
//! Each protected page is the shared layout with its title, the navigation
//! list, the signed-in user's label, and the JSON endpoint the page's script
//! loads records from. The guards have already run by the time a handler is
//! reached, so protected handlers read the settled session from the request
//! extensions.

use axum::Extension;
use axum::response::Html;

use crate::guard::{HOME_PATH, SIGN_IN_PATH};
use crate::session::SessionState;

const LAYOUT: &str = include_str!("../../templates/layout.html");
const AUTH_FORM: &str = include_str!("../../templates/auth_form.html");
const ERROR: &str = include_str!("../../templates/error.html");

const SIGN_UP_PATH: &str = "/sign-up";

/// One entry in the navigation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screen {
    pub path: &'static str,
    pub title: &'static str,
    /// JSON endpoint the page loads.
    pub endpoint: &'static str,
}

pub static SCREENS: [Screen; 10] = [
    Screen { path: HOME_PATH, title: "Dashboard", endpoint: "/api/reports/summary" },
    Screen { path: "/patients", title: "Patients", endpoint: "/api/patients" },
    Screen { path: "/physicians", title: "Physicians", endpoint: "/api/physicians" },
    Screen { path: "/appointments", title: "Appointments", endpoint: "/api/appointments" },
    Screen { path: "/admissions", title: "Admissions", endpoint: "/api/admissions?active=true" },
    Screen { path: "/exams", title: "Exams", endpoint: "/api/exams" },
    Screen { path: "/facilities", title: "Facilities", endpoint: "/api/facilities" },
    Screen { path: "/admins", title: "Admins", endpoint: "/api/admins" },
    Screen { path: "/reports", title: "Reports", endpoint: "/api/reports/occupancy" },
    Screen { path: "/account", title: "Account", endpoint: "/api/auth/session" },
];

/// Escape text for an HTML text node or a double-quoted attribute.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Substitute `{{key}}` placeholders. Values are inserted verbatim; callers
/// escape user-supplied text first.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_owned(), |out, (key, value)| out.replace(&format!("{{{{{key}}}}}"), value))
}

fn nav(active: &str) -> String {
    SCREENS
        .iter()
        .map(|screen| {
            let class = if screen.path == active { " class=\"active\"" } else { "" };
            format!("    <a href=\"{}\"{class}>{}</a>", screen.path, screen.title)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a protected screen for the settled session.
#[must_use]
pub fn render_screen(screen: &Screen, session: &SessionState) -> String {
    let user = session.user.as_ref().map_or("", |user| user.label());
    fill(
        LAYOUT,
        &[
            ("title", screen.title),
            ("nav", &nav(screen.path)),
            ("endpoint", screen.endpoint),
            // Last, so placeholder-like text in a user's name is left alone.
            ("user", &escape(user)),
        ],
    )
}

/// Inline page for a failed session check.
#[must_use]
pub fn render_error(message: &str) -> String {
    fill(ERROR, &[("message", &escape(message))])
}

fn render_auth_form(title: &str, endpoint: &str, alternate_path: &str, alternate_label: &str) -> String {
    fill(
        AUTH_FORM,
        &[
            ("title", title),
            ("endpoint", endpoint),
            ("alternate_path", alternate_path),
            ("alternate_label", alternate_label),
        ],
    )
}

fn screen(path: &str) -> &'static Screen {
    SCREENS.iter().find(|s| s.path == path).unwrap_or(&SCREENS[0])
}

// =============================================================================
// HANDLERS
// =============================================================================

pub async fn dashboard(Extension(session): Extension<SessionState>) -> Html<String> {
    Html(render_screen(screen(HOME_PATH), &session))
}

pub async fn patients(Extension(session): Extension<SessionState>) -> Html<String> {
    Html(render_screen(screen("/patients"), &session))
}

pub async fn physicians(Extension(session): Extension<SessionState>) -> Html<String> {
    Html(render_screen(screen("/physicians"), &session))
}

pub async fn appointments(Extension(session): Extension<SessionState>) -> Html<String> {
    Html(render_screen(screen("/appointments"), &session))
}

pub async fn admissions(Extension(session): Extension<SessionState>) -> Html<String> {
    Html(render_screen(screen("/admissions"), &session))
}

pub async fn exams(Extension(session): Extension<SessionState>) -> Html<String> {
    Html(render_screen(screen("/exams"), &session))
}

pub async fn facilities(Extension(session): Extension<SessionState>) -> Html<String> {
    Html(render_screen(screen("/facilities"), &session))
}

pub async fn admins(Extension(session): Extension<SessionState>) -> Html<String> {
    Html(render_screen(screen("/admins"), &session))
}

pub async fn reports(Extension(session): Extension<SessionState>) -> Html<String> {
    Html(render_screen(screen("/reports"), &session))
}

pub async fn account(Extension(session): Extension<SessionState>) -> Html<String> {
    Html(render_screen(screen("/account"), &session))
}

pub async fn sign_in() -> Html<String> {
    Html(render_auth_form("Sign in", "/api/auth/sign-in", SIGN_UP_PATH, "Create an account"))
}

pub async fn sign_up() -> Html<String> {
    Html(render_auth_form("Sign up", "/api/auth/sign-up", SIGN_IN_PATH, "Already have an account?"))
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
