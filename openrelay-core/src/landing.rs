//! Landing page served at `/`.

const TEMPLATE: &str = include_str!("../assets/index.html");

/// Returns the landing page with the version filled in.
pub fn landing_page(version: &str) -> String {
    TEMPLATE.replace("{{VERSION}}", version)
}
