//! Fixed text formats recognised by the scalar kinds

use std::sync::OnceLock;

use regex::Regex;

macro_rules! static_pattern {
    ($name:ident, $pattern:expr) => {
        pub fn $name() -> &'static Regex {
            static CELL: OnceLock<Regex> = OnceLock::new();
            CELL.get_or_init(|| Regex::new($pattern).expect("static pattern compiles"))
        }
    };
}

static_pattern!(date, r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$");
static_pattern!(
    datetime,
    r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}(:[0-9]{2}(\.[0-9]{6})?)?$"
);
static_pattern!(time, r"^[0-9]{2}:[0-9]{2}(:[0-9]{2}(\.[0-9]{6})?)?$");
static_pattern!(int_text, r"^[0-9]+$");
static_pattern!(float_text, r"^[0-9]+(\.[0-9]+)?$");
static_pattern!(email, r"^[^@]+@[^@]+\.[^@]+$");
static_pattern!(uri_web, r"^https?://(?:[\w\-_]+\.)(?:\.?\w{2,})+([?/].*)?$");
static_pattern!(uri_tel, r"^tel:\+[0-9]+$");
static_pattern!(uri_email, r"^mailto:[^@]+@[^@]+\.[^@]+$");
static_pattern!(phone, r"^\+[0-9]+$");
static_pattern!(
    ipv4,
    r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$"
);
static_pattern!(relative_bound, r"^([+-][0-9]+)([smhdw])$");

/// Returns true if `code` is a non-empty run of ASCII digits
pub fn is_dial_code(code: &str) -> bool {
    !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit())
}
