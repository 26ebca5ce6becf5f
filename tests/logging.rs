use opguard::logging::parse_level_str;
use tracing::Level;

#[test]
fn parses_level_names_case_insensitively() {
    assert_eq!(parse_level_str("debug"), Some(Level::DEBUG));
    assert_eq!(parse_level_str("  WARN "), Some(Level::WARN));
    assert_eq!(parse_level_str("warning"), Some(Level::WARN));
    assert_eq!(parse_level_str("Trace"), Some(Level::TRACE));
}

#[test]
fn rejects_unknown_levels() {
    assert_eq!(parse_level_str("verbose"), None);
    assert_eq!(parse_level_str(""), None);
}
