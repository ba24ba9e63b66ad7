use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s").unwrap();
    static ref NOT_FILENAME_CHAR: Regex = Regex::new(r"[^-\w]").unwrap();
}

/// Turn a free-form name into a token usable as a file name.
/// Trims, turns each inner whitespace character into `_`, then drops anything that is not a
/// Unicode word character or `-`.
pub fn convert_to_filename(name: &str) -> String {
    let underscored = WHITESPACE.replace_all(name.trim(), "_");
    NOT_FILENAME_CHAR.replace_all(&underscored, "").into_owned()
}
