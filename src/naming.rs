//! Output file names derived from the customer and the generation time.
use chrono::NaiveDateTime;
use regex::Regex;
use std::path::Path;
use std::path::PathBuf;
use std::sync::LazyLock;

pub const FILE_PREFIX: &str = "提货单";
pub const FILE_EXTENSION: &str = "xlsx";

/// Used when a customer name sanitises to nothing.
const FALLBACK_NAME: &str = "客户";

/// Path separators, characters Windows rejects, and control characters.
static INVALID_CHARACTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|\x00-\x1F]"#).expect("Hardcode regex pattern"));

/// Makes a customer name safe as a file name component.
pub fn sanitize(name: &str) -> String {
    let sanitized = INVALID_CHARACTERS.replace_all(name, "_");
    let sanitized = sanitized.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if sanitized.is_empty() {
        FALLBACK_NAME.to_owned()
    } else {
        sanitized.to_owned()
    }
}

/// `提货单_<customer>_<YYYYmmddHHMMSSfff>.xlsx`
pub fn output_file_name(customer: &str, now: NaiveDateTime) -> String {
    format!(
        "{FILE_PREFIX}_{}_{}.{FILE_EXTENSION}",
        sanitize(customer),
        now.format("%Y%m%d%H%M%S%3f")
    )
}

/// A path under `directory` that no existing file occupies, adding `-1`, `-2`, …
/// before the extension on collision.
pub fn unique_output_path(directory: &Path, customer: &str, now: NaiveDateTime) -> PathBuf {
    let file_name = output_file_name(customer, now);
    let candidate = directory.join(&file_name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = file_name.trim_end_matches(&format!(".{FILE_EXTENSION}")).to_owned();
    (1usize..)
        .map(|suffix| directory.join(format!("{stem}-{suffix}.{FILE_EXTENSION}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(candidate)
}
