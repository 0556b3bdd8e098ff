//! Directory names of the virtual store.
//!
//! Every package installed in the virtual store lives in
//! `{virtual_store_dir}/{dep_path_to_filename(dep_path)}/node_modules/{name}`.
//! Workspace packages that are relocated into the bundle reuse the same scheme
//! with a `file:{importer_id}` dependency path.

/// Default value of `virtual-store-dir-max-length`.
pub const DEFAULT_MAX_LENGTH: usize = 120;

/// Length of `_{hash}` appended to names that had to be shortened.
const HASH_SUFFIX_LENGTH: usize = 27;

/// Characters that are illegal in file names on at least one common filesystem.
const UNSAFE_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Dependency path of a workspace package, distinct from any registry dependency path.
pub fn importer_dep_path(importer_id: &str) -> String {
    format!("file:{importer_id}")
}

/// Convert a dependency path into the name of its virtual store directory.
///
/// * `/{name}/{version}` becomes `{name}@{version}` with the scope slash escaped.
/// * `file:{path}` becomes `file+{path}` with every slash escaped.
/// * Names longer than `max_length`, and names with uppercase letters that are not
///   `file+` paths, are truncated and suffixed with a hash of the full name so that the
///   result stays unique and fits within `max_length`.
pub fn dep_path_to_filename(dep_path: &str, max_length: usize) -> String {
    let filename: String = dep_path_to_filename_unescaped(dep_path)
        .chars()
        .map(|char| if UNSAFE_CHARS.contains(&char) { '+' } else { char })
        .collect();

    let has_uppercase = filename != filename.to_lowercase();
    if filename.len() > max_length || (has_uppercase && !filename.starts_with("file+")) {
        let prefix = truncate(&filename, max_length.saturating_sub(HASH_SUFFIX_LENGTH));
        return format!("{prefix}_{hash}", hash = create_base32_hash(&filename));
    }

    filename
}

fn dep_path_to_filename_unescaped(dep_path: &str) -> String {
    if let Some(path) = dep_path.strip_prefix("file:") {
        return format!("file+{path}");
    }
    let dep_path = dep_path.strip_prefix('/').unwrap_or(dep_path);
    match dep_path.rsplit_once('/') {
        Some((name, version)) => format!("{name}@{version}"),
        None => dep_path.to_string(),
    }
}

/// Take at most `max_bytes` bytes of `text` without splitting a character.
fn truncate(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let end = (0..=max_bytes).rev().find(|index| text.is_char_boundary(*index)).unwrap_or(0);
    &text[..end]
}

/// Lowercase, unpadded RFC 4648 base32 of the MD5 digest of `text`.
fn create_base32_hash(text: &str) -> String {
    let digest = md5::compute(text.as_bytes());
    let mut output = String::with_capacity(26);
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for byte in digest.iter() {
        buffer = (buffer << 8) | u32::from(*byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            output.push(BASE32_ALPHABET[((buffer >> bits) & 0b11111) as usize] as char);
        }
    }
    if bits > 0 {
        output.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0b11111) as usize] as char);
    }
    output
}
