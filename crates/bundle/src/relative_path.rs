//! Lexical operations on `/`-separated relative paths.
//!
//! Archive paths and importer ids never touch the filesystem, so they are handled as
//! strings. `.` stands for the empty path.

const CURRENT: &str = ".";
const PARENT: &str = "..";

fn segments(path: &str) -> impl Iterator<Item = &'_ str> {
    path.split('/').filter(|segment| !segment.is_empty() && *segment != CURRENT)
}

fn from_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    let joined = segments.into_iter().collect::<Vec<_>>().join("/");
    if joined.is_empty() {
        CURRENT.to_string()
    } else {
        joined
    }
}

/// Resolve `.` and `..` segments.
///
/// Returns `None` when the path climbs above its starting point.
pub fn normalize(path: &str) -> Option<String> {
    let mut stack = Vec::new();
    for segment in segments(path) {
        if segment == PARENT {
            stack.pop()?;
        } else {
            stack.push(segment);
        }
    }
    Some(from_segments(stack))
}

/// Append `tail` to `base` without normalizing.
pub fn join(base: &str, tail: &str) -> String {
    from_segments(segments(base).chain(segments(tail)))
}

/// The path without its last segment.
pub fn parent(path: &str) -> String {
    let mut segments: Vec<_> = segments(path).collect();
    segments.pop();
    from_segments(segments)
}

/// Path that leads from the directory `from` to `to`.
///
/// Both paths must be normalized and relative to the same root.
pub fn relative(from: &str, to: &str) -> String {
    let from: Vec<_> = segments(from).collect();
    let to: Vec<_> = segments(to).collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    let ups = from.len() - common;
    from_segments(std::iter::repeat(PARENT).take(ups).chain(to[common..].iter().copied()))
}
