/// Bit mask to filter executable bits (`--x--x--x`).
pub const EXEC_MASK: u32 = 0b001_001_001;

/// All can read and execute, but only owner can write (`rwxr-xr-x`).
pub const EXEC_MODE: u32 = 0b111_101_101;

/// All can read, but only owner can write (`rw-r--r--`).
pub const FILE_MODE: u32 = 0b110_100_100;

/// Mode of symbolic links (`rwxrwxrwx`).
pub const SYMLINK_MODE: u32 = 0b111_111_111;

/// Whether a file mode has any executable bit.
pub fn is_executable(mode: u32) -> bool {
    mode & EXEC_MASK != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn modes_match_octal() {
        assert_eq!(EXEC_MODE, 0o755);
        assert_eq!(FILE_MODE, 0o644);
        assert_eq!(SYMLINK_MODE, 0o777);
    }

    #[test]
    fn executable_bits() {
        macro_rules! case {
            ($mode:expr => $output:expr) => {{
                let mode = $mode;
                eprintln!("CASE: {mode:o}");
                assert_eq!(is_executable(mode), $output);
            }};
        }

        case!(0o755 => true);
        case!(0o744 => true);
        case!(0o100 => true);
        case!(0o644 => false);
        case!(0o600 => false);
    }
}
