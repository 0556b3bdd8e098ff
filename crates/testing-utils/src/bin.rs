use assert_cmd::prelude::*;
use command_extra::CommandExtra;
use std::{path::Path, process::Command};

/// Command of the `pnbundle` binary, run from `current_dir`.
pub fn pnbundle_command(current_dir: &Path) -> Command {
    Command::cargo_bin("pnbundle").expect("find the pnbundle binary").with_current_dir(current_dir)
}
