//! Blocking stdin implementation of the cleanup confirmation prompt.

use std::io::{BufRead, Write};

use cygmir_core::garbage::Confirm;

/// Lists the purge candidates and asks for an explicit `yes` on stdin.
/// Anything else (including EOF or a read error) declines.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, candidates: &[String]) -> bool {
        println!("\nThe following files are outdated:");
        for candidate in candidates {
            println!("  {candidate}");
        }
        print!("Delete outdated files [yes/NO]: ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return false;
        }
        line.trim().eq_ignore_ascii_case("yes")
    }
}
