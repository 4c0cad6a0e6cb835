//! User interaction operations (confirmation and selection prompts, notifications).

use anyhow::Result;

use super::RealRuntime;

use std::io::{self, BufRead, Write};

/// Core, testable implementation that reads from any BufRead and writes to any Write.
pub(crate) fn confirm_with_io<R: BufRead, W: Write>(
    prompt: &str,
    input: &mut R,
    output: &mut W,
) -> Result<bool> {
    write!(output, "{} [y/N] ", prompt)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let response = line.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}

/// Prints a numbered list and reads a 1-based choice.
/// Anything that is not a valid number (including an empty line) declines.
pub(crate) fn select_with_io<R: BufRead, W: Write>(
    prompt: &str,
    choices: &[String],
    input: &mut R,
    output: &mut W,
) -> Result<Option<usize>> {
    writeln!(output, "{}", prompt)?;
    for (i, choice) in choices.iter().enumerate() {
        writeln!(output, "  {}. {}", i + 1, choice)?;
    }
    write!(output, "Type a number (empty to cancel): ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let choice = match line.trim().parse::<usize>() {
        Ok(n) if n >= 1 && n <= choices.len() => Some(n - 1),
        _ => None,
    };
    Ok(choice)
}

impl RealRuntime {
    pub(crate) fn confirm_impl(&self, prompt: &str) -> Result<bool> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut stdin_lock = stdin.lock();
        confirm_with_io(prompt, &mut stdin_lock, &mut stdout)
    }

    pub(crate) fn select_impl(&self, prompt: &str, choices: &[String]) -> Result<Option<usize>> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut stdin_lock = stdin.lock();
        select_with_io(prompt, choices, &mut stdin_lock, &mut stdout)
    }

    pub(crate) fn notify_impl(&self, message: &str) {
        eprintln!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::{confirm_with_io, select_with_io};
    use anyhow::Result;
    use std::io::Cursor;

    fn choices() -> Vec<String> {
        vec!["html-ls".to_string(), "css-ls".to_string()]
    }

    #[test]
    fn confirms_yes_and_short_y() -> Result<()> {
        let cases = vec!["y\n", "Y\n", "yes\n", " YES \n", "  y  \n"];
        for case in cases {
            let mut input = Cursor::new(case.as_bytes());
            let mut output = Vec::new();
            let ok = confirm_with_io("Proceed?", &mut input, &mut output)?;
            assert!(ok, "expected '{}' to be accepted as yes", case);
            let out = String::from_utf8(output)?;
            assert!(out.contains("Proceed? [y/N]"));
        }
        Ok(())
    }

    #[test]
    fn rejects_no_and_empty() -> Result<()> {
        let cases = vec!["n\n", "no\n", "\n", "  \n", "other\n"];
        for case in cases {
            let mut input = Cursor::new(case.as_bytes());
            let mut output = Vec::new();
            let ok = confirm_with_io("Delete?", &mut input, &mut output)?;
            assert!(!ok, "expected '{}' to be rejected as no", case);
        }
        Ok(())
    }

    #[test]
    fn select_returns_zero_based_index() -> Result<()> {
        let mut input = Cursor::new(b"2\n");
        let mut output = Vec::new();
        let choice = select_with_io("Pick a server", &choices(), &mut input, &mut output)?;
        assert_eq!(choice, Some(1));

        let out = String::from_utf8(output)?;
        assert!(out.starts_with("Pick a server\n  1. html-ls\n  2. css-ls\n"));
        Ok(())
    }

    #[test]
    fn select_declines_on_empty_or_out_of_range() -> Result<()> {
        for case in ["\n", "0\n", "3\n", "css-ls\n"] {
            let mut input = Cursor::new(case.as_bytes());
            let mut output = Vec::new();
            let choice = select_with_io("Pick", &choices(), &mut input, &mut output)?;
            assert_eq!(choice, None, "expected '{}' to decline", case.trim());
        }
        Ok(())
    }
}
