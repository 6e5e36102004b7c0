//! Operator interaction (confirmation and choice prompts).

use anyhow::{Result, bail};

use std::io::{self, BufRead, Write};

/// Capability for asking the operator questions.
///
/// Headless callers and tests supply canned answers through their own
/// implementation instead of reading the terminal.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter: Send + Sync {
    /// Yes/no question; an empty answer means yes.
    fn confirm(&self, prompt: &str) -> Result<bool>;

    /// Pick one of `options` by its first letter.
    fn choose(&self, prompt: &str, options: &[char]) -> Result<char>;
}

/// Reads answers from stdin, writing prompts to stdout and complaints to stderr.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        let stdin = io::stdin();
        let mut stdin_lock = stdin.lock();
        confirm_with_io(prompt, &mut stdin_lock, &mut io::stdout(), &mut io::stderr())
    }

    fn choose(&self, prompt: &str, options: &[char]) -> Result<char> {
        let stdin = io::stdin();
        let mut stdin_lock = stdin.lock();
        choose_with_io(
            prompt,
            options,
            &mut stdin_lock,
            &mut io::stdout(),
            &mut io::stderr(),
        )
    }
}

/// Answers every confirmation with yes; choices still go to the inner prompter.
pub struct AutoConfirm<P: Prompter>(pub P);

impl<P: Prompter> Prompter for AutoConfirm<P> {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        log::info!("Assuming yes for: {}", prompt);
        Ok(true)
    }

    fn choose(&self, prompt: &str, options: &[char]) -> Result<char> {
        self.0.choose(prompt, options)
    }
}

impl<P: Prompter + ?Sized> Prompter for Box<P> {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        (**self).confirm(prompt)
    }

    fn choose(&self, prompt: &str, options: &[char]) -> Result<char> {
        (**self).choose(prompt, options)
    }
}

fn read_answer<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("Input closed before an answer was given");
    }
    Ok(line.trim().to_lowercase())
}

/// Asks until the answer is recognized: empty or `y...` is yes, `n`/`no` is no.
pub(crate) fn confirm_with_io<R: BufRead, W: Write, E: Write>(
    prompt: &str,
    input: &mut R,
    output: &mut W,
    errors: &mut E,
) -> Result<bool> {
    loop {
        write!(output, "{} [Y/n] ", prompt)?;
        output.flush()?;

        let answer = read_answer(input)?;
        if answer.is_empty() || answer.starts_with('y') {
            return Ok(true);
        }
        if answer == "n" || answer == "no" {
            return Ok(false);
        }
        writeln!(errors, "Invalid answer '{}'. Please enter 'Y' or 'n'.", answer)?;
    }
}

/// Asks until the first letter of the answer is one of `options`.
pub(crate) fn choose_with_io<R: BufRead, W: Write, E: Write>(
    prompt: &str,
    options: &[char],
    input: &mut R,
    output: &mut W,
    errors: &mut E,
) -> Result<char> {
    let keys: Vec<String> = options.iter().map(|c| c.to_string()).collect();
    let keys = keys.join("/");

    loop {
        write!(output, "{} ({}) ", prompt, keys)?;
        output.flush()?;

        let answer = read_answer(input)?;
        if let Some(first) = answer.chars().next()
            && let Some(choice) = options.iter().find(|o| o.to_ascii_lowercase() == first)
        {
            return Ok(*choice);
        }
        writeln!(errors, "Invalid answer '{}'. Please enter one of {}.", answer, keys)?;
    }
}
