//! Turns an uploaded text file into questions.
//!
//! Two block formats are understood. Marked blocks prefix every option with
//! `+` (correct) or `-` (incorrect):
//!
//! ```text
//! What does XAMPP's control panel do?
//! - Edits code
//! + Starts and stops services
//! ```
//!
//! Numbered blocks list options as `1)`..`4)` and name the right one on a
//! separate line starting with the correct-answer label:
//!
//! ```text
//! Which of these is an HTML tag?
//! 1) table
//! 2) bold
//! Correct answer: 1
//! ```
//!
//! Any other non-blank line starts a new question. Blocks that do not reduce
//! to a question with a correct answer are skipped.

use log::{debug, warn};

use crate::quiz::{Question, QuizSet};

pub const DEFAULT_CORRECT_LABEL: &str = "Correct answer";

const NUMBERED_PREFIXES: [&str; 4] = ["1)", "2)", "3)", "4)"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Leading text of the line that declares the correct numbered option.
    pub correct_label: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            correct_label: DEFAULT_CORRECT_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Marked,
    Numbered,
}

pub fn parse(text: &str, config: &ParserConfig) -> QuizSet {
    let mut questions = Vec::new();
    let mut prompt: Option<&str> = None;
    let mut buffer: Vec<&str> = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if is_marker(line, config) {
            buffer.push(line);
            continue;
        }

        if let Some(pending) = prompt {
            questions.extend(finalize(pending, &buffer, config));
        } else if !buffer.is_empty() {
            debug!("Skipping {} option lines before the first question", buffer.len());
        }
        prompt = Some(line);
        buffer.clear();
    }

    if let Some(pending) = prompt {
        questions.extend(finalize(pending, &buffer, config));
    }

    debug!("Parsed {} questions", questions.len());
    questions
}

fn is_marker(line: &str, config: &ParserConfig) -> bool {
    line.starts_with('-')
        || line.starts_with('+')
        || numbered_prefix(line).is_some()
        || is_declaration(line, config)
}

fn is_declaration(line: &str, config: &ParserConfig) -> bool {
    line.starts_with(config.correct_label.as_str())
}

fn numbered_prefix(line: &str) -> Option<&'static str> {
    NUMBERED_PREFIXES
        .iter()
        .copied()
        .find(|prefix| line.starts_with(prefix))
}

fn is_marked(line: &str) -> bool {
    line.starts_with('+') || line.starts_with('-')
}

fn classify(lines: &[&str]) -> Option<Format> {
    let marked = lines.iter().any(|l| is_marked(l));
    let numbered = lines.iter().any(|l| numbered_prefix(l).is_some());

    match (marked, numbered) {
        (true, false) => Some(Format::Marked),
        (false, true) => Some(Format::Numbered),
        (true, true) => {
            warn!("Question block mixes +/- and numbered options");
            None
        }
        (false, false) => None,
    }
}

fn finalize(prompt: &str, lines: &[&str], config: &ParserConfig) -> Option<Question> {
    if lines.is_empty() {
        debug!("Skipping question without options: {:?}", prompt);
        return None;
    }

    let question = match classify(lines)? {
        Format::Marked => reduce_marked(prompt, lines),
        Format::Numbered => reduce_numbered(prompt, lines, config),
    };
    if question.is_none() {
        debug!("Skipping malformed question: {:?}", prompt);
    }
    question
}

fn reduce_marked(prompt: &str, lines: &[&str]) -> Option<Question> {
    let mut options = Vec::new();
    let mut correct = None;

    for line in lines {
        if let Some(rest) = line.strip_prefix('+') {
            let rest = rest.trim();
            push_option(&mut options, rest);
            correct = Some(rest);
        } else if let Some(rest) = line.strip_prefix('-') {
            push_option(&mut options, rest.trim());
        }
    }

    let correct = correct.filter(|c| !c.is_empty())?;
    Some(Question::new(prompt.to_string(), options, correct.to_string()))
}

fn reduce_numbered(prompt: &str, lines: &[&str], config: &ParserConfig) -> Option<Question> {
    let mut numbered = Vec::new();
    let mut declarations = Vec::new();

    for &line in lines {
        if let Some(prefix) = numbered_prefix(line) {
            numbered.push((prefix, line[prefix.len()..].trim()));
        } else if is_declaration(line, config) {
            declarations.push(line);
        }
    }

    let [declaration] = declarations.as_slice() else {
        return None;
    };
    let (_, number) = declaration.rsplit_once(':')?;
    let wanted = format!("{})", number.trim());

    let correct = numbered
        .iter()
        .find(|(prefix, _)| *prefix == wanted)
        .map(|(_, text)| *text)
        .filter(|text| !text.is_empty())?;

    let mut options = Vec::new();
    for (_, text) in &numbered {
        push_option(&mut options, text);
    }

    Some(Question::new(prompt.to_string(), options, correct.to_string()))
}

fn push_option(options: &mut Vec<String>, text: &str) {
    if !text.is_empty() && !options.iter().any(|o| o == text) {
        options.push(text.to_string());
    }
}
