pub mod engine;
pub mod order;
pub mod parser;
pub mod store;

use thiserror::Error;

pub use engine::QuizEngine;

/// Identity of the user a session belongs to (Telegram user id in the bot).
pub type UserKey = u64;

/// One question as authored in the uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub prompt: String,
    /// Distinct options in authoring order.
    pub options: Vec<String>,
    /// Always one of `options`.
    pub correct_answer: String,
}

impl Question {
    pub fn new(prompt: String, options: Vec<String>, correct_answer: String) -> Self {
        Self {
            prompt,
            options,
            correct_answer,
        }
    }
}

/// All questions parsed out of one upload.
pub type QuizSet = Vec<Question>;

/// Live progress of a single user through a quiz.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub questions: QuizSet,
    pub cursor: usize,
    pub correct_count: usize,
    pub presented_options: Vec<String>,
}

impl Session {
    pub fn new(questions: QuizSet) -> Self {
        Self {
            questions,
            cursor: 0,
            correct_count: 0,
            presented_options: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.questions.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptView {
    pub question_text: String,
    pub displayed_options: Vec<String>,
    /// 1-based number of this question.
    pub position: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub is_correct: bool,
    pub correct_answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalSummary {
    pub correct_count: usize,
    pub total: usize,
}

/// What the user should see next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Prompt(PromptView),
    Finished(FinalSummary),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    /// The upload contained no well-formed question.
    #[error("no questions recognized in the uploaded text")]
    NoQuestionsRecognized,

    /// The user has no quiz in progress.
    #[error("no active quiz session")]
    NoActiveSession,
}
