use log::{debug, info};

use crate::quiz::order::{Permute, RandomOrder};
use crate::quiz::parser::{self, ParserConfig};
use crate::quiz::store::{InMemorySessionStore, SessionStore};
use crate::quiz::{
    AnswerFeedback, FinalSummary, PromptView, QuizError, QuizSet, Session, Step, UserKey,
};

/// Drives quiz sessions: one per user, one question at a time.
pub struct QuizEngine<S = InMemorySessionStore, P = RandomOrder> {
    store: S,
    order: P,
    parser_config: ParserConfig,
}

impl QuizEngine {
    pub fn in_memory(parser_config: ParserConfig) -> Self {
        Self::new(InMemorySessionStore::new(), RandomOrder, parser_config)
    }
}

impl<S: SessionStore, P: Permute> QuizEngine<S, P> {
    pub fn new(store: S, order: P, parser_config: ParserConfig) -> Self {
        Self {
            store,
            order,
            parser_config,
        }
    }

    /// Parses an upload and, when it holds questions, starts a session and
    /// returns the first prompt. A previous session survives a failed parse.
    pub fn start_from_text(&self, user: UserKey, text: &str) -> Result<Step, QuizError> {
        let questions = parser::parse(text, &self.parser_config);
        if questions.is_empty() {
            return Err(QuizError::NoQuestionsRecognized);
        }
        self.start_session(user, questions);
        self.next_prompt(user)
    }

    /// Starts a fresh session for `user`, discarding any previous one.
    pub fn start_session(&self, user: UserKey, quiz: QuizSet) {
        let total = quiz.len();
        let questions = self.order.apply(quiz);
        if self.store.insert(user, Session::new(questions)).is_some() {
            debug!("Replaced unfinished session of user {}", user);
        }
        info!(
            "Started quiz of {} questions for user {} ({} active)",
            total,
            user,
            self.active_sessions()
        );
    }

    /// Presents the current question, or finishes the session once every
    /// question has been answered.
    pub fn next_prompt(&self, user: UserKey) -> Result<Step, QuizError> {
        let step = self.store.modify(user, |slot| -> Result<Step, QuizError> {
            let session = slot.as_mut().ok_or(QuizError::NoActiveSession)?;
            let total = session.questions.len();

            let Some(question) = session.current() else {
                let summary = FinalSummary {
                    correct_count: session.correct_count,
                    total,
                };
                *slot = None;
                return Ok(Step::Finished(summary));
            };

            let question_text = question.prompt.clone();
            let displayed_options = self.order.apply(question.options.clone());
            let position = session.cursor + 1;
            session.presented_options = displayed_options.clone();

            Ok(Step::Prompt(PromptView {
                question_text,
                displayed_options,
                position,
                total,
            }))
        })?;

        // `active_sessions` locks the store, so this runs after `modify` returns.
        if let Step::Finished(summary) = &step {
            info!(
                "User {} finished quiz with {}/{} ({} active)",
                user,
                summary.correct_count,
                summary.total,
                self.active_sessions()
            );
        }
        Ok(step)
    }

    /// Scores a reply to the current question and moves past it.
    pub fn submit_answer(&self, user: UserKey, raw: &str) -> Result<AnswerFeedback, QuizError> {
        self.store.modify(user, |slot| -> Result<AnswerFeedback, QuizError> {
            let session = slot.as_mut().ok_or(QuizError::NoActiveSession)?;
            // Finished sessions only wait for `next_prompt` to report the summary.
            if session.is_finished() {
                return Err(QuizError::NoActiveSession);
            }
            let correct_answer = session.questions[session.cursor].correct_answer.clone();

            let is_correct = raw.trim() == correct_answer;
            if is_correct {
                session.correct_count += 1;
            }
            session.cursor += 1;
            debug!(
                "User {} answered question {} ({})",
                user,
                session.cursor,
                if is_correct { "correct" } else { "wrong" }
            );

            Ok(AnswerFeedback {
                is_correct,
                correct_answer,
            })
        })
    }

    pub fn has_session(&self, user: UserKey) -> bool {
        self.store.contains(user)
    }

    pub fn active_sessions(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::Question;
    use std::sync::Arc;
    use std::thread;

    /// Keeps authoring order.
    struct Identity;

    impl Permute for Identity {
        fn permutation(&self, len: usize) -> Vec<usize> {
            (0..len).collect()
        }
    }

    struct Reversed;

    impl Permute for Reversed {
        fn permutation(&self, len: usize) -> Vec<usize> {
            (0..len).rev().collect()
        }
    }

    fn engine<P: Permute>(order: P) -> QuizEngine<InMemorySessionStore, P> {
        QuizEngine::new(InMemorySessionStore::new(), order, ParserConfig::default())
    }

    fn question(prompt: &str, options: &[&str], correct: &str) -> Question {
        Question::new(
            prompt.to_string(),
            options.iter().map(|o| o.to_string()).collect(),
            correct.to_string(),
        )
    }

    fn sample_quiz() -> QuizSet {
        vec![
            question("Q1", &["A", "B", "C"], "A"),
            question("Q2", &["X", "Y"], "Y"),
            question("Q3", &["yes", "no"], "no"),
        ]
    }

    fn expect_prompt(step: Step) -> PromptView {
        match step {
            Step::Prompt(view) => view,
            Step::Finished(summary) => panic!("unexpected summary {:?}", summary),
        }
    }

    #[test]
    fn first_prompt_uses_injected_order() {
        let engine = engine(Reversed);
        engine.start_session(1, sample_quiz());

        let view = expect_prompt(engine.next_prompt(1).unwrap());
        assert_eq!(view.question_text, "Q3");
        assert_eq!(view.displayed_options, vec!["no", "yes"]);
        assert_eq!(view.position, 1);
        assert_eq!(view.total, 3);
    }

    #[test]
    fn presented_options_are_recorded() {
        let engine = engine(Reversed);
        engine.start_session(1, vec![question("Q", &["a", "b", "c"], "b")]);
        engine.next_prompt(1).unwrap();

        let presented = engine
            .store
            .modify(1, |slot| slot.as_ref().map(|s| s.presented_options.clone()));
        assert_eq!(presented, Some(vec!["c".into(), "b".into(), "a".into()]));
    }

    #[test]
    fn full_cycle_scores_and_finishes() {
        let engine = engine(Identity);
        engine.start_session(9, sample_quiz());

        let replies = ["A", "  X ", "no\n"];
        for reply in replies {
            expect_prompt(engine.next_prompt(9).unwrap());
            engine.submit_answer(9, reply).unwrap();
        }

        assert_eq!(
            engine.next_prompt(9).unwrap(),
            Step::Finished(FinalSummary {
                correct_count: 2,
                total: 3
            })
        );
        assert!(!engine.has_session(9));
        assert_eq!(engine.next_prompt(9), Err(QuizError::NoActiveSession));
    }

    #[test]
    fn random_order_cycle_terminates_with_bounded_score() {
        let engine = QuizEngine::in_memory(ParserConfig::default());
        let quiz = sample_quiz();
        let total = quiz.len();
        engine.start_session(5, quiz);

        let mut steps = 0;
        loop {
            match engine.next_prompt(5).unwrap() {
                Step::Prompt(view) => {
                    steps += 1;
                    let guess = view.displayed_options[0].clone();
                    engine.submit_answer(5, &guess).unwrap();
                }
                Step::Finished(summary) => {
                    assert_eq!(summary.total, total);
                    assert!(summary.correct_count <= summary.total);
                    break;
                }
            }
        }
        assert_eq!(steps, total);
    }

    #[test]
    fn feedback_always_carries_correct_answer() {
        let engine = engine(Identity);
        engine.start_session(2, vec![question("Q", &["A", "B"], "A"), question("R", &["C"], "C")]);

        engine.next_prompt(2).unwrap();
        let wrong = engine.submit_answer(2, "B").unwrap();
        assert_eq!(
            wrong,
            AnswerFeedback {
                is_correct: false,
                correct_answer: "A".into()
            }
        );

        engine.next_prompt(2).unwrap();
        let right = engine.submit_answer(2, "  C  ").unwrap();
        assert!(right.is_correct);
        assert_eq!(right.correct_answer, "C");
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let engine = engine(Identity);
        engine.start_session(2, vec![question("Q", &["Paris", "Rome"], "Paris")]);
        engine.next_prompt(2).unwrap();
        assert!(!engine.submit_answer(2, "paris").unwrap().is_correct);
    }

    #[test]
    fn submit_without_session() {
        let engine = engine(Identity);
        assert_eq!(engine.submit_answer(4, "A"), Err(QuizError::NoActiveSession));
    }

    #[test]
    fn submit_after_last_answer_does_not_advance() {
        let engine = engine(Identity);
        engine.start_session(4, vec![question("Q", &["A"], "A")]);
        engine.next_prompt(4).unwrap();
        engine.submit_answer(4, "A").unwrap();

        assert_eq!(engine.submit_answer(4, "A"), Err(QuizError::NoActiveSession));
        assert_eq!(
            engine.next_prompt(4).unwrap(),
            Step::Finished(FinalSummary {
                correct_count: 1,
                total: 1
            })
        );
    }

    #[test]
    fn empty_quiz_finishes_immediately() {
        let engine = engine(Identity);
        engine.start_session(3, Vec::new());
        assert_eq!(
            engine.next_prompt(3).unwrap(),
            Step::Finished(FinalSummary {
                correct_count: 0,
                total: 0
            })
        );
        assert_eq!(engine.active_sessions(), 0);
    }

    #[test]
    fn restart_replaces_progress() {
        let engine = engine(Identity);
        engine.start_session(1, sample_quiz());
        engine.next_prompt(1).unwrap();
        engine.submit_answer(1, "A").unwrap();

        engine.start_session(1, vec![question("New", &["z"], "z")]);
        let view = expect_prompt(engine.next_prompt(1).unwrap());
        assert_eq!(view.question_text, "New");
        assert_eq!(view.total, 1);
        assert_eq!(engine.active_sessions(), 1);
    }

    #[test]
    fn start_from_text_returns_first_prompt() {
        let engine = engine(Identity);
        let step = engine
            .start_from_text(8, "Q1\n+A\n-B\n-C\n\nQ2\n1) X\n2) Y\nCorrect answer: 2")
            .unwrap();
        let view = expect_prompt(step);
        assert_eq!(view.question_text, "Q1");
        assert_eq!(view.displayed_options, vec!["A", "B", "C"]);
        assert_eq!(view.total, 2);
    }

    #[test]
    fn unrecognized_upload_keeps_existing_session() {
        let engine = engine(Identity);
        engine.start_session(8, sample_quiz());

        assert_eq!(
            engine.start_from_text(8, "just some prose\nwith no options"),
            Err(QuizError::NoQuestionsRecognized)
        );
        assert!(engine.has_session(8));
    }

    #[test]
    fn sessions_are_per_user() {
        let engine = engine(Identity);
        engine.start_session(1, sample_quiz());
        engine.start_session(2, sample_quiz());

        engine.next_prompt(1).unwrap();
        engine.submit_answer(1, "A").unwrap();

        let view = expect_prompt(engine.next_prompt(2).unwrap());
        assert_eq!(view.position, 1);
        let view = expect_prompt(engine.next_prompt(1).unwrap());
        assert_eq!(view.position, 2);
    }

    #[test]
    fn concurrent_answers_for_one_user_are_all_counted() {
        let engine = Arc::new(engine(Identity));
        let total = 1000;
        engine.start_session(
            1,
            (0..total)
                .map(|i| question(&format!("Q{}", i), &["A", "B"], "A"))
                .collect(),
        );

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for _ in 0..total / 8 {
                        engine.submit_answer(1, "A").unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(
            engine.next_prompt(1).unwrap(),
            Step::Finished(FinalSummary {
                correct_count: total,
                total
            })
        );
        assert!(!engine.has_session(1));
    }
}
