mod config;
mod quiz;

use std::sync::Arc;

use config::BotConfig;
use dotenv::dotenv;
use log::{debug, warn};
use quiz::{AnswerFeedback, FinalSummary, PromptView, QuizEngine, QuizError, Step, UserKey};
use teloxide::{
    dispatching::UpdateHandler,
    net::Download,
    prelude::*,
    types::{Document, KeyboardButton, KeyboardMarkup, KeyboardRemove},
    utils::command::BotCommands,
};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type Engine = Arc<QuizEngine>;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
enum Command {
    #[command(description = "explain the question file format")]
    Start,
    #[command(description = "show this help")]
    Help,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    pretty_env_logger::init();
    log::info!("Starting quiz file bot...");

    let config = match BotConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(err) => {
            log::error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };
    log::info!(
        "Accepting {} files up to {} bytes, correct-answer label {:?}",
        config.file_extension,
        config.max_file_bytes,
        config.parser.correct_label
    );

    let bot = Bot::from_env();
    if let Err(err) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", err);
    }

    let engine: Engine = Arc::new(QuizEngine::in_memory(config.parser.clone()));

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![engine, config])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(command),
        )
        .branch(Message::filter_document().endpoint(receive_document))
        .branch(Message::filter_text().endpoint(receive_answer))
        .branch(dptree::endpoint(unsupported_message))
}

const USAGE_TEXT: &str = "Hi! Send me a text file (.txt) with questions. Two formats are supported.\n\n\
1) Options marked with + (correct) and - (wrong):\n\
What does the XAMPP control panel do?\n\
- Edits code\n\
+ Starts and stops services\n\n\
2) Numbered options with a separate answer line:\n\
Which of these is an HTML tag?\n\
1) table\n\
2) bold\n\
3) css\n\
4) img\n\
Correct answer: 1\n\n\
Separate questions with any line that is not an option. I will quiz you and tell you the result!";

async fn command(bot: Bot, msg: Message, cmd: Command) -> HandlerResult {
    match cmd {
        Command::Start => {
            bot.send_message(msg.chat.id, USAGE_TEXT).await?;
        }
        Command::Help => {
            bot.send_message(
                msg.chat.id,
                format!("{}\n\n{}", Command::descriptions(), USAGE_TEXT),
            )
            .await?;
        }
    }
    Ok(())
}

async fn receive_document(
    engine: Engine,
    config: Arc<BotConfig>,
    bot: Bot,
    msg: Message,
    document: Document,
) -> HandlerResult {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = user.id.0;

    let file_name = document.file_name.clone().unwrap_or_default();
    if !config.accepts_file_name(&file_name) {
        debug!("User {} sent unsupported file {:?}", user_id, file_name);
        bot.send_message(
            msg.chat.id,
            format!("Please send a file with the {} extension.", config.file_extension),
        )
        .await?;
        return Ok(());
    }

    if document.file.size > config.max_file_bytes {
        warn!(
            "User {} sent {} bytes, limit is {}",
            user_id, document.file.size, config.max_file_bytes
        );
        bot.send_message(msg.chat.id, "This file is too large.").await?;
        return Ok(());
    }

    let file = bot.get_file(document.file.id.clone()).await?;
    let mut content = Vec::with_capacity(document.file.size as usize);
    bot.download_file(&file.path, &mut content).await?;

    let text = match String::from_utf8(content) {
        Ok(text) => text,
        Err(_) => {
            warn!("User {} sent a file that is not UTF-8", user_id);
            bot.send_message(msg.chat.id, "Please save the file as UTF-8 text.")
                .await?;
            return Ok(());
        }
    };

    if engine.has_session(user_id) {
        debug!("User {} uploaded a new file during a running quiz", user_id);
    }

    match engine.start_from_text(user_id, &text) {
        Ok(step) => send_step(&bot, msg.chat.id, step).await,
        Err(QuizError::NoQuestionsRecognized) => {
            bot.send_message(
                msg.chat.id,
                "Could not recognize any questions. Check the format and send the file again.",
            )
            .await?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

const RESTART_TEXT: &str = "Start with /start and upload a file with questions.";

async fn receive_answer(engine: Engine, bot: Bot, msg: Message, text: String) -> HandlerResult {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = user.id.0;

    let feedback = match engine.submit_answer(user_id, &text) {
        Ok(feedback) => feedback,
        Err(QuizError::NoActiveSession) => {
            match pending_step(&engine, user_id) {
                Some(step) => send_step(&bot, msg.chat.id, step).await?,
                None => {
                    bot.send_message(msg.chat.id, RESTART_TEXT).await?;
                }
            }
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    bot.send_message(msg.chat.id, feedback_text(&feedback))
        .await?;

    match engine.next_prompt(user_id) {
        Ok(step) => send_step(&bot, msg.chat.id, step).await,
        Err(QuizError::NoActiveSession) => {
            bot.send_message(msg.chat.id, RESTART_TEXT).await?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// A step the user is still owed after a reply found nothing to answer, such
/// as the summary of a quiz whose last prompt was never delivered.
fn pending_step(engine: &QuizEngine, user: UserKey) -> Option<Step> {
    engine.next_prompt(user).ok()
}

async fn unsupported_message(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, "Send a .txt file with questions or answer with text.")
        .await?;
    Ok(())
}

async fn send_step(bot: &Bot, chat_id: ChatId, step: Step) -> HandlerResult {
    match step {
        Step::Prompt(view) => {
            bot.send_message(chat_id, prompt_text(&view))
                .reply_markup(options_keyboard(view.displayed_options))
                .await?;
        }
        Step::Finished(summary) => {
            bot.send_message(chat_id, summary_text(&summary))
                .reply_markup(KeyboardRemove::new())
                .await?;
        }
    }
    Ok(())
}

fn options_keyboard(options: Vec<String>) -> KeyboardMarkup {
    let rows = options
        .into_iter()
        .map(|option| vec![KeyboardButton::new(option)])
        .collect::<Vec<_>>();
    KeyboardMarkup::new(rows)
        .resize_keyboard(true)
        .one_time_keyboard(true)
}

fn prompt_text(view: &PromptView) -> String {
    format!(
        "Question {}/{}\n\n❓ {}",
        view.position, view.total, view.question_text
    )
}

fn feedback_text(feedback: &AnswerFeedback) -> String {
    if feedback.is_correct {
        "✅ Correct!".to_string()
    } else {
        format!("❌ Wrong! Correct answer: {}", feedback.correct_answer)
    }
}

fn summary_text(summary: &FinalSummary) -> String {
    format!(
        "✅ Test finished! Correct answers: {} of {}",
        summary.correct_count, summary.total
    )
}
