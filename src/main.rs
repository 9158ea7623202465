use std::env;
use std::sync::Arc;

use dptree::case;
use teloxide::{
    dispatching::dialogue::{self, InMemStorage},
    prelude::*,
    types::ParseMode,
    utils::command::BotCommands,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
mod schedule;
use schedule::{Day, ScheduleError};
mod state;
use state::{Action, Field, State};
mod timetables;
use timetables::Timetables;
mod utils;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
enum Command {
    #[command(description = "Show the welcome message")]
    Help,
    #[command(description = "Show the welcome message")]
    Start,
    #[command(description = "Add a lecture")]
    Add,
    #[command(description = "Edit a lecture")]
    Edit,
    #[command(description = "Remove a lecture")]
    Delete,
    #[command(description = "Today's timetable")]
    Day,
    #[command(description = "Tomorrow's timetable")]
    Tomorrow,
    #[command(description = "The whole week")]
    Week,
    #[command(description = "Export the timetable as JSON")]
    Export,
    #[command(description = "Cancel")]
    Cancel,
}

#[tokio::main]
async fn main() {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .init();

    info!("Starting timetable bot");
    let bot = Bot::from_env();

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Add].endpoint(add_lecture_handler))
        .branch(case![Command::Edit].endpoint(pick_lecture_handler))
        .branch(case![Command::Delete].endpoint(pick_lecture_handler))
        .branch(case![Command::Start].endpoint(default))
        .branch(case![Command::Help].endpoint(default))
        .branch(case![Command::Cancel].endpoint(cancel))
        .branch(case![Command::Export].endpoint(export))
        .branch(dptree::endpoint(get_schedule));

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(case![State::AddLecture { form }].endpoint(lecture_form_handler))
        .branch(case![State::EditLecture { current, form }].endpoint(lecture_form_handler))
        .branch(case![State::PickLecture { action, ids }].endpoint(picked_lecture_handler))
        .branch(case![State::ConfirmRemove { id }].endpoint(confirm_remove_handler));

    Dispatcher::builder(
        bot,
        dialogue::enter::<Update, InMemStorage<State>, State, _>().branch(message_handler),
    )
    .dependencies(dptree::deps![
        InMemStorage::<State>::new(),
        Arc::new(Timetables::default())
    ])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;
}

async fn default(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(
        msg.chat.id,
        "Hi! I keep your weekly class timetable. \n
<b>Available commands:</b> \n
/day - today's classes \n
/tomorrow - tomorrow's classes \n
/week - the whole week \n
/add - add a lecture \n
/edit - change a lecture \n
/delete - remove a lecture \n
/export - the timetable as JSON \n
/cancel - abort the current dialog",
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

async fn cancel(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
) -> HandlerResult {
    dialogue.update(State::Default).await?;
    bot.send_message(msg.chat.id, "Cancelled").await?;
    Ok(())
}

async fn add_lecture_handler(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
) -> HandlerResult {
    dialogue
        .update(State::AddLecture {
            form: Default::default(),
        })
        .await?;
    bot.send_message(
        msg.chat.id,
        format!("<b>Add lecture</b>\n\n{}", Field::Name.prompt()),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

async fn lecture_form_handler(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    timetables: Arc<Timetables>,
    mut state: State,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "The message has no text").await?;
        return Ok(());
    };
    let (form, current) = match &mut state {
        State::AddLecture { form } => (form, None),
        State::EditLecture { current, form } => (form, Some(&*current)),
        _ => {
            bot.send_message(msg.chat.id, "Something went wrong, please try again.")
                .await?;
            return Ok(());
        }
    };

    if let Err(err) = form.answer(text, current) {
        let message = utils::field_error_message(&err, form.next_field());
        bot.send_message(msg.chat.id, message)
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    }

    let Some((day, lecture)) = form.complete() else {
        let prompt = form.next_field().map(Field::prompt).unwrap_or_default();
        let message = format!("{}\n\n{}", utils::state_message(&state), prompt);
        bot.send_message(msg.chat.id, message)
            .parse_mode(ParseMode::Html)
            .await?;
        dialogue.update(state).await?;
        return Ok(());
    };

    let chat = msg.chat.id;
    let outcome = match current {
        None => timetables
            .with(chat, |schedule| schedule.insert_lecture(day, lecture))
            .map_err(ScheduleError::from),
        Some(block) => timetables.with(chat, |schedule| {
            schedule
                .edit_lecture(block.id, block.day, day, lecture)
                .map(|()| block.id)
        }),
    };

    let next_step = match outcome {
        Ok(id) => {
            info!(chat = chat.0, %id, %day, "lecture saved");
            let saved = timetables.with(chat, |schedule| schedule.find(id).cloned());
            state = State::Default;
            match saved {
                Some(block) => format!("{}\n\nLecture saved.", utils::lecture_message(&block)),
                None => "Lecture saved.".to_string(),
            }
        }
        Err(ScheduleError::Conflict(conflict)) => {
            warn!(chat = chat.0, %conflict, "lecture rejected");
            form.retry_time();
            format!(
                "A lecture already exists at that time: {}.\n\n{}",
                teloxide::utils::html::escape(&conflict.to_string()),
                Field::Start.prompt()
            )
        }
        Err(err @ ScheduleError::UnknownLecture { .. }) => {
            warn!(chat = chat.0, %err, "edited lecture is gone");
            state = State::Default;
            format!("{err}. It was removed meanwhile, nothing was changed.")
        }
    };

    bot.send_message(chat, next_step)
        .parse_mode(ParseMode::Html)
        .await?;
    dialogue.update(state).await?;
    Ok(())
}

async fn pick_lecture_handler(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    timetables: Arc<Timetables>,
    cmd: Command,
) -> HandlerResult {
    let action = match cmd {
        Command::Edit => Action::Edit,
        _ => Action::Remove,
    };
    let schedule = timetables.snapshot(msg.chat.id);
    if schedule.is_empty() {
        bot.send_message(msg.chat.id, "The timetable is empty. Use /add first.")
            .await?;
        return Ok(());
    }

    let blocks = utils::listing(&schedule);
    dialogue
        .update(State::PickLecture {
            action,
            ids: blocks.iter().map(|b| b.id).collect(),
        })
        .await?;
    bot.send_message(
        msg.chat.id,
        format!(
            "Choose a lecture by number:\n\n{}",
            utils::listing_message(&blocks)
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

async fn picked_lecture_handler(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    timetables: Arc<Timetables>,
    state: State,
) -> HandlerResult {
    let State::PickLecture { action, ids } = state else {
        bot.send_message(msg.chat.id, "Something went wrong, please try again.")
            .await?;
        return Ok(());
    };
    let Some(index) = msg.text().and_then(|text| utils::pick(text, ids.len())) else {
        bot.send_message(
            msg.chat.id,
            format!("Send a number from 1 to {}, or /cancel.", ids.len()),
        )
        .await?;
        return Ok(());
    };

    let id = ids[index];
    let Some(block) = timetables.with(msg.chat.id, |schedule| schedule.find(id).cloned()) else {
        dialogue.update(State::Default).await?;
        bot.send_message(msg.chat.id, "That lecture no longer exists.")
            .await?;
        return Ok(());
    };

    let message = match action {
        Action::Edit => {
            let message = format!(
                "<b>Edit lecture</b>\n\n{}\n\nSend <b>-</b> to keep a value.\n\n{}",
                utils::lecture_message(&block),
                Field::Name.prompt()
            );
            dialogue
                .update(State::EditLecture {
                    current: block,
                    form: Default::default(),
                })
                .await?;
            message
        }
        Action::Remove => {
            dialogue.update(State::ConfirmRemove { id }).await?;
            format!(
                "<b>Remove class</b>\n\n{}\n\nDo you want to remove this class? (yes/no)",
                utils::lecture_message(&block)
            )
        }
    };
    bot.send_message(msg.chat.id, message)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

async fn confirm_remove_handler(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    timetables: Arc<Timetables>,
    state: State,
) -> HandlerResult {
    let State::ConfirmRemove { id } = state else {
        bot.send_message(msg.chat.id, "Something went wrong, please try again.")
            .await?;
        return Ok(());
    };
    let answer = msg.text().unwrap_or_default().trim().to_lowercase();

    let next_step = match answer.as_str() {
        "yes" | "y" => match timetables.with(msg.chat.id, |schedule| schedule.remove_lecture(id)) {
            Some(block) => {
                info!(chat = msg.chat.id.0, %id, "lecture removed");
                format!("{}\n\nLecture removed.", utils::lecture_message(&block))
            }
            None => "That lecture no longer exists.".to_string(),
        },
        "no" | "n" => "Nothing was removed.".to_string(),
        _ => {
            bot.send_message(msg.chat.id, "Answer <b>yes</b> or <b>no</b>.")
                .parse_mode(ParseMode::Html)
                .await?;
            return Ok(());
        }
    };

    dialogue.update(State::Default).await?;
    bot.send_message(msg.chat.id, next_step)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

async fn export(bot: Bot, msg: Message, timetables: Arc<Timetables>) -> HandlerResult {
    let schedule = timetables.snapshot(msg.chat.id);
    let json = serde_json::to_string_pretty(&schedule)?;
    bot.send_message(msg.chat.id, json).await?;
    Ok(())
}

async fn get_schedule(
    bot: Bot,
    msg: Message,
    cmd: Command,
    timetables: Arc<Timetables>,
) -> HandlerResult {
    let schedule = timetables.snapshot(msg.chat.id);
    let days: Vec<Day> = match cmd {
        Command::Day => utils::working_day(0).into_iter().collect(),
        Command::Tomorrow => utils::working_day(1).into_iter().collect(),
        _ => Day::ALL.to_vec(),
    };

    if days.is_empty() {
        bot.send_message(msg.chat.id, "No classes on weekends")
            .await?;
        return Ok(());
    }

    for day in days {
        bot.send_message(msg.chat.id, utils::day_message(&schedule, day))
            .parse_mode(ParseMode::Html)
            .await?;
    }

    Ok(())
}
