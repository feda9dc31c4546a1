use nunzio_agent::MessageHandler;
use nunzio_core::config::AppConfig;
use nunzio_core::domain::workout::UserId;
use nunzio_db::RecordStore;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::commands::{
    block_on, config_failure, init_logging, open_database, CommandResult, Failure, GlobalOptions,
};

const DIVIDER: &str = "--------------------------------------------------";

pub const HELP: &str = "Nunzio Commands:

  Log a workout:
    \"I did 3 sets of bench press at 185 lbs, 10 reps\"
    \"squat 5x5 at 225 lbs\"

  View stats:
    \"show my stats\"

  Fix or repeat:
    \"undo\" or \"delete session #12\"
    \"same as last time at 195 lbs\"

  Get coaching:
    \"what should I do for chest?\"

  help  - show this message
  exit  - quit";

pub fn run(options: &GlobalOptions, verbose: bool) -> CommandResult {
    let result = options.load_config().map_err(config_failure).and_then(|config| {
        init_logging(&config.logging);
        let user_id = UserId::new(config.cli.user_id.clone());
        block_on(async {
            let handler = connect_handler(&config).await?;
            let stdin = BufReader::new(tokio::io::stdin());
            repl(&handler, &user_id, verbose, stdin, tokio::io::stdout())
                .await
                .map_err(|error| ("terminal_io", error.to_string(), 7u8))
        })
    });

    match result {
        Ok(()) => CommandResult { exit_code: 0, output: String::new() },
        Err(failure) => CommandResult::from_failure("chat", failure),
    }
}

pub fn send(options: &GlobalOptions, text: &str, verbose: bool) -> CommandResult {
    let text = text.trim();
    if text.is_empty() {
        return CommandResult::failure("send", "empty_message", "message text is empty", 2);
    }

    let result = options.load_config().map_err(config_failure).and_then(|config| {
        init_logging(&config.logging);
        let user_id = UserId::new(config.cli.user_id.clone());
        block_on(async {
            let handler = connect_handler(&config).await?;
            let reply = handler.process(text, &user_id, verbose).await;
            handler.flush_interaction_logs().await;
            Ok(reply)
        })
    });

    match result {
        Ok(reply) => CommandResult { exit_code: 0, output: reply },
        Err(failure) => CommandResult::from_failure("send", failure),
    }
}

pub(crate) async fn connect_handler(config: &AppConfig) -> Result<MessageHandler, Failure> {
    let pool = open_database(config, true).await?;
    MessageHandler::from_config(config, RecordStore::sql(pool))
        .map_err(|error| ("llm_client", error.to_string(), 6u8))
}

/// Line-oriented chat loop. Ends on `exit`, `quit`, `bye` or end of input,
/// after pending interaction-log writes have landed.
pub async fn repl<R, W>(
    handler: &MessageHandler,
    user_id: &UserId,
    verbose: bool,
    input: R,
    mut output: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output
        .write_all(
            format!("Nunzio Workout Assistant\nType 'help' for commands or 'exit' to quit.\n{DIVIDER}\n")
                .as_bytes(),
        )
        .await?;

    let mut lines = input.lines();
    loop {
        output.write_all(b"You: ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            output.write_all(b"\nGoodbye!\n").await?;
            break;
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        match text.to_lowercase().as_str() {
            "exit" | "quit" | "bye" => {
                output.write_all(b"Goodbye!\n").await?;
                break;
            }
            "help" => {
                output.write_all(format!("{HELP}\n").as_bytes()).await?;
            }
            _ => {
                let reply = handler.process(text, user_id, verbose).await;
                output.write_all(format!("Nunzio: {reply}\n{DIVIDER}\n").as_bytes()).await?;
            }
        }
    }

    handler.flush_interaction_logs().await;
    output.flush().await
}
