use crate::commands::{block_on, config_failure, open_database, CommandResult, GlobalOptions};

pub fn run(options: &GlobalOptions) -> CommandResult {
    let result = options.load_config().map_err(config_failure).and_then(|config| {
        block_on(async {
            let pool = open_database(&config, false).await?;
            pool.close().await;
            Ok(())
        })
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(failure) => CommandResult::from_failure("migrate", failure),
    }
}
