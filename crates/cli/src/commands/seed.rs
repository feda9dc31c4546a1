use nunzio_db::{CatalogSeed, SeedResult};

use crate::commands::{block_on, config_failure, open_database, CommandResult, GlobalOptions};

pub fn run(options: &GlobalOptions) -> CommandResult {
    let result = options.load_config().map_err(config_failure).and_then(|config| {
        block_on(async {
            let pool = open_database(&config, false).await?;
            let seeded = CatalogSeed::load(&pool)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 5u8));
            pool.close().await;
            seeded
        })
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", seed_message(&seeded)),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn seed_message(seeded: &SeedResult) -> String {
    if seeded.exercises_created == 0 && seeded.principles_created == 0 {
        return "catalog already seeded".to_string();
    }
    format!(
        "catalog seeded: {} exercises, {} training principles",
        seeded.exercises_created, seeded.principles_created
    )
}
