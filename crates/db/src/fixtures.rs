use crate::connection::DbPool;
use crate::repositories::{
    ExerciseRepository, PrincipleRepository, RepositoryError, SqlExerciseRepository,
    SqlPrincipleRepository,
};

pub struct ExerciseSeed {
    pub name: &'static str,
    pub muscle_group: &'static str,
    pub guidance: Option<&'static str>,
}

pub struct PrincipleSeed {
    pub category: &'static str,
    pub title: &'static str,
    pub content: &'static str,
    pub priority: i64,
}

const fn exercise(
    name: &'static str,
    muscle_group: &'static str,
    guidance: Option<&'static str>,
) -> ExerciseSeed {
    ExerciseSeed { name, muscle_group, guidance }
}

/// Starter catalog. Guidance is kept to the lifts people ask about most.
pub const SEED_EXERCISES: &[ExerciseSeed] = &[
    exercise(
        "Bench Press",
        "chest",
        Some(
            "Compound chest movement. Strength: 3-5x3-5 heavy. Hypertrophy: 3-4x8-12. \
             Add 5 lbs when every set hits target reps. Retract shoulder blades, plant feet.",
        ),
    ),
    exercise("Incline Dumbbell Press", "chest", None),
    exercise("Push-up", "chest", None),
    exercise(
        "Dumbbell Flyes",
        "chest",
        Some("Chest isolation, stretch emphasis. 3-4x10-15 light to moderate. Keep elbows soft."),
    ),
    exercise("Pull-up", "back", None),
    exercise("Barbell Row", "back", None),
    exercise(
        "Deadlift",
        "back",
        Some(
            "Posterior chain compound. Strength: 1-3x3-5. Add 5-10 lbs while form holds. \
             Hinge at the hips, neutral spine, bar close to the legs.",
        ),
    ),
    exercise("Lat Pulldown", "back", None),
    exercise("Overhead Press", "shoulders", None),
    exercise("Lateral Raises", "shoulders", None),
    exercise("Face Pulls", "shoulders", None),
    exercise("Bicep Curls", "biceps", None),
    exercise("Hammer Curls", "biceps", None),
    exercise("Tricep Pushdowns", "triceps", None),
    exercise("Skull Crushers", "triceps", None),
    exercise(
        "Squat",
        "legs",
        Some(
            "Compound lower body. Strength: 3-5x3-5. Hypertrophy: 3-4x6-10. \
             Add 5 lbs when all sets hit target. Brace before descending, knees track toes.",
        ),
    ),
    exercise("Romanian Deadlift", "legs", None),
    exercise("Leg Press", "legs", None),
    exercise("Bulgarian Split Squats", "legs", None),
    exercise("Plank", "core", None),
    exercise("Hanging Leg Raises", "core", None),
    exercise("Crunches", "core", None),
    exercise(
        "Running",
        "cardio",
        Some("Most runs easy enough to hold a conversation. Add about 10% distance per week."),
    ),
    exercise("Cycling", "cardio", None),
    exercise("Rowing Machine", "cardio", None),
    exercise("Stretching", "flexibility", None),
];

pub const SEED_PRINCIPLES: &[PrincipleSeed] = &[
    PrincipleSeed {
        category: "progression",
        title: "Linear Progression",
        content: "Add weight every session when all sets hit target reps. Barbell compounds: +5 lbs. \
                  Isolation work: +2.5 lbs or add reps first.",
        priority: 1,
    },
    PrincipleSeed {
        category: "deload",
        title: "Deload Protocol",
        content: "Deload when stalled for 2+ sessions or after 4-6 hard weeks. Drop the weight 10%, \
                  keep sets and reps, and work back up over 2-3 sessions.",
        priority: 2,
    },
    PrincipleSeed {
        category: "rep_ranges",
        title: "Rep Ranges and Goals",
        content: "Strength: 3-5 reps, long rests. Hypertrophy: 8-12 reps, 60-90s rest. \
                  Endurance: 15-20+ reps, short rests.",
        priority: 3,
    },
    PrincipleSeed {
        category: "volume",
        title: "Weekly Volume Targets",
        content: "Aim for 10-20 hard sets per muscle group per week, spread over 2-3 sessions. \
                  Cut volume before frequency when recovery suffers.",
        priority: 4,
    },
    PrincipleSeed {
        category: "warmup",
        title: "Warm-up Sets",
        content: "Ramp up with 2-3 lighter sets before working sets. Warm-ups should prime the \
                  movement, not fatigue it.",
        priority: 5,
    },
    PrincipleSeed {
        category: "exercise_selection",
        title: "Exercise Selection",
        content: "Compounds first while fresh, isolation after. Balance push and pull roughly 1:1. \
                  Five or six exercises per session is plenty.",
        priority: 6,
    },
    PrincipleSeed {
        category: "stalling",
        title: "Breaking Through Plateaus",
        content: "Stalled? Eat and sleep more, deload 10% and rebuild, change the rep scheme, \
                  then try a variation or more frequency.",
        priority: 7,
    },
    PrincipleSeed {
        category: "new_exercise",
        title: "Starting a New Exercise",
        content: "Start at 50-60% of what you think you can do and spend 2-3 sessions on form \
                  before adding weight.",
        priority: 8,
    },
    PrincipleSeed {
        category: "cardio",
        title: "Cardio Programming",
        content: "2-3 cardio sessions a week alongside lifting, mostly low intensity, at most one \
                  HIIT session. Do cardio after lifting or on separate days.",
        priority: 9,
    },
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub exercises_created: usize,
    pub principles_created: usize,
}

/// Loads the starter catalog and principles. Safe to run repeatedly: exercises
/// are upserted by name and principles are only written into an empty table.
pub struct CatalogSeed;

impl CatalogSeed {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let exercises = SqlExerciseRepository::new(pool.clone());
        let principles = SqlPrincipleRepository::new(pool.clone());

        let before = exercises.list().await?.len();
        for seed in SEED_EXERCISES {
            exercises.upsert(seed.name, seed.muscle_group, seed.guidance).await?;
        }
        let exercises_created = exercises.list().await?.len().saturating_sub(before);

        let mut principles_created = 0;
        if principles.top_by_priority(1).await?.is_empty() {
            for seed in SEED_PRINCIPLES {
                principles.insert(seed.category, seed.title, seed.content, seed.priority).await?;
                principles_created += 1;
            }
        }

        Ok(SeedResult { exercises_created, principles_created })
    }
}
