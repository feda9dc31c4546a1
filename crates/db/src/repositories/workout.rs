use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;

use nunzio_core::domain::exercise::{Exercise, ExerciseId};
use nunzio_core::domain::workout::{
    CloneOverrides, ClonedSession, DeleteTarget, ExerciseHistory, HistorySession, Load, LoggedSet,
    NewSet, PersonalRecord, RecordMetric, SessionDetail, SessionId, SetId, UserId, WeightUnit,
    WorkoutSession, WorkoutSet, WorkoutTotals, KG_TO_LBS, MAX_REPEAT_TIMES,
};

use super::{decode, encode_timestamp, parse_rfc3339, RepositoryError, WorkoutRepository};
use crate::DbPool;

const SET_COLUMNS: &str = "s.id, s.session_id, s.exercise_id, s.set_number, s.reps, s.weight,
     s.weight_unit, s.duration_minutes, s.distance, s.raw_exercise_name, s.notes";

pub struct SqlWorkoutRepository {
    pool: DbPool,
}

impl SqlWorkoutRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_session(row: &SqliteRow) -> Result<WorkoutSession, RepositoryError> {
    let performed_at: String = decode(row, "performed_at")?;
    Ok(WorkoutSession {
        id: SessionId(decode(row, "id")?),
        user_id: UserId(decode(row, "user_id")?),
        performed_at: parse_rfc3339("session performed_at", &performed_at)?,
        notes: decode(row, "notes")?,
    })
}

fn decode_load(weight: Option<f64>, unit: Option<String>) -> Result<Option<Load>, RepositoryError> {
    match (weight, unit) {
        (None, _) => Ok(None),
        (Some(amount), Some(unit)) => WeightUnit::parse(&unit)
            .map(|unit| Some(Load::new(amount, unit)))
            .ok_or_else(|| RepositoryError::Decode(format!("invalid weight unit '{unit}'"))),
        (Some(_), None) => Err(RepositoryError::Decode("weight stored without a unit".to_string())),
    }
}

fn decode_count(field: &str, value: Option<i64>) -> Result<Option<u32>, RepositoryError> {
    value
        .map(|raw| {
            u32::try_from(raw)
                .map_err(|_| RepositoryError::Decode(format!("invalid {field} value {raw}")))
        })
        .transpose()
}

fn row_to_set(row: &SqliteRow) -> Result<WorkoutSet, RepositoryError> {
    let set_number = decode_count("set_number", Some(decode(row, "set_number")?))?.unwrap_or(1);
    Ok(WorkoutSet {
        id: SetId(decode(row, "id")?),
        session_id: SessionId(decode(row, "session_id")?),
        exercise_id: ExerciseId(decode(row, "exercise_id")?),
        set_number,
        reps: decode_count("reps", decode(row, "reps")?)?,
        load: decode_load(decode(row, "weight")?, decode(row, "weight_unit")?)?,
        duration_minutes: decode(row, "duration_minutes")?,
        distance: decode(row, "distance")?,
        raw_exercise_name: decode(row, "raw_exercise_name")?,
        notes: decode(row, "notes")?,
    })
}

fn row_to_logged_set(row: &SqliteRow) -> Result<LoggedSet, RepositoryError> {
    Ok(LoggedSet {
        set: row_to_set(row)?,
        exercise_name: decode(row, "exercise_name")?,
        muscle_group: decode(row, "muscle_group")?,
    })
}

async fn fetch_session(
    conn: &mut SqliteConnection,
    user_id: &UserId,
    session_id: i64,
) -> Result<Option<WorkoutSession>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, user_id, performed_at, notes FROM workout_sessions WHERE id = ? AND user_id = ?",
    )
    .bind(session_id)
    .bind(&user_id.0)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(row_to_session).transpose()
}

async fn latest_session_id(
    conn: &mut SqliteConnection,
    user_id: &UserId,
) -> Result<Option<i64>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id FROM workout_sessions
         WHERE user_id = ?
         ORDER BY performed_at DESC, id DESC
         LIMIT 1",
    )
    .bind(&user_id.0)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(|row| decode::<i64>(row, "id")).transpose()
}

async fn load_detail(
    conn: &mut SqliteConnection,
    user_id: &UserId,
    session_id: i64,
) -> Result<Option<SessionDetail>, RepositoryError> {
    let Some(session) = fetch_session(conn, user_id, session_id).await? else {
        return Ok(None);
    };

    let rows = sqlx::query(&format!(
        "SELECT {SET_COLUMNS}, e.name AS exercise_name, e.muscle_group
         FROM workout_sets s
         JOIN exercises e ON e.id = s.exercise_id
         WHERE s.session_id = ?
         ORDER BY s.id ASC"
    ))
    .bind(session_id)
    .fetch_all(&mut *conn)
    .await?;

    let sets = rows.iter().map(row_to_logged_set).collect::<Result<Vec<_>, _>>()?;
    Ok(Some(SessionDetail { session, sets }))
}

async fn insert_session(
    conn: &mut SqliteConnection,
    user_id: &UserId,
    performed_at: DateTime<Utc>,
    notes: Option<&str>,
) -> Result<i64, RepositoryError> {
    let id = sqlx::query(
        "INSERT INTO workout_sessions (user_id, performed_at, notes) VALUES (?, ?, ?)",
    )
    .bind(&user_id.0)
    .bind(encode_timestamp(performed_at))
    .bind(notes)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    Ok(id)
}

async fn insert_set(
    conn: &mut SqliteConnection,
    session_id: i64,
    set: &NewSet,
) -> Result<(), RepositoryError> {
    if set.raw_exercise_name.trim().is_empty() {
        return Err(RepositoryError::Invalid("raw exercise name must be recorded".to_string()));
    }

    sqlx::query(
        "INSERT INTO workout_sets
            (session_id, exercise_id, set_number, reps, weight, weight_unit,
             duration_minutes, distance, raw_exercise_name, notes)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(session_id)
    .bind(set.exercise_id.0)
    .bind(i64::from(set.set_number.max(1)))
    .bind(set.reps.map(i64::from))
    .bind(set.load.map(|load| load.amount))
    .bind(set.load.map(|load| load.unit.as_str()))
    .bind(set.duration_minutes)
    .bind(set.distance)
    .bind(&set.raw_exercise_name)
    .bind(set.notes.as_deref())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// New set list for a cloned session. Each extra round continues the set
/// numbering of its exercise.
fn cloned_sets(
    source: &SessionDetail,
    overrides: &CloneOverrides,
) -> Result<Vec<NewSet>, RepositoryError> {
    let rounds = overrides.times.clamp(1, MAX_REPEAT_TIMES);
    let mut highest: HashMap<ExerciseId, u32> = HashMap::new();
    for logged in &source.sets {
        let entry = highest.entry(logged.set.exercise_id).or_default();
        *entry = (*entry).max(logged.set.set_number);
    }

    let overflow = || RepositoryError::Invalid("cloned set number out of range".to_string());
    let mut sets = Vec::with_capacity(source.sets.len().saturating_mul(rounds as usize));
    for round in 0..rounds {
        for logged in &source.sets {
            let set = &logged.set;
            let offset = highest
                .get(&set.exercise_id)
                .copied()
                .unwrap_or(0)
                .checked_mul(round)
                .ok_or_else(overflow)?;
            let load = match overrides.load {
                Some(load) if !set.is_cardio() => Some(load),
                _ => set.load,
            };
            sets.push(NewSet {
                exercise_id: set.exercise_id,
                set_number: set.set_number.checked_add(offset).ok_or_else(overflow)?,
                reps: set.reps,
                load,
                duration_minutes: set.duration_minutes,
                distance: set.distance,
                raw_exercise_name: set.raw_exercise_name.clone(),
                notes: set.notes.clone(),
            });
        }
    }
    Ok(sets)
}

#[async_trait::async_trait]
impl WorkoutRepository for SqlWorkoutRepository {
    async fn create_session_with_sets(
        &self,
        user_id: &UserId,
        performed_at: DateTime<Utc>,
        notes: Option<&str>,
        sets: &[NewSet],
    ) -> Result<SessionDetail, RepositoryError> {
        if sets.is_empty() {
            return Err(RepositoryError::Invalid("a session needs at least one set".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        let session_id = insert_session(&mut tx, user_id, performed_at, notes).await?;
        for set in sets {
            insert_set(&mut tx, session_id, set).await?;
        }
        let detail = load_detail(&mut tx, user_id, session_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("session {session_id}")))?;
        tx.commit().await?;

        Ok(detail)
    }

    async fn session_detail(
        &self,
        user_id: &UserId,
        session_id: SessionId,
    ) -> Result<Option<SessionDetail>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_detail(&mut conn, user_id, session_id.0).await
    }

    async fn recent_sessions(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<SessionDetail>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(
            "SELECT id FROM workout_sessions
             WHERE user_id = ?
             ORDER BY performed_at DESC, id DESC
             LIMIT ?",
        )
        .bind(&user_id.0)
        .bind(i64::from(limit))
        .fetch_all(&mut *conn)
        .await?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = decode(row, "id")?;
            if let Some(detail) = load_detail(&mut conn, user_id, id).await? {
                sessions.push(detail);
            }
        }
        Ok(sessions)
    }

    async fn history_for_exercise(
        &self,
        user_id: &UserId,
        exercise: &Exercise,
        limit: u32,
    ) -> Result<ExerciseHistory, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(&format!(
            "SELECT {SET_COLUMNS}, ws.performed_at
             FROM workout_sets s
             JOIN workout_sessions ws ON ws.id = s.session_id
             WHERE ws.user_id = ? AND s.exercise_id = ?
             ORDER BY ws.performed_at DESC, ws.id DESC, s.set_number ASC, s.id ASC
             LIMIT ?"
        ))
        .bind(&user_id.0)
        .bind(exercise.id.0)
        .bind(i64::from(limit))
        .fetch_all(&mut *conn)
        .await?;

        let mut sessions: Vec<HistorySession> = Vec::new();
        for row in &rows {
            let set = row_to_set(row)?;
            let performed_at: String = decode(row, "performed_at")?;
            match sessions.last_mut() {
                Some(current) if current.session_id == set.session_id => current.sets.push(set),
                _ => sessions.push(HistorySession {
                    session_id: set.session_id,
                    performed_at: parse_rfc3339("session performed_at", &performed_at)?,
                    sets: vec![set],
                }),
            }
        }

        // Records span the full history, not just the window above.
        let record_query = if exercise.is_cardio() {
            "SELECT s.id, s.session_id, s.reps, s.weight, s.weight_unit, s.distance, ws.performed_at
             FROM workout_sets s
             JOIN workout_sessions ws ON ws.id = s.session_id
             WHERE ws.user_id = ? AND s.exercise_id = ? AND s.distance IS NOT NULL
             ORDER BY s.distance DESC, s.id ASC
             LIMIT 1"
        } else {
            "SELECT s.id, s.session_id, s.reps, s.weight, s.weight_unit, s.distance, ws.performed_at
             FROM workout_sets s
             JOIN workout_sessions ws ON ws.id = s.session_id
             WHERE ws.user_id = ? AND s.exercise_id = ? AND s.weight IS NOT NULL
             ORDER BY s.weight * (CASE WHEN s.weight_unit = 'kg' THEN ? ELSE 1.0 END) DESC, s.id ASC
             LIMIT 1"
        };
        let mut query = sqlx::query(record_query).bind(&user_id.0).bind(exercise.id.0);
        if !exercise.is_cardio() {
            query = query.bind(KG_TO_LBS);
        }
        let record_row = query.fetch_optional(&mut *conn).await?;

        let personal_record = match record_row {
            Some(row) => {
                let metric = if exercise.is_cardio() {
                    let distance: Option<f64> = decode(&row, "distance")?;
                    distance.map(RecordMetric::Distance)
                } else {
                    decode_load(decode(&row, "weight")?, decode(&row, "weight_unit")?)?
                        .map(RecordMetric::Weight)
                };
                let performed_at: String = decode(&row, "performed_at")?;
                match metric {
                    Some(metric) => Some(PersonalRecord {
                        set_id: SetId(decode(&row, "id")?),
                        session_id: SessionId(decode(&row, "session_id")?),
                        performed_at: parse_rfc3339("session performed_at", &performed_at)?,
                        metric,
                        reps: decode_count("reps", decode(&row, "reps")?)?,
                    }),
                    None => None,
                }
            }
            None => None,
        };

        Ok(ExerciseHistory { exercise: exercise.clone(), sessions, personal_record })
    }

    async fn delete_session(
        &self,
        user_id: &UserId,
        target: DeleteTarget,
    ) -> Result<SessionDetail, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let session_id = match target {
            DeleteTarget::Last => latest_session_id(&mut tx, user_id).await?,
            DeleteTarget::Session(id) => {
                fetch_session(&mut tx, user_id, id.0).await?.map(|session| session.id.0)
            }
        };
        let Some(session_id) = session_id else {
            return Err(RepositoryError::NotFound(match target {
                DeleteTarget::Last => "no sessions to delete".to_string(),
                DeleteTarget::Session(id) => format!("session {id}"),
            }));
        };

        let detail = load_detail(&mut tx, user_id, session_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("session {session_id}")))?;

        sqlx::query("DELETE FROM workout_sets WHERE session_id = ?")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM workout_sessions WHERE id = ? AND user_id = ?")
            .bind(session_id)
            .bind(&user_id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(detail)
    }

    async fn clone_latest_session(
        &self,
        user_id: &UserId,
        overrides: &CloneOverrides,
        performed_at: DateTime<Utc>,
    ) -> Result<ClonedSession, RepositoryError> {
        if overrides.times > MAX_REPEAT_TIMES {
            return Err(RepositoryError::Invalid(format!(
                "repeat count {} exceeds the limit of {MAX_REPEAT_TIMES}",
                overrides.times
            )));
        }

        let mut tx = self.pool.begin().await?;

        let source_id = latest_session_id(&mut tx, user_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("no sessions to repeat".to_string()))?;
        let source = load_detail(&mut tx, user_id, source_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("session {source_id}")))?;

        let notes = overrides.note.as_deref().or(source.session.notes.as_deref());
        let new_id = insert_session(&mut tx, user_id, performed_at, notes).await?;
        for set in cloned_sets(&source, overrides)? {
            insert_set(&mut tx, new_id, &set).await?;
        }
        let session = load_detail(&mut tx, user_id, new_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("session {new_id}")))?;

        tx.commit().await?;
        Ok(ClonedSession { source_session_id: SessionId(source_id), session })
    }

    async fn totals(&self, user_id: &UserId) -> Result<WorkoutTotals, RepositoryError> {
        let sessions_row =
            sqlx::query("SELECT COUNT(*) AS sessions FROM workout_sessions WHERE user_id = ?")
                .bind(&user_id.0)
                .fetch_one(&self.pool)
                .await?;

        let sets_row = sqlx::query(
            "SELECT COUNT(s.id) AS sets,
                    COALESCE(SUM(
                        CASE WHEN s.weight IS NOT NULL AND s.reps IS NOT NULL
                             THEN s.weight * s.reps
                                  * (CASE WHEN s.weight_unit = 'kg' THEN ? ELSE 1.0 END)
                             ELSE 0.0 END
                    ), 0.0) AS volume_lbs
             FROM workout_sets s
             JOIN workout_sessions ws ON ws.id = s.session_id
             WHERE ws.user_id = ?",
        )
        .bind(KG_TO_LBS)
        .bind(&user_id.0)
        .fetch_one(&self.pool)
        .await?;

        let sessions: i64 = decode(&sessions_row, "sessions")?;
        let sets: i64 = decode(&sets_row, "sets")?;
        Ok(WorkoutTotals {
            sessions: u64::try_from(sessions).unwrap_or_default(),
            sets: u64::try_from(sets).unwrap_or_default(),
            volume_lbs: decode(&sets_row, "volume_lbs")?,
        })
    }

    async fn session_times_since(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT performed_at FROM workout_sessions
             WHERE user_id = ? AND performed_at >= ?
             ORDER BY performed_at ASC",
        )
        .bind(&user_id.0)
        .bind(encode_timestamp(since))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let raw: String = decode(row, "performed_at")?;
                parse_rfc3339("session performed_at", &raw)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use nunzio_core::domain::exercise::Exercise;
    use nunzio_core::domain::workout::{
        CloneOverrides, DeleteTarget, Load, NewSet, RecordMetric, SessionId, UserId, WeightUnit,
        MAX_REPEAT_TIMES,
    };

    use super::SqlWorkoutRepository;
    use crate::repositories::{
        ExerciseRepository, RepositoryError, SqlExerciseRepository, WorkoutRepository,
    };
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> (DbPool, SqlWorkoutRepository, Exercise, Exercise) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let exercises = SqlExerciseRepository::new(pool.clone());
        let bench = exercises.upsert("Bench Press", "chest", None).await.expect("bench");
        let run = exercises.upsert("Running", "cardio", None).await.expect("running");
        (pool.clone(), SqlWorkoutRepository::new(pool), bench, run)
    }

    fn lift(exercise: &Exercise, set_number: u32, reps: u32, lbs: f64) -> NewSet {
        NewSet {
            exercise_id: exercise.id,
            set_number,
            reps: Some(reps),
            load: Some(Load::lbs(lbs)),
            duration_minutes: None,
            distance: None,
            raw_exercise_name: exercise.name.to_lowercase(),
            notes: None,
        }
    }

    fn jog(exercise: &Exercise, minutes: f64, miles: f64) -> NewSet {
        NewSet {
            exercise_id: exercise.id,
            set_number: 1,
            reps: None,
            load: None,
            duration_minutes: Some(minutes),
            distance: Some(miles),
            raw_exercise_name: "run".to_string(),
            notes: None,
        }
    }

    async fn set_count(pool: &DbPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM workout_sets")
            .fetch_one(pool)
            .await
            .expect("count sets")
    }

    #[tokio::test]
    async fn session_and_sets_are_written_together() {
        let (_, repo, bench, _) = setup().await;
        let user = UserId::new("alice");

        let detail = repo
            .create_session_with_sets(
                &user,
                Utc::now(),
                Some("felt strong"),
                &[lift(&bench, 1, 10, 135.0), lift(&bench, 2, 8, 145.0)],
            )
            .await
            .expect("create");

        assert_eq!(detail.sets.len(), 2);
        assert_eq!(detail.session.notes.as_deref(), Some("felt strong"));
        assert_eq!(detail.sets[0].exercise_name, "Bench Press");
        assert_eq!(detail.sets[0].set.raw_exercise_name, "bench press");
        assert_eq!(detail.sets[1].set.load, Some(Load::lbs(145.0)));
    }

    #[tokio::test]
    async fn created_sets_come_back_in_the_order_given() {
        let (_, repo, bench, run) = setup().await;
        let detail = repo
            .create_session_with_sets(
                &UserId::new("alice"),
                Utc::now(),
                None,
                &[lift(&bench, 3, 6, 155.0), jog(&run, 20.0, 2.0), lift(&bench, 1, 10, 135.0)],
            )
            .await
            .expect("create");

        let order: Vec<(u32, bool)> =
            detail.sets.iter().map(|logged| (logged.set.set_number, logged.set.is_cardio())).collect();
        assert_eq!(order, vec![(3, false), (1, true), (1, false)]);
    }

    #[tokio::test]
    async fn failed_set_insert_rolls_back_the_session() {
        let (pool, repo, bench, _) = setup().await;
        let user = UserId::new("alice");
        let mut orphan = lift(&bench, 2, 8, 145.0);
        orphan.exercise_id = nunzio_core::domain::exercise::ExerciseId(9_999);

        let result = repo
            .create_session_with_sets(&user, Utc::now(), None, &[lift(&bench, 1, 10, 135.0), orphan])
            .await;

        assert!(result.is_err());
        assert!(repo.recent_sessions(&user, 10).await.expect("recent").is_empty());
        assert_eq!(set_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn recent_sessions_are_newest_first() {
        let (_, repo, bench, _) = setup().await;
        let user = UserId::new("alice");
        let now = Utc::now();
        let older = repo
            .create_session_with_sets(&user, now - Duration::days(2), None, &[lift(&bench, 1, 10, 135.0)])
            .await
            .expect("older");
        let newer = repo
            .create_session_with_sets(&user, now, None, &[lift(&bench, 1, 10, 140.0)])
            .await
            .expect("newer");

        let ids: Vec<SessionId> = repo
            .recent_sessions(&user, 5)
            .await
            .expect("recent")
            .into_iter()
            .map(|detail| detail.session.id)
            .collect();
        assert_eq!(ids, vec![newer.session.id, older.session.id]);
    }

    #[tokio::test]
    async fn delete_last_removes_newest_session_and_its_sets() {
        let (pool, repo, bench, _) = setup().await;
        let user = UserId::new("alice");
        let now = Utc::now();
        let s1 = repo
            .create_session_with_sets(&user, now - Duration::hours(3), None, &[lift(&bench, 1, 10, 135.0)])
            .await
            .expect("s1");
        let s2 = repo
            .create_session_with_sets(
                &user,
                now,
                None,
                &[lift(&bench, 1, 10, 135.0), lift(&bench, 2, 10, 135.0)],
            )
            .await
            .expect("s2");

        let deleted = repo.delete_session(&user, DeleteTarget::Last).await.expect("delete");
        assert_eq!(deleted.session.id, s2.session.id);
        assert_eq!(set_count(&pool).await, 1);

        let remaining = repo.recent_sessions(&user, 10).await.expect("recent");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].session.id, s1.session.id);

        let totals = repo.totals(&user).await.expect("totals");
        assert_eq!(totals.sessions, 1);
        assert_eq!(totals.sets, 1);
    }

    #[tokio::test]
    async fn missing_or_foreign_sessions_are_not_found() {
        let (pool, repo, bench, _) = setup().await;
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let bobs = repo
            .create_session_with_sets(&bob, Utc::now(), None, &[lift(&bench, 1, 5, 225.0)])
            .await
            .expect("bob session");

        let missing = repo.delete_session(&alice, DeleteTarget::Session(SessionId(4_242))).await;
        assert!(matches!(missing, Err(RepositoryError::NotFound(_))));

        let foreign = repo.delete_session(&alice, DeleteTarget::Session(bobs.session.id)).await;
        assert!(matches!(foreign, Err(RepositoryError::NotFound(_))));

        let nothing = repo.delete_session(&alice, DeleteTarget::Last).await;
        assert!(matches!(nothing, Err(RepositoryError::NotFound(_))));

        assert!(repo.session_detail(&alice, bobs.session.id).await.expect("detail").is_none());
        assert_eq!(set_count(&pool).await, 1);
        assert_eq!(repo.recent_sessions(&bob, 10).await.expect("recent").len(), 1);
    }

    #[tokio::test]
    async fn clone_copies_latest_session_with_fresh_identity() {
        let (_, repo, bench, _) = setup().await;
        let user = UserId::new("alice");
        let then = Utc::now() - Duration::days(1);
        let source = repo
            .create_session_with_sets(
                &user,
                then,
                Some("pause reps"),
                &[lift(&bench, 1, 10, 135.0), lift(&bench, 2, 8, 135.0)],
            )
            .await
            .expect("source");

        let now = Utc::now();
        let cloned = repo
            .clone_latest_session(&user, &CloneOverrides::default(), now)
            .await
            .expect("clone");

        assert_eq!(cloned.source_session_id, source.session.id);
        assert_ne!(cloned.session.session.id, source.session.id);
        assert!(cloned.session.session.performed_at > source.session.performed_at);
        assert_eq!(cloned.session.session.notes.as_deref(), Some("pause reps"));
        assert_eq!(cloned.session.sets.len(), 2);
        for (copy, original) in cloned.session.sets.iter().zip(source.sets.iter()) {
            assert_eq!(copy.set.reps, original.set.reps);
            assert_eq!(copy.set.load, original.set.load);
            assert_eq!(copy.set.set_number, original.set.set_number);
            assert_ne!(copy.set.id, original.set.id);
        }
    }

    #[tokio::test]
    async fn clone_applies_weight_times_and_note_overrides() {
        let (_, repo, bench, run) = setup().await;
        let user = UserId::new("alice");
        repo.create_session_with_sets(
            &user,
            Utc::now() - Duration::days(1),
            Some("old note"),
            &[lift(&bench, 1, 10, 30.0), lift(&bench, 2, 10, 30.0), jog(&run, 20.0, 2.0)],
        )
        .await
        .expect("source");

        let overrides = CloneOverrides {
            load: Some(Load::new(20.0, WeightUnit::Kg)),
            times: 2,
            note: Some("elbow feels better".to_string()),
        };
        let cloned =
            repo.clone_latest_session(&user, &overrides, Utc::now()).await.expect("clone");

        let sets = &cloned.session.sets;
        assert_eq!(sets.len(), 6);
        assert_eq!(cloned.session.session.notes.as_deref(), Some("elbow feels better"));

        let bench_numbers: Vec<u32> = sets
            .iter()
            .filter(|logged| logged.set.exercise_id == bench.id)
            .map(|logged| logged.set.set_number)
            .collect();
        assert_eq!(bench_numbers, vec![1, 2, 3, 4]);
        assert!(sets
            .iter()
            .filter(|logged| !logged.set.is_cardio())
            .all(|logged| logged.set.load == Some(Load::new(20.0, WeightUnit::Kg))));
        assert!(sets.iter().filter(|logged| logged.set.is_cardio()).all(|logged| logged.set.load.is_none()));
    }

    #[tokio::test]
    async fn clone_rejects_oversized_repeat_counts_without_writing() {
        let (_, repo, bench, _) = setup().await;
        let user = UserId::new("alice");
        repo.create_session_with_sets(&user, Utc::now(), None, &[lift(&bench, 1, 10, 135.0)])
            .await
            .expect("source");

        for times in [MAX_REPEAT_TIMES + 1, u32::MAX] {
            let overrides = CloneOverrides { times, ..CloneOverrides::default() };
            let result = repo.clone_latest_session(&user, &overrides, Utc::now()).await;
            assert!(matches!(result, Err(RepositoryError::Invalid(_))), "times = {times}");
        }

        let at_limit = CloneOverrides { times: MAX_REPEAT_TIMES, ..CloneOverrides::default() };
        let cloned = repo.clone_latest_session(&user, &at_limit, Utc::now()).await.expect("clone");
        assert_eq!(cloned.session.sets.len(), MAX_REPEAT_TIMES as usize);
        assert_eq!(repo.totals(&user).await.expect("totals").sessions, 2);
    }

    #[tokio::test]
    async fn clone_set_number_overflow_rolls_back() {
        let (_, repo, bench, _) = setup().await;
        let user = UserId::new("alice");
        repo.create_session_with_sets(&user, Utc::now(), None, &[lift(&bench, u32::MAX, 10, 135.0)])
            .await
            .expect("source");

        let overrides = CloneOverrides { times: 2, ..CloneOverrides::default() };
        let result = repo.clone_latest_session(&user, &overrides, Utc::now()).await;

        assert!(matches!(result, Err(RepositoryError::Invalid(_))));
        assert_eq!(repo.totals(&user).await.expect("totals").sessions, 1);
    }

    #[tokio::test]
    async fn clone_without_history_is_not_found() {
        let (_, repo, _, _) = setup().await;
        let result = repo
            .clone_latest_session(&UserId::new("nobody"), &CloneOverrides::default(), Utc::now())
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn history_groups_by_session_and_records_span_all_time() {
        let (_, repo, bench, _) = setup().await;
        let user = UserId::new("alice");
        let now = Utc::now();
        repo.create_session_with_sets(&user, now - Duration::days(30), None, &[lift(&bench, 1, 3, 250.0)])
            .await
            .expect("old heavy");
        for day in (1..=6).rev() {
            repo.create_session_with_sets(
                &user,
                now - Duration::days(day),
                None,
                &[lift(&bench, 1, 10, 135.0), lift(&bench, 2, 8, 145.0)],
            )
            .await
            .expect("recent");
        }

        let history = repo.history_for_exercise(&user, &bench, 10).await.expect("history");
        let total_sets: usize = history.sessions.iter().map(|session| session.sets.len()).sum();
        assert_eq!(total_sets, 10);
        assert_eq!(history.sessions.len(), 5);
        assert!(history.sessions.windows(2).all(|pair| pair[0].performed_at > pair[1].performed_at));
        assert_eq!(history.sessions[0].sets[0].set_number, 1);

        let record = history.personal_record.expect("record");
        assert_eq!(record.metric, RecordMetric::Weight(Load::lbs(250.0)));
        assert!(history.sessions.iter().all(|session| session.session_id != record.session_id));
    }

    #[tokio::test]
    async fn cardio_records_use_distance_and_kg_is_converted_for_strength() {
        let (_, repo, bench, run) = setup().await;
        let user = UserId::new("alice");
        let mut kilos = lift(&bench, 1, 5, 0.0);
        kilos.load = Some(Load::new(100.0, WeightUnit::Kg));
        repo.create_session_with_sets(
            &user,
            Utc::now(),
            None,
            &[lift(&bench, 1, 5, 200.0), kilos, jog(&run, 30.0, 3.0), jog(&run, 25.0, 3.5)],
        )
        .await
        .expect("session");

        let bench_history = repo.history_for_exercise(&user, &bench, 10).await.expect("bench");
        assert_eq!(
            bench_history.personal_record.map(|record| record.metric),
            Some(RecordMetric::Weight(Load::new(100.0, WeightUnit::Kg)))
        );

        let run_history = repo.history_for_exercise(&user, &run, 10).await.expect("run");
        assert_eq!(
            run_history.personal_record.map(|record| record.metric),
            Some(RecordMetric::Distance(3.5))
        );
    }

    #[tokio::test]
    async fn totals_and_times_are_scoped_to_the_user() {
        let (_, repo, bench, _) = setup().await;
        let alice = UserId::new("alice");
        let now = Utc::now();
        let mut kilos = lift(&bench, 2, 10, 0.0);
        kilos.load = Some(Load::new(100.0, WeightUnit::Kg));
        repo.create_session_with_sets(&alice, now, None, &[lift(&bench, 1, 10, 100.0), kilos])
            .await
            .expect("alice");
        repo.create_session_with_sets(&alice, now - Duration::days(120), None, &[lift(&bench, 1, 1, 1.0)])
            .await
            .expect("alice old");
        repo.create_session_with_sets(&UserId::new("bob"), now, None, &[lift(&bench, 1, 10, 500.0)])
            .await
            .expect("bob");

        let totals = repo.totals(&alice).await.expect("totals");
        assert_eq!(totals.sessions, 2);
        assert_eq!(totals.sets, 3);
        assert!((totals.volume_lbs - (1000.0 + 2204.62 + 1.0)).abs() < 1e-6);

        let times = repo
            .session_times_since(&alice, now - Duration::days(90))
            .await
            .expect("times");
        assert_eq!(times.len(), 1);
    }
}
