//! Relational store over an sqlx SQLite pool.
//!
//! Connections are checked out of the pool per operation and go back on
//! drop. Writes run inside a `Transaction`, which rolls back when dropped
//! without `commit()`, so an early `?` return never leaves a partial write.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, error, info, warn};

use super::schema::SCHEMA;
use super::{clean_registration_name, StoreError, TournamentStore};
use crate::config::AppConfig;
use crate::models::{Player, PlayerId, Standing};

/// Attach the running operation to sqlx errors.
trait SqlxResultExt<T> {
    fn during(self, operation: &'static str) -> Result<T, StoreError>;
}

impl<T> SqlxResultExt<T> for Result<T, sqlx::Error> {
    fn during(self, operation: &'static str) -> Result<T, StoreError> {
        self.map_err(|e| StoreError::from_sqlx(operation, e))
    }
}

/// Player/match store backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open a pool for `config.database_url`, creating the schema if configured to.
    pub async fn connect(config: &AppConfig) -> Result<Self, StoreError> {
        if !config.database_url.starts_with("sqlite:") {
            return Err(StoreError::Connection {
                operation: "connect",
                source: sqlx::Error::Configuration(
                    format!("unsupported database URL {:?}", config.database_url).into(),
                ),
            });
        }

        let timeout = Duration::from_secs(config.store.acquire_timeout_seconds);
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .during("connect")?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(timeout);

        // Any failure to open the database means the store is unreachable.
        let pool = SqlitePoolOptions::new()
            .max_connections(config.store.max_connections)
            .acquire_timeout(timeout)
            .connect_with(options)
            .await
            .map_err(|source| StoreError::Connection {
                operation: "connect",
                source,
            })?;

        info!("Connected to {}", config.database_url);

        let store = Self::from_pool(pool);
        if config.store.create_schema {
            store.create_schema().await?;
        }
        Ok(store)
    }

    /// Wrap an existing pool. The schema is assumed to exist.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the `player` and `match` tables if they do not exist yet.
    pub async fn create_schema(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.during("create_schema")?;
        for &statement in SCHEMA {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .during("create_schema")?;
        }
        tx.commit().await.during("create_schema")?;
        debug!("Schema ready");
        Ok(())
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl TournamentStore for SqliteStore {
    async fn reset_matches(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.during("reset_matches")?;

        let deleted = sqlx::query(r#"DELETE FROM "match""#)
            .execute(&mut *tx)
            .await
            .during("reset_matches")?
            .rows_affected();
        sqlx::query("UPDATE player SET wins = 0, matches = 0")
            .execute(&mut *tx)
            .await
            .during("reset_matches")?;

        tx.commit().await.during("reset_matches")?;
        info!("Deleted {} matches and reset counters", deleted);
        Ok(())
    }

    async fn reset_players(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.during("reset_players")?;

        sqlx::query(r#"DELETE FROM "match""#)
            .execute(&mut *tx)
            .await
            .during("reset_players")?;
        let deleted = sqlx::query("DELETE FROM player")
            .execute(&mut *tx)
            .await
            .during("reset_players")?
            .rows_affected();

        tx.commit().await.during("reset_players")?;
        info!("Deleted {} players", deleted);
        Ok(())
    }

    async fn count_players(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM player")
            .fetch_one(&self.pool)
            .await
            .during("count_players")?;
        Ok(count as usize)
    }

    async fn count_matches(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "match""#)
            .fetch_one(&self.pool)
            .await
            .during("count_matches")?;
        Ok(count as usize)
    }

    async fn register_player(&self, name: &str) -> Result<PlayerId, StoreError> {
        let clean = clean_registration_name(name)?;

        let id: PlayerId = sqlx::query_scalar("INSERT INTO player (name) VALUES (?) RETURNING id")
            .bind(&clean)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match StoreError::from_sqlx("register_player", e) {
                conn @ StoreError::Connection { .. } => conn,
                other => {
                    error!("Could not register player {:?}: {}", name, other);
                    StoreError::Registration {
                        name: name.to_string(),
                        reason: other.to_string(),
                    }
                }
            })?;

        info!("Registered player {} as {:?}", id, clean);
        Ok(id)
    }

    async fn report_match(&self, winner: PlayerId, loser: PlayerId) -> Result<(), StoreError> {
        if winner == loser {
            warn!("Rejected match of player {} against themselves", winner);
            return Err(StoreError::InvalidMatch {
                winner,
                loser,
                reason: "a player cannot play against themselves".to_string(),
            });
        }

        // Writes come first so the write lock is taken under the busy timeout.
        // Zero rows updated means an unknown id; dropping `tx` rolls back.
        let mut tx = self.pool.begin().await.during("report_match")?;

        let updates = [
            (
                winner,
                "UPDATE player SET wins = wins + 1, matches = matches + 1 WHERE id = ?",
            ),
            (loser, "UPDATE player SET matches = matches + 1 WHERE id = ?"),
        ];
        for (id, statement) in updates {
            let updated = sqlx::query(statement)
                .bind(id)
                .execute(&mut *tx)
                .await
                .during("report_match")?
                .rows_affected();
            if updated == 0 {
                warn!("Rejected match {} over {}: player {} not registered", winner, loser, id);
                return Err(StoreError::InvalidMatch {
                    winner,
                    loser,
                    reason: format!("player {} is not registered", id),
                });
            }
        }

        sqlx::query(r#"INSERT INTO "match" (winner, loser) VALUES (?, ?)"#)
            .bind(winner)
            .bind(loser)
            .execute(&mut *tx)
            .await
            .during("report_match")?;

        tx.commit().await.during("report_match")?;
        info!("Recorded match: {} beat {}", winner, loser);
        Ok(())
    }

    async fn get_player(&self, id: PlayerId) -> Result<Player, StoreError> {
        sqlx::query_as::<_, Player>("SELECT id, name, wins, matches FROM player WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .during("get_player")?
            .ok_or(StoreError::NotFound {
                operation: "get_player",
                id,
            })
    }

    async fn get_score(&self, id: PlayerId) -> Result<u32, StoreError> {
        sqlx::query_scalar::<_, u32>("SELECT wins FROM player WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .during("get_score")?
            .ok_or(StoreError::NotFound {
                operation: "get_score",
                id,
            })
    }

    async fn get_matches(&self, id: PlayerId) -> Result<u32, StoreError> {
        sqlx::query_scalar::<_, u32>("SELECT matches FROM player WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .during("get_matches")?
            .ok_or(StoreError::NotFound {
                operation: "get_matches",
                id,
            })
    }

    async fn get_players(&self) -> Result<BTreeMap<PlayerId, String>, StoreError> {
        let rows = sqlx::query_as::<_, (PlayerId, String)>("SELECT id, name FROM player ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .during("get_players")?;
        Ok(rows.into_iter().collect())
    }

    async fn player_standings(&self) -> Result<Vec<Standing>, StoreError> {
        let standings = sqlx::query_as::<_, Standing>(
            "SELECT id, name, wins, matches FROM player ORDER BY wins DESC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .during("player_standings")?;

        debug!("Loaded standings for {} players", standings.len());
        Ok(standings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    async fn test_store() -> (SqliteStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("tournament.db").display());
        let store = SqliteStore::connect(&AppConfig::with_database_url(url))
            .await
            .unwrap();
        (store, dir)
    }

    async fn register_all(store: &SqliteStore, names: &[&str]) -> Vec<PlayerId> {
        let mut ids = Vec::new();
        for name in names {
            ids.push(store.register_player(name).await.unwrap());
        }
        ids
    }

    #[tokio::test]
    async fn test_count_after_registration_and_reset() {
        let (store, _dir) = test_store().await;
        assert_eq!(store.count_players().await.unwrap(), 0);

        register_all(&store, &["Markov Chaney", "Joe Malik", "Mao Tsu-hsi"]).await;
        assert_eq!(store.count_players().await.unwrap(), 3);

        store.reset_players().await.unwrap();
        assert_eq!(store.count_players().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_register_assigns_unique_increasing_ids() {
        let (store, _dir) = test_store().await;
        let ids = register_all(&store, &["Ada", "Ada", "Grace"]).await;

        assert!(ids.windows(2).all(|w| w[0] < w[1]));

        let player = store.get_player(ids[1]).await.unwrap();
        assert_eq!(player, Player::new(ids[1], "Ada"));
    }

    #[tokio::test]
    async fn test_register_stores_sanitized_name() {
        let (store, _dir) = test_store().await;
        let id = store
            .register_player("<b>Chandra</b> <script>steal()</script>Nalaar")
            .await
            .unwrap();

        let players = store.get_players().await.unwrap();
        assert_eq!(players.get(&id).map(String::as_str), Some("Chandra Nalaar"));
    }

    #[tokio::test]
    async fn test_register_markup_only_name_fails() {
        let (store, _dir) = test_store().await;
        let err = store.register_player("<img src=x>").await.unwrap_err();

        assert!(matches!(err, StoreError::Registration { .. }));
        assert_eq!(store.count_players().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_register_sql_metacharacters_stored_verbatim() {
        let (store, _dir) = test_store().await;
        let name = "Robert'); DROP TABLE player;--";
        let id = store.register_player(name).await.unwrap();

        assert_eq!(store.get_player(id).await.unwrap().name, name);
        assert_eq!(store.count_players().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_insert_failure_is_registration_error() {
        let (store, _dir) = test_store().await;
        store.register_player("Allowed").await.unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_blocked BEFORE INSERT ON player
             WHEN NEW.name = 'Blocked'
             BEGIN SELECT RAISE(ABORT, 'name blocked'); END",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let err = store.register_player("<i>Blocked</i>").await.unwrap_err();
        match err {
            StoreError::Registration { name, reason } => {
                assert_eq!(name, "<i>Blocked</i>");
                assert!(reason.contains("name blocked"), "reason: {}", reason);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.count_players().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_report_match_updates_counters() {
        let (store, _dir) = test_store().await;
        let ids = register_all(&store, &["Bruno Walton", "Boots O'Neal"]).await;

        store.report_match(ids[0], ids[1]).await.unwrap();

        assert_eq!(store.get_score(ids[0]).await.unwrap(), 1);
        assert_eq!(store.get_matches(ids[0]).await.unwrap(), 1);
        assert_eq!(store.get_score(ids[1]).await.unwrap(), 0);
        assert_eq!(store.get_matches(ids[1]).await.unwrap(), 1);
        assert_eq!(store.count_matches().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_counters_consistent_with_match_log() {
        let (store, _dir) = test_store().await;
        let ids = register_all(&store, &["A", "B", "C", "D", "E"]).await;

        let results = [(0, 1), (2, 3), (0, 2), (4, 1), (3, 4), (0, 4)];
        for (w, l) in results {
            store.report_match(ids[w], ids[l]).await.unwrap();
        }

        let standings = store.player_standings().await.unwrap();
        let total_wins: u32 = standings.iter().map(|s| s.wins).sum();
        let total_matches: u32 = standings.iter().map(|s| s.matches).sum();
        let recorded = store.count_matches().await.unwrap() as u32;

        assert_eq!(recorded, results.len() as u32);
        assert_eq!(total_wins, recorded);
        assert_eq!(total_matches, 2 * recorded);
        assert!(standings.iter().all(|s| s.wins <= s.matches));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reports_all_recorded() {
        let (store, _dir) = test_store().await;
        let names: Vec<String> = (0..10).map(|i| format!("Player {}", i)).collect();
        let mut ids = Vec::new();
        for name in &names {
            ids.push(store.register_player(name).await.unwrap());
        }

        let handles: Vec<_> = (0..40)
            .map(|i| {
                let store = store.clone();
                let (winner, loser) = (ids[i % 10], ids[(i + 1) % 10]);
                tokio::spawn(async move { store.report_match(winner, loser).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.count_matches().await.unwrap(), 40);
        let standings = store.player_standings().await.unwrap();
        assert_eq!(standings.iter().map(|s| s.wins).sum::<u32>(), 40);
        assert_eq!(standings.iter().map(|s| s.matches).sum::<u32>(), 80);
        assert!(standings.iter().all(|s| s.wins == 4 && s.matches == 8));
    }

    #[tokio::test]
    async fn test_self_match_rejected_without_write() {
        let (store, _dir) = test_store().await;
        let ids = register_all(&store, &["Solo"]).await;

        let err = store.report_match(ids[0], ids[0]).await.unwrap_err();

        assert!(matches!(err, StoreError::InvalidMatch { .. }));
        assert_eq!(store.count_matches().await.unwrap(), 0);
        assert_eq!(store.get_matches(ids[0]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_player_match_rejected_without_write() {
        let (store, _dir) = test_store().await;
        let ids = register_all(&store, &["Known"]).await;

        let err = store.report_match(ids[0], 999).await.unwrap_err();
        match err {
            StoreError::InvalidMatch { winner, loser, reason } => {
                assert_eq!((winner, loser), (ids[0], 999));
                assert!(reason.contains("999"));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(store.count_matches().await.unwrap(), 0);
        assert_eq!(store.get_player(ids[0]).await.unwrap(), Player::new(ids[0], "Known"));
    }

    #[tokio::test]
    async fn test_lookups_on_missing_player_are_not_found() {
        let (store, _dir) = test_store().await;

        assert!(matches!(
            store.get_score(999).await,
            Err(StoreError::NotFound { operation: "get_score", id: 999 })
        ));
        assert!(matches!(
            store.get_matches(999).await,
            Err(StoreError::NotFound { operation: "get_matches", id: 999 })
        ));
        assert!(matches!(
            store.get_player(999).await,
            Err(StoreError::NotFound { operation: "get_player", id: 999 })
        ));
    }

    #[tokio::test]
    async fn test_reset_matches_is_idempotent() {
        let (store, _dir) = test_store().await;
        let ids = register_all(&store, &["A", "B", "C", "D"]).await;
        store.report_match(ids[0], ids[1]).await.unwrap();
        store.report_match(ids[2], ids[3]).await.unwrap();

        store.reset_matches().await.unwrap();
        store.reset_matches().await.unwrap();

        assert_eq!(store.count_players().await.unwrap(), 4);
        assert_eq!(store.count_matches().await.unwrap(), 0);
        let standings = store.player_standings().await.unwrap();
        assert!(standings.iter().all(|s| s.wins == 0 && s.matches == 0));
    }

    #[tokio::test]
    async fn test_reset_players_removes_matches_first() {
        let (store, _dir) = test_store().await;
        let ids = register_all(&store, &["A", "B"]).await;
        store.report_match(ids[0], ids[1]).await.unwrap();

        store.reset_players().await.unwrap();

        assert_eq!(store.count_matches().await.unwrap(), 0);
        assert!(store.get_players().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_standings_sorted_by_wins_then_id() {
        let (store, _dir) = test_store().await;
        let ids = register_all(&store, &["A", "B", "C", "D"]).await;
        store.report_match(ids[3], ids[0]).await.unwrap();
        store.report_match(ids[1], ids[2]).await.unwrap();
        store.report_match(ids[3], ids[2]).await.unwrap();

        let order: Vec<PlayerId> = store
            .player_standings()
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(order, vec![ids[3], ids[1], ids[0], ids[2]]);
    }

    #[tokio::test]
    async fn test_get_players_snapshot() {
        let (store, _dir) = test_store().await;
        let ids = register_all(&store, &["Twilight", "Rarity"]).await;

        let players = store.get_players().await.unwrap();
        let expected: BTreeMap<PlayerId, String> = [
            (ids[0], "Twilight".to_string()),
            (ids[1], "Rarity".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(players, expected);
    }

    #[tokio::test]
    async fn test_schema_creation_is_idempotent() {
        let (store, _dir) = test_store().await;
        store.register_player("Persistent").await.unwrap();

        store.create_schema().await.unwrap();
        assert_eq!(store.count_players().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_connect_with_bad_url_is_connection_error() {
        let config = AppConfig::with_database_url("postgres://localhost/tournament");
        let err = SqliteStore::connect(&config).await.unwrap_err();

        assert!(matches!(err, StoreError::Connection { operation: "connect", .. }));
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_path_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!(
            "sqlite://{}",
            dir.path().join("missing").join("nested").join("t.db").display()
        );
        let err = SqliteStore::connect(&AppConfig::with_database_url(url))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Connection { .. }));
    }
}
