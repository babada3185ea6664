use crate::chart::Chart;
use crate::error::Result;
use crate::model::{Network, NetworkId};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Everything that is persisted: the ordered networks and one chart per
/// network id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworksFile {
    pub networks: Vec<Network>,
    pub charts: BTreeMap<NetworkId, Chart>,
}

impl NetworksFile {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn drop(path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        debug!("Opened database at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS networks (
    id INTEGER PRIMARY KEY,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    body TEXT NOT NULL        -- JSON network definition
);

CREATE INDEX IF NOT EXISTS idx_networks_position ON networks(position);

-- One chart per network, removed with it
CREATE TABLE IF NOT EXISTS charts (
    network_id INTEGER PRIMARY KEY,
    body TEXT NOT NULL,       -- JSON chart: nodes, links, selection, viewport
    FOREIGN KEY(network_id) REFERENCES networks(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);
            ",
        )?;
        Ok(())
    }

    /// Replaces the stored networks and charts with `file` in one transaction.
    /// Charts without a matching network are skipped.
    pub fn save(&mut self, file: &NetworksFile) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM charts", [])?;
        tx.execute("DELETE FROM networks", [])?;

        for (position, network) in file.networks.iter().enumerate() {
            tx.execute(
                "INSERT INTO networks (id, position, name, body) VALUES (?1, ?2, ?3, ?4)",
                params![
                    network.id(),
                    position as i64,
                    network.name(),
                    serde_json::to_string(network)?,
                ],
            )?;
        }
        for (network_id, chart) in &file.charts {
            if !file.networks.iter().any(|n| n.id() == *network_id) {
                warn!("Not saving chart for unknown network {}", network_id);
                continue;
            }
            tx.execute(
                "INSERT INTO charts (network_id, body) VALUES (?1, ?2)",
                params![network_id, serde_json::to_string(chart)?],
            )?;
        }
        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('saved_at', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![Utc::now().timestamp()],
        )?;
        tx.commit()?;

        info!(
            "Saved {} network(s) and {} chart(s)",
            file.networks.len(),
            file.charts.len()
        );
        Ok(())
    }

    /// Loads networks in their saved order along with every chart.
    pub fn load(&self) -> Result<NetworksFile> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM networks ORDER BY position, id")?;
        let bodies = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let networks = bodies
            .iter()
            .map(|body| serde_json::from_str::<Network>(body))
            .collect::<serde_json::Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare("SELECT network_id, body FROM charts")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, NetworkId>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut charts = BTreeMap::new();
        for (network_id, body) in rows {
            charts.insert(network_id, serde_json::from_str::<Chart>(&body)?);
        }

        debug!("Loaded {} network(s) and {} chart(s)", networks.len(), charts.len());
        Ok(NetworksFile { networks, charts })
    }

    /// When the record set was last saved.
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        let secs: Option<i64> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = 'saved_at'", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(secs.and_then(|s| DateTime::from_timestamp(s, 0)))
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}
