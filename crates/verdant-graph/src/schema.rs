//! Schema bootstrap and idempotent seed loading.
//!
//! Both the schema and the seed file are semicolon-separated statement
//! batches with `--` comment lines. Statements run independently: a
//! failure is logged and the batch continues, and a validation pass
//! afterwards decides whether the store is actually usable.

use std::collections::HashSet;

use neo4rs::query;

use verdant_core::Catalog;

use crate::client::{truncate, GraphError, StoreConnection, StoreManager};
use crate::sync::{ensure_structure, ensure_vegetable_type, node_exists};

const SCHEMA: &str = include_str!("../db/schema.cypher");
const SEED: &str = include_str!("../db/seed.cypher");

/// Constraint name and the node kind it guards. Validation treats a
/// missing constraint as a missing node kind.
const EXPECTED_CONSTRAINTS: &[(&str, &str)] = &[
    ("garden_id", "Garden"),
    ("crop_id", "Crop"),
    ("vegetable_type_id", "VegetableType"),
    ("structure_id", "Structure"),
    ("annotation_id", "Annotation"),
];

/// Relationship kinds probed with a count query after bootstrap.
const EXPECTED_RELATIONSHIPS: &[&str] = &[
    "OF_TYPE",
    "PLANTED_IN",
    "CONTAINS",
    "PART_OF",
    "NOTES_CROP",
    "NOTES_TYPE",
    "NOTES_GARDEN",
];

/// Split a statement batch: strip `--` comment lines, split on `;`,
/// drop empty fragments. Newlines inside a statement are preserved.
pub fn split_statements(text: &str) -> Vec<String> {
    let without_comments: String = text
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    without_comments
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extract `(label, id)` from a node-creating statement with a
/// single-quoted string id, e.g. `CREATE (:Garden {id: 'garden_main', …`.
/// Statements that don't match (edges, numeric ids) return `None`.
pub fn created_entity(stmt: &str) -> Option<(String, String)> {
    let trimmed = stmt.trim_start();
    if !trimmed.starts_with("CREATE") {
        return None;
    }
    let start = trimmed.find("(:")? + 2;
    let rest = &trimmed[start..];
    let label_end = rest.find(|c: char| !c.is_alphanumeric() && c != '_')?;
    let label = &rest[..label_end];

    let props = &rest[label_end..];
    let id_pos = props.find("id:")? + 3;
    let after = props[id_pos..].trim_start();
    let value = after.strip_prefix('\'')?;
    let end = value.find('\'')?;
    Some((label.to_string(), value[..end].to_string()))
}

/// Whether a statement would create reference data that is sourced
/// from the catalog file instead of the seed batch.
pub fn creates_vegetable_type(stmt: &str) -> bool {
    stmt.trim_start().starts_with("CREATE") && stmt.contains("(:VegetableType")
}

fn references_id(stmt: &str, id: &str) -> bool {
    stmt.contains(&format!("'{id}'"))
}

impl StoreManager {
    /// Probe for expected node and relationship kinds; returns the
    /// names of whatever is missing.
    pub async fn missing_schema_kinds(
        &self,
        conn: &StoreConnection,
    ) -> Result<Vec<String>, GraphError> {
        let rows = conn
            .query_rows(query("SHOW CONSTRAINTS YIELD name RETURN name"))
            .await?;
        let present: HashSet<String> = rows
            .into_iter()
            .filter_map(|row| row.get::<String>("name").ok())
            .collect();

        let mut missing = Vec::new();
        for (constraint, kind) in EXPECTED_CONSTRAINTS {
            if !present.contains(*constraint) {
                missing.push((*kind).to_string());
            }
        }

        for rel in EXPECTED_RELATIONSHIPS {
            let probe = format!("MATCH ()-[r:{rel}]->() RETURN count(r) AS cnt");
            if conn.query_one(query(&probe)).await.is_err() {
                missing.push((*rel).to_string());
            }
        }

        Ok(missing)
    }

    /// Lazy per-connection schema check; bootstraps when kinds are
    /// missing. Best-effort: logs, never surfaces an error.
    pub(crate) async fn ensure_schema(&self, conn: &StoreConnection) {
        match self.missing_schema_kinds(conn).await {
            Ok(missing) if missing.is_empty() => self.set_schema_ready(true),
            Ok(missing) => {
                tracing::info!(?missing, "Store schema incomplete; bootstrapping");
                let ready = self.initialize_schema(conn).await;
                self.set_schema_ready(ready);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Schema probe failed");
                self.set_schema_ready(false);
            }
        }
    }

    /// Apply the schema batch, then validate. Returns false when any
    /// expected kind is still missing afterwards.
    pub async fn initialize_schema(&self, conn: &StoreConnection) -> bool {
        for stmt in split_statements(SCHEMA) {
            match conn.run(query(&stmt)).await {
                Ok(()) => tracing::debug!(statement = truncate(&stmt, 80), "Schema statement applied"),
                Err(e) => tracing::warn!(
                    statement = truncate(&stmt, 120),
                    error = %e,
                    "Schema statement failed; continuing"
                ),
            }
        }

        match self.missing_schema_kinds(conn).await {
            Ok(missing) if missing.is_empty() => {
                tracing::info!("Store schema ready");
                true
            }
            Ok(missing) => {
                tracing::warn!(?missing, "Schema incomplete after bootstrap");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Schema validation failed");
                false
            }
        }
    }

    /// Idempotent seeding: existence-checked seed statements, then the
    /// catalog's reference rows and their relationship edges.
    ///
    /// Seed statements creating vegetable types are skipped outright —
    /// that data is sourced from the catalog. Returns false when any
    /// statement or catalog row failed to apply.
    pub async fn load_initial_data(
        &self,
        conn: &StoreConnection,
        catalog: &Catalog,
        garden_id: &str,
    ) -> bool {
        let mut ok = true;
        let mut skipped_ids: HashSet<String> = HashSet::new();

        for stmt in split_statements(SEED) {
            if creates_vegetable_type(&stmt) {
                tracing::debug!(
                    statement = truncate(&stmt, 80),
                    "Skipping config-sourced reference statement"
                );
                continue;
            }

            if let Some((label, id)) = created_entity(&stmt) {
                match node_exists(conn, &label, &id).await {
                    Ok(true) => {
                        tracing::debug!(label = %label, id = %id, "Seed entity already present; skipping");
                        skipped_ids.insert(id);
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(label = %label, id = %id, error = %e, "Seed existence check failed");
                        ok = false;
                        continue;
                    }
                }
            } else if skipped_ids.iter().any(|id| references_id(&stmt, id)) {
                // Relationship statements for entities that already
                // existed would duplicate their edges.
                tracing::debug!(statement = truncate(&stmt, 80), "Seed statement skipped");
                continue;
            }

            if let Err(e) = conn.run(query(&stmt)).await {
                tracing::warn!(
                    statement = truncate(&stmt, 120),
                    error = %e,
                    "Seed statement failed; continuing"
                );
                ok = false;
            }
        }

        // Reference rows from the catalog: vegetable types, then
        // structures wired to the garden.
        let mut created_types = 0;
        for vegetable in &catalog.vegetables {
            match ensure_vegetable_type(conn, vegetable).await {
                Ok(true) => created_types += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(type_id = vegetable.id, error = %e, "Vegetable type load failed");
                    ok = false;
                }
            }
        }

        let mut created_structures = 0;
        for structure in catalog.structures() {
            match ensure_structure(conn, garden_id, &structure).await {
                Ok(true) => created_structures += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(structure = %structure.id, error = %e, "Structure load failed");
                    ok = false;
                }
            }
        }

        tracing::info!(
            created_types,
            created_structures,
            ok,
            "Initial data load finished"
        );
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_batch_splits_cleanly() {
        let statements = split_statements(SCHEMA);
        assert_eq!(statements.len(), 8);
        assert!(statements.iter().all(|s| !s.contains("--")));
        assert!(statements[0].starts_with("CREATE CONSTRAINT garden_id"));
    }

    #[test]
    fn seed_batch_splits_cleanly() {
        let statements = split_statements(SEED);
        assert_eq!(statements.len(), 5);
        assert!(statements.iter().all(|s| !s.trim().is_empty()));
    }

    #[test]
    fn comments_and_blanks_are_stripped() {
        let text = "-- a comment\nCREATE (:A {id: 'x'});\n\n  -- another\nCREATE (:B {id: 'y'});;\n";
        let statements = split_statements(text);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], "CREATE (:A {id: 'x'})");
    }

    #[test]
    fn multiline_statement_preserved() {
        let text = "CREATE (:A {\n  id: 'x'\n});";
        let statements = split_statements(text);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains('\n'));
    }

    #[test]
    fn created_entity_extraction() {
        assert_eq!(
            created_entity("CREATE (:Garden {id: 'garden_main', name: 'Main plot'})"),
            Some(("Garden".to_string(), "garden_main".to_string()))
        );
        // Edge statements and numeric ids are not node creations we guard.
        assert_eq!(
            created_entity("MATCH (c:Crop {id: 'c1'}), (g:Garden {id: 'g'}) CREATE (c)-[:PLANTED_IN]->(g)"),
            None
        );
        assert_eq!(created_entity("CREATE (:VegetableType {id: 1, name: 'Tomato'})"), None);
    }

    #[test]
    fn vegetable_type_statements_detected() {
        assert!(creates_vegetable_type("CREATE (:VegetableType {id: 1})"));
        assert!(!creates_vegetable_type("CREATE (:Garden {id: 'g'})"));
        assert!(!creates_vegetable_type(
            "MATCH (v:VegetableType {id: 1}) RETURN v"
        ));
    }

    #[test]
    fn id_references_detected() {
        let stmt = "MATCH (c:Crop {id: 'crop_sample'}), (g:Garden {id: 'garden_main'}) CREATE (c)-[:PLANTED_IN]->(g)";
        assert!(references_id(stmt, "crop_sample"));
        assert!(references_id(stmt, "garden_main"));
        assert!(!references_id(stmt, "crop_other"));
    }
}
