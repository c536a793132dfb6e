//! Embedded database schema statements.

/// All schema statements in creation order.
///
/// Statements use IF NOT EXISTS clauses so the migration runner stays
/// idempotent.
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![
        // Campaigns: one row per campaign, holding the immutable product
        // description the pipeline was started with.
        r#"
        CREATE TABLE IF NOT EXISTS campaigns (
            id VARCHAR(255) PRIMARY KEY,
            product JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        // Stage results: latest result per (campaign, stage). Results are
        // immutable value objects; a re-run replaces the row wholesale.
        r#"
        CREATE TABLE IF NOT EXISTS stage_results (
            campaign_id VARCHAR(255) NOT NULL REFERENCES campaigns(id) ON DELETE CASCADE,
            stage VARCHAR(32) NOT NULL,
            run_id UUID NOT NULL,
            result JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (campaign_id, stage)
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_stage_results_run ON stage_results(run_id)
        "#,
        // Angle forests: the derived nested view over a campaign's scripts.
        // Regenerable from the flat scripts result at any time.
        r#"
        CREATE TABLE IF NOT EXISTS angle_forests (
            campaign_id VARCHAR(255) PRIMARY KEY REFERENCES campaigns(id) ON DELETE CASCADE,
            forest JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_are_idempotent_by_construction() {
        for statement in all_schema_statements() {
            assert!(
                statement.contains("IF NOT EXISTS"),
                "statement missing IF NOT EXISTS: {}",
                statement
            );
        }
    }
}
