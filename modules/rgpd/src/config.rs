use serde::{Deserialize, Serialize};

/// Retention, TTL and SLA policy for the lifecycle engine.
///
/// System-wide values with legally-mandated defaults; deployments may
/// override them through configuration, there is no per-tenant policy
/// storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RgpdConfig {
    /// Export bundles expire this many days after creation.
    #[serde(default = "default_export_ttl_days")]
    pub export_ttl_days: i64,
    /// Days between soft-delete and the earliest permitted hard delete.
    #[serde(default = "default_deletion_retention_days")]
    pub deletion_retention_days: i64,
    /// Days an open dispute may wait for human review before it is overdue.
    #[serde(default = "default_dispute_sla_days")]
    pub dispute_sla_days: i64,
    /// Retention of AI usage records.
    #[serde(default = "default_usage_retention_days")]
    pub usage_retention_days: i64,
    /// Content-quality gate on dispute reasons, in characters.
    #[serde(default = "default_dispute_reason_min_chars")]
    pub dispute_reason_min_chars: usize,
    #[serde(default = "default_dispute_reason_max_chars")]
    pub dispute_reason_max_chars: usize,
}

impl Default for RgpdConfig {
    fn default() -> Self {
        Self {
            export_ttl_days: default_export_ttl_days(),
            deletion_retention_days: default_deletion_retention_days(),
            dispute_sla_days: default_dispute_sla_days(),
            usage_retention_days: default_usage_retention_days(),
            dispute_reason_min_chars: default_dispute_reason_min_chars(),
            dispute_reason_max_chars: default_dispute_reason_max_chars(),
        }
    }
}

fn default_export_ttl_days() -> i64 {
    7
}

fn default_deletion_retention_days() -> i64 {
    30
}

fn default_dispute_sla_days() -> i64 {
    30
}

fn default_usage_retention_days() -> i64 {
    90
}

fn default_dispute_reason_min_chars() -> usize {
    20
}

fn default_dispute_reason_max_chars() -> usize {
    4000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_mandated_windows() {
        let config = RgpdConfig::default();
        assert_eq!(config.export_ttl_days, 7);
        assert_eq!(config.deletion_retention_days, 30);
        assert_eq!(config.dispute_sla_days, 30);
        assert_eq!(config.usage_retention_days, 90);
        assert_eq!(config.dispute_reason_min_chars, 20);
        assert_eq!(config.dispute_reason_max_chars, 4000);
    }

    #[test]
    fn partial_config_files_fill_in_defaults() {
        let config: RgpdConfig = serde_json::from_str(r#"{"export_ttl_days": 14}"#).unwrap();
        assert_eq!(config.export_ttl_days, 14);
        assert_eq!(config.deletion_retention_days, 30);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed = serde_json::from_str::<RgpdConfig>(r#"{"export_ttl": 14}"#);
        assert!(parsed.is_err());
    }
}
