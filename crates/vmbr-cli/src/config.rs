//! Environment-driven run configuration.
//!
//! Each subcommand reads its settings once at startup, validates them in a
//! single pass that names every missing variable, and produces an
//! immutable request for the workflow layer. The reference timestamp is
//! computed here, in the deployment's tagging timezone (fixed UTC+8), and
//! injected into everything that formats names.

use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;

use vmbr_core::{format_timestamp, StoreLocation};
use vmbr_workflow::{BackupRequest, RestoreRequest, TransferSpec};

/// Default artifact name template.
pub const DEFAULT_IMAGE_TEMPLATE: &str = "backup-%Y-%m-%d.img";
/// Default timestamp-tag format.
pub const DEFAULT_DATE_TAG_FORMAT: &str = "%Y-%m-%d-%H-%M";
/// Default prefix for restored VM names.
pub const DEFAULT_VM_NAME_PREFIX: &str = "restore-dst-vm";
/// Default retention limit.
pub const DEFAULT_TAG_NUM: usize = 2;
/// Default rclone remote-control endpoint.
pub const DEFAULT_RCD_URL: &str = "http://localhost:5572";

/// Configuration errors; raised before any remote call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),
}

/// Connection settings for the compute/image service.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: String,
    pub project: String,
}

/// Everything the backup subcommand needs.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub api: ApiConfig,
    pub request: BackupRequest,
    pub rcd_url: String,
}

/// Everything the restore subcommand needs.
#[derive(Debug, Clone)]
pub struct RestoreConfig {
    pub api: ApiConfig,
    pub request: RestoreRequest,
    pub rcd_url: String,
}

/// Load backup configuration from process environment variables.
pub fn load_backup_from_env() -> Result<BackupConfig, ConfigError> {
    load_backup(&process_env, now_in_tagging_timezone())
}

/// Load restore configuration from process environment variables.
pub fn load_restore_from_env() -> Result<RestoreConfig, ConfigError> {
    load_restore(&process_env, now_in_tagging_timezone())
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Tags are stamped in the deployment's timezone, fixed UTC+8.
fn now_in_tagging_timezone() -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(8 * 3600).expect("UTC+8 is a valid fixed offset");
    Utc::now().with_timezone(&offset)
}

pub fn load_backup(
    env: &impl Fn(&str) -> Option<String>,
    now: DateTime<FixedOffset>,
) -> Result<BackupConfig, ConfigError> {
    let transfer_enabled = flag(env, "BACKUP_TRANSFER_TO_S3");

    let mut required = vec![
        "API_PROTOCOL",
        "API_HOST",
        "API_TOKEN",
        "PROJECT_SYS_CODE",
        "BACKUP_SRC_VM",
        "BACKUP_REPO",
        "BACKUP_CS_BUCKET",
    ];
    if transfer_enabled {
        required.extend(S3_VARS_BACKUP);
    }
    require(env, &required)?;

    let api = api_config(env);
    let transfer = transfer_enabled.then(|| TransferSpec {
        src: store_location(env, "BACKUP_SRC_S3"),
        dst: store_location(env, "BACKUP_DST_S3"),
    });

    let request = BackupRequest {
        vm_name: var(env, "BACKUP_SRC_VM"),
        repo_name: var(env, "BACKUP_REPO"),
        bucket: var(env, "BACKUP_CS_BUCKET"),
        image_template: var_or(env, "BACKUP_IMAGE", DEFAULT_IMAGE_TEMPLATE),
        date_tag: date_tag(env, &now),
        tag_num: tag_num(env, "BACKUP_TAG_NUM"),
        now,
        transfer,
    };

    Ok(BackupConfig {
        api,
        request,
        rcd_url: var_or(env, "RCLONE_RC_URL", DEFAULT_RCD_URL),
    })
}

pub fn load_restore(
    env: &impl Fn(&str) -> Option<String>,
    now: DateTime<FixedOffset>,
) -> Result<RestoreConfig, ConfigError> {
    let transfer_enabled = flag(env, "RESTORE_TRANSFER_FROM_S3");

    let mut required = vec![
        "API_PROTOCOL",
        "API_HOST",
        "API_TOKEN",
        "PROJECT_SYS_CODE",
        "RESTORE_REPO",
        "RESTORE_CS_BUCKET",
        "RESTORE_IMAGE",
        "RESTORE_FLAVOR_ID",
        "RESTORE_NETWORK_ID",
        "RESTORE_KEYPAIR_ID",
        "RESTORE_SECURITYGROUP_ID",
    ];
    if transfer_enabled {
        required.extend(S3_VARS_RESTORE);
    }
    require(env, &required)?;

    let api = api_config(env);
    let transfer = transfer_enabled.then(|| TransferSpec {
        src: store_location(env, "RESTORE_SRC_S3"),
        dst: store_location(env, "RESTORE_DST_S3"),
    });

    let request = RestoreRequest {
        repo_name: var(env, "RESTORE_REPO"),
        bucket: var(env, "RESTORE_CS_BUCKET"),
        image_template: var(env, "RESTORE_IMAGE"),
        vm_name_prefix: var_or(env, "RESTORE_DST_VM", DEFAULT_VM_NAME_PREFIX),
        flavor_id: var(env, "RESTORE_FLAVOR_ID"),
        network_id: var(env, "RESTORE_NETWORK_ID"),
        keypair_id: var(env, "RESTORE_KEYPAIR_ID"),
        security_group_id: var(env, "RESTORE_SECURITYGROUP_ID"),
        date_tag: date_tag(env, &now),
        tag_num: tag_num(env, "RESTORE_TAG_NUM"),
        now,
        transfer,
    };

    Ok(RestoreConfig {
        api,
        request,
        rcd_url: var_or(env, "RCLONE_RC_URL", DEFAULT_RCD_URL),
    })
}

const S3_VARS_BACKUP: [&str; 8] = [
    "BACKUP_SRC_S3_ENDPOINT",
    "BACKUP_SRC_S3_ACCESS_KEY",
    "BACKUP_SRC_S3_SECRET_KEY",
    "BACKUP_SRC_S3_BUCKET",
    "BACKUP_DST_S3_ENDPOINT",
    "BACKUP_DST_S3_ACCESS_KEY",
    "BACKUP_DST_S3_SECRET_KEY",
    "BACKUP_DST_S3_BUCKET",
];

const S3_VARS_RESTORE: [&str; 8] = [
    "RESTORE_SRC_S3_ENDPOINT",
    "RESTORE_SRC_S3_ACCESS_KEY",
    "RESTORE_SRC_S3_SECRET_KEY",
    "RESTORE_SRC_S3_BUCKET",
    "RESTORE_DST_S3_ENDPOINT",
    "RESTORE_DST_S3_ACCESS_KEY",
    "RESTORE_DST_S3_SECRET_KEY",
    "RESTORE_DST_S3_BUCKET",
];

/// Verify all `names` are set and non-empty; the error lists every missing
/// variable, not just the first.
fn require(env: &impl Fn(&str) -> Option<String>, names: &[&str]) -> Result<(), ConfigError> {
    let missing: Vec<String> = names
        .iter()
        .filter(|n| env(n).map(|v| v.is_empty()).unwrap_or(true))
        .map(|n| n.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::MissingEnv(missing))
    }
}

fn var(env: &impl Fn(&str) -> Option<String>, name: &str) -> String {
    env(name).unwrap_or_default()
}

fn var_or(env: &impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    match env(name) {
        Some(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

/// Truthy flag values, case-insensitive: 1, true, yes, y.
fn flag(env: &impl Fn(&str) -> Option<String>, name: &str) -> bool {
    env(name)
        .map(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "y"
            )
        })
        .unwrap_or(false)
}

/// Retention limit; unparsable values fall back to the default.
fn tag_num(env: &impl Fn(&str) -> Option<String>, name: &str) -> usize {
    match env(name) {
        Some(v) if !v.is_empty() => v.parse().unwrap_or(DEFAULT_TAG_NUM),
        _ => DEFAULT_TAG_NUM,
    }
}

fn date_tag(env: &impl Fn(&str) -> Option<String>, now: &DateTime<FixedOffset>) -> String {
    let format = var_or(env, "DATE_TAG_FORMAT", DEFAULT_DATE_TAG_FORMAT);
    format_timestamp(&format, now)
}

fn api_config(env: &impl Fn(&str) -> Option<String>) -> ApiConfig {
    ApiConfig {
        base_url: format!("{}://{}", var(env, "API_PROTOCOL"), var(env, "API_HOST")),
        token: var(env, "API_TOKEN"),
        project: var(env, "PROJECT_SYS_CODE"),
    }
}

fn store_location(env: &impl Fn(&str) -> Option<String>, prefix: &str) -> StoreLocation {
    StoreLocation {
        endpoint: var(env, &format!("{prefix}_ENDPOINT")),
        access_key: var(env, &format!("{prefix}_ACCESS_KEY")),
        secret_key: var(env, &format!("{prefix}_SECRET_KEY")),
        bucket: var(env, &format!("{prefix}_BUCKET")),
    }
}
