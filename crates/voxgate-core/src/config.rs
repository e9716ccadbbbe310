//! Environment-driven configuration.
//!
//! Provider endpoints default to region-derived URLs so a deployment only has
//! to set `VOXGATE_REGION` and the credentials; any endpoint can still be
//! overridden individually, which is also how tests point components at
//! local fixtures.

use tracing::warn;

const DEFAULT_REGION: &str = "ca-central-1";
const DEFAULT_LOCALE: &str = "en_US";
const DEFAULT_VOICE: &str = "Joanna";
const DEFAULT_HISTORY_TABLE: &str = "voxgate-chat-history";
const DEFAULT_ARCHIVE_BUCKET: &str = "voxgate-conversations";
const DEFAULT_STAGING_BUCKET: &str = "voxgate-recordings";

/// Conversation-engine bot identifiers. The chat component is only
/// constructed when these are present.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_id: String,
    pub alias_id: String,
    pub locale: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub region: String,
    /// Sent as `x-api-key` on every provider call. Empty when unset; the
    /// provider will reject the call and the error surfaces as access denied.
    pub api_key: String,

    pub intent_url: String,
    pub bot: Option<BotConfig>,

    pub speech_url: String,
    pub default_voice: String,

    pub transcribe_url: String,
    pub staging_bucket: String,

    pub kv_url: String,
    pub history_table: String,

    pub blob_url: String,
    pub archive_bucket: String,
}

impl Config {
    /// Read configuration from the environment. Never fails: missing bot
    /// identifiers degrade the chat component instead of aborting startup.
    pub fn from_env() -> Self {
        let region = env_or("VOXGATE_REGION", DEFAULT_REGION);

        let bot = match (var("VOXGATE_BOT_ID"), var("VOXGATE_BOT_ALIAS_ID")) {
            (Some(bot_id), Some(alias_id)) => Some(BotConfig {
                bot_id,
                alias_id,
                locale: env_or("VOXGATE_BOT_LOCALE", DEFAULT_LOCALE),
            }),
            _ => {
                warn!("VOXGATE_BOT_ID or VOXGATE_BOT_ALIAS_ID unset, chat will be unavailable");
                None
            }
        };

        Self {
            api_key: var("VOXGATE_API_KEY").unwrap_or_default(),
            intent_url: endpoint_or("VOXGATE_INTENT_URL", "intent", &region),
            bot,
            speech_url: endpoint_or("VOXGATE_SPEECH_URL", "speech", &region),
            default_voice: env_or("VOXGATE_DEFAULT_VOICE", DEFAULT_VOICE),
            transcribe_url: endpoint_or("VOXGATE_TRANSCRIBE_URL", "transcribe", &region),
            staging_bucket: env_or("VOXGATE_STAGING_BUCKET", DEFAULT_STAGING_BUCKET),
            kv_url: endpoint_or("VOXGATE_KV_URL", "kv", &region),
            history_table: env_or("VOXGATE_HISTORY_TABLE", DEFAULT_HISTORY_TABLE),
            blob_url: endpoint_or("VOXGATE_BLOB_URL", "blob", &region),
            archive_bucket: env_or("VOXGATE_ARCHIVE_BUCKET", DEFAULT_ARCHIVE_BUCKET),
            region,
        }
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    var(name).unwrap_or_else(|| default.to_string())
}

fn endpoint_or(name: &str, service: &str, region: &str) -> String {
    var(name).unwrap_or_else(|| format!("https://{service}.{region}.api.voxcloud.dev"))
}
