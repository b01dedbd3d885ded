pub mod schema;

pub use schema::{ChatConfig, Config, OpenAiConfig, RedisConfig, SessionServiceConfig};
