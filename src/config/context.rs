// src/config/context.rs

//! Layered JSON assembly for the result `context` and the upload config.
//!
//! Sources, lowest priority first:
//! 1. `<PREFIX>` (a JSON object) and `<PREFIX>_<KEY>` environment variables
//! 2. the JSON file flag
//! 3. the inline JSON flag
//! 4. repeated `key=value` flags
//!
//! Objects are merged shallowly; later sources override earlier keys.

use std::fs;
use std::path::Path;

use serde_json::{Map, Number, Value};

use crate::cli::{ContextArgs, UploadArgs};
use crate::errors::{GhostError, Result};

pub const CONTEXT_ENV_PREFIX: &str = "GHOST_CONTEXT";
pub const UPLOAD_CONFIG_ENV_PREFIX: &str = "GHOST_UPLOAD_CONFIG";

/// Where one layered object comes from.
#[derive(Debug, Clone, Copy)]
pub struct Layers<'a> {
    pub env_prefix: &'static str,
    /// Flag name used in error messages, without dashes.
    pub flag: &'static str,
    pub file: Option<&'a Path>,
    pub json: Option<&'a str>,
    pub kv: &'a [String],
}

impl<'a> Layers<'a> {
    pub fn context(args: &'a ContextArgs) -> Self {
        Self {
            env_prefix: CONTEXT_ENV_PREFIX,
            flag: "context",
            file: args.file.as_deref(),
            json: args.json.as_deref(),
            kv: &args.kv,
        }
    }

    pub fn upload_config(args: &'a UploadArgs) -> Self {
        Self {
            env_prefix: UPLOAD_CONFIG_ENV_PREFIX,
            flag: "upload-config",
            file: args.upload_config_file.as_deref(),
            json: args.upload_config.as_deref(),
            kv: &args.upload_config_kv,
        }
    }
}

/// Build the merged context, reading environment entries from `env`.
pub fn build_context<I>(args: &ContextArgs, env: I) -> Result<Option<Value>>
where
    I: IntoIterator<Item = (String, String)>,
{
    build_layered(Layers::context(args), env)
}

/// Merge all layers of one object.
pub fn build_layered<I>(layers: Layers<'_>, env: I) -> Result<Option<Value>>
where
    I: IntoIterator<Item = (String, String)>,
{
    let flag = layers.flag;
    let mut sources = Vec::new();

    if let Some(env_obj) = parse_env(layers.env_prefix, env) {
        sources.push(Value::Object(env_obj));
    }

    if let Some(path) = layers.file {
        let contents =
            fs::read_to_string(path).map_err(|e| GhostError::io("reading JSON file", path, e))?;
        let value = serde_json::from_str(&contents).map_err(|e| {
            GhostError::ConfigError(format!("invalid JSON in --{flag}-file {path:?}: {e}"))
        })?;
        sources.push(value);
    }

    if let Some(json) = layers.json {
        let value = serde_json::from_str(json)
            .map_err(|e| GhostError::ConfigError(format!("invalid --{flag} JSON: {e}")))?;
        sources.push(value);
    }

    if !layers.kv.is_empty() {
        let mut kv = Map::new();
        for pair in layers.kv {
            let (key, value) = parse_kv(pair)?;
            kv.insert(key, value);
        }
        sources.push(Value::Object(kv));
    }

    Ok(merge_contexts(sources))
}

/// Split `key=value` and type the value.
pub fn parse_kv(pair: &str) -> Result<(String, Value)> {
    let (key, value) = pair.split_once('=').ok_or_else(|| {
        GhostError::ConfigError(format!("invalid format, expected key=value: {pair}"))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(GhostError::ConfigError(format!(
            "empty key in key=value pair: {pair}"
        )));
    }
    Ok((key.to_string(), infer_value(value.trim())))
}

/// Integer, then float, then `true`/`false`, otherwise a string.
pub fn infer_value(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// Collect `<PREFIX>` (JSON object) and `<PREFIX>_<KEY>` variables.
pub fn parse_env<I>(prefix: &str, env: I) -> Option<Map<String, Value>>
where
    I: IntoIterator<Item = (String, String)>,
{
    let var_prefix = format!("{prefix}_");
    let mut whole = None;
    let mut keyed = Map::new();

    for (name, value) in env {
        if name == prefix {
            if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(&value) {
                whole = Some(obj);
            }
        } else if let Some(key) = name.strip_prefix(&var_prefix) {
            if !key.is_empty() {
                keyed.insert(key.to_lowercase(), infer_value(value.trim()));
            }
        }
    }

    let mut ctx = whole.unwrap_or_default();
    ctx.extend(keyed);
    if ctx.is_empty() { None } else { Some(ctx) }
}

/// Shallow-merge objects in order. A non-object source is returned as-is if
/// nothing has been merged before it, and skipped otherwise.
pub fn merge_contexts(sources: Vec<Value>) -> Option<Value> {
    let mut merged = Map::new();
    for source in sources {
        match source {
            Value::Object(obj) => merged.extend(obj),
            Value::Null => {}
            other if merged.is_empty() => return Some(other),
            _ => {}
        }
    }
    if merged.is_empty() { None } else { Some(Value::Object(merged)) }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;
    use tempfile::NamedTempFile;

    use super::*;

    fn no_env() -> Vec<(String, String)> {
        Vec::new()
    }

    #[test]
    fn kv_values_are_typed() {
        assert_eq!(parse_kv("n=42").unwrap(), ("n".into(), json!(42)));
        assert_eq!(parse_kv("f=1.5").unwrap(), ("f".into(), json!(1.5)));
        assert_eq!(parse_kv("b=true").unwrap(), ("b".into(), json!(true)));
        assert_eq!(parse_kv("s = hello ").unwrap(), ("s".into(), json!("hello")));
        assert_eq!(parse_kv("eq=a=b").unwrap(), ("eq".into(), json!("a=b")));
        // "1" is an integer, not a boolean.
        assert_eq!(infer_value("1"), json!(1));
    }

    #[test]
    fn kv_format_errors() {
        assert!(matches!(parse_kv("novalue"), Err(GhostError::ConfigError(_))));
        assert!(matches!(parse_kv("=v"), Err(GhostError::ConfigError(_))));
    }

    #[test]
    fn later_sources_override_earlier() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"a": "file", "b": "file", "c": "file"}}"#).unwrap();

        let args = ContextArgs {
            json: Some(r#"{"b": "json", "c": "json"}"#.into()),
            kv: vec!["c=kv".into()],
            file: Some(file.path().to_path_buf()),
        };
        let env = vec![
            ("GHOST_CONTEXT_A".to_string(), "env".to_string()),
            ("GHOST_CONTEXT_ENV_ONLY".to_string(), "7".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ];

        let ctx = build_context(&args, env).unwrap().unwrap();
        assert_eq!(
            ctx,
            json!({"a": "file", "b": "json", "c": "kv", "env_only": 7})
        );
    }

    #[test]
    fn env_json_object_and_keyed_vars_combine() {
        let env = vec![
            ("GHOST_CONTEXT".to_string(), r#"{"team": "red", "n": 1}"#.to_string()),
            ("GHOST_CONTEXT_N".to_string(), "2".to_string()),
        ];
        let ctx = parse_env(CONTEXT_ENV_PREFIX, env).unwrap();
        assert_eq!(Value::Object(ctx), json!({"team": "red", "n": 2}));
    }

    #[test]
    fn no_sources_yields_none() {
        assert_eq!(build_context(&ContextArgs::default(), no_env()).unwrap(), None);
    }

    #[test]
    fn non_object_json_passes_through_alone() {
        let args = ContextArgs {
            json: Some("[1, 2, 3]".into()),
            ..Default::default()
        };
        assert_eq!(build_context(&args, no_env()).unwrap(), Some(json!([1, 2, 3])));
    }

    #[test]
    fn invalid_json_is_config_error() {
        let args = ContextArgs {
            json: Some("{not json".into()),
            ..Default::default()
        };
        assert!(matches!(build_context(&args, no_env()), Err(GhostError::ConfigError(_))));
    }

    #[test]
    fn upload_config_layers_use_their_own_prefix() {
        let args = UploadArgs {
            upload_provider: Some("minio".into()),
            upload_config: Some(r#"{"bucket": "json", "region": "eu"}"#.into()),
            upload_config_kv: vec!["bucket=kv".into()],
            ..Default::default()
        };
        let env = vec![
            ("GHOST_UPLOAD_CONFIG_ENDPOINT".to_string(), "minio:9000".to_string()),
            ("GHOST_UPLOAD_CONFIG_BUCKET".to_string(), "env".to_string()),
            ("GHOST_CONTEXT_BUCKET".to_string(), "ignored".to_string()),
        ];

        let cfg = build_layered(Layers::upload_config(&args), env).unwrap().unwrap();
        assert_eq!(
            cfg,
            json!({"endpoint": "minio:9000", "bucket": "kv", "region": "eu"})
        );
    }

    #[test]
    fn missing_context_file_is_io_error() {
        let args = ContextArgs {
            file: Some("/definitely/not/here.json".into()),
            ..Default::default()
        };
        assert!(matches!(build_context(&args, no_env()), Err(GhostError::IoError { .. })));
    }
}
