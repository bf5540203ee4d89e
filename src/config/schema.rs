use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "engines": {
                "type": "object",
                "properties": {
                    "web_scanner": { "$ref": "#/$defs/engine" },
                    "network_scanner": { "$ref": "#/$defs/engine" },
                    "template_scanner": { "$ref": "#/$defs/engine" }
                }
            },
            "schedule": {
                "type": "object",
                "properties": {
                    "cadence": { "type": "string", "pattern": "^[0-9]+d?$" }
                }
            },
            "validation": {
                "type": "object",
                "properties": {
                    "concurrency": { "type": "integer", "minimum": 1 },
                    "poll_interval_secs": { "type": "integer", "minimum": 1 },
                    "timeout_secs": { "type": "integer", "minimum": 1 }
                }
            },
            "safety": {
                "type": "object",
                "properties": {
                    "excluded_targets": { "type": "array", "items": { "type": "string" } },
                    "destructive_modules": { "type": "array", "items": { "type": "string" } }
                }
            },
            "matcher": {
                "type": "object",
                "properties": {
                    "cve_confidence": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                    "fingerprint_confidence": { "type": "number", "minimum": 0.0, "maximum": 1.0 }
                }
            },
            "severity": {
                "type": "object",
                "properties": {
                    "confirmed_floor": { "type": "number", "minimum": 0.0, "maximum": 10.0 }
                }
            },
            "catalog": {
                "type": "object",
                "properties": {
                    "path": { "type": "string" }
                }
            },
            "remote": {
                "type": "object",
                "properties": {
                    "endpoint": { "type": "string", "format": "uri" },
                    "token": { "type": "string" }
                }
            },
            "database": {
                "type": "object",
                "properties": {
                    "path": { "type": "string" }
                }
            },
            "output": {
                "type": "object",
                "properties": {
                    "directory": { "type": "string" }
                }
            }
        },
        "$defs": {
            "engine": {
                "type": "object",
                "properties": {
                    "enabled": { "type": "boolean" },
                    "targets": { "type": "array", "items": { "type": "string" } },
                    "endpoint": { "type": "string" }
                }
            }
        }
    })
});
